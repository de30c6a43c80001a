//! OpenAPI specification and Swagger UI configuration.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Wreckshop Journeys API",
        version = "0.1.0",
        description = "Marketing-automation journeys for artists and managers.\n\nCreate step graphs, then publish, pause and resume them. Responses use the `{ok, data, error}` envelope.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Journeys", description = "Journey CRUD, lifecycle transitions, audit trail and funnel"),
        (name = "Operations", description = "Health, readiness, and liveness probes"),
    ),
    paths(
        // Journeys
        crate::journey_rest::create_journey,
        crate::journey_rest::list_journeys,
        crate::journey_rest::get_journey,
        crate::journey_rest::update_journey,
        crate::journey_rest::publish_journey,
        crate::journey_rest::pause_journey,
        crate::journey_rest::resume_journey,
        crate::journey_rest::duplicate_journey,
        crate::journey_rest::delete_journey,
        crate::journey_rest::journey_audit,
        crate::journey_rest::journey_funnel,
        // Operations
        crate::rest::health_check,
        crate::rest::ping,
        crate::rest::readiness,
        crate::rest::liveness,
    ),
    components(schemas(
        // Journey documents
        wreckshop_journey::types::Journey,
        wreckshop_journey::types::JourneyStatus,
        wreckshop_journey::types::Step,
        wreckshop_journey::types::StepType,
        wreckshop_journey::types::StepConfig,
        wreckshop_journey::types::TriggerConfig,
        wreckshop_journey::types::DelayConfig,
        wreckshop_journey::types::DelayUnit,
        wreckshop_journey::types::ConditionConfig,
        wreckshop_journey::types::EmailConfig,
        wreckshop_journey::types::SmsConfig,
        wreckshop_journey::types::BranchConfig,
        wreckshop_journey::types::ExitConfig,
        wreckshop_journey::types::WebhookConfig,
        wreckshop_journey::types::HttpMethod,
        wreckshop_journey::types::Edge,
        wreckshop_journey::types::Position,
        wreckshop_journey::types::StepMetric,
        wreckshop_journey::types::JourneyFunnel,
        wreckshop_journey::types::StepFunnel,
        // Request bodies
        wreckshop_journey::types::JourneyInput,
        wreckshop_journey::types::StepInput,
        wreckshop_journey::types::EdgeInput,
        // Audit and errors
        wreckshop_journey::audit::AuditEntry,
        wreckshop_journey::audit::AuditAction,
        wreckshop_journey::validation::ValidationErrors,
        crate::envelope::ErrorEnvelope,
        crate::rest::HealthResponse,
        crate::rest::PingResponse,
    ))
)]
pub struct ApiDoc;
