use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use wreckshop_core::config::JourneyConfig;

use crate::audit::{AuditAction, AuditEntry, AuditLog};
use crate::error::{JourneyError, JourneyResult};
use crate::state_machine::{check_publishable, JourneyStateMachine, LifecycleAction};
use crate::store::{InMemoryJourneyStore, JourneyFilter, JourneyStore, Revision};
use crate::types::{
    Actor, EdgeInput, Journey, JourneyFunnel, JourneyInput, JourneyStatus, StepInput, StepType,
};
use crate::validation::{JourneyValidator, ValidationLimits};

/// Owns journey documents and applies every operation on them: CRUD,
/// lifecycle transitions, duplication, and the audit trail.
#[derive(Clone)]
pub struct JourneyEngine {
    store: Arc<dyn JourneyStore>,
    audit: Arc<AuditLog>,
    validator: JourneyValidator,
    state_machine: JourneyStateMachine,
    list_limit: usize,
}

impl std::fmt::Debug for JourneyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JourneyEngine")
            .field("list_limit", &self.list_limit)
            .field("transitions", &self.state_machine.transitions.len())
            .finish()
    }
}

impl JourneyEngine {
    pub fn new(store: Arc<dyn JourneyStore>, config: &JourneyConfig) -> Self {
        Self {
            store,
            audit: Arc::new(AuditLog::new(config.audit_limit)),
            validator: JourneyValidator::new(ValidationLimits::from(config)),
            state_machine: JourneyStateMachine::new(),
            list_limit: config.list_limit,
        }
    }

    /// Engine over a fresh in-memory store.
    pub fn in_memory(config: &JourneyConfig) -> Self {
        Self::new(Arc::new(InMemoryJourneyStore::new()), config)
    }

    /// Validates `input` and stores it as a new journey. A journey created
    /// directly as `active` or `paused` must meet the publish preconditions.
    pub fn create(&self, input: JourneyInput, actor: &Actor) -> JourneyResult<Journey> {
        let changes = self.validator.validate_create(input)?;

        let mut journey = Journey::new(Uuid::new_v4(), String::new(), Utc::now());
        changes.apply_to(&mut journey);
        if journey.owner_profile_id.is_none() && !actor.is_anonymous() {
            journey.owner_profile_id = Some(actor.id().to_string());
        }
        if journey.status != JourneyStatus::Draft {
            check_publishable(&journey)?;
        }

        let journey = self.store.insert(journey)?;
        info!(
            journey_id = %journey.id,
            name = %journey.name,
            status = %journey.status,
            actor = %actor,
            "Created journey"
        );
        self.audit.record(
            AuditEntry::new(journey.id, actor, AuditAction::Create)
                .with_details(json!({ "name": &journey.name, "status": journey.status })),
        );
        Ok(journey)
    }

    /// Journeys whose name contains `query` (case-insensitive) and whose
    /// status equals `status`, most recently updated first. A status that is
    /// not a lifecycle state matches nothing.
    pub fn list(&self, query: Option<&str>, status: Option<&str>) -> JourneyResult<Vec<Journey>> {
        let status = match status.map(str::trim).filter(|s| !s.is_empty()) {
            None => None,
            Some(raw) => match raw.parse::<JourneyStatus>() {
                Ok(status) => Some(status),
                Err(_) => {
                    debug!(status = raw, "Unknown status filter, returning no journeys");
                    return Ok(Vec::new());
                }
            },
        };

        let filter = JourneyFilter::new(self.list_limit)
            .with_query(query)
            .with_status(status);
        Ok(self.store.list(&filter)?)
    }

    pub fn get(&self, id: Uuid) -> JourneyResult<Journey> {
        self.store
            .get(id)?
            .ok_or_else(|| JourneyError::NotFound(id.to_string()))
    }

    /// Applies a partial update to a draft. The status guard runs before the
    /// body is validated, so a non-draft journey always reports a conflict.
    pub fn update(&self, id: Uuid, input: JourneyInput, actor: &Actor) -> JourneyResult<Journey> {
        let current = self.editable(id)?;
        let changes = self.validator.validate_patch(input)?;
        let fields = changes.touched();

        let mut next = current.clone();
        changes.apply_to(&mut next);
        next.updated_at = Utc::now();

        let saved = self.store.replace(next, Revision::of(&current))?;
        info!(journey_id = %id, fields = ?fields, actor = %actor, "Updated journey");
        self.audit.record(
            AuditEntry::new(id, actor, AuditAction::Update).with_details(json!({ "fields": fields })),
        );
        Ok(saved)
    }

    /// Cheap round trip to the store, for readiness probes.
    pub fn check_store(&self) -> JourneyResult<()> {
        self.store.list(&JourneyFilter::new(1))?;
        Ok(())
    }

    /// The journey, if it exists and is still a draft.
    pub fn editable(&self, id: Uuid) -> JourneyResult<Journey> {
        let current = self.get(id)?;
        self.state_machine.ensure_editable(current.status)?;
        Ok(current)
    }

    /// draft → active, once the journey has a trigger step and a segment.
    pub fn publish(&self, id: Uuid, actor: &Actor) -> JourneyResult<Journey> {
        self.transition(id, LifecycleAction::Publish, actor)
    }

    /// active → paused.
    pub fn pause(&self, id: Uuid, actor: &Actor) -> JourneyResult<Journey> {
        self.transition(id, LifecycleAction::Pause, actor)
    }

    /// paused → active.
    pub fn resume(&self, id: Uuid, actor: &Actor) -> JourneyResult<Journey> {
        self.transition(id, LifecycleAction::Resume, actor)
    }

    fn transition(&self, id: Uuid, action: LifecycleAction, actor: &Actor) -> JourneyResult<Journey> {
        let current = self.get(id)?;
        let to = self.state_machine.next_status(current.status, action)?;
        if action == LifecycleAction::Publish {
            check_publishable(&current)?;
        }

        let mut next = current.clone();
        next.status = to;
        next.updated_at = Utc::now();

        let saved = self.store.replace(next, Revision::of(&current))?;
        info!(
            journey_id = %id,
            action = action.as_str(),
            from = %current.status,
            to = %to,
            actor = %actor,
            "Journey status changed"
        );
        let audit_action = match action {
            LifecycleAction::Publish => AuditAction::Publish,
            LifecycleAction::Pause => AuditAction::Pause,
            LifecycleAction::Resume => AuditAction::Resume,
        };
        self.audit
            .record(AuditEntry::new(id, actor, audit_action).transition(current.status, to));
        Ok(saved)
    }

    /// Stores a draft copy of the journey, whatever its status.
    pub fn duplicate(&self, id: Uuid, actor: &Actor) -> JourneyResult<Journey> {
        let source = self.get(id)?;
        let copy = self.store.insert(source.duplicate(Uuid::new_v4(), Utc::now()))?;
        info!(source_id = %id, journey_id = %copy.id, actor = %actor, "Duplicated journey");
        self.audit.record(
            AuditEntry::new(copy.id, actor, AuditAction::Duplicate)
                .copied_from(id)
                .transition(source.status, JourneyStatus::Draft),
        );
        Ok(copy)
    }

    /// Deletes the journey in any status.
    pub fn remove(&self, id: Uuid, actor: &Actor) -> JourneyResult<Journey> {
        let removed = self
            .store
            .remove(id)?
            .ok_or_else(|| JourneyError::NotFound(id.to_string()))?;
        info!(journey_id = %id, status = %removed.status, actor = %actor, "Deleted journey");
        self.audit.record(
            AuditEntry::new(id, actor, AuditAction::Delete)
                .with_details(json!({ "status": removed.status })),
        );
        Ok(removed)
    }

    pub fn funnel(&self, id: Uuid) -> JourneyResult<JourneyFunnel> {
        Ok(JourneyFunnel::from_journey(&self.get(id)?))
    }

    /// Every recorded mutation of the journey, oldest first. Survives deletion.
    pub fn audit_trail(&self, id: Uuid) -> Vec<AuditEntry> {
        self.audit.for_journey(id)
    }

    /// Creates a small set of example journeys, one per status, through the
    /// regular operations.
    pub fn seed_demo_journeys(&self) -> JourneyResult<Vec<Journey>> {
        let actor = Actor::new("demo-seed");

        let welcome = self.create(
            JourneyInput {
                name: Some("Welcome Series".into()),
                description: Some("Onboards new subscribers over their first week".into()),
                segment_id: Some("seg_new_subscribers".into()),
                trigger_key: Some("new-subscriber".into()),
                steps: Some(vec![
                    demo_step("t1", StepType::Trigger, json!({ "event": "new-subscriber" }), &["e1"]),
                    demo_step(
                        "e1",
                        StepType::Email,
                        json!({ "subject": "Welcome to the crew", "templateId": "tpl_welcome" }),
                        &["d1"],
                    ),
                    demo_step("d1", StepType::Delay, json!({ "amount": 2, "unit": "days" }), &["e2"]),
                    demo_step(
                        "e2",
                        StepType::Email,
                        json!({ "subject": "Your exclusive tracks", "templateId": "tpl_exclusives" }),
                        &["x1"],
                    ),
                    demo_step("x1", StepType::Exit, json!({}), &[]),
                ]),
                tags: Some(vec!["onboarding".into(), "email".into()]),
                ..Default::default()
            },
            &actor,
        )?;
        let welcome = self.publish(welcome.id, &actor)?;

        let presave = self.create(
            JourneyInput {
                name: Some("Pre-Save Campaign".into()),
                trigger_key: Some("presave-click".into()),
                steps: Some(vec![
                    demo_step("t1", StepType::Trigger, json!({ "event": "presave-click" }), &["s1"]),
                    demo_step(
                        "s1",
                        StepType::Sms,
                        json!({ "message": "Thanks for the pre-save! Drop day is Friday." }),
                        &["x1"],
                    ),
                    demo_step("x1", StepType::Exit, json!({}), &[]),
                ]),
                tags: Some(vec!["release".into()]),
                ..Default::default()
            },
            &actor,
        )?;

        let tour = self.create(
            JourneyInput {
                name: Some("Tour Announcement".into()),
                segment_id: Some("seg_superfans".into()),
                steps: Some(vec![
                    demo_step("t1", StepType::Trigger, json!({ "event": "tour-announced" }), &["c1"]),
                    demo_step(
                        "c1",
                        StepType::Condition,
                        json!({ "expression": "profile.city in tour.cities" }),
                        &["e1", "x1"],
                    ),
                    demo_step(
                        "e1",
                        StepType::Email,
                        json!({ "subject": "We're coming to your city" }),
                        &["x1"],
                    ),
                    demo_step("x1", StepType::Exit, json!({ "reason": "done" }), &[]),
                ]),
                tags: Some(vec!["tour".into()]),
                ..Default::default()
            },
            &actor,
        )?;
        let tour = self.publish(tour.id, &actor)?;
        let tour = self.pause(tour.id, &actor)?;

        info!(count = 3, "Seeded demo journeys");
        Ok(vec![welcome, presave, tour])
    }
}

fn demo_step(id: &str, step_type: StepType, config: serde_json::Value, next: &[&str]) -> StepInput {
    StepInput {
        id: Some(id.to_string()),
        step_type: Some(step_type.as_str().to_string()),
        name: None,
        config: Some(config),
        next: Some(
            next.iter()
                .map(|to| EdgeInput {
                    to: Some((*to).to_string()),
                    ..Default::default()
                })
                .collect(),
        ),
        position: None,
    }
}
