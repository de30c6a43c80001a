use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::validation::ValidationErrors;

/// A marketing-automation flow: a graph of steps plus a lifecycle status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Journey {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: JourneyStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_profile_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_key: Option<String>,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub metrics: Vec<StepMetric>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Revision counter, bumped by the store on every successful write.
    pub version: u64,
}

impl Journey {
    /// A fresh draft with no steps.
    pub fn new(id: Uuid, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            status: JourneyStatus::Draft,
            owner_profile_id: None,
            segment_id: None,
            trigger_key: None,
            steps: Vec::new(),
            metrics: Vec::new(),
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    pub fn has_trigger(&self) -> bool {
        self.steps.iter().any(|s| s.step_type == StepType::Trigger)
    }

    /// The segment id, ignoring blank values.
    pub fn target_segment(&self) -> Option<&str> {
        self.segment_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Copy of this journey as a new draft: " (Copy)" appended to the name,
    /// steps deep-copied and metrics cleared.
    pub fn duplicate(&self, id: Uuid, now: DateTime<Utc>) -> Journey {
        Journey {
            id,
            name: format!("{} (Copy)", self.name),
            description: self.description.clone(),
            status: JourneyStatus::Draft,
            owner_profile_id: self.owner_profile_id.clone(),
            segment_id: self.segment_id.clone(),
            trigger_key: self.trigger_key.clone(),
            steps: self.steps.clone(),
            metrics: Vec::new(),
            tags: self.tags.clone(),
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }
}

/// Lifecycle status of a journey.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JourneyStatus {
    Draft,
    Active,
    Paused,
}

impl JourneyStatus {
    pub const ALL: [JourneyStatus; 3] = [
        JourneyStatus::Draft,
        JourneyStatus::Active,
        JourneyStatus::Paused,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JourneyStatus::Draft => "draft",
            JourneyStatus::Active => "active",
            JourneyStatus::Paused => "paused",
        }
    }
}

impl fmt::Display for JourneyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JourneyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(JourneyStatus::Draft),
            "active" => Ok(JourneyStatus::Active),
            "paused" => Ok(JourneyStatus::Paused),
            other => Err(format!(
                "Invalid enum value. Expected 'draft' | 'active' | 'paused', received '{}'",
                other
            )),
        }
    }
}

/// A node in the journey graph.
///
/// `step_type` always agrees with the variant of `config`; build steps with
/// [`Step::new`] to keep it that way. Deserialization goes through
/// [`StepInput`] so a stored step is re-validated on the way in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", try_from = "StepInput")]
pub struct Step {
    pub id: String,
    #[serde(rename = "type")]
    pub step_type: StepType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub config: StepConfig,
    pub next: Vec<Edge>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

impl Step {
    pub fn new(id: impl Into<String>, config: StepConfig) -> Self {
        Self {
            id: id.into(),
            step_type: config.step_type(),
            name: None,
            config,
            next: Vec::new(),
            position: None,
        }
    }

    pub fn then(mut self, edge: Edge) -> Self {
        self.next.push(edge);
        self
    }
}

/// The kind of work a step describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StepType {
    Trigger,
    Delay,
    Condition,
    Email,
    Sms,
    Branch,
    Exit,
    Webhook,
}

impl StepType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::Trigger => "trigger",
            StepType::Delay => "delay",
            StepType::Condition => "condition",
            StepType::Email => "email",
            StepType::Sms => "sms",
            StepType::Branch => "branch",
            StepType::Exit => "exit",
            StepType::Webhook => "webhook",
        }
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trigger" => Ok(StepType::Trigger),
            "delay" => Ok(StepType::Delay),
            "condition" => Ok(StepType::Condition),
            "email" => Ok(StepType::Email),
            "sms" => Ok(StepType::Sms),
            "branch" => Ok(StepType::Branch),
            "exit" => Ok(StepType::Exit),
            "webhook" => Ok(StepType::Webhook),
            other => Err(format!(
                "Invalid enum value. Expected 'trigger' | 'delay' | 'condition' | 'email' | 'sms' | 'branch' | 'exit' | 'webhook', received '{}'",
                other
            )),
        }
    }
}

/// Per-type step configuration. Serialized without a tag: the owning
/// step's `type` field says which variant it is.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(untagged)]
pub enum StepConfig {
    Trigger(TriggerConfig),
    Delay(DelayConfig),
    Condition(ConditionConfig),
    Email(EmailConfig),
    Sms(SmsConfig),
    Branch(BranchConfig),
    Exit(ExitConfig),
    Webhook(WebhookConfig),
}

impl StepConfig {
    pub fn default_for(step_type: StepType) -> Self {
        match step_type {
            StepType::Trigger => StepConfig::Trigger(TriggerConfig::default()),
            StepType::Delay => StepConfig::Delay(DelayConfig::default()),
            StepType::Condition => StepConfig::Condition(ConditionConfig::default()),
            StepType::Email => StepConfig::Email(EmailConfig::default()),
            StepType::Sms => StepConfig::Sms(SmsConfig::default()),
            StepType::Branch => StepConfig::Branch(BranchConfig::default()),
            StepType::Exit => StepConfig::Exit(ExitConfig::default()),
            StepType::Webhook => StepConfig::Webhook(WebhookConfig::default()),
        }
    }

    pub fn step_type(&self) -> StepType {
        match self {
            StepConfig::Trigger(_) => StepType::Trigger,
            StepConfig::Delay(_) => StepType::Delay,
            StepConfig::Condition(_) => StepType::Condition,
            StepConfig::Email(_) => StepType::Email,
            StepConfig::Sms(_) => StepType::Sms,
            StepConfig::Branch(_) => StepType::Branch,
            StepConfig::Exit(_) => StepType::Exit,
            StepConfig::Webhook(_) => StepType::Webhook,
        }
    }
}

/// Configuration for the entry step of a journey.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TriggerConfig {
    /// Activation event, e.g. `new-subscriber`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub filters: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DelayConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<u64>,
    #[serde(default)]
    pub unit: DelayUnit,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DelayUnit {
    Minutes,
    #[default]
    Hours,
    Days,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConditionConfig {
    /// Stored as written; nothing in this service evaluates it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EmailConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SmsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BranchConfig {
    /// Edge label taken when no other branch applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ExitConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WebhookConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub method: HttpMethod,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    #[default]
    Post,
    Put,
    Patch,
    Delete,
}

/// A directed link from one step to another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    /// Target step id within the same journey.
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Uninterpreted branch expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl Edge {
    pub fn to(target: impl Into<String>) -> Self {
        Self {
            to: target.into(),
            label: None,
            condition: None,
        }
    }
}

/// Canvas position in the editor. Presentation only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Position {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
}

/// Aggregated funnel counters for one step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StepMetric {
    pub step_id: String,
    #[serde(default)]
    pub entered: u64,
    #[serde(default)]
    pub completed: u64,
    #[serde(default)]
    pub dropped: u64,
}

/// Funnel view over a journey's stored step metrics.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JourneyFunnel {
    pub journey_id: Uuid,
    pub total_entered: u64,
    pub steps: Vec<StepFunnel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StepFunnel {
    pub step_id: String,
    #[serde(rename = "type")]
    pub step_type: StepType,
    pub entered: u64,
    pub completed: u64,
    pub dropped: u64,
    pub completion_rate: f64,
}

impl JourneyFunnel {
    /// One row per step in step order. Steps with no metric report zeros.
    pub fn from_journey(journey: &Journey) -> Self {
        let steps: Vec<StepFunnel> = journey
            .steps
            .iter()
            .map(|step| {
                let metric = journey.metrics.iter().find(|m| m.step_id == step.id);
                let (entered, completed, dropped) = metric
                    .map(|m| (m.entered, m.completed, m.dropped))
                    .unwrap_or((0, 0, 0));
                let completion_rate = if entered > 0 {
                    completed as f64 / entered as f64
                } else {
                    0.0
                };
                StepFunnel {
                    step_id: step.id.clone(),
                    step_type: step.step_type,
                    entered,
                    completed,
                    dropped,
                    completion_rate,
                }
            })
            .collect();

        let total_entered = steps
            .iter()
            .filter(|s| s.step_type == StepType::Trigger)
            .map(|s| s.entered)
            .sum();

        Self {
            journey_id: journey.id,
            total_entered,
            steps,
        }
    }
}

/// Identity of whoever issued a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor(String);

impl Actor {
    pub const ANONYMOUS: &'static str = "anonymous";

    /// Blank ids collapse to the anonymous actor.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            Self::anonymous()
        } else {
            Self(trimmed.to_string())
        }
    }

    pub fn anonymous() -> Self {
        Self(Self::ANONYMOUS.to_string())
    }

    pub fn id(&self) -> &str {
        &self.0
    }

    pub fn is_anonymous(&self) -> bool {
        self.0 == Self::ANONYMOUS
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─── Request payloads ──────────────────────────────────────────────────────

/// Body of create and patch requests. Everything is optional here; which
/// fields are required is decided by the validator.
///
/// Request bodies are read with [`JourneyInput::from_json`], which records
/// wrongly typed fields instead of failing on the first one.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JourneyInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub owner_profile_id: Option<String>,
    pub segment_id: Option<String>,
    pub trigger_key: Option<String>,
    pub steps: Option<Vec<StepInput>>,
    pub tags: Option<Vec<String>>,
    #[serde(skip)]
    pub(crate) shape_errors: ValidationErrors,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StepInput {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub step_type: Option<String>,
    pub name: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub config: Option<serde_json::Value>,
    pub next: Option<Vec<EdgeInput>>,
    pub position: Option<Position>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EdgeInput {
    pub to: Option<String>,
    pub label: Option<String>,
    pub condition: Option<String>,
}
