//! Boundary validation for journey payloads.
//!
//! Every violation in a body is collected before failing, keyed by a field
//! path such as `steps[2].next[0].to`, so callers can fix everything in one
//! round trip.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use wreckshop_core::config::JourneyConfig;

use crate::types::{
    Edge, EdgeInput, Journey, JourneyInput, JourneyStatus, Position, Step, StepConfig, StepInput,
    StepType,
};

const REQUIRED: &str = "Required";
const NOT_EMPTY: &str = "Must not be empty";
const MAX_SMS_LEN: usize = 1600;

/// Field-level validation failures, shaped like `{formErrors, fieldErrors}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidationErrors {
    pub form_errors: Vec<String>,
    pub field_errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.field_errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn add_form(&mut self, message: impl Into<String>) {
        self.form_errors.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.form_errors.is_empty() && self.field_errors.is_empty()
    }

    pub fn field(&self, field: &str) -> Option<&[String]> {
        self.field_errors.get(field).map(Vec::as_slice)
    }

    /// Folds in type mismatches found while reading the raw body. A wrongly
    /// typed field reports only the mismatch, not the checks nested under it.
    fn merge_shape(&mut self, shape: ValidationErrors) {
        self.field_errors
            .retain(|field, _| !shape.field_errors.keys().any(|bad| covers(bad, field)));
        self.field_errors.extend(shape.field_errors);
        self.form_errors.extend(shape.form_errors);
    }

    fn into_result<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

/// True when `field` is `parent` or a path below it.
fn covers(parent: &str, field: &str) -> bool {
    field
        .strip_prefix(parent)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('.') || rest.starts_with('['))
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self.form_errors.clone();
        for (field, messages) in &self.field_errors {
            parts.push(format!("{}: {}", field, messages.join(", ")));
        }
        f.write_str(&parts.join("; "))
    }
}

/// Size limits applied on top of the structural schema.
#[derive(Debug, Clone, Copy)]
pub struct ValidationLimits {
    pub max_steps: usize,
    pub max_tags: usize,
    pub max_name_len: usize,
}

impl From<&JourneyConfig> for ValidationLimits {
    fn from(config: &JourneyConfig) -> Self {
        Self {
            max_steps: config.max_steps,
            max_tags: config.max_tags,
            max_name_len: config.max_name_len,
        }
    }
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self::from(&JourneyConfig::default())
    }
}

/// A validated set of field changes. `None` means "leave as is".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JourneyChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<JourneyStatus>,
    pub owner_profile_id: Option<String>,
    pub segment_id: Option<String>,
    pub trigger_key: Option<String>,
    pub steps: Option<Vec<Step>>,
    pub tags: Option<Vec<String>>,
}

impl JourneyChanges {
    /// Names of the fields this change set touches, for logging.
    pub fn touched(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.name.is_some() {
            fields.push("name");
        }
        if self.description.is_some() {
            fields.push("description");
        }
        if self.status.is_some() {
            fields.push("status");
        }
        if self.owner_profile_id.is_some() {
            fields.push("ownerProfileId");
        }
        if self.segment_id.is_some() {
            fields.push("segmentId");
        }
        if self.trigger_key.is_some() {
            fields.push("triggerKey");
        }
        if self.steps.is_some() {
            fields.push("steps");
        }
        if self.tags.is_some() {
            fields.push("tags");
        }
        fields
    }

    pub fn apply_to(self, journey: &mut Journey) {
        if let Some(name) = self.name {
            journey.name = name;
        }
        if let Some(description) = self.description {
            journey.description = Some(description);
        }
        if let Some(status) = self.status {
            journey.status = status;
        }
        if let Some(owner) = self.owner_profile_id {
            journey.owner_profile_id = Some(owner);
        }
        if let Some(segment) = self.segment_id {
            journey.segment_id = Some(segment);
        }
        if let Some(key) = self.trigger_key {
            journey.trigger_key = Some(key);
        }
        if let Some(steps) = self.steps {
            journey.steps = steps;
        }
        if let Some(tags) = self.tags {
            journey.tags = tags;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Create,
    Patch,
}

/// Validates create and patch bodies against the journey schema.
#[derive(Debug, Clone, Default)]
pub struct JourneyValidator {
    limits: ValidationLimits,
}

impl JourneyValidator {
    pub fn new(limits: ValidationLimits) -> Self {
        Self { limits }
    }

    /// `name` is required; `status` may be any lifecycle state.
    pub fn validate_create(&self, input: JourneyInput) -> Result<JourneyChanges, ValidationErrors> {
        self.validate(input, Mode::Create)
    }

    /// Every field is optional; `status` may only restate `draft`.
    pub fn validate_patch(&self, input: JourneyInput) -> Result<JourneyChanges, ValidationErrors> {
        self.validate(input, Mode::Patch)
    }

    fn validate(&self, mut input: JourneyInput, mode: Mode) -> Result<JourneyChanges, ValidationErrors> {
        let shape = std::mem::take(&mut input.shape_errors);
        if !shape.form_errors.is_empty() {
            return Err(shape);
        }

        let mut errors = ValidationErrors::new();
        let mut changes = JourneyChanges::default();

        match input.name {
            None if mode == Mode::Create => errors.add("name", REQUIRED),
            None => {}
            Some(name) => {
                if name.trim().is_empty() {
                    errors.add("name", NOT_EMPTY);
                } else if name.chars().count() > self.limits.max_name_len {
                    errors.add(
                        "name",
                        format!("Must be at most {} characters", self.limits.max_name_len),
                    );
                } else {
                    changes.name = Some(name);
                }
            }
        }

        changes.description = input.description;

        if let Some(raw) = input.status {
            match raw.parse::<JourneyStatus>() {
                Ok(JourneyStatus::Draft) => changes.status = Some(JourneyStatus::Draft),
                Ok(_) if mode == Mode::Patch => errors.add(
                    "status",
                    "Status can only change through publish, pause and resume",
                ),
                Ok(status) => changes.status = Some(status),
                Err(message) => errors.add("status", message),
            }
        }

        changes.owner_profile_id = non_blank("ownerProfileId", input.owner_profile_id, &mut errors);
        changes.segment_id = non_blank("segmentId", input.segment_id, &mut errors);
        changes.trigger_key = non_blank("triggerKey", input.trigger_key, &mut errors);

        if let Some(steps) = input.steps {
            changes.steps = self.validate_steps(steps, &mut errors);
        }

        if let Some(tags) = input.tags {
            changes.tags = self.validate_tags(tags, &mut errors);
        }

        errors.merge_shape(shape);
        errors.into_result(changes)
    }

    fn validate_steps(&self, inputs: Vec<StepInput>, errors: &mut ValidationErrors) -> Option<Vec<Step>> {
        if inputs.len() > self.limits.max_steps {
            errors.add(
                "steps",
                format!("At most {} steps are allowed", self.limits.max_steps),
            );
            return None;
        }

        let mut valid = true;

        // Edge targets are resolved against every id the caller sent, even
        // ids on steps that are invalid for other reasons.
        let known: HashSet<String> = inputs
            .iter()
            .filter_map(|s| s.id.as_deref())
            .map(str::to_string)
            .collect();

        let mut seen: HashSet<String> = HashSet::new();
        let mut steps = Vec::with_capacity(inputs.len());

        for (index, input) in inputs.into_iter().enumerate() {
            let prefix = format!("steps[{}]", index);

            if let Some(id) = input.id.as_deref() {
                if !id.trim().is_empty() && !seen.insert(id.to_string()) {
                    errors.add(format!("{}.id", prefix), format!("Duplicate step id '{}'", id));
                    valid = false;
                }
            }

            if let Some(next) = input.next.as_ref() {
                for (edge_index, edge) in next.iter().enumerate() {
                    if let Some(to) = edge.to.as_deref() {
                        if !to.trim().is_empty() && !known.contains(to) {
                            errors.add(
                                format!("{}.next[{}].to", prefix, edge_index),
                                format!("Unknown step id '{}'", to),
                            );
                            valid = false;
                        }
                    }
                }
            }

            match parse_step(input) {
                Ok(step) => steps.push(step),
                Err(problems) => {
                    for (field, message) in problems {
                        errors.add(format!("{}.{}", prefix, field), message);
                    }
                    valid = false;
                }
            }
        }

        valid.then_some(steps)
    }

    fn validate_tags(&self, tags: Vec<String>, errors: &mut ValidationErrors) -> Option<Vec<String>> {
        if tags.len() > self.limits.max_tags {
            errors.add("tags", format!("At most {} tags are allowed", self.limits.max_tags));
            return None;
        }

        let mut clean: Vec<String> = Vec::with_capacity(tags.len());
        let mut valid = true;
        for (index, tag) in tags.iter().enumerate() {
            let trimmed = tag.trim();
            if trimmed.is_empty() {
                errors.add(format!("tags[{}]", index), NOT_EMPTY);
                valid = false;
            } else if !clean.iter().any(|t| t == trimmed) {
                clean.push(trimmed.to_string());
            }
        }
        valid.then_some(clean)
    }
}

fn non_blank(field: &str, value: Option<String>, errors: &mut ValidationErrors) -> Option<String> {
    match value {
        Some(v) if v.trim().is_empty() => {
            errors.add(field, NOT_EMPTY);
            None
        }
        other => other,
    }
}

/// Validates one step in isolation. Problems are keyed relative to the step
/// (`id`, `type`, `config.amount`, `next[0].to`).
fn parse_step(input: StepInput) -> Result<Step, Vec<(String, String)>> {
    let mut problems: Vec<(String, String)> = Vec::new();

    let id = match input.id {
        None => {
            problems.push(("id".into(), REQUIRED.into()));
            None
        }
        Some(id) if id.trim().is_empty() => {
            problems.push(("id".into(), NOT_EMPTY.into()));
            None
        }
        Some(id) => Some(id),
    };

    let step_type = match input.step_type.as_deref() {
        None => {
            problems.push(("type".into(), REQUIRED.into()));
            None
        }
        Some(raw) => match raw.parse::<StepType>() {
            Ok(t) => Some(t),
            Err(message) => {
                problems.push(("type".into(), message));
                None
            }
        },
    };

    let config = step_type.and_then(|t| match parse_config(t, input.config) {
        Ok(config) => {
            for (field, message) in config_problems(&config) {
                problems.push((format!("config.{}", field), message));
            }
            Some(config)
        }
        Err(message) => {
            problems.push(("config".into(), message));
            None
        }
    });

    let mut next = Vec::new();
    for (index, edge) in input.next.unwrap_or_default().into_iter().enumerate() {
        match parse_edge(edge) {
            Ok(edge) => next.push(edge),
            Err(message) => problems.push((format!("next[{}].to", index), message.into())),
        }
    }

    match (id, config) {
        (Some(id), Some(config)) if problems.is_empty() => Ok(Step {
            id,
            step_type: config.step_type(),
            name: input.name,
            config,
            next,
            position: input.position,
        }),
        _ => Err(problems),
    }
}

fn parse_edge(input: EdgeInput) -> Result<Edge, &'static str> {
    match input.to {
        None => Err(REQUIRED),
        Some(to) if to.trim().is_empty() => Err(NOT_EMPTY),
        Some(to) => Ok(Edge {
            to,
            label: input.label,
            condition: input.condition,
        }),
    }
}

/// Reads a raw config payload as the variant `step_type` calls for.
/// A missing or `null` payload yields that variant's defaults.
pub fn parse_config(
    step_type: StepType,
    raw: Option<Value>,
) -> Result<StepConfig, String> {
    let raw = match raw {
        None | Some(Value::Null) => return Ok(StepConfig::default_for(step_type)),
        Some(raw) => raw,
    };

    let parsed = match step_type {
        StepType::Trigger => serde_json::from_value(raw).map(StepConfig::Trigger),
        StepType::Delay => serde_json::from_value(raw).map(StepConfig::Delay),
        StepType::Condition => serde_json::from_value(raw).map(StepConfig::Condition),
        StepType::Email => serde_json::from_value(raw).map(StepConfig::Email),
        StepType::Sms => serde_json::from_value(raw).map(StepConfig::Sms),
        StepType::Branch => serde_json::from_value(raw).map(StepConfig::Branch),
        StepType::Exit => serde_json::from_value(raw).map(StepConfig::Exit),
        StepType::Webhook => serde_json::from_value(raw).map(StepConfig::Webhook),
    };

    parsed.map_err(|e| format!("Invalid {} config: {}", step_type, e))
}

/// Semantic checks that the config's shape alone cannot express.
fn config_problems(config: &StepConfig) -> Vec<(&'static str, String)> {
    let mut problems = Vec::new();
    match config {
        StepConfig::Delay(delay) => {
            if delay.amount == Some(0) {
                problems.push(("amount", "Must be greater than 0".to_string()));
            }
        }
        StepConfig::Condition(condition) => {
            if matches!(condition.expression.as_deref(), Some(e) if e.trim().is_empty()) {
                problems.push(("expression", NOT_EMPTY.to_string()));
            }
        }
        StepConfig::Sms(sms) => {
            if let Some(message) = sms.message.as_deref() {
                if message.chars().count() > MAX_SMS_LEN {
                    problems.push((
                        "message",
                        format!("Must be at most {} characters", MAX_SMS_LEN),
                    ));
                }
            }
        }
        StepConfig::Webhook(webhook) => {
            if let Some(url) = webhook.url.as_deref() {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    problems.push(("url", "Must be an http(s) URL".to_string()));
                }
            }
        }
        StepConfig::Trigger(_)
        | StepConfig::Email(_)
        | StepConfig::Branch(_)
        | StepConfig::Exit(_) => {}
    }
    problems
}

// ─── Raw bodies ─────────────────────────────────────────────────────────

type JsonObject = serde_json::Map<String, Value>;

impl JourneyInput {
    /// Reads a request body field by field. A field of the wrong JSON type
    /// is left unset and recorded under its path (`name`, `steps[0].id`,
    /// `steps[0].position.x`), so validation reports it along with every
    /// other problem in the body. Unknown keys are ignored.
    pub fn from_json(raw: Value) -> Self {
        let mut shape = ValidationErrors::new();
        let body = match raw {
            Value::Object(body) => body,
            other => {
                shape.add_form(expected("object", &other));
                return Self {
                    shape_errors: shape,
                    ..Self::default()
                };
            }
        };

        Self {
            name: read_string(&body, "name", "", &mut shape),
            description: read_string(&body, "description", "", &mut shape),
            status: read_string(&body, "status", "", &mut shape),
            owner_profile_id: read_string(&body, "ownerProfileId", "", &mut shape),
            segment_id: read_string(&body, "segmentId", "", &mut shape),
            trigger_key: read_string(&body, "triggerKey", "", &mut shape),
            steps: read_array(&body, "steps", "", &mut shape, read_step),
            tags: read_array(&body, "tags", "", &mut shape, read_tag),
            shape_errors: shape,
        }
    }
}

fn expected(kind: &str, found: &Value) -> String {
    let received = match found {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    format!("Expected {}, received {}", kind, received)
}

fn field_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

/// `null` reads as absent.
fn present<'a>(object: &'a JsonObject, key: &str) -> Option<&'a Value> {
    object.get(key).filter(|v| !v.is_null())
}

fn read_string(
    object: &JsonObject,
    key: &str,
    prefix: &str,
    shape: &mut ValidationErrors,
) -> Option<String> {
    match present(object, key)? {
        Value::String(s) => Some(s.clone()),
        other => {
            shape.add(field_path(prefix, key), expected("string", other));
            None
        }
    }
}

fn read_number(
    object: &JsonObject,
    key: &str,
    prefix: &str,
    shape: &mut ValidationErrors,
) -> Option<f64> {
    match present(object, key)? {
        Value::Number(n) => n.as_f64(),
        other => {
            shape.add(field_path(prefix, key), expected("number", other));
            None
        }
    }
}

/// Items keep their index: a wrongly typed item becomes a placeholder whose
/// own follow-on errors are dropped by [`ValidationErrors::merge_shape`].
fn read_array<T>(
    object: &JsonObject,
    key: &str,
    prefix: &str,
    shape: &mut ValidationErrors,
    read_item: fn(&Value, &str, &mut ValidationErrors) -> T,
) -> Option<Vec<T>> {
    let path = field_path(prefix, key);
    match present(object, key)? {
        Value::Array(items) => Some(
            items
                .iter()
                .enumerate()
                .map(|(index, item)| read_item(item, &format!("{}[{}]", path, index), shape))
                .collect(),
        ),
        other => {
            shape.add(path, expected("array", other));
            None
        }
    }
}

fn read_tag(item: &Value, path: &str, shape: &mut ValidationErrors) -> String {
    match item {
        Value::String(tag) => tag.clone(),
        other => {
            shape.add(path, expected("string", other));
            String::new()
        }
    }
}

fn read_step(item: &Value, path: &str, shape: &mut ValidationErrors) -> StepInput {
    let Value::Object(step) = item else {
        shape.add(path, expected("object", item));
        return StepInput::default();
    };
    StepInput {
        id: read_string(step, "id", path, shape),
        step_type: read_string(step, "type", path, shape),
        name: read_string(step, "name", path, shape),
        // Checked against the step type by `parse_config`.
        config: present(step, "config").cloned(),
        next: read_array(step, "next", path, shape, read_edge),
        position: read_position(step, path, shape),
    }
}

fn read_edge(item: &Value, path: &str, shape: &mut ValidationErrors) -> EdgeInput {
    let Value::Object(edge) = item else {
        shape.add(path, expected("object", item));
        return EdgeInput::default();
    };
    EdgeInput {
        to: read_string(edge, "to", path, shape),
        label: read_string(edge, "label", path, shape),
        condition: read_string(edge, "condition", path, shape),
    }
}

fn read_position(step: &JsonObject, prefix: &str, shape: &mut ValidationErrors) -> Option<Position> {
    let path = field_path(prefix, "position");
    match present(step, "position")? {
        Value::Object(position) => Some(Position {
            x: read_number(position, "x", &path, shape),
            y: read_number(position, "y", &path, shape),
        }),
        other => {
            shape.add(path, expected("object", other));
            None
        }
    }
}

impl TryFrom<StepInput> for Step {
    type Error = String;

    fn try_from(input: StepInput) -> Result<Self, Self::Error> {
        parse_step(input).map_err(|problems| {
            problems
                .into_iter()
                .map(|(field, message)| format!("{}: {}", field, message))
                .collect::<Vec<_>>()
                .join("; ")
        })
    }
}
