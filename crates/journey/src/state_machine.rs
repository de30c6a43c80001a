use serde::{Deserialize, Serialize};

use crate::error::{JourneyError, JourneyResult};
use crate::types::{Journey, JourneyStatus};

pub const TRIGGER_REQUIRED: &str = "Journey must include a trigger step";
pub const SEGMENT_REQUIRED: &str = "Journey must have a target segment before publishing";
pub const ONLY_DRAFT_EDITABLE: &str = "Only draft journeys can be edited";

/// Lifecycle operations that move a journey between statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    Publish,
    Pause,
    Resume,
}

impl LifecycleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleAction::Publish => "publish",
            LifecycleAction::Pause => "pause",
            LifecycleAction::Resume => "resume",
        }
    }

    fn conflict_message(&self) -> &'static str {
        match self {
            LifecycleAction::Publish => "Only draft journeys can be published",
            LifecycleAction::Pause => "Only active journeys can be paused",
            LifecycleAction::Resume => "Only paused journeys can be resumed",
        }
    }
}

/// Describes a single valid status transition for a journey.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusTransition {
    pub from: JourneyStatus,
    pub to: JourneyStatus,
    pub action: LifecycleAction,
}

/// Guards the journey lifecycle by enforcing a finite set of valid status
/// transitions. There is no terminal status; deletion happens outside it.
#[derive(Debug, Clone)]
pub struct JourneyStateMachine {
    pub transitions: Vec<StatusTransition>,
}

impl JourneyStateMachine {
    pub fn new() -> Self {
        let transitions = vec![
            StatusTransition {
                from: JourneyStatus::Draft,
                to: JourneyStatus::Active,
                action: LifecycleAction::Publish,
            },
            StatusTransition {
                from: JourneyStatus::Active,
                to: JourneyStatus::Paused,
                action: LifecycleAction::Pause,
            },
            StatusTransition {
                from: JourneyStatus::Paused,
                to: JourneyStatus::Active,
                action: LifecycleAction::Resume,
            },
        ];

        Self { transitions }
    }

    /// Returns `true` if `action` is allowed from `from`.
    pub fn can_apply(&self, from: JourneyStatus, action: LifecycleAction) -> bool {
        self.transitions
            .iter()
            .any(|t| t.from == from && t.action == action)
    }

    /// The status `action` leads to from `from`, or a conflict naming the
    /// status the action requires.
    pub fn next_status(
        &self,
        from: JourneyStatus,
        action: LifecycleAction,
    ) -> JourneyResult<JourneyStatus> {
        self.transitions
            .iter()
            .find(|t| t.from == from && t.action == action)
            .map(|t| t.to)
            .ok_or_else(|| JourneyError::Conflict(action.conflict_message().to_string()))
    }

    /// Structural edits are only legal on drafts.
    pub fn ensure_editable(&self, status: JourneyStatus) -> JourneyResult<()> {
        if status == JourneyStatus::Draft {
            Ok(())
        } else {
            Err(JourneyError::Conflict(ONLY_DRAFT_EDITABLE.to_string()))
        }
    }
}

impl Default for JourneyStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

/// A journey can go live only with a trigger step and a target segment.
/// The trigger is checked first.
pub fn check_publishable(journey: &Journey) -> JourneyResult<()> {
    if !journey.has_trigger() {
        return Err(JourneyError::Precondition(TRIGGER_REQUIRED.to_string()));
    }
    if journey.target_segment().is_none() {
        return Err(JourneyError::Precondition(SEGMENT_REQUIRED.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Step, StepConfig, StepType};
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn table_covers_exactly_three_transitions() {
        let sm = JourneyStateMachine::new();
        let allowed: Vec<(JourneyStatus, LifecycleAction)> = JourneyStatus::ALL
            .iter()
            .flat_map(|s| {
                [
                    LifecycleAction::Publish,
                    LifecycleAction::Pause,
                    LifecycleAction::Resume,
                ]
                .into_iter()
                .map(move |a| (*s, a))
            })
            .filter(|(s, a)| sm.can_apply(*s, *a))
            .collect();

        assert_eq!(
            allowed,
            vec![
                (JourneyStatus::Draft, LifecycleAction::Publish),
                (JourneyStatus::Active, LifecycleAction::Pause),
                (JourneyStatus::Paused, LifecycleAction::Resume),
            ]
        );
    }

    #[test]
    fn illegal_action_names_required_state() {
        let sm = JourneyStateMachine::new();
        match sm.next_status(JourneyStatus::Paused, LifecycleAction::Pause) {
            Err(JourneyError::Conflict(msg)) => assert_eq!(msg, "Only active journeys can be paused"),
            other => panic!("expected conflict, got {:?}", other),
        }
        assert_eq!(
            sm.next_status(JourneyStatus::Paused, LifecycleAction::Resume).unwrap(),
            JourneyStatus::Active
        );
    }

    #[test]
    fn only_drafts_are_editable() {
        let sm = JourneyStateMachine::new();
        assert!(sm.ensure_editable(JourneyStatus::Draft).is_ok());
        assert!(matches!(
            sm.ensure_editable(JourneyStatus::Active),
            Err(JourneyError::Conflict(_))
        ));
        assert!(sm.ensure_editable(JourneyStatus::Paused).is_err());
    }

    #[test]
    fn publish_checks_trigger_before_segment() {
        let mut journey = Journey::new(Uuid::new_v4(), "Release Week", Utc::now());
        match check_publishable(&journey) {
            Err(JourneyError::Precondition(msg)) => assert_eq!(msg, TRIGGER_REQUIRED),
            other => panic!("unexpected {:?}", other),
        }

        journey.steps.push(Step::new("t1", StepConfig::default_for(StepType::Trigger)));
        match check_publishable(&journey) {
            Err(JourneyError::Precondition(msg)) => assert_eq!(msg, SEGMENT_REQUIRED),
            other => panic!("unexpected {:?}", other),
        }

        journey.segment_id = Some("seg_1".into());
        assert!(check_publishable(&journey).is_ok());
    }
}
