//! Journey definitions for the wreckshop dashboard: a graph of steps with a
//! draft → active → paused lifecycle, its validation, storage and audit trail.

pub mod audit;
pub mod engine;
pub mod error;
pub mod state_machine;
pub mod store;
pub mod types;
pub mod validation;

pub use audit::{AuditAction, AuditEntry, AuditLog};
pub use engine::JourneyEngine;
pub use error::{JourneyError, JourneyResult, CONCURRENT_MODIFICATION};
pub use state_machine::{JourneyStateMachine, LifecycleAction};
pub use store::{InMemoryJourneyStore, JourneyFilter, JourneyStore, Revision, StoreError, StoreResult};
pub use types::{Actor, Journey, JourneyFunnel, JourneyInput, JourneyStatus, Step, StepType};
pub use validation::{JourneyValidator, ValidationErrors};
