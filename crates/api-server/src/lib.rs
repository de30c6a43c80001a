#![warn(clippy::unwrap_used)]

pub mod actor;
pub mod envelope;
pub mod journey_rest;
pub mod rest;
pub mod server;
pub mod swagger;

pub use envelope::{ApiEnvelope, ApiError};
pub use rest::AppState;
pub use server::{build_router, ApiServer};
pub use swagger::ApiDoc;
