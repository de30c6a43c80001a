//! Caller identity taken from the request.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use wreckshop_journey::Actor;

/// Header carrying the calling profile's id.
pub const ACTOR_HEADER: &str = "x-actor-id";

/// The request's [`Actor`]. Missing, blank or non-UTF-8 headers resolve to
/// the anonymous actor.
#[derive(Debug, Clone)]
pub struct CallerActor(pub Actor);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CallerActor
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let actor = parts
            .headers
            .get(ACTOR_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(Actor::new)
            .unwrap_or_else(Actor::anonymous);
        Ok(CallerActor(actor))
    }
}
