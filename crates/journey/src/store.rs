//! Journey persistence.
//!
//! The engine talks to a [`JourneyStore`]; the in-memory implementation is
//! backed by DashMap and is what the service runs with today. A document
//! database can slot in behind the same trait as long as `replace` stays a
//! single conditional write.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::types::{Journey, JourneyStatus};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("journey {0} does not exist")]
    Missing(Uuid),

    #[error("journey {id} changed since it was read (expected version {expected}, found {found})")]
    StaleRevision { id: Uuid, expected: u64, found: u64 },

    #[error("journey {0} already exists")]
    DuplicateId(Uuid),

    /// Unclassified backend failure, reported verbatim.
    #[error("{0}")]
    Backend(String),
}

/// What a writer last saw of a journey. A conditional write only lands if
/// the stored document still matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Revision {
    pub version: u64,
    pub status: JourneyStatus,
}

impl Revision {
    pub fn of(journey: &Journey) -> Self {
        Self {
            version: journey.version,
            status: journey.status,
        }
    }
}

/// Optional list filters. `query` is matched case-insensitively against the
/// name; results are capped at `limit`.
#[derive(Debug, Clone)]
pub struct JourneyFilter {
    query: Option<String>,
    pub status: Option<JourneyStatus>,
    pub limit: usize,
}

impl JourneyFilter {
    pub fn new(limit: usize) -> Self {
        Self {
            query: None,
            status: None,
            limit,
        }
    }

    /// Blank queries are ignored.
    pub fn with_query(mut self, query: Option<&str>) -> Self {
        self.query = query
            .map(|q| q.trim().to_lowercase())
            .filter(|q| !q.is_empty());
        self
    }

    pub fn with_status(mut self, status: Option<JourneyStatus>) -> Self {
        self.status = status;
        self
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn matches(&self, journey: &Journey) -> bool {
        if let Some(status) = self.status {
            if journey.status != status {
                return false;
            }
        }
        match &self.query {
            Some(q) => journey.name.to_lowercase().contains(q.as_str()),
            None => true,
        }
    }
}

/// Single-document persistence for journeys.
pub trait JourneyStore: Send + Sync {
    /// Stores a new journey. Fails if the id is taken.
    fn insert(&self, journey: Journey) -> StoreResult<Journey>;

    fn get(&self, id: Uuid) -> StoreResult<Option<Journey>>;

    /// Matching journeys, most recently updated first, at most `filter.limit`.
    fn list(&self, filter: &JourneyFilter) -> StoreResult<Vec<Journey>>;

    /// Overwrites the journey with `next` if the stored copy still has
    /// revision `expected`, bumping the version. Returns what was stored.
    fn replace(&self, next: Journey, expected: Revision) -> StoreResult<Journey>;

    /// Deletes and returns the journey, or `None` if there was none.
    fn remove(&self, id: Uuid) -> StoreResult<Option<Journey>>;
}

/// Thread-safe in-memory journey store.
#[derive(Debug, Default)]
pub struct InMemoryJourneyStore {
    journeys: DashMap<Uuid, Journey>,
}

impl InMemoryJourneyStore {
    pub fn new() -> Self {
        Self {
            journeys: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.journeys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.journeys.is_empty()
    }
}

impl JourneyStore for InMemoryJourneyStore {
    fn insert(&self, journey: Journey) -> StoreResult<Journey> {
        match self.journeys.entry(journey.id) {
            Entry::Occupied(_) => Err(StoreError::DuplicateId(journey.id)),
            Entry::Vacant(slot) => {
                slot.insert(journey.clone());
                Ok(journey)
            }
        }
    }

    fn get(&self, id: Uuid) -> StoreResult<Option<Journey>> {
        Ok(self.journeys.get(&id).map(|r| r.value().clone()))
    }

    fn list(&self, filter: &JourneyFilter) -> StoreResult<Vec<Journey>> {
        let mut journeys: Vec<Journey> = self
            .journeys
            .iter()
            .filter(|r| filter.matches(r.value()))
            .map(|r| r.value().clone())
            .collect();
        journeys.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        journeys.truncate(filter.limit);
        Ok(journeys)
    }

    fn replace(&self, mut next: Journey, expected: Revision) -> StoreResult<Journey> {
        let id = next.id;
        // The shard lock is held from the revision check through the write.
        let mut entry = self.journeys.get_mut(&id).ok_or(StoreError::Missing(id))?;
        let found = Revision::of(entry.value());
        if found != expected {
            debug!(journey_id = %id, expected = expected.version, found = found.version, "Rejected stale write");
            return Err(StoreError::StaleRevision {
                id,
                expected: expected.version,
                found: found.version,
            });
        }
        next.version = found.version + 1;
        *entry.value_mut() = next.clone();
        Ok(next)
    }

    fn remove(&self, id: Uuid) -> StoreResult<Option<Journey>> {
        Ok(self.journeys.remove(&id).map(|(_, journey)| journey))
    }
}
