use chrono::{DateTime, Utc};
use codeswarm_types::SwarmEvent;

/// A persisted event row, decoded.
#[derive(Debug, Clone)]
pub struct EventRecord {
    pub id: i64,
    pub graph_id: String,
    pub event_type: String,
    /// Append time (store clock), distinct from the producer timestamp
    pub created_at: f64,
    pub event: SwarmEvent,
}

/// Replay predicates; all optional, conjunctive.
#[derive(Debug, Clone, Default)]
pub struct ReplayFilter {
    pub event_types: Option<Vec<String>>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    /// Tail by re-polling with the last seen row id
    pub after_id: Option<i64>,
}

impl ReplayFilter {
    pub fn event_types(mut self, event_types: Vec<String>) -> Self {
        self.event_types = Some(event_types);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn after_id(mut self, after_id: i64) -> Self {
        self.after_id = Some(after_id);
        self
    }
}

/// Aggregate row for one graph (swarm execution).
#[derive(Debug, Clone)]
pub struct GraphSummary {
    pub graph_id: String,
    pub started_at: f64,
    pub ended_at: f64,
    pub event_count: i64,
}

/// Epoch-second representation used by the REAL timestamp columns.
pub(crate) fn epoch_seconds(timestamp: DateTime<Utc>) -> f64 {
    timestamp.timestamp_micros() as f64 / 1_000_000.0
}
