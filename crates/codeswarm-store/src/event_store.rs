use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use codeswarm_types::{SwarmEvent, Trigger};
use rusqlite::Connection;
use tokio::sync::mpsc;

use crate::{
    Error, EventBus, Result, SubscriptionRegistry,
    records::{EventRecord, GraphSummary, ReplayFilter},
    queries, schema,
};

/// Append-only persistent event log with reactive trigger dispatch.
///
/// Append is the only write path: the row is committed first, then the
/// subscription registry resolves the matching agents and one trigger per
/// match is pushed onto the internal queue, then the event fans out to the
/// in-memory bus. A crash after commit loses the triggers but never the
/// event; reconciliation re-derives the missed work at next startup.
pub struct EventStore {
    db: Arc<Mutex<Connection>>,
    subscriptions: Option<SubscriptionRegistry>,
    bus: Option<EventBus>,
    trigger_tx: Option<mpsc::UnboundedSender<Trigger>>,
    trigger_rx: Mutex<Option<mpsc::UnboundedReceiver<Trigger>>>,
}

impl EventStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        schema::init_events_schema(&conn)?;
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::init_events_schema(&conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
            subscriptions: None,
            bus: None,
            trigger_tx: None,
            trigger_rx: Mutex::new(None),
        }
    }

    /// Attach a subscription registry; this is what arms the trigger queue.
    pub fn with_subscriptions(mut self, subscriptions: SubscriptionRegistry) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscriptions = Some(subscriptions);
        self.trigger_tx = Some(tx);
        self.trigger_rx = Mutex::new(Some(rx));
        self
    }

    /// Attach an event bus; every appended event is published after commit.
    pub fn with_bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    async fn run<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let conn = db.lock().unwrap();
            f(&conn)
        })
        .await?
    }

    /// Persist an event and dispatch its downstream effects. Returns the
    /// assigned event id.
    pub async fn append(&self, graph_id: &str, event: SwarmEvent) -> Result<i64> {
        let graph_id = graph_id.to_string();
        let row_event = event.clone();
        let event_id = self
            .run(move |conn| queries::event::insert(conn, &graph_id, &row_event))
            .await?;

        if let (Some(subscriptions), Some(tx)) = (&self.subscriptions, &self.trigger_tx) {
            let matching = subscriptions.get_matching_agents(&event).await?;
            for agent_id in matching {
                // The runner may already be gone during shutdown; triggers
                // are droppable by contract.
                let _ = tx.send(Trigger {
                    agent_id,
                    event_id,
                    event: event.clone(),
                });
            }
        }

        if let Some(bus) = &self.bus {
            bus.emit(event);
        }

        Ok(event_id)
    }

    /// Hand out the single consumer end of the trigger queue. There is one
    /// runner per store; a second take is an error, as is taking from a
    /// store with no subscription registry attached.
    pub fn take_triggers(&self) -> Result<mpsc::UnboundedReceiver<Trigger>> {
        if self.trigger_tx.is_none() {
            return Err(Error::Invalid(
                "trigger queue not armed: no subscription registry attached".to_string(),
            ));
        }
        self.trigger_rx
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| Error::Invalid("trigger queue already taken".to_string()))
    }

    /// Historical events for one graph, ordered by (timestamp, id).
    pub async fn replay(&self, graph_id: &str, filter: ReplayFilter) -> Result<Vec<EventRecord>> {
        let graph_id = graph_id.to_string();
        self.run(move |conn| queries::event::replay(conn, &graph_id, &filter))
            .await
    }

    pub async fn event_count(&self, graph_id: &str) -> Result<i64> {
        let graph_id = graph_id.to_string();
        self.run(move |conn| queries::event::count(conn, &graph_id))
            .await
    }

    pub async fn graph_summaries(
        &self,
        limit: usize,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<GraphSummary>> {
        self.run(move |conn| queries::event::graph_summaries(conn, limit, since))
            .await
    }

    pub async fn delete_graph(&self, graph_id: &str) -> Result<usize> {
        let graph_id = graph_id.to_string();
        self.run(move |conn| queries::event::delete_graph(conn, &graph_id))
            .await
    }
}
