// Event sourcing + routing persistence
// Three SQLite databases (events, subscriptions, agents) plus the per-agent
// state journals; each database is reached only through its own handle.

mod bus;
mod error;
mod event_store;
mod queries;
mod records;
mod registry;
mod schema;
mod state;
mod subscriptions;

pub use bus::{DEFAULT_BUS_CAPACITY, EventBus, EventStream, SubscriberHandle};
pub use error::{Error, Result};
pub use event_store::EventStore;
pub use records::{EventRecord, GraphSummary, ReplayFilter};
pub use registry::SwarmRegistry;
pub use state::AgentStateStore;
pub use subscriptions::SubscriptionRegistry;
