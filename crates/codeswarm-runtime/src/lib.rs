mod config;
mod discovery;
mod error;
mod executor;
mod gates;
mod reconciler;
mod runner;

pub use config::Config;
pub use discovery::{SourceDiscovery, SourceEntity};
pub use error::{Error, Result};
pub use executor::{TurnExecutor, TurnOutcome};
pub use reconciler::{OFFLINE_DRIFT_DIFF, ReconcileSummary, Reconciler};
pub use runner::AgentRunner;
