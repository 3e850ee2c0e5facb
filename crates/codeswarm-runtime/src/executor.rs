use async_trait::async_trait;
use codeswarm_types::{AgentState, SwarmEvent};

/// Result of one bounded agent turn.
#[derive(Debug, Clone, Default)]
pub struct TurnOutcome {
    /// Human-readable result; the runner truncates it into the
    /// AgentCompleteEvent summary
    pub summary: String,
}

impl TurnOutcome {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
        }
    }
}

/// The external component that runs one bounded model/tool interaction.
///
/// Contract:
/// - may update the in-memory state (chat history, connections) but must not
///   write the state journal; the runner persists after the turn;
/// - appends its own ToolCall / ToolResult / ModelRequest / ModelResponse /
///   TurnComplete events (and any further AgentMessage traffic) through the
///   event store;
/// - must be cancel-safe: the runner drops the future on shutdown;
/// - a returned error is surfaced as an AgentErrorEvent.
#[async_trait]
pub trait TurnExecutor: Send + Sync {
    async fn run_turn(
        &self,
        state: &mut AgentState,
        trigger: &SwarmEvent,
    ) -> anyhow::Result<TurnOutcome>;
}
