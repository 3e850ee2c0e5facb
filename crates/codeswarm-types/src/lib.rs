mod agent;
mod event;
mod glob;
mod subscription;

pub use agent::{AgentRecord, AgentState, AgentStatus, ChatMessage, NodeType};
pub use event::{
    AgentCompletePayload, AgentErrorPayload, AgentMessagePayload, AgentStartPayload,
    ContentChangedPayload, EventPayload, HumanInputRequestPayload, HumanInputResponsePayload,
    ManualTriggerPayload, ModelRequestPayload, ModelResponsePayload, SwarmEvent, ToolCallPayload,
    ToolResultPayload, TurnCompletePayload,
};
pub use glob::glob_match;
pub use subscription::{Subscription, SubscriptionPattern, Trigger};

/// Epoch seconds with sub-second precision, the timestamp unit used by the
/// persistent stores and the state journal.
pub fn epoch_now() -> f64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
