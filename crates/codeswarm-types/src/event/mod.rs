mod envelope;
mod payload;

pub use envelope::SwarmEvent;
pub use payload::{
    AgentCompletePayload, AgentErrorPayload, AgentMessagePayload, AgentStartPayload,
    ContentChangedPayload, EventPayload, HumanInputRequestPayload, HumanInputResponsePayload,
    ManualTriggerPayload, ModelRequestPayload, ModelResponsePayload, ToolCallPayload,
    ToolResultPayload, TurnCompletePayload,
};
