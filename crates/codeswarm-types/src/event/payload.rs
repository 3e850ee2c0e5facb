use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event payload variants.
///
/// The tag string is the wire name: it is what the event store persists in
/// the `event_type` column and what subscription patterns list under
/// `event_types`. Internally tagged so that payload fields sit flat next to
/// the routing trailer after the envelope flattens this enum in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventPayload {
    /// A file on disk changed (watcher or offline-drift reconciliation)
    #[serde(rename = "ContentChangedEvent")]
    ContentChanged(ContentChangedPayload),

    /// Inter-agent message (routing fields live on the envelope)
    #[serde(rename = "AgentMessageEvent")]
    AgentMessage(AgentMessagePayload),

    /// Operator request to poke a specific agent
    #[serde(rename = "ManualTriggerEvent")]
    ManualTrigger(ManualTriggerPayload),

    /// An agent is blocked on a human answer
    #[serde(rename = "HumanInputRequestEvent")]
    HumanInputRequest(HumanInputRequestPayload),

    /// Human answer for a prior request
    #[serde(rename = "HumanInputResponseEvent")]
    HumanInputResponse(HumanInputResponsePayload),

    /// Turn lifecycle: agent picked up a trigger
    #[serde(rename = "AgentStartEvent")]
    AgentStart(AgentStartPayload),

    /// Turn lifecycle: turn finished cleanly
    #[serde(rename = "AgentCompleteEvent")]
    AgentComplete(AgentCompletePayload),

    /// Turn lifecycle: turn failed or state was unavailable
    #[serde(rename = "AgentErrorEvent")]
    AgentError(AgentErrorPayload),

    /// Executor-produced: a tool was invoked
    #[serde(rename = "ToolCallEvent")]
    ToolCall(ToolCallPayload),

    /// Executor-produced: a tool returned
    #[serde(rename = "ToolResultEvent")]
    ToolResult(ToolResultPayload),

    /// Executor-produced: a model request went out
    #[serde(rename = "ModelRequestEvent")]
    ModelRequest(ModelRequestPayload),

    /// Executor-produced: a model response came back
    #[serde(rename = "ModelResponseEvent")]
    ModelResponse(ModelResponsePayload),

    /// Executor-produced: one bounded interaction turn ended
    #[serde(rename = "TurnCompleteEvent")]
    TurnComplete(TurnCompletePayload),
}

impl EventPayload {
    /// Wire name of this variant (the `event_type` column value).
    pub fn event_type(&self) -> &'static str {
        match self {
            EventPayload::ContentChanged(_) => "ContentChangedEvent",
            EventPayload::AgentMessage(_) => "AgentMessageEvent",
            EventPayload::ManualTrigger(_) => "ManualTriggerEvent",
            EventPayload::HumanInputRequest(_) => "HumanInputRequestEvent",
            EventPayload::HumanInputResponse(_) => "HumanInputResponseEvent",
            EventPayload::AgentStart(_) => "AgentStartEvent",
            EventPayload::AgentComplete(_) => "AgentCompleteEvent",
            EventPayload::AgentError(_) => "AgentErrorEvent",
            EventPayload::ToolCall(_) => "ToolCallEvent",
            EventPayload::ToolResult(_) => "ToolResultEvent",
            EventPayload::ModelRequest(_) => "ModelRequestEvent",
            EventPayload::ModelResponse(_) => "ModelResponseEvent",
            EventPayload::TurnComplete(_) => "TurnCompleteEvent",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentChangedPayload {
    /// Unified diff of the change, when the producer has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMessagePayload {
    /// Message body
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualTriggerPayload {
    /// Operator-supplied reason, surfaced in the UI stream
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HumanInputRequestPayload {
    pub agent_id: String,
    /// Unique id echoed back by the matching response
    pub request_id: String,
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HumanInputResponsePayload {
    pub request_id: String,
    pub response: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStartPayload {
    pub agent_id: String,
    /// Qualified name of the code entity the agent is bound to
    pub node_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentCompletePayload {
    pub agent_id: String,
    /// Truncated summary of the turn result
    #[serde(default)]
    pub result_summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentErrorPayload {
    pub agent_id: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallPayload {
    pub tool_name: String,
    /// Correlates the result back to this call
    pub call_id: String,
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResultPayload {
    pub tool_name: String,
    pub call_id: String,
    pub output: String,
    #[serde(default)]
    pub is_error: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRequestPayload {
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResponsePayload {
    pub model: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnCompletePayload {
    pub agent_id: String,
    /// 1-based turn counter within the bounded interaction
    pub turn: u32,
}
