use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::payload::*;

/// A swarm event: the unit of causality.
///
/// Frozen after creation; the store assigns the row id at append time. The
/// envelope carries the shared routing trailer (correlation, from/to, tags,
/// path) extracted into typed columns by the store, while the flattened
/// payload holds the variant-specific fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmEvent {
    /// Producer timestamp; replay orders by (timestamp, id)
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,

    /// Cascade-grouping key, preserved across chained events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_agent: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_agent: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,

    /// Project-relative forward-slash path, when the event concerns a file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(flatten)]
    pub payload: EventPayload,

    /// Producer-specific extras, preserved verbatim across the store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl SwarmEvent {
    fn new(payload: EventPayload) -> Self {
        Self {
            timestamp: Utc::now(),
            correlation_id: None,
            from_agent: None,
            to_agent: None,
            tags: None,
            path: None,
            payload,
            metadata: None,
        }
    }

    pub fn content_changed(path: impl Into<String>, diff: Option<String>) -> Self {
        let mut event = Self::new(EventPayload::ContentChanged(ContentChangedPayload { diff }));
        event.path = Some(path.into());
        event
    }

    pub fn agent_message(
        from_agent: impl Into<String>,
        to_agent: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let mut event = Self::new(EventPayload::AgentMessage(AgentMessagePayload {
            content: content.into(),
        }));
        event.from_agent = Some(from_agent.into());
        event.to_agent = Some(to_agent.into());
        event
    }

    pub fn manual_trigger(to_agent: impl Into<String>, reason: impl Into<String>) -> Self {
        let mut event = Self::new(EventPayload::ManualTrigger(ManualTriggerPayload {
            reason: reason.into(),
        }));
        event.to_agent = Some(to_agent.into());
        event
    }

    /// Request ids must be unique so the matching response can be routed; a
    /// fresh v4 uuid is assigned here.
    pub fn human_input_request(
        agent_id: impl Into<String>,
        question: impl Into<String>,
        options: Option<Vec<String>>,
    ) -> Self {
        let agent_id = agent_id.into();
        let mut event = Self::new(EventPayload::HumanInputRequest(HumanInputRequestPayload {
            agent_id: agent_id.clone(),
            request_id: Uuid::new_v4().to_string(),
            question: question.into(),
            options,
        }));
        event.from_agent = Some(agent_id);
        event
    }

    pub fn human_input_response(
        request_id: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        Self::new(EventPayload::HumanInputResponse(HumanInputResponsePayload {
            request_id: request_id.into(),
            response: response.into(),
        }))
    }

    pub fn agent_start(agent_id: impl Into<String>, node_name: impl Into<String>) -> Self {
        Self::new(EventPayload::AgentStart(AgentStartPayload {
            agent_id: agent_id.into(),
            node_name: node_name.into(),
        }))
    }

    pub fn agent_complete(agent_id: impl Into<String>, result_summary: impl Into<String>) -> Self {
        Self::new(EventPayload::AgentComplete(AgentCompletePayload {
            agent_id: agent_id.into(),
            result_summary: result_summary.into(),
        }))
    }

    pub fn agent_error(agent_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self::new(EventPayload::AgentError(AgentErrorPayload {
            agent_id: agent_id.into(),
            error: error.into(),
        }))
    }

    pub fn tool_call(
        tool_name: impl Into<String>,
        call_id: impl Into<String>,
        arguments: Value,
    ) -> Self {
        Self::new(EventPayload::ToolCall(ToolCallPayload {
            tool_name: tool_name.into(),
            call_id: call_id.into(),
            arguments,
        }))
    }

    pub fn tool_result(
        tool_name: impl Into<String>,
        call_id: impl Into<String>,
        output: impl Into<String>,
        is_error: bool,
    ) -> Self {
        Self::new(EventPayload::ToolResult(ToolResultPayload {
            tool_name: tool_name.into(),
            call_id: call_id.into(),
            output: output.into(),
            is_error,
        }))
    }

    pub fn model_request(model: impl Into<String>) -> Self {
        Self::new(EventPayload::ModelRequest(ModelRequestPayload {
            model: model.into(),
        }))
    }

    pub fn model_response(model: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(EventPayload::ModelResponse(ModelResponsePayload {
            model: model.into(),
            text: text.into(),
        }))
    }

    pub fn turn_complete(agent_id: impl Into<String>, turn: u32) -> Self {
        Self::new(EventPayload::TurnComplete(TurnCompletePayload {
            agent_id: agent_id.into(),
            turn,
        }))
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Wire name of the payload variant.
    pub fn event_type(&self) -> &'static str {
        self.payload.event_type()
    }
}
