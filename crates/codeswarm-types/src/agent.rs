use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::epoch_now;
use crate::subscription::SubscriptionPattern;

/// Kind of code entity an agent is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Function,
    Class,
    Method,
    File,
    Module,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Function => "function",
            NodeType::Class => "class",
            NodeType::Method => "method",
            NodeType::File => "file",
            NodeType::Module => "module",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "function" => Some(NodeType::Function),
            "class" => Some(NodeType::Class),
            "method" => Some(NodeType::Method),
            "file" => Some(NodeType::File),
            "module" => Some(NodeType::Module),
            _ => None,
        }
    }
}

/// Registry status; orphaning never deletes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Active,
    Orphaned,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Active => "active",
            AgentStatus::Orphaned => "orphaned",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(AgentStatus::Active),
            "orphaned" => Some(AgentStatus::Orphaned),
            _ => None,
        }
    }
}

/// Registry row for one agent. `agent_id` is the content-addressed entity
/// hash and stays stable across restarts for the same source entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRecord {
    pub agent_id: String,
    pub node_type: NodeType,
    pub name: String,
    pub full_name: String,
    /// Project-relative forward-slash path
    pub file_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub start_line: u32,
    pub end_line: u32,
    pub status: AgentStatus,
    pub created_at: f64,
    pub updated_at: f64,
}

/// One chat turn kept in an agent's rolling history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Per-agent mutable runtime state, persisted as an append-only journal
/// (one JSON line per save, last well-formed line wins on load).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentState {
    pub agent_id: String,
    pub node_type: NodeType,
    pub name: String,
    pub full_name: String,
    pub file_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub start_line: u32,
    #[serde(default)]
    pub end_line: u32,
    /// Free-form links to collaborating agents
    #[serde(default)]
    pub connections: BTreeMap<String, String>,
    #[serde(default)]
    pub chat_history: Vec<ChatMessage>,
    #[serde(default)]
    pub custom_subscriptions: Vec<SubscriptionPattern>,
    /// Epoch seconds, stamped on every save
    #[serde(default)]
    pub last_updated: f64,
}

impl AgentState {
    /// Baseline state for a freshly discovered entity.
    pub fn baseline(
        agent_id: impl Into<String>,
        node_type: NodeType,
        name: impl Into<String>,
        full_name: impl Into<String>,
        file_path: impl Into<String>,
        start_line: u32,
        end_line: u32,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            node_type,
            name: name.into(),
            full_name: full_name.into(),
            file_path: file_path.into(),
            parent_id: None,
            start_line,
            end_line,
            connections: BTreeMap::new(),
            chat_history: Vec::new(),
            custom_subscriptions: Vec::new(),
            last_updated: epoch_now(),
        }
    }

    pub fn push_chat(&mut self, role: impl Into<String>, content: impl Into<String>) {
        self.chat_history.push(ChatMessage {
            role: role.into(),
            content: content.into(),
        });
    }
}
