use serde::{Deserialize, Serialize};

use crate::event::SwarmEvent;
use crate::glob::glob_match;

/// Pattern for matching events.
///
/// All fields are optional and conjunctive: an absent field matches
/// anything, a present field must pass. Multiple values within one field
/// are OR (any match).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionPattern {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_types: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_agents: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_agent: Option<String>,

    /// Glob over the project-relative forward-slash path (see [`glob_match`])
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_glob: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl SubscriptionPattern {
    /// Direct-message pattern: everything addressed to `agent_id`.
    pub fn direct(agent_id: impl Into<String>) -> Self {
        Self {
            to_agent: Some(agent_id.into()),
            ..Self::default()
        }
    }

    /// Own-file pattern: content changes for one source file.
    pub fn file_change(path_glob: impl Into<String>) -> Self {
        Self {
            event_types: Some(vec!["ContentChangedEvent".to_string()]),
            path_glob: Some(path_glob.into()),
            ..Self::default()
        }
    }

    /// Evaluate this pattern against an event. Conditions on fields the
    /// event does not carry fail; all present conditions must pass.
    pub fn matches(&self, event: &SwarmEvent) -> bool {
        if let Some(event_types) = &self.event_types {
            let event_type = event.event_type();
            if !event_types.iter().any(|t| t == event_type) {
                return false;
            }
        }

        if let Some(from_agents) = &self.from_agents {
            match &event.from_agent {
                Some(from) if from_agents.contains(from) => {}
                _ => return false,
            }
        }

        if let Some(to_agent) = &self.to_agent {
            if event.to_agent.as_ref() != Some(to_agent) {
                return false;
            }
        }

        if let Some(path_glob) = &self.path_glob {
            match &event.path {
                Some(path) => {
                    let normalized = path.replace('\\', "/");
                    let normalized = normalized.strip_prefix("./").unwrap_or(&normalized);
                    if !glob_match(path_glob, normalized) {
                        return false;
                    }
                }
                None => return false,
            }
        }

        if let Some(tags) = &self.tags {
            match &event.tags {
                Some(event_tags) if tags.iter().any(|t| event_tags.contains(t)) => {}
                _ => return false,
            }
        }

        true
    }
}

/// A registered subscription row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i64,
    pub agent_id: String,
    pub pattern: SubscriptionPattern,
    pub is_default: bool,
    pub created_at: f64,
    pub updated_at: f64,
}

/// A matched (agent, event) pair queued for the runner. Not persisted;
/// re-derivable from the event log plus the subscription table.
#[derive(Debug, Clone)]
pub struct Trigger {
    pub agent_id: String,
    pub event_id: i64,
    pub event: SwarmEvent,
}
