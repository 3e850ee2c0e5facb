use std::io::Write;
use std::path::PathBuf;

use codeswarm_core::SwarmLayout;
use codeswarm_types::{AgentState, epoch_now};
use tracing::warn;

use crate::Result;

/// Append-only journal of per-agent state, sharded under the swarm root.
///
/// Each save appends one JSON line; load decodes the last well-formed line.
/// There is no index: reads are O(1) given the agent id.
#[derive(Clone)]
pub struct AgentStateStore {
    layout: SwarmLayout,
}

impl AgentStateStore {
    pub fn new(layout: SwarmLayout) -> Self {
        Self { layout }
    }

    pub fn state_path(&self, agent_id: &str) -> PathBuf {
        self.layout.state_path(agent_id)
    }

    /// Load the current snapshot. Missing file or a corrupt trailing line
    /// both come back as `None` (the corruption is warned, not fatal).
    pub fn load_sync(&self, agent_id: &str) -> Result<Option<AgentState>> {
        let path = self.state_path(agent_id);
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let Some(last_line) = contents.lines().rev().find(|line| !line.trim().is_empty()) else {
            return Ok(None);
        };

        match serde_json::from_str(last_line) {
            Ok(state) => Ok(Some(state)),
            Err(err) => {
                warn!(
                    agent_id,
                    path = %path.display(),
                    error = %err,
                    "corrupt trailing state line, treating journal as absent"
                );
                Ok(None)
            }
        }
    }

    /// Stamp `last_updated` and append one line. Write failures propagate.
    pub fn save_sync(&self, state: &mut AgentState) -> Result<()> {
        state.last_updated = epoch_now();

        let path = self.state_path(&state.agent_id);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut line = serde_json::to_string(state)?;
        line.push('\n');

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        file.write_all(line.as_bytes())?;

        Ok(())
    }

    pub async fn load(&self, agent_id: &str) -> Result<Option<AgentState>> {
        let store = self.clone();
        let agent_id = agent_id.to_string();
        tokio::task::spawn_blocking(move || store.load_sync(&agent_id)).await?
    }

    /// Async save; returns the state with its fresh `last_updated` stamp.
    pub async fn save(&self, mut state: AgentState) -> Result<AgentState> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || {
            store.save_sync(&mut state)?;
            Ok(state)
        })
        .await?
    }
}
