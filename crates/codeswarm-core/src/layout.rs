use std::path::{Path, PathBuf};

use crate::identity::shard_prefix;

/// On-disk layout of one swarm root (default `<project>/.remora`):
///
/// ```text
/// <root>/events/events.db
/// <root>/subscriptions.db
/// <root>/swarm_state.db
/// <root>/agents/<aa>/<agent_id>/state.jsonl
/// <root>/agents/<aa>/<agent_id>/workspace.db
/// ```
#[derive(Debug, Clone)]
pub struct SwarmLayout {
    root: PathBuf,
}

impl SwarmLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn at(project_root: &Path, swarm_root: &str) -> Self {
        Self::new(project_root.join(swarm_root))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn events_db(&self) -> PathBuf {
        self.root.join("events").join("events.db")
    }

    pub fn subscriptions_db(&self) -> PathBuf {
        self.root.join("subscriptions.db")
    }

    pub fn registry_db(&self) -> PathBuf {
        self.root.join("swarm_state.db")
    }

    pub fn agent_dir(&self, agent_id: &str) -> PathBuf {
        self.root
            .join("agents")
            .join(shard_prefix(agent_id))
            .join(agent_id)
    }

    pub fn state_path(&self, agent_id: &str) -> PathBuf {
        self.agent_dir(agent_id).join("state.jsonl")
    }

    pub fn workspace_path(&self, agent_id: &str) -> PathBuf {
        self.agent_dir(agent_id).join("workspace.db")
    }
}
