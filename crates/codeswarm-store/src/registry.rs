use std::path::Path;
use std::sync::{Arc, Mutex};

use codeswarm_types::{AgentRecord, AgentStatus, epoch_now};
use rusqlite::Connection;

use crate::{Result, queries, schema};

/// Persistent registry of every agent the swarm has ever supervised.
/// Orphaning flips status, never deletes: history stays addressable.
#[derive(Clone)]
pub struct SwarmRegistry {
    db: Arc<Mutex<Connection>>,
}

impl SwarmRegistry {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        schema::init_agents_schema(&conn)?;
        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::init_agents_schema(&conn)?;
        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
        })
    }

    async fn run<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let conn = db.lock().unwrap();
            f(&conn)
        })
        .await?
    }

    pub async fn upsert(&self, record: AgentRecord) -> Result<()> {
        self.run(move |conn| queries::agent::upsert(conn, &record))
            .await
    }

    pub async fn mark_orphaned(&self, agent_id: &str) -> Result<bool> {
        let agent_id = agent_id.to_string();
        let now = epoch_now();
        self.run(move |conn| queries::agent::mark_orphaned(conn, &agent_id, now))
            .await
    }

    pub async fn list(&self, status: Option<AgentStatus>) -> Result<Vec<AgentRecord>> {
        self.run(move |conn| queries::agent::list(conn, status))
            .await
    }

    pub async fn get(&self, agent_id: &str) -> Result<Option<AgentRecord>> {
        let agent_id = agent_id.to_string();
        self.run(move |conn| queries::agent::get(conn, &agent_id))
            .await
    }

    /// Ids of currently active agents, the reconciler's "existing" set.
    pub async fn active_ids(&self) -> Result<Vec<String>> {
        Ok(self
            .list(Some(AgentStatus::Active))
            .await?
            .into_iter()
            .map(|record| record.agent_id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeswarm_types::NodeType;

    fn record(agent_id: &str, file_path: &str) -> AgentRecord {
        let now = epoch_now();
        AgentRecord {
            agent_id: agent_id.to_string(),
            node_type: NodeType::Function,
            name: "parse".to_string(),
            full_name: "lexer.parse".to_string(),
            file_path: file_path.to_string(),
            parent_id: None,
            start_line: 1,
            end_line: 10,
            status: AgentStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let registry = SwarmRegistry::open_in_memory().unwrap();
        registry.upsert(record("ab12", "src/lexer.py")).await.unwrap();

        let fetched = registry.get("ab12").await.unwrap().unwrap();
        assert_eq!(fetched.file_path, "src/lexer.py");
        assert_eq!(fetched.status, AgentStatus::Active);
        assert!(registry.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_refreshes_position() {
        let registry = SwarmRegistry::open_in_memory().unwrap();
        registry.upsert(record("ab12", "src/lexer.py")).await.unwrap();

        let mut moved = record("ab12", "src/lexer.py");
        moved.start_line = 20;
        moved.end_line = 35;
        registry.upsert(moved).await.unwrap();

        let fetched = registry.get("ab12").await.unwrap().unwrap();
        assert_eq!(fetched.start_line, 20);
        assert_eq!(fetched.end_line, 35);
        assert_eq!(registry.list(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_orphaning_flips_status_without_deleting() {
        let registry = SwarmRegistry::open_in_memory().unwrap();
        registry.upsert(record("ab12", "src/lexer.py")).await.unwrap();
        registry.upsert(record("cd34", "src/parser.py")).await.unwrap();

        assert!(registry.mark_orphaned("ab12").await.unwrap());
        assert!(!registry.mark_orphaned("missing").await.unwrap());

        assert_eq!(registry.active_ids().await.unwrap(), vec!["cd34"]);
        let orphan = registry.get("ab12").await.unwrap().unwrap();
        assert_eq!(orphan.status, AgentStatus::Orphaned);
        assert_eq!(registry.list(None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_rediscovery_reactivates() {
        let registry = SwarmRegistry::open_in_memory().unwrap();
        registry.upsert(record("ab12", "src/lexer.py")).await.unwrap();
        registry.mark_orphaned("ab12").await.unwrap();

        registry.upsert(record("ab12", "src/lexer.py")).await.unwrap();
        let fetched = registry.get("ab12").await.unwrap().unwrap();
        assert_eq!(fetched.status, AgentStatus::Active);
    }
}
