use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use codeswarm_types::{Subscription, SubscriptionPattern, SwarmEvent, epoch_now};
use rusqlite::Connection;

use crate::{Result, queries, schema};

/// Persistent registry of (agent, pattern) routing rules.
///
/// All public operations are async; writes serialize behind the single
/// connection mutex and run on the blocking pool.
#[derive(Clone)]
pub struct SubscriptionRegistry {
    db: Arc<Mutex<Connection>>,
}

impl SubscriptionRegistry {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        schema::init_subscriptions_schema(&conn)?;
        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::init_subscriptions_schema(&conn)?;
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

    /// Register a subscription; returns the stored row with its assigned id.
    pub async fn register(
        &self,
        agent_id: &str,
        pattern: SubscriptionPattern,
        is_default: bool,
    ) -> Result<Subscription> {
        let agent_id = agent_id.to_string();
        let now = epoch_now();

        let row_agent_id = agent_id.clone();
        let row_pattern = pattern.clone();
        let id = self
            .run(move |conn| queries::subscription::insert(conn, &agent_id, &pattern, is_default, now))
            .await?;

        Ok(Subscription {
            id,
            agent_id: row_agent_id,
            pattern: row_pattern,
            is_default,
            created_at: now,
            updated_at: now,
        })
    }

    /// Register the two defaults every new agent gets: direct messages to it,
    /// and content changes to its own source file.
    pub async fn register_defaults(
        &self,
        agent_id: &str,
        file_path: &str,
    ) -> Result<Vec<Subscription>> {
        let direct = self
            .register(agent_id, SubscriptionPattern::direct(agent_id), true)
            .await?;
        let file = self
            .register(agent_id, SubscriptionPattern::file_change(file_path), true)
            .await?;
        Ok(vec![direct, file])
    }

    /// Delete by id; idempotent, returns whether a row was removed.
    pub async fn unregister(&self, id: i64) -> Result<bool> {
        self.run(move |conn| queries::subscription::delete(conn, id))
            .await
    }

    /// Bulk delete for an orphaned agent; returns the removed count.
    pub async fn unregister_all(&self, agent_id: &str) -> Result<usize> {
        let agent_id = agent_id.to_string();
        self.run(move |conn| queries::subscription::delete_for_agent(conn, &agent_id))
            .await
    }

    pub async fn get_subscriptions(&self, agent_id: &str) -> Result<Vec<Subscription>> {
        let agent_id = agent_id.to_string();
        self.run(move |conn| queries::subscription::for_agent(conn, &agent_id))
            .await
    }

    /// Agent ids owning at least one matching subscription, in registration
    /// order, each id at most once.
    pub async fn get_matching_agents(&self, event: &SwarmEvent) -> Result<Vec<String>> {
        let event = event.clone();
        self.run(move |conn| {
            let rows = queries::subscription::all_ordered(conn)?;

            let mut matching = Vec::new();
            let mut seen = HashSet::new();
            for subscription in rows {
                if subscription.pattern.matches(&event) && seen.insert(subscription.agent_id.clone())
                {
                    matching.push(subscription.agent_id);
                }
            }
            Ok(matching)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_assigns_ids() {
        let registry = SubscriptionRegistry::open_in_memory().unwrap();

        let sub = registry
            .register("agent-1", SubscriptionPattern::direct("agent-1"), false)
            .await
            .unwrap();
        assert_eq!(sub.agent_id, "agent-1");
        assert!(!sub.is_default);
        assert!(sub.id > 0);

        let listed = registry.get_subscriptions("agent-1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, sub.id);
        assert_eq!(listed[0].pattern, sub.pattern);
    }

    #[tokio::test]
    async fn test_register_defaults_is_exactly_two() {
        let registry = SubscriptionRegistry::open_in_memory().unwrap();

        let subs = registry
            .register_defaults("agent-abc", "src/main.py")
            .await
            .unwrap();
        assert_eq!(subs.len(), 2);
        assert!(subs.iter().all(|s| s.is_default));
        assert_eq!(subs[0].pattern.to_agent.as_deref(), Some("agent-abc"));
        assert_eq!(
            subs[1].pattern.event_types.as_deref(),
            Some(&["ContentChangedEvent".to_string()][..])
        );
        assert_eq!(subs[1].pattern.path_glob.as_deref(), Some("src/main.py"));
    }

    #[tokio::test]
    async fn test_matching_preserves_insertion_order() {
        let registry = SubscriptionRegistry::open_in_memory().unwrap();

        registry
            .register("agent-a", SubscriptionPattern::direct("agent-a"), false)
            .await
            .unwrap();
        registry
            .register("agent-b", SubscriptionPattern::direct("agent-a"), false)
            .await
            .unwrap();
        registry
            .register(
                "agent-c",
                SubscriptionPattern {
                    event_types: Some(vec!["AgentMessageEvent".to_string()]),
                    ..Default::default()
                },
                false,
            )
            .await
            .unwrap();

        let event = SwarmEvent::agent_message("user", "agent-a", "hi");
        let matching = registry.get_matching_agents(&event).await.unwrap();
        assert_eq!(matching, vec!["agent-a", "agent-b", "agent-c"]);
    }

    #[tokio::test]
    async fn test_duplicate_matches_collapse() {
        let registry = SubscriptionRegistry::open_in_memory().unwrap();

        // Three subscriptions of the same agent all match the same event
        registry
            .register("agent-a", SubscriptionPattern::direct("agent-a"), false)
            .await
            .unwrap();
        registry
            .register(
                "agent-a",
                SubscriptionPattern {
                    event_types: Some(vec!["AgentMessageEvent".to_string()]),
                    ..Default::default()
                },
                false,
            )
            .await
            .unwrap();
        registry
            .register(
                "agent-a",
                SubscriptionPattern {
                    from_agents: Some(vec!["user".to_string()]),
                    ..Default::default()
                },
                false,
            )
            .await
            .unwrap();

        let event = SwarmEvent::agent_message("user", "agent-a", "hi");
        let matching = registry.get_matching_agents(&event).await.unwrap();
        assert_eq!(matching, vec!["agent-a"]);
    }

    #[tokio::test]
    async fn test_unregister_is_idempotent() {
        let registry = SubscriptionRegistry::open_in_memory().unwrap();

        let sub = registry
            .register("agent-x", SubscriptionPattern::direct("agent-x"), false)
            .await
            .unwrap();

        assert!(registry.unregister(sub.id).await.unwrap());
        assert!(!registry.unregister(sub.id).await.unwrap());
        assert!(
            registry
                .get_subscriptions("agent-x")
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_unregister_all() {
        let registry = SubscriptionRegistry::open_in_memory().unwrap();

        registry
            .register_defaults("agent-1", "src/a.py")
            .await
            .unwrap();
        registry
            .register("agent-2", SubscriptionPattern::direct("agent-2"), false)
            .await
            .unwrap();

        let removed = registry.unregister_all("agent-1").await.unwrap();
        assert_eq!(removed, 2);

        // agent-2 is untouched
        assert_eq!(registry.get_subscriptions("agent-2").await.unwrap().len(), 1);

        // A formerly matching event routes nowhere
        let event = SwarmEvent::agent_message("user", "agent-1", "hi");
        assert!(registry.get_matching_agents(&event).await.unwrap().is_empty());
    }
}
