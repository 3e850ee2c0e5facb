use rusqlite::Connection;

use crate::Result;

// NOTE: Migration policy
//
// The event log is the source of truth for causal history, so schema changes
// must never drop rows. New columns are added in place via ALTER TABLE;
// rows written before the routing columns existed keep NULLs there and stay
// replayable (the payload column always carries the full event JSON).

pub fn init_events_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            graph_id TEXT NOT NULL,
            event_type TEXT NOT NULL,
            payload TEXT NOT NULL,
            timestamp REAL NOT NULL,
            created_at REAL NOT NULL,
            from_agent TEXT,
            to_agent TEXT,
            correlation_id TEXT,
            tags TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_events_graph_id ON events(graph_id);
        CREATE INDEX IF NOT EXISTS idx_events_type ON events(event_type);
        CREATE INDEX IF NOT EXISTS idx_events_timestamp ON events(timestamp);
        "#,
    )?;

    migrate_routing_columns(conn)?;

    conn.execute_batch(
        r#"
        CREATE INDEX IF NOT EXISTS idx_events_to_agent ON events(to_agent);
        "#,
    )?;

    Ok(())
}

/// Add routing columns to an events table created before they existed.
fn migrate_routing_columns(conn: &Connection) -> Result<()> {
    let mut stmt = conn.prepare("PRAGMA table_info(events)")?;
    let columns: Vec<String> = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

    for column in ["from_agent", "to_agent", "correlation_id", "tags"] {
        if !columns.iter().any(|c| c == column) {
            conn.execute(
                &format!("ALTER TABLE events ADD COLUMN {} TEXT", column),
                [],
            )?;
        }
    }

    Ok(())
}

pub fn init_subscriptions_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS subscriptions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            agent_id TEXT NOT NULL,
            pattern_json TEXT NOT NULL,
            is_default INTEGER NOT NULL DEFAULT 0,
            created_at REAL NOT NULL,
            updated_at REAL NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_subscriptions_agent_id ON subscriptions(agent_id);
        CREATE INDEX IF NOT EXISTS idx_subscriptions_is_default ON subscriptions(is_default);
        "#,
    )?;

    Ok(())
}

pub fn init_agents_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS agents (
            agent_id TEXT PRIMARY KEY,
            node_type TEXT NOT NULL,
            name TEXT NOT NULL DEFAULT '',
            full_name TEXT NOT NULL DEFAULT '',
            file_path TEXT NOT NULL,
            parent_id TEXT,
            start_line INTEGER NOT NULL DEFAULT 1,
            end_line INTEGER NOT NULL DEFAULT 1,
            status TEXT NOT NULL DEFAULT 'active',
            created_at REAL NOT NULL,
            updated_at REAL NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_agents_status ON agents(status);
        "#,
    )?;

    Ok(())
}
