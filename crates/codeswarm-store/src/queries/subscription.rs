use codeswarm_types::{Subscription, SubscriptionPattern};
use rusqlite::{Connection, params};

use crate::Result;

pub fn insert(
    conn: &Connection,
    agent_id: &str,
    pattern: &SubscriptionPattern,
    is_default: bool,
    now: f64,
) -> Result<i64> {
    let pattern_json = serde_json::to_string(pattern)?;

    conn.execute(
        r#"
        INSERT INTO subscriptions (agent_id, pattern_json, is_default, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
        params![agent_id, pattern_json, is_default, now, now],
    )?;

    Ok(conn.last_insert_rowid())
}

pub fn delete(conn: &Connection, id: i64) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM subscriptions WHERE id = ?1", [id])?;
    Ok(deleted > 0)
}

pub fn delete_for_agent(conn: &Connection, agent_id: &str) -> Result<usize> {
    let deleted = conn.execute("DELETE FROM subscriptions WHERE agent_id = ?1", [agent_id])?;
    Ok(deleted)
}

pub fn for_agent(conn: &Connection, agent_id: &str) -> Result<Vec<Subscription>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT id, agent_id, pattern_json, is_default, created_at, updated_at
        FROM subscriptions
        WHERE agent_id = ?1
        ORDER BY id
        "#,
    )?;

    let mut rows = stmt.query([agent_id])?;
    decode_rows(&mut rows)
}

/// Every subscription, in insertion order. Matching walks this list so that
/// trigger order mirrors registration order.
pub fn all_ordered(conn: &Connection) -> Result<Vec<Subscription>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT id, agent_id, pattern_json, is_default, created_at, updated_at
        FROM subscriptions
        ORDER BY id
        "#,
    )?;

    let mut rows = stmt.query([])?;
    decode_rows(&mut rows)
}

fn decode_rows(rows: &mut rusqlite::Rows<'_>) -> Result<Vec<Subscription>> {
    let mut subscriptions = Vec::new();
    while let Some(row) = rows.next()? {
        let pattern_json: String = row.get(2)?;
        subscriptions.push(Subscription {
            id: row.get(0)?,
            agent_id: row.get(1)?,
            pattern: serde_json::from_str(&pattern_json)?,
            is_default: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        });
    }
    Ok(subscriptions)
}
