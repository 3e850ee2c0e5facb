use chrono::{DateTime, Utc};
use codeswarm_types::SwarmEvent;
use rusqlite::{Connection, params};

use crate::{
    Result,
    records::{EventRecord, GraphSummary, ReplayFilter, epoch_seconds},
};

pub fn insert(conn: &Connection, graph_id: &str, event: &SwarmEvent) -> Result<i64> {
    let payload = serde_json::to_string(event)?;
    let tags_json = match &event.tags {
        Some(tags) => Some(serde_json::to_string(tags)?),
        None => None,
    };

    conn.execute(
        r#"
        INSERT INTO events (graph_id, event_type, payload, timestamp, created_at,
                            from_agent, to_agent, correlation_id, tags)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
        params![
            graph_id,
            event.event_type(),
            payload,
            epoch_seconds(event.timestamp),
            epoch_seconds(Utc::now()),
            &event.from_agent,
            &event.to_agent,
            &event.correlation_id,
            tags_json,
        ],
    )?;

    Ok(conn.last_insert_rowid())
}

pub fn replay(conn: &Connection, graph_id: &str, filter: &ReplayFilter) -> Result<Vec<EventRecord>> {
    let mut where_clauses = vec!["graph_id = ?".to_string()];
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(graph_id.to_string())];

    if let Some(event_types) = &filter.event_types {
        let placeholders = vec!["?"; event_types.len()].join(",");
        where_clauses.push(format!("event_type IN ({})", placeholders));
        for event_type in event_types {
            params.push(Box::new(event_type.clone()));
        }
    }

    if let Some(since) = filter.since {
        where_clauses.push("timestamp >= ?".to_string());
        params.push(Box::new(epoch_seconds(since)));
    }

    if let Some(until) = filter.until {
        where_clauses.push("timestamp <= ?".to_string());
        params.push(Box::new(epoch_seconds(until)));
    }

    if let Some(after_id) = filter.after_id {
        where_clauses.push("id > ?".to_string());
        params.push(Box::new(after_id));
    }

    let query = format!(
        r#"
        SELECT id, graph_id, event_type, payload, created_at
        FROM events
        WHERE {}
        ORDER BY timestamp ASC, id ASC
        "#,
        where_clauses.join(" AND ")
    );

    let mut stmt = conn.prepare(&query)?;
    let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

    let mut rows = stmt.query(param_refs.as_slice())?;
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        let payload: String = row.get(3)?;
        records.push(EventRecord {
            id: row.get(0)?,
            graph_id: row.get(1)?,
            event_type: row.get(2)?,
            created_at: row.get(4)?,
            event: serde_json::from_str(&payload)?,
        });
    }

    Ok(records)
}

pub fn count(conn: &Connection, graph_id: &str) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM events WHERE graph_id = ?1",
        [graph_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn graph_summaries(
    conn: &Connection,
    limit: usize,
    since: Option<DateTime<Utc>>,
) -> Result<Vec<GraphSummary>> {
    let mut query = String::from(
        r#"
        SELECT
            graph_id,
            MIN(timestamp) as started_at,
            MAX(timestamp) as ended_at,
            COUNT(*) as event_count
        FROM events
        "#,
    );
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(since) = since {
        query.push_str(" WHERE timestamp >= ?");
        params.push(Box::new(epoch_seconds(since)));
    }

    query.push_str(" GROUP BY graph_id ORDER BY started_at DESC LIMIT ?");
    params.push(Box::new(limit as i64));

    let mut stmt = conn.prepare(&query)?;
    let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let summaries = stmt
        .query_map(param_refs.as_slice(), |row| {
            Ok(GraphSummary {
                graph_id: row.get(0)?,
                started_at: row.get(1)?,
                ended_at: row.get(2)?,
                event_count: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

    Ok(summaries)
}

pub fn delete_graph(conn: &Connection, graph_id: &str) -> Result<usize> {
    let deleted = conn.execute("DELETE FROM events WHERE graph_id = ?1", [graph_id])?;
    Ok(deleted)
}
