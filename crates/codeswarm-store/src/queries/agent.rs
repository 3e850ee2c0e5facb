use codeswarm_types::{AgentRecord, AgentStatus, NodeType};
use rusqlite::{Connection, params};

use crate::{Error, Result};

/// Insert or refresh an agent row. Re-discovery reactivates orphans and
/// updates position metadata; `created_at` is preserved on conflict.
pub fn upsert(conn: &Connection, record: &AgentRecord) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO agents (agent_id, node_type, name, full_name, file_path, parent_id,
                            start_line, end_line, status, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 'active', ?9, ?10)
        ON CONFLICT(agent_id) DO UPDATE SET
            node_type = excluded.node_type,
            name = excluded.name,
            full_name = excluded.full_name,
            file_path = excluded.file_path,
            parent_id = excluded.parent_id,
            start_line = excluded.start_line,
            end_line = excluded.end_line,
            status = 'active',
            updated_at = excluded.updated_at
        "#,
        params![
            &record.agent_id,
            record.node_type.as_str(),
            &record.name,
            &record.full_name,
            &record.file_path,
            &record.parent_id,
            record.start_line,
            record.end_line,
            record.created_at,
            record.updated_at,
        ],
    )?;

    Ok(())
}

pub fn mark_orphaned(conn: &Connection, agent_id: &str, now: f64) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE agents SET status = 'orphaned', updated_at = ?1 WHERE agent_id = ?2",
        params![now, agent_id],
    )?;
    Ok(updated > 0)
}

pub fn list(conn: &Connection, status: Option<AgentStatus>) -> Result<Vec<AgentRecord>> {
    let mut query = String::from(
        r#"
        SELECT agent_id, node_type, name, full_name, file_path, parent_id,
               start_line, end_line, status, created_at, updated_at
        FROM agents
        "#,
    );
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(status) = status {
        query.push_str(" WHERE status = ?");
        params.push(Box::new(status.as_str().to_string()));
    }

    query.push_str(" ORDER BY agent_id");

    let mut stmt = conn.prepare(&query)?;
    let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

    let mut rows = stmt.query(param_refs.as_slice())?;
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        records.push(decode_row(row)?);
    }

    Ok(records)
}

pub fn get(conn: &Connection, agent_id: &str) -> Result<Option<AgentRecord>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT agent_id, node_type, name, full_name, file_path, parent_id,
               start_line, end_line, status, created_at, updated_at
        FROM agents
        WHERE agent_id = ?1
        "#,
    )?;

    let mut rows = stmt.query([agent_id])?;
    match rows.next()? {
        Some(row) => Ok(Some(decode_row(row)?)),
        None => Ok(None),
    }
}

fn decode_row(row: &rusqlite::Row<'_>) -> Result<AgentRecord> {
    let node_type: String = row.get(1)?;
    let status: String = row.get(8)?;

    Ok(AgentRecord {
        agent_id: row.get(0)?,
        node_type: NodeType::parse(&node_type)
            .ok_or_else(|| Error::Invalid(format!("unknown node_type '{}'", node_type)))?,
        name: row.get(2)?,
        full_name: row.get(3)?,
        file_path: row.get(4)?,
        parent_id: row.get(5)?,
        start_line: row.get(6)?,
        end_line: row.get(7)?,
        status: AgentStatus::parse(&status)
            .ok_or_else(|| Error::Invalid(format!("unknown status '{}'", status)))?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}
