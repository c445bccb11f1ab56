//! SQLite run store implementation.

use crate::{Event, EventKind, Result, RunId};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use std::path::Path;

/// Summary of one recorded run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub id: RunId,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub message_count: usize,
}

/// SQLite-backed run store.
pub struct RunStore {
    conn: Connection,
}

impl RunStore {
    /// Open or create a run store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory run store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS events (
                id TEXT PRIMARY KEY,
                run_id TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                kind TEXT NOT NULL,
                data TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_events_run
                ON events(run_id, timestamp);
            "#,
        )?;
        Ok(())
    }

    /// Append an event to the store.
    pub fn append(&self, event: &Event) -> Result<()> {
        self.conn.execute(
            "INSERT INTO events (id, run_id, timestamp, kind, data) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                event.id.to_string(),
                event.run_id.to_string(),
                event.timestamp.to_rfc3339(),
                event_kind_name(&event.kind),
                serde_json::to_string(&event.kind)?,
            ],
        )?;
        Ok(())
    }

    /// Load all events for a run, ordered by timestamp.
    pub fn load_run(&self, run_id: RunId) -> Result<Vec<Event>> {
        self.load_events(run_id, None)
    }

    /// Load events for a run, optionally filtered by kind name.
    pub fn load_events(&self, run_id: RunId, kind_filter: Option<&str>) -> Result<Vec<Event>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, run_id, timestamp, data FROM events
             WHERE run_id = ?1 AND (?2 IS NULL OR kind = ?2)
             ORDER BY timestamp, rowid",
        )?;

        let events = stmt
            .query_map(params![run_id.to_string(), kind_filter], |row| {
                let id: String = row.get(0)?;
                let run_id: String = row.get(1)?;
                let timestamp: String = row.get(2)?;
                let data: String = row.get(3)?;
                Ok((id, run_id, timestamp, data))
            })?
            .filter_map(|r| r.ok())
            .filter_map(|(id, run_id, timestamp, data)| {
                Some(Event {
                    id: id.parse().ok()?,
                    run_id: RunId(run_id.parse().ok()?),
                    timestamp: timestamp.parse().ok()?,
                    kind: serde_json::from_str(&data).ok()?,
                })
            })
            .collect();

        Ok(events)
    }

    /// Summaries of all recorded runs, most recent first.
    pub fn list_runs(&self) -> Result<Vec<RunSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT run_id,
                    MIN(timestamp),
                    MAX(CASE WHEN kind IN ('run_end', 'run_aborted') THEN timestamp END),
                    SUM(CASE WHEN kind = 'message' THEN 1 ELSE 0 END)
             FROM events
             GROUP BY run_id
             ORDER BY MIN(timestamp) DESC",
        )?;

        let runs = stmt
            .query_map([], |row| {
                let run_id: String = row.get(0)?;
                let started: String = row.get(1)?;
                let ended: Option<String> = row.get(2)?;
                let messages: i64 = row.get(3)?;
                Ok((run_id, started, ended, messages))
            })?
            .filter_map(|r| r.ok())
            .filter_map(|(run_id, started, ended, messages)| {
                Some(RunSummary {
                    id: RunId(run_id.parse().ok()?),
                    started_at: started.parse().ok()?,
                    ended_at: ended.and_then(|t| t.parse().ok()),
                    message_count: messages.max(0) as usize,
                })
            })
            .collect();

        Ok(runs)
    }
}

fn event_kind_name(kind: &EventKind) -> &'static str {
    match kind {
        EventKind::RunStart { .. } => "run_start",
        EventKind::Message { .. } => "message",
        EventKind::ToolCall { .. } => "tool_call",
        EventKind::ToolResult { .. } => "tool_result",
        EventKind::RunEnd => "run_end",
        EventKind::RunAborted { .. } => "run_aborted",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;
    use serde_json::json;

    #[test]
    fn append_and_load_round_trip() {
        let store = RunStore::in_memory().unwrap();
        let run_id = RunId::new();

        store
            .append(&Event::new(
                run_id,
                EventKind::RunStart {
                    prompt: "What is 2+3?".into(),
                },
            ))
            .unwrap();
        store
            .append(&Event::new(
                run_id,
                EventKind::ToolCall {
                    call_id: "c1".into(),
                    name: "add".into(),
                    input: json!({"a": 2, "b": 3}),
                },
            ))
            .unwrap();
        store
            .append(&Event::message(run_id, Role::Assistant, "5"))
            .unwrap();
        store.append(&Event::new(run_id, EventKind::RunEnd)).unwrap();

        let events = store.load_run(run_id).unwrap();
        assert_eq!(events.len(), 4);
        assert!(matches!(&events[0].kind, EventKind::RunStart { prompt } if prompt == "What is 2+3?"));
        assert!(matches!(&events[3].kind, EventKind::RunEnd));
    }

    #[test]
    fn kind_filter_selects_tool_calls() {
        let store = RunStore::in_memory().unwrap();
        let run_id = RunId::new();

        store
            .append(&Event::message(run_id, Role::User, "hi"))
            .unwrap();
        store
            .append(&Event::new(
                run_id,
                EventKind::ToolCall {
                    call_id: "c1".into(),
                    name: "list_files".into(),
                    input: json!({}),
                },
            ))
            .unwrap();

        let events = store.load_events(run_id, Some("tool_call")).unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0].kind, EventKind::ToolCall { name, .. } if name == "list_files"));
    }

    #[test]
    fn list_runs_reports_status_and_counts() {
        let store = RunStore::in_memory().unwrap();

        let finished = RunId::new();
        store
            .append(&Event::new(
                finished,
                EventKind::RunStart { prompt: "a".into() },
            ))
            .unwrap();
        store
            .append(&Event::message(finished, Role::Assistant, "done"))
            .unwrap();
        store
            .append(&Event::new(finished, EventKind::RunEnd))
            .unwrap();

        let aborted = RunId::new();
        store
            .append(&Event::new(
                aborted,
                EventKind::RunStart { prompt: "b".into() },
            ))
            .unwrap();
        store
            .append(&Event::new(
                aborted,
                EventKind::RunAborted {
                    reason: "run cancelled".into(),
                },
            ))
            .unwrap();

        let runs = store.list_runs().unwrap();
        assert_eq!(runs.len(), 2);
        let finished_summary = runs.iter().find(|r| r.id == finished).unwrap();
        assert!(finished_summary.ended_at.is_some());
        assert_eq!(finished_summary.message_count, 1);
    }
}
