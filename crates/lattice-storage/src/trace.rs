//! Trace sink (C8): one row per completed or failed request, written for
//! audit/debugging. Never blocks the response path on a write failure.

use lattice_core::types::{TraceRecord, TraceStatus};
use rusqlite::{params, Connection};
use std::sync::Mutex;

/// Persists `TraceRecord`s. Implementations must not panic on write
/// failure; a trace sink is an observability aid, not part of the
/// request's correctness contract.
pub trait TraceSink: Send + Sync {
    fn record(&self, trace: &TraceRecord);
}

/// Writes to a local SQLite file via `rusqlite` (bundled).
pub struct SqliteTraceSink {
    conn: Mutex<Connection>,
}

impl SqliteTraceSink {
    pub fn open(path: &str) -> anyhow::Result<SqliteTraceSink> {
        let conn = Connection::open(path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS traces (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL,
                provider TEXT NOT NULL,
                model TEXT NOT NULL,
                input TEXT NOT NULL,
                output TEXT NOT NULL,
                latency_ms INTEGER NOT NULL,
                prompt_tokens INTEGER NOT NULL,
                completion_tokens INTEGER NOT NULL,
                cost REAL NOT NULL,
                band TEXT NOT NULL,
                requested_band TEXT,
                inferred_band TEXT NOT NULL,
                route_source TEXT NOT NULL,
                plan TEXT NOT NULL,
                provenance TEXT NOT NULL,
                status TEXT NOT NULL,
                error_message TEXT
            )",
            [],
        )?;
        Ok(SqliteTraceSink {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> anyhow::Result<SqliteTraceSink> {
        Self::open(":memory:")
    }
}

impl TraceSink for SqliteTraceSink {
    fn record(&self, trace: &TraceRecord) {
        let status = match trace.status {
            TraceStatus::Success => "success",
            TraceStatus::Error => "error",
        };

        let result = self.conn.lock().expect("trace sink mutex poisoned").execute(
            "INSERT OR REPLACE INTO traces (
                id, created_at, provider, model, input, output, latency_ms,
                prompt_tokens, completion_tokens, cost, band, requested_band,
                inferred_band, route_source, plan, provenance, status, error_message
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
            params![
                trace.id,
                trace.created_at.to_rfc3339(),
                trace.provider,
                trace.model,
                trace.input,
                trace.output,
                trace.latency_ms,
                trace.prompt_tokens,
                trace.completion_tokens,
                trace.cost,
                trace.band,
                trace.requested_band,
                trace.inferred_band,
                trace.route_source,
                trace.plan,
                trace.provenance,
                status,
                trace.error_message,
            ],
        );

        if let Err(e) = result {
            log::warn!("failed to persist trace {}: {e}", trace.id);
        }
    }
}

/// Used when `TRACE_DB_PATH` is unset; tracing is opt-in.
pub struct NullTraceSink;

impl TraceSink for NullTraceSink {
    fn record(&self, _trace: &TraceRecord) {}
}
