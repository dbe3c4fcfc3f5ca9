//! libSQL-backed audit sink.
//!
//! Persists prompt-injection events and blacklist entries. Supports local
//! file and in-memory databases; the in-memory form backs the tests.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::info;

use crate::error::SinkError;
use crate::sink::{AuditSink, BlacklistEntry, InjectionEvent};

/// Reject outbound sink URLs that are not HTTPS (or the libsql `libsql://`
/// scheme, which is TLS underneath).
pub fn assert_https(url: &str) -> Result<(), SinkError> {
    if url.starts_with("https://") || url.starts_with("libsql://") {
        Ok(())
    } else {
        Err(SinkError::InsecureUrl {
            url: url.to_string(),
        })
    }
}

/// libSQL audit sink.
///
/// Stores a single connection reused for all writes. `libsql::Connection`
/// is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlSink {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlSink {
    /// Open (or create) a local database file and initialize the schema.
    pub async fn new_local(path: &Path) -> Result<Self, SinkError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                SinkError::Connection(format!("Failed to create sink directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| SinkError::Connection(format!("Failed to open audit database: {e}")))?;
        let conn = db
            .connect()
            .map_err(|e| SinkError::Connection(format!("Failed to create connection: {e}")))?;

        let sink = Self {
            db: Arc::new(db),
            conn,
        };
        sink.init_schema().await?;
        info!(path = %path.display(), "Audit sink opened");
        Ok(sink)
    }

    /// Connect to a remote libSQL database. Plain-HTTP URLs are refused.
    pub async fn new_remote(url: &str, auth_token: &str) -> Result<Self, SinkError> {
        assert_https(url)?;

        let db = libsql::Builder::new_remote(url.to_string(), auth_token.to_string())
            .build()
            .await
            .map_err(|e| {
                SinkError::Connection(format!("Failed to connect to remote database: {e}"))
            })?;
        let conn = db
            .connect()
            .map_err(|e| SinkError::Connection(format!("Failed to create connection: {e}")))?;

        let sink = Self {
            db: Arc::new(db),
            conn,
        };
        sink.init_schema().await?;
        info!(url = %url, "Remote audit sink connected");
        Ok(sink)
    }

    /// Create an in-memory sink (for tests).
    pub async fn new_memory() -> Result<Self, SinkError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                SinkError::Connection(format!("Failed to create in-memory database: {e}"))
            })?;
        let conn = db
            .connect()
            .map_err(|e| SinkError::Connection(format!("Failed to create connection: {e}")))?;

        let sink = Self {
            db: Arc::new(db),
            conn,
        };
        sink.init_schema().await?;
        Ok(sink)
    }

    async fn init_schema(&self) -> Result<(), SinkError> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS security_blacklist (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    ip_address TEXT NOT NULL,
                    identity TEXT,
                    reason TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS injection_events (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    identity TEXT,
                    origin TEXT,
                    reason TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );",
            )
            .await
            .map_err(|e| SinkError::Connection(format!("Schema init failed: {e}")))?;
        Ok(())
    }

    /// Count rows in the blacklist table (for tests and diagnostics).
    pub async fn blacklist_count(&self) -> Result<u64, SinkError> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM security_blacklist", ())
            .await
            .map_err(|e| SinkError::Connection(e.to_string()))?;
        let row = rows
            .next()
            .await
            .map_err(|e| SinkError::Connection(e.to_string()))?
            .ok_or_else(|| SinkError::Connection("empty count result".into()))?;
        let count: i64 = row
            .get(0)
            .map_err(|e| SinkError::Connection(e.to_string()))?;
        Ok(count as u64)
    }
}

#[async_trait]
impl AuditSink for LibSqlSink {
    async fn notify_injection(&self, event: InjectionEvent) -> Result<(), SinkError> {
        self.conn
            .execute(
                "INSERT INTO injection_events (identity, origin, reason, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    event.identity,
                    event.origin,
                    event.reason,
                    Utc::now().to_rfc3339()
                ],
            )
            .await
            .map_err(|e| SinkError::WriteFailed {
                table: "injection_events".into(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn record_blacklist(&self, entry: BlacklistEntry) -> Result<(), SinkError> {
        self.conn
            .execute(
                "INSERT INTO security_blacklist (ip_address, identity, reason, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    entry.ip_address,
                    entry.identity,
                    entry.reason,
                    Utc::now().to_rfc3339()
                ],
            )
            .await
            .map_err(|e| SinkError::WriteFailed {
                table: "security_blacklist".into(),
                reason: e.to_string(),
            })?;
        Ok(())
    }
}
