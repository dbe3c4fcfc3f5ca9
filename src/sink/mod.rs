//! External collaborator seams: audit/blacklist sink and document store.
//!
//! The guardrail pipeline and orchestrator write security events through
//! `AuditSink`; context assembly reads cached documents through
//! `DocumentStore`. In-memory implementations back the tests, the libsql
//! sink backs production.

pub mod libsql_sink;

pub use libsql_sink::LibSqlSink;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::SinkError;

/// A prompt-injection event, written before the rejection is surfaced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjectionEvent {
    /// Identity the request claimed, if any.
    pub identity: Option<String>,
    /// Origin (IP or channel tag) the request arrived from, if known.
    pub origin: Option<String>,
    /// Matched pattern identifier.
    pub reason: String,
}

/// A persistent blacklist entry for a rejected request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlacklistEntry {
    pub ip_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    pub reason: String,
}

/// Audit/notification sink for security events.
///
/// Write failures are hard errors surfaced to the caller — an audit record
/// is never silently dropped.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Record a prompt-injection event. Awaited before the rejection verdict
    /// is returned, so audit ordering is guaranteed.
    async fn notify_injection(&self, event: InjectionEvent) -> Result<(), SinkError>;

    /// Persist a blacklist entry for a rejected request.
    async fn record_blacklist(&self, entry: BlacklistEntry) -> Result<(), SinkError>;
}

/// Retrieval-by-logical-name document store. Not-found is not an error.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn fetch(&self, name: &str) -> Result<Option<String>, SinkError>;
}

// ── In-memory implementations ───────────────────────────────────────

/// In-memory audit sink for tests and local runs.
#[derive(Default)]
pub struct MemorySink {
    injections: Mutex<Vec<InjectionEvent>>,
    blacklist: Mutex<Vec<BlacklistEntry>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Injection events recorded so far.
    pub async fn injection_events(&self) -> Vec<InjectionEvent> {
        self.injections.lock().await.clone()
    }

    /// Blacklist entries recorded so far.
    pub async fn blacklist_entries(&self) -> Vec<BlacklistEntry> {
        self.blacklist.lock().await.clone()
    }
}

#[async_trait]
impl AuditSink for MemorySink {
    async fn notify_injection(&self, event: InjectionEvent) -> Result<(), SinkError> {
        self.injections.lock().await.push(event);
        Ok(())
    }

    async fn record_blacklist(&self, entry: BlacklistEntry) -> Result<(), SinkError> {
        self.blacklist.lock().await.push(entry);
        Ok(())
    }
}

/// In-memory document store keyed by logical name.
#[derive(Default)]
pub struct MemoryDocumentStore {
    docs: std::collections::HashMap<String, String>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, name: &str, body: &str) -> Self {
        self.docs.insert(name.to_string(), body.to_string());
        self
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn fetch(&self, name: &str) -> Result<Option<String>, SinkError> {
        Ok(self.docs.get(name).cloned())
    }
}

/// Document store reading `{dir}/{name}.md` from disk.
pub struct FsDocumentStore {
    dir: std::path::PathBuf,
}

impl FsDocumentStore {
    pub fn new(dir: impl Into<std::path::PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl DocumentStore for FsDocumentStore {
    async fn fetch(&self, name: &str) -> Result<Option<String>, SinkError> {
        // Logical names only, never path fragments.
        if name.contains('/') || name.contains("..") {
            return Ok(None);
        }
        let path = self.dir.join(format!("{name}.md"));
        match tokio::fs::read_to_string(&path).await {
            Ok(body) => Ok(Some(body)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SinkError::Connection(format!(
                "Failed to read document {}: {e}",
                path.display()
            ))),
        }
    }
}

/// A sink that fails every write — exercises the never-swallow contract.
#[cfg(test)]
pub struct FailingSink;

#[cfg(test)]
#[async_trait]
impl AuditSink for FailingSink {
    async fn notify_injection(&self, _event: InjectionEvent) -> Result<(), SinkError> {
        Err(SinkError::WriteFailed {
            table: "injection_events".into(),
            reason: "simulated outage".into(),
        })
    }

    async fn record_blacklist(&self, _entry: BlacklistEntry) -> Result<(), SinkError> {
        Err(SinkError::WriteFailed {
            table: "security_blacklist".into(),
            reason: "simulated outage".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_sink_records_events() {
        let sink = MemorySink::new();
        sink.notify_injection(InjectionEvent {
            identity: Some("user-1".into()),
            origin: Some("203.0.113.9".into()),
            reason: "instruction_override".into(),
        })
        .await
        .unwrap();
        sink.record_blacklist(BlacklistEntry {
            ip_address: "203.0.113.9".into(),
            identity: Some("user-1".into()),
            reason: "prompt_injection".into(),
        })
        .await
        .unwrap();

        assert_eq!(sink.injection_events().await.len(), 1);
        let entries = sink.blacklist_entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].reason, "prompt_injection");
    }

    #[tokio::test]
    async fn fs_document_store_reads_and_misses() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("knowledge-plan.md"), "plan body").unwrap();
        let store = FsDocumentStore::new(dir.path());

        assert_eq!(
            store.fetch("knowledge-plan").await.unwrap().as_deref(),
            Some("plan body")
        );
        assert!(store.fetch("missing").await.unwrap().is_none());
        assert!(store.fetch("../knowledge-plan").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn memory_document_store_fetch() {
        let store = MemoryDocumentStore::new().with_document("knowledge-plan", "plan body");
        assert_eq!(
            store.fetch("knowledge-plan").await.unwrap().as_deref(),
            Some("plan body")
        );
        assert!(store.fetch("missing").await.unwrap().is_none());
    }
}
