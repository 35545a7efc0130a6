use async_trait::async_trait;

use crate::{
    Error,
    storage::{AuditLogEntry, AuditLogPage, AuditLogQuery, NewAuditLogEntry},
};

/// Repository for the append-only audit trail
#[async_trait]
pub trait AuditLogRepository: Send + Sync + 'static {
    /// Append an entry
    async fn record(&self, entry: NewAuditLogEntry) -> Result<AuditLogEntry, Error>;

    /// Query entries newest-first with filters and pagination
    async fn query(&self, query: &AuditLogQuery) -> Result<AuditLogPage, Error>;
}
