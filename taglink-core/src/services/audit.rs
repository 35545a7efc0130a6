//! Audit trail access.

use std::sync::Arc;

use crate::{
    Error,
    repositories::AuditLogRepository,
    storage::{AuditLogEntry, AuditLogPage, AuditLogQuery, NewAuditLogEntry},
};

/// Service for recording and querying the audit trail
pub struct AuditService<A: AuditLogRepository> {
    repository: Arc<A>,
}

impl<A: AuditLogRepository> AuditService<A> {
    pub fn new(repository: Arc<A>) -> Self {
        Self { repository }
    }

    /// Append an entry.
    pub async fn record(&self, entry: NewAuditLogEntry) -> Result<AuditLogEntry, Error> {
        self.repository.record(entry).await
    }

    /// Query the trail newest-first with filters and pagination.
    pub async fn query(&self, query: &AuditLogQuery) -> Result<AuditLogPage, Error> {
        self.repository.query(query).await
    }
}
