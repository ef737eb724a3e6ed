use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Structured record of one denied operation.
///
/// Delivered to the configured denial observer alongside (never instead of)
/// the degraded result or raised error, so auditing cannot change outcomes.
#[derive(Debug, Clone, Serialize)]
pub struct DenialEvent {
    /// Table the operation targeted
    pub table: String,
    /// Operation that was denied: read, insert, update, delete or
    /// write_policy
    pub operation: String,
    /// Document id, when the operation addressed one
    pub doc_id: Option<String>,
    /// Field path, for write-policy denials
    pub path: Option<String>,
    /// Denial reason
    pub reason: String,
    /// When the denial happened
    pub at: DateTime<Utc>,
}

impl DenialEvent {
    pub fn new(table: &str, operation: &str, doc_id: Option<&str>, reason: &str) -> Self {
        Self {
            table: table.to_string(),
            operation: operation.to_string(),
            doc_id: doc_id.map(String::from),
            path: None,
            reason: reason.to_string(),
            at: Utc::now(),
        }
    }

    pub fn with_path(mut self, path: &str) -> Self {
        self.path = Some(path.to_string());
        self
    }
}

/// Callback receiving structured denial events for auditing.
pub type DenialObserver = Arc<dyn Fn(&DenialEvent) + Send + Sync>;
