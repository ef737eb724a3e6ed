use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::policy::{Mask, SensitivePolicy};

/// Resolved access level for one sensitive value in one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessStatus {
    Full,
    Masked,
    Hidden,
}

/// Field-level operation being authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Write,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Read => "read",
            Operation::Write => "write",
        }
    }
}

/// Row-level operation being authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOperation {
    Read,
    Insert,
    Update,
    Delete,
}

impl RowOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowOperation::Read => "read",
            RowOperation::Insert => "insert",
            RowOperation::Update => "update",
            RowOperation::Delete => "delete",
        }
    }

    /// Standard reason reported when a rule for this operation denies access.
    pub fn denial_reason(&self) -> &'static str {
        match self {
            RowOperation::Read => "rls_read_denied",
            RowOperation::Insert => "rls_insert_denied",
            RowOperation::Update => "rls_update_denied",
            RowOperation::Delete => "rls_delete_denied",
        }
    }
}

/// Outcome of one entitlement check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub ok: bool,
    pub reason: Option<String>,
}

impl Verdict {
    pub fn allow() -> Self {
        Self {
            ok: true,
            reason: None,
        }
    }

    pub fn deny(reason: &str) -> Self {
        Self {
            ok: false,
            reason: Some(reason.to_string()),
        }
    }
}

impl From<bool> for Verdict {
    fn from(ok: bool) -> Self {
        Self { ok, reason: None }
    }
}

/// Everything an entitlement resolver may consult when checking a requirement.
#[derive(Debug, Clone, Copy)]
pub struct AccessContext<'a> {
    /// Caller-supplied request context (identity, roles, session data)
    pub ctx: &'a Value,
    /// Path of the field being authorized
    pub path: &'a str,
    /// Policy metadata of the field being authorized
    pub policy: &'a SensitivePolicy,
    /// Whole document the field belongs to, when available
    pub doc: Option<&'a Value>,
    /// Field-level operation being authorized
    pub operation: Operation,
}

/// Resolved read outcome for one sensitive field.
///
/// `mask` is present exactly when `status` is masked.
#[derive(Debug, Clone)]
pub struct ReadDecision {
    pub status: AccessStatus,
    pub reason: Option<String>,
    pub mask: Option<Mask>,
}

impl ReadDecision {
    /// Hidden decision with an optional reason. Hidden never carries a mask.
    pub fn hidden(reason: Option<String>) -> Self {
        Self {
            status: AccessStatus::Hidden,
            reason,
            mask: None,
        }
    }
}

/// Resolved write outcome for one sensitive field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteDecision {
    pub allowed: bool,
    pub reason: Option<String>,
}

impl WriteDecision {
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn denied(reason: Option<String>) -> Self {
        Self {
            allowed: false,
            reason,
        }
    }
}

/// One field denied by write-policy validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeniedField {
    pub path: String,
    pub reason: String,
}

/// Aggregate result of validating a document against write policies.
///
/// Collects every denied field, not just the first.
#[derive(Debug, Clone)]
pub struct WriteValidation {
    pub allowed: bool,
    pub denied_fields: Vec<DeniedField>,
}

/// Resolved row-level outcome for one document and operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowDecision {
    pub allowed: bool,
    pub reason: Option<String>,
}

impl RowDecision {
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn denied(reason: &str) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.to_string()),
        }
    }
}
