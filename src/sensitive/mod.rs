//! # Sensitive Values
//!
//! Runtime representation of policy-reduced values and their serialized
//! forms.
//!
//! ## Components
//!
//! * `wire` - Status-tagged transport envelope
//! * `at_rest` - Reserved-key storage wrapper with integrity checksums
//!
//! A [`SensitiveValue`] holds the raw value privately; the only way to reach
//! it is the status-aware [`SensitiveValue::expose`] accessor, and the only
//! sanctioned serialization is the explicit wire envelope. Default
//! stringification and serde output render a fixed placeholder.

pub mod at_rest;
pub mod wire;

use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;

use crate::permissions::types::{AccessStatus, ReadDecision};

pub use at_rest::{is_storage_wrapper, unwrap_document, unwrap_value, wrap_document, wrap_value};
pub use wire::SensitiveEnvelope;

/// Placeholder emitted by every non-sanctioned rendering of a sensitive value.
pub const REDACTED_PLACEHOLDER: &str = "[REDACTED]";

/// A status-tagged sensitive value produced while applying a read policy.
///
/// Created during one read operation and discarded after serialization; the
/// raw value is private and never enumerable through `Debug`, `Display` or
/// default serde output.
#[derive(Clone)]
pub struct SensitiveValue {
    status: AccessStatus,
    reason: Option<String>,
    field_marker: Option<String>,
    raw: Value,
    masked: Option<Value>,
}

impl SensitiveValue {
    /// Builds a sensitive value from a raw value and a resolved read
    /// decision.
    ///
    /// A masked decision without a mask must not expose the raw form, so it
    /// degrades to hidden.
    pub fn from_decision(raw: Value, decision: &ReadDecision, field_marker: Option<String>) -> Self {
        let (status, masked) = match (decision.status, &decision.mask) {
            (AccessStatus::Masked, Some(mask)) => (AccessStatus::Masked, Some(mask.apply(&raw))),
            (AccessStatus::Masked, None) => (AccessStatus::Hidden, None),
            (status, _) => (status, None),
        };
        Self {
            status,
            reason: decision.reason.clone(),
            field_marker,
            raw,
            masked,
        }
    }

    pub fn status(&self) -> AccessStatus {
        self.status
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn field_marker(&self) -> Option<&str> {
        self.field_marker.as_deref()
    }

    /// Status-aware accessor for the underlying value.
    ///
    /// Hidden yields nothing, masked yields the masked form, full yields the
    /// raw value. There is no other way to reach the raw value.
    pub fn expose(&self) -> Option<&Value> {
        match self.status {
            AccessStatus::Hidden => None,
            AccessStatus::Masked => self.masked.as_ref(),
            AccessStatus::Full => Some(&self.raw),
        }
    }

    /// Converts into the wire envelope, the only sanctioned serialization.
    pub fn to_wire(&self) -> SensitiveEnvelope {
        SensitiveEnvelope::new(
            self.status,
            self.expose().cloned().unwrap_or(Value::Null),
            self.reason.clone(),
            self.field_marker.clone(),
        )
    }
}

impl fmt::Debug for SensitiveValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SensitiveValue")
            .field("status", &self.status)
            .field("value", &REDACTED_PLACEHOLDER)
            .finish()
    }
}

impl fmt::Display for SensitiveValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", REDACTED_PLACEHOLDER)
    }
}

/// Default serde output renders the placeholder, never the raw value.
impl Serialize for SensitiveValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(REDACTED_PLACEHOLDER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::types::builtin_mask;
    use serde_json::json;

    fn decision(status: AccessStatus, mask_name: Option<&str>) -> ReadDecision {
        ReadDecision {
            status,
            reason: None,
            mask: mask_name.and_then(builtin_mask),
        }
    }

    #[test]
    fn expose_gates_by_status() {
        let raw = json!("secret@example.com");

        let full = SensitiveValue::from_decision(raw.clone(), &decision(AccessStatus::Full, None), None);
        assert_eq!(full.expose(), Some(&raw));

        let masked = SensitiveValue::from_decision(
            raw.clone(),
            &decision(AccessStatus::Masked, Some("email_domain")),
            None,
        );
        assert_eq!(masked.expose(), Some(&json!("***@example.com")));

        let hidden = SensitiveValue::from_decision(raw, &decision(AccessStatus::Hidden, None), None);
        assert_eq!(hidden.expose(), None);
    }

    #[test]
    fn masked_without_mask_degrades_to_hidden() {
        let value = SensitiveValue::from_decision(
            json!("secret"),
            &decision(AccessStatus::Masked, None),
            None,
        );
        assert_eq!(value.status(), AccessStatus::Hidden);
        assert_eq!(value.expose(), None);
    }

    #[test]
    fn debug_and_display_never_leak_the_raw_value() {
        let value = SensitiveValue::from_decision(
            json!("super-secret"),
            &decision(AccessStatus::Full, None),
            None,
        );
        assert!(!format!("{:?}", value).contains("super-secret"));
        assert!(!format!("{}", value).contains("super-secret"));
        assert_eq!(format!("{}", value), REDACTED_PLACEHOLDER);
    }

    #[test]
    fn default_serialization_is_the_placeholder() {
        let value = SensitiveValue::from_decision(
            json!("super-secret"),
            &decision(AccessStatus::Full, None),
            None,
        );
        let serialized = serde_json::to_string(&value).unwrap();
        assert_eq!(serialized, format!("\"{}\"", REDACTED_PLACEHOLDER));
    }

    #[test]
    fn wire_envelope_is_the_sanctioned_path() {
        let value = SensitiveValue::from_decision(
            json!("raw"),
            &decision(AccessStatus::Full, None),
            Some("pii".to_string()),
        );
        let envelope = value.to_wire();
        assert_eq!(envelope.status(), AccessStatus::Full);
        assert_eq!(envelope.value(), &json!("raw"));
        assert_eq!(envelope.field_marker(), Some("pii"));
    }
}
