use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::ShieldResult;
use crate::permissions::types::AccessStatus;

/// Transport form of a sensitive value.
///
/// Invariant: a hidden envelope's value is always JSON null; a masked
/// envelope's value is always the masked form, never the raw one. The
/// constructors and the deserializer both enforce the hidden invariant, so a
/// tampered wire document cannot smuggle a value under hidden status.
#[derive(Debug, Clone, PartialEq)]
pub struct SensitiveEnvelope {
    status: AccessStatus,
    value: Value,
    reason: Option<String>,
    field_marker: Option<String>,
}

impl SensitiveEnvelope {
    pub fn new(
        status: AccessStatus,
        value: Value,
        reason: Option<String>,
        field_marker: Option<String>,
    ) -> Self {
        let value = match status {
            AccessStatus::Hidden => Value::Null,
            _ => value,
        };
        Self {
            status,
            value,
            reason,
            field_marker,
        }
    }

    pub fn hidden(reason: Option<String>, field_marker: Option<String>) -> Self {
        Self::new(AccessStatus::Hidden, Value::Null, reason, field_marker)
    }

    pub fn status(&self) -> AccessStatus {
        self.status
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn field_marker(&self) -> Option<&str> {
        self.field_marker.as_deref()
    }

    /// Serializes the envelope into a JSON value for embedding in documents.
    pub fn to_value(&self) -> ShieldResult<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Parses an embedded envelope back out of a JSON value.
    ///
    /// Returns None for values that are not envelopes.
    pub fn from_value(value: &Value) -> Option<Self> {
        if !Self::is_envelope(value) {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    /// Whether a JSON value has the structural shape of a wire envelope.
    pub fn is_envelope(value: &Value) -> bool {
        let Some(map) = value.as_object() else {
            return false;
        };
        let Some(status) = map.get("status").and_then(Value::as_str) else {
            return false;
        };
        matches!(status, "full" | "masked" | "hidden") && map.contains_key("value")
    }
}

#[derive(Serialize, Deserialize)]
struct Helper {
    status: AccessStatus,
    value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    #[serde(rename = "fieldMarker", skip_serializing_if = "Option::is_none")]
    field_marker: Option<String>,
}

impl Serialize for SensitiveEnvelope {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let helper = Helper {
            status: self.status,
            value: self.value.clone(),
            reason: self.reason.clone(),
            field_marker: self.field_marker.clone(),
        };
        helper.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SensitiveEnvelope {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let helper = Helper::deserialize(deserializer)?;
        Ok(Self::new(
            helper.status,
            helper.value,
            helper.reason,
            helper.field_marker,
        ))
    }
}
