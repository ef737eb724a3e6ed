use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Signature of a masking function.
///
/// Masks are pure value-to-value transformations. Anything that needs IO to
/// produce a masked form belongs in the entitlement resolver instead.
pub type MaskFn = dyn Fn(&Value) -> Value + Send + Sync;

/// A named masking function applied to sensitive values granted masked access.
#[derive(Clone)]
pub struct Mask {
    name: String,
    apply: Arc<MaskFn>,
}

impl Mask {
    pub fn new<F>(name: &str, apply: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            apply: Arc::new(apply),
        }
    }

    /// Name used to reference this mask from configuration and audit output.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Applies the mask to a raw value, producing the masked form.
    pub fn apply(&self, value: &Value) -> Value {
        (self.apply)(value)
    }
}

impl fmt::Debug for Mask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mask({})", self.name)
    }
}

/// Access level granted by a read-policy tier when its requirement is met.
///
/// Hidden is intentionally absent: it is never granted by a tier, only
/// reached when no tier matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TierStatus {
    Full,
    Masked,
}

/// One ordered rule in a field's read policy.
///
/// Tiers are evaluated in declaration order; the first tier whose requirement
/// is satisfied by the entitlement resolver wins.
#[derive(Debug, Clone)]
pub struct ReadPolicyTier {
    /// Access level granted when this tier matches
    pub status: TierStatus,
    /// Opaque requirement value handed to the entitlement resolver
    pub requirement: Value,
    /// Mask applied when the granted status is masked
    pub mask: Option<Mask>,
    /// Reason reported with the decision, unless the resolver supplies one
    pub reason: Option<String>,
}

impl ReadPolicyTier {
    /// Creates a tier granting full access when `requirement` is satisfied.
    pub fn full(requirement: Value) -> Self {
        Self {
            status: TierStatus::Full,
            requirement,
            mask: None,
            reason: None,
        }
    }

    /// Creates a tier granting masked access when `requirement` is satisfied.
    pub fn masked(requirement: Value, mask: Mask) -> Self {
        Self {
            status: TierStatus::Masked,
            requirement,
            mask: Some(mask),
            reason: None,
        }
    }

    /// Sets the reason reported when this tier grants access.
    pub fn with_reason(mut self, reason: &str) -> Self {
        self.reason = Some(reason.to_string());
        self
    }
}

/// Requirement gating writes to a sensitive field.
#[derive(Debug, Clone)]
pub struct WritePolicy {
    /// Opaque requirement value handed to the entitlement resolver
    pub requirement: Value,
    /// Reason reported on denial, unless the resolver supplies one
    pub reason: Option<String>,
}

impl WritePolicy {
    pub fn new(requirement: Value) -> Self {
        Self {
            requirement,
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: &str) -> Self {
        self.reason = Some(reason.to_string());
        self
    }
}

/// Policy metadata attached to a sensitive schema node.
///
/// Set at definition time and read-only thereafter. Attaching a policy does
/// not alter the node's structural validation behavior.
#[derive(Debug, Clone, Default)]
pub struct SensitivePolicy {
    /// Ordered read-policy tiers; empty means no caller is ever granted access
    pub read_policy: Vec<ReadPolicyTier>,
    /// Write requirement; absence means writes are allowed
    pub write_policy: Option<WritePolicy>,
    /// Marker stamped into wire envelopes produced for this field
    pub field_marker: Option<String>,
}

impl SensitivePolicy {
    pub fn new(read_policy: Vec<ReadPolicyTier>) -> Self {
        Self {
            read_policy,
            write_policy: None,
            field_marker: None,
        }
    }

    pub fn with_write_policy(mut self, write_policy: WritePolicy) -> Self {
        self.write_policy = Some(write_policy);
        self
    }

    pub fn with_field_marker(mut self, marker: &str) -> Self {
        self.field_marker = Some(marker.to_string());
        self
    }
}

/// Name of the mask used when a masked tier does not name one explicitly.
pub const DEFAULT_MASK: &str = "redact_all";

/// Built-in masks addressable by name.
///
/// Built once and treated as read-only for the lifetime of the process.
static BUILTIN_MASKS: Lazy<HashMap<String, Mask>> = Lazy::new(|| {
    let mut masks = HashMap::new();

    masks.insert(
        "redact_all".to_string(),
        Mask::new("redact_all", |_| json!("***")),
    );

    masks.insert(
        "last4".to_string(),
        Mask::new("last4", |value| match value.as_str() {
            Some(s) if s.chars().count() > 4 => {
                let chars: Vec<char> = s.chars().collect();
                let keep = chars.len() - 4;
                let masked: String = "*".repeat(keep).chars().chain(chars[keep..].iter().copied()).collect();
                json!(masked)
            }
            Some(s) => json!("*".repeat(s.chars().count())),
            None => json!("***"),
        }),
    );

    masks.insert(
        "email_domain".to_string(),
        Mask::new("email_domain", |value| match value.as_str() {
            Some(s) => match s.split_once('@') {
                Some((_, domain)) => json!(format!("***@{}", domain)),
                None => json!("***"),
            },
            None => json!("***"),
        }),
    );

    masks
});

/// Looks up a built-in mask by name.
pub fn builtin_mask(name: &str) -> Option<Mask> {
    BUILTIN_MASKS.get(name).cloned()
}
