use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};

use crate::error::{ShieldError, ShieldResult};
use crate::schema::{SchemaCore, SchemaNode};
use crate::sensitive::SensitiveValue;
use crate::transform::{
    transform_value, transform_value_async, AsyncValueTransform, TransformOptions, TransformScope,
    UnmatchedCallback, UnmatchedUnionPolicy,
};

use super::policy_resolver::{
    AsyncEntitlementResolver, EntitlementResolver, PolicyResolver,
};
use super::types::{AccessContext, DeniedField, Operation, WriteValidation};

/// Options for one policy application.
#[derive(Clone, Default)]
pub struct ApplyOptions {
    /// Audit callback fired at every unmatched union occurrence
    pub on_unmatched: Option<UnmatchedCallback>,
    /// Fan out array element processing. Asynchronous application only.
    pub parallel: bool,
}

/// Applies read and write policies to whole documents.
///
/// Composes the schema-guided transformer with the policy resolver: every
/// sensitive node is resolved to a read or write decision, reads are
/// rewritten into wire envelopes, and writes are collected into an aggregate
/// validation result. Union handling is inherited from the transformer and
/// fail-closed: on reads an unmatched union redacts its entire subtree, on
/// writes it fails validation outright.
pub struct PolicyApplier<'a> {
    core: &'a SchemaCore,
    resolver: PolicyResolver,
}

impl<'a> PolicyApplier<'a> {
    pub fn new(core: &'a SchemaCore) -> Self {
        Self {
            core,
            resolver: PolicyResolver::new(),
        }
    }

    /// Replaces the tier-evaluation configuration.
    #[must_use]
    pub fn with_resolver(mut self, resolver: PolicyResolver) -> Self {
        self.resolver = resolver;
        self
    }

    fn read_options(&self, options: &ApplyOptions) -> TransformOptions {
        TransformOptions {
            unmatched_union: UnmatchedUnionPolicy::Null,
            on_unmatched: options.on_unmatched.clone(),
            should_transform: Some(Arc::new(|node: &SchemaNode| node.is_sensitive())),
            parallel: options.parallel,
        }
    }

    fn write_options(&self, options: &ApplyOptions) -> TransformOptions {
        TransformOptions {
            unmatched_union: UnmatchedUnionPolicy::Error,
            on_unmatched: options.on_unmatched.clone(),
            should_transform: Some(Arc::new(|node: &SchemaNode| node.is_sensitive())),
            parallel: options.parallel,
        }
    }

    /// Redacts every sensitive field of `doc` to the caller's access level,
    /// rewriting each into its wire envelope.
    pub fn apply_read_policy(
        &self,
        doc: &Value,
        schema: &Arc<SchemaNode>,
        ctx: &Value,
        entitlements: &dyn EntitlementResolver,
        options: &ApplyOptions,
    ) -> ShieldResult<Value> {
        let mut redact = |value: &Value, scope: &TransformScope<'_>| -> ShieldResult<Value> {
            let Some(policy) = scope.policy else {
                return Ok(value.clone());
            };
            let access = AccessContext {
                ctx: scope.ctx,
                path: scope.path,
                policy,
                doc: Some(doc),
                operation: Operation::Read,
            };
            let decision = self.resolver.resolve_read(&access, entitlements);
            let sensitive =
                SensitiveValue::from_decision(value.clone(), &decision, policy.field_marker.clone());
            sensitive.to_wire().to_value()
        };
        transform_value(doc, schema, self.core, ctx, &mut redact, &self.read_options(options))
    }

    /// Asynchronous counterpart of [`PolicyApplier::apply_read_policy`].
    pub async fn apply_read_policy_async(
        &self,
        doc: &Value,
        schema: &Arc<SchemaNode>,
        ctx: &Value,
        entitlements: &dyn AsyncEntitlementResolver,
        options: &ApplyOptions,
    ) -> ShieldResult<Value> {
        let redactor = ReadRedactor {
            resolver: &self.resolver,
            entitlements,
            doc,
        };
        transform_value_async(doc, schema, self.core, ctx, &redactor, &self.read_options(options))
            .await
    }

    /// Validates every sensitive field of `doc` against its write policy.
    ///
    /// Collects every denied field, not just the first.
    pub fn validate_write_policy(
        &self,
        doc: &Value,
        schema: &Arc<SchemaNode>,
        ctx: &Value,
        entitlements: &dyn EntitlementResolver,
    ) -> ShieldResult<WriteValidation> {
        let mut denied = Vec::new();
        let mut check = |value: &Value, scope: &TransformScope<'_>| -> ShieldResult<Value> {
            let Some(policy) = scope.policy else {
                return Ok(value.clone());
            };
            let access = AccessContext {
                ctx: scope.ctx,
                path: scope.path,
                policy,
                doc: Some(doc),
                operation: Operation::Write,
            };
            let decision = self.resolver.resolve_write(&access, entitlements);
            if !decision.allowed {
                denied.push(DeniedField {
                    path: scope.path.to_string(),
                    reason: decision.reason.unwrap_or_else(|| "write_denied".to_string()),
                });
            }
            // The first sensitive node along a path is the write boundary;
            // stop descending the way the read side does.
            Ok(Value::Null)
        };
        transform_value(
            doc,
            schema,
            self.core,
            ctx,
            &mut check,
            &self.write_options(&ApplyOptions::default()),
        )?;
        Ok(WriteValidation {
            allowed: denied.is_empty(),
            denied_fields: denied,
        })
    }

    /// Asynchronous counterpart of [`PolicyApplier::validate_write_policy`].
    pub async fn validate_write_policy_async(
        &self,
        doc: &Value,
        schema: &Arc<SchemaNode>,
        ctx: &Value,
        entitlements: &dyn AsyncEntitlementResolver,
    ) -> ShieldResult<WriteValidation> {
        let checker = WriteChecker {
            resolver: &self.resolver,
            entitlements,
            doc,
            denied: Mutex::new(Vec::new()),
        };
        transform_value_async(
            doc,
            schema,
            self.core,
            ctx,
            &checker,
            &self.write_options(&ApplyOptions::default()),
        )
        .await?;
        let denied = checker.denied.into_inner().map_err(|_| {
            ShieldError::Permission("Cannot collect denied fields".to_string())
        })?;
        Ok(WriteValidation {
            allowed: denied.is_empty(),
            denied_fields: denied,
        })
    }

    /// Raises a single error enumerating every denied path when any exist.
    pub fn assert_write_allowed(
        &self,
        doc: &Value,
        schema: &Arc<SchemaNode>,
        ctx: &Value,
        entitlements: &dyn EntitlementResolver,
    ) -> ShieldResult<()> {
        let validation = self.validate_write_policy(doc, schema, ctx, entitlements)?;
        write_validation_to_result(validation)
    }

    /// Asynchronous counterpart of [`PolicyApplier::assert_write_allowed`].
    pub async fn assert_write_allowed_async(
        &self,
        doc: &Value,
        schema: &Arc<SchemaNode>,
        ctx: &Value,
        entitlements: &dyn AsyncEntitlementResolver,
    ) -> ShieldResult<()> {
        let validation = self
            .validate_write_policy_async(doc, schema, ctx, entitlements)
            .await?;
        write_validation_to_result(validation)
    }
}

/// Formats an aggregate validation into the single write-denied error.
pub fn write_validation_to_result(validation: WriteValidation) -> ShieldResult<()> {
    if validation.allowed {
        return Ok(());
    }
    let details: Vec<String> = validation
        .denied_fields
        .iter()
        .map(|field| format!("{} ({})", field.path, field.reason))
        .collect();
    Err(ShieldError::Permission(format!(
        "Write denied for {} field(s): {}",
        validation.denied_fields.len(),
        details.join(", ")
    )))
}

struct ReadRedactor<'a> {
    resolver: &'a PolicyResolver,
    entitlements: &'a dyn AsyncEntitlementResolver,
    doc: &'a Value,
}

#[async_trait]
impl AsyncValueTransform for ReadRedactor<'_> {
    async fn apply(&self, value: &Value, scope: &TransformScope<'_>) -> ShieldResult<Value> {
        let Some(policy) = scope.policy else {
            return Ok(value.clone());
        };
        let access = AccessContext {
            ctx: scope.ctx,
            path: scope.path,
            policy,
            doc: Some(self.doc),
            operation: Operation::Read,
        };
        let decision = self.resolver.resolve_read_async(&access, self.entitlements).await;
        let sensitive =
            SensitiveValue::from_decision(value.clone(), &decision, policy.field_marker.clone());
        sensitive.to_wire().to_value()
    }
}

struct WriteChecker<'a> {
    resolver: &'a PolicyResolver,
    entitlements: &'a dyn AsyncEntitlementResolver,
    doc: &'a Value,
    denied: Mutex<Vec<DeniedField>>,
}

#[async_trait]
impl AsyncValueTransform for WriteChecker<'_> {
    async fn apply(&self, value: &Value, scope: &TransformScope<'_>) -> ShieldResult<Value> {
        let Some(policy) = scope.policy else {
            return Ok(value.clone());
        };
        let access = AccessContext {
            ctx: scope.ctx,
            path: scope.path,
            policy,
            doc: Some(self.doc),
            operation: Operation::Write,
        };
        let decision = self.resolver.resolve_write_async(&access, self.entitlements).await;
        if !decision.allowed {
            let mut denied = self.denied.lock().map_err(|_| {
                ShieldError::Permission("Cannot collect denied fields".to_string())
            })?;
            denied.push(DeniedField {
                path: scope.path.to_string(),
                reason: decision.reason.unwrap_or_else(|| "write_denied".to_string()),
            });
        }
        Ok(Value::Null)
    }
}
