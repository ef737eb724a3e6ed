use async_trait::async_trait;
use log::{info, warn};
use serde_json::Value;

use crate::error::ShieldResult;

use super::types::policy::{builtin_mask, TierStatus, DEFAULT_MASK};
use super::types::{AccessContext, AccessStatus, ReadDecision, Verdict, WriteDecision};

/// Reason attached to decisions produced from a failing entitlement check.
pub const RESOLVER_ERROR_REASON: &str = "resolver_error";

/// Externally supplied entitlement check, synchronous flavor.
///
/// The single integration point of the policy engine: given the access
/// context and one requirement value, decide whether the caller satisfies it.
/// Implemented for any matching closure.
pub trait EntitlementResolver {
    fn check(&self, access: &AccessContext<'_>, requirement: &Value) -> ShieldResult<Verdict>;
}

impl<F> EntitlementResolver for F
where
    F: Fn(&AccessContext<'_>, &Value) -> ShieldResult<Verdict>,
{
    fn check(&self, access: &AccessContext<'_>, requirement: &Value) -> ShieldResult<Verdict> {
        self(access, requirement)
    }
}

/// Externally supplied entitlement check, asynchronous flavor.
#[async_trait]
pub trait AsyncEntitlementResolver: Send + Sync {
    async fn check(&self, access: &AccessContext<'_>, requirement: &Value) -> ShieldResult<Verdict>;
}

/// Evaluates read-policy tiers and write policies against an entitlement
/// resolver.
///
/// The resolver is fail-closed: any error returned by the entitlement check
/// is caught here and converted to the safest outcome (hidden for reads,
/// denied for writes) with reason `resolver_error`. It is never re-thrown
/// and never defaults open.
#[derive(Debug, Clone, Default)]
pub struct PolicyResolver {
    default_deny_reason: Option<String>,
}

impl PolicyResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the reason reported when no read tier matches.
    #[must_use]
    pub fn with_default_deny_reason(mut self, reason: &str) -> Self {
        self.default_deny_reason = Some(reason.to_string());
        self
    }

    /// Resolves the read access level for one sensitive field.
    ///
    /// Tiers are consulted in declaration order and the first tier whose
    /// check returns ok wins; later tiers are never consulted. When no tier
    /// matches the decision is hidden.
    pub fn resolve_read(
        &self,
        access: &AccessContext<'_>,
        resolver: &dyn EntitlementResolver,
    ) -> ReadDecision {
        for tier in &access.policy.read_policy {
            match resolver.check(access, &tier.requirement) {
                Ok(verdict) if verdict.ok => {
                    info!(
                        "READ POLICY: path={} tier status={:?} matched",
                        access.path, tier.status
                    );
                    return Self::granted(tier, verdict);
                }
                Ok(_) => continue,
                Err(e) => {
                    warn!(
                        "READ POLICY: path={} entitlement check failed, hiding value: {}",
                        access.path, e
                    );
                    return ReadDecision::hidden(Some(RESOLVER_ERROR_REASON.to_string()));
                }
            }
        }

        info!("READ POLICY: path={} no tier matched, hiding value", access.path);
        ReadDecision::hidden(self.default_deny_reason.clone())
    }

    /// Resolves the write permission for one sensitive field.
    ///
    /// A field without a write policy is writable.
    pub fn resolve_write(
        &self,
        access: &AccessContext<'_>,
        resolver: &dyn EntitlementResolver,
    ) -> WriteDecision {
        let Some(write_policy) = &access.policy.write_policy else {
            return WriteDecision::allowed();
        };

        match resolver.check(access, &write_policy.requirement) {
            Ok(verdict) if verdict.ok => WriteDecision::allowed(),
            Ok(verdict) => {
                info!("WRITE POLICY: path={} denied", access.path);
                WriteDecision::denied(verdict.reason.or_else(|| write_policy.reason.clone()))
            }
            Err(e) => {
                warn!(
                    "WRITE POLICY: path={} entitlement check failed, denying write: {}",
                    access.path, e
                );
                WriteDecision::denied(Some(RESOLVER_ERROR_REASON.to_string()))
            }
        }
    }

    /// Asynchronous counterpart of [`PolicyResolver::resolve_read`].
    pub async fn resolve_read_async(
        &self,
        access: &AccessContext<'_>,
        resolver: &dyn AsyncEntitlementResolver,
    ) -> ReadDecision {
        for tier in &access.policy.read_policy {
            match resolver.check(access, &tier.requirement).await {
                Ok(verdict) if verdict.ok => {
                    info!(
                        "READ POLICY: path={} tier status={:?} matched",
                        access.path, tier.status
                    );
                    return Self::granted(tier, verdict);
                }
                Ok(_) => continue,
                Err(e) => {
                    warn!(
                        "READ POLICY: path={} entitlement check failed, hiding value: {}",
                        access.path, e
                    );
                    return ReadDecision::hidden(Some(RESOLVER_ERROR_REASON.to_string()));
                }
            }
        }

        info!("READ POLICY: path={} no tier matched, hiding value", access.path);
        ReadDecision::hidden(self.default_deny_reason.clone())
    }

    /// Asynchronous counterpart of [`PolicyResolver::resolve_write`].
    pub async fn resolve_write_async(
        &self,
        access: &AccessContext<'_>,
        resolver: &dyn AsyncEntitlementResolver,
    ) -> WriteDecision {
        let Some(write_policy) = &access.policy.write_policy else {
            return WriteDecision::allowed();
        };

        match resolver.check(access, &write_policy.requirement).await {
            Ok(verdict) if verdict.ok => WriteDecision::allowed(),
            Ok(verdict) => {
                info!("WRITE POLICY: path={} denied", access.path);
                WriteDecision::denied(verdict.reason.or_else(|| write_policy.reason.clone()))
            }
            Err(e) => {
                warn!(
                    "WRITE POLICY: path={} entitlement check failed, denying write: {}",
                    access.path, e
                );
                WriteDecision::denied(Some(RESOLVER_ERROR_REASON.to_string()))
            }
        }
    }

    /// Builds the decision for a matched tier.
    ///
    /// A resolver-supplied reason overrides the tier's own. A masked tier
    /// that names no mask gets the built-in default so a masked decision
    /// always carries one.
    fn granted(tier: &super::types::ReadPolicyTier, verdict: Verdict) -> ReadDecision {
        let reason = verdict.reason.or_else(|| tier.reason.clone());
        match tier.status {
            TierStatus::Full => ReadDecision {
                status: AccessStatus::Full,
                reason,
                mask: None,
            },
            TierStatus::Masked => ReadDecision {
                status: AccessStatus::Masked,
                reason,
                mask: tier.mask.clone().or_else(|| builtin_mask(DEFAULT_MASK)),
            },
        }
    }
}
