//! Common test fixtures shared by the integration tests.

use async_trait::async_trait;
use datashield::testing::{
    builtin_mask, AccessContext, AsyncEntitlementResolver, ReadPolicyTier, SchemaNode,
    SensitivePolicy, ShieldResult, Verdict, WritePolicy,
};
use serde_json::{json, Value};

/// Entitlement resolver granting a requirement when it equals the context's
/// `role` field.
pub struct RoleResolver;

#[async_trait]
impl AsyncEntitlementResolver for RoleResolver {
    async fn check(&self, access: &AccessContext<'_>, requirement: &Value) -> ShieldResult<Verdict> {
        Ok(Verdict::from(access.ctx.get("role") == Some(requirement)))
    }
}

/// Synchronous flavor of [`RoleResolver`].
pub fn role_resolver_sync() -> impl Fn(&AccessContext<'_>, &Value) -> ShieldResult<Verdict> {
    |access: &AccessContext<'_>, requirement: &Value| {
        Ok(Verdict::from(access.ctx.get("role") == Some(requirement)))
    }
}

/// A user document schema with a masked-for-users email and an admin-only
/// social security number.
pub fn user_schema() -> SchemaNode {
    SchemaNode::object([
        ("name", SchemaNode::string()),
        (
            "email",
            SchemaNode::string().with_policy(
                SensitivePolicy::new(vec![
                    ReadPolicyTier::full(json!("admin")),
                    ReadPolicyTier::masked(json!("user"), builtin_mask("email_domain").unwrap()),
                ])
                .with_write_policy(WritePolicy::new(json!("admin"))),
            ),
        ),
        (
            "ssn",
            SchemaNode::optional(SchemaNode::string().with_policy(
                SensitivePolicy::new(vec![ReadPolicyTier::full(json!("admin"))])
                    .with_write_policy(WritePolicy::new(json!("admin")).with_reason("admins_only")),
            )),
        ),
        ("owner", SchemaNode::string()),
    ])
}

pub fn admin_ctx() -> Value {
    json!({"role": "admin", "user": "admin_1"})
}

pub fn user_ctx(user: &str) -> Value {
    json!({"role": "user", "user": user})
}

pub fn guest_ctx() -> Value {
    json!({"role": "guest"})
}
