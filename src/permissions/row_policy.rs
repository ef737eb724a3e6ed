use async_trait::async_trait;
use log::warn;
use serde_json::Value;
use std::sync::Arc;

use crate::error::ShieldResult;

use super::policy_resolver::RESOLVER_ERROR_REASON;
use super::types::{RowDecision, RowOperation};

/// Everything a row rule may consult when authorizing one document.
#[derive(Debug, Clone, Copy)]
pub struct RowAccess<'a> {
    /// Caller-supplied request context
    pub ctx: &'a Value,
    /// Document being authorized; for updates, the candidate document
    pub doc: &'a Value,
    /// Previous document, present for update checks so authorization can
    /// depend on the delta
    pub previous: Option<&'a Value>,
}

/// Synchronous row rule.
pub type RowRuleFn = dyn Fn(&RowAccess<'_>) -> ShieldResult<bool> + Send + Sync;

/// Asynchronous row rule.
#[async_trait]
pub trait AsyncRowRule: Send + Sync {
    async fn allows(&self, access: &RowAccess<'_>) -> ShieldResult<bool>;
}

/// Per-operation allow predicates for one table, synchronous flavor.
///
/// Rule sets are supplied fresh per request by the caller. A missing rule
/// for an operation defaults to allow.
#[derive(Clone, Default)]
pub struct RowPolicy {
    pub read: Option<Arc<RowRuleFn>>,
    pub insert: Option<Arc<RowRuleFn>>,
    pub update: Option<Arc<RowRuleFn>>,
    pub delete: Option<Arc<RowRuleFn>>,
}

impl RowPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_read<F>(mut self, rule: F) -> Self
    where
        F: Fn(&RowAccess<'_>) -> ShieldResult<bool> + Send + Sync + 'static,
    {
        self.read = Some(Arc::new(rule));
        self
    }

    pub fn with_insert<F>(mut self, rule: F) -> Self
    where
        F: Fn(&RowAccess<'_>) -> ShieldResult<bool> + Send + Sync + 'static,
    {
        self.insert = Some(Arc::new(rule));
        self
    }

    pub fn with_update<F>(mut self, rule: F) -> Self
    where
        F: Fn(&RowAccess<'_>) -> ShieldResult<bool> + Send + Sync + 'static,
    {
        self.update = Some(Arc::new(rule));
        self
    }

    pub fn with_delete<F>(mut self, rule: F) -> Self
    where
        F: Fn(&RowAccess<'_>) -> ShieldResult<bool> + Send + Sync + 'static,
    {
        self.delete = Some(Arc::new(rule));
        self
    }

    fn rule_for(&self, operation: RowOperation) -> Option<&Arc<RowRuleFn>> {
        match operation {
            RowOperation::Read => self.read.as_ref(),
            RowOperation::Insert => self.insert.as_ref(),
            RowOperation::Update => self.update.as_ref(),
            RowOperation::Delete => self.delete.as_ref(),
        }
    }
}

/// Per-operation allow predicates for one table, asynchronous flavor.
#[derive(Clone, Default)]
pub struct AsyncRowPolicy {
    pub read: Option<Arc<dyn AsyncRowRule>>,
    pub insert: Option<Arc<dyn AsyncRowRule>>,
    pub update: Option<Arc<dyn AsyncRowRule>>,
    pub delete: Option<Arc<dyn AsyncRowRule>>,
}

impl AsyncRowPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_read(mut self, rule: Arc<dyn AsyncRowRule>) -> Self {
        self.read = Some(rule);
        self
    }

    pub fn with_insert(mut self, rule: Arc<dyn AsyncRowRule>) -> Self {
        self.insert = Some(rule);
        self
    }

    pub fn with_update(mut self, rule: Arc<dyn AsyncRowRule>) -> Self {
        self.update = Some(rule);
        self
    }

    pub fn with_delete(mut self, rule: Arc<dyn AsyncRowRule>) -> Self {
        self.delete = Some(rule);
        self
    }

    fn rule_for(&self, operation: RowOperation) -> Option<&Arc<dyn AsyncRowRule>> {
        match operation {
            RowOperation::Read => self.read.as_ref(),
            RowOperation::Insert => self.insert.as_ref(),
            RowOperation::Update => self.update.as_ref(),
            RowOperation::Delete => self.delete.as_ref(),
        }
    }
}

/// Adapter running a synchronous rule where an asynchronous one is expected.
struct SyncRule(Arc<RowRuleFn>);

#[async_trait]
impl AsyncRowRule for SyncRule {
    async fn allows(&self, access: &RowAccess<'_>) -> ShieldResult<bool> {
        (self.0)(access)
    }
}

impl From<RowPolicy> for AsyncRowPolicy {
    fn from(policy: RowPolicy) -> Self {
        let lift = |rule: Option<Arc<RowRuleFn>>| -> Option<Arc<dyn AsyncRowRule>> {
            rule.map(|r| Arc::new(SyncRule(r)) as Arc<dyn AsyncRowRule>)
        };
        Self {
            read: lift(policy.read),
            insert: lift(policy.insert),
            update: lift(policy.update),
            delete: lift(policy.delete),
        }
    }
}

fn decide(outcome: ShieldResult<bool>, operation: RowOperation) -> RowDecision {
    match outcome {
        Ok(true) => RowDecision::allowed(),
        Ok(false) => RowDecision::denied(operation.denial_reason()),
        Err(e) => {
            warn!(
                "ROW POLICY: {} rule failed, denying access: {}",
                operation.as_str(),
                e
            );
            RowDecision::denied(RESOLVER_ERROR_REASON)
        }
    }
}

/// Checks one document against the rule for `operation`.
///
/// Update checks receive both the previous and the candidate document. A
/// failing rule denies rather than propagating, so predicate errors can
/// never grant access.
pub fn check_row_access(
    ctx: &Value,
    doc: &Value,
    policy: Option<&RowPolicy>,
    operation: RowOperation,
    previous: Option<&Value>,
) -> RowDecision {
    let Some(rule) = policy.and_then(|p| p.rule_for(operation)) else {
        return RowDecision::allowed();
    };
    let access = RowAccess { ctx, doc, previous };
    decide(rule(&access), operation)
}

/// Asynchronous counterpart of [`check_row_access`].
pub async fn check_row_access_async(
    ctx: &Value,
    doc: &Value,
    policy: Option<&AsyncRowPolicy>,
    operation: RowOperation,
    previous: Option<&Value>,
) -> RowDecision {
    let Some(rule) = policy.and_then(|p| p.rule_for(operation)) else {
        return RowDecision::allowed();
    };
    let access = RowAccess { ctx, doc, previous };
    decide(rule.allows(&access).await, operation)
}

/// Filters a collection through the read rule, preserving input order.
///
/// Returns all documents when no rule is configured.
pub fn filter_by_row_policy(ctx: &Value, docs: &[Value], policy: Option<&RowPolicy>) -> Vec<Value> {
    docs.iter()
        .filter(|doc| check_row_access(ctx, doc, policy, RowOperation::Read, None).allowed)
        .cloned()
        .collect()
}

/// Asynchronous counterpart of [`filter_by_row_policy`].
pub async fn filter_by_row_policy_async(
    ctx: &Value,
    docs: &[Value],
    policy: Option<&AsyncRowPolicy>,
) -> Vec<Value> {
    let mut allowed = Vec::with_capacity(docs.len());
    for doc in docs {
        if check_row_access_async(ctx, doc, policy, RowOperation::Read, None)
            .await
            .allowed
        {
            allowed.push(doc.clone());
        }
    }
    allowed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn owner_policy() -> RowPolicy {
        RowPolicy::new().with_read(|access: &RowAccess<'_>| {
            Ok(access.doc.get("owner") == access.ctx.get("user"))
        })
    }

    #[test]
    fn missing_rule_defaults_to_allow() {
        let ctx = json!({"user": "jane"});
        let doc = json!({"owner": "someone_else"});

        let decision = check_row_access(&ctx, &doc, None, RowOperation::Read, None);
        assert!(decision.allowed);

        let decision =
            check_row_access(&ctx, &doc, Some(&owner_policy()), RowOperation::Delete, None);
        assert!(decision.allowed);
    }

    #[test]
    fn denial_reason_names_the_operation() {
        let ctx = json!({"user": "jane"});
        let doc = json!({"owner": "bob"});

        let decision = check_row_access(&ctx, &doc, Some(&owner_policy()), RowOperation::Read, None);
        assert!(!decision.allowed);
        assert_eq!(decision.reason.as_deref(), Some("rls_read_denied"));
    }

    #[test]
    fn update_rule_sees_previous_and_candidate() {
        // Ownership transfers are forbidden: the owner must not change.
        let policy = RowPolicy::new().with_update(|access: &RowAccess<'_>| {
            let previous = access.previous.expect("update checks carry the previous doc");
            Ok(previous.get("owner") == access.doc.get("owner"))
        });

        let ctx = json!({"user": "jane"});
        let previous = json!({"owner": "jane", "title": "old"});

        let same_owner = json!({"owner": "jane", "title": "new"});
        let decision = check_row_access(
            &ctx,
            &same_owner,
            Some(&policy),
            RowOperation::Update,
            Some(&previous),
        );
        assert!(decision.allowed);

        let transferred = json!({"owner": "bob", "title": "new"});
        let decision = check_row_access(
            &ctx,
            &transferred,
            Some(&policy),
            RowOperation::Update,
            Some(&previous),
        );
        assert!(!decision.allowed);
        assert_eq!(decision.reason.as_deref(), Some("rls_update_denied"));
    }

    #[test]
    fn failing_rule_denies_instead_of_propagating() {
        let policy = RowPolicy::new().with_read(|_: &RowAccess<'_>| {
            Err(crate::error::ShieldError::Config("predicate backend down".to_string()))
        });
        let decision =
            check_row_access(&json!({}), &json!({}), Some(&policy), RowOperation::Read, None);
        assert!(!decision.allowed);
        assert_eq!(decision.reason.as_deref(), Some(RESOLVER_ERROR_REASON));
    }

    #[test]
    fn filter_preserves_original_relative_order() {
        let docs: Vec<Value> = (1..=5).map(|i| json!({"n": i})).collect();
        let policy = RowPolicy::new()
            .with_read(|access: &RowAccess<'_>| Ok(access.doc["n"].as_i64().unwrap() % 2 == 1));

        let allowed = filter_by_row_policy(&json!({}), &docs, Some(&policy));
        assert_eq!(allowed, vec![json!({"n": 1}), json!({"n": 3}), json!({"n": 5})]);
    }

    #[test]
    fn filter_without_rule_returns_all_documents() {
        let docs = vec![json!({"n": 1}), json!({"n": 2})];
        let allowed = filter_by_row_policy(&json!({}), &docs, None);
        assert_eq!(allowed, docs);
    }

    #[tokio::test]
    async fn sync_policies_lift_into_async() {
        let policy: AsyncRowPolicy = owner_policy().into();
        let ctx = json!({"user": "jane"});

        let mine = json!({"owner": "jane"});
        let decision = check_row_access_async(&ctx, &mine, Some(&policy), RowOperation::Read, None).await;
        assert!(decision.allowed);

        let theirs = json!({"owner": "bob"});
        let decision =
            check_row_access_async(&ctx, &theirs, Some(&policy), RowOperation::Read, None).await;
        assert!(!decision.allowed);
    }

    #[tokio::test]
    async fn async_filter_preserves_order() {
        struct OddRule;

        #[async_trait]
        impl AsyncRowRule for OddRule {
            async fn allows(&self, access: &RowAccess<'_>) -> ShieldResult<bool> {
                Ok(access.doc["n"].as_i64().unwrap() % 2 == 1)
            }
        }

        let docs: Vec<Value> = (1..=5).map(|i| json!({"n": i})).collect();
        let policy = AsyncRowPolicy::new().with_read(Arc::new(OddRule));

        let allowed = filter_by_row_policy_async(&json!({}), &docs, Some(&policy)).await;
        assert_eq!(allowed, vec![json!({"n": 1}), json!({"n": 3}), json!({"n": 5})]);
    }
}
