mod common;

use common::{admin_ctx, guest_ctx, role_resolver_sync, user_ctx, user_schema};
use datashield::testing::{
    builtin_mask, AccessContext, AccessStatus, ApplyOptions, PolicyApplier, ReadPolicyTier,
    SchemaCore, SchemaNode, SensitiveEnvelope, SensitivePolicy, ShieldResult, Verdict,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

#[test]
fn user_role_gets_masked_email() {
    let core = SchemaCore::new();
    let schema = Arc::new(user_schema());
    let doc = json!({"name": "jane", "email": "jane@example.com", "owner": "jane"});

    let applier = PolicyApplier::new(&core);
    let out = applier
        .apply_read_policy(
            &doc,
            &schema,
            &user_ctx("jane"),
            &role_resolver_sync(),
            &ApplyOptions::default(),
        )
        .unwrap();

    let envelope = SensitiveEnvelope::from_value(&out["email"]).unwrap();
    assert_eq!(envelope.status(), AccessStatus::Masked);
    assert_eq!(
        envelope.value(),
        &builtin_mask("email_domain").unwrap().apply(&json!("jane@example.com"))
    );
    // Non-sensitive fields come through untouched.
    assert_eq!(out["name"], json!("jane"));
}

#[test]
fn guest_role_gets_hidden_email() {
    let core = SchemaCore::new();
    let schema = Arc::new(user_schema());
    let doc = json!({"name": "jane", "email": "jane@example.com", "owner": "jane"});

    let applier = PolicyApplier::new(&core);
    let out = applier
        .apply_read_policy(
            &doc,
            &schema,
            &guest_ctx(),
            &role_resolver_sync(),
            &ApplyOptions::default(),
        )
        .unwrap();

    let envelope = SensitiveEnvelope::from_value(&out["email"]).unwrap();
    assert_eq!(envelope.status(), AccessStatus::Hidden);
    assert!(envelope.value().is_null());
}

#[test]
fn admin_sees_both_array_elements_in_order() {
    let core = SchemaCore::new();
    let schema = Arc::new(SchemaNode::array(SchemaNode::string().with_policy(
        SensitivePolicy::new(vec![ReadPolicyTier::full(json!("admin"))]),
    )));
    let doc = json!(["alpha", "beta"]);

    let paths = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&paths);
    let resolver = move |access: &AccessContext<'_>, requirement: &Value| -> ShieldResult<Verdict> {
        recorded.lock().unwrap().push(access.path.to_string());
        Ok(Verdict::from(access.ctx.get("role") == Some(requirement)))
    };

    let applier = PolicyApplier::new(&core);
    let out = applier
        .apply_read_policy(&doc, &schema, &admin_ctx(), &resolver, &ApplyOptions::default())
        .unwrap();

    let items = out.as_array().unwrap();
    assert_eq!(items.len(), 2);
    for (item, raw) in items.iter().zip(["alpha", "beta"]) {
        let envelope = SensitiveEnvelope::from_value(item).unwrap();
        assert_eq!(envelope.status(), AccessStatus::Full);
        assert_eq!(envelope.value(), &json!(raw));
    }
    assert_eq!(
        &*paths.lock().unwrap(),
        &vec!["[0]".to_string(), "[1]".to_string()]
    );
}

#[test]
fn field_marker_is_stamped_into_envelopes() {
    let core = SchemaCore::new();
    let schema = Arc::new(SchemaNode::object([(
        "token",
        SchemaNode::string().with_policy(
            SensitivePolicy::new(vec![ReadPolicyTier::full(json!("admin"))])
                .with_field_marker("credential"),
        ),
    )]));
    let doc = json!({"token": "t0k3n"});

    let applier = PolicyApplier::new(&core);
    let out = applier
        .apply_read_policy(
            &doc,
            &schema,
            &guest_ctx(),
            &role_resolver_sync(),
            &ApplyOptions::default(),
        )
        .unwrap();

    let envelope = SensitiveEnvelope::from_value(&out["token"]).unwrap();
    assert_eq!(envelope.field_marker(), Some("credential"));
    assert_eq!(envelope.status(), AccessStatus::Hidden);
}

#[test]
fn sensitive_null_values_stay_null_without_envelopes() {
    let core = SchemaCore::new();
    let schema = Arc::new(user_schema());
    let doc = json!({"name": "jane", "email": null, "owner": "jane"});

    let applier = PolicyApplier::new(&core);
    let out = applier
        .apply_read_policy(
            &doc,
            &schema,
            &guest_ctx(),
            &role_resolver_sync(),
            &ApplyOptions::default(),
        )
        .unwrap();
    assert_eq!(out["email"], Value::Null);
}
