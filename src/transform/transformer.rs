use log::warn;
use serde_json::Value;
use std::sync::Arc;

use crate::error::ShieldResult;
use crate::schema::types::SchemaError;
use crate::schema::validator::{conforms, variant_tag_literal};
use crate::schema::walker::extend_path;
use crate::schema::{NodeKind, SchemaCore, SchemaNode};

use super::{TransformOptions, TransformScope, UnmatchedUnionPolicy};

/// Callback rewriting one value during a synchronous traversal.
///
/// Returning a value different from the input is terminal for that subtree:
/// the transformer does not descend into the replacement. Returning the input
/// unchanged lets recursion into children proceed.
pub type TransformFn<'f> = dyn FnMut(&Value, &TransformScope<'_>) -> ShieldResult<Value> + 'f;

/// Longest chain of reference resolutions followed without consuming any
/// value depth. Reference cycles make no value progress, so the bound is
/// explicit; descending into an object field or array element resets it.
pub(crate) const MAX_REF_CHAIN: usize = 32;

/// Rewrites `value` against `schema`, applying `transform_fn` at each node.
///
/// Null values pass through unchanged without invoking the callback. Object
/// recursion covers only keys present in both the value and the schema, so
/// absent optional keys stay absent. Array elements are transformed against
/// the element schema at `path[i]`, strictly in order.
pub fn transform_value(
    value: &Value,
    schema: &Arc<SchemaNode>,
    core: &SchemaCore,
    ctx: &Value,
    transform_fn: &mut TransformFn<'_>,
    options: &TransformOptions,
) -> ShieldResult<Value> {
    transform_node(value, schema, core, ctx, "", transform_fn, options, 0)
}

#[allow(clippy::too_many_arguments)]
fn transform_node(
    value: &Value,
    node: &Arc<SchemaNode>,
    core: &SchemaCore,
    ctx: &Value,
    path: &str,
    transform_fn: &mut TransformFn<'_>,
    options: &TransformOptions,
    ref_chain: usize,
) -> ShieldResult<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }

    let accepted = options
        .should_transform
        .as_ref()
        .map_or(true, |predicate| predicate(node));
    if accepted {
        let scope = TransformScope {
            path,
            node,
            policy: node.policy(),
            ctx,
        };
        let replaced = transform_fn(value, &scope)?;
        if replaced != *value {
            return Ok(replaced);
        }
    }

    match node.kind() {
        NodeKind::Optional(inner) | NodeKind::Nullable(inner) => {
            transform_node(value, inner, core, ctx, path, transform_fn, options, ref_chain)
        }
        NodeKind::Ref(name) => {
            if ref_chain >= MAX_REF_CHAIN {
                return Err(SchemaError::InvalidData(format!(
                    "Reference chain limit reached resolving {} at path {}",
                    name, path
                ))
                .into());
            }
            let resolved = core.resolve_ref(name)?;
            transform_node(value, &resolved, core, ctx, path, transform_fn, options, ref_chain + 1)
        }
        NodeKind::Object(fields) => {
            let Some(map) = value.as_object() else {
                return Ok(value.clone());
            };
            let mut out = map.clone();
            for (key, field) in fields {
                if let Some(field_value) = map.get(key) {
                    let transformed = transform_node(
                        field_value,
                        field,
                        core,
                        ctx,
                        &extend_path(path, key),
                        transform_fn,
                        options,
                        0,
                    )?;
                    out.insert(key.clone(), transformed);
                }
            }
            Ok(Value::Object(out))
        }
        NodeKind::Array(element) => {
            let Some(items) = value.as_array() else {
                return Ok(value.clone());
            };
            let mut out = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                out.push(transform_node(
                    item,
                    element,
                    core,
                    ctx,
                    &format!("{}[{}]", path, index),
                    transform_fn,
                    options,
                    0,
                )?);
            }
            Ok(Value::Array(out))
        }
        NodeKind::Union(variants) => {
            match select_union_variant(value, variants, core) {
                Some(variant) => {
                    transform_node(value, &variant, core, ctx, path, transform_fn, options, ref_chain)
                }
                None => unmatched_union(value, path, options),
            }
        }
        NodeKind::DiscriminatedUnion { tag, variants } => {
            match select_discriminated_variant(value, tag, variants, core) {
                Some(variant) => {
                    transform_node(value, &variant, core, ctx, path, transform_fn, options, ref_chain)
                }
                None => unmatched_union(value, path, options),
            }
        }
        NodeKind::String
        | NodeKind::Int
        | NodeKind::Float
        | NodeKind::Boolean
        | NodeKind::Null
        | NodeKind::Any
        | NodeKind::Literal(_) => Ok(value.clone()),
    }
}

/// Selects the first declared variant the value structurally validates as.
pub(crate) fn select_union_variant(
    value: &Value,
    variants: &[Arc<SchemaNode>],
    core: &SchemaCore,
) -> Option<Arc<SchemaNode>> {
    variants
        .iter()
        .find(|variant| conforms(value, variant, core))
        .cloned()
}

/// Selects the variant whose declared tag literal matches the value's
/// discriminator field. A missing or foreign discriminator selects nothing.
pub(crate) fn select_discriminated_variant(
    value: &Value,
    tag: &str,
    variants: &[Arc<SchemaNode>],
    core: &SchemaCore,
) -> Option<Arc<SchemaNode>> {
    let tag_value = value.get(tag)?;
    variants
        .iter()
        .find(|variant| variant_tag_literal(variant, tag, core).as_ref() == Some(tag_value))
        .cloned()
}

pub(crate) fn unmatched_union(
    value: &Value,
    path: &str,
    options: &TransformOptions,
) -> ShieldResult<Value> {
    if let Some(callback) = &options.on_unmatched {
        callback(path);
    }
    match options.unmatched_union {
        UnmatchedUnionPolicy::Passthrough => Ok(value.clone()),
        UnmatchedUnionPolicy::Error => Err(SchemaError::UnmatchedUnion(format!(
            "No declared variant matched the value at path {}",
            path
        ))
        .into()),
        UnmatchedUnionPolicy::Null => {
            warn!("Redacting unmatched union value at path {}", path);
            Ok(Value::Null)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::UnmatchedCallback;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn identity() -> impl FnMut(&Value, &TransformScope<'_>) -> ShieldResult<Value> {
        |value: &Value, _scope: &TransformScope<'_>| Ok(value.clone())
    }

    #[test]
    fn identity_transform_preserves_document() {
        let core = SchemaCore::new();
        let schema = Arc::new(SchemaNode::object([
            ("name", SchemaNode::string()),
            ("age", SchemaNode::int()),
        ]));
        let doc = json!({"name": "jane", "age": 33});

        let mut f = identity();
        let out =
            transform_value(&doc, &schema, &core, &json!({}), &mut f, &TransformOptions::default())
                .unwrap();
        assert_eq!(out, doc);
    }

    #[test]
    fn changed_value_is_terminal() {
        let core = SchemaCore::new();
        let inner = SchemaNode::object([("leaf", SchemaNode::string())]);
        let schema = Arc::new(SchemaNode::object([("outer", inner)]));
        let doc = json!({"outer": {"leaf": "raw"}});

        let visited = Mutex::new(Vec::new());
        let mut f = |value: &Value, scope: &TransformScope<'_>| {
            visited.lock().unwrap().push(scope.path.to_string());
            if scope.path == "outer" {
                Ok(json!("replaced"))
            } else {
                Ok(value.clone())
            }
        };
        let out =
            transform_value(&doc, &schema, &core, &json!({}), &mut f, &TransformOptions::default())
                .unwrap();

        assert_eq!(out, json!({"outer": "replaced"}));
        let visited = visited.into_inner().unwrap();
        assert!(visited.contains(&"outer".to_string()));
        assert!(!visited.contains(&"outer.leaf".to_string()));
    }

    #[test]
    fn null_values_pass_through_without_callback() {
        let core = SchemaCore::new();
        let schema = Arc::new(SchemaNode::object([(
            "maybe",
            SchemaNode::nullable(SchemaNode::string()),
        )]));
        let doc = json!({"maybe": null});

        let calls = AtomicUsize::new(0);
        let mut f = |value: &Value, scope: &TransformScope<'_>| {
            if scope.path == "maybe" {
                calls.fetch_add(1, Ordering::SeqCst);
            }
            Ok(value.clone())
        };
        let out =
            transform_value(&doc, &schema, &core, &json!({}), &mut f, &TransformOptions::default())
                .unwrap();

        assert_eq!(out, json!({"maybe": null}));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn absent_optional_keys_stay_absent() {
        let core = SchemaCore::new();
        let schema = Arc::new(SchemaNode::object([
            ("name", SchemaNode::string()),
            ("nickname", SchemaNode::optional(SchemaNode::string())),
        ]));
        let doc = json!({"name": "jane"});

        let mut f = identity();
        let out =
            transform_value(&doc, &schema, &core, &json!({}), &mut f, &TransformOptions::default())
                .unwrap();
        assert_eq!(out, json!({"name": "jane"}));
    }

    #[test]
    fn array_elements_see_indexed_paths_in_order() {
        let core = SchemaCore::new();
        let schema = Arc::new(SchemaNode::array(SchemaNode::string()));
        let doc = json!(["a", "b", "c"]);

        let paths = Mutex::new(Vec::new());
        let mut f = |value: &Value, scope: &TransformScope<'_>| {
            if value.is_string() {
                paths.lock().unwrap().push(scope.path.to_string());
            }
            Ok(value.clone())
        };
        transform_value(&doc, &schema, &core, &json!({}), &mut f, &TransformOptions::default())
            .unwrap();

        assert_eq!(
            paths.into_inner().unwrap(),
            vec!["[0]".to_string(), "[1]".to_string(), "[2]".to_string()]
        );
    }

    #[test]
    fn should_transform_gates_callback_but_not_recursion() {
        let core = SchemaCore::new();
        let schema = Arc::new(SchemaNode::object([(
            "outer",
            SchemaNode::object([("leaf", SchemaNode::string().with_policy(Default::default()))]),
        )]));
        let doc = json!({"outer": {"leaf": "x"}});

        let calls = Mutex::new(Vec::new());
        let mut f = |value: &Value, scope: &TransformScope<'_>| {
            calls.lock().unwrap().push(scope.path.to_string());
            Ok(value.clone())
        };
        let options = TransformOptions {
            should_transform: Some(Arc::new(|node: &SchemaNode| node.is_sensitive())),
            ..TransformOptions::default()
        };
        transform_value(&doc, &schema, &core, &json!({}), &mut f, &options).unwrap();

        assert_eq!(calls.into_inner().unwrap(), vec!["outer.leaf".to_string()]);
    }

    #[test]
    fn discriminated_union_recurses_as_tagged_variant() {
        let core = SchemaCore::new();
        let schema = Arc::new(SchemaNode::discriminated_union(
            "kind",
            vec![
                SchemaNode::object([
                    ("kind", SchemaNode::literal(json!("card"))),
                    ("number", SchemaNode::string()),
                ]),
                SchemaNode::object([
                    ("kind", SchemaNode::literal(json!("iban"))),
                    ("account", SchemaNode::string()),
                ]),
            ],
        ));
        let doc = json!({"kind": "iban", "account": "DE00"});

        let paths = Mutex::new(Vec::new());
        let mut f = |value: &Value, scope: &TransformScope<'_>| {
            if value.is_string() {
                paths.lock().unwrap().push(scope.path.to_string());
            }
            Ok(value.clone())
        };
        transform_value(&doc, &schema, &core, &json!({}), &mut f, &TransformOptions::default())
            .unwrap();

        let paths = paths.into_inner().unwrap();
        assert!(paths.contains(&"account".to_string()));
        assert!(!paths.contains(&"number".to_string()));
    }

    #[test]
    fn plain_union_takes_first_conforming_variant() {
        let core = SchemaCore::new();
        let schema = Arc::new(SchemaNode::union(vec![
            SchemaNode::object([("a", SchemaNode::string())]),
            SchemaNode::object([("b", SchemaNode::string())]),
        ]));
        let doc = json!({"b": "x"});

        let paths = Mutex::new(Vec::new());
        let mut f = |value: &Value, scope: &TransformScope<'_>| {
            if value.is_string() {
                paths.lock().unwrap().push(scope.path.to_string());
            }
            Ok(value.clone())
        };
        transform_value(&doc, &schema, &core, &json!({}), &mut f, &TransformOptions::default())
            .unwrap();

        assert_eq!(paths.into_inner().unwrap(), vec!["b".to_string()]);
    }

    #[test]
    fn unmatched_union_passthrough_keeps_value() {
        let core = SchemaCore::new();
        let schema = Arc::new(SchemaNode::union(vec![SchemaNode::string()]));
        let doc = json!(42);

        let mut f = identity();
        let out =
            transform_value(&doc, &schema, &core, &json!({}), &mut f, &TransformOptions::default())
                .unwrap();
        assert_eq!(out, json!(42));
    }

    #[test]
    fn unmatched_union_null_redacts_whole_value() {
        let core = SchemaCore::new();
        let schema = Arc::new(SchemaNode::object([(
            "payment",
            SchemaNode::union(vec![SchemaNode::object([("card", SchemaNode::string())])]),
        )]));
        let doc = json!({"payment": {"wallet": "0xabc"}});

        let mut f = identity();
        let options = TransformOptions::fail_closed();
        let out = transform_value(&doc, &schema, &core, &json!({}), &mut f, &options).unwrap();
        assert_eq!(out, json!({"payment": null}));
    }

    #[test]
    fn unmatched_union_error_fails_transform() {
        let core = SchemaCore::new();
        let schema = Arc::new(SchemaNode::union(vec![SchemaNode::string()]));
        let doc = json!(42);

        let mut f = identity();
        let options = TransformOptions {
            unmatched_union: UnmatchedUnionPolicy::Error,
            ..TransformOptions::default()
        };
        let err = transform_value(&doc, &schema, &core, &json!({}), &mut f, &options).unwrap_err();
        assert!(err.to_string().contains("Unmatched union"));
    }

    #[test]
    fn unmatched_callback_fires_once_per_occurrence_with_path() {
        let core = SchemaCore::new();
        let schema = Arc::new(SchemaNode::object([(
            "payment",
            SchemaNode::discriminated_union(
                "kind",
                vec![SchemaNode::object([(
                    "kind",
                    SchemaNode::literal(json!("card")),
                )])],
            ),
        )]));
        let doc = json!({"payment": {"kind": "crypto"}});

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_cb = Arc::clone(&seen);
        let callback: UnmatchedCallback = Arc::new(move |path: &str| {
            seen_cb.lock().unwrap().push(path.to_string());
        });

        let mut f = identity();
        let options = TransformOptions {
            unmatched_union: UnmatchedUnionPolicy::Null,
            on_unmatched: Some(callback),
            ..TransformOptions::default()
        };
        transform_value(&doc, &schema, &core, &json!({}), &mut f, &options).unwrap();

        assert_eq!(&*seen.lock().unwrap(), &vec!["payment".to_string()]);
    }

    #[test]
    fn reference_cycle_fails_instead_of_looping() {
        let core = SchemaCore::new();
        core.register_schema("loop", SchemaNode::reference("loop")).unwrap();
        let schema = Arc::new(SchemaNode::reference("loop"));

        let mut f = identity();
        let err = transform_value(
            &json!("x"),
            &schema,
            &core,
            &json!({}),
            &mut f,
            &TransformOptions::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("Reference chain limit"));
    }

    #[test]
    fn recursive_schema_with_value_progress_terminates() {
        let core = SchemaCore::new();
        core.register_schema(
            "tree",
            SchemaNode::object([
                ("label", SchemaNode::string()),
                (
                    "next",
                    SchemaNode::optional(SchemaNode::reference("tree")),
                ),
            ]),
        )
        .unwrap();
        let schema = Arc::new(SchemaNode::reference("tree"));
        let doc = json!({"label": "a", "next": {"label": "b"}});

        let mut f = identity();
        let out =
            transform_value(&doc, &schema, &core, &json!({}), &mut f, &TransformOptions::default())
                .unwrap();
        assert_eq!(out, doc);
    }

    #[test]
    fn unknown_extra_value_keys_are_preserved() {
        let core = SchemaCore::new();
        let schema = Arc::new(SchemaNode::object([("name", SchemaNode::string())]));
        let doc = json!({"name": "jane", "unmodeled": true});

        let mut f = identity();
        let out =
            transform_value(&doc, &schema, &core, &json!({}), &mut f, &TransformOptions::default())
                .unwrap();
        assert_eq!(out, doc);
    }
}
