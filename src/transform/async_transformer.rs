use async_trait::async_trait;
use futures::future::{try_join_all, BoxFuture};
use serde_json::Value;
use std::sync::Arc;

use crate::error::ShieldResult;
use crate::schema::types::SchemaError;
use crate::schema::walker::extend_path;
use crate::schema::{NodeKind, SchemaCore, SchemaNode};

use super::transformer::{
    select_discriminated_variant, select_union_variant, unmatched_union, MAX_REF_CHAIN,
};
use super::{TransformOptions, TransformScope};

/// Callback rewriting one value during an asynchronous traversal.
///
/// The terminal-on-change contract matches the synchronous transformer:
/// returning a value different from the input stops recursion into that
/// subtree.
#[async_trait]
pub trait AsyncValueTransform: Send + Sync {
    async fn apply(&self, value: &Value, scope: &TransformScope<'_>) -> ShieldResult<Value>;
}

/// Asynchronous counterpart of [`super::transform_value`].
///
/// Array elements are processed strictly in order by default, preserving the
/// callback's side-effect ordering. With `options.parallel` the element
/// transforms are fanned out concurrently and the results reassembled by
/// original index, not completion order.
pub async fn transform_value_async(
    value: &Value,
    schema: &Arc<SchemaNode>,
    core: &SchemaCore,
    ctx: &Value,
    transform: &dyn AsyncValueTransform,
    options: &TransformOptions,
) -> ShieldResult<Value> {
    transform_node(value, Arc::clone(schema), core, ctx, String::new(), transform, options, 0).await
}

#[allow(clippy::too_many_arguments)]
fn transform_node<'a>(
    value: &'a Value,
    node: Arc<SchemaNode>,
    core: &'a SchemaCore,
    ctx: &'a Value,
    path: String,
    transform: &'a dyn AsyncValueTransform,
    options: &'a TransformOptions,
    ref_chain: usize,
) -> BoxFuture<'a, ShieldResult<Value>> {
    Box::pin(async move {
        if value.is_null() {
            return Ok(Value::Null);
        }

        let accepted = options
            .should_transform
            .as_ref()
            .map_or(true, |predicate| predicate(&node));
        if accepted {
            let scope = TransformScope {
                path: &path,
                node: &node,
                policy: node.policy(),
                ctx,
            };
            let replaced = transform.apply(value, &scope).await?;
            if replaced != *value {
                return Ok(replaced);
            }
        }

        match node.kind() {
            NodeKind::Optional(inner) | NodeKind::Nullable(inner) => {
                transform_node(value, Arc::clone(inner), core, ctx, path, transform, options, ref_chain)
                    .await
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
                transform_node(value, resolved, core, ctx, path, transform, options, ref_chain + 1)
                    .await
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
                            Arc::clone(field),
                            core,
                            ctx,
                            extend_path(&path, key),
                            transform,
                            options,
                            0,
                        )
                        .await?;
                        out.insert(key.clone(), transformed);
                    }
                }
                Ok(Value::Object(out))
            }
            NodeKind::Array(element) => {
                let Some(items) = value.as_array() else {
                    return Ok(value.clone());
                };
                if options.parallel {
                    let futures: Vec<_> = items
                        .iter()
                        .enumerate()
                        .map(|(index, item)| {
                            transform_node(
                                item,
                                Arc::clone(element),
                                core,
                                ctx,
                                format!("{}[{}]", path, index),
                                transform,
                                options,
                                0,
                            )
                        })
                        .collect();
                    Ok(Value::Array(try_join_all(futures).await?))
                } else {
                    let mut out = Vec::with_capacity(items.len());
                    for (index, item) in items.iter().enumerate() {
                        out.push(
                            transform_node(
                                item,
                                Arc::clone(element),
                                core,
                                ctx,
                                format!("{}[{}]", path, index),
                                transform,
                                options,
                                0,
                            )
                            .await?,
                        );
                    }
                    Ok(Value::Array(out))
                }
            }
            NodeKind::Union(variants) => match select_union_variant(value, variants, core) {
                Some(variant) => {
                    transform_node(value, variant, core, ctx, path, transform, options, ref_chain)
                        .await
                }
                None => unmatched_union(value, &path, options),
            },
            NodeKind::DiscriminatedUnion { tag, variants } => {
                match select_discriminated_variant(value, tag, variants, core) {
                    Some(variant) => {
                        transform_node(value, variant, core, ctx, path, transform, options, ref_chain)
                            .await
                    }
                    None => unmatched_union(value, &path, options),
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
    })
}
