use log::warn;
use serde_json::Value;
use std::sync::Arc;

use super::core::SchemaCore;
use super::types::{NodeKind, SchemaNode};

/// Maximum chain of reference resolutions followed while checking one value.
///
/// A reference cycle consumes no value depth, so conformance checking bounds
/// it explicitly; exceeding the bound counts as non-conforming.
const MAX_REF_DEPTH: usize = 32;

/// Checks whether a value structurally conforms to a schema node.
///
/// Used by union matching to select the active variant, and available for
/// pre-write shape checks. Unknown object keys are permitted; declared
/// non-optional fields must be present.
pub fn conforms(value: &Value, schema: &SchemaNode, core: &SchemaCore) -> bool {
    conforms_inner(value, schema, core, 0)
}

fn conforms_inner(value: &Value, schema: &SchemaNode, core: &SchemaCore, ref_depth: usize) -> bool {
    match schema.kind() {
        NodeKind::String => value.is_string(),
        NodeKind::Int => value.is_i64() || value.is_u64(),
        NodeKind::Float => value.is_number(),
        NodeKind::Boolean => value.is_boolean(),
        NodeKind::Null => value.is_null(),
        NodeKind::Any => true,
        NodeKind::Literal(expected) => value == expected,
        NodeKind::Object(fields) => match value.as_object() {
            Some(map) => fields.iter().all(|(name, field)| match map.get(name) {
                Some(field_value) => conforms_inner(field_value, field, core, ref_depth),
                None => is_optional(field, core, ref_depth),
            }),
            None => false,
        },
        NodeKind::Array(element) => match value.as_array() {
            Some(items) => items
                .iter()
                .all(|item| conforms_inner(item, element, core, ref_depth)),
            None => false,
        },
        NodeKind::Optional(inner) => conforms_inner(value, inner, core, ref_depth),
        NodeKind::Nullable(inner) => {
            value.is_null() || conforms_inner(value, inner, core, ref_depth)
        }
        NodeKind::Union(variants) => variants
            .iter()
            .any(|variant| conforms_inner(value, variant, core, ref_depth)),
        NodeKind::DiscriminatedUnion { tag, variants } => {
            let Some(tag_value) = value.get(tag.as_str()) else {
                return false;
            };
            variants.iter().any(|variant| {
                variant_tag_literal(variant, tag, core).as_ref() == Some(tag_value)
                    && conforms_inner(value, variant, core, ref_depth)
            })
        }
        NodeKind::Ref(name) => {
            if ref_depth >= MAX_REF_DEPTH {
                warn!("Reference depth limit reached while validating {}", name);
                return false;
            }
            match core.resolve_ref(name) {
                Ok(resolved) => conforms_inner(value, &resolved, core, ref_depth + 1),
                Err(e) => {
                    warn!("Cannot resolve schema reference {}: {}", name, e);
                    false
                }
            }
        }
    }
}

/// Whether a field may be absent from its containing object.
fn is_optional(schema: &SchemaNode, core: &SchemaCore, ref_depth: usize) -> bool {
    match schema.kind() {
        NodeKind::Optional(_) => true,
        NodeKind::Ref(name) if ref_depth < MAX_REF_DEPTH => match core.resolve_ref(name) {
            Ok(resolved) => is_optional(&resolved, core, ref_depth + 1),
            Err(_) => false,
        },
        _ => false,
    }
}

/// Extracts the literal tag value a discriminated-union variant declares.
///
/// The variant must be (or resolve to) an object with the tag field mapped to
/// a literal. Variants without such a literal never match any value.
pub(crate) fn variant_tag_literal(
    variant: &Arc<SchemaNode>,
    tag: &str,
    core: &SchemaCore,
) -> Option<Value> {
    variant_tag_literal_inner(variant, tag, core, 0)
}

fn variant_tag_literal_inner(
    variant: &Arc<SchemaNode>,
    tag: &str,
    core: &SchemaCore,
    ref_depth: usize,
) -> Option<Value> {
    if ref_depth >= MAX_REF_DEPTH {
        return None;
    }
    match variant.kind() {
        NodeKind::Object(fields) => {
            let field = fields.get(tag)?;
            tag_field_literal(field, core, ref_depth)
        }
        NodeKind::Optional(inner) | NodeKind::Nullable(inner) => {
            variant_tag_literal_inner(inner, tag, core, ref_depth + 1)
        }
        NodeKind::Ref(name) => {
            let resolved = core.resolve_ref(name).ok()?;
            variant_tag_literal_inner(&resolved, tag, core, ref_depth + 1)
        }
        _ => None,
    }
}

fn tag_field_literal(field: &Arc<SchemaNode>, core: &SchemaCore, ref_depth: usize) -> Option<Value> {
    if ref_depth >= MAX_REF_DEPTH {
        return None;
    }
    match field.kind() {
        NodeKind::Literal(value) => Some(value.clone()),
        NodeKind::Optional(inner) | NodeKind::Nullable(inner) => {
            tag_field_literal(inner, core, ref_depth + 1)
        }
        NodeKind::Ref(name) => {
            let resolved = core.resolve_ref(name).ok()?;
            tag_field_literal(&resolved, core, ref_depth + 1)
        }
        _ => None,
    }
}
