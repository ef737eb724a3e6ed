use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::error::{ShieldError, ShieldResult};
use crate::schema::{SchemaCore, SchemaNode};
use crate::transform::{transform_value, TransformOptions, TransformScope};

/// Reserved key holding the raw value of a sensitive field at rest.
pub const SENSITIVE_VALUE_KEY: &str = "__sensitiveValue";
/// Reserved key holding the integrity checksum of the raw value.
pub const CHECKSUM_KEY: &str = "__checksum";
/// Reserved key naming the checksum algorithm.
pub const ALGO_KEY: &str = "__algo";

const SHA256_ALGO: &str = "sha256";

/// Whether a JSON value is an at-rest sensitive wrapper.
///
/// The wrapper is structurally distinct from the wire envelope: it is keyed
/// by the reserved `__sensitiveValue` key instead of a status tag.
pub fn is_storage_wrapper(value: &Value) -> bool {
    value
        .as_object()
        .map_or(false, |map| map.contains_key(SENSITIVE_VALUE_KEY))
}

fn checksum(raw: &Value) -> ShieldResult<String> {
    let bytes = serde_json::to_vec(raw)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// Wraps one raw value into its at-rest form with a SHA-256 checksum.
pub fn wrap_value(raw: &Value) -> ShieldResult<Value> {
    let mut map = Map::new();
    map.insert(SENSITIVE_VALUE_KEY.to_string(), raw.clone());
    map.insert(CHECKSUM_KEY.to_string(), Value::String(checksum(raw)?));
    map.insert(ALGO_KEY.to_string(), Value::String(SHA256_ALGO.to_string()));
    Ok(Value::Object(map))
}

/// Unwraps one at-rest value, verifying its checksum when present.
///
/// Returns None when the value is not a storage wrapper. A checksum that does
/// not match the stored raw value fails the read.
pub fn unwrap_value(stored: &Value) -> ShieldResult<Option<Value>> {
    let Some(map) = stored.as_object() else {
        return Ok(None);
    };
    let Some(raw) = map.get(SENSITIVE_VALUE_KEY) else {
        return Ok(None);
    };

    if let Some(expected) = map.get(CHECKSUM_KEY).and_then(Value::as_str) {
        let algo = map
            .get(ALGO_KEY)
            .and_then(Value::as_str)
            .unwrap_or(SHA256_ALGO);
        if algo != SHA256_ALGO {
            return Err(ShieldError::Database(format!(
                "Unsupported checksum algorithm {} on stored sensitive value",
                algo
            )));
        }
        let actual = checksum(raw)?;
        if actual != expected {
            return Err(ShieldError::Database(
                "Checksum mismatch on stored sensitive value".to_string(),
            ));
        }
    }

    Ok(Some(raw.clone()))
}

/// Wraps every sensitive field of a document into its at-rest form.
///
/// The first sensitive node along each path is the storage boundary; the
/// wrapper is terminal, so nested sensitive nodes stay inside the wrapped
/// raw value.
pub fn wrap_document(
    doc: &Value,
    schema: &Arc<SchemaNode>,
    core: &SchemaCore,
) -> ShieldResult<Value> {
    let options = sensitive_only_options();
    let mut wrap = |value: &Value, _scope: &TransformScope<'_>| -> ShieldResult<Value> {
        if is_storage_wrapper(value) {
            return Ok(value.clone());
        }
        wrap_value(value)
    };
    transform_value(doc, schema, core, &Value::Null, &mut wrap, &options)
}

/// Unwraps every at-rest sensitive field of a stored document.
pub fn unwrap_document(
    doc: &Value,
    schema: &Arc<SchemaNode>,
    core: &SchemaCore,
) -> ShieldResult<Value> {
    let options = sensitive_only_options();
    let mut unwrap = |value: &Value, _scope: &TransformScope<'_>| -> ShieldResult<Value> {
        match unwrap_value(value)? {
            Some(raw) => Ok(raw),
            None => Ok(value.clone()),
        }
    };
    transform_value(doc, schema, core, &Value::Null, &mut unwrap, &options)
}

/// At-rest transforms visit sensitive nodes only and leave union mismatches
/// untouched; the read-policy applier remains the layer that redacts them.
fn sensitive_only_options() -> TransformOptions {
    TransformOptions {
        should_transform: Some(Arc::new(|node: &SchemaNode| node.is_sensitive())),
        ..TransformOptions::default()
    }
}
