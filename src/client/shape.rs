//! Coercion of decoded payloads into caller-requested types.

use super::request::Payload;
use crate::{Error, ErrorContext, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Result of a shaped call: a single object, or a list coerced element by element.
#[derive(Debug, Clone, PartialEq)]
pub enum Shaped<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> Shaped<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Shaped::One(item) => vec![item],
            Shaped::Many(items) => items,
        }
    }

    pub fn into_one(self) -> Option<T> {
        match self {
            Shaped::One(item) => Some(item),
            Shaped::Many(_) => None,
        }
    }
}

/// Deserializes the whole payload into `T`. Text payloads are offered as a
/// JSON string, so `String` targets accept them.
pub(crate) fn coerce<T: DeserializeOwned>(payload: Payload) -> Result<T> {
    serde_json::from_value(payload.into_json()).map_err(|e| {
        shape_error(format!("Response validation failed: {}", e), None).with_cause(e)
    })
}

/// Coerces an object into `Shaped::One` and an array into `Shaped::Many`,
/// element by element. Any failing element fails the whole call.
pub(crate) fn coerce_shaped<T: DeserializeOwned>(payload: Payload) -> Result<Shaped<T>> {
    match payload.into_json() {
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (index, item) in items.into_iter().enumerate() {
                let parsed = serde_json::from_value(item).map_err(|e| {
                    shape_error(
                        format!("Response validation failed at index {}: {}", index, e),
                        Some(index),
                    )
                    .with_cause(e)
                })?;
                out.push(parsed);
            }
            Ok(Shaped::Many(out))
        }
        other => serde_json::from_value(other).map(Shaped::One).map_err(|e| {
            shape_error(format!("Response validation failed: {}", e), None).with_cause(e)
        }),
    }
}

fn shape_error(message: String, index: Option<usize>) -> Error {
    let mut context = ErrorContext::new().with_source("response_shape");
    if let Some(index) = index {
        context = context.with_details(serde_json::json!({ "index": index }));
    }
    Error::validation_with_context(message, context)
}
