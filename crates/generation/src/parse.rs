//! Strict decoding of model output into typed records.
//!
//! Models are told to answer with bare JSON but sometimes wrap it in a
//! markdown fence or a sentence of prose. Both are tolerated; anything whose
//! shape does not match the target type is a [`GenerationError::ParseError`].

use crate::error::{GenerationError, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;

pub fn parse_json<T: DeserializeOwned>(raw: &str) -> Result<T> {
    let unfenced = strip_code_fence(raw.trim());
    match serde_json::from_str::<T>(unfenced) {
        Ok(value) => Ok(value),
        Err(first_err) => {
            let Some(candidate) = extract_json_span(unfenced) else {
                return Err(GenerationError::ParseError(first_err.to_string()));
            };
            serde_json::from_str::<T>(candidate)
                .map_err(|err| GenerationError::ParseError(err.to_string()))
        }
    }
}

/// A list answer, or a single object the model returned unwrapped.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            Self::Many(items) => items,
            Self::One(item) => vec![item],
        }
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// Outermost `[...]` or `{...}` span, whichever opens first.
fn extract_json_span(text: &str) -> Option<&str> {
    let start = text.find(['[', '{'])?;
    let closer = if text[start..].starts_with('[') { ']' } else { '}' };
    let end = text.rfind(closer)?;
    (end > start).then(|| &text[start..=end])
}
