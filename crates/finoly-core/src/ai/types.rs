//! AI backend reply types
//!
//! These types are backend-agnostic and used across all AI implementations.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

use super::parsing::{sanitize_reply_as, PayloadStart};

/// Raw output of one inference call
///
/// Most providers answer with plain text. Some chat APIs return the message
/// content as a list of parts instead, which is kept as `Candidates`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelReply {
    Text(String),
    Candidates(Vec<Value>),
}

impl ModelReply {
    /// Text suitable for a strict JSON parser
    ///
    /// For candidate lists, the first object is re-serialized, or failing that
    /// the first string is returned untouched. A list with neither is malformed.
    pub fn sanitized(&self) -> Result<String> {
        self.sanitized_as(PayloadStart::PreferArray)
    }

    /// [`ModelReply::sanitized`] with an explicit payload start rule for text replies
    pub fn sanitized_as(&self, payload_start: PayloadStart) -> Result<String> {
        match self {
            ModelReply::Text(text) => Ok(sanitize_reply_as(text, payload_start)),
            ModelReply::Candidates(items) => {
                for item in items {
                    match item {
                        Value::Object(_) => return Ok(item.to_string()),
                        Value::String(s) => return Ok(s.clone()),
                        _ => continue,
                    }
                }
                Err(Error::MalformedReply("No valid content found".into()))
            }
        }
    }

    /// The reply as display text (for "could not parse" payloads and logs)
    pub fn raw_text(&self) -> String {
        match self {
            ModelReply::Text(text) => text.clone(),
            ModelReply::Candidates(items) => Value::Array(items.clone()).to_string(),
        }
    }
}

impl From<String> for ModelReply {
    fn from(text: String) -> Self {
        ModelReply::Text(text)
    }
}

impl From<&str> for ModelReply {
    fn from(text: &str) -> Self {
        ModelReply::Text(text.to_string())
    }
}
