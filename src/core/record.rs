use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("Invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: &'static str },

    #[error("Expected a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// Schema-less object being extended by the merge node.
///
/// Keys keep insertion order. Values are shared behind `Arc`, so a shallow copy
/// is a new map pointing at the same top-level values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    members: IndexMap<String, Arc<Value>>,
}

impl Record {
    pub fn new() -> Self {
        Self {
            members: IndexMap::new(),
        }
    }

    pub fn from_json(value: Value) -> Result<Self, RecordError> {
        match value {
            Value::Object(map) => Ok(Self {
                members: map.into_iter().map(|(k, v)| (k, Arc::new(v))).collect(),
            }),
            other => Err(RecordError::NotAnObject(json_kind(&other))),
        }
    }

    pub fn to_json(&self) -> Value {
        Value::Object(
            self.members
                .iter()
                .map(|(k, v)| (k.clone(), v.as_ref().clone()))
                .collect(),
        )
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.members.get(key).map(|v| v.as_ref())
    }

    /// Shared handle to a member, used to check that copies alias the same value.
    pub fn get_shared(&self, key: &str) -> Option<&Arc<Value>> {
        self.members.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.members.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Set a member. Existing keys keep their position.
    pub fn set(&mut self, key: &str, value: Value) -> Result<(), RecordError> {
        validate_key(key)?;
        self.members.insert(key.to_string(), Arc::new(value));
        Ok(())
    }

    pub fn shallow_copy(&self) -> Self {
        Self {
            members: self
                .members
                .iter()
                .map(|(k, v)| (k.clone(), Arc::clone(v)))
                .collect(),
        }
    }
}

fn validate_key(key: &str) -> Result<(), RecordError> {
    let reason = if key.is_empty() {
        "key cannot be empty"
    } else if key.starts_with("@@") {
        "key cannot start with '@@'"
    } else if key.contains('.') {
        "key cannot contain '.'"
    } else if key.contains('/') {
        "key cannot contain '/'"
    } else {
        return Ok(());
    };

    Err(RecordError::InvalidKey {
        key: key.to_string(),
        reason,
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
