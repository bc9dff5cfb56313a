//! Attribute access over a resource's JSON state.

use serde_json::{Map, Value};

use crate::error::{ProviderError, Result};
use crate::schema::Schema;

use super::hash_value;

const ID: &str = "id";

/// The attributes of one resource instance while a lifecycle call runs.
///
/// Converts from and into the JSON state exchanged with the engine. An
/// instance whose ID has been cleared turns into `null` state, which tells the
/// engine the resource is gone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceData {
    values: Map<String, Value>,
}

impl ResourceData {
    /// Empty data with no ID.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from engine state. `null` gives empty data.
    pub fn from_state(state: Value) -> Result<Self> {
        match state {
            Value::Null => Ok(Self::new()),
            Value::Object(values) => Ok(Self { values }),
            other => Err(ProviderError::Validation(format!(
                "expected resource state to be an object, got {}",
                other
            ))),
        }
    }

    /// Convert back into engine state.
    pub fn into_state(self) -> Value {
        if self.id().is_none() {
            return Value::Null;
        }
        Value::Object(self.values)
    }

    /// The local ID, if set and non-empty.
    pub fn id(&self) -> Option<&str> {
        self.get_ok(ID)
    }

    /// Set the local ID.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.values.insert(ID.to_string(), Value::String(id.into()));
    }

    /// Forget the ID; the resource no longer exists remotely.
    pub fn clear_id(&mut self) {
        self.values.remove(ID);
    }

    /// A string attribute, or `""` when unset.
    pub fn get_str(&self, key: &str) -> &str {
        self.get_ok(key).unwrap_or_default()
    }

    /// A string attribute, or `None` when unset or empty.
    pub fn get_ok(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// A string attribute that must be set.
    pub fn require_str(&self, key: &str) -> Result<&str> {
        self.get_ok(key).ok_or_else(|| {
            ProviderError::Validation(format!("attribute \"{}\" is required", key))
        })
    }

    /// A raw attribute value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Set an attribute.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Replace every hashed attribute of `schema` with its hash.
    pub fn hash_attributes(&mut self, schema: &Schema) {
        for name in schema.hashed_attributes() {
            if let Some(Value::String(clear)) = self.values.get(name) {
                let hashed = hash_value(clear);
                self.values.insert(name.to_string(), Value::String(hashed));
            }
        }
    }
}
