//! Entities: records addressed by `(PartitionKey, RowKey)` carrying an open set of
//! typed scalar properties.

mod property;
pub use property::{Property, TryFromProperty};
pub(crate) use property::EDM_DOUBLE;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub const PARTITION_KEY: &str = "PartitionKey";
pub const ROW_KEY: &str = "RowKey";

const MAX_KEY_BYTES: usize = 1024;

#[derive(Debug, Error)]
pub enum EntityError {
    #[error("Invalid {field}: {reason}")]
    InvalidKey { field: &'static str, reason: String },
    #[error("Invalid property name '{name}': {reason}")]
    InvalidPropertyName { name: String, reason: String },
    #[error("Property '{0}' is not a finite number")]
    NonFiniteDouble(String),
    #[error("JSON Error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ReadConversionError {
    #[error("Missing attribute: {0}")]
    NoSuchAttribute(String),
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
    #[error("Failed to convert attribute to {0}")]
    ConversionFailed(String),
}

#[derive(Debug, Error)]
pub enum WriteConversionError {
    #[error("Failed to convert attribute: '{0}'")]
    ConversionFailed(String),
    #[error("Invalid entity: {0}")]
    InvalidEntity(#[from] EntityError),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "PartitionKey")]
    partition_key: String,
    #[serde(rename = "RowKey")]
    row_key: String,
    #[serde(rename = "Properties", default)]
    properties: BTreeMap<String, Property>,
}

impl Entity {
    pub fn new(partition_key: impl Into<String>, row_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Builder-style [`Entity::insert`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Property>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn partition_key(&self) -> &str {
        &self.partition_key
    }

    pub fn row_key(&self) -> &str {
        &self.row_key
    }

    pub fn properties(&self) -> &BTreeMap<String, Property> {
        &self.properties
    }

    /// Set a property, returning the value it replaced.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Property>) -> Option<Property> {
        self.properties.insert(name.into(), value.into())
    }

    /// Look up a property. `PartitionKey` and `RowKey` are not properties.
    pub fn get(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    pub fn get_as<T: TryFromProperty>(&self, name: &str) -> Result<T, ReadConversionError> {
        self.get(name)
            .ok_or_else(|| ReadConversionError::NoSuchAttribute(name.to_string()))
            .and_then(T::try_from_property)
    }

    /// Keep only the named properties. Keys are always kept.
    pub fn project<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        self.properties
            .retain(|name, _| names.iter().any(|n| n.as_ref() == name));
        self
    }

    pub fn validate(&self) -> Result<(), EntityError> {
        validate_key(PARTITION_KEY, &self.partition_key)?;
        validate_key(ROW_KEY, &self.row_key)?;

        for (name, value) in &self.properties {
            validate_property_name(name)?;

            if let Property::Double(d) = value {
                if !d.is_finite() {
                    return Err(EntityError::NonFiniteDouble(name.clone()));
                }
            }
        }

        Ok(())
    }

    /// Encode to the JSON wire shape.
    pub fn to_vec(&self) -> Result<Vec<u8>, EntityError> {
        self.validate()?;
        Ok(serde_json::to_vec(self)?)
    }

    pub fn to_json(&self) -> Result<String, EntityError> {
        self.validate()?;
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from the JSON wire shape.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, EntityError> {
        let entity: Self = serde_json::from_slice(bytes)?;
        entity.validate()?;
        Ok(entity)
    }
}

fn validate_key(field: &'static str, key: &str) -> Result<(), EntityError> {
    let invalid = |reason: String| EntityError::InvalidKey { field, reason };

    if key.is_empty() {
        return Err(invalid("must not be empty".into()));
    }
    if key.len() > MAX_KEY_BYTES {
        return Err(invalid(format!("must be at most {MAX_KEY_BYTES} bytes")));
    }
    if let Some(c) = key
        .chars()
        .find(|c| matches!(c, '/' | '\\' | '#' | '?') || c.is_control())
    {
        return Err(invalid(format!("contains disallowed character {c:?}")));
    }

    Ok(())
}

fn validate_property_name(name: &str) -> Result<(), EntityError> {
    let invalid = |reason: &str| EntityError::InvalidPropertyName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        Err(invalid("must not be empty"))
    } else if name == PARTITION_KEY || name == ROW_KEY {
        Err(invalid("reserved for the entity key"))
    } else if name.contains('@') {
        // '@' introduces type annotations in stored items
        Err(invalid("must not contain '@'"))
    } else {
        Ok(())
    }
}
