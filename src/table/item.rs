//! Mapping between [`Entity`] and DynamoDB items.
//!
//! The key parts are stored as `PartitionKey` and `RowKey` string attributes and every
//! property becomes a top-level attribute. DynamoDB normalises numbers, so a double is
//! stored alongside a `<name>@odata.type` annotation to keep its type.

use crate::entity::{
    Entity, Property, ReadConversionError, WriteConversionError, EDM_DOUBLE, PARTITION_KEY,
    ROW_KEY,
};
use aws_sdk_dynamodb::types::AttributeValue;
use std::collections::HashMap;

pub(crate) type Item = HashMap<String, AttributeValue>;

const TYPE_ANNOTATION: &str = "@odata.type";

// Magnitude limits of a DynamoDB number
const MIN_NUMBER_MAGNITUDE: f64 = 1e-130;
const MAX_NUMBER_MAGNITUDE: f64 = 1e126;

pub(crate) fn annotation_name(property: &str) -> String {
    format!("{property}{TYPE_ANNOTATION}")
}

pub(crate) fn key(partition_key: &str, row_key: &str) -> Item {
    HashMap::from([
        (PARTITION_KEY.to_string(), AttributeValue::S(partition_key.to_string())),
        (ROW_KEY.to_string(), AttributeValue::S(row_key.to_string())),
    ])
}

pub(crate) fn to_attribute_value(value: &Property) -> Result<AttributeValue, WriteConversionError> {
    match value {
        Property::String(s) => Ok(AttributeValue::S(s.clone())),
        Property::Int(i) => Ok(AttributeValue::N(i.to_string())),
        Property::Double(d) if is_storable(*d) => Ok(AttributeValue::N(d.to_string())),
        Property::Double(d) => Err(WriteConversionError::ConversionFailed(format!(
            "{d:e} cannot be stored as a number"
        ))),
        Property::Bool(b) => Ok(AttributeValue::Bool(*b)),
    }
}

fn is_storable(d: f64) -> bool {
    let magnitude = d.abs();
    d == 0.0 || (MIN_NUMBER_MAGNITUDE..MAX_NUMBER_MAGNITUDE).contains(&magnitude)
}

pub(crate) fn to_item(entity: &Entity) -> Result<Item, WriteConversionError> {
    entity.validate()?;

    let mut item = key(entity.partition_key(), entity.row_key());

    for (name, value) in entity.properties() {
        if let Property::Double(_) = value {
            item.insert(annotation_name(name), AttributeValue::S(value.edm_type().to_string()));
        }
        item.insert(name.clone(), to_attribute_value(value)?);
    }

    Ok(item)
}

pub(crate) fn from_item(mut item: Item) -> Result<Entity, ReadConversionError> {
    let partition_key = take_key(&mut item, PARTITION_KEY)?;
    let row_key = take_key(&mut item, ROW_KEY)?;

    let (annotations, attributes): (Item, Item) = item
        .into_iter()
        .partition(|(name, _)| name.ends_with(TYPE_ANNOTATION));

    let mut entity = Entity::new(partition_key, row_key);

    for (name, value) in attributes {
        let is_double = annotations
            .get(&annotation_name(&name))
            .and_then(|a| a.as_s().ok())
            .is_some_and(|t| t == EDM_DOUBLE);

        let property = from_attribute_value(&name, value, is_double)?;
        entity.insert(name, property);
    }

    Ok(entity)
}

fn take_key(item: &mut Item, field: &str) -> Result<String, ReadConversionError> {
    match item.remove(field) {
        Some(AttributeValue::S(s)) => Ok(s),
        Some(_) => Err(ReadConversionError::InvalidFormat(format!(
            "{field} is not a string"
        ))),
        None => Err(ReadConversionError::NoSuchAttribute(field.to_string())),
    }
}

fn from_attribute_value(
    name: &str,
    value: AttributeValue,
    is_double: bool,
) -> Result<Property, ReadConversionError> {
    let invalid = || ReadConversionError::InvalidFormat(format!("{name}: {value:?}"));

    match &value {
        AttributeValue::S(s) => Ok(Property::String(s.clone())),
        AttributeValue::Bool(b) => Ok(Property::Bool(*b)),
        AttributeValue::N(n) if is_double => n.parse().map(Property::Double).map_err(|_| invalid()),
        // Unannotated numbers written by other clients may still carry a fraction
        AttributeValue::N(n) => n
            .parse()
            .map(Property::Int)
            .or_else(|_| n.parse().map(Property::Double))
            .map_err(|_| invalid()),
        _ => Err(ReadConversionError::ConversionFailed(format!(
            "{name}: unsupported attribute type"
        ))),
    }
}
