//! Decoding of the planner's upload response into an [`InsertReport`].
//!
//! The planner has changed its response shape more than once, so every field
//! is decoded on its own and a missing or malformed field falls back to its
//! empty value instead of failing the whole report.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier of an order created by the planner. Older deployments return
/// integers, newer ones strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrderId {
    Int(i64),
    Text(String),
}

impl OrderId {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) => Some(OrderId::Text(text.clone())),
            Value::Number(number) => number
                .as_i64()
                .map(OrderId::Int)
                .or_else(|| Some(OrderId::Text(number.to_string()))),
            _ => None,
        }
    }
}

impl From<&str> for OrderId {
    fn from(value: &str) -> Self {
        OrderId::Text(value.to_string())
    }
}

impl From<i64> for OrderId {
    fn from(value: i64) -> Self {
        OrderId::Int(value)
    }
}

/// Normalized result of one planner upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertReport {
    pub created_order_ids: Vec<OrderId>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub source_message_id: String,
    pub notes: String,
}

/// A response field that may be missing, a bare string, or a list.
#[derive(Debug, Clone, PartialEq, Eq)]
enum MessageField {
    Absent,
    Single(String),
    Many(Vec<String>),
}

impl MessageField {
    fn from_value(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => MessageField::Absent,
            Some(Value::String(text)) if text.is_empty() => MessageField::Absent,
            Some(Value::String(text)) => MessageField::Single(text.clone()),
            Some(Value::Array(items)) => {
                MessageField::Many(items.iter().map(value_to_text).collect())
            }
            Some(other) => MessageField::Single(value_to_text(other)),
        }
    }

    fn into_vec(self) -> Vec<String> {
        match self {
            MessageField::Absent => Vec::new(),
            MessageField::Single(text) => vec![text],
            MessageField::Many(items) => items,
        }
    }
}

/// Build an [`InsertReport`] from a raw response body.
///
/// A body that is empty, not JSON, or JSON but not an object is treated as
/// `{}`.
pub fn decode_insert_report(body: &str, source_message_id: Option<&str>) -> InsertReport {
    let object = match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => map,
        // Tolerated: a 2xx without a usable body still yields an (empty) report.
        _ => Map::new(),
    };
    report_from_object(&object, source_message_id)
}

fn report_from_object(object: &Map<String, Value>, source_message_id: Option<&str>) -> InsertReport {
    let created = match object.get("created_order_ids") {
        None | Some(Value::Null) => object.get("created"),
        present => present,
    };

    InsertReport {
        created_order_ids: order_ids(created),
        warnings: MessageField::from_value(object.get("warnings")).into_vec(),
        errors: MessageField::from_value(object.get("errors")).into_vec(),
        source_message_id: source_message_id.unwrap_or_default().to_string(),
        notes: first_non_empty_text(object, &["notes", "detail"]),
    }
}

fn order_ids(value: Option<&Value>) -> Vec<OrderId> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(OrderId::from_value).collect(),
        Some(scalar) => OrderId::from_value(scalar).into_iter().collect(),
        None => Vec::new(),
    }
}

fn first_non_empty_text(object: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .filter(|value| !is_blank(value))
        .map(value_to_text)
        .next()
        .unwrap_or_default()
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
