use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Structured invoice or quote, as produced by the extraction agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    #[serde(default)]
    pub invoice_number: Option<String>,
    /// ISO date when the document has one
    #[serde(default)]
    pub invoice_date: Option<String>,
    #[serde(default)]
    pub vendor_name: Option<String>,
    #[serde(default)]
    pub vendor_address: Option<String>,
    #[serde(default)]
    pub buyer_name: Option<String>,
    #[serde(default)]
    pub buyer_address: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub subtotal: Option<f64>,
    #[serde(default)]
    pub tax: Option<f64>,
    #[serde(default)]
    pub total: Option<f64>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub po_number: Option<String>,
    #[serde(default)]
    pub line_items: Vec<InvoiceLineItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLineItem {
    pub description: String,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub unit_price: Option<f64>,
    #[serde(default)]
    pub amount: Option<f64>,
}

/// Top-level invoice fields as a JSON object, without null or empty-string
/// entries. This is the payload handed to the task tracker.
pub fn clean_invoice(invoice: &Invoice) -> Map<String, Value> {
    let Ok(Value::Object(fields)) = serde_json::to_value(invoice) else {
        return Map::new();
    };
    fields
        .into_iter()
        .filter(|(_, value)| !matches!(value, Value::Null) && value.as_str() != Some(""))
        .collect()
}
