//! Normalization of collaborator listings into [`AttachmentRef`] values.

use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::config::IntakeConfig;
use crate::errors::IntakeError;
use crate::gmail::{augment_query, MailCollaborator, RawMessage};

/// One discoverable attachment. All fields are always present; the ones the
/// provider did not supply are empty strings (or 0 for the size).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    pub message_id: String,
    pub attachment_id: String,
    pub filename: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub thread_id: String,
    pub subject: String,
    pub from_address: String,
    /// ISO-8601 UTC with a `Z` suffix, or empty when unknown
    pub received_at: String,
}

/// Flatten messages into one reference per (message, attachment) pair,
/// keeping message order and attachment order within each message.
pub fn normalize_messages(messages: &[RawMessage]) -> Vec<AttachmentRef> {
    let mut refs = Vec::new();
    for message in messages {
        let message_id = message.message_id();
        let subject = message.subject();
        let received_at = epoch_ms_to_iso8601(message.internal_date()).unwrap_or_default();

        for attachment in message.attachments() {
            refs.push(AttachmentRef {
                message_id: message_id.clone(),
                attachment_id: attachment.attachment_id(),
                filename: attachment.filename(),
                mime_type: attachment.mime_type(),
                size_bytes: coerce_size(attachment.size()),
                // Not exposed by the listing.
                thread_id: String::new(),
                subject: subject.clone(),
                from_address: String::new(),
                received_at: received_at.clone(),
            });
        }
    }
    refs
}

/// List invoice-like attachments without downloading any bytes.
pub fn list_invoice_attachments<C: MailCollaborator + ?Sized>(
    collaborator: &C,
    config: &IntakeConfig,
    query: &str,
    lookback_days: u32,
) -> Result<Vec<AttachmentRef>, IntakeError> {
    let token = config.require_gmail_authorization()?;
    let query = augment_query(query, lookback_days);

    let messages =
        collaborator.list_messages_with_attachments(token, &query, config.max_results, None)?;
    let refs = normalize_messages(&messages);
    info!(
        "query {:?} produced {} attachment refs across {} messages",
        query,
        refs.len(),
        messages.len()
    );
    Ok(refs)
}

/// Interpret a size field as a byte count. Anything that is not a
/// non-negative number (or a string holding one) counts as 0.
pub fn coerce_size(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(number)) => number
            .as_u64()
            .or_else(|| number.as_f64().and_then(float_to_size))
            .unwrap_or(0),
        Some(Value::String(text)) => {
            let text = text.trim();
            text.parse::<u64>()
                .ok()
                .or_else(|| text.parse::<f64>().ok().and_then(float_to_size))
                .unwrap_or(0)
        }
        _ => 0,
    }
}

fn float_to_size(value: f64) -> Option<u64> {
    (value.is_finite() && value >= 0.0).then(|| value.trunc() as u64)
}

/// Convert epoch milliseconds to an ISO-8601 UTC string.
///
/// Returns `None` when the value is missing, not an integer, or out of
/// range; callers substitute the empty string.
pub fn epoch_ms_to_iso8601(value: Option<&Value>) -> Option<String> {
    let millis = match value? {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))?,
        Value::String(text) => text.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    let timestamp = DateTime::from_timestamp_millis(millis)?;
    Some(timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_messages() -> Vec<RawMessage> {
        serde_json::from_value(json!([
            {
                "messageId": "m1",
                "subject": "Invoice ABC",
                "internalDate": "1725478294000",
                "attachments": [
                    {"attachmentId": "a1", "filename": "inv.pdf", "mimeType": "application/pdf", "size": 1234},
                    {"attachmentId": "a2", "filename": "image.png", "mimeType": "image/png", "size": 999}
                ]
            },
            {
                "messageId": "m2",
                "attachments": [
                    {"attachmentId": "b1", "size": "oops"}
                ]
            },
            {"messageId": "m3"}
        ]))
        .unwrap()
    }

    #[test]
    fn normalizes_first_reference_of_sample_message() {
        let refs = normalize_messages(&sample_messages());
        let first = &refs[0];
        assert_eq!(first.message_id, "m1");
        assert_eq!(first.attachment_id, "a1");
        assert_eq!(first.filename, "inv.pdf");
        assert_eq!(first.mime_type, "application/pdf");
        assert_eq!(first.size_bytes, 1234);
        assert_eq!(first.subject, "Invoice ABC");
        assert_eq!(first.received_at, "2024-09-04T19:31:34Z");
        assert_eq!(first.thread_id, "");
        assert_eq!(first.from_address, "");
    }

    #[test]
    fn keeps_message_then_attachment_order() {
        let refs = normalize_messages(&sample_messages());
        let pairs: Vec<(&str, &str)> = refs
            .iter()
            .map(|r| (r.message_id.as_str(), r.attachment_id.as_str()))
            .collect();
        assert_eq!(pairs, vec![("m1", "a1"), ("m1", "a2"), ("m2", "b1")]);
    }

    #[test]
    fn missing_metadata_becomes_empty_strings() {
        let refs = normalize_messages(&sample_messages());
        let bare = &refs[2];
        assert_eq!(bare.filename, "");
        assert_eq!(bare.mime_type, "");
        assert_eq!(bare.subject, "");
        assert_eq!(bare.received_at, "");
        assert_eq!(bare.size_bytes, 0);
    }

    #[test]
    fn size_coercion_never_fails() {
        assert_eq!(coerce_size(None), 0);
        assert_eq!(coerce_size(Some(&json!(null))), 0);
        assert_eq!(coerce_size(Some(&json!("12kb"))), 0);
        assert_eq!(coerce_size(Some(&json!(-5))), 0);
        assert_eq!(coerce_size(Some(&json!({"bytes": 3}))), 0);
        assert_eq!(coerce_size(Some(&json!(" 2048 "))), 2048);
        assert_eq!(coerce_size(Some(&json!(10.9))), 10);
    }

    #[test]
    fn timestamp_parse_failures_are_none() {
        assert_eq!(epoch_ms_to_iso8601(None), None);
        assert_eq!(epoch_ms_to_iso8601(Some(&json!("yesterday"))), None);
        assert_eq!(epoch_ms_to_iso8601(Some(&json!(["1"]))), None);
        assert_eq!(epoch_ms_to_iso8601(Some(&json!(i64::MAX))), None);
    }

    #[test]
    fn timestamp_keeps_millisecond_precision() {
        assert_eq!(
            epoch_ms_to_iso8601(Some(&json!(1700000000123_i64))).as_deref(),
            Some("2023-11-14T22:13:20.123Z")
        );
        assert_eq!(
            epoch_ms_to_iso8601(Some(&json!(0))).as_deref(),
            Some("1970-01-01T00:00:00Z")
        );
    }
}
