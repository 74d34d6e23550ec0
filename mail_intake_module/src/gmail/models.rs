use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One message as handed over by the mail collaborator.
///
/// Every field is optional and scalars are kept as raw JSON values; the
/// normalizer is the only place that interprets them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    #[serde(rename = "messageId", default)]
    pub message_id: Option<Value>,
    #[serde(default)]
    pub subject: Option<Value>,
    /// Epoch milliseconds, as a number or a numeric string
    #[serde(rename = "internalDate", default)]
    pub internal_date: Option<Value>,
    #[serde(default)]
    pub attachments: Option<Vec<RawAttachment>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAttachment {
    #[serde(rename = "attachmentId", default)]
    pub attachment_id: Option<Value>,
    #[serde(default)]
    pub filename: Option<Value>,
    #[serde(rename = "mimeType", default)]
    pub mime_type: Option<Value>,
    #[serde(default)]
    pub size: Option<Value>,
}

impl RawMessage {
    pub fn message_id(&self) -> String {
        scalar_text(self.message_id.as_ref())
    }

    pub fn subject(&self) -> String {
        scalar_text(self.subject.as_ref())
    }

    pub fn internal_date(&self) -> Option<&Value> {
        self.internal_date.as_ref()
    }

    pub fn attachments(&self) -> &[RawAttachment] {
        self.attachments.as_deref().unwrap_or_default()
    }
}

impl RawAttachment {
    pub fn attachment_id(&self) -> String {
        scalar_text(self.attachment_id.as_ref())
    }

    pub fn filename(&self) -> String {
        scalar_text(self.filename.as_ref())
    }

    pub fn mime_type(&self) -> String {
        scalar_text(self.mime_type.as_ref())
    }

    pub fn size(&self) -> Option<&Value> {
        self.size.as_ref()
    }
}

/// Render a loose scalar as text. Null, missing and structured values become
/// the empty string.
pub(crate) fn scalar_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        _ => String::new(),
    }
}

// Gmail v1 REST payloads

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MessagesListResponse {
    #[serde(default)]
    pub(crate) messages: Vec<MessageStub>,
    #[serde(rename = "nextPageToken")]
    pub(crate) next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MessageStub {
    pub(crate) id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GmailMessage {
    pub(crate) id: String,
    #[serde(rename = "internalDate")]
    pub(crate) internal_date: Option<String>,
    pub(crate) payload: Option<MessagePart>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MessagePart {
    #[serde(rename = "mimeType")]
    pub(crate) mime_type: Option<String>,
    pub(crate) filename: Option<String>,
    #[serde(default)]
    pub(crate) headers: Vec<MessageHeader>,
    pub(crate) body: Option<MessagePartBody>,
    #[serde(default)]
    pub(crate) parts: Vec<MessagePart>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MessageHeader {
    pub(crate) name: String,
    pub(crate) value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MessagePartBody {
    #[serde(rename = "attachmentId")]
    pub(crate) attachment_id: Option<String>,
    pub(crate) size: Option<u64>,
    pub(crate) data: Option<String>,
}

impl MessagePart {
    pub(crate) fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|header| header.name.eq_ignore_ascii_case(name))
            .map(|header| header.value.as_str())
    }
}
