use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::attachments::AttachmentRef;
use crate::errors::IntakeError;
use crate::gmail::{scalar_text, MailCollaborator};

/// Identifies one attachment to download.
///
/// Accepts both the snake_case keys of [`AttachmentRef`] and the camelCase
/// keys used by the mail provider; a non-empty snake_case value wins. Ids may
/// arrive as strings or numbers.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FetchRequest {
    #[serde(default)]
    pub message_id: Option<Value>,
    #[serde(rename = "messageId", default)]
    pub message_id_camel: Option<Value>,
    #[serde(default)]
    pub attachment_id: Option<Value>,
    #[serde(rename = "attachmentId", default)]
    pub attachment_id_camel: Option<Value>,
    #[serde(default)]
    pub filename: Option<String>,
}

impl FetchRequest {
    pub fn new(message_id: impl Into<String>, attachment_id: impl Into<String>) -> Self {
        Self {
            message_id: Some(Value::String(message_id.into())),
            attachment_id: Some(Value::String(attachment_id.into())),
            ..Self::default()
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn from_json(value: &Value) -> Result<Self, IntakeError> {
        if !value.is_object() {
            return Err(IntakeError::InvalidInput(
                "attachment reference must be a JSON object".to_string(),
            ));
        }
        Self::deserialize(value)
            .map_err(|e| IntakeError::InvalidInput(format!("malformed attachment reference: {}", e)))
    }

    pub fn message_id(&self) -> Option<String> {
        first_non_empty(&[&self.message_id, &self.message_id_camel])
    }

    pub fn attachment_id(&self) -> Option<String> {
        first_non_empty(&[&self.attachment_id, &self.attachment_id_camel])
    }

    /// Filename passed to the provider when saving the attachment locally.
    pub fn filename_hint(&self, attachment_id: &str) -> String {
        self.filename
            .as_deref()
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("gmail_{}", attachment_id))
    }
}

impl From<&AttachmentRef> for FetchRequest {
    fn from(attachment: &AttachmentRef) -> Self {
        Self::new(attachment.message_id.clone(), attachment.attachment_id.clone())
            .with_filename(attachment.filename.clone())
    }
}

fn first_non_empty(candidates: &[&Option<Value>]) -> Option<String> {
    candidates
        .iter()
        .map(|value| scalar_text(value.as_ref()))
        .find(|text| !text.is_empty())
}

/// Download one attachment and return its bytes.
///
/// The provider saves the payload to a local file; that file is read and then
/// removed, whether or not the read succeeded.
pub fn download_attachment<C: MailCollaborator + ?Sized>(
    collaborator: &C,
    request: &FetchRequest,
) -> Result<Vec<u8>, IntakeError> {
    let (message_id, attachment_id) = match (request.message_id(), request.attachment_id()) {
        (Some(message_id), Some(attachment_id)) => (message_id, attachment_id),
        _ => {
            return Err(IntakeError::InvalidInput(
                "attachment reference must include 'message_id' and 'attachment_id'".to_string(),
            ))
        }
    };

    let hint = request.filename_hint(&attachment_id);
    let path = collaborator.download_attachment(&message_id, &attachment_id, &hint)?;

    let read = fs::read(&path);
    remove_download(&path);
    let bytes = read.map_err(|source| IntakeError::Retrieval { path, source })?;

    info!(
        "fetched attachment {} from message {} ({} bytes)",
        attachment_id,
        message_id,
        bytes.len()
    );
    Ok(bytes)
}

/// Convenience wrapper for references produced by the listing.
pub fn download_attachment_ref<C: MailCollaborator + ?Sized>(
    collaborator: &C,
    attachment: &AttachmentRef,
) -> Result<Vec<u8>, IntakeError> {
    download_attachment(collaborator, &FetchRequest::from(attachment))
}

fn remove_download(path: &Path) {
    // Intentionally ignored: a leftover download must not fail the fetch.
    if let Err(err) = fs::remove_file(path) {
        debug!("could not remove downloaded file {}: {}", path.display(), err);
    }
}
