//! Mail provider seam.
//!
//! The intake code only talks to the mailbox through [`MailCollaborator`].
//! [`GmailApiClient`] implements it against the Gmail REST API; tests plug in
//! in-memory fakes.

use std::path::PathBuf;

use crate::errors::IntakeError;

mod client;
mod models;
mod query;

pub use client::GmailApiClient;
pub use models::{RawAttachment, RawMessage};
pub use query::augment_query;

pub(crate) use client::sanitize_filename;
pub(crate) use models::scalar_text;

pub trait MailCollaborator {
    /// Search the mailbox and return the matching messages that carry at
    /// least one attachment, optionally restricted to the given MIME types.
    fn list_messages_with_attachments(
        &self,
        auth_token: &str,
        query: &str,
        max_results: u32,
        mime_types: Option<&[&str]>,
    ) -> Result<Vec<RawMessage>, IntakeError>;

    /// Save one attachment to a local file and return its path. The caller
    /// owns the file afterwards.
    fn download_attachment(
        &self,
        message_id: &str,
        attachment_id: &str,
        filename_hint: &str,
    ) -> Result<PathBuf, IntakeError>;
}
