//! Gmail v1 REST implementation of [`MailCollaborator`].

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::models::{
    GmailMessage, MessagePart, MessagePartBody, MessagesListResponse, RawAttachment, RawMessage,
};
use super::MailCollaborator;
use crate::config::{IntakeConfig, GMAIL_AUTHORIZATION_ENV};
use crate::errors::IntakeError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_PAGE_SIZE: u32 = 500;

#[derive(Debug, Clone)]
pub struct GmailApiClient {
    api_base: String,
    auth_token: Option<String>,
    download_dir: PathBuf,
    http: reqwest::blocking::Client,
}

impl GmailApiClient {
    pub fn new(
        api_base: impl Into<String>,
        auth_token: Option<String>,
        download_dir: impl Into<PathBuf>,
    ) -> Result<Self, IntakeError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| IntakeError::Gmail(e.to_string()))?;
        Ok(Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            auth_token,
            download_dir: download_dir.into(),
            http,
        })
    }

    pub fn from_config(config: &IntakeConfig) -> Result<Self, IntakeError> {
        Self::new(
            config.gmail_api_base.clone(),
            config.gmail_authorization.clone(),
            config.download_dir.clone(),
        )
    }

    fn messages_url(&self) -> String {
        format!("{}/gmail/v1/users/me/messages", self.api_base)
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        token: &str,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<T, IntakeError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(params)
            .send()
            .map_err(|e| IntakeError::Gmail(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body: String = response
                .text()
                .unwrap_or_default()
                .chars()
                .take(200)
                .collect();
            return Err(IntakeError::Gmail(format!("HTTP {}: {}", status.as_u16(), body)));
        }

        response
            .json()
            .map_err(|e| IntakeError::Gmail(format!("invalid response body: {}", e)))
    }

    fn list_message_ids(
        &self,
        token: &str,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<String>, IntakeError> {
        let url = self.messages_url();
        let limit = max_results as usize;
        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;

        while ids.len() < limit {
            let remaining = (limit - ids.len()) as u32;
            let mut params = vec![
                ("q", query.to_string()),
                ("maxResults", remaining.min(MAX_PAGE_SIZE).to_string()),
            ];
            if let Some(next) = page_token.take() {
                params.push(("pageToken", next));
            }

            let page: MessagesListResponse = self.get_json(token, &url, &params)?;
            ids.extend(
                page.messages
                    .into_iter()
                    .take(limit - ids.len())
                    .map(|stub| stub.id),
            );

            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }
        Ok(ids)
    }

    fn fetch_message(&self, token: &str, message_id: &str) -> Result<GmailMessage, IntakeError> {
        let url = format!(
            "{}/{}",
            self.messages_url(),
            urlencoding::encode(message_id)
        );
        self.get_json(token, &url, &[("format", "full".to_string())])
    }
}

impl MailCollaborator for GmailApiClient {
    fn list_messages_with_attachments(
        &self,
        auth_token: &str,
        query: &str,
        max_results: u32,
        mime_types: Option<&[&str]>,
    ) -> Result<Vec<RawMessage>, IntakeError> {
        let ids = self.list_message_ids(auth_token, query, max_results)?;
        debug!("gmail query {:?} matched {} messages", query, ids.len());

        let mut messages = Vec::new();
        for id in ids {
            let message = self.fetch_message(auth_token, &id)?;
            let Some(payload) = message.payload.as_ref() else {
                continue;
            };

            let mut attachments = Vec::new();
            collect_attachments(payload, mime_types, &mut attachments);
            if attachments.is_empty() {
                continue;
            }

            messages.push(RawMessage {
                message_id: Some(Value::String(message.id.clone())),
                subject: payload
                    .header("Subject")
                    .map(|subject| Value::String(subject.to_string())),
                internal_date: message.internal_date.clone().map(Value::String),
                attachments: Some(attachments),
            });
        }

        info!("gmail listing returned {} messages with attachments", messages.len());
        Ok(messages)
    }

    fn download_attachment(
        &self,
        message_id: &str,
        attachment_id: &str,
        filename_hint: &str,
    ) -> Result<PathBuf, IntakeError> {
        let token = self
            .auth_token
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(IntakeError::MissingConfig(GMAIL_AUTHORIZATION_ENV))?;

        let url = format!(
            "{}/{}/attachments/{}",
            self.messages_url(),
            urlencoding::encode(message_id),
            urlencoding::encode(attachment_id)
        );
        let body: MessagePartBody = self.get_json(token, &url, &[])?;
        let data = body
            .data
            .ok_or_else(|| IntakeError::Gmail("attachment response has no data".to_string()))?;
        let bytes = decode_base64url(&data)?;

        let path = write_download(&self.download_dir, filename_hint, &bytes)?;
        debug!("saved attachment {} ({} bytes) to {}", attachment_id, bytes.len(), path.display());
        Ok(path)
    }
}

/// Walk the MIME tree depth-first, collecting parts that carry a filename and
/// an attachment id.
fn collect_attachments(part: &MessagePart, mime_types: Option<&[&str]>, out: &mut Vec<RawAttachment>) {
    let filename = part.filename.as_deref().unwrap_or_default();
    let attachment_id = part
        .body
        .as_ref()
        .and_then(|body| body.attachment_id.as_deref())
        .unwrap_or_default();

    if !filename.is_empty() && !attachment_id.is_empty() {
        let mime_type = part.mime_type.as_deref().unwrap_or_default();
        let wanted = mime_types
            .map(|filter| filter.iter().any(|m| m.eq_ignore_ascii_case(mime_type)))
            .unwrap_or(true);
        if wanted {
            out.push(RawAttachment {
                attachment_id: Some(Value::String(attachment_id.to_string())),
                filename: Some(Value::String(filename.to_string())),
                mime_type: Some(Value::String(mime_type.to_string())),
                size: part
                    .body
                    .as_ref()
                    .and_then(|body| body.size)
                    .map(Value::from),
            });
        }
    }

    for child in &part.parts {
        collect_attachments(child, mime_types, out);
    }
}

fn decode_base64url(data: &str) -> Result<Vec<u8>, IntakeError> {
    URL_SAFE
        .decode(data)
        .or_else(|_| URL_SAFE_NO_PAD.decode(data.trim_end_matches('=')))
        .map_err(|e| IntakeError::Gmail(format!("attachment data is not base64url: {}", e)))
}

fn write_download(dir: &Path, filename_hint: &str, bytes: &[u8]) -> Result<PathBuf, IntakeError> {
    fs::create_dir_all(dir)?;
    let mut file = tempfile::Builder::new()
        .prefix("gmail_")
        .suffix(&format!("_{}", sanitize_filename(filename_hint)))
        .tempfile_in(dir)?;
    file.write_all(bytes)?;
    let (_, path) = file.keep().map_err(|e| {
        warn!("failed to persist downloaded attachment: {}", e);
        e.error
    })?;
    Ok(path)
}

/// Reduce a provider-supplied filename to a single safe path component.
pub(crate) fn sanitize_filename(raw: &str) -> String {
    let last = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = last
        .chars()
        .map(|ch| {
            if ch.is_alphanumeric() || matches!(ch, '.' | '-' | '_') {
                ch
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        "attachment".to_string()
    } else {
        cleaned
    }
}
