use std::time::Duration;

use reqwest::blocking::multipart::{Form, Part};
use tracing::{debug, info, warn};

use crate::config::PlannerConfig;
use crate::errors::PlannerError;
use crate::report::{decode_insert_report, InsertReport};

pub const UPLOAD_PATH: &str = "/orders/pending/upload-pdf";
pub const UPLOAD_FIELD_NAME: &str = "file";
pub const UPLOAD_FILE_NAME: &str = "invoice.pdf";
pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

const PDF_MAGIC: &[u8] = b"%PDF";
const ERROR_BODY_EXCERPT_CHARS: usize = 200;

/// Upload a PDF to the planner for ingestion as pending orders.
///
/// `source_message_id` is echoed into the report untouched so callers can
/// tie the result back to the mail it came from.
pub fn upload_pdf_to_planner(
    config: &PlannerConfig,
    pdf_bytes: &[u8],
    source_message_id: Option<&str>,
) -> Result<InsertReport, PlannerError> {
    upload_with_timeout(config, pdf_bytes, source_message_id, UPLOAD_TIMEOUT)
}

pub(crate) fn upload_with_timeout(
    config: &PlannerConfig,
    pdf_bytes: &[u8],
    source_message_id: Option<&str>,
    timeout: Duration,
) -> Result<InsertReport, PlannerError> {
    validate_pdf_payload(pdf_bytes)?;

    let base = config.require_api_base()?;
    let url = format!("{}{}", base, UPLOAD_PATH);

    let part = Part::bytes(pdf_bytes.to_vec())
        .file_name(UPLOAD_FILE_NAME)
        .mime_str("application/pdf")
        .map_err(|err| PlannerError::Request(err.to_string()))?;
    let form = Form::new().part(UPLOAD_FIELD_NAME, part);

    let client = reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|err| PlannerError::Request(err.to_string()))?;
    let mut request = client.post(&url).multipart(form);
    if let Some(key) = config.bearer_key() {
        request = request.header("Authorization", format!("Bearer {}", key));
    }

    debug!("uploading {} bytes to {}", pdf_bytes.len(), url);
    let response = request
        .send()
        .map_err(|err| transport_error(err, timeout))?;

    let status = response.status();
    if !status.is_success() {
        // An unreadable body only loses the excerpt.
        let excerpt = body_excerpt(&response.text().unwrap_or_default());
        warn!("planner upload rejected: HTTP {}", status.as_u16());
        return Err(PlannerError::HttpStatus {
            status: status.as_u16(),
            body: excerpt,
        });
    }

    let body = response
        .text()
        .map_err(|err| transport_error(err, timeout))?;
    let report = decode_insert_report(&body, source_message_id);
    info!(
        "planner accepted upload: created={} warnings={} errors={}",
        report.created_order_ids.len(),
        report.warnings.len(),
        report.errors.len()
    );
    Ok(report)
}

fn transport_error(err: reqwest::Error, timeout: Duration) -> PlannerError {
    if err.is_timeout() {
        warn!("planner upload timed out after {:?}", timeout);
        PlannerError::Timeout(timeout)
    } else {
        PlannerError::Request(err.to_string())
    }
}

fn validate_pdf_payload(pdf_bytes: &[u8]) -> Result<(), PlannerError> {
    if pdf_bytes.is_empty() {
        return Err(PlannerError::InvalidInput(
            "pdf_bytes must be non-empty bytes".to_string(),
        ));
    }
    if !pdf_bytes.starts_with(PDF_MAGIC) {
        return Err(PlannerError::InvalidInput(
            "only application/pdf content can be uploaded".to_string(),
        ));
    }
    Ok(())
}

fn body_excerpt(body: &str) -> String {
    body.chars().take(ERROR_BODY_EXCERPT_CHARS).collect()
}
