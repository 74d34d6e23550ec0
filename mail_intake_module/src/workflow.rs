//! End-to-end invoice runs built from the intake primitives.
//!
//! Conversion, extraction and task tracking are external services; they are
//! reached through the traits below so the orchestration can be exercised
//! without them.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use planner_upload_module::{upload_pdf_to_planner, InsertReport, PlannerConfig};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::attachments::{list_invoice_attachments, normalize_messages, AttachmentRef};
use crate::config::IntakeConfig;
use crate::errors::IntakeError;
use crate::fetcher::download_attachment_ref;
use crate::gmail::{augment_query, sanitize_filename, MailCollaborator};
use crate::invoice::{clean_invoice, Invoice, InvoiceLineItem};
use crate::selector::choose_invoice_attachment;

const PDF_MIME_TYPE: &str = "application/pdf";

pub trait DocumentConverter {
    /// Convert a local document to markdown text.
    fn convert_to_markdown(&self, path: &Path) -> Result<String, IntakeError>;
}

pub trait InvoiceExtractor {
    fn extract_invoice(&self, text: &str) -> Result<Invoice, IntakeError>;
}

pub trait TaskTracker {
    /// Write the cleaned invoice fields onto the task's custom fields.
    fn update_task_from_invoice(
        &self,
        task_id: &str,
        invoice: &Map<String, Value>,
    ) -> Result<Value, IntakeError>;

    /// Create one subtask per line item.
    fn create_line_item_subtasks(
        &self,
        task_id: &str,
        line_items: &[InvoiceLineItem],
    ) -> Result<Value, IntakeError>;
}

pub struct WorkflowDeps<'a> {
    pub mail: &'a dyn MailCollaborator,
    pub converter: &'a dyn DocumentConverter,
    pub extractor: &'a dyn InvoiceExtractor,
    pub tracker: &'a dyn TaskTracker,
    pub config: &'a IntakeConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoAttachments,
}

/// The selected attachment and its markdown rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedInvoice {
    /// 1-based position of the chosen attachment in the listing
    pub position: usize,
    pub attachment: AttachmentRef,
    pub markdown: String,
    /// Where the markdown was written, if it was kept
    pub markdown_path: Option<PathBuf>,
}

/// What the task tracker was told about one invoice.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskUpdate {
    pub invoice: Invoice,
    pub update_result: Value,
    /// `None` when the invoice had no line items
    pub subtask_result: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowReport {
    pub converted: ConvertedInvoice,
    pub task: TaskUpdate,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowOutcome {
    Skipped(SkipReason),
    Completed(Box<WorkflowReport>),
}

/// Find the newest invoice PDF for the configured search, extract it and
/// write the result to `task_id`.
pub fn run_invoice_workflow(
    deps: &WorkflowDeps<'_>,
    task_id: &str,
) -> Result<WorkflowOutcome, IntakeError> {
    let config = deps.config;
    let Some(mut converted) =
        fetch_and_convert(deps.mail, deps.converter, config, &config.search_query)?
    else {
        info!("no attachments found; skipping run");
        return Ok(WorkflowOutcome::Skipped(SkipReason::NoAttachments));
    };

    if let Some(dir) = config.converted_dir.as_deref() {
        let path = dir.join(markdown_file_name(&converted.attachment));
        write_markdown(&path, &converted.markdown)?;
        converted.markdown_path = Some(path);
    }

    let task =
        run_invoice_workflow_from_markdown(deps.extractor, deps.tracker, &converted.markdown, task_id)?;
    Ok(WorkflowOutcome::Completed(Box::new(WorkflowReport {
        converted,
        task,
    })))
}

/// Extract an invoice from already converted markdown and write it to
/// `task_id`. Line-item subtasks are only created when there are line items.
pub fn run_invoice_workflow_from_markdown(
    extractor: &dyn InvoiceExtractor,
    tracker: &dyn TaskTracker,
    markdown: &str,
    task_id: &str,
) -> Result<TaskUpdate, IntakeError> {
    let invoice = extractor.extract_invoice(markdown)?;
    let cleaned = clean_invoice(&invoice);
    info!("extracted invoice fields: {:?}", cleaned.keys().collect::<Vec<_>>());

    let update_result = tracker.update_task_from_invoice(task_id, &cleaned)?;
    let subtask_result = if invoice.line_items.is_empty() {
        info!("no line items found; skipped subtask creation");
        None
    } else {
        Some(tracker.create_line_item_subtasks(task_id, &invoice.line_items)?)
    };

    Ok(TaskUpdate {
        invoice,
        update_result,
        subtask_result,
    })
}

/// Convert the invoice PDF selected for `query` to markdown and save it at
/// `output`. Returns `None` when no PDF attachment matched.
pub fn convert_latest_invoice<C: MailCollaborator + ?Sized>(
    mail: &C,
    converter: &dyn DocumentConverter,
    config: &IntakeConfig,
    query: &str,
    output: &Path,
) -> Result<Option<ConvertedInvoice>, IntakeError> {
    let Some(mut converted) = fetch_and_convert(mail, converter, config, query)? else {
        info!("no PDF attachments matched {:?}", query);
        return Ok(None);
    };
    write_markdown(output, &converted.markdown)?;
    converted.markdown_path = Some(output.to_path_buf());
    Ok(Some(converted))
}

/// List PDFs for `query`, select the invoice, fetch it and convert it.
fn fetch_and_convert<C: MailCollaborator + ?Sized>(
    mail: &C,
    converter: &dyn DocumentConverter,
    config: &IntakeConfig,
    query: &str,
) -> Result<Option<ConvertedInvoice>, IntakeError> {
    let token = config.require_gmail_authorization()?;
    let query = augment_query(query, config.lookback_days);

    info!("listing gmail attachments with query: {}", query);
    let messages = mail.list_messages_with_attachments(
        token,
        &query,
        config.max_results,
        Some(&[PDF_MIME_TYPE][..]),
    )?;
    let refs = normalize_messages(&messages);

    let Some(selection) = choose_invoice_attachment(&refs) else {
        return Ok(None);
    };
    let attachment = selection.candidate.clone();
    info!(
        "chosen position={} filename={} message_id={} ({:?})",
        selection.position, attachment.filename, attachment.message_id, selection.reason
    );

    let bytes = download_attachment_ref(mail, &attachment)?;
    let markdown = convert_bytes(converter, &bytes)?;
    Ok(Some(ConvertedInvoice {
        position: selection.position,
        attachment,
        markdown,
        markdown_path: None,
    }))
}

/// Result of sending the selected attachment to the planner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannerUpload {
    pub position: usize,
    pub attachment: AttachmentRef,
    pub report: InsertReport,
}

/// List, select, fetch and upload the invoice PDF for `query`.
///
/// Only PDF attachments are considered. Returns `None` when there is nothing
/// to select.
pub fn upload_selected_invoice<C: MailCollaborator + ?Sized>(
    mail: &C,
    config: &IntakeConfig,
    planner: &PlannerConfig,
    query: &str,
    lookback_days: u32,
) -> Result<Option<PlannerUpload>, IntakeError> {
    let pdfs: Vec<AttachmentRef> = list_invoice_attachments(mail, config, query, lookback_days)?
        .into_iter()
        .filter(is_pdf)
        .collect();

    let Some(selection) = choose_invoice_attachment(&pdfs) else {
        info!("no PDF attachments matched {:?}", query);
        return Ok(None);
    };
    let attachment = selection.candidate.clone();

    let bytes = download_attachment_ref(mail, &attachment)?;
    let report = upload_pdf_to_planner(planner, &bytes, Some(&attachment.message_id))?;
    if !report.errors.is_empty() {
        warn!(
            "planner reported {} errors for message {}",
            report.errors.len(),
            attachment.message_id
        );
    }

    Ok(Some(PlannerUpload {
        position: selection.position,
        attachment,
        report,
    }))
}

fn is_pdf(attachment: &AttachmentRef) -> bool {
    attachment.mime_type.eq_ignore_ascii_case(PDF_MIME_TYPE)
        || attachment.filename.to_ascii_lowercase().ends_with(".pdf")
}

/// The converter works on files, so the bytes go through a temporary `.pdf`
/// that is removed when this returns.
fn convert_bytes(converter: &dyn DocumentConverter, bytes: &[u8]) -> Result<String, IntakeError> {
    let mut file = tempfile::Builder::new()
        .prefix("invoice_")
        .suffix(".pdf")
        .tempfile()?;
    file.write_all(bytes)?;
    file.flush()?;
    converter.convert_to_markdown(file.path())
}

fn markdown_file_name(attachment: &AttachmentRef) -> PathBuf {
    let name = if attachment.filename.is_empty() {
        format!("gmail_{}", attachment.attachment_id)
    } else {
        attachment.filename.clone()
    };
    Path::new(&sanitize_filename(&name)).with_extension("md")
}

fn write_markdown(path: &Path, markdown: &str) -> Result<(), IntakeError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, markdown)?;
    info!("markdown saved to {}", path.display());
    Ok(())
}
