//! Invoice intake from a Gmail mailbox.
//!
//! Lists candidate attachments, picks the one most likely to be an invoice,
//! fetches its bytes and hands the PDF on, either to the planner's order
//! intake or to a convert/extract/track workflow.

pub mod attachments;
pub mod config;
pub mod errors;
pub mod fetcher;
pub mod gmail;
pub mod invoice;
pub mod selector;
pub mod workflow;

pub use attachments::{
    coerce_size, epoch_ms_to_iso8601, list_invoice_attachments, normalize_messages, AttachmentRef,
};
pub use config::IntakeConfig;
pub use errors::{ErrorKind, IntakeError};
pub use fetcher::{download_attachment, download_attachment_ref, FetchRequest};
pub use gmail::{augment_query, GmailApiClient, MailCollaborator, RawAttachment, RawMessage};
pub use invoice::{clean_invoice, Invoice, InvoiceLineItem};
pub use selector::{choose_invoice_attachment, InvoiceCandidate, MatchReason, Selection};
pub use workflow::{
    convert_latest_invoice, run_invoice_workflow, run_invoice_workflow_from_markdown,
    upload_selected_invoice, ConvertedInvoice, DocumentConverter, InvoiceExtractor, PlannerUpload,
    SkipReason, TaskTracker, TaskUpdate, WorkflowDeps, WorkflowOutcome, WorkflowReport,
};

pub use planner_upload_module::{upload_pdf_to_planner, InsertReport, PlannerConfig, PlannerError};
