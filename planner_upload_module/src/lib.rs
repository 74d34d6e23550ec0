//! Upload of invoice PDFs to the planner's order-intake service.
//!
//! The planner answers with a loosely specified JSON body; this crate turns
//! whatever comes back into an [`InsertReport`].

mod config;
mod errors;
mod report;
mod upload;

pub use config::{PlannerConfig, PLANNER_API_BASE_ENV, PLANNER_API_KEY_ENV};
pub use errors::{ErrorKind, PlannerError};
pub use report::{decode_insert_report, InsertReport, OrderId};
pub use upload::{upload_pdf_to_planner, UPLOAD_FILE_NAME, UPLOAD_PATH, UPLOAD_TIMEOUT};
