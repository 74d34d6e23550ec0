//! Command line entry point for invoice intake.
//!
//! Prints JSON on stdout; logs and errors go to stderr.

use std::env;
use std::fs;
use std::path::Path;
use std::process::exit;

use mail_intake_module::{
    choose_invoice_attachment, download_attachment, list_invoice_attachments,
    upload_pdf_to_planner, upload_selected_invoice, FetchRequest, GmailApiClient, IntakeConfig,
    PlannerConfig,
};
use serde::Serialize;
use serde_json::json;

fn print_usage() {
    eprintln!(
        r##"Usage: invoice-intake <command> [arguments]

Commands:
  list [query] [--lookback-days=N]       List attachments matching the search
  select [query] [--lookback-days=N]     Show the attachment picked as the invoice
  fetch --message-id=ID --attachment-id=ID [--filename=NAME] [--out=PATH]
                                         Download one attachment
  upload <pdf_path> [--source-message-id=ID]
                                         Send a local PDF to the planner
  upload-latest [query] [--lookback-days=N]
                                         Select, fetch and upload the newest invoice

Environment Variables:
  GMAIL_AUTHORIZATION    - Gmail API bearer token
  GMAIL_API_BASE_URL     - (optional) Gmail API base URL
  GMAIL_MAX_RESULTS      - (optional) message limit, default 50
  GMAIL_SEARCH_DAYS      - (optional) lookback window, default 14
  GMAIL_SEARCH_QUERY     - (optional) default search query
  INVOICE_DOWNLOAD_DIR   - (optional) scratch directory for downloads
  PLANNER_API_BASE       - Planner API base URL
  PLANNER_API_KEY        - (optional) Planner bearer token
"##
    );
}

fn parse_arg(args: &[String], flag: &str) -> Option<String> {
    let prefix = format!("{}=", flag);
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            return Some(value.to_string());
        }
        if arg == flag {
            return args.get(idx + 1).cloned();
        }
    }
    None
}

/// First argument after the command that is neither a flag nor the value of
/// a space-separated `--flag value` pair. Every flag here takes a value.
fn positional(args: &[String]) -> Option<&str> {
    let mut rest = args.iter().skip(2).map(String::as_str);
    while let Some(arg) = rest.next() {
        if !arg.starts_with("--") {
            return Some(arg);
        }
        if !arg.contains('=') {
            rest.next();
        }
    }
    None
}

fn lookback_days(args: &[String], config: &IntakeConfig) -> Result<u32, String> {
    match parse_arg(args, "--lookback-days") {
        Some(raw) => raw
            .parse::<u32>()
            .map_err(|_| format!("--lookback-days must be a non-negative integer, got {:?}", raw)),
        None => Ok(config.lookback_days),
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("failed to encode output: {}", e))
}

fn main() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        exit(1);
    }

    let config = IntakeConfig::from_env();
    let command = &args[1];

    let result = match command.as_str() {
        "list" => cmd_list(&args, &config),
        "select" => cmd_select(&args, &config),
        "fetch" => {
            let message_id = parse_arg(&args, "--message-id").unwrap_or_default();
            let attachment_id = parse_arg(&args, "--attachment-id").unwrap_or_default();
            if message_id.is_empty() || attachment_id.is_empty() {
                eprintln!("Error: --message-id and --attachment-id are required");
                exit(1);
            }
            let mut request = FetchRequest::new(message_id, attachment_id);
            if let Some(filename) = parse_arg(&args, "--filename") {
                request = request.with_filename(filename);
            }
            cmd_fetch(&config, &request, parse_arg(&args, "--out"))
        }
        "upload" => {
            let Some(path) = positional(&args) else {
                eprintln!("Error: PDF path required");
                print_usage();
                exit(1);
            };
            cmd_upload(Path::new(path), parse_arg(&args, "--source-message-id"))
        }
        "upload-latest" => cmd_upload_latest(&args, &config),
        "--help" | "-h" | "help" => {
            print_usage();
            exit(0);
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            exit(1);
        }
    };

    match result {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {}", e);
            exit(1);
        }
    }
}

fn gmail_client(config: &IntakeConfig) -> Result<GmailApiClient, String> {
    GmailApiClient::from_config(config).map_err(|e| e.to_string())
}

fn cmd_list(args: &[String], config: &IntakeConfig) -> Result<String, String> {
    let client = gmail_client(config)?;
    let query = positional(args).unwrap_or(&config.search_query);
    let days = lookback_days(args, config)?;

    let refs =
        list_invoice_attachments(&client, config, query, days).map_err(|e| e.to_string())?;
    to_json(&refs)
}

fn cmd_select(args: &[String], config: &IntakeConfig) -> Result<String, String> {
    let client = gmail_client(config)?;
    let query = positional(args).unwrap_or(&config.search_query);
    let days = lookback_days(args, config)?;

    let refs =
        list_invoice_attachments(&client, config, query, days).map_err(|e| e.to_string())?;
    match choose_invoice_attachment(&refs) {
        Some(selection) => to_json(&json!({
            "position": selection.position,
            "reason": format!("{:?}", selection.reason),
            "attachment": selection.candidate,
        })),
        None => Err("no attachments found".to_string()),
    }
}

fn cmd_fetch(
    config: &IntakeConfig,
    request: &FetchRequest,
    out: Option<String>,
) -> Result<String, String> {
    let client = gmail_client(config)?;
    let bytes = download_attachment(&client, request).map_err(|e| e.to_string())?;

    let out = out.unwrap_or_else(|| request.filename_hint(&request.attachment_id().unwrap_or_default()));
    fs::write(&out, &bytes).map_err(|e| format!("failed to write {}: {}", out, e))?;
    to_json(&json!({"path": out, "size_bytes": bytes.len()}))
}

fn cmd_upload(path: &Path, source_message_id: Option<String>) -> Result<String, String> {
    let bytes =
        fs::read(path).map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    let planner = PlannerConfig::from_env();
    let report = upload_pdf_to_planner(&planner, &bytes, source_message_id.as_deref())
        .map_err(|e| e.to_string())?;
    to_json(&report)
}

fn cmd_upload_latest(args: &[String], config: &IntakeConfig) -> Result<String, String> {
    let client = gmail_client(config)?;
    let query = positional(args).unwrap_or(&config.search_query);
    let days = lookback_days(args, config)?;
    let planner = PlannerConfig::from_env();

    let uploaded = upload_selected_invoice(&client, config, &planner, query, days)
        .map_err(|e| e.to_string())?;
    match uploaded {
        Some(upload) => to_json(&json!({
            "position": upload.position,
            "attachment": upload.attachment,
            "report": upload.report,
        })),
        None => Err("no PDF attachments found".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn positional_skips_space_separated_flag_values() {
        let args = argv(&["invoice-intake", "list", "--lookback-days", "7"]);
        assert_eq!(positional(&args), None);
        assert_eq!(parse_arg(&args, "--lookback-days").as_deref(), Some("7"));

        let args = argv(&["invoice-intake", "upload", "--source-message-id", "m1", "a.pdf"]);
        assert_eq!(positional(&args), Some("a.pdf"));
        assert_eq!(parse_arg(&args, "--source-message-id").as_deref(), Some("m1"));
    }

    #[test]
    fn positional_handles_equals_form_and_order() {
        let args = argv(&["invoice-intake", "list", "--lookback-days=3", "from:billing"]);
        assert_eq!(positional(&args), Some("from:billing"));

        let args = argv(&["invoice-intake", "list", "from:billing", "--lookback-days", "3"]);
        assert_eq!(positional(&args), Some("from:billing"));
    }

    #[test]
    fn lookback_flag_overrides_config() {
        let config = IntakeConfig::default();
        let args = argv(&["invoice-intake", "select", "--lookback-days", "30"]);
        assert_eq!(lookback_days(&args, &config), Ok(30));

        let args = argv(&["invoice-intake", "select", "--lookback-days=soon"]);
        assert!(lookback_days(&args, &config).is_err());

        let args = argv(&["invoice-intake", "select"]);
        assert_eq!(lookback_days(&args, &config), Ok(14));
    }
}
