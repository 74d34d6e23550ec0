mod test_support;

use mockito::Matcher;
use planner_upload_module::{
    upload_pdf_to_planner, ErrorKind, OrderId, PlannerConfig, PlannerError,
};
use serial_test::serial;
use std::env;
use test_support::start_mockito_server;

const PDF: &[u8] = b"%PDF-1.4\n1 0 obj\n<<>>\nendobj\n";

#[test]
fn upload_posts_multipart_and_normalizes_report() -> Result<(), Box<dyn std::error::Error>> {
    let Some(mut server) = start_mockito_server("upload_posts_multipart_and_normalizes_report") else {
        return Ok(());
    };
    let mock = server
        .mock("POST", "/orders/pending/upload-pdf")
        .match_header("authorization", "Bearer testkey")
        .match_header(
            "content-type",
            Matcher::Regex("^multipart/form-data; boundary=".to_string()),
        )
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#"name="file"; filename="invoice.pdf""#.to_string()),
            Matcher::Regex("(?i)content-type: application/pdf".to_string()),
            Matcher::Regex("%PDF-1.4".to_string()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"created_order_ids":["123"],"warnings":"minor","errors":[],"notes":"ok"}"#)
        .expect(1)
        .create();

    let config = PlannerConfig::new(server.url(), Some("testkey".to_string()));
    let report = upload_pdf_to_planner(&config, PDF, Some("m1"))?;

    mock.assert();
    assert_eq!(report.created_order_ids, vec![OrderId::from("123")]);
    assert_eq!(report.warnings, vec!["minor".to_string()]);
    assert!(report.errors.is_empty());
    assert_eq!(report.source_message_id, "m1");
    assert_eq!(report.notes, "ok");
    Ok(())
}

#[test]
fn upload_without_key_sends_no_authorization() -> Result<(), Box<dyn std::error::Error>> {
    let Some(mut server) = start_mockito_server("upload_without_key_sends_no_authorization") else {
        return Ok(());
    };
    let mock = server
        .mock("POST", "/api/orders/pending/upload-pdf")
        .match_header("authorization", Matcher::Missing)
        .with_status(201)
        .with_body(r#"{"created":[42],"detail":"accepted"}"#)
        .expect(1)
        .create();

    let config = PlannerConfig::new(format!("{}/api/", server.url()), None);
    let report = upload_pdf_to_planner(&config, PDF, None)?;

    mock.assert();
    assert_eq!(report.created_order_ids, vec![OrderId::Int(42)]);
    assert_eq!(report.notes, "accepted");
    assert_eq!(report.source_message_id, "");
    Ok(())
}

#[test]
fn success_without_json_body_yields_empty_report() -> Result<(), Box<dyn std::error::Error>> {
    let Some(mut server) = start_mockito_server("success_without_json_body_yields_empty_report") else {
        return Ok(());
    };
    let _mock = server
        .mock("POST", "/orders/pending/upload-pdf")
        .with_status(200)
        .with_body("OK")
        .create();

    let config = PlannerConfig::new(server.url(), None);
    let report = upload_pdf_to_planner(&config, PDF, Some("m2"))?;

    assert!(report.created_order_ids.is_empty());
    assert!(report.warnings.is_empty());
    assert!(report.errors.is_empty());
    assert_eq!(report.notes, "");
    assert_eq!(report.source_message_id, "m2");
    Ok(())
}

#[test]
fn error_status_includes_code_and_body() {
    let Some(mut server) = start_mockito_server("error_status_includes_code_and_body") else {
        return;
    };
    let _mock = server
        .mock("POST", "/orders/pending/upload-pdf")
        .with_status(400)
        .with_body("Bad request: invalid PDF")
        .create();

    let config = PlannerConfig::new(server.url(), Some("testkey".to_string()));
    let err = upload_pdf_to_planner(&config, PDF, None).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Request);
    let message = err.to_string();
    assert!(message.contains("HTTP 400"), "{message}");
    assert!(message.contains("Bad request: invalid PDF"), "{message}");
}

#[test]
fn error_body_is_truncated() {
    let Some(mut server) = start_mockito_server("error_body_is_truncated") else {
        return;
    };
    let long_body = format!("{}{}", "x".repeat(200), "SECRET-TAIL");
    let _mock = server
        .mock("POST", "/orders/pending/upload-pdf")
        .with_status(502)
        .with_body(long_body)
        .create();

    let config = PlannerConfig::new(server.url(), None);
    match upload_pdf_to_planner(&config, PDF, None) {
        Err(PlannerError::HttpStatus { status, body }) => {
            assert_eq!(status, 502);
            assert_eq!(body.len(), 200);
            assert!(!body.contains("SECRET-TAIL"));
        }
        other => panic!("expected HttpStatus error, got {other:?}"),
    }
}

#[test]
fn connection_failure_is_request_error() {
    // Port 1 on loopback is reserved and refuses connections.
    let config = PlannerConfig::new("http://127.0.0.1:1", None);
    let err = upload_pdf_to_planner(&config, PDF, None).unwrap_err();
    assert!(matches!(err, PlannerError::Request(_)), "got {err:?}");
}

#[test]
#[serial]
fn config_from_env_reads_planner_variables() {
    env::set_var("PLANNER_API_BASE", "http://planner.local");
    env::set_var("PLANNER_API_KEY", "");
    let config = PlannerConfig::from_env();
    env::remove_var("PLANNER_API_BASE");
    env::remove_var("PLANNER_API_KEY");

    assert_eq!(config.api_base.as_deref(), Some("http://planner.local"));
    assert_eq!(config.api_key, None);
}
