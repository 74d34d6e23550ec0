mod test_support;

use mail_intake_module::{
    upload_selected_invoice, ErrorKind, GmailApiClient, PlannerConfig,
};
use mockito::Matcher;
use serde_json::json;
use test_support::{intake_config, start_mockito_server};

const MESSAGES_PATH: &str = "/gmail/v1/users/me/messages";

fn mock_inbox(server: &mut mockito::ServerGuard, attachment_data: &str) -> Vec<mockito::Mock> {
    let list = server
        .mock("GET", MESSAGES_PATH)
        .match_query(Matcher::UrlEncoded(
            "q".into(),
            "from:supplier has:attachment newer_than:3d".into(),
        ))
        .with_status(200)
        .with_body(r#"{"messages":[{"id":"m7"}]}"#)
        .create();
    let message = server
        .mock("GET", format!("{MESSAGES_PATH}/m7").as_str())
        .match_query(Matcher::UrlEncoded("format".into(), "full".into()))
        .with_status(200)
        .with_body(
            json!({
                "id": "m7",
                "internalDate": "1700000000000",
                "payload": {
                    "mimeType": "multipart/mixed",
                    "headers": [{"name": "Subject", "value": "PO 88"}],
                    "parts": [
                        {"mimeType": "image/png", "filename": "logo.png",
                         "body": {"attachmentId": "img", "size": 10}},
                        {"mimeType": "application/pdf", "filename": "terms.pdf",
                         "body": {"attachmentId": "t1", "size": 10}},
                        {"mimeType": "application/pdf", "filename": "PI 88.pdf",
                         "body": {"attachmentId": "p1", "size": 10}}
                    ]
                }
            })
            .to_string(),
        )
        .create();
    let attachment = server
        .mock("GET", format!("{MESSAGES_PATH}/m7/attachments/p1").as_str())
        .with_status(200)
        .with_body(json!({"data": attachment_data}).to_string())
        .expect(1)
        .create();
    vec![list, message, attachment]
}

#[test]
fn uploads_selected_pdf_to_planner() -> Result<(), Box<dyn std::error::Error>> {
    let Some(mut server) = start_mockito_server("uploads_selected_pdf_to_planner") else {
        return Ok(());
    };
    // "%PDF-1.4"
    let gmail_mocks = mock_inbox(&mut server, "JVBERi0xLjQ=");
    let upload = server
        .mock("POST", "/orders/pending/upload-pdf")
        .match_header("authorization", "Bearer planner-key")
        .match_body(Matcher::Regex("%PDF-1.4".to_string()))
        .with_status(200)
        .with_body(r#"{"created_order_ids":[5001],"warnings":[],"errors":[]}"#)
        .expect(1)
        .create();

    let downloads = tempfile::tempdir()?;
    let config = intake_config(&server.url(), Some("tok"), &downloads);
    let planner = PlannerConfig::new(server.url(), Some("planner-key".to_string()));
    let client = GmailApiClient::from_config(&config)?;

    let uploaded = upload_selected_invoice(&client, &config, &planner, "from:supplier", 3)?
        .expect("an invoice should be selected");

    for mock in &gmail_mocks {
        mock.assert();
    }
    upload.assert();
    // logo.png is not a PDF, so "PI 88.pdf" is the second candidate.
    assert_eq!(uploaded.position, 2);
    assert_eq!(uploaded.attachment.attachment_id, "p1");
    assert_eq!(uploaded.report.source_message_id, "m7");
    assert_eq!(
        serde_json::to_value(&uploaded.report.created_order_ids)?,
        json!([5001])
    );
    Ok(())
}

#[test]
fn non_pdf_payload_is_rejected_before_upload() -> Result<(), Box<dyn std::error::Error>> {
    let Some(mut server) = start_mockito_server("non_pdf_payload_is_rejected_before_upload") else {
        return Ok(());
    };
    // "hello"
    let _gmail_mocks = mock_inbox(&mut server, "aGVsbG8");
    let upload = server
        .mock("POST", "/orders/pending/upload-pdf")
        .expect(0)
        .create();

    let downloads = tempfile::tempdir()?;
    let config = intake_config(&server.url(), Some("tok"), &downloads);
    let planner = PlannerConfig::new(server.url(), None);
    let client = GmailApiClient::from_config(&config)?;

    let err = upload_selected_invoice(&client, &config, &planner, "from:supplier", 3).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    upload.assert();
    Ok(())
}
