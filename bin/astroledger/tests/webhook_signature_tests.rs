mod common;

use astroledger_core::services::webhook_service::{WebhookService, SIGNATURE_HEADER};
use astroledger_primitives::error::ApiError;
use common::{create_test_app_state, create_test_server, WEBHOOK_SECRET};
use http::StatusCode;
use serde_json::json;

const SECRET: &[u8] = b"whsec_unit";

#[test]
fn test_valid_signature_verifies() {
    let body = br#"{"event":"payment.captured"}"#;
    let signature = WebhookService::sign(SECRET, body).unwrap();

    assert_eq!(signature.len(), 64);
    assert!(WebhookService::verify_signature(SECRET, body, &signature).is_ok());
}

#[test]
fn test_tampered_body_is_rejected() {
    let signature = WebhookService::sign(SECRET, br#"{"amount":500}"#).unwrap();

    assert!(matches!(
        WebhookService::verify_signature(SECRET, br#"{"amount":50000}"#, &signature),
        Err(ApiError::Webhook(_))
    ));
}

#[test]
fn test_wrong_secret_is_rejected() {
    let body = b"{}";
    let signature = WebhookService::sign(b"another_secret", body).unwrap();

    assert!(WebhookService::verify_signature(SECRET, body, &signature).is_err());
}

#[test]
fn test_malformed_signature_is_rejected() {
    for signature in ["not-hex", "abc", ""] {
        assert!(matches!(
            WebhookService::verify_signature(SECRET, b"{}", signature),
            Err(ApiError::Webhook(_))
        ));
    }
}

#[tokio::test]
async fn test_webhook_without_signature_is_400() {
    let server = create_test_server(create_test_app_state());

    let response = server
        .post("/api/webhooks/gateway")
        .json(&json!({ "event": "payment.captured" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "invalid_webhook");
}

#[tokio::test]
async fn test_webhook_with_bad_signature_is_400() {
    let server = create_test_server(create_test_app_state());

    let response = server
        .post("/api/webhooks/gateway")
        .add_header(SIGNATURE_HEADER, "00".repeat(32))
        .text(r#"{"event":"payment.captured"}"#)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_verified_unknown_event_is_acknowledged() {
    let server = create_test_server(create_test_app_state());
    let body = json!({
        "event": "refund.created",
        "payload": { "payment": { "entity": {
            "id": "pay_ignored",
            "amount": 100,
            "currency": "INR",
            "status": "refunded",
            "order_id": null,
            "method": "card",
            "notes": [],
            "error_description": null,
            "created_at": 1760400000
        }}}
    })
    .to_string();
    let signature = WebhookService::sign(WEBHOOK_SECRET.as_bytes(), body.as_bytes()).unwrap();

    let response = server
        .post("/api/webhooks/gateway")
        .add_header(SIGNATURE_HEADER, signature)
        .text(body)
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_verified_unparseable_payload_is_acknowledged() {
    let server = create_test_server(create_test_app_state());
    let body = "not json at all";
    let signature = WebhookService::sign(WEBHOOK_SECRET.as_bytes(), body.as_bytes()).unwrap();

    let response = server
        .post("/api/webhooks/gateway")
        .add_header(SIGNATURE_HEADER, signature)
        .text(body)
        .await;

    response.assert_status_ok();
}
