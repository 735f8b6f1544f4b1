use astroledger_core::clients::GatewayClient;
use astroledger_primitives::error::GatewayError;
use astroledger_primitives::models::app_state::gateway_details::GatewayInfo;
use astroledger_primitives::models::dtos::providers::gateway::{
    GatewayOrderRequest, GatewayPaymentStatus,
};
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{basic_auth, body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> GatewayClient {
    client_at(server.uri())
}

fn client_at(gateway_api_url: String) -> GatewayClient {
    let info = GatewayInfo {
        gateway_key_id: "rzp_test_key".into(),
        gateway_key_secret: SecretString::from("rzp_test_secret"),
        gateway_webhook_secret: SecretString::from("unused"),
        gateway_api_url,
        gateway_timeout_secs: 2,
    };
    GatewayClient::new(reqwest::Client::new(), &info).unwrap()
}

fn payment(id: &str, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "entity": "payment",
        "amount": 50000,
        "currency": "INR",
        "status": status,
        "order_id": "order_abc",
        "method": "upi",
        "notes": { "user_id": "7a1f3c9e-2d4b-4e8a-9c1f-3b5d7e9f1a2c", "purpose": "recharge" },
        "error_description": null,
        "created_at": 1760400000
    })
}

#[tokio::test]
async fn test_fetch_captured_payment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/payments/pay_123"))
        .and(basic_auth("rzp_test_key", "rzp_test_secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(payment("pay_123", "captured")))
        .expect(1)
        .mount(&server)
        .await;

    let found = client_for(&server)
        .fetch_payment("pay_123")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(found.id, "pay_123");
    assert_eq!(found.amount, 50000);
    assert_eq!(found.status, GatewayPaymentStatus::Captured);
    assert_eq!(found.order_id.as_deref(), Some("order_abc"));
    assert!(found.noted_user().is_some());
}

#[tokio::test]
async fn test_unknown_payment_status_is_tolerated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/payments/pay_odd"))
        .respond_with(ResponseTemplate::new(200).set_body_json(payment("pay_odd", "on_hold")))
        .mount(&server)
        .await;

    let found = client_for(&server).fetch_payment("pay_odd").await.unwrap().unwrap();
    assert_eq!(found.status, GatewayPaymentStatus::Unknown);
}

#[tokio::test]
async fn test_missing_payment_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/payments/pay_missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": { "code": "BAD_REQUEST_ERROR", "description": "The id provided does not exist" }
        })))
        .mount(&server)
        .await;

    assert!(client_for(&server)
        .fetch_payment("pay_missing")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_server_errors_are_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client_for(&server).fetch_payment("pay_1").await.unwrap_err();
    assert!(matches!(err, GatewayError::Unavailable(_)));
}

#[tokio::test]
async fn test_rate_limited_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let err = client_for(&server).fetch_payment("pay_1").await.unwrap_err();
    assert!(matches!(err, GatewayError::Unavailable(_)));
}

#[tokio::test]
async fn test_slow_gateway_times_out_as_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(payment("pay_slow", "captured"))
                .set_delay(std::time::Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let err = client_for(&server).fetch_payment("pay_slow").await.unwrap_err();
    assert!(matches!(err, GatewayError::Unavailable(_)));
}

#[tokio::test]
async fn test_client_errors_are_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/orders"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "description": "amount exceeds maximum" }
        })))
        .mount(&server)
        .await;

    let request = GatewayOrderRequest {
        amount: 50000,
        currency: "INR".into(),
        receipt: "RCH20261014093015ABC123".into(),
        notes: json!({}),
    };
    let err = client_for(&server).create_order(&request).await.unwrap_err();
    assert!(matches!(err, GatewayError::Rejected(_)));
}

#[tokio::test]
async fn test_invalid_json_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server).fetch_payment("pay_1").await.unwrap_err();
    assert!(matches!(err, GatewayError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_create_order_sends_receipt_and_notes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/orders"))
        .and(basic_auth("rzp_test_key", "rzp_test_secret"))
        .and(body_partial_json(json!({
            "amount": 50000,
            "currency": "INR",
            "receipt": "RCH20261014093015ABC123",
            "notes": { "purpose": "recharge" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "order_abc",
            "entity": "order",
            "amount": 50000,
            "currency": "INR",
            "receipt": "RCH20261014093015ABC123",
            "status": "created"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = GatewayOrderRequest {
        amount: 50000,
        currency: "INR".into(),
        receipt: "RCH20261014093015ABC123".into(),
        notes: json!({ "purpose": "recharge" }),
    };
    let order = client_for(&server).create_order(&request).await.unwrap();

    assert_eq!(order.id, "order_abc");
    assert_eq!(order.receipt.as_deref(), Some("RCH20261014093015ABC123"));
}

#[tokio::test]
async fn test_order_payments_of_unknown_order_are_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/orders/order_gone/payments"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let payments = client_for(&server)
        .fetch_order_payments("order_gone")
        .await
        .unwrap();
    assert!(payments.is_empty());
}

#[tokio::test]
async fn test_list_payments_follows_pagination() {
    let server = MockServer::start().await;
    let first_page: Vec<_> = (0..100).map(|i| payment(&format!("pay_{i}"), "captured")).collect();
    let second_page: Vec<_> = (100..103).map(|i| payment(&format!("pay_{i}"), "captured")).collect();

    Mock::given(method("GET"))
        .and(path("/v1/payments"))
        .and(query_param("skip", "0"))
        .and(query_param("from", "1760390000"))
        .and(query_param("to", "1760410000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entity": "collection", "count": 100, "items": first_page
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/payments"))
        .and(query_param("skip", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entity": "collection", "count": 3, "items": second_page
        })))
        .expect(1)
        .mount(&server)
        .await;

    let payments = client_for(&server)
        .list_payments(1_760_390_000, 1_760_410_000)
        .await
        .unwrap();

    assert_eq!(payments.len(), 103);
    assert_eq!(payments.last().map(|p| p.id.as_str()), Some("pay_102"));
}

#[tokio::test]
async fn test_base_url_path_prefix_is_kept() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gateway/v1/payments/pay_prefixed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(payment("pay_prefixed", "captured")))
        .expect(1)
        .mount(&server)
        .await;

    let payment = client_at(format!("{}/gateway/", server.uri()))
        .fetch_payment("pay_prefixed")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.id, "pay_prefixed");
}

#[tokio::test]
async fn test_payment_id_stays_one_path_segment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/payments/..%2Forders%2Forder_abc"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/orders/order_abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(payment("pay_wrong", "captured")))
        .expect(0)
        .mount(&server)
        .await;

    let found = client_for(&server)
        .fetch_payment("../orders/order_abc")
        .await
        .unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn test_dot_ids_are_refused_without_a_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(matches!(
        client.fetch_payment("..").await,
        Err(GatewayError::Rejected(_))
    ));
    assert!(matches!(
        client.fetch_order_payments("").await,
        Err(GatewayError::Rejected(_))
    ));
}
