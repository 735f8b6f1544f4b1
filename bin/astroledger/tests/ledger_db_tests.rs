mod common;

use astroledger_core::repositories::transaction_repository::TransactionRepository;
use astroledger_core::repositories::user_repository::UserRepository;
use astroledger_core::services::balance_service::{BalanceService, LedgerEntry};
use astroledger_core::services::payment_service::PaymentService;
use astroledger_core::services::reconciliation_service::ReconciliationService;
use astroledger_core::services::webhook_service::{WebhookService, SIGNATURE_HEADER};
use astroledger_primitives::models::dtos::providers::gateway::{GatewayPayment, PaymentConfirmation};
use astroledger_primitives::models::dtos::reconciliation_dto::ReconciliationTrigger;
use astroledger_primitives::models::entities::user::NewUser;
use astroledger_primitives::models::entities::enum_types::{
    SessionType, TransactionPurpose, TransactionStatus, TransactionType, UserRole,
};
use astroledger_primitives::schema::transactions;
use chrono::Utc;
use common::*;
use diesel::prelude::*;
use http::StatusCode;
use serde_json::{json, Value};
use serial_test::serial;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn rows_with_reference(state: &astroledger_core::AppState, reference: &str) -> i64 {
    let mut conn = state.db.get().unwrap();
    transactions::table
        .filter(transactions::payment_reference.eq(reference))
        .count()
        .get_result(&mut conn)
        .unwrap()
}

fn transactions_of(state: &astroledger_core::AppState, user_id: Uuid) -> i64 {
    let mut conn = state.db.get().unwrap();
    transactions::table
        .filter(transactions::user_id.eq(user_id))
        .count()
        .get_result(&mut conn)
        .unwrap()
}

#[tokio::test]
#[serial]
#[ignore = "needs TEST_DATABASE_URL"]
async fn test_recharge_with_same_payment_id_credits_once() {
    let gateway = MockServer::start().await;
    let state = prepared_state(&gateway.uri());
    let customer = create_user(&state, UserRole::Customer, 0);

    Mock::given(method("GET"))
        .and(path("/v1/payments/pay_idem"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(payment_json("pay_idem", 50000, "captured", customer.id)),
        )
        .expect(1)
        .mount(&gateway)
        .await;

    let token = token_for(&state, customer.id, UserRole::Customer);
    let server = create_test_server(state.clone());
    let request = json!({ "amount": 50000, "paymentMethod": "upi", "paymentId": "pay_idem" });

    let first = server
        .post("/api/wallet/recharge")
        .add_header("Authorization", bearer(&token))
        .json(&request)
        .await;
    first.assert_status_ok();
    let first: Value = first.json();
    assert_eq!(first["status"], "completed");
    assert_eq!(first["duplicate"], false);
    assert_eq!(first["newBalance"], 50000);

    let second = server
        .post("/api/wallet/recharge")
        .add_header("Authorization", bearer(&token))
        .json(&request)
        .await;
    second.assert_status_ok();
    let second: Value = second.json();
    assert_eq!(second["transactionId"], first["transactionId"]);
    assert_eq!(second["duplicate"], true);
    assert_eq!(second["newBalance"], 50000);

    assert_eq!(rows_with_reference(&state, "pay_idem"), 1);
    assert_eq!(wallet_balance(&state, customer.id), 50000);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[serial]
#[ignore = "needs TEST_DATABASE_URL"]
async fn test_concurrent_confirmations_record_one_transaction() {
    let state = prepared_state(UNREACHABLE_GATEWAY);
    let customer = create_user(&state, UserRole::Customer, 0);

    let confirmation = PaymentConfirmation {
        payment_id: "pay_race".into(),
        gateway_order_id: None,
        amount: 7500,
        method: Some("card".into()),
        user_id: Some(customer.id),
        expected_owner: None,
        purpose: Some(TransactionPurpose::Recharge),
        order_id: None,
        receipt: None,
    };

    let deliveries: Vec<_> = (0..2)
        .map(|_| {
            let state = state.clone();
            let confirmation = confirmation.clone();
            tokio::spawn(async move { PaymentService::record_confirmation(&state, confirmation).await })
        })
        .collect();

    let mut outcomes = Vec::new();
    for delivery in deliveries {
        outcomes.push(delivery.await.unwrap().unwrap());
    }
    let (a, b) = (&outcomes[0], &outcomes[1]);

    assert_eq!(a.transaction.id, b.transaction.id);
    assert!(a.duplicate != b.duplicate);
    assert_eq!(rows_with_reference(&state, "pay_race"), 1);
    assert_eq!(wallet_balance(&state, customer.id), 7500);
}

#[tokio::test]
#[serial]
#[ignore = "needs TEST_DATABASE_URL"]
async fn test_webhook_redelivery_is_acknowledged_and_ignored() {
    let state = prepared_state(UNREACHABLE_GATEWAY);
    let customer = create_user(&state, UserRole::Customer, 1000);
    let server = create_test_server(state.clone());

    let body = json!({
        "event": "payment.captured",
        "payload": { "payment": { "entity": payment_json("pay_hook", 2500, "captured", customer.id) } }
    })
    .to_string();
    let signature = WebhookService::sign(WEBHOOK_SECRET.as_bytes(), body.as_bytes()).unwrap();

    for _ in 0..3 {
        server
            .post("/api/webhooks/gateway")
            .add_header(SIGNATURE_HEADER, signature.clone())
            .text(body.clone())
            .await
            .assert_status_ok();
    }

    assert_eq!(rows_with_reference(&state, "pay_hook"), 1);
    assert_eq!(wallet_balance(&state, customer.id), 3500);
}

#[tokio::test]
#[serial]
#[ignore = "needs TEST_DATABASE_URL"]
async fn test_settlement_splits_commission() {
    let state = prepared_state(UNREACHABLE_GATEWAY);
    let customer = create_user(&state, UserRole::Customer, 2000);
    let astrologer = create_user(&state, UserRole::Astrologer, 0);
    let session = create_completed_session(&state, customer.id, astrologer.id, SessionType::Chat, 1000);

    let admin = token_for(&state, Uuid::new_v4(), UserRole::Administrator);
    let server = create_test_server(state.clone());
    let url = format!("/api/sessions/{}/settle", session.id);

    let first = server.post(&url).add_header("Authorization", bearer(&admin)).await;
    first.assert_status_ok();
    let first: Value = first.json();
    assert_eq!(first["customerDebit"]["amount"], 1000);
    assert_eq!(first["customerDebit"]["type"], "debit");
    assert_eq!(first["astrologerCommission"]["amount"], 650);
    assert_eq!(first["astrologerCommission"]["commissionRate"], 65);
    assert_eq!(first["platformFee"], 350);
    assert_eq!(first["alreadySettled"], false);

    let again = server.post(&url).add_header("Authorization", bearer(&admin)).await;
    again.assert_status_ok();
    let again: Value = again.json();
    assert_eq!(again["alreadySettled"], true);
    assert_eq!(
        again["customerDebit"]["transactionId"],
        first["customerDebit"]["transactionId"]
    );
    assert_eq!(again["platformFee"], 350);

    assert_eq!(wallet_balance(&state, customer.id), 1000);
    assert_eq!(wallet_balance(&state, astrologer.id), 650);
}

#[tokio::test]
#[serial]
#[ignore = "needs TEST_DATABASE_URL"]
async fn test_call_settlement_uses_seventy_percent() {
    let state = prepared_state(UNREACHABLE_GATEWAY);
    let customer = create_user(&state, UserRole::Customer, 1000);
    let astrologer = create_user(&state, UserRole::Astrologer, 0);
    let session = create_completed_session(&state, customer.id, astrologer.id, SessionType::Call, 1000);

    let admin = token_for(&state, Uuid::new_v4(), UserRole::Administrator);
    let server = create_test_server(state.clone());

    let response = server
        .post(&format!("/api/sessions/{}/settle", session.id))
        .add_header("Authorization", bearer(&admin))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["astrologerCommission"]["amount"], 700);
    assert_eq!(body["platformFee"], 300);

    let report = server
        .get("/api/admin/commission-report")
        .add_query_param("from", (Utc::now() - chrono::Duration::hours(1)).to_rfc3339())
        .add_query_param("to", (Utc::now() + chrono::Duration::hours(1)).to_rfc3339())
        .add_header("Authorization", bearer(&admin))
        .await;
    report.assert_status_ok();
    let report: Value = report.json();
    assert_eq!(report["totalEarnings"], 700);
    assert_eq!(report["totalPlatformFees"], 300);
    assert_eq!(report["rows"][0]["astrologerId"], astrologer.id.to_string());
}

#[tokio::test]
#[serial]
#[ignore = "needs TEST_DATABASE_URL"]
async fn test_insufficient_balance_leaves_ledger_untouched() {
    let state = prepared_state(UNREACHABLE_GATEWAY);
    let customer = create_user(&state, UserRole::Customer, 200);
    let astrologer = create_user(&state, UserRole::Astrologer, 0);
    let session = create_completed_session(&state, customer.id, astrologer.id, SessionType::Video, 500);

    let admin = token_for(&state, Uuid::new_v4(), UserRole::Administrator);
    let server = create_test_server(state.clone());

    let response = server
        .post(&format!("/api/sessions/{}/settle", session.id))
        .add_header("Authorization", bearer(&admin))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["code"], "insufficient_balance");

    assert_eq!(wallet_balance(&state, customer.id), 200);
    assert_eq!(wallet_balance(&state, astrologer.id), 0);
    assert_eq!(transactions_of(&state, customer.id), 0);
    assert_eq!(transactions_of(&state, astrologer.id), 0);
}

#[tokio::test]
#[serial]
#[ignore = "needs TEST_DATABASE_URL"]
async fn test_wallet_order_payment() {
    let state = prepared_state(UNREACHABLE_GATEWAY);
    let customer = create_user(&state, UserRole::Customer, 1000);
    let order = create_order(&state, customer.id, 600);

    let token = token_for(&state, customer.id, UserRole::Customer);
    let server = create_test_server(state.clone());
    let url = format!("/api/orders/{}/pay", order.id);

    let response = server
        .post(&url)
        .add_header("Authorization", bearer(&token))
        .json(&json!({ "method": "wallet" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["paymentStatus"], "paid");
    assert_eq!(body["transaction"]["purpose"], "product_purchase");
    assert_eq!(wallet_balance(&state, customer.id), 400);

    server
        .post(&url)
        .add_header("Authorization", bearer(&token))
        .json(&json!({ "method": "wallet" }))
        .await
        .assert_status(StatusCode::CONFLICT);
    assert_eq!(wallet_balance(&state, customer.id), 400);

    let stranger = token_for(&state, Uuid::new_v4(), UserRole::Customer);
    server
        .post(&url)
        .add_header("Authorization", bearer(&stranger))
        .json(&json!({ "method": "wallet" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
#[serial]
#[ignore = "needs TEST_DATABASE_URL"]
async fn test_withdrawal_resolution_is_final() {
    let state = prepared_state(UNREACHABLE_GATEWAY);
    let astrologer = create_user(&state, UserRole::Astrologer, 5000);
    let token = token_for(&state, astrologer.id, UserRole::Astrologer);
    let admin = token_for(&state, Uuid::new_v4(), UserRole::Administrator);
    let server = create_test_server(state.clone());

    let requested = server
        .post("/api/wallet/withdraw")
        .add_header("Authorization", bearer(&token))
        .json(&json!({ "amount": 3000 }))
        .await;
    requested.assert_status(StatusCode::ACCEPTED);
    let requested: Value = requested.json();
    assert_eq!(requested["status"], "pending");
    assert_eq!(requested["availableBalance"], 2000);
    let transaction_id = requested["transactionId"].as_str().unwrap().to_string();

    // the pending reservation counts against the next request
    server
        .post("/api/wallet/withdraw")
        .add_header("Authorization", bearer(&token))
        .json(&json!({ "amount": 3000 }))
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    let url = format!("/api/transactions/{}", transaction_id);
    let resolved = server
        .patch(&url)
        .add_header("Authorization", bearer(&admin))
        .json(&json!({ "status": "completed", "adminAction": "payout_sent", "adminNotes": "NEFT ref 8812" }))
        .await;
    resolved.assert_status_ok();
    let resolved: Value = resolved.json();
    assert_eq!(resolved["status"], "completed");
    assert_eq!(resolved["adminAction"], "payout_sent");
    assert_eq!(wallet_balance(&state, astrologer.id), 2000);

    server
        .patch(&url)
        .add_header("Authorization", bearer(&admin))
        .json(&json!({ "status": "cancelled", "adminAction": "undo" }))
        .await
        .assert_status(StatusCode::CONFLICT);
    assert_eq!(wallet_balance(&state, astrologer.id), 2000);

    // owners see the record without the administrator's notes
    let own = server
        .get(&url)
        .add_header("Authorization", bearer(&token))
        .await;
    own.assert_status_ok();
    let own: Value = own.json();
    assert!(own["adminNotes"].is_null());

    // the database refuses to move a terminal row as well
    let mut conn = state.db.get().unwrap();
    let reopened = diesel::update(transactions::table.filter(transactions::transaction_id.eq(&transaction_id)))
        .set(transactions::status.eq(TransactionStatus::Pending))
        .execute(&mut conn);
    assert!(reopened.is_err());
}

#[tokio::test]
#[serial]
#[ignore = "needs TEST_DATABASE_URL"]
async fn test_reconciliation_completes_stale_recharge_once() {
    let gateway = MockServer::start().await;
    let state = prepared_state(&gateway.uri());
    let customer = create_user(&state, UserRole::Customer, 0);

    Mock::given(method("GET"))
        .and(path("/v1/payments/pay_late"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&gateway)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/payments/pay_late"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(payment_json("pay_late", 50000, "captured", customer.id)),
        )
        .mount(&gateway)
        .await;

    let token = token_for(&state, customer.id, UserRole::Customer);
    let server = create_test_server(state.clone());

    let response = server
        .post("/api/wallet/recharge")
        .add_header("Authorization", bearer(&token))
        .json(&json!({ "amount": 50000, "paymentMethod": "upi", "paymentId": "pay_late" }))
        .await;
    response.assert_status(StatusCode::ACCEPTED);
    let body: Value = response.json();
    assert_eq!(body["status"], "pending");
    assert_eq!(wallet_balance(&state, customer.id), 0);

    {
        let mut conn = state.db.get().unwrap();
        diesel::update(transactions::table.filter(transactions::payment_reference.eq("pay_late")))
            .set(transactions::created_at.eq(Utc::now() - chrono::Duration::minutes(30)))
            .execute(&mut conn)
            .unwrap();
    }

    let admin = token_for(&state, Uuid::new_v4(), UserRole::Administrator);
    let first = server
        .post("/api/admin/reconciliation/run")
        .add_header("Authorization", bearer(&admin))
        .await;
    first.assert_status_ok();
    let first: Value = first.json();
    assert_eq!(first["skipped"], false);
    assert_eq!(first["examined"], 1);
    assert_eq!(first["completed"], 1);
    assert_eq!(wallet_balance(&state, customer.id), 50000);

    let second = ReconciliationService::run(&state, ReconciliationTrigger::Scheduled)
        .await
        .unwrap();
    assert_eq!(second.examined, 0);
    assert_eq!(second.completed, 0);
    assert_eq!(second.balances_applied, 0);
    assert_eq!(second.drifted_users, 0);
    assert!(!second.made_changes());

    assert_eq!(rows_with_reference(&state, "pay_late"), 1);
    assert_eq!(wallet_balance(&state, customer.id), 50000);
}

#[tokio::test]
#[serial]
#[ignore = "needs TEST_DATABASE_URL"]
async fn test_reconciliation_repairs_balance_drift() {
    let state = prepared_state(UNREACHABLE_GATEWAY);
    // a balance no ledger row explains
    let customer = create_user(&state, UserRole::Customer, 999);
    {
        let mut conn = state.db.get().unwrap();
        BalanceService::credit(
            &mut conn,
            LedgerEntry::new(customer.id, TransactionType::Credit, TransactionPurpose::Recharge, 400)
                .payment_reference(Some("pay_seed")),
        )
        .unwrap();
    }
    assert_eq!(wallet_balance(&state, customer.id), 1399);

    let first = ReconciliationService::run(&state, ReconciliationTrigger::OnDemand)
        .await
        .unwrap();
    assert_eq!(first.drifted_users, 1);
    assert_eq!(first.drift_repaired, 1);
    assert_eq!(wallet_balance(&state, customer.id), 400);

    let second = ReconciliationService::run(&state, ReconciliationTrigger::OnDemand)
        .await
        .unwrap();
    assert_eq!(second.drifted_users, 0);
    assert_eq!(wallet_balance(&state, customer.id), 400);
}

#[tokio::test]
#[serial]
#[ignore = "needs TEST_DATABASE_URL"]
async fn test_balance_matches_ledger_and_history_pages() {
    let state = prepared_state(UNREACHABLE_GATEWAY);
    let customer = create_user(&state, UserRole::Customer, 0);
    {
        let mut conn = state.db.get().unwrap();
        for (i, amount) in [300_i64, 200, 100, 50, 25].into_iter().enumerate() {
            let reference = format!("pay_page_{i}");
            BalanceService::credit(
                &mut conn,
                LedgerEntry::new(customer.id, TransactionType::Credit, TransactionPurpose::Recharge, amount)
                    .payment_reference(Some(&reference)),
            )
            .unwrap();
        }
        BalanceService::debit(
            &mut conn,
            LedgerEntry::new(customer.id, TransactionType::Debit, TransactionPurpose::ProductPurchase, 75),
        )
        .unwrap();
    }

    let token = token_for(&state, customer.id, UserRole::Customer);
    let server = create_test_server(state.clone());

    let balance = server
        .get("/api/wallet/balance")
        .add_header("Authorization", bearer(&token))
        .await;
    balance.assert_status_ok();
    let balance: Value = balance.json();
    assert_eq!(balance["walletBalance"], 600);
    assert_eq!(balance["ledgerBalance"], 600);

    let mut seen = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let mut request = server
            .get("/api/transactions")
            .add_query_param("limit", 4)
            .add_header("Authorization", bearer(&token));
        if let Some(cursor) = &cursor {
            request = request.add_query_param("cursor", cursor);
        }
        let page = request.await;
        page.assert_status_ok();
        let page: Value = page.json();

        for tx in page["transactions"].as_array().unwrap() {
            seen.push(tx["id"].as_str().unwrap().to_string());
        }
        match page["nextCursor"].as_str() {
            Some(next) => cursor = Some(next.to_string()),
            None => break,
        }
    }

    let unique: std::collections::HashSet<&String> = seen.iter().collect();
    assert_eq!(seen.len(), 6);
    assert_eq!(unique.len(), 6);

    let debits = server
        .get("/api/transactions")
        .add_query_param("type", "debit")
        .add_header("Authorization", bearer(&token))
        .await;
    debits.assert_status_ok();
    let debits: Value = debits.json();
    assert_eq!(debits["transactions"].as_array().unwrap().len(), 1);
    assert_eq!(debits["transactions"][0]["amount"], 75);
}

#[tokio::test]
#[serial]
#[ignore = "needs TEST_DATABASE_URL"]
async fn test_credit_with_known_reference_returns_existing_row() {
    let state = prepared_state(UNREACHABLE_GATEWAY);
    let customer = create_user(&state, UserRole::Customer, 0);
    let mut conn = state.db.get().unwrap();

    let entry = || {
        LedgerEntry::new(customer.id, TransactionType::Credit, TransactionPurpose::Recharge, 2500)
            .payment_reference(Some("pay_once"))
    };
    let (first, created) = BalanceService::credit(&mut conn, entry()).unwrap();
    assert!(created);
    let (again, created_again) = BalanceService::credit(&mut conn, entry()).unwrap();
    assert!(!created_again);
    assert_eq!(again.id, first.id);

    // an unmatched capture goes through the same credit
    let confirmation = PaymentConfirmation {
        payment_id: "pay_unmatched".into(),
        gateway_order_id: None,
        amount: 1500,
        method: Some("upi".into()),
        user_id: Some(customer.id),
        expected_owner: None,
        purpose: None,
        order_id: None,
        receipt: None,
    };
    let recorded = PaymentService::confirm(&mut conn, &confirmation).unwrap();
    assert!(!recorded.duplicate);
    assert_eq!(recorded.transaction.status, TransactionStatus::Completed);
    let replayed = PaymentService::confirm(&mut conn, &confirmation).unwrap();
    assert!(replayed.duplicate);
    assert_eq!(replayed.transaction.id, recorded.transaction.id);
    drop(conn);

    assert_eq!(rows_with_reference(&state, "pay_once"), 1);
    assert_eq!(rows_with_reference(&state, "pay_unmatched"), 1);
    assert_eq!(wallet_balance(&state, customer.id), 4000);
}

#[tokio::test]
#[serial]
#[ignore = "needs TEST_DATABASE_URL"]
async fn test_recharge_cannot_claim_another_users_checkout() {
    let gateway = MockServer::start().await;
    let state = prepared_state(&gateway.uri());
    let victim = create_user(&state, UserRole::Customer, 987_654);
    let attacker = create_user(&state, UserRole::Customer, 0);

    let pending = {
        let mut conn = state.db.get().unwrap();
        let tx = BalanceService::record_pending(
            &mut conn,
            LedgerEntry::new(victim.id, TransactionType::Credit, TransactionPurpose::Recharge, 5000)
                .payment_method(Some("upi")),
        )
        .unwrap();
        TransactionRepository::set_gateway_order(&mut conn, tx.id, "order_victim").unwrap();
        tx
    };

    let captured = json!({
        "id": "pay_victim",
        "entity": "payment",
        "amount": 5000,
        "currency": "INR",
        "status": "captured",
        "order_id": "order_victim",
        "method": "upi",
        "notes": [],
        "error_description": null,
        "created_at": Utc::now().timestamp()
    });
    Mock::given(method("GET"))
        .and(path("/v1/payments/pay_victim"))
        .respond_with(ResponseTemplate::new(200).set_body_json(captured.clone()))
        .mount(&gateway)
        .await;

    let token = token_for(&state, attacker.id, UserRole::Customer);
    let server = create_test_server(state.clone());
    let response = server
        .post("/api/wallet/recharge")
        .add_header("Authorization", bearer(&token))
        .json(&json!({ "amount": 5000, "paymentMethod": "upi", "paymentId": "pay_victim" }))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
    let body: Value = response.json();
    assert!(body.get("transactionId").is_none());
    assert_eq!(rows_with_reference(&state, "pay_victim"), 0);
    assert_eq!(wallet_balance(&state, victim.id), 987_654);
    assert_eq!(wallet_balance(&state, attacker.id), 0);

    // the rightful delivery still completes the checkout
    let payment: GatewayPayment = serde_json::from_value(captured).unwrap();
    let outcome = PaymentService::record_confirmation(&state, PaymentConfirmation::from_payment(&payment))
        .await
        .unwrap();
    assert_eq!(outcome.transaction.id, pending.id);
    assert_eq!(outcome.transaction.status, TransactionStatus::Completed);
    assert_eq!(wallet_balance(&state, victim.id), 992_654);
}

#[tokio::test]
#[serial]
#[ignore = "needs TEST_DATABASE_URL"]
async fn test_zero_share_session_reports_its_platform_fee() {
    let state = prepared_state(UNREACHABLE_GATEWAY);
    let customer = create_user(&state, UserRole::Customer, 1000);
    let astrologer = {
        let mut conn = state.db.get().unwrap();
        UserRepository::create(
            &mut conn,
            NewUser {
                id: Uuid::new_v4(),
                role: UserRole::Astrologer,
                wallet_balance: 0,
                call_rate: Some(0),
                chat_rate: None,
                video_rate: None,
            },
        )
        .unwrap()
    };
    let session = create_completed_session(&state, customer.id, astrologer.id, SessionType::Call, 1000);

    let admin = token_for(&state, Uuid::new_v4(), UserRole::Administrator);
    let server = create_test_server(state.clone());

    let settled = server
        .post(&format!("/api/sessions/{}/settle", session.id))
        .add_header("Authorization", bearer(&admin))
        .await;
    settled.assert_status_ok();
    let settled: Value = settled.json();
    assert!(settled["astrologerCommission"].is_null());
    assert_eq!(settled["platformFee"], 1000);

    let report = server
        .get("/api/admin/commission-report")
        .add_query_param("from", (Utc::now() - chrono::Duration::hours(1)).to_rfc3339())
        .add_query_param("to", (Utc::now() + chrono::Duration::hours(1)).to_rfc3339())
        .add_header("Authorization", bearer(&admin))
        .await;
    report.assert_status_ok();
    let report: Value = report.json();
    assert_eq!(report["totalPlatformFees"], settled["platformFee"]);
    assert_eq!(report["totalEarnings"], 0);
    assert_eq!(report["rows"][0]["astrologerId"], astrologer.id.to_string());
    assert_eq!(report["rows"][0]["sessions"], 1);
    assert_eq!(report["rows"][0]["grossAmount"], 1000);
    assert_eq!(wallet_balance(&state, astrologer.id), 0);
}

#[tokio::test]
#[serial]
#[ignore = "needs TEST_DATABASE_URL"]
async fn test_admin_without_wallet_resolves_transaction() {
    let state = prepared_state(UNREACHABLE_GATEWAY);
    let astrologer = create_user(&state, UserRole::Astrologer, 5000);
    let token = token_for(&state, astrologer.id, UserRole::Astrologer);
    // administrators come from the auth layer and own no ledger row
    let admin = token_for(&state, Uuid::new_v4(), UserRole::Administrator);
    let server = create_test_server(state.clone());

    let requested = server
        .post("/api/wallet/withdraw")
        .add_header("Authorization", bearer(&token))
        .json(&json!({ "amount": 1200 }))
        .await;
    requested.assert_status(StatusCode::ACCEPTED);
    let requested: Value = requested.json();
    let transaction_id = requested["transactionId"].as_str().unwrap().to_string();

    let resolved = server
        .patch(&format!("/api/transactions/{}", transaction_id))
        .add_header("Authorization", bearer(&admin))
        .json(&json!({ "status": "cancelled", "adminAction": "customer_request" }))
        .await;
    resolved.assert_status_ok();
    let resolved: Value = resolved.json();
    assert_eq!(resolved["status"], "cancelled");
    assert_eq!(resolved["adminAction"], "customer_request");
    assert_eq!(wallet_balance(&state, astrologer.id), 5000);
}

#[tokio::test]
#[serial]
#[ignore = "needs TEST_DATABASE_URL"]
async fn test_reconciliation_rotates_through_stuck_candidates() {
    let mut config = test_config(UNREACHABLE_GATEWAY);
    config.reconciliation_details.batch_size = 1;
    let state = prepared_state_with(config);
    let customer = create_user(&state, UserRole::Customer, 0);

    let (older, newer) = {
        let mut conn = state.db.get().unwrap();
        let mut stale = |minutes: i64| {
            let tx = BalanceService::record_pending(
                &mut conn,
                LedgerEntry::new(customer.id, TransactionType::Credit, TransactionPurpose::Recharge, 800)
                    .payment_method(Some("upi")),
            )
            .unwrap();
            diesel::update(transactions::table.find(tx.id))
                .set(transactions::created_at.eq(Utc::now() - chrono::Duration::minutes(minutes)))
                .execute(&mut conn)
                .unwrap();
            tx.id
        };
        (stale(90), stale(60))
    };

    let reconciled_at = |id: Uuid| {
        let mut conn = state.db.get().unwrap();
        transactions::table
            .find(id)
            .select(transactions::reconciled_at)
            .first::<Option<chrono::DateTime<Utc>>>(&mut conn)
            .unwrap()
    };

    // the gateway is down, so both rows stay pending
    let first = ReconciliationService::run(&state, ReconciliationTrigger::OnDemand)
        .await
        .unwrap();
    assert_eq!(first.examined, 1);
    assert_eq!(first.deferred, 1);
    assert!(reconciled_at(older).is_some());
    assert!(reconciled_at(newer).is_none());

    let second = ReconciliationService::run(&state, ReconciliationTrigger::OnDemand)
        .await
        .unwrap();
    assert_eq!(second.examined, 1);
    assert!(reconciled_at(newer).is_some());
}

#[tokio::test]
#[serial]
#[ignore = "needs TEST_DATABASE_URL"]
async fn test_payment_noted_for_other_purpose_leaves_checkout_pending() {
    let state = prepared_state(UNREACHABLE_GATEWAY);
    let customer = create_user(&state, UserRole::Customer, 300);

    let pending = {
        let mut conn = state.db.get().unwrap();
        let tx = BalanceService::record_pending(
            &mut conn,
            LedgerEntry::new(customer.id, TransactionType::Credit, TransactionPurpose::Recharge, 4200)
                .payment_method(Some("card")),
        )
        .unwrap();
        TransactionRepository::set_gateway_order(&mut conn, tx.id, "order_mixed").unwrap();
        tx
    };

    let confirmation = PaymentConfirmation {
        payment_id: "pay_mixed".into(),
        gateway_order_id: Some("order_mixed".into()),
        amount: 4200,
        method: Some("card".into()),
        user_id: Some(customer.id),
        expected_owner: None,
        purpose: Some(TransactionPurpose::ProductPurchase),
        order_id: None,
        receipt: None,
    };

    let err = PaymentService::record_confirmation(&state, confirmation).await.unwrap_err();
    assert!(err.to_string().contains("was not raised for transaction"));

    let mut conn = state.db.get().unwrap();
    let reloaded = TransactionRepository::find_by_id(&mut conn, pending.id).unwrap().unwrap();
    assert_eq!(reloaded.status, TransactionStatus::Pending);
    assert_eq!(rows_with_reference(&state, "pay_mixed"), 0);
    assert_eq!(wallet_balance(&state, customer.id), 300);
}
