#![allow(dead_code)]

use astroledger_core::app_state::{AppState, DbPool};
use astroledger_core::{migrations, SecurityConfig};
use astroledger_primitives::models::app_state::app_config::AppConfig;
use astroledger_primitives::models::app_state::commission_details::CommissionInfo;
use astroledger_primitives::models::app_state::gateway_details::GatewayInfo;
use astroledger_primitives::models::app_state::jwt_details::JWTInfo;
use astroledger_primitives::models::app_state::reconciliation_details::ReconciliationInfo;
use astroledger_primitives::models::entities::enum_types::{
    SessionStatus, SessionType, UserRole,
};
use astroledger_primitives::models::entities::order::{NewOrder, Order};
use astroledger_primitives::models::entities::session::{NewSession, Session};
use astroledger_primitives::models::entities::user::{NewUser, User};
use astroledger_core::repositories::order_repository::OrderRepository;
use astroledger_core::repositories::session_repository::SessionRepository;
use astroledger_core::repositories::user_repository::UserRepository;
use axum::Router;
use axum_test::TestServer;
use chrono::Utc;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::PgConnection;
use secrecy::SecretString;
use std::sync::{Arc, Once};
use std::time::Duration;
use uuid::Uuid;

pub const WEBHOOK_SECRET: &str = "test_gateway_webhook_secret";
// Nothing listens here; requests fail fast as unavailable.
pub const UNREACHABLE_GATEWAY: &str = "http://127.0.0.1:9";

static MIGRATE: Once = Once::new();

pub fn test_config(gateway_url: &str) -> AppConfig {
    AppConfig {
        jwt_details: JWTInfo {
            jwt_secret: SecretString::from("test_secret_key_minimum_32_characters_long_for_testing"),
            jwt_issuer: "astroledger".to_string(),
            jwt_audience: "astroledger_api".to_string(),
        },
        gateway_details: GatewayInfo {
            gateway_key_id: "rzp_test_key".to_string(),
            gateway_key_secret: SecretString::from("rzp_test_secret"),
            gateway_webhook_secret: SecretString::from(WEBHOOK_SECRET),
            gateway_api_url: gateway_url.to_string(),
            gateway_timeout_secs: 2,
        },
        commission_details: CommissionInfo::default(),
        reconciliation_details: ReconciliationInfo {
            grace_minutes: 5,
            ..ReconciliationInfo::default()
        },
        currency: "INR".to_string(),
        rate_limit_enabled: false,
        run_migrations: false,
    }
}

pub fn database_url() -> Option<String> {
    std::env::var("TEST_DATABASE_URL").ok()
}

/// Never connects eagerly, so tests that stop before the database work
/// without one.
pub fn create_test_db_pool() -> DbPool {
    let url = database_url().unwrap_or_else(|| "postgres://invalid@127.0.0.1:1/none".to_string());

    Pool::builder()
        .max_size(5)
        .min_idle(Some(0))
        .connection_timeout(Duration::from_secs(2))
        .build_unchecked(ConnectionManager::<PgConnection>::new(url))
}

pub fn create_test_app_state_with_gateway(gateway_url: &str) -> Arc<AppState> {
    AppState::new(create_test_db_pool(), test_config(gateway_url))
        .expect("Failed to build test AppState")
}

pub fn create_test_app_state() -> Arc<AppState> {
    create_test_app_state_with_gateway(UNREACHABLE_GATEWAY)
}

/// Migrated, emptied database state. Database tests are `#[ignore]`d and
/// run with `cargo test -- --ignored` against `TEST_DATABASE_URL`.
pub fn prepared_state(gateway_url: &str) -> Arc<AppState> {
    prepared_state_with(test_config(gateway_url))
}

pub fn prepared_state_with(config: AppConfig) -> Arc<AppState> {
    assert!(
        database_url().is_some(),
        "TEST_DATABASE_URL must point at a Postgres database for database tests"
    );

    let state = AppState::new(create_test_db_pool(), config).expect("Failed to build test AppState");
    let mut conn = state.db.get().expect("Failed to get DB connection");

    MIGRATE.call_once(|| {
        migrations::run_pending(&mut conn).expect("Failed to run migrations");
    });
    cleanup_test_db(&mut conn);

    state
}

pub fn cleanup_test_db(conn: &mut PgConnection) {
    diesel::sql_query("TRUNCATE audit_logs, transactions, orders, sessions, users CASCADE")
        .execute(conn)
        .expect("Failed to truncate test tables");
}

pub fn create_test_app(state: Arc<AppState>) -> Router {
    astroledger_api::app::create_router(state)
}

pub fn create_test_server(state: Arc<AppState>) -> TestServer {
    TestServer::new(create_test_app(state)).expect("Failed to start test server")
}

pub fn token_for(state: &AppState, user_id: Uuid, role: UserRole) -> String {
    SecurityConfig::create_token(state, user_id, role, chrono::Duration::hours(1))
        .expect("Failed to create token")
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

pub fn create_user(state: &AppState, role: UserRole, wallet_balance: i64) -> User {
    let mut conn = state.db.get().expect("Failed to get DB connection");
    UserRepository::create(
        &mut conn,
        NewUser {
            id: Uuid::new_v4(),
            role,
            wallet_balance,
            call_rate: None,
            chat_rate: None,
            video_rate: None,
        },
    )
    .expect("Failed to create user")
}

pub fn create_completed_session(
    state: &AppState,
    customer_id: Uuid,
    astrologer_id: Uuid,
    session_type: SessionType,
    total_amount: i64,
) -> Session {
    let mut conn = state.db.get().expect("Failed to get DB connection");
    SessionRepository::create(
        &mut conn,
        NewSession {
            id: Uuid::new_v4(),
            customer_id,
            astrologer_id,
            session_type,
            total_amount,
            status: SessionStatus::Completed,
            completed_at: Some(Utc::now()),
        },
    )
    .expect("Failed to create session")
}

pub fn create_order(state: &AppState, customer_id: Uuid, total_amount: i64) -> Order {
    let mut conn = state.db.get().expect("Failed to get DB connection");
    OrderRepository::create(
        &mut conn,
        NewOrder {
            id: Uuid::new_v4(),
            customer_id,
            total_amount,
        },
    )
    .expect("Failed to create order")
}

pub fn wallet_balance(state: &AppState, user_id: Uuid) -> i64 {
    let mut conn = state.db.get().expect("Failed to get DB connection");
    UserRepository::find_by_id(&mut conn, user_id)
        .expect("Failed to load user")
        .expect("User missing")
        .wallet_balance
}

/// A gateway payment entity as the gateway serializes it.
pub fn payment_json(id: &str, amount: i64, status: &str, user_id: Uuid) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "entity": "payment",
        "amount": amount,
        "currency": "INR",
        "status": status,
        "order_id": null,
        "method": "upi",
        "notes": { "user_id": user_id.to_string(), "purpose": "recharge" },
        "error_description": null,
        "created_at": Utc::now().timestamp()
    })
}
