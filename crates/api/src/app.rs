use crate::config::swagger_config::ApiDoc;
use crate::handlers::{
    balance::wallet_balance, commission_report::commission_report,
    gateway_webhook::gateway_webhook, get_transaction::list_transactions, health::health_check,
    pay_order::pay_order, recharge::recharge, reconciliation::run_reconciliation,
    resolve_transaction::resolve_transaction, settle_session::settle_session,
    transaction::get_transaction, withdraw::withdraw,
};
use astroledger_core::{AppState, SecurityConfig};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// Webhook payloads are small; anything larger is not from the gateway.
const BODY_LIMIT_BYTES: usize = 256 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    let public_router = create_public_routers();
    let protected_router = create_secured_routers(&state);

    let mut router = Router::new()
        .merge(public_router)
        .merge(protected_router)
        .layer(axum::extract::DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        );

    // The peer-ip key extractor needs ConnectInfo, which in-process test
    // servers do not provide.
    if state.config.rate_limit_enabled {
        match GovernorConfigBuilder::default()
            .per_second(2)
            .burst_size(10)
            .finish()
        {
            Some(conf) => router = router.layer(GovernorLayer::new(Arc::new(conf))),
            None => warn!("Invalid rate limit configuration, rate limiting disabled"),
        }
    }

    router.with_state(state)
}

fn create_secured_routers(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/wallet/recharge", post(recharge))
        .route("/api/wallet/balance", get(wallet_balance))
        .route("/api/wallet/withdraw", post(withdraw))
        .route("/api/transactions", get(list_transactions))
        .route(
            "/api/transactions/{transaction_id}",
            get(get_transaction).patch(resolve_transaction),
        )
        .route("/api/orders/{order_id}/pay", post(pay_order))
        .route("/api/sessions/{session_id}/settle", post(settle_session))
        .route("/api/admin/reconciliation/run", post(run_reconciliation))
        .route("/api/admin/commission-report", get(commission_report))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            SecurityConfig::auth_middleware,
        ))
}

fn create_public_routers() -> Router<Arc<AppState>> {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/webhooks/gateway", post(gateway_webhook))
        .route("/api/health", get(health_check))
}
