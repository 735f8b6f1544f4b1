use crate::handlers::{
    balance::__path_wallet_balance, commission_report::__path_commission_report,
    gateway_webhook::__path_gateway_webhook, get_transaction::__path_list_transactions,
    health::__path_health_check, pay_order::__path_pay_order, recharge::__path_recharge,
    reconciliation::__path_run_reconciliation,
    resolve_transaction::__path_resolve_transaction, settle_session::__path_settle_session,
    transaction::__path_get_transaction, withdraw::__path_withdraw,
};
use astroledger_primitives::error::ApiErrorResponse;
use astroledger_primitives::models::dtos::*;
use astroledger_primitives::models::entities::enum_types::*;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    paths(
        recharge, wallet_balance, withdraw,
        list_transactions, get_transaction, resolve_transaction,
        pay_order, settle_session, commission_report,
        run_reconciliation, gateway_webhook, health_check
    ),
    components(schemas(
        ApiErrorResponse, RechargeRequest, RechargeResponse, WithdrawRequest,
        WithdrawResponse, BalanceResponse, TransactionDto, TransactionPage,
        ResolveTransactionRequest, OrderPaymentRequest, OrderPaymentResponse,
        OrderPaymentMethod, SettlementResponse, CommissionReport, CommissionReportRow,
        ReconciliationReport, ReconciliationTrigger, HealthStatus,
        TransactionType, TransactionPurpose, TransactionStatus, OrderPaymentStatus
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "Wallet", description = "Recharge, balance and withdrawal"),
        (name = "Transactions", description = "Ledger history and administrator resolution"),
        (name = "Orders", description = "Product order payment"),
        (name = "Commission", description = "Consultation settlement and earnings reports"),
        (name = "Reconciliation", description = "Gateway reconciliation"),
        (name = "Webhooks", description = "Payment gateway callbacks"),
        (name = "Health", description = "Liveness")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "bearerAuth".to_string(),
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
