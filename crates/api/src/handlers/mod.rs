pub mod balance;
pub mod commission_report;
pub mod gateway_webhook;
pub mod get_transaction;
pub mod health;
pub mod pay_order;
pub mod recharge;
pub mod reconciliation;
pub mod resolve_transaction;
pub mod settle_session;
pub mod transaction;
pub mod withdraw;
