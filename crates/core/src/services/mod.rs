pub mod audit_service;
pub mod balance_service;
pub mod commission_service;
pub mod dispute_service;
pub mod order_service;
pub mod payment_service;
pub mod reconciliation_service;
pub mod transaction_service;
pub mod webhook_service;
