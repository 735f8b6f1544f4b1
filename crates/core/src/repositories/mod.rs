pub mod audit_repository;
pub mod order_repository;
pub mod session_repository;
pub mod transaction_repository;
pub mod user_repository;
