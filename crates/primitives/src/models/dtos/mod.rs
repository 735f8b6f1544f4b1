pub mod commission_dto;
pub mod dispute_dto;
pub mod health_dto;
pub mod order_dto;
pub mod providers;
pub mod reconciliation_dto;
pub mod transaction_dto;
pub mod wallet_dto;

pub use commission_dto::*;
pub use dispute_dto::*;
pub use health_dto::*;
pub use order_dto::*;
pub use providers::*;
pub use reconciliation_dto::*;
pub use transaction_dto::*;
pub use wallet_dto::*;
