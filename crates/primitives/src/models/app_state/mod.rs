pub mod app_config;
pub mod commission_details;
pub mod gateway_details;
pub mod jwt_details;
pub mod reconciliation_details;

pub use app_config::*;
pub use commission_details::*;
pub use gateway_details::*;
pub use jwt_details::*;
pub use reconciliation_details::*;
