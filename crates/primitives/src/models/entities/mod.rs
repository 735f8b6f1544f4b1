pub mod audit_log;
pub mod enum_types;
pub mod order;
pub mod session;
pub mod transaction;
pub mod user;

pub use audit_log::*;
pub use enum_types::*;
pub use order::*;
pub use session::*;
pub use transaction::*;
pub use user::*;
