pub mod gateway;

pub use gateway::GatewayClient;
