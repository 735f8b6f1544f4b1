use diesel::r2d2::{self, ConnectionManager};
use diesel::PgConnection;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

pub type DbPool = r2d2::Pool<ConnectionManager<PgConnection>>;

use crate::clients::GatewayClient;
use eyre::Result;
pub use astroledger_primitives::models::app_config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub http_client: Client,
    pub config: AppConfig,
    pub gateway: GatewayClient,
}

impl AppState {
    pub fn new(db: DbPool, config: AppConfig) -> Result<Arc<Self>> {
        let http = Client::builder()
            .timeout(Duration::from_secs(
                config.gateway_details.gateway_timeout_secs,
            ))
            .build()?;

        let gateway = GatewayClient::new(http.clone(), &config.gateway_details)?;

        Ok(Arc::new(Self {
            db,
            http_client: http,
            config,
            gateway,
        }))
    }
}
