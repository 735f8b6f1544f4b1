use eyre::eyre;
use eyre::Report;
use secrecy::SecretString;
use std::env;

#[derive(Debug, Clone)]
pub struct GatewayInfo {
    pub gateway_key_id: String,
    pub gateway_key_secret: SecretString,
    pub gateway_webhook_secret: SecretString,
    pub gateway_api_url: String,
    pub gateway_timeout_secs: u64,
}

impl GatewayInfo {
    pub fn new() -> Result<Self, Report> {
        Ok(Self {
            gateway_key_id: env::var("GATEWAY_KEY_ID")
                .map_err(|_| eyre!("GATEWAY_KEY_ID environment variable must be set"))?,
            gateway_key_secret: SecretString::new(
                env::var("GATEWAY_KEY_SECRET")
                    .map_err(|_| eyre!("GATEWAY_KEY_SECRET environment variable must be set"))?
                    .into(),
            ),
            gateway_webhook_secret: SecretString::new(
                env::var("GATEWAY_WEBHOOK_SECRET")
                    .map_err(|_| eyre!("GATEWAY_WEBHOOK_SECRET must be set"))?
                    .into(),
            ),
            gateway_api_url: env::var("GATEWAY_API_URL")
                .unwrap_or_else(|_| "https://api.razorpay.com".into()),
            gateway_timeout_secs: env::var("GATEWAY_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".into())
                .parse()?,
        })
    }
}
