use crate::app_state::AppState;
use crate::services::payment_service::PaymentService;
use astroledger_primitives::error::ApiError;
use astroledger_primitives::models::dtos::providers::gateway::{
    GatewayWebhook, PaymentConfirmation,
};
use hmac::{Hmac, Mac};
use http::HeaderMap;
use secrecy::ExposeSecret;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{info, warn};

pub const SIGNATURE_HEADER: &str = "x-gateway-signature";

type HmacSha256 = Hmac<Sha256>;

/// What the webhook did with a verified event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    Recorded,
    Duplicate,
    Failed,
    Ignored,
}

pub struct WebhookService;

impl WebhookService {
    pub fn sign(secret: &[u8], body: &[u8]) -> Result<String, ApiError> {
        let mut mac = HmacSha256::new_from_slice(secret)
            .map_err(|_| ApiError::Internal("Invalid webhook secret".into()))?;
        mac.update(body);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Hex HMAC-SHA256 of the raw body, compared in constant time.
    pub fn verify_signature(secret: &[u8], body: &[u8], signature: &str) -> Result<(), ApiError> {
        let supplied = hex::decode(signature.trim())
            .map_err(|_| ApiError::Webhook("Malformed signature".into()))?;

        let mut mac = HmacSha256::new_from_slice(secret)
            .map_err(|_| ApiError::Internal("Invalid webhook secret".into()))?;
        mac.update(body);
        let expected = mac.finalize().into_bytes();

        if expected.as_slice().ct_eq(supplied.as_slice()).into() {
            Ok(())
        } else {
            Err(ApiError::Webhook("Invalid signature".into()))
        }
    }

    /// Business failures are logged and acknowledged so the gateway stops
    /// redelivering; infrastructure failures surface so it retries.
    pub async fn handle_event(
        state: &AppState,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Result<WebhookOutcome, ApiError> {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Webhook("Missing signature".into()))?;

        Self::verify_signature(
            state
                .config
                .gateway_details
                .gateway_webhook_secret
                .expose_secret()
                .as_bytes(),
            body,
            signature,
        )?;

        let event: GatewayWebhook = match serde_json::from_slice(body) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Unparseable webhook payload acknowledged");
                return Ok(WebhookOutcome::Ignored);
            }
        };

        let Some(payment) = event.payload.payment.map(|p| p.entity) else {
            info!(event = %event.event, "Webhook without payment entity ignored");
            return Ok(WebhookOutcome::Ignored);
        };

        let result = match event.event.as_str() {
            "payment.captured" => {
                PaymentService::record_confirmation(state, PaymentConfirmation::from_payment(&payment))
                    .await
                    .map(|outcome| {
                        if outcome.duplicate {
                            WebhookOutcome::Duplicate
                        } else {
                            WebhookOutcome::Recorded
                        }
                    })
            }
            "payment.failed" => PaymentService::record_failure(state, &payment)
                .await
                .map(|_| WebhookOutcome::Failed),
            other => {
                info!(event = other, payment_id = %payment.id, "Webhook event ignored");
                Ok(WebhookOutcome::Ignored)
            }
        };

        match result {
            Ok(outcome) => Ok(outcome),
            Err(e) if e.status().is_server_error() => Err(e),
            Err(e) => {
                warn!(
                    event = %event.event,
                    payment_id = %payment.id,
                    error = %e,
                    "Webhook event could not be applied"
                );
                Ok(WebhookOutcome::Ignored)
            }
        }
    }
}
