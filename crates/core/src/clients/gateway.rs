use astroledger_primitives::error::{ApiError, GatewayError};
use astroledger_primitives::models::app_state::gateway_details::GatewayInfo;
use astroledger_primitives::models::dtos::providers::gateway::{
    GatewayOrder, GatewayOrderRequest, GatewayPayment, GatewayPaymentList,
};
use reqwest::{Client, Response, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::warn;

const PAGE_SIZE: usize = 100;
const MAX_PAGES: usize = 10;

/// REST client for the card/UPI payment gateway.
#[derive(Clone)]
pub struct GatewayClient {
    http: Client,
    base_url: Url,
    key_id: String,
    key_secret: SecretString,
    timeout: Duration,
}

impl GatewayClient {
    pub fn new(http: Client, config: &GatewayInfo) -> Result<Self, ApiError> {
        let base_url = Url::parse(&config.gateway_api_url)
            .map_err(|_| ApiError::Internal("Invalid gateway base URL".into()))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::Internal("Gateway base URL cannot carry a path".into()));
        }

        Ok(Self {
            http,
            base_url,
            key_id: config.gateway_key_id.clone(),
            key_secret: config.gateway_key_secret.clone(),
            timeout: Duration::from_secs(config.gateway_timeout_secs),
        })
    }

    pub async fn create_order(
        &self,
        request: &GatewayOrderRequest,
    ) -> Result<GatewayOrder, GatewayError> {
        let resp = self
            .http
            .post(self.endpoint(&["v1", "orders"]))
            .basic_auth(&self.key_id, Some(self.key_secret.expose_secret()))
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        Self::read::<GatewayOrder>(resp, "create_order")
            .await?
            .ok_or_else(|| GatewayError::Rejected("order endpoint returned 404".into()))
    }

    /// `None` when the gateway has no payment with this id.
    pub async fn fetch_payment(
        &self,
        payment_id: &str,
    ) -> Result<Option<GatewayPayment>, GatewayError> {
        let payment_id = Self::path_id(payment_id)?;
        let resp = self.get(self.endpoint(&["v1", "payments", payment_id])).await?;

        Self::read(resp, "fetch_payment").await
    }

    pub async fn fetch_order_payments(
        &self,
        gateway_order_id: &str,
    ) -> Result<Vec<GatewayPayment>, GatewayError> {
        let gateway_order_id = Self::path_id(gateway_order_id)?;
        let resp = self
            .get(self.endpoint(&["v1", "orders", gateway_order_id, "payments"]))
            .await?;

        Ok(Self::read::<GatewayPaymentList>(resp, "fetch_order_payments")
            .await?
            .map(|list| list.items)
            .unwrap_or_default())
    }

    /// Payments created between two unix timestamps, following pagination.
    pub async fn list_payments(
        &self,
        from: i64,
        to: i64,
    ) -> Result<Vec<GatewayPayment>, GatewayError> {
        let mut payments = Vec::new();

        for page in 0..MAX_PAGES {
            let mut url = self.endpoint(&["v1", "payments"]);
            url.query_pairs_mut()
                .append_pair("from", &from.to_string())
                .append_pair("to", &to.to_string())
                .append_pair("count", &PAGE_SIZE.to_string())
                .append_pair("skip", &(page * PAGE_SIZE).to_string());

            let resp = self.get(url).await?;
            let items = Self::read::<GatewayPaymentList>(resp, "list_payments")
                .await?
                .map(|list| list.items)
                .unwrap_or_default();

            let last_page = items.len() < PAGE_SIZE;
            payments.extend(items);
            if last_page {
                break;
            }
        }

        Ok(payments)
    }

    async fn get(&self, url: Url) -> Result<Response, GatewayError> {
        self.http
            .get(url)
            .basic_auth(&self.key_id, Some(self.key_secret.expose_secret()))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(e.to_string()))
    }

    async fn read<T: DeserializeOwned>(
        resp: Response,
        operation: &str,
    ) -> Result<Option<T>, GatewayError> {
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            warn!(operation, http_status = status.as_u16(), "Gateway unavailable");
            return Err(GatewayError::Unavailable(format!(
                "{} returned {}",
                operation, status
            )));
        }

        if !status.is_success() {
            warn!(
                operation,
                http_status = status.as_u16(),
                response = %body.chars().take(200).collect::<String>(),
                "Gateway rejected request"
            );
            return Err(GatewayError::Rejected(format!(
                "{} returned {}",
                operation, status
            )));
        }

        serde_json::from_str(&body).map(Some).map_err(|e| {
            tracing::error!(
                operation,
                error = %e,
                response = %body.chars().take(200).collect::<String>(),
                "Invalid JSON from gateway"
            );
            GatewayError::InvalidResponse(e.to_string())
        })
    }

    /// Appends percent-encoded segments to the base URL, keeping its path prefix.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Ids that would vanish from a path are refused before any request.
    fn path_id(id: &str) -> Result<&str, GatewayError> {
        match id.trim() {
            "" | "." | ".." => Err(GatewayError::Rejected(format!("invalid gateway id {:?}", id))),
            _ => Ok(id),
        }
    }
}
