use crate::models::entities::enum_types::TransactionPurpose;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

pub const NOTE_USER_ID: &str = "user_id";
pub const NOTE_PURPOSE: &str = "purpose";
pub const NOTE_ORDER_ID: &str = "order_id";
pub const NOTE_RECEIPT: &str = "receipt";

#[derive(Debug, Serialize)]
pub struct GatewayOrderRequest {
    pub amount: i64,
    pub currency: String,
    /// Our `reference_id`, echoed back on every payment of the order.
    pub receipt: String,
    pub notes: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub receipt: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum GatewayPaymentStatus {
    Created,
    Authorized,
    Captured,
    Refunded,
    Failed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct GatewayPayment {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: GatewayPaymentStatus,
    pub order_id: Option<String>,
    pub method: Option<String>,
    /// Free-form key/value notes; the gateway sends `[]` when empty.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub notes: Value,
    pub error_description: Option<String>,
    /// Unix seconds.
    pub created_at: i64,
}

impl GatewayPayment {
    pub fn note(&self, key: &str) -> Option<&str> {
        self.notes.get(key).and_then(Value::as_str)
    }

    pub fn noted_user(&self) -> Option<Uuid> {
        self.note(NOTE_USER_ID).and_then(|v| Uuid::parse_str(v).ok())
    }

    pub fn noted_purpose(&self) -> Option<TransactionPurpose> {
        self.note(NOTE_PURPOSE).and_then(|v| v.parse().ok())
    }

    pub fn is_captured(&self) -> bool {
        self.status == GatewayPaymentStatus::Captured
    }

    pub fn is_failed(&self) -> bool {
        self.status == GatewayPaymentStatus::Failed
    }
}

#[derive(Debug, Deserialize)]
pub struct GatewayPaymentList {
    #[serde(default)]
    pub items: Vec<GatewayPayment>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GatewayWebhook {
    #[schema(example = "payment.captured")]
    pub event: String,
    pub payload: GatewayWebhookPayload,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GatewayWebhookPayload {
    pub payment: Option<GatewayPaymentWrapper>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GatewayPaymentWrapper {
    pub entity: GatewayPayment,
}

/// A captured gateway payment, normalized for the idempotency guard.
#[derive(Debug, Clone)]
pub struct PaymentConfirmation {
    pub payment_id: String,
    pub gateway_order_id: Option<String>,
    pub amount: i64,
    pub method: Option<String>,
    /// User named in the payment notes.
    pub user_id: Option<Uuid>,
    /// Set when the caller is known: the bound transaction must be theirs.
    pub expected_owner: Option<Uuid>,
    pub purpose: Option<TransactionPurpose>,
    pub order_id: Option<Uuid>,
    /// `reference_id` of the pending transaction this payment pays for.
    pub receipt: Option<String>,
}

impl PaymentConfirmation {
    pub fn from_payment(payment: &GatewayPayment) -> Self {
        Self {
            payment_id: payment.id.clone(),
            gateway_order_id: payment.order_id.clone(),
            amount: payment.amount,
            method: payment.method.clone(),
            user_id: payment.noted_user(),
            expected_owner: None,
            purpose: payment.noted_purpose(),
            order_id: payment
                .note(NOTE_ORDER_ID)
                .and_then(|v| Uuid::parse_str(v).ok()),
            receipt: payment.note(NOTE_RECEIPT).map(str::to_string),
        }
    }
}
