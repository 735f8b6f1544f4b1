use crate::models::entities::enum_types::OrderPaymentStatus;
use crate::models::dtos::transaction_dto::TransactionDto;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderPaymentMethod {
    Wallet,
    Gateway,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderPaymentRequest {
    pub method: OrderPaymentMethod,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderPaymentResponse {
    pub order_id: Uuid,
    pub payment_status: OrderPaymentStatus,
    pub transaction: TransactionDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_order_id: Option<String>,
}
