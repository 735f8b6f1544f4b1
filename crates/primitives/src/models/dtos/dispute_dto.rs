use crate::models::entities::enum_types::TransactionStatus;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResolveTransactionRequest {
    /// Target terminal status.
    #[schema(example = "completed")]
    pub status: TransactionStatus,
    #[validate(length(min = 1, max = 64))]
    #[schema(example = "manual_credit")]
    pub admin_action: String,
    #[validate(length(max = 2000))]
    pub admin_notes: Option<String>,
}
