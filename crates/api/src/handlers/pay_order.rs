use astroledger_core::services::payment_service::PaymentService;
use astroledger_core::{AppState, Claims};
use astroledger_primitives::error::{ApiError, ApiErrorResponse};
use astroledger_primitives::models::dtos::order_dto::{OrderPaymentRequest, OrderPaymentResponse};
use axum::extract::{Extension, Json, Path, State};
use std::sync::Arc;
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/api/orders/{order_id}/pay",
    params(("order_id" = Uuid, Path, description = "Order to pay for")),
    request_body = OrderPaymentRequest,
    responses(
        (status = 200, body = OrderPaymentResponse),
        (status = 403, description = "Order belongs to another customer", body = ApiErrorResponse),
        (status = 404, body = ApiErrorResponse),
        (status = 409, description = "Order already paid", body = ApiErrorResponse),
        (status = 422, description = "Insufficient wallet balance", body = ApiErrorResponse),
        (status = 503, description = "Gateway unavailable", body = ApiErrorResponse)
    ),
    security(("bearerAuth" = [])),
    tag = "Orders"
)]
pub async fn pay_order(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<OrderPaymentRequest>,
) -> Result<Json<OrderPaymentResponse>, ApiError> {
    let user_id = claims.user_id()?;
    Ok(Json(
        PaymentService::pay_order(&state, user_id, order_id, req).await?,
    ))
}
