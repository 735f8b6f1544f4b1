use crate::models::entities::enum_types::OrderPaymentStatus;
use chrono::{DateTime, Utc};
use diesel::{Associations, Identifiable, Insertable, Queryable};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Serialize)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(belongs_to(crate::models::entities::user::User, foreign_key = customer_id))]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub total_amount: i64,
    /// Projection of the order's transactions, never written directly by callers.
    pub payment_status: OrderPaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::orders)]
pub struct NewOrder {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub total_amount: i64,
}
