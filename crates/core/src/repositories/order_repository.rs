use chrono::Utc;
use diesel::prelude::*;
use astroledger_primitives::error::ApiError;
use astroledger_primitives::models::entities::enum_types::OrderPaymentStatus;
use astroledger_primitives::models::order::{NewOrder, Order};
use astroledger_primitives::schema::{orders, transactions};
use uuid::Uuid;

pub struct OrderRepository;

impl OrderRepository {
    pub fn create(conn: &mut PgConnection, new_order: NewOrder) -> Result<Order, ApiError> {
        diesel::insert_into(orders::table)
            .values(&new_order)
            .get_result::<Order>(conn)
            .map_err(ApiError::from)
    }

    pub fn find_by_id(conn: &mut PgConnection, id: Uuid) -> Result<Option<Order>, ApiError> {
        orders::table
            .find(id)
            .first::<Order>(conn)
            .optional()
            .map_err(ApiError::from)
    }

    pub fn find_by_id_for_update(conn: &mut PgConnection, id: Uuid) -> Result<Order, ApiError> {
        orders::table
            .find(id)
            .for_update()
            .first::<Order>(conn)
            .optional()?
            .ok_or_else(|| ApiError::NotFound(format!("Order {} not found", id)))
    }

    pub fn set_payment_status(
        conn: &mut PgConnection,
        id: Uuid,
        status: OrderPaymentStatus,
    ) -> Result<(), ApiError> {
        diesel::update(orders::table.find(id))
            .set((
                orders::payment_status.eq(status),
                orders::updated_at.eq(Utc::now()),
            ))
            .execute(conn)?;
        Ok(())
    }

    /// Unpaid orders that have at least one transaction.
    pub fn unpaid_with_transactions(
        conn: &mut PgConnection,
        limit: i64,
    ) -> Result<Vec<Order>, ApiError> {
        let order_ids = transactions::table
            .filter(transactions::order_id.is_not_null())
            .select(transactions::order_id.assume_not_null())
            .distinct()
            .load::<Uuid>(conn)?;

        if order_ids.is_empty() {
            return Ok(Vec::new());
        }

        orders::table
            .filter(orders::id.eq_any(order_ids))
            .filter(orders::payment_status.ne(OrderPaymentStatus::Paid))
            .order(orders::created_at.asc())
            .limit(limit)
            .load::<Order>(conn)
            .map_err(ApiError::from)
    }
}
