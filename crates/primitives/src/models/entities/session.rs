use crate::models::entities::enum_types::{SessionStatus, SessionType};
use chrono::{DateTime, Utc};
use diesel::{Identifiable, Insertable, Queryable};
use serde::Serialize;
use uuid::Uuid;

// Owned by the session subsystem; the ledger only reads it.
#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = crate::schema::sessions)]
pub struct Session {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub astrologer_id: Uuid,
    pub session_type: SessionType,
    pub total_amount: i64,
    pub status: SessionStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::sessions)]
pub struct NewSession {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub astrologer_id: Uuid,
    pub session_type: SessionType,
    pub total_amount: i64,
    pub status: SessionStatus,
    pub completed_at: Option<DateTime<Utc>>,
}
