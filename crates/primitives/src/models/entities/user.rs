use crate::models::entities::enum_types::{SessionType, UserRole};
use chrono::{DateTime, Utc};
use diesel::{Identifiable, Insertable, Queryable};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = crate::schema::users)]
pub struct User {
    pub id: Uuid,
    pub role: UserRole,
    pub wallet_balance: i64,
    pub call_rate: Option<i32>,
    pub chat_rate: Option<i32>,
    pub video_rate: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Astrologer-specific share for a session type, if one was negotiated.
    pub fn commission_rate(&self, session_type: SessionType) -> Option<i32> {
        match session_type {
            SessionType::Call => self.call_rate,
            SessionType::Chat => self.chat_rate,
            SessionType::Video => self.video_rate,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::users)]
pub struct NewUser {
    pub id: Uuid,
    pub role: UserRole,
    pub wallet_balance: i64,
    pub call_rate: Option<i32>,
    pub chat_rate: Option<i32>,
    pub video_rate: Option<i32>,
}
