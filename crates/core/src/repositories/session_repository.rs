use diesel::prelude::*;
use astroledger_primitives::error::ApiError;
use astroledger_primitives::models::session::{NewSession, Session};
use astroledger_primitives::schema::sessions;
use uuid::Uuid;

pub struct SessionRepository;

impl SessionRepository {
    pub fn create(conn: &mut PgConnection, new_session: NewSession) -> Result<Session, ApiError> {
        diesel::insert_into(sessions::table)
            .values(&new_session)
            .get_result::<Session>(conn)
            .map_err(ApiError::from)
    }

    /// Serializes concurrent settlements of the same session.
    pub fn find_by_id_for_update(conn: &mut PgConnection, id: Uuid) -> Result<Session, ApiError> {
        sessions::table
            .find(id)
            .for_update()
            .first::<Session>(conn)
            .optional()?
            .ok_or_else(|| ApiError::NotFound(format!("Session {} not found", id)))
    }
}
