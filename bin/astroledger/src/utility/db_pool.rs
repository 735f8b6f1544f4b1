use astroledger_core::app_state::DbPool;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::PgConnection;
use eyre::{eyre, Report};
use secrecy::{ExposeSecret, SecretString};
use std::env;
use std::time::Duration;
use tracing::info;

const DEFAULT_POOL_SIZE: u32 = 20;

pub fn create_db_pool() -> Result<DbPool, Report> {
    let db_url = SecretString::from(
        env::var("DATABASE_URL").map_err(|_| eyre!("DATABASE_URL must be set"))?,
    );

    let max_size = match env::var("DB_POOL_SIZE") {
        Ok(raw) => raw
            .parse::<u32>()
            .map_err(|e| eyre!("DB_POOL_SIZE must be a positive integer: {}", e))?,
        Err(_) => DEFAULT_POOL_SIZE,
    };

    let manager = ConnectionManager::<PgConnection>::new(db_url.expose_secret());

    let pool = Pool::builder()
        .max_size(max_size)
        .min_idle(Some(2))
        .connection_timeout(Duration::from_secs(8))
        .idle_timeout(Some(Duration::from_secs(300)))
        .max_lifetime(Some(Duration::from_secs(1800)))
        .test_on_check_out(true)
        .build(manager)?;

    info!(max_size, "PostgreSQL connection pool created");

    Ok(pool)
}
