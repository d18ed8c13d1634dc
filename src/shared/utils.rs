use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::PgConnection;
use std::time::Duration;

use crate::shared::error::StoreError;

pub type DbPool = Pool<ConnectionManager<PgConnection>>;
pub type DbConn = PooledConnection<ConnectionManager<PgConnection>>;

/// Build a connection pool for one shard database.
pub fn build_pool(database_url: &str) -> Result<DbPool, StoreError> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);

    Pool::builder()
        .max_size(5)
        .min_idle(Some(0))
        .connection_timeout(Duration::from_secs(5))
        .idle_timeout(Some(Duration::from_secs(300)))
        .max_lifetime(Some(Duration::from_secs(1800)))
        .build(manager)
        .map_err(|e| StoreError::Pool(format!("Failed to create shard pool: {e}")))
}

pub fn get_conn(pool: &DbPool) -> Result<DbConn, StoreError> {
    pool.get().map_err(|e| StoreError::Pool(e.to_string()))
}
