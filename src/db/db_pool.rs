use duckdb::Connection;
use r2d2::{ManageConnection, Pool};
use std::sync::Mutex;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::db::DbError;

pub type DbPool = Pool<DuckDBConnectionManager>;

/// Hands out connections to one shared DuckDB instance.
///
/// DuckDB allows a single database instance per file in a process, so the
/// file is opened once and every pooled connection is a clone of it.
pub struct DuckDBConnectionManager {
    database: Mutex<Connection>,
}

impl DuckDBConnectionManager {
    pub fn new(connection_string: &str) -> Result<Self, duckdb::Error> {
        let database = if connection_string == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(connection_string)?
        };

        Ok(Self {
            database: Mutex::new(database),
        })
    }
}

impl ManageConnection for DuckDBConnectionManager {
    type Connection = Connection;
    type Error = duckdb::Error;

    fn connect(&self) -> Result<Self::Connection, Self::Error> {
        let database = self.database.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        database.try_clone()
    }

    fn is_valid(&self, conn: &mut Self::Connection) -> Result<(), Self::Error> {
        conn.execute("SELECT 1", [])?;
        Ok(())
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

pub fn build_pool(config: &DatabaseConfig) -> Result<DbPool, DbError> {
    info!(
        "Opening DuckDB database '{}' with pool size {}",
        config.connection_string, config.pool_size
    );
    let manager = DuckDBConnectionManager::new(&config.connection_string)?;
    let pool = Pool::builder()
        .max_size(config.pool_size.max(1) as u32)
        .build(manager)?;
    Ok(pool)
}

/// Runs blocking DuckDB work on the blocking thread pool with a pooled connection.
pub async fn with_connection<T, F>(pool: &DbPool, f: F) -> Result<T, DbError>
where
    F: FnOnce(&mut Connection) -> Result<T, DbError> + Send + 'static,
    T: Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = pool.get()?;
        f(&mut conn)
    })
    .await?
}

#[cfg(test)]
pub(crate) fn memory_pool() -> DbPool {
    build_pool(&DatabaseConfig {
        connection_string: ":memory:".to_string(),
        pool_size: 2,
    })
    .unwrap()
}
