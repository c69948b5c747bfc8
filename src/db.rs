use std::sync::Arc;

use sqlx::{postgres::PgPoolOptions, PgPool};
use tokio::sync::OnceCell;
use tracing::{error, info};

use crate::error::AppError;

/// Process-wide connection slot. Connecting is deferred until the first
/// query; every later caller reuses the cached pool.
#[derive(Clone)]
pub struct Db {
    url: String,
    max_connections: u32,
    pool: Arc<OnceCell<PgPool>>,
}

impl Db {
    pub fn new(url: impl Into<String>, max_connections: u32) -> Self {
        Self {
            url: url.into(),
            max_connections,
            pool: Arc::new(OnceCell::new()),
        }
    }

    /// Returns the shared pool, establishing it on first use.
    ///
    /// Concurrent first callers await the same in-flight connection attempt;
    /// only one handshake runs. A failed attempt leaves the slot empty so the
    /// next call can retry. Embedded migrations run once, right after the
    /// first successful connect.
    pub async fn pool(&self) -> Result<&PgPool, AppError> {
        self.pool
            .get_or_try_init(|| async {
                let pool = PgPoolOptions::new()
                    .max_connections(self.max_connections)
                    .connect(&self.url)
                    .await
                    .map_err(|e| {
                        error!(error = %e, "database connection failed");
                        AppError::Connection(e)
                    })?;
                sqlx::migrate!()
                    .run(&pool)
                    .await
                    .map_err(|e| {
                        error!(error = %e, "migration failed");
                        AppError::Connection(sqlx::Error::Migrate(Box::new(e)))
                    })?;
                info!("database connected");
                Ok(pool)
            })
            .await
    }
}
