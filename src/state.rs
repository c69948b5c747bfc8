use std::sync::Arc;

use time::OffsetDateTime;

use crate::config::AppConfig;
use crate::db::Db;

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub config: Arc<AppConfig>,
    pub started_at: OffsetDateTime,
}

impl AppState {
    /// Builds the shared state. The database is not contacted here; the
    /// connection slot fills lazily on the first query.
    pub fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let db = Db::new(&config.database_url, config.max_connections);
        Ok(Self {
            db,
            config,
            started_at: OffsetDateTime::now_utc(),
        })
    }
}
