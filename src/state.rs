use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::config::AppConfig;
use crate::metrics::Metrics;
use crate::notify::{Notifier, SnsNotifier};
use crate::storage::{Storage, StorageClient};
use crate::users::{PgUserStore, UserStore};

/// Handles built once at start-up and shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub storage: Arc<dyn StorageClient>,
    pub notifier: Arc<dyn Notifier>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
            tracing::warn!(error = %e, "migration failed; continuing");
        }

        let storage = Arc::new(Storage::new(&config.s3).await?) as Arc<dyn StorageClient>;
        let notifier = Arc::new(SnsNotifier::new(&config.region).await) as Arc<dyn Notifier>;
        let users = Arc::new(PgUserStore::new(db)) as Arc<dyn UserStore>;
        let metrics = Arc::new(Metrics::udp(&config.metrics)?);

        Ok(Self {
            config,
            users,
            storage,
            notifier,
            metrics,
        })
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        storage: Arc<dyn StorageClient>,
        notifier: Arc<dyn Notifier>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            config,
            users,
            storage,
            notifier,
            metrics,
        }
    }
}
