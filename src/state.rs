use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    auth::policy::{self, AccessPolicy},
    config::AppConfig,
    store::{MemoryStore, PgStore, Store},
};

/// `DATABASE_URL` value that selects the in-process store.
pub const MEMORY_DATABASE_URL: &str = "memory://";

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<AppConfig>,
    pub policy: Arc<dyn AccessPolicy>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);
        let policy = policy::from_name(&config.access_policy)?;

        let store = if config.database_url == MEMORY_DATABASE_URL {
            warn!("using in-memory store; data is lost on exit");
            Arc::new(MemoryStore::new()) as Arc<dyn Store>
        } else {
            let pg = PgStore::connect(&config.database_url, config.max_connections).await?;
            pg.migrate().await?;
            Arc::new(pg) as Arc<dyn Store>
        };
        store.ping().await?;

        info!(policy = %config.access_policy, "application state ready");
        Ok(Self::from_parts(store, config, policy))
    }

    pub fn from_parts(
        store: Arc<dyn Store>,
        config: Arc<AppConfig>,
        policy: Arc<dyn AccessPolicy>,
    ) -> Self {
        Self {
            store,
            config,
            policy,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        use std::time::Duration;

        let config = Arc::new(AppConfig {
            database_url: MEMORY_DATABASE_URL.into(),
            max_connections: 1,
            jwt: crate::config::JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
            },
            access_policy: "role".into(),
            shutdown_timeout: Duration::from_secs(1),
            host: "127.0.0.1".into(),
            port: 0,
        });

        Self::from_parts(
            Arc::new(MemoryStore::new()),
            config,
            Arc::new(policy::RoleBasedPolicy),
        )
    }

    #[cfg(test)]
    pub fn with_policy(mut self, policy: Arc<dyn AccessPolicy>) -> Self {
        self.policy = policy;
        self
    }
}
