use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use db::DBService;
use deployment::{Deployment, DeploymentError};
use services::services::{
    auto_post::AutoPostService,
    cache_budget::cache_budgets,
    config::Config,
    generation::{ContentGenerator, HttpContentGenerator},
    preview_store::PreviewStore,
};

const PREVIEW_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// Single-process deployment: one sqlite database, one in-memory preview
/// store, one HTTP client to the generation API.
#[derive(Clone)]
pub struct LocalDeployment {
    config: Arc<Config>,
    db: DBService,
    auto_post: AutoPostService,
}

struct CoreServices {
    config: Config,
    preview_store: PreviewStore,
    generator: Arc<dyn ContentGenerator>,
}

#[async_trait]
impl Deployment for LocalDeployment {
    async fn new() -> Result<Self, DeploymentError> {
        let core = Self::build_core_services()?;
        let db = DBService::new().await?;

        let CoreServices {
            config,
            preview_store,
            generator,
        } = core;

        Self::spawn_preview_pruner(preview_store.clone());
        let auto_post = AutoPostService::new(preview_store, generator);

        Ok(Self {
            config: Arc::new(config),
            db,
            auto_post,
        })
    }

    fn config(&self) -> &Config {
        &self.config
    }

    fn db(&self) -> &DBService {
        &self.db
    }

    fn auto_post(&self) -> &AutoPostService {
        &self.auto_post
    }
}

impl LocalDeployment {
    fn build_core_services() -> Result<CoreServices, DeploymentError> {
        let config = Config::from_env();
        let generator = Arc::new(HttpContentGenerator::new(&config.generation)?);

        Ok(CoreServices {
            config,
            preview_store: PreviewStore::new(),
            generator,
        })
    }

    fn spawn_preview_pruner(store: PreviewStore) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(PREVIEW_PRUNE_INTERVAL);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let removed = store.prune_expired();
                if removed > 0 {
                    tracing::debug!(removed, "Pruned expired draft previews");
                }
            }
        });
    }

    pub fn log_cache_budgets(&self) {
        let budgets = cache_budgets();
        tracing::info!(
            cache = "previews",
            ttl_secs = budgets.previews_ttl.as_secs(),
            current_entries = self.auto_post.store().entry_count(),
            "Cache budget"
        );
        tracing::info!(
            cache = "cache_warnings",
            sample_secs = budgets.cache_warn_sample.as_secs(),
            "Cache warning thresholds"
        );
    }
}
