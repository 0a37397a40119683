use async_trait::async_trait;
use db::{DBService, DbErr};
use services::services::{
    auto_post::AutoPostService, config::Config, generation::GenerationError,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Wiring seam between the HTTP layer and the concrete service stack. The
/// server is generic over this trait so alternative deployments can swap the
/// storage or generation backends without touching route handlers.
#[async_trait]
pub trait Deployment: Clone + Send + Sync + 'static {
    async fn new() -> Result<Self, DeploymentError>;

    fn config(&self) -> &Config;

    fn db(&self) -> &DBService;

    fn auto_post(&self) -> &AutoPostService;
}
