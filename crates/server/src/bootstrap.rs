use std::{sync::Arc, time::Duration};

use axum::Router;
use pullbot_core::config::AppConfig;
use pullbot_discord::{
    signature::SignatureError, DispatchFeatures, Dispatcher, InteractionPipeline,
    NoopGameService, SignatureVerifier,
};
use thiserror::Error;
use tracing::info;

use crate::{health, webhook};

pub struct Application {
    pub config: AppConfig,
    pub pipeline: InteractionPipeline,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("discord.public_key rejected: {0}")]
    PublicKey(#[from] SignatureError),
}

impl Application {
    pub fn router(&self) -> Router {
        webhook::router(self.pipeline.clone())
            .merge(health::router(self.config.features.community_packs))
    }
}

/// Expects a loaded config with logging already initialized from it.
pub fn bootstrap(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    let verifier = SignatureVerifier::from_hex(&config.discord.public_key)?;
    info!(
        event_name = "system.bootstrap.verifier_loaded",
        correlation_id = "bootstrap",
        application_id = config.discord.application_id.as_deref().unwrap_or("unset"),
        "interaction verification key loaded"
    );

    let dispatcher = Dispatcher::new(
        Arc::new(NoopGameService),
        DispatchFeatures { community_packs: config.features.community_packs },
    );
    let pipeline = InteractionPipeline::new(
        verifier,
        dispatcher,
        Duration::from_millis(config.server.response_budget_ms),
    );

    Ok(Application { config, pipeline })
}
