//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum. El pool es el único punto de coordinación
//! entre requests; el registry de providers y las métricas son inmutables
//! tras el arranque.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::environment::EnvironmentConfig;
use crate::metrics::Metrics;
use crate::providers::ProviderRegistry;
use crate::utils::errors::AppResult;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<EnvironmentConfig>,
    pub providers: Arc<ProviderRegistry>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(pool: PgPool, config: EnvironmentConfig) -> AppResult<Self> {
        let config = Arc::new(config);
        let providers = Arc::new(ProviderRegistry::with_configured(&config, pool.clone())?);

        Ok(Self {
            pool,
            config,
            providers,
            metrics: Arc::new(Metrics::new()),
        })
    }
}
