use std::sync::Arc;

use crate::api::{HttpApi, MessagingApi};
use crate::app::error::Result;
use crate::archive::{DocumentRenderer, DocumentWriter, DriverSettings, ReactionAggregator};
use crate::config::Config;
use crate::store::SqliteStore;

/// Wires configuration, the messaging API and the ledger together.
pub struct AppContext {
    pub config: Config,
    pub api: Arc<dyn MessagingApi>,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let api: Arc<dyn MessagingApi> = Arc::new(HttpApi::new(&config.api)?);
        Ok(Self { config, api })
    }

    pub fn with_api(config: Config, api: Arc<dyn MessagingApi>) -> Self {
        Self { config, api }
    }

    /// Opens (and creates if needed) the ledger under the output directory.
    pub fn open_store(&self) -> Result<SqliteStore> {
        std::fs::create_dir_all(&self.config.archive.output_dir)?;
        SqliteStore::new(self.config.archive.ledger_path())
    }

    pub fn renderer(&self) -> DocumentRenderer {
        DocumentRenderer::new(self.config.render.clone())
    }

    pub fn reactions(&self) -> ReactionAggregator {
        ReactionAggregator::new(&self.config.render.custom_reaction)
    }

    pub fn writer(&self) -> DocumentWriter {
        DocumentWriter::new(
            self.config.archive.posts_path(),
            self.config.archive.write_mode,
        )
    }

    pub fn driver_settings(&self) -> DriverSettings {
        DriverSettings::from_config(&self.config.archive)
    }
}
