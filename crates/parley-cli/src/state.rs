//! Application state wiring the store to its infrastructure.
//!
//! AppState pins the conversation store to the concrete infra pieces: the
//! SQLite key-value store for persistence and the Gemini client for
//! generation.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use parley_core::chat::{ConversationStore, StoreConfig};
use parley_core::generation::BoxGenerationClient;
use parley_infra::config::{load_config, resolve_api_key};
use parley_infra::filesystem::{ensure_data_dir, resolve_data_dir};
use parley_infra::gemini::GeminiClient;
use parley_infra::sqlite::kv::SqliteKvStore;
use parley_infra::sqlite::pool::{DatabasePool, database_path};
use parley_types::config::ParleyConfig;

/// Shared application state used by every command.
#[derive(Clone)]
pub struct AppState {
    pub store: ConversationStore,
    pub config: ParleyConfig,
    pub data_dir: PathBuf,
    /// Whether a Gemini API key was found in the environment.
    pub api_key_configured: bool,
}

impl AppState {
    /// Initialize the application state: data dir, config, DB, client, store.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        ensure_data_dir(&data_dir)
            .await
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let config = load_config(&data_dir).await;

        let db_path = database_path(&data_dir);
        let db_pool = DatabasePool::open(&db_path)
            .await
            .with_context(|| format!("failed to open database at {}", db_path.display()))?;
        let kv = Arc::new(SqliteKvStore::new(db_pool));

        let gemini = GeminiClient::new(resolve_api_key(), &config.models);
        let api_key_configured = gemini.is_configured();
        let client = Arc::new(BoxGenerationClient::new(gemini));

        let store = ConversationStore::open(kv, client, StoreConfig::from(&config)).await;
        tracing::info!(data_dir = %data_dir.display(), "application state ready");

        Ok(Self {
            store,
            config,
            data_dir,
            api_key_configured,
        })
    }

    /// Settle background work and flush the final snapshot.
    pub async fn shutdown(&self) {
        self.store.shutdown().await;
    }
}
