//! Wiring for a local, file-backed storefront.

use anyhow::Context;

use classcart_catalog::seed_catalog;
use classcart_events::InMemoryEventBus;

use crate::config::StorefrontConfig;
use crate::dispatcher::{StorefrontDispatcher, StorefrontEnvelope};
use crate::session::StorefrontSession;
use crate::store::FileStore;

pub type LocalSession = StorefrontSession<FileStore, InMemoryEventBus<StorefrontEnvelope>>;

/// Initialize logging, open the data directory and restore the saved cart
/// against the seeded catalog.
pub fn bootstrap(config: &StorefrontConfig) -> anyhow::Result<LocalSession> {
    classcart_observability::init();

    let store = FileStore::open(&config.data_dir)
        .with_context(|| format!("failed to open data directory at {:?}", config.data_dir))?;

    let dispatcher = StorefrontDispatcher::open(seed_catalog(), store, InMemoryEventBus::new());
    tracing::info!(
        data_dir = %config.data_dir.display(),
        checkout_delay_ms = config.checkout_delay.as_millis() as u64,
        "storefront ready"
    );

    Ok(StorefrontSession::new(dispatcher, config.checkout_delay))
}
