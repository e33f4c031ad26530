//! Infrastructure for the storefront: persistence, command dispatch, the
//! async session with its checkout delay, configuration and bootstrap.

pub mod bootstrap;
pub mod config;
pub mod dispatcher;
pub mod repository;
pub mod session;
pub mod store;

pub use bootstrap::{LocalSession, bootstrap};
pub use config::StorefrontConfig;
pub use dispatcher::{DispatchError, StorefrontDispatcher, StorefrontEnvelope};
pub use repository::CartRepository;
pub use session::StorefrontSession;
pub use store::{FileStore, InMemoryStore, KeyValueStore, StoreError};
