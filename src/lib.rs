pub mod config;
pub mod manager;
pub mod store;

pub use config::{ConfigError, ExchangeConfig, RemoteStoreConfig, TradingConfig};
pub use manager::ConfigManager;
pub use store::{FirestoreClient, MemoryStore, RemoteStore, StoreError};
