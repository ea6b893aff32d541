use anyhow::Context;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("remote store project id must be provided via FIREBASE_PROJECT_ID")]
    MissingProjectId,

    #[error("initial capital must be positive, got {0}")]
    NonPositiveCapital(Decimal),

    #[error("max position size must be within (0, 1], got {0}")]
    PositionSizeOutOfRange(Decimal),

    #[error("failed to load configuration file: {0}")]
    Load(#[from] anyhow::Error),
}

/// Connection settings for a cryptocurrency exchange.
///
/// Credentials left empty at construction are resolved from the
/// environment using the upper-cased exchange name as prefix, e.g.
/// `BINANCE_API_KEY` / `BINANCE_API_SECRET`. Still-empty credentials are
/// not an error here; whatever consumes them decides when to fail.
#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    pub name: String,
    pub api_key: String,
    pub api_secret: String,
    pub testnet: bool,
    /// Requests per minute.
    pub rate_limit: u32,
    pub timeout_ms: u64,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            name: "binance".to_string(),
            api_key: String::new(),
            api_secret: String::new(),
            testnet: true,
            rate_limit: 1200,
            timeout_ms: 30_000,
        }
    }
}

impl ExchangeConfig {
    pub fn new(name: impl Into<String>) -> Self {
        let mut config = Self {
            name: name.into(),
            ..Self::default()
        };
        config.resolve_credentials();
        config
    }

    pub fn with_credentials(
        name: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        let mut config = Self {
            name: name.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            ..Self::default()
        };
        config.resolve_credentials();
        config
    }

    fn resolve_credentials(&mut self) {
        let prefix = self.name.to_uppercase();
        if self.api_key.is_empty() {
            self.api_key = env_or_empty(&format!("{prefix}_API_KEY"));
        }
        if self.api_secret.is_empty() {
            self.api_secret = env_or_empty(&format!("{prefix}_API_SECRET"));
        }
    }
}

/// Connection settings for the remote configuration store.
///
/// Every field falls back to its environment variable when not given
/// explicitly. A missing project id is the only hard failure; a missing
/// credentials file merely downgrades the process to local-only mode.
#[derive(Debug, Clone)]
pub struct RemoteStoreConfig {
    pub project_id: String,
    pub credentials_path: String,
    pub database_url: String,
}

impl RemoteStoreConfig {
    pub fn new(
        project_id: impl Into<String>,
        credentials_path: impl Into<String>,
        database_url: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let mut project_id = project_id.into();
        let mut credentials_path = credentials_path.into();
        let mut database_url = database_url.into();

        if project_id.is_empty() {
            project_id = env_or_empty("FIREBASE_PROJECT_ID");
        }
        if credentials_path.is_empty() {
            credentials_path = env_or_empty("GOOGLE_APPLICATION_CREDENTIALS");
        }
        if database_url.is_empty() {
            database_url = env_or_empty("FIREBASE_DATABASE_URL");
        }

        if project_id.is_empty() {
            return Err(ConfigError::MissingProjectId);
        }

        let config = Self {
            project_id,
            credentials_path,
            database_url,
        };

        if !config.credentials_available() {
            warn!("Remote store credentials not found. Running in local-only mode.");
        }

        Ok(config)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new("", "", "")
    }

    /// Whether a usable credentials file is configured.
    pub fn credentials_available(&self) -> bool {
        !self.credentials_path.is_empty() && Path::new(&self.credentials_path).exists()
    }
}

/// Core trading engine parameters.
///
/// Values are trusted only after an explicit `validate()`; construction
/// and file loading never range-check.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingConfig {
    pub initial_capital: Decimal,
    /// Fraction of capital allowed per trade.
    pub max_position_size: Decimal,
    /// Daily loss limit as a fraction of capital.
    pub max_daily_loss: Decimal,
    pub symbols: Vec<String>,
    pub timeframe: String,
    pub backtest_days: u32,
    pub live_trading: bool,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            initial_capital: dec!(10000.0),
            max_position_size: dec!(0.1),
            max_daily_loss: dec!(0.02),
            symbols: vec!["BTC/USDT".to_string(), "ETH/USDT".to_string()],
            timeframe: "1h".to_string(),
            backtest_days: 30,
            live_trading: false,
        }
    }
}

impl TradingConfig {
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .build()
            .context("Failed to build configuration")?;

        let config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_capital <= Decimal::ZERO {
            return Err(ConfigError::NonPositiveCapital(self.initial_capital));
        }
        if self.max_position_size <= Decimal::ZERO || self.max_position_size > Decimal::ONE {
            return Err(ConfigError::PositionSizeOutOfRange(self.max_position_size));
        }
        Ok(())
    }
}

fn env_or_empty(var: &str) -> String {
    std::env::var(var).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Tests that touch shared FIREBASE_* variables must not interleave.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_exchange_credentials_from_env() {
        std::env::set_var("KRAKENTEST_API_KEY", "key-from-env");
        std::env::set_var("KRAKENTEST_API_SECRET", "secret-from-env");

        let config = ExchangeConfig::new("krakentest");
        assert_eq!(config.api_key, "key-from-env");
        assert_eq!(config.api_secret, "secret-from-env");
    }

    #[test]
    fn test_exchange_explicit_credentials_win() {
        std::env::set_var("BYBITTEST_API_KEY", "env-key");

        let config =
            ExchangeConfig::with_credentials("bybittest", "explicit-key", "explicit-secret");
        assert_eq!(config.api_key, "explicit-key");
        assert_eq!(config.api_secret, "explicit-secret");
    }

    #[test]
    fn test_exchange_credentials_stay_blank_without_env() {
        let config = ExchangeConfig::new("nosuchexchange");
        assert!(config.api_key.is_empty());
        assert!(config.api_secret.is_empty());
        assert!(config.testnet);
        assert_eq!(config.rate_limit, 1200);
        assert_eq!(config.timeout_ms, 30_000);
    }

    #[test]
    fn test_remote_store_missing_project_id() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::remove_var("FIREBASE_PROJECT_ID");

        let result = RemoteStoreConfig::new("", "", "");
        assert!(matches!(result, Err(ConfigError::MissingProjectId)));
    }

    #[test]
    fn test_remote_store_project_id_from_env() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("FIREBASE_PROJECT_ID", "env-project");

        let config = RemoteStoreConfig::new("", "", "").unwrap();
        assert_eq!(config.project_id, "env-project");

        std::env::remove_var("FIREBASE_PROJECT_ID");
    }

    #[test]
    fn test_remote_store_missing_credentials_file_is_not_fatal() {
        let config =
            RemoteStoreConfig::new("my-project", "/nonexistent/service-account.json", "").unwrap();
        assert_eq!(config.project_id, "my-project");
        assert!(!config.credentials_available());
    }

    #[test]
    fn test_trading_defaults_validate() {
        let config = TradingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.symbols, vec!["BTC/USDT", "ETH/USDT"]);
        assert_eq!(config.timeframe, "1h");
        assert_eq!(config.backtest_days, 30);
        assert!(!config.live_trading);
    }

    #[test]
    fn test_trading_zero_capital_rejected() {
        let config = TradingConfig {
            initial_capital: Decimal::ZERO,
            ..TradingConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositiveCapital(_))
        ));
    }

    #[test]
    fn test_trading_oversized_position_rejected() {
        let config = TradingConfig {
            max_position_size: dec!(1.5),
            ..TradingConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::PositionSizeOutOfRange(_))
        ));
    }

    #[test]
    fn test_trading_full_position_allowed() {
        let config = TradingConfig {
            max_position_size: Decimal::ONE,
            ..TradingConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_trading_load_from_partial_file() {
        let path = std::env::temp_dir().join("configsync_partial_trading.toml");
        std::fs::write(&path, "initial_capital = 2500.0\ntimeframe = \"15m\"\n").unwrap();

        let config = TradingConfig::load_from_path(&path).unwrap();
        assert_eq!(config.initial_capital, dec!(2500.0));
        assert_eq!(config.timeframe, "15m");
        // Untouched fields keep their defaults
        assert_eq!(config.max_position_size, dec!(0.1));
        assert_eq!(config.symbols, vec!["BTC/USDT", "ETH/USDT"]);

        std::fs::remove_file(&path).ok();
    }
}
