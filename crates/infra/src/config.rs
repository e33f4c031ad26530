//! Runtime configuration from the environment.

use std::path::PathBuf;
use std::time::Duration;

pub const DATA_DIR_VAR: &str = "CLASSCART_DATA_DIR";
pub const CHECKOUT_DELAY_VAR: &str = "CLASSCART_CHECKOUT_DELAY_MS";

pub const DEFAULT_CHECKOUT_DELAY: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorefrontConfig {
    /// Directory the file store writes `<key>.json` files into.
    pub data_dir: PathBuf,
    /// Simulated payment round-trip between starting and completing checkout.
    pub checkout_delay: Duration,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            checkout_delay: DEFAULT_CHECKOUT_DELAY,
        }
    }
}

impl StorefrontConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Unset or unparsable values
    /// fall back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let data_dir = lookup(DATA_DIR_VAR)
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                let dir = default_data_dir();
                tracing::debug!(dir = %dir.display(), "{DATA_DIR_VAR} not set; using default");
                dir
            });

        let checkout_delay = match lookup(CHECKOUT_DELAY_VAR) {
            None => DEFAULT_CHECKOUT_DELAY,
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .unwrap_or_else(|_| {
                    tracing::warn!(value = %raw, "{CHECKOUT_DELAY_VAR} is not a whole number of milliseconds; using default");
                    DEFAULT_CHECKOUT_DELAY
                }),
        };

        Self {
            data_dir,
            checkout_delay,
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("classcart")
}
