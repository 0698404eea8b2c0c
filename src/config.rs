//! Runtime configuration, read from TOML with environment overrides
use super::error::ConfigError;
use super::money::{Currency, FractionDigits};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub display: DisplayConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    #[serde(with = "currency_code")]
    pub currency: Currency,
    #[serde(with = "fraction_digits")]
    pub listing_fraction_digits: FractionDigits,
    #[serde(with = "fraction_digits")]
    pub negotiation_fraction_digits: FractionDigits,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            currency: Currency::PHP,
            listing_fraction_digits: FractionDigits::Zero,
            negotiation_fraction_digits: FractionDigits::Two,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("deals.db"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Read `path` if it exists (defaults otherwise), then apply env overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(raw) = std::env::var("DEALS_DB_PATH") {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                self.storage.path = PathBuf::from(trimmed);
            }
        }

        if let Ok(raw) = std::env::var("DEALS_CURRENCY") {
            match raw.parse::<Currency>() {
                Ok(currency) => self.display.currency = currency,
                Err(err) => tracing::warn!("invalid DEALS_CURRENCY, ignoring: {err}"),
            }
        }

        if let Ok(raw) = std::env::var("DEALS_LOG_FILTER") {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                self.logging.filter = trimmed.to_string();
            }
        }
    }
}

mod currency_code {
    use crate::money::Currency;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(value: &Currency, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(value.code())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Currency, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(D::Error::custom)
    }
}

mod fraction_digits {
    use crate::money::FractionDigits;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(value: &FractionDigits, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<FractionDigits, D::Error> {
        let raw = u8::deserialize(d)?;
        FractionDigits::try_from(raw).map_err(D::Error::custom)
    }
}
