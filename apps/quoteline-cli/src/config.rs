//! # CLI Configuration
//!
//! Where the pricing inputs come from before they reach the engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Command-line flags (highest priority)                              │
//! │     --margin 37 --exchange-rate 0.23 --fixed-thousand                  │
//! │                                                                         │
//! │  2. Environment Variables                                              │
//! │     QUOTELINE_MARGIN_PERCENT=37                                        │
//! │     QUOTELINE_EXCHANGE_RATE=0.23                                       │
//! │     QUOTELINE_BASE_ROUNDING=fixed-thousand                             │
//! │     QUOTELINE_DEBOUNCE_MS=500                                          │
//! │                                                                         │
//! │  3. TOML Config File                                                   │
//! │     ~/.config/quoteline/quoteline.toml (Linux)                         │
//! │     ~/Library/Application Support/com.quoteline.quoteline/ (macOS)     │
//! │                                                                         │
//! │  4. Default Values (lowest priority)                                   │
//! │     margin: NONE (must be supplied), exchange rate 0.23               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # quoteline.toml
//! [pricing]
//! margin_percent = 37
//! exchange_rate = 0.23
//! base_rounding = "smart"  # smart | fixed-thousand
//!
//! [watch]
//! debounce_ms = 500
//! poll_interval_ms = 250
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use quoteline_core::validation::{parse_margin_percent, validate_exchange_rate, validate_margin_percent};
use quoteline_core::{BaseRounding, PricingConfig};

use crate::error::{ConfigError, ConfigResult};

pub const ENV_MARGIN_PERCENT: &str = "QUOTELINE_MARGIN_PERCENT";
pub const ENV_EXCHANGE_RATE: &str = "QUOTELINE_EXCHANGE_RATE";
pub const ENV_BASE_ROUNDING: &str = "QUOTELINE_BASE_ROUNDING";
pub const ENV_DEBOUNCE_MS: &str = "QUOTELINE_DEBOUNCE_MS";

/// THB per JPY used for the display conversion when nothing else is set.
pub const DEFAULT_EXCHANGE_RATE: f64 = 0.23;

const CONFIG_FILE_NAME: &str = "quoteline.toml";

// =============================================================================
// Pricing Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingSettings {
    /// Markup over cost. Deliberately has no default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin_percent: Option<f64>,

    /// THB per JPY, display only.
    #[serde(default = "default_exchange_rate")]
    pub exchange_rate: f64,

    #[serde(default)]
    pub base_rounding: BaseRounding,
}

fn default_exchange_rate() -> f64 {
    DEFAULT_EXCHANGE_RATE
}

impl Default for PricingSettings {
    fn default() -> Self {
        PricingSettings {
            margin_percent: None,
            exchange_rate: default_exchange_rate(),
            base_rounding: BaseRounding::default(),
        }
    }
}

// =============================================================================
// Watch Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchSettings {
    /// Quiet period after the last edit before recomputing (milliseconds).
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// How often the watched file is checked for changes (milliseconds).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_poll_interval_ms() -> u64 {
    250
}

impl Default for WatchSettings {
    fn default() -> Self {
        WatchSettings {
            debounce_ms: default_debounce_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

// =============================================================================
// Command-Line Overrides
// =============================================================================

/// Values given as flags. `None` keeps whatever was loaded.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub margin_percent: Option<f64>,
    pub exchange_rate: Option<f64>,
    pub fixed_thousand: bool,
    pub debounce_ms: Option<u64>,
}

// =============================================================================
// Main Configuration
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuotelineConfig {
    #[serde(default)]
    pub pricing: PricingSettings,

    #[serde(default)]
    pub watch: WatchSettings,
}

impl QuotelineConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (quoteline.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        Self::load_with_env(config_path, |key| std::env::var(key).ok())
    }

    /// [`load`](Self::load) with an explicit environment lookup.
    pub fn load_with_env<F>(config_path: Option<PathBuf>, env: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides(env)?;
        config.validate()?;

        Ok(config)
    }

    /// Writes the configuration as TOML, creating parent directories.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<PathBuf> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ConfigError::Invalid {
                field: "config path",
                reason: "no config directory available on this system".to_string(),
            })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&path, self.to_toml()?)?;
        info!(?path, "Config saved");
        Ok(path)
    }

    pub fn to_toml(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Checks what can be checked before flags are applied.
    ///
    /// An out-of-range margin is not an error: the engine clamps it.
    pub fn validate(&self) -> ConfigResult<()> {
        validate_exchange_rate(self.pricing.exchange_rate)?;

        if let Some(margin) = self.pricing.margin_percent {
            if validate_margin_percent(margin).is_err() {
                warn!(margin, "Margin outside 0..=200 percent; it will be clamped");
            }
        }

        if self.watch.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "watch.poll_interval_ms",
                reason: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    fn apply_env_overrides<F>(&mut self, env: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = env(ENV_MARGIN_PERCENT) {
            let margin = parse_margin_percent(&raw)?;
            debug!(margin, "Overriding margin from environment");
            self.pricing.margin_percent = Some(margin);
        }

        if let Some(raw) = env(ENV_EXCHANGE_RATE) {
            let rate = raw.trim().parse::<f64>().map_err(|_| ConfigError::Invalid {
                field: "exchange rate",
                reason: format!("'{}' is not a number", raw.trim()),
            })?;
            debug!(rate, "Overriding exchange rate from environment");
            self.pricing.exchange_rate = rate;
        }

        if let Some(raw) = env(ENV_BASE_ROUNDING) {
            match raw.parse::<BaseRounding>() {
                Ok(mode) => self.pricing.base_rounding = mode,
                Err(e) => warn!(value = %raw, error = %e, "Ignoring base rounding from environment"),
            }
        }

        if let Some(raw) = env(ENV_DEBOUNCE_MS) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => self.watch.debounce_ms = ms,
                Err(_) => warn!(value = %raw, "Ignoring debounce from environment"),
            }
        }

        Ok(())
    }

    /// Applies command-line flags on top of file and environment values.
    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(margin) = overrides.margin_percent {
            self.pricing.margin_percent = Some(margin);
        }
        if let Some(rate) = overrides.exchange_rate {
            self.pricing.exchange_rate = rate;
        }
        if overrides.fixed_thousand {
            self.pricing.base_rounding = BaseRounding::FixedThousand;
        }
        if let Some(ms) = overrides.debounce_ms {
            self.watch.debounce_ms = ms;
        }
    }

    /// Builds the engine configuration. Fails when no margin was given.
    pub fn pricing_config(&self) -> ConfigResult<PricingConfig> {
        let margin = self
            .pricing
            .margin_percent
            .ok_or(ConfigError::MissingRequired {
                field: "margin percent",
                env: ENV_MARGIN_PERCENT,
                flag: "--margin",
            })?;

        let config = PricingConfig::new(margin, self.pricing.exchange_rate)?
            .with_base_rounding(self.pricing.base_rounding);
        Ok(config)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.watch.debounce_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.watch.poll_interval_ms)
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "quoteline", "quoteline")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// True when `path` (or the default path) points at an existing file.
    pub fn exists_at(path: Option<&Path>) -> bool {
        path.map(Path::to_path_buf)
            .or_else(Self::default_config_path)
            .is_some_and(|p| p.exists())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn write_config(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config =
            QuotelineConfig::load_with_env(Some(dir.path().join("nope.toml")), no_env).unwrap();

        assert_eq!(config, QuotelineConfig::default());
        assert_eq!(config.pricing.exchange_rate, DEFAULT_EXCHANGE_RATE);
        assert_eq!(config.debounce(), Duration::from_millis(500));
    }

    #[test]
    fn test_missing_margin_is_an_error() {
        let config = QuotelineConfig::default();
        assert!(matches!(
            config.pricing_config(),
            Err(ConfigError::MissingRequired { field: "margin percent", .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"
[pricing]
margin_percent = 37
exchange_rate = 0.25
base_rounding = "fixed-thousand"

[watch]
debounce_ms = 800
"#,
        );

        let config = QuotelineConfig::load_with_env(Some(path), no_env).unwrap();
        assert_eq!(config.pricing.margin_percent, Some(37.0));
        assert_eq!(config.pricing.exchange_rate, 0.25);
        assert_eq!(config.pricing.base_rounding, BaseRounding::FixedThousand);
        assert_eq!(config.watch.debounce_ms, 800);
        assert_eq!(config.watch.poll_interval_ms, 250);

        let pricing = config.pricing_config().unwrap();
        assert_eq!(pricing.margin.bps(), 3700);
        assert_eq!(pricing.base_rounding, BaseRounding::FixedThousand);
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[pricing]\nmargin_percent = 37\n");
        let env = env_from(&[
            (ENV_MARGIN_PERCENT, "30%"),
            (ENV_EXCHANGE_RATE, "0.24"),
            (ENV_BASE_ROUNDING, "thousand"),
            (ENV_DEBOUNCE_MS, "100"),
        ]);

        let config = QuotelineConfig::load_with_env(Some(path), env).unwrap();
        assert_eq!(config.pricing.margin_percent, Some(30.0));
        assert_eq!(config.pricing.exchange_rate, 0.24);
        assert_eq!(config.pricing.base_rounding, BaseRounding::FixedThousand);
        assert_eq!(config.watch.debounce_ms, 100);
    }

    #[test]
    fn test_unreadable_env_values() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");

        let env = env_from(&[(ENV_MARGIN_PERCENT, "lots")]);
        assert!(matches!(
            QuotelineConfig::load_with_env(Some(missing.clone()), env),
            Err(ConfigError::Validation(_))
        ));

        // soft settings are ignored rather than rejected
        let env = env_from(&[(ENV_BASE_ROUNDING, "banker"), (ENV_DEBOUNCE_MS, "soon")]);
        let config = QuotelineConfig::load_with_env(Some(missing), env).unwrap();
        assert_eq!(config.pricing.base_rounding, BaseRounding::Smart);
        assert_eq!(config.watch.debounce_ms, 500);
    }

    #[test]
    fn test_bad_exchange_rate_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[pricing]\nexchange_rate = 0.0\n");
        assert!(matches!(
            QuotelineConfig::load_with_env(Some(path), no_env),
            Err(ConfigError::Validation(_))
        ));

        let mut config = QuotelineConfig::default();
        config.apply_overrides(&Overrides {
            margin_percent: Some(37.0),
            exchange_rate: Some(-1.0),
            ..Overrides::default()
        });
        assert!(matches!(config.pricing_config(), Err(ConfigError::Core(_))));
    }

    #[test]
    fn test_flags_override_everything() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[pricing]\nmargin_percent = 37\n");
        let env = env_from(&[(ENV_MARGIN_PERCENT, "30")]);

        let mut config = QuotelineConfig::load_with_env(Some(path), env).unwrap();
        config.apply_overrides(&Overrides {
            margin_percent: Some(12.5),
            exchange_rate: None,
            fixed_thousand: true,
            debounce_ms: Some(50),
        });

        assert_eq!(config.pricing.margin_percent, Some(12.5));
        assert_eq!(config.pricing.exchange_rate, DEFAULT_EXCHANGE_RATE);
        assert_eq!(config.pricing.base_rounding, BaseRounding::FixedThousand);
        assert_eq!(config.debounce(), Duration::from_millis(50));
    }

    #[test]
    fn test_out_of_range_margin_is_clamped_not_rejected() {
        let mut config = QuotelineConfig::default();
        config.pricing.margin_percent = Some(370.0);
        assert!(config.validate().is_ok());
        assert_eq!(config.pricing_config().unwrap().margin.bps(), 20000);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);

        let mut config = QuotelineConfig::default();
        config.pricing.margin_percent = Some(37.0);
        config.pricing.base_rounding = BaseRounding::FixedThousand;

        let saved_to = config.save(Some(path.clone())).unwrap();
        assert_eq!(saved_to, path);
        assert!(QuotelineConfig::exists_at(Some(&path)));

        let reloaded = QuotelineConfig::load_with_env(Some(path), no_env).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_template_omits_unset_margin() {
        let toml = QuotelineConfig::default().to_toml().unwrap();
        assert!(!toml.contains("margin_percent"));
        assert!(toml.contains("base_rounding = \"smart\""));
    }
}
