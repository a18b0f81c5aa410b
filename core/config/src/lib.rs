//! User configuration for AxiomPass.
//!
//! The configuration holds the defaults the command line falls back to: KDF
//! cost parameters, the password length and the default account. It also
//! keeps usage statistics updated after each generation. It never holds
//! secrets. Values read from disk are normalized so the engine always
//! receives non-zero parameters; the engine itself never substitutes defaults.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use axiompass_common::{Error, OutputLength, Result, MAX_OUTPUT_LENGTH, MIN_OUTPUT_LENGTH};
use axiompass_crypto::KdfParams;

/// Directory name under the platform configuration directory.
pub const CONFIG_DIRNAME: &str = "axiompass";

/// Configuration file name.
pub const CONFIG_FILENAME: &str = "config.json";

/// Current configuration format version.
pub const CONFIG_VERSION: &str = "1.0";

/// Password length used when none is configured.
pub const DEFAULT_LENGTH: usize = 16;

/// Keys accepted by [`AppConfig::set`].
pub const SETTABLE_KEYS: &[&str] = &[
    "time_cost",
    "memory_cost_kib",
    "parallelism",
    "key_length",
    "default_length",
    "default_account",
];

/// Usage counters, updated after every successful generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageStats {
    /// Number of passwords generated.
    pub passwords_generated: u64,
    /// Time of the first generation.
    pub first_used: Option<DateTime<Utc>>,
    /// Time of the most recent generation.
    pub last_used: Option<DateTime<Utc>>,
    /// Sum of all generation times in milliseconds.
    pub total_generation_ms: u64,
}

impl UsageStats {
    /// Count one generation that took `elapsed_ms` and finished at `at`.
    pub fn record(&mut self, elapsed_ms: u64, at: DateTime<Utc>) {
        self.passwords_generated = self.passwords_generated.saturating_add(1);
        self.total_generation_ms = self.total_generation_ms.saturating_add(elapsed_ms);
        if self.first_used.is_none() {
            self.first_used = Some(at);
        }
        self.last_used = Some(at);
    }

    /// Mean generation time, if anything was generated.
    pub fn average_generation_ms(&self) -> Option<f64> {
        if self.passwords_generated == 0 {
            return None;
        }
        Some(self.total_generation_ms as f64 / self.passwords_generated as f64)
    }

    /// Calendar span of use in days, counting the first day as one.
    pub fn active_days(&self) -> Option<i64> {
        match (self.first_used, self.last_used) {
            (Some(first), Some(last)) => Some((last - first).num_days().max(0) + 1),
            _ => None,
        }
    }

    /// Passwords generated per active day.
    pub fn average_per_day(&self) -> Option<f64> {
        self.active_days()
            .map(|days| self.passwords_generated as f64 / days as f64)
    }
}

/// Persistent user settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Argon2id cost parameters.
    pub kdf: KdfParams,
    /// Password length when `--length` is not given.
    pub default_length: usize,
    /// Account identifier when `--account` is not given.
    pub default_account: String,
    /// Format version of the file.
    pub config_version: String,
    /// Usage statistics.
    pub stats: UsageStats,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            kdf: KdfParams::standard(),
            default_length: DEFAULT_LENGTH,
            default_account: String::new(),
            config_version: CONFIG_VERSION.to_string(),
            stats: UsageStats::default(),
        }
    }
}

/// Location of the configuration file for the current user.
///
/// # Errors
/// - `Error::NotFound` if the platform has no configuration directory
pub fn config_path() -> Result<PathBuf> {
    let base = dirs::config_dir()
        .ok_or_else(|| Error::NotFound("user configuration directory".to_string()))?;
    Ok(base.join(CONFIG_DIRNAME).join(CONFIG_FILENAME))
}

impl AppConfig {
    /// Load the configuration from the default location.
    ///
    /// Falls back to defaults when there is no configuration directory or no
    /// file yet.
    pub fn load() -> Result<Self> {
        match config_path() {
            Ok(path) => Self::load_from(&path),
            Err(e) => {
                warn!("Using default configuration: {}", e);
                Ok(Self::default())
            }
        }
    }

    /// Load the configuration from `path`.
    ///
    /// # Postconditions
    /// - A missing file yields the defaults
    /// - Loaded values are normalized
    ///
    /// # Errors
    /// - `Error::Io` if the file exists but cannot be read
    /// - `Error::Serialization` if the file is not valid configuration JSON
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No configuration at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let json = fs::read_to_string(path)?;
        let mut config = Self::from_json(&json)?;
        config.normalize();
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save the configuration to the default location.
    pub fn save(&self) -> Result<PathBuf> {
        let path = config_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save the configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json()?)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Write the configuration to an arbitrary file.
    pub fn export(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        info!("Configuration exported to {}", path.display());
        Ok(())
    }

    /// Read a configuration previously written by [`AppConfig::export`].
    ///
    /// Unlike [`AppConfig::load_from`], a missing file is an error.
    pub fn import(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let mut config = Self::from_json(&json)?;
        config.normalize();
        info!("Configuration imported from {}", path.display());
        Ok(config)
    }

    /// Replace out-of-range values with usable ones.
    ///
    /// Zero KDF parameters take the standard values, a length below the
    /// minimum resets to the default and a length above the maximum is
    /// clamped. Returns the names of the fields that changed.
    pub fn normalize(&mut self) -> Vec<&'static str> {
        let standard = KdfParams::standard();
        let mut changed = Vec::new();

        if self.kdf.time_cost == 0 {
            self.kdf.time_cost = standard.time_cost;
            changed.push("time_cost");
        }
        if self.kdf.memory_cost_kib == 0 {
            self.kdf.memory_cost_kib = standard.memory_cost_kib;
            changed.push("memory_cost_kib");
        }
        if self.kdf.parallelism == 0 {
            self.kdf.parallelism = standard.parallelism;
            changed.push("parallelism");
        }
        if self.kdf.key_length == 0 {
            self.kdf.key_length = standard.key_length;
            changed.push("key_length");
        }
        if self.default_length < MIN_OUTPUT_LENGTH {
            self.default_length = DEFAULT_LENGTH;
            changed.push("default_length");
        } else if self.default_length > MAX_OUTPUT_LENGTH {
            self.default_length = MAX_OUTPUT_LENGTH;
            changed.push("default_length");
        }
        if self.config_version.is_empty() {
            self.config_version = CONFIG_VERSION.to_string();
            changed.push("config_version");
        }

        for field in &changed {
            warn!("Configuration value '{}' was out of range and has been reset", field);
        }
        changed
    }

    /// Update a single setting from its textual form.
    ///
    /// # Errors
    /// - `Error::InvalidInput` for unknown keys, unparsable numbers, a length
    ///   outside the supported range or an empty account
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "time_cost" => self.kdf.time_cost = parse_nonzero(key, value)?,
            "memory_cost_kib" => self.kdf.memory_cost_kib = parse_nonzero(key, value)?,
            "parallelism" => self.kdf.parallelism = parse_nonzero(key, value)?,
            "key_length" => self.kdf.key_length = parse_nonzero(key, value)?,
            "default_length" => {
                let length: usize = value.trim().parse().map_err(|e| {
                    Error::InvalidInput(format!("invalid value for {}: {}", key, e))
                })?;
                OutputLength::new(length)
                    .map_err(|e| Error::InvalidInput(e.to_string()))?;
                self.default_length = length;
            }
            "default_account" => {
                let account = value.trim();
                if account.is_empty() {
                    return Err(Error::InvalidInput(
                        "default_account cannot be empty".to_string(),
                    ));
                }
                self.default_account = account.to_string();
            }
            _ => {
                return Err(Error::InvalidInput(format!(
                    "unknown configuration key '{}' (expected one of: {})",
                    key,
                    SETTABLE_KEYS.join(", ")
                )))
            }
        }
        Ok(())
    }

    /// KDF parameters for the engine, checked against Argon2's limits.
    ///
    /// # Errors
    /// - `Error::Derivation` wrapping `DerivationError::Configuration`
    pub fn derivation_params(&self) -> Result<KdfParams> {
        self.kdf.validate()?;
        Ok(self.kdf)
    }

    /// Configured default password length.
    pub fn output_length(&self) -> Result<OutputLength> {
        Ok(OutputLength::new(self.default_length)?)
    }

    /// Count a generation that just finished after `elapsed_ms`.
    ///
    /// Only updates memory; the caller decides when to save.
    pub fn record_generation(&mut self, elapsed_ms: u64) {
        self.stats.record(elapsed_ms, Utc::now());
        debug!(
            "Recorded generation #{} ({} ms)",
            self.stats.passwords_generated, elapsed_ms
        );
    }

    /// Default settings that keep this configuration's usage statistics.
    pub fn reset(&self) -> Self {
        Self {
            stats: self.stats.clone(),
            ..Self::default()
        }
    }

    /// Serialize configuration to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))
    }
}

fn parse_nonzero(key: &str, value: &str) -> Result<u32> {
    let parsed: u32 = value
        .trim()
        .parse()
        .map_err(|e| Error::InvalidInput(format!("invalid value for {}: {}", key, e)))?;
    if parsed == 0 {
        return Err(Error::InvalidInput(format!("{} must be non-zero", key)));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.kdf, KdfParams::standard());
        assert_eq!(config.default_length, 16);
        assert!(config.default_account.is_empty());
        assert_eq!(config.config_version, "1.0");
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILENAME);

        let mut config = AppConfig::default();
        config.set("default_account", "alice").unwrap();
        config.set("time_cost", "4").unwrap();
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.kdf.time_cost, 4);
        assert_eq!(loaded.default_account, "alice");
    }

    #[test]
    fn test_load_normalizes_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        fs::write(
            &path,
            r#"{
                "kdf": {"time_cost": 0, "memory_cost_kib": 0, "parallelism": 0, "key_length": 0},
                "default_length": 500,
                "config_version": ""
            }"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.kdf, KdfParams::standard());
        assert_eq!(config.default_length, MAX_OUTPUT_LENGTH);
        assert_eq!(config.config_version, CONFIG_VERSION);
    }

    #[test]
    fn test_normalize_short_length_resets_to_default() {
        let mut config = AppConfig {
            default_length: 2,
            ..AppConfig::default()
        };
        assert_eq!(config.normalize(), vec!["default_length"]);
        assert_eq!(config.default_length, DEFAULT_LENGTH);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config = AppConfig::from_json(r#"{"default_length": 24}"#).unwrap();
        assert_eq!(config.default_length, 24);
        assert_eq!(config.kdf, KdfParams::standard());
    }

    #[test]
    fn test_invalid_json_is_serialization_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            AppConfig::load_from(&path),
            Err(Error::Serialization(_))
        ));
    }

    #[test]
    fn test_export_and_import() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("exported.json");

        let mut config = AppConfig::default();
        config.set("default_length", "32").unwrap();
        config.export(&path).unwrap();

        let imported = AppConfig::import(&path).unwrap();
        assert_eq!(imported.default_length, 32);
    }

    #[test]
    fn test_import_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            AppConfig::import(&dir.path().join("missing.json")),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_set_validation() {
        let mut config = AppConfig::default();

        assert!(config.set("time_cost", "0").is_err());
        assert!(config.set("parallelism", "many").is_err());
        assert!(config.set("default_length", "3").is_err());
        assert!(config.set("default_length", "129").is_err());
        assert!(config.set("default_account", "   ").is_err());
        assert!(matches!(
            config.set("colour", "blue"),
            Err(Error::InvalidInput(_))
        ));

        config.set("memory_cost_kib", "65536").unwrap();
        config.set("default_account", "  bob  ").unwrap();
        assert_eq!(config.kdf.memory_cost_kib, 65536);
        assert_eq!(config.default_account, "bob");
        assert_eq!(config, {
            let mut expected = AppConfig::default();
            expected.kdf.memory_cost_kib = 65536;
            expected.default_account = "bob".to_string();
            expected
        });
    }

    #[test]
    fn test_derivation_params_checks_argon2_limits() {
        let mut config = AppConfig::default();
        assert_eq!(config.derivation_params().unwrap(), KdfParams::standard());

        config.kdf.memory_cost_kib = 8;
        assert!(matches!(
            config.derivation_params(),
            Err(Error::Derivation(_))
        ));
    }

    #[test]
    fn test_output_length() {
        let config = AppConfig::default();
        assert_eq!(config.output_length().unwrap().get(), 16);
    }

    #[test]
    fn test_partial_kdf_object_fills_standard_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        fs::write(&path, r#"{"kdf": {"time_cost": 4}}"#).unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.kdf.time_cost, 4);
        assert_eq!(config.kdf.memory_cost_kib, KdfParams::standard().memory_cost_kib);
        assert_eq!(config.kdf.parallelism, KdfParams::standard().parallelism);
        assert_eq!(config.kdf.key_length, KdfParams::standard().key_length);
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        use chrono::TimeZone;
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_usage_stats_record() {
        let mut stats = UsageStats::default();
        assert_eq!(stats.average_generation_ms(), None);
        assert_eq!(stats.active_days(), None);

        stats.record(300, at(1, 9));
        stats.record(500, at(1, 18));
        stats.record(400, at(4, 12));

        assert_eq!(stats.passwords_generated, 3);
        assert_eq!(stats.first_used, Some(at(1, 9)));
        assert_eq!(stats.last_used, Some(at(4, 12)));
        assert_eq!(stats.average_generation_ms(), Some(400.0));
        assert_eq!(stats.active_days(), Some(4));
        assert_eq!(stats.average_per_day(), Some(0.75));
    }

    #[test]
    fn test_usage_stats_same_day_counts_one_day() {
        let mut stats = UsageStats::default();
        stats.record(10, at(2, 8));
        assert_eq!(stats.active_days(), Some(1));
        assert_eq!(stats.average_per_day(), Some(1.0));
    }

    #[test]
    fn test_record_generation_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);

        let mut config = AppConfig::default();
        config.record_generation(120);
        config.record_generation(80);
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.stats.passwords_generated, 2);
        assert_eq!(loaded.stats.total_generation_ms, 200);
        assert!(loaded.stats.first_used.is_some());
        assert!(loaded.stats.first_used <= loaded.stats.last_used);
    }

    #[test]
    fn test_file_without_stats_loads() {
        let config = AppConfig::from_json(r#"{"default_length": 20}"#).unwrap();
        assert_eq!(config.stats, UsageStats::default());
    }

    #[test]
    fn test_reset_keeps_stats() {
        let mut config = AppConfig::default();
        config.set("default_length", "40").unwrap();
        config.record_generation(50);

        let reset = config.reset();
        assert_eq!(reset.default_length, DEFAULT_LENGTH);
        assert_eq!(reset.stats, config.stats);
    }
}
