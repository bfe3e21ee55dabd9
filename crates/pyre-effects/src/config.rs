//! Effect pool configuration.
//!
//! Loaded once at startup and handed to the manager by value. Each
//! category names the template its pool is built from and how many
//! slots to pre-allocate.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use pyre_common::{ConfigError, EffectCategory};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::pool::MIN_POOL_SIZE;
use crate::reclaim::{DEFAULT_RECLAIM_INTERVAL, MAX_RECLAIM_INTERVAL, MIN_RECLAIM_INTERVAL};

/// Configuration file name.
pub const CONFIG_FILE: &str = "pyre.toml";

/// One pooled effect category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryConfig {
    /// Dense category id
    pub id: u16,
    /// Human readable name, unique
    pub name: String,
    /// Template reference resolved by the backend
    pub template: String,
    /// Requested slot count; values below 1 are clamped up
    pub pool_size: i32,
}

impl CategoryConfig {
    /// Creates a category entry.
    #[must_use]
    pub fn new(id: u16, name: &str, template: &str, pool_size: i32) -> Self {
        Self {
            id,
            name: name.to_string(),
            template: template.to_string(),
            pool_size,
        }
    }

    /// Category key of this entry.
    #[must_use]
    pub const fn category(&self) -> EffectCategory {
        EffectCategory::new(self.id)
    }

    /// Pool size after clamping.
    #[must_use]
    pub fn effective_pool_size(&self) -> usize {
        self.pool_size.max(MIN_POOL_SIZE) as usize
    }
}

/// Pool manager configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectPoolConfig {
    /// Seconds between reclaim scans
    pub reclaim_interval_seconds: f32,
    /// Pooled categories
    pub categories: Vec<CategoryConfig>,
}

impl Default for EffectPoolConfig {
    fn default() -> Self {
        Self {
            reclaim_interval_seconds: DEFAULT_RECLAIM_INTERVAL,
            categories: vec![
                CategoryConfig::new(0, "fire_small", "fx/fire/small", 16),
                CategoryConfig::new(1, "fire_medium", "fx/fire/medium", 8),
                CategoryConfig::new(2, "fire_large", "fx/fire/large", 4),
                CategoryConfig::new(3, "radius_ring", "fx/radius/ring", 12),
            ],
        }
    }
}

impl EffectPoolConfig {
    /// Configuration without any category.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            reclaim_interval_seconds: DEFAULT_RECLAIM_INTERVAL,
            categories: Vec::new(),
        }
    }

    /// Adds a category.
    #[must_use]
    pub fn with_category(mut self, category: CategoryConfig) -> Self {
        self.categories.push(category);
        self
    }

    /// Sets the reclaim interval.
    #[must_use]
    pub fn with_reclaim_interval(mut self, seconds: f32) -> Self {
        self.reclaim_interval_seconds = seconds;
        self
    }

    /// Looks up a category entry by name.
    #[must_use]
    pub fn category(&self, name: &str) -> Option<&CategoryConfig> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// Checks ids and names are unique and the interval is in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let interval = self.reclaim_interval_seconds;
        if !(MIN_RECLAIM_INTERVAL..=MAX_RECLAIM_INTERVAL).contains(&interval) {
            return Err(ConfigError::InvalidReclaimInterval(interval));
        }

        let mut ids = HashSet::new();
        let mut names = HashSet::new();
        for category in &self.categories {
            if !ids.insert(category.id) {
                return Err(ConfigError::DuplicateCategory(category.id.to_string()));
            }
            if !names.insert(category.name.as_str()) {
                return Err(ConfigError::DuplicateCategory(category.name.clone()));
            }
        }
        Ok(())
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes to a TOML document.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Loads from `path`, failing on any IO, parse or validation error.
    pub fn try_load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// Loads from `path`.
    /// Returns the default configuration if the file is missing or invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file {} not found, using defaults", path.display());
            return Self::default();
        }

        match Self::try_load_from(path) {
            Ok(config) => {
                info!("Loaded effect pool config from {}", path.display());
                config
            },
            Err(e) => {
                warn!("Failed to load effect pool config: {e}");
                Self::default()
            },
        }
    }

    /// Saves to `path`, creating parent directories.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_toml_string()?)?;
        info!("Saved effect pool config to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EffectPoolConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.reclaim_interval_seconds - 1.0).abs() < f32::EPSILON);
        assert_eq!(config.category("fire_large").map(|c| c.pool_size), Some(4));
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            reclaim_interval_seconds = 0.5

            [[categories]]
            id = 0
            name = "small"
            template = "fx/fire/small"
            pool_size = 2

            [[categories]]
            id = 1
            name = "broken"
            template = "fx/fire/broken"
            pool_size = 0
        "#;

        let config = EffectPoolConfig::from_toml_str(toml).expect("valid config");
        assert!((config.reclaim_interval_seconds - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.categories.len(), 2);
        assert_eq!(config.categories[1].effective_pool_size(), 1);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config = EffectPoolConfig::from_toml_str("").expect("empty document is valid");
        assert_eq!(config, EffectPoolConfig::default());
    }

    #[test]
    fn test_duplicate_category_rejected() {
        let config = EffectPoolConfig::empty()
            .with_category(CategoryConfig::new(0, "a", "fx/a", 1))
            .with_category(CategoryConfig::new(0, "b", "fx/b", 1));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateCategory(_))
        ));

        let config = EffectPoolConfig::empty()
            .with_category(CategoryConfig::new(0, "a", "fx/a", 1))
            .with_category(CategoryConfig::new(1, "a", "fx/b", 1));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateCategory(name)) if name == "a"
        ));
    }

    #[test]
    fn test_interval_out_of_range_rejected() {
        let config = EffectPoolConfig::empty().with_reclaim_interval(0.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidReclaimInterval(_))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join(CONFIG_FILE);

        let config = EffectPoolConfig::empty()
            .with_reclaim_interval(0.5)
            .with_category(CategoryConfig::new(7, "embers", "fx/embers", 3));
        config.save_to(&path).expect("save succeeds");

        let loaded = EffectPoolConfig::load_from(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_or_invalid_falls_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join(CONFIG_FILE);
        assert_eq!(EffectPoolConfig::load_from(&missing), EffectPoolConfig::default());

        fs::write(&missing, "reclaim_interval_seconds = \"soon\"").expect("write");
        assert!(EffectPoolConfig::try_load_from(&missing).is_err());
        assert_eq!(EffectPoolConfig::load_from(&missing), EffectPoolConfig::default());
    }
}
