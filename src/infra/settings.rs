//! Barcode settings store
//!
//! Holds the live `BarcodeConfig`. Readers take a cloned snapshot so one
//! decode always sees a single consistent layout; admin updates are
//! validated, swapped in under the write lock and optionally persisted
//! as JSON.

use crate::domain::barcode::{BarcodeConfig, ConfigError};
use anyhow::Context;
use parking_lot::RwLock;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Why a settings update did not take effect
#[derive(Debug)]
pub enum UpdateError {
    Invalid(ConfigError),
    Persist(anyhow::Error),
}

impl std::fmt::Display for UpdateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdateError::Invalid(e) => write!(f, "{e}"),
            UpdateError::Persist(e) => write!(f, "Failed to persist barcode configuration: {e:#}"),
        }
    }
}

impl std::error::Error for UpdateError {}

pub struct BarcodeSettings {
    current: RwLock<BarcodeConfig>,
    persist_path: Option<PathBuf>,
}

impl BarcodeSettings {
    /// In-memory store seeded with `initial`
    pub fn new(initial: BarcodeConfig) -> Self {
        Self { current: RwLock::new(initial), persist_path: None }
    }

    /// Store backed by `path`; a previously persisted layout overrides `initial`
    pub fn load(initial: BarcodeConfig, path: Option<&str>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::new(initial));
        };
        let path = PathBuf::from(path);

        let config = if path.exists() {
            let persisted = read_persisted(&path)?;
            info!(file = %path.display(), enabled = %persisted.enabled, "barcode_settings_loaded");
            persisted
        } else {
            info!(file = %path.display(), "barcode_settings_not_persisted_yet");
            initial
        };

        Ok(Self { current: RwLock::new(config), persist_path: Some(path) })
    }

    /// Consistent copy of the current layout
    pub fn snapshot(&self) -> BarcodeConfig {
        self.current.read().clone()
    }

    /// Validate, persist and apply a new layout
    pub fn update(&self, next: BarcodeConfig) -> Result<BarcodeConfig, UpdateError> {
        next.validate().map_err(UpdateError::Invalid)?;

        let mut current = self.current.write();
        if let Some(path) = &self.persist_path {
            write_persisted(path, &next).map_err(UpdateError::Persist)?;
        }
        *current = next.clone();

        info!(
            enabled = %next.enabled,
            product_code = %format!("{}-{}", next.product_code_start, next.product_code_end),
            weight = %format!("{}-{}", next.weight_start, next.weight_end),
            weight_unit = %next.weight_unit,
            weight_divisor = %next.weight_divisor,
            "barcode_settings_updated"
        );
        Ok(next)
    }
}

fn read_persisted(path: &Path) -> anyhow::Result<BarcodeConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read barcode settings {}", path.display()))?;
    let config: BarcodeConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse barcode settings {}", path.display()))?;
    if let Err(e) = config.validate() {
        warn!(file = %path.display(), error = %e, "barcode_settings_invalid");
        anyhow::bail!("Persisted barcode settings in {} are invalid: {e}", path.display());
    }
    Ok(config)
}

/// Write to a sibling temp file, then rename over the target
fn write_persisted(path: &Path, config: &BarcodeConfig) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    let json = serde_json::to_string_pretty(config)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("Failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::WeightUnit;

    fn enabled() -> BarcodeConfig {
        BarcodeConfig { enabled: true, ..Default::default() }
    }

    #[test]
    fn test_snapshot_reflects_update() {
        let settings = BarcodeSettings::new(BarcodeConfig::default());
        assert!(!settings.snapshot().enabled);

        settings.update(enabled()).unwrap();
        assert!(settings.snapshot().enabled);
    }

    #[test]
    fn test_invalid_update_is_rejected() {
        let settings = BarcodeSettings::new(enabled());
        let mut bad = enabled();
        bad.weight_start = 10;
        bad.weight_end = 6;

        let err = settings.update(bad).unwrap_err();
        assert!(matches!(err, UpdateError::Invalid(ConfigError::WeightRange { .. })));
        assert_eq!(settings.snapshot(), enabled());
    }

    #[test]
    fn test_update_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("barcode.json");
        let path_str = path.to_str().unwrap();

        let settings = BarcodeSettings::load(BarcodeConfig::default(), Some(path_str)).unwrap();
        let mut next = enabled();
        next.weight_unit = WeightUnit::Kg;
        settings.update(next.clone()).unwrap();
        assert!(path.exists());

        let reloaded = BarcodeSettings::load(BarcodeConfig::default(), Some(path_str)).unwrap();
        assert_eq!(reloaded.snapshot(), next);
    }

    #[test]
    fn test_load_without_file_uses_initial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let settings = BarcodeSettings::load(enabled(), path.to_str()).unwrap();
        assert_eq!(settings.snapshot(), enabled());
    }

    #[test]
    fn test_load_rejects_invalid_persisted_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("barcode.json");
        let mut bad = enabled();
        bad.product_code_end = 1;
        fs::write(&path, serde_json::to_string(&bad).unwrap()).unwrap();

        assert!(BarcodeSettings::load(enabled(), path.to_str()).is_err());
    }
}
