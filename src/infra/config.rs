//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml

use crate::domain::barcode::BarcodeConfig;
use crate::domain::types::WeightUnit;
use anyhow::Context;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_address: default_bind_address(), port: default_server_port() }
    }
}

/// `[barcode]` section; seeds the barcode settings store
#[derive(Debug, Clone, Deserialize)]
pub struct BarcodeSection {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_product_code_start")]
    pub product_code_start: usize,
    #[serde(default = "default_product_code_end")]
    pub product_code_end: usize,
    #[serde(default = "default_weight_start")]
    pub weight_start: usize,
    #[serde(default = "default_weight_end")]
    pub weight_end: usize,
    #[serde(default)]
    pub weight_unit: WeightUnit,
    /// 10 for labels that encode weight in tenths of the unit
    #[serde(default = "default_weight_divisor")]
    pub weight_divisor: u32,
}

fn default_product_code_start() -> usize {
    1
}

fn default_product_code_end() -> usize {
    5
}

fn default_weight_start() -> usize {
    6
}

fn default_weight_end() -> usize {
    10
}

fn default_weight_divisor() -> u32 {
    1
}

impl Default for BarcodeSection {
    fn default() -> Self {
        Self {
            enabled: false,
            product_code_start: default_product_code_start(),
            product_code_end: default_product_code_end(),
            weight_start: default_weight_start(),
            weight_end: default_weight_end(),
            weight_unit: WeightUnit::G,
            weight_divisor: default_weight_divisor(),
        }
    }
}

impl From<BarcodeSection> for BarcodeConfig {
    fn from(s: BarcodeSection) -> Self {
        Self {
            enabled: s.enabled,
            product_code_start: s.product_code_start,
            product_code_end: s.product_code_end,
            weight_start: s.weight_start,
            weight_end: s.weight_end,
            weight_unit: s.weight_unit,
            weight_divisor: s.weight_divisor,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// JSON array of products
    pub file: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SettingsConfig {
    /// Where admin updates to the barcode layout are persisted (JSON)
    #[serde(default)]
    pub file: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfig {
    /// Identical scans within this window are dropped
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Scan engine poll cadence
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_debounce_ms() -> u64 {
    5000
}

fn default_poll_interval_ms() -> u64 {
    100
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self { debounce_ms: default_debounce_ms(), poll_interval_ms: default_poll_interval_ms() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EgressConfig {
    /// File path for scan egress (JSONL format)
    #[serde(default = "default_egress_file")]
    pub file: String,
}

impl Default for EgressConfig {
    fn default() -> Self {
        Self { file: default_egress_file() }
    }
}

fn default_egress_file() -> String {
    "scans.jsonl".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_interval")]
    pub interval_secs: u64,
}

fn default_metrics_interval() -> u64 {
    60
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { interval_secs: default_metrics_interval() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Store identifier used as metrics label
    #[serde(default = "default_site_id")]
    pub id: String,
}

fn default_site_id() -> String {
    "store".to_string()
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self { id: default_site_id() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub barcode: BarcodeSection,
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub settings: SettingsConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub egress: EgressConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    site_id: String,
    bind_address: String,
    port: u16,
    barcode: BarcodeConfig,
    catalog_file: String,
    settings_file: Option<String>,
    debounce_ms: u64,
    poll_interval_ms: u64,
    egress_file: String,
    metrics_interval_secs: u64,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site_id: default_site_id(),
            bind_address: default_bind_address(),
            port: default_server_port(),
            barcode: BarcodeConfig::default(),
            catalog_file: "data/catalog.json".to_string(),
            settings_file: None,
            debounce_ms: default_debounce_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            egress_file: default_egress_file(),
            metrics_interval_secs: default_metrics_interval(),
            config_file: "default".to_string(),
        }
    }
}

impl Config {
    /// Determine config file path from args or environment
    pub fn resolve_config_path(args: &[String]) -> String {
        for (i, arg) in args.iter().enumerate() {
            if arg == "--config" {
                if let Some(path) = args.get(i + 1) {
                    return path.clone();
                }
            }
            if let Some(path) = arg.strip_prefix("--config=") {
                return path.to_string();
            }
        }

        if let Ok(path) = env::var("CONFIG_FILE") {
            return path;
        }

        "config/dev.toml".to_string()
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        let barcode = BarcodeConfig::from(toml_config.barcode);
        barcode
            .validate()
            .with_context(|| format!("Invalid [barcode] section in {}", path.display()))?;

        Ok(Self {
            site_id: toml_config.site.id,
            bind_address: toml_config.server.bind_address,
            port: toml_config.server.port,
            barcode,
            catalog_file: toml_config.catalog.file,
            settings_file: toml_config.settings.file,
            debounce_ms: toml_config.scan.debounce_ms,
            poll_interval_ms: toml_config.scan.poll_interval_ms,
            egress_file: toml_config.egress.file,
            metrics_interval_secs: toml_config.metrics.interval_secs,
            config_file: path.display().to_string(),
        })
    }

    /// Load configuration from `path`
    ///
    /// A missing file falls back to defaults. A file that exists but does
    /// not parse or validate is an error, so a bad `[barcode]` section never
    /// silently discards the catalog, server and settings paths.
    pub fn load_from_path(path: &str) -> anyhow::Result<Self> {
        if !Path::new(path).exists() {
            tracing::warn!(path = %path, "config_file_missing_using_defaults");
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    pub fn bind_address(&self) -> &str {
        &self.bind_address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn barcode(&self) -> &BarcodeConfig {
        &self.barcode
    }

    pub fn catalog_file(&self) -> &str {
        &self.catalog_file
    }

    pub fn settings_file(&self) -> Option<&str> {
        self.settings_file.as_deref()
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn egress_file(&self) -> &str {
        &self.egress_file
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }
}
