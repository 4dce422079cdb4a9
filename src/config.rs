use crate::error::CostLensError;
use crate::threshold::Thresholds;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Configuration settings for costlens
///
/// Stores operator preferences that persist between runs:
/// - Reporting window length and top-N chart size
/// - Materiality thresholds for the comparison tables
/// - Where reports are written
/// - AWS region and profile for Cost Explorer
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Number of complete months in the report (default: 2)
    pub window_months: u32,
    /// Services drawn individually in the chart; the rest become "Others"
    pub top_n: usize,
    /// Minimum increase in USD before a service gets a breakdown
    pub abs_threshold: f64,
    /// Minimum increase in percent before a service gets a breakdown
    pub pct_threshold: f64,
    /// Breakdown rows below this combined two-month cost are dropped
    pub min_breakdown_cost: f64,
    /// Services below this current-month cost are left out of the comparison table
    pub min_service_cost: f64,
    /// Directory for the chart, the document and CSV exports (default: current directory)
    pub output_directory: Option<PathBuf>,
    pub aws_region: Option<String>,
    pub aws_profile: Option<String>,
    /// Default output format for reports
    pub default_output_format: OutputFormat,
}

/// Output format options for reports
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    /// Colored terminal tables (default)
    Table,
    /// JSON format for scripting and automation
    Json,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window_months: 2,
            top_n: 9,
            abs_threshold: 0.5,
            pct_threshold: 5.0,
            min_breakdown_cost: 1.0,
            min_service_cost: 50.0,
            output_directory: None,
            aws_region: None,
            aws_profile: None,
            default_output_format: OutputFormat::Table,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = fs::read_to_string(&config_path)?;
            let config: Config = serde_yaml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)?;
        fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("costlens").join("config.yaml"))
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            absolute: self.abs_threshold,
            percent: self.pct_threshold,
        }
    }

    pub fn get_output_directory(&self) -> PathBuf {
        self.output_directory
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }

    /// Reject settings the report cannot be built with
    pub fn validate(&self) -> Result<()> {
        if self.window_months == 0 {
            return Err(CostLensError::config_error("window_months must be at least 1").into());
        }
        for (name, value) in [
            ("abs_threshold", self.abs_threshold),
            ("pct_threshold", self.pct_threshold),
            ("min_breakdown_cost", self.min_breakdown_cost),
            ("min_service_cost", self.min_service_cost),
        ] {
            if !value.is_finite() {
                return Err(
                    CostLensError::config_error(&format!("{} must be a finite number", name)).into(),
                );
            }
        }
        Ok(())
    }
}
