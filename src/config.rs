use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Environment variable naming an optional JSON config file.
pub const CONFIG_ENV: &str = "RUSTY_ZINB_CONFIG";

// ---------------------------------------------------------------------------
// Fit options
// ---------------------------------------------------------------------------

/// Options for the ZINB maximum-likelihood fit.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    /// Newton iterations before giving up.
    pub max_iterations: usize,
    /// Stop when every gradient component is below this in absolute value.
    pub tolerance: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            tolerance: 1e-6,
        }
    }
}

// ---------------------------------------------------------------------------
// Application options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Bins of the dependent-variable histogram.
    pub histogram_bins: usize,
    /// Rows shown in the data preview.
    pub preview_rows: usize,
    /// Dummy-code numeric columns whose header flag marks them as factors.
    /// Off by default: flags are displayed but do not change the encoding.
    pub apply_factor_flags: bool,
    pub fit: FitConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            histogram_bins: 10,
            preview_rows: 5,
            apply_factor_flags: false,
            fit: FitConfig::default(),
        }
    }
}

impl AppConfig {
    /// Read a JSON config file; missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Config from `$RUSTY_ZINB_CONFIG` if set, defaults otherwise.
    pub fn from_env() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "histogram_bins": 20, "fit": {{ "tolerance": 1e-8 }} }}"#).unwrap();

        let cfg = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(cfg.histogram_bins, 20);
        assert_eq!(cfg.preview_rows, 5);
        assert!(!cfg.apply_factor_flags);
        assert_eq!(cfg.fit.tolerance, 1e-8);
        assert_eq!(cfg.fit.max_iterations, 200);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "histogram_bins = 3").unwrap();
        assert!(AppConfig::from_file(file.path()).is_err());
    }
}
