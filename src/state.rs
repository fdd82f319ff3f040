use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::config::AppConfig;
use crate::data::loader::{build_dataset, load_file};
use crate::data::model::{PanelDataset, RawSheet};
use crate::data::validate::{MIN_COLUMNS, validate_shape};
use crate::regression::{RegressionResult, RegressionSpec, run_regression};
use crate::report::{FormattedReport, format_result};
use crate::stats::descriptive::{Histogram, Summary, describe, histogram};

/// Downloadable input template, saved byte for byte.
pub const TEMPLATE_CSV: &str = include_str!("../assets/template.csv");

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full session state, independent of rendering.
pub struct AppState {
    pub config: AppConfig,

    /// Loaded dataset (None until a valid file is opened).
    pub dataset: Option<PanelDataset>,

    /// File name of the loaded dataset, for the top bar.
    pub source_name: Option<String>,

    /// Selected dependent (count) variable.
    pub dependent: Option<String>,

    /// Selected explanatory variables, in dataset column order.
    pub explanatory: Vec<String>,

    /// Dummy-code numeric columns flagged as factors.
    pub apply_factor_flags: bool,

    /// Descriptive statistics of the dependent variable (cached).
    pub summary: Option<Summary>,
    pub histogram: Option<Histogram>,

    /// Last successful fit and its display form.
    pub result: Option<RegressionResult>,
    pub report: Option<FormattedReport>,

    /// Error message shown in the UI.
    pub status_message: Option<String>,

    /// Non-error feedback (last action that succeeded).
    pub info_message: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            apply_factor_flags: config.apply_factor_flags,
            config,
            dataset: None,
            source_name: None,
            dependent: None,
            explanatory: Vec::new(),
            summary: None,
            histogram: None,
            result: None,
            report: None,
            status_message: None,
            info_message: None,
        }
    }

    /// Forget the current dataset and everything computed from it.
    fn clear(&mut self) {
        self.dataset = None;
        self.source_name = None;
        self.dependent = None;
        self.explanatory.clear();
        self.summary = None;
        self.histogram = None;
        self.clear_result();
    }

    fn clear_result(&mut self) {
        self.result = None;
        self.report = None;
    }

    fn fail(&mut self, msg: String) {
        log::error!("{msg}");
        self.status_message = Some(msg);
        self.info_message = None;
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    /// Load a file from disk and ingest it. Returns whether a dataset is now
    /// loaded.
    pub fn open_path(&mut self, path: &Path) -> bool {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        match load_file(path) {
            Ok(sheet) => self.ingest_sheet(&sheet, name),
            Err(e) => {
                self.clear();
                self.fail(format!("Error: {e:#}"));
                false
            }
        }
    }

    /// Validate a raw sheet and, if it passes, make it the session dataset.
    ///
    /// A sheet that fails validation leaves the session without a dataset:
    /// nothing downstream (decomposition, statistics, regression) is run.
    pub fn ingest_sheet(&mut self, sheet: &RawSheet, source_name: String) -> bool {
        self.clear();

        if !validate_shape(sheet) {
            self.fail(format!(
                "Invalid file: the sheet must have at least {MIN_COLUMNS} columns \
                 (an index and one variable), found {}",
                sheet.headers.len()
            ));
            return false;
        }

        let dataset = match build_dataset(sheet) {
            Ok(ds) => ds,
            Err(e) => {
                self.fail(format!("Error: {e:#}"));
                return false;
            }
        };

        log::info!(
            "Loaded {} rows with columns {:?} from {source_name}",
            dataset.len(),
            dataset.column_names().collect::<Vec<_>>()
        );

        self.dependent = dataset.numeric_columns().next().map(|c| c.name().to_string());
        self.info_message = Some(format!("Loaded {source_name}"));
        self.status_message = None;
        self.source_name = Some(source_name);
        self.dataset = Some(dataset);
        self.refresh_descriptive();
        true
    }

    // -----------------------------------------------------------------------
    // Variable selection
    // -----------------------------------------------------------------------

    /// Columns that may be picked as explanatory variables.
    pub fn explanatory_candidates(&self) -> Vec<String> {
        let Some(ds) = &self.dataset else {
            return Vec::new();
        };
        ds.column_names()
            .filter(|n| Some(*n) != self.dependent.as_deref())
            .map(str::to_string)
            .collect()
    }

    pub fn set_dependent(&mut self, name: &str) {
        if self.dependent.as_deref() == Some(name) {
            return;
        }
        self.dependent = Some(name.to_string());
        self.explanatory.retain(|e| e != name);
        self.clear_result();
        self.refresh_descriptive();
    }

    /// Add or remove an explanatory variable. The dependent variable cannot
    /// be selected.
    pub fn toggle_explanatory(&mut self, name: &str) {
        if self.dependent.as_deref() == Some(name) {
            return;
        }
        if let Some(pos) = self.explanatory.iter().position(|e| e == name) {
            self.explanatory.remove(pos);
        } else {
            self.explanatory.push(name.to_string());
            // Keep the dataset's column order so the formula is stable.
            if let Some(ds) = &self.dataset {
                let order: Vec<&str> = ds.column_names().collect();
                self.explanatory
                    .sort_by_key(|e| order.iter().position(|n| n == e).unwrap_or(usize::MAX));
            }
        }
        self.clear_result();
    }

    pub fn set_apply_factor_flags(&mut self, on: bool) {
        if self.apply_factor_flags != on {
            self.apply_factor_flags = on;
            self.clear_result();
        }
    }

    /// Recompute the summary and histogram of the dependent variable.
    pub fn refresh_descriptive(&mut self) {
        let values = self
            .dataset
            .as_ref()
            .zip(self.dependent.as_deref())
            .and_then(|(ds, dep)| ds.column(dep))
            .filter(|c| c.is_numeric())
            .map(|c| c.numeric_values());

        match values {
            Some(v) => {
                self.summary = Some(describe(&v));
                self.histogram = Some(histogram(&v, self.config.histogram_bins));
            }
            None => {
                self.summary = None;
                self.histogram = None;
            }
        }
    }

    // -----------------------------------------------------------------------
    // Regression
    // -----------------------------------------------------------------------

    /// Fit the ZINB model for the current selection. Failures become the
    /// status message; the session stays usable.
    pub fn run_regression(&mut self) {
        self.clear_result();

        let Some(dataset) = &self.dataset else {
            self.fail("No dataset loaded.".into());
            return;
        };
        let Some(dependent) = self.dependent.clone() else {
            self.fail("Select a dependent variable first.".into());
            return;
        };

        let spec = RegressionSpec {
            dependent,
            explanatory: self.explanatory.clone(),
            apply_factor_flags: self.apply_factor_flags,
        };

        match run_regression(dataset, &spec, &self.config.fit) {
            Ok(result) => {
                let report = format_result(&result, result.n_conditional);
                log::info!("regression finished\n{report}");
                self.info_message = Some(format!(
                    "Fitted {} on {} observations ({} dropped for missing values, {} iterations)",
                    result.formula, result.n_obs, result.dropped_rows, result.iterations
                ));
                self.status_message = None;
                self.result = Some(result);
                self.report = Some(report);
            }
            Err(e) => self.fail(format!("Regression failed: {e}")),
        }
    }

    // -----------------------------------------------------------------------
    // File outputs
    // -----------------------------------------------------------------------

    /// Write the last regression result as pretty JSON.
    pub fn export_results(&self, path: &Path) -> Result<()> {
        let Some(result) = &self.result else {
            bail!("there is no regression result to export");
        };
        let json = serde_json::to_string_pretty(result).context("serialising result")?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        log::info!("exported results to {}", path.display());
        Ok(())
    }

    /// Save the input template.
    pub fn save_template(path: &Path) -> Result<()> {
        std::fs::write(path, TEMPLATE_CSV)
            .with_context(|| format!("writing {}", path.display()))?;
        log::info!("saved template to {}", path.display());
        Ok(())
    }
}
