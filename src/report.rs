use std::fmt;

use crate::regression::{Coefficient, INFLATION_PREFIX, RegressionResult};

// ---------------------------------------------------------------------------
// Significance markers
// ---------------------------------------------------------------------------

/// `***` below 0.01, `**` below 0.05, `*` below 0.10, otherwise empty.
pub fn significance(p_value: f64) -> &'static str {
    if p_value < 0.01 {
        "***"
    } else if p_value < 0.05 {
        "**"
    } else if p_value < 0.10 {
        "*"
    } else {
        ""
    }
}

pub const SIGNIFICANCE_LEGEND: &str = "*** p<0.01, ** p<0.05, * p<0.1";

// ---------------------------------------------------------------------------
// Formatted tables
// ---------------------------------------------------------------------------

pub const TABLE_HEADERS: [&str; 5] = ["", "Estimate", "Standard Error", "p-value", "Significance"];

/// One rendered coefficient row.
#[derive(Debug, Clone, PartialEq)]
pub struct FormattedRow {
    pub term: String,
    pub estimate: String,
    pub std_error: String,
    pub p_value: String,
    pub significance: &'static str,
}

impl FormattedRow {
    fn from_coefficient(c: &Coefficient) -> Self {
        Self {
            term: c.name.clone(),
            estimate: format!("{:.4}", c.estimate),
            std_error: format!("{:.4}", c.std_error),
            p_value: format_p(c.p_value),
            significance: significance(c.p_value),
        }
    }

    pub fn cells(&self) -> [&str; 5] {
        [
            &self.term,
            &self.estimate,
            &self.std_error,
            &self.p_value,
            self.significance,
        ]
    }
}

fn format_p(p: f64) -> String {
    if p < 1e-4 {
        "<0.0001".to_string()
    } else {
        format!("{p:.4}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientTable {
    pub title: &'static str,
    pub rows: Vec<FormattedRow>,
}

/// Display-ready regression output.
#[derive(Debug, Clone, PartialEq)]
pub struct FormattedReport {
    pub formula: String,
    pub conditional: CoefficientTable,
    pub inflation: CoefficientTable,
    pub aic: String,
    pub bic: String,
    pub log_likelihood: String,
    pub alpha: String,
    pub n_obs: usize,
}

impl FormattedReport {
    /// Label/value pairs of the scalar fit metrics.
    pub fn metrics(&self) -> [(&'static str, &str); 4] {
        [
            ("AIC", &self.aic),
            ("BIC", &self.bic),
            ("Log-likelihood", &self.log_likelihood),
            ("alpha", &self.alpha),
        ]
    }
}

/// Split the coefficients at `n_conditional` into the count-model table and
/// the zero-inflation table. The `inflate_` prefix is dropped from inflation
/// term names since the table title already says which model they belong to.
pub fn format_result(result: &RegressionResult, n_conditional: usize) -> FormattedReport {
    let split = n_conditional.min(result.coefficients.len());
    let (conditional, inflation) = result.coefficients.split_at(split);

    let inflation_rows = inflation
        .iter()
        .map(|c| {
            let mut row = FormattedRow::from_coefficient(c);
            if let Some(stripped) = row.term.strip_prefix(INFLATION_PREFIX) {
                row.term = stripped.to_string();
            }
            row
        })
        .collect();

    FormattedReport {
        formula: result.formula.clone(),
        conditional: CoefficientTable {
            title: "Conditional model (count)",
            rows: conditional.iter().map(FormattedRow::from_coefficient).collect(),
        },
        inflation: CoefficientTable {
            title: "Zero-inflation model (logit)",
            rows: inflation_rows,
        },
        aic: format!("{:.2}", result.aic),
        bic: format!("{:.2}", result.bic),
        log_likelihood: format!("{:.2}", result.log_likelihood),
        alpha: format!("{:.4} ({:.4})", result.alpha, result.alpha_std_error),
        n_obs: result.n_obs,
    }
}

// ---------------------------------------------------------------------------
// Plain-text rendering (clipboard / log)
// ---------------------------------------------------------------------------

impl fmt::Display for CoefficientTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut widths = TABLE_HEADERS.map(str::len);
        for row in &self.rows {
            for (w, cell) in widths.iter_mut().zip(row.cells()) {
                *w = (*w).max(cell.chars().count());
            }
        }

        writeln!(f, "{}", self.title)?;
        let write_line = |f: &mut fmt::Formatter<'_>, cells: [&str; 5]| -> fmt::Result {
            write!(f, "{:<w$}", cells[0], w = widths[0])?;
            for (cell, w) in cells.iter().zip(widths).skip(1) {
                write!(f, "  {cell:>w$}")?;
            }
            writeln!(f)
        };
        write_line(f, TABLE_HEADERS)?;
        for row in &self.rows {
            write_line(f, row.cells())?;
        }
        Ok(())
    }
}

impl fmt::Display for FormattedReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ZINB: {}  (n = {})", self.formula, self.n_obs)?;
        writeln!(f)?;
        write!(f, "{}", self.conditional)?;
        writeln!(f)?;
        write!(f, "{}", self.inflation)?;
        writeln!(f)?;
        for (label, value) in self.metrics() {
            writeln!(f, "{label}: {value}")?;
        }
        writeln!(f, "{SIGNIFICANCE_LEGEND}")
    }
}
