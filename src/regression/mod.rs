/// Regression runner: formula → design matrices → ZINB fit → result.
///
/// ```text
///   RegressionSpec ──▶ formula ──▶ design (y, X) ──▶ zinb ──▶ RegressionResult
///                          │             │              │
///                          └─────────────┴──────────────┴──▶ RegressionError
/// ```
pub mod design;
pub mod error;
pub mod formula;
pub mod zinb;

use serde::Serialize;
use statrs::function::erf::erfc;

use crate::config::FitConfig;
use crate::data::model::PanelDataset;
use design::build_design;
pub use error::RegressionError;
use formula::{Term, build_formula};
use zinb::fit_zinb;

/// Prefix of inflation-model coefficient names.
pub const INFLATION_PREFIX: &str = "inflate_";

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Which columns to regress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegressionSpec {
    pub dependent: String,
    /// Ordered, non-empty.
    pub explanatory: Vec<String>,
    /// Dummy-code numeric columns whose factor flag is set.
    pub apply_factor_flags: bool,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coefficient {
    pub name: String,
    pub estimate: f64,
    pub std_error: f64,
    pub z_value: f64,
    pub p_value: f64,
}

/// A fitted ZINB model.
///
/// `coefficients` holds the count-model terms first (`n_conditional` of them,
/// intercept included) followed by the inflation-model terms.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegressionResult {
    pub formula: String,
    pub coefficients: Vec<Coefficient>,
    pub n_conditional: usize,
    pub alpha: f64,
    pub alpha_std_error: f64,
    pub aic: f64,
    pub bic: f64,
    pub log_likelihood: f64,
    pub n_obs: usize,
    pub dropped_rows: usize,
    pub iterations: usize,
}

/// Two-sided p-value of a z-statistic under the standard normal.
pub fn pvalue_z(z: f64) -> f64 {
    if !z.is_finite() {
        return f64::NAN;
    }
    erfc(z.abs() / std::f64::consts::SQRT_2)
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Fit `dependent ~ explanatory...` as a ZINB model on `dataset`.
///
/// Text columns are always categorical. Numeric columns are categorical only
/// when `spec.apply_factor_flags` is set and their header flag says so.
/// The dataset is not modified.
pub fn run_regression(
    dataset: &PanelDataset,
    spec: &RegressionSpec,
    config: &FitConfig,
) -> Result<RegressionResult, RegressionError> {
    if spec.explanatory.is_empty() {
        return Err(RegressionError::EmptySelection);
    }

    let terms: Vec<Term> = spec
        .explanatory
        .iter()
        .map(|name| {
            let categorical = dataset.column(name).is_some_and(|c| {
                !c.is_numeric() || (spec.apply_factor_flags && c.meta.is_factor())
            });
            Term {
                variable: name.clone(),
                categorical,
            }
        })
        .collect();

    let formula = build_formula(&spec.dependent, &terms)?;
    log::info!("fitting ZINB: {formula}");

    let design = build_design(dataset, &formula)?;
    if design.y.iter().all(|v| *v == 0.0) {
        return Err(RegressionError::InvalidResponse {
            column: spec.dependent.clone(),
            reason: "has no positive counts".into(),
        });
    }

    let fit = fit_zinb(&design.y, &design.x, config)?;
    let std_errors = fit.std_errors();

    let p = design.n_columns();
    let names = design
        .column_names
        .iter()
        .cloned()
        .chain(design.column_names.iter().map(|n| format!("{INFLATION_PREFIX}{n}")));

    let coefficients: Vec<Coefficient> = names
        .enumerate()
        .map(|(j, name)| {
            let estimate = fit.params[j];
            let std_error = std_errors[j];
            let z_value = estimate / std_error;
            Coefficient {
                name,
                estimate,
                std_error,
                z_value,
                p_value: pvalue_z(z_value),
            }
        })
        .collect();

    let n = design.n_obs() as f64;
    let k = (2 * p + 1) as f64;
    let ll = fit.log_likelihood;

    Ok(RegressionResult {
        formula: formula.to_string(),
        coefficients,
        n_conditional: p,
        alpha: fit.alpha(),
        alpha_std_error: fit.alpha_std_error(),
        aic: -2.0 * ll + 2.0 * k,
        bic: -2.0 * ll + k * n.ln(),
        log_likelihood: ll,
        n_obs: design.n_obs(),
        dropped_rows: design.dropped_rows,
        iterations: fit.iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::{build_dataset, read_sheet};
    use crate::fixtures::panel_csv;
    use approx::assert_abs_diff_eq;

    fn dataset(n: usize) -> PanelDataset {
        build_dataset(&read_sheet(panel_csv(n).as_bytes(), b',').unwrap()).unwrap()
    }

    fn spec(explanatory: &[&str]) -> RegressionSpec {
        RegressionSpec {
            dependent: "cases".into(),
            explanatory: explanatory.iter().map(|s| s.to_string()).collect(),
            apply_factor_flags: false,
        }
    }

    #[test]
    fn test_pvalue_z() {
        assert_abs_diff_eq!(pvalue_z(0.0), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(pvalue_z(1.959_964), 0.05, epsilon = 1e-5);
        assert_abs_diff_eq!(pvalue_z(-2.0), pvalue_z(2.0), epsilon = 1e-15);
        assert!(pvalue_z(f64::NAN).is_nan());
    }

    #[test]
    fn test_two_explanatory_columns_give_three_rows_per_block() {
        let ds = dataset(240);
        let result = run_regression(&ds, &spec(&["rain", "density"]), &FitConfig::default()).unwrap();

        assert_eq!(result.formula, "cases ~ rain + density");
        assert_eq!(result.n_conditional, 3);
        assert_eq!(result.coefficients.len(), 6);

        let names: Vec<&str> = result.coefficients.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Intercept",
                "rain",
                "density",
                "inflate_Intercept",
                "inflate_rain",
                "inflate_density"
            ]
        );

        for c in &result.coefficients {
            assert!(c.estimate.is_finite() && c.std_error.is_finite(), "{c:?}");
            assert!((0.0..=1.0).contains(&c.p_value), "{c:?}");
        }
        assert_eq!(result.n_obs, 240);
        assert!(result.alpha > 0.0);
        assert_abs_diff_eq!(
            result.aic,
            -2.0 * result.log_likelihood + 14.0,
            epsilon = 1e-9
        );
        assert!(result.bic > result.aic);
    }

    #[test]
    fn test_constant_column_fails_instead_of_returning_garbage() {
        let ds = dataset(240);
        let err = run_regression(&ds, &spec(&["rain", "constant"]), &FitConfig::default())
            .unwrap_err();
        assert!(matches!(err, RegressionError::SingularDesign(_)), "{err}");
    }

    #[test]
    fn test_empty_selection() {
        let ds = dataset(20);
        assert_eq!(
            run_regression(&ds, &spec(&[]), &FitConfig::default()).unwrap_err(),
            RegressionError::EmptySelection
        );
    }

    #[test]
    fn test_index_parts_are_categorical() {
        let ds = dataset(240);
        let formula = build_formula(
            "cases",
            &[Term::numeric("rain"), Term::categorical("region")],
        )
        .unwrap();
        let design = build_design(&ds, &formula).unwrap();
        assert_eq!(design.n_columns(), 2 + 3);
        assert!(design.column_names[2].starts_with("region[T."));
    }

    #[test]
    fn test_factor_flags_change_encoding_only_when_enabled() {
        let csv = "idx,y,grade\n,,sim\n2020011,1,1\n2020021,0,2\n2020031,3,3\n";
        let ds = build_dataset(&read_sheet(csv.as_bytes(), b',').unwrap()).unwrap();
        let mut s = RegressionSpec {
            dependent: "y".into(),
            explanatory: vec!["grade".into()],
            apply_factor_flags: false,
        };
        // 3 rows cannot support a fit either way; the formula tells the encodings apart.
        let plain = run_regression(&ds, &s, &FitConfig::default()).unwrap_err();
        assert!(matches!(plain, RegressionError::InsufficientData { params: 5, .. }), "{plain}");

        s.apply_factor_flags = true;
        let flagged = run_regression(&ds, &s, &FitConfig::default()).unwrap_err();
        assert!(matches!(flagged, RegressionError::InsufficientData { params: 7, .. }), "{flagged}");
    }

    #[test]
    fn test_column_named_like_a_factor_is_not_confused() {
        let csv = "idx,y,C(a),a\n,,,\n1,0,1.5,p\n2,2,2.5,q\n3,1,0.5,p\n4,3,4.0,q\n";
        let ds = build_dataset(&read_sheet(csv.as_bytes(), b',').unwrap()).unwrap();
        let err = run_regression(
            &ds,
            &RegressionSpec {
                dependent: "y".into(),
                explanatory: vec!["C(a)".into()],
                apply_factor_flags: false,
            },
            &FitConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, RegressionError::Formula { .. }), "{err}");
    }

    #[test]
    fn test_all_zero_response_is_rejected() {
        let csv = "idx,y,a\n,,\n1,0,1\n2,0,2\n3,0,3\n";
        let ds = build_dataset(&read_sheet(csv.as_bytes(), b',').unwrap()).unwrap();
        let err = run_regression(
            &ds,
            &RegressionSpec {
                dependent: "y".into(),
                explanatory: vec!["a".into()],
                apply_factor_flags: false,
            },
            &FitConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, RegressionError::InvalidResponse { .. }));
    }
}
