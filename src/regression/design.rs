use std::collections::BTreeSet;

use nalgebra::DMatrix;
use ndarray::{Array1, Array2};

use super::error::{RegressionError, Result};
use super::formula::Formula;
use crate::data::model::{CellValue, Column, PanelDataset};

/// Name of the intercept column.
pub const INTERCEPT: &str = "Intercept";

/// Smallest accepted ratio of singular values of X.
const RANK_TOLERANCE: f64 = 1e-10;

/// Response vector and predictor matrix for one formula.
#[derive(Debug, Clone)]
pub struct DesignMatrices {
    pub y: Array1<f64>,
    /// n × p, intercept first.
    pub x: Array2<f64>,
    /// One name per column of `x`.
    pub column_names: Vec<String>,
    /// Rows dropped for a null in any used column.
    pub dropped_rows: usize,
}

impl DesignMatrices {
    pub fn n_obs(&self) -> usize {
        self.x.nrows()
    }

    pub fn n_columns(&self) -> usize {
        self.x.ncols()
    }
}

fn lookup<'a>(dataset: &'a PanelDataset, name: &str) -> Result<&'a Column> {
    dataset
        .column(name)
        .ok_or_else(|| RegressionError::UnknownColumn(name.to_string()))
}

/// Materialise `y` and `X` for a formula.
///
/// Numeric terms enter as-is. Categorical terms (and any text column) are
/// treatment coded against their first sorted level, one indicator column
/// per remaining level, named `var[T.level]`.
pub fn build_design(dataset: &PanelDataset, formula: &Formula) -> Result<DesignMatrices> {
    let response = lookup(dataset, &formula.response)?;
    if !response.is_numeric() {
        return Err(RegressionError::InvalidResponse {
            column: formula.response.clone(),
            reason: "is not numeric".into(),
        });
    }

    let terms: Vec<(&Column, bool)> = formula
        .terms
        .iter()
        .map(|t| {
            let col = lookup(dataset, &t.variable)?;
            Ok((col, t.categorical || !col.is_numeric()))
        })
        .collect::<Result<_>>()?;

    // Complete cases only.
    let rows: Vec<usize> = (0..dataset.len())
        .filter(|&i| {
            !response.values[i].is_null() && terms.iter().all(|(c, _)| !c.values[i].is_null())
        })
        .collect();
    let dropped_rows = dataset.len() - rows.len();
    if dropped_rows > 0 {
        log::info!("dropping {dropped_rows} row(s) with missing values");
    }

    let y: Vec<f64> = rows
        .iter()
        .filter_map(|&i| response.values[i].as_f64())
        .collect();
    if let Some(bad) = y.iter().find(|v| **v < 0.0 || v.fract() != 0.0) {
        return Err(RegressionError::InvalidResponse {
            column: formula.response.clone(),
            reason: format!("must hold non-negative integer counts (found {bad})"),
        });
    }

    let mut names = vec![INTERCEPT.to_string()];
    let mut columns: Vec<Vec<f64>> = vec![vec![1.0; rows.len()]];

    for (col, categorical) in &terms {
        if *categorical {
            let levels: BTreeSet<&CellValue> = rows.iter().map(|&i| &col.values[i]).collect();
            if levels.len() < 2 {
                return Err(RegressionError::SingularDesign(format!(
                    "categorical column '{}' has a single level",
                    col.name()
                )));
            }
            for level in levels.into_iter().skip(1) {
                names.push(format!("{}[T.{level}]", col.name()));
                columns.push(
                    rows.iter()
                        .map(|&i| if &col.values[i] == level { 1.0 } else { 0.0 })
                        .collect(),
                );
            }
        } else {
            let values: Vec<f64> = rows
                .iter()
                .filter_map(|&i| col.values[i].as_f64())
                .collect();
            if values.windows(2).all(|w| w[0] == w[1]) {
                return Err(RegressionError::SingularDesign(format!(
                    "column '{}' is constant",
                    col.name()
                )));
            }
            names.push(col.name().to_string());
            columns.push(values);
        }
    }

    let n = rows.len();
    let p = columns.len();
    let x = Array2::from_shape_fn((n, p), |(i, j)| columns[j][i]);

    check_rank(&x)?;

    Ok(DesignMatrices {
        y: Array1::from_vec(y),
        x,
        column_names: names,
        dropped_rows,
    })
}

/// Reject X whose columns are linearly dependent.
fn check_rank(x: &Array2<f64>) -> Result<()> {
    let (n, p) = x.dim();
    if n < p {
        return Err(RegressionError::SingularDesign(format!(
            "{n} row(s) for {p} design columns"
        )));
    }
    let m = DMatrix::from_fn(n, p, |i, j| x[[i, j]]);
    let sv = m.singular_values();
    let max = sv.max();
    let min = sv.min();
    if max.is_nan() || max <= 0.0 || min / max < RANK_TOLERANCE {
        return Err(RegressionError::SingularDesign(
            "design columns are linearly dependent".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::{build_dataset, read_sheet};
    use crate::regression::formula::parse_formula;

    fn dataset(csv: &str) -> PanelDataset {
        build_dataset(&read_sheet(csv.as_bytes(), b',').unwrap()).unwrap()
    }

    const CSV: &str = "\
idx,y,a,g
,,,
2020011,0,1.0,x
2020021,2,2.0,y
2020031,5,,z
2020041,1,4.0,x
2020051,3,3.5,z
";

    #[test]
    fn test_numeric_and_text_terms() {
        let ds = dataset(CSV);
        let d = build_design(&ds, &parse_formula("y ~ a + g").unwrap()).unwrap();
        assert_eq!(d.column_names, vec!["Intercept", "a", "g[T.y]", "g[T.z]"]);
        assert_eq!(d.dropped_rows, 1);
        assert_eq!(d.n_obs(), 4);
        assert_eq!(d.y.to_vec(), vec![0.0, 2.0, 1.0, 3.0]);
        assert_eq!(d.x.column(1).to_vec(), vec![1.0, 2.0, 4.0, 3.5]);
        assert_eq!(d.x.column(2).to_vec(), vec![0.0, 1.0, 0.0, 0.0]);
        assert_eq!(d.x.column(3).to_vec(), vec![0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_numeric_column_as_factor() {
        let ds = dataset("idx,y,m\n,,\n1,1,1\n2,2,2\n3,0,1\n4,4,3\n");
        let d = build_design(&ds, &parse_formula("y ~ C(m)").unwrap()).unwrap();
        assert_eq!(d.column_names, vec!["Intercept", "m[T.2]", "m[T.3]"]);
    }

    #[test]
    fn test_constant_column_is_singular() {
        let ds = dataset("idx,y,a,b\n,,,\n1,1,7,1\n2,2,7,2\n3,0,7,4\n");
        let err = build_design(&ds, &parse_formula("y ~ b + a").unwrap()).unwrap_err();
        assert_eq!(err, RegressionError::SingularDesign("column 'a' is constant".into()));
    }

    #[test]
    fn test_collinear_columns_are_singular() {
        let ds = dataset("idx,y,a,b\n,,,\n1,1,1,2\n2,2,2,4\n3,0,3,6\n4,1,5,10\n");
        let err = build_design(&ds, &parse_formula("y ~ a + b").unwrap()).unwrap_err();
        assert!(matches!(err, RegressionError::SingularDesign(_)));
    }

    #[test]
    fn test_response_must_be_counts() {
        let ds = dataset("idx,y,a\n,,\n1,1.5,1\n2,2,2\n");
        let err = build_design(&ds, &parse_formula("y ~ a").unwrap()).unwrap_err();
        assert!(matches!(err, RegressionError::InvalidResponse { .. }));

        let ds = dataset("idx,y,a\n,,\n1,-1,1\n2,2,2\n");
        assert!(build_design(&ds, &parse_formula("y ~ a").unwrap()).is_err());
    }

    #[test]
    fn test_unknown_column() {
        let ds = dataset(CSV);
        let err = build_design(&ds, &parse_formula("y ~ nope").unwrap()).unwrap_err();
        assert_eq!(err, RegressionError::UnknownColumn("nope".into()));
    }
}
