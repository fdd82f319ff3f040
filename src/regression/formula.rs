//! Model formulas of the form `y ~ x1 + C(region) + x2`.
//!
//! Only main effects are supported. `C(name)` marks a term as categorical.

use std::collections::HashSet;
use std::fmt;

use super::error::{RegressionError, Result};

/// One right-hand-side term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub variable: String,
    pub categorical: bool,
}

impl Term {
    pub fn numeric(variable: &str) -> Self {
        Self {
            variable: variable.to_string(),
            categorical: false,
        }
    }

    pub fn categorical(variable: &str) -> Self {
        Self {
            variable: variable.to_string(),
            categorical: true,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.categorical {
            write!(f, "C({})", self.variable)
        } else {
            f.write_str(&self.variable)
        }
    }
}

/// A parsed `response ~ terms` formula. The intercept is always included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formula {
    pub response: String,
    pub terms: Vec<Term>,
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ~ ", self.response)?;
        for (i, term) in self.terms.iter().enumerate() {
            if i > 0 {
                f.write_str(" + ")?;
            }
            write!(f, "{term}")?;
        }
        Ok(())
    }
}

fn invalid(formula: &str, reason: impl Into<String>) -> RegressionError {
    RegressionError::Formula {
        formula: formula.to_string(),
        reason: reason.into(),
    }
}

/// Parse one term: `name` or `C(name)`.
fn parse_term(formula: &str, raw: &str) -> Result<Term> {
    let raw = raw.trim();
    let term = match raw.strip_prefix("C(") {
        Some(rest) => {
            let inner = rest
                .strip_suffix(')')
                .ok_or_else(|| invalid(formula, format!("unbalanced parenthesis in '{raw}'")))?;
            Term::categorical(inner.trim())
        }
        None => Term::numeric(raw),
    };

    if term.variable.is_empty() {
        return Err(invalid(formula, "empty term"));
    }
    if term.variable.contains(['(', ')']) {
        return Err(invalid(formula, format!("unsupported term '{raw}'")));
    }
    Ok(term)
}

/// Parse a formula string.
///
/// Errors on a missing or repeated `~`, an empty side, empty or duplicated
/// terms, and a term equal to the response.
pub fn parse_formula(formula: &str) -> Result<Formula> {
    let parts: Vec<&str> = formula.split('~').collect();
    if parts.len() != 2 {
        return Err(invalid(formula, "must contain exactly one '~'"));
    }

    let response = parts[0].trim();
    if response.is_empty() {
        return Err(invalid(formula, "missing response"));
    }
    if parts[1].trim().is_empty() {
        return Err(invalid(formula, "missing explanatory terms"));
    }

    let mut seen = HashSet::new();
    let mut terms = Vec::new();
    for raw in parts[1].split('+') {
        let term = parse_term(formula, raw)?;
        if term.variable == response {
            return Err(invalid(formula, format!("'{response}' is both response and term")));
        }
        if !seen.insert(term.variable.clone()) {
            return Err(invalid(formula, format!("duplicate term '{}'", term.variable)));
        }
        terms.push(term);
    }

    Ok(Formula {
        response: response.to_string(),
        terms,
    })
}

/// Render `response ~ t1 + t2 + ...` for the selected terms and parse it
/// back, so column names that cannot be expressed in a formula are caught
/// here rather than producing a silently different model.
pub fn build_formula(response: &str, terms: &[Term]) -> Result<Formula> {
    let rendered = Formula {
        response: response.to_string(),
        terms: terms.to_vec(),
    }
    .to_string();
    let parsed = parse_formula(&rendered)?;
    if parsed.response != response || parsed.terms != terms {
        return Err(invalid(&rendered, "column names cannot be expressed as a formula"));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let f = parse_formula("cases ~ rain + temp").unwrap();
        assert_eq!(f.response, "cases");
        assert_eq!(f.terms, vec![Term::numeric("rain"), Term::numeric("temp")]);
    }

    #[test]
    fn test_parse_categorical() {
        let f = parse_formula("y ~ C(region) +x").unwrap();
        assert_eq!(f.terms, vec![Term::categorical("region"), Term::numeric("x")]);
        assert_eq!(f.to_string(), "y ~ C(region) + x");
    }

    #[test]
    fn test_parse_errors() {
        for bad in [
            "y x",
            "y ~ a ~ b",
            " ~ a",
            "y ~ ",
            "y ~ a + ",
            "y ~ a + a",
            "y ~ y",
            "y ~ C(a",
            "y ~ log(a)",
        ] {
            assert!(
                matches!(parse_formula(bad), Err(RegressionError::Formula { .. })),
                "{bad} should not parse"
            );
        }
    }

    #[test]
    fn test_build_formula() {
        let f = build_formula("cases", &[Term::numeric("rain"), Term::categorical("month")]).unwrap();
        assert_eq!(f.to_string(), "cases ~ rain + C(month)");
    }

    #[test]
    fn test_build_formula_rejects_unrepresentable_names() {
        let err = build_formula("cases", &[Term::numeric("a+b")]).unwrap_err();
        assert!(matches!(err, RegressionError::Formula { .. }));
    }

    #[test]
    fn test_build_formula_rejects_names_that_change_meaning() {
        // would parse back as the categorical column `a`
        let err = build_formula("y", &[Term::numeric("C(a)")]).unwrap_err();
        assert!(matches!(err, RegressionError::Formula { .. }), "{err}");

        let err = build_formula(" y", &[Term::numeric("a")]).unwrap_err();
        assert!(matches!(err, RegressionError::Formula { .. }), "{err}");

        let err = build_formula("y", &[Term::numeric(" a")]).unwrap_err();
        assert!(matches!(err, RegressionError::Formula { .. }), "{err}");
    }
}
