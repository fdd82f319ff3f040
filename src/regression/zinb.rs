// =============================================================================
// Zero-Inflated Negative Binomial: maximum likelihood
// =============================================================================
//
// Each count is a mixture of a structural zero (probability π) and an NB2
// draw with mean μ and dispersion α:
//
//     P(Y = 0) = π + (1 − π)·(r / (r + μ))^r              r = 1/α
//     P(Y = y) = (1 − π)·NB(y; μ, r)                      y > 0
//
//     log μ = Xβ          logit π = Xγ          log α = τ
//
// Both parts use the same X. Parameters are stacked as θ = [β, γ, τ].
//
// The fit is Newton–Raphson on the log-likelihood with the analytic gradient
// and a Hessian from central differences of that gradient. When −H is not
// positive definite the step is damped (Levenberg) until it is, and every
// step is halved until the log-likelihood does not decrease.
//
// =============================================================================

use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2, s};
use statrs::function::gamma::{digamma, ln_gamma};

use super::error::{RegressionError, Result};
use crate::config::FitConfig;

/// Clamp on the count-model linear predictor, keeps exp() finite.
const ETA_MAX: f64 = 30.0;

/// Largest allowed component of a Newton step.
const MAX_STEP: f64 = 5.0;

/// Step halvings before a line search gives up.
const MAX_HALVINGS: usize = 40;

// =============================================================================
// Result
// =============================================================================

/// A converged ZINB fit.
#[derive(Debug, Clone)]
pub struct ZinbFit {
    /// `[β (p), γ (p), log α]`.
    pub params: Array1<f64>,
    /// Inverse observed information, same layout as `params`.
    pub covariance: Array2<f64>,
    pub log_likelihood: f64,
    pub iterations: usize,
    /// Design columns per part.
    pub p: usize,
}

impl ZinbFit {
    pub fn std_errors(&self) -> Array1<f64> {
        self.covariance.diag().mapv(f64::sqrt)
    }

    /// Dispersion α = exp(τ).
    pub fn alpha(&self) -> f64 {
        self.params[2 * self.p].exp()
    }

    /// Standard error of α by the delta method.
    pub fn alpha_std_error(&self) -> f64 {
        let k = 2 * self.p;
        self.alpha() * self.covariance[[k, k]].sqrt()
    }
}

// =============================================================================
// Scalar helpers
// =============================================================================

/// ln(1 + eᶻ) without overflow.
fn softplus(z: f64) -> f64 {
    if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}

fn logistic(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// ln(eᵃ + eᵇ).
fn log_add_exp(a: f64, b: f64) -> f64 {
    let m = a.max(b);
    if m == f64::NEG_INFINITY {
        return m;
    }
    m + ((a - m).exp() + (b - m).exp()).ln()
}

fn max_abs(v: &Array1<f64>) -> f64 {
    v.iter().fold(0.0_f64, |acc, g| acc.max(g.abs()))
}

// =============================================================================
// Log-likelihood and derivatives
// =============================================================================

struct Zinb<'a> {
    y: &'a Array1<f64>,
    x: &'a Array2<f64>,
    ln_y_factorial: Array1<f64>,
}

impl<'a> Zinb<'a> {
    fn new(y: &'a Array1<f64>, x: &'a Array2<f64>) -> Self {
        Self {
            y,
            x,
            ln_y_factorial: y.mapv(|v| ln_gamma(v + 1.0)),
        }
    }

    fn p(&self) -> usize {
        self.x.ncols()
    }

    fn n_params(&self) -> usize {
        2 * self.p() + 1
    }

    /// (η, ζ, τ) for a parameter vector.
    fn predictors(&self, theta: &Array1<f64>) -> (Array1<f64>, Array1<f64>, f64) {
        let p = self.p();
        let eta = self
            .x
            .dot(&theta.slice(s![..p]))
            .mapv(|e| e.clamp(-ETA_MAX, ETA_MAX));
        let zeta = self.x.dot(&theta.slice(s![p..2 * p]));
        (eta, zeta, theta[2 * p])
    }

    fn log_likelihood(&self, theta: &Array1<f64>) -> f64 {
        let (eta, zeta, tau) = self.predictors(theta);
        let alpha = tau.exp();
        let r = 1.0 / alpha;
        let ln_gamma_r = ln_gamma(r);

        let mut ll = 0.0;
        for (i, &y) in self.y.iter().enumerate() {
            let mu = eta[i].exp();
            let ln_pi = -softplus(-zeta[i]);
            let ln_1m_pi = -softplus(zeta[i]);
            // ln(r / (r + μ))
            let ln_q = -(mu * alpha).ln_1p();

            ll += if y == 0.0 {
                log_add_exp(ln_pi, ln_1m_pi + r * ln_q)
            } else {
                ln_1m_pi + ln_gamma(y + r) - ln_gamma_r - self.ln_y_factorial[i]
                    + r * ln_q
                    + y * (eta[i] - (r + mu).ln())
            };
        }
        ll
    }

    fn gradient(&self, theta: &Array1<f64>) -> Array1<f64> {
        let (eta, zeta, tau) = self.predictors(theta);
        let alpha = tau.exp();
        let r = 1.0 / alpha;
        let psi_r = digamma(r);

        let n = self.y.len();
        let mut g_eta = Array1::<f64>::zeros(n);
        let mut g_zeta = Array1::<f64>::zeros(n);
        let mut g_tau = 0.0;

        for (i, &y) in self.y.iter().enumerate() {
            let mu = eta[i].exp();
            let pi = logistic(zeta[i]);
            let ln_q = -(mu * alpha).ln_1p();

            if y == 0.0 {
                let ln_pi = -softplus(-zeta[i]);
                let ln_1m_pi = -softplus(zeta[i]);
                let ln_f0 = r * ln_q;
                // posterior weight of the count component
                let w = (ln_1m_pi + ln_f0 - log_add_exp(ln_pi, ln_1m_pi + ln_f0)).exp();
                g_eta[i] = -w * r * mu / (r + mu);
                g_zeta[i] = (1.0 - w) - pi;
                g_tau -= w * r * (ln_q + mu / (r + mu));
            } else {
                g_eta[i] = r * (y - mu) / (r + mu);
                g_zeta[i] = -pi;
                g_tau -= r * (digamma(y + r) - psi_r + ln_q + (mu - y) / (r + mu));
            }
        }

        let p = self.p();
        let mut grad = Array1::<f64>::zeros(self.n_params());
        grad.slice_mut(s![..p]).assign(&self.x.t().dot(&g_eta));
        grad.slice_mut(s![p..2 * p]).assign(&self.x.t().dot(&g_zeta));
        grad[2 * p] = g_tau;
        grad
    }

    /// Symmetrised central-difference Jacobian of the gradient.
    fn hessian(&self, theta: &Array1<f64>) -> Array2<f64> {
        let k = self.n_params();
        let mut h = Array2::<f64>::zeros((k, k));
        for j in 0..k {
            let step = 1e-5 * theta[j].abs().max(1.0);
            let mut up = theta.clone();
            up[j] += step;
            let mut down = theta.clone();
            down[j] -= step;
            let column = (self.gradient(&up) - self.gradient(&down)) / (2.0 * step);
            h.column_mut(j).assign(&column);
        }
        (&h + &h.t()) * 0.5
    }
}

// =============================================================================
// Starting values
// =============================================================================

/// Poisson GLM (log link) by IRLS: the starting point for β.
fn poisson_irls(y: &Array1<f64>, x: &Array2<f64>) -> Option<Array1<f64>> {
    let (n, p) = x.dim();
    let y_mean = y.mean()?;
    let mut mu = y.mapv(|v| (v + y_mean) / 2.0 + 0.1);
    let mut eta = mu.mapv(f64::ln);
    let mut beta = Array1::<f64>::zeros(p);
    let mut deviance_old = f64::INFINITY;

    for _ in 0..25 {
        let z = &eta + &((y - &mu) / &mu);
        let xtwx = DMatrix::from_fn(p, p, |a, b| {
            (0..n).map(|i| x[[i, a]] * mu[i] * x[[i, b]]).sum::<f64>()
        });
        let xtwz = DVector::from_fn(p, |a, _| (0..n).map(|i| x[[i, a]] * mu[i] * z[i]).sum::<f64>());
        let solution = xtwx.cholesky()?.solve(&xtwz);
        beta = Array1::from_iter(solution.iter().copied());

        eta = x.dot(&beta).mapv(|e| e.clamp(-ETA_MAX, ETA_MAX));
        mu = eta.mapv(f64::exp);

        let deviance: f64 = 2.0
            * y.iter()
                .zip(mu.iter())
                .map(|(&yi, &mi)| {
                    let term = if yi > 0.0 { yi * (yi / mi).ln() } else { 0.0 };
                    term - (yi - mi)
                })
                .sum::<f64>();
        if (deviance - deviance_old).abs() / (deviance.abs() + 0.1) < 1e-8 {
            break;
        }
        deviance_old = deviance;
    }

    if beta.iter().all(|b| b.is_finite()) {
        Some(beta)
    } else {
        None
    }
}

fn start_values(y: &Array1<f64>, x: &Array2<f64>) -> Array1<f64> {
    let (n, p) = x.dim();
    let y_mean = y.mean().unwrap_or(0.0);

    let beta = poisson_irls(y, x).unwrap_or_else(|| {
        log::debug!("Poisson start failed; using intercept-only start");
        let mut b = Array1::zeros(p);
        b[0] = (y_mean + 0.1).ln();
        b
    });

    // Share of zeros the Poisson fit cannot explain.
    let observed_zeros = y.iter().filter(|v| **v == 0.0).count() as f64;
    let expected_zeros: f64 = x
        .dot(&beta)
        .iter()
        .map(|e| (-e.clamp(-ETA_MAX, ETA_MAX).exp()).exp())
        .sum();
    let excess = ((observed_zeros - expected_zeros) / n as f64).clamp(0.05, 0.5);

    let mut theta = Array1::<f64>::zeros(2 * p + 1);
    theta.slice_mut(s![..p]).assign(&beta);
    theta[p] = (excess / (1.0 - excess)).ln();
    theta
}

// =============================================================================
// Newton iterations
// =============================================================================

/// Solve (−H + λI)·d = g, raising λ until −H + λI is positive definite.
fn newton_direction(hess: &Array2<f64>, grad: &Array1<f64>) -> Array1<f64> {
    let k = grad.len();
    let info = DMatrix::from_fn(k, k, |i, j| -hess[[i, j]]);
    let g = DVector::from_iterator(k, grad.iter().copied());
    let scale = (0..k)
        .map(|i| info[(i, i)].abs())
        .fold(0.0_f64, f64::max)
        .max(1.0);

    let mut damping = 0.0;
    for _ in 0..16 {
        let mut m = info.clone();
        for i in 0..k {
            m[(i, i)] += damping;
        }
        if let Some(chol) = m.cholesky() {
            let d = chol.solve(&g);
            return Array1::from_iter(d.iter().copied());
        }
        damping = if damping == 0.0 { 1e-8 * scale } else { damping * 10.0 };
    }

    log::debug!("information matrix not positive definite after damping; gradient step");
    grad / scale
}

/// Halve the step until the log-likelihood does not decrease.
fn line_search(
    model: &Zinb<'_>,
    theta: &Array1<f64>,
    ll: f64,
    direction: &Array1<f64>,
) -> Option<(Array1<f64>, f64)> {
    let longest = max_abs(direction);
    let mut t = if longest > MAX_STEP { MAX_STEP / longest } else { 1.0 };

    for _ in 0..MAX_HALVINGS {
        let candidate = theta + &(direction * t);
        let candidate_ll = model.log_likelihood(&candidate);
        if candidate_ll.is_finite() && candidate_ll >= ll {
            return Some((candidate, candidate_ll));
        }
        t *= 0.5;
    }
    None
}

/// Fit a ZINB model with the same design matrix for the count and the
/// inflation part.
///
/// Convergence is declared when every component of the per-observation
/// gradient is below `config.tolerance`.
pub fn fit_zinb(y: &Array1<f64>, x: &Array2<f64>, config: &FitConfig) -> Result<ZinbFit> {
    let model = Zinb::new(y, x);
    let n = y.len();
    let k = model.n_params();
    if n <= k {
        return Err(RegressionError::InsufficientData { rows: n, params: k });
    }

    let mut theta = start_values(y, x);
    let mut ll = model.log_likelihood(&theta);
    if !ll.is_finite() {
        return Err(RegressionError::Numerical(
            "log-likelihood is not finite at the starting values".into(),
        ));
    }

    let mut iterations = 0;
    let mut grad_max;
    loop {
        let grad = model.gradient(&theta);
        grad_max = max_abs(&grad) / n as f64;
        if !grad_max.is_finite() {
            return Err(RegressionError::Numerical("gradient is not finite".into()));
        }
        if grad_max < config.tolerance || iterations >= config.max_iterations {
            break;
        }

        iterations += 1;
        let direction = newton_direction(&model.hessian(&theta), &grad);
        match line_search(&model, &theta, ll, &direction) {
            Some((next, next_ll)) => {
                log::debug!(
                    "iteration {iterations}: log-likelihood {next_ll:.6} (max |gradient| {grad_max:.3e})"
                );
                theta = next;
                ll = next_ll;
            }
            None => {
                log::debug!("line search stalled at iteration {iterations}");
                break;
            }
        }
    }

    if grad_max >= config.tolerance {
        return Err(RegressionError::NoConvergence {
            iterations,
            gradient: grad_max,
        });
    }

    let hess = model.hessian(&theta);
    let info = DMatrix::from_fn(k, k, |i, j| -hess[[i, j]]);
    let inverse = info
        .cholesky()
        .ok_or_else(|| {
            RegressionError::Numerical("observed information matrix is not positive definite".into())
        })?
        .inverse();
    let covariance = Array2::from_shape_fn((k, k), |(i, j)| inverse[(i, j)]);

    if theta.iter().chain(covariance.diag().iter()).any(|v| !v.is_finite()) {
        return Err(RegressionError::Numerical(
            "estimates or standard errors are not finite".into(),
        ));
    }

    log::info!("ZINB converged in {iterations} iteration(s), log-likelihood {ll:.4}");
    Ok(ZinbFit {
        params: theta,
        covariance,
        log_likelihood: ll,
        iterations,
        p: x.ncols(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// Overdispersed counts with structural zeros spread over the design.
    fn synthetic(n: usize) -> (Array1<f64>, Array2<f64>) {
        const MULTIPLIERS: [f64; 7] = [0.15, 0.45, 0.8, 1.0, 1.3, 1.9, 2.6];
        let mut x = Array2::<f64>::zeros((n, 3));
        let mut y = Array1::<f64>::zeros(n);
        for i in 0..n {
            let x1 = (i % 6) as f64 * 0.5;
            let x2 = ((i / 6) % 4) as f64;
            x[[i, 0]] = 1.0;
            x[[i, 1]] = x1;
            x[[i, 2]] = x2;
            let mu = (0.8 + 0.35 * x1 - 0.25 * x2).exp();
            let structural_zero = i % 5 == 2;
            y[i] = if structural_zero {
                0.0
            } else {
                (mu * MULTIPLIERS[i % 7]).round()
            };
        }
        (y, x)
    }

    #[test]
    fn test_scalar_helpers() {
        assert_abs_diff_eq!(softplus(0.0), 2.0_f64.ln(), epsilon = 1e-12);
        assert_abs_diff_eq!(softplus(800.0), 800.0, epsilon = 1e-9);
        assert_abs_diff_eq!(softplus(-800.0), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(logistic(0.0), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(log_add_exp(0.0, 0.0), 2.0_f64.ln(), epsilon = 1e-12);
        assert_eq!(log_add_exp(f64::NEG_INFINITY, f64::NEG_INFINITY), f64::NEG_INFINITY);
    }

    #[test]
    fn test_gradient_matches_finite_differences() {
        let (y, x) = synthetic(60);
        let model = Zinb::new(&y, &x);
        let theta = Array1::from_vec(vec![0.5, 0.2, -0.1, -1.5, 0.1, 0.05, -0.4]);

        let grad = model.gradient(&theta);
        for j in 0..theta.len() {
            let h = 1e-6;
            let mut up = theta.clone();
            up[j] += h;
            let mut down = theta.clone();
            down[j] -= h;
            let numeric = (model.log_likelihood(&up) - model.log_likelihood(&down)) / (2.0 * h);
            assert_abs_diff_eq!(grad[j], numeric, epsilon = 1e-4 * (1.0 + numeric.abs()));
        }
    }

    #[test]
    fn test_fit_converges_on_overdispersed_counts() {
        let (y, x) = synthetic(240);
        let fit = fit_zinb(&y, &x, &FitConfig::default()).unwrap();

        assert_eq!(fit.params.len(), 7);
        assert!(fit.log_likelihood < 0.0);
        assert!(fit.alpha() > 0.0);
        assert!(fit.std_errors().iter().all(|se| se.is_finite() && *se > 0.0));
        // x1 raises the mean, x2 lowers it
        assert!(fit.params[1] > 0.0);
        assert!(fit.params[2] < 0.0);
        assert_eq!(fit.p, 3);
    }

    #[test]
    fn test_too_few_rows() {
        let (y, x) = synthetic(6);
        let err = fit_zinb(&y, &x, &FitConfig::default()).unwrap_err();
        assert_eq!(err, RegressionError::InsufficientData { rows: 6, params: 7 });
    }

    #[test]
    fn test_iteration_cap_reports_no_convergence() {
        let (y, x) = synthetic(240);
        let config = FitConfig {
            max_iterations: 0,
            tolerance: 1e-12,
        };
        let err = fit_zinb(&y, &x, &config).unwrap_err();
        assert!(matches!(err, RegressionError::NoConvergence { iterations: 0, .. }));
    }
}
