//! Seasonal ARIMA `(p, d, q) × (P, D, Q, s)` without a constant term.
//!
//! The series is differenced with `(1 - B)^d (1 - B^s)^D` and the remaining
//! ARMA part
//!
//! ```text
//! φ(B) Φ(B^s) w_t = θ(B) Θ(B^s) e_t
//! ```
//!
//! is estimated by conditional sum of squares. Coefficients are searched in
//! an unconstrained space and mapped through the partial-autocorrelation
//! (Durbin–Levinson) transform, which keeps AR polynomials stationary and
//! MA polynomials invertible. Forecasts set future shocks to zero and are
//! integrated back through the differencing polynomial.

use std::time::Instant;
use tracing::debug;

use crate::config::{Order, SeasonalOrder};
use crate::error::{RainfallError, Result};
use crate::forecast::optimizer::{NelderMead, StopReason};

/// Reflection coefficients are kept strictly inside (-1, 1) for start values.
const MAX_START_PACF: f64 = 0.95;

/// Model orders, before fitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SarimaSpec {
    pub order: Order,
    pub seasonal_order: SeasonalOrder,
}

/// Limits on the estimation.
#[derive(Debug, Clone, Copy)]
pub struct FitOptions {
    pub max_iterations: usize,
    pub deadline: Option<Instant>,
    /// Reported in [`RainfallError::FitTimedOut`].
    pub budget_secs: u64,
}

/// Fitted model, ready to forecast from the end of its training data.
#[derive(Debug, Clone)]
pub struct Sarima {
    spec: SarimaSpec,
    ar: Vec<f64>,
    ma: Vec<f64>,
    seasonal_ar: Vec<f64>,
    seasonal_ma: Vec<f64>,
    /// Lag polynomial `φ(B)Φ(B^s)` as `[1, a_1, a_2, ...]`.
    ar_poly: Vec<f64>,
    /// Lag polynomial `θ(B)Θ(B^s)` as `[1, m_1, m_2, ...]`.
    ma_poly: Vec<f64>,
    diff_poly: Vec<f64>,
    history: Vec<f64>,
    differenced: Vec<f64>,
    residuals: Vec<f64>,
    sigma2: f64,
    iterations: usize,
}

impl SarimaSpec {
    /// Seasonal period, or 0 when no seasonal term is configured.
    pub fn period(&self) -> usize {
        let s = &self.seasonal_order;
        if s.p + s.d + s.q == 0 { 0 } else { s.period }
    }

    fn param_count(&self) -> usize {
        self.order.p + self.order.q + self.seasonal_order.p + self.seasonal_order.q
    }

    /// Smallest series length that leaves more residuals than parameters,
    /// and never less than two seasonal cycles.
    pub fn min_observations(&self) -> usize {
        let s = self.period();
        let ar_lag = self.order.p + self.seasonal_order.p * s;
        let ma_lag = self.order.q + self.seasonal_order.q * s;
        let lost = self.order.d + self.seasonal_order.d * s + ar_lag.max(ma_lag);
        (2 * s).max(lost + self.param_count() + 1)
    }

    /// Estimates the coefficients on `data`.
    pub fn fit(&self, data: &[f64], options: &FitOptions) -> Result<Sarima> {
        let required = self.min_observations();
        if data.len() < required {
            return Err(RainfallError::InsufficientData {
                required,
                actual: data.len(),
            });
        }
        if data.iter().any(|x| !x.is_finite()) {
            return Err(RainfallError::InvalidConfig(
                "series contains NaN or infinite values".to_string(),
            ));
        }

        let s = self.period();
        let diff_poly = polymul(
            &power(&[1.0, -1.0], self.order.d),
            &power(&seasonal_lag(s, -1.0), self.seasonal_order.d),
        );
        let differenced = apply_poly(&diff_poly, data);

        let (p, q) = (self.order.p, self.order.q);
        let (sp, sq) = (self.seasonal_order.p, self.seasonal_order.q);

        let mut start = vec![0.0; self.param_count()];
        for (slot, r) in start.iter_mut().zip(partial_autocorrelations(&differenced, p)) {
            *slot = unconstrain(r.clamp(-MAX_START_PACF, MAX_START_PACF));
        }

        let objective = |params: &[f64]| {
            let coeffs = Coefficients::from_unconstrained(params, p, q, sp, sq);
            let (ar_poly, ma_poly) = coeffs.polynomials(s);
            let residuals = css_residuals(&ar_poly, &ma_poly, &differenced);
            let first = ar_poly.len() - 1;
            let n = (residuals.len() - first) as f64;
            residuals[first..].iter().map(|e| e * e).sum::<f64>() / n
        };

        let optimizer = NelderMead {
            max_iterations: options.max_iterations,
            deadline: options.deadline,
            ..Default::default()
        };
        let minimum = optimizer.minimize(objective, &start);
        debug!(
            iterations = minimum.iterations,
            sigma2 = minimum.value,
            stop = ?minimum.stop,
            "SARIMA estimation finished"
        );
        if minimum.stop == StopReason::Deadline {
            return Err(RainfallError::FitTimedOut {
                seconds: options.budget_secs,
            });
        }

        let coeffs = Coefficients::from_unconstrained(&minimum.point, p, q, sp, sq);
        let (ar_poly, ma_poly) = coeffs.polynomials(s);
        let residuals = css_residuals(&ar_poly, &ma_poly, &differenced);

        Ok(Sarima {
            spec: *self,
            ar: coeffs.ar,
            ma: coeffs.ma,
            seasonal_ar: coeffs.seasonal_ar,
            seasonal_ma: coeffs.seasonal_ma,
            ar_poly,
            ma_poly,
            diff_poly,
            history: data.to_vec(),
            differenced,
            residuals,
            sigma2: minimum.value,
            iterations: minimum.iterations,
        })
    }
}

impl Sarima {
    pub fn spec(&self) -> &SarimaSpec {
        &self.spec
    }

    /// Coefficients of `φ(B) = 1 - φ_1 B - ... - φ_p B^p`.
    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar
    }

    /// Coefficients of `θ(B) = 1 + θ_1 B + ... + θ_q B^q`.
    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma
    }

    pub fn seasonal_ar_coefficients(&self) -> &[f64] {
        &self.seasonal_ar
    }

    pub fn seasonal_ma_coefficients(&self) -> &[f64] {
        &self.seasonal_ma
    }

    /// Mean squared one-step residual of the fit.
    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Forecasts `steps` values past the end of the training data.
    pub fn predict(&self, steps: usize) -> Vec<f64> {
        let mut w = self.differenced.clone();
        let mut e = self.residuals.clone();

        for _ in 0..steps {
            let t = w.len();
            let ar: f64 = self.ar_poly[1..]
                .iter()
                .enumerate()
                .map(|(k, a)| a * w[t - k - 1])
                .sum();
            let ma: f64 = self.ma_poly[1..]
                .iter()
                .enumerate()
                .map(|(k, m)| m * e[t - k - 1])
                .sum();
            w.push(ma - ar);
            e.push(0.0);
        }

        let mut y = self.history.clone();
        for &wt in &w[self.differenced.len()..] {
            let t = y.len();
            let carried: f64 = self.diff_poly[1..]
                .iter()
                .enumerate()
                .map(|(k, c)| c * y[t - k - 1])
                .sum();
            y.push(wt - carried);
        }

        y.split_off(self.history.len())
    }
}

struct Coefficients {
    ar: Vec<f64>,
    ma: Vec<f64>,
    seasonal_ar: Vec<f64>,
    seasonal_ma: Vec<f64>,
}

impl Coefficients {
    /// Splits `[ar(p), ma(q), seasonal_ar(P), seasonal_ma(Q)]` and constrains each block.
    fn from_unconstrained(params: &[f64], p: usize, q: usize, sp: usize, sq: usize) -> Self {
        let (ar, rest) = params.split_at(p);
        let (ma, rest) = rest.split_at(q);
        let (seasonal_ar, seasonal_ma) = rest.split_at(sp);
        debug_assert_eq!(seasonal_ma.len(), sq);

        Self {
            ar: constrain_stationary(ar),
            ma: constrain_invertible(ma),
            seasonal_ar: constrain_stationary(seasonal_ar),
            seasonal_ma: constrain_invertible(seasonal_ma),
        }
    }

    fn polynomials(&self, period: usize) -> (Vec<f64>, Vec<f64>) {
        let ar = polymul(
            &lag_poly(&self.ar, 1, -1.0),
            &lag_poly(&self.seasonal_ar, period, -1.0),
        );
        let ma = polymul(
            &lag_poly(&self.ma, 1, 1.0),
            &lag_poly(&self.seasonal_ma, period, 1.0),
        );
        (ar, ma)
    }
}

/// `1 + sign * (c_1 B^stride + c_2 B^(2 stride) + ...)`.
fn lag_poly(coeffs: &[f64], stride: usize, sign: f64) -> Vec<f64> {
    let mut poly = vec![0.0; coeffs.len() * stride + 1];
    poly[0] = 1.0;
    for (i, c) in coeffs.iter().enumerate() {
        poly[(i + 1) * stride] = sign * c;
    }
    poly
}

/// `1 + sign * B^period`, or the identity when `period` is 0.
fn seasonal_lag(period: usize, sign: f64) -> Vec<f64> {
    if period == 0 {
        return vec![1.0];
    }
    lag_poly(&[1.0], period, sign)
}

fn polymul(a: &[f64], b: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, x) in a.iter().enumerate() {
        for (j, y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}

fn power(base: &[f64], exp: usize) -> Vec<f64> {
    (0..exp).fold(vec![1.0], |acc, _| polymul(&acc, base))
}

/// `Σ_k poly[k] · data[t - k]` for every `t` with a full window.
fn apply_poly(poly: &[f64], data: &[f64]) -> Vec<f64> {
    let lag = poly.len() - 1;
    (lag..data.len())
        .map(|t| poly.iter().enumerate().map(|(k, c)| c * data[t - k]).sum())
        .collect()
}

/// One-step residuals `e_t = a(B) w_t - (m(B) - 1) e_t`, conditioning on
/// zero shocks before the first full AR window.
fn css_residuals(ar_poly: &[f64], ma_poly: &[f64], w: &[f64]) -> Vec<f64> {
    let start = ar_poly.len() - 1;
    let mut e = vec![0.0; w.len()];
    for t in start..w.len() {
        let ar: f64 = ar_poly.iter().enumerate().map(|(k, a)| a * w[t - k]).sum();
        let ma: f64 = ma_poly[1..]
            .iter()
            .enumerate()
            .take_while(|(k, _)| k + 1 <= t)
            .map(|(k, m)| m * e[t - k - 1])
            .sum();
        e[t] = ar - ma;
    }
    e
}

/// Maps unconstrained reals to the coefficients of a stationary AR polynomial
/// `1 - φ_1 B - ... - φ_n B^n` via reflection coefficients `x / sqrt(1 + x²)`.
fn constrain_stationary(params: &[f64]) -> Vec<f64> {
    let mut phi: Vec<f64> = Vec::with_capacity(params.len());
    for (k, x) in params.iter().enumerate() {
        let r = x / (1.0 + x * x).sqrt();
        let prev = phi.clone();
        for j in 0..k {
            phi[j] = prev[j] - r * prev[k - 1 - j];
        }
        phi.push(r);
    }
    phi
}

/// Same mapping for MA polynomials `1 + θ_1 B + ...`, which are invertible
/// exactly when `1 - (-θ_1) B - ...` is stationary.
fn constrain_invertible(params: &[f64]) -> Vec<f64> {
    constrain_stationary(params).into_iter().map(|c| -c).collect()
}

fn unconstrain(r: f64) -> f64 {
    r / (1.0 - r * r).sqrt()
}

/// Sample partial autocorrelations at lags `1..=lags` (Durbin–Levinson).
fn partial_autocorrelations(data: &[f64], lags: usize) -> Vec<f64> {
    let n = data.len();
    if lags == 0 || n == 0 {
        return vec![0.0; lags];
    }

    let mean = data.iter().sum::<f64>() / n as f64;
    let centered: Vec<f64> = data.iter().map(|x| x - mean).collect();
    let acov: Vec<f64> = (0..=lags)
        .map(|k| (k..n).map(|i| centered[i] * centered[i - k]).sum::<f64>() / n as f64)
        .collect();
    if acov[0].abs() < 1e-12 {
        return vec![0.0; lags];
    }
    let rho: Vec<f64> = acov.iter().map(|c| c / acov[0]).collect();

    let mut phi: Vec<f64> = Vec::with_capacity(lags);
    let mut pacf = Vec::with_capacity(lags);
    for k in 1..=lags {
        let num = rho[k] - (1..k).map(|j| phi[j - 1] * rho[k - j]).sum::<f64>();
        let den = 1.0 - (1..k).map(|j| phi[j - 1] * rho[j]).sum::<f64>();
        let r = if den.abs() > 1e-12 { num / den } else { 0.0 };

        let prev = phi.clone();
        for j in 1..k {
            phi[j - 1] = prev[j - 1] - r * prev[k - j - 1];
        }
        phi.push(r);
        pacf.push(r);
    }
    pacf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(p: usize, d: usize, q: usize, sp: usize, sd: usize, sq: usize, s: usize) -> SarimaSpec {
        SarimaSpec {
            order: Order { p, d, q },
            seasonal_order: SeasonalOrder {
                p: sp,
                d: sd,
                q: sq,
                period: s,
            },
        }
    }

    fn options() -> FitOptions {
        FitOptions {
            max_iterations: 2000,
            deadline: None,
            budget_secs: 120,
        }
    }

    /// Deterministic pseudo-noise in [-0.5, 0.5).
    fn noise(len: usize, seed: u64) -> Vec<f64> {
        let mut state = seed;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                ((state >> 11) as f64 / (1u64 << 53) as f64) - 0.5
            })
            .collect()
    }

    #[test]
    fn test_min_observations() {
        assert_eq!(spec(5, 1, 0, 1, 1, 1, 12).min_observations(), 38);
        assert_eq!(spec(1, 1, 0, 0, 0, 0, 12).min_observations(), 4);
        assert_eq!(spec(0, 0, 0, 0, 1, 0, 7).min_observations(), 14);
    }

    #[test]
    fn test_polynomials() {
        assert_eq!(polymul(&[1.0, -1.0], &[1.0, 1.0]), vec![1.0, 0.0, -1.0]);
        assert_eq!(power(&[1.0, -1.0], 2), vec![1.0, -2.0, 1.0]);
        assert_eq!(power(&[1.0, -1.0], 0), vec![1.0]);
        assert_eq!(seasonal_lag(3, -1.0), vec![1.0, 0.0, 0.0, -1.0]);
        assert_eq!(lag_poly(&[0.5, 0.25], 2, -1.0), vec![1.0, 0.0, -0.5, 0.0, -0.25]);
    }

    #[test]
    fn test_apply_poly_differences() {
        let data = [1.0, 4.0, 9.0, 16.0];
        assert_eq!(apply_poly(&[1.0, -1.0], &data), vec![3.0, 5.0, 7.0]);
    }

    #[test]
    fn test_constrained_ar_is_stationary() {
        // AR(1): coefficient equals the reflection coefficient
        let phi = constrain_stationary(&[1.0]);
        assert!((phi[0] - 1.0 / 2f64.sqrt()).abs() < 1e-12);

        // large inputs stay inside the unit circle for AR(2)
        let phi = constrain_stationary(&[50.0, -50.0]);
        assert!(phi[1].abs() < 1.0);
        assert!(phi[0] + phi[1] < 1.0);
        assert!(phi[1] - phi[0] < 1.0);

        let theta = constrain_invertible(&[1.0]);
        assert!((theta[0] + 1.0 / 2f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_unconstrain_inverts_reflection() {
        let r = 0.6;
        let x = unconstrain(r);
        assert!((x / (1.0 + x * x).sqrt() - r).abs() < 1e-12);
    }

    #[test]
    fn test_pacf_of_ar1_process() {
        let shocks = noise(3000, 7);
        let mut x = vec![0.0];
        for e in &shocks[1..] {
            let last = x[x.len() - 1];
            x.push(0.7 * last + e);
        }
        let pacf = partial_autocorrelations(&x, 3);
        assert!((pacf[0] - 0.7).abs() < 0.05);
        assert!(pacf[1].abs() < 0.08);
    }

    #[test]
    fn test_recovers_ar1_coefficient() {
        let shocks = noise(2000, 11);
        let mut x = vec![0.0];
        for e in &shocks[1..] {
            let last = x[x.len() - 1];
            x.push(0.6 * last + e);
        }
        let model = spec(1, 0, 0, 0, 0, 0, 0).fit(&x, &options()).unwrap();
        assert!((model.ar_coefficients()[0] - 0.6).abs() < 0.05);
    }

    #[test]
    fn test_forecast_continues_linear_trend() {
        let data: Vec<f64> = (0..60).map(|t| 2.0 * t as f64 + 5.0).collect();
        let model = spec(0, 2, 0, 0, 0, 0, 0).fit(&data, &options()).unwrap();
        let forecast = model.predict(3);
        assert_eq!(forecast.len(), 3);
        for (h, value) in forecast.iter().enumerate() {
            let expected = 2.0 * (60 + h) as f64 + 5.0;
            assert!((value - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_forecast_repeats_seasonal_pattern() {
        let pattern = [3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0];
        let data: Vec<f64> = (0..70).map(|t| pattern[t % 7]).collect();
        let model = spec(0, 0, 0, 0, 1, 0, 7).fit(&data, &options()).unwrap();
        let forecast = model.predict(14);
        for (h, value) in forecast.iter().enumerate() {
            assert!((value - pattern[(70 + h) % 7]).abs() < 1e-9);
        }
    }

    #[test]
    fn test_default_orders_fit_and_forecast() {
        let shocks = noise(400, 3);
        let data: Vec<f64> = shocks
            .iter()
            .enumerate()
            .map(|(t, e)| 0.5 + 0.3 * (t as f64 * std::f64::consts::TAU / 12.0).sin() + 0.1 * e)
            .collect();
        let model = spec(5, 1, 0, 1, 1, 1, 12).fit(&data, &options()).unwrap();
        assert_eq!(model.ar_coefficients().len(), 5);
        assert_eq!(model.seasonal_ma_coefficients().len(), 1);
        assert!(model.sigma2().is_finite());

        let forecast = model.predict(365);
        assert_eq!(forecast.len(), 365);
        assert!(forecast.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_insufficient_data() {
        let data = vec![1.0; 20];
        let err = spec(5, 1, 0, 1, 1, 1, 12).fit(&data, &options()).unwrap_err();
        assert!(matches!(
            err,
            RainfallError::InsufficientData {
                required: 38,
                actual: 20
            }
        ));
    }

    #[test]
    fn test_expired_deadline_times_out() {
        let data: Vec<f64> = noise(200, 5);
        let opts = FitOptions {
            max_iterations: 2000,
            deadline: Some(Instant::now() - std::time::Duration::from_millis(1)),
            budget_secs: 0,
        };
        let err = spec(2, 0, 0, 0, 0, 0, 0).fit(&data, &opts).unwrap_err();
        assert!(matches!(err, RainfallError::FitTimedOut { seconds: 0 }));
    }
}
