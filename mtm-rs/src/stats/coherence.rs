use crate::kernel::{ConfigError, KernelLifecycle};
use core::fmt::Debug;
use serde::{Deserialize, Serialize};

/// Significance functions for magnitude-squared coherence estimates.
pub trait CoherenceStatistics: Debug + Send + Sync {
    /// Critical coherence magnitude at `significance` for a true coherence of
    /// zero and `dof` equivalent degrees of freedom.
    fn coherence_confidence(&self, dof: f64, significance: f64) -> f64;

    /// Map each estimated coherence magnitude to the true coherence whose
    /// expected estimate it is. Output has the same length as `coherence`.
    fn correct_bias(&self, dof: f64, coherence: &[f64]) -> Vec<f64>;
}

/// Constructor config for [`GoodmanCoherenceStats`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoodmanConfig {
    /// Points on the true-coherence grid in `[0, 1]`.
    pub grid_points: usize,
    /// Simpson intervals used for each expectation integral.
    pub intervals: usize,
}

impl Default for GoodmanConfig {
    fn default() -> Self {
        Self {
            grid_points: 101,
            intervals: 2000,
        }
    }
}

/// Coherence statistics from the Goodman distribution of the
/// magnitude-squared coherence estimate.
///
/// For `n` independent spectral estimates and true squared coherence `g`, the
/// estimate `x` has density
/// `(n-1) (1-g)^n (1-x)^(n-2) (1-gx)^(1-2n) sum_k C(n-1,k)^2 (gx)^k`.
/// Bias correction tabulates `E[sqrt(x) | g]` on a grid and inverts it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoodmanCoherenceStats {
    grid_points: usize,
    intervals: usize,
}

impl Default for GoodmanCoherenceStats {
    fn default() -> Self {
        let config = GoodmanConfig::default();
        Self {
            grid_points: config.grid_points,
            intervals: config.intervals,
        }
    }
}

impl KernelLifecycle for GoodmanCoherenceStats {
    type Config = GoodmanConfig;

    fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
        if config.grid_points < 2 {
            return Err(ConfigError::InvalidArgument {
                arg: "grid_points",
                reason: "grid must contain at least 2 points",
            });
        }
        if config.intervals < 2 {
            return Err(ConfigError::InvalidArgument {
                arg: "intervals",
                reason: "integration needs at least 2 intervals",
            });
        }
        Ok(Self {
            grid_points: config.grid_points,
            // Simpson's rule needs an even interval count.
            intervals: config.intervals + config.intervals % 2,
        })
    }
}

impl GoodmanCoherenceStats {
    /// Tabulated `(true coherence, expected estimate)` pairs for `n` estimates.
    pub fn expectation_curve(&self, n: usize) -> Vec<(f64, f64)> {
        let table = BinomialTable::new(n);
        let last = (self.grid_points - 1) as f64;
        let mut running = 0.0f64;
        (0..self.grid_points)
            .map(|i| {
                let gamma = i as f64 / last;
                let expected = expected_magnitude(&table, gamma, self.intervals);
                // Quadrature noise must not break monotonicity of the lookup.
                running = running.max(expected);
                (gamma, running)
            })
            .collect()
    }
}

impl CoherenceStatistics for GoodmanCoherenceStats {
    fn coherence_confidence(&self, dof: f64, significance: f64) -> f64 {
        let n = estimate_count(dof) as f64;
        (1.0 - (1.0 - significance).powf(1.0 / (n - 1.0))).sqrt()
    }

    fn correct_bias(&self, dof: f64, coherence: &[f64]) -> Vec<f64> {
        let curve = self.expectation_curve(estimate_count(dof));
        coherence.iter().map(|c| invert_curve(&curve, *c)).collect()
    }
}

///
/// Critical coherence magnitude for `dof` degrees of freedom at `significance`.
///
/// ```
/// use approx::assert_relative_eq;
/// use mtm_rs::stats::coherence_confidence;
///
/// // 15 degrees of freedom, 95%
/// assert_relative_eq!(0.438903, coherence_confidence(15.0, 0.95), max_relative = 1e-5);
/// ```
///
pub fn coherence_confidence(dof: f64, significance: f64) -> f64 {
    GoodmanCoherenceStats::default().coherence_confidence(dof, significance)
}

///
/// Bias-corrected coherence magnitudes for `dof` degrees of freedom.
///
/// ```
/// use mtm_rs::stats::correct_bias;
///
/// let corrected = correct_bias(15.0, &[0.1, 0.6, 1.0]);
/// assert_eq!(corrected[0], 0.0);
/// assert!(corrected[1] < 0.6);
/// assert_eq!(corrected[2], 1.0);
/// ```
///
pub fn correct_bias(dof: f64, coherence: &[f64]) -> Vec<f64> {
    GoodmanCoherenceStats::default().correct_bias(dof, coherence)
}

fn estimate_count(dof: f64) -> usize {
    if dof.is_finite() {
        dof.round().max(2.0) as usize
    } else {
        2
    }
}

fn invert_curve(curve: &[(f64, f64)], c: f64) -> f64 {
    if c.is_nan() {
        return f64::NAN;
    }
    let Some(&(_, floor)) = curve.first() else {
        return c;
    };
    if c <= floor {
        return 0.0;
    }
    if c >= 1.0 {
        return 1.0;
    }
    let idx = curve.partition_point(|(_, e)| *e <= c);
    let gamma = match (curve.get(idx - 1), curve.get(idx)) {
        (Some(&(g0, e0)), Some(&(g1, e1))) if e1 > e0 => g0 + (g1 - g0) * (c - e0) / (e1 - e0),
        (Some(&(g0, _)), _) => g0,
        _ => 0.0,
    };
    gamma.clamp(0.0, c)
}

/// `ln C(n-1, k)^2` for `k = 0..n`.
struct BinomialTable {
    n: usize,
    log_sq: Vec<f64>,
}

impl BinomialTable {
    fn new(n: usize) -> Self {
        let mut log_sq = Vec::with_capacity(n);
        let mut ln_c = 0.0f64;
        for k in 0..n {
            log_sq.push(2.0 * ln_c);
            ln_c += ((n - 1 - k) as f64).ln() - ((k + 1) as f64).ln();
        }
        Self { n, log_sq }
    }

    /// `ln sum_k C(n-1,k)^2 z^k`, by log-sum-exp.
    fn log_series(&self, z: f64) -> f64 {
        if z <= 0.0 {
            return 0.0;
        }
        let ln_z = z.ln();
        let terms = self
            .log_sq
            .iter()
            .enumerate()
            .map(|(k, c)| c + k as f64 * ln_z);
        let max = terms.clone().fold(f64::NEG_INFINITY, f64::max);
        max + terms.map(|t| (t - max).exp()).sum::<f64>().ln()
    }

    /// Log density of the squared coherence estimate `x` given true `g`.
    fn log_density(&self, x: f64, g: f64) -> f64 {
        let n = self.n as f64;
        let mut ln_p = (n - 1.0).ln() + n * (1.0 - g).ln();
        if self.n > 2 {
            if x >= 1.0 {
                return f64::NEG_INFINITY;
            }
            ln_p += (n - 2.0) * (1.0 - x).ln();
        }
        ln_p + (1.0 - 2.0 * n) * (1.0 - g * x).ln() + self.log_series(g * x)
    }
}

/// `E[sqrt(x) | gamma]`, integrated over `u = sqrt(x)` by Simpson's rule.
fn expected_magnitude(table: &BinomialTable, gamma: f64, intervals: usize) -> f64 {
    if gamma >= 1.0 {
        return 1.0;
    }
    let g = gamma * gamma;
    let h = 1.0 / intervals as f64;
    let sum: f64 = (0..=intervals)
        .map(|i| {
            let u = i as f64 * h;
            let weight = if i == 0 || i == intervals {
                1.0
            } else if i % 2 == 1 {
                4.0
            } else {
                2.0
            };
            weight * 2.0 * u * u * table.log_density(u * u, g).exp()
        })
        .sum();
    sum * h / 3.0
}
