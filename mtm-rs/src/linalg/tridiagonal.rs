use crate::kernel::ConfigError;
use nalgebra::DVector;

const MAX_BISECTIONS: usize = 128;
const INVERSE_ITERATIONS: usize = 3;

/// Symmetric tridiagonal matrix held as its diagonal and first off-diagonal.
///
/// Eigenvalues are located one at a time by Sturm-sequence bisection and
/// eigenvectors recovered by inverse iteration, so extracting a handful of
/// eigenpairs costs O(n) each instead of the O(n^3) of a dense solve.
#[derive(Debug, Clone, PartialEq)]
pub struct SymmetricTridiagonal {
    diag: DVector<f64>,
    off: DVector<f64>,
    pivmin: f64,
}

impl SymmetricTridiagonal {
    /// Build from the main diagonal (`n` values) and off-diagonal (`n - 1` values).
    pub fn new(diag: DVector<f64>, off: DVector<f64>) -> Result<Self, ConfigError> {
        if diag.is_empty() {
            return Err(ConfigError::InvalidArgument {
                arg: "diag",
                reason: "diagonal must be non-empty",
            });
        }
        if off.len() + 1 != diag.len() {
            return Err(ConfigError::InvalidArgument {
                arg: "off",
                reason: "off-diagonal must be one shorter than the diagonal",
            });
        }
        if diag.iter().chain(off.iter()).any(|v| !v.is_finite()) {
            return Err(ConfigError::InvalidArgument {
                arg: "diag",
                reason: "matrix entries must be finite",
            });
        }
        let max_off_sq = off.iter().map(|e| e * e).fold(1.0f64, f64::max);
        Ok(Self {
            diag,
            off,
            pivmin: f64::MIN_POSITIVE * max_off_sq,
        })
    }

    /// Matrix dimension.
    pub fn dim(&self) -> usize {
        self.diag.len()
    }

    /// Number of eigenvalues strictly below `x`.
    pub fn count_below(&self, x: f64) -> usize {
        let mut count = 0;
        let mut q = self.guard_pivot(self.diag[0] - x);
        if q < 0.0 {
            count += 1;
        }
        for i in 1..self.dim() {
            let e = self.off[i - 1];
            q = self.guard_pivot(self.diag[i] - x - e * e / q);
            if q < 0.0 {
                count += 1;
            }
        }
        count
    }

    /// Gershgorin interval enclosing every eigenvalue.
    pub fn gershgorin_bounds(&self) -> (f64, f64) {
        let n = self.dim();
        (0..n).fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), i| {
            let left = if i > 0 { self.off[i - 1].abs() } else { 0.0 };
            let right = if i + 1 < n { self.off[i].abs() } else { 0.0 };
            let radius = left + right;
            (lo.min(self.diag[i] - radius), hi.max(self.diag[i] + radius))
        })
    }

    /// The `index`-th smallest eigenvalue, or `None` when out of range.
    pub fn eigenvalue(&self, index: usize) -> Option<f64> {
        if index >= self.dim() {
            return None;
        }
        let (lo, hi) = self.gershgorin_bounds();
        let pad = f64::EPSILON * lo.abs().max(hi.abs()).max(1.0);
        let (mut lo, mut hi) = (lo - pad, hi + pad);
        for _ in 0..MAX_BISECTIONS {
            let mid = 0.5 * (lo + hi);
            if mid <= lo || mid >= hi {
                break;
            }
            if self.count_below(mid) > index {
                hi = mid;
            } else {
                lo = mid;
            }
        }
        Some(0.5 * (lo + hi))
    }

    /// Unit eigenvector for `eigenvalue`, kept orthogonal to `against`.
    pub fn eigenvector(&self, eigenvalue: f64, against: &[DVector<f64>]) -> DVector<f64> {
        let n = self.dim();
        let (lo, hi) = self.gershgorin_bounds();
        let tiny = f64::EPSILON * lo.abs().max(hi.abs()).max(1.0);

        let mut v = DVector::from_fn(n, |i, _| ((i as f64 + 1.0) * 0.618_033_988_75).fract() - 0.5);
        orthonormalize(&mut v, against);
        for _ in 0..INVERSE_ITERATIONS {
            let mut w = self.solve_shifted(eigenvalue, &v, tiny);
            if !orthonormalize(&mut w, against) {
                break;
            }
            v = w;
        }
        v
    }

    /// The `count` largest eigenpairs in descending eigenvalue order.
    pub fn largest_eigenpairs(&self, count: usize) -> Vec<(f64, DVector<f64>)> {
        let n = self.dim();
        let mut found: Vec<DVector<f64>> = Vec::with_capacity(count);
        let mut pairs = Vec::with_capacity(count);
        for k in 0..count.min(n) {
            let Some(lambda) = self.eigenvalue(n - 1 - k) else {
                break;
            };
            let v = self.eigenvector(lambda, &found);
            found.push(v.clone());
            pairs.push((lambda, v));
        }
        pairs
    }

    fn guard_pivot(&self, q: f64) -> f64 {
        if q.abs() < self.pivmin {
            -self.pivmin
        } else {
            q
        }
    }

    /// Solve `(T - shift I) x = rhs` by LU with partial pivoting.
    fn solve_shifted(&self, shift: f64, rhs: &DVector<f64>, tiny: f64) -> DVector<f64> {
        let n = self.dim();
        let mut b: Vec<f64> = rhs.iter().copied().collect();
        if n == 1 {
            let d = self.diag[0] - shift;
            let d = if d.abs() < tiny { tiny } else { d };
            return DVector::from_vec(vec![b[0] / d]);
        }

        let mut d: Vec<f64> = self.diag.iter().map(|v| v - shift).collect();
        let mut dl: Vec<f64> = self.off.iter().copied().collect();
        let mut du: Vec<f64> = self.off.iter().copied().collect();
        let mut du2 = vec![0.0; n.saturating_sub(2)];
        let mut swapped = vec![false; n - 1];

        for i in 0..n - 1 {
            if d[i].abs() >= dl[i].abs() {
                if d[i] == 0.0 {
                    d[i] = tiny;
                }
                let fact = dl[i] / d[i];
                dl[i] = fact;
                d[i + 1] -= fact * du[i];
            } else {
                let fact = d[i] / dl[i];
                d[i] = dl[i];
                dl[i] = fact;
                let temp = du[i];
                du[i] = d[i + 1];
                d[i + 1] = temp - fact * d[i + 1];
                if i + 2 < n {
                    du2[i] = du[i + 1];
                    du[i + 1] = -fact * du[i + 1];
                }
                swapped[i] = true;
            }
        }
        for di in d.iter_mut() {
            if di.abs() < tiny {
                *di = if *di < 0.0 { -tiny } else { tiny };
            }
        }

        for i in 0..n - 1 {
            if swapped[i] {
                let temp = b[i];
                b[i] = b[i + 1];
                b[i + 1] = temp - dl[i] * b[i];
            } else {
                b[i + 1] -= dl[i] * b[i];
            }
        }

        b[n - 1] /= d[n - 1];
        b[n - 2] = (b[n - 2] - du[n - 2] * b[n - 1]) / d[n - 2];
        for i in (0..n.saturating_sub(2)).rev() {
            b[i] = (b[i] - du[i] * b[i + 1] - du2[i] * b[i + 2]) / d[i];
        }
        DVector::from_vec(b)
    }
}

/// Project out `against` and scale to unit norm. Returns false if nothing is left.
fn orthonormalize(v: &mut DVector<f64>, against: &[DVector<f64>]) -> bool {
    for u in against {
        let proj = v.dot(u);
        v.axpy(-proj, u, 1.0);
    }
    let norm = v.norm();
    if norm == 0.0 || !norm.is_finite() {
        return false;
    }
    *v /= norm;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;

    fn dense(diag: &DVector<f64>, off: &DVector<f64>) -> DMatrix<f64> {
        let n = diag.len();
        DMatrix::from_fn(n, n, |i, j| {
            if i == j {
                diag[i]
            } else if i + 1 == j {
                off[i]
            } else if j + 1 == i {
                off[j]
            } else {
                0.0
            }
        })
    }

    /// Tridiagonal sample matrix and its dense equivalent.
    fn sample_matrix(n: usize) -> (SymmetricTridiagonal, DMatrix<f64>) {
        let diag = DVector::from_fn(n, |i, _| (i as f64 * 0.7).sin() * 3.0 + i as f64);
        let off = DVector::from_fn(n - 1, |i, _| 1.0 + 0.25 * i as f64);
        let reference = dense(&diag, &off);
        let t = SymmetricTridiagonal::new(diag, off).expect("valid tridiagonal");
        (t, reference)
    }

    #[test]
    fn rejects_mismatched_off_diagonal() {
        let err = SymmetricTridiagonal::new(DVector::zeros(4), DVector::zeros(4))
            .expect_err("off-diagonal too long");
        assert!(matches!(err, ConfigError::InvalidArgument { arg: "off", .. }));
    }

    #[test]
    fn sturm_count_on_diagonal_matrix() {
        let t = SymmetricTridiagonal::new(
            DVector::from_vec(vec![3.0, -1.0, 7.0, 2.0]),
            DVector::zeros(3),
        )
        .expect("valid tridiagonal");
        assert_eq!(t.count_below(-2.0), 0);
        assert_eq!(t.count_below(0.0), 1);
        assert_eq!(t.count_below(2.5), 2);
        assert_eq!(t.count_below(10.0), 4);
    }

    #[test]
    fn eigenvalues_match_dense_symmetric_eigen() {
        let (t, reference) = sample_matrix(24);
        let mut expected: Vec<f64> = reference.symmetric_eigen().eigenvalues.iter().copied().collect();
        expected.sort_by(f64::total_cmp);
        for (i, e) in expected.iter().enumerate() {
            let got = t.eigenvalue(i).expect("index in range");
            assert_relative_eq!(got, *e, epsilon = 1e-9, max_relative = 1e-10);
        }
        assert!(t.eigenvalue(24).is_none());
    }

    #[test]
    fn largest_eigenpairs_have_small_residuals_and_are_orthonormal() {
        let (t, a) = sample_matrix(40);
        let pairs = t.largest_eigenpairs(5);
        assert_eq!(pairs.len(), 5);
        for w in pairs.windows(2) {
            assert!(w[0].0 > w[1].0);
        }
        for (i, (lambda, v)) in pairs.iter().enumerate() {
            let residual = (&a * v - v * *lambda).norm();
            assert!(residual < 1e-8, "residual {residual} for pair {i}");
            assert_relative_eq!(v.norm(), 1.0, epsilon = 1e-12);
            for (_, u) in pairs.iter().skip(i + 1) {
                assert!(v.dot(u).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn one_by_one_matrix() {
        let t = SymmetricTridiagonal::new(DVector::from_vec(vec![4.5]), DVector::zeros(0))
            .expect("valid tridiagonal");
        let pairs = t.largest_eigenpairs(3);
        assert_eq!(pairs.len(), 1);
        assert_relative_eq!(pairs[0].0, 4.5, epsilon = 1e-12);
        assert_relative_eq!(pairs[0].1[0].abs(), 1.0, epsilon = 1e-12);
    }
}
