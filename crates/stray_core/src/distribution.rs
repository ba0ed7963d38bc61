//! Piecewise-constant 1D probability distribution.
//!
//! Backs the environment-map importance sampler: a precomputed CDF over
//! `n` bins allows drawing samples proportional to an arbitrary
//! non-negative density in O(log n) per sample.

/// A discretized probability distribution over `n` equal-width bins.
///
/// Built once from an unnormalized density; immutable afterwards.
/// Invariants: `cdf[0] == 0` and `cdf[n] == 1` for every non-negative
/// input, including the all-zero density (which falls back to uniform).
#[derive(Debug, Clone)]
pub struct Distribution1D {
    func: Vec<f32>,
    cdf: Vec<f32>,
    func_int: f32,
    inv_func_int: f32,
    inv_count: f32,
}

/// Floor on the integral so normalization never divides by zero.
const FUNC_INT_EPSILON: f32 = 1e-8;

impl Distribution1D {
    /// Build a distribution from an unnormalized, non-negative density.
    ///
    /// `func` must be non-empty; negative entries are clamped to zero.
    pub fn new(func: &[f32]) -> Self {
        assert!(!func.is_empty(), "Distribution1D needs at least one bin");

        let n = func.len();
        let func: Vec<f32> = func.iter().map(|f| f.max(0.0)).collect();

        let mut cdf = Vec::with_capacity(n + 1);
        cdf.push(0.0);
        for i in 0..n {
            cdf.push(cdf[i] + func[i] / n as f32);
        }

        let func_int = cdf[n];
        if func_int < FUNC_INT_EPSILON {
            // Degenerate all-zero density: fall back to a uniform cdf so
            // the cdf[0]==0, cdf[n]==1 invariants still hold.
            for (i, c) in cdf.iter_mut().enumerate() {
                *c = i as f32 / n as f32;
            }
        } else {
            let inv = 1.0 / func_int;
            for c in cdf.iter_mut() {
                *c *= inv;
            }
        }

        let func_int = func_int.max(FUNC_INT_EPSILON);
        Self {
            func,
            cdf,
            func_int,
            inv_func_int: 1.0 / func_int,
            inv_count: 1.0 / n as f32,
        }
    }

    /// Unnormalized density of bin `i`.
    #[inline]
    pub fn func(&self, i: usize) -> f32 {
        self.func[i]
    }

    /// Integral of the unnormalized density over [0, 1].
    #[inline]
    pub fn func_int(&self) -> f32 {
        self.func_int
    }

    #[inline]
    pub fn inv_func_int(&self) -> f32 {
        self.inv_func_int
    }

    /// 1 / count, the width of one bin in the unit interval.
    #[inline]
    pub fn inv_count(&self) -> f32 {
        self.inv_count
    }

    /// Draw a sample given a uniform `u` in [0, 1).
    ///
    /// Returns a continuous offset in bin-index space `[0, count)` and the
    /// density of the chosen bin (with respect to the unit interval).
    pub fn sample(&self, u: f32) -> (f32, f32) {
        // Lower bound: first cdf entry >= u, then step back to the bin
        // whose [cdf[i], cdf[i+1]) interval contains u.
        let upper = self.cdf.partition_point(|&c| c < u);
        let bin = upper.saturating_sub(1).min(self.func.len() - 1);

        let lo = self.cdf[bin];
        let hi = self.cdf[bin + 1];
        let width = hi - lo;
        let frac = if width > 0.0 { (u - lo) / width } else { 0.0 };

        // Clamping frac strictly below 1 keeps the offset inside [0, count).
        let offset = bin as f32 + frac.clamp(0.0, 0.999_999);
        let pdf = self.func[bin] * self.inv_func_int;
        (offset, pdf)
    }
}
