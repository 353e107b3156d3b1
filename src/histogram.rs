//! Fixed-width one-dimensional histogram
//!
//! Weighted fills go into equal-width bins between a lower and an upper
//! bound. Out-of-range values land in the underflow/overflow bins and do not
//! contribute to the mean and rms.

use crate::AnalysisError;

/// One-dimensional histogram with equal-width bins.
#[derive(Debug, Clone)]
pub struct H1 {
    name: String,
    title: String,
    lower: f64,
    upper: f64,
    /// Sum of weights per in-range bin
    sum_w: Vec<f64>,
    /// Sum of squared weights per in-range bin
    sum_w2: Vec<f64>,
    underflow: (f64, f64),
    overflow: (f64, f64),
    entries: u64,
    /// In-range moments: sum w, sum w^2, sum w*x, sum w*x^2
    moments: Moments,
}

#[derive(Debug, Clone, Copy, Default)]
struct Moments {
    sw: f64,
    sw2: f64,
    sxw: f64,
    sx2w: f64,
}

impl H1 {
    pub fn new(
        name: impl Into<String>,
        title: impl Into<String>,
        bins: usize,
        lower: f64,
        upper: f64,
    ) -> Result<Self, AnalysisError> {
        let name = name.into();
        let invalid = |reason: &str| AnalysisError::InvalidHistogram {
            name: name.clone(),
            reason: reason.to_string(),
        };

        if bins == 0 {
            return Err(invalid("bin count must be greater than zero"));
        }
        if !lower.is_finite() || !upper.is_finite() {
            return Err(invalid("axis bounds must be finite"));
        }
        if upper <= lower {
            return Err(invalid("upper bound must be greater than lower bound"));
        }

        Ok(Self {
            name,
            title: title.into(),
            lower,
            upper,
            sum_w: vec![0.0; bins],
            sum_w2: vec![0.0; bins],
            underflow: (0.0, 0.0),
            overflow: (0.0, 0.0),
            entries: 0,
            moments: Moments::default(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn bins(&self) -> usize {
        self.sum_w.len()
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    pub fn bin_width(&self) -> f64 {
        (self.upper - self.lower) / self.bins() as f64
    }

    /// Add `weight` at position `x`.
    pub fn fill(&mut self, x: f64, weight: f64) {
        self.entries += 1;
        let w2 = weight * weight;

        if x < self.lower {
            self.underflow.0 += weight;
            self.underflow.1 += w2;
            return;
        }
        if x >= self.upper || x.is_nan() {
            self.overflow.0 += weight;
            self.overflow.1 += w2;
            return;
        }

        let idx = (((x - self.lower) / self.bin_width()).floor() as usize).min(self.bins() - 1);
        self.sum_w[idx] += weight;
        self.sum_w2[idx] += w2;

        self.moments.sw += weight;
        self.moments.sw2 += w2;
        self.moments.sxw += weight * x;
        self.moments.sx2w += weight * x * x;
    }

    /// Multiply every bin content, flows included, by `factor`.
    ///
    /// Errors scale with `|factor|`, the mean and rms are unchanged.
    pub fn scale(&mut self, factor: f64) {
        let f2 = factor * factor;

        for (w, w2) in self.sum_w.iter_mut().zip(self.sum_w2.iter_mut()) {
            *w *= factor;
            *w2 *= f2;
        }
        self.underflow = (self.underflow.0 * factor, self.underflow.1 * f2);
        self.overflow = (self.overflow.0 * factor, self.overflow.1 * f2);

        self.moments.sw *= factor;
        self.moments.sw2 *= f2;
        self.moments.sxw *= factor;
        self.moments.sx2w *= factor;
    }

    pub fn mean(&self) -> f64 {
        if self.moments.sw == 0.0 {
            return 0.0;
        }
        self.moments.sxw / self.moments.sw
    }

    pub fn rms(&self) -> f64 {
        if self.moments.sw == 0.0 {
            return 0.0;
        }
        let mean = self.mean();
        (self.moments.sx2w / self.moments.sw - mean * mean).abs().sqrt()
    }

    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Sum of in-range weights.
    pub fn sum_of_weights(&self) -> f64 {
        self.moments.sw
    }

    pub fn bin_content(&self, bin: usize) -> Option<f64> {
        self.sum_w.get(bin).copied()
    }

    pub fn bin_error(&self, bin: usize) -> Option<f64> {
        self.sum_w2.get(bin).map(|w2| w2.sqrt())
    }

    pub fn bin_lower_edge(&self, bin: usize) -> f64 {
        self.lower + bin as f64 * self.bin_width()
    }

    pub fn underflow(&self) -> f64 {
        self.underflow.0
    }

    pub fn underflow_error(&self) -> f64 {
        self.underflow.1.sqrt()
    }

    pub fn overflow(&self) -> f64 {
        self.overflow.0
    }

    pub fn overflow_error(&self) -> f64 {
        self.overflow.1.sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_histo() -> H1 {
        H1::new("EGas", "Edep", 10, 0.0, 1.0).expect("valid histogram")
    }

    #[test]
    fn rejects_bad_axes() {
        assert!(H1::new("h", "", 0, 0.0, 1.0).is_err());
        assert!(H1::new("h", "", 5, 1.0, 1.0).is_err());
        assert!(H1::new("h", "", 5, 0.0, f64::INFINITY).is_err());
        assert!(H1::new("h", "", 5, f64::NAN, 1.0).is_err());
    }

    #[test]
    fn fills_the_right_bin() {
        let mut h = unit_histo();
        h.fill(0.05, 1.0);
        h.fill(0.55, 2.0);
        h.fill(0.999, 1.0);

        assert_eq!(h.bin_content(0), Some(1.0));
        assert_eq!(h.bin_content(5), Some(2.0));
        assert_eq!(h.bin_content(9), Some(1.0));
        assert_eq!(h.entries(), 3);
        assert_eq!(h.bin_content(10), None);
    }

    #[test]
    fn out_of_range_goes_to_flows() {
        let mut h = unit_histo();
        h.fill(-0.1, 1.0);
        h.fill(1.0, 3.0);
        h.fill(f64::NAN, 1.0);

        assert_eq!(h.underflow(), 1.0);
        assert_eq!(h.overflow(), 4.0);
        assert_eq!(h.entries(), 3);
        assert_eq!(h.sum_of_weights(), 0.0);
        assert_eq!(h.mean(), 0.0);
        assert_eq!(h.rms(), 0.0);
    }

    #[test]
    fn mean_and_rms_use_in_range_weights() {
        let mut h = unit_histo();
        h.fill(0.2, 1.0);
        h.fill(0.4, 1.0);
        h.fill(0.6, 2.0);
        h.fill(5.0, 10.0);

        assert_relative_eq!(h.mean(), 0.45, epsilon = 1e-12);
        let second = (0.04 + 0.16 + 2.0 * 0.36) / 4.0;
        assert_relative_eq!(h.rms(), (second - 0.45_f64 * 0.45).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn scale_multiplies_contents_and_keeps_shape() {
        let mut h = unit_histo();
        h.fill(0.15, 1.0);
        h.fill(0.35, 3.0);
        h.fill(-1.0, 2.0);
        let (mean, rms) = (h.mean(), h.rms());

        h.scale(0.5);

        assert_relative_eq!(h.bin_content(1).unwrap_or_default(), 0.5);
        assert_relative_eq!(h.bin_content(3).unwrap_or_default(), 1.5);
        assert_relative_eq!(h.bin_error(3).unwrap_or_default(), 1.5);
        assert_relative_eq!(h.underflow(), 1.0);
        assert_relative_eq!(h.mean(), mean, epsilon = 1e-12);
        assert_relative_eq!(h.rms(), rms, epsilon = 1e-12);
    }

    #[test]
    fn bin_edges_are_uniform() {
        let h = H1::new("LGas", "trackL", 50, 0.0, 1000.0).expect("valid histogram");
        assert_relative_eq!(h.bin_width(), 20.0);
        assert_relative_eq!(h.bin_lower_edge(0), 0.0);
        assert_relative_eq!(h.bin_lower_edge(49), 980.0);
    }
}
