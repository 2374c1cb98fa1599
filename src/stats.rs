//! Small numeric helpers shared by the baseline engine and the summary builder.
//!
//! Storage backends are not assumed to offer a variance aggregate, so the
//! population standard deviation is computed here in two passes over the same
//! sample set as the mean.

/// Count, mean, population standard deviation and range of a sample set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl Summary {
    /// `None` for an empty sample set.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;
        let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / count as f64;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(Summary {
            count,
            mean,
            std_dev: variance.max(0.0).sqrt(),
            min,
            max,
        })
    }
}

/// Running sum/count used for time buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Accumulator {
    pub count: usize,
    pub sum: f64,
}

impl Accumulator {
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
    }

    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn empty_set_has_no_summary() {
        assert!(Summary::from_values(&[]).is_none());
    }

    #[test]
    fn population_std_dev() {
        // Classic example: population std dev of this set is exactly 2.
        let s = Summary::from_values(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_eq!(s.count, 8);
        assert_abs_diff_eq!(s.mean, 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(s.std_dev, 2.0, epsilon = 1e-12);
        assert_eq!(s.min, 2.0);
        assert_eq!(s.max, 9.0);
    }

    #[test]
    fn single_value_has_zero_spread() {
        let s = Summary::from_values(&[-17.3]).unwrap();
        assert_eq!(s.std_dev, 0.0);
        assert_eq!(s.min, -17.3);
        assert_eq!(s.max, -17.3);
    }

    #[test]
    fn accumulator_mean() {
        let mut acc = Accumulator::default();
        assert_eq!(acc.mean(), None);
        acc.push(1.0);
        acc.push(0.0);
        acc.push(1.0);
        assert_eq!(acc.count, 3);
        assert_eq!(acc.sum, 2.0);
        assert_abs_diff_eq!(acc.mean().unwrap(), 2.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn rounding() {
        assert_eq!(round_to(3.14159, 2), 3.14);
        assert_eq!(round_to(-14.25, 1), -14.3);
        assert_eq!(round_to(421.6, 0), 422.0);
    }
}
