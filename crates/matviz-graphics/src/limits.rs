//! Axis-limit auto-scaling and tick separation.
//!
//! `calc_tick_sep` is Lewart's "round to a human-friendly number"
//! heuristic (ACM Algorithm 463): the candidate separation is snapped to
//! 1, 2, 5 or 10 times a power of ten using the geometric midpoints
//! sqrt(2), sqrt(10) and sqrt(50) as thresholds.

use log::warn;

/// Aggregate extrema of a data set: minimum, maximum, and the smallest
/// strictly positive value (used by log-scale auto limits).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataLimits {
    pub min: f64,
    pub max: f64,
    pub min_pos: f64,
}

impl DataLimits {
    /// The identity element for [`DataLimits::merge`].
    pub fn empty() -> Self {
        DataLimits {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            min_pos: f64::INFINITY,
        }
    }

    /// Fold the extrema of `data`, ignoring non-finite elements.
    pub fn from_data(data: &[f64]) -> Self {
        let mut limits = DataLimits::empty();
        for &v in data {
            limits.include(v);
        }
        limits
    }

    pub fn include(&mut self, v: f64) {
        if !v.is_finite() {
            return;
        }
        if v < self.min {
            self.min = v;
        }
        if v > self.max {
            self.max = v;
        }
        if v > 0.0 && v < self.min_pos {
            self.min_pos = v;
        }
    }

    pub fn merge(&mut self, other: &DataLimits) {
        if other.min < self.min {
            self.min = other.min;
        }
        if other.max > self.max {
            self.max = other.max;
        }
        if other.min_pos < self.min_pos {
            self.min_pos = other.min_pos;
        }
    }

    /// True when no finite data point has been folded in.
    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }
}

/// Decompose `x` into `a * 10^b` with `1 <= |a| < 10`.
fn magform(x: f64) -> (f64, i32) {
    if x == 0.0 {
        return (0.0, 0);
    }
    let b = x.abs().log10().floor();
    let a = x / 10f64.powf(b);
    (a, b as i32)
}

/// "Nice" tick separation for the range `[lo, hi]`, targeting five
/// ticks.
pub fn calc_tick_sep(lo: f64, hi: f64) -> f64 {
    const NTICKS: f64 = 5.0;
    let (a, b) = magform((hi - lo) / NTICKS);

    let sep = if a < 2f64.sqrt() {
        1.0
    } else if a < 10f64.sqrt() {
        2.0
    } else if a < 50f64.sqrt() {
        5.0
    } else {
        10.0
    };

    sep * 10f64.powi(b)
}

/// Attempt to make nice limits from the actual max and min of the data.
/// For log plots the smallest strictly positive value substitutes for a
/// nonpositive minimum.
///
/// Returns `None` when no limits can be computed (infinite bounds, or a
/// log scale with no positive data); the caller retains its prior
/// limits.
pub fn get_axis_limits(min: f64, max: f64, min_pos: f64, logscale: bool) -> Option<[f64; 2]> {
    if min.is_infinite() || max.is_infinite() {
        return None;
    }

    let mut min_val = min;
    let mut max_val = max;

    if logscale {
        if min_pos.is_infinite() {
            warn!("axis: logscale with no positive values to plot");
            return None;
        }

        if min_val <= 0.0 {
            warn!("axis: omitting nonpositive data in log plot");
            min_val = min_pos;
        }
        if (min_val - max_val).abs() < f64::EPSILON.sqrt() {
            min_val *= 0.9;
            max_val *= 1.1;
        }
        min_val = 10f64.powf(min_val.log10().floor());
        max_val = 10f64.powf(max_val.log10().ceil());
    } else {
        if min_val == 0.0 && max_val == 0.0 {
            min_val = -1.0;
            max_val = 1.0;
        } else if (min_val - max_val).abs() < f64::EPSILON.sqrt() {
            min_val -= 0.1 * min_val.abs();
            max_val += 0.1 * max_val.abs();
        }

        let sep = calc_tick_sep(min_val, max_val);
        min_val = sep * (min_val / sep).floor();
        max_val = sep * (max_val / sep).ceil();
    }

    Some([min_val, max_val])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_range_expands_to_unit_interval() {
        assert_eq!(
            get_axis_limits(0.0, 0.0, f64::INFINITY, false),
            Some([-1.0, 1.0])
        );
    }

    #[test]
    fn degenerate_range_inflates_outward() {
        let [lo, hi] = get_axis_limits(1.0, 1.0 + 1e-13, f64::INFINITY, false).unwrap();
        assert!(lo < 1.0);
        assert!(hi > 1.0 + 1e-13);
    }

    #[test]
    fn tick_sep_snaps_to_nice_numbers() {
        assert_eq!(calc_tick_sep(0.0, 47.0), 10.0);
        assert_eq!(calc_tick_sep(1.0, 5.0), 1.0);
        assert_eq!(calc_tick_sep(0.0, 1.0), 0.2);
        assert_eq!(calc_tick_sep(0.0, 10.0), 2.0);
    }

    #[test]
    fn linear_limits_round_to_tick_multiples() {
        assert_eq!(
            get_axis_limits(1.0, 5.0, 5.0, false),
            Some([1.0, 5.0])
        );
        assert_eq!(
            get_axis_limits(0.0, 47.0, 1.0, false),
            Some([0.0, 50.0])
        );
    }

    #[test]
    fn log_limits_round_to_powers_of_ten() {
        assert_eq!(
            get_axis_limits(2.0, 800.0, 2.0, true),
            Some([1.0, 1000.0])
        );
        // Nonpositive minimum falls back to the smallest positive value.
        assert_eq!(
            get_axis_limits(-3.0, 800.0, 2.0, true),
            Some([1.0, 1000.0])
        );
    }

    #[test]
    fn infinite_bounds_yield_no_limits() {
        assert_eq!(
            get_axis_limits(f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, false),
            None
        );
        assert_eq!(get_axis_limits(1.0, 2.0, f64::INFINITY, true), None);
    }

    #[test]
    fn data_limits_ignore_non_finite_elements() {
        let l = DataLimits::from_data(&[f64::NAN, -2.0, 5.0, f64::INFINITY, 0.5]);
        assert_eq!(l.min, -2.0);
        assert_eq!(l.max, 5.0);
        assert_eq!(l.min_pos, 0.5);
        assert!(DataLimits::from_data(&[]).is_empty());
    }
}
