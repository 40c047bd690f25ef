//! Statistics Calculator Module
//! Rate normalization, period-over-period growth and descriptive summaries.

use statrs::statistics::Statistics;

/// Descriptive statistics for a set of amounts.
#[derive(Debug, Clone, PartialEq)]
pub struct AmountSummary {
    pub count: usize,
    pub total: f64,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub p05: f64,
    pub p95: f64,
}

impl Default for AmountSummary {
    fn default() -> Self {
        Self {
            count: 0,
            total: 0.0,
            mean: f64::NAN,
            median: f64::NAN,
            std: f64::NAN,
            p05: f64::NAN,
            p95: f64::NAN,
        }
    }
}

pub struct StatsCalculator;

impl StatsCalculator {
    /// Map NaN and ±infinity to 0.
    pub fn finite_or_zero(value: f64) -> f64 {
        if value.is_finite() {
            value
        } else {
            0.0
        }
    }

    /// A percentage held to [0, 100]; non-finite input becomes 0.
    pub fn clamp_percent(value: f64) -> f64 {
        Self::finite_or_zero(value).clamp(0.0, 100.0)
    }

    /// Percent change against the value `periods` rows earlier.
    ///
    /// Rows are positions, not calendar periods: on a daily series with gaps,
    /// `periods = 7` is not a week. The first `periods` rows, and rows whose
    /// base is zero, have no defined change and come back as `None`.
    pub fn pct_change(values: &[f64], periods: usize) -> Vec<Option<f64>> {
        values
            .iter()
            .enumerate()
            .map(|(i, &current)| {
                let previous = *values.get(i.checked_sub(periods)?)?;
                let change = (current / previous - 1.0) * 100.0;
                change.is_finite().then_some(change)
            })
            .collect()
    }

    /// Compute descriptive statistics, ignoring missing amounts.
    pub fn summarize(values: &[f64]) -> AmountSummary {
        let n = values.len();
        if n == 0 {
            return AmountSummary::default();
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let std = if n > 1 { values.iter().std_dev() } else { 0.0 };

        AmountSummary {
            count: n,
            total: values.iter().sum(),
            mean: values.iter().mean(),
            median: Self::percentile(&sorted, 50.0),
            std,
            p05: Self::percentile(&sorted, 5.0),
            p95: Self::percentile(&sorted, 95.0),
        }
    }

    /// Mean of the values, NaN when empty.
    pub fn mean(values: &[f64]) -> f64 {
        values.iter().mean()
    }

    /// Calculate percentile using linear interpolation (NumPy compatible).
    pub fn percentile(sorted_values: &[f64], p: f64) -> f64 {
        let n = sorted_values.len();
        if n == 0 {
            return f64::NAN;
        }
        if n == 1 {
            return sorted_values[0];
        }

        let rank = (p / 100.0) * (n - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = (rank.ceil() as usize).min(n - 1);
        let frac = rank - lower as f64;

        if lower == upper {
            sorted_values[lower]
        } else {
            sorted_values[lower] * (1.0 - frac) + sorted_values[upper] * frac
        }
    }
}
