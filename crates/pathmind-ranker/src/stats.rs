//! Small descriptive statistics over potency values.

/// Rounds to 6 decimal places, the precision every reported score uses.
pub fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut ordered = values.to_vec();
    ordered.sort_by(f64::total_cmp);
    ordered
}

/// Median; the mean of the two middle values for even lengths. 0.0 when empty.
pub fn median(values: &[f64]) -> f64 {
    let ordered = sorted(values);
    let n = ordered.len();
    match n {
        0 => 0.0,
        _ if n % 2 == 1 => ordered[n / 2],
        _ => (ordered[n / 2 - 1] + ordered[n / 2]) / 2.0,
    }
}

/// Linear-interpolation percentile at quantile `q` in [0, 1].
///
/// The position `(n - 1) * q` is split into a floor rank and the next rank,
/// and the result interpolates between the two sorted values. A single value
/// is returned as-is.
pub fn percentile(values: &[f64], q: f64) -> f64 {
    let ordered = sorted(values);
    match ordered.len() {
        0 => 0.0,
        1 => ordered[0],
        n => {
            let pos = (n - 1) as f64 * q;
            let lower = pos.floor() as usize;
            let upper = (lower + 1).min(n - 1);
            if upper == lower {
                return ordered[lower];
            }
            let weight = pos - lower as f64;
            ordered[lower] * (1.0 - weight) + ordered[upper] * weight
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssaySpread {
    pub min: f64,
    pub median: f64,
    pub max: f64,
    pub iqr: f64,
}

pub fn assay_spread(values: &[f64]) -> AssaySpread {
    if values.is_empty() {
        return AssaySpread { min: 0.0, median: 0.0, max: 0.0, iqr: 0.0 };
    }
    let ordered = sorted(values);
    AssaySpread {
        min: ordered[0],
        median: median(&ordered),
        max: ordered[ordered.len() - 1],
        iqr: round6(percentile(&ordered, 0.75) - percentile(&ordered, 0.25)),
    }
}
