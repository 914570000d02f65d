//! Synthetic loadshapes: profile plus IQR-scaled noise, resampled and normalized.

pub mod strategy;

use std::fmt;
use std::str::FromStr;

use rand::{SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, OrderStatistics, Statistics};

use crate::entity::EntityId;
use crate::error::{Result, SynthError};
use crate::selector::ProfilePool;

pub use strategy::{IqrRandom, LoadshapeStrategy, PureRandom, Strategy};

/// Noise standard deviation as a fraction of the centered profile's IQR.
pub const DEFAULT_NOISE_SCALE: f64 = 0.1;

/// Value every sample takes when the series to normalize is constant.
pub const DEGENERATE_LEVEL: f64 = 0.5;

/// How the engine repeats a loadshape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    Daily,
    Yearly,
}

impl Recurrence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Yearly => "yearly",
        }
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Recurrence {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "daily" => Ok(Self::Daily),
            "yearly" => Ok(Self::Yearly),
            other => Err(SynthError::configuration(format!(
                "`{other}` is not a recurrence (expected `daily` or `yearly`)"
            ))),
        }
    }
}

/// How a loadshape was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationMeta {
    /// Source profile key, or the seed for profile-free strategies.
    pub profile_name: String,
    pub seed: u32,
    /// Pool the profile was drawn from, if any.
    pub pool: Option<ProfilePool>,
}

/// A normalized demand series for one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Loadshape {
    pub entity: EntityId,
    /// Element name of the loadshape object, e.g. `load_house_12_RESLOWR_COAST`.
    pub name: String,
    pub recurrence: Recurrence,
    /// Samples in `[0, 1]`.
    pub values: Vec<f64>,
    /// Hours per sample.
    pub hour_interval: f64,
    pub meta: GenerationMeta,
}

impl Loadshape {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Full object name, e.g. `loadshape.load_house_12`.
    pub fn object_name(&self) -> String {
        format!("loadshape.{}", self.name)
    }
}

/// Interquartile range of `values` after subtracting their mean.
///
/// Quartiles interpolate linearly between order statistics at position
/// `(n - 1) × p`, the same rule as numpy's default percentile.
pub fn centered_iqr(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mean = values.iter().mean();
    let mut centered = Data::new(values.iter().map(|v| v - mean).collect::<Vec<f64>>());
    linear_quantile(&mut centered, 0.75) - linear_quantile(&mut centered, 0.25)
}

fn linear_quantile(data: &mut Data<Vec<f64>>, p: f64) -> f64 {
    let h = (data.len() - 1) as f64 * p;
    let lo = h.floor();
    // order statistics are 1-based
    let below = data.order_statistic(lo as usize + 1);
    let above = data.order_statistic(h.ceil() as usize + 1);
    below + (h - lo) * (above - below)
}

/// Combines a profile with seeded noise of scale `noise_scale × IQR`, then
/// resamples to `target_len` (if given) and min-max normalizes.
///
/// # Errors
///
/// Returns [`SynthError::Configuration`] if the profile has fewer than two
/// samples, contains non-finite values, or `target_len` is zero.
pub fn synthesize_series(
    profile: &[f64],
    seed: u32,
    noise_scale: f64,
    target_len: Option<usize>,
) -> Result<Vec<f64>> {
    if profile.len() <= 1 {
        return Err(SynthError::configuration(format!(
            "profile must have at least 2 samples, got {}",
            profile.len()
        )));
    }
    if profile.iter().any(|v| !v.is_finite()) {
        return Err(SynthError::configuration("profile contains non-finite samples"));
    }

    let iqr = centered_iqr(profile);
    let noise = Normal::new(0.0, noise_scale * iqr).map_err(|e| {
        SynthError::configuration(format!("invalid noise scale {noise_scale} × IQR {iqr}: {e}"))
    })?;
    let mut rng = StdRng::seed_from_u64(u64::from(seed));

    let combined: Vec<f64> = profile
        .iter()
        .zip(noise.sample_iter(&mut rng))
        .map(|(p, n)| p + n)
        .collect();

    let series = match target_len {
        Some(n) if n != combined.len() => resample(&combined, n)?,
        _ => combined,
    };
    Ok(normalize(&series))
}

/// Resamples `values` to `target_len` points.
///
/// Point `k` sits at position `k × len / target_len` on the source index axis;
/// values in range are interpolated linearly and the tail beyond the last
/// source index is extrapolated from the final segment.
///
/// # Errors
///
/// Returns [`SynthError::Configuration`] for fewer than two source samples or
/// a zero target length.
pub fn resample(values: &[f64], target_len: usize) -> Result<Vec<f64>> {
    if values.len() < 2 {
        return Err(SynthError::configuration(
            "resampling needs at least 2 samples",
        ));
    }
    if target_len == 0 {
        return Err(SynthError::configuration("resample target length must be > 0"));
    }

    let step = values.len() as f64 / target_len as f64;
    let last_segment = values.len() - 2;
    Ok((0..target_len)
        .map(|k| {
            let x = k as f64 * step;
            let i = (x.floor() as usize).min(last_segment);
            let t = x - i as f64;
            values[i] + t * (values[i + 1] - values[i])
        })
        .collect())
}

/// Min-max scales `values` into `[0, 1]`.
///
/// A constant series has no range to scale by; every sample becomes
/// [`DEGENERATE_LEVEL`] instead of dividing by zero.
pub fn normalize(values: &[f64]) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if range.is_nan() || range <= 0.0 {
        return vec![DEGENERATE_LEVEL; values.len()];
    }
    values.iter().map(|v| (v - min) / range).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn profile() -> Vec<f64> {
        (0..48)
            .map(|t| 2.0 + (t as f64 / 24.0 * std::f64::consts::TAU).sin())
            .collect()
    }

    #[test]
    fn normalized_series_spans_unit_interval() {
        for seed in [0, 1, 42, 7331, 2_000_000_000] {
            let values = synthesize_series(&profile(), seed, DEFAULT_NOISE_SCALE, None)
                .expect("valid profile");
            assert_eq!(values.len(), 48);
            assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));
            assert!(values.iter().any(|v| *v == 0.0));
            assert!(values.iter().any(|v| *v == 1.0));
        }
    }

    #[test]
    fn constant_profile_yields_constant_loadshape() {
        let values = synthesize_series(&[10.0, 10.0, 10.0, 10.0], 42, DEFAULT_NOISE_SCALE, None);
        assert_eq!(values.ok(), Some(vec![DEGENERATE_LEVEL; 4]));
    }

    #[test]
    fn short_profiles_are_rejected() {
        for p in [&[][..], &[1.0][..]] {
            assert!(matches!(
                synthesize_series(p, 1, DEFAULT_NOISE_SCALE, None),
                Err(SynthError::Configuration(_))
            ));
        }
    }

    #[test]
    fn same_seed_same_series() {
        let a = synthesize_series(&profile(), 99, DEFAULT_NOISE_SCALE, Some(96)).ok();
        let b = synthesize_series(&profile(), 99, DEFAULT_NOISE_SCALE, Some(96)).ok();
        assert!(a.is_some());
        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_add_different_noise() {
        let a = synthesize_series(&profile(), 1, DEFAULT_NOISE_SCALE, None).ok();
        let b = synthesize_series(&profile(), 2, DEFAULT_NOISE_SCALE, None).ok();
        assert_ne!(a, b);
    }

    #[test]
    fn zero_noise_scale_only_normalizes() {
        let p = [1.0, 3.0, 2.0, 5.0];
        let values = synthesize_series(&p, 5, 0.0, None).expect("valid profile");
        let expected = [0.0, 0.5, 0.25, 1.0];
        assert_eq!(values.len(), expected.len());
        for (v, e) in values.iter().zip(expected) {
            assert_abs_diff_eq!(*v, e, epsilon = 1e-12);
        }
    }

    #[test]
    fn resample_to_same_length_is_identity() {
        let p = profile();
        let out = resample(&p, p.len()).expect("resample");
        assert_eq!(out.len(), p.len());
        for (a, b) in out.iter().zip(&p) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-12);
        }
    }

    #[test]
    fn resample_doubles_with_midpoints_and_extrapolated_tail() {
        let out = resample(&[0.0, 2.0, 4.0], 6).expect("resample");
        let expected = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(out.len(), expected.len());
        for (a, b) in out.iter().zip(expected) {
            assert_abs_diff_eq!(*a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn resample_compresses() {
        let out = resample(&[0.0, 1.0, 2.0, 3.0], 2).expect("resample");
        assert_eq!(out, vec![0.0, 2.0]);
    }

    #[test]
    fn resample_rejects_zero_target() {
        assert!(resample(&[0.0, 1.0], 0).is_err());
    }

    #[test]
    fn iqr_of_constant_is_zero() {
        assert_eq!(centered_iqr(&[10.0, 10.0, 10.0, 10.0]), 0.0);
    }

    #[test]
    fn iqr_interpolates_between_order_statistics() {
        assert_abs_diff_eq!(centered_iqr(&[1.0, 2.0, 3.0, 4.0]), 1.5, epsilon = 1e-12);
        let hours: Vec<f64> = (0..24).map(f64::from).collect();
        assert_abs_diff_eq!(centered_iqr(&hours), 11.5, epsilon = 1e-12);
        assert_abs_diff_eq!(centered_iqr(&[3.0, 1.0, 2.0]), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn iqr_is_shift_invariant() {
        let p = profile();
        let shifted: Vec<f64> = p.iter().map(|v| v + 100.0).collect();
        assert_abs_diff_eq!(centered_iqr(&p), centered_iqr(&shifted), epsilon = 1e-9);
        assert!(centered_iqr(&p) > 0.0);
    }

    #[test]
    fn recurrence_parses() {
        assert_eq!("daily".parse::<Recurrence>().ok(), Some(Recurrence::Daily));
        assert_eq!("yearly".parse::<Recurrence>().ok(), Some(Recurrence::Yearly));
        assert!("weekly".parse::<Recurrence>().is_err());
    }
}
