use crate::catalog::NormalizedProduct;
use serde::Serialize;

pub const BAND_SUFFIX: &str = "% p.a. (illustrative only)";

/// Half-width of the synthetic band drawn around a single observation, so
/// one data point is never shown as a precise number.
pub const SINGLE_OBSERVATION_SPREAD: f64 = 1.0;

const QUARTILE_MIN_SAMPLE: usize = 4;

/// Coupon band of a cohort. `sample_size` counts products that carried a
/// coupon, which can be fewer than the cohort itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortBand {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub band: Option<String>,
    pub sample_size: usize,
}

impl CohortBand {
    /// The band, when at least `min_sample` observations back it.
    pub fn supported_band(&self, min_sample: usize) -> Option<&str> {
        self.band
            .as_deref()
            .filter(|_| self.sample_size >= min_sample)
    }
}

pub fn band_from_products(cohort: &[NormalizedProduct]) -> CohortBand {
    let mut values: Vec<f64> = cohort
        .iter()
        .filter_map(|p| p.coupon_pct)
        .filter(|v| v.is_finite())
        .collect();
    values.sort_by(f64::total_cmp);

    let n = values.len();
    let (lo, hi) = match n {
        0 => return CohortBand::default(),
        1 => (
            values[0] - SINGLE_OBSERVATION_SPREAD,
            values[0] + SINGLE_OBSERVATION_SPREAD,
        ),
        n if n < QUARTILE_MIN_SAMPLE => (values[0], values[n - 1]),
        n => (values[nearest_rank(0.25, n)], values[nearest_rank(0.75, n)]),
    };

    CohortBand {
        band: Some(format_band(lo, hi)),
        sample_size: n,
    }
}

fn nearest_rank(q: f64, n: usize) -> usize {
    (q * (n - 1) as f64).floor() as usize
}

fn format_band(lo: f64, hi: f64) -> String {
    format!("{:.1}–{:.1}{BAND_SUFFIX}", round_tenth(lo), round_tenth(hi))
}

/// Halves round away from zero; `{:.1}` alone would round 7.25 to 7.2.
fn round_tenth(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_coupons(coupons: &[Option<f64>]) -> Vec<NormalizedProduct> {
        coupons
            .iter()
            .map(|c| NormalizedProduct {
                id: None,
                name: None,
                descriptor: None,
                currency: None,
                tenor_months: None,
                underliers: Vec::new(),
                coupon_pct: *c,
                created_at: 0,
            })
            .collect()
    }

    #[test]
    fn empty_cohort_has_no_band() {
        assert_eq!(
            band_from_products(&[]),
            CohortBand {
                band: None,
                sample_size: 0
            }
        );
    }

    #[test]
    fn single_value_gets_synthetic_spread() {
        let out = band_from_products(&with_coupons(&[Some(8.0)]));
        assert_eq!(out.sample_size, 1);
        assert_eq!(out.band.as_deref(), Some("7.0–9.0% p.a. (illustrative only)"));
    }

    #[test]
    fn quarter_point_coupons_round_half_up() {
        let out = band_from_products(&with_coupons(&[Some(8.25)]));
        assert_eq!(out.band.as_deref(), Some("7.3–9.3% p.a. (illustrative only)"));

        let out = band_from_products(&with_coupons(&[Some(6.25), Some(8.75)]));
        assert_eq!(out.band.as_deref(), Some("6.3–8.8% p.a. (illustrative only)"));
    }

    #[test]
    fn two_or_three_values_use_min_max() {
        let out = band_from_products(&with_coupons(&[Some(9.5), None, Some(6.3), Some(7.0)]));
        assert_eq!(out.sample_size, 3);
        assert_eq!(out.band.as_deref(), Some("6.3–9.5% p.a. (illustrative only)"));
    }

    #[test]
    fn four_or_more_values_use_nearest_rank_quartiles() {
        let out = band_from_products(&with_coupons(&[Some(11.0), Some(5.0), Some(9.0), Some(7.0)]));
        assert_eq!(out.sample_size, 4);
        assert_eq!(out.band.as_deref(), Some("5.0–9.0% p.a. (illustrative only)"));

        let coupons: Vec<_> = (1..=9).map(|v| Some(v as f64)).collect();
        let out = band_from_products(&with_coupons(&coupons));
        assert_eq!(out.band.as_deref(), Some("3.0–7.0% p.a. (illustrative only)"));
    }

    #[test]
    fn products_without_coupons_do_not_count() {
        let out = band_from_products(&with_coupons(&[None, None, Some(f64::NAN)]));
        assert_eq!(out, CohortBand::default());
    }

    #[test]
    fn supported_band_requires_minimum_sample() {
        let out = band_from_products(&with_coupons(&[Some(6.0), Some(8.0)]));
        assert_eq!(out.supported_band(3), None);
        assert!(out.supported_band(2).is_some());
    }
}
