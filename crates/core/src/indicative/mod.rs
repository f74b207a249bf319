//! Final band selection: a live cohort band when the caller has one,
//! otherwise the static table nudged by the underlier basket.

mod table;
mod underliers;

pub use table::{fallback_band, static_band, TenorBucket};
pub use underliers::{
    classify_underliers, exotic_basket_flag, has_exotic_basket, illiquid_hint, Region, SectorHint,
    UnderlierProfile, ILLIQUID_SINGLE_NAME_HINT,
};

use crate::cohort::BAND_SUFFIX;
use crate::domain::Family;
use regex::Regex;
use std::sync::LazyLock;

/// Maximum drift, in percentage points, of either band end from the static entry.
const MAX_ADJUSTMENT: f64 = 2.0;
const SMALL_SINGLE_NAME_BASKET: usize = 3;
const SMALL_BASKET_PREMIUM: f64 = 1.0;
const BROAD_INDEX_BASKET: usize = 4;
const BROAD_INDEX_DISCOUNT: f64 = 0.5;
const AU_BANKS_PREMIUM: f64 = 0.5;

static PA_BAND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*[–-]\s*(\d+(?:\.\d+)?)\s*%").unwrap());

/// First `<lo>–<hi>%` range in a band string.
pub fn parse_pa_band(text: &str) -> Option<(f64, f64)> {
    let caps = PA_BAND_RE.captures(text)?;
    let lo = caps.get(1)?.as_str().parse().ok()?;
    let hi = caps.get(2)?.as_str().parse().ok()?;
    Some((lo, hi))
}

fn fmt_bound(v: f64) -> String {
    let rounded = (v * 10.0).round() / 10.0;
    if v.fract() == 0.0 {
        format!("{rounded:.0}")
    } else {
        format!("{rounded:.1}")
    }
}

pub fn fmt_pa(lo: f64, hi: f64) -> String {
    format!("{}–{}{BAND_SUFFIX}", fmt_bound(lo), fmt_bound(hi))
}

/// Nudges an income family's coupon band for basket shape. Other families,
/// and bands with no numeric range, are returned unchanged.
pub fn adjust_for_underliers(
    family: Family,
    band_text: &str,
    profile: &UnderlierProfile,
) -> String {
    if !family.is_income() {
        return band_text.to_string();
    }
    let Some((base_lo, base_hi)) = parse_pa_band(band_text) else {
        return band_text.to_string();
    };

    let mut shift = 0.0;
    if !profile.is_index && profile.basket_size <= SMALL_SINGLE_NAME_BASKET {
        shift += SMALL_BASKET_PREMIUM;
    }
    if profile.is_index && profile.basket_size >= BROAD_INDEX_BASKET {
        shift -= BROAD_INDEX_DISCOUNT;
    }
    if profile.region == Region::Au && profile.sector_hint == SectorHint::Banks {
        shift += AU_BANKS_PREMIUM;
    }

    let lo = (base_lo + shift).clamp(base_lo - MAX_ADJUSTMENT, base_lo + MAX_ADJUSTMENT);
    let hi = (base_hi + shift)
        .clamp(base_hi - MAX_ADJUSTMENT, base_hi + MAX_ADJUSTMENT)
        .max(lo);

    fmt_pa(lo, hi)
}

#[derive(Debug, Clone, Copy)]
pub struct IndicativeBandRequest<'a> {
    pub family: Family,
    pub tenor_months: u32,
    pub currency: &'a str,
    pub underliers: &'a [String],
    /// Live band the caller already judged well-supported.
    pub platform_band: Option<&'a str>,
}

/// `None` when there is no live band and the static table has no entry for
/// the family/tenor/currency combination.
pub fn compute_indicative_band(req: IndicativeBandRequest<'_>) -> Option<String> {
    if let Some(band) = req.platform_band.filter(|b| !b.trim().is_empty()) {
        return Some(band.to_string());
    }
    let base = fallback_band(req.family, req.tenor_months, req.currency)?;
    let profile = classify_underliers(req.underliers);
    Some(adjust_for_underliers(req.family, base, &profile))
}
