//! Ranks normalised products against a request. Scores are additive and
//! unbounded; a product with no matching signal at all scores zero and is
//! never part of a cohort.

use crate::catalog::NormalizedProduct;
use crate::domain::{Family, Objective, WizardInputs};
use chrono::{DateTime, Utc};
use std::collections::HashSet;

pub const DEFAULT_TOP_N: usize = 120;

/// Products must score strictly above this to be kept.
const MIN_SCORE: f64 = 0.0;

const OBJECTIVE_MATCH_SCORE: f64 = 3.0;
const UNDERLIER_MATCH_SCORE: f64 = 2.0;
const EXTRA_UNDERLIER_SCORE: f64 = 0.5;
const TENOR_NEAR_MONTHS: u32 = 6;
const TENOR_NEAR_SCORE: f64 = 1.5;
const TENOR_FAR_MONTHS: u32 = 12;
const TENOR_FAR_SCORE: f64 = 0.75;
const CURRENCY_MATCH_SCORE: f64 = 1.0;
const FRESH_AGE_MONTHS: f64 = 6.0;
const FRESH_SCORE: f64 = 1.0;
const RECENT_AGE_MONTHS: f64 = 12.0;
const RECENT_SCORE: f64 = 0.5;
const MONTH_MS: f64 = 30.0 * 24.0 * 3600.0 * 1000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityTarget {
    pub objective: Objective,
    /// Uppercased codes.
    pub underliers: Vec<String>,
    pub tenor_months: u32,
    /// Uppercased ISO code.
    pub currency: String,
}

impl SimilarityTarget {
    pub fn new(
        objective: Objective,
        underliers: &[String],
        tenor_months: u32,
        currency: &str,
    ) -> Self {
        Self {
            objective,
            underliers: underliers
                .iter()
                .map(|u| u.trim().to_uppercase())
                .filter(|u| !u.is_empty())
                .collect(),
            tenor_months,
            currency: currency.trim().to_uppercase(),
        }
    }

    pub fn from_inputs(inputs: &WizardInputs) -> Self {
        Self::new(
            inputs.objective,
            &inputs.underliers,
            inputs.tenor_months,
            inputs.investment_currency.as_str(),
        )
    }
}

pub fn score_similarity(
    p: &NormalizedProduct,
    target: &SimilarityTarget,
    now: DateTime<Utc>,
) -> f64 {
    let mut score = 0.0;

    if p
        .descriptor
        .as_deref()
        .is_some_and(|d| target.objective.matches_descriptor(d))
    {
        score += OBJECTIVE_MATCH_SCORE;
    }

    let wanted: HashSet<&str> = target.underliers.iter().map(String::as_str).collect();
    let overlap = p
        .underliers
        .iter()
        .filter(|u| wanted.contains(u.to_uppercase().as_str()))
        .count();
    if overlap > 0 {
        score += UNDERLIER_MATCH_SCORE + EXTRA_UNDERLIER_SCORE * (overlap - 1) as f64;
    }

    if let Some(tenor) = p.tenor_months.filter(|_| target.tenor_months > 0) {
        let diff = tenor.abs_diff(target.tenor_months);
        if diff <= TENOR_NEAR_MONTHS {
            score += TENOR_NEAR_SCORE;
        } else if diff <= TENOR_FAR_MONTHS {
            score += TENOR_FAR_SCORE;
        }
    }

    if p
        .currency
        .as_deref()
        .is_some_and(|c| !target.currency.is_empty() && c == target.currency)
    {
        score += CURRENCY_MATCH_SCORE;
    }

    let age_months = now.timestamp_millis().saturating_sub(p.created_at) as f64 / MONTH_MS;
    if age_months < FRESH_AGE_MONTHS {
        score += FRESH_SCORE;
    } else if age_months < RECENT_AGE_MONTHS {
        score += RECENT_SCORE;
    }

    score
}

pub fn select_similar(
    products: &[NormalizedProduct],
    target: &SimilarityTarget,
    top_n: usize,
) -> Vec<NormalizedProduct> {
    select_similar_at(products, target, top_n, Utc::now())
}

/// Highest-scoring `top_n` products, best first. Equal scores keep input
/// (fetch) order.
pub fn select_similar_at(
    products: &[NormalizedProduct],
    target: &SimilarityTarget,
    top_n: usize,
    now: DateTime<Utc>,
) -> Vec<NormalizedProduct> {
    let mut scored: Vec<(&NormalizedProduct, f64)> = products
        .iter()
        .map(|p| (p, score_similarity(p, target, now)))
        .filter(|(_, s)| *s > MIN_SCORE)
        .collect();

    scored.sort_by(|a, b| b.1.total_cmp(&a.1));

    scored
        .into_iter()
        .take(top_n)
        .map(|(p, _)| p.clone())
        .collect()
}

pub fn cohort_by_family(
    products: &[NormalizedProduct],
    target: &SimilarityTarget,
    family: Family,
    top_n: usize,
) -> Vec<NormalizedProduct> {
    cohort_by_family_at(products, target, family, top_n, Utc::now())
}

/// Same ranking as [`select_similar_at`], restricted to products whose
/// descriptor reads as `family`.
pub fn cohort_by_family_at(
    products: &[NormalizedProduct],
    target: &SimilarityTarget,
    family: Family,
    top_n: usize,
    now: DateTime<Utc>,
) -> Vec<NormalizedProduct> {
    let members: Vec<NormalizedProduct> = products
        .iter()
        .filter(|p| {
            p.descriptor
                .as_deref()
                .is_some_and(|d| family.matches_descriptor(d))
        })
        .cloned()
        .collect();
    select_similar_at(&members, target, top_n, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap()
    }

    fn product(id: &str) -> NormalizedProduct {
        NormalizedProduct {
            id: Some(id.to_string()),
            name: None,
            descriptor: None,
            currency: None,
            tenor_months: None,
            underliers: Vec::new(),
            coupon_pct: None,
            // Old enough to earn no recency credit.
            created_at: (now() - Duration::days(800)).timestamp_millis(),
        }
    }

    fn target() -> SimilarityTarget {
        SimilarityTarget::new(
            Objective::EnhancedIncome,
            &["spx".to_string(), "ndx".to_string()],
            24,
            "aud",
        )
    }

    #[test]
    fn scores_each_signal() {
        let t = target();

        let mut p = product("fam");
        p.descriptor = Some("Autocallable Note".into());
        assert_eq!(score_similarity(&p, &t, now()), 3.0);

        let mut p = product("one");
        p.underliers = vec!["SPX".into()];
        assert_eq!(score_similarity(&p, &t, now()), 2.0);

        let mut p = product("two");
        p.underliers = vec!["SPX".into(), "NDX".into(), "AAPL".into()];
        assert_eq!(score_similarity(&p, &t, now()), 2.5);

        let mut p = product("near");
        p.tenor_months = Some(30);
        assert_eq!(score_similarity(&p, &t, now()), 1.5);

        let mut p = product("far");
        p.tenor_months = Some(12);
        assert_eq!(score_similarity(&p, &t, now()), 0.75);

        let mut p = product("ccy");
        p.currency = Some("AUD".into());
        assert_eq!(score_similarity(&p, &t, now()), 1.0);

        let mut p = product("fresh");
        p.created_at = (now() - Duration::days(30)).timestamp_millis();
        assert_eq!(score_similarity(&p, &t, now()), 1.0);

        let mut p = product("recent");
        p.created_at = (now() - Duration::days(270)).timestamp_millis();
        assert_eq!(score_similarity(&p, &t, now()), 0.5);
    }

    #[test]
    fn extreme_created_at_scores_without_overflow() {
        let t = target();

        let mut ancient = product("ancient");
        ancient.currency = Some("AUD".into());
        ancient.created_at = i64::MIN;
        assert_eq!(score_similarity(&ancient, &t, now()), 1.0);

        let mut future = product("future");
        future.created_at = i64::MAX;
        assert_eq!(score_similarity(&future, &t, now()), 1.0);

        let out = select_similar_at(&[ancient, future], &t, DEFAULT_TOP_N, now());
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn malformed_created_at_survives_normalise_then_select() {
        let raw = serde_json::json!({"name": "FCN", "createdAt": -1e300, "currency": "AUD"});
        let p = crate::catalog::normalize_product(&raw);
        let out = select_similar(&[p], &target(), DEFAULT_TOP_N);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn unrelated_products_are_dropped() {
        let mut p = product("noise");
        p.descriptor = Some("Growth participation".into());
        p.currency = Some("EUR".into());
        p.tenor_months = Some(72);
        p.underliers = vec!["BHP".into()];

        let out = select_similar_at(&[p], &target(), DEFAULT_TOP_N, now());
        assert!(out.is_empty());
    }

    #[test]
    fn ranks_descending_and_keeps_fetch_order_on_ties() {
        let mut a = product("a");
        a.currency = Some("AUD".into());
        let mut b = product("b");
        b.underliers = vec!["SPX".into()];
        let mut c = product("c");
        c.currency = Some("AUD".into());

        let out = select_similar_at(&[a, b, c], &target(), DEFAULT_TOP_N, now());
        let ids: Vec<_> = out.iter().filter_map(|p| p.id.as_deref()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn truncates_to_top_n() {
        let products: Vec<_> = (0..10)
            .map(|i| {
                let mut p = product(&i.to_string());
                p.currency = Some("AUD".into());
                p
            })
            .collect();
        assert_eq!(select_similar_at(&products, &target(), 4, now()).len(), 4);
    }

    #[test]
    fn family_cohort_only_keeps_matching_descriptors() {
        let mut fcn = product("fcn");
        fcn.descriptor = Some("Fixed Coupon Note".into());
        fcn.currency = Some("AUD".into());
        let mut sen = product("sen");
        sen.descriptor = Some("Smart-Entry Note".into());
        sen.currency = Some("AUD".into());

        let out = cohort_by_family_at(
            &[fcn, sen],
            &target(),
            Family::SmartEntryNote,
            DEFAULT_TOP_N,
            now(),
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id.as_deref(), Some("sen"));
    }
}
