//! Idea cards: the presentation-ready view of the cohort and band engine.
//!
//! Numbers on a card (band, evidence count, mechanics, flags) are always
//! computed here. A phrasing collaborator may later reword the title and
//! explainer through [`apply_phrasing`], nothing else.

mod explainers;
mod mechanics;

pub use explainers::{
    family_article, family_explainer, normalize_explainer_url, wholesale_notice, FamilyExplainer,
    ADVISER_NOTE, WHOLESALE_DISCLAIMER,
};
pub use mechanics::{mechanics_chips, MechanicsChip};

use crate::catalog::{CatalogFetch, NormalizedProduct};
use crate::cohort::{
    band_from_products, cohort_by_family_at, select_similar_at, CohortBand, SimilarityTarget,
    DEFAULT_TOP_N,
};
use crate::domain::{Family, WizardInputs};
use crate::indicative::{
    compute_indicative_band, exotic_basket_flag, illiquid_hint, IndicativeBandRequest,
};
use crate::llm::{IdeaPhraser, PhrasedIdea};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Smallest sample a live band needs before it replaces the static table.
pub const MIN_LIVE_SAMPLE: usize = 3;
pub const MAX_IDEAS: usize = 3;
pub const PREVIEW_PEEK: usize = 8;
pub const DETERMINISTIC_MODEL: &str = "deterministic";
/// Products requested by a platform health check.
pub const HEALTH_FETCH_LIMIT: usize = 5;
pub const HEALTH_PEEK: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IdeaSource {
    Platform,
    Static,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdeaCard {
    pub family: Family,
    pub title: String,
    pub explainer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indicative_coupon: Option<String>,
    pub article_url: String,
    pub parameters: BTreeMap<String, String>,
    pub mechanics: Vec<MechanicsChip>,
    /// Coupons behind the live band, 0 when the band came from the static table.
    pub evidence_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdeaResponse {
    pub suggestions: Vec<IdeaCard>,
    pub model: String,
    pub sample_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub band: Option<String>,
    pub source: IdeaSource,
    pub disclaimer: String,
}

/// Cohort member as shown in previews and health checks.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPeek {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub descriptor: Option<String>,
    pub currency: Option<String>,
    pub tenor_months: Option<u32>,
    pub underliers: Vec<String>,
    pub coupon_pct: Option<f64>,
}

impl From<&NormalizedProduct> for ProductPeek {
    fn from(p: &NormalizedProduct) -> Self {
        Self {
            id: p.id.clone(),
            name: p.name.clone(),
            descriptor: p.descriptor.clone(),
            currency: p.currency.clone(),
            tenor_months: p.tenor_months,
            underliers: p.underliers.clone(),
            coupon_pct: p.coupon_pct,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortPreview {
    pub input: WizardInputs,
    pub sample_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub band: Option<String>,
    pub sample_peek: Vec<ProductPeek>,
}

/// Report for the platform health check, shared by the api route and the cli.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformHealth {
    pub ok: bool,
    pub base: Option<String>,
    pub count: usize,
    pub peek: Vec<ProductPeek>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PlatformHealth {
    pub fn from_fetch(base: Option<&str>, fetch: &CatalogFetch) -> Self {
        let base = base.map(str::to_string);
        match fetch {
            CatalogFetch::Products(products) => Self {
                ok: true,
                base,
                count: products.len(),
                peek: products.iter().take(HEALTH_PEEK).map(ProductPeek::from).collect(),
                error: None,
            },
            CatalogFetch::Unavailable(err) => Self {
                ok: false,
                base,
                count: 0,
                peek: Vec::new(),
                error: Some(err.to_string()),
            },
        }
    }
}

pub fn build_ideas(
    inputs: &WizardInputs,
    products: &[NormalizedProduct],
    article_base: &str,
) -> IdeaResponse {
    build_ideas_at(inputs, products, article_base, Utc::now())
}

pub fn build_ideas_at(
    inputs: &WizardInputs,
    products: &[NormalizedProduct],
    article_base: &str,
    now: DateTime<Utc>,
) -> IdeaResponse {
    let target = SimilarityTarget::from_inputs(inputs);
    let broad = band_from_products(&select_similar_at(products, &target, DEFAULT_TOP_N, now));

    let suggestions: Vec<IdeaCard> = inputs
        .objective
        .families()
        .iter()
        .take(MAX_IDEAS)
        .map(|&family| {
            let cohort = cohort_by_family_at(products, &target, family, DEFAULT_TOP_N, now);
            let family_band = band_from_products(&cohort);
            build_card(inputs, family, &family_band, &broad, article_base)
        })
        .collect();

    tracing::debug!(
        objective = %inputs.objective,
        products = products.len(),
        broad_sample = broad.sample_size,
        cards = suggestions.len(),
        "ideas built"
    );

    IdeaResponse {
        suggestions,
        model: DETERMINISTIC_MODEL.to_string(),
        sample_size: broad.sample_size,
        source: if broad.sample_size > 0 {
            IdeaSource::Platform
        } else {
            IdeaSource::Static
        },
        band: broad.band,
        disclaimer: wholesale_notice(),
    }
}

fn build_card(
    inputs: &WizardInputs,
    family: Family,
    family_band: &CohortBand,
    broad: &CohortBand,
    article_base: &str,
) -> IdeaCard {
    // Per-family evidence first, then the broad cohort.
    let live = [family_band, broad]
        .into_iter()
        .find_map(|b| b.supported_band(MIN_LIVE_SAMPLE).map(|band| (band, b.sample_size)));

    let indicative_coupon = compute_indicative_band(IndicativeBandRequest {
        family,
        tenor_months: inputs.tenor_months,
        currency: inputs.investment_currency.as_str(),
        underliers: &inputs.underliers,
        platform_band: live.map(|(band, _)| band),
    });

    let basket = inputs.underliers.join(", ");
    let what = family_explainer(family).what.first().copied().unwrap_or_default();

    let mut parameters = BTreeMap::new();
    parameters.insert("Tenor".to_string(), format!("{}m", inputs.tenor_months));
    parameters.insert("Risk".to_string(), inputs.risk_profile.to_string());
    parameters.insert("Currency".to_string(), inputs.investment_currency.to_string());
    parameters.insert("Underliers".to_string(), basket.clone());

    let flags = illiquid_hint(&inputs.underliers)
        .map(str::to_string)
        .into_iter()
        .chain(exotic_basket_flag(&inputs.underliers))
        .collect();

    IdeaCard {
        family,
        title: format!("{family} on {basket}"),
        explainer: format!("{what} {ADVISER_NOTE}"),
        mechanics: mechanics_chips(family, inputs, indicative_coupon.as_deref()),
        indicative_coupon,
        article_url: family_article(family).unwrap_or_else(|| article_base.to_string()),
        parameters,
        evidence_count: live.map_or(0, |(_, n)| n),
        flags,
    }
}

/// Overlays phrased text onto cards by position. Blank titles or explainers
/// keep the deterministic text, as does a title naming a different family;
/// article links are only taken after [`normalize_explainer_url`] accepts them.
pub fn apply_phrasing(cards: &mut [IdeaCard], phrased: &[PhrasedIdea], article_base: &str) {
    for (card, p) in cards.iter_mut().zip(phrased) {
        if let Some(title) = p
            .title
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            match Family::named_in(title) {
                Some(named) if named != card.family => {
                    tracing::debug!(card = %card.family, %named, "phrased title names another family; kept original");
                }
                _ => card.title = title.to_string(),
            }
        }
        if let Some(explainer) = p
            .explainer
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            card.explainer = explainer.to_string();
        }
        if let Some(url) = p
            .article_url
            .as_deref()
            .and_then(|u| normalize_explainer_url(Some(card.family), u, article_base))
        {
            card.article_url = url;
        }
    }
}

/// Asks the phraser to reword the cards. Any failure leaves the
/// deterministic response untouched.
pub async fn phrase_ideas(
    phraser: &dyn IdeaPhraser,
    inputs: &WizardInputs,
    response: &mut IdeaResponse,
    article_base: &str,
) {
    match phraser.phrase(inputs, &response.suggestions).await {
        Ok(phrased) => {
            apply_phrasing(&mut response.suggestions, &phrased, article_base);
            response.model = phraser.model().to_string();
        }
        Err(err) => {
            tracing::warn!(error = %format!("{err:#}"), "idea phrasing failed; keeping deterministic cards");
        }
    }
}

pub fn preview_cohort(inputs: WizardInputs, products: &[NormalizedProduct]) -> CohortPreview {
    preview_cohort_at(inputs, products, Utc::now())
}

pub fn preview_cohort_at(
    inputs: WizardInputs,
    products: &[NormalizedProduct],
    now: DateTime<Utc>,
) -> CohortPreview {
    let target = SimilarityTarget::from_inputs(&inputs);
    let cohort = select_similar_at(products, &target, DEFAULT_TOP_N, now);
    let CohortBand { band, sample_size } = band_from_products(&cohort);

    CohortPreview {
        input: inputs,
        sample_size,
        band,
        sample_peek: cohort.iter().take(PREVIEW_PEEK).map(ProductPeek::from).collect(),
    }
}
