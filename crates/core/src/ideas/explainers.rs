use crate::domain::Family;
use regex::Regex;
use std::sync::LazyLock;

pub const WHOLESALE_DISCLAIMER: [&str; 5] = [
    "Wholesale / adviser use only.",
    "Educational information, not personal advice.",
    "Figures are indicative only; issuer documents & final pricing prevail.",
    "Capital is at risk unless expressly protected; issuer credit risk applies.",
    "Seek independent tax advice; outcomes depend on individual circumstances.",
];

/// Appended to every deterministic explainer.
pub const ADVISER_NOTE: &str =
    "For licensed advisers/wholesale; educational only; terms & KIDs prevail.";

pub fn wholesale_notice() -> String {
    WHOLESALE_DISCLAIMER.join(" ")
}

#[derive(Debug, Clone, Copy)]
pub struct FamilyExplainer {
    pub what: &'static [&'static str],
    pub when: &'static [&'static str],
    pub risks: &'static [&'static str],
}

pub fn family_explainer(family: Family) -> FamilyExplainer {
    match family {
        Family::FixedCouponNote => FamilyExplainer {
            what: &[
                "Periodic coupon, usually monthly or quarterly, paid while the downside barrier holds.",
                "Autocall observations can redeem the note early once all underliers sit above the trigger.",
            ],
            when: &[
                "Enhanced income is the goal and a meaningful downside buffer is wanted.",
                "The client accepts worst-of basket mechanics and issuer credit risk.",
            ],
            risks: &[
                "A barrier breach links capital at maturity to the worst performer.",
                "Issuer credit risk; volatility moves the secondary value.",
            ],
        },
        Family::SmartEntryNote => FamilyExplainer {
            what: &[
                "Income like a Fixed Coupon Note plus a pre-agreed discounted entry into the shares if markets sell off.",
                "Autocall may apply; baskets use worst-of mechanics.",
            ],
            when: &["Income now, with a defined buy-the-dip level if markets fall."],
            risks: &[
                "If the entry level triggers near the lows the client takes delivery of shares and capital is at risk from there.",
                "Issuer credit risk.",
            ],
        },
        Family::DiscountEntryNote => FamilyExplainer {
            what: &[
                "Entry into the underlier or basket at a discount, typically 20–30%.",
                "At maturity the note pays cash above the entry level and delivers shares below it.",
            ],
            when: &[
                "Constructive on the market but disciplined on valuation; wants a buffer after a rally.",
            ],
            risks: &[
                "Delivered shares can still lose value in a bear market.",
                "Worst-of basket risk; issuer credit risk.",
            ],
        },
        Family::PrincipalProtectedNote => FamilyExplainer {
            what: &[
                "Protection of 95–100% at maturity with upside participation, sometimes capped.",
                "Averaging windows are common to reduce timing risk.",
            ],
            when: &[
                "Capital preservation comes first and some upside can be traded for protection.",
            ],
            risks: &[
                "Protection applies at maturity only; the secondary price can move.",
                "Participation or caps limit upside; issuer credit risk.",
            ],
        },
        Family::EnhancedGrowth => FamilyExplainer {
            what: &[
                "Capital-efficient participation, often on an excess-return index, with lookback entry or averaging out.",
                "A small outlay buys notional exposure, so upside is geared against cash paid.",
            ],
            when: &[
                "Return-seeking investors who accept losing the full outlay if the underlier lags.",
            ],
            risks: &[
                "The full outlay can be lost; lookback and averaging are path dependent.",
                "Issuer credit risk.",
            ],
        },
        Family::OptionLoanFacility => FamilyExplainer {
            what: &[
                "Borrow against a share holding with a put floor and call cap protecting the collateral.",
                "Unlocks liquidity without selling the position.",
            ],
            when: &["Concentrated single-name holdings needing liquidity and risk management."],
            risks: &[
                "Collateral and volatility risk; options settle at maturity.",
                "Financing costs; counterparty risk.",
            ],
        },
        Family::ProtectedEquityLoan => FamilyExplainer {
            what: &[
                "Loan secured by equities with protection down to the loan amount; an optional cap lowers the interest cost.",
                "Dividends and franking flow through the term; interest is often prepaid.",
            ],
            when: &[
                "Tax-effective equity exposure with downside limited to the loan amount (seek independent tax advice).",
            ],
            risks: &[
                "Tax outcomes depend on circumstances; seek independent tax advice.",
                "Issuer or financier risk; a cap limits upside.",
            ],
        },
        Family::LendingLrl => FamilyExplainer {
            what: &[
                "A limited recourse loan funds full exposure; the investor can lose at most the interest or outlay.",
                "Usually references excess-return indices for high capital efficiency.",
            ],
            when: &[
                "Return-seeking and willing to lose prepaid interest if the underlier lags (seek tax advice on deductibility).",
            ],
            risks: &[
                "Interest or outlay can be lost in full; leverage magnifies outcomes.",
                "Counterparty risk.",
            ],
        },
        Family::Hedging => FamilyExplainer {
            what: &[
                "Puts, put-spreads or collars to cut the downside of an equity portfolio.",
                "Maturities and strikes are tailored to the risk budget.",
            ],
            when: &["Drawdown control or volatility management is the priority."],
            risks: &["Premium drag, basis risk against the portfolio and roll costs."],
        },
    }
}

const PRODUCTS_BASE: &str = "https://www.stropro.com/investment-products";

/// Exact product page for a family. Hedging has no dedicated page.
pub fn family_article(family: Family) -> Option<String> {
    let slug = match family {
        Family::FixedCouponNote => "fixed-coupon-notes",
        Family::SmartEntryNote => "smart-entry-note",
        Family::DiscountEntryNote => "discount-entry-notes",
        Family::PrincipalProtectedNote => "capital-protection-with-participation",
        Family::EnhancedGrowth => "enhanced-growth",
        Family::OptionLoanFacility => "option-loan-facility",
        Family::ProtectedEquityLoan => "protected-equity-loans",
        // The live site spells this slug "enhnaced".
        Family::LendingLrl => "enhnaced-growth-with-deductibility",
        Family::Hedging => return None,
    };
    Some(format!("{PRODUCTS_BASE}/{slug}"))
}

static HTTP_URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^https?://").unwrap());

static SLUG_FIXES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"(?i)/fixed-coupon-note(?:/|$)", "fixed-coupon-notes"),
        (r"(?i)/discount-entry-note(?:/|$)", "discount-entry-notes"),
        (r"(?i)/protected-equity-loan(?:/|$)", "protected-equity-loans"),
        (r"(?i)/enhanced-growth-with-deductibility(?:/|$)", "enhnaced-growth-with-deductibility"),
    ]
    .into_iter()
    .map(|(pattern, slug)| (Regex::new(pattern).unwrap(), slug))
    .collect()
});

static LANDING_PAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)/investments-solutions(?:/|$)").unwrap());

/// Cleans an article link proposed by the phrasing collaborator: non-http
/// values are rejected, known singular or misspelt slugs are corrected and
/// the generic landing page is swapped for the family page (or
/// `article_base` when the family has none).
pub fn normalize_explainer_url(
    family: Option<Family>,
    url: &str,
    article_base: &str,
) -> Option<String> {
    let url = url.trim();
    if !HTTP_URL_RE.is_match(url) {
        return None;
    }
    if let Some((_, slug)) = SLUG_FIXES.iter().find(|(rx, _)| rx.is_match(url)) {
        return Some(format!("{PRODUCTS_BASE}/{slug}"));
    }
    if LANDING_PAGE_RE.is_match(url) {
        return Some(
            family
                .and_then(family_article)
                .unwrap_or_else(|| article_base.to_string()),
        );
    }
    Some(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_family_has_explainer_content() {
        for family in Family::ALL {
            let e = family_explainer(family);
            assert!(!e.what.is_empty() && !e.when.is_empty() && !e.risks.is_empty());
        }
    }

    const BASE: &str = "https://www.stropro.com/investments-solutions";

    #[test]
    fn article_links_point_at_product_pages() {
        assert_eq!(
            family_article(Family::FixedCouponNote).as_deref(),
            Some("https://www.stropro.com/investment-products/fixed-coupon-notes")
        );
        assert_eq!(family_article(Family::Hedging), None);
    }

    #[test]
    fn corrects_known_slug_typos() {
        assert_eq!(
            normalize_explainer_url(
                None,
                "https://www.stropro.com/investment-products/fixed-coupon-note",
                BASE
            )
            .as_deref(),
            Some("https://www.stropro.com/investment-products/fixed-coupon-notes")
        );
        assert_eq!(
            normalize_explainer_url(
                None,
                "https://x.com/enhanced-growth-with-deductibility/",
                BASE
            )
            .as_deref(),
            Some("https://www.stropro.com/investment-products/enhnaced-growth-with-deductibility")
        );
    }

    #[test]
    fn landing_page_maps_to_family_page() {
        assert_eq!(
            normalize_explainer_url(
                Some(Family::DiscountEntryNote),
                "https://www.stropro.com/investments-solutions",
                BASE
            )
            .as_deref(),
            Some("https://www.stropro.com/investment-products/discount-entry-notes")
        );
        assert_eq!(
            normalize_explainer_url(
                Some(Family::Hedging),
                "https://www.stropro.com/investments-solutions/",
                "https://desk.example/"
            )
            .as_deref(),
            Some("https://desk.example/")
        );
    }

    #[test]
    fn rejects_non_http_and_keeps_other_urls() {
        assert_eq!(normalize_explainer_url(None, "/relative/path", BASE), None);
        assert_eq!(
            normalize_explainer_url(None, "https://example.com/a", BASE).as_deref(),
            Some("https://example.com/a")
        );
    }
}
