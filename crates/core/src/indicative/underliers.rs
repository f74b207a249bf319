//! Basket classification from ticker/index codes. Each attribute is an
//! ordered rule list; the first rule that matches any code in the basket
//! decides it.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Region {
    Au,
    Us,
    Eu,
    Asia,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SectorHint {
    Banks,
    Resources,
    Tech,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnderlierProfile {
    /// Every code is an index or ETF. Vacuously true for an empty basket.
    pub is_index: bool,
    /// Never below 1.
    pub basket_size: usize,
    pub region: Region,
    pub sector_hint: SectorHint,
}

pub const ILLIQUID_SINGLE_NAME_HINT: &str =
    "Note: selected underlier may be harder to price (single-name / liquidity). Ask the desk.";

static INDEX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"SPX|SP500|NDX|NASDAQ|SX5E|EURO|ASX|XJO|HSI|DAX|FTSE|MSCI|ETF").unwrap()
});

// Narrower set used only for the liquidity warning.
static LIQUID_INDEX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"SPX|NDX|SX5E|XJO|ETF|MSCI|DAX|FTSE|HSI").unwrap());

static BIG_CAP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"AAPL|MSFT|AMZN|GOOGL|META|NVDA|SPY|QQQ|VAS|ASX|XJO|CBA|NAB|ANZ|WBC|MQG|BHP|RIO|SX5E|SPX|NDX",
    )
    .unwrap()
});

// Softer than the single-name hint: flags baskets carrying several exotic names.
static PRICEABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)SPX|SX5E|XJO|NDX|DAX|HSI|MSCI|ETF|ASX|S&P|NASDAQ").unwrap()
});

static REGION_RULES: LazyLock<Vec<(Regex, Region)>> = LazyLock::new(|| {
    [
        (r"(?:ASX|XJO|CBA|NAB|ANZ|WBC|MQG|BHP|RIO|VAS|A200)\b", Region::Au),
        (r"SPX|NDX|AAPL|MSFT|QQQ|SPY|AMZN|NVDA", Region::Us),
        (r"SX5E|DAX|STOXX|CAC|EURO", Region::Eu),
        (r"HSI|HSCEI|MCHI|KWEB|NIKKEI|TOPIX", Region::Asia),
    ]
    .into_iter()
    .map(|(pattern, region)| (Regex::new(pattern).unwrap(), region))
    .collect()
});

static SECTOR_RULES: LazyLock<Vec<(Regex, SectorHint)>> = LazyLock::new(|| {
    [
        (r"CBA|NAB|ANZ|WBC|MQG|BANK|FINANC|XBK", SectorHint::Banks),
        (r"BHP|RIO|FMG|MIN|GLEN|COPPER|IRON|GOLD", SectorHint::Resources),
        (r"AAPL|MSFT|NVDA|META|GOOGL|AMZN|QQQ|NDX|NASDAQ", SectorHint::Tech),
    ]
    .into_iter()
    .map(|(pattern, sector)| (Regex::new(pattern).unwrap(), sector))
    .collect()
});

fn upper_codes(codes: &[String]) -> Vec<String> {
    codes.iter().map(|c| c.trim().to_uppercase()).collect()
}

fn first_rule<T: Copy>(rules: &[(Regex, T)], codes: &[String]) -> Option<T> {
    rules
        .iter()
        .find(|(rx, _)| codes.iter().any(|c| rx.is_match(c)))
        .map(|(_, result)| *result)
}

pub fn classify_underliers(codes: &[String]) -> UnderlierProfile {
    let codes = upper_codes(codes);
    UnderlierProfile {
        is_index: codes.iter().all(|c| INDEX_RE.is_match(c)),
        basket_size: codes.len().max(1),
        region: first_rule(&REGION_RULES, &codes).unwrap_or(Region::Other),
        sector_hint: first_rule(&SECTOR_RULES, &codes).unwrap_or(SectorHint::Other),
    }
}

/// Warning for a lone ticker outside the liquid large-cap list. Index/ETF
/// baskets and baskets of two or more names never get one.
pub fn illiquid_hint(codes: &[String]) -> Option<&'static str> {
    let codes = upper_codes(codes);
    if codes.iter().all(|c| LIQUID_INDEX_RE.is_match(c)) {
        return None;
    }
    let single = codes.len() == 1;
    let any_big = codes.iter().any(|c| BIG_CAP_RE.is_match(c));
    (single && !any_big).then_some(ILLIQUID_SINGLE_NAME_HINT)
}

const EXOTIC_BASKET_MIN: usize = 2;

fn exotic_codes(codes: &[String]) -> Vec<&str> {
    codes
        .iter()
        .map(|c| c.trim())
        .filter(|c| !PRICEABLE_RE.is_match(c))
        .collect()
}

/// Two or more names sit outside the readily priceable index set.
pub fn has_exotic_basket(codes: &[String]) -> bool {
    exotic_codes(codes).len() >= EXOTIC_BASKET_MIN
}

/// Soft flag when two or more names sit outside the readily priceable
/// index set. Lists up to three of them.
pub fn exotic_basket_flag(codes: &[String]) -> Option<String> {
    let exotic = exotic_codes(codes);
    (exotic.len() >= EXOTIC_BASKET_MIN).then(|| {
        format!(
            "Some underliers may be harder to price (check liquidity, borrow, corp actions): {}",
            exotic.iter().take(3).copied().collect::<Vec<_>>().join(", ")
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(c: &[&str]) -> Vec<String> {
        c.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn index_basket_requires_every_code_to_be_an_index() {
        assert!(classify_underliers(&codes(&["SPX", "sx5e"])).is_index);
        assert!(!classify_underliers(&codes(&["SPX", "AAPL"])).is_index);
    }

    #[test]
    fn basket_size_is_at_least_one() {
        assert_eq!(classify_underliers(&[]).basket_size, 1);
        assert_eq!(classify_underliers(&codes(&["A", "B", "C"])).basket_size, 3);
    }

    #[test]
    fn region_follows_priority_order() {
        assert_eq!(classify_underliers(&codes(&["SPX", "CBA"])).region, Region::Au);
        assert_eq!(classify_underliers(&codes(&["SX5E", "NDX"])).region, Region::Us);
        assert_eq!(classify_underliers(&codes(&["HSI"])).region, Region::Asia);
        assert_eq!(classify_underliers(&codes(&["XYZQ"])).region, Region::Other);
    }

    #[test]
    fn sector_follows_priority_order() {
        let p = classify_underliers(&codes(&["BHP", "CBA"]));
        assert_eq!(p.sector_hint, SectorHint::Banks);
        assert_eq!(p.region, Region::Au);
        assert_eq!(
            classify_underliers(&codes(&["NVDA", "RIO"])).sector_hint,
            SectorHint::Resources
        );
        assert_eq!(classify_underliers(&codes(&["SPX"])).sector_hint, SectorHint::Other);
    }

    #[test]
    fn illiquid_hint_only_for_single_small_name() {
        assert_eq!(illiquid_hint(&codes(&["SPX"])), None);
        assert!(illiquid_hint(&codes(&["XYZQ"])).is_some_and(|s| !s.is_empty()));
        assert_eq!(illiquid_hint(&codes(&["XYZQ", "ABCD"])), None);
        assert_eq!(illiquid_hint(&codes(&["AAPL"])), None);
    }

    #[test]
    fn exotic_flag_needs_two_exotic_names() {
        assert_eq!(exotic_basket_flag(&codes(&["SPX", "XYZQ"])), None);
        let flag = exotic_basket_flag(&codes(&["XYZQ", "ABCD", "SPX"])).unwrap();
        assert!(flag.ends_with("XYZQ, ABCD"));
    }

    #[test]
    fn exotic_basket_predicate_agrees_with_flag() {
        for basket in [&["SPX", "XYZQ"][..], &["XYZQ", "ABCD"], &[" xyzq ", "abcd", "sx5e"], &[]] {
            let basket = codes(basket);
            assert_eq!(has_exotic_basket(&basket), exotic_basket_flag(&basket).is_some());
        }
        assert!(has_exotic_basket(&codes(&["XYZQ", "ABCD"])));
        assert!(!has_exotic_basket(&codes(&["SPX", "NDX", "XYZQ"])));
    }
}
