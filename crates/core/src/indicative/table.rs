//! Hand-authored, conservative family × tenor × currency bands used when
//! live cohort evidence is too thin.

use crate::domain::{Currency, Family};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenorBucket {
    UpTo12,
    To24,
    To36,
    To60,
    Over60,
}

impl TenorBucket {
    pub fn for_months(months: u32) -> Self {
        match months {
            0..=12 => Self::UpTo12,
            13..=24 => Self::To24,
            25..=36 => Self::To36,
            37..=60 => Self::To60,
            _ => Self::Over60,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::UpTo12 => "≤12",
            Self::To24 => "13–24",
            Self::To36 => "25–36",
            Self::To60 => "37–60",
            Self::Over60 => ">60",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for TenorBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Rows are tenor buckets in ascending order; columns are AUD, USD, EUR.
type FamilyBands = [[&'static str; 3]; 5];

const FIXED_COUPON_NOTE: FamilyBands = [
    [
        "6–9% p.a. (illustrative only)",
        "7–10% p.a. (illustrative only)",
        "5–8% p.a. (illustrative only)",
    ],
    [
        "7–11% p.a. (illustrative only)",
        "8–12% p.a. (illustrative only)",
        "6–9% p.a. (illustrative only)",
    ],
    [
        "8–12% p.a. (illustrative only)",
        "9–13% p.a. (illustrative only)",
        "7–10% p.a. (illustrative only)",
    ],
    [
        "9–13% p.a. (illustrative only)",
        "10–14% p.a. (illustrative only)",
        "8–11% p.a. (illustrative only)",
    ],
    [
        "10–14% p.a. (illustrative only)",
        "11–15% p.a. (illustrative only)",
        "9–12% p.a. (illustrative only)",
    ],
];

const SMART_ENTRY_NOTE: FamilyBands = [
    [
        "5–8% p.a. (illustrative only)",
        "6–9% p.a. (illustrative only)",
        "4–7% p.a. (illustrative only)",
    ],
    [
        "6–10% p.a. (illustrative only)",
        "7–11% p.a. (illustrative only)",
        "5–8% p.a. (illustrative only)",
    ],
    [
        "7–11% p.a. (illustrative only)",
        "8–12% p.a. (illustrative only)",
        "6–9% p.a. (illustrative only)",
    ],
    [
        "8–12% p.a. (illustrative only)",
        "9–13% p.a. (illustrative only)",
        "7–10% p.a. (illustrative only)",
    ],
    [
        "9–13% p.a. (illustrative only)",
        "10–14% p.a. (illustrative only)",
        "8–11% p.a. (illustrative only)",
    ],
];

const DISCOUNT_ENTRY_NOTE: FamilyBands = [
    ["Entry discount ~15–25% (illustrative only)", "15–25%", "15–25%"],
    ["Entry discount ~20–30% (illustrative only)", "20–30%", "20–30%"],
    ["Entry discount ~20–35% (illustrative only)", "20–35%", "20–35%"],
    ["Entry discount ~25–35% (illustrative only)", "25–35%", "25–35%"],
    ["Entry discount ~25–40% (illustrative only)", "25–40%", "25–40%"],
];

const PRINCIPAL_PROTECTED_NOTE: FamilyBands = [
    ["Participation ~90–140% (illustrative only)", "90–140%", "90–130%"],
    ["Participation ~120–170% (illustrative only)", "120–170%", "110–160%"],
    ["Participation ~130–180% (illustrative only)", "130–180%", "120–170%"],
    ["Participation ~140–190% (illustrative only)", "140–190%", "130–180%"],
    ["Participation ~150–200% (illustrative only)", "150–200%", "140–190%"],
];

// Protected Equity Loan and Option & Loan Facility share LVR ranges.
const LVR: FamilyBands = [
    ["LVR ~70–80% (illustrative only)", "70–80%", "70–80%"],
    ["LVR ~70–85% (illustrative only)", "70–85%", "70–85%"],
    ["LVR ~70–85% (illustrative only)", "70–85%", "70–85%"],
    ["LVR ~70–85% (illustrative only)", "70–85%", "70–85%"],
    ["LVR ~70–85% (illustrative only)", "70–85%", "70–85%"],
];

const HEDGING_TEXT: &str = "Premium depends on vol/strike; ask desk";
const HEDGING: FamilyBands = [[HEDGING_TEXT; 3]; 5];

const ENHANCED_GROWTH: FamilyBands = [
    ["Participation ~1.2–1.6× (illustrative only)", "1.2–1.6×", "1.1–1.5×"],
    ["Participation ~1.3–1.8× (illustrative only)", "1.3–1.8×", "1.2–1.7×"],
    ["Participation ~1.4–2.0× (illustrative only)", "1.4–2.0×", "1.3–1.9×"],
    ["Participation ~1.5–2.2× (illustrative only)", "1.5–2.2×", "1.4–2.0×"],
    ["Participation ~1.6–2.3× (illustrative only)", "1.6–2.3×", "1.5–2.1×"],
];

const LENDING_LRL: FamilyBands = [
    ["Outlay ~3–6% of notional (illustrative only)", "3–6%", "3–6%"],
    ["Outlay ~6–12% of notional (illustrative only)", "6–12%", "6–12%"],
    ["Outlay ~9–18% of notional (illustrative only)", "9–18%", "9–18%"],
    ["Outlay ~15–25% of notional (illustrative only)", "15–25%", "15–25%"],
    [
        "Outlay varies; ask desk",
        "Outlay varies; ask desk",
        "Outlay varies; ask desk",
    ],
];

fn family_bands(family: Family) -> &'static FamilyBands {
    match family {
        Family::FixedCouponNote => &FIXED_COUPON_NOTE,
        Family::SmartEntryNote => &SMART_ENTRY_NOTE,
        Family::DiscountEntryNote => &DISCOUNT_ENTRY_NOTE,
        Family::PrincipalProtectedNote => &PRINCIPAL_PROTECTED_NOTE,
        Family::ProtectedEquityLoan | Family::OptionLoanFacility => &LVR,
        Family::Hedging => &HEDGING,
        Family::EnhancedGrowth => &ENHANCED_GROWTH,
        Family::LendingLrl => &LENDING_LRL,
    }
}

fn currency_column(currency: Currency) -> usize {
    match currency {
        Currency::Aud => 0,
        Currency::Usd => 1,
        Currency::Eur => 2,
    }
}

pub fn static_band(family: Family, bucket: TenorBucket, currency: Currency) -> &'static str {
    family_bands(family)[bucket.index()][currency_column(currency)]
}

/// Static band for a tenor in months and a currency code. Codes outside the
/// authored currencies have no entry.
pub fn fallback_band(family: Family, tenor_months: u32, currency: &str) -> Option<&'static str> {
    let currency = Currency::parse(currency)?;
    Some(static_band(
        family,
        TenorBucket::for_months(tenor_months),
        currency,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buckets_are_inclusive_at_upper_edges() {
        let labels: Vec<_> = [3, 12, 13, 24, 25, 36, 37, 60, 61, 72]
            .into_iter()
            .map(|m| TenorBucket::for_months(m).label())
            .collect();
        assert_eq!(
            labels,
            vec![
                "≤12", "≤12", "13–24", "13–24", "25–36", "25–36", "37–60", "37–60", ">60", ">60"
            ]
        );
    }

    #[test]
    fn every_family_bucket_and_currency_is_authored() {
        let buckets = [
            TenorBucket::UpTo12,
            TenorBucket::To24,
            TenorBucket::To36,
            TenorBucket::To60,
            TenorBucket::Over60,
        ];
        for family in Family::ALL {
            for bucket in buckets {
                for ccy in [Currency::Aud, Currency::Usd, Currency::Eur] {
                    assert!(!static_band(family, bucket, ccy).is_empty());
                }
            }
        }
    }

    #[test]
    fn looks_up_fixed_coupon_entries() {
        assert_eq!(
            fallback_band(Family::FixedCouponNote, 18, "aud"),
            Some("7–11% p.a. (illustrative only)")
        );
        assert_eq!(
            fallback_band(Family::SmartEntryNote, 72, "EUR"),
            Some("8–11% p.a. (illustrative only)")
        );
    }

    #[test]
    fn unknown_currency_has_no_entry() {
        assert_eq!(fallback_band(Family::Hedging, 12, "JPY"), None);
    }
}
