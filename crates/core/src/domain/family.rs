//! Objectives, product families and the text rules that tie free-form
//! upstream descriptors to them.
//!
//! Rules are ordered `(pattern, result)` tables evaluated top to bottom; the
//! first match wins. Keeping them as data keeps the priority order visible and
//! testable.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Objective {
    #[serde(rename = "Capital Preservation")]
    CapitalPreservation,
    #[serde(rename = "Enhanced Income")]
    EnhancedIncome,
    #[serde(rename = "Growth")]
    Growth,
    #[serde(rename = "Equity Release")]
    EquityRelease,
    #[serde(rename = "Tax-Effective")]
    TaxEffective,
}

impl Objective {
    pub const ALL: [Objective; 5] = [
        Objective::CapitalPreservation,
        Objective::EnhancedIncome,
        Objective::Growth,
        Objective::EquityRelease,
        Objective::TaxEffective,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CapitalPreservation => "Capital Preservation",
            Self::EnhancedIncome => "Enhanced Income",
            Self::Growth => "Growth",
            Self::EquityRelease => "Equity Release",
            Self::TaxEffective => "Tax-Effective",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|o| o.as_str().eq_ignore_ascii_case(s.trim()))
    }

    /// Families to present for this objective, in presentation priority.
    pub fn families(self) -> &'static [Family] {
        match self {
            Self::EnhancedIncome => &[Family::FixedCouponNote, Family::SmartEntryNote],
            Self::Growth => &[Family::DiscountEntryNote, Family::EnhancedGrowth],
            Self::CapitalPreservation => &[Family::PrincipalProtectedNote, Family::Hedging],
            Self::TaxEffective => &[Family::LendingLrl, Family::ProtectedEquityLoan],
            Self::EquityRelease => &[Family::OptionLoanFacility, Family::ProtectedEquityLoan],
        }
    }

    /// Whether an upstream product descriptor belongs to this objective's
    /// product space.
    pub fn matches_descriptor(self, descriptor: &str) -> bool {
        OBJECTIVE_RULES
            .iter()
            .filter(|(objective, _)| *objective == self)
            .any(|(_, rx)| rx.is_match(descriptor))
    }

    /// Family presented when a title carries no recognisable family wording.
    pub fn default_family(self) -> Family {
        match self {
            Self::EnhancedIncome => Family::FixedCouponNote,
            Self::Growth => Family::DiscountEntryNote,
            Self::CapitalPreservation => Family::PrincipalProtectedNote,
            Self::EquityRelease => Family::OptionLoanFacility,
            Self::TaxEffective => Family::ProtectedEquityLoan,
        }
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Family {
    #[serde(rename = "Fixed Coupon Note")]
    FixedCouponNote,
    #[serde(rename = "Smart-Entry Note")]
    SmartEntryNote,
    #[serde(rename = "Discount-Entry Note")]
    DiscountEntryNote,
    #[serde(rename = "Principal Protected Note")]
    PrincipalProtectedNote,
    #[serde(rename = "Enhanced Growth (ER/Lookback)")]
    EnhancedGrowth,
    #[serde(rename = "Option & Loan Facility")]
    OptionLoanFacility,
    #[serde(rename = "Protected Equity Loan")]
    ProtectedEquityLoan,
    #[serde(rename = "Lending (LRL)")]
    LendingLrl,
    #[serde(rename = "Hedging")]
    Hedging,
}

impl Family {
    pub const ALL: [Family; 9] = [
        Family::FixedCouponNote,
        Family::SmartEntryNote,
        Family::DiscountEntryNote,
        Family::PrincipalProtectedNote,
        Family::EnhancedGrowth,
        Family::OptionLoanFacility,
        Family::ProtectedEquityLoan,
        Family::LendingLrl,
        Family::Hedging,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::FixedCouponNote => "Fixed Coupon Note",
            Self::SmartEntryNote => "Smart-Entry Note",
            Self::DiscountEntryNote => "Discount-Entry Note",
            Self::PrincipalProtectedNote => "Principal Protected Note",
            Self::EnhancedGrowth => "Enhanced Growth (ER/Lookback)",
            Self::OptionLoanFacility => "Option & Loan Facility",
            Self::ProtectedEquityLoan => "Protected Equity Loan",
            Self::LendingLrl => "Lending (LRL)",
            Self::Hedging => "Hedging",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
    }

    /// Coupon-paying families whose static band is nudged by the basket.
    pub fn is_income(self) -> bool {
        matches!(self, Self::FixedCouponNote | Self::SmartEntryNote)
    }

    pub fn matches_descriptor(self, descriptor: &str) -> bool {
        FAMILY_RULES
            .iter()
            .any(|(family, rx)| *family == self && rx.is_match(descriptor))
    }

    /// Best-effort family for a free-text title (e.g. an idea title phrased
    /// by the LLM), falling back to the objective's default family.
    pub fn detect_from_title(title: &str, objective: Option<Objective>) -> Family {
        Self::named_in(title).unwrap_or_else(|| {
            objective
                .map(Objective::default_family)
                .unwrap_or(Family::FixedCouponNote)
        })
    }

    /// First family whose wording appears in `text`, if any.
    pub fn named_in(text: &str) -> Option<Family> {
        FAMILY_RULES
            .iter()
            .find(|(_, rx)| rx.is_match(text))
            .map(|(family, _)| *family)
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Detection order matters: "smart-entry income note" is a Smart-Entry Note,
// not a Fixed Coupon Note.
static FAMILY_RULES: LazyLock<Vec<(Family, Regex)>> = LazyLock::new(|| {
    [
        (Family::SmartEntryNote, r"(?i)\bsmart[-\s]?entry\b"),
        (Family::DiscountEntryNote, r"(?i)\bdiscount[-\s]?entry\b"),
        (
            Family::PrincipalProtectedNote,
            r"(?i)\bprincipal\b|\bprotected note\b|\bppn\b",
        ),
        (
            Family::FixedCouponNote,
            r"(?i)\bfixed coupon\b|\bfcn\b|\bincome\b|\bautocall\b|\bsnowball\b",
        ),
        (
            Family::EnhancedGrowth,
            r"(?i)\benhanced growth\b|\ber\b|\blookback\b",
        ),
        (
            Family::OptionLoanFacility,
            r"(?i)\boption\b.*\bloan\b|\bequity release\b|\blof\b",
        ),
        (
            Family::ProtectedEquityLoan,
            r"(?i)\bprotected equity loan\b|\bpel\b",
        ),
        (Family::LendingLrl, r"(?i)\blimited recourse loan\b|\blrl\b"),
        (Family::Hedging, r"(?i)\bhedge\b|\bcollar\b|\bput\b"),
    ]
    .into_iter()
    .map(|(family, pattern)| (family, Regex::new(pattern).unwrap()))
    .collect()
});

static OBJECTIVE_RULES: LazyLock<Vec<(Objective, Regex)>> = LazyLock::new(|| {
    [
        (
            Objective::EnhancedIncome,
            r"(?i)fixed coupon|autocall|snowball|income|smart[-\s]?entry",
        ),
        (
            Objective::CapitalPreservation,
            r"(?i)principal protected|capital protected|ppn|hedge",
        ),
        (
            Objective::Growth,
            r"(?i)enhanced growth|leveraged call|discount[-\s]?entry|participation",
        ),
        (
            Objective::TaxEffective,
            r"(?i)limited recourse loan|lrl|enhanced growth via lrl",
        ),
        (Objective::EquityRelease, r"(?i)option.*loan|equity release"),
    ]
    .into_iter()
    .map(|(objective, pattern)| (objective, Regex::new(pattern).unwrap()))
    .collect()
});
