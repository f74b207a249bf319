//! Short label/value chips summarising how each family is usually struck
//! for a given risk appetite.

use crate::domain::{Family, RiskProfile, WizardInputs};
use crate::indicative::has_exotic_basket;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MechanicsChip {
    pub label: &'static str,
    pub value: String,
}

impl MechanicsChip {
    fn new(label: &'static str, value: impl Into<String>) -> Self {
        Self {
            label,
            value: value.into(),
        }
    }
}

static AUTOCALL_INDEX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)SPX|SX5E|XJO|NDX|DAX|HSI|MSCI|NASDAQ|S&P").unwrap());

static TRAILING_NOTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(.*?\)\s*$").unwrap());

fn barrier_band(risk: RiskProfile) -> &'static str {
    match risk {
        RiskProfile::Conservative => "50–60% KI",
        RiskProfile::Moderate => "40–50% KI",
        RiskProfile::Aggressive => "30–40% KI",
    }
}

fn autocall_frequency(underliers: &[String]) -> &'static str {
    if underliers.iter().all(|u| AUTOCALL_INDEX_RE.is_match(u)) {
        "Quarterly AC"
    } else {
        "Semi-annual AC"
    }
}

fn protection_level(risk: RiskProfile) -> &'static str {
    match risk {
        RiskProfile::Aggressive => "90–95% Prot",
        _ => "95–100% Prot",
    }
}

fn participation_band(risk: RiskProfile, tenor_months: u32) -> String {
    let years = (f64::from(tenor_months) / 12.0).clamp(0.5, 6.0);
    let low = 120 + (8.0 * years).round() as u32;
    let ceiling = match risk {
        RiskProfile::Conservative => 160,
        RiskProfile::Moderate => 180,
        RiskProfile::Aggressive => 200,
    };
    let high = ceiling + (5.0 * years).round() as u32;
    format!("{low}–{high}% Part.")
}

fn discount_band(risk: RiskProfile) -> &'static str {
    match risk {
        RiskProfile::Conservative => "25–35% Disc.",
        RiskProfile::Moderate => "20–30% Disc.",
        RiskProfile::Aggressive => "15–25% Disc.",
    }
}

fn smart_entry_level(risk: RiskProfile) -> &'static str {
    match risk {
        RiskProfile::Conservative => "SE @ ~85–90%",
        RiskProfile::Moderate => "SE @ ~83–88%",
        RiskProfile::Aggressive => "SE @ ~80–85%",
    }
}

fn lvr_band(risk: RiskProfile) -> &'static str {
    match risk {
        RiskProfile::Conservative => "LVR 60–75%",
        RiskProfile::Moderate => "LVR 70–85%",
        RiskProfile::Aggressive => "LVR 75–90%",
    }
}

/// Chips for one idea card. `coupon` is the band shown on the card; its
/// trailing parenthetical is dropped for the chip.
pub fn mechanics_chips(
    family: Family,
    inputs: &WizardInputs,
    coupon: Option<&str>,
) -> Vec<MechanicsChip> {
    let risk = inputs.risk_profile;
    let coupon = coupon.map(|c| TRAILING_NOTE_RE.replace(c, "").into_owned());
    let mut chips = Vec::new();

    match family {
        Family::FixedCouponNote => {
            chips.push(MechanicsChip::new("Barrier", barrier_band(risk)));
            chips.push(MechanicsChip::new("Autocall", autocall_frequency(&inputs.underliers)));
            chips.extend(coupon.map(|c| MechanicsChip::new("Coupon", c)));
        }
        Family::SmartEntryNote => {
            chips.push(MechanicsChip::new("Smart-Entry", smart_entry_level(risk)));
            chips.push(MechanicsChip::new("Autocall", autocall_frequency(&inputs.underliers)));
            chips.extend(coupon.map(|c| MechanicsChip::new("Coupon", c)));
        }
        Family::DiscountEntryNote => {
            chips.push(MechanicsChip::new("Discount", discount_band(risk)));
            let basket = if inputs.underliers.len() > 1 {
                "Basket (WP)"
            } else {
                "Single"
            };
            chips.push(MechanicsChip::new("Worst-of", basket));
        }
        Family::PrincipalProtectedNote => {
            chips.push(MechanicsChip::new("Protection", protection_level(risk)));
            chips.push(MechanicsChip::new(
                "Part.",
                participation_band(risk, inputs.tenor_months),
            ));
        }
        Family::EnhancedGrowth => {
            chips.push(MechanicsChip::new(
                "Part.",
                participation_band(risk, inputs.tenor_months),
            ));
            chips.push(MechanicsChip::new("Feature", "Lookback / Avg-out"));
        }
        Family::OptionLoanFacility => {
            chips.push(MechanicsChip::new("Collar", "Put floor / Call cap"));
            chips.push(MechanicsChip::new("Loan", lvr_band(risk)));
        }
        Family::ProtectedEquityLoan => {
            chips.push(MechanicsChip::new("Loan", lvr_band(risk)));
            chips.push(MechanicsChip::new("Note", "Potential tax deductibility"));
        }
        Family::LendingLrl => {
            chips.push(MechanicsChip::new("Loan", lvr_band(risk)));
            chips.push(MechanicsChip::new("Risk", "Loss limited to interest"));
        }
        Family::Hedging => {
            chips.push(MechanicsChip::new("Structure", "Put / Put-Spread / Collar"));
            chips.push(MechanicsChip::new("Focus", "Downside reduction"));
        }
    }

    if has_exotic_basket(&inputs.underliers) {
        chips.push(MechanicsChip::new("Note", "May be harder to price"));
    }
    chips.push(MechanicsChip::new("Tenor", format!("{}m", inputs.tenor_months)));
    chips.push(MechanicsChip::new("CCY", inputs.investment_currency.as_str()));
    chips
}
