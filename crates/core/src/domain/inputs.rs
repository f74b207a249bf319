use crate::domain::family::Objective;
use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MIN_TENOR_MONTHS: u32 = 3;
pub const MAX_TENOR_MONTHS: u32 = 72;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskProfile {
    Conservative,
    Moderate,
    Aggressive,
}

impl RiskProfile {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Conservative => "Conservative",
            Self::Moderate => "Moderate",
            Self::Aggressive => "Aggressive",
        }
    }
}

impl fmt::Display for RiskProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Investment currencies the static band table is authored for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Aud,
    Usd,
    Eur,
}

impl Currency {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Aud => "AUD",
            Self::Usd => "USD",
            Self::Eur => "EUR",
        }
    }

    /// Case-insensitive ISO code lookup; anything else has no table coverage.
    pub fn parse(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "AUD" => Some(Self::Aud),
            "USD" => Some(Self::Usd),
            "EUR" => Some(Self::Eur),
            _ => None,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wizard payload as it arrives over the wire. Nothing here is trusted until
/// [`WizardRequest::validate_and_into_inputs`] has run.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardRequest {
    pub objective: Option<Objective>,
    pub tenor_months: Option<f64>,
    pub underliers: Option<Vec<String>>,
    pub risk_profile: Option<RiskProfile>,
    pub investment_currency: Option<Currency>,
    pub notes: Option<String>,
}

/// Validated request parameters. The core never sees anything else.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardInputs {
    pub objective: Objective,
    pub tenor_months: u32,
    pub underliers: Vec<String>,
    pub risk_profile: RiskProfile,
    pub investment_currency: Currency,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl WizardRequest {
    pub fn validate_and_into_inputs(self) -> anyhow::Result<WizardInputs> {
        let objective = self.objective.context("objective is required")?;
        let risk_profile = self.risk_profile.context("riskProfile is required")?;

        let tenor = self.tenor_months.context("tenorMonths is required")?;
        ensure!(
            tenor.is_finite() && tenor.fract() == 0.0,
            "tenorMonths must be a whole number of months (got {tenor})"
        );
        ensure!(
            (f64::from(MIN_TENOR_MONTHS)..=f64::from(MAX_TENOR_MONTHS)).contains(&tenor),
            "tenorMonths must be between {MIN_TENOR_MONTHS} and {MAX_TENOR_MONTHS} (got {tenor})"
        );

        let underliers = clean_underliers(self.underliers.context("underliers must be a list")?);
        ensure!(!underliers.is_empty(), "underliers must be non-empty");

        let notes = self
            .notes
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(WizardInputs {
            objective,
            tenor_months: tenor as u32,
            underliers,
            risk_profile,
            investment_currency: self.investment_currency.unwrap_or(Currency::Usd),
            notes,
        })
    }

    /// The cohort preview is a diagnostic view and fills gaps instead of
    /// rejecting them. Out-of-range tenors are still refused.
    pub fn into_preview_inputs(self) -> anyhow::Result<WizardInputs> {
        let underliers = self
            .underliers
            .map(clean_underliers)
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| vec!["SPX".to_string()]);

        Self {
            objective: Some(self.objective.unwrap_or(Objective::EnhancedIncome)),
            tenor_months: Some(self.tenor_months.unwrap_or(24.0)),
            underliers: Some(underliers),
            risk_profile: Some(self.risk_profile.unwrap_or(RiskProfile::Moderate)),
            investment_currency: Some(self.investment_currency.unwrap_or(Currency::Aud)),
            notes: self.notes,
        }
        .validate_and_into_inputs()
    }
}

fn clean_underliers(raw: Vec<String>) -> Vec<String> {
    raw.into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
