pub mod family;
pub mod inputs;

pub use family::{Family, Objective};
pub use inputs::{Currency, RiskProfile, WizardInputs};
