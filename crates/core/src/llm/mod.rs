pub mod anthropic;
pub mod error;
pub mod json;

pub use anthropic::AnthropicPhraser;
pub use error::LlmDiagnosticsError;

use crate::domain::WizardInputs;
use crate::ideas::IdeaCard;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
}

/// Reworded text for one idea card, matched to cards by position. Missing
/// or blank fields leave the card's own text in place.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhrasedIdea {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub explainer: Option<String>,
    #[serde(default)]
    pub article_url: Option<String>,
}

#[async_trait::async_trait]
pub trait IdeaPhraser: Send + Sync {
    /// Reported as the response `model` when phrasing succeeds.
    fn model(&self) -> &str;

    async fn phrase(
        &self,
        inputs: &WizardInputs,
        ideas: &[IdeaCard],
    ) -> anyhow::Result<Vec<PhrasedIdea>>;
}
