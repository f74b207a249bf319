use crate::llm::PhrasedIdea;
use anyhow::{ensure, Context};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct PhrasingPayload {
    pub suggestions: Vec<PhrasedIdea>,
}

impl PhrasingPayload {
    pub fn validate(self, expected_cards: usize) -> anyhow::Result<Vec<PhrasedIdea>> {
        ensure!(
            !self.suggestions.is_empty(),
            "phrasing returned no suggestions"
        );
        ensure!(
            self.suggestions.len() <= expected_cards,
            "phrasing returned {} suggestions for {expected_cards} cards",
            self.suggestions.len()
        );
        Ok(self.suggestions)
    }
}

pub fn extract_json(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.starts_with("```") {
        // Drop the opening fence line (```json or ```) and the closing fence.
        let mut inner = trimmed;
        if let Some(after_first) = inner.splitn(2, '\n').nth(1) {
            inner = after_first;
        }
        if let Some(end) = inner.rfind("```") {
            inner = &inner[..end];
        }
        return Some(inner.trim().to_string());
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(trimmed[start..=end].trim().to_string())
}

pub fn parse_phrasing(text: &str, expected_cards: usize) -> anyhow::Result<Vec<PhrasedIdea>> {
    let json_str = extract_json(text).unwrap_or_else(|| text.trim().to_string());
    let parsed = serde_json::from_str::<PhrasingPayload>(&json_str)
        .with_context(|| {
            format!("phrasing output is not valid JSON for the card schema: {json_str}")
        })?;
    parsed.validate(expected_cards)
}
