use crate::config::Settings;
use crate::domain::WizardInputs;
use crate::ideas::IdeaCard;
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::json::{self, PhrasingPayload};
use crate::llm::{IdeaPhraser, PhrasedIdea, Provider};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const REPAIR_ATTEMPTS: u32 = 1;

const TOOL_NAME_EMIT_PHRASING: &str = "emit_phrasing";

#[derive(Debug, Clone)]
pub struct AnthropicPhraser {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicPhraser {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_anthropic_api_key()?.to_string();
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.anthropic_timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            api_key,
            base_url: settings.anthropic_base_url.clone(),
            model: settings.anthropic_model.clone(),
            max_tokens: settings.anthropic_max_tokens,
        })
    }

    async fn create_message(
        &self,
        req: CreateMessageRequest,
    ) -> anyhow::Result<(serde_json::Value, CreateMessageResponse)> {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_str(&self.api_key)?);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );

        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .post(url)
            .headers(headers)
            .json(&req)
            .send()
            .await
            .context("Anthropic request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read Anthropic response body")?;
        if !status.is_success() {
            let raw_response_json = serde_json::from_str::<serde_json::Value>(&text).ok();
            return Err(LlmDiagnosticsError {
                provider: Provider::Anthropic,
                stage: "http",
                detail: format!("status={status}"),
                raw_output: Some(text),
                raw_response_json,
            }
            .into());
        }

        let raw_json = serde_json::from_str::<serde_json::Value>(&text)
            .with_context(|| format!("failed to parse Anthropic response JSON: {text}"))?;
        let parsed = serde_json::from_value::<CreateMessageResponse>(raw_json.clone())
            .context("failed to decode Anthropic response into CreateMessageResponse")?;
        Ok((raw_json, parsed))
    }

    fn request(&self, content: String, max_tokens: u32) -> CreateMessageRequest {
        CreateMessageRequest {
            model: self.model.clone(),
            max_tokens,
            system: Some(Self::system_prompt()),
            messages: vec![Message {
                role: "user",
                content,
            }],
            tools: Some(Self::tools()),
            tool_choice: Some(Self::tool_choice()),
        }
    }

    fn tools() -> Vec<Tool> {
        let schema = serde_json::json!({
            "type": "object",
            "additionalProperties": false,
            "required": ["suggestions"],
            "properties": {
                "suggestions": {
                    "type": "array",
                    "minItems": 1,
                    "maxItems": 3,
                    "items": {
                        "type": "object",
                        "additionalProperties": false,
                        "required": ["title", "explainer"],
                        "properties": {
                            "title": {"type": "string"},
                            "explainer": {"type": "string"},
                            "articleUrl": {"type": ["string", "null"]}
                        }
                    }
                }
            }
        });

        vec![Tool {
            name: TOOL_NAME_EMIT_PHRASING,
            description: "Emit reworded titles and explainers for the idea cards, in card order",
            input_schema: schema,
        }]
    }

    fn tool_choice() -> ToolChoice {
        ToolChoice::Tool {
            name: TOOL_NAME_EMIT_PHRASING,
        }
    }

    fn system_prompt() -> String {
        [
            "You write idea-card copy for licensed advisers (wholesale only).",
            "Tone: factual, adviser-focused, concise. Never promise returns.",
            "Mention issuer credit risk where relevant. Say \"seek independent tax advice\" instead of giving tax advice.",
            "You only reword each card's title and explainer (1-3 sentences).",
            "Do NOT invent or restate numeric ranges; bands and mechanics are shown separately.",
            "Keep the product family named in each card.",
            "Return ONLY valid JSON: {\"suggestions\": [{\"title\": \"...\", \"explainer\": \"...\", \"articleUrl\": null}]}",
            "One entry per card, in the same order as the cards.",
        ]
        .join("\n")
    }

    fn user_prompt(inputs: &WizardInputs, ideas: &[IdeaCard]) -> String {
        let cards = ideas
            .iter()
            .enumerate()
            .map(|(i, card)| {
                format!(
                    "{}. family={} title=\"{}\" explainer=\"{}\"",
                    i + 1,
                    card.family,
                    card.title,
                    card.explainer
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "Objective: {}\nTenor (months): {}\nUnderliers: {}\nRisk: {}\nCurrency: {}\nNotes: {}\n\nCards:\n{cards}",
            inputs.objective,
            inputs.tenor_months,
            inputs.underliers.join(", "),
            inputs.risk_profile,
            inputs.investment_currency,
            inputs.notes.as_deref().unwrap_or("—"),
        )
    }

    fn repair_prompt(previous_output: &str, expected_cards: usize) -> String {
        format!(
            "Your previous message was NOT valid JSON.\n\n\
TASK: Output ONLY a single JSON object of the form {{\"suggestions\": [...]}}.\n\
- Do NOT include any markdown, prose, or code fences.\n\
- Provide between 1 and {expected_cards} entries, each with keys title and explainer.\n\
- Use double quotes for all JSON strings.\n\n\
INVALID OUTPUT (for reference only; DO NOT copy verbatim):\n{previous_output}"
        )
    }

    fn response_text(res: &CreateMessageResponse) -> String {
        let mut out = String::new();
        for block in &res.content {
            if let ContentBlock::Text { text } = block {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(text);
            }
        }
        out
    }

    fn response_tool_phrasing(
        res: &CreateMessageResponse,
    ) -> anyhow::Result<Option<PhrasingPayload>> {
        for block in &res.content {
            if let ContentBlock::ToolUse { name, input, .. } = block {
                if name == TOOL_NAME_EMIT_PHRASING {
                    let parsed = serde_json::from_value::<PhrasingPayload>(input.clone())
                        .context("failed to decode tool_use.input into phrasing payload")?;
                    return Ok(Some(parsed));
                }
            }
        }
        Ok(None)
    }

    async fn try_parse_with_repairs(
        &self,
        expected_cards: usize,
        initial_text: String,
        initial_raw_json: serde_json::Value,
    ) -> anyhow::Result<Vec<PhrasedIdea>> {
        let mut last_err = match json::parse_phrasing(&initial_text, expected_cards) {
            Ok(phrased) => return Ok(phrased),
            Err(err) => err,
        };
        let mut last_text = initial_text;
        let mut last_raw_json = initial_raw_json;

        for attempt in 1..=REPAIR_ATTEMPTS {
            let req = self.request(
                Self::repair_prompt(&last_text, expected_cards),
                self.max_tokens,
            );
            let (repair_raw_json, repair_res) = self.create_message(req).await?;
            if let Some(payload) = Self::response_tool_phrasing(&repair_res)? {
                return payload.validate(expected_cards);
            }
            let repair_text = Self::response_text(&repair_res);
            match json::parse_phrasing(&repair_text, expected_cards) {
                Ok(phrased) => return Ok(phrased),
                Err(err) => {
                    tracing::warn!(attempt, error = %err, "phrasing output still invalid after repair attempt");
                    last_err = err;
                    last_text = repair_text;
                    last_raw_json = repair_raw_json;
                }
            }
        }

        Err(LlmDiagnosticsError {
            provider: Provider::Anthropic,
            stage: "parse_after_repair",
            detail: format!("final_error={last_err}"),
            raw_output: Some(last_text),
            raw_response_json: Some(last_raw_json),
        }
        .into())
    }
}

#[async_trait::async_trait]
impl IdeaPhraser for AnthropicPhraser {
    fn model(&self) -> &str {
        &self.model
    }

    async fn phrase(
        &self,
        inputs: &WizardInputs,
        ideas: &[IdeaCard],
    ) -> anyhow::Result<Vec<PhrasedIdea>> {
        let prompt = Self::user_prompt(inputs, ideas);
        let (mut raw_json, mut res) = self
            .create_message(self.request(prompt.clone(), self.max_tokens))
            .await?;

        if matches!(res.stop_reason.as_deref(), Some("max_tokens")) {
            let bumped = self.max_tokens.saturating_mul(2).max(2048);
            tracing::warn!(
                from = self.max_tokens,
                to = bumped,
                "Anthropic stop_reason=max_tokens; retrying once with higher max_tokens"
            );
            let (rj, r) = self.create_message(self.request(prompt, bumped)).await?;
            raw_json = rj;
            res = r;
        }

        if let Some(payload) = Self::response_tool_phrasing(&res)? {
            return payload.validate(ideas.len());
        }

        let text = Self::response_text(&res);
        self.try_parse_with_repairs(ideas.len(), text, raw_json).await
    }
}

#[derive(Debug, Clone, Serialize)]
struct CreateMessageRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,

    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,
}

#[derive(Debug, Clone, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct CreateMessageResponse {
    content: Vec<ContentBlock>,

    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct Tool {
    name: &'static str,
    description: &'static str,
    input_schema: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
enum ToolChoice {
    #[serde(rename = "tool")]
    Tool { name: &'static str },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "tool_use")]
    ToolUse {
        #[serde(default)]
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },

    #[serde(other)]
    Unknown,
}
