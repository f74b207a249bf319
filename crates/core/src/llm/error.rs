use crate::llm::Provider;
use serde_json::Value;
use std::fmt;

/// Phrasing failure with enough context to debug a misbehaving provider.
/// Travels inside `anyhow::Error`; recover it with `downcast_ref`.
#[derive(Debug, Clone)]
pub struct LlmDiagnosticsError {
    pub provider: Provider,
    pub stage: &'static str,
    pub detail: String,
    pub raw_output: Option<String>,
    pub raw_response_json: Option<Value>,
}

impl fmt::Display for LlmDiagnosticsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "phrasing error (provider={:?}, stage={}): {}",
            self.provider, self.stage, self.detail
        )
    }
}

impl std::error::Error for LlmDiagnosticsError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn survives_a_trip_through_anyhow() {
        let err: anyhow::Error = LlmDiagnosticsError {
            provider: Provider::Anthropic,
            stage: "http",
            detail: "status=529".to_string(),
            raw_output: Some("overloaded".to_string()),
            raw_response_json: None,
        }
        .into();

        let diag = err.downcast_ref::<LlmDiagnosticsError>().unwrap();
        assert_eq!(diag.stage, "http");
        assert_eq!(
            err.to_string(),
            "phrasing error (provider=Anthropic, stage=http): status=529"
        );
    }
}
