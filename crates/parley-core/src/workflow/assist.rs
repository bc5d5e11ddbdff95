//! ComposeAssist -- reply suggestions and tone rewrites for the composer.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;

use parley_types::generation::{GenerationError, GenerationRequest};

use crate::generation::BoxGenerationClient;
use crate::generation::prompt::{rewrite_prompt, suggestions_prompt};

use super::retry::RetryPolicy;

/// Structured output requested for reply suggestions.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ReplySuggestions {
    /// A reply suggestion.
    #[serde(default)]
    pub suggestions: Vec<String>,
}

/// One-shot helpers that never touch conversation state.
pub struct ComposeAssist {
    client: Arc<BoxGenerationClient>,
    retry: RetryPolicy,
}

impl ComposeAssist {
    pub fn new(client: Arc<BoxGenerationClient>, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    /// Three short replies to `message`. A response without the
    /// `suggestions` field yields an empty list.
    #[tracing::instrument(skip_all)]
    pub async fn suggest_replies(&self, message: &str) -> Result<Vec<String>, GenerationError> {
        let schema = serde_json::to_value(schemars::schema_for!(ReplySuggestions))
            .map_err(|e| GenerationError::InvalidRequest(e.to_string()))?;
        let request = GenerationRequest::text(suggestions_prompt(message)).with_response_schema(schema);

        let raw = self
            .retry
            .run_while(|| self.client.generate_text(&request), GenerationError::is_transient)
            .await?;
        let parsed: ReplySuggestions = serde_json::from_str(raw.trim())
            .map_err(|e| GenerationError::InvalidResponse(format!("suggestions: {e}")))?;
        Ok(parsed.suggestions)
    }

    /// `message` rewritten in `tone`, trimmed.
    #[tracing::instrument(skip(self, message))]
    pub async fn rewrite_message(&self, message: &str, tone: &str) -> Result<String, GenerationError> {
        let request = GenerationRequest::text(rewrite_prompt(message, tone));
        let rewritten = self
            .retry
            .run_while(|| self.client.generate_text(&request), GenerationError::is_transient)
            .await?;
        Ok(rewritten.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Script, ScriptedClient};

    fn assist() -> (ComposeAssist, Arc<Script>) {
        let (client, script) = ScriptedClient::new();
        (
            ComposeAssist::new(Arc::new(BoxGenerationClient::new(client)), RetryPolicy::none()),
            script,
        )
    }

    #[tokio::test]
    async fn suggestions_are_parsed_from_json() {
        let (assist, script) = assist();
        script.push_text(Ok(r#"{"suggestions": ["Sure!", "Maybe later", "What time?"]}"#.to_string()));

        let suggestions = assist.suggest_replies("Dinner tonight?").await.unwrap();

        assert_eq!(suggestions, vec!["Sure!", "Maybe later", "What time?"]);
        let request = &script.requests()[0];
        let schema = request.response_schema.as_ref().unwrap();
        assert!(schema["properties"]["suggestions"].is_object());
        assert!(request.prompt_text().ends_with("Message: \"Dinner tonight?\""));
    }

    #[tokio::test]
    async fn missing_field_yields_empty_list() {
        let (assist, script) = assist();
        script.push_text(Ok("{}".to_string()));
        assert!(assist.suggest_replies("hi").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_json_is_invalid_response() {
        let (assist, script) = assist();
        script.push_text(Ok("Sure! / Maybe".to_string()));
        let err = assist.suggest_replies("hi").await.unwrap_err();
        assert!(matches!(err, GenerationError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn rewrite_is_trimmed() {
        let (assist, script) = assist();
        script.push_text(Ok("  Good afternoon, could we reschedule?\n".to_string()));

        let rewritten = assist
            .rewrite_message("hey can we move it", "Professional")
            .await
            .unwrap();

        assert_eq!(rewritten, "Good afternoon, could we reschedule?");
        assert!(script.requests()[0]
            .prompt_text()
            .starts_with("Rewrite the following message in a Professional tone."));
    }

    #[tokio::test]
    async fn configuration_error_propagates() {
        let (assist, script) = assist();
        script.push_text(Err(GenerationError::Configuration("API key missing".into())));
        let err = assist.rewrite_message("hi", "Casual").await.unwrap_err();
        assert_eq!(err, GenerationError::Configuration("API key missing".into()));
    }
}
