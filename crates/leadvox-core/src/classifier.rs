use std::sync::Arc;

use anyhow::Result;
use leadvox_provider::{LlmProvider, LlmRequest};
use leadvox_schema::{clamp_confidence, lenient_text, IntentDecision, IntentKind};
use serde::Deserialize;
use serde_json::Value;

use crate::{prompts, structured};

const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Maps an utterance to one of the fixed intents with a single completion
/// call. Never fails: any error degrades to an `Unknown` decision.
pub struct IntentClassifier {
    provider: Arc<dyn LlmProvider>,
    model: String,
    max_tokens: u32,
}

impl IntentClassifier {
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            max_tokens: 200,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub async fn classify(&self, text: &str) -> IntentDecision {
        if text.trim().is_empty() {
            return IntentDecision::unknown("empty utterance");
        }
        match self.try_classify(text).await {
            Ok(decision) => {
                tracing::info!(
                    intent = %decision.kind,
                    confidence = decision.confidence,
                    "classified utterance"
                );
                decision
            }
            Err(err) => {
                tracing::error!("intent classification error: {err:#}");
                IntentDecision::unknown(err.to_string())
            }
        }
    }

    async fn try_classify(&self, text: &str) -> Result<IntentDecision> {
        let request =
            LlmRequest::simple(&self.model, prompts::classification(text), self.max_tokens);
        let response = self.provider.chat(request).await?;
        tracing::debug!(raw = %response.text, "classifier output");

        let raw: RawDecision = structured::parse_structured(&response.text)?;
        Ok(raw.into_decision())
    }
}

#[derive(Debug, Deserialize)]
struct RawDecision {
    #[serde(default, deserialize_with = "lenient_text")]
    intent: Option<String>,
    #[serde(default)]
    confidence: Option<Value>,
    #[serde(default, alias = "rationale", deserialize_with = "lenient_text")]
    reasoning: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    referenced_entity: Option<String>,
}

impl RawDecision {
    fn into_decision(self) -> IntentDecision {
        let kind = self
            .intent
            .as_deref()
            .map(IntentKind::parse)
            .unwrap_or(IntentKind::Unknown);
        let confidence = self
            .confidence
            .and_then(|value| match value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            })
            .unwrap_or(DEFAULT_CONFIDENCE);

        IntentDecision {
            kind,
            confidence: clamp_confidence(confidence),
            rationale: self.reasoning,
            referenced_entity: self.referenced_entity,
        }
    }
}
