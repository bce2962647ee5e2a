use std::sync::Arc;

use anyhow::Result;
use leadvox_provider::{LlmProvider, LlmRequest};
use leadvox_schema::{
    CallNoteFields, ExtractedFields, IntentKind, NewLeadFields, StatusUpdateFields, TaskFields,
};

use crate::clock::Clock;
use crate::intent::IntentSpec;
use crate::structured;

/// Turns an utterance into the field set of a given intent. Extraction never
/// fails outward; on any error the field set is empty apart from the
/// verbatim utterance.
pub struct FieldExtractor {
    provider: Arc<dyn LlmProvider>,
    model: String,
    max_tokens: u32,
    clock: Arc<dyn Clock>,
}

impl FieldExtractor {
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            provider,
            model: model.into(),
            max_tokens: 500,
            clock,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub async fn extract<S: IntentSpec>(&self, text: &str) -> S {
        let today = self.clock.today();
        let mut fields = match self.try_extract::<S>(text, today).await {
            Ok(fields) => fields,
            Err(err) => {
                tracing::error!(intent = %S::KIND, "field extraction error: {err:#}");
                S::default()
            }
        };
        fields.normalize(today);
        fields.attach_text(text);
        fields
    }

    /// Runs the extractor matching `kind`. `Unknown` has none.
    pub async fn extract_for(&self, kind: IntentKind, text: &str) -> Option<ExtractedFields> {
        let fields = match kind {
            IntentKind::NewLead => self.extract::<NewLeadFields>(text).await.into_fields(),
            IntentKind::CallNote => self.extract::<CallNoteFields>(text).await.into_fields(),
            IntentKind::StatusUpdate => {
                self.extract::<StatusUpdateFields>(text).await.into_fields()
            }
            IntentKind::Task => self.extract::<TaskFields>(text).await.into_fields(),
            IntentKind::Unknown => return None,
        };
        Some(fields)
    }

    async fn try_extract<S: IntentSpec>(&self, text: &str, today: chrono::NaiveDate) -> Result<S> {
        let request = LlmRequest::simple(&self.model, S::prompt(text, today), self.max_tokens);
        let response = self.provider.chat(request).await?;
        tracing::debug!(intent = %S::KIND, raw = %response.text, "extractor output");
        structured::parse_structured::<S>(&response.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use leadvox_provider::LlmResponse;

    struct Reply(Option<&'static str>);

    #[async_trait]
    impl LlmProvider for Reply {
        async fn chat(&self, _request: LlmRequest) -> Result<LlmResponse> {
            match self.0 {
                Some(text) => Ok(LlmResponse::text(text)),
                None => Err(anyhow::anyhow!("overloaded")),
            }
        }
    }

    fn extractor(reply: Option<&'static str>) -> FieldExtractor {
        let clock = FixedClock::at_noon(NaiveDate::from_ymd_opt(2026, 1, 7).unwrap());
        FieldExtractor::new(Arc::new(Reply(reply)), "m", Arc::new(clock))
    }

    #[tokio::test]
    async fn extracts_new_lead_and_keeps_text() {
        let text = "Got a call from Sarah Johnson at 555-123-4567";
        let fields: NewLeadFields = extractor(Some(
            "```json\n{\"customer_name\": \"Sarah Johnson\", \"contact_phone\": \"555-123-4567\", \"lead_source\": null}\n```",
        ))
        .extract(text)
        .await;
        assert_eq!(fields.customer_name.as_deref(), Some("Sarah Johnson"));
        assert_eq!(fields.contact_phone.as_deref(), Some("555-123-4567"));
        assert_eq!(fields.lead_source, None);
        assert_eq!(fields.raw_transcription, text);
    }

    #[tokio::test]
    async fn provider_error_yields_empty_fields_with_text() {
        let fields: CallNoteFields = extractor(None).extract("Talked to Ann").await;
        assert_eq!(
            fields,
            CallNoteFields {
                raw_transcription: "Talked to Ann".into(),
                ..Default::default()
            }
        );
    }

    #[tokio::test]
    async fn malformed_output_yields_empty_fields_with_text() {
        let fields: TaskFields = extractor(Some("no idea")).extract("remind me").await;
        assert_eq!(fields.task_name, None);
        assert_eq!(fields.raw_transcription, "remind me");
    }

    #[tokio::test]
    async fn invalid_duration_is_absent_and_dates_resolve() {
        let fields: CallNoteFields = extractor(Some(
            "{\"lead_identifier\": \"Ann\", \"duration_minutes\": \"a while\", \"follow_up_date\": \"Friday\"}",
        ))
        .extract("Talked to Ann for a while, follow up Friday")
        .await;
        assert_eq!(fields.lead_identifier.as_deref(), Some("Ann"));
        assert_eq!(fields.duration_minutes, None);
        assert_eq!(fields.follow_up_date.as_deref(), Some("2026-01-09"));
    }

    #[tokio::test]
    async fn out_of_range_due_date_is_dropped() {
        let fields: TaskFields = extractor(Some(
            "{\"task_name\": \"Call back\", \"due_date\": \"in 99999999 days\"}",
        ))
        .extract("remind me to call back in 99999999 days")
        .await;
        assert_eq!(fields.task_name.as_deref(), Some("Call back"));
        assert_eq!(fields.due_date, None);
    }

    #[tokio::test]
    async fn extract_for_dispatches_by_kind() {
        let ex = extractor(Some("{\"new_status\": \"Qualified\"}"));
        let fields = ex
            .extract_for(IntentKind::StatusUpdate, "Mark Smith as qualified")
            .await
            .unwrap();
        assert_eq!(fields.kind(), IntentKind::StatusUpdate);
        assert!(ex.extract_for(IntentKind::Unknown, "x").await.is_none());
    }
}
