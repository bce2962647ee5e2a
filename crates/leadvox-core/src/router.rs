use std::sync::Arc;

use leadvox_provider::LlmProvider;
use leadvox_schema::{
    truncate_chars, ActionResult, ExtractedFields, IntentDecision, IntentKind, ProcessOutcome,
    StatusUpdateFields, Utterance,
};
use leadvox_store::{RecordStore, Table};

use crate::classifier::IntentClassifier;
use crate::clock::{Clock, SystemClock};
use crate::executor::{validate_status, ActionExecutor};
use crate::extractor::FieldExtractor;
use crate::resolver::{EntityResolver, LeadMatch};

/// Model settings for the classify and extract calls.
#[derive(Clone)]
pub struct RouterOptions {
    pub model: String,
    pub classify_max_tokens: u32,
    pub extract_max_tokens: u32,
    pub clock: Arc<dyn Clock>,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-20250514".to_string(),
            classify_max_tokens: 200,
            extract_max_tokens: 500,
            clock: Arc::new(SystemClock),
        }
    }
}

/// Result of a dry run: what would be written, without writing it.
#[derive(Debug, Clone)]
pub struct Preview {
    pub decision: IntentDecision,
    pub fields: Option<ExtractedFields>,
}

/// Runs one utterance through classify, extract, resolve and execute.
/// Nothing is retried; every failure ends in a structured outcome.
pub struct IntentRouter {
    classifier: IntentClassifier,
    extractor: FieldExtractor,
    resolver: EntityResolver,
    executor: ActionExecutor,
}

impl IntentRouter {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        store: Arc<dyn RecordStore>,
        options: RouterOptions,
    ) -> Self {
        let classifier = IntentClassifier::new(provider.clone(), options.model.clone())
            .with_max_tokens(options.classify_max_tokens);
        let extractor = FieldExtractor::new(provider, options.model, options.clock.clone())
            .with_max_tokens(options.extract_max_tokens);
        Self {
            classifier,
            extractor,
            resolver: EntityResolver::new(store.clone()),
            executor: ActionExecutor::new(store, options.clock),
        }
    }

    pub async fn process(&self, utterance: &Utterance) -> ProcessOutcome {
        tracing::info!(
            user_id = utterance.user_id.as_deref().unwrap_or("-"),
            "processing utterance: {}",
            utterance.preview()
        );

        let decision = self.classifier.classify(&utterance.text).await;
        let Some(fields) = self
            .extractor
            .extract_for(decision.kind, &utterance.text)
            .await
        else {
            return ProcessOutcome::from_action(&decision, skipped(&decision), None);
        };

        let result = self.execute(&fields).await;
        tracing::info!(
            intent = %decision.kind,
            status = ?result.status,
            "utterance processed: {}",
            result.message
        );
        ProcessOutcome::from_action(&decision, result, Some(&fields))
    }

    /// Classify and extract only. The store is never contacted.
    pub async fn preview(&self, text: &str) -> Preview {
        let decision = self.classifier.classify(text).await;
        let fields = self.extractor.extract_for(decision.kind, text).await;
        Preview { decision, fields }
    }

    /// Executes a reviewed field set without classifying again.
    pub async fn confirm(&self, fields: ExtractedFields) -> ProcessOutcome {
        tracing::info!(
            intent = %fields.kind(),
            "confirming reviewed fields: {}",
            truncate_chars(fields.raw_text(), 100)
        );
        let mut decision = IntentDecision::new(fields.kind(), 1.0);
        decision.rationale = Some("confirmed after review".to_string());
        let result = self.execute(&fields).await;
        ProcessOutcome::from_action(&decision, result, Some(&fields))
    }

    pub async fn classify_only(&self, text: &str) -> IntentDecision {
        self.classifier.classify(text).await
    }

    pub async fn extract_only(&self, kind: IntentKind, text: &str) -> Option<ExtractedFields> {
        self.extractor.extract_for(kind, text).await
    }

    async fn execute(&self, fields: &ExtractedFields) -> ActionResult {
        let identifier = fields.lead_identifier();
        match fields {
            ExtractedFields::NewLead(lead) => self.executor.create_lead(lead).await,
            ExtractedFields::CallNote(note) => {
                let lead = self.resolve(identifier).await;
                self.executor.log_activity(note, lead.as_ref()).await
            }
            ExtractedFields::Task(task) => {
                let lead = self.resolve(identifier).await;
                self.executor.create_task(task, lead.as_ref()).await
            }
            ExtractedFields::StatusUpdate(update) => self.update_status(update, identifier).await,
        }
    }

    /// A missing or unmatched identifier is an error for status changes.
    async fn update_status(
        &self,
        update: &StatusUpdateFields,
        identifier: Option<&str>,
    ) -> ActionResult {
        if let Some(result) = self.executor.unconfigured(Table::Leads) {
            return result;
        }
        let Some(identifier) = identifier else {
            return ActionResult::error("Could not identify which lead to update", Vec::new());
        };
        if let Err(message) = validate_status(update.new_status.as_deref()) {
            return ActionResult::error(message, Vec::new());
        }
        match self.resolver.resolve(identifier).await {
            Some(lead) => self.executor.update_status(update, &lead).await,
            None => ActionResult::error(
                format!("Lead not found: no match for '{identifier}'"),
                Vec::new(),
            ),
        }
    }

    async fn resolve(&self, identifier: Option<&str>) -> Option<LeadMatch> {
        match identifier {
            Some(identifier) => self.resolver.resolve(identifier).await,
            None => None,
        }
    }
}

fn skipped(decision: &IntentDecision) -> ActionResult {
    ActionResult::skipped(format!(
        "Intent '{}' has no CRM action. Try describing a new lead, a call, a status change or a task.",
        decision.kind
    ))
}
