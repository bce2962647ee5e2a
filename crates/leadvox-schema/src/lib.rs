pub mod fields;
pub mod vocab;

pub use fields::*;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single dictated note as it arrived at ingress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Utterance {
    #[serde(rename = "transcription")]
    pub text: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    /// Length of the source recording in seconds
    #[serde(default)]
    pub audio_duration: Option<f64>,
}

impl Utterance {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            timestamp: None,
            user_id: None,
            audio_duration: None,
        }
    }

    /// First 100 characters, for log lines.
    pub fn preview(&self) -> &str {
        truncate_chars(&self.text, 100)
    }
}

pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    NewLead,
    CallNote,
    StatusUpdate,
    Task,
    Unknown,
}

impl IntentKind {
    pub const ALL: [IntentKind; 5] = [
        Self::NewLead,
        Self::CallNote,
        Self::StatusUpdate,
        Self::Task,
        Self::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewLead => "new_lead",
            Self::CallNote => "call_note",
            Self::StatusUpdate => "status_update",
            Self::Task => "task",
            Self::Unknown => "unknown",
        }
    }

    /// Lenient parse of a model-produced label. Anything unrecognized is
    /// `Unknown`.
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "new_lead" | "create_lead" | "lead" => Self::NewLead,
            "call_note" | "log_call" | "call_log" | "activity" => Self::CallNote,
            "status_update" | "update_status" | "update_lead" => Self::StatusUpdate,
            "task" | "create_task" | "follow_up" => Self::Task,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for IntentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifier verdict for one utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentDecision {
    #[serde(rename = "intent")]
    pub kind: IntentKind,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referenced_entity: Option<String>,
}

impl IntentDecision {
    pub fn new(kind: IntentKind, confidence: f64) -> Self {
        Self {
            kind,
            confidence: clamp_confidence(confidence),
            rationale: None,
            referenced_entity: None,
        }
    }

    /// The degraded verdict used whenever classification itself failed.
    pub fn unknown(reason: impl Into<String>) -> Self {
        Self {
            kind: IntentKind::Unknown,
            confidence: 0.0,
            rationale: Some(reason.into()),
            referenced_entity: None,
        }
    }
}

pub fn clamp_confidence(raw: f64) -> f64 {
    if raw.is_nan() {
        0.0
    } else {
        raw.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Created,
    Updated,
    Error,
    Skipped,
}

impl ActionStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Created | Self::Updated)
    }
}

/// Terminal result of one executor run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub status: ActionStatus,
    pub record_id: Option<String>,
    pub record_name: Option<String>,
    #[serde(default)]
    pub fields_populated: Vec<String>,
    pub message: String,
    pub external_url: Option<String>,
}

impl ActionResult {
    pub fn created(
        record_id: impl Into<String>,
        record_name: Option<String>,
        fields_populated: Vec<String>,
        message: impl Into<String>,
        external_url: Option<String>,
    ) -> Self {
        Self {
            status: ActionStatus::Created,
            record_id: Some(record_id.into()),
            record_name,
            fields_populated,
            message: message.into(),
            external_url,
        }
    }

    pub fn updated(
        record_id: impl Into<String>,
        record_name: Option<String>,
        fields_populated: Vec<String>,
        message: impl Into<String>,
        external_url: Option<String>,
    ) -> Self {
        Self {
            status: ActionStatus::Updated,
            record_id: Some(record_id.into()),
            record_name,
            fields_populated,
            message: message.into(),
            external_url,
        }
    }

    pub fn error(message: impl Into<String>, fields_populated: Vec<String>) -> Self {
        Self {
            status: ActionStatus::Error,
            record_id: None,
            record_name: None,
            fields_populated,
            message: message.into(),
            external_url: None,
        }
    }

    pub fn skipped(message: impl Into<String>) -> Self {
        Self {
            status: ActionStatus::Skipped,
            record_id: None,
            record_name: None,
            fields_populated: Vec::new(),
            message: message.into(),
            external_url: None,
        }
    }
}

/// Uniform response envelope shared by every intent and ingress path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessOutcome {
    pub success: bool,
    pub status: ActionStatus,
    pub intent: IntentKind,
    pub confidence: f64,
    pub record_id: Option<String>,
    pub record_name: Option<String>,
    #[serde(default)]
    pub fields_populated: Vec<String>,
    pub message: String,
    pub external_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcription: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_fields: Option<Value>,
}

impl ProcessOutcome {
    pub fn from_action(
        decision: &IntentDecision,
        result: ActionResult,
        fields: Option<&ExtractedFields>,
    ) -> Self {
        Self {
            success: result.status.is_success(),
            status: result.status,
            intent: decision.kind,
            confidence: decision.confidence,
            record_id: result.record_id,
            record_name: result.record_name,
            fields_populated: result.fields_populated,
            message: result.message,
            external_url: result.external_url,
            transcription: None,
            extracted_fields: fields.map(ExtractedFields::display_view),
        }
    }

    pub fn with_transcription(mut self, transcription: impl Into<String>) -> Self {
        self.transcription = Some(transcription.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_kind_parse_accepts_aliases() {
        assert_eq!(IntentKind::parse("new_lead"), IntentKind::NewLead);
        assert_eq!(IntentKind::parse("create_lead"), IntentKind::NewLead);
        assert_eq!(IntentKind::parse("Call Note"), IntentKind::CallNote);
        assert_eq!(IntentKind::parse("status-update"), IntentKind::StatusUpdate);
        assert_eq!(IntentKind::parse("TASK"), IntentKind::Task);
        assert_eq!(IntentKind::parse("query_lead"), IntentKind::Unknown);
        assert_eq!(IntentKind::parse(""), IntentKind::Unknown);
    }

    #[test]
    fn intent_kind_serializes_snake_case() {
        let json = serde_json::to_value(IntentKind::StatusUpdate).unwrap();
        assert_eq!(json, "status_update");
        for kind in IntentKind::ALL {
            assert_eq!(IntentKind::parse(kind.as_str()), kind);
        }
    }

    #[test]
    fn decision_confidence_is_clamped() {
        assert_eq!(IntentDecision::new(IntentKind::Task, 1.7).confidence, 1.0);
        assert_eq!(IntentDecision::new(IntentKind::Task, -0.2).confidence, 0.0);
        assert_eq!(IntentDecision::new(IntentKind::Task, f64::NAN).confidence, 0.0);
    }

    #[test]
    fn unknown_decision_carries_reason() {
        let decision = IntentDecision::unknown("provider down");
        assert_eq!(decision.kind, IntentKind::Unknown);
        assert_eq!(decision.confidence, 0.0);
        assert_eq!(decision.rationale.as_deref(), Some("provider down"));
    }

    #[test]
    fn utterance_deserializes_webhook_payload() {
        let utterance: Utterance = serde_json::from_value(serde_json::json!({
            "transcription": "New lead from John Smith",
            "audio_duration": 4.5
        }))
        .unwrap();
        assert_eq!(utterance.text, "New lead from John Smith");
        assert_eq!(utterance.audio_duration, Some(4.5));
        assert!(utterance.user_id.is_none());
    }

    #[test]
    fn truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("señor", 3), "señ");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn outcome_success_follows_status() {
        let decision = IntentDecision::new(IntentKind::NewLead, 0.9);
        let created = ProcessOutcome::from_action(
            &decision,
            ActionResult::created("rec1", None, vec!["Status".into()], "ok", None),
            None,
        );
        assert!(created.success);
        assert_eq!(created.record_id.as_deref(), Some("rec1"));

        let failed = ProcessOutcome::from_action(
            &decision,
            ActionResult::error("boom", vec!["Status".into()]),
            None,
        );
        assert!(!failed.success);
        assert_eq!(failed.fields_populated, vec!["Status".to_string()]);
    }

    #[test]
    fn outcome_omits_absent_transcription() {
        let decision = IntentDecision::unknown("n/a");
        let outcome =
            ProcessOutcome::from_action(&decision, ActionResult::skipped("nothing to do"), None);
        let json = serde_json::to_value(&outcome).unwrap();
        assert!(json.get("transcription").is_none());
        assert_eq!(json["status"], "skipped");

        let json = serde_json::to_value(outcome.with_transcription("hello")).unwrap();
        assert_eq!(json["transcription"], "hello");
    }
}
