use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::IntentKind;

/// Fields for a brand-new lead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewLeadFields {
    #[serde(default, deserialize_with = "lenient_text")]
    pub customer_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub contact_phone: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub contact_email: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub property_address: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub lead_source: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub job_segment: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub priority: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub initial_notes: Option<String>,
    #[serde(default)]
    pub raw_transcription: String,
}

/// Fields for a call or other interaction logged against an existing lead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallNoteFields {
    #[serde(default, deserialize_with = "lenient_text")]
    pub lead_identifier: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub activity_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub subject: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub duration_minutes: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub follow_up_date: Option<String>,
    #[serde(default)]
    pub raw_transcription: String,
}

/// Fields for moving an existing lead to another pipeline status.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdateFields {
    #[serde(default, deserialize_with = "lenient_text")]
    pub lead_identifier: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub new_status: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub reason: Option<String>,
    #[serde(default)]
    pub raw_transcription: String,
}

/// Fields for a follow-up task, optionally tied to a lead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskFields {
    #[serde(default, deserialize_with = "lenient_text")]
    pub lead_identifier: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub task_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub task_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub due_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub priority: Option<String>,
    #[serde(default)]
    pub raw_transcription: String,
}

/// Output of exactly one extractor, chosen by the classified intent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum ExtractedFields {
    NewLead(NewLeadFields),
    CallNote(CallNoteFields),
    StatusUpdate(StatusUpdateFields),
    Task(TaskFields),
}

impl ExtractedFields {
    pub fn kind(&self) -> IntentKind {
        match self {
            Self::NewLead(_) => IntentKind::NewLead,
            Self::CallNote(_) => IntentKind::CallNote,
            Self::StatusUpdate(_) => IntentKind::StatusUpdate,
            Self::Task(_) => IntentKind::Task,
        }
    }

    pub fn raw_text(&self) -> &str {
        match self {
            Self::NewLead(f) => &f.raw_transcription,
            Self::CallNote(f) => &f.raw_transcription,
            Self::StatusUpdate(f) => &f.raw_transcription,
            Self::Task(f) => &f.raw_transcription,
        }
    }

    /// The free-text reference to an existing lead, if this intent carries one.
    pub fn lead_identifier(&self) -> Option<&str> {
        match self {
            Self::NewLead(_) => None,
            Self::CallNote(f) => f.lead_identifier.as_deref(),
            Self::StatusUpdate(f) => f.lead_identifier.as_deref(),
            Self::Task(f) => f.lead_identifier.as_deref(),
        }
    }

    /// Rebuilds a field set from a client-supplied JSON object, e.g. a
    /// reviewed preview. Malformed values are treated as absent.
    pub fn from_client(kind: IntentKind, value: Value, raw_transcription: &str) -> Option<Self> {
        let raw = raw_transcription.to_string();
        let fields = match kind {
            IntentKind::NewLead => Self::NewLead(NewLeadFields {
                raw_transcription: raw,
                ..serde_json::from_value::<NewLeadFields>(value).unwrap_or_default()
            }),
            IntentKind::CallNote => Self::CallNote(CallNoteFields {
                raw_transcription: raw,
                ..serde_json::from_value::<CallNoteFields>(value).unwrap_or_default()
            }),
            IntentKind::StatusUpdate => Self::StatusUpdate(StatusUpdateFields {
                raw_transcription: raw,
                ..serde_json::from_value::<StatusUpdateFields>(value).unwrap_or_default()
            }),
            IntentKind::Task => Self::Task(TaskFields {
                raw_transcription: raw,
                ..serde_json::from_value::<TaskFields>(value).unwrap_or_default()
            }),
            IntentKind::Unknown => return None,
        };
        Some(fields)
    }

    /// Normalized view for client display: extracted attributes only,
    /// without the intent tag or the verbatim transcription.
    pub fn display_view(&self) -> Value {
        let mut value = match self {
            Self::NewLead(f) => serde_json::to_value(f),
            Self::CallNote(f) => serde_json::to_value(f),
            Self::StatusUpdate(f) => serde_json::to_value(f),
            Self::Task(f) => serde_json::to_value(f),
        }
        .unwrap_or(Value::Null);
        if let Some(map) = value.as_object_mut() {
            map.remove("raw_transcription");
        }
        value
    }
}

/// Accepts strings, numbers and booleans; blank strings and literal
/// "null"/"none" become `None`, as do arrays and objects.
pub fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(text_from_value))
}

/// Accepts numbers and numeric strings; anything else becomes `None`.
pub fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(number_from_value))
}

pub fn text_from_value(value: Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty()
                || trimmed.eq_ignore_ascii_case("null")
                || trimmed.eq_ignore_ascii_case("none")
            {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn number_from_value(value: Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            let numeric = trimmed
                .strip_suffix("minutes")
                .or_else(|| trimmed.strip_suffix("mins"))
                .or_else(|| trimmed.strip_suffix("min"))
                .unwrap_or(trimmed)
                .trim();
            numeric.parse::<f64>().ok()
        }
        _ => None,
    }?;
    (number.is_finite() && number >= 0.0).then_some(number)
}
