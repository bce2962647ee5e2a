use chrono::NaiveDate;
use leadvox_schema::{
    CallNoteFields, ExtractedFields, IntentKind, NewLeadFields, StatusUpdateFields, TaskFields,
};
use serde::de::DeserializeOwned;

use crate::{dates, prompts};

/// Per-intent descriptor: how to prompt for a field set and how to tidy
/// what the model returned.
pub trait IntentSpec: DeserializeOwned + Default + Send + 'static {
    const KIND: IntentKind;

    fn prompt(text: &str, today: NaiveDate) -> String;

    /// Stores the verbatim utterance on the field set.
    fn attach_text(&mut self, raw: &str);

    /// Local post-processing after extraction. Dates are rewritten to
    /// `YYYY-MM-DD` and dropped when unparseable.
    fn normalize(&mut self, _today: NaiveDate) {}

    fn into_fields(self) -> ExtractedFields;
}

impl IntentSpec for NewLeadFields {
    const KIND: IntentKind = IntentKind::NewLead;

    fn prompt(text: &str, _today: NaiveDate) -> String {
        prompts::new_lead(text)
    }

    fn attach_text(&mut self, raw: &str) {
        self.raw_transcription = raw.to_string();
    }

    fn into_fields(self) -> ExtractedFields {
        ExtractedFields::NewLead(self)
    }
}

impl IntentSpec for CallNoteFields {
    const KIND: IntentKind = IntentKind::CallNote;

    fn prompt(text: &str, today: NaiveDate) -> String {
        prompts::call_note(text, today)
    }

    fn attach_text(&mut self, raw: &str) {
        self.raw_transcription = raw.to_string();
    }

    fn normalize(&mut self, today: NaiveDate) {
        self.follow_up_date = normalize_date(self.follow_up_date.take(), today);
    }

    fn into_fields(self) -> ExtractedFields {
        ExtractedFields::CallNote(self)
    }
}

impl IntentSpec for StatusUpdateFields {
    const KIND: IntentKind = IntentKind::StatusUpdate;

    fn prompt(text: &str, _today: NaiveDate) -> String {
        prompts::status_update(text)
    }

    fn attach_text(&mut self, raw: &str) {
        self.raw_transcription = raw.to_string();
    }

    fn into_fields(self) -> ExtractedFields {
        ExtractedFields::StatusUpdate(self)
    }
}

impl IntentSpec for TaskFields {
    const KIND: IntentKind = IntentKind::Task;

    fn prompt(text: &str, today: NaiveDate) -> String {
        prompts::task(text, today)
    }

    fn attach_text(&mut self, raw: &str) {
        self.raw_transcription = raw.to_string();
    }

    fn normalize(&mut self, today: NaiveDate) {
        self.due_date = normalize_date(self.due_date.take(), today);
    }

    fn into_fields(self) -> ExtractedFields {
        ExtractedFields::Task(self)
    }
}

pub(crate) fn normalize_date(raw: Option<String>, today: NaiveDate) -> Option<String> {
    let raw = raw?;
    match dates::resolve_date(&raw, today) {
        Some(date) => Some(dates::format_date(date)),
        None => {
            tracing::warn!(value = %raw, "dropping unparseable date");
            None
        }
    }
}
