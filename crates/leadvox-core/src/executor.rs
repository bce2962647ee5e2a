use std::sync::Arc;

use chrono::Duration;
use leadvox_schema::vocab::{self, Vocabulary};
use leadvox_schema::{
    ActionResult, CallNoteFields, NewLeadFields, StatusUpdateFields, TaskFields,
};
use leadvox_store::{Fields, RecordStore, Table};
use serde_json::Value;

use crate::clock::{stamp, Clock};
use crate::dates;
use crate::intent::normalize_date;
use crate::resolver::LeadMatch;

/// Column names in the CRM base.
pub mod columns {
    pub const CUSTOMER_NAME: &str = "Customer Name";
    pub const PROPERTY_ADDRESS: &str = "Property Address";
    pub const CONTACT_PHONE: &str = "Contact Phone";
    pub const CONTACT_EMAIL: &str = "Contact Email";
    pub const LEAD_SOURCE: &str = "Lead Source";
    pub const JOB_SEGMENT: &str = "Job Segment";
    pub const PRIORITY: &str = "Priority";
    pub const STATUS: &str = "Status";
    pub const INITIAL_NOTES: &str = "Initial Notes";
    /// Formula column computed by the store.
    pub const LEAD_NAME: &str = "Lead Name";

    pub const LEAD_LINK: &str = "Lead";
    pub const ACTIVITY_TYPE: &str = "Activity Type";
    pub const SUBJECT: &str = "Subject";
    pub const ACTIVITY_DATE: &str = "Activity Date";
    pub const DURATION_MINUTES: &str = "Duration (Minutes)";
    pub const FOLLOW_UP_DATE: &str = "Follow-up Date";
    pub const NOTES: &str = "Notes";

    pub const TASK_NAME: &str = "Task Name";
    pub const TASK_TYPE: &str = "Task Type";
    pub const DUE_DATE: &str = "Due Date";
}

/// Outgoing column values plus the ordered list of what was populated.
/// Defaulted and remapped values carry a marker in the list.
#[derive(Debug, Default)]
struct FieldSet {
    fields: Fields,
    populated: Vec<String>,
}

impl FieldSet {
    fn set(&mut self, column: &str, value: impl Into<Value>) {
        self.fields.insert(column.to_string(), value.into());
        self.populated.push(column.to_string());
    }

    fn set_opt(&mut self, column: &str, value: Option<&str>) {
        if let Some(value) = value {
            self.set(column, value);
        }
    }

    fn set_default(&mut self, column: &str, value: impl Into<Value>) {
        self.fields.insert(column.to_string(), value.into());
        self.populated.push(format!("{column} (default)"));
    }

    fn set_mapped(&mut self, column: &str, value: impl Into<Value>) {
        self.fields.insert(column.to_string(), value.into());
        self.populated.push(format!("{column} (mapped)"));
    }

    /// Sends the canonical spelling of a recognized value; drops anything
    /// outside the vocabulary.
    fn set_enum(&mut self, vocab: &Vocabulary, raw: Option<&str>) -> bool {
        let Some(raw) = raw else {
            return false;
        };
        match vocab.normalize(raw) {
            Some(canonical) => {
                self.set(vocab.column, canonical);
                true
            }
            None => {
                tracing::warn!(column = vocab.column, value = raw, "dropping unrecognized value");
                false
            }
        }
    }

    /// Recognized value, else `fallback` marked as mapped, else `default`
    /// marked as defaulted when nothing was extracted.
    fn set_enum_or(
        &mut self,
        vocab: &Vocabulary,
        raw: Option<&str>,
        default: &'static str,
        fallback: &'static str,
    ) -> &'static str {
        match raw {
            None => {
                self.set_default(vocab.column, default);
                default
            }
            Some(raw) => match vocab.normalize(raw) {
                Some(canonical) => {
                    self.set(vocab.column, canonical);
                    canonical
                }
                None => {
                    tracing::info!(column = vocab.column, value = raw, mapped = fallback, "mapping unrecognized value");
                    self.set_mapped(vocab.column, fallback);
                    fallback
                }
            },
        }
    }
}

/// Extracted notes followed by the timestamped verbatim utterance.
fn notes_with_transcript(notes: Option<&str>, raw: &str, at: &str) -> String {
    let transcript = format!("---\nVoice transcription ({at}):\n{raw}");
    match notes {
        Some(notes) => format!("{notes}\n\n{transcript}"),
        None => transcript,
    }
}

/// Validates a requested lead status against the closed pipeline stages.
pub fn validate_status(raw: Option<&str>) -> Result<&'static str, String> {
    let listing = vocab::LEAD_STATUSES.listing();
    match raw {
        None => Err(format!("No target status found. Valid statuses: {listing}")),
        Some(raw) => vocab::LEAD_STATUSES
            .normalize(raw)
            .ok_or_else(|| format!("Invalid status '{raw}'. Valid statuses: {listing}")),
    }
}

/// Applies extracted field sets to the system of record.
pub struct ActionExecutor {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
}

impl ActionExecutor {
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// The error result for a table with missing connection settings.
    pub fn unconfigured(&self, table: Table) -> Option<ActionResult> {
        if self.store.is_configured(table) {
            return None;
        }
        tracing::error!(%table, "store configuration missing");
        Some(ActionResult::error(
            format!(
                "Store configuration missing for the {table} table. Check environment variables or config/main.yaml."
            ),
            Vec::new(),
        ))
    }

    pub async fn create_lead(&self, lead: &NewLeadFields) -> ActionResult {
        if let Some(result) = self.unconfigured(Table::Leads) {
            return result;
        }

        let mut set = FieldSet::default();
        set.set_opt(columns::CUSTOMER_NAME, lead.customer_name.as_deref());
        set.set_opt(columns::PROPERTY_ADDRESS, lead.property_address.as_deref());
        set.set_opt(columns::CONTACT_PHONE, lead.contact_phone.as_deref());
        set.set_opt(columns::CONTACT_EMAIL, lead.contact_email.as_deref());
        set.set_enum_or(
            &vocab::LEAD_SOURCES,
            lead.lead_source.as_deref(),
            vocab::DEFAULT_LEAD_SOURCE,
            vocab::FALLBACK_LEAD_SOURCE,
        );
        set.set_enum(&vocab::JOB_SEGMENTS, lead.job_segment.as_deref());
        set.set_enum(&vocab::PRIORITIES, lead.priority.as_deref());
        set.set(columns::STATUS, vocab::INITIAL_LEAD_STATUS);
        set.set(
            columns::INITIAL_NOTES,
            notes_with_transcript(
                lead.initial_notes.as_deref(),
                &lead.raw_transcription,
                &stamp(self.clock.now()),
            ),
        );

        let FieldSet { fields, populated } = set;
        match self.store.create(Table::Leads, fields).await {
            Ok(record) => {
                let name = record
                    .text(columns::LEAD_NAME)
                    .map(str::to_string)
                    .or_else(|| lead.customer_name.clone());
                let url = self.store.record_url(Table::Leads, &record.id);
                tracing::info!(record_id = %record.id, "created lead");
                ActionResult::created(
                    record.id,
                    name,
                    populated,
                    format!(
                        "Successfully created lead for {}",
                        lead.customer_name.as_deref().unwrap_or("unknown customer")
                    ),
                    url,
                )
            }
            Err(err) => {
                tracing::error!("lead creation failed: {err}");
                ActionResult::error(format!("Failed to create lead: {err}"), populated)
            }
        }
    }

    /// Logs an interaction. An activity without a matched lead is still
    /// created, just unlinked.
    pub async fn log_activity(&self, note: &CallNoteFields, lead: Option<&LeadMatch>) -> ActionResult {
        if let Some(result) = self.unconfigured(Table::Activities) {
            return result;
        }

        let now = self.clock.now();
        let mut set = FieldSet::default();
        if let Some(lead) = lead {
            set.set(columns::LEAD_LINK, vec![lead.id.clone()]);
        }
        let activity_type = set.set_enum_or(
            &vocab::ACTIVITY_TYPES,
            note.activity_type.as_deref(),
            vocab::DEFAULT_ACTIVITY_TYPE,
            vocab::FALLBACK_ACTIVITY_TYPE,
        );
        let subject = match note.subject.as_deref() {
            Some(subject) => {
                set.set(columns::SUBJECT, subject);
                subject.to_string()
            }
            None => {
                let subject = match lead {
                    Some(lead) => format!("{activity_type} with {}", lead.display_name()),
                    None => activity_type.to_string(),
                };
                set.set_default(columns::SUBJECT, subject.clone());
                subject
            }
        };
        set.set(columns::ACTIVITY_DATE, dates::format_date(now.date()));
        if let Some(minutes) = note.duration_minutes {
            set.set(columns::DURATION_MINUTES, minutes);
        }
        set.set_opt(
            columns::FOLLOW_UP_DATE,
            normalize_date(note.follow_up_date.clone(), now.date()).as_deref(),
        );
        set.set(
            columns::NOTES,
            notes_with_transcript(note.summary.as_deref(), &note.raw_transcription, &stamp(now)),
        );

        let FieldSet { fields, populated } = set;
        match self.store.create(Table::Activities, fields).await {
            Ok(record) => {
                let url = self.store.record_url(Table::Activities, &record.id);
                let message = match (lead, note.lead_identifier.as_deref()) {
                    (Some(lead), _) => format!("Logged {activity_type} for {}", lead.display_name()),
                    (None, Some(identifier)) => format!(
                        "Logged {activity_type} without a lead link: no match for '{identifier}'"
                    ),
                    (None, None) => format!("Logged {activity_type} without a lead link"),
                };
                tracing::info!(record_id = %record.id, linked = lead.is_some(), "logged activity");
                ActionResult::created(record.id, Some(subject), populated, message, url)
            }
            Err(err) => {
                tracing::error!("activity creation failed: {err}");
                ActionResult::error(format!("Failed to log activity: {err}"), populated)
            }
        }
    }

    /// Moves `lead` to the requested status. With a reason, the lead's notes
    /// are read first and the annotation is written in the same update as
    /// the status. The read-then-write is not atomic: a concurrent notes
    /// edit between the two calls is overwritten.
    pub async fn update_status(&self, update: &StatusUpdateFields, lead: &LeadMatch) -> ActionResult {
        if let Some(result) = self.unconfigured(Table::Leads) {
            return result;
        }
        let status = match validate_status(update.new_status.as_deref()) {
            Ok(status) => status,
            Err(message) => return ActionResult::error(message, Vec::new()),
        };

        let mut set = FieldSet::default();
        set.set(columns::STATUS, status);

        if let Some(reason) = update.reason.as_deref() {
            let current = match self.store.get(Table::Leads, &lead.id).await {
                Ok(record) => record
                    .text(columns::INITIAL_NOTES)
                    .unwrap_or_default()
                    .to_string(),
                Err(err) => {
                    tracing::error!(lead_id = %lead.id, "reading lead notes failed: {err}");
                    return ActionResult::error(
                        format!("Failed to read notes for {}: {err}", lead.display_name()),
                        set.populated,
                    );
                }
            };
            let annotation = format!(
                "---\nStatus changed to {status} ({}): {reason}",
                stamp(self.clock.now())
            );
            let notes = if current.trim().is_empty() {
                annotation
            } else {
                format!("{current}\n\n{annotation}")
            };
            set.set(columns::INITIAL_NOTES, notes);
        }

        let FieldSet { fields, populated } = set;
        match self.store.update(Table::Leads, &lead.id, fields).await {
            Ok(record) => {
                let url = self.store.record_url(Table::Leads, &record.id);
                tracing::info!(record_id = %record.id, status, "updated lead status");
                ActionResult::updated(
                    record.id,
                    lead.name.clone(),
                    populated,
                    format!("Updated {} to {status}", lead.display_name()),
                    url,
                )
            }
            Err(err) => {
                tracing::error!("status update failed: {err}");
                ActionResult::error(format!("Failed to update status: {err}"), populated)
            }
        }
    }

    pub async fn create_task(&self, task: &TaskFields, lead: Option<&LeadMatch>) -> ActionResult {
        if let Some(result) = self.unconfigured(Table::Tasks) {
            return result;
        }

        let now = self.clock.now();
        let mut set = FieldSet::default();
        let task_type = set.set_enum_or(
            &vocab::TASK_TYPES,
            task.task_type.as_deref(),
            vocab::DEFAULT_TASK_TYPE,
            vocab::FALLBACK_TASK_TYPE,
        );
        match task.task_name.as_deref() {
            Some(name) => set.set(columns::TASK_NAME, name),
            None => {
                let name = match lead {
                    Some(lead) => format!("{task_type}: {}", lead.display_name()),
                    None => task_type.to_string(),
                };
                set.set_default(columns::TASK_NAME, name);
            }
        }
        if let Some(lead) = lead {
            set.set(columns::LEAD_LINK, vec![lead.id.clone()]);
        }
        match normalize_date(task.due_date.clone(), now.date()) {
            Some(due) => set.set(columns::DUE_DATE, due),
            None => set.set_default(
                columns::DUE_DATE,
                dates::format_date(now.date() + Duration::days(1)),
            ),
        }
        let priority = task
            .priority
            .as_deref()
            .and_then(|raw| vocab::PRIORITIES.normalize(raw));
        match priority {
            Some(priority) => set.set(columns::PRIORITY, priority),
            None => set.set_default(columns::PRIORITY, vocab::DEFAULT_TASK_PRIORITY),
        }
        set.set(columns::STATUS, vocab::INITIAL_TASK_STATUS);
        set.set(
            columns::NOTES,
            notes_with_transcript(task.description.as_deref(), &task.raw_transcription, &stamp(now)),
        );

        let task_name = set
            .fields
            .get(columns::TASK_NAME)
            .and_then(Value::as_str)
            .map(str::to_string);
        let FieldSet { fields, populated } = set;
        match self.store.create(Table::Tasks, fields).await {
            Ok(record) => {
                let url = self.store.record_url(Table::Tasks, &record.id);
                let message = match lead {
                    Some(lead) => format!("Created task for {}", lead.display_name()),
                    None => "Created task".to_string(),
                };
                tracing::info!(record_id = %record.id, linked = lead.is_some(), "created task");
                ActionResult::created(record.id, task_name, populated, message, url)
            }
            Err(err) => {
                tracing::error!("task creation failed: {err}");
                ActionResult::error(format!("Failed to create task: {err}"), populated)
            }
        }
    }
}
