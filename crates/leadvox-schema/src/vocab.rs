use serde::Serialize;

/// A closed set of values accepted by a single-select CRM column.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Vocabulary {
    pub column: &'static str,
    pub values: &'static [&'static str],
}

impl Vocabulary {
    /// Case-insensitive lookup returning the canonical spelling.
    pub fn normalize(&self, raw: &str) -> Option<&'static str> {
        let wanted = raw.trim();
        self.values
            .iter()
            .copied()
            .find(|candidate| candidate.eq_ignore_ascii_case(wanted))
    }

    pub fn contains(&self, raw: &str) -> bool {
        self.normalize(raw).is_some()
    }

    /// Comma-separated listing used in prompts and error messages.
    pub fn listing(&self) -> String {
        self.values.join(", ")
    }
}

pub const LEAD_SOURCES: Vocabulary = Vocabulary {
    column: "Lead Source",
    values: &[
        "Referral",
        "Website",
        "Walk-in",
        "Phone Call",
        "Repeat Customer",
        "Other",
    ],
};

/// RR residential remodel, RN residential new construction,
/// CR commercial remodel, CN commercial new construction.
pub const JOB_SEGMENTS: Vocabulary = Vocabulary {
    column: "Job Segment",
    values: &["RR", "RN", "CR", "CN"],
};

pub const PRIORITIES: Vocabulary = Vocabulary {
    column: "Priority",
    values: &["Low", "Medium", "High", "Critical"],
};

pub const LEAD_STATUSES: Vocabulary = Vocabulary {
    column: "Status",
    values: &[
        "New",
        "Contacted",
        "Qualified",
        "Converted to Opportunity",
        "Lost",
    ],
};

pub const ACTIVITY_TYPES: Vocabulary = Vocabulary {
    column: "Activity Type",
    values: &[
        "Call",
        "Email",
        "Meeting",
        "Site Visit",
        "Text Message",
        "Other",
    ],
};

pub const TASK_TYPES: Vocabulary = Vocabulary {
    column: "Task Type",
    values: &[
        "Lead Follow-up",
        "Site Visit",
        "Quote Preparation",
        "Measurement",
        "Installation",
        "Other",
    ],
};

pub const DEFAULT_LEAD_SOURCE: &str = "Phone Call";
pub const FALLBACK_LEAD_SOURCE: &str = "Other";
pub const INITIAL_LEAD_STATUS: &str = "New";
pub const DEFAULT_ACTIVITY_TYPE: &str = "Call";
pub const FALLBACK_ACTIVITY_TYPE: &str = "Other";
pub const DEFAULT_TASK_TYPE: &str = "Lead Follow-up";
pub const FALLBACK_TASK_TYPE: &str = "Other";
pub const DEFAULT_TASK_PRIORITY: &str = "Medium";
pub const INITIAL_TASK_STATUS: &str = "Not Started";
