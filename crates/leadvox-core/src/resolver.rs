use std::sync::Arc;

use leadvox_store::{Filter, FindQuery, Record, RecordStore, Table};

use crate::executor::columns;

const MAX_CANDIDATES: usize = 5;

/// An existing lead picked out by a free-text identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadMatch {
    pub id: String,
    pub name: Option<String>,
}

impl LeadMatch {
    fn from_record(record: Record) -> Self {
        let name = record
            .text(columns::LEAD_NAME)
            .or_else(|| record.text(columns::CUSTOMER_NAME))
            .map(str::to_string);
        Self {
            id: record.id,
            name,
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// Looks up existing leads by name or phone fragment.
///
/// The first candidate returned by the store wins; there is no ranking.
/// Zero matches and lookup failures both come back as `None`.
pub struct EntityResolver {
    store: Arc<dyn RecordStore>,
}

impl EntityResolver {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, identifier: &str) -> Option<LeadMatch> {
        let needle = identifier.trim();
        if needle.is_empty() {
            return None;
        }
        if !self.store.is_configured(Table::Leads) {
            tracing::warn!(identifier = needle, "lead lookup skipped: store not configured");
            return None;
        }

        let query = FindQuery {
            filter: Filter::Any(vec![
                Filter::contains_ignore_case(columns::CUSTOMER_NAME, needle),
                Filter::contains(columns::CONTACT_PHONE, needle),
            ]),
            max_records: MAX_CANDIDATES,
        };

        match self.store.find(Table::Leads, &query).await {
            Ok(records) => {
                let candidates = records.len();
                let found = records.into_iter().next().map(LeadMatch::from_record);
                match &found {
                    Some(lead) => tracing::info!(
                        identifier = needle,
                        lead_id = %lead.id,
                        candidates,
                        "resolved lead"
                    ),
                    None => tracing::info!(identifier = needle, "no lead matched"),
                }
                found
            }
            Err(err) => {
                tracing::error!(identifier = needle, "lead lookup failed: {err}");
                None
            }
        }
    }
}
