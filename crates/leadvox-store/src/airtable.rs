use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{Fields, Filter, FindQuery, Record, RecordStore, StoreError, Table};

fn default_api_base() -> String {
    "https://api.airtable.com/v0".to_string()
}

fn default_web_base() -> String {
    "https://airtable.com".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableIds {
    #[serde(default)]
    pub leads: Option<String>,
    #[serde(default)]
    pub activities: Option<String>,
    #[serde(default)]
    pub tasks: Option<String>,
}

impl TableIds {
    pub fn get(&self, table: Table) -> Option<&str> {
        let id = match table {
            Table::Leads => self.leads.as_deref(),
            Table::Activities => self.activities.as_deref(),
            Table::Tasks => self.tasks.as_deref(),
        };
        id.filter(|id| !id.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirtableConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_id: Option<String>,
    #[serde(default)]
    pub tables: TableIds,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_web_base")]
    pub web_base: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AirtableConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_id: None,
            tables: TableIds::default(),
            api_base: default_api_base(),
            web_base: default_web_base(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl AirtableConfig {
    fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }

    fn base_id(&self) -> Option<&str> {
        self.base_id.as_deref().filter(|b| !b.trim().is_empty())
    }

    /// Names of the settings still missing for `table`.
    pub fn missing_settings(&self, table: Table) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.api_key().is_none() {
            missing.push("api_key");
        }
        if self.base_id().is_none() {
            missing.push("base_id");
        }
        if self.tables.get(table).is_none() {
            missing.push(match table {
                Table::Leads => "tables.leads",
                Table::Activities => "tables.activities",
                Table::Tasks => "tables.tasks",
            });
        }
        missing
    }
}

/// Airtable REST client for the CRM base.
#[derive(Debug, Clone)]
pub struct AirtableStore {
    client: reqwest::Client,
    config: AirtableConfig,
}

impl AirtableStore {
    pub fn new(config: AirtableConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        Self { client, config }
    }

    pub fn config(&self) -> &AirtableConfig {
        &self.config
    }

    /// Resolves the credentials and table id, or reports the table as
    /// unconfigured.
    fn target(&self, table: Table) -> Result<(&str, String), StoreError> {
        let (Some(api_key), Some(base_id), Some(table_id)) = (
            self.config.api_key(),
            self.config.base_id(),
            self.config.tables.get(table),
        ) else {
            return Err(StoreError::Unconfigured(table));
        };
        let url = format!(
            "{}/{}/{}",
            self.config.api_base.trim_end_matches('/'),
            urlencoding::encode(base_id),
            urlencoding::encode(table_id)
        );
        Ok((api_key, url))
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        table: Table,
        request: reqwest::RequestBuilder,
    ) -> Result<T, StoreError> {
        let resp = request.send().await.map_err(|e| {
            if e.is_timeout() {
                StoreError::Transport(format!(
                    "request timed out after {}s",
                    self.config.timeout_secs
                ))
            } else {
                StoreError::Transport(e.to_string())
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::error!(%table, status = status.as_u16(), body = %body, "airtable rejected request");
            if status == StatusCode::NOT_FOUND {
                return Err(StoreError::NotFound(body));
            }
            return Err(StoreError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        resp.json::<T>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }
}

#[async_trait]
impl RecordStore for AirtableStore {
    fn is_configured(&self, table: Table) -> bool {
        self.config.missing_settings(table).is_empty()
    }

    async fn find(&self, table: Table, query: &FindQuery) -> Result<Vec<Record>, StoreError> {
        let (api_key, url) = self.target(table)?;
        let formula = render_formula(&query.filter);
        tracing::debug!(%table, %formula, "airtable find");

        let request = self.client.get(url).bearer_auth(api_key).query(&[
            ("filterByFormula", formula),
            ("maxRecords", query.max_records.to_string()),
        ]);
        let page: RecordPage = self.execute(table, request).await?;
        Ok(page.records)
    }

    async fn get(&self, table: Table, record_id: &str) -> Result<Record, StoreError> {
        let (api_key, url) = self.target(table)?;
        let request = self
            .client
            .get(format!("{url}/{}", urlencoding::encode(record_id)))
            .bearer_auth(api_key);
        self.execute(table, request).await
    }

    async fn create(&self, table: Table, fields: Fields) -> Result<Record, StoreError> {
        let (api_key, url) = self.target(table)?;
        let request = self
            .client
            .post(url)
            .bearer_auth(api_key)
            .json(&WriteBody { fields });
        self.execute(table, request).await
    }

    async fn update(
        &self,
        table: Table,
        record_id: &str,
        fields: Fields,
    ) -> Result<Record, StoreError> {
        let (api_key, url) = self.target(table)?;
        let request = self
            .client
            .patch(format!("{url}/{}", urlencoding::encode(record_id)))
            .bearer_auth(api_key)
            .json(&WriteBody { fields });
        self.execute(table, request).await
    }

    fn record_url(&self, table: Table, record_id: &str) -> Option<String> {
        let base_id = self.config.base_id()?;
        let table_id = self.config.tables.get(table)?;
        Some(format!(
            "{}/{base_id}/{table_id}/{record_id}",
            self.config.web_base.trim_end_matches('/')
        ))
    }
}

#[derive(Debug, Serialize)]
struct WriteBody {
    fields: Fields,
}

#[derive(Debug, Deserialize)]
struct RecordPage {
    #[serde(default)]
    records: Vec<Record>,
}

/// Renders a filter as an Airtable formula.
pub fn render_formula(filter: &Filter) -> String {
    match filter {
        Filter::ContainsIgnoreCase { column, needle } => format!(
            "FIND(LOWER({}), LOWER({}))",
            quote(needle),
            column_ref(column)
        ),
        Filter::Contains { column, needle } => {
            format!("FIND({}, {})", quote(needle), column_ref(column))
        }
        Filter::Any(filters) => {
            let parts: Vec<String> = filters.iter().map(render_formula).collect();
            format!("OR({})", parts.join(", "))
        }
    }
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn column_ref(column: &str) -> String {
    format!("{{{}}}", column.replace('}', "\\}"))
}
