use std::{fs, path::Path};

use anyhow::{anyhow, Context, Result};
use leadvox_provider::{ProviderConfig, ProviderType};
use leadvox_store::{AirtableConfig, Table, TableIds};
use serde::{Deserialize, Serialize};

use crate::router::RouterOptions;

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_classify_max_tokens() -> u32 {
    200
}

fn default_extract_max_tokens() -> u32 {
    500
}

fn default_llm_timeout_secs() -> u64 {
    60
}

fn default_transcription_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_transcription_model() -> String {
    "whisper-1".to_string()
}

fn default_transcription_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Externally reachable base URL, advertised by the health endpoint
    #[serde(default)]
    pub public_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_url: None,
        }
    }
}

impl ServerConfig {
    pub fn public_url(&self) -> String {
        match &self.public_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://localhost:{}", self.port),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: ProviderType,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_classify_max_tokens")]
    pub classify_max_tokens: u32,
    #[serde(default = "default_extract_max_tokens")]
    pub extract_max_tokens: u32,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderType::default(),
            api_key: None,
            base_url: None,
            model: default_model(),
            classify_max_tokens: default_classify_max_tokens(),
            extract_max_tokens: default_extract_max_tokens(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

impl LlmConfig {
    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            provider_type: self.provider,
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            timeout_secs: self.timeout_secs,
        }
    }

    pub fn router_options(&self) -> RouterOptions {
        RouterOptions {
            model: self.model.clone(),
            classify_max_tokens: self.classify_max_tokens,
            extract_max_tokens: self.extract_max_tokens,
            ..RouterOptions::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_transcription_base_url")]
    pub base_url: String,
    #[serde(default = "default_transcription_model")]
    pub model: String,
    #[serde(default = "default_transcription_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_transcription_base_url(),
            model: default_transcription_model(),
            timeout_secs: default_transcription_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeadvoxConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub transcription: TranscriptionConfig,
    #[serde(default)]
    pub store: AirtableConfig,
}

pub fn resolve_env_var(raw: &str) -> String {
    let mut output = String::new();
    let mut rest = raw;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);

        let candidate = &rest[start + 2..];
        let Some(end) = candidate.find('}') else {
            output.push_str(&rest[start..]);
            return output;
        };

        let key = &candidate[..end];
        output.push_str(&std::env::var(key).unwrap_or_default());
        rest = &candidate[end + 1..];
    }

    output.push_str(rest);
    output
}

/// Substitutes `${VAR}` references; a value that resolves to blank is unset.
fn resolve_optional(value: &mut Option<String>) {
    if let Some(raw) = value.take() {
        let resolved = resolve_env_var(&raw);
        if !resolved.trim().is_empty() {
            *value = Some(resolved);
        }
    }
}

fn resolve_config_env(config: &mut LeadvoxConfig) {
    config.server.host = resolve_env_var(&config.server.host);
    resolve_optional(&mut config.server.public_url);

    resolve_optional(&mut config.llm.api_key);
    resolve_optional(&mut config.llm.base_url);
    config.llm.model = resolve_env_var(&config.llm.model);

    resolve_optional(&mut config.transcription.api_key);
    config.transcription.base_url = resolve_env_var(&config.transcription.base_url);

    resolve_optional(&mut config.store.api_key);
    resolve_optional(&mut config.store.base_id);
    resolve_optional(&mut config.store.tables.leads);
    resolve_optional(&mut config.store.tables.activities);
    resolve_optional(&mut config.store.tables.tasks);
}

/// Loads `<root>/config/main.yaml`, or builds the configuration from the
/// process environment when that file does not exist.
pub fn load_config(root: &Path) -> Result<LeadvoxConfig> {
    let path = root.join("config").join("main.yaml");
    let config = if path.exists() {
        let mut config: LeadvoxConfig = read_yaml_file(&path)?;
        resolve_config_env(&mut config);
        config
    } else {
        tracing::info!("{} not found, reading configuration from environment", path.display());
        config_from_lookup(|key| std::env::var(key).ok())?
    };

    validate_config(&config)?;
    Ok(config)
}

/// Builds a configuration from environment-style variables.
pub fn config_from_lookup<F>(lookup: F) -> Result<LeadvoxConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    let mut config = LeadvoxConfig::default();
    if let Some(host) = get("HOST") {
        config.server.host = host;
    }
    if let Some(port) = get("PORT") {
        config.server.port = port
            .trim()
            .parse()
            .with_context(|| format!("invalid PORT value: {port}"))?;
    }
    config.server.public_url = get("PUBLIC_URL");

    let anthropic_key = get("ANTHROPIC_API_KEY");
    let openai_key = get("OPENAI_API_KEY");
    match (anthropic_key, &openai_key) {
        (Some(key), _) => {
            config.llm.provider = ProviderType::Anthropic;
            config.llm.api_key = Some(key);
        }
        (None, Some(key)) => {
            config.llm.provider = ProviderType::OpenAI;
            config.llm.api_key = Some(key.clone());
            config.llm.model = "gpt-4o".to_string();
        }
        (None, None) => {}
    }
    if let Some(model) = get("LLM_MODEL") {
        config.llm.model = model;
    }

    config.transcription.api_key = openai_key;

    config.store.api_key = get("AIRTABLE_API_KEY");
    config.store.base_id = get("EF_SANJUAN_CRM_BASE_ID");
    config.store.tables = TableIds {
        leads: get("LEADS_TABLE_ID"),
        activities: get("ACTIVITIES_TABLE_ID"),
        tasks: get("TASKS_TABLE_ID"),
    };
    Ok(config)
}

/// Non-fatal gaps: features that will report errors at request time.
pub fn config_warnings(config: &LeadvoxConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    if config.transcription.api_key.is_none() {
        warnings.push("transcription.api_key is not set; audio endpoints will fail".to_string());
    }
    for table in [Table::Leads, Table::Activities, Table::Tasks] {
        let missing = config.store.missing_settings(table);
        if !missing.is_empty() {
            warnings.push(format!(
                "store is not configured for the {table} table (missing {})",
                missing.join(", ")
            ));
        }
    }
    warnings
}

pub fn validate_config(config: &LeadvoxConfig) -> Result<()> {
    if config
        .llm
        .api_key
        .as_deref()
        .map_or(true, |key| key.trim().is_empty())
    {
        return Err(anyhow!(
            "llm.api_key is required (set ANTHROPIC_API_KEY or config/main.yaml)"
        ));
    }
    if config.llm.model.trim().is_empty() {
        return Err(anyhow!("llm.model must not be empty"));
    }

    for warning in config_warnings(config) {
        tracing::warn!("{warning}");
    }
    Ok(())
}

fn read_yaml_file<T>(path: &Path) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("failed to parse yaml file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::PathBuf;

    use super::*;

    fn fixture_root() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..")
    }

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn workspace_config_parses() {
        let path = fixture_root().join("config/main.yaml");
        let config: LeadvoxConfig = read_yaml_file(&path).unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.llm.provider, ProviderType::Anthropic);
        assert_eq!(config.llm.model, "claude-sonnet-4-20250514");
        assert_eq!(config.llm.classify_max_tokens, 200);
        assert_eq!(config.transcription.model, "whisper-1");
        assert_eq!(config.store.api_base, "https://api.airtable.com/v0");
    }

    #[test]
    fn load_config_substitutes_env_and_blanks_become_unset() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("config")).unwrap();
        fs::write(
            dir.path().join("config/main.yaml"),
            r#"
llm:
  provider: anthropic
  api_key: "literal-key"
transcription:
  api_key: "${LEADVOX_TEST_UNSET_VAR_XYZ}"
store:
  api_key: "pat-test"
  base_id: "appCRM"
  tables:
    leads: "tblLeads"
"#,
        )
        .unwrap();

        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.llm.api_key.as_deref(), Some("literal-key"));
        assert!(config.transcription.api_key.is_none());
        assert_eq!(config.store.tables.leads.as_deref(), Some("tblLeads"));
        assert!(config.store.tables.tasks.is_none());
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn load_config_rejects_malformed_yaml() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("config")).unwrap();
        fs::write(dir.path().join("config/main.yaml"), "llm: [unclosed").unwrap();
        let err = load_config(dir.path()).unwrap_err();
        assert!(err.to_string().contains("failed to parse yaml file"));
    }

    #[test]
    fn env_lookup_builds_full_config() {
        let config = config_from_lookup(lookup(&[
            ("ANTHROPIC_API_KEY", "sk-ant"),
            ("OPENAI_API_KEY", "sk-oai"),
            ("AIRTABLE_API_KEY", "pat"),
            ("EF_SANJUAN_CRM_BASE_ID", "appX"),
            ("LEADS_TABLE_ID", "tblL"),
            ("ACTIVITIES_TABLE_ID", ""),
            ("PORT", "9001"),
        ]))
        .unwrap();
        assert_eq!(config.llm.provider, ProviderType::Anthropic);
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-ant"));
        assert_eq!(config.transcription.api_key.as_deref(), Some("sk-oai"));
        assert_eq!(config.store.base_id.as_deref(), Some("appX"));
        assert!(config.store.tables.activities.is_none());
        assert_eq!(config.server.port, 9001);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn env_lookup_falls_back_to_openai_for_completions() {
        let config = config_from_lookup(lookup(&[("OPENAI_API_KEY", "sk-oai")])).unwrap();
        assert_eq!(config.llm.provider, ProviderType::OpenAI);
        assert_eq!(config.llm.model, "gpt-4o");
    }

    #[test]
    fn env_lookup_rejects_bad_port() {
        let err = config_from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("invalid PORT"));
    }

    #[test]
    fn missing_llm_key_is_fatal() {
        let err = validate_config(&LeadvoxConfig::default()).unwrap_err();
        assert!(err.to_string().contains("llm.api_key is required"));
    }

    #[test]
    fn missing_store_settings_are_warnings() {
        let mut config = LeadvoxConfig::default();
        config.llm.api_key = Some("k".into());
        let warnings = config_warnings(&config);
        assert_eq!(warnings.len(), 4);
        assert!(warnings[1].contains("leads table"));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn resolve_env_var_replaces_env_placeholder() {
        let expected = std::env::var("PATH").unwrap();
        assert_eq!(resolve_env_var("${PATH}"), expected);
    }

    #[test]
    fn resolve_env_var_unclosed_bracket() {
        assert_eq!(resolve_env_var("prefix_${UNCLOSED"), "prefix_${UNCLOSED");
    }

    #[test]
    fn resolve_env_var_missing_env_returns_empty() {
        assert_eq!(resolve_env_var("val=${LEADVOX_NONEXISTENT_VAR_XYZ}"), "val=");
    }

    #[test]
    fn public_url_defaults_to_localhost_port() {
        let server = ServerConfig::default();
        assert_eq!(server.public_url(), "http://localhost:8000");
    }
}
