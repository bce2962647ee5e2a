use std::sync::Arc;

use leadvox_core::*;
use leadvox_provider::AnthropicProvider;
use leadvox_schema::{ActionStatus, IntentKind, Utterance};
use leadvox_store::{AirtableConfig, AirtableStore, TableIds};
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn anthropic_text(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "content": [{"type": "text", "text": text}],
        "usage": {"input_tokens": 100, "output_tokens": 20},
        "stop_reason": "end_turn"
    }))
}

async fn mount_llm(server: &MockServer, classification: &str, extraction: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(body_string_contains("classify what CRM action"))
        .respond_with(anthropic_text(classification))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(body_string_contains("Respond in JSON format only"))
        .and(body_partial_json(serde_json::json!({"max_tokens": 500})))
        .respond_with(anthropic_text(extraction))
        .mount(server)
        .await;
}

fn airtable(server: &MockServer) -> AirtableStore {
    AirtableStore::new(AirtableConfig {
        api_key: Some("pat-test".into()),
        base_id: Some("appCRM".into()),
        tables: TableIds {
            leads: Some("tblLeads".into()),
            activities: Some("tblActivities".into()),
            tasks: Some("tblTasks".into()),
        },
        api_base: server.uri(),
        web_base: "https://airtable.com".into(),
        timeout_secs: 5,
    })
}

fn router(llm: &MockServer, store: &MockServer) -> IntentRouter {
    IntentRouter::new(
        Arc::new(AnthropicProvider::new("test-key", llm.uri())),
        Arc::new(airtable(store)),
        RouterOptions::default(),
    )
}

#[tokio::test]
async fn voice_note_creates_airtable_lead() {
    let llm = MockServer::start().await;
    let store = MockServer::start().await;
    mount_llm(
        &llm,
        "```json\n{\"intent\": \"new_lead\", \"confidence\": 0.93}\n```",
        "{\"customer_name\": \"Sarah Johnson\", \"contact_phone\": \"555-123-4567\", \"lead_source\": \"referral\", \"job_segment\": \"RR\"}",
    )
    .await;

    Mock::given(method("POST"))
        .and(path("/appCRM/tblLeads"))
        .and(header("authorization", "Bearer pat-test"))
        .and(body_partial_json(serde_json::json!({
            "fields": {
                "Customer Name": "Sarah Johnson",
                "Lead Source": "Referral",
                "Job Segment": "RR",
                "Status": "New"
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "recLead1",
            "fields": {"Lead Name": "Sarah Johnson - RR"}
        })))
        .expect(1)
        .mount(&store)
        .await;

    let outcome = router(&llm, &store)
        .process(&Utterance::new("Got a call from Sarah Johnson at 555-123-4567"))
        .await;

    assert_eq!(outcome.status, ActionStatus::Created);
    assert_eq!(outcome.intent, IntentKind::NewLead);
    assert_eq!(outcome.record_name.as_deref(), Some("Sarah Johnson - RR"));
    assert_eq!(
        outcome.external_url.as_deref(),
        Some("https://airtable.com/appCRM/tblLeads/recLead1")
    );
}

#[tokio::test]
async fn status_update_looks_up_then_patches() {
    let llm = MockServer::start().await;
    let store = MockServer::start().await;
    mount_llm(
        &llm,
        "{\"intent\": \"status_update\", \"confidence\": 0.9}",
        "{\"lead_identifier\": \"Mark Smith\", \"new_status\": \"Contacted\"}",
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/appCRM/tblLeads"))
        .and(query_param("maxRecords", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "records": [{"id": "recMark", "fields": {"Customer Name": "Mark Smith"}}]
        })))
        .expect(1)
        .mount(&store)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/appCRM/tblLeads/recMark"))
        .and(body_partial_json(serde_json::json!({"fields": {"Status": "Contacted"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "recMark",
            "fields": {"Status": "Contacted"}
        })))
        .expect(1)
        .mount(&store)
        .await;

    let outcome = router(&llm, &store)
        .process(&Utterance::new("Mark Smith has been contacted"))
        .await;

    assert_eq!(outcome.status, ActionStatus::Updated);
    assert_eq!(outcome.record_id.as_deref(), Some("recMark"));
}

#[tokio::test]
async fn airtable_outage_on_lookup_reads_as_not_found() {
    let llm = MockServer::start().await;
    let store = MockServer::start().await;
    mount_llm(
        &llm,
        "{\"intent\": \"status_update\", \"confidence\": 0.9}",
        "{\"lead_identifier\": \"Mark Smith\", \"new_status\": \"Lost\"}",
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/appCRM/tblLeads"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&store)
        .await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&store)
        .await;

    let outcome = router(&llm, &store)
        .process(&Utterance::new("Mark Smith is lost"))
        .await;

    assert_eq!(outcome.status, ActionStatus::Error);
    assert!(outcome.message.contains("not found"));
}
