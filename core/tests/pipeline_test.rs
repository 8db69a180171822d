mod common;

use common::{ScriptedCompletion, Stage};
use std::sync::Arc;
use umi_assist_core::context::ConversationTurn;
use umi_assist_core::dialogue::{is_new_request, IntentClassifier, REDIRECT_MESSAGE};
use umi_assist_core::{
    ApiCatalogEntry, AssistError, Catalog, ChatService, ConversationWindow, HistoryStore, InMemoryHistory,
    PipelineConfig,
};

const CREATION: &str = r#"{"is_creation_request": true, "is_relevant": true, "reason": "creation flow"}"#;

fn service(port: Arc<ScriptedCompletion>, catalog: Catalog) -> (ChatService, Arc<InMemoryHistory>) {
    let history = InMemoryHistory::new();
    let svc = ChatService::new(port, Arc::new(catalog), history.clone(), PipelineConfig::default());
    (svc, history)
}

fn issue_catalog() -> Catalog {
    Catalog::new(vec![ApiCatalogEntry::new("Issue", "/v1/issue")])
}

#[tokio::test]
async fn gold_bond_flow_end_to_end() {
    let port = Arc::new(ScriptedCompletion::new().with_default(Stage::Classify, CREATION));
    let (svc, history) = service(port.clone(), issue_catalog());

    // turn 1: use case known, operation still open
    port.push(
        Stage::Extract,
        r#"{"usecase": "gold bond", "operation": null, "is_async": null, "is_umi_compliant": null,
            "is_private": null, "field_names": [], "event_fields": []}"#,
    );
    let first = svc.handle_turn(None, "create gold bond").await.unwrap();
    let session = first.session_id.clone();
    assert!(first.response.contains("which operation"), "{}", first.response);
    assert!(!first.response.to_lowercase().contains("async"));

    // turn 2: generator output is unusable, the keyword fallback picks up the operation
    port.push(Stage::Extract, "Sorry, I can't produce JSON today.");
    let second = svc.handle_turn(Some(&session), "create").await.unwrap();
    let lower = second.response.to_lowercase();
    assert!(second.response.starts_with("To proceed with your request"));
    for item in ["async", "umi", "private", "fields"] {
        assert!(lower.contains(item), "missing {item}: {}", second.response);
    }
    assert!(!lower.contains("event payload"));

    // turn 3: everything answered, but async needs event fields
    let third = svc
        .handle_turn(Some(&session), "async yes, umi yes, private, field id")
        .await
        .unwrap();
    let lower = third.response.to_lowercase();
    assert!(lower.contains("event"), "{}", third.response);
    assert!(!lower.contains("umi compliant"));
    assert!(!port.stages().contains(&Stage::SelectApi));

    // turn 4: event fields complete the request
    port.push(Stage::SelectApi, r#"{"api_index": 0}"#);
    port.push(Stage::RequestPayload, r#"{"payload": {"tokenizedAsset": [{"id": "GB-001"}]}}"#);
    port.push(
        Stage::EventPayload,
        r#"{"payload": {"event": [{"eventType": "ISSUED", "timestamp": "2024-01-01T00:00:00Z"}]}}"#,
    );
    let fourth = svc
        .handle_turn(Some(&session), "eventType, timestamp")
        .await
        .unwrap();
    assert!(fourth.response.starts_with("Recommended API:"));
    assert!(fourth.response.contains("/v1/issue"));
    assert!(fourth.response.contains("Suggested fields: not required"));
    assert!(fourth.response.contains("Sample payload:\n{\"payload\": {\"tokenizedAsset\""));
    assert!(fourth.response.contains("Event payload:"));

    let calls = port.calls();
    let selection = calls
        .iter()
        .find(|(s, _, _)| *s == Stage::SelectApi)
        .map(|(_, p, _)| p.clone())
        .unwrap();
    assert!(selection.contains("(usecase: gold bond) (operation: create, API type: req issue)"));

    let payload = calls
        .iter()
        .find(|(s, _, _)| *s == Stage::RequestPayload)
        .unwrap();
    assert!((payload.2 - 0.2).abs() < f32::EPSILON);
    assert!(payload.1.contains("Request payload fields for the gold bond usecase, create operation: id"));
    assert!(payload.1.contains("must not appear here: eventType, timestamp"));

    let stored = history.messages(&session, 100).await.unwrap();
    assert_eq!(stored.len(), 8);
}

#[tokio::test]
async fn out_of_range_index_is_surfaced_and_not_persisted() {
    let port = Arc::new(ScriptedCompletion::new().with_default(Stage::Classify, CREATION));
    let catalog = Catalog::new(vec![
        ApiCatalogEntry::new("Issue", "/v1/issue"),
        ApiCatalogEntry::new("Manage", "/v1/manage"),
        ApiCatalogEntry::new("Settle", "/v1/settle"),
    ]);
    let (svc, history) = service(port.clone(), catalog);

    port.push(
        Stage::Extract,
        r#"{"usecase": null, "operation": "create", "is_async": false, "is_umi_compliant": true,
            "is_private": false, "field_names": ["id", "value"], "event_fields": []}"#,
    );
    port.push(Stage::SelectApi, r#"{"api_index": 999}"#);

    let err = svc
        .handle_turn(Some("s-oor"), "create an asset, sync, umi compliant, public, with id and value")
        .await
        .unwrap_err();
    assert!(matches!(err, AssistError::IndexOutOfRange { index: 999, len: 3 }));
    assert!(!port.stages().contains(&Stage::RequestPayload));
    assert!(history.messages("s-oor", 100).await.unwrap().is_empty());
    assert!(svc.list_sessions(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn request_payload_failure_is_surfaced() {
    let port = Arc::new(ScriptedCompletion::new().with_default(Stage::Classify, CREATION));
    let (svc, history) = service(port.clone(), issue_catalog());

    port.push(
        Stage::Extract,
        r#"{"is_async": false, "is_umi_compliant": false, "is_private": true, "field_names": ["id"]}"#,
    );
    port.push(Stage::SelectApi, r#"{"api_index": 0}"#);

    let err = svc
        .handle_turn(Some("s-pay"), "create a token, not async, not umi, private, field id")
        .await
        .unwrap_err();
    assert!(matches!(err, AssistError::PayloadSynthesis(_)));
    assert!(history.messages("s-pay", 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn explanation_bypasses_generator_classification() {
    let port = Arc::new(
        ScriptedCompletion::new()
            .with_default(Stage::Classify, "%%% garbage %%%")
            .with_default(Stage::Answer, "The id field uniquely identifies the asset."),
    );
    let (svc, _) = service(port.clone(), issue_catalog());

    let out = svc.handle_turn(Some("s-q"), "explain the id field").await.unwrap();
    assert_eq!(out.response, "The id field uniquely identifies the asset.");
    assert_eq!(port.stages(), vec![Stage::Answer]);
}

#[tokio::test]
async fn classifier_contract_cases() {
    let port = Arc::new(ScriptedCompletion::new().with_default(Stage::Classify, "not json"));
    let classifier = IntentClassifier::new(port, 0.0);
    let empty = ConversationWindow::empty();

    let c = classifier.classify("explain the id field", &empty).await;
    assert_eq!((c.is_creation, c.is_relevant), (false, true));

    let c = classifier.classify("create a gold bond", &empty).await;
    assert_eq!((c.is_creation, c.is_relevant), (true, true));

    let c = classifier.classify("I want to buy a lamborghini", &empty).await;
    assert_eq!((c.is_creation, c.is_relevant), (false, false));

    // a domain noun rescues an off-topic verb
    let c = classifier.classify("buy a tokenized gold asset", &empty).await;
    assert!(c.is_relevant);
}

#[tokio::test]
async fn off_topic_gets_redirect_and_is_recorded() {
    let port = Arc::new(ScriptedCompletion::new());
    let (svc, history) = service(port.clone(), issue_catalog());

    let out = svc.handle_turn(Some("s-car"), "which car should I buy?").await.unwrap();
    assert_eq!(out.response, REDIRECT_MESSAGE);
    assert!(port.calls().is_empty());
    assert_eq!(history.messages("s-car", 10).await.unwrap().len(), 2);
}

#[test]
fn yes_never_starts_a_new_request() {
    let histories = [
        ConversationWindow::empty(),
        ConversationWindow::new(vec![
            ConversationTurn::user("s", "I want to create a new gold bond asset"),
            ConversationTurn::assistant("s", "Is this request async? (yes/no)"),
        ]),
    ];
    for h in &histories {
        assert!(!is_new_request("yes", h));
        assert!(!is_new_request("Yes", h));
    }
}

#[tokio::test]
async fn new_request_discards_carried_slots() {
    let port = Arc::new(ScriptedCompletion::new().with_default(Stage::Classify, CREATION));
    let (svc, _) = service(port.clone(), issue_catalog());

    port.push(
        Stage::Extract,
        r#"{"is_async": true, "is_umi_compliant": true, "field_names": ["toWalletAddress"]}"#,
    );
    svc.handle_turn(Some("s-new"), "create a token, async, umi compliant, field toWalletAddress")
        .await
        .unwrap();

    port.clear_calls();
    port.push(Stage::Extract, r#"{"usecase": "insurance", "operation": "burn"}"#);
    let out = svc
        .handle_turn(Some("s-new"), "now I want to burn an insurance asset")
        .await
        .unwrap();

    // fresh request: extraction saw no earlier turns and async/UMI are asked again
    let extraction = port
        .calls()
        .into_iter()
        .find(|(s, _, _)| *s == Stage::Extract)
        .map(|(_, p, _)| p)
        .unwrap();
    assert!(extraction.contains("No earlier context"));
    let lower = out.response.to_lowercase();
    assert!(lower.contains("async") && lower.contains("umi"), "{}", out.response);
    assert!(out.response.contains("policyNumber, type, id"));
}

#[tokio::test]
async fn slots_reset_after_recommendation() {
    let port = Arc::new(
        ScriptedCompletion::new()
            .with_default(Stage::Classify, CREATION)
            .with_default(Stage::SelectApi, r#"{"api_index": 0}"#)
            .with_default(Stage::RequestPayload, "{}"),
    );
    let (svc, _) = service(port.clone(), issue_catalog());

    port.push(
        Stage::Extract,
        r#"{"is_async": false, "is_umi_compliant": true, "is_private": false, "field_names": ["id"]}"#,
    );
    let done = svc
        .handle_turn(Some("s-reset"), "create a token, sync, umi compliant, public, field id")
        .await
        .unwrap();
    assert!(done.response.starts_with("Recommended API:"));

    // a bare answer now has nothing to continue
    let next = svc.handle_turn(Some("s-reset"), "value").await.unwrap();
    assert!(next.response.starts_with("To proceed with your request"));
}
