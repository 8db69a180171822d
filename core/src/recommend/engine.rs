//! Recommendation engine: API selection, field selection and payload synthesis.
//!
//! Each step is one generator call. Only the API index and the request payload are
//! load-bearing; a bad field selection or event payload degrades to empty output.

use crate::dialogue::json::{extract_object, parse_object};
use crate::dialogue::lexicon::contains_term;
use crate::dialogue::{Operation, QueryInfo, Temperatures, TriState};
use crate::llm::CompletionPort;
use crate::{AssistError, Result};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::catalog::{ApiCatalogEntry, ApiField, Catalog};
use super::schema::{EVENT_SCHEMA, REQUEST_SCHEMA};

/// Output of one successful recommendation; only its rendered text is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recommendation {
    pub api: ApiCatalogEntry,
    pub fields: Vec<ApiField>,
    pub payload: String,
    /// Empty unless the request is async with event fields
    pub event_payload: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadFormat {
    Json,
    Xml,
}

impl PayloadFormat {
    /// XML only when the user asks for it
    pub fn detect(request_text: &str) -> Self {
        let lower = request_text.to_lowercase();
        if contains_term(&lower, "xml") {
            PayloadFormat::Xml
        } else {
            PayloadFormat::Json
        }
    }

    fn label(self) -> &'static str {
        match self {
            PayloadFormat::Json => "JSON",
            PayloadFormat::Xml => "XML",
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    api_index: i64,
}

pub struct RecommendationEngine {
    port: Arc<dyn CompletionPort>,
    temperatures: Temperatures,
}

impl RecommendationEngine {
    pub fn new(port: Arc<dyn CompletionPort>, temperatures: Temperatures) -> Self {
        Self { port, temperatures }
    }

    /// Run the selection and synthesis steps against `catalog`.
    ///
    /// Fails with `IndexOutOfRange` when the chosen index is not in the catalog and
    /// with `PayloadSynthesis` when the request payload cannot be generated.
    pub async fn recommend(
        &self,
        catalog: &Catalog,
        request_text: &str,
        q: &QueryInfo,
    ) -> Result<Recommendation> {
        let api = self.select_api(catalog, request_text, q).await?;
        let fields = self.select_fields(&api, request_text).await;
        let payload = self.request_payload(&api, request_text, q).await?;
        let event_payload = self.event_payload(q).await;

        info!(
            target = "recommend",
            api = %api.name,
            path = %api.path,
            fields = fields.len(),
            has_event = !event_payload.is_empty(),
            "recommendation ready"
        );
        Ok(Recommendation {
            api,
            fields,
            payload,
            event_payload,
        })
    }

    async fn select_api(&self, catalog: &Catalog, request_text: &str, q: &QueryInfo) -> Result<ApiCatalogEntry> {
        let prompt = selection_prompt(catalog, &hinted_request(request_text, q));
        let raw = self
            .port
            .complete(&prompt, self.temperatures.selection)
            .await?;
        let choice: ApiChoice = parse_object(&raw)?;
        debug!(target = "recommend", api_index = choice.api_index, "API selected");

        usize::try_from(choice.api_index)
            .ok()
            .and_then(|i| catalog.get(i))
            .cloned()
            .ok_or(AssistError::IndexOutOfRange {
                index: choice.api_index,
                len: catalog.len(),
            })
    }

    async fn select_fields(&self, api: &ApiCatalogEntry, request_text: &str) -> Vec<ApiField> {
        if api.fields.is_empty() {
            return Vec::new();
        }
        let prompt = field_prompt(api, request_text);
        let raw = match self.port.complete(&prompt, self.temperatures.selection).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(target = "recommend", error = %e, "field selection failed; no fields selected");
                return Vec::new();
            }
        };
        let indices = extract_object(&raw)
            .and_then(|v| v.get("field_index").and_then(Value::as_array).cloned())
            .unwrap_or_default();

        let picked: Vec<ApiField> = indices
            .iter()
            .filter_map(Value::as_i64)
            .filter_map(|i| usize::try_from(i).ok())
            .filter_map(|i| api.fields.get(i).cloned())
            .collect();
        if picked.len() < indices.len() {
            debug!(
                target = "recommend",
                requested = indices.len(),
                kept = picked.len(),
                "dropped invalid field indices"
            );
        }
        picked
    }

    async fn request_payload(&self, api: &ApiCatalogEntry, request_text: &str, q: &QueryInfo) -> Result<String> {
        if q.field_names.is_empty() {
            return Ok(String::new());
        }
        let format = PayloadFormat::detect(request_text);
        let prompt = payload_prompt(api, request_text, q, format);
        let raw = self
            .port
            .complete(&prompt, self.temperatures.payload)
            .await
            .map_err(|e| AssistError::PayloadSynthesis(e.to_string()))?;
        Ok(strip_fence(&raw))
    }

    async fn event_payload(&self, q: &QueryInfo) -> String {
        if q.is_async != TriState::True || q.event_fields.is_empty() {
            return String::new();
        }
        let prompt = event_prompt(q);
        match self.port.complete(&prompt, self.temperatures.payload).await {
            Ok(raw) => strip_fence(&raw),
            Err(e) => {
                warn!(target = "recommend", error = %e, "event payload failed; continuing without it");
                String::new()
            }
        }
    }
}

/// Append the use case and operation hints the selection prompt keys on
pub fn hinted_request(request_text: &str, q: &QueryInfo) -> String {
    let mut text = request_text.to_string();
    if let Some(uc) = &q.use_case {
        text.push_str(&format!(" (usecase: {uc})"));
    }
    if let Some(api_type) = q.operation.api_type() {
        text.push_str(&format!(" (operation: {}, API type: {api_type})", q.operation));
    }
    text
}

fn selection_prompt(catalog: &Catalog, request: &str) -> String {
    let listing = catalog
        .entries()
        .iter()
        .enumerate()
        .map(|(i, a)| format!("[{i}] {} {} - {}", a.method, a.path, a.description))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        r#"Pick the UMI API that best serves the user's request.

APIs:
{listing}

User request: {request:?}

Guidance:
- create / issue operations map to "req issue" APIs
- burn / manage operations map to "req manage" APIs
- trade / settle operations map to "req settle" APIs
- prefer APIs that fit the named usecase (insurance, fd, gold bond, ...)

Return only JSON shaped {{"api_index": <int>}}"#
    )
}

fn field_prompt(api: &ApiCatalogEntry, request: &str) -> String {
    let listing = api
        .fields
        .iter()
        .enumerate()
        .map(|(i, f)| format!("[{i}] {} ({}) - {}", f.name, f.field_type, f.description))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        r#"Selected API: {:?} {}

Fields:
{listing}

User request: {request:?}

Return only JSON shaped {{"field_index": [<int>, ...]}}"#,
        api.name, api.path
    )
}

fn payload_prompt(api: &ApiCatalogEntry, request: &str, q: &QueryInfo, format: PayloadFormat) -> String {
    let fields = q.field_names.iter().cloned().collect::<Vec<_>>().join(", ");
    let scope = match (&q.use_case, q.operation) {
        (Some(uc), Operation::Unset) => format!(" for the {uc} usecase"),
        (Some(uc), op) => format!(" for the {uc} usecase, {op} operation"),
        (None, _) => String::new(),
    };
    let events = if q.event_fields.is_empty() {
        String::new()
    } else {
        let names = q.event_fields.iter().cloned().collect::<Vec<_>>().join(", ");
        format!("\nThese belong to the event payload and must not appear here: {names}")
    };
    let privacy = match q.is_private {
        TriState::True => "The data is private: include `source` and `destination`, each with an `id`.",
        TriState::False => "The data is public: omit `source` and `destination`.",
        TriState::Unknown => "Privacy is unspecified: omit `source` and `destination`.",
    };
    let flags = context_flags(q);
    let format = format.label();

    format!(
        r#"Generate a sample REQUEST payload for the UMI endpoint "{} {}".

User request: {request:?}
Request payload fields{scope}: {fields}{events}

Schema:
{REQUEST_SCHEMA}

Rules:
1. Output {format} only. JSON and XML forms carry the same content; only the syntax differs.
2. Populate only the listed fields, with dummy values. Add nothing else.
3. Place a field where the schema defines it, keeping the full nesting (context -> meta, payload -> tokenizedAsset -> meta, ...). Never flatten.
4. Asset operations (create, lock, burn) populate `payload.tokenizedAsset`.
5. A field the schema does not define goes into the nearest `meta.details` list as {{"name": "<field>", "value": "<dummy>"}}.
6. {privacy}
7. Context flags: {flags}
8. With no fields, return an empty payload.

Return only the payload, without explanations."#,
        api.method, api.path
    )
}

fn context_flags(q: &QueryInfo) -> String {
    let mut flags = Vec::new();
    if let Some(v) = q.is_async.as_bool() {
        flags.push(format!("set context.isAsync = {v}"));
    }
    if let Some(v) = q.is_umi_compliant.as_bool() {
        flags.push(format!("set context.isUMICompliant = {v}"));
    }
    if flags.is_empty() {
        "omit isAsync and isUMICompliant".into()
    } else {
        flags.join("; ")
    }
}

fn event_prompt(q: &QueryInfo) -> String {
    let fields = q.event_fields.iter().cloned().collect::<Vec<_>>().join(", ");
    format!(
        r#"Generate a sample JSON event payload with these fields: {fields}

Schema:
{EVENT_SCHEMA}

Rules:
- include only the listed fields, with dummy values
- wrap the event as {{"payload": {{"event": [<event>]}}}}

Return only the JSON."#
    )
}

/// Drop a surrounding markdown code fence, if any
fn strip_fence(raw: &str) -> String {
    let trimmed = raw.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    let body = body.split_once('\n').map(|(_, rest)| rest).unwrap_or("");
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mockall::mock;

    mock! {
        pub Port {}

        #[async_trait]
        impl CompletionPort for Port {
            async fn complete(&self, prompt: &str, temperature: f32) -> Result<String>;
        }
    }

    fn catalog() -> Catalog {
        Catalog::new(vec![
            ApiCatalogEntry::new("Req Issue", "/v1/issue")
                .with_method("POST")
                .with_field(ApiField::new("id", "string", "Asset id"))
                .with_field(ApiField::new("value", "string", "Face value")),
            ApiCatalogEntry::new("Req Manage", "/v1/manage").with_method("POST"),
            ApiCatalogEntry::new("Req Settle", "/v1/settle").with_method("POST"),
        ])
    }

    fn sync_query() -> QueryInfo {
        QueryInfo::new()
            .with_async(TriState::False)
            .with_umi_compliant(TriState::True)
            .with_private(TriState::False)
            .with_field("id")
    }

    #[tokio::test]
    async fn out_of_range_index_is_fatal() {
        let mut port = MockPort::new();
        port.expect_complete()
            .times(1)
            .returning(|_, _| Ok(r#"{"api_index": 999}"#.to_string()));

        let engine = RecommendationEngine::new(Arc::new(port), Temperatures::default());
        let err = engine
            .recommend(&catalog(), "create an asset", &sync_query())
            .await
            .unwrap_err();
        assert!(matches!(err, AssistError::IndexOutOfRange { index: 999, len: 3 }));
    }

    #[tokio::test]
    async fn negative_index_is_fatal() {
        let mut port = MockPort::new();
        port.expect_complete()
            .returning(|_, _| Ok(r#"Sure: {"api_index": -1}"#.to_string()));

        let engine = RecommendationEngine::new(Arc::new(port), Temperatures::default());
        let err = engine
            .recommend(&catalog(), "create an asset", &sync_query())
            .await
            .unwrap_err();
        assert!(matches!(err, AssistError::IndexOutOfRange { index: -1, .. }));
    }

    #[tokio::test]
    async fn invalid_field_indices_are_dropped() {
        let mut port = MockPort::new();
        port.expect_complete()
            .withf(|p, _| p.contains("\"api_index\""))
            .returning(|_, _| Ok(r#"{"api_index": 0}"#.to_string()));
        port.expect_complete()
            .withf(|p, _| p.contains("\"field_index\""))
            .returning(|_, _| Ok(r#"{"field_index": [1, 7, -2]}"#.to_string()));
        port.expect_complete()
            .withf(|p, t| p.contains("REQUEST payload") && (*t - 0.2).abs() < f32::EPSILON)
            .returning(|_, _| Ok("```json\n{\"payload\": {}}\n```".to_string()));

        let engine = RecommendationEngine::new(Arc::new(port), Temperatures::default());
        let rec = engine
            .recommend(&catalog(), "create an asset", &sync_query())
            .await
            .unwrap();
        assert_eq!(rec.api.path, "/v1/issue");
        assert_eq!(rec.fields, vec![ApiField::new("value", "string", "Face value")]);
        assert_eq!(rec.payload, "{\"payload\": {}}");
        assert!(rec.event_payload.is_empty());
    }

    #[tokio::test]
    async fn request_payload_failure_is_fatal() {
        let mut port = MockPort::new();
        port.expect_complete()
            .withf(|p, _| p.contains("\"api_index\""))
            .returning(|_, _| Ok(r#"{"api_index": 1}"#.to_string()));
        port.expect_complete()
            .withf(|p, _| p.contains("REQUEST payload"))
            .returning(|_, _| Err(AssistError::Completion("503".into())));

        let engine = RecommendationEngine::new(Arc::new(port), Temperatures::default());
        let err = engine
            .recommend(&catalog(), "burn it", &sync_query())
            .await
            .unwrap_err();
        assert!(matches!(err, AssistError::PayloadSynthesis(_)));
    }

    #[tokio::test]
    async fn event_payload_failure_is_absorbed() {
        let mut port = MockPort::new();
        port.expect_complete()
            .withf(|p, _| p.contains("\"api_index\""))
            .returning(|_, _| Ok(r#"{"api_index": 0}"#.to_string()));
        port.expect_complete()
            .withf(|p, _| p.contains("\"field_index\""))
            .returning(|_, _| Ok("no idea".to_string()));
        port.expect_complete()
            .withf(|p, _| p.contains("REQUEST payload"))
            .returning(|_, _| Ok("{}".to_string()));
        port.expect_complete()
            .withf(|p, _| p.contains("JSON event payload"))
            .returning(|_, _| Err(AssistError::Completion("timeout".into())));

        let q = sync_query()
            .with_async(TriState::True)
            .with_event_field("eventType");

        let engine = RecommendationEngine::new(Arc::new(port), Temperatures::default());
        let rec = engine.recommend(&catalog(), "create", &q).await.unwrap();
        assert!(rec.fields.is_empty());
        assert_eq!(rec.payload, "{}");
        assert!(rec.event_payload.is_empty());
    }

    #[test]
    fn hints_name_usecase_and_api_type() {
        let q = QueryInfo::new()
            .with_use_case("gold bond")
            .with_operation(Operation::Create);
        assert_eq!(
            hinted_request("create it", &q),
            "create it (usecase: gold bond) (operation: create, API type: req issue)"
        );
    }

    #[test]
    fn xml_only_on_request() {
        assert_eq!(PayloadFormat::detect("give me the payload in XML"), PayloadFormat::Xml);
        assert_eq!(PayloadFormat::detect("create a bond"), PayloadFormat::Json);
    }
}
