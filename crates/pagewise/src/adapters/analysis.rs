//! Content analysis through an Ollama text model.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::error::{ConfigError, StageError};
use crate::pipeline::{ActionItem, AnalysisBundle, Summary};
use crate::stage::{AnalysisRequest, Stage};

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Shape the combined prompt asks the model to answer in.
#[derive(Deserialize)]
struct UnifiedResponse {
    summary: String,
    #[serde(default)]
    structured_data: Option<serde_json::Value>,
    #[serde(default)]
    action_items: Vec<ActionItem>,
}

#[derive(Deserialize)]
struct ActionItemsResponse {
    #[serde(default)]
    action_items: Vec<ActionItem>,
}

pub struct OllamaAnalyzer {
    client: Client,
    host: String,
    model: String,
}

impl OllamaAnalyzer {
    pub fn new(config: &AnalysisConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConfigError::Validation {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            host: config.host.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    async fn generate(&self, prompt: String, json: bool) -> Result<String, StageError> {
        let url = format!("{}/api/generate", self.host);
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            format: json.then_some("json"),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| StageError::failed(format!("Analysis request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(StageError::failed(format!(
                "Analysis failed: HTTP {}",
                response.status()
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| StageError::failed(format!("Invalid analysis response: {}", e)))?;
        Ok(body.response)
    }

    async fn analyze_unified(&self, request: &AnalysisRequest) -> Result<AnalysisBundle, StageError> {
        let raw = self
            .generate(unified_prompt(&request.text, &request.document_type), true)
            .await?;
        parse_unified(&raw, request)
    }

    /// One prompt per component. Only a failed summary fails the page.
    async fn analyze_separately(
        &self,
        request: &AnalysisRequest,
    ) -> Result<AnalysisBundle, StageError> {
        let summary = self.generate(summary_prompt(&request.text), false).await?;
        let summary = Summary::from_text(&summary, &request.text);

        let structured_data = match self
            .generate(
                structured_data_prompt(&request.text, &request.document_type),
                true,
            )
            .await
        {
            Ok(raw) => parse_structured_data(&raw),
            Err(e) => serde_json::json!({ "error": e.to_string() }),
        };

        let action_items = match self
            .generate(action_items_prompt(&request.text), true)
            .await
        {
            Ok(raw) => parse_action_items(&raw),
            Err(e) => {
                log::warn!("Action item generation failed: {}", e);
                Vec::new()
            }
        };

        Ok(AnalysisBundle::new(
            summary,
            structured_data,
            action_items,
            &request.document_type,
            &request.document_id,
        ))
    }
}

#[async_trait]
impl Stage<AnalysisRequest, AnalysisBundle> for OllamaAnalyzer {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn run(&self, request: &AnalysisRequest) -> Result<AnalysisBundle, StageError> {
        match self.analyze_unified(request).await {
            Ok(bundle) => Ok(bundle),
            Err(unified) => {
                log::warn!(
                    "Unified analysis failed for {}, trying individual prompts: {}",
                    request.document_id,
                    unified
                );
                let mut bundle = self.analyze_separately(request).await.map_err(|e| {
                    StageError::failed(format!("Text analysis failed: {}", e))
                })?;
                bundle.analysis_error = Some(format!("Unified analysis failed: {}", unified));
                Ok(bundle)
            }
        }
    }
}

const FINANCIAL_SHAPE: &str = r#"{
        "total_amount": "amount in currency",
        "currency": "currency code",
        "date": "date in YYYY-MM-DD format",
        "vendor": "vendor/company name",
        "items": [
            {"description": "item description", "quantity": "quantity", "price": "price per item", "total": "total for this item"}
        ],
        "tax_amount": "tax amount if present",
        "reference_number": "invoice/receipt number",
        "payment_method": "payment method if mentioned"
    }"#;

const FORM_SHAPE: &str = r#"{
        "form_type": "type of form",
        "fields": [
            {"field_name": "name of the field", "field_value": "value entered in the field", "field_type": "text, date, number, checkbox, etc."}
        ],
        "required_fields": ["list of required field names"],
        "optional_fields": ["list of optional field names"]
    }"#;

const MEETING_SHAPE: &str = r#"{
        "meeting_title": "title of the meeting",
        "date": "meeting date",
        "participants": ["list of participants"],
        "agenda_items": [
            {"topic": "agenda topic", "discussion": "summary of discussion", "decisions": ["list of decisions made"]}
        ],
        "action_items": [
            {"task": "action item description", "assignee": "person responsible", "due_date": "due date if mentioned", "priority": "high/medium/low"}
        ],
        "next_meeting": "date of next meeting if mentioned"
    }"#;

const GENERAL_SHAPE: &str = r#"{
        "document_type": "type of document",
        "title": "document title",
        "author": "author if mentioned",
        "date": "document date",
        "key_entities": ["important people, places, organizations"],
        "key_dates": ["important dates mentioned"],
        "key_numbers": ["important numbers, amounts, quantities"],
        "main_topics": ["main topics discussed"],
        "key_points": ["key points or findings"]
    }"#;

/// Structured-data layout requested for a document type label.
fn structured_data_shape(document_type: &str) -> &'static str {
    match document_type.to_lowercase().as_str() {
        "invoice" | "receipt" => FINANCIAL_SHAPE,
        "form" | "application" => FORM_SHAPE,
        "meeting" | "notes" | "report" => MEETING_SHAPE,
        _ => GENERAL_SHAPE,
    }
}

fn unified_prompt(text: &str, document_type: &str) -> String {
    let shape = structured_data_shape(document_type);
    format!(
        r#"Analyze the following {document_type} document content.

{text}

Return a JSON object with exactly this structure:
{{
    "summary": "clear and concise summary covering the main topic, key points, important dates, names and numbers",
    "structured_data": {shape},
    "action_items": [
        {{
            "action": "description of the action",
            "priority": "high/medium/low",
            "assignee": "who should do this (if mentioned)",
            "due_date": "when this should be done (if mentioned)",
            "category": "work/personal/financial/etc"
        }}
    ]
}}

JSON:"#
    )
}

fn summary_prompt(text: &str) -> String {
    format!(
        "Summarize the following document content in a clear and concise manner:\n\n{text}\n\n\
         Provide a summary that includes the main topic, key points, any action items \
         and important dates, names, or numbers.\n\nSummary:"
    )
}

fn structured_data_prompt(text: &str, document_type: &str) -> String {
    let shape = structured_data_shape(document_type);
    format!(
        r#"Extract key information from this document and return as JSON:

{text}

Return a JSON object with the following structure:
{shape}

JSON:"#
    )
}

fn action_items_prompt(text: &str) -> String {
    format!(
        r#"Analyze this document and generate actionable items:

{text}

Return JSON of the form {{"action_items": [{{"action": "...", "priority": "high/medium/low", "assignee": "...", "due_date": "...", "category": "..."}}]}}

JSON:"#
    )
}

/// The outermost `{...}` of a model reply, which may wrap it in prose or
/// code fences.
fn json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

fn parse_unified(raw: &str, request: &AnalysisRequest) -> Result<AnalysisBundle, StageError> {
    let body = json_object(raw)
        .ok_or_else(|| StageError::failed("Analysis response contained no JSON object"))?;
    let parsed: UnifiedResponse = serde_json::from_str(body)
        .map_err(|e| StageError::failed(format!("Failed to parse analysis JSON: {}", e)))?;

    if parsed.summary.trim().is_empty() {
        return Err(StageError::failed("Analysis response had an empty summary"));
    }

    Ok(AnalysisBundle::new(
        Summary::from_text(&parsed.summary, &request.text),
        parsed
            .structured_data
            .unwrap_or_else(|| serde_json::json!({})),
        parsed.action_items,
        &request.document_type,
        &request.document_id,
    ))
}

fn parse_structured_data(raw: &str) -> serde_json::Value {
    json_object(raw)
        .and_then(|body| serde_json::from_str(body).ok())
        .unwrap_or_else(|| {
            serde_json::json!({
                "error": "Failed to parse JSON response",
                "raw_response": raw,
            })
        })
}

fn parse_action_items(raw: &str) -> Vec<ActionItem> {
    json_object(raw)
        .and_then(|body| serde_json::from_str::<ActionItemsResponse>(body).ok())
        .map(|r| r.action_items)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(text: &str) -> AnalysisRequest {
        AnalysisRequest {
            text: text.to_string(),
            document_type: "general".to_string(),
            document_id: "scan_1a2b3c4d".to_string(),
        }
    }

    #[test]
    fn test_parse_unified_reply() {
        let raw = r#"Sure! ```json
        {
            "summary": "Invoice from ACME for 3 widgets.",
            "structured_data": {"title": "Invoice 42"},
            "action_items": [{"action": "Pay invoice", "priority": "high", "due_date": "2024-05-01"}]
        }
        ```"#;

        let bundle = parse_unified(raw, &request("ACME invoice text")).unwrap();
        assert_eq!(bundle.summary.summary, "Invoice from ACME for 3 widgets.");
        assert_eq!(bundle.summary.original_length, 17);
        assert_eq!(bundle.structured_data["title"], "Invoice 42");
        assert_eq!(bundle.action_items.len(), 1);
        assert_eq!(bundle.action_items[0].priority.as_deref(), Some("high"));
        assert!(bundle.action_items[0].assignee.is_none());
        assert_eq!(bundle.document_id, "scan_1a2b3c4d");
        assert!(bundle.analysis_error.is_none());
    }

    #[test]
    fn test_malformed_reply_is_expected_failure() {
        let err = parse_unified("I cannot help with that.", &request("x")).unwrap_err();
        assert!(!err.is_defect());

        let err = parse_unified(r#"{"structured_data": {}}"#, &request("x")).unwrap_err();
        assert!(err.to_string().contains("Failed to parse analysis JSON"));

        let err = parse_unified(r#"{"summary": "  "}"#, &request("x")).unwrap_err();
        assert!(err.to_string().contains("empty summary"));
    }

    #[test]
    fn test_structured_data_keeps_raw_reply_on_parse_error() {
        let value = parse_structured_data("no json here");
        assert_eq!(value["error"], "Failed to parse JSON response");
        assert_eq!(value["raw_response"], "no json here");
    }

    #[test]
    fn test_action_items_default_to_empty() {
        assert!(parse_action_items("garbage").is_empty());
        let items = parse_action_items(r#"{"action_items": [{"action": "Call Bob"}]}"#);
        assert_eq!(items, vec![ActionItem::new("Call Bob")]);
    }

    #[test]
    fn test_prompts_embed_text() {
        assert!(unified_prompt("PAGE TEXT", "general").contains("PAGE TEXT"));
        assert!(summary_prompt("PAGE TEXT").contains("PAGE TEXT"));
        assert!(structured_data_prompt("PAGE TEXT", "general").contains("PAGE TEXT"));
        assert!(action_items_prompt("PAGE TEXT").contains("\"action_items\""));
    }

    #[test]
    fn test_structured_prompt_follows_document_type() {
        struct TestCase {
            document_type: &'static str,
            expected_key: &'static str,
        }

        let test_cases = [
            TestCase { document_type: "invoice", expected_key: "\"total_amount\"" },
            TestCase { document_type: "Receipt", expected_key: "\"payment_method\"" },
            TestCase { document_type: "application", expected_key: "\"form_type\"" },
            TestCase { document_type: "meeting", expected_key: "\"participants\"" },
            TestCase { document_type: "REPORT", expected_key: "\"agenda_items\"" },
            TestCase { document_type: "general", expected_key: "\"key_points\"" },
            TestCase { document_type: "letter", expected_key: "\"key_entities\"" },
        ];

        for case in test_cases {
            let separate = structured_data_prompt("text", case.document_type);
            let unified = unified_prompt("text", case.document_type);
            assert!(separate.contains(case.expected_key), "{}", case.document_type);
            assert!(unified.contains(case.expected_key), "{}", case.document_type);
        }

        assert!(!structured_data_prompt("text", "invoice").contains("\"key_points\""));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_expected_failure() {
        let analyzer = OllamaAnalyzer::new(&AnalysisConfig {
            host: "http://127.0.0.1:1".to_string(),
            model: "mistral".to_string(),
            timeout_secs: 2,
        })
        .unwrap();

        let err = analyzer.run(&request("Hello world")).await.unwrap_err();
        assert!(!err.is_defect());
        assert!(err.to_string().starts_with("Text analysis failed"));
    }
}
