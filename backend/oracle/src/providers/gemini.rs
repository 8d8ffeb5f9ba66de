use std::time::Instant;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use signshuffle_core::{
    FunctionCall, FunctionDeclaration, Oracle, OracleRequest, OracleResponse, Part, Turn,
    TurnRole,
};
use signshuffle_logging::redact_sensitive_data;

/// Google Gemini provider speaking the `generateContent` REST API.
pub struct GeminiOracle {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiOracle {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<GeminiTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_config: Option<ToolConfig>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize, Default)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<GeminiFunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<GeminiFunctionResponse>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize, Deserialize)]
struct GeminiFunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Serialize, Deserialize)]
struct GeminiFunctionResponse {
    name: String,
    response: Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolConfig {
    function_calling_config: FunctionCallingConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FunctionCallingConfig {
    mode: &'static str,
    allowed_function_names: Vec<String>,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: GeminiContent,
}

fn to_gemini_part(part: &Part) -> GeminiPart {
    match part {
        Part::Text { text } => GeminiPart {
            text: Some(text.clone()),
            ..Default::default()
        },
        Part::InlineData { mime_type, data } => GeminiPart {
            inline_data: Some(InlineData {
                mime_type: mime_type.clone(),
                data: data.clone(),
            }),
            ..Default::default()
        },
        Part::FunctionCall { call } => GeminiPart {
            function_call: Some(GeminiFunctionCall {
                name: call.name.clone(),
                args: call.args.clone(),
            }),
            ..Default::default()
        },
        Part::FunctionResponse { name, response } => GeminiPart {
            function_response: Some(GeminiFunctionResponse {
                name: name.clone(),
                response: response.clone(),
            }),
            ..Default::default()
        },
    }
}

fn to_gemini_content(turn: &Turn) -> GeminiContent {
    let role = match turn.role {
        TurnRole::User => "user",
        TurnRole::Model => "model",
    };
    GeminiContent {
        role: Some(role.to_string()),
        parts: turn.parts.iter().map(to_gemini_part).collect(),
    }
}

fn build_body(request: &OracleRequest) -> GenerateContentRequest {
    let system_instruction = (!request.system_prompt.is_empty()).then(|| GeminiContent {
        role: None,
        parts: vec![GeminiPart {
            text: Some(request.system_prompt.clone()),
            ..Default::default()
        }],
    });

    // With functions on offer the model must answer through one of them.
    let (tools, tool_config) = if request.functions.is_empty() {
        (Vec::new(), None)
    } else {
        (
            vec![GeminiTool {
                function_declarations: request.functions.clone(),
            }],
            Some(ToolConfig {
                function_calling_config: FunctionCallingConfig {
                    mode: "ANY",
                    allowed_function_names: request
                        .functions
                        .iter()
                        .map(|f| f.name.clone())
                        .collect(),
                },
            }),
        )
    };

    GenerateContentRequest {
        system_instruction,
        contents: request.turns.iter().map(to_gemini_content).collect(),
        tools,
        tool_config,
        generation_config: GenerationConfig {
            temperature: request.temperature,
        },
    }
}

/// Collect text and function calls from the first candidate.
fn read_candidate(response: GenerateContentResponse) -> (String, Vec<FunctionCall>) {
    let Some(candidate) = response.candidates.into_iter().next() else {
        return (String::new(), Vec::new());
    };
    let mut text = String::new();
    let mut calls = Vec::new();
    for part in candidate.content.parts {
        if let Some(t) = part.text {
            text.push_str(&t);
        }
        if let Some(call) = part.function_call {
            calls.push(FunctionCall::new(call.name, call.args));
        }
    }
    (text, calls)
}

#[async_trait]
impl Oracle for GeminiOracle {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn invoke(&self, request: &OracleRequest) -> Result<OracleResponse> {
        let start = Instant::now();
        let body = build_body(request);
        let url = format!("{}/models/{}:generateContent", self.base_url, request.model);

        debug!(
            model = %request.model,
            turns = request.turns.len(),
            functions = request.functions.len(),
            "Sending request to Gemini"
        );

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!(redact_sensitive_data(&e.to_string())))
            .context("Gemini HTTP request failed")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "Gemini returned {}: {}",
                status,
                redact_sensitive_data(&error_body)
            );
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .context("Failed to parse Gemini response")?;
        let (text, function_calls) = read_candidate(parsed);

        let latency_ms = start.elapsed().as_millis() as u64;
        debug!(calls = function_calls.len(), latency_ms, "Gemini responded");

        Ok(OracleResponse {
            text,
            function_calls,
            provider: "gemini".to_string(),
            model: request.model.clone(),
            latency_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> OracleRequest {
        OracleRequest {
            model: "gemini-1.5-flash".into(),
            system_prompt: "Be terse.".into(),
            turns: vec![
                Turn {
                    role: TurnRole::User,
                    parts: vec![
                        Part::text("Any text here?"),
                        Part::InlineData {
                            mime_type: "image/png".into(),
                            data: "AAAA".into(),
                        },
                    ],
                },
                Turn {
                    role: TurnRole::Model,
                    parts: vec![Part::FunctionCall {
                        call: FunctionCall::new("report_text_presence", json!({"has_text": true})),
                    }],
                },
            ],
            functions: vec![FunctionDeclaration {
                name: "report_extracted_text".into(),
                description: "Report the text".into(),
                parameters: json!({"type": "OBJECT"}),
            }],
            temperature: 0.5,
        }
    }

    #[test]
    fn body_uses_gemini_field_names() {
        let body = serde_json::to_value(build_body(&request())).unwrap();
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Be terse.");
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(
            body["contents"][1]["parts"][0]["functionCall"]["name"],
            "report_text_presence"
        );
        assert_eq!(
            body["toolConfig"]["functionCallingConfig"]["allowedFunctionNames"],
            json!(["report_extracted_text"])
        );
        assert_eq!(body["tools"][0]["functionDeclarations"][0]["name"], "report_extracted_text");
    }

    #[test]
    fn no_functions_means_no_tool_config() {
        let mut req = request();
        req.functions.clear();
        req.system_prompt.clear();
        let body = serde_json::to_value(build_body(&req)).unwrap();
        assert!(body.get("tools").is_none());
        assert!(body.get("toolConfig").is_none());
        assert!(body.get("systemInstruction").is_none());
    }

    #[test]
    fn reads_function_calls_from_first_candidate() {
        let raw = json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        {"text": "Sure."},
                        {"functionCall": {"name": "propose_sentences", "args": {"sentences": ["a b"]}}}
                    ]
                }
            }]
        });
        let parsed: GenerateContentResponse = serde_json::from_value(raw).unwrap();
        let (text, calls) = read_candidate(parsed);
        assert_eq!(text, "Sure.");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "propose_sentences");
        assert_eq!(calls[0].args["sentences"][0], "a b");
    }

    #[test]
    fn empty_candidates_yield_nothing() {
        let parsed: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
        let (text, calls) = read_candidate(parsed);
        assert!(text.is_empty());
        assert!(calls.is_empty());
    }
}
