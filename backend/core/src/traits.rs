use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A generative model reached through a function-calling API.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Provider name (e.g., "gemini", "scripted").
    fn name(&self) -> &str;

    /// Send the conversation so far and return the model's next turn.
    async fn invoke(&self, request: &OracleRequest) -> Result<OracleResponse>;
}

/// One function the model may call, described by a JSON Schema for its arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// A structured call reported back by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

impl FunctionCall {
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Part {
    Text { text: String },
    /// Base64 payload without any `data:` prefix.
    InlineData { mime_type: String, data: String },
    FunctionCall { call: FunctionCall },
    FunctionResponse { name: String, response: Value },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub parts: Vec<Part>,
}

/// Request to an oracle provider.
#[derive(Debug, Clone)]
pub struct OracleRequest {
    pub model: String,
    pub system_prompt: String,
    pub turns: Vec<Turn>,
    /// Functions offered for this turn. When non-empty the model is forced to call one.
    pub functions: Vec<FunctionDeclaration>,
    pub temperature: f32,
}

/// Response from an oracle provider.
#[derive(Debug, Clone, Default)]
pub struct OracleResponse {
    pub text: String,
    pub function_calls: Vec<FunctionCall>,
    pub provider: String,
    pub model: String,
    pub latency_ms: u64,
}

impl OracleResponse {
    /// The model's turn as it should be recorded in chat history.
    pub fn to_turn(&self) -> Turn {
        let mut parts = Vec::new();
        if !self.text.is_empty() {
            parts.push(Part::text(self.text.clone()));
        }
        parts.extend(
            self.function_calls
                .iter()
                .cloned()
                .map(|call| Part::FunctionCall { call }),
        );
        Turn {
            role: TurnRole::Model,
            parts,
        }
    }
}
