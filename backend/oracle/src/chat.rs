//! A single oracle conversation.
//!
//! Each gateway request opens its own [`OracleChat`], so history never leaks
//! between requests.

use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use signshuffle_core::{
    FunctionDeclaration, Oracle, OracleRequest, OracleResponse, Part, Turn, TurnRole,
};

pub struct OracleChat {
    oracle: Arc<dyn Oracle>,
    model: String,
    temperature: f32,
    system_prompt: String,
    history: Vec<Turn>,
}

impl OracleChat {
    pub fn new(oracle: Arc<dyn Oracle>, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            oracle,
            model: model.into(),
            temperature,
            system_prompt: String::new(),
            history: Vec::new(),
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Append a user turn, ask the oracle, and record its reply in the history.
    ///
    /// When `functions` is non-empty the oracle must answer through one of them.
    pub async fn send(
        &mut self,
        parts: Vec<Part>,
        functions: &[FunctionDeclaration],
    ) -> Result<OracleResponse> {
        self.history.push(Turn {
            role: TurnRole::User,
            parts,
        });

        let request = OracleRequest {
            model: self.model.clone(),
            system_prompt: self.system_prompt.clone(),
            turns: self.history.clone(),
            functions: functions.to_vec(),
            temperature: self.temperature,
        };

        let response = self.oracle.invoke(&request).await?;
        debug!(
            provider = %response.provider,
            turn = self.history.len(),
            calls = response.function_calls.len(),
            latency_ms = response.latency_ms,
            "Oracle turn complete"
        );
        self.history.push(response.to_turn());
        Ok(response)
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScriptedOracle;
    use serde_json::json;

    #[tokio::test]
    async fn second_turn_carries_first_exchange() {
        let oracle = Arc::new(
            ScriptedOracle::new()
                .then_call("first", json!({}))
                .then_text("done"),
        );
        let mut chat = OracleChat::new(oracle.clone(), "m", 0.2).with_system_prompt("sys");

        chat.send(vec![Part::text("one")], &[]).await.unwrap();
        chat.send(vec![Part::text("two")], &[]).await.unwrap();

        let requests = oracle.requests();
        assert_eq!(requests[0].turns.len(), 1);
        assert_eq!(requests[1].turns.len(), 3);
        assert_eq!(requests[1].turns[1].role, TurnRole::Model);
        assert_eq!(requests[1].system_prompt, "sys");
        assert_eq!(chat.history().len(), 4);
    }
}
