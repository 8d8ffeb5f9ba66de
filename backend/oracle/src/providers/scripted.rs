use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::Value;

use signshuffle_core::{FunctionCall, Oracle, OracleRequest, OracleResponse};

/// An oracle that replays canned turns in order and records what it was asked.
///
/// Used by tests and offline demos in place of a hosted model.
#[derive(Default)]
pub struct ScriptedOracle {
    script: Mutex<VecDeque<Result<OracleResponse, String>>>,
    requests: Mutex<Vec<OracleRequest>>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a turn in which the model calls `name` with `args`.
    pub fn then_call(self, name: impl Into<String>, args: Value) -> Self {
        self.push(Ok(OracleResponse {
            function_calls: vec![FunctionCall::new(name, args)],
            ..Self::base()
        }))
    }

    /// Queue a plain-text turn with no function call.
    pub fn then_text(self, text: impl Into<String>) -> Self {
        self.push(Ok(OracleResponse {
            text: text.into(),
            ..Self::base()
        }))
    }

    /// Queue a transport failure.
    pub fn then_fail(self, message: impl Into<String>) -> Self {
        self.push(Err(message.into()))
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<OracleRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Turns still waiting to be played.
    pub fn remaining(&self) -> usize {
        self.script.lock().map(|s| s.len()).unwrap_or(0)
    }

    fn push(self, entry: Result<OracleResponse, String>) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(entry);
        }
        self
    }

    fn base() -> OracleResponse {
        OracleResponse {
            provider: "scripted".to_string(),
            model: "scripted".to_string(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn invoke(&self, request: &OracleRequest) -> Result<OracleResponse> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        match next {
            Some(Ok(mut response)) => {
                response.model = request.model.clone();
                Ok(response)
            }
            Some(Err(message)) => bail!("scripted oracle failure: {message}"),
            None => bail!("scripted oracle has no turns left"),
        }
    }
}
