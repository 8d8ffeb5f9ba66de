//! `POST /api/get-sentences`: ask the oracle for sentences within a letter budget.
//!
//! The oracle's sentences are returned as-is. Checking them against the budget is
//! the client's job.

use axum::{Json, body::Bytes, extract::State};
use tracing::info;
use uuid::Uuid;

use signshuffle_core::{GenerateRequest, LetterCount, Part};
use signshuffle_oracle::OracleChat;

use crate::error::GatewayError;
use crate::functions::{GenerationCall, GenerationFunction};
use crate::prompts::{GENERATION_SYSTEM_PROMPT, generation_prompt};
use crate::server::GatewayState;

/// One constrained oracle turn returning candidate sentences.
pub async fn generate_sentences(
    state: &GatewayState,
    letters: &LetterCount,
) -> Result<Vec<String>, GatewayError> {
    if letters.is_empty() {
        return Ok(Vec::new());
    }

    let function = GenerationFunction::ProposeSentences;
    let mut chat = OracleChat::new(state.oracle.clone(), state.model.clone(), state.temperature)
        .with_system_prompt(GENERATION_SYSTEM_PROMPT);
    let response = chat
        .send(vec![Part::text(generation_prompt(letters))], &[function.declaration()])
        .await
        .map_err(GatewayError::Oracle)?;

    let call = response
        .function_calls
        .first()
        .ok_or(GatewayError::NoSentences)?;
    match GenerationCall::parse(call)? {
        GenerationCall::Sentences(sentences) => Ok(sentences),
    }
}

/// Handler for `POST /api/get-sentences`.
pub async fn get_sentences(
    State(state): State<GatewayState>,
    body: Bytes,
) -> Result<Json<Vec<String>>, GatewayError> {
    let request_id = Uuid::new_v4();
    let request: GenerateRequest =
        serde_json::from_slice(&body).map_err(|_| GatewayError::Malformed)?;
    info!(%request_id, letters = %request.letters, "Generating sentences");

    let sentences = generate_sentences(&state, &request.letters).await?;
    info!(%request_id, count = sentences.len(), "Sentences generated");
    Ok(Json(sentences))
}
