//! `POST /api/get-letters`: pull the letters out of an uploaded image.
//!
//! The oracle is asked twice in one chat. First whether the image holds any text
//! at all, then (only if it does) for the literal text, which is tallied into a
//! [`LetterCount`].

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use signshuffle_core::{ExtractRequest, LetterCount, Part, tally};
use signshuffle_oracle::OracleChat;

use crate::error::GatewayError;
use crate::functions::{DispatchError, ExtractionCall, ExtractionFunction};
use crate::prompts::{EXTRACT_TEXT_PROMPT, EXTRACTION_SYSTEM_PROMPT, TEXT_PRESENCE_PROMPT};
use crate::server::GatewayState;

/// A validated upload: MIME type plus base64 payload known to decode within limits.
#[derive(Debug)]
pub struct ValidatedImage {
    pub mime_type: String,
    pub data: String,
    pub size_bytes: usize,
}

/// Parse and check the request body against the upload policy.
pub fn validate_request(state: &GatewayState, body: &[u8]) -> Result<ValidatedImage, GatewayError> {
    let request: ExtractRequest =
        serde_json::from_slice(body).map_err(|_| GatewayError::Malformed)?;

    let payload = request.payload().trim();
    let decoded = STANDARD.decode(payload).map_err(|_| GatewayError::Malformed)?;

    state.policy.check_type(&request.filetype)?;
    state.policy.check_size(decoded.len())?;

    Ok(ValidatedImage {
        mime_type: request.filetype,
        // Re-encode so the oracle always receives canonical base64.
        data: STANDARD.encode(&decoded),
        size_bytes: decoded.len(),
    })
}

/// Turn a call into a text result, treating malformed arguments as "nothing found".
fn read_call(
    call: Option<&signshuffle_core::FunctionCall>,
) -> Result<Option<ExtractionCall>, GatewayError> {
    let Some(call) = call else { return Ok(None) };
    match ExtractionCall::parse(call) {
        Ok(parsed) => Ok(Some(parsed)),
        Err(DispatchError::BadArguments { name, source }) => {
            warn!(function = name, error = %source, "Ignoring unparseable oracle call");
            Ok(None)
        }
        Err(unknown) => Err(unknown.into()),
    }
}

/// Run the two-turn extraction conversation.
///
/// `Ok(None)` means no text was found, either because the oracle said so or
/// because nothing usable came back.
pub async fn extract_letters(
    state: &GatewayState,
    image: &ValidatedImage,
) -> Result<Option<LetterCount>, GatewayError> {
    let mut chat = OracleChat::new(state.oracle.clone(), state.model.clone(), state.temperature)
        .with_system_prompt(EXTRACTION_SYSTEM_PROMPT);

    let presence = ExtractionFunction::ReportTextPresence;
    let first = chat
        .send(
            vec![
                Part::InlineData {
                    mime_type: image.mime_type.clone(),
                    data: image.data.clone(),
                },
                Part::text(TEXT_PRESENCE_PROMPT),
            ],
            &[presence.declaration()],
        )
        .await
        .map_err(GatewayError::Oracle)?;

    let text = match read_call(first.function_calls.first())? {
        Some(ExtractionCall::TextPresence { has_text: true }) => {
            let extract = ExtractionFunction::ReportExtractedText;
            let second = chat
                .send(
                    vec![
                        Part::FunctionResponse {
                            name: presence.name().to_string(),
                            response: json!({ "acknowledged": true }),
                        },
                        Part::text(EXTRACT_TEXT_PROMPT),
                    ],
                    &[extract.declaration()],
                )
                .await
                .map_err(GatewayError::Oracle)?;
            match read_call(second.function_calls.first())? {
                Some(ExtractionCall::ExtractedText { text }) => Some(text),
                _ => None,
            }
        }
        // The model skipped straight to the transcription.
        Some(ExtractionCall::ExtractedText { text }) => Some(text),
        Some(ExtractionCall::TextPresence { has_text: false }) | None => {
            debug!("Oracle reported no text in image");
            None
        }
    };

    Ok(text.map(|t| tally(&t)).filter(|letters| !letters.is_empty()))
}

/// Handler for `POST /api/get-letters`.
///
/// 200 with a JSON letter mapping, 200 with an empty body when there is no text,
/// 400 with a plain diagnostic for bad input.
pub async fn get_letters(
    State(state): State<GatewayState>,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let request_id = Uuid::new_v4();
    let image = validate_request(&state, &body)?;
    info!(
        %request_id,
        mime = %image.mime_type,
        size_bytes = image.size_bytes,
        "Extracting letters from image"
    );

    match extract_letters(&state, &image).await? {
        Some(letters) => {
            info!(
                %request_id,
                distinct = letters.len(),
                total = letters.total(),
                "Letters extracted"
            );
            Ok(Json(letters).into_response())
        }
        None => {
            info!(%request_id, "No text found");
            Ok(StatusCode::OK.into_response())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::to_bytes;
    use signshuffle_core::{TurnRole, UploadPolicy};
    use signshuffle_oracle::ScriptedOracle;

    fn state(oracle: Arc<ScriptedOracle>) -> GatewayState {
        GatewayState::new(oracle, "test-model")
    }

    fn body(filetype: &str, bytes: &[u8]) -> Bytes {
        let filedata = format!("data:{filetype};base64,{}", STANDARD.encode(bytes));
        Bytes::from(
            serde_json::to_vec(&json!({
                "filename": "sign.png",
                "filetype": filetype,
                "filedata": filedata,
            }))
            .unwrap(),
        )
    }

    async fn call(state: GatewayState, body: Bytes) -> (StatusCode, String) {
        let response = match get_letters(State(state), body).await {
            Ok(r) => r,
            Err(e) => e.into_response(),
        };
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn missing_fields_are_malformed() {
        let oracle = Arc::new(ScriptedOracle::new());
        let body = Bytes::from_static(br#"{"filetype":"image/png"}"#);
        let (status, text) = call(state(oracle.clone()), body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(text, "Data malformed");

        let (status, _) = call(state(oracle.clone()), Bytes::from_static(b"not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(oracle.requests().is_empty());
    }

    #[tokio::test]
    async fn oversized_payload_is_rejected_before_the_oracle() {
        let oracle = Arc::new(ScriptedOracle::new());
        let st = state(oracle.clone()).with_policy(UploadPolicy::new(8, 20));
        let (status, text) = call(st, body("image/png", &[0u8; 8])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(text, "File too large");
        assert!(oracle.requests().is_empty());
    }

    #[tokio::test]
    async fn unsupported_type_is_rejected() {
        let oracle = Arc::new(ScriptedOracle::new());
        let (status, text) = call(state(oracle), body("image/gif", b"GIF89a")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(text, "Unsupported file type");
    }

    #[tokio::test]
    async fn no_text_gives_empty_success() {
        let oracle = Arc::new(
            ScriptedOracle::new().then_call("report_text_presence", json!({"has_text": false})),
        );
        let (status, text) = call(state(oracle.clone()), body("image/png", b"png-bytes")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(text.is_empty());
        assert_eq!(oracle.requests().len(), 1);
    }

    #[tokio::test]
    async fn two_turns_produce_letter_count() {
        let oracle = Arc::new(
            ScriptedOracle::new()
                .then_call("report_text_presence", json!({"has_text": true}))
                .then_call("report_extracted_text", json!({"text": "Stop here"})),
        );
        let (status, text) = call(state(oracle.clone()), body("image/jpeg", b"jpeg-bytes")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(text, r#"{"S":1,"T":1,"O":1,"P":1,"H":1,"E":2,"R":1}"#);

        let requests = oracle.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].functions[0].name, "report_text_presence");
        assert_eq!(requests[1].functions[0].name, "report_extracted_text");
        assert_eq!(requests[1].turns.len(), 3);
        assert_eq!(requests[1].turns[1].role, TurnRole::Model);
        assert!(matches!(
            &requests[0].turns[0].parts[0],
            Part::InlineData { mime_type, .. } if mime_type == "image/jpeg"
        ));
    }

    #[tokio::test]
    async fn affirmed_but_blank_extraction_is_no_text() {
        let oracle = Arc::new(
            ScriptedOracle::new()
                .then_call("report_text_presence", json!({"has_text": true}))
                .then_call("report_extracted_text", json!({"text": "   "})),
        );
        let (status, text) = call(state(oracle), body("image/png", b"png")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(text.is_empty());
    }

    #[tokio::test]
    async fn unexpected_function_is_a_gateway_error() {
        let oracle = Arc::new(ScriptedOracle::new().then_call("launch_rocket", json!({})));
        let (status, text) = call(state(oracle), body("image/png", b"png")).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(text, "Unexpected oracle response");
    }

    #[tokio::test]
    async fn oracle_failure_is_a_gateway_error() {
        let oracle = Arc::new(ScriptedOracle::new().then_fail("unavailable"));
        let (status, _) = call(state(oracle), body("image/png", b"png")).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }
}
