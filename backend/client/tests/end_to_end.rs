use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::net::TcpListener;

use signshuffle_client::{
    HttpGateway, ImageUpload, Orchestrator, OrchestratorConfig, RunOutcome, SessionError,
};
use signshuffle_gateway::{build_router, GatewayState};
use signshuffle_oracle::ScriptedOracle;

async fn spawn_gateway(oracle: Arc<ScriptedOracle>) -> String {
    let router = build_router(GatewayState::new(oracle, "test-model"));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn quick_config() -> OrchestratorConfig {
    OrchestratorConfig {
        segment_duration: Duration::from_millis(50),
        ..OrchestratorConfig::default()
    }
}

fn sign() -> ImageUpload {
    ImageUpload::new("exit.png", "image/png", b"\x89PNG\r\n\x1a\nfake".to_vec())
}

#[tokio::test]
async fn photo_to_verdicts_over_http() {
    let oracle = Arc::new(
        ScriptedOracle::new()
            .then_call("report_text_presence", json!({"has_text": true}))
            .then_call("report_extracted_text", json!({"text": "Stop here"}))
            .then_call(
                "propose_sentences",
                json!({"sentences": ["Heros pt", "The ops", "Stop there"]}),
            ),
    );
    let url = spawn_gateway(oracle.clone()).await;
    let orch = Orchestrator::new(Arc::new(HttpGateway::new(url)), quick_config());

    let outcome = orch.upload(sign()).await;
    let RunOutcome::Completed(verdicts) = outcome else {
        panic!("upload did not complete");
    };
    let flags: Vec<bool> = verdicts.iter().map(|v| v.valid).collect();
    assert_eq!(flags, vec![true, true, false]);
    assert_eq!(oracle.remaining(), 0);

    let session = orch.session();
    assert!(!session.loading);
    assert_eq!(session.progress, 0.0);
}

#[tokio::test]
async fn no_text_over_http() {
    let oracle = Arc::new(
        ScriptedOracle::new().then_call("report_text_presence", json!({"has_text": false})),
    );
    let url = spawn_gateway(oracle).await;
    let orch = Orchestrator::new(Arc::new(HttpGateway::new(url)), quick_config());

    assert_eq!(
        orch.upload(sign()).await,
        RunOutcome::Failed(SessionError::NoTextFound)
    );
}

#[tokio::test]
async fn oracle_outage_during_generation() {
    let oracle = Arc::new(
        ScriptedOracle::new()
            .then_call("report_text_presence", json!({"has_text": true}))
            .then_call("report_extracted_text", json!({"text": "EXIT"}))
            .then_fail("quota exceeded"),
    );
    let url = spawn_gateway(oracle).await;
    let orch = Orchestrator::new(Arc::new(HttpGateway::new(url)), quick_config());

    assert_eq!(
        orch.upload(sign()).await,
        RunOutcome::Failed(SessionError::GenerationFailed)
    );
}

#[tokio::test]
async fn gateway_unreachable() {
    let orch = Orchestrator::new(
        Arc::new(HttpGateway::new("http://127.0.0.1:9")),
        quick_config(),
    );
    assert_eq!(
        orch.upload(sign()).await,
        RunOutcome::Failed(SessionError::ExtractionFailed)
    );
}
