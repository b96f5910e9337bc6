// Error paths across the flows and the command layer.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use httpmock::prelude::*;
use neuravos_app_lib::commands::analysis::analysis_submit;
use neuravos_app_lib::commands::chat::{chat_send, chat_transcript};
use neuravos_app_lib::commands::scam::scam_check_message;
use neuravos_app_lib::commands::AppState;
use neuravos_app_lib::config::ServiceConfig;
use neuravos_app_lib::error::{AppError, AppResult, RemoteErrorCode};
use neuravos_app_lib::models::analysis::{AnalysisResponse, VideoUpload};
use neuravos_app_lib::models::chat::{ChatReply, ChatRole, SubjectInfo, TimetableEntry};
use neuravos_app_lib::models::scam::ScamPrediction;
use neuravos_app_lib::services::analysis_history::{AnalysisHistoryStore, HistoryStorage};
use neuravos_app_lib::services::analysis_service::AnalysisService;
use neuravos_app_lib::services::chat_service::{ChatService, APOLOGY_REPLY, FALLBACK_REPLY};
use neuravos_app_lib::services::inference_client::{HttpInferenceClient, InferenceBackend};
use neuravos_app_lib::services::scam_history::try_use_scam_history;
use serde_json::json;
use tempfile::tempdir;

struct ReadOnlyStorage;

impl HistoryStorage for ReadOnlyStorage {
    fn load(&self, _key: &str) -> AppResult<Option<String>> {
        Ok(None)
    }

    fn update(
        &self,
        _key: &str,
        _apply: &mut dyn FnMut(Option<&str>) -> AppResult<String>,
    ) -> AppResult<()> {
        Err(AppError::database("attempt to write a readonly database"))
    }
}

/// Commits after holding the write for a while, like a database locked by another writer.
struct SlowStorage;

impl HistoryStorage for SlowStorage {
    fn load(&self, _key: &str) -> AppResult<Option<String>> {
        Ok(None)
    }

    fn update(
        &self,
        _key: &str,
        apply: &mut dyn FnMut(Option<&str>) -> AppResult<String>,
    ) -> AppResult<()> {
        std::thread::sleep(StdDuration::from_millis(400));
        apply(None).map(|_| ())
    }
}

struct CannedAnalysis;

#[async_trait]
impl InferenceBackend for CannedAnalysis {
    async fn analyze_video(&self, _upload: VideoUpload) -> AppResult<AnalysisResponse> {
        Ok(AnalysisResponse {
            overall_score: Some(81),
            ..AnalysisResponse::default()
        })
    }

    async fn chat(&self, _message: &str) -> AppResult<ChatReply> {
        Err(AppError::other("not scripted"))
    }

    async fn predict_scam(&self, _message: &str) -> AppResult<ScamPrediction> {
        Err(AppError::other("not scripted"))
    }

    async fn timetable(&self, _day: &str) -> AppResult<TimetableEntry> {
        Err(AppError::other("not scripted"))
    }

    async fn subject_info(&self, _subject: &str) -> AppResult<SubjectInfo> {
        Err(AppError::other("not scripted"))
    }
}

fn video() -> VideoUpload {
    VideoUpload {
        file_name: "final-talk.mp4".to_string(),
        content_type: Some("video/mp4".to_string()),
        bytes: vec![9; 32],
    }
}

fn backend_for(server: &MockServer) -> Arc<dyn InferenceBackend> {
    Arc::new(
        HttpInferenceClient::try_new(ServiceConfig::default().with_base_url(server.base_url()))
            .expect("client"),
    )
}

#[tokio::test]
async fn storage_failure_still_returns_full_analysis() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/analyze");
            then.status(200).json_body(json!({
                "overall_score": 77,
                "emotion": "neutral",
                "speech_analysis": {"duration": 30.0, "speaking_rate": 120.0, "volume": 50.0, "pitch": 160.0}
            }));
        })
        .await;

    let service = AnalysisService::new(
        backend_for(&server),
        AnalysisHistoryStore::new(Arc::new(ReadOnlyStorage)),
    );

    let outcome = service.analyze(video()).await.expect("analysis returned");
    assert_eq!(outcome.result.overall_score, Some(77));
    assert_eq!(
        outcome.result.speech_analysis.map(|speech| speech.speaking_rate),
        Some(120.0)
    );
    assert!(outcome.record_id.is_none());
}

#[tokio::test]
async fn slow_history_write_keeps_runtime_responsive() {
    let service = AnalysisService::new(
        Arc::new(CannedAnalysis),
        AnalysisHistoryStore::new(Arc::new(SlowStorage)),
    );

    let ticks = Arc::new(AtomicUsize::new(0));
    let ticker = tokio::spawn({
        let ticks = Arc::clone(&ticks);
        async move {
            let mut interval = tokio::time::interval(StdDuration::from_millis(10));
            loop {
                interval.tick().await;
                ticks.fetch_add(1, Ordering::SeqCst);
            }
        }
    });

    let outcome = service.analyze(video()).await.expect("analysis returned");
    ticker.abort();

    assert!(outcome.record_id.is_some());
    assert_eq!(outcome.result.overall_score, Some(81));
    assert!(
        ticks.load(Ordering::SeqCst) >= 10,
        "runtime stalled while history was written"
    );
}

#[tokio::test]
async fn server_error_is_not_recorded() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/analyze");
            then.status(200).json_body(json!({ "error": "Video is too short to analyze" }));
        })
        .await;

    let dir = tempdir().expect("temp dir");
    let state = AppState::new(
        ServiceConfig::default()
            .with_base_url(server.base_url())
            .with_data_dir(dir.path()),
    )
    .expect("state");

    let err = analysis_submit(&state, video()).await.expect_err("server error");
    assert_eq!(err.code, "SERVER_ERROR");
    assert_eq!(err.message, "Video is too short to analyze");
    assert!(err
        .details
        .as_ref()
        .and_then(|details| details.get("correlationId"))
        .is_some());
    assert!(state.analysis().history().read_all().is_empty());
}

#[tokio::test]
async fn non_video_upload_is_rejected_before_network() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/analyze");
            then.status(200).json_body(json!({ "overall_score": 50 }));
        })
        .await;

    let dir = tempdir().expect("temp dir");
    let state = AppState::new(
        ServiceConfig::default()
            .with_base_url(server.base_url())
            .with_data_dir(dir.path()),
    )
    .expect("state");

    let upload = VideoUpload {
        file_name: "slides.pdf".to_string(),
        content_type: Some("application/pdf".to_string()),
        bytes: b"%PDF-1.7".to_vec(),
    };
    let err = analysis_submit(&state, upload).await.expect_err("not a video");
    assert_eq!(err.code, "VALIDATION_ERROR");
    assert_eq!(err.message, "Please select a video file (mp4, avi, mov)");
    mock.assert_hits_async(0).await;
}

#[tokio::test]
async fn empty_chat_response_becomes_fallback_reply() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/chat").json_body(json!({ "message": "when is the exam?" }));
            then.status(200).json_body(json!({ "status": "ok" }));
        })
        .await;

    let chat = ChatService::new(backend_for(&server));
    let reply = chat.send("when is the exam?").await.expect("reply");
    assert_eq!(reply.role, ChatRole::Assistant);
    assert_eq!(reply.content, FALLBACK_REPLY);

    let transcript = chat.transcript().expect("transcript");
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[0].role, ChatRole::User);
    assert_eq!(transcript[0].content, "when is the exam?");
}

#[tokio::test]
async fn chat_timeout_appends_apology_and_reports_code() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/chat");
            then.status(200)
                .delay(StdDuration::from_millis(400))
                .json_body(json!({ "response": "late" }));
        })
        .await;

    let dir = tempdir().expect("temp dir");
    let mut config = ServiceConfig::default()
        .with_base_url(server.base_url())
        .with_data_dir(dir.path());
    config.chat_timeout = StdDuration::from_millis(50);
    let state = AppState::new(config).expect("state");

    let err = chat_send(&state, "hello".to_string())
        .await
        .expect_err("timeout");
    assert_eq!(err.code, "HTTP_TIMEOUT");

    let transcript = chat_transcript(&state).expect("transcript");
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[1].content, APOLOGY_REPLY);
}

#[tokio::test]
async fn scam_service_outage_maps_to_service_unavailable() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/scam/predict");
            then.status(502);
        })
        .await;

    let dir = tempdir().expect("temp dir");
    let state = AppState::new(
        ServiceConfig::default()
            .with_base_url(server.base_url())
            .with_data_dir(dir.path()),
    )
    .expect("state");

    let err = scam_check_message(&state, "free offer".to_string())
        .await
        .expect_err("bad gateway");
    assert_eq!(err.code, RemoteErrorCode::ServiceUnavailable.as_str());
    assert_eq!(state.scam().stats_view().stats.total, 0);
}

#[test]
fn scam_history_outside_provider_is_an_error() {
    let err = try_use_scam_history().err().expect("no provider");
    assert!(matches!(err, AppError::MissingProvider(_)));
}
