// End-to-end: analyze through the command layer, then read the dashboard.

use httpmock::prelude::*;
use neuravos_app_lib::commands::analysis::{analysis_history_list, analysis_submit};
use neuravos_app_lib::commands::dashboard::dashboard_overview_fetch;
use neuravos_app_lib::commands::scam::{scam_check_message, scam_history_clear, scam_stats_fetch};
use neuravos_app_lib::commands::settings::{settings_get, settings_update, SettingsUpdatePayload};
use neuravos_app_lib::commands::AppState;
use neuravos_app_lib::config::ServiceConfig;
use neuravos_app_lib::models::analysis::VideoUpload;
use serde_json::json;
use tempfile::tempdir;

fn state_for(server: &MockServer, dir: &tempfile::TempDir) -> AppState {
    let config = ServiceConfig::default()
        .with_base_url(server.base_url())
        .with_data_dir(dir.path());
    AppState::new(config).expect("app state")
}

fn video() -> VideoUpload {
    VideoUpload {
        file_name: "rehearsal.mov".to_string(),
        content_type: None,
        bytes: vec![1, 2, 3, 4, 5, 6, 7, 8],
    }
}

#[tokio::test]
async fn analysis_results_feed_the_dashboard() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/analyze");
            then.status(200).json_body(json!({
                "overall_score": 71,
                "body_score": 68,
                "speech_score": 74,
                "emotion": "happy",
                "body_language": {"score": 66, "strengths": ["calm hands"], "problems_detected": [], "keys_to_improve": []},
                "emotion_analysis": {"dominant_emotion": "happy", "emotions": {"happy": 0.35, "neutral": 0.5, "sad": 0.15}}
            }));
        })
        .await;

    let dir = tempdir().expect("temp dir");
    let state = state_for(&server, &dir);

    let empty = dashboard_overview_fetch(&state).await.expect("empty overview");
    assert_eq!(empty.totals.total, 0);
    assert_eq!(empty.totals.average_score, 0);

    for _ in 0..3 {
        let outcome = analysis_submit(&state, video()).await.expect("analysis");
        assert_eq!(outcome.result.overall_score, Some(71));
        assert!(outcome.record_id.is_some());
    }

    let overview = dashboard_overview_fetch(&state).await.expect("overview");
    assert_eq!(overview.totals.total, 3);
    assert_eq!(overview.totals.average_score, 71);
    assert_eq!(overview.totals.last_emotion.as_deref(), Some("happy"));
    assert_eq!(overview.weekly_trend.len(), 1);
    assert_eq!(overview.weekly_trend[0].presentations, 3);

    let skills: Vec<(String, i64)> = overview
        .skills
        .iter()
        .map(|skill| (skill.skill.clone(), skill.score))
        .collect();
    assert_eq!(
        skills,
        vec![
            ("Body Language".to_string(), 68),
            ("Speech Clarity".to_string(), 74),
            ("Engagement".to_string(), 35),
            ("Confidence".to_string(), 66),
        ]
    );
    assert_eq!(overview.emotions.len(), 3);

    let history = analysis_history_list(&state).await.expect("history");
    assert_eq!(history.len(), 3);
}

#[tokio::test]
async fn history_survives_a_restart() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/analyze");
            then.status(200).json_body(json!({ "overall_score": 64 }));
        })
        .await;

    let dir = tempdir().expect("temp dir");
    {
        let state = state_for(&server, &dir);
        analysis_submit(&state, video()).await.expect("analysis");
    }

    let restarted = state_for(&server, &dir);
    let history = analysis_history_list(&restarted).await.expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].overall_score, 64);
    assert_eq!(history[0].emotion, "neutral");
}

#[tokio::test]
async fn scam_history_is_session_scoped() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/scam/predict");
            then.status(200).json_body(json!({
                "ml_prediction": "spam",
                "gemini_prediction": "spam",
                "final_prediction": "spam"
            }));
        })
        .await;

    let dir = tempdir().expect("temp dir");
    let state = state_for(&server, &dir);
    scam_check_message(&state, "free offer".to_string())
        .await
        .expect("scam check");

    let view = scam_stats_fetch(&state).expect("stats");
    assert_eq!(view.stats.spam_count, 1);

    let restarted = state_for(&server, &dir);
    assert_eq!(scam_stats_fetch(&restarted).expect("stats").stats.total, 0);

    let cleared = scam_history_clear(&state).expect("clear");
    assert_eq!(cleared.stats.total, 0);
}

#[tokio::test]
async fn settings_update_redirects_requests_and_timezone() {
    let first = MockServer::start_async().await;
    let second = MockServer::start_async().await;
    let moved = second
        .mock_async(|when, then| {
            when.method(POST).path("/analyze");
            then.status(200).json_body(json!({ "overall_score": 90 }));
        })
        .await;

    let dir = tempdir().expect("temp dir");
    let state = state_for(&first, &dir);

    let settings = settings_update(
        &state,
        SettingsUpdatePayload {
            api_base_url: Some(second.base_url()),
            timezone: Some("Asia/Kolkata".to_string()),
            ..SettingsUpdatePayload::default()
        },
    )
    .await
    .expect("update settings");
    assert_eq!(settings.timezone, "Asia/Kolkata");

    analysis_submit(&state, video()).await.expect("analysis");
    moved.assert_async().await;

    let reset = settings_update(
        &state,
        SettingsUpdatePayload {
            reset: Some(true),
            ..SettingsUpdatePayload::default()
        },
    )
    .await
    .expect("reset settings");
    assert_eq!(reset.api_base_url, first.base_url());
    assert_eq!(settings_get(&state).await.expect("get").timezone, "UTC");
}
