use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::models::analysis::{AnalysisOutcome, VideoUpload};
use crate::services::analysis_history::AnalysisHistoryStore;
use crate::services::inference_client::InferenceBackend;

const VIDEO_EXTENSIONS: [&str; 7] = ["mp4", "avi", "mov", "mkv", "webm", "m4v", "mpeg"];
const UNSUPPORTED_VIDEO_MESSAGE: &str = "Please select a video file (mp4, avi, mov)";

/// Upload a video, show the result, remember it.
pub struct AnalysisService {
    backend: Arc<dyn InferenceBackend>,
    history: AnalysisHistoryStore,
}

impl AnalysisService {
    pub fn new(backend: Arc<dyn InferenceBackend>, history: AnalysisHistoryStore) -> Self {
        Self { backend, history }
    }

    /// Sends the video for analysis. A successful response is always returned
    /// in full; recording it in history is best-effort.
    pub async fn analyze(&self, upload: VideoUpload) -> AppResult<AnalysisOutcome> {
        ensure_video(&upload)?;

        info!(
            target: "app::analysis",
            file_name = %upload.file_name,
            size_bytes = upload.bytes.len(),
            "submitting video for analysis"
        );
        let result = self.backend.analyze_video(upload).await?;

        let history = self.history.clone();
        let snapshot = result.clone();
        let recorded = tokio::task::spawn_blocking(move || history.record(&snapshot))
            .await
            .map_err(|err| AppError::other(format!("history task failed: {err}")))
            .and_then(|outcome| outcome);

        let record_id = match recorded {
            Ok(record) => Some(record.id),
            Err(err) => {
                warn!(
                    target: "app::history",
                    error = %err,
                    "failed to persist analysis; result still returned"
                );
                None
            }
        };

        Ok(AnalysisOutcome { result, record_id })
    }

    pub fn history(&self) -> &AnalysisHistoryStore {
        &self.history
    }
}

impl VideoUpload {
    pub async fn from_path(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("video")
            .to_string();
        let content_type = extension_of(&file_name).map(|ext| video_mime(&ext).to_string());

        Ok(Self {
            file_name,
            content_type,
            bytes,
        })
    }
}

/// Rejects anything that is not a non-empty video before it leaves the client.
pub fn ensure_video(upload: &VideoUpload) -> AppResult<()> {
    let declared_video = upload
        .content_type
        .as_deref()
        .map(|value| value.trim().to_ascii_lowercase().starts_with("video/"));

    let is_video = match declared_video {
        Some(flag) => flag,
        None => extension_of(&upload.file_name)
            .map(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
            .unwrap_or(false),
    };

    if !is_video {
        return Err(AppError::validation(UNSUPPORTED_VIDEO_MESSAGE));
    }
    if upload.bytes.is_empty() {
        return Err(AppError::validation("The selected video file is empty"));
    }
    Ok(())
}

fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

fn video_mime(extension: &str) -> &'static str {
    match extension {
        "mp4" | "m4v" => "video/mp4",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "mpeg" => "video/mpeg",
        _ => "application/octet-stream",
    }
}
