use std::sync::RwLock;
use std::time::{Duration as StdDuration, Instant};

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::{json, Value as JsonValue};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::ServiceConfig;
use crate::error::{AppError, AppResult, RemoteErrorCode};
use crate::models::analysis::{AnalysisResponse, VideoUpload};
use crate::models::chat::{ChatReply, SubjectInfo, TimetableEntry};
use crate::models::scam::ScamPrediction;
use crate::utils::redact::redact_sensitive_data;
use crate::utils::schema::validate_analysis_payload;

/// The remote inference service as seen by the flows. Implemented over HTTP by
/// [`HttpInferenceClient`]; tests substitute their own.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    async fn analyze_video(&self, upload: VideoUpload) -> AppResult<AnalysisResponse>;

    async fn chat(&self, message: &str) -> AppResult<ChatReply>;

    async fn predict_scam(&self, message: &str) -> AppResult<ScamPrediction>;

    async fn timetable(&self, day: &str) -> AppResult<TimetableEntry>;

    async fn subject_info(&self, subject: &str) -> AppResult<SubjectInfo>;
}

#[derive(Clone, Copy, Debug)]
enum InferenceOperation {
    Analyze,
    Chat,
    ScamPredict,
    Timetable,
    Subject,
}

impl InferenceOperation {
    fn as_str(self) -> &'static str {
        match self {
            InferenceOperation::Analyze => "analyze",
            InferenceOperation::Chat => "chat",
            InferenceOperation::ScamPredict => "scamPredict",
            InferenceOperation::Timetable => "timetable",
            InferenceOperation::Subject => "subject",
        }
    }

    fn timeout(self, config: &ServiceConfig) -> StdDuration {
        match self {
            InferenceOperation::Analyze => config.analyze_timeout,
            InferenceOperation::Chat => config.chat_timeout,
            InferenceOperation::ScamPredict
            | InferenceOperation::Timetable
            | InferenceOperation::Subject => config.default_timeout,
        }
    }
}

pub struct HttpInferenceClient {
    client: reqwest::Client,
    config: RwLock<ServiceConfig>,
}

impl HttpInferenceClient {
    pub fn try_new(config: ServiceConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(2)
            .pool_idle_timeout(Some(StdDuration::from_secs(90)))
            .build()
            .map_err(|err| AppError::other(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            config: RwLock::new(config),
        })
    }

    /// Swaps in new base URLs/timeouts, e.g. after settings change.
    pub fn reconfigure(&self, config: ServiceConfig) -> AppResult<()> {
        let mut guard = self
            .config
            .write()
            .map_err(|_| AppError::other("inference config lock poisoned"))?;
        debug!(
            target: "app::inference",
            api_base_url = %config.api_base_url,
            scam_api_base_url = %config.scam_api_base_url,
            "inference client reconfigured"
        );
        *guard = config;
        Ok(())
    }

    pub fn config(&self) -> AppResult<ServiceConfig> {
        self.config
            .read()
            .map(|guard| guard.clone())
            .map_err(|_| AppError::other("inference config lock poisoned"))
    }

    fn endpoint(
        &self,
        operation: InferenceOperation,
        segments: &[&str],
    ) -> AppResult<(Url, StdDuration)> {
        let config = self.config()?;
        let base = match operation {
            InferenceOperation::ScamPredict => &config.scam_api_base_url,
            _ => &config.api_base_url,
        };

        let mut url = Url::parse(base.trim_end_matches('/')).map_err(|err| {
            AppError::validation(format!("invalid service base URL '{base}': {err}"))
        })?;
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                AppError::validation(format!("service base URL '{base}' cannot carry a path"))
            })?;
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }

        Ok((url, operation.timeout(&config)))
    }

    async fn execute(
        &self,
        operation: InferenceOperation,
        request: reqwest::RequestBuilder,
        correlation_id: &str,
    ) -> AppResult<JsonValue> {
        let start = Instant::now();
        let response = request.send().await;

        match response {
            Ok(resp) => {
                let status = resp.status();
                let latency_ms = start.elapsed().as_millis();
                let body = resp.text().await.map_err(|err| {
                    let (error, _) = error_from_reqwest(err, operation, correlation_id);
                    error
                })?;
                let parsed: Option<JsonValue> = serde_json::from_str(&body).ok();

                if let Some(message) = parsed
                    .as_ref()
                    .and_then(|value| value.get("error"))
                    .and_then(|value| value.as_str())
                {
                    warn!(
                        target: "app::inference",
                        operation = operation.as_str(),
                        correlation_id = %correlation_id,
                        status = status.as_u16(),
                        latency_ms,
                        "service reported an error"
                    );
                    return Err(AppError::remote_with_details(
                        RemoteErrorCode::ServerError,
                        message,
                        Some(correlation_id),
                        Some(json!({ "status": status.as_u16() })),
                    ));
                }

                if !status.is_success() {
                    let (error, retryable) = map_http_error(status, operation, correlation_id);
                    warn!(
                        target: "app::inference",
                        operation = operation.as_str(),
                        correlation_id = %correlation_id,
                        status = status.as_u16(),
                        latency_ms,
                        retryable,
                        "service returned non-success status"
                    );
                    return Err(error);
                }

                debug!(
                    target: "app::inference",
                    operation = operation.as_str(),
                    correlation_id = %correlation_id,
                    latency_ms,
                    body_len = body.len(),
                    "service responded"
                );

                parsed.ok_or_else(|| {
                    AppError::remote_with_details(
                        RemoteErrorCode::InvalidResponse,
                        format!("{} response is not valid JSON", operation.as_str()),
                        Some(correlation_id),
                        None,
                    )
                })
            }
            Err(err) => {
                let (error, retryable) = error_from_reqwest(err, operation, correlation_id);
                warn!(
                    target: "app::inference",
                    operation = operation.as_str(),
                    correlation_id = %correlation_id,
                    retryable,
                    "service request failed"
                );
                Err(error)
            }
        }
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        operation: InferenceOperation,
        segments: &[&str],
        payload: JsonValue,
    ) -> AppResult<T> {
        let correlation_id = Uuid::new_v4().to_string();
        let (url, timeout) = self.endpoint(operation, segments)?;

        debug!(
            target: "app::inference",
            operation = operation.as_str(),
            correlation_id = %correlation_id,
            url = %url,
            payload = %redact_sensitive_data(&payload),
            "invoking service"
        );

        let request = self.client.post(url).timeout(timeout).json(&payload);
        let value = self.execute(operation, request, &correlation_id).await?;
        decode(operation, value, &correlation_id)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: InferenceOperation,
        segments: &[&str],
    ) -> AppResult<T> {
        let correlation_id = Uuid::new_v4().to_string();
        let (url, timeout) = self.endpoint(operation, segments)?;

        debug!(
            target: "app::inference",
            operation = operation.as_str(),
            correlation_id = %correlation_id,
            url = %url,
            "invoking service"
        );

        let request = self.client.get(url).timeout(timeout);
        let value = self.execute(operation, request, &correlation_id).await?;
        decode(operation, value, &correlation_id)
    }
}

#[async_trait]
impl InferenceBackend for HttpInferenceClient {
    async fn analyze_video(&self, upload: VideoUpload) -> AppResult<AnalysisResponse> {
        let operation = InferenceOperation::Analyze;
        let correlation_id = Uuid::new_v4().to_string();
        let (url, timeout) = self.endpoint(operation, &["analyze"])?;

        let size_bytes = upload.bytes.len();
        let mut part = Part::bytes(upload.bytes).file_name(upload.file_name);
        if let Some(content_type) = upload.content_type.as_deref() {
            part = part.mime_str(content_type).map_err(|err| {
                AppError::validation(format!("invalid video content type '{content_type}': {err}"))
            })?;
        }
        let form = Form::new().part("video", part);

        debug!(
            target: "app::inference",
            operation = operation.as_str(),
            correlation_id = %correlation_id,
            url = %url,
            size_bytes,
            "uploading video for analysis"
        );

        let request = self.client.post(url).timeout(timeout).multipart(form);
        let value = self.execute(operation, request, &correlation_id).await?;
        validate_analysis_payload(&value)?;
        decode(operation, value, &correlation_id)
    }

    async fn chat(&self, message: &str) -> AppResult<ChatReply> {
        self.post_json(InferenceOperation::Chat, &["chat"], json!({ "message": message }))
            .await
    }

    async fn predict_scam(&self, message: &str) -> AppResult<ScamPrediction> {
        self.post_json(
            InferenceOperation::ScamPredict,
            &["scam", "predict"],
            json!({ "message": message }),
        )
        .await
    }

    async fn timetable(&self, day: &str) -> AppResult<TimetableEntry> {
        self.get_json(InferenceOperation::Timetable, &["timetable", day])
            .await
    }

    async fn subject_info(&self, subject: &str) -> AppResult<SubjectInfo> {
        self.get_json(InferenceOperation::Subject, &["subject", subject])
            .await
    }
}

fn decode<T: DeserializeOwned>(
    operation: InferenceOperation,
    value: JsonValue,
    correlation_id: &str,
) -> AppResult<T> {
    serde_json::from_value(value).map_err(|err| {
        AppError::remote_with_details(
            RemoteErrorCode::InvalidResponse,
            format!("failed to decode {} response: {err}", operation.as_str()),
            Some(correlation_id),
            None,
        )
    })
}

fn map_http_error(
    status: StatusCode,
    operation: InferenceOperation,
    correlation_id: &str,
) -> (AppError, bool) {
    let name = operation.as_str();
    match status {
        StatusCode::TOO_MANY_REQUESTS => (
            AppError::remote_with_details(
                RemoteErrorCode::RateLimited,
                format!("{name} was rate limited"),
                Some(correlation_id),
                None,
            ),
            true,
        ),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => (
            AppError::remote_with_details(
                RemoteErrorCode::HttpTimeout,
                format!("{name} timed out upstream (status {})", status.as_u16()),
                Some(correlation_id),
                None,
            ),
            true,
        ),
        status if status.is_server_error() => (
            AppError::remote_with_details(
                RemoteErrorCode::ServiceUnavailable,
                format!("{name} service unavailable (status {})", status.as_u16()),
                Some(correlation_id),
                None,
            ),
            true,
        ),
        status if status.is_client_error() => (
            AppError::remote_with_details(
                RemoteErrorCode::InvalidRequest,
                format!("{name} request rejected (status {})", status.as_u16()),
                Some(correlation_id),
                None,
            ),
            false,
        ),
        status => (
            AppError::remote_with_details(
                RemoteErrorCode::Unknown,
                format!("{name} returned unexpected status {}", status.as_u16()),
                Some(correlation_id),
                None,
            ),
            false,
        ),
    }
}

fn error_from_reqwest(
    err: reqwest::Error,
    operation: InferenceOperation,
    correlation_id: &str,
) -> (AppError, bool) {
    let name = operation.as_str();
    if err.is_timeout() {
        (
            AppError::remote_with_details(
                RemoteErrorCode::HttpTimeout,
                format!("{name} request timed out"),
                Some(correlation_id),
                None,
            ),
            true,
        )
    } else if err.is_connect() {
        (
            AppError::remote_with_details(
                RemoteErrorCode::ServiceUnavailable,
                format!("could not connect to the {name} service"),
                Some(correlation_id),
                None,
            ),
            true,
        )
    } else if let Some(status) = err.status() {
        map_http_error(status, operation, correlation_id)
    } else {
        (
            AppError::remote_with_details(
                RemoteErrorCode::Unknown,
                format!("{name} request failed: {err}"),
                Some(correlation_id),
                None,
            ),
            false,
        )
    }
}

pub mod testing {
    use super::*;

    /// Exposes status mapping to integration tests without widening the API.
    pub fn map_status(status: StatusCode) -> (AppError, bool) {
        map_http_error(status, InferenceOperation::ScamPredict, "test-correlation-id")
    }
}
