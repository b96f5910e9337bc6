use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::models::scam::{QrCheckOutcome, ScamPrediction, ScamStatsView};
use crate::services::inference_client::InferenceBackend;
use crate::services::qr_decoder::decode_qr_image;
use crate::services::scam_history::{scam_stats, verdict_distribution, ScamHistoryHandle};
use crate::utils::fingerprint::message_fingerprint;
use crate::utils::redact::redact_sensitive_text;

pub struct ScamCheckService {
    backend: Arc<dyn InferenceBackend>,
    history: ScamHistoryHandle,
}

impl ScamCheckService {
    pub fn new(backend: Arc<dyn InferenceBackend>, history: ScamHistoryHandle) -> Self {
        Self { backend, history }
    }

    /// Classifies `message` and records the three verdicts. The full
    /// prediction (patterns, risk score) goes back to the caller.
    pub async fn check_message(&self, message: &str) -> AppResult<ScamPrediction> {
        if message.trim().is_empty() {
            return Err(AppError::validation("Please enter a message to check."));
        }

        let fingerprint = message_fingerprint(message);
        info!(
            target: "app::scam",
            %fingerprint,
            preview = %redact_sensitive_text(&preview(message)),
            "checking message"
        );

        let prediction = match self.backend.predict_scam(message).await {
            Ok(prediction) => prediction,
            Err(err) => {
                warn!(target: "app::scam", %fingerprint, error = %err, "scam prediction failed");
                return Err(err);
            }
        };

        self.history.add_result(
            message,
            &prediction.ml_prediction,
            &prediction.gemini_prediction,
            &prediction.final_prediction,
        );
        Ok(prediction)
    }

    /// Decodes the QR code in an image, then checks its text like a typed message.
    pub async fn check_qr_image(&self, image: &[u8]) -> AppResult<QrCheckOutcome> {
        let bytes = image.to_vec();
        let decoded_message = tokio::task::spawn_blocking(move || decode_qr_image(&bytes))
            .await
            .map_err(|err| AppError::other(format!("QR decoding task failed: {err}")))??;
        let prediction = self.check_message(&decoded_message).await?;
        Ok(QrCheckOutcome {
            decoded_message,
            prediction,
        })
    }

    pub fn stats_view(&self) -> ScamStatsView {
        let history = self.history.history();
        let stats = scam_stats(&history);
        ScamStatsView {
            distribution: verdict_distribution(&stats),
            stats,
            history,
        }
    }

    pub fn clear_history(&self) {
        self.history.clear_history();
    }

    pub fn history(&self) -> &ScamHistoryHandle {
        &self.history
    }
}

fn preview(message: &str) -> String {
    const PREVIEW_CHARS: usize = 48;
    let mut preview: String = message.chars().take(PREVIEW_CHARS).collect();
    if message.chars().count() > PREVIEW_CHARS {
        preview.push_str("...");
    }
    preview
}
