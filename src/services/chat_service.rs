use std::sync::{Arc, RwLock};

use chrono::{SecondsFormat, Utc};
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::models::chat::{ChatMessage, ChatRole, SubjectInfo, TimetableEntry};
use crate::services::inference_client::InferenceBackend;
use crate::utils::fingerprint::message_fingerprint;

pub const FALLBACK_REPLY: &str = "Sorry, I couldn't process your request.";
pub const APOLOGY_REPLY: &str =
    "Sorry, I'm having trouble connecting right now. Please try again later.";

/// Campus assistant with an in-session transcript.
pub struct ChatService {
    backend: Arc<dyn InferenceBackend>,
    transcript: RwLock<Vec<ChatMessage>>,
}

impl ChatService {
    pub fn new(backend: Arc<dyn InferenceBackend>) -> Self {
        Self {
            backend,
            transcript: RwLock::new(Vec::new()),
        }
    }

    /// Appends the user turn, asks the service and appends its reply. On
    /// failure an apology turn is appended and the error returned.
    pub async fn send(&self, message: &str) -> AppResult<ChatMessage> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AppError::validation("Please enter a message."));
        }

        self.push(ChatRole::User, message)?;
        debug!(
            target: "app::chat",
            fingerprint = %message_fingerprint(message),
            "sending chat message"
        );

        match self.backend.chat(message).await {
            Ok(reply) => {
                let content = reply
                    .response
                    .filter(|text| !text.trim().is_empty())
                    .unwrap_or_else(|| FALLBACK_REPLY.to_string());
                self.push(ChatRole::Assistant, &content)
            }
            Err(err) => {
                warn!(target: "app::chat", error = %err, "chat request failed");
                self.push(ChatRole::Assistant, APOLOGY_REPLY)?;
                Err(err)
            }
        }
    }

    pub fn transcript(&self) -> AppResult<Vec<ChatMessage>> {
        self.transcript
            .read()
            .map(|guard| guard.clone())
            .map_err(|_| AppError::other("chat transcript lock poisoned"))
    }

    pub async fn timetable(&self, day: &str) -> AppResult<TimetableEntry> {
        let day = day.trim();
        if day.is_empty() {
            return Err(AppError::validation("Please choose a day."));
        }
        self.backend.timetable(&day.to_lowercase()).await
    }

    pub async fn subject_info(&self, subject: &str) -> AppResult<SubjectInfo> {
        let subject = subject.trim();
        if subject.is_empty() {
            return Err(AppError::validation("Please enter a subject name."));
        }
        self.backend.subject_info(subject).await
    }

    fn push(&self, role: ChatRole, content: &str) -> AppResult<ChatMessage> {
        let message = ChatMessage {
            role,
            content: content.to_string(),
            time: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        let mut guard = self
            .transcript
            .write()
            .map_err(|_| AppError::other("chat transcript lock poisoned"))?;
        guard.push(message.clone());
        Ok(message)
    }
}
