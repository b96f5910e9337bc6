pub mod analysis;
pub mod chat;
pub mod dashboard;
pub mod scam;
pub mod settings;

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map as JsonMap, Value as JsonValue};
use tracing::{error, info, warn};

use crate::config::ServiceConfig;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::services::analysis_history::AnalysisHistoryStore;
use crate::services::analysis_service::AnalysisService;
use crate::services::chat_service::ChatService;
use crate::services::dashboard_service::DashboardService;
use crate::services::inference_client::{HttpInferenceClient, InferenceBackend};
use crate::services::scam_history::ScamHistoryProvider;
use crate::services::scam_service::ScamCheckService;
use crate::services::settings_service::SettingsService;

#[derive(Clone)]
pub struct AppState {
    inference_client: Arc<HttpInferenceClient>,
    settings_service: Arc<SettingsService>,
    analysis_service: Arc<AnalysisService>,
    dashboard_service: Arc<DashboardService>,
    scam_history: Arc<ScamHistoryProvider>,
    scam_service: Arc<ScamCheckService>,
    chat_service: Arc<ChatService>,
}

impl AppState {
    pub fn new(config: ServiceConfig) -> AppResult<Self> {
        let db_pool = DbPool::new(config.database_path())?;
        let settings_service = Arc::new(SettingsService::new(db_pool.clone(), config));

        let inference_client = Arc::new(HttpInferenceClient::try_new(
            settings_service.effective_config()?,
        )?);
        let backend: Arc<dyn InferenceBackend> = inference_client.clone();

        let history = AnalysisHistoryStore::with_db(db_pool.clone());
        let analysis_service = Arc::new(AnalysisService::new(
            Arc::clone(&backend),
            history.clone(),
        ));
        let dashboard_service = Arc::new(DashboardService::new(
            history,
            Arc::clone(&settings_service),
        ));

        let scam_history = Arc::new(ScamHistoryProvider::new());
        let scam_service = Arc::new(ScamCheckService::new(
            Arc::clone(&backend),
            scam_history.handle(),
        ));
        let chat_service = Arc::new(ChatService::new(backend));

        Ok(Self {
            inference_client,
            settings_service,
            analysis_service,
            dashboard_service,
            scam_history,
            scam_service,
            chat_service,
        })
    }

    pub fn settings(&self) -> Arc<SettingsService> {
        Arc::clone(&self.settings_service)
    }

    pub fn analysis(&self) -> Arc<AnalysisService> {
        Arc::clone(&self.analysis_service)
    }

    pub fn dashboard(&self) -> Arc<DashboardService> {
        Arc::clone(&self.dashboard_service)
    }

    pub fn scam(&self) -> Arc<ScamCheckService> {
        Arc::clone(&self.scam_service)
    }

    /// Provider owning the session's scam-check list. Install it with
    /// [`ScamHistoryProvider::scope`] for code that calls `use_scam_history`.
    pub fn scam_history(&self) -> Arc<ScamHistoryProvider> {
        Arc::clone(&self.scam_history)
    }

    pub fn chat(&self) -> Arc<ChatService> {
        Arc::clone(&self.chat_service)
    }

    /// Pushes the current settings into the HTTP client.
    pub fn apply_settings(&self) -> AppResult<()> {
        let config = self.settings_service.effective_config()?;
        info!(
            target: "app::command",
            api_base_url = %config.api_base_url,
            scam_api_base_url = %config.scam_api_base_url,
            "applying service configuration"
        );
        self.inference_client.reconfigure(config)
    }
}

/// Reads the environment, starts logging and builds the application state.
pub fn bootstrap() -> AppResult<AppState> {
    let config = ServiceConfig::from_env();
    crate::utils::logger::init_logging(&config.log_dir())?;
    info!(
        target: "app::bootstrap",
        data_dir = %config.data_dir.display(),
        "starting neuravos client"
    );
    AppState::new(config)
}

pub type CommandResult<T> = Result<T, CommandError>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
}

impl CommandError {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Option<JsonValue>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details,
        }
    }
}

impl From<AppError> for CommandError {
    fn from(error: AppError) -> Self {
        let message = error.user_message();
        match error {
            AppError::Validation { details, .. } => {
                CommandError::new("VALIDATION_ERROR", message, details)
            }
            AppError::NotFound => {
                CommandError::new("NOT_FOUND", "The requested resource was not found.", None)
            }
            AppError::Remote {
                code,
                correlation_id,
                details,
                ..
            } => {
                let mut merged = JsonMap::new();
                if let Some(existing) = details {
                    match existing {
                        JsonValue::Object(map) => merged.extend(map),
                        value => {
                            merged.insert("info".to_string(), value);
                        }
                    }
                }
                if let Some(id) = correlation_id {
                    merged.insert("correlationId".to_string(), JsonValue::String(id));
                }
                let detail_value = if merged.is_empty() {
                    None
                } else {
                    Some(JsonValue::Object(merged))
                };
                CommandError::new(code.as_str(), message, detail_value)
            }
            AppError::MissingProvider(scope) => {
                error!(target: "app::command", scope, "provider missing in command");
                CommandError::new("MISSING_PROVIDER", format!("{scope} is not available"), None)
            }
            AppError::Database { message: detail } => {
                error!(target: "app::command", %detail, "database error in command");
                CommandError::new("STORAGE_ERROR", message, None)
            }
            AppError::Serialization(err) => {
                error!(target: "app::command", error = %err, "serialization error in command");
                CommandError::new("UNKNOWN", message, None)
            }
            AppError::Io(err) => {
                error!(target: "app::command", error = %err, "io error in command");
                CommandError::new("UNKNOWN", message, None)
            }
            AppError::Other(detail) => {
                warn!(target: "app::command", %detail, "unexpected error in command");
                CommandError::new("UNKNOWN", message, None)
            }
        }
    }
}

pub(crate) async fn run_blocking<T: Send + 'static>(
    task: impl FnOnce() -> AppResult<T> + Send + 'static,
) -> CommandResult<T> {
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| {
            CommandError::new("UNKNOWN", format!("background task failed: {err}"), None)
        })?
        .map_err(CommandError::from)
}
