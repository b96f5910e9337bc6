use std::path::PathBuf;

use crate::models::analysis::{AnalysisOutcome, AnalysisRecord, VideoUpload};

use super::{run_blocking, AppState, CommandError, CommandResult};

pub async fn analysis_submit(
    state: &AppState,
    upload: VideoUpload,
) -> CommandResult<AnalysisOutcome> {
    state
        .analysis()
        .analyze(upload)
        .await
        .map_err(CommandError::from)
}

pub async fn analysis_submit_file(
    state: &AppState,
    path: PathBuf,
) -> CommandResult<AnalysisOutcome> {
    let upload = VideoUpload::from_path(&path)
        .await
        .map_err(CommandError::from)?;
    analysis_submit(state, upload).await
}

pub async fn analysis_history_list(state: &AppState) -> CommandResult<Vec<AnalysisRecord>> {
    let app_state = state.clone();
    run_blocking(move || Ok(app_state.analysis().history().read_all())).await
}
