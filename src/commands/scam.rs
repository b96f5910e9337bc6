use crate::models::scam::{QrCheckOutcome, ScamPrediction, ScamStatsView};

use super::{AppState, CommandError, CommandResult};

pub async fn scam_check_message(
    state: &AppState,
    message: String,
) -> CommandResult<ScamPrediction> {
    state
        .scam()
        .check_message(&message)
        .await
        .map_err(CommandError::from)
}

pub async fn scam_check_qr(state: &AppState, image: Vec<u8>) -> CommandResult<QrCheckOutcome> {
    state
        .scam()
        .check_qr_image(&image)
        .await
        .map_err(CommandError::from)
}

pub fn scam_stats_fetch(state: &AppState) -> CommandResult<ScamStatsView> {
    Ok(state.scam().stats_view())
}

pub fn scam_history_clear(state: &AppState) -> CommandResult<ScamStatsView> {
    let service = state.scam();
    service.clear_history();
    Ok(service.stats_view())
}
