use crate::models::dashboard::DashboardOverview;

use super::{run_blocking, AppState, CommandResult};

pub async fn dashboard_overview_fetch(state: &AppState) -> CommandResult<DashboardOverview> {
    let app_state = state.clone();
    run_blocking(move || app_state.dashboard().overview()).await
}
