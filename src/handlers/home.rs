use axum::extract::State;

use super::common::success_response;
use crate::{services::reports::HomeView, ApiResponse, ApiResult, AppState};

#[utoipa::path(
    get,
    path = "/api/v1/home",
    summary = "Home page",
    description = "Three most popular dishes and the three latest verified reviews",
    responses((status = 200, description = "Home page content", body = ApiResponse<HomeView>)),
    tag = "home"
)]
pub async fn home(State(state): State<AppState>) -> ApiResult<HomeView> {
    let view = state.services.reports.home().await?;
    Ok(success_response(view))
}
