use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};

use super::common::{created_response, success_response};
use crate::{
    entities::table,
    errors::ServiceError,
    services::tables::CreateTableRequest,
    ApiResponse, ApiResult, AppState,
};

#[utoipa::path(
    get,
    path = "/api/v1/tables",
    summary = "List tables",
    responses((status = 200, description = "Tables ordered by seats then number", body = ApiResponse<Vec<table::Model>>)),
    tag = "tables"
)]
pub async fn list_tables(State(state): State<AppState>) -> ApiResult<Vec<table::Model>> {
    let tables = state.services.tables.list().await?;
    Ok(success_response(tables))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/tables",
    summary = "Create table",
    request_body = CreateTableRequest,
    responses(
        (status = 201, description = "Table created", body = ApiResponse<table::Model>),
        (status = 400, description = "Seats must be 2 or 4", body = crate::errors::ErrorResponse),
        (status = 409, description = "Table number taken", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "tables"
)]
pub async fn create_table(
    State(state): State<AppState>,
    Json(request): Json<CreateTableRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let created = state.services.tables.create(request).await?;
    Ok(created_response(created))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/tables/{id}/qr",
    summary = "Regenerate QR token",
    params(("id" = i32, Path, description = "Table id")),
    responses(
        (status = 200, description = "Table with a fresh QR token", body = ApiResponse<table::Model>),
        (status = 404, description = "Table not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "tables"
)]
pub async fn regenerate_qr(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<table::Model> {
    let table = state.services.tables.regenerate_qr(id).await?;
    Ok(success_response(table))
}
