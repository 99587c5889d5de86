use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};

use super::common::{created_response, no_content_response, success_response, PaginationParams};
use crate::{
    entities::{menu_category, menu_item, menu_subcategory, promotion},
    errors::ServiceError,
    services::{
        menu::{
            CreateCategoryRequest, CreateMenuItemRequest, CreatePromotionRequest,
            CreateSubcategoryRequest, MenuItemSearch, MenuItemView, MenuSection,
            UpdateMenuItemRequest,
        },
        today,
    },
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};

// Public catalog

#[utoipa::path(
    get,
    path = "/api/v1/menu/categories",
    summary = "List menu categories",
    responses((status = 200, description = "Categories", body = ApiResponse<Vec<menu_category::Model>>)),
    tag = "menu"
)]
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Vec<menu_category::Model>> {
    let categories = state.services.menu.list_categories().await?;
    Ok(success_response(categories))
}

#[utoipa::path(
    get,
    path = "/api/v1/menu/categories/{slug}/sections",
    summary = "Category sections",
    description = "Available items of a category grouped by subcategory",
    params(("slug" = String, Path, description = "Category slug")),
    responses(
        (status = 200, description = "Sections with their items", body = ApiResponse<Vec<MenuSection>>),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse),
    ),
    tag = "menu"
)]
pub async fn category_sections(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Vec<MenuSection>> {
    let sections = state.services.menu.sections(&slug).await?;
    Ok(success_response(sections))
}

#[utoipa::path(
    get,
    path = "/api/v1/menu/items/{id}",
    summary = "Menu item detail",
    params(("id" = i32, Path, description = "Menu item id")),
    responses(
        (status = 200, description = "Item with today's price", body = ApiResponse<MenuItemView>),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse),
    ),
    tag = "menu"
)]
pub async fn get_item(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<MenuItemView> {
    let item = state.services.menu.get_item(id).await?;
    Ok(success_response(item))
}

#[utoipa::path(
    get,
    path = "/api/v1/menu/promotions",
    summary = "Promotions active today",
    responses((status = 200, description = "Active promotions", body = ApiResponse<Vec<promotion::Model>>)),
    tag = "menu"
)]
pub async fn active_promotions(State(state): State<AppState>) -> ApiResult<Vec<promotion::Model>> {
    let promotions = state.services.menu.active_promotions(today()).await?;
    Ok(success_response(promotions))
}

// Administration

#[utoipa::path(
    get,
    path = "/api/v1/admin/menu/items",
    summary = "Search menu items",
    params(
        ("q" = Option<String>, Query, description = "Matches name or description"),
        ("category_id" = Option<i32>, Query, description = "Restrict to a category"),
        ("available" = Option<bool>, Query, description = "Filter on availability"),
        PaginationParams,
    ),
    responses((status = 200, description = "Matching items", body = ApiResponse<PaginatedResponse<MenuItemView>>)),
    security(("Bearer" = [])),
    tag = "menu-admin"
)]
pub async fn search_items(
    State(state): State<AppState>,
    Query(search): Query<MenuItemSearch>,
    Query(paging): Query<PaginationParams>,
) -> ApiResult<PaginatedResponse<MenuItemView>> {
    let (page, per_page) = paging.resolve(&state.config);
    let (items, total) = state
        .services
        .menu
        .search_items(&search, page, per_page)
        .await?;
    Ok(success_response(PaginatedResponse::new(
        items, total, page, per_page,
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/menu/items",
    summary = "Create menu item",
    request_body = CreateMenuItemRequest,
    responses(
        (status = 201, description = "Item created", body = ApiResponse<menu_item::Model>),
        (status = 400, description = "Invalid item", body = crate::errors::ErrorResponse),
        (status = 404, description = "Subcategory not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "menu-admin"
)]
pub async fn create_item(
    State(state): State<AppState>,
    Json(request): Json<CreateMenuItemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let item = state.services.menu.create_item(request).await?;
    Ok(created_response(item))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/menu/items/{id}",
    summary = "Update menu item",
    params(("id" = i32, Path, description = "Menu item id")),
    request_body = UpdateMenuItemRequest,
    responses(
        (status = 200, description = "Item updated", body = ApiResponse<menu_item::Model>),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "menu-admin"
)]
pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<UpdateMenuItemRequest>,
) -> ApiResult<menu_item::Model> {
    let item = state.services.menu.update_item(id, request).await?;
    Ok(success_response(item))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/menu/items/{id}/toggle",
    summary = "Toggle availability",
    params(("id" = i32, Path, description = "Menu item id")),
    responses((status = 200, description = "Item with flipped availability", body = ApiResponse<menu_item::Model>)),
    security(("Bearer" = [])),
    tag = "menu-admin"
)]
pub async fn toggle_item(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<menu_item::Model> {
    let item = state.services.menu.toggle_availability(id).await?;
    Ok(success_response(item))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/menu/items/{id}",
    summary = "Delete menu item",
    params(("id" = i32, Path, description = "Menu item id")),
    responses(
        (status = 204, description = "Item deleted"),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Item appears on orders", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "menu-admin"
)]
pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.menu.delete_item(id).await?;
    Ok(no_content_response())
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/menu/categories",
    summary = "Create category",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created", body = ApiResponse<menu_category::Model>),
        (status = 409, description = "Name or slug taken", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "menu-admin"
)]
pub async fn create_category(
    State(state): State<AppState>,
    Json(request): Json<CreateCategoryRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let category = state.services.menu.create_category(request).await?;
    Ok(created_response(category))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/menu/subcategories",
    summary = "Create subcategory",
    request_body = CreateSubcategoryRequest,
    responses(
        (status = 201, description = "Subcategory created", body = ApiResponse<menu_subcategory::Model>),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "menu-admin"
)]
pub async fn create_subcategory(
    State(state): State<AppState>,
    Json(request): Json<CreateSubcategoryRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let subcategory = state.services.menu.create_subcategory(request).await?;
    Ok(created_response(subcategory))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/promotions",
    summary = "List promotions",
    responses((status = 200, description = "All promotions", body = ApiResponse<Vec<promotion::Model>>)),
    security(("Bearer" = [])),
    tag = "menu-admin"
)]
pub async fn list_promotions(State(state): State<AppState>) -> ApiResult<Vec<promotion::Model>> {
    let promotions = state.services.menu.list_promotions().await?;
    Ok(success_response(promotions))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/promotions",
    summary = "Create promotion",
    request_body = CreatePromotionRequest,
    responses(
        (status = 201, description = "Promotion created", body = ApiResponse<promotion::Model>),
        (status = 400, description = "Invalid dates or discount", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "menu-admin"
)]
pub async fn create_promotion(
    State(state): State<AppState>,
    Json(request): Json<CreatePromotionRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let promotion = state.services.menu.create_promotion(request).await?;
    Ok(created_response(promotion))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/promotions/{id}",
    summary = "Delete promotion",
    params(("id" = i32, Path, description = "Promotion id")),
    responses(
        (status = 204, description = "Promotion deleted"),
        (status = 404, description = "Promotion not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "menu-admin"
)]
pub async fn delete_promotion(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.menu.delete_promotion(id).await?;
    Ok(no_content_response())
}
