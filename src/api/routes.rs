//! Route API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use super::{created, success, ApiResult};
use crate::errors::AppError;
use crate::models::{CreateRouteRequest, Route, RouteDetail};
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteCreated {
    pub route_id: String,
}

/// POST /api/routes - Register a new route.
pub async fn create_route(
    State(state): State<AppState>,
    Json(request): Json<CreateRouteRequest>,
) -> ApiResult<RouteCreated> {
    if request.name.trim().is_empty() {
        return Err(AppError::Validation("Route name is required".to_string()));
    }

    let route = state.repo.create_route(&request).await?;
    created(RouteCreated { route_id: route.id })
}

/// GET /api/routes - List all routes with decoded stop lists.
pub async fn list_routes(State(state): State<AppState>) -> ApiResult<Vec<Route>> {
    let routes = state.repo.list_routes().await?;
    success(routes)
}

/// GET /api/routes/:route_id/students/:student_id - Student-facing route
/// detail with the school appended as destination.
pub async fn route_detail(
    State(state): State<AppState>,
    Path((route_id, student_id)): Path<(String, String)>,
) -> ApiResult<RouteDetail> {
    let detail = state.repo.route_detail(&route_id, &student_id).await?;
    success(detail)
}
