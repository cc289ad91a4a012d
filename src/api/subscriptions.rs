//! Subscription API endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::{created, success, ApiResult};
use crate::errors::AppError;
use crate::models::{EnrollRequest, Route, RouteSubscriber, Subscription, UnenrollQuery};
use crate::AppState;

/// POST /api/subscriptions - Enroll a student in a route.
pub async fn enroll(
    State(state): State<AppState>,
    Json(request): Json<EnrollRequest>,
) -> ApiResult<Subscription> {
    if request.student_id.trim().is_empty() || request.route_id.trim().is_empty() {
        return Err(AppError::Validation(
            "Student and route are required".to_string(),
        ));
    }

    let subscription = state
        .repo
        .enroll(&request.student_id, &request.route_id)
        .await?;
    created(subscription)
}

/// DELETE /api/subscriptions?studentId=..&routeId=.. - Cancel an enrollment.
pub async fn unenroll(
    State(state): State<AppState>,
    Query(query): Query<UnenrollQuery>,
) -> ApiResult<()> {
    state.repo.unenroll(&query.student_id, &query.route_id).await?;
    success(())
}

/// GET /api/subscriptions/by-route/:route_id - Students enrolled in a route.
pub async fn subscribers_by_route(
    State(state): State<AppState>,
    Path(route_id): Path<String>,
) -> ApiResult<Vec<RouteSubscriber>> {
    let subscribers = state.repo.subscribers_by_route(&route_id).await?;
    success(subscribers)
}

/// GET /api/subscriptions/by-student/:student_id - Routes a student is
/// actively subscribed to.
pub async fn routes_by_student(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> ApiResult<Vec<Route>> {
    let routes = state.repo.routes_by_student(&student_id).await?;
    success(routes)
}
