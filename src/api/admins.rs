//! School-administration API endpoints.

use axum::{extract::State, Json};
use serde::Serialize;

use super::{created, success, ApiResult};
use crate::auth;
use crate::errors::AppError;
use crate::models::{CreateAdminRequest, LoginRequest, SchoolAdmin};
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminCreated {
    pub admin_id: String,
}

/// POST /api/admins - Register a school administration.
pub async fn create_admin(
    State(state): State<AppState>,
    Json(request): Json<CreateAdminRequest>,
) -> ApiResult<AdminCreated> {
    if request.school_name.trim().is_empty() {
        return Err(AppError::Validation("School name is required".to_string()));
    }
    if request.manager_name.trim().is_empty() {
        return Err(AppError::Validation("Manager name is required".to_string()));
    }
    if request.email.trim().is_empty() {
        return Err(AppError::Validation("Email is required".to_string()));
    }
    if request.password.trim().is_empty() {
        return Err(AppError::Validation("Password is required".to_string()));
    }

    let password_hash = auth::hash_password(&request.password)?;
    let admin = state.repo.create_admin(&request, &password_hash).await?;
    created(AdminCreated { admin_id: admin.id })
}

/// GET /api/admins - List all school administrations.
pub async fn list_admins(State(state): State<AppState>) -> ApiResult<Vec<SchoolAdmin>> {
    let admins = state.repo.list_admins().await?;
    success(admins)
}

/// POST /api/admins/login - Verify credentials and return the admin record.
pub async fn admin_login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<SchoolAdmin> {
    if request.email.trim().is_empty() || request.password.trim().is_empty() {
        return Err(AppError::Validation(
            "Email and password are required".to_string(),
        ));
    }

    match state.repo.admin_by_email(&request.email).await? {
        Some((admin, hash)) if auth::verify_password(&request.password, &hash) => success(admin),
        _ => Err(AppError::Unauthorized(
            "Invalid email or password".to_string(),
        )),
    }
}
