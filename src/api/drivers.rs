//! Driver API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use super::{created, success, ApiResult};
use crate::auth;
use crate::errors::AppError;
use crate::models::{CreateDriverRequest, Driver, LoginRequest, UpdateDriverRequest};
use crate::AppState;

/// Onboarding fallback when registration omits a password; drivers are
/// expected to change it on first login.
const DEFAULT_DRIVER_PASSWORD: &str = "123456";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverCreated {
    pub driver_id: String,
}

/// POST /api/drivers - Register a new driver.
pub async fn create_driver(
    State(state): State<AppState>,
    Json(request): Json<CreateDriverRequest>,
) -> ApiResult<DriverCreated> {
    if request.full_name.trim().is_empty() {
        return Err(AppError::Validation("Full name is required".to_string()));
    }
    if request.email.trim().is_empty() {
        return Err(AppError::Validation("Email is required".to_string()));
    }

    let password = request.password.as_deref().unwrap_or(DEFAULT_DRIVER_PASSWORD);
    let password_hash = auth::hash_password(password)?;
    let driver = state.repo.create_driver(&request, &password_hash).await?;
    created(DriverCreated {
        driver_id: driver.id,
    })
}

/// GET /api/drivers - List all drivers.
pub async fn list_drivers(State(state): State<AppState>) -> ApiResult<Vec<Driver>> {
    let drivers = state.repo.list_drivers().await?;
    success(drivers)
}

/// PUT /api/drivers/:id - Partially update a driver.
pub async fn update_driver(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateDriverRequest>,
) -> ApiResult<Driver> {
    let new_hash = match &request.password {
        Some(password) if !password.trim().is_empty() => Some(auth::hash_password(password)?),
        _ => None,
    };

    let driver = state
        .repo
        .update_driver(&id, &request, new_hash.as_deref())
        .await?;
    success(driver)
}

/// POST /api/drivers/login - Verify credentials and return the driver record.
pub async fn driver_login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Driver> {
    if request.email.trim().is_empty() || request.password.trim().is_empty() {
        return Err(AppError::Validation(
            "Email and password are required".to_string(),
        ));
    }

    match state.repo.driver_by_email(&request.email).await? {
        Some((driver, hash)) if auth::verify_password(&request.password, &hash) => success(driver),
        _ => Err(AppError::Unauthorized(
            "Invalid email or password".to_string(),
        )),
    }
}
