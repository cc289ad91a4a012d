//! Student API endpoints.

use axum::{extract::State, Json};
use serde::Serialize;

use super::{created, success, ApiResult};
use crate::auth;
use crate::errors::AppError;
use crate::models::{CreateStudentRequest, LoginRequest, Student};
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentCreated {
    pub student_id: String,
}

/// POST /api/students - Register a new student.
pub async fn create_student(
    State(state): State<AppState>,
    Json(request): Json<CreateStudentRequest>,
) -> ApiResult<StudentCreated> {
    let missing = request.missing_fields();
    if !missing.is_empty() {
        return Err(AppError::Validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    }

    let password_hash = auth::hash_password(&request.password)?;
    let student = state.repo.create_student(&request, &password_hash).await?;
    created(StudentCreated {
        student_id: student.id,
    })
}

/// GET /api/students - List all students.
pub async fn list_students(State(state): State<AppState>) -> ApiResult<Vec<Student>> {
    let students = state.repo.list_students().await?;
    success(students)
}

/// POST /api/students/login - Verify credentials and return the student
/// record, never the password hash.
pub async fn student_login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Student> {
    if request.email.trim().is_empty() || request.password.trim().is_empty() {
        return Err(AppError::Validation(
            "Email and password are required".to_string(),
        ));
    }

    match state.repo.student_by_email(&request.email).await? {
        Some((student, hash)) if auth::verify_password(&request.password, &hash) => {
            success(student)
        }
        _ => Err(AppError::Unauthorized(
            "Invalid email or password".to_string(),
        )),
    }
}
