use axum::Json;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Router, http::StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::*;
use crate::services::{attendance, auth, courses, users};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Deserialize)]
struct UsersQuery {
    role: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoursesQuery {
    lecturer_id: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/logs", get(list_logs))
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/courses", get(list_courses).post(create_course))
        .route(
            "/courses/{id}",
            get(get_course).put(update_course).delete(delete_course),
        )
        .route("/attendance/generate-qr", post(generate_qr))
        .route("/attendance/scan", post(scan))
        .route("/attendance/course/{course_id}", get(course_report))
        .route("/attendance/student/{student_id}", get(student_history))
        .fallback(not_found)
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

async fn not_found() -> AppError {
    AppError::NotFound("Invalid path".to_string())
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let user = auth::login(&state.db, req).await?;
    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        user,
    }))
}

/// The server keeps no session state, so logout is a plain acknowledgment.
async fn logout() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Logged out successfully".to_string(),
    })
}

async fn list_logs(State(state): State<AppState>) -> Result<Json<Vec<LoginLog>>, AppError> {
    let logs = auth::login_logs(&state.db).await?;
    Ok(Json(logs))
}

async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<UsersQuery>,
) -> Result<Json<Vec<User>>, AppError> {
    let users = users::list_users(&state.db, params.role).await?;
    Ok(Json(users))
}

async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<User>, AppError> {
    let user = users::get_user(&state.db, &id).await?;
    Ok(Json(user))
}

async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<NewUserRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = users::create_user(&state.db, req).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<User>, AppError> {
    let user = users::update_user(&state.db, &id, req).await?;
    Ok(Json(user))
}

async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    users::delete_user(&state.db, &id).await?;
    Ok(Json(MessageResponse {
        message: "User deleted successfully".to_string(),
    }))
}

async fn list_courses(
    State(state): State<AppState>,
    Query(params): Query<CoursesQuery>,
) -> Result<Json<Vec<Course>>, AppError> {
    let courses = courses::list_courses(&state.db, params.lecturer_id).await?;
    Ok(Json(courses))
}

async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Course>, AppError> {
    let course = courses::get_course(&state.db, &id).await?;
    Ok(Json(course))
}

async fn create_course(
    State(state): State<AppState>,
    Json(req): Json<NewCourseRequest>,
) -> Result<(StatusCode, Json<Course>), AppError> {
    let course = courses::create_course(&state.db, req).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

async fn update_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateCourseRequest>,
) -> Result<Json<Course>, AppError> {
    let course = courses::update_course(&state.db, &id, req).await?;
    Ok(Json(course))
}

async fn delete_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    courses::delete_course(&state.db, &id).await?;
    Ok(Json(MessageResponse {
        message: "Course deleted successfully".to_string(),
    }))
}

async fn generate_qr(
    State(state): State<AppState>,
    Json(req): Json<GenerateQrRequest>,
) -> Result<(StatusCode, Json<AttendanceSession>), AppError> {
    let session = attendance::generate_qr(&state.db, req).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

async fn scan(
    State(state): State<AppState>,
    Json(req): Json<ScanRequest>,
) -> Result<Json<ScanEntry>, AppError> {
    let entry = attendance::scan(&state.db, req).await?;
    Ok(Json(entry))
}

async fn course_report(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> Result<Json<Vec<SessionReport>>, AppError> {
    let report = attendance::course_report(&state.db, &course_id).await?;
    Ok(Json(report))
}

async fn student_history(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> Result<Json<Vec<StudentScanRecord>>, AppError> {
    let history = attendance::student_history(&state.db, &student_id).await?;
    Ok(Json(history))
}
