use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::db::repository;
use crate::error::AppError;
use crate::models::{LoginLog, LoginRequest, User};
use crate::services::{local_now, password};

/// Verify credentials and append a login log entry.
///
/// Unknown username, wrong password and mismatched role hint all produce
/// the same `InvalidCredentials` error so the response never discloses
/// whether the username exists.
pub async fn login(db: &SqlitePool, req: LoginRequest) -> Result<User, AppError> {
    if req.username.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::Validation(
            "Username and password are required".to_string(),
        ));
    }

    let record = match repository::find_user_by_username(db, &req.username).await? {
        Some(record) => record,
        None => return Err(AppError::InvalidCredentials),
    };

    if !password::verify_password(&req.password, &record.password_hash)? {
        return Err(AppError::InvalidCredentials);
    }

    if let Some(hint) = &req.role {
        if hint != &record.role.to_string() {
            return Err(AppError::InvalidCredentials);
        }
    }

    let log = LoginLog {
        id: Uuid::new_v4().to_string(),
        user_id: record.id.clone(),
        username: record.username.clone(),
        role: record.role.to_string(),
        login_time: local_now().to_rfc3339(),
    };
    repository::insert_login_log(db, &log).await?;

    info!("user {} logged in as {}", record.username, record.role);
    Ok(record.into())
}

pub async fn login_logs(db: &SqlitePool) -> Result<Vec<LoginLog>, AppError> {
    repository::fetch_login_logs(db).await
}
