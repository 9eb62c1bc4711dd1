use std::str::FromStr;

use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::db::repository;
use crate::error::AppError;
use crate::models::{NewUserRequest, Role, UpdateUserRequest, User};
use crate::services::{local_now, password};

fn parse_role(raw: &str) -> Result<Role, AppError> {
    Role::from_str(raw).map_err(|_| AppError::Validation(format!("Invalid role: {raw}")))
}

pub async fn list_users(db: &SqlitePool, role: Option<String>) -> Result<Vec<User>, AppError> {
    let role = role.as_deref().map(parse_role).transpose()?;
    repository::fetch_users(db, role).await
}

pub async fn get_user(db: &SqlitePool, id: &str) -> Result<User, AppError> {
    repository::find_user_by_id(db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

pub async fn create_user(db: &SqlitePool, req: NewUserRequest) -> Result<User, AppError> {
    let required = [
        &req.id_number,
        &req.first_name,
        &req.last_name,
        &req.email,
        &req.username,
        &req.password,
    ];
    if required.iter().any(|field| field.trim().is_empty()) {
        return Err(AppError::Validation("All fields are required".to_string()));
    }
    let role = parse_role(&req.role)?;

    // Pre-check only; a concurrent create with the same username can pass
    // here and fail on the unique index instead.
    if repository::username_taken(db, &req.username, None).await? {
        return Err(AppError::Validation("Username already exists".to_string()));
    }
    if repository::email_taken(db, &req.email, None).await? {
        return Err(AppError::Validation("Email already exists".to_string()));
    }

    let hash = password::hash_password(&req.password)?;
    let user = User {
        id: Uuid::new_v4().to_string(),
        id_number: req.id_number,
        first_name: req.first_name,
        last_name: req.last_name,
        email: req.email,
        username: req.username,
        role,
        created_at: local_now().to_rfc3339(),
    };
    repository::insert_user(db, &user, &hash).await?;

    info!("created {} user {}", user.role, user.username);
    Ok(user)
}

pub async fn update_user(
    db: &SqlitePool,
    id: &str,
    req: UpdateUserRequest,
) -> Result<User, AppError> {
    let mut user = get_user(db, id).await?;

    if let Some(id_number) = req.id_number {
        user.id_number = id_number;
    }
    if let Some(first_name) = req.first_name {
        user.first_name = first_name;
    }
    if let Some(last_name) = req.last_name {
        user.last_name = last_name;
    }
    if let Some(email) = req.email {
        if repository::email_taken(db, &email, Some(id)).await? {
            return Err(AppError::Validation("Email already exists".to_string()));
        }
        user.email = email;
    }
    if let Some(username) = req.username {
        if repository::username_taken(db, &username, Some(id)).await? {
            return Err(AppError::Validation("Username already exists".to_string()));
        }
        user.username = username;
    }
    if let Some(role) = req.role {
        user.role = parse_role(&role)?;
    }

    let hash = match req.password {
        Some(ref password) if !password.is_empty() => Some(password::hash_password(password)?),
        _ => None,
    };
    repository::update_user(db, &user, hash.as_deref()).await?;
    Ok(user)
}

pub async fn delete_user(db: &SqlitePool, id: &str) -> Result<(), AppError> {
    if !repository::delete_user(db, id).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }
    info!("deleted user {}", id);
    Ok(())
}
