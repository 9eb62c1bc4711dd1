use sqlx::SqlitePool;

use attendance_backend::db::repository;
use attendance_backend::models::{LoginRequest, NewUserRequest};
use attendance_backend::services::{auth, users};

async fn setup_test_db() -> SqlitePool {
    let pool = SqlitePool::connect("sqlite::memory:")
        .await
        .expect("Failed to create test db");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

fn new_user(username: &str, email: &str, role: &str) -> NewUserRequest {
    NewUserRequest {
        id_number: "2021-00042".to_string(),
        first_name: "Maria".to_string(),
        last_name: "Santos".to_string(),
        email: email.to_string(),
        username: username.to_string(),
        password: "s3cret-pw".to_string(),
        role: role.to_string(),
    }
}

#[tokio::test]
async fn test_login_returns_user_without_password_and_logs_once() {
    let pool = setup_test_db().await;

    users::create_user(&pool, new_user("msantos", "msantos@example.edu", "student"))
        .await
        .expect("create user");

    let user = auth::login(
        &pool,
        LoginRequest {
            username: "msantos".to_string(),
            password: "s3cret-pw".to_string(),
            role: None,
        },
    )
    .await
    .expect("login should succeed");

    assert_eq!(user.username, "msantos");

    // the wire shape must never carry any password material
    let json = serde_json::to_value(&user).expect("serialize user");
    let obj = json.as_object().expect("user serializes to an object");
    assert!(!obj.keys().any(|k| k.to_lowercase().contains("password")));

    let logs = repository::fetch_login_logs(&pool).await.expect("fetch logs");
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].username, "msantos");
    assert_eq!(logs[0].role, "student");
}

#[tokio::test]
async fn test_invalid_credentials_use_one_message() {
    let pool = setup_test_db().await;

    users::create_user(&pool, new_user("exists", "exists@example.edu", "student"))
        .await
        .expect("create user");

    let wrong_password = auth::login(
        &pool,
        LoginRequest {
            username: "exists".to_string(),
            password: "wrong".to_string(),
            role: None,
        },
    )
    .await
    .expect_err("wrong password must fail");

    let unknown_user = auth::login(
        &pool,
        LoginRequest {
            username: "no-such-user".to_string(),
            password: "whatever".to_string(),
            role: None,
        },
    )
    .await
    .expect_err("unknown username must fail");

    // the message must not disclose whether the username exists
    assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    assert_eq!(wrong_password.to_string(), "Invalid username or password");

    // failed attempts are not logged
    let logs = repository::fetch_login_logs(&pool).await.expect("fetch logs");
    assert!(logs.is_empty());
}

#[tokio::test]
async fn test_role_hint_mismatch_is_invalid_credentials() {
    let pool = setup_test_db().await;

    users::create_user(&pool, new_user("msantos", "msantos@example.edu", "student"))
        .await
        .expect("create user");

    let err = auth::login(
        &pool,
        LoginRequest {
            username: "msantos".to_string(),
            password: "s3cret-pw".to_string(),
            role: Some("lecturer".to_string()),
        },
    )
    .await
    .expect_err("role mismatch must fail");

    assert_eq!(err.to_string(), "Invalid username or password");
}

#[tokio::test]
async fn test_duplicate_username_rejected_on_create() {
    let pool = setup_test_db().await;

    users::create_user(&pool, new_user("taken", "first@example.edu", "student"))
        .await
        .expect("first create");

    let err = users::create_user(&pool, new_user("taken", "second@example.edu", "student"))
        .await
        .expect_err("duplicate username must be rejected");
    assert_eq!(err.to_string(), "Username already exists");

    let err = users::create_user(&pool, new_user("other", "first@example.edu", "student"))
        .await
        .expect_err("duplicate email must be rejected");
    assert_eq!(err.to_string(), "Email already exists");
}
