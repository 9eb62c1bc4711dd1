use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Append-only record of a successful login.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LoginLog {
    pub id: String,
    pub user_id: String,
    pub username: String,
    pub role: String,
    pub login_time: String,
}
