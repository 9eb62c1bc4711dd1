pub mod attendance;
pub mod auth;
pub mod courses;
pub mod password;
pub mod users;

use chrono::{DateTime, FixedOffset, Utc};

/// The deployment runs on a fixed UTC+8 wall clock; every timestamp the
/// service records carries that offset.
const UTC_OFFSET_SECS: i32 = 8 * 3600;

pub fn local_now() -> DateTime<FixedOffset> {
    let offset = FixedOffset::east_opt(UTC_OFFSET_SECS).expect("fixed UTC offset is in range");
    Utc::now().with_timezone(&offset)
}
