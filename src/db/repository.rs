use sqlx::SqlitePool;

use crate::error::AppError;
use crate::models::{
    AttendanceSession, Course, CourseRow, LoginLog, Role, ScanEntry, StudentScanRecord, User,
    UserWithHash,
};

const USER_COLUMNS: &str = "id, id_number, first_name, last_name, email, username, role, created_at";

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

pub async fn fetch_users(db: &SqlitePool, role: Option<Role>) -> Result<Vec<User>, AppError> {
    let users = match role {
        Some(role) => {
            sqlx::query_as::<_, User>(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE role = ? ORDER BY last_name, first_name"
            ))
            .bind(role)
            .fetch_all(db)
            .await?
        }
        None => {
            sqlx::query_as::<_, User>(&format!(
                "SELECT {USER_COLUMNS} FROM users ORDER BY last_name, first_name"
            ))
            .fetch_all(db)
            .await?
        }
    };
    Ok(users)
}

pub async fn find_user_by_id(db: &SqlitePool, id: &str) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

/// Login path only; the returned row carries the password hash.
pub async fn find_user_by_username(
    db: &SqlitePool,
    username: &str,
) -> Result<Option<UserWithHash>, AppError> {
    let user = sqlx::query_as::<_, UserWithHash>(
        "SELECT id, id_number, first_name, last_name, email, username, password_hash, role, created_at
         FROM users WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

pub async fn username_taken(
    db: &SqlitePool,
    username: &str,
    exclude_id: Option<&str>,
) -> Result<bool, AppError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM users WHERE username = ? AND id != ?",
    )
    .bind(username)
    .bind(exclude_id.unwrap_or(""))
    .fetch_one(db)
    .await?;
    Ok(count > 0)
}

pub async fn email_taken(
    db: &SqlitePool,
    email: &str,
    exclude_id: Option<&str>,
) -> Result<bool, AppError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM users WHERE email = ? AND id != ?",
    )
    .bind(email)
    .bind(exclude_id.unwrap_or(""))
    .fetch_one(db)
    .await?;
    Ok(count > 0)
}

pub async fn insert_user(
    db: &SqlitePool,
    user: &User,
    password_hash: &str,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO users (id, id_number, first_name, last_name, email, username, password_hash, role, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&user.id)
    .bind(&user.id_number)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.email)
    .bind(&user.username)
    .bind(password_hash)
    .bind(user.role)
    .bind(&user.created_at)
    .execute(db)
    .await?;
    Ok(())
}

/// Writes the full record; `password_hash` is left untouched when `None`.
pub async fn update_user(
    db: &SqlitePool,
    user: &User,
    password_hash: Option<&str>,
) -> Result<(), AppError> {
    match password_hash {
        Some(hash) => {
            sqlx::query(
                "UPDATE users SET id_number = ?, first_name = ?, last_name = ?, email = ?,
                 username = ?, password_hash = ?, role = ? WHERE id = ?",
            )
            .bind(&user.id_number)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.email)
            .bind(&user.username)
            .bind(hash)
            .bind(user.role)
            .bind(&user.id)
            .execute(db)
            .await?;
        }
        None => {
            sqlx::query(
                "UPDATE users SET id_number = ?, first_name = ?, last_name = ?, email = ?,
                 username = ?, role = ? WHERE id = ?",
            )
            .bind(&user.id_number)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.email)
            .bind(&user.username)
            .bind(user.role)
            .bind(&user.id)
            .execute(db)
            .await?;
        }
    }
    Ok(())
}

pub async fn delete_user(db: &SqlitePool, id: &str) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

// ---------------------------------------------------------------------------
// Courses
// ---------------------------------------------------------------------------

pub async fn fetch_courses(
    db: &SqlitePool,
    lecturer_id: Option<&str>,
) -> Result<Vec<Course>, AppError> {
    let rows = match lecturer_id {
        Some(lecturer_id) => {
            sqlx::query_as::<_, CourseRow>(
                "SELECT id, course_code, course_name, description, lecturer_id, schedules, students, created_at
                 FROM courses WHERE lecturer_id = ? ORDER BY course_code",
            )
            .bind(lecturer_id)
            .fetch_all(db)
            .await?
        }
        None => {
            sqlx::query_as::<_, CourseRow>(
                "SELECT id, course_code, course_name, description, lecturer_id, schedules, students, created_at
                 FROM courses ORDER BY course_code",
            )
            .fetch_all(db)
            .await?
        }
    };
    rows.into_iter().map(Course::try_from).collect()
}

pub async fn find_course_by_id(db: &SqlitePool, id: &str) -> Result<Option<Course>, AppError> {
    let row = sqlx::query_as::<_, CourseRow>(
        "SELECT id, course_code, course_name, description, lecturer_id, schedules, students, created_at
         FROM courses WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(db)
    .await?;
    row.map(Course::try_from).transpose()
}

pub async fn course_code_taken(
    db: &SqlitePool,
    course_code: &str,
    exclude_id: Option<&str>,
) -> Result<bool, AppError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM courses WHERE course_code = ? AND id != ?",
    )
    .bind(course_code)
    .bind(exclude_id.unwrap_or(""))
    .fetch_one(db)
    .await?;
    Ok(count > 0)
}

pub async fn insert_course(db: &SqlitePool, course: &Course) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO courses (id, course_code, course_name, description, lecturer_id, schedules, students, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&course.id)
    .bind(&course.course_code)
    .bind(&course.course_name)
    .bind(&course.description)
    .bind(&course.lecturer_id)
    .bind(serde_json::to_string(&course.schedules)?)
    .bind(serde_json::to_string(&course.students)?)
    .bind(&course.created_at)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn update_course(db: &SqlitePool, course: &Course) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE courses SET course_code = ?, course_name = ?, description = ?, lecturer_id = ?,
         schedules = ?, students = ? WHERE id = ?",
    )
    .bind(&course.course_code)
    .bind(&course.course_name)
    .bind(&course.description)
    .bind(&course.lecturer_id)
    .bind(serde_json::to_string(&course.schedules)?)
    .bind(serde_json::to_string(&course.students)?)
    .bind(&course.id)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn delete_course(db: &SqlitePool, id: &str) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM courses WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

// ---------------------------------------------------------------------------
// Attendance
// ---------------------------------------------------------------------------

pub async fn insert_session(db: &SqlitePool, session: &AttendanceSession) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO attendance_sessions (id, course_id, lecturer_id, qr_code_data, generated_at, expires_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&session.id)
    .bind(&session.course_id)
    .bind(&session.lecturer_id)
    .bind(&session.qr_code_data)
    .bind(&session.generated_at)
    .bind(&session.expires_at)
    .execute(db)
    .await?;
    Ok(())
}

/// A session is identified by its course and the instant the QR code was
/// generated, which is exactly what the scanned payload carries.
pub async fn find_session(
    db: &SqlitePool,
    course_id: &str,
    generated_at: &str,
) -> Result<Option<AttendanceSession>, AppError> {
    let session = sqlx::query_as::<_, AttendanceSession>(
        "SELECT id, course_id, lecturer_id, qr_code_data, generated_at, expires_at
         FROM attendance_sessions WHERE course_id = ? AND generated_at = ?",
    )
    .bind(course_id)
    .bind(generated_at)
    .fetch_optional(db)
    .await?;
    Ok(session)
}

pub async fn fetch_sessions_for_course(
    db: &SqlitePool,
    course_id: &str,
) -> Result<Vec<AttendanceSession>, AppError> {
    let sessions = sqlx::query_as::<_, AttendanceSession>(
        "SELECT id, course_id, lecturer_id, qr_code_data, generated_at, expires_at
         FROM attendance_sessions WHERE course_id = ? ORDER BY generated_at DESC",
    )
    .bind(course_id)
    .fetch_all(db)
    .await?;
    Ok(sessions)
}

pub async fn scan_exists(
    db: &SqlitePool,
    session_id: &str,
    student_id: &str,
) -> Result<bool, AppError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM attendance_scans WHERE session_id = ? AND student_id = ?",
    )
    .bind(session_id)
    .bind(student_id)
    .fetch_one(db)
    .await?;
    Ok(count > 0)
}

/// The (session_id, student_id) primary key is the authoritative duplicate
/// guard; callers that lost the pre-check race see the constraint violation
/// as a plain database error.
pub async fn insert_scan(
    db: &SqlitePool,
    session_id: &str,
    student_id: &str,
    scanned_at: &str,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO attendance_scans (session_id, student_id, scanned_at) VALUES (?, ?, ?)",
    )
    .bind(session_id)
    .bind(student_id)
    .bind(scanned_at)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn fetch_scans(db: &SqlitePool, session_id: &str) -> Result<Vec<ScanEntry>, AppError> {
    let scans = sqlx::query_as::<_, ScanEntry>(
        "SELECT s.student_id, u.first_name, u.last_name, s.scanned_at
         FROM attendance_scans s
         JOIN users u ON u.id = s.student_id
         WHERE s.session_id = ?
         ORDER BY s.scanned_at",
    )
    .bind(session_id)
    .fetch_all(db)
    .await?;
    Ok(scans)
}

pub async fn fetch_student_history(
    db: &SqlitePool,
    student_id: &str,
) -> Result<Vec<StudentScanRecord>, AppError> {
    let records = sqlx::query_as::<_, StudentScanRecord>(
        "SELECT c.id AS course_id, c.course_code, c.course_name, s.scanned_at
         FROM attendance_scans s
         JOIN attendance_sessions a ON a.id = s.session_id
         JOIN courses c ON c.id = a.course_id
         WHERE s.student_id = ?
         ORDER BY s.scanned_at DESC",
    )
    .bind(student_id)
    .fetch_all(db)
    .await?;
    Ok(records)
}

// ---------------------------------------------------------------------------
// Login logs
// ---------------------------------------------------------------------------

pub async fn insert_login_log(db: &SqlitePool, log: &LoginLog) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO login_logs (id, user_id, username, role, login_time) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&log.id)
    .bind(&log.user_id)
    .bind(&log.username)
    .bind(&log.role)
    .bind(&log.login_time)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn fetch_login_logs(db: &SqlitePool) -> Result<Vec<LoginLog>, AppError> {
    let logs = sqlx::query_as::<_, LoginLog>(
        "SELECT id, user_id, username, role, login_time FROM login_logs ORDER BY login_time DESC",
    )
    .fetch_all(db)
    .await?;
    Ok(logs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Schedule;
    use chrono::Utc;
    use uuid::Uuid;

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

    fn make_user(username: &str, email: &str, role: Role) -> User {
        User {
            id: Uuid::new_v4().to_string(),
            id_number: "2021-00001".to_string(),
            first_name: "Juan".to_string(),
            last_name: "Dela Cruz".to_string(),
            email: email.to_string(),
            username: username.to_string(),
            role,
            created_at: Utc::now().to_rfc3339(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_fetch_user() {
        let pool = setup_test_db().await;

        let user = make_user("jdelacruz", "jdc@example.edu", Role::Student);
        insert_user(&pool, &user, "not-a-real-hash")
            .await
            .expect("Failed to insert user");

        let fetched = find_user_by_id(&pool, &user.id)
            .await
            .expect("Failed to fetch user")
            .expect("User not found");
        assert_eq!(fetched.username, "jdelacruz");
        assert_eq!(fetched.role, Role::Student);

        let students = fetch_users(&pool, Some(Role::Student))
            .await
            .expect("Failed to fetch students");
        assert_eq!(students.len(), 1);

        let lecturers = fetch_users(&pool, Some(Role::Lecturer))
            .await
            .expect("Failed to fetch lecturers");
        assert!(lecturers.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected_by_index() {
        let pool = setup_test_db().await;

        let first = make_user("same", "first@example.edu", Role::Student);
        insert_user(&pool, &first, "hash").await.expect("first insert");

        let second = make_user("same", "second@example.edu", Role::Student);
        let result = insert_user(&pool, &second, "hash").await;
        assert!(result.is_err(), "unique index must reject duplicate username");
    }

    #[tokio::test]
    async fn test_uniqueness_prechecks() {
        let pool = setup_test_db().await;

        let user = make_user("taken", "taken@example.edu", Role::Admin);
        insert_user(&pool, &user, "hash").await.expect("insert");

        assert!(username_taken(&pool, "taken", None).await.unwrap());
        assert!(!username_taken(&pool, "free", None).await.unwrap());
        // the record itself is excluded when updating
        assert!(!username_taken(&pool, "taken", Some(&user.id)).await.unwrap());

        assert!(email_taken(&pool, "taken@example.edu", None).await.unwrap());
        assert!(!email_taken(&pool, "taken@example.edu", Some(&user.id)).await.unwrap());
    }

    #[tokio::test]
    async fn test_course_roundtrip_with_json_columns() {
        let pool = setup_test_db().await;

        let course = Course {
            id: Uuid::new_v4().to_string(),
            course_code: "CS101".to_string(),
            course_name: "Intro to Computing".to_string(),
            description: "Fundamentals".to_string(),
            lecturer_id: "lecturer-1".to_string(),
            schedules: vec![Schedule {
                days: vec!["Monday".to_string(), "Thursday".to_string()],
                start_time: "09:00".to_string(),
                end_time: "10:30".to_string(),
            }],
            students: vec!["student-1".to_string(), "student-2".to_string()],
            created_at: Utc::now().to_rfc3339(),
        };
        insert_course(&pool, &course).await.expect("insert course");

        let fetched = find_course_by_id(&pool, &course.id)
            .await
            .expect("fetch course")
            .expect("course not found");
        assert_eq!(fetched.course_code, "CS101");
        assert_eq!(fetched.schedules.len(), 1);
        assert_eq!(fetched.schedules[0].days, vec!["Monday", "Thursday"]);
        assert_eq!(fetched.students.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_course() {
        let pool = setup_test_db().await;

        let course = Course {
            id: Uuid::new_v4().to_string(),
            course_code: "CS102".to_string(),
            course_name: "Programming 1".to_string(),
            description: String::new(),
            lecturer_id: "lecturer-1".to_string(),
            schedules: vec![],
            students: vec![],
            created_at: Utc::now().to_rfc3339(),
        };
        insert_course(&pool, &course).await.expect("insert course");

        assert!(delete_course(&pool, &course.id).await.expect("delete"));
        assert!(find_course_by_id(&pool, &course.id).await.expect("fetch").is_none());

        // second delete finds nothing
        assert!(!delete_course(&pool, &course.id).await.expect("delete again"));
    }

    #[tokio::test]
    async fn test_scan_unique_index_is_authoritative() {
        let pool = setup_test_db().await;

        let session = AttendanceSession {
            id: Uuid::new_v4().to_string(),
            course_id: "course-1".to_string(),
            lecturer_id: "lecturer-1".to_string(),
            qr_code_data: "{}".to_string(),
            generated_at: "2026-02-02T10:00:00+08:00".to_string(),
            expires_at: "2026-02-02T11:00:00+08:00".to_string(),
        };
        insert_session(&pool, &session).await.expect("insert session");

        insert_scan(&pool, &session.id, "student-1", "2026-02-02T10:05:00+08:00")
            .await
            .expect("first scan");

        // a duplicate that slipped past the membership pre-check lands here
        let dup = insert_scan(&pool, &session.id, "student-1", "2026-02-02T10:06:00+08:00").await;
        assert!(dup.is_err(), "primary key must reject the second scan");

        // a different student is still fine
        insert_scan(&pool, &session.id, "student-2", "2026-02-02T10:07:00+08:00")
            .await
            .expect("other student scan");
    }

    #[tokio::test]
    async fn test_find_session_by_course_and_generation_time() {
        let pool = setup_test_db().await;

        let session = AttendanceSession {
            id: Uuid::new_v4().to_string(),
            course_id: "course-1".to_string(),
            lecturer_id: "lecturer-1".to_string(),
            qr_code_data: "{}".to_string(),
            generated_at: "2026-02-02T10:00:00+08:00".to_string(),
            expires_at: "2026-02-02T11:00:00+08:00".to_string(),
        };
        insert_session(&pool, &session).await.expect("insert session");

        let found = find_session(&pool, "course-1", "2026-02-02T10:00:00+08:00")
            .await
            .expect("lookup")
            .expect("session not found");
        assert_eq!(found.id, session.id);

        let missing = find_session(&pool, "course-1", "2026-02-02T12:00:00+08:00")
            .await
            .expect("lookup");
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_login_logs_newest_first() {
        let pool = setup_test_db().await;

        for (i, t) in ["2026-02-02T08:00:00+08:00", "2026-02-02T09:00:00+08:00"]
            .iter()
            .enumerate()
        {
            let log = LoginLog {
                id: format!("log-{i}"),
                user_id: "user-1".to_string(),
                username: "jdelacruz".to_string(),
                role: "student".to_string(),
                login_time: t.to_string(),
            };
            insert_login_log(&pool, &log).await.expect("insert log");
        }

        let logs = fetch_login_logs(&pool).await.expect("fetch logs");
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].login_time, "2026-02-02T09:00:00+08:00");
    }
}
