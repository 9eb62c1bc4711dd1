//! Attendance session lifecycle: a lecturer generates a time-windowed QR
//! payload for a course, students redeem it once each while it is active.

use chrono::{DateTime, Duration};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::db::repository;
use crate::error::AppError;
use crate::models::{
    AttendanceSession, GenerateQrRequest, QrPayload, ScanEntry, ScanRequest, SessionReport,
    StudentScanRecord,
};
use crate::services::local_now;

/// A generated code stays redeemable for one hour.
const QR_VALIDITY_HOURS: i64 = 1;

pub async fn generate_qr(
    db: &SqlitePool,
    req: GenerateQrRequest,
) -> Result<AttendanceSession, AppError> {
    let course = repository::find_course_by_id(db, &req.course_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Course not found".to_string()))?;
    if course.lecturer_id != req.lecturer_id {
        return Err(AppError::Forbidden(
            "Only the assigned lecturer can generate attendance codes".to_string(),
        ));
    }

    let generated_at = local_now();
    let expires_at = generated_at + Duration::hours(QR_VALIDITY_HOURS);

    let payload = QrPayload {
        course_id: course.id.clone(),
        generated_at: generated_at.to_rfc3339(),
        expires_at: expires_at.to_rfc3339(),
    };
    let session = AttendanceSession {
        id: Uuid::new_v4().to_string(),
        course_id: course.id,
        lecturer_id: req.lecturer_id,
        qr_code_data: serde_json::to_string(&payload)?,
        generated_at: payload.generated_at.clone(),
        expires_at: payload.expires_at.clone(),
    };
    repository::insert_session(db, &session).await?;

    info!(
        "generated attendance session {} for course {}",
        session.id, course.course_code
    );
    Ok(session)
}

pub async fn scan(db: &SqlitePool, req: ScanRequest) -> Result<ScanEntry, AppError> {
    let payload: QrPayload = serde_json::from_str(&req.qr_data)
        .map_err(|_| AppError::Validation("Invalid QR code".to_string()))?;

    // The expiry embedded in the payload is what gets checked, not the
    // stored session row.
    let expires_at = DateTime::parse_from_rfc3339(&payload.expires_at)
        .map_err(|_| AppError::Validation("Invalid QR code".to_string()))?;
    if local_now() >= expires_at {
        return Err(AppError::Validation("QR code has expired".to_string()));
    }

    let session = repository::find_session(db, &payload.course_id, &payload.generated_at)
        .await?
        .ok_or_else(|| AppError::NotFound("Attendance session not found".to_string()))?;

    let student = repository::find_user_by_id(db, &req.student_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Student not found".to_string()))?;

    let course = repository::find_course_by_id(db, &session.course_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Course not found".to_string()))?;
    if !course.students.contains(&student.id) {
        return Err(AppError::Forbidden(
            "Student is not enrolled in this course".to_string(),
        ));
    }

    if repository::scan_exists(db, &session.id, &student.id).await? {
        return Err(AppError::Validation(
            "Attendance already recorded for this session".to_string(),
        ));
    }

    // The membership check above is a best-effort fast path and is not
    // atomic with this insert. A duplicate submission that races it is
    // rejected by the primary key instead and surfaces as a generic
    // database error, not the message above.
    let scanned_at = local_now().to_rfc3339();
    repository::insert_scan(db, &session.id, &student.id, &scanned_at).await?;

    info!(
        "recorded scan by student {} for session {}",
        student.id, session.id
    );
    Ok(ScanEntry {
        student_id: student.id,
        first_name: student.first_name,
        last_name: student.last_name,
        scanned_at,
    })
}

/// Every session ever generated for the course, newest first, with the
/// students who scanned each one.
pub async fn course_report(
    db: &SqlitePool,
    course_id: &str,
) -> Result<Vec<SessionReport>, AppError> {
    if repository::find_course_by_id(db, course_id).await?.is_none() {
        return Err(AppError::NotFound("Course not found".to_string()));
    }

    let sessions = repository::fetch_sessions_for_course(db, course_id).await?;
    let mut reports = Vec::with_capacity(sessions.len());
    for session in sessions {
        let scanned_by = repository::fetch_scans(db, &session.id).await?;
        reports.push(SessionReport {
            session,
            scanned_by,
        });
    }
    Ok(reports)
}

pub async fn student_history(
    db: &SqlitePool,
    student_id: &str,
) -> Result<Vec<StudentScanRecord>, AppError> {
    if repository::find_user_by_id(db, student_id).await?.is_none() {
        return Err(AppError::NotFound("Student not found".to_string()));
    }
    repository::fetch_student_history(db, student_id).await
}
