use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// The JSON document embedded in a generated QR code. The client renders
/// this string as the QR image; a scanning client posts it back verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrPayload {
    pub course_id: String,
    pub generated_at: String,
    pub expires_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSession {
    pub id: String,
    pub course_id: String,
    pub lecturer_id: String,
    pub qr_code_data: String,
    pub generated_at: String,
    pub expires_at: String,
}

/// One accepted scan, joined with the scanning student's name for reports.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ScanEntry {
    pub student_id: String,
    pub first_name: String,
    pub last_name: String,
    pub scanned_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    #[serde(flatten)]
    pub session: AttendanceSession,
    pub scanned_by: Vec<ScanEntry>,
}

/// A student's own attendance history entry.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StudentScanRecord {
    pub course_id: String,
    pub course_code: String,
    pub course_name: String,
    pub scanned_at: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateQrRequest {
    pub course_id: String,
    pub lecturer_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    pub qr_data: String,
    pub student_id: String,
}
