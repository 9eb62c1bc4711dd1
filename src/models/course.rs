use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;

/// One weekly meeting slot of a course.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub days: Vec<String>,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub course_code: String,
    pub course_name: String,
    pub description: String,
    pub lecturer_id: String,
    pub schedules: Vec<Schedule>,
    /// Ids of enrolled students.
    pub students: Vec<String>,
    pub created_at: String,
}

/// Raw row shape; `schedules` and `students` are JSON text columns.
#[derive(Debug, Clone, FromRow)]
pub struct CourseRow {
    pub id: String,
    pub course_code: String,
    pub course_name: String,
    pub description: String,
    pub lecturer_id: String,
    pub schedules: String,
    pub students: String,
    pub created_at: String,
}

impl TryFrom<CourseRow> for Course {
    type Error = AppError;

    fn try_from(row: CourseRow) -> Result<Self, Self::Error> {
        Ok(Course {
            id: row.id,
            course_code: row.course_code,
            course_name: row.course_name,
            description: row.description,
            lecturer_id: row.lecturer_id,
            schedules: serde_json::from_str(&row.schedules)?,
            students: serde_json::from_str(&row.students)?,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCourseRequest {
    pub course_code: String,
    pub course_name: String,
    #[serde(default)]
    pub description: String,
    pub lecturer_id: String,
    #[serde(default)]
    pub schedules: Vec<Schedule>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCourseRequest {
    pub course_code: Option<String>,
    pub course_name: Option<String>,
    pub description: Option<String>,
    pub lecturer_id: Option<String>,
    pub schedules: Option<Vec<Schedule>>,
    pub students: Option<Vec<String>>,
}
