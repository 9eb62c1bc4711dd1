use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::db::repository;
use crate::error::AppError;
use crate::models::{Course, NewCourseRequest, Role, UpdateCourseRequest};
use crate::services::local_now;

pub async fn list_courses(
    db: &SqlitePool,
    lecturer_id: Option<String>,
) -> Result<Vec<Course>, AppError> {
    repository::fetch_courses(db, lecturer_id.as_deref()).await
}

pub async fn get_course(db: &SqlitePool, id: &str) -> Result<Course, AppError> {
    repository::find_course_by_id(db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Course not found".to_string()))
}

async fn ensure_lecturer(db: &SqlitePool, lecturer_id: &str) -> Result<(), AppError> {
    let lecturer = repository::find_user_by_id(db, lecturer_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Lecturer not found".to_string()))?;
    if lecturer.role != Role::Lecturer {
        return Err(AppError::Validation(
            "Assigned user is not a lecturer".to_string(),
        ));
    }
    Ok(())
}

async fn ensure_students(db: &SqlitePool, student_ids: &[String]) -> Result<(), AppError> {
    for id in student_ids {
        let student = repository::find_user_by_id(db, id)
            .await?
            .ok_or_else(|| AppError::Validation(format!("Unknown student id: {id}")))?;
        if student.role != Role::Student {
            return Err(AppError::Validation(format!(
                "User {id} is not a student"
            )));
        }
    }
    Ok(())
}

pub async fn create_course(db: &SqlitePool, req: NewCourseRequest) -> Result<Course, AppError> {
    if req.course_code.trim().is_empty() || req.course_name.trim().is_empty() {
        return Err(AppError::Validation(
            "Course code and name are required".to_string(),
        ));
    }

    // Pre-check only; the unique index on course_code is the backstop.
    if repository::course_code_taken(db, &req.course_code, None).await? {
        return Err(AppError::Validation(
            "Course code already exists".to_string(),
        ));
    }
    ensure_lecturer(db, &req.lecturer_id).await?;

    let course = Course {
        id: Uuid::new_v4().to_string(),
        course_code: req.course_code,
        course_name: req.course_name,
        description: req.description,
        lecturer_id: req.lecturer_id,
        schedules: req.schedules,
        students: vec![],
        created_at: local_now().to_rfc3339(),
    };
    repository::insert_course(db, &course).await?;

    info!("created course {}", course.course_code);
    Ok(course)
}

pub async fn update_course(
    db: &SqlitePool,
    id: &str,
    req: UpdateCourseRequest,
) -> Result<Course, AppError> {
    let mut course = get_course(db, id).await?;

    if let Some(course_code) = req.course_code {
        if repository::course_code_taken(db, &course_code, Some(id)).await? {
            return Err(AppError::Validation(
                "Course code already exists".to_string(),
            ));
        }
        course.course_code = course_code;
    }
    if let Some(course_name) = req.course_name {
        course.course_name = course_name;
    }
    if let Some(description) = req.description {
        course.description = description;
    }
    if let Some(lecturer_id) = req.lecturer_id {
        ensure_lecturer(db, &lecturer_id).await?;
        course.lecturer_id = lecturer_id;
    }
    if let Some(schedules) = req.schedules {
        course.schedules = schedules;
    }
    if let Some(students) = req.students {
        ensure_students(db, &students).await?;
        course.students = students;
    }

    repository::update_course(db, &course).await?;
    Ok(course)
}

pub async fn delete_course(db: &SqlitePool, id: &str) -> Result<(), AppError> {
    if !repository::delete_course(db, id).await? {
        return Err(AppError::NotFound("Course not found".to_string()));
    }
    info!("deleted course {}", id);
    Ok(())
}
