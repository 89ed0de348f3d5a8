use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::info;

use super::{parse_id, upload_image};
use crate::{
    AppState,
    error::{ApiResult, AppError},
    forms::{FormFields, FormPayload, Violations},
    models::{ApiResponse, Course, CourseChanges, CourseLevel, NewCourse},
    uploads::UploadResolver,
};

fn present(uploads: &UploadResolver, mut course: Course) -> Course {
    course.image_url = uploads.normalize_opt(course.image_url);
    course
}

fn not_found() -> AppError {
    AppError::NotFound("Course not found".to_string())
}

fn level(fields: &FormFields, creating: bool, v: &mut Violations) -> Option<CourseLevel> {
    match fields.text("level").filter(|l| !l.is_empty()) {
        Some(raw) => match raw.parse::<CourseLevel>() {
            Ok(level) => Some(level),
            Err(_) => {
                v.push("level", "level must be one of beginner, intermediate, advanced");
                None
            }
        },
        None if creating || fields.contains("level") => {
            v.push("level", "level is required");
            None
        }
        None => None,
    }
}

fn price(fields: &FormFields, creating: bool, v: &mut Violations) -> Option<f64> {
    match fields.number("price") {
        Ok(Some(price)) if price < 0.0 => {
            v.push("price", "price cannot be negative");
            None
        }
        Ok(Some(price)) => Some(price),
        Ok(None) if creating || fields.contains("price") => {
            v.push("price", "price is required");
            None
        }
        Ok(None) => None,
        Err(e) => {
            v.add(e);
            None
        }
    }
}

fn new_course(fields: &FormFields) -> ApiResult<NewCourse> {
    let mut v = Violations::new();
    let title = v.required(fields, "title");
    let description = v.required(fields, "description");
    let category = v.required(fields, "category");
    let instructor = v.required(fields, "instructor");
    let duration = v.required(fields, "duration");
    let level = level(fields, true, &mut v);
    let price = price(fields, true, &mut v);

    let (Some(level), Some(price)) = (level, price) else {
        return Err(v.into_error());
    };
    v.into_result()?;

    Ok(NewCourse {
        title,
        description,
        category,
        instructor,
        duration,
        level,
        price,
        image_url: fields.optional_text("image_url").flatten(),
        learning_outcomes: fields
            .list("learning_outcomes")
            .or_empty()
            .unwrap_or_default(),
    })
}

fn course_changes(fields: &FormFields) -> ApiResult<CourseChanges> {
    let mut v = Violations::new();
    let changes = CourseChanges {
        title: v.non_blank(fields, "title"),
        description: v.non_blank(fields, "description"),
        category: v.non_blank(fields, "category"),
        instructor: v.non_blank(fields, "instructor"),
        duration: v.non_blank(fields, "duration"),
        level: level(fields, false, &mut v),
        price: price(fields, false, &mut v),
        image_url: fields.optional_text("image_url"),
        learning_outcomes: fields.list("learning_outcomes").or_empty(),
    };
    v.into_result()?;
    Ok(changes)
}

/// list_courses
///
/// [Public Route] Newest first.
#[utoipa::path(
    get,
    path = "/courses",
    tag = "courses",
    responses((status = 200, description = "All courses", body = [Course]))
)]
pub async fn list_courses(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<Course>>>> {
    let courses = state.repo.list_courses().await?;
    Ok(Json(ApiResponse::data(
        courses
            .into_iter()
            .map(|c| present(&state.uploads, c))
            .collect(),
    )))
}

/// get_course
#[utoipa::path(
    get,
    path = "/courses/{id}",
    tag = "courses",
    params(("id" = String, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Found", body = Course),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<Course>>> {
    let id = parse_id(&id)?;
    let course = state.repo.get_course(id).await?.ok_or_else(not_found)?;
    Ok(Json(ApiResponse::data(present(&state.uploads, course))))
}

/// create_course
#[utoipa::path(
    post,
    path = "/courses",
    tag = "courses",
    responses(
        (status = 201, description = "Created", body = Course),
        (status = 400, description = "Validation failed")
    )
)]
pub async fn create_course(
    State(state): State<AppState>,
    FormPayload { fields, image }: FormPayload,
) -> ApiResult<(StatusCode, Json<ApiResponse<Course>>)> {
    let mut course = new_course(&fields)?;

    if let Some(url) = upload_image(state.storage.as_ref(), &state.uploads, image).await? {
        course.image_url = Some(url);
    }

    let course = state.repo.create_course(course).await?;
    info!(course_id = %course.id, "course created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            present(&state.uploads, course),
            "Course created successfully",
        )),
    ))
}

/// update_course
#[utoipa::path(
    put,
    path = "/courses/{id}",
    tag = "courses",
    params(("id" = String, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Updated", body = Course),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
    FormPayload { fields, image }: FormPayload,
) -> ApiResult<Json<ApiResponse<Course>>> {
    let id = parse_id(&id)?;
    let mut changes = course_changes(&fields)?;

    if image.is_some() {
        state.repo.get_course(id).await?.ok_or_else(not_found)?;
        if let Some(url) = upload_image(state.storage.as_ref(), &state.uploads, image).await? {
            changes.image_url = Some(Some(url));
        }
    }

    let course = state
        .repo
        .update_course(id, changes)
        .await?
        .ok_or_else(not_found)?;
    info!(course_id = %course.id, "course updated");

    Ok(Json(ApiResponse::with_message(
        present(&state.uploads, course),
        "Course updated successfully",
    )))
}

/// delete_course
///
/// [Admin Route] Permanent.
#[utoipa::path(
    delete,
    path = "/courses/{id}",
    tag = "courses",
    params(("id" = String, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let id = parse_id(&id)?;
    if !state.repo.delete_course(id).await? {
        return Err(not_found());
    }
    info!(course_id = %id, "course deleted");
    Ok(Json(ApiResponse::<()>::message("Course deleted successfully")))
}
