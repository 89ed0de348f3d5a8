use std::collections::HashSet;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::NaiveDate;
use tracing::info;

use super::{contributor_list, ensure_users_exist, parse_id, upload_image};
use crate::{
    AppState,
    error::{ApiResult, AppError},
    forms::{FormFields, FormPayload, ListField, Violations},
    models::{Achievement, AchievementChanges, ApiResponse, NewAchievement},
    uploads::UploadResolver,
};

/// Upper bound on the number of category tags per achievement.
pub const MAX_CATEGORIES: usize = 3;

fn present(uploads: &UploadResolver, mut achievement: Achievement) -> Achievement {
    achievement.image_url = uploads.normalize_opt(achievement.image_url);
    achievement
}

fn not_found() -> AppError {
    AppError::NotFound("Achievement not found".to_string())
}

/// Categories are required, so unlike the decorative lists a list that cannot
/// be decoded fails validation.
fn categories(fields: &FormFields, creating: bool, v: &mut Violations) -> Option<Vec<String>> {
    match fields.list("categories") {
        ListField::Absent => {
            if creating {
                v.push("categories", "categories is required");
            }
            None
        }
        ListField::Malformed => {
            v.push("categories", "categories must be a list of strings");
            None
        }
        ListField::Parsed(mut items) => {
            let mut seen = HashSet::new();
            items.retain(|item| seen.insert(item.clone()));
            if items.is_empty() {
                v.push("categories", "At least one category is required");
                None
            } else if items.len() > MAX_CATEGORIES {
                v.push(
                    "categories",
                    format!("No more than {MAX_CATEGORIES} categories are allowed"),
                );
                None
            } else {
                Some(items)
            }
        }
    }
}

fn required_date(fields: &FormFields, v: &mut Violations) -> Option<NaiveDate> {
    match fields.date("date") {
        Ok(Some(date)) => Some(date),
        Ok(None) => {
            v.push("date", "date is required");
            None
        }
        Err(e) => {
            v.add(e);
            None
        }
    }
}

fn new_achievement(fields: &FormFields) -> ApiResult<NewAchievement> {
    let mut v = Violations::new();
    let title = v.required(fields, "title");
    let description = v.required(fields, "description");
    let categories = categories(fields, true, &mut v);
    let competition = v.required(fields, "competition");
    let date = required_date(fields, &mut v);
    let participants = contributor_list(fields, "participants", &mut v).unwrap_or_default();

    let (Some(categories), Some(date)) = (categories, date) else {
        return Err(v.into_error());
    };
    v.into_result()?;

    Ok(NewAchievement {
        title,
        description,
        categories,
        participants,
        competition,
        date,
        image_url: fields.optional_text("image_url").flatten(),
        social_post_url: fields.optional_text("social_post_url").flatten(),
    })
}

fn achievement_changes(fields: &FormFields) -> ApiResult<AchievementChanges> {
    let mut v = Violations::new();
    let changes = AchievementChanges {
        title: v.non_blank(fields, "title"),
        description: v.non_blank(fields, "description"),
        categories: categories(fields, false, &mut v),
        participants: contributor_list(fields, "participants", &mut v),
        competition: v.non_blank(fields, "competition"),
        date: if fields.contains("date") {
            required_date(fields, &mut v)
        } else {
            None
        },
        image_url: fields.optional_text("image_url"),
        social_post_url: fields.optional_text("social_post_url"),
    };
    v.into_result()?;
    Ok(changes)
}

/// list_achievements
///
/// [Public Route] Most recent competition date first.
#[utoipa::path(
    get,
    path = "/achievements",
    tag = "achievements",
    responses((status = 200, description = "All achievements", body = [Achievement]))
)]
pub async fn list_achievements(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<Achievement>>>> {
    let achievements = state.repo.list_achievements().await?;
    Ok(Json(ApiResponse::data(
        achievements
            .into_iter()
            .map(|a| present(&state.uploads, a))
            .collect(),
    )))
}

/// get_achievement
#[utoipa::path(
    get,
    path = "/achievements/{id}",
    tag = "achievements",
    params(("id" = String, Path, description = "Achievement ID")),
    responses(
        (status = 200, description = "Found", body = Achievement),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_achievement(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<Achievement>>> {
    let id = parse_id(&id)?;
    let achievement = state
        .repo
        .get_achievement(id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(ApiResponse::data(present(&state.uploads, achievement))))
}

/// create_achievement
#[utoipa::path(
    post,
    path = "/achievements",
    tag = "achievements",
    responses(
        (status = 201, description = "Created", body = Achievement),
        (status = 400, description = "Validation failed")
    )
)]
pub async fn create_achievement(
    State(state): State<AppState>,
    FormPayload { fields, image }: FormPayload,
) -> ApiResult<(StatusCode, Json<ApiResponse<Achievement>>)> {
    let mut achievement = new_achievement(&fields)?;
    ensure_users_exist(state.repo.as_ref(), "participants", &achievement.participants).await?;

    if let Some(url) = upload_image(state.storage.as_ref(), &state.uploads, image).await? {
        achievement.image_url = Some(url);
    }

    let achievement = state.repo.create_achievement(achievement).await?;
    info!(achievement_id = %achievement.id, "achievement created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            present(&state.uploads, achievement),
            "Achievement created successfully",
        )),
    ))
}

/// update_achievement
#[utoipa::path(
    put,
    path = "/achievements/{id}",
    tag = "achievements",
    params(("id" = String, Path, description = "Achievement ID")),
    responses(
        (status = 200, description = "Updated", body = Achievement),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_achievement(
    State(state): State<AppState>,
    Path(id): Path<String>,
    FormPayload { fields, image }: FormPayload,
) -> ApiResult<Json<ApiResponse<Achievement>>> {
    let id = parse_id(&id)?;
    let mut changes = achievement_changes(&fields)?;
    if let Some(participants) = &changes.participants {
        ensure_users_exist(state.repo.as_ref(), "participants", participants).await?;
    }

    if image.is_some() {
        state.repo.get_achievement(id).await?.ok_or_else(not_found)?;
        if let Some(url) = upload_image(state.storage.as_ref(), &state.uploads, image).await? {
            changes.image_url = Some(Some(url));
        }
    }

    let achievement = state
        .repo
        .update_achievement(id, changes)
        .await?
        .ok_or_else(not_found)?;
    info!(achievement_id = %achievement.id, "achievement updated");

    Ok(Json(ApiResponse::with_message(
        present(&state.uploads, achievement),
        "Achievement updated successfully",
    )))
}

/// delete_achievement
#[utoipa::path(
    delete,
    path = "/achievements/{id}",
    tag = "achievements",
    params(("id" = String, Path, description = "Achievement ID")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_achievement(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let id = parse_id(&id)?;
    if !state.repo.delete_achievement(id).await? {
        return Err(not_found());
    }
    info!(achievement_id = %id, "achievement deleted");
    Ok(Json(ApiResponse::<()>::message(
        "Achievement deleted successfully",
    )))
}
