use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use tracing::info;

use super::{parse_id, upload_image};
use crate::{
    AppState,
    error::{ApiResult, AppError},
    forms::{FormFields, FormPayload, Violations},
    models::{ApiResponse, Department, NewTeamMember, SocialLinks, TeamMember, TeamMemberChanges},
    uploads::UploadResolver,
};

fn present(uploads: &UploadResolver, mut member: TeamMember) -> TeamMember {
    member.image_url = uploads.normalize_opt(member.image_url);
    member
}

fn not_found() -> AppError {
    AppError::NotFound("Team member not found".to_string())
}

/// `None` when absent, `Some(None)` when cleared.
fn department(fields: &FormFields, v: &mut Violations) -> Option<Option<Department>> {
    match fields.optional_text("department")? {
        None => Some(None),
        Some(raw) => match raw.parse::<Department>() {
            Ok(department) => Some(Some(department)),
            Err(e) => {
                v.push("department", format!("department has an {e}"));
                None
            }
        },
    }
}

fn new_team_member(fields: &FormFields) -> ApiResult<NewTeamMember> {
    let mut v = Violations::new();
    let name = v.required(fields, "name");
    let role = v.required(fields, "role");
    let bio = v.required(fields, "bio");
    let department = department(fields, &mut v).flatten();
    let social_links = fields
        .object::<SocialLinks>("social_links")
        .and_then(|r| v.check(r.map(Some)))
        .unwrap_or_default();
    let join_date = v.check(fields.date("join_date"));
    let active = v.check(fields.flag("active")).unwrap_or(true);
    v.into_result()?;

    Ok(NewTeamMember {
        name,
        role,
        department,
        bio,
        social_links,
        image_url: fields.optional_text("image_url").flatten(),
        join_date: join_date.unwrap_or_else(|| Utc::now().date_naive()),
        active,
    })
}

fn team_member_changes(fields: &FormFields) -> ApiResult<TeamMemberChanges> {
    let mut v = Violations::new();
    let changes = TeamMemberChanges {
        name: v.non_blank(fields, "name"),
        role: v.non_blank(fields, "role"),
        department: department(fields, &mut v),
        bio: v.non_blank(fields, "bio"),
        social_links: fields
            .object::<SocialLinks>("social_links")
            .and_then(|r| v.check(r.map(Some))),
        image_url: fields.optional_text("image_url"),
        join_date: v.check(fields.date("join_date")),
        active: v.check(fields.flag("active")),
    };
    v.into_result()?;
    Ok(changes)
}

/// list_team_members
///
/// [Public Route] Active members only, longest-serving first.
#[utoipa::path(
    get,
    path = "/team",
    tag = "team",
    responses((status = 200, description = "Active team members", body = [TeamMember]))
)]
pub async fn list_team_members(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<TeamMember>>>> {
    let members = state.repo.list_active_team_members().await?;
    Ok(Json(ApiResponse::data(
        members
            .into_iter()
            .map(|m| present(&state.uploads, m))
            .collect(),
    )))
}

/// get_team_member
///
/// [Public Route] Also returns members that have been deactivated.
#[utoipa::path(
    get,
    path = "/team/{id}",
    tag = "team",
    params(("id" = String, Path, description = "Team member ID")),
    responses(
        (status = 200, description = "Found", body = TeamMember),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_team_member(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<TeamMember>>> {
    let id = parse_id(&id)?;
    let member = state
        .repo
        .get_team_member(id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(ApiResponse::data(present(&state.uploads, member))))
}

/// create_team_member
#[utoipa::path(
    post,
    path = "/team",
    tag = "team",
    responses(
        (status = 201, description = "Created", body = TeamMember),
        (status = 400, description = "Validation failed")
    )
)]
pub async fn create_team_member(
    State(state): State<AppState>,
    FormPayload { fields, image }: FormPayload,
) -> ApiResult<(StatusCode, Json<ApiResponse<TeamMember>>)> {
    let mut member = new_team_member(&fields)?;

    if let Some(url) = upload_image(state.storage.as_ref(), &state.uploads, image).await? {
        member.image_url = Some(url);
    }

    let member = state.repo.create_team_member(member).await?;
    info!(member_id = %member.id, "team member created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            present(&state.uploads, member),
            "Team member created successfully",
        )),
    ))
}

/// update_team_member
#[utoipa::path(
    put,
    path = "/team/{id}",
    tag = "team",
    params(("id" = String, Path, description = "Team member ID")),
    responses(
        (status = 200, description = "Updated", body = TeamMember),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_team_member(
    State(state): State<AppState>,
    Path(id): Path<String>,
    FormPayload { fields, image }: FormPayload,
) -> ApiResult<Json<ApiResponse<TeamMember>>> {
    let id = parse_id(&id)?;
    let mut changes = team_member_changes(&fields)?;

    if image.is_some() {
        state.repo.get_team_member(id).await?.ok_or_else(not_found)?;
        if let Some(url) = upload_image(state.storage.as_ref(), &state.uploads, image).await? {
            changes.image_url = Some(Some(url));
        }
    }

    let member = state
        .repo
        .update_team_member(id, changes)
        .await?
        .ok_or_else(not_found)?;
    info!(member_id = %member.id, "team member updated");

    Ok(Json(ApiResponse::with_message(
        present(&state.uploads, member),
        "Team member updated successfully",
    )))
}

/// delete_team_member
///
/// [Admin Route] Soft delete: the member is deactivated and drops out of the
/// public listing but stays retrievable by id.
#[utoipa::path(
    delete,
    path = "/team/{id}",
    tag = "team",
    params(("id" = String, Path, description = "Team member ID")),
    responses(
        (status = 200, description = "Deactivated"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_team_member(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let id = parse_id(&id)?;
    if !state.repo.deactivate_team_member(id).await? {
        return Err(not_found());
    }
    info!(member_id = %id, "team member deactivated");
    Ok(Json(ApiResponse::<()>::message(
        "Team member removed successfully",
    )))
}
