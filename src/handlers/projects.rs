use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::info;

use super::{contributor_list, ensure_users_exist, parse_id, upload_image};
use crate::{
    AppState,
    error::{ApiResult, AppError},
    forms::{FormFields, FormPayload, Violations},
    models::{ApiResponse, NewProject, Project, ProjectChanges},
    uploads::UploadResolver,
};

/// Category assigned when a project is created without one.
pub const DEFAULT_CATEGORY: &str = "General";

fn present(uploads: &UploadResolver, mut project: Project) -> Project {
    project.image_url = uploads.normalize_opt(project.image_url);
    project
}

fn not_found() -> AppError {
    AppError::NotFound("Project not found".to_string())
}

fn new_project(fields: &FormFields) -> ApiResult<NewProject> {
    let mut v = Violations::new();
    let title = v.required(fields, "title");
    let description = v.required(fields, "description");
    let featured = v.check(fields.flag("featured")).unwrap_or(false);
    let contributors = contributor_list(fields, "contributors", &mut v).unwrap_or_default();
    v.into_result()?;

    Ok(NewProject {
        title,
        description,
        technologies: fields.list("technologies").or_empty().unwrap_or_default(),
        image_url: fields.optional_text("image_url").flatten(),
        github_url: fields.optional_text("github_url").flatten(),
        live_url: fields.optional_text("live_url").flatten(),
        social_post_url: fields.optional_text("social_post_url").flatten(),
        category: fields
            .text("category")
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        featured,
        contributors,
    })
}

fn project_changes(fields: &FormFields) -> ApiResult<ProjectChanges> {
    let mut v = Violations::new();
    let changes = ProjectChanges {
        title: v.non_blank(fields, "title"),
        description: v.non_blank(fields, "description"),
        technologies: fields.list("technologies").or_empty(),
        image_url: fields.optional_text("image_url"),
        github_url: fields.optional_text("github_url"),
        live_url: fields.optional_text("live_url"),
        social_post_url: fields.optional_text("social_post_url"),
        // A cleared category falls back to the default rather than going blank.
        category: fields
            .optional_text("category")
            .map(|c| c.unwrap_or_else(|| DEFAULT_CATEGORY.to_string())),
        featured: v.check(fields.flag("featured")),
        contributors: contributor_list(fields, "contributors", &mut v),
    };
    v.into_result()?;
    Ok(changes)
}

/// list_projects
///
/// [Public Route] All projects, featured first, then newest.
#[utoipa::path(
    get,
    path = "/projects",
    tag = "projects",
    responses((status = 200, description = "All projects", body = [Project]))
)]
pub async fn list_projects(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<Project>>>> {
    let projects = state.repo.list_projects().await?;
    Ok(Json(ApiResponse::data(
        projects
            .into_iter()
            .map(|p| present(&state.uploads, p))
            .collect(),
    )))
}

/// get_project
#[utoipa::path(
    get,
    path = "/projects/{id}",
    tag = "projects",
    params(("id" = String, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Found", body = Project),
        (status = 400, description = "Malformed id"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<Project>>> {
    let id = parse_id(&id)?;
    let project = state.repo.get_project(id).await?.ok_or_else(not_found)?;
    Ok(Json(ApiResponse::data(present(&state.uploads, project))))
}

/// create_project
///
/// [Admin Route] Accepts JSON or multipart. Every missing required field is
/// reported; nothing is uploaded or stored when validation fails.
#[utoipa::path(
    post,
    path = "/projects",
    tag = "projects",
    responses(
        (status = 201, description = "Created", body = Project),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "No session"),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn create_project(
    State(state): State<AppState>,
    FormPayload { fields, image }: FormPayload,
) -> ApiResult<(StatusCode, Json<ApiResponse<Project>>)> {
    let mut project = new_project(&fields)?;
    ensure_users_exist(state.repo.as_ref(), "contributors", &project.contributors).await?;

    if let Some(url) = upload_image(state.storage.as_ref(), &state.uploads, image).await? {
        project.image_url = Some(url);
    }

    let project = state.repo.create_project(project).await?;
    info!(project_id = %project.id, "project created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            present(&state.uploads, project),
            "Project created successfully",
        )),
    ))
}

/// update_project
///
/// [Admin Route] Partial update: only supplied fields change.
#[utoipa::path(
    put,
    path = "/projects/{id}",
    tag = "projects",
    params(("id" = String, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Updated", body = Project),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
    FormPayload { fields, image }: FormPayload,
) -> ApiResult<Json<ApiResponse<Project>>> {
    let id = parse_id(&id)?;
    let mut changes = project_changes(&fields)?;
    if let Some(contributors) = &changes.contributors {
        ensure_users_exist(state.repo.as_ref(), "contributors", contributors).await?;
    }

    if image.is_some() {
        state.repo.get_project(id).await?.ok_or_else(not_found)?;
        if let Some(url) = upload_image(state.storage.as_ref(), &state.uploads, image).await? {
            changes.image_url = Some(Some(url));
        }
    }

    let project = state
        .repo
        .update_project(id, changes)
        .await?
        .ok_or_else(not_found)?;
    info!(project_id = %project.id, "project updated");

    Ok(Json(ApiResponse::with_message(
        present(&state.uploads, project),
        "Project updated successfully",
    )))
}

/// delete_project
#[utoipa::path(
    delete,
    path = "/projects/{id}",
    tag = "projects",
    params(("id" = String, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let id = parse_id(&id)?;
    if !state.repo.delete_project(id).await? {
        return Err(not_found());
    }
    info!(project_id = %id, "project deleted");
    Ok(Json(ApiResponse::<()>::message("Project deleted successfully")))
}
