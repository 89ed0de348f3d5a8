use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::{ApiResult, AppError},
    forms::{FormFields, UploadedFile, Violations},
    models::{Contributor, referenced_user_ids},
    repository::Repository,
    storage::StorageService,
    uploads::{UploadResolver, store_image},
};

pub mod achievements;
pub mod auth;
pub mod courses;
pub mod projects;
pub mod team;

/// HealthResponse
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    #[schema(value_type = String)]
    pub timestamp: DateTime<Utc>,
}

/// health
///
/// Liveness probe. Does not touch the datastore.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
    })
}

/// Parses a path id. A malformed id is a client error, never a 404 or 500.
pub(crate) fn parse_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::invalid("id", "Invalid id format"))
}

/// contributor_list
///
/// Reads a contributor-reference list. An undecodable list degrades to empty;
/// an entry that is neither `"all"` nor a UUID is a violation.
pub(crate) fn contributor_list(
    fields: &FormFields,
    name: &str,
    violations: &mut Violations,
) -> Option<Vec<Contributor>> {
    let raw = fields.list(name).or_empty()?;

    let mut contributors: Vec<Contributor> = Vec::with_capacity(raw.len());
    for entry in raw {
        match entry.parse::<Contributor>() {
            Ok(c) if !contributors.contains(&c) => contributors.push(c),
            Ok(_) => {}
            Err(e) => violations.push(name, format!("{name} contains an invalid reference: {}", e.0)),
        }
    }
    Some(contributors)
}

/// Rejects references to users that do not exist.
pub(crate) async fn ensure_users_exist(
    repo: &dyn Repository,
    field: &str,
    contributors: &[Contributor],
) -> ApiResult<()> {
    let ids = referenced_user_ids(contributors);
    if ids.is_empty() {
        return Ok(());
    }

    let found = repo.existing_user_ids(&ids).await?;
    let missing: Vec<String> = ids
        .iter()
        .filter(|id| !found.contains(id))
        .map(Uuid::to_string)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::invalid(
            field,
            format!("{field} references unknown users: {}", missing.join(", ")),
        ))
    }
}

/// Runs the upload pipeline when the submission carried a file.
pub(crate) async fn upload_image(
    storage: &dyn StorageService,
    resolver: &UploadResolver,
    image: Option<UploadedFile>,
) -> ApiResult<Option<String>> {
    match image {
        Some(file) => store_image(storage, resolver, file).await.map(Some),
        None => Ok(None),
    }
}
