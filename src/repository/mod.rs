use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Achievement, AchievementChanges, Course, CourseChanges, NewAchievement, NewCourse, NewProject,
    NewTeamMember, NewUser, Project, ProjectChanges, TeamMember, TeamMemberChanges, User,
};

mod memory;
mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

/// RepositoryError
///
/// Persistence failures. Unique-constraint violations are separated out so the
/// handlers can report them as `Conflict` instead of a server error.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(sqlx::Error),

    #[error("stored record is malformed: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return RepositoryError::Conflict(
                    "A record with the same unique value already exists".to_string(),
                );
            }
        }
        RepositoryError::Database(err)
    }
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Repository Trait
///
/// The contract for all persistence operations. Handlers only see this trait, so the
/// Postgres implementation and the in-memory one are interchangeable.
///
/// `update_*` and `get_*` return `None` when the id does not exist; `delete_*`
/// return whether a row was affected. Callers turn both into `NotFound`.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn find_user_by_id(&self, id: Uuid) -> RepoResult<Option<User>>;
    // Case-insensitive match on the email address.
    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    async fn find_user_by_google_id(&self, google_id: &str) -> RepoResult<Option<User>>;
    async fn create_user(&self, user: NewUser) -> RepoResult<User>;
    // Records the Google subject on an existing account. The avatar is only filled
    // in when the account has none; the role is never touched.
    async fn link_google_account(
        &self,
        id: Uuid,
        google_id: &str,
        avatar_url: Option<&str>,
    ) -> RepoResult<Option<User>>;
    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> RepoResult<bool>;
    async fn list_admins(&self) -> RepoResult<Vec<User>>;
    // Returns the subset of `ids` that belong to existing users.
    async fn existing_user_ids(&self, ids: &[Uuid]) -> RepoResult<Vec<Uuid>>;

    // --- Projects (featured first, then newest) ---
    async fn list_projects(&self) -> RepoResult<Vec<Project>>;
    async fn get_project(&self, id: Uuid) -> RepoResult<Option<Project>>;
    async fn create_project(&self, project: NewProject) -> RepoResult<Project>;
    async fn update_project(&self, id: Uuid, changes: ProjectChanges)
    -> RepoResult<Option<Project>>;
    async fn delete_project(&self, id: Uuid) -> RepoResult<bool>;

    // --- Achievements (most recent date first) ---
    async fn list_achievements(&self) -> RepoResult<Vec<Achievement>>;
    async fn get_achievement(&self, id: Uuid) -> RepoResult<Option<Achievement>>;
    async fn create_achievement(&self, achievement: NewAchievement) -> RepoResult<Achievement>;
    async fn update_achievement(
        &self,
        id: Uuid,
        changes: AchievementChanges,
    ) -> RepoResult<Option<Achievement>>;
    async fn delete_achievement(&self, id: Uuid) -> RepoResult<bool>;

    // --- Team members (active only, by join date) ---
    async fn list_active_team_members(&self) -> RepoResult<Vec<TeamMember>>;
    // Also returns inactive members.
    async fn get_team_member(&self, id: Uuid) -> RepoResult<Option<TeamMember>>;
    async fn create_team_member(&self, member: NewTeamMember) -> RepoResult<TeamMember>;
    async fn update_team_member(
        &self,
        id: Uuid,
        changes: TeamMemberChanges,
    ) -> RepoResult<Option<TeamMember>>;
    // Soft delete: clears the active flag.
    async fn deactivate_team_member(&self, id: Uuid) -> RepoResult<bool>;

    // --- Courses (newest first) ---
    async fn list_courses(&self) -> RepoResult<Vec<Course>>;
    async fn get_course(&self, id: Uuid) -> RepoResult<Option<Course>>;
    async fn create_course(&self, course: NewCourse) -> RepoResult<Course>;
    async fn update_course(&self, id: Uuid, changes: CourseChanges) -> RepoResult<Option<Course>>;
    async fn delete_course(&self, id: Uuid) -> RepoResult<bool>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// Splits a partial-update value into the `(supplied, value)` pair bound by the
/// `CASE WHEN` update statements.
pub(crate) fn patch_parts<T>(patch: Option<Option<T>>) -> (bool, Option<T>) {
    match patch {
        Some(value) => (true, value),
        None => (false, None),
    }
}
