use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool, types::Json};
use uuid::Uuid;

use super::{RepoResult, Repository, RepositoryError, patch_parts};
use crate::models::{
    Achievement, AchievementChanges, Contributor, Course, CourseChanges, NewAchievement,
    NewCourse, NewProject, NewTeamMember, NewUser, Project, ProjectChanges, Role, SocialLinks,
    TeamMember, TeamMemberChanges, User,
};

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL. The schema lives in
/// `migrations/`. Every update is a single statement, so concurrent writers to
/// the same row resolve as last-write-wins.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str =
    "id, email, password_hash, name, role, google_id, avatar_url, created_at";
const PROJECT_COLUMNS: &str = "id, title, description, technologies, image_url, github_url, \
     live_url, social_post_url, category, featured, contributors, created_at, updated_at";
const ACHIEVEMENT_COLUMNS: &str = "id, title, description, categories, participants, \
     competition, date, image_url, social_post_url, created_at, updated_at";
const TEAM_COLUMNS: &str = "id, name, role, department, bio, social_links, image_url, \
     join_date, active, created_at, updated_at";
const COURSE_COLUMNS: &str = "id, title, description, category, instructor, duration, level, \
     price, image_url, learning_outcomes, created_at, updated_at";

// --- Row types ---
// Enums, contributor lists and JSON columns are stored as text; the rows below
// convert them into the domain types.

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: Option<String>,
    name: String,
    role: String,
    google_id: Option<String>,
    avatar_url: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            role: row
                .role
                .parse::<Role>()
                .map_err(|e| RepositoryError::Corrupt(format!("user {}: {e}", row.id)))?,
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            name: row.name,
            google_id: row.google_id,
            avatar_url: row.avatar_url,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct ProjectRow {
    id: Uuid,
    title: String,
    description: String,
    technologies: Vec<String>,
    image_url: Option<String>,
    github_url: Option<String>,
    live_url: Option<String>,
    social_post_url: Option<String>,
    category: String,
    featured: bool,
    contributors: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProjectRow> for Project {
    fn from(row: ProjectRow) -> Self {
        Project {
            contributors: decode_contributors(row.id, row.contributors),
            id: row.id,
            title: row.title,
            description: row.description,
            technologies: row.technologies,
            image_url: row.image_url,
            github_url: row.github_url,
            live_url: row.live_url,
            social_post_url: row.social_post_url,
            category: row.category,
            featured: row.featured,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct AchievementRow {
    id: Uuid,
    title: String,
    description: String,
    categories: Vec<String>,
    participants: Vec<String>,
    competition: String,
    date: NaiveDate,
    image_url: Option<String>,
    social_post_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AchievementRow> for Achievement {
    fn from(row: AchievementRow) -> Self {
        Achievement {
            participants: decode_contributors(row.id, row.participants),
            id: row.id,
            title: row.title,
            description: row.description,
            categories: row.categories,
            competition: row.competition,
            date: row.date,
            image_url: row.image_url,
            social_post_url: row.social_post_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct TeamMemberRow {
    id: Uuid,
    name: String,
    role: String,
    department: Option<String>,
    bio: String,
    social_links: Json<SocialLinks>,
    image_url: Option<String>,
    join_date: NaiveDate,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TeamMemberRow> for TeamMember {
    type Error = RepositoryError;

    fn try_from(row: TeamMemberRow) -> Result<Self, Self::Error> {
        let department = row
            .department
            .as_deref()
            .map(str::parse)
            .transpose()
            .map_err(|e| RepositoryError::Corrupt(format!("team member {}: {e}", row.id)))?;

        Ok(TeamMember {
            id: row.id,
            name: row.name,
            role: row.role,
            department,
            bio: row.bio,
            social_links: row.social_links.0,
            image_url: row.image_url,
            join_date: row.join_date,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct CourseRow {
    id: Uuid,
    title: String,
    description: String,
    category: String,
    instructor: String,
    duration: String,
    level: String,
    price: f64,
    image_url: Option<String>,
    learning_outcomes: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CourseRow> for Course {
    type Error = RepositoryError;

    fn try_from(row: CourseRow) -> Result<Self, Self::Error> {
        Ok(Course {
            level: row
                .level
                .parse()
                .map_err(|e| RepositoryError::Corrupt(format!("course {}: {e}", row.id)))?,
            id: row.id,
            title: row.title,
            description: row.description,
            category: row.category,
            instructor: row.instructor,
            duration: row.duration,
            price: row.price,
            image_url: row.image_url,
            learning_outcomes: row.learning_outcomes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Unparseable entries are dropped with a warning rather than failing the whole read.
fn decode_contributors(record_id: Uuid, raw: Vec<String>) -> Vec<Contributor> {
    raw.into_iter()
        .filter_map(|value| match value.parse() {
            Ok(contributor) => Some(contributor),
            Err(e) => {
                tracing::warn!(%record_id, error = %e, "dropping malformed contributor reference");
                None
            }
        })
        .collect()
}

fn encode_contributors(contributors: &[Contributor]) -> Vec<String> {
    contributors.iter().map(Contributor::to_string).collect()
}

fn convert_all<R, T>(rows: Vec<R>) -> RepoResult<Vec<T>>
where
    T: TryFrom<R, Error = RepositoryError>,
{
    rows.into_iter().map(T::try_from).collect()
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- USERS ---

    async fn find_user_by_id(&self, id: Uuid) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(email.trim())
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find_user_by_google_id(&self, google_id: &str) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE google_id = $1");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(google_id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    /// create_user
    ///
    /// The unique index on `LOWER(email)` turns a duplicate registration into
    /// `RepositoryError::Conflict`.
    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let sql = format!(
            "INSERT INTO users (id, email, password_hash, name, role, google_id, avatar_url, created_at) \
             VALUES ($1, LOWER($2), $3, $4, $5, $6, $7, NOW()) RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(user.email.trim())
            .bind(user.password_hash)
            .bind(user.name)
            .bind(user.role.as_str())
            .bind(user.google_id)
            .bind(user.avatar_url)
            .fetch_one(&self.pool)
            .await?;
        User::try_from(row)
    }

    async fn link_google_account(
        &self,
        id: Uuid,
        google_id: &str,
        avatar_url: Option<&str>,
    ) -> RepoResult<Option<User>> {
        let sql = format!(
            "UPDATE users SET google_id = $2, avatar_url = COALESCE(avatar_url, $3) \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(google_id)
            .bind(avatar_url)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> RepoResult<bool> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_admins(&self) -> RepoResult<Vec<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(role) = 'admin' ORDER BY name ASC"
        );
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        convert_all(rows)
    }

    async fn existing_user_ids(&self, ids: &[Uuid]) -> RepoResult<Vec<Uuid>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let found = sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(found)
    }

    // --- PROJECTS ---

    async fn list_projects(&self) -> RepoResult<Vec<Project>> {
        let sql = format!(
            "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY featured DESC, created_at DESC"
        );
        let rows = sqlx::query_as::<_, ProjectRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Project::from).collect())
    }

    async fn get_project(&self, id: Uuid) -> RepoResult<Option<Project>> {
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1");
        let row = sqlx::query_as::<_, ProjectRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Project::from))
    }

    async fn create_project(&self, project: NewProject) -> RepoResult<Project> {
        let sql = format!(
            "INSERT INTO projects (id, title, description, technologies, image_url, github_url, \
             live_url, social_post_url, category, featured, contributors, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NOW(), NOW()) \
             RETURNING {PROJECT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ProjectRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(project.title)
            .bind(project.description)
            .bind(project.technologies)
            .bind(project.image_url)
            .bind(project.github_url)
            .bind(project.live_url)
            .bind(project.social_post_url)
            .bind(project.category)
            .bind(project.featured)
            .bind(encode_contributors(&project.contributors))
            .fetch_one(&self.pool)
            .await?;
        Ok(Project::from(row))
    }

    /// update_project
    ///
    /// `COALESCE` keeps required columns whose value was not supplied; the
    /// `CASE WHEN` pairs let optional columns be cleared explicitly.
    async fn update_project(
        &self,
        id: Uuid,
        changes: ProjectChanges,
    ) -> RepoResult<Option<Project>> {
        let (set_image, image_url) = patch_parts(changes.image_url);
        let (set_github, github_url) = patch_parts(changes.github_url);
        let (set_live, live_url) = patch_parts(changes.live_url);
        let (set_post, social_post_url) = patch_parts(changes.social_post_url);

        let sql = format!(
            "UPDATE projects SET \
                title = COALESCE($2, title), \
                description = COALESCE($3, description), \
                technologies = COALESCE($4, technologies), \
                image_url = CASE WHEN $5 THEN $6 ELSE image_url END, \
                github_url = CASE WHEN $7 THEN $8 ELSE github_url END, \
                live_url = CASE WHEN $9 THEN $10 ELSE live_url END, \
                social_post_url = CASE WHEN $11 THEN $12 ELSE social_post_url END, \
                category = COALESCE($13, category), \
                featured = COALESCE($14, featured), \
                contributors = COALESCE($15, contributors), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {PROJECT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ProjectRow>(&sql)
            .bind(id)
            .bind(changes.title)
            .bind(changes.description)
            .bind(changes.technologies)
            .bind(set_image)
            .bind(image_url)
            .bind(set_github)
            .bind(github_url)
            .bind(set_live)
            .bind(live_url)
            .bind(set_post)
            .bind(social_post_url)
            .bind(changes.category)
            .bind(changes.featured)
            .bind(changes.contributors.as_deref().map(encode_contributors))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Project::from))
    }

    async fn delete_project(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- ACHIEVEMENTS ---

    async fn list_achievements(&self) -> RepoResult<Vec<Achievement>> {
        let sql = format!(
            "SELECT {ACHIEVEMENT_COLUMNS} FROM achievements ORDER BY date DESC, created_at DESC"
        );
        let rows = sqlx::query_as::<_, AchievementRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Achievement::from).collect())
    }

    async fn get_achievement(&self, id: Uuid) -> RepoResult<Option<Achievement>> {
        let sql = format!("SELECT {ACHIEVEMENT_COLUMNS} FROM achievements WHERE id = $1");
        let row = sqlx::query_as::<_, AchievementRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Achievement::from))
    }

    async fn create_achievement(&self, achievement: NewAchievement) -> RepoResult<Achievement> {
        let sql = format!(
            "INSERT INTO achievements (id, title, description, categories, participants, \
             competition, date, image_url, social_post_url, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW(), NOW()) \
             RETURNING {ACHIEVEMENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, AchievementRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(achievement.title)
            .bind(achievement.description)
            .bind(achievement.categories)
            .bind(encode_contributors(&achievement.participants))
            .bind(achievement.competition)
            .bind(achievement.date)
            .bind(achievement.image_url)
            .bind(achievement.social_post_url)
            .fetch_one(&self.pool)
            .await?;
        Ok(Achievement::from(row))
    }

    async fn update_achievement(
        &self,
        id: Uuid,
        changes: AchievementChanges,
    ) -> RepoResult<Option<Achievement>> {
        let (set_image, image_url) = patch_parts(changes.image_url);
        let (set_post, social_post_url) = patch_parts(changes.social_post_url);

        let sql = format!(
            "UPDATE achievements SET \
                title = COALESCE($2, title), \
                description = COALESCE($3, description), \
                categories = COALESCE($4, categories), \
                participants = COALESCE($5, participants), \
                competition = COALESCE($6, competition), \
                date = COALESCE($7, date), \
                image_url = CASE WHEN $8 THEN $9 ELSE image_url END, \
                social_post_url = CASE WHEN $10 THEN $11 ELSE social_post_url END, \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {ACHIEVEMENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, AchievementRow>(&sql)
            .bind(id)
            .bind(changes.title)
            .bind(changes.description)
            .bind(changes.categories)
            .bind(changes.participants.as_deref().map(encode_contributors))
            .bind(changes.competition)
            .bind(changes.date)
            .bind(set_image)
            .bind(image_url)
            .bind(set_post)
            .bind(social_post_url)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Achievement::from))
    }

    async fn delete_achievement(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM achievements WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- TEAM MEMBERS ---

    async fn list_active_team_members(&self) -> RepoResult<Vec<TeamMember>> {
        let sql = format!(
            "SELECT {TEAM_COLUMNS} FROM team_members WHERE active = true \
             ORDER BY join_date ASC, created_at ASC"
        );
        let rows = sqlx::query_as::<_, TeamMemberRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        convert_all(rows)
    }

    async fn get_team_member(&self, id: Uuid) -> RepoResult<Option<TeamMember>> {
        let sql = format!("SELECT {TEAM_COLUMNS} FROM team_members WHERE id = $1");
        sqlx::query_as::<_, TeamMemberRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(TeamMember::try_from)
            .transpose()
    }

    async fn create_team_member(&self, member: NewTeamMember) -> RepoResult<TeamMember> {
        let sql = format!(
            "INSERT INTO team_members (id, name, role, department, bio, social_links, image_url, \
             join_date, active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW(), NOW()) RETURNING {TEAM_COLUMNS}"
        );
        let row = sqlx::query_as::<_, TeamMemberRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(member.name)
            .bind(member.role)
            .bind(member.department.map(|d| d.as_str()))
            .bind(member.bio)
            .bind(Json(member.social_links))
            .bind(member.image_url)
            .bind(member.join_date)
            .bind(member.active)
            .fetch_one(&self.pool)
            .await?;
        TeamMember::try_from(row)
    }

    async fn update_team_member(
        &self,
        id: Uuid,
        changes: TeamMemberChanges,
    ) -> RepoResult<Option<TeamMember>> {
        let (set_department, department) = patch_parts(changes.department);
        let (set_image, image_url) = patch_parts(changes.image_url);

        let sql = format!(
            "UPDATE team_members SET \
                name = COALESCE($2, name), \
                role = COALESCE($3, role), \
                department = CASE WHEN $4 THEN $5 ELSE department END, \
                bio = COALESCE($6, bio), \
                social_links = COALESCE($7, social_links), \
                image_url = CASE WHEN $8 THEN $9 ELSE image_url END, \
                join_date = COALESCE($10, join_date), \
                active = COALESCE($11, active), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {TEAM_COLUMNS}"
        );
        sqlx::query_as::<_, TeamMemberRow>(&sql)
            .bind(id)
            .bind(changes.name)
            .bind(changes.role)
            .bind(set_department)
            .bind(department.map(|d| d.as_str()))
            .bind(changes.bio)
            .bind(changes.social_links.map(Json))
            .bind(set_image)
            .bind(image_url)
            .bind(changes.join_date)
            .bind(changes.active)
            .fetch_optional(&self.pool)
            .await?
            .map(TeamMember::try_from)
            .transpose()
    }

    async fn deactivate_team_member(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query(
            "UPDATE team_members SET active = false, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- COURSES ---

    async fn list_courses(&self) -> RepoResult<Vec<Course>> {
        let sql = format!("SELECT {COURSE_COLUMNS} FROM courses ORDER BY created_at DESC");
        let rows = sqlx::query_as::<_, CourseRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        convert_all(rows)
    }

    async fn get_course(&self, id: Uuid) -> RepoResult<Option<Course>> {
        let sql = format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1");
        sqlx::query_as::<_, CourseRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Course::try_from)
            .transpose()
    }

    async fn create_course(&self, course: NewCourse) -> RepoResult<Course> {
        let sql = format!(
            "INSERT INTO courses (id, title, description, category, instructor, duration, level, \
             price, image_url, learning_outcomes, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW(), NOW()) \
             RETURNING {COURSE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, CourseRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(course.title)
            .bind(course.description)
            .bind(course.category)
            .bind(course.instructor)
            .bind(course.duration)
            .bind(course.level.as_str())
            .bind(course.price)
            .bind(course.image_url)
            .bind(course.learning_outcomes)
            .fetch_one(&self.pool)
            .await?;
        Course::try_from(row)
    }

    async fn update_course(&self, id: Uuid, changes: CourseChanges) -> RepoResult<Option<Course>> {
        let (set_image, image_url) = patch_parts(changes.image_url);

        let sql = format!(
            "UPDATE courses SET \
                title = COALESCE($2, title), \
                description = COALESCE($3, description), \
                category = COALESCE($4, category), \
                instructor = COALESCE($5, instructor), \
                duration = COALESCE($6, duration), \
                level = COALESCE($7, level), \
                price = COALESCE($8, price), \
                image_url = CASE WHEN $9 THEN $10 ELSE image_url END, \
                learning_outcomes = COALESCE($11, learning_outcomes), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {COURSE_COLUMNS}"
        );
        sqlx::query_as::<_, CourseRow>(&sql)
            .bind(id)
            .bind(changes.title)
            .bind(changes.description)
            .bind(changes.category)
            .bind(changes.instructor)
            .bind(changes.duration)
            .bind(changes.level.map(|l| l.as_str()))
            .bind(changes.price)
            .bind(set_image)
            .bind(image_url)
            .bind(changes.learning_outcomes)
            .fetch_optional(&self.pool)
            .await?
            .map(Course::try_from)
            .transpose()
    }

    async fn delete_course(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
