use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Enumerations ---

/// Role
///
/// The RBAC field on a user record. A single value, not a capability list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    #[default]
    Member,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Admin => "admin",
        }
    }
}

/// Department
///
/// Fixed set of team departments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Department {
    Software,
    Hardware,
    Design,
    Research,
    Operations,
    Management,
}

impl Department {
    pub fn as_str(&self) -> &'static str {
        match self {
            Department::Software => "software",
            Department::Hardware => "hardware",
            Department::Design => "design",
            Department::Research => "research",
            Department::Operations => "operations",
            Department::Management => "management",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum CourseLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl CourseLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourseLevel::Beginner => "beginner",
            CourseLevel::Intermediate => "intermediate",
            CourseLevel::Advanced => "advanced",
        }
    }
}

/// Error returned when a stored or submitted string is not a known enum value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown value '{0}'")]
pub struct UnknownVariant(pub String);

macro_rules! case_insensitive_from_str {
    ($ty:ty, [$($variant:expr),+ $(,)?]) => {
        impl FromStr for $ty {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let needle = s.trim();
                [$($variant),+]
                    .into_iter()
                    .find(|v| v.as_str().eq_ignore_ascii_case(needle))
                    .ok_or_else(|| UnknownVariant(needle.to_string()))
            }
        }
    };
}

case_insensitive_from_str!(Role, [Role::Member, Role::Admin]);
case_insensitive_from_str!(
    Department,
    [
        Department::Software,
        Department::Hardware,
        Department::Design,
        Department::Research,
        Department::Operations,
        Department::Management,
    ]
);
case_insensitive_from_str!(
    CourseLevel,
    [CourseLevel::Beginner, CourseLevel::Intermediate, CourseLevel::Advanced]
);

/// Contributor
///
/// A reference from a project or achievement to the people behind it: either one
/// user, or every admin. On the wire and in the database this is the string `"all"`
/// or a user UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Contributor {
    AllAdmins,
    User(Uuid),
}

pub const ALL_ADMINS: &str = "all";

impl fmt::Display for Contributor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Contributor::AllAdmins => f.write_str(ALL_ADMINS),
            Contributor::User(id) => write!(f, "{id}"),
        }
    }
}

impl FromStr for Contributor {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case(ALL_ADMINS) {
            return Ok(Contributor::AllAdmins);
        }
        Uuid::parse_str(s)
            .map(Contributor::User)
            .map_err(|_| UnknownVariant(s.to_string()))
    }
}

impl TryFrom<String> for Contributor {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Contributor> for String {
    fn from(value: Contributor) -> Self {
        value.to_string()
    }
}

/// Collects the concrete user ids referenced by a contributor list.
pub fn referenced_user_ids(contributors: &[Contributor]) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = contributors
        .iter()
        .filter_map(|c| match c {
            Contributor::User(id) => Some(*id),
            Contributor::AllAdmins => None,
        })
        .collect();
    ids.sort();
    ids.dedup();
    ids
}

// --- Users ---

/// User
///
/// Identity plus credential. Never serialized directly; responses use `UserProfile`
/// so the password hash cannot leak.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    // Stored lowercased; lookups are case-insensitive.
    pub email: String,
    // Absent for accounts created through Google sign-in.
    pub password_hash: Option<String>,
    pub name: String,
    pub role: Role,
    pub google_id: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// NewUser
///
/// Insert payload for a user. The role has already been decided by the role policy.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: Option<String>,
    pub name: String,
    pub role: Role,
    pub google_id: Option<String>,
    pub avatar_url: Option<String>,
}

/// UserProfile
///
/// Output schema for the caller's own profile (GET /auth/me, sign-in responses).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub avatar_url: Option<String>,
    // True when the account can sign in with a password.
    pub has_password: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            avatar_url: user.avatar_url.clone(),
            has_password: user.password_hash.is_some(),
            created_at: user.created_at,
        }
    }
}

/// AdminSummary
///
/// Public listing entry used by contributor pickers (GET /auth/admins). Emails are
/// deliberately not part of it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct AdminSummary {
    pub id: Uuid,
    pub name: String,
    pub avatar_url: Option<String>,
}

impl From<&User> for AdminSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            avatar_url: user.avatar_url.clone(),
        }
    }
}

// --- Request payloads (auth) ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SignupRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invite_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SigninRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// GoogleSigninRequest
///
/// `credential` is the ID token returned by Google Identity Services.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct GoogleSigninRequest {
    #[serde(default)]
    pub credential: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invite_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
}

// --- Content records ---

/// Project
///
/// A showcased engineering project. Publicly readable; written by admins only.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub technologies: Vec<String>,
    pub image_url: Option<String>,
    pub github_url: Option<String>,
    pub live_url: Option<String>,
    pub social_post_url: Option<String>,
    pub category: String,
    pub featured: bool,
    #[ts(type = "Array<string>")]
    #[schema(value_type = Vec<String>)]
    pub contributors: Vec<Contributor>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewProject {
    pub title: String,
    pub description: String,
    pub technologies: Vec<String>,
    pub image_url: Option<String>,
    pub github_url: Option<String>,
    pub live_url: Option<String>,
    pub social_post_url: Option<String>,
    pub category: String,
    pub featured: bool,
    pub contributors: Vec<Contributor>,
}

/// ProjectChanges
///
/// Partial update. `None` leaves a column untouched; for optional columns
/// `Some(None)` clears the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub technologies: Option<Vec<String>>,
    pub image_url: Option<Option<String>>,
    pub github_url: Option<Option<String>>,
    pub live_url: Option<Option<String>>,
    pub social_post_url: Option<Option<String>>,
    pub category: Option<String>,
    pub featured: Option<bool>,
    pub contributors: Option<Vec<Contributor>>,
}

impl ProjectChanges {
    pub fn apply(self, project: &mut Project) {
        set(&mut project.title, self.title);
        set(&mut project.description, self.description);
        set(&mut project.technologies, self.technologies);
        set(&mut project.image_url, self.image_url);
        set(&mut project.github_url, self.github_url);
        set(&mut project.live_url, self.live_url);
        set(&mut project.social_post_url, self.social_post_url);
        set(&mut project.category, self.category);
        set(&mut project.featured, self.featured);
        set(&mut project.contributors, self.contributors);
    }
}

/// Achievement
///
/// A competition result. Categories hold one to three tags.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct Achievement {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub categories: Vec<String>,
    #[ts(type = "Array<string>")]
    #[schema(value_type = Vec<String>)]
    pub participants: Vec<Contributor>,
    pub competition: String,
    pub date: NaiveDate,
    pub image_url: Option<String>,
    pub social_post_url: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAchievement {
    pub title: String,
    pub description: String,
    pub categories: Vec<String>,
    pub participants: Vec<Contributor>,
    pub competition: String,
    pub date: NaiveDate,
    pub image_url: Option<String>,
    pub social_post_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AchievementChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub categories: Option<Vec<String>>,
    pub participants: Option<Vec<Contributor>>,
    pub competition: Option<String>,
    pub date: Option<NaiveDate>,
    pub image_url: Option<Option<String>>,
    pub social_post_url: Option<Option<String>>,
}

impl AchievementChanges {
    pub fn apply(self, achievement: &mut Achievement) {
        set(&mut achievement.title, self.title);
        set(&mut achievement.description, self.description);
        set(&mut achievement.categories, self.categories);
        set(&mut achievement.participants, self.participants);
        set(&mut achievement.competition, self.competition);
        set(&mut achievement.date, self.date);
        set(&mut achievement.image_url, self.image_url);
        set(&mut achievement.social_post_url, self.social_post_url);
    }
}

/// SocialLinks
///
/// Optional profile links on a team member, stored as one JSON document.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq, Default)]
#[ts(export)]
pub struct SocialLinks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

/// TeamMember
///
/// Deleting a member only clears `active`; the public listing hides inactive rows.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct TeamMember {
    pub id: Uuid,
    pub name: String,
    pub role: String,
    pub department: Option<Department>,
    pub bio: String,
    pub social_links: SocialLinks,
    pub image_url: Option<String>,
    pub join_date: NaiveDate,
    pub active: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTeamMember {
    pub name: String,
    pub role: String,
    pub department: Option<Department>,
    pub bio: String,
    pub social_links: SocialLinks,
    pub image_url: Option<String>,
    pub join_date: NaiveDate,
    pub active: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeamMemberChanges {
    pub name: Option<String>,
    pub role: Option<String>,
    pub department: Option<Option<Department>>,
    pub bio: Option<String>,
    pub social_links: Option<SocialLinks>,
    pub image_url: Option<Option<String>>,
    pub join_date: Option<NaiveDate>,
    pub active: Option<bool>,
}

impl TeamMemberChanges {
    pub fn apply(self, member: &mut TeamMember) {
        set(&mut member.name, self.name);
        set(&mut member.role, self.role);
        set(&mut member.department, self.department);
        set(&mut member.bio, self.bio);
        set(&mut member.social_links, self.social_links);
        set(&mut member.image_url, self.image_url);
        set(&mut member.join_date, self.join_date);
        set(&mut member.active, self.active);
    }
}

/// Course
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub instructor: String,
    pub duration: String,
    pub level: CourseLevel,
    pub price: f64,
    pub image_url: Option<String>,
    pub learning_outcomes: Vec<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCourse {
    pub title: String,
    pub description: String,
    pub category: String,
    pub instructor: String,
    pub duration: String,
    pub level: CourseLevel,
    pub price: f64,
    pub image_url: Option<String>,
    pub learning_outcomes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CourseChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub instructor: Option<String>,
    pub duration: Option<String>,
    pub level: Option<CourseLevel>,
    pub price: Option<f64>,
    pub image_url: Option<Option<String>>,
    pub learning_outcomes: Option<Vec<String>>,
}

impl CourseChanges {
    pub fn apply(self, course: &mut Course) {
        set(&mut course.title, self.title);
        set(&mut course.description, self.description);
        set(&mut course.category, self.category);
        set(&mut course.instructor, self.instructor);
        set(&mut course.duration, self.duration);
        set(&mut course.level, self.level);
        set(&mut course.price, self.price);
        set(&mut course.image_url, self.image_url);
        set(&mut course.learning_outcomes, self.learning_outcomes);
    }
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

// --- Response envelope ---

/// ApiResponse
///
/// Success envelope: `{success: true, data?, message?}`. Failures use
/// `error::ErrorBody` with the same `success`/`message` keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }
}
