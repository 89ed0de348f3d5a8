use std::{
    collections::HashMap,
    sync::atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{RepoResult, Repository, RepositoryError};
use crate::models::{
    Achievement, AchievementChanges, Course, CourseChanges, NewAchievement, NewCourse,
    NewProject, NewTeamMember, NewUser, Project, ProjectChanges, Role, TeamMember,
    TeamMemberChanges, User,
};

/// InMemoryRepository
///
/// A process-local `Repository` used when no `DATABASE_URL` is configured and by the
/// integration tests. Listing order matches the Postgres queries. Every trait call
/// bumps `call_count`, which lets tests assert that a request never reached storage.
#[derive(Default)]
pub struct InMemoryRepository {
    users: RwLock<HashMap<Uuid, User>>,
    projects: RwLock<HashMap<Uuid, Project>>,
    achievements: RwLock<HashMap<Uuid, Achievement>>,
    team: RwLock<HashMap<Uuid, TeamMember>>,
    courses: RwLock<HashMap<Uuid, Course>>,
    calls: AtomicUsize,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of repository operations served so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn find_user_by_id(&self, id: Uuid) -> RepoResult<Option<User>> {
        self.touch();
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        self.touch();
        let needle = email.trim().to_lowercase();
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email.to_lowercase() == needle)
            .cloned())
    }

    async fn find_user_by_google_id(&self, google_id: &str) -> RepoResult<Option<User>> {
        self.touch();
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.google_id.as_deref() == Some(google_id))
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        self.touch();
        let email = user.email.trim().to_lowercase();
        let mut users = self.users.write().await;

        // Check and insert under the same write guard.
        if users.values().any(|u| u.email == email) {
            return Err(RepositoryError::Conflict(
                "A record with the same unique value already exists".to_string(),
            ));
        }
        if let Some(google_id) = &user.google_id {
            if users.values().any(|u| u.google_id.as_ref() == Some(google_id)) {
                return Err(RepositoryError::Conflict(
                    "A record with the same unique value already exists".to_string(),
                ));
            }
        }

        let created = User {
            id: Uuid::new_v4(),
            email,
            password_hash: user.password_hash,
            name: user.name,
            role: user.role,
            google_id: user.google_id,
            avatar_url: user.avatar_url,
            created_at: Utc::now(),
        };
        users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn link_google_account(
        &self,
        id: Uuid,
        google_id: &str,
        avatar_url: Option<&str>,
    ) -> RepoResult<Option<User>> {
        self.touch();
        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(&id) else {
            return Ok(None);
        };
        user.google_id = Some(google_id.to_string());
        if user.avatar_url.is_none() {
            user.avatar_url = avatar_url.map(str::to_string);
        }
        Ok(Some(user.clone()))
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> RepoResult<bool> {
        self.touch();
        let mut users = self.users.write().await;
        match users.get_mut(&id) {
            Some(user) => {
                user.password_hash = Some(password_hash.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_admins(&self) -> RepoResult<Vec<User>> {
        self.touch();
        let mut admins: Vec<User> = self
            .users
            .read()
            .await
            .values()
            .filter(|u| u.role == Role::Admin)
            .cloned()
            .collect();
        admins.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(admins)
    }

    async fn existing_user_ids(&self, ids: &[Uuid]) -> RepoResult<Vec<Uuid>> {
        self.touch();
        let users = self.users.read().await;
        Ok(ids.iter().copied().filter(|id| users.contains_key(id)).collect())
    }

    // --- Projects ---

    async fn list_projects(&self) -> RepoResult<Vec<Project>> {
        self.touch();
        let mut projects: Vec<Project> = self.projects.read().await.values().cloned().collect();
        projects.sort_by(|a, b| {
            b.featured
                .cmp(&a.featured)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(projects)
    }

    async fn get_project(&self, id: Uuid) -> RepoResult<Option<Project>> {
        self.touch();
        Ok(self.projects.read().await.get(&id).cloned())
    }

    async fn create_project(&self, project: NewProject) -> RepoResult<Project> {
        self.touch();
        let now = Utc::now();
        let created = Project {
            id: Uuid::new_v4(),
            title: project.title,
            description: project.description,
            technologies: project.technologies,
            image_url: project.image_url,
            github_url: project.github_url,
            live_url: project.live_url,
            social_post_url: project.social_post_url,
            category: project.category,
            featured: project.featured,
            contributors: project.contributors,
            created_at: now,
            updated_at: now,
        };
        self.projects
            .write()
            .await
            .insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_project(
        &self,
        id: Uuid,
        changes: ProjectChanges,
    ) -> RepoResult<Option<Project>> {
        self.touch();
        let mut projects = self.projects.write().await;
        let Some(project) = projects.get_mut(&id) else {
            return Ok(None);
        };
        changes.apply(project);
        project.updated_at = Utc::now();
        Ok(Some(project.clone()))
    }

    async fn delete_project(&self, id: Uuid) -> RepoResult<bool> {
        self.touch();
        Ok(self.projects.write().await.remove(&id).is_some())
    }

    // --- Achievements ---

    async fn list_achievements(&self) -> RepoResult<Vec<Achievement>> {
        self.touch();
        let mut achievements: Vec<Achievement> =
            self.achievements.read().await.values().cloned().collect();
        achievements.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(achievements)
    }

    async fn get_achievement(&self, id: Uuid) -> RepoResult<Option<Achievement>> {
        self.touch();
        Ok(self.achievements.read().await.get(&id).cloned())
    }

    async fn create_achievement(&self, achievement: NewAchievement) -> RepoResult<Achievement> {
        self.touch();
        let now = Utc::now();
        let created = Achievement {
            id: Uuid::new_v4(),
            title: achievement.title,
            description: achievement.description,
            categories: achievement.categories,
            participants: achievement.participants,
            competition: achievement.competition,
            date: achievement.date,
            image_url: achievement.image_url,
            social_post_url: achievement.social_post_url,
            created_at: now,
            updated_at: now,
        };
        self.achievements
            .write()
            .await
            .insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_achievement(
        &self,
        id: Uuid,
        changes: AchievementChanges,
    ) -> RepoResult<Option<Achievement>> {
        self.touch();
        let mut achievements = self.achievements.write().await;
        let Some(achievement) = achievements.get_mut(&id) else {
            return Ok(None);
        };
        changes.apply(achievement);
        achievement.updated_at = Utc::now();
        Ok(Some(achievement.clone()))
    }

    async fn delete_achievement(&self, id: Uuid) -> RepoResult<bool> {
        self.touch();
        Ok(self.achievements.write().await.remove(&id).is_some())
    }

    // --- Team members ---

    async fn list_active_team_members(&self) -> RepoResult<Vec<TeamMember>> {
        self.touch();
        let mut members: Vec<TeamMember> = self
            .team
            .read()
            .await
            .values()
            .filter(|m| m.active)
            .cloned()
            .collect();
        members.sort_by(|a, b| {
            a.join_date
                .cmp(&b.join_date)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        Ok(members)
    }

    async fn get_team_member(&self, id: Uuid) -> RepoResult<Option<TeamMember>> {
        self.touch();
        Ok(self.team.read().await.get(&id).cloned())
    }

    async fn create_team_member(&self, member: NewTeamMember) -> RepoResult<TeamMember> {
        self.touch();
        let now = Utc::now();
        let created = TeamMember {
            id: Uuid::new_v4(),
            name: member.name,
            role: member.role,
            department: member.department,
            bio: member.bio,
            social_links: member.social_links,
            image_url: member.image_url,
            join_date: member.join_date,
            active: member.active,
            created_at: now,
            updated_at: now,
        };
        self.team.write().await.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_team_member(
        &self,
        id: Uuid,
        changes: TeamMemberChanges,
    ) -> RepoResult<Option<TeamMember>> {
        self.touch();
        let mut team = self.team.write().await;
        let Some(member) = team.get_mut(&id) else {
            return Ok(None);
        };
        changes.apply(member);
        member.updated_at = Utc::now();
        Ok(Some(member.clone()))
    }

    async fn deactivate_team_member(&self, id: Uuid) -> RepoResult<bool> {
        self.touch();
        let mut team = self.team.write().await;
        match team.get_mut(&id) {
            Some(member) => {
                member.active = false;
                member.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // --- Courses ---

    async fn list_courses(&self) -> RepoResult<Vec<Course>> {
        self.touch();
        let mut courses: Vec<Course> = self.courses.read().await.values().cloned().collect();
        courses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(courses)
    }

    async fn get_course(&self, id: Uuid) -> RepoResult<Option<Course>> {
        self.touch();
        Ok(self.courses.read().await.get(&id).cloned())
    }

    async fn create_course(&self, course: NewCourse) -> RepoResult<Course> {
        self.touch();
        let now = Utc::now();
        let created = Course {
            id: Uuid::new_v4(),
            title: course.title,
            description: course.description,
            category: course.category,
            instructor: course.instructor,
            duration: course.duration,
            level: course.level,
            price: course.price,
            image_url: course.image_url,
            learning_outcomes: course.learning_outcomes,
            created_at: now,
            updated_at: now,
        };
        self.courses
            .write()
            .await
            .insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_course(&self, id: Uuid, changes: CourseChanges) -> RepoResult<Option<Course>> {
        self.touch();
        let mut courses = self.courses.write().await;
        let Some(course) = courses.get_mut(&id) else {
            return Ok(None);
        };
        changes.apply(course);
        course.updated_at = Utc::now();
        Ok(Some(course.clone()))
    }

    async fn delete_course(&self, id: Uuid) -> RepoResult<bool> {
        self.touch();
        Ok(self.courses.write().await.remove(&id).is_some())
    }
}
