use crate::{config::AppConfig, models::Role};

/// RolePolicy
///
/// Decides the role of a newly created account. An account is `admin` when its
/// email is on the configured admin list or when it presents the admin invite
/// code; every other account is a `member`. Client-supplied role fields are
/// never consulted.
#[derive(Clone, Debug, Default)]
pub struct RolePolicy {
    admin_emails: Vec<String>,
    invite_code: Option<String>,
}

impl RolePolicy {
    pub fn new(admin_emails: Vec<String>, invite_code: Option<String>) -> Self {
        Self {
            admin_emails: admin_emails
                .into_iter()
                .map(|e| e.trim().to_lowercase())
                .collect(),
            invite_code,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.admin_emails.clone(), config.admin_invite_code.clone())
    }

    pub fn role_for(&self, email: &str, invite_code: Option<&str>) -> Role {
        let email = email.trim().to_lowercase();
        if self.admin_emails.iter().any(|admin| *admin == email) {
            return Role::Admin;
        }

        match (&self.invite_code, invite_code) {
            (Some(expected), Some(given)) if constant_time_eq(expected, given.trim()) => {
                Role::Admin
            }
            _ => Role::Member,
        }
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
