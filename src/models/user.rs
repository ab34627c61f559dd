use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Company,
    Student,
    Administrator,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Company => "Company",
            Role::Student => "Student",
            Role::Administrator => "Administrator",
        }
    }

    pub fn parse(raw: &str) -> Option<Role> {
        match raw {
            r if r.eq_ignore_ascii_case("company") => Some(Role::Company),
            r if r.eq_ignore_ascii_case("student") => Some(Role::Student),
            r if r.eq_ignore_ascii_case("administrator") => Some(Role::Administrator),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    /// "First Last" falling back to the username when both are blank.
    pub fn display_name(&self) -> String {
        let full = format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or(""),
            self.last_name.as_deref().unwrap_or("")
        );
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}
