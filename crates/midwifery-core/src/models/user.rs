//! User account models.

use serde::{Deserialize, Serialize};

use super::{now_rfc3339, require_text, ValidationError, ValidationResult};

/// Account role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Midwife,
    #[default]
    Client,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Midwife => "midwife",
            Role::Client => "client",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "midwife" => Some(Role::Midwife),
            "client" => Some(Role::Client),
            _ => None,
        }
    }
}

/// A midwife or client account. Email is unique across the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    #[serde(default)]
    pub id: Option<i64>,
    pub email: String,
    /// Argon2id PHC string, never the plaintext
    pub password_hash: String,
    pub name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    pub created_at: String,
}

impl User {
    /// Create a new, unsaved user. The email is normalized.
    pub fn new(email: String, password_hash: String, name: String, role: Role) -> Self {
        Self {
            id: None,
            email: normalize_email(&email),
            password_hash,
            name,
            role,
            phone: None,
            address: None,
            created_at: now_rfc3339(),
        }
    }

    pub fn validate(&self) -> ValidationResult {
        require_text("email", &self.email)?;
        match self.email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
            _ => return Err(ValidationError::new("email", "not an email address")),
        }
        require_text("password_hash", &self.password_hash)?;
        require_text("name", &self.name)?;
        Ok(())
    }
}

/// Emails are compared trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
