//! Local accounts: registration, password check and role queries.
//!
//! Passwords are hashed with Argon2id using the crate's default parameters
//! and stored as PHC strings. Token issuance is left to the host app.

use argon2::Argon2;
use password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use thiserror::Error;
use tracing::{info, warn};

use crate::db::{Database, DbError};
use crate::models::{normalize_email, Role, User};
use crate::services::{ServiceError, UserService};

/// Account errors.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("User with this email already exists")]
    EmailTaken,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Password must be at least 8 characters")]
    WeakPassword,

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

pub type AuthResult<T> = Result<T, AuthError>;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Hash a password using Argon2id. Returns a PHC-format string.
pub fn hash_password(password: &str) -> AuthResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::Hashing(e.to_string()))?;
    Ok(hash.to_string())
}

/// Verify a password against a PHC-format hash string.
pub fn verify_password(password: &str, hash: &str) -> AuthResult<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| AuthError::Hashing(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Details submitted by a new user.
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub name: String,
    /// Defaults to [`Role::Client`]
    pub role: Option<Role>,
}

/// Editable profile fields. `None` clears phone or address.
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// The signed-in user, without the password hash.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user_id: i64,
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl Session {
    pub fn is_midwife(&self) -> bool {
        self.role == Role::Midwife
    }

    pub fn is_client(&self) -> bool {
        self.role == Role::Client
    }
}

impl TryFrom<&User> for Session {
    type Error = AuthError;

    fn try_from(user: &User) -> Result<Self, Self::Error> {
        let user_id = user
            .id
            .ok_or(AuthError::Service(ServiceError::MissingId))?;
        Ok(Self {
            user_id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
        })
    }
}

/// Registration and login over the users collection.
pub struct AccountService<'a> {
    users: UserService<'a>,
}

impl<'a> AccountService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self {
            users: UserService::new(db),
        }
    }

    /// Create an account. The new user is queued for sync like any other write.
    pub fn register(&self, registration: Registration) -> AuthResult<Session> {
        let email = normalize_email(&registration.email);
        if registration.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }
        if self.users.get_by_email(&email)?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = hash_password(&registration.password)?;
        let mut user = User::new(
            email,
            password_hash,
            registration.name,
            registration.role.unwrap_or_default(),
        );

        // The unique index still guards against a concurrent registration.
        let id = self.users.add(&user).map_err(|e| match e {
            ServiceError::Database(DbError::Constraint(_)) => AuthError::EmailTaken,
            other => AuthError::Service(other),
        })?;
        user.id = Some(id);

        info!(user_id = id, role = user.role.as_str(), "account registered");
        Session::try_from(&user)
    }

    /// Check credentials. Unknown email and wrong password are indistinguishable.
    pub fn login(&self, email: &str, password: &str) -> AuthResult<Session> {
        let user = match self.users.get_by_email(email)? {
            Some(user) => user,
            None => {
                warn!("login attempt for unknown email");
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !verify_password(password, &user.password_hash)? {
            warn!(user_id = ?user.id, "login attempt with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        Session::try_from(&user)
    }

    /// Replace the user's name, phone and address. Returns the refreshed session.
    pub fn update_profile(&self, user_id: i64, profile: ProfileUpdate) -> AuthResult<Session> {
        let mut user = self
            .users
            .get(user_id)?
            .ok_or_else(|| ServiceError::NotFound(format!("user {}", user_id)))?;

        user.name = profile.name.trim().to_string();
        user.phone = profile.phone.filter(|p| !p.trim().is_empty());
        user.address = profile.address.filter(|a| !a.trim().is_empty());
        self.users.update(&user)?;

        info!(user_id, "profile updated");
        Session::try_from(&user)
    }

    /// Change a user's password after checking the current one.
    pub fn change_password(&self, user_id: i64, current: &str, new: &str) -> AuthResult<()> {
        let mut user = self
            .users
            .get(user_id)?
            .ok_or_else(|| ServiceError::NotFound(format!("user {}", user_id)))?;

        if !verify_password(current, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }
        if new.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }

        user.password_hash = hash_password(new)?;
        self.users.update(&user)?;
        Ok(())
    }
}
