//! User service.

use super::{Entity, EntityService, ServiceResult};
use crate::models::{normalize_email, Role, SyncEntityType, User, ValidationResult};

pub type UserService<'a> = EntityService<'a, User>;

impl Entity for User {
    const ENTITY_TYPE: SyncEntityType = SyncEntityType::User;

    fn validate(&self) -> ValidationResult {
        User::validate(self)
    }

    fn normalize(&mut self) {
        self.email = normalize_email(&self.email);
    }

    fn keep_created_at(&mut self, stored: &Self) {
        self.created_at = stored.created_at.clone();
    }
}

impl EntityService<'_, User> {
    /// Look up an account by email (case-insensitive).
    pub fn get_by_email(&self, email: &str) -> ServiceResult<Option<User>> {
        let mut users: Vec<User> = self.db.get_by_index("email", normalize_email(email))?;
        Ok(users.pop())
    }

    pub fn list_by_role(&self, role: Role) -> ServiceResult<Vec<User>> {
        Ok(self.db.get_by_index("role", role.as_str())?)
    }
}
