//! Patient service.

use super::{Entity, EntityService, ServiceResult};
use crate::models::{normalize_email, Patient, SyncEntityType, ValidationResult};

pub type PatientService<'a> = EntityService<'a, Patient>;

impl Entity for Patient {
    const ENTITY_TYPE: SyncEntityType = SyncEntityType::Patient;

    fn validate(&self) -> ValidationResult {
        Patient::validate(self)
    }

    fn normalize(&mut self) {
        self.email = self
            .email
            .as_deref()
            .map(normalize_email)
            .filter(|email| !email.is_empty());
    }

    fn keep_created_at(&mut self, stored: &Self) {
        self.created_at = stored.created_at.clone();
    }
}

impl EntityService<'_, Patient> {
    /// Patients whose name matches exactly.
    pub fn find_by_name(&self, name: &str) -> ServiceResult<Vec<Patient>> {
        Ok(self.db.get_by_index("name", name)?)
    }

    /// Case-insensitive substring match on the name. An empty query matches
    /// everyone.
    pub fn search(&self, query: &str) -> ServiceResult<Vec<Patient>> {
        let needle = query.trim().to_lowercase();
        let mut patients = self.get_all()?;
        if !needle.is_empty() {
            patients.retain(|p| p.name.to_lowercase().contains(&needle));
        }
        Ok(patients)
    }

    /// The patient record linked to a client account by email.
    pub fn find_by_email(&self, email: &str) -> ServiceResult<Option<Patient>> {
        let patients: Vec<Patient> = self.db.get_by_index("email", normalize_email(email))?;
        Ok(patients.into_iter().next())
    }

    /// Patients due between two dates (inclusive), soonest first.
    pub fn list_due_between(&self, from: &str, to: &str) -> ServiceResult<Vec<Patient>> {
        Ok(self.db.get_by_index_range("due_date", from, to)?)
    }
}
