//! Health record service.

use super::{Entity, EntityService, PatientService, ServiceResult};
use crate::auth::Session;
use crate::models::{HealthRecord, SyncEntityType, ValidationResult};

pub type HealthRecordService<'a> = EntityService<'a, HealthRecord>;

impl Entity for HealthRecord {
    const ENTITY_TYPE: SyncEntityType = SyncEntityType::HealthRecord;

    fn validate(&self) -> ValidationResult {
        HealthRecord::validate(self)
    }

    fn patient_ref(&self) -> Option<i64> {
        Some(self.patient_id)
    }

    fn keep_created_at(&mut self, stored: &Self) {
        self.created_at = stored.created_at.clone();
    }
}

impl EntityService<'_, HealthRecord> {
    /// All records for one patient, in creation order.
    pub fn list_for_patient(&self, patient_id: i64) -> ServiceResult<Vec<HealthRecord>> {
        Ok(self.db.get_by_index("patient_id", patient_id)?)
    }

    /// Records the signed-in user may see. Clients only get their own.
    pub fn list_for_session(&self, session: &Session) -> ServiceResult<Vec<HealthRecord>> {
        if session.is_midwife() {
            return self.get_all();
        }
        let patient = PatientService::new(self.db).find_by_email(&session.email)?;
        match patient.and_then(|p| p.id) {
            Some(patient_id) => self.list_for_patient(patient_id),
            None => Ok(Vec::new()),
        }
    }

    pub fn list_on_date(&self, date: &str) -> ServiceResult<Vec<HealthRecord>> {
        Ok(self.db.get_by_index("date", date)?)
    }
}
