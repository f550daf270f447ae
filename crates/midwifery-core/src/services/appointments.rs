//! Appointment service.

use super::{Entity, EntityService, PatientService, ServiceResult};
use crate::auth::Session;
use crate::models::{Appointment, SyncEntityType, ValidationResult};

pub type AppointmentService<'a> = EntityService<'a, Appointment>;

impl Entity for Appointment {
    const ENTITY_TYPE: SyncEntityType = SyncEntityType::Appointment;

    fn validate(&self) -> ValidationResult {
        Appointment::validate(self)
    }

    fn patient_ref(&self) -> Option<i64> {
        Some(self.patient_id)
    }

    fn keep_created_at(&mut self, stored: &Self) {
        self.created_at = stored.created_at.clone();
    }
}

impl EntityService<'_, Appointment> {
    /// All appointments for one patient, in creation order.
    pub fn list_for_patient(&self, patient_id: i64) -> ServiceResult<Vec<Appointment>> {
        Ok(self.db.get_by_index("patient_id", patient_id)?)
    }

    /// What the signed-in user may see: everything for a midwife, only their
    /// own patient's appointments for a client.
    pub fn list_for_session(&self, session: &Session) -> ServiceResult<Vec<Appointment>> {
        if session.is_midwife() {
            return self.get_all();
        }
        let patient = PatientService::new(self.db).find_by_email(&session.email)?;
        match patient.and_then(|p| p.id) {
            Some(patient_id) => self.list_for_patient(patient_id),
            None => Ok(Vec::new()),
        }
    }

    /// Appointments on a given day.
    pub fn list_on_date(&self, date: &str) -> ServiceResult<Vec<Appointment>> {
        Ok(self.db.get_by_index("date", date)?)
    }

    /// Appointments between two dates (inclusive), earliest first.
    pub fn list_between(&self, from: &str, to: &str) -> ServiceResult<Vec<Appointment>> {
        Ok(self.db.get_by_index_range("date", from, to)?)
    }
}
