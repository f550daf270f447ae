//! Appointment models.

use serde::{Deserialize, Serialize};

use super::{check_date, check_time, now_rfc3339, ValidationError, ValidationResult};

/// Default visit length in minutes.
pub const DEFAULT_DURATION_MINUTES: u32 = 60;

/// Appointment lifecycle status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    #[default]
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
    Rescheduled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Rescheduled => "rescheduled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(AppointmentStatus::Scheduled),
            "confirmed" => Some(AppointmentStatus::Confirmed),
            "completed" => Some(AppointmentStatus::Completed),
            "cancelled" => Some(AppointmentStatus::Cancelled),
            "rescheduled" => Some(AppointmentStatus::Rescheduled),
            _ => None,
        }
    }

    /// Completed and cancelled visits are final.
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled
        )
    }
}

/// Kind of visit offered by the practice.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum AppointmentType {
    #[serde(rename = "Initial Consultation")]
    InitialConsultation,
    #[default]
    #[serde(rename = "Prenatal Check-up")]
    PrenatalCheckup,
    #[serde(rename = "Postnatal Visit")]
    PostnatalVisit,
    #[serde(rename = "Home Visit")]
    HomeVisit,
    #[serde(rename = "Birth Planning")]
    BirthPlanning,
    #[serde(rename = "Newborn Check")]
    NewbornCheck,
    #[serde(rename = "Lactation Support")]
    LactationSupport,
    #[serde(rename = "Other")]
    Other,
}

impl AppointmentType {
    pub const ALL: [AppointmentType; 8] = [
        AppointmentType::InitialConsultation,
        AppointmentType::PrenatalCheckup,
        AppointmentType::PostnatalVisit,
        AppointmentType::HomeVisit,
        AppointmentType::BirthPlanning,
        AppointmentType::NewbornCheck,
        AppointmentType::LactationSupport,
        AppointmentType::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            AppointmentType::InitialConsultation => "Initial Consultation",
            AppointmentType::PrenatalCheckup => "Prenatal Check-up",
            AppointmentType::PostnatalVisit => "Postnatal Visit",
            AppointmentType::HomeVisit => "Home Visit",
            AppointmentType::BirthPlanning => "Birth Planning",
            AppointmentType::NewbornCheck => "Newborn Check",
            AppointmentType::LactationSupport => "Lactation Support",
            AppointmentType::Other => "Other",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.label() == label)
    }
}

fn default_duration() -> u32 {
    DEFAULT_DURATION_MINUTES
}

/// A scheduled visit for one patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    #[serde(default)]
    pub id: Option<i64>,
    /// Key of the patient this visit belongs to
    pub patient_id: i64,
    /// Visit date (YYYY-MM-DD)
    pub date: String,
    /// Start time (HH:MM)
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default = "default_duration")]
    pub duration_minutes: u32,
    #[serde(default)]
    pub appointment_type: AppointmentType,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub status: AppointmentStatus,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: String,
}

impl Appointment {
    /// Create a new, unsaved appointment with default type and duration.
    pub fn new(patient_id: i64, date: String) -> Self {
        Self {
            id: None,
            patient_id,
            date,
            time: None,
            duration_minutes: DEFAULT_DURATION_MINUTES,
            appointment_type: AppointmentType::default(),
            location: None,
            status: AppointmentStatus::Scheduled,
            notes: None,
            created_at: now_rfc3339(),
        }
    }

    /// Move the visit to a new slot.
    pub fn reschedule(&mut self, date: String, time: Option<String>) {
        self.date = date;
        self.time = time;
        self.status = AppointmentStatus::Rescheduled;
    }

    pub fn validate(&self) -> ValidationResult {
        if self.patient_id <= 0 {
            return Err(ValidationError::new("patient_id", "must reference a saved patient"));
        }
        check_date("date", &self.date)?;
        if let Some(time) = self.time.as_deref().filter(|t| !t.is_empty()) {
            check_time("time", time)?;
        }
        if self.duration_minutes == 0 {
            return Err(ValidationError::new("duration_minutes", "must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_appointment_defaults() {
        let appt = Appointment::new(1, "2024-06-01".into());
        assert_eq!(appt.duration_minutes, 60);
        assert_eq!(appt.appointment_type, AppointmentType::PrenatalCheckup);
        assert_eq!(appt.status, AppointmentStatus::Scheduled);
        assert!(appt.validate().is_ok());
    }

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_string(&AppointmentStatus::Rescheduled).unwrap();
        assert_eq!(json, "\"rescheduled\"");
        assert_eq!(AppointmentStatus::parse("cancelled"), Some(AppointmentStatus::Cancelled));
        assert!(AppointmentStatus::Cancelled.is_closed());
        assert!(!AppointmentStatus::Confirmed.is_closed());
    }

    #[test]
    fn test_type_labels_roundtrip() {
        for t in AppointmentType::ALL {
            assert_eq!(AppointmentType::parse(t.label()), Some(t));
            let json = serde_json::to_string(&t).unwrap();
            assert_eq!(json, format!("\"{}\"", t.label()));
        }
    }

    #[test]
    fn test_reschedule() {
        let mut appt = Appointment::new(1, "2024-06-01".into());
        appt.reschedule("2024-06-03".into(), Some("14:00".into()));
        assert_eq!(appt.date, "2024-06-03");
        assert_eq!(appt.status, AppointmentStatus::Rescheduled);
    }

    #[test]
    fn test_validate() {
        let mut appt = Appointment::new(1, "2024-06-01".into());
        appt.time = Some("9am".into());
        assert_eq!(appt.validate().unwrap_err().field, "time");

        let mut appt = Appointment::new(1, "2024-06-01".into());
        appt.duration_minutes = 0;
        assert_eq!(appt.validate().unwrap_err().field, "duration_minutes");

        let appt = Appointment::new(0, "2024-06-01".into());
        assert_eq!(appt.validate().unwrap_err().field, "patient_id");
    }
}
