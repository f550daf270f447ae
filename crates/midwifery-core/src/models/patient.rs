//! Patient models.

use serde::{Deserialize, Serialize};

use super::{check_optional_date, now_rfc3339, require_text, ValidationResult};

/// An expectant or postnatal client under the practice's care.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    /// Store-assigned key, `None` until first saved
    #[serde(default)]
    pub id: Option<i64>,
    /// Full name
    pub name: String,
    /// Date of birth (YYYY-MM-DD)
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    /// Estimated due date (YYYY-MM-DD)
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub blood_type: Option<String>,
    #[serde(default)]
    pub allergies: Option<String>,
    #[serde(default)]
    pub medical_history: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Creation timestamp
    pub created_at: String,
}

impl Patient {
    /// Create a new, unsaved patient.
    pub fn new(name: String) -> Self {
        Self {
            id: None,
            name,
            date_of_birth: None,
            phone: None,
            email: None,
            address: None,
            due_date: None,
            blood_type: None,
            allergies: None,
            medical_history: None,
            notes: None,
            created_at: now_rfc3339(),
        }
    }

    pub fn validate(&self) -> ValidationResult {
        require_text("name", &self.name)?;
        check_optional_date("date_of_birth", self.date_of_birth.as_deref())?;
        check_optional_date("due_date", self.due_date.as_deref())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_patient() {
        let patient = Patient::new("Jane Doe".into());
        assert_eq!(patient.name, "Jane Doe");
        assert!(patient.id.is_none());
        assert!(chrono::DateTime::parse_from_rfc3339(&patient.created_at).is_ok());
    }

    #[test]
    fn test_validate() {
        let mut patient = Patient::new("Jane Doe".into());
        patient.due_date = Some("2024-09-01".into());
        assert!(patient.validate().is_ok());

        patient.due_date = Some("next autumn".into());
        assert_eq!(patient.validate().unwrap_err().field, "due_date");

        let blank = Patient::new(" ".into());
        assert_eq!(blank.validate().unwrap_err().field, "name");
    }

    #[test]
    fn test_partial_document_deserializes() {
        let patient: Patient = serde_json::from_value(serde_json::json!({
            "name": "Jane Doe",
            "created_at": "2024-01-15T10:00:00Z"
        }))
        .unwrap();
        assert!(patient.phone.is_none());
        assert!(patient.id.is_none());
    }
}
