//! Health record models.

use serde::{Deserialize, Serialize};

use super::{check_date, now_rfc3339, require_text, ValidationError, ValidationResult};

/// Vital signs taken during a visit. Every reading is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VitalSigns {
    /// Systolic/diastolic, e.g. "120/80"
    #[serde(default)]
    pub blood_pressure: Option<String>,
    /// Beats per minute
    #[serde(default)]
    pub heart_rate: Option<u32>,
    /// Degrees Celsius
    #[serde(default)]
    pub temperature: Option<f64>,
    /// Breaths per minute
    #[serde(default)]
    pub respiratory_rate: Option<u32>,
    /// Kilograms
    #[serde(default)]
    pub weight: Option<f64>,
    /// Centimetres
    #[serde(default)]
    pub height: Option<f64>,
}

impl VitalSigns {
    pub fn is_empty(&self) -> bool {
        self == &VitalSigns::default()
    }

    /// Parse the blood pressure reading into (systolic, diastolic).
    pub fn blood_pressure_parts(&self) -> Option<(u32, u32)> {
        let (sys, dia) = self.blood_pressure.as_deref()?.split_once('/')?;
        Some((sys.trim().parse().ok()?, dia.trim().parse().ok()?))
    }

    pub fn validate(&self) -> ValidationResult {
        if self.blood_pressure.as_deref().is_some_and(|bp| !bp.is_empty())
            && self.blood_pressure_parts().is_none()
        {
            return Err(ValidationError::new(
                "vital_signs.blood_pressure",
                "expected systolic/diastolic, e.g. 120/80",
            ));
        }
        for (field, value) in [
            ("vital_signs.temperature", self.temperature),
            ("vital_signs.weight", self.weight),
            ("vital_signs.height", self.height),
        ] {
            if value.is_some_and(|v| !v.is_finite() || v <= 0.0) {
                return Err(ValidationError::new(field, "must be a positive number"));
            }
        }
        Ok(())
    }
}

/// A clinical note for one patient visit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthRecord {
    #[serde(default)]
    pub id: Option<i64>,
    pub patient_id: i64,
    /// Visit date (YYYY-MM-DD)
    pub date: String,
    /// Check-up, Prenatal, Postnatal, Ultrasound, Lab Results, Birth, Other
    pub record_type: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub vital_signs: VitalSigns,
    /// Free-text measurements (fundal height, fetal heart rate, ...)
    #[serde(default)]
    pub measurements: Option<String>,
    pub created_at: String,
}

impl HealthRecord {
    /// Create a new, unsaved check-up record.
    pub fn new(patient_id: i64, date: String) -> Self {
        Self {
            id: None,
            patient_id,
            date,
            record_type: "Check-up".to_string(),
            summary: None,
            notes: None,
            vital_signs: VitalSigns::default(),
            measurements: None,
            created_at: now_rfc3339(),
        }
    }

    pub fn validate(&self) -> ValidationResult {
        if self.patient_id <= 0 {
            return Err(ValidationError::new("patient_id", "must reference a saved patient"));
        }
        check_date("date", &self.date)?;
        require_text("record_type", &self.record_type)?;
        self.vital_signs.validate()
    }
}
