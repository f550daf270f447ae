//! Midwifery Core Library
//!
//! Offline-first storage for a midwifery practice app: patients,
//! appointments, health records and user accounts live on the device, and
//! every change is queued for a later server sync.
//!
//! # Architecture
//!
//! ```text
//!   Mobile shell (Swift / Kotlin)
//!            │  UniFFI
//!            ▼
//!     MidwiferyCore ──────────────── AppContext (config, session)
//!            │                              │
//!            ▼                              ▼
//!   Entity Services ──append──▶ Sync Queue ◀──drain── Network Monitor
//!            │                      │                 (Offline → Online)
//!            └──────────┬───────────┘
//!                       ▼
//!                 Record Store (SQLite)
//! ```
//!
//! # Core Principle
//!
//! **Writes never wait for the network.** Every add, update and delete lands
//! in the local store and appends one sync-queue entry, online or not.
//!
//! # Modules
//!
//! - [`db`]: Record store with keyed collections and secondary indexes
//! - [`models`]: Domain types (Patient, Appointment, HealthRecord, User, SyncQueueEntry)
//! - [`services`]: Per-entity CRUD adapters that feed the sync queue
//! - [`sync`]: Sync queue and connectivity monitor
//! - [`auth`]: Local accounts and password hashing
//! - [`context`]: Explicit application state
//! - [`config`]: TOML configuration

pub mod auth;
pub mod config;
pub mod context;
pub mod db;
pub mod models;
pub mod services;
pub mod sync;

// Re-export commonly used types
pub use auth::{AccountService, AuthError, ProfileUpdate, Registration, Session};
pub use config::CoreConfig;
pub use context::AppContext;
pub use db::{Collection, Database, DbError};
pub use models::{
    Appointment, AppointmentStatus, AppointmentType, HealthRecord, Patient, Role,
    SyncAction, SyncEntityType, SyncQueueEntry, User, VitalSigns,
};
pub use services::{
    AppointmentService, HealthRecordService, PatientService, ServiceError, UserService,
};
pub use sync::{Connectivity, DrainOutcome, NetworkMonitor, SyncQueue};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, PoisonError};

use tracing_subscriber::EnvFilter;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum MidwiferyError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Auth error: {0}")]
    AuthError(String),

    #[error("Config error: {0}")]
    ConfigError(String),
}

impl From<db::DbError> for MidwiferyError {
    fn from(e: db::DbError) -> Self {
        match e {
            db::DbError::NotFound(what) => MidwiferyError::NotFound(what),
            other => MidwiferyError::DatabaseError(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for MidwiferyError {
    fn from(e: serde_json::Error) -> Self {
        MidwiferyError::SerializationError(e.to_string())
    }
}

impl From<ServiceError> for MidwiferyError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Database(e) => e.into(),
            ServiceError::Json(e) => e.into(),
            ServiceError::NotFound(what) => MidwiferyError::NotFound(what),
            other => MidwiferyError::InvalidInput(other.to_string()),
        }
    }
}

impl From<AuthError> for MidwiferyError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Service(e) => e.into(),
            other => MidwiferyError::AuthError(other.to_string()),
        }
    }
}

impl From<config::ConfigError> for MidwiferyError {
    fn from(e: config::ConfigError) -> Self {
        MidwiferyError::ConfigError(e.to_string())
    }
}

impl<T> From<PoisonError<T>> for MidwiferyError {
    fn from(e: PoisonError<T>) -> Self {
        MidwiferyError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Install a fmt subscriber for `tracing` output. Later calls are no-ops.
#[uniffi::export]
pub fn init_logging(filter: Option<String>) {
    let filter = filter
        .map(EnvFilter::new)
        .unwrap_or_else(|| EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Open or create the store under `data_dir`.
///
/// `config_toml` is the contents of `midwifery.toml`, if the host ships one.
#[uniffi::export]
pub fn open_core(
    data_dir: String,
    config_toml: Option<String>,
    online: bool,
) -> Result<Arc<MidwiferyCore>, MidwiferyError> {
    let config = match config_toml {
        Some(toml) => CoreConfig::from_toml(&toml)?,
        None => CoreConfig::default(),
    };
    let ctx = AppContext::open(data_dir, config, Connectivity::from_online(online))?;
    Ok(Arc::new(MidwiferyCore { ctx }))
}

/// Create an in-memory store (for testing).
#[uniffi::export]
pub fn open_core_in_memory(online: bool) -> Result<Arc<MidwiferyCore>, MidwiferyError> {
    let db = Database::open_in_memory()?;
    let ctx = AppContext::with_database(db, CoreConfig::default(), Connectivity::from_online(online));
    Ok(Arc::new(MidwiferyCore { ctx }))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe entry point for the mobile shell.
#[derive(uniffi::Object)]
pub struct MidwiferyCore {
    ctx: AppContext,
}

impl MidwiferyCore {
    fn with_db<R>(
        &self,
        f: impl FnOnce(&Database) -> Result<R, MidwiferyError>,
    ) -> Result<R, MidwiferyError> {
        let db = self.ctx.db()?;
        f(&db)
    }

    fn require_session(&self) -> Result<Session, MidwiferyError> {
        self.ctx
            .session()
            .ok_or_else(|| AuthError::NotSignedIn.into())
    }
}

#[uniffi::export]
impl MidwiferyCore {
    // =========================================================================
    // Patient Operations
    // =========================================================================

    /// Add a patient. Returns the assigned id.
    pub fn add_patient(&self, patient: FfiPatient) -> Result<i64, MidwiferyError> {
        self.with_db(|db| Ok(PatientService::new(db).add(&patient.into())?))
    }

    pub fn update_patient(&self, patient: FfiPatient) -> Result<(), MidwiferyError> {
        self.with_db(|db| {
            PatientService::new(db).update(&patient.into())?;
            Ok(())
        })
    }

    pub fn get_patient(&self, id: i64) -> Result<Option<FfiPatient>, MidwiferyError> {
        self.with_db(|db| Ok(PatientService::new(db).get(id)?.map(Into::into)))
    }

    pub fn list_patients(&self) -> Result<Vec<FfiPatient>, MidwiferyError> {
        self.with_db(|db| {
            let patients = PatientService::new(db).get_all()?;
            Ok(patients.into_iter().map(Into::into).collect())
        })
    }

    pub fn find_patients_by_name(&self, name: String) -> Result<Vec<FfiPatient>, MidwiferyError> {
        self.with_db(|db| {
            let patients = PatientService::new(db).find_by_name(&name)?;
            Ok(patients.into_iter().map(Into::into).collect())
        })
    }

    /// Case-insensitive name search.
    pub fn search_patients(&self, query: String) -> Result<Vec<FfiPatient>, MidwiferyError> {
        self.with_db(|db| {
            let patients = PatientService::new(db).search(&query)?;
            Ok(patients.into_iter().map(Into::into).collect())
        })
    }

    /// Delete a patient. Their appointments and records are kept.
    pub fn delete_patient(&self, id: i64) -> Result<bool, MidwiferyError> {
        self.with_db(|db| Ok(PatientService::new(db).delete(id)?))
    }

    // =========================================================================
    // Appointment Operations
    // =========================================================================

    pub fn add_appointment(&self, appointment: FfiAppointment) -> Result<i64, MidwiferyError> {
        let appointment = Appointment::try_from(appointment)?;
        self.with_db(|db| Ok(AppointmentService::new(db).add(&appointment)?))
    }

    pub fn update_appointment(&self, appointment: FfiAppointment) -> Result<(), MidwiferyError> {
        let appointment = Appointment::try_from(appointment)?;
        self.with_db(|db| {
            AppointmentService::new(db).update(&appointment)?;
            Ok(())
        })
    }

    pub fn get_appointment(&self, id: i64) -> Result<Option<FfiAppointment>, MidwiferyError> {
        self.with_db(|db| Ok(AppointmentService::new(db).get(id)?.map(Into::into)))
    }

    pub fn list_appointments(&self) -> Result<Vec<FfiAppointment>, MidwiferyError> {
        self.with_db(|db| {
            let appointments = AppointmentService::new(db).get_all()?;
            Ok(appointments.into_iter().map(Into::into).collect())
        })
    }

    pub fn list_appointments_for_patient(
        &self,
        patient_id: i64,
    ) -> Result<Vec<FfiAppointment>, MidwiferyError> {
        self.with_db(|db| {
            let appointments = AppointmentService::new(db).list_for_patient(patient_id)?;
            Ok(appointments.into_iter().map(Into::into).collect())
        })
    }

    pub fn delete_appointment(&self, id: i64) -> Result<bool, MidwiferyError> {
        self.with_db(|db| Ok(AppointmentService::new(db).delete(id)?))
    }

    // =========================================================================
    // Health Record Operations
    // =========================================================================

    pub fn add_health_record(&self, record: FfiHealthRecord) -> Result<i64, MidwiferyError> {
        self.with_db(|db| Ok(HealthRecordService::new(db).add(&record.into())?))
    }

    pub fn update_health_record(&self, record: FfiHealthRecord) -> Result<(), MidwiferyError> {
        self.with_db(|db| {
            HealthRecordService::new(db).update(&record.into())?;
            Ok(())
        })
    }

    pub fn get_health_record(&self, id: i64) -> Result<Option<FfiHealthRecord>, MidwiferyError> {
        self.with_db(|db| Ok(HealthRecordService::new(db).get(id)?.map(Into::into)))
    }

    pub fn list_health_records_for_patient(
        &self,
        patient_id: i64,
    ) -> Result<Vec<FfiHealthRecord>, MidwiferyError> {
        self.with_db(|db| {
            let records = HealthRecordService::new(db).list_for_patient(patient_id)?;
            Ok(records.into_iter().map(Into::into).collect())
        })
    }

    pub fn delete_health_record(&self, id: i64) -> Result<bool, MidwiferyError> {
        self.with_db(|db| Ok(HealthRecordService::new(db).delete(id)?))
    }

    // =========================================================================
    // Account Operations
    // =========================================================================

    /// Register and sign in. `role` is "midwife" or "client" (default).
    pub fn register(
        &self,
        email: String,
        password: String,
        name: String,
        role: Option<String>,
    ) -> Result<FfiSession, MidwiferyError> {
        let role = role
            .map(|r| {
                Role::parse(&r).ok_or_else(|| MidwiferyError::InvalidInput(format!("Unknown role: {}", r)))
            })
            .transpose()?;
        let session = self.with_db(|db| {
            Ok(AccountService::new(db).register(Registration {
                email,
                password,
                name,
                role,
            })?)
        })?;
        self.ctx.set_session(Some(session.clone()));
        Ok(session.into())
    }

    pub fn login(&self, email: String, password: String) -> Result<FfiSession, MidwiferyError> {
        let session = self.with_db(|db| Ok(AccountService::new(db).login(&email, &password)?))?;
        self.ctx.set_session(Some(session.clone()));
        Ok(session.into())
    }

    pub fn logout(&self) {
        self.ctx.set_session(None);
    }

    pub fn current_session(&self) -> Option<FfiSession> {
        self.ctx.session().map(Into::into)
    }

    pub fn current_profile(&self) -> Result<FfiProfile, MidwiferyError> {
        let session = self.require_session()?;
        self.with_db(|db| {
            let user = UserService::new(db)
                .get(session.user_id)?
                .ok_or_else(|| MidwiferyError::NotFound(format!("user {}", session.user_id)))?;
            Ok(user.into())
        })
    }

    /// Edit the signed-in user's name, phone and address.
    pub fn update_profile(
        &self,
        name: String,
        phone: Option<String>,
        address: Option<String>,
    ) -> Result<FfiSession, MidwiferyError> {
        let user_id = self.require_session()?.user_id;
        let session = self.with_db(|db| {
            Ok(AccountService::new(db).update_profile(
                user_id,
                ProfileUpdate {
                    name,
                    phone,
                    address,
                },
            )?)
        })?;
        self.ctx.set_session(Some(session.clone()));
        Ok(session.into())
    }

    pub fn change_password(&self, current: String, new: String) -> Result<(), MidwiferyError> {
        let user_id = self.require_session()?.user_id;
        self.with_db(|db| {
            AccountService::new(db).change_password(user_id, &current, &new)?;
            Ok(())
        })
    }

    // =========================================================================
    // Signed-in Views
    // =========================================================================

    /// The patient record linked to the signed-in user's email, if any.
    pub fn my_patient(&self) -> Result<Option<FfiPatient>, MidwiferyError> {
        let session = self.require_session()?;
        self.with_db(|db| {
            Ok(PatientService::new(db)
                .find_by_email(&session.email)?
                .map(Into::into))
        })
    }

    /// All appointments for a midwife; a client's own otherwise.
    pub fn my_appointments(&self) -> Result<Vec<FfiAppointment>, MidwiferyError> {
        let session = self.require_session()?;
        self.with_db(|db| {
            let appointments = AppointmentService::new(db).list_for_session(&session)?;
            Ok(appointments.into_iter().map(Into::into).collect())
        })
    }

    pub fn my_health_records(&self) -> Result<Vec<FfiHealthRecord>, MidwiferyError> {
        let session = self.require_session()?;
        self.with_db(|db| {
            let records = HealthRecordService::new(db).list_for_session(&session)?;
            Ok(records.into_iter().map(Into::into).collect())
        })
    }

    // =========================================================================
    // Sync Queue Operations
    // =========================================================================

    /// Entries still waiting for the next drain, oldest first.
    pub fn pending_sync_entries(&self) -> Result<Vec<FfiSyncEntry>, MidwiferyError> {
        self.with_db(|db| {
            let entries = SyncQueue::new(db).get_all()?;
            entries.into_iter().map(FfiSyncEntry::try_from).collect()
        })
    }

    pub fn pending_sync_count(&self) -> Result<u64, MidwiferyError> {
        self.with_db(|db| Ok(SyncQueue::new(db).len()? as u64))
    }

    pub fn is_online(&self) -> bool {
        self.ctx.monitor().is_online()
    }
}

#[uniffi::export(async_runtime = "tokio")]
impl MidwiferyCore {
    /// Report a connectivity change from the platform. A reconnect drains the
    /// sync queue; the returned outcome says what happened.
    pub async fn set_online(&self, online: bool) -> FfiDrainOutcome {
        match self
            .ctx
            .monitor()
            .set_connectivity(Connectivity::from_online(online))
        {
            Some(handle) => match handle.await {
                Ok(outcome) => outcome.into(),
                Err(e) => FfiDrainOutcome::Failed {
                    reason: e.to_string(),
                },
            },
            None => FfiDrainOutcome::NotTriggered,
        }
    }

    /// Drain the sync queue now, if online.
    pub async fn sync_now(&self) -> FfiDrainOutcome {
        self.ctx.monitor().drain().await.into()
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe patient.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatient {
    pub id: Option<i64>,
    pub name: String,
    pub date_of_birth: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub due_date: Option<String>,
    pub blood_type: Option<String>,
    pub allergies: Option<String>,
    pub medical_history: Option<String>,
    pub notes: Option<String>,
    pub created_at: Option<String>,
}

impl From<Patient> for FfiPatient {
    fn from(patient: Patient) -> Self {
        Self {
            id: patient.id,
            name: patient.name,
            date_of_birth: patient.date_of_birth,
            phone: patient.phone,
            email: patient.email,
            address: patient.address,
            due_date: patient.due_date,
            blood_type: patient.blood_type,
            allergies: patient.allergies,
            medical_history: patient.medical_history,
            notes: patient.notes,
            created_at: Some(patient.created_at),
        }
    }
}

impl From<FfiPatient> for Patient {
    fn from(p: FfiPatient) -> Self {
        let mut patient = Patient::new(p.name);
        patient.id = p.id;
        patient.date_of_birth = p.date_of_birth;
        patient.phone = p.phone;
        patient.email = p.email;
        patient.address = p.address;
        patient.due_date = p.due_date;
        patient.blood_type = p.blood_type;
        patient.allergies = p.allergies;
        patient.medical_history = p.medical_history;
        patient.notes = p.notes;
        if let Some(created_at) = p.created_at {
            patient.created_at = created_at;
        }
        patient
    }
}

/// FFI-safe appointment. Type and status travel as their display strings.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAppointment {
    pub id: Option<i64>,
    pub patient_id: i64,
    pub date: String,
    pub time: Option<String>,
    pub duration_minutes: u32,
    pub appointment_type: String,
    pub location: Option<String>,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: Option<String>,
}

impl From<Appointment> for FfiAppointment {
    fn from(a: Appointment) -> Self {
        Self {
            id: a.id,
            patient_id: a.patient_id,
            date: a.date,
            time: a.time,
            duration_minutes: a.duration_minutes,
            appointment_type: a.appointment_type.label().to_string(),
            location: a.location,
            status: a.status.as_str().to_string(),
            notes: a.notes,
            created_at: Some(a.created_at),
        }
    }
}

impl TryFrom<FfiAppointment> for Appointment {
    type Error = MidwiferyError;

    fn try_from(a: FfiAppointment) -> Result<Self, Self::Error> {
        let appointment_type = AppointmentType::parse(&a.appointment_type).ok_or_else(|| {
            MidwiferyError::InvalidInput(format!("Unknown appointment type: {}", a.appointment_type))
        })?;
        let status = AppointmentStatus::parse(&a.status).ok_or_else(|| {
            MidwiferyError::InvalidInput(format!("Unknown appointment status: {}", a.status))
        })?;

        let mut appointment = Appointment::new(a.patient_id, a.date);
        appointment.id = a.id;
        appointment.time = a.time;
        appointment.duration_minutes = a.duration_minutes;
        appointment.appointment_type = appointment_type;
        appointment.location = a.location;
        appointment.status = status;
        appointment.notes = a.notes;
        if let Some(created_at) = a.created_at {
            appointment.created_at = created_at;
        }
        Ok(appointment)
    }
}

/// FFI-safe vital signs.
#[derive(Debug, Clone, Default, uniffi::Record)]
pub struct FfiVitalSigns {
    pub blood_pressure: Option<String>,
    pub heart_rate: Option<u32>,
    pub temperature: Option<f64>,
    pub respiratory_rate: Option<u32>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
}

impl From<VitalSigns> for FfiVitalSigns {
    fn from(v: VitalSigns) -> Self {
        Self {
            blood_pressure: v.blood_pressure,
            heart_rate: v.heart_rate,
            temperature: v.temperature,
            respiratory_rate: v.respiratory_rate,
            weight: v.weight,
            height: v.height,
        }
    }
}

impl From<FfiVitalSigns> for VitalSigns {
    fn from(v: FfiVitalSigns) -> Self {
        Self {
            blood_pressure: v.blood_pressure,
            heart_rate: v.heart_rate,
            temperature: v.temperature,
            respiratory_rate: v.respiratory_rate,
            weight: v.weight,
            height: v.height,
        }
    }
}

/// FFI-safe health record.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiHealthRecord {
    pub id: Option<i64>,
    pub patient_id: i64,
    pub date: String,
    pub record_type: String,
    pub summary: Option<String>,
    pub notes: Option<String>,
    pub vital_signs: FfiVitalSigns,
    pub measurements: Option<String>,
    pub created_at: Option<String>,
}

impl From<HealthRecord> for FfiHealthRecord {
    fn from(r: HealthRecord) -> Self {
        Self {
            id: r.id,
            patient_id: r.patient_id,
            date: r.date,
            record_type: r.record_type,
            summary: r.summary,
            notes: r.notes,
            vital_signs: r.vital_signs.into(),
            measurements: r.measurements,
            created_at: Some(r.created_at),
        }
    }
}

impl From<FfiHealthRecord> for HealthRecord {
    fn from(r: FfiHealthRecord) -> Self {
        let mut record = HealthRecord::new(r.patient_id, r.date);
        record.id = r.id;
        record.record_type = r.record_type;
        record.summary = r.summary;
        record.notes = r.notes;
        record.vital_signs = r.vital_signs.into();
        record.measurements = r.measurements;
        if let Some(created_at) = r.created_at {
            record.created_at = created_at;
        }
        record
    }
}

/// FFI-safe signed-in user.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSession {
    pub user_id: i64,
    pub email: String,
    pub name: String,
    pub role: String,
}

impl From<Session> for FfiSession {
    fn from(s: Session) -> Self {
        Self {
            user_id: s.user_id,
            email: s.email,
            name: s.name,
            role: s.role.as_str().to_string(),
        }
    }
}

/// FFI-safe account profile, without the password hash.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiProfile {
    pub user_id: Option<i64>,
    pub email: String,
    pub name: String,
    pub role: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl From<User> for FfiProfile {
    fn from(u: User) -> Self {
        Self {
            user_id: u.id,
            email: u.email,
            name: u.name,
            role: u.role.as_str().to_string(),
            phone: u.phone,
            address: u.address,
        }
    }
}

/// FFI-safe sync queue entry. The payload is a JSON string.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSyncEntry {
    pub id: i64,
    pub entity_type: String,
    pub action: String,
    pub payload_json: String,
    pub timestamp: String,
}

impl TryFrom<SyncQueueEntry> for FfiSyncEntry {
    type Error = MidwiferyError;

    fn try_from(entry: SyncQueueEntry) -> Result<Self, Self::Error> {
        Ok(Self {
            id: entry
                .id
                .ok_or_else(|| MidwiferyError::DatabaseError("Queue entry without id".into()))?,
            entity_type: entry.entity_type.as_str().to_string(),
            action: entry.action.as_str().to_string(),
            payload_json: serde_json::to_string(&entry.payload)?,
            timestamp: entry.timestamp,
        })
    }
}

/// FFI-safe drain outcome.
#[derive(Debug, Clone, PartialEq, uniffi::Enum)]
pub enum FfiDrainOutcome {
    /// The event did not start a drain (no reconnect, or auto-drain disabled).
    NotTriggered,
    SkippedOffline,
    Empty,
    Drained { cleared: u64 },
    Failed { reason: String },
}

impl From<DrainOutcome> for FfiDrainOutcome {
    fn from(outcome: DrainOutcome) -> Self {
        match outcome {
            DrainOutcome::SkippedOffline => FfiDrainOutcome::SkippedOffline,
            DrainOutcome::Empty => FfiDrainOutcome::Empty,
            DrainOutcome::Drained { cleared } => FfiDrainOutcome::Drained {
                cleared: cleared as u64,
            },
            DrainOutcome::Failed(reason) => FfiDrainOutcome::Failed { reason },
        }
    }
}
