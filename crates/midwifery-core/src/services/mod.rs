//! Entity services: per-collection CRUD adapters over the record store.
//!
//! Every add, update and delete appends one entry to the sync queue,
//! whether or not the device is online. The entity write and the queue
//! append are separate statements, not one transaction.

mod appointments;
mod health_records;
mod patients;
mod users;

pub use appointments::*;
pub use health_records::*;
pub use patients::*;
pub use users::*;

use std::marker::PhantomData;

use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::db::{Collection, Database, DbError, Record};
use crate::models::{SyncAction, SyncEntityType, ValidationError, ValidationResult};
use crate::sync::SyncQueue;

/// Service-layer errors.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Database(#[from] DbError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Patient {0} does not exist")]
    UnknownPatient(i64),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Record has no id; add it before updating")]
    MissingId,
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// A record type managed by an [`EntityService`].
pub trait Entity: Record + Clone {
    /// Tag written to the sync queue.
    const ENTITY_TYPE: SyncEntityType;

    /// Boundary validation run before every write.
    fn validate(&self) -> ValidationResult;

    /// Patient this record belongs to, if it must reference one.
    fn patient_ref(&self) -> Option<i64> {
        None
    }

    /// Canonicalize fields before every write.
    fn normalize(&mut self) {}

    /// Carry the creation timestamp over from the stored version on update.
    fn keep_created_at(&mut self, stored: &Self);
}

/// CRUD adapter for one collection.
pub struct EntityService<'a, T> {
    db: &'a Database,
    _entity: PhantomData<T>,
}

impl<'a, T: Entity> EntityService<'a, T> {
    pub fn new(db: &'a Database) -> Self {
        Self {
            db,
            _entity: PhantomData,
        }
    }

    pub fn get(&self, id: i64) -> ServiceResult<Option<T>> {
        Ok(self.db.get(id)?)
    }

    pub fn get_all(&self) -> ServiceResult<Vec<T>> {
        Ok(self.db.get_all()?)
    }

    /// Store a new record and queue it. Returns the assigned key.
    pub fn add(&self, record: &T) -> ServiceResult<i64> {
        let mut record = record.clone();
        record.normalize();
        self.check(&record)?;

        let id = self.db.add(&record)?;
        record.set_id(id);

        self.enqueue(SyncAction::Add, serde_json::to_value(&record)?)?;
        info!(entity = T::ENTITY_TYPE.as_str(), id, "record added");
        Ok(id)
    }

    /// Overwrite an existing record and queue it. `created_at` keeps its
    /// stored value.
    pub fn update(&self, record: &T) -> ServiceResult<i64> {
        let id = record.id().ok_or(ServiceError::MissingId)?;
        let mut record = record.clone();
        record.normalize();
        self.check(&record)?;

        let stored: T = self.db.get(id)?.ok_or_else(|| {
            ServiceError::NotFound(format!("{} {}", T::ENTITY_TYPE.as_str(), id))
        })?;
        record.keep_created_at(&stored);

        self.db.put(&record)?;
        self.enqueue(SyncAction::Update, serde_json::to_value(&record)?)?;
        info!(entity = T::ENTITY_TYPE.as_str(), id, "record updated");
        Ok(id)
    }

    /// Remove a record and queue the delete. Dependent records are left alone.
    pub fn delete(&self, id: i64) -> ServiceResult<bool> {
        let removed = self.db.delete::<T>(id)?;
        if !removed {
            debug!(entity = T::ENTITY_TYPE.as_str(), id, "delete of missing record");
        }

        self.enqueue(SyncAction::Delete, json!({ "id": id }))?;
        info!(entity = T::ENTITY_TYPE.as_str(), id, "record deleted");
        Ok(removed)
    }

    pub fn count(&self) -> ServiceResult<usize> {
        Ok(self.db.count(T::COLLECTION)?)
    }

    fn check(&self, record: &T) -> ServiceResult<()> {
        record.validate()?;
        if let Some(patient_id) = record.patient_ref() {
            if !self.db.contains(Collection::Patients, patient_id)? {
                return Err(ServiceError::UnknownPatient(patient_id));
            }
        }
        Ok(())
    }

    fn enqueue(&self, action: SyncAction, payload: Value) -> ServiceResult<()> {
        SyncQueue::new(self.db)
            .record(T::ENTITY_TYPE, action, payload)
            .map_err(|e| {
                error!(
                    entity = T::ENTITY_TYPE.as_str(),
                    action = action.as_str(),
                    error = %e,
                    "record written but not queued for sync"
                );
                e
            })?;
        Ok(())
    }
}
