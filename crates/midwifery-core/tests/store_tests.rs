//! Record store and entity service integration tests.

use midwifery_core::db::{Collection, Database, DbError};
use midwifery_core::models::{Appointment, HealthRecord, Patient, SyncAction, SyncEntityType};
use midwifery_core::services::{AppointmentService, HealthRecordService, PatientService};
use midwifery_core::sync::SyncQueue;
use proptest::prelude::*;

fn patient(name: &str) -> Patient {
    Patient::new(name.to_string())
}

#[test]
fn test_added_patient_is_listed() {
    let db = Database::open_in_memory().unwrap();
    let service = PatientService::new(&db);

    service.add(&patient("Jane Doe")).unwrap();

    let all = service.get_all().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].name, "Jane Doe");
    assert!(all[0].id.is_some());
}

#[test]
fn test_appointment_found_by_patient_index() {
    let db = Database::open_in_memory().unwrap();
    let patient_id = PatientService::new(&db).add(&patient("Jane Doe")).unwrap();
    let other_id = PatientService::new(&db).add(&patient("Mary Major")).unwrap();

    let appointments = AppointmentService::new(&db);
    let appt_id = appointments
        .add(&Appointment::new(patient_id, "2024-06-01".into()))
        .unwrap();
    appointments
        .add(&Appointment::new(other_id, "2024-06-02".into()))
        .unwrap();

    let found: Vec<Appointment> = db.get_by_index("patient_id", patient_id).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, Some(appt_id));

    assert_eq!(appointments.list_for_patient(patient_id).unwrap(), found);
}

#[test]
fn test_patient_delete_leaves_dependents() {
    let db = Database::open_in_memory().unwrap();
    let patient_id = PatientService::new(&db).add(&patient("Jane Doe")).unwrap();
    AppointmentService::new(&db)
        .add(&Appointment::new(patient_id, "2024-06-01".into()))
        .unwrap();
    HealthRecordService::new(&db)
        .add(&HealthRecord::new(patient_id, "2024-06-01".into()))
        .unwrap();

    assert!(PatientService::new(&db).delete(patient_id).unwrap());

    assert_eq!(db.count(Collection::Patients).unwrap(), 0);
    assert_eq!(db.count(Collection::Appointments).unwrap(), 1);
    assert_eq!(db.count(Collection::HealthRecords).unwrap(), 1);
}

#[test]
fn test_queue_preserves_mutation_order() {
    let db = Database::open_in_memory().unwrap();
    let service = PatientService::new(&db);

    let id = service.add(&patient("Jane Doe")).unwrap();
    let mut stored = service.get(id).unwrap().unwrap();
    stored.phone = Some("555-0100".into());
    service.update(&stored).unwrap();
    service.delete(id).unwrap();

    let entries = SyncQueue::new(&db).get_all().unwrap();
    let actions: Vec<SyncAction> = entries.iter().map(|e| e.action).collect();
    assert_eq!(
        actions,
        vec![SyncAction::Add, SyncAction::Update, SyncAction::Delete]
    );
    assert!(entries
        .iter()
        .all(|e| e.entity_type == SyncEntityType::Patient && e.entity_id() == Some(id)));
    assert!(entries.windows(2).all(|w| w[0].id < w[1].id));
}

#[test]
fn test_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("midwifery.db");

    let id = {
        let db = Database::open(&path).unwrap();
        PatientService::new(&db).add(&patient("Jane Doe")).unwrap()
    };

    let db = Database::open(&path).unwrap();
    let stored = PatientService::new(&db).get(id).unwrap().unwrap();
    assert_eq!(stored.name, "Jane Doe");
    assert_eq!(SyncQueue::new(&db).len().unwrap(), 1);
}

#[test]
fn test_add_with_taken_key_is_constraint_error() {
    let db = Database::open_in_memory().unwrap();
    let id = db.add(&patient("Jane Doe")).unwrap();

    let mut clash = patient("Mary Major");
    clash.id = Some(id);
    assert!(matches!(db.add(&clash), Err(DbError::Constraint(_))));

    // put overwrites instead
    db.put(&clash).unwrap();
    let stored: Patient = db.get(id).unwrap().unwrap();
    assert_eq!(stored.name, "Mary Major");
}

proptest! {
    #[test]
    fn prop_put_then_get_returns_record(
        name in "[A-Za-z][A-Za-z ]{0,30}",
        notes in proptest::option::of(".{0,64}"),
    ) {
        let db = Database::open_in_memory().unwrap();
        let mut record = patient(&name);
        record.notes = notes;

        let id = db.put(&record).unwrap();
        record.id = Some(id);

        let stored: Option<Patient> = db.get(id).unwrap();
        prop_assert_eq!(stored, Some(record));
    }

    #[test]
    fn prop_index_lookup_matches_filter(patient_ids in proptest::collection::vec(1i64..4, 0..20)) {
        let db = Database::open_in_memory().unwrap();
        for id in &patient_ids {
            db.add(&Appointment::new(*id, "2024-06-01".into())).unwrap();
        }

        for wanted in 1i64..4 {
            let found: Vec<Appointment> = db.get_by_index("patient_id", wanted).unwrap();
            let expected = patient_ids.iter().filter(|id| **id == wanted).count();
            prop_assert_eq!(found.len(), expected);
            prop_assert!(found.iter().all(|a| a.patient_id == wanted));
        }
    }
}
