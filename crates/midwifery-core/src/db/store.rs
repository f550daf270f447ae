//! Generic keyed record operations over the collections.

use std::fmt;

use rusqlite::types::{ToSqlOutput, Value as SqlValue};
use rusqlite::{params_from_iter, OptionalExtension, ToSql};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use super::{Database, DbError, DbResult};
use crate::models::{Appointment, HealthRecord, Patient, SyncQueueEntry, User};

/// The named collections of the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Patients,
    Appointments,
    HealthRecords,
    Users,
    SyncQueue,
}

impl Collection {
    pub const ALL: [Collection; 5] = [
        Collection::Patients,
        Collection::Appointments,
        Collection::HealthRecords,
        Collection::Users,
        Collection::SyncQueue,
    ];

    /// Backing table name.
    pub fn table(&self) -> &'static str {
        match self {
            Collection::Patients => "patients",
            Collection::Appointments => "appointments",
            Collection::HealthRecords => "health_records",
            Collection::Users => "users",
            Collection::SyncQueue => "sync_queue",
        }
    }

    /// Secondary indexes. Each name is both the record field and the column.
    pub fn indexes(&self) -> &'static [&'static str] {
        match self {
            Collection::Patients => &["name", "due_date", "email"],
            Collection::Appointments => &["patient_id", "date"],
            Collection::HealthRecords => &["patient_id", "date"],
            Collection::Users => &["email", "role"],
            Collection::SyncQueue => &[],
        }
    }

    pub fn has_index(&self, index: &str) -> bool {
        self.indexes().contains(&index)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// A value looked up through a secondary index.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexKey {
    Int(i64),
    Text(String),
}

impl From<i64> for IndexKey {
    fn from(v: i64) -> Self {
        IndexKey::Int(v)
    }
}

impl From<&str> for IndexKey {
    fn from(v: &str) -> Self {
        IndexKey::Text(v.to_string())
    }
}

impl From<String> for IndexKey {
    fn from(v: String) -> Self {
        IndexKey::Text(v)
    }
}

impl ToSql for IndexKey {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            IndexKey::Int(v) => v.to_sql(),
            IndexKey::Text(v) => v.to_sql(),
        }
    }
}

/// A type persisted in exactly one collection under an integer key.
pub trait Record: Serialize + DeserializeOwned {
    const COLLECTION: Collection;

    /// Key, or `None` until the store has assigned one.
    fn id(&self) -> Option<i64>;

    fn set_id(&mut self, id: i64);
}

macro_rules! impl_record {
    ($($ty:ty => $collection:expr),* $(,)?) => {$(
        impl Record for $ty {
            const COLLECTION: Collection = $collection;

            fn id(&self) -> Option<i64> {
                self.id
            }

            fn set_id(&mut self, id: i64) {
                self.id = Some(id);
            }
        }
    )*};
}

impl_record! {
    Patient => Collection::Patients,
    Appointment => Collection::Appointments,
    HealthRecord => Collection::HealthRecords,
    User => Collection::Users,
    SyncQueueEntry => Collection::SyncQueue,
}

impl Database {
    /// Get a record by key.
    pub fn get<T: Record>(&self, id: i64) -> DbResult<Option<T>> {
        let sql = format!(
            "SELECT id, body FROM {} WHERE id = ?1",
            T::COLLECTION.table()
        );
        let row: Option<(i64, String)> = self
            .conn
            .query_row(&sql, [id], |row| Ok((row.get(0)?, row.get(1)?)))
            .optional()?;

        row.map(|(id, body)| decode(id, &body)).transpose()
    }

    /// All records of a collection in key order.
    pub fn get_all<T: Record>(&self) -> DbResult<Vec<T>> {
        let sql = format!("SELECT id, body FROM {} ORDER BY id", T::COLLECTION.table());
        self.query_records(&sql, [])
    }

    /// Records whose indexed field equals `key`, in key order.
    pub fn get_by_index<T: Record>(
        &self,
        index: &str,
        key: impl Into<IndexKey>,
    ) -> DbResult<Vec<T>> {
        let collection = T::COLLECTION;
        if !collection.has_index(index) {
            return Err(DbError::Constraint(format!(
                "{} has no index named '{}'",
                collection, index
            )));
        }

        let sql = format!(
            "SELECT id, body FROM {} WHERE {} = ?1 ORDER BY id",
            collection.table(),
            index
        );
        let key: IndexKey = key.into();
        self.query_records(&sql, [key])
    }

    /// Records whose indexed field lies in `lower..=upper`, ordered by that field.
    pub fn get_by_index_range<T: Record>(
        &self,
        index: &str,
        lower: impl Into<IndexKey>,
        upper: impl Into<IndexKey>,
    ) -> DbResult<Vec<T>> {
        let collection = T::COLLECTION;
        if !collection.has_index(index) {
            return Err(DbError::Constraint(format!(
                "{} has no index named '{}'",
                collection, index
            )));
        }

        let sql = format!(
            "SELECT id, body FROM {table} WHERE {index} BETWEEN ?1 AND ?2 ORDER BY {index}, id",
            table = collection.table(),
            index = index
        );
        let bounds: [IndexKey; 2] = [lower.into(), upper.into()];
        self.query_records(&sql, bounds)
    }

    /// Insert a new record. Fails if the record carries a key that is taken.
    pub fn add<T: Record>(&self, record: &T) -> DbResult<i64> {
        let encoded = encode(record)?;
        let id = encoded.id;
        let sql = insert_sql(T::COLLECTION, false);
        self.conn.execute(&sql, params_from_iter(encoded.params()))?;
        Ok(id.unwrap_or_else(|| self.conn.last_insert_rowid()))
    }

    /// Insert a record, or overwrite the existing record with the same key.
    pub fn put<T: Record>(&self, record: &T) -> DbResult<i64> {
        let encoded = encode(record)?;
        let id = encoded.id;
        let sql = insert_sql(T::COLLECTION, true);
        self.conn.execute(&sql, params_from_iter(encoded.params()))?;
        Ok(id.unwrap_or_else(|| self.conn.last_insert_rowid()))
    }

    /// Delete a record by key.
    pub fn delete<T: Record>(&self, id: i64) -> DbResult<bool> {
        let sql = format!("DELETE FROM {} WHERE id = ?1", T::COLLECTION.table());
        let rows_affected = self.conn.execute(&sql, [id])?;
        Ok(rows_affected > 0)
    }

    /// Check whether a key is present in a collection.
    pub fn contains(&self, collection: Collection, id: i64) -> DbResult<bool> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE id = ?1", collection.table());
        let count: i64 = self.conn.query_row(&sql, [id], |row| row.get(0))?;
        Ok(count > 0)
    }

    /// Remove every record from a collection, returning how many were removed.
    pub fn clear(&self, collection: Collection) -> DbResult<usize> {
        let sql = format!("DELETE FROM {}", collection.table());
        Ok(self.conn.execute(&sql, [])?)
    }

    /// Number of records in a collection.
    pub fn count(&self, collection: Collection) -> DbResult<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", collection.table());
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn query_records<T: Record, P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
    ) -> DbResult<Vec<T>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, body) = row?;
            records.push(decode(id, &body)?);
        }
        Ok(records)
    }
}

/// A record split into its key, index columns and JSON body.
struct EncodedRecord {
    id: Option<i64>,
    columns: Vec<SqlValue>,
    body: String,
}

impl EncodedRecord {
    /// Parameters in `insert_sql` column order: id, indexes..., body.
    fn params(self) -> Vec<SqlValue> {
        let mut params = Vec::with_capacity(self.columns.len() + 2);
        params.push(self.id.map(SqlValue::Integer).unwrap_or(SqlValue::Null));
        params.extend(self.columns);
        params.push(SqlValue::Text(self.body));
        params
    }
}

fn encode<T: Record>(record: &T) -> DbResult<EncodedRecord> {
    let mut doc = match serde_json::to_value(record)? {
        Value::Object(map) => map,
        other => {
            return Err(DbError::Constraint(format!(
                "{} records must serialize to a JSON object, got {}",
                T::COLLECTION,
                other
            )))
        }
    };
    // The key lives in the id column only.
    doc.remove("id");

    let columns = T::COLLECTION
        .indexes()
        .iter()
        .map(|field| json_to_sql(doc.get(*field)))
        .collect();

    Ok(EncodedRecord {
        id: record.id(),
        columns,
        body: serde_json::to_string(&doc)?,
    })
}

fn decode<T: Record>(id: i64, body: &str) -> DbResult<T> {
    let mut doc: Map<String, Value> = serde_json::from_str(body)?;
    doc.insert("id".to_string(), Value::from(id));
    Ok(serde_json::from_value(Value::Object(doc))?)
}

fn json_to_sql(value: Option<&Value>) -> SqlValue {
    match value {
        None | Some(Value::Null) => SqlValue::Null,
        Some(Value::Bool(b)) => SqlValue::Integer(i64::from(*b)),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Some(Value::String(s)) => SqlValue::Text(s.clone()),
        Some(other) => SqlValue::Text(other.to_string()),
    }
}

fn insert_sql(collection: Collection, overwrite: bool) -> String {
    let mut columns = vec!["id"];
    columns.extend_from_slice(collection.indexes());
    columns.push("body");

    let placeholders = (1..=columns.len())
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");

    let mut sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        collection.table(),
        columns.join(", "),
        placeholders
    );

    if overwrite {
        let assignments = columns[1..]
            .iter()
            .map(|c| format!("{c} = excluded.{c}"))
            .chain(std::iter::once("updated_at = datetime('now')".to_string()))
            .collect::<Vec<_>>()
            .join(", ");
        sql.push_str(" ON CONFLICT(id) DO UPDATE SET ");
        sql.push_str(&assignments);
    }

    sql
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, SyncAction, SyncEntityType};

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_put_assigns_key_and_get_reads_back() {
        let db = setup_db();

        let mut patient = Patient::new("Jane Doe".into());
        patient.due_date = Some("2024-09-01".into());
        let id = db.put(&patient).unwrap();
        patient.set_id(id);

        let retrieved: Patient = db.get(id).unwrap().unwrap();
        assert_eq!(retrieved, patient);
        assert_eq!(retrieved.id, Some(id));
    }

    #[test]
    fn test_get_missing_returns_none() {
        let db = setup_db();
        let missing: Option<Patient> = db.get(42).unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_keys_increment() {
        let db = setup_db();
        let first = db.put(&Patient::new("A".into())).unwrap();
        let second = db.put(&Patient::new("B".into())).unwrap();
        assert!(second > first);
    }

    #[test]
    fn test_put_overwrites_existing() {
        let db = setup_db();

        let mut patient = Patient::new("Jane Doe".into());
        let id = db.put(&patient).unwrap();
        patient.set_id(id);

        patient.name = "Jane Smith".into();
        assert_eq!(db.put(&patient).unwrap(), id);

        let all: Vec<Patient> = db.get_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "Jane Smith");

        // Index column follows the overwrite.
        let by_old: Vec<Patient> = db.get_by_index("name", "Jane Doe").unwrap();
        assert!(by_old.is_empty());
        let by_new: Vec<Patient> = db.get_by_index("name", "Jane Smith").unwrap();
        assert_eq!(by_new.len(), 1);
    }

    #[test]
    fn test_add_rejects_taken_key() {
        let db = setup_db();

        let mut patient = Patient::new("Jane Doe".into());
        let id = db.add(&patient).unwrap();
        patient.set_id(id);

        let err = db.add(&patient).unwrap_err();
        assert!(matches!(err, DbError::Constraint(_)));
    }

    #[test]
    fn test_write_returns_supplied_or_assigned_key() {
        let db = setup_db();

        let mut chosen = Patient::new("Jane Doe".into());
        chosen.set_id(40);
        assert_eq!(db.add(&chosen).unwrap(), 40);

        chosen.set_id(41);
        assert_eq!(db.put(&chosen).unwrap(), 41);

        let assigned = db.add(&Patient::new("Mary Major".into())).unwrap();
        assert_eq!(assigned, 42);
        let assigned = db.put(&Patient::new("Ann Other".into())).unwrap();
        assert_eq!(assigned, 43);
    }

    #[test]
    fn test_get_by_index_integer_key() {
        let db = setup_db();
        let jane = db.put(&Patient::new("Jane Doe".into())).unwrap();
        let mary = db.put(&Patient::new("Mary Major".into())).unwrap();

        db.put(&Appointment::new(jane, "2024-06-01".into())).unwrap();
        db.put(&Appointment::new(mary, "2024-06-01".into())).unwrap();
        db.put(&Appointment::new(jane, "2024-06-08".into())).unwrap();

        let for_jane: Vec<Appointment> = db.get_by_index("patient_id", jane).unwrap();
        assert_eq!(for_jane.len(), 2);
        assert!(for_jane.iter().all(|a| a.patient_id == jane));

        let on_first: Vec<Appointment> = db.get_by_index("date", "2024-06-01").unwrap();
        assert_eq!(on_first.len(), 2);
    }

    #[test]
    fn test_get_by_index_range() {
        let db = setup_db();
        for (name, due) in [
            ("A", "2024-05-20"),
            ("B", "2024-06-15"),
            ("C", "2024-07-01"),
            ("D", "2024-08-30"),
        ] {
            let mut patient = Patient::new(name.into());
            patient.due_date = Some(due.into());
            db.put(&patient).unwrap();
        }
        db.put(&Patient::new("No due date".into())).unwrap();

        let summer: Vec<Patient> = db
            .get_by_index_range("due_date", "2024-06-01", "2024-07-31")
            .unwrap();
        let names: Vec<_> = summer.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["B", "C"]);
    }

    #[test]
    fn test_get_by_unknown_index_fails() {
        let db = setup_db();
        let err = db
            .get_by_index::<Patient>("blood_type", "O+")
            .unwrap_err();
        assert!(matches!(err, DbError::Constraint(_)));
    }

    #[test]
    fn test_unique_email_enforced_through_put() {
        let db = setup_db();
        let user = User::new("jane@example.com".into(), "hash".into(), "Jane".into(), Role::Midwife);
        db.put(&user).unwrap();

        let dup = User::new("jane@example.com".into(), "hash".into(), "Other".into(), Role::Client);
        let err = db.put(&dup).unwrap_err();
        assert!(matches!(err, DbError::Constraint(_)));
        assert_eq!(db.count(Collection::Users).unwrap(), 1);
    }

    #[test]
    fn test_delete_and_contains() {
        let db = setup_db();
        let id = db.put(&Patient::new("Jane Doe".into())).unwrap();
        assert!(db.contains(Collection::Patients, id).unwrap());

        assert!(db.delete::<Patient>(id).unwrap());
        assert!(!db.delete::<Patient>(id).unwrap());
        assert!(!db.contains(Collection::Patients, id).unwrap());
    }

    #[test]
    fn test_clear_and_count() {
        let db = setup_db();
        for _ in 0..3 {
            let entry = SyncQueueEntry::new(
                SyncEntityType::Patient,
                SyncAction::Add,
                serde_json::json!({"name": "x"}),
            );
            db.add(&entry).unwrap();
        }
        assert_eq!(db.count(Collection::SyncQueue).unwrap(), 3);
        assert_eq!(db.clear(Collection::SyncQueue).unwrap(), 3);
        assert_eq!(db.count(Collection::SyncQueue).unwrap(), 0);
    }

    #[test]
    fn test_body_does_not_store_key() {
        let db = setup_db();
        let id = db.put(&Patient::new("Jane Doe".into())).unwrap();

        let body: String = db
            .conn()
            .query_row("SELECT body FROM patients WHERE id = ?", [id], |row| row.get(0))
            .unwrap();
        let doc: Value = serde_json::from_str(&body).unwrap();
        assert!(doc.get("id").is_none());
        assert_eq!(doc["name"], "Jane Doe");
    }

    #[test]
    fn test_insert_sql_shapes() {
        assert_eq!(
            insert_sql(Collection::SyncQueue, false),
            "INSERT INTO sync_queue (id, body) VALUES (?1, ?2)"
        );
        let upsert = insert_sql(Collection::Users, true);
        assert!(upsert.starts_with("INSERT INTO users (id, email, role, body) VALUES (?1, ?2, ?3, ?4)"));
        assert!(upsert.contains("ON CONFLICT(id) DO UPDATE SET email = excluded.email"));
    }
}
