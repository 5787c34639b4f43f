//!
//! medrec storage module
//! ---------------------
//! The clinic's record store: five tables (users, patients, notifications,
//! reports, prescriptions), each a map of rows keyed by an auto-incrementing
//! integer id. A store rooted at a folder persists every mutation to a single
//! JSON snapshot (`medrec.json`); an in-memory store keeps nothing on disk.
//!
//! The store knows nothing about roles or permissions. Callers authorize first
//! and only then reach for the store, usually through the thread-safe
//! `SharedStore` (`Arc<Mutex<Store>>`) held in server state.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

mod io;
pub mod records;
pub mod seed;
mod table;

pub use records::{
    NewPrescription, NewReport, Notification, Patient, PatientFields, Prescription, Report, Statistics, User,
    UserSummary, WithPatientName,
};
pub use table::Table;

/// Most recent notifications returned by [`Store::recent_notifications`].
pub const NOTIFICATION_LIMIT: usize = 20;

const SNAPSHOT_FILE: &str = "medrec.json";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Username already exists")]
    UsernameTaken(String),
    #[error("Cannot modify admin user")]
    ProtectedUser(i64),
    #[error("{table} {id} not found")]
    NotFound { table: &'static str, id: i64 },
    #[error("store i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("store snapshot is invalid: {0}")]
    Snapshot(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Tables {
    #[serde(default)]
    users: Table<User>,
    #[serde(default)]
    patients: Table<Patient>,
    #[serde(default)]
    notifications: Table<Notification>,
    #[serde(default)]
    reports: Table<Report>,
    #[serde(default)]
    prescriptions: Table<Prescription>,
}

/// Record store for the clinic tables.
#[derive(Debug)]
pub struct Store {
    tables: Tables,
    /// Snapshot file; `None` for an in-memory store.
    snapshot: Option<PathBuf>,
    /// Set while an [`Store::atomically`] unit is open; commits wait for it.
    in_unit: bool,
}

/// Thread-safe handle shared by request handlers. Hold the lock for a single
/// store call or unit of work and never across an `.await`.
#[derive(Clone)]
pub struct SharedStore(pub Arc<Mutex<Store>>);

impl SharedStore {
    pub fn new<P: AsRef<Path>>(root: P) -> StoreResult<Self> { Ok(Self(Arc::new(Mutex::new(Store::open(root)?)))) }

    pub fn in_memory() -> Self { Self(Arc::new(Mutex::new(Store::in_memory()))) }
}

impl Store {
    /// Open (or create) the store under `root`, loading an existing snapshot.
    pub fn open<P: AsRef<Path>>(root: P) -> StoreResult<Self> {
        let root = root.as_ref();
        std::fs::create_dir_all(root)?;
        let path = root.join(SNAPSHOT_FILE);
        let tables = io::load_snapshot(&path)?;
        debug!(target: "medrec::storage", "opened store at '{}'", path.display());
        Ok(Self { tables, snapshot: Some(path), in_unit: false })
    }

    pub fn in_memory() -> Self { Self { tables: Tables::default(), snapshot: None, in_unit: false } }

    pub fn snapshot_path(&self) -> Option<&Path> { self.snapshot.as_deref() }

    pub fn is_empty(&self) -> bool {
        self.tables.users.is_empty()
            && self.tables.patients.is_empty()
            && self.tables.notifications.is_empty()
            && self.tables.reports.is_empty()
            && self.tables.prescriptions.is_empty()
    }

    fn commit(&self) -> StoreResult<()> {
        match &self.snapshot {
            Some(path) => io::save_snapshot(path, &self.tables),
            None => Ok(()),
        }
    }

    /// Run `f` as one unit of work. Its changes are committed with a single
    /// snapshot write, or rolled back entirely when `f` or the write fails.
    /// Nested calls join the outermost unit.
    pub fn atomically<R, E>(&mut self, f: impl FnOnce(&mut Store) -> Result<R, E>) -> Result<R, E>
    where
        E: From<StoreError>,
    {
        let saved = self.tables.clone();
        let outer = std::mem::replace(&mut self.in_unit, true);
        let result = f(self);
        self.in_unit = outer;
        let result = match result {
            Ok(value) if !outer => self.commit().map(|()| value).map_err(E::from),
            other => other,
        };
        if result.is_err() {
            self.tables = saved;
        }
        result
    }

    // ---- users ----

    /// Plaintext credential match, as the login form expects.
    pub fn verify_user(&self, username: &str, password: &str) -> Option<User> {
        self.tables.users.iter().find(|u| u.username == username && u.password == password).cloned()
    }

    pub fn list_users(&self) -> Vec<UserSummary> { self.tables.users.iter().map(UserSummary::from).collect() }

    pub fn get_user(&self, id: i64) -> Option<User> { self.tables.users.get(id).cloned() }

    pub fn add_user(&mut self, username: &str, password: &str, role: &str) -> StoreResult<i64> {
        if self.tables.users.iter().any(|u| u.username == username) {
            return Err(StoreError::UsernameTaken(username.to_string()));
        }
        self.atomically(|s| {
            Ok(s.tables.users.insert_with(|id| User {
                id,
                username: username.to_string(),
                password: password.to_string(),
                role: role.to_string(),
            }))
        })
    }

    /// Change a user's role. Admin accounts are protected.
    pub fn set_user_role(&mut self, id: i64, role: &str) -> StoreResult<()> {
        self.atomically(|s| {
            let user = s.tables.users.get_mut(id).ok_or(StoreError::NotFound { table: "users", id })?;
            if user.role == "Admin" {
                return Err(StoreError::ProtectedUser(id));
            }
            user.role = role.to_string();
            Ok(())
        })
    }

    /// Delete a user. Admin accounts are protected.
    pub fn delete_user(&mut self, id: i64) -> StoreResult<()> {
        let user = self.tables.users.get(id).ok_or(StoreError::NotFound { table: "users", id })?;
        if user.role == "Admin" {
            return Err(StoreError::ProtectedUser(id));
        }
        self.atomically(|s| {
            s.tables.users.remove(id);
            Ok(())
        })
    }

    // ---- patients ----

    /// All patients, newest first.
    pub fn list_patients(&self) -> Vec<Patient> { self.tables.patients.iter().rev().cloned().collect() }

    pub fn get_patient(&self, id: i64) -> Option<Patient> { self.tables.patients.get(id).cloned() }

    /// Register a patient visiting the clinic today.
    pub fn add_patient(&mut self, fields: PatientFields) -> StoreResult<i64> {
        let today = Utc::now().date_naive();
        self.insert_patient(fields, Some(today), Some("Clinic".to_string()))
    }

    pub(crate) fn insert_patient(
        &mut self,
        fields: PatientFields,
        last_visit: Option<NaiveDate>,
        visit_place: Option<String>,
    ) -> StoreResult<i64> {
        self.atomically(|s| {
            Ok(s.tables.patients.insert_with(|id| Patient {
                id,
                first_name: fields.first_name,
                last_name: fields.last_name,
                dob: fields.dob,
                sex: fields.sex,
                last_visit,
                visit_place,
                notes: fields.notes,
            }))
        })
    }

    pub fn update_patient(&mut self, id: i64, fields: PatientFields) -> StoreResult<()> {
        self.atomically(|s| {
            let p = s.tables.patients.get_mut(id).ok_or(StoreError::NotFound { table: "patient", id })?;
            p.first_name = fields.first_name;
            p.last_name = fields.last_name;
            p.dob = fields.dob;
            p.sex = fields.sex;
            p.notes = fields.notes;
            Ok(())
        })
    }

    /// Remove a patient, returning the deleted row. Reports and prescriptions
    /// that reference it stay stored but drop out of the joined listings.
    pub fn delete_patient(&mut self, id: i64) -> StoreResult<Patient> {
        self.atomically(|s| s.tables.patients.remove(id).ok_or(StoreError::NotFound { table: "patient", id }))
    }

    pub fn statistics(&self) -> Statistics {
        let week_ago = Utc::now().date_naive() - Duration::days(7);
        let patients = &self.tables.patients;
        Statistics {
            total_patients: patients.len(),
            male_patients: patients.iter().filter(|p| p.sex == "Male").count(),
            female_patients: patients.iter().filter(|p| p.sex == "Female").count(),
            recent_visits: patients.iter().filter(|p| p.last_visit.is_some_and(|d| d >= week_ago)).count(),
        }
    }

    fn join_patient<T: Clone>(&self, patient_id: i64, row: &T) -> Option<WithPatientName<T>> {
        let p = self.tables.patients.get(patient_id)?;
        Some(WithPatientName { row: row.clone(), first_name: p.first_name.clone(), last_name: p.last_name.clone() })
    }

    // ---- reports ----

    /// Reports whose patient still exists, newest first.
    pub fn list_reports(&self) -> Vec<WithPatientName<Report>> {
        let mut out: Vec<_> = self.tables.reports.iter().filter_map(|r| self.join_patient(r.patient_id, r)).collect();
        out.sort_by(|a, b| b.row.created_at.cmp(&a.row.created_at).then(b.row.id.cmp(&a.row.id)));
        out
    }

    pub fn add_report(&mut self, new: NewReport) -> StoreResult<i64> {
        if self.tables.patients.get(new.patient_id).is_none() {
            return Err(StoreError::NotFound { table: "patient", id: new.patient_id });
        }
        let now = Utc::now();
        self.atomically(|s| {
            Ok(s.tables.reports.insert_with(|id| Report {
                id,
                patient_id: new.patient_id,
                report_type: new.report_type,
                diagnosis: new.diagnosis,
                treatment: new.treatment,
                medications: new.medications,
                notes: new.notes,
                created_by: new.created_by,
                created_at: now,
            }))
        })
    }

    // ---- prescriptions ----

    /// Prescriptions whose patient still exists, newest first.
    pub fn list_prescriptions(&self) -> Vec<WithPatientName<Prescription>> {
        let mut out: Vec<_> =
            self.tables.prescriptions.iter().filter_map(|p| self.join_patient(p.patient_id, p)).collect();
        out.sort_by(|a, b| b.row.created_at.cmp(&a.row.created_at).then(b.row.id.cmp(&a.row.id)));
        out
    }

    pub fn add_prescription(&mut self, new: NewPrescription) -> StoreResult<i64> {
        if self.tables.patients.get(new.patient_id).is_none() {
            return Err(StoreError::NotFound { table: "patient", id: new.patient_id });
        }
        let now = Utc::now();
        self.atomically(|s| {
            Ok(s.tables.prescriptions.insert_with(|id| Prescription {
                id,
                patient_id: new.patient_id,
                medication_name: new.medication_name,
                dosage: new.dosage,
                frequency: new.frequency,
                duration: new.duration,
                instructions: new.instructions,
                prescribed_by: new.prescribed_by,
                created_at: now,
            }))
        })
    }

    // ---- notifications ----

    pub fn add_notification(&mut self, title: &str, message: &str) -> StoreResult<i64> {
        let now = Utc::now();
        self.atomically(|s| {
            Ok(s.tables.notifications.insert_with(|id| Notification {
                id,
                title: title.to_string(),
                message: message.to_string(),
                created_at: now,
                is_read: false,
            }))
        })
    }

    /// The latest [`NOTIFICATION_LIMIT`] notifications, newest first.
    pub fn recent_notifications(&self) -> Vec<Notification> {
        let mut all: Vec<Notification> = self.tables.notifications.iter().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        all.truncate(NOTIFICATION_LIMIT);
        all
    }

    pub fn unread_notifications(&self) -> usize { self.tables.notifications.iter().filter(|n| !n.is_read).count() }

    /// Mark one notification read; returns whether it existed.
    pub fn mark_notification_read(&mut self, id: i64) -> StoreResult<bool> {
        if self.tables.notifications.get(id).is_none() {
            return Ok(false);
        }
        self.atomically(|s| {
            if let Some(n) = s.tables.notifications.get_mut(id) {
                n.is_read = true;
            }
            Ok(true)
        })
    }
}
