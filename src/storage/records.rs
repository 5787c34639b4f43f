//! Row types for the five clinic tables, plus the joined views the API returns.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password: String,
    pub role: String,
}

/// A user as listed to admins: never includes the password.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub role: String,
}

impl From<&User> for UserSummary {
    fn from(u: &User) -> Self { Self { id: u.id, username: u.username.clone(), role: u.role.clone() } }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Patient {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub dob: String,
    pub sex: String,
    pub last_visit: Option<NaiveDate>,
    pub visit_place: Option<String>,
    pub notes: String,
}

/// Editable patient fields, shared by create and update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatientFields {
    pub first_name: String,
    pub last_name: String,
    pub dob: String,
    pub sex: String,
    pub notes: String,
}

impl PatientFields {
    pub fn full_name(&self) -> String { format!("{} {}", self.first_name, self.last_name) }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    pub id: i64,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Report {
    pub id: i64,
    pub patient_id: i64,
    pub report_type: String,
    pub diagnosis: String,
    pub treatment: String,
    pub medications: String,
    pub notes: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewReport {
    pub patient_id: i64,
    pub report_type: String,
    pub diagnosis: String,
    pub treatment: String,
    pub medications: String,
    pub notes: String,
    pub created_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Prescription {
    pub id: i64,
    pub patient_id: i64,
    pub medication_name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
    pub instructions: String,
    pub prescribed_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewPrescription {
    pub patient_id: i64,
    pub medication_name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
    pub instructions: String,
    pub prescribed_by: String,
}

/// A row joined with the name of the patient it belongs to.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WithPatientName<T> {
    #[serde(flatten)]
    pub row: T,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Statistics {
    pub total_patients: usize,
    pub male_patients: usize,
    pub female_patients: usize,
    pub recent_visits: usize,
}
