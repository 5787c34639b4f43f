//! First-run data: the clinic's default accounts and two example patients.

use chrono::NaiveDate;
use tracing::info;

use super::{PatientFields, Store, StoreError, StoreResult};

pub const DEFAULT_USERS: &[(&str, &str, &str)] = &[
    ("doctor", "1111", "Doctor"),
    ("nurse", "nurse123", "Nurse"),
    ("pharma", "pharma123", "Pharmacist"),
    ("admin", "admin123", "Admin"),
    ("Marwa", "marwa", "Nurse"),
];

/// Seed an empty store. A store that already holds anything is left alone.
/// Returns the number of (users, patients) inserted.
pub fn seed_if_empty(store: &mut Store) -> StoreResult<(usize, usize)> {
    if !store.is_empty() {
        return Ok((0, 0));
    }
    let examples = [
        ("John", "Doe", "1990-05-12", "Male", (2025, 12, 6), "Clinic A", "No notes"),
        ("Jane", "Smith", "1995-08-20", "Female", (2025, 12, 5), "Clinic B", "Allergic to penicillin"),
    ];
    store.atomically(|s| {
        for (username, password, role) in DEFAULT_USERS {
            s.add_user(username, password, role)?;
        }
        for (first, last, dob, sex, (y, m, d), place, notes) in examples {
            let fields = PatientFields {
                first_name: first.into(),
                last_name: last.into(),
                dob: dob.into(),
                sex: sex.into(),
                notes: notes.into(),
            };
            s.insert_patient(fields, NaiveDate::from_ymd_opt(y, m, d), Some(place.to_string()))?;
        }
        Ok::<_, StoreError>(())
    })?;
    info!(target: "startup", users = DEFAULT_USERS.len(), patients = examples.len(), "seeded empty store");
    Ok((DEFAULT_USERS.len(), examples.len()))
}
