use axum::extract::{Path, State};
use axum::{Form, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::AppState;
use crate::error::{AppError, AppResult};
use crate::identity::{Action, Caller, Resource};
use crate::storage::PatientFields;

/// Patient form as posted by the UI. Every field is optional at the wire level
/// so authorization runs before validation.
#[derive(Debug, Default, Deserialize)]
pub struct PatientForm {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub dob: Option<String>,
    pub sex: Option<String>,
    pub notes: Option<String>,
}

/// Names and date of birth are required; sex must be `Male` or `Female`.
pub fn validate_patient(form: PatientForm) -> AppResult<PatientFields> {
    let first_name = form.first_name.unwrap_or_default();
    let last_name = form.last_name.unwrap_or_default();
    let dob = form.dob.unwrap_or_default();
    let sex = form.sex.unwrap_or_default();
    if first_name.is_empty() || last_name.is_empty() {
        return Err(AppError::user("invalid_patient", "First name and last name are required"));
    }
    if dob.is_empty() {
        return Err(AppError::user("invalid_patient", "Date of birth is required"));
    }
    if sex != "Male" && sex != "Female" {
        return Err(AppError::user("invalid_patient", "Invalid gender"));
    }
    Ok(PatientFields { first_name, last_name, dob, sex, notes: form.notes.unwrap_or_default() })
}

pub async fn list(State(state): State<AppState>, caller: Caller) -> AppResult<Json<Value>> {
    state.authz.require(caller.identity(), Resource::Patients, Action::Read, "view patients")?;
    let patients = state.store.0.lock().list_patients();
    Ok(Json(json!({ "success": true, "data": patients })))
}

pub async fn show(State(state): State<AppState>, caller: Caller, Path(id): Path<i64>) -> AppResult<Json<Value>> {
    state.authz.require(caller.identity(), Resource::Patients, Action::Read, "view patient details")?;
    let patient = state.store.0.lock().get_patient(id);
    match patient {
        Some(p) => Ok(Json(json!({ "success": true, "data": p }))),
        None => Err(AppError::not_found("patient_not_found", "Patient not found")),
    }
}

pub async fn create(
    State(state): State<AppState>,
    caller: Caller,
    Form(form): Form<PatientForm>,
) -> AppResult<Json<Value>> {
    state.authz.require(caller.identity(), Resource::Patients, Action::Write, "add patients")?;
    let fields = validate_patient(form)?;
    let name = fields.full_name();
    let id = state
        .write(move |store| {
            let id = store.add_patient(fields)?;
            store.add_notification(
                "New Patient Added",
                &format!("Patient {name} has been successfully registered (ID: {id})"),
            )?;
            Ok(id)
        })
        .await?;
    info!(user = %caller.username(), patient_id = id, "patient registered");
    Ok(Json(json!({ "success": true, "message": "Patient registered successfully", "patient_id": id })))
}

pub async fn update(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
    Form(form): Form<PatientForm>,
) -> AppResult<Json<Value>> {
    state.authz.require(caller.identity(), Resource::Patients, Action::Update, "update patients")?;
    let fields = validate_patient(form)?;
    let name = fields.full_name();
    state
        .write(move |store| {
            if store.get_patient(id).is_none() {
                return Err(AppError::not_found("patient_not_found", "Patient not found"));
            }
            store.update_patient(id, fields)?;
            store.add_notification("Patient Updated", &format!("Patient {name} (ID: {id}) has been updated"))?;
            Ok(())
        })
        .await?;
    info!(user = %caller.username(), patient_id = id, "patient updated");
    Ok(Json(json!({ "success": true, "message": "Patient updated successfully" })))
}

pub async fn remove(State(state): State<AppState>, caller: Caller, Path(id): Path<i64>) -> AppResult<Json<Value>> {
    state.authz.require(caller.identity(), Resource::Patients, Action::Delete, "delete patients")?;
    state
        .write(move |store| {
            if store.get_patient(id).is_none() {
                return Err(AppError::not_found("patient_not_found", "Patient not found"));
            }
            let removed = store.delete_patient(id)?;
            store.add_notification(
                "Patient Deleted",
                &format!("Patient {} {} (ID: {id}) has been deleted", removed.first_name, removed.last_name),
            )?;
            Ok(())
        })
        .await?;
    info!(user = %caller.username(), patient_id = id, "patient deleted");
    Ok(Json(json!({ "success": true, "message": "Patient deleted successfully" })))
}
