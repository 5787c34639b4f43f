use axum::extract::State;
use axum::{Form, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::reports::{author_or_caller, parse_patient_id, required};
use super::AppState;
use crate::error::{AppError, AppResult};
use crate::identity::{Action, Caller, Resource};
use crate::storage::NewPrescription;

#[derive(Debug, Default, Deserialize)]
pub struct PrescriptionForm {
    pub patient_id: Option<String>,
    pub medication_name: Option<String>,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub duration: Option<String>,
    pub instructions: Option<String>,
    pub prescribed_by: Option<String>,
}

pub async fn list(State(state): State<AppState>, caller: Caller) -> AppResult<Json<Value>> {
    state.authz.require(caller.identity(), Resource::Prescriptions, Action::Read, "view prescriptions")?;
    let prescriptions = state.store.0.lock().list_prescriptions();
    Ok(Json(json!({ "success": true, "data": prescriptions })))
}

pub async fn create(
    State(state): State<AppState>,
    caller: Caller,
    Form(form): Form<PrescriptionForm>,
) -> AppResult<Json<Value>> {
    state.authz.require(caller.identity(), Resource::Prescriptions, Action::Write, "add prescriptions")?;
    let patient_id = parse_patient_id(form.patient_id.as_deref())?;
    let new = NewPrescription {
        patient_id,
        medication_name: required(form.medication_name, "Medication name")?,
        dosage: required(form.dosage, "Dosage")?,
        frequency: required(form.frequency, "Frequency")?,
        duration: required(form.duration, "Duration")?,
        instructions: form.instructions.unwrap_or_default(),
        prescribed_by: author_or_caller(form.prescribed_by, &caller),
    };
    let medication = new.medication_name.clone();
    let id = state
        .write(move |store| {
            let Some(patient) = store.get_patient(patient_id) else {
                return Err(AppError::user("unknown_patient".to_string(), format!("Patient {patient_id} not found")));
            };
            let id = store.add_prescription(new)?;
            store.add_notification(
                "New Prescription Added",
                &format!("New prescription for {medication} added for patient {} {}", patient.first_name, patient.last_name),
            )?;
            Ok(id)
        })
        .await?;
    info!(user = %caller.username(), prescription_id = id, patient_id, "prescription added");
    Ok(Json(json!({ "success": true, "message": "Prescription added successfully", "prescription_id": id })))
}
