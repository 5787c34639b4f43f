use axum::extract::State;
use axum::{Form, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::AppState;
use crate::error::{AppError, AppResult};
use crate::identity::{Action, Caller, Resource};
use crate::storage::NewReport;

#[derive(Debug, Default, Deserialize)]
pub struct ReportForm {
    pub patient_id: Option<String>,
    pub report_type: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub medications: Option<String>,
    pub notes: Option<String>,
    pub created_by: Option<String>,
}

/// Parse a `patient_id` form value.
pub(crate) fn parse_patient_id(raw: Option<&str>) -> AppResult<i64> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::user("invalid_patient_id", "Patient is required"))?
        .parse::<i64>()
        .map_err(|_| AppError::user("invalid_patient_id", "Invalid patient id"))
}

pub(crate) fn required(value: Option<String>, field: &str) -> AppResult<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AppError::user("missing_field".to_string(), format!("{field} is required"))),
    }
}

/// The author recorded on a row: the submitted value, or the caller when blank.
pub(crate) fn author_or_caller(submitted: Option<String>, caller: &Caller) -> String {
    submitted.filter(|s| !s.trim().is_empty()).unwrap_or_else(|| caller.username().to_string())
}

pub async fn list(State(state): State<AppState>, caller: Caller) -> AppResult<Json<Value>> {
    state.authz.require(caller.identity(), Resource::Reports, Action::Read, "view reports")?;
    let reports = state.store.0.lock().list_reports();
    Ok(Json(json!({ "success": true, "data": reports })))
}

pub async fn create(
    State(state): State<AppState>,
    caller: Caller,
    Form(form): Form<ReportForm>,
) -> AppResult<Json<Value>> {
    state.authz.require(caller.identity(), Resource::Reports, Action::Write, "create reports")?;
    let patient_id = parse_patient_id(form.patient_id.as_deref())?;
    let report_type = required(form.report_type, "Report type")?;
    let new = NewReport {
        patient_id,
        report_type: report_type.clone(),
        diagnosis: form.diagnosis.unwrap_or_default(),
        treatment: form.treatment.unwrap_or_default(),
        medications: form.medications.unwrap_or_default(),
        notes: form.notes.unwrap_or_default(),
        created_by: author_or_caller(form.created_by, &caller),
    };
    let id = state
        .write(move |store| {
            let Some(patient) = store.get_patient(patient_id) else {
                return Err(AppError::user("unknown_patient".to_string(), format!("Patient {patient_id} not found")));
            };
            let id = store.add_report(new)?;
            store.add_notification(
                "New Report Created",
                &format!("New {report_type} report created for patient {} {}", patient.first_name, patient.last_name),
            )?;
            Ok(id)
        })
        .await?;
    info!(user = %caller.username(), report_id = id, patient_id, "report created");
    Ok(Json(json!({ "success": true, "message": "Report created successfully", "report_id": id })))
}

/// Patient counts shown on the reports dashboard.
pub async fn statistics(State(state): State<AppState>, caller: Caller) -> AppResult<Json<Value>> {
    state.authz.require(caller.identity(), Resource::Reports, Action::Read, "view statistics")?;
    let stats = state.store.0.lock().statistics();
    Ok(Json(json!({ "success": true, "data": stats })))
}
