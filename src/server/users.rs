//! Account administration. Gated on the `users` resource, which only admins hold.
//! Admin accounts themselves can be neither edited nor deleted here.

use axum::extract::{FromRequest, Path, Query, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::{Form, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::AppState;
use crate::error::{AppError, AppResult};
use crate::identity::{Action, Caller, Resource, Role};

/// Roles an admin may hand out.
pub const ASSIGNABLE_ROLES: [Role; 3] = [Role::Doctor, Role::Nurse, Role::Pharmacist];

pub fn is_assignable_role(role: &str) -> bool { ASSIGNABLE_ROLES.iter().any(|r| r.as_str() == role) }

#[derive(Debug, Default, Deserialize)]
pub struct NewUserForm {
    pub username: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RoleParam {
    pub role: Option<String>,
}

pub async fn list(State(state): State<AppState>, caller: Caller) -> AppResult<Json<Value>> {
    state.authz.require(caller.identity(), Resource::Users, Action::Read, "view users")?;
    let users: Vec<_> = state.store.0.lock().list_users().into_iter().filter(|u| u.role != "Admin").collect();
    Ok(Json(json!({ "success": true, "data": users })))
}

pub async fn create(
    State(state): State<AppState>,
    caller: Caller,
    Form(form): Form<NewUserForm>,
) -> AppResult<Json<Value>> {
    state.authz.require(caller.identity(), Resource::Users, Action::Write, "add users")?;
    let (Some(username), Some(password), Some(role)) = (form.username, form.password, form.role) else {
        return Err(AppError::user("missing_field", "Username, password and role are required"));
    };
    if username.is_empty() || password.is_empty() {
        return Err(AppError::user("missing_field", "Username, password and role are required"));
    }
    if !is_assignable_role(&role) {
        return Err(AppError::user("invalid_role", "Invalid role"));
    }
    let id = {
        let (username, role) = (username.clone(), role.clone());
        state.write(move |store| Ok(store.add_user(&username, &password, &role)?)).await?
    };
    info!(admin = %caller.username(), user_id = id, %username, %role, "user added");
    Ok(Json(json!({ "success": true, "message": "User added successfully", "user_id": id })))
}

// Role for an update: `?role=` first, then a JSON body, then a form body.
async fn role_from_body(req: Request) -> Option<String> {
    let is_json = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));
    if is_json {
        Json::<RoleParam>::from_request(req, &()).await.ok().and_then(|Json(p)| p.role)
    } else {
        Form::<RoleParam>::from_request(req, &()).await.ok().and_then(|Form(p)| p.role)
    }
}

pub async fn update(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
    Query(query): Query<RoleParam>,
    req: Request,
) -> AppResult<Json<Value>> {
    state.authz.require(caller.identity(), Resource::Users, Action::Update, "update users")?;
    let role = match query.role {
        Some(r) => Some(r),
        None => role_from_body(req).await,
    };
    let role = role.filter(|r| is_assignable_role(r)).ok_or_else(|| AppError::user("invalid_role", "Invalid role"))?;
    let new_role = role.clone();
    state
        .write(move |store| {
            let Some(target) = store.get_user(id) else {
                return Err(AppError::not_found("user_not_found", "User not found"));
            };
            if target.role == Role::Admin.as_str() {
                return Err(AppError::user("protected_user", "Cannot modify admin user"));
            }
            Ok(store.set_user_role(id, &new_role)?)
        })
        .await?;
    info!(admin = %caller.username(), user_id = id, %role, "user role changed");
    Ok(Json(json!({ "success": true, "message": "User updated successfully" })))
}

pub async fn remove(State(state): State<AppState>, caller: Caller, Path(id): Path<i64>) -> AppResult<Json<Value>> {
    state.authz.require(caller.identity(), Resource::Users, Action::Delete, "delete users")?;
    state
        .write(move |store| {
            let Some(target) = store.get_user(id) else {
                return Err(AppError::not_found("user_not_found", "User not found"));
            };
            if target.role == Role::Admin.as_str() {
                return Err(AppError::user("protected_user", "Cannot delete admin user"));
            }
            Ok(store.delete_user(id)?)
        })
        .await?;
    info!(admin = %caller.username(), user_id = id, "user deleted");
    Ok(Json(json!({ "success": true, "message": "User deleted successfully" })))
}
