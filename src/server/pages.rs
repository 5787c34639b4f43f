//! Browser-facing pages and the login form endpoint.
//!
//! The pages are static shells; they call the JSON API with the identity headers
//! the login response tells them to use.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Form, Json};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use super::interceptor::LOGIN_PATH;
use super::AppState;
use crate::identity::{Action, Caller, Resource};

const LOGIN_HTML: &str = r#"<!DOCTYPE html>
<html><head><meta charset="utf-8"><title>Medical Records - Login</title></head>
<body>
<h1>Medical Records</h1>
<form id="login">
  <input name="username" placeholder="Username" required>
  <input name="password" type="password" placeholder="Password" required>
  <button type="submit">Sign in</button>
</form>
<p id="error"></p>
<script>
document.getElementById('login').addEventListener('submit', async (e) => {
  e.preventDefault();
  const res = await fetch('/login', { method: 'POST', body: new URLSearchParams(new FormData(e.target)) });
  const body = await res.json();
  if (body.success) {
    sessionStorage.setItem('role', body.user.role);
    sessionStorage.setItem('username', body.user.username);
    location.href = '/home';
  } else {
    document.getElementById('error').textContent = body.message;
  }
});
</script>
</body></html>"#;

const HOME_HTML: &str = r##"<!DOCTYPE html>
<html><head><meta charset="utf-8"><title>Medical Records</title></head>
<body>
<h1>Medical Records</h1>
<nav><a href="#patients">Patients</a> | <a href="#reports">Reports</a> | <a href="#prescriptions">Prescriptions</a> | <a href="#notifications">Notifications</a></nav>
<pre id="out"></pre>
<script>
const headers = { 'X-User-Role': sessionStorage.getItem('role') || '', 'X-User-Name': sessionStorage.getItem('username') || '' };
async function show(section) {
  const res = await fetch('/api/' + (section || 'patients'), { headers });
  document.getElementById('out').textContent = JSON.stringify(await res.json(), null, 2);
}
window.addEventListener('hashchange', () => show(location.hash.slice(1)));
show(location.hash.slice(1));
</script>
</body></html>"##;

const ADMIN_USERS_HTML: &str = r#"<!DOCTYPE html>
<html><head><meta charset="utf-8"><title>Medical Records - Users</title></head>
<body>
<h1>User management</h1>
<pre id="users"></pre>
<script>
const headers = { 'X-User-Role': sessionStorage.getItem('role') || '', 'X-User-Name': sessionStorage.getItem('username') || '' };
fetch('/api/admin/users', { headers }).then(r => r.json()).then(b => {
  document.getElementById('users').textContent = JSON.stringify(b.data, null, 2);
});
</script>
</body></html>"#;

pub async fn login_page() -> Html<&'static str> { Html(LOGIN_HTML) }

pub async fn home_page() -> Html<&'static str> { Html(HOME_HTML) }

/// Admin-only page. Anyone else is sent back to the login page.
pub async fn admin_users_page(State(state): State<AppState>, caller: Option<Caller>) -> Response {
    match caller {
        Some(c) if state.authz.allows(c.role(), Resource::Users, Action::Read) => Html(ADMIN_USERS_HTML).into_response(),
        _ => Redirect::to(LOGIN_PATH).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Check the submitted credentials and report the account's role. No session
/// is issued: the client sends the identity headers on later requests.
pub async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    let user = state.store.0.lock().verify_user(&form.username, &form.password);
    match user {
        Some(u) => {
            info!(target: "auth", user = %u.username, role = %u.role, "login succeeded");
            Json(json!({
                "success": true,
                "message": "Login successful",
                "user": { "username": u.username, "role": u.role }
            }))
            .into_response()
        }
        None => {
            warn!(target: "auth", user = %form.username, "login failed");
            (StatusCode::UNAUTHORIZED, Json(json!({ "success": false, "message": "Invalid credentials" }))).into_response()
        }
    }
}
