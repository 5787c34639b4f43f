//! End-to-end checks of the router: the auth interceptor in front, the
//! permission checks inside each handler, and the record store behind them.

use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderValue, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use medrec::identity::Authorizer;
use medrec::server::{router, AppState};
use medrec::storage::{seed, SharedStore};

fn app() -> (Router, SharedStore) {
    let store = SharedStore::in_memory();
    seed::seed_if_empty(&mut store.0.lock()).unwrap();
    (router(AppState::new(store.clone(), Authorizer::default())), store)
}

fn request(method: Method, path: &str, who: Option<(&str, &str)>, form: Option<&str>) -> Request<Body> {
    let mut b = Request::builder().method(method).uri(path);
    if let Some((role, user)) = who {
        b = b.header("X-User-Role", role).header("X-User-Name", user);
    }
    match form {
        Some(body) => b
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => b.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

const DOCTOR: Option<(&str, &str)> = Some(("Doctor", "doctor"));
const NURSE: Option<(&str, &str)> = Some(("Nurse", "nurse"));
const PHARMA: Option<(&str, &str)> = Some(("Pharmacist", "pharma"));
const ADMIN: Option<(&str, &str)> = Some(("Admin", "admin"));

const NEW_PATIENT: &str = "first_name=Ada&last_name=Lovelace&dob=1815-12-10&sex=Female&notes=";

#[tokio::test]
async fn api_without_credentials_is_rejected_before_the_handler() {
    let (app, store) = app();
    let (status, body) = send(&app, request(Method::POST, "/api/patients", None, Some(NEW_PATIENT))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Unauthorized - Missing user credentials");
    assert_eq!(store.0.lock().list_patients().len(), 2);
    assert_eq!(store.0.lock().unread_notifications(), 0);
}

#[tokio::test]
async fn one_identity_header_is_not_enough() {
    let (app, _) = app();
    let req = Request::builder().uri("/api/patients").header("X-User-Role", "Doctor").body(Body::empty()).unwrap();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .uri("/api/patients")
        .header("X-User-Role", "Doctor")
        .header("X-User-Name", "")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn public_pages_need_no_credentials() {
    let (app, _) = app();
    for path in ["/", "/login", "/home"] {
        let resp = app.clone().oneshot(request(Method::GET, path, None, None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "{path}");
    }
}

#[tokio::test]
async fn login_reports_role_or_rejects() {
    let (app, _) = app();
    let (status, body) = send(&app, request(Method::POST, "/login", None, Some("username=doctor&password=1111"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["role"], "Doctor");
    assert_eq!(body["user"]["username"], "doctor");

    let (status, body) = send(&app, request(Method::POST, "/login", None, Some("username=doctor&password=nope"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Invalid credentials");
}

#[tokio::test]
async fn nurse_cannot_add_patients() {
    let (app, store) = app();
    let (status, body) = send(&app, request(Method::POST, "/api/patients", NURSE, Some(NEW_PATIENT))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["detail"], "Access denied - No permission to add patients");
    assert_eq!(store.0.lock().list_patients().len(), 2);
}

#[tokio::test]
async fn doctor_adds_patient_and_everyone_with_read_sees_it() {
    let (app, _) = app();
    let (status, body) = send(&app, request(Method::POST, "/api/patients", DOCTOR, Some(NEW_PATIENT))).await;
    assert_eq!(status, StatusCode::OK);
    let id = body["patient_id"].as_i64().unwrap();

    for who in [DOCTOR, NURSE, PHARMA, ADMIN] {
        let (status, body) = send(&app, request(Method::GET, "/api/patients", who, None)).await;
        assert_eq!(status, StatusCode::OK);
        let data = body["data"].as_array().unwrap();
        assert_eq!(data.len(), 3);
        assert_eq!(data[0]["id"].as_i64(), Some(id));
        assert_eq!(data[0]["first_name"], "Ada");
        assert_eq!(data[0]["visit_place"], "Clinic");
    }

    let (_, body) = send(&app, request(Method::GET, "/api/notifications", NURSE, None)).await;
    assert_eq!(body["unread_count"], 1);
    assert_eq!(body["data"][0]["title"], "New Patient Added");
}

#[tokio::test]
async fn unrecognized_role_passes_the_gate_but_is_denied() {
    let (app, _) = app();
    let (status, body) = send(&app, request(Method::GET, "/api/patients", Some(("Janitor", "jan")), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["detail"].as_str().unwrap().starts_with("Access denied"));
}

#[tokio::test]
async fn patient_validation_and_missing_rows() {
    let (app, _) = app();
    let (status, body) =
        send(&app, request(Method::POST, "/api/patients", DOCTOR, Some("first_name=A&last_name=B&dob=2000-01-01&sex=X"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid gender");

    let (status, body) = send(&app, request(Method::GET, "/api/patients/999", DOCTOR, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Patient not found");
}

#[tokio::test]
async fn update_and_delete_follow_the_matrix() {
    let (app, store) = app();
    let edit = "first_name=John&last_name=Doe&dob=1980-05-15&sex=Male&notes=Follow-up";

    let (status, _) = send(&app, request(Method::PUT, "/api/patients/1", NURSE, Some(edit))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, request(Method::DELETE, "/api/patients/1", NURSE, None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(store.0.lock().get_patient(1).is_some());

    let (status, _) = send(&app, request(Method::PUT, "/api/patients/1", DOCTOR, Some(edit))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(store.0.lock().get_patient(1).unwrap().notes, "Follow-up");

    let (status, _) = send(&app, request(Method::DELETE, "/api/patients/1", DOCTOR, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(store.0.lock().get_patient(1).is_none());
}

#[tokio::test]
async fn reports_and_statistics() {
    let (app, _) = app();
    let report = "patient_id=1&report_type=Checkup&diagnosis=Healthy&treatment=&medications=&notes=";
    let (status, _) = send(&app, request(Method::POST, "/api/reports", NURSE, Some(report))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, request(Method::POST, "/api/reports", DOCTOR, Some(report))).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, body) = send(&app, request(Method::GET, "/api/reports", NURSE, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["first_name"], "John");
    assert_eq!(body["data"][0]["created_by"], "doctor");

    let (status, _) = send(&app, request(Method::GET, "/api/reports", PHARMA, None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) =
        send(&app, request(Method::POST, "/api/reports", DOCTOR, Some("patient_id=404&report_type=Checkup"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Patient 404 not found");

    let (status, body) = send(&app, request(Method::GET, "/api/statistics", NURSE, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_patients"], 2);
    assert_eq!(body["data"]["male_patients"], 1);
    assert_eq!(body["data"]["female_patients"], 1);
}

#[tokio::test]
async fn prescriptions_by_role() {
    let (app, _) = app();
    let rx = "patient_id=2&medication_name=Amoxicillin&dosage=500mg&frequency=3x%20daily&duration=7%20days";

    let (status, _) = send(&app, request(Method::POST, "/api/prescriptions", NURSE, Some(rx))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, request(Method::POST, "/api/prescriptions", PHARMA, Some(rx))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, request(Method::POST, "/api/prescriptions", DOCTOR, Some(rx))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, request(Method::GET, "/api/prescriptions", PHARMA, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["medication_name"], "Amoxicillin");
    assert_eq!(body["data"][0]["last_name"], "Smith");

    let (status, _) = send(&app, request(Method::GET, "/api/prescriptions", NURSE, None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn notifications_can_be_marked_read() {
    let (app, _) = app();
    send(&app, request(Method::POST, "/api/patients", DOCTOR, Some(NEW_PATIENT))).await;
    let (_, body) = send(&app, request(Method::GET, "/api/notifications", PHARMA, None)).await;
    let id = body["data"][0]["id"].as_i64().unwrap();

    let (status, body) = send(&app, request(Method::POST, &format!("/api/notifications/{id}/read"), PHARMA, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (_, body) = send(&app, request(Method::GET, "/api/notifications", PHARMA, None)).await;
    assert_eq!(body["unread_count"], 0);
    assert_eq!(body["data"][0]["is_read"], true);
}

#[tokio::test]
async fn user_administration_is_admin_only() {
    let (app, store) = app();

    let (status, _) = send(&app, request(Method::GET, "/api/admin/users", DOCTOR, None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, request(Method::GET, "/api/admin/users", ADMIN, None)).await;
    assert_eq!(status, StatusCode::OK);
    let users = body["data"].as_array().unwrap();
    assert_eq!(users.len(), 4);
    assert!(users.iter().all(|u| u["role"] != "Admin" && u.get("password").is_none()));

    let (status, body) =
        send(&app, request(Method::POST, "/api/admin/users", ADMIN, Some("username=sam&password=pw&role=Nurse"))).await;
    assert_eq!(status, StatusCode::OK);
    let sam = body["user_id"].as_i64().unwrap();

    let (status, body) =
        send(&app, request(Method::POST, "/api/admin/users", ADMIN, Some("username=sam&password=pw&role=Nurse"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Username already exists");

    let (status, body) =
        send(&app, request(Method::POST, "/api/admin/users", ADMIN, Some("username=eve&password=pw&role=Admin"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid role");

    let req = Request::builder()
        .method(Method::PUT)
        .uri(format!("/api/admin/users/{sam}"))
        .header("X-User-Role", "Admin")
        .header("X-User-Name", "admin")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"role":"Pharmacist"}"#))
        .unwrap();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(store.0.lock().get_user(sam).unwrap().role, "Pharmacist");

    let (status, _) = send(&app, request(Method::PUT, &format!("/api/admin/users/{sam}?role=Doctor"), ADMIN, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(store.0.lock().get_user(sam).unwrap().role, "Doctor");

    let admin_id = store.0.lock().verify_user("admin", "admin123").unwrap().id;
    let (status, body) =
        send(&app, request(Method::PUT, &format!("/api/admin/users/{admin_id}?role=Nurse"), ADMIN, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Cannot modify admin user");
    let (status, _) = send(&app, request(Method::DELETE, &format!("/api/admin/users/{admin_id}"), ADMIN, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, request(Method::DELETE, &format!("/api/admin/users/{sam}"), ADMIN, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(store.0.lock().get_user(sam).is_none());

    let (status, body) = send(&app, request(Method::DELETE, "/api/admin/users/999", ADMIN, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "User not found");
}

#[tokio::test]
async fn admin_page_redirects_non_admins_to_login() {
    let (app, _) = app();
    let resp = app.clone().oneshot(request(Method::GET, "/admin/users", NURSE, None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers()[header::LOCATION], "/login");

    let resp = app.clone().oneshot(request(Method::GET, "/admin/users", None, None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let resp = app.clone().oneshot(request(Method::GET, "/admin/users", ADMIN, None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn unknown_api_routes() {
    let (app, _) = app();
    let (status, _) = send(&app, request(Method::GET, "/api/nothing", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&app, request(Method::GET, "/api/nothing", DOCTOR, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

fn upgrade_request(path: &str, who: Option<(&str, &str)>) -> Request<Body> {
    let mut b = Request::builder()
        .uri(path)
        .header(header::CONNECTION, "Upgrade")
        .header(header::UPGRADE, "websocket");
    if let Some((role, user)) = who {
        b = b.header("X-User-Role", role).header("X-User-Name", user);
    }
    b.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn upgrade_handshakes_are_gated_like_any_request() {
    let (app, _) = app();
    let (status, body) = send(&app, upgrade_request("/api/patients", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Unauthorized - Missing user credentials");

    let (status, _) = send(&app, upgrade_request("/api/nothing", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, upgrade_request("/api/patients", NURSE)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn non_ascii_usernames_are_accepted() {
    let (app, _) = app();
    let req = Request::builder()
        .uri("/api/patients")
        .header("X-User-Role", "Nurse")
        .header("X-User-Name", HeaderValue::from_bytes("مروة".as_bytes()).unwrap())
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}
