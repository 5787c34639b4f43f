//!
//! medrec HTTP server
//! ------------------
//! This module defines the Axum-based HTTP API and pages for medrec.
//!
//! Responsibilities:
//! - Shared state: the record store and the permission checker.
//! - The auth interceptor wrapping every route (see `interceptor`).
//! - Patient, report, prescription, notification and user-admin endpoints, each
//!   authorizing its own operation before touching the store.
//! - First-run seeding and startup logs.

use std::net::SocketAddr;

use anyhow::Context;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::Router;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::{AppError, AppResult};
use crate::identity::Authorizer;
use crate::storage::{seed, SharedStore, Store};

pub mod interceptor;
pub mod notifications;
pub mod pages;
pub mod patients;
pub mod prescriptions;
pub mod reports;
pub mod users;

/// Shared server state injected into all handlers.
///
/// The authorizer wraps the frozen permission matrix and is cheap to clone;
/// the store is locked per call.
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub authz: Authorizer,
}

impl AppState {
    pub fn new(store: SharedStore, authz: Authorizer) -> Self { Self { store, authz } }

    /// Run a store mutation on the blocking pool, since every commit rewrites
    /// the snapshot file. Everything `f` changes lands together or not at all.
    pub async fn write<R, F>(&self, f: F) -> AppResult<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut Store) -> AppResult<R> + Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.0.lock().atomically(f))
            .await
            .map_err(|err| AppError::internal("task_join".to_string(), format!("task join error: {err}")))?
    }
}

async fn route_not_found() -> impl IntoResponse { AppError::not_found("route_not_found", "Not Found") }

/// Build the application router. Every route, including the fallback, runs
/// behind the auth interceptor.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(pages::login_page))
        .route("/login", get(pages::login_page).post(pages::login))
        .route("/home", get(pages::home_page))
        .route("/admin/users", get(pages::admin_users_page))
        .route("/api/patients", get(patients::list).post(patients::create))
        .route("/api/patients/{id}", get(patients::show).put(patients::update).delete(patients::remove))
        .route("/api/reports", get(reports::list).post(reports::create))
        .route("/api/statistics", get(reports::statistics))
        .route("/api/prescriptions", get(prescriptions::list).post(prescriptions::create))
        .route("/api/notifications", get(notifications::list))
        .route("/api/notifications/{id}/read", post(notifications::mark_read))
        .route("/api/admin/users", get(users::list).post(users::create))
        .route("/api/admin/users/{id}", put(users::update).delete(users::remove))
        .fallback(route_not_found)
        .layer(middleware::from_fn(interceptor::authenticate))
        .with_state(state)
}

fn log_startup_folders(cfg: &ServerConfig) {
    let cwd = std::env::current_dir().ok();
    let exe = std::env::current_exe().ok();
    let db_path = std::path::Path::new(&cfg.db_folder);
    info!(
        target: "startup",
        "medrec starting. cwd={:?}, exe={:?}, db_folder={:?}, db_folder_exists={}, seed={}",
        cwd, exe, cfg.db_folder, db_path.exists(), cfg.seed
    );
}

/// Open the store, seed it on first run, and serve until the listener fails.
pub async fn run_with_config(cfg: &ServerConfig) -> anyhow::Result<()> {
    log_startup_folders(cfg);

    let store = SharedStore::new(&cfg.db_folder)
        .with_context(|| format!("While opening the record store under: {}", cfg.db_folder))?;
    if cfg.seed {
        let mut guard = store.0.lock();
        seed::seed_if_empty(&mut guard).context("While seeding the record store")?;
    }
    {
        let guard = store.0.lock();
        info!(
            target: "startup",
            users = guard.list_users().len(),
            patients = guard.list_patients().len(),
            snapshot = ?guard.snapshot_path(),
            "record store ready"
        );
    }

    let authz = Authorizer::default();
    for role in crate::identity::Role::ALL {
        let grants: Vec<String> =
            authz.matrix().resources_for(role).iter().map(|(r, set)| format!("{r}={set}")).collect();
        info!(target: "startup", "policy {}: {}", role, grants.join(" "));
    }

    let app = router(AppState::new(store, authz));
    let addr: SocketAddr = cfg.bind_addr().parse().with_context(|| format!("Invalid bind address: {}", cfg.bind_addr()))?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
