//! Operator admin API.
//!
//! # Responsibilities
//! - Expose queue counts, job status, telemetry and health
//! - Pause and resume dispatch
//! - Accept jobs and drive tenant webhook subscriptions
//!
//! Every route sits behind bearer-token auth (`admin.api_key`). The key is
//! swapped in place on config reload; the bind address needs a restart.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::service::DispatchService;

/// Shared state of the admin router.
#[derive(Clone)]
pub struct AdminState {
    pub service: Arc<DispatchService>,
    api_key: Arc<ArcSwap<String>>,
}

impl AdminState {
    pub fn new(service: Arc<DispatchService>, api_key: &str) -> Self {
        Self {
            service,
            api_key: Arc::new(ArcSwap::from_pointee(api_key.to_string())),
        }
    }

    /// Rotate the bearer key for every clone of this state.
    pub fn set_api_key(&self, api_key: &str) {
        self.api_key.store(Arc::new(api_key.to_string()));
    }

    pub(crate) fn api_key(&self) -> Arc<String> {
        self.api_key.load_full()
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/queue", get(get_queue))
        .route("/admin/queue/pause", post(pause_queue))
        .route("/admin/queue/resume", post(resume_queue))
        .route("/admin/jobs", post(create_job))
        .route("/admin/jobs/{id}", get(get_job))
        .route("/admin/telemetry", get(get_telemetry))
        .route("/admin/health", get(get_health))
        .route(
            "/admin/tenants/{id}/subscription",
            get(verify_subscription)
                .post(subscribe_tenant)
                .delete(unsubscribe_tenant),
        )
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
