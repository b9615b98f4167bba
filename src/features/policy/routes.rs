use std::sync::Arc;

use axum::{routing::get, Router};

use super::handlers::{get_policy, update_policy};
use super::services::PolicyService;

/// Policy management routes; the caller wraps them in the admin gate
pub fn admin_routes(service: Arc<PolicyService>) -> Router {
    Router::new()
        .route("/api/admin/policy", get(get_policy).patch(update_policy))
        .with_state(service)
}
