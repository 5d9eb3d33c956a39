mod attendance_coaches;
mod attendance_users;
pub mod auth;
mod dashboard;
mod error;
mod flash;
mod memberships;
mod payments;
mod users;
mod validation;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Auth routes (public)
    let auth_routes = Router::new()
        .route("/login", get(auth::login_form).post(auth::login))
        .route("/logout", post(auth::logout));

    // Admin section: dashboards plus every resource, coaches included
    let admin_routes = Router::new()
        .route("/dashboard", get(dashboard::admin_dashboard))
        .route("/dashboard/users", get(dashboard::users_dashboard))
        .route("/dashboard/user-stats", get(dashboard::user_stats))
        .route("/dashboard/users-by-month", get(dashboard::users_by_month))
        .route(
            "/attendance-coaches",
            get(attendance_coaches::index).post(attendance_coaches::store),
        )
        .route(
            "/attendance-coaches/:id",
            get(attendance_coaches::show)
                .put(attendance_coaches::update)
                .delete(attendance_coaches::destroy),
        )
        .merge(staff_resources())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_admin,
        ));

    // Receptionist section: same resources, no coach attendance
    let receptionist_routes = Router::new()
        .route("/dashboard", get(dashboard::receptionist_dashboard))
        .merge(staff_resources())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_receptionist,
        ));

    // Member landing page
    let member_routes = Router::new()
        .route("/dashboard", get(dashboard::member_dashboard))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_member,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(auth_routes)
        .nest("/admin", admin_routes)
        .nest("/receptionist", receptionist_routes)
        .merge(member_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The CRUD routes shared by the admin and receptionist sections.
fn staff_resources() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", get(users::index).post(users::store))
        .route(
            "/users/:id",
            get(users::show).put(users::update).delete(users::destroy),
        )
        .route(
            "/memberships",
            get(memberships::index).post(memberships::store),
        )
        .route(
            "/memberships/:id",
            get(memberships::show)
                .put(memberships::update)
                .delete(memberships::destroy),
        )
        .route("/payments", get(payments::index).post(payments::store))
        .route(
            "/payments/:id",
            get(payments::show)
                .put(payments::update)
                .delete(payments::destroy),
        )
        .route(
            "/attendance-users",
            get(attendance_users::index).post(attendance_users::store),
        )
        .route(
            "/attendance-users/:id",
            get(attendance_users::show)
                .put(attendance_users::update)
                .delete(attendance_users::destroy),
        )
}

async fn health_check() -> &'static str {
    "OK"
}
