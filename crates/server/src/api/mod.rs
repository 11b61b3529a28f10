pub mod admin_bookings;
pub mod admin_broadcasts;
pub mod admin_recurring;
pub mod admin_schedules;
pub mod auth;
pub mod bookings;
pub mod health;
pub mod openapi;
pub mod points;
pub mod reports;
pub mod schedules;
pub mod schemas;
pub mod shifts;

use axum::Router;
use axum::middleware;
use axum::routing::{delete, get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use self::openapi::ApiDoc;
use crate::auth_middleware::{require_admin, require_auth};
use crate::state::AppState;

/// Builds the full HTTP router: the two OTP bootstrap routes (public),
/// everything else behind bearer auth, and `/api/admin/*` additionally
/// behind the admin-role check, per §6.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(health::health))
        .route("/auth/register", post(auth::register))
        .route("/auth/verify", post(auth::verify));

    let admin = Router::new()
        .route(
            "/api/admin/schedules",
            get(admin_schedules::list_schedules).post(admin_schedules::create_schedule),
        )
        .route(
            "/api/admin/schedules/{id}",
            get(admin_schedules::get_schedule)
                .put(admin_schedules::update_schedule)
                .delete(admin_schedules::delete_schedule),
        )
        .route("/api/admin/bookings/assign", post(admin_bookings::assign_booking))
        .route("/api/admin/bookings/{id}", delete(admin_bookings::cancel_booking))
        .route(
            "/api/admin/recurring-assignments",
            get(admin_recurring::list_recurring_assignments).post(admin_recurring::create_recurring_assignment),
        )
        .route(
            "/api/admin/recurring-assignments/{id}",
            get(admin_recurring::get_recurring_assignment).delete(admin_recurring::deactivate_recurring_assignment),
        )
        .route(
            "/api/admin/recurring-assignments/materialize",
            post(admin_recurring::materialize),
        )
        .route("/api/admin/broadcasts", post(admin_broadcasts::create_broadcast))
        // Admin check runs first (innermost layer added here), then auth
        // resolves `CurrentUser` on the way in -- see the protected router's
        // own layer ordering below.
        .layer(middleware::from_fn(require_admin));

    let protected = Router::new()
        .route("/schedules", get(schedules::list_schedules))
        .route("/shifts/available", get(shifts::available_shifts))
        .route("/bookings", post(bookings::create_booking))
        .route("/bookings/my", get(bookings::my_bookings))
        .route("/bookings/{id}/checkin", post(bookings::check_in))
        .route("/bookings/{id}/report", post(bookings::file_on_shift_report))
        .route("/reports/off-shift", post(reports::file_off_shift_report))
        .route("/points/me", get(points::my_points))
        .merge(admin)
        // Auth is the outermost layer on the protected router, so it runs
        // before the admin-only layer nested inside `admin` above.
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public)
        .merge(protected)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
