use crate::{AppState, handlers};
use axum::{Router, routing::post};

/// Admin Router Module
///
/// Account registration. These routes sit behind the authentication layer and
/// each handler refuses callers that are not administrators (403).
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // POST /admin/
        // Creates an account with the administrador role.
        .route("/admin/", post(handlers::register_admin))
        // POST /alumnos/
        .route("/alumnos/", post(handlers::register_alumno))
        // POST /maestros/
        .route("/maestros/", post(handlers::register_maestro))
}
