use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// Routes for any caller holding a valid token. Event mutations are further
/// restricted to administrators inside the handlers, and event reads are
/// filtered by the caller's role.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // POST /logout/
        // Revokes the presented token.
        .route("/logout/", post(handlers::logout))
        // --- Accounts ---
        .route("/lista-admins/", get(handlers::list_admins))
        .route("/lista-alumnos/", get(handlers::list_alumnos))
        .route("/lista-maestros/", get(handlers::list_maestros))
        // GET /total-usuarios/
        // Account counts per role.
        .route("/total-usuarios/", get(handlers::total_usuarios))
        // --- Events ---
        // GET /lista-eventos/
        // Role-filtered listing, ascending id.
        .route("/lista-eventos/", get(handlers::list_eventos))
        // /eventos/ selects the event with ?id= (GET, DELETE) or the body's id (PUT).
        .route(
            "/eventos/",
            get(handlers::get_evento)
                .post(handlers::create_evento)
                .put(handlers::update_evento)
                .delete(handlers::delete_evento),
        )
        .route(
            "/eventos/{id}/",
            get(handlers::get_evento_by_id)
                .put(handlers::update_evento_by_id)
                .delete(handlers::delete_evento_by_id),
        )
}
