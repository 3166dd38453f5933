use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod policy;
pub mod repository;

// Routers split by access level (public, authenticated, admin-gated).
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::{AppConfig, Env};
pub use error::{ApiError, RepoError};
pub use repository::{InMemoryRepository, PostgresRepository, Repository, RepositoryState};

/// ApiDoc
///
/// OpenAPI document for every handler and wire type, served at
/// `/api-docs/openapi.json` and browsable under `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::login, handlers::logout,
        handlers::register_admin, handlers::register_alumno, handlers::register_maestro,
        handlers::list_admins, handlers::list_alumnos, handlers::list_maestros,
        handlers::total_usuarios,
        handlers::list_eventos, handlers::get_evento, handlers::get_evento_by_id,
        handlers::create_evento, handlers::update_evento, handlers::update_evento_by_id,
        handlers::delete_evento, handlers::delete_evento_by_id
    ),
    components(
        schemas(
            models::Role, models::Audience, models::AudienceInput, models::User,
            models::Evento, models::EventoRequest, models::EventoCreado, models::EventoActualizado,
            models::AccountFields, models::RegistroAdministrador, models::RegistroAlumno,
            models::RegistroMaestro, models::UserSummary, models::AdministradorProfile,
            models::AlumnoProfile, models::MaestroProfile, models::UserTotals,
            models::LoginRequest, models::LoginResponse, models::LogoutResponse,
            models::MessageResponse, models::DetailsResponse, models::AdminCreado,
            models::AlumnoCreado, models::MaestroCreado,
        )
    ),
    tags(
        (name = "escolar-api", description = "School mobile app API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, cheaply clonable state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Persistence layer (Postgres in production, in-memory in tests).
    pub repo: RepositoryState,
    /// The loaded, immutable configuration.
    pub config: AppConfig,
}

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Rejects unauthenticated requests with 401 before any handler runs. The
/// resolved identity is stored in the request extensions so the handler's own
/// `AuthUser` extractor does not repeat the token and database checks.
async fn auth_middleware(auth_user: AuthUser, mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(auth_user);
    next.run(request).await
}

/// create_router
///
/// Assembles every route, the authentication layer, the tracing/request-id
/// stack and CORS, and binds the application state.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    // Everything except /health and /login/ sits behind the authentication layer,
    // including event creation: anonymous callers get 401 at the boundary.
    let protected = authenticated::authenticated_routes()
        .merge(admin::admin_routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let mut base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(protected);

    // Uploaded media is only served by the application itself in local mode.
    if state.config.env == Env::Local {
        base_router = base_router.nest_service("/media", ServeDir::new(&state.config.media_root));
    }

    base_router
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// Builds the per-request span, tagged with the `x-request-id` header.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
