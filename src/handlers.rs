use crate::{
    AppState,
    auth::{self, AuthUser},
    error::{ApiError, FieldErrors, RepoError},
    models::{
        AdminCreado, AdministradorProfile, AlumnoCreado, AlumnoProfile, DetailsResponse, Evento,
        EventoActualizado, EventoCreado, EventoRequest, LoginRequest, LoginResponse,
        LogoutResponse, MaestroCreado, MaestroProfile, MessageResponse, NewProfile,
        RegistroAdministrador, RegistroAlumno, RegistroMaestro, SCHEDULE_ERROR, User, UserTotals,
        ValidAccount,
    },
    policy::{self, AdminAction},
    repository::EVENT_SCHEDULE_CHECK,
};
use axum::{
    Json,
    extract::{FromRequest, Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

// --- Extractors & Parameters ---

/// JsonBody
///
/// `axum::Json` with its rejection converted into an `ApiError`, so malformed
/// bodies get the same JSON error shape as every other failure.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// IdQuery
///
/// The `?id=` parameter accepted by the id-less event routes.
#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct IdQuery {
    /// Event id.
    pub id: Option<String>,
}

fn parse_id(raw: Option<&str>, missing: &str) -> Result<i64, ApiError> {
    let raw = raw.map(str::trim).filter(|raw| !raw.is_empty());
    match raw {
        None => Err(ApiError::BadRequest(missing.to_string())),
        Some(raw) => raw.parse::<i64>().map_err(|_| {
            ApiError::BadRequest("El parámetro 'id' debe ser un número entero.".to_string())
        }),
    }
}

const MISSING_ID_PARAM: &str = "Se requiere el parámetro 'id'";
const MISSING_ID_FIELD: &str = "Se requiere el campo 'id'";

// --- Authentication ---

/// login
///
/// [Public Route] Exchanges an email and password for a bearer token.
#[utoipa::path(
    post,
    path = "/login/",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 400, description = "Wrong credentials", body = MessageResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let credentials = state.repo.find_credentials(&payload.username).await?;
    let user = match credentials {
        Some(c) if auth::verify_password(&payload.password, &c.password_hash) => c.user,
        _ => {
            tracing::info!(username = %payload.username, "login rejected");
            return Err(ApiError::BadRequest(
                "No puede iniciar sesión con las credenciales proporcionadas.".to_string(),
            ));
        }
    };

    let token = auth::issue_token(state.repo.as_ref(), &state.config, user.id).await?;
    tracing::info!(user_id = user.id, "login succeeded");

    Ok(Json(LoginResponse {
        id: user.id,
        rol: user.effective_role(),
        is_superuser: user.is_superuser,
        first_name: user.first_name,
        last_name: user.last_name,
        email: user.email,
        token,
    }))
}

/// logout
///
/// [Authenticated Route] Revokes the token used for this request.
#[utoipa::path(
    post,
    path = "/logout/",
    responses((status = 200, description = "Logged out", body = LogoutResponse))
)]
pub async fn logout(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<LogoutResponse>, ApiError> {
    if let Some(jti) = user.token_id {
        state.repo.revoke_token(jti).await?;
    }
    tracing::info!(user_id = user.id, "logout");
    Ok(Json(LogoutResponse { logout: true }))
}

// --- Accounts ---

/// Persists a validated account together with its role record.
async fn register(
    state: &AppState,
    caller: &AuthUser,
    account: ValidAccount,
    profile: NewProfile,
) -> Result<User, ApiError> {
    let email = account.email.clone();
    let role = profile.role();
    let password_hash = auth::hash_password(&account.password)?;

    match state
        .repo
        .create_account(account.into_new_account(password_hash), Some(profile))
        .await
    {
        Ok(user) => {
            tracing::info!(user_id = user.id, %role, created_by = caller.id, "account registered");
            Ok(user)
        }
        Err(RepoError::Duplicate(_)) => Err(ApiError::BadRequest(format!(
            "El correo {email} ya está registrado"
        ))),
        Err(e) => Err(e.into()),
    }
}

/// register_admin
///
/// [Admin Route] Creates an account with the administrador role.
#[utoipa::path(
    post,
    path = "/admin/",
    request_body = RegistroAdministrador,
    responses(
        (status = 201, description = "Created", body = AdminCreado),
        (status = 400, description = "Invalid payload or email taken"),
        (status = 403, description = "Caller is not an administrator", body = MessageResponse)
    )
)]
pub async fn register_admin(
    user: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RegistroAdministrador>,
) -> Result<(StatusCode, Json<AdminCreado>), ApiError> {
    policy::require_admin(&user, AdminAction::RegisterUser)?;
    let (account, profile) = payload.validate()?;
    let created = register(&state, &user, account, profile).await?;
    Ok((
        StatusCode::CREATED,
        Json(AdminCreado {
            admin_created_id: created.id,
        }),
    ))
}

/// register_alumno
///
/// [Admin Route] Creates an account with the alumno role.
#[utoipa::path(
    post,
    path = "/alumnos/",
    request_body = RegistroAlumno,
    responses(
        (status = 201, description = "Created", body = AlumnoCreado),
        (status = 400, description = "Invalid payload or email taken"),
        (status = 403, description = "Caller is not an administrator", body = MessageResponse)
    )
)]
pub async fn register_alumno(
    user: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RegistroAlumno>,
) -> Result<(StatusCode, Json<AlumnoCreado>), ApiError> {
    policy::require_admin(&user, AdminAction::RegisterUser)?;
    let (account, profile) = payload.validate()?;
    let created = register(&state, &user, account, profile).await?;
    Ok((
        StatusCode::CREATED,
        Json(AlumnoCreado {
            alumno_created_id: created.id,
        }),
    ))
}

/// register_maestro
///
/// [Admin Route] Creates an account with the maestro role.
#[utoipa::path(
    post,
    path = "/maestros/",
    request_body = RegistroMaestro,
    responses(
        (status = 201, description = "Created", body = MaestroCreado),
        (status = 400, description = "Invalid payload or email taken"),
        (status = 403, description = "Caller is not an administrator", body = MessageResponse)
    )
)]
pub async fn register_maestro(
    user: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RegistroMaestro>,
) -> Result<(StatusCode, Json<MaestroCreado>), ApiError> {
    policy::require_admin(&user, AdminAction::RegisterUser)?;
    let (account, profile) = payload.validate()?;
    let created = register(&state, &user, account, profile).await?;
    Ok((
        StatusCode::CREATED,
        Json(MaestroCreado {
            maestro_created_id: created.id,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/lista-admins/",
    responses((status = 200, description = "Administradores", body = [AdministradorProfile]))
)]
pub async fn list_admins(
    _user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<AdministradorProfile>>, ApiError> {
    Ok(Json(state.repo.list_administradores().await?))
}

#[utoipa::path(
    get,
    path = "/lista-alumnos/",
    responses((status = 200, description = "Alumnos", body = [AlumnoProfile]))
)]
pub async fn list_alumnos(
    _user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<AlumnoProfile>>, ApiError> {
    Ok(Json(state.repo.list_alumnos().await?))
}

#[utoipa::path(
    get,
    path = "/lista-maestros/",
    responses((status = 200, description = "Maestros", body = [MaestroProfile]))
)]
pub async fn list_maestros(
    _user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<MaestroProfile>>, ApiError> {
    Ok(Json(state.repo.list_maestros().await?))
}

/// total_usuarios
///
/// [Authenticated Route] Number of accounts per role.
#[utoipa::path(
    get,
    path = "/total-usuarios/",
    responses((status = 200, description = "Totals", body = UserTotals))
)]
pub async fn total_usuarios(
    _user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserTotals>, ApiError> {
    Ok(Json(state.repo.count_users().await?))
}

// --- Events ---

/// list_eventos
///
/// [Authenticated Route] Every event the caller may see, by ascending id.
/// Administrators get all of them; maestros and alumnos get the ones aimed at
/// their audience or the general public; anyone else gets an empty list.
#[utoipa::path(
    get,
    path = "/lista-eventos/",
    responses((status = 200, description = "Visible events", body = [Evento]))
)]
pub async fn list_eventos(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Evento>>, ApiError> {
    let eventos = state.repo.list_events(policy::scope_for(&user)).await?;
    Ok(Json(eventos))
}

async fn show_evento(state: &AppState, user: &AuthUser, id: i64) -> Result<Json<Evento>, ApiError> {
    let evento = state.repo.get_event(id).await?.ok_or(ApiError::NotFound)?;
    if !policy::can_view(user, &evento) {
        return Err(ApiError::Forbidden(
            "No tienes permiso para ver este evento".to_string(),
        ));
    }
    Ok(Json(evento))
}

/// get_evento
///
/// [Authenticated Route] A single event, selected with `?id=`.
#[utoipa::path(
    get,
    path = "/eventos/",
    params(IdQuery),
    responses(
        (status = 200, description = "Found", body = Evento),
        (status = 400, description = "Missing id"),
        (status = 403, description = "Not visible to the caller", body = MessageResponse),
        (status = 404, description = "Not Found", body = MessageResponse)
    )
)]
pub async fn get_evento(
    user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> Result<Json<Evento>, ApiError> {
    let id = parse_id(query.id.as_deref(), MISSING_ID_PARAM)?;
    show_evento(&state, &user, id).await
}

/// get_evento_by_id
///
/// [Authenticated Route] A single event, selected by path.
#[utoipa::path(
    get,
    path = "/eventos/{id}/",
    params(("id" = i64, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Found", body = Evento),
        (status = 403, description = "Not visible to the caller", body = MessageResponse),
        (status = 404, description = "Not Found", body = MessageResponse)
    )
)]
pub async fn get_evento_by_id(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Evento>, ApiError> {
    show_evento(&state, &user, id).await
}

/// create_evento
///
/// [Authenticated Route] Registers a new event. Administrators only.
#[utoipa::path(
    post,
    path = "/eventos/",
    request_body = EventoRequest,
    responses(
        (status = 201, description = "Created", body = EventoCreado),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Caller is not an administrator", body = MessageResponse)
    )
)]
pub async fn create_evento(
    user: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<EventoRequest>,
) -> Result<(StatusCode, Json<EventoCreado>), ApiError> {
    policy::require_admin(&user, AdminAction::CreateEvent)?;
    let nuevo = payload.validate_new()?;
    let evento = state.repo.create_event(nuevo).await?;
    tracing::info!(evento_id = evento.id, user_id = user.id, "evento created");
    Ok((StatusCode::CREATED, Json(EventoCreado { id: evento.id })))
}

async fn apply_update(
    state: &AppState,
    user: &AuthUser,
    id: i64,
    payload: EventoRequest,
) -> Result<Json<EventoActualizado>, ApiError> {
    let changes = payload.validate_changes()?;
    // The store checks the merged schedule in the same write.
    let evento = match state.repo.update_event(id, changes).await {
        Ok(evento) => evento.ok_or(ApiError::NotFound)?,
        Err(RepoError::CheckViolation(constraint)) if constraint == EVENT_SCHEDULE_CHECK => {
            let mut errors = FieldErrors::default();
            errors.add("hora_fin", SCHEDULE_ERROR);
            return Err(ApiError::Validation(errors));
        }
        Err(e) => return Err(e.into()),
    };
    tracing::info!(evento_id = evento.id, user_id = user.id, "evento updated");
    Ok(Json(EventoActualizado {
        message: "Evento actualizado correctamente".to_string(),
        evento,
    }))
}

/// update_evento
///
/// [Authenticated Route] Partial update of the event named by the body's `id`.
/// Administrators only. Fields left out keep their current values.
#[utoipa::path(
    put,
    path = "/eventos/",
    request_body = EventoRequest,
    responses(
        (status = 200, description = "Updated", body = EventoActualizado),
        (status = 400, description = "Missing id or invalid payload"),
        (status = 403, description = "Caller is not an administrator", body = MessageResponse),
        (status = 404, description = "Not Found", body = MessageResponse)
    )
)]
pub async fn update_evento(
    user: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<EventoRequest>,
) -> Result<Json<EventoActualizado>, ApiError> {
    policy::require_admin(&user, AdminAction::EditEvent)?;
    let id = payload
        .id
        .ok_or_else(|| ApiError::BadRequest(MISSING_ID_FIELD.to_string()))?;
    apply_update(&state, &user, id, payload).await
}

/// update_evento_by_id
///
/// [Authenticated Route] Partial update of the event named in the path.
#[utoipa::path(
    put,
    path = "/eventos/{id}/",
    params(("id" = i64, Path, description = "Event ID")),
    request_body = EventoRequest,
    responses(
        (status = 200, description = "Updated", body = EventoActualizado),
        (status = 403, description = "Caller is not an administrator", body = MessageResponse),
        (status = 404, description = "Not Found", body = MessageResponse)
    )
)]
pub async fn update_evento_by_id(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    JsonBody(payload): JsonBody<EventoRequest>,
) -> Result<Json<EventoActualizado>, ApiError> {
    policy::require_admin(&user, AdminAction::EditEvent)?;
    apply_update(&state, &user, id, payload).await
}

/// Storage failures are reported with a generic message; the typed cause
/// travels inside `DeletionFailed` and is logged when the response is built.
async fn remove_evento(
    state: &AppState,
    user: &AuthUser,
    id: i64,
) -> Result<Json<DetailsResponse>, ApiError> {
    match state.repo.delete_event(id).await {
        Ok(true) => {
            tracing::info!(evento_id = id, user_id = user.id, "evento deleted");
            Ok(Json(DetailsResponse {
                details: "Evento eliminado".to_string(),
            }))
        }
        Ok(false) => Err(ApiError::NotFound),
        Err(e) => Err(ApiError::DeletionFailed(e)),
    }
}

/// delete_evento
///
/// [Authenticated Route] Deletes the event selected with `?id=`. Administrators only.
#[utoipa::path(
    delete,
    path = "/eventos/",
    params(IdQuery),
    responses(
        (status = 200, description = "Deleted", body = DetailsResponse),
        (status = 400, description = "Missing id or deletion failed"),
        (status = 403, description = "Caller is not an administrator", body = MessageResponse),
        (status = 404, description = "Not Found", body = MessageResponse)
    )
)]
pub async fn delete_evento(
    user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> Result<Json<DetailsResponse>, ApiError> {
    policy::require_admin(&user, AdminAction::DeleteEvent)?;
    let id = parse_id(query.id.as_deref(), MISSING_ID_PARAM)?;
    remove_evento(&state, &user, id).await
}

/// delete_evento_by_id
///
/// [Authenticated Route] Deletes the event named in the path. Administrators only.
#[utoipa::path(
    delete,
    path = "/eventos/{id}/",
    params(("id" = i64, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Deleted", body = DetailsResponse),
        (status = 400, description = "Deletion failed"),
        (status = 403, description = "Caller is not an administrator", body = MessageResponse),
        (status = 404, description = "Not Found", body = MessageResponse)
    )
)]
pub async fn delete_evento_by_id(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DetailsResponse>, ApiError> {
    policy::require_admin(&user, AdminAction::DeleteEvent)?;
    remove_evento(&state, &user, id).await
}
