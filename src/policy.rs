//! Event authorization rule.
//!
//! Administrators (superusers or accounts with the `administrador` role) see and
//! manage every event. Maestros see events aimed at `Profesores` or the general
//! public, alumnos see events aimed at `Estudiantes` or the general public, and
//! accounts without a role see nothing. Only administrators may create, edit or
//! delete events.

use crate::{
    auth::AuthUser,
    error::ApiError,
    models::{Audience, Evento, Role},
};

const MAESTRO_AUDIENCES: &[Audience] = &[Audience::Profesores, Audience::PublicoGeneral];
const ALUMNO_AUDIENCES: &[Audience] = &[Audience::Estudiantes, Audience::PublicoGeneral];

/// AudienceScope
///
/// The slice of events a user may read, expressed so that a repository can
/// apply it as a query filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudienceScope {
    /// Every event.
    All,
    /// Events whose audience shares at least one tag with this list.
    Only(&'static [Audience]),
    /// No events.
    Nothing,
}

impl AudienceScope {
    pub fn admits(&self, audience: &[Audience]) -> bool {
        match self {
            AudienceScope::All => true,
            AudienceScope::Only(allowed) => audience.iter().any(|tag| allowed.contains(tag)),
            AudienceScope::Nothing => false,
        }
    }
}

/// Admin-gated event and account operations, each with the message shown on refusal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction {
    CreateEvent,
    EditEvent,
    DeleteEvent,
    RegisterUser,
}

impl AdminAction {
    pub fn denial_message(&self) -> &'static str {
        match self {
            AdminAction::CreateEvent => {
                "Acción denegada. Solo los administradores pueden registrar eventos."
            }
            AdminAction::EditEvent => "Acción denegada. No tienes permisos para editar eventos.",
            AdminAction::DeleteEvent => {
                "Acción denegada. No tienes permisos para eliminar eventos."
            }
            AdminAction::RegisterUser => {
                "Acción denegada. Solo los administradores pueden registrar usuarios."
            }
        }
    }
}

pub fn is_admin(user: &AuthUser) -> bool {
    user.is_superuser || user.role == Some(Role::Administrador)
}

/// The events `user` may list, as a filter.
pub fn scope_for(user: &AuthUser) -> AudienceScope {
    if is_admin(user) {
        return AudienceScope::All;
    }
    match user.role {
        Some(Role::Maestro) => AudienceScope::Only(MAESTRO_AUDIENCES),
        Some(Role::Alumno) => AudienceScope::Only(ALUMNO_AUDIENCES),
        _ => AudienceScope::Nothing,
    }
}

pub fn can_view(user: &AuthUser, evento: &Evento) -> bool {
    scope_for(user).admits(&evento.publico_objetivo)
}

/// Fails with `Forbidden` unless `user` is an administrator.
pub fn require_admin(user: &AuthUser, action: AdminAction) -> Result<(), ApiError> {
    if is_admin(user) {
        Ok(())
    } else {
        tracing::warn!(user_id = user.id, ?action, "admin-only action refused");
        Err(ApiError::Forbidden(action.denial_message().to_string()))
    }
}
