use chrono::{NaiveDate, NaiveTime};
use escolar_api::{
    ApiError,
    auth::AuthUser,
    models::{Audience, Evento, Role},
    policy::{self, AdminAction, AudienceScope},
};

fn user(role: Option<Role>, is_superuser: bool) -> AuthUser {
    AuthUser {
        id: 1,
        email: "usuario@escuela.mx".to_string(),
        is_superuser,
        role,
        token_id: None,
    }
}

fn evento(publico_objetivo: Vec<Audience>) -> Evento {
    Evento {
        id: 1,
        nombre: "Conferencia".to_string(),
        tipo: "Académico".to_string(),
        fecha: NaiveDate::from_ymd_opt(2025, 5, 2).unwrap(),
        hora_inicio: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        hora_fin: NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
        lugar: "Aula magna".to_string(),
        publico_objetivo,
        programa_educativo: None,
        responsable: "Coordinación".to_string(),
        descripcion: None,
        cupo: 50,
    }
}

#[test]
fn test_admins_see_everything() {
    let admin = user(Some(Role::Administrador), false);
    let superuser = user(None, true);
    assert_eq!(policy::scope_for(&admin), AudienceScope::All);
    assert_eq!(policy::scope_for(&superuser), AudienceScope::All);
    assert!(policy::can_view(&admin, &evento(vec![Audience::Estudiantes])));
}

#[test]
fn test_mixed_audience_is_visible_to_both_roles() {
    let mixed = evento(vec![Audience::Profesores, Audience::Estudiantes]);
    assert!(policy::can_view(&user(Some(Role::Maestro), false), &mixed));
    assert!(policy::can_view(&user(Some(Role::Alumno), false), &mixed));
}

#[test]
fn test_roles_only_see_their_audience_or_general_public() {
    let maestro = user(Some(Role::Maestro), false);
    let alumno = user(Some(Role::Alumno), false);
    let solo_estudiantes = evento(vec![Audience::Estudiantes]);
    let solo_profesores = evento(vec![Audience::Profesores]);
    let general = evento(vec![Audience::PublicoGeneral]);

    assert!(!policy::can_view(&maestro, &solo_estudiantes));
    assert!(policy::can_view(&maestro, &solo_profesores));
    assert!(policy::can_view(&maestro, &general));

    assert!(policy::can_view(&alumno, &solo_estudiantes));
    assert!(!policy::can_view(&alumno, &solo_profesores));
    assert!(policy::can_view(&alumno, &general));
}

#[test]
fn test_accounts_without_role_see_nothing() {
    let nadie = user(None, false);
    assert_eq!(policy::scope_for(&nadie), AudienceScope::Nothing);
    assert!(!policy::can_view(&nadie, &evento(vec![Audience::PublicoGeneral])));
}

#[test]
fn test_require_admin_messages() {
    let alumno = user(Some(Role::Alumno), false);
    match policy::require_admin(&alumno, AdminAction::CreateEvent) {
        Err(ApiError::Forbidden(message)) => assert_eq!(
            message,
            "Acción denegada. Solo los administradores pueden registrar eventos."
        ),
        other => panic!("expected Forbidden, got {other:?}"),
    }
    match policy::require_admin(&alumno, AdminAction::DeleteEvent) {
        Err(ApiError::Forbidden(message)) => assert_eq!(
            message,
            "Acción denegada. No tienes permisos para eliminar eventos."
        ),
        other => panic!("expected Forbidden, got {other:?}"),
    }
    assert!(policy::require_admin(&user(None, true), AdminAction::EditEvent).is_ok());
}
