use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::error::{ApiError, FieldErrors};

// --- Roles & Audiences ---

/// Role
///
/// The single authorization variant attached to an account. It is written in the
/// same transaction as the matching role record, so an account never holds two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Administrador,
    Maestro,
    Alumno,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Administrador => "administrador",
            Role::Maestro => "maestro",
            Role::Alumno => "alumno",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "administrador" => Ok(Role::Administrador),
            "maestro" => Ok(Role::Maestro),
            "alumno" => Ok(Role::Alumno),
            other => Err(format!("{other:?} is not a valid role")),
        }
    }
}

/// Audience
///
/// One target-audience tag of an event. Events carry a set of these instead of
/// free text, so visibility is a membership test rather than substring search.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS, ToSchema,
)]
#[ts(export)]
pub enum Audience {
    #[serde(rename = "Profesores")]
    Profesores,
    #[serde(rename = "Estudiantes")]
    Estudiantes,
    #[serde(rename = "Público en general")]
    PublicoGeneral,
}

impl Audience {
    pub fn as_str(&self) -> &'static str {
        match self {
            Audience::Profesores => "Profesores",
            Audience::Estudiantes => "Estudiantes",
            Audience::PublicoGeneral => "Público en general",
        }
    }

    /// Matches a single tag, ignoring case, surrounding whitespace and the accent
    /// on "Público".
    pub fn parse_tag(raw: &str) -> Option<Audience> {
        let normalized = raw.trim().to_lowercase().replace('ú', "u");
        match normalized.as_str() {
            "profesores" => Some(Audience::Profesores),
            "estudiantes" => Some(Audience::Estudiantes),
            "publico en general" => Some(Audience::PublicoGeneral),
            _ => None,
        }
    }
}

impl fmt::Display for Audience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// AudienceInput
///
/// Accepted shapes for `publico_objetivo`: a list of tags, or the comma separated
/// text older clients still send ("Estudiantes, Profesores").
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(untagged)]
pub enum AudienceInput {
    Tags(Vec<String>),
    Text(String),
}

impl AudienceInput {
    fn items(self) -> Vec<String> {
        match self {
            AudienceInput::Tags(tags) => tags,
            AudienceInput::Text(text) => text
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(String::from)
                .collect(),
        }
    }

    /// Resolves every item to a tag. The result is sorted and deduplicated.
    pub fn parse(self) -> Result<Vec<Audience>, Vec<String>> {
        let mut tags = Vec::new();
        let mut problems = Vec::new();
        for item in self.items() {
            match Audience::parse_tag(&item) {
                Some(tag) => tags.push(tag),
                None => problems.push(format!(
                    "«{item}» no es un público objetivo válido. Separe los valores con comas; \
                     valores permitidos: Profesores, Estudiantes, Público en general."
                )),
            }
        }
        if tags.is_empty() && problems.is_empty() {
            problems.push("Se requiere al menos un público objetivo.".to_string());
        }
        if !problems.is_empty() {
            return Err(problems);
        }
        tags.sort();
        tags.dedup();
        Ok(tags)
    }
}

// --- Accounts ---

/// User
///
/// An account as seen by the rest of the application. The password hash never
/// leaves the repository except through `Credentials`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_superuser: bool,
    pub role: Option<Role>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Superusers without a role record act as administrators.
    pub fn effective_role(&self) -> Option<Role> {
        match self.role {
            None if self.is_superuser => Some(Role::Administrador),
            role => role,
        }
    }
}

/// Account row plus its stored password hash, used only by the login flow.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: User,
    pub password_hash: String,
}

/// Account fields ready to be persisted (password already hashed).
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub is_superuser: bool,
}

/// Account fields as they arrive from the client, flattened into each
/// registration payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
pub struct AccountFields {
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Validated account fields; the password is still plain text at this point.
#[derive(Debug, Clone)]
pub struct ValidAccount {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl ValidAccount {
    pub fn into_new_account(self, password_hash: String) -> NewAccount {
        NewAccount {
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            password_hash,
            is_superuser: false,
        }
    }
}

impl AccountFields {
    fn validate(self, errors: &mut FieldErrors) -> ValidAccount {
        let email = errors.required("email", self.email).to_lowercase();
        if !email.is_empty() && !email.contains('@') {
            errors.add("email", "Introduzca una dirección de correo electrónico válida.");
        }
        let password = errors.required("password", self.password);
        if !password.is_empty() && password.chars().count() < 8 {
            errors.add("password", "La contraseña debe tener al menos 8 caracteres.");
        }
        ValidAccount {
            email,
            password,
            first_name: self.first_name.unwrap_or_default().trim().to_string(),
            last_name: self.last_name.unwrap_or_default().trim().to_string(),
        }
    }
}

/// NewProfile
///
/// The role record created together with an account. Its variant decides the
/// account's `Role`.
#[derive(Debug, Clone)]
pub enum NewProfile {
    Administrador(NewAdministrador),
    Alumno(NewAlumno),
    Maestro(NewMaestro),
}

impl NewProfile {
    pub fn role(&self) -> Role {
        match self {
            NewProfile::Administrador(_) => Role::Administrador,
            NewProfile::Alumno(_) => Role::Alumno,
            NewProfile::Maestro(_) => Role::Maestro,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewAdministrador {
    pub clave_admin: String,
    pub telefono: String,
    pub rfc: String,
    pub edad: Option<i32>,
    pub ocupacion: String,
}

#[derive(Debug, Clone, Default)]
pub struct NewAlumno {
    pub matricula: String,
    pub curp: String,
    pub rfc: String,
    pub fecha_nacimiento: Option<NaiveDate>,
    pub telefono: String,
    pub ocupacion: String,
}

#[derive(Debug, Clone, Default)]
pub struct NewMaestro {
    pub id_trabajador: String,
    pub fecha_nacimiento: Option<NaiveDate>,
    pub telefono: String,
    pub rfc: String,
    pub cubiculo: String,
    pub area_investigacion: String,
    pub materias: Vec<String>,
}

/// RegistroAdministrador
///
/// Payload of `POST /admin/`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RegistroAdministrador {
    #[serde(flatten)]
    pub cuenta: AccountFields,
    pub clave_admin: Option<String>,
    pub telefono: Option<String>,
    pub rfc: Option<String>,
    pub edad: Option<i32>,
    pub ocupacion: Option<String>,
}

impl RegistroAdministrador {
    pub fn validate(self) -> Result<(ValidAccount, NewProfile), ApiError> {
        let mut errors = FieldErrors::default();
        let account = self.cuenta.validate(&mut errors);
        let clave_admin = errors.required("clave_admin", self.clave_admin);
        if matches!(self.edad, Some(edad) if edad < 0) {
            errors.add("edad", "Asegúrese de que este valor sea mayor o igual a 0.");
        }
        errors.finish()?;
        Ok((
            account,
            NewProfile::Administrador(NewAdministrador {
                clave_admin,
                telefono: optional_text(self.telefono),
                rfc: optional_text(self.rfc),
                edad: self.edad,
                ocupacion: optional_text(self.ocupacion),
            }),
        ))
    }
}

/// RegistroAlumno
///
/// Payload of `POST /alumnos/`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RegistroAlumno {
    #[serde(flatten)]
    pub cuenta: AccountFields,
    pub matricula: Option<String>,
    pub curp: Option<String>,
    pub rfc: Option<String>,
    pub fecha_nacimiento: Option<String>,
    pub telefono: Option<String>,
    pub ocupacion: Option<String>,
}

impl RegistroAlumno {
    pub fn validate(self) -> Result<(ValidAccount, NewProfile), ApiError> {
        let mut errors = FieldErrors::default();
        let account = self.cuenta.validate(&mut errors);
        let matricula = errors.required("matricula", self.matricula);
        let fecha_nacimiento = parse_optional(
            &mut errors,
            "fecha_nacimiento",
            self.fecha_nacimiento,
            parse_date,
            DATE_FORMAT_ERROR,
        );
        errors.finish()?;
        Ok((
            account,
            NewProfile::Alumno(NewAlumno {
                matricula,
                curp: optional_text(self.curp).to_uppercase(),
                rfc: optional_text(self.rfc).to_uppercase(),
                fecha_nacimiento,
                telefono: optional_text(self.telefono),
                ocupacion: optional_text(self.ocupacion),
            }),
        ))
    }
}

/// RegistroMaestro
///
/// Payload of `POST /maestros/`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RegistroMaestro {
    #[serde(flatten)]
    pub cuenta: AccountFields,
    pub id_trabajador: Option<String>,
    pub fecha_nacimiento: Option<String>,
    pub telefono: Option<String>,
    pub rfc: Option<String>,
    pub cubiculo: Option<String>,
    pub area_investigacion: Option<String>,
    #[serde(default)]
    pub materias: Vec<String>,
}

impl RegistroMaestro {
    pub fn validate(self) -> Result<(ValidAccount, NewProfile), ApiError> {
        let mut errors = FieldErrors::default();
        let account = self.cuenta.validate(&mut errors);
        let id_trabajador = errors.required("id_trabajador", self.id_trabajador);
        let fecha_nacimiento = parse_optional(
            &mut errors,
            "fecha_nacimiento",
            self.fecha_nacimiento,
            parse_date,
            DATE_FORMAT_ERROR,
        );
        errors.finish()?;
        Ok((
            account,
            NewProfile::Maestro(NewMaestro {
                id_trabajador,
                fecha_nacimiento,
                telefono: optional_text(self.telefono),
                rfc: optional_text(self.rfc).to_uppercase(),
                cubiculo: optional_text(self.cubiculo),
                area_investigacion: optional_text(self.area_investigacion),
                materias: self
                    .materias
                    .into_iter()
                    .map(|m| m.trim().to_string())
                    .filter(|m| !m.is_empty())
                    .collect(),
            }),
        ))
    }
}

// --- Role record listings ---

/// Account summary nested inside every role record listing.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[ts(export)]
pub struct UserSummary {
    #[sqlx(rename = "user_id")]
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        UserSummary {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[ts(export)]
pub struct AdministradorProfile {
    pub id: i64,
    #[sqlx(flatten)]
    pub user: UserSummary,
    pub clave_admin: String,
    pub telefono: String,
    pub rfc: String,
    pub edad: Option<i32>,
    pub ocupacion: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[ts(export)]
pub struct AlumnoProfile {
    pub id: i64,
    #[sqlx(flatten)]
    pub user: UserSummary,
    pub matricula: String,
    pub curp: String,
    pub rfc: String,
    #[ts(type = "string | null")]
    #[schema(value_type = Option<String>, format = Date)]
    pub fecha_nacimiento: Option<NaiveDate>,
    pub telefono: String,
    pub ocupacion: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[ts(export)]
pub struct MaestroProfile {
    pub id: i64,
    #[sqlx(flatten)]
    pub user: UserSummary,
    pub id_trabajador: String,
    #[ts(type = "string | null")]
    #[schema(value_type = Option<String>, format = Date)]
    pub fecha_nacimiento: Option<NaiveDate>,
    pub telefono: String,
    pub rfc: String,
    pub cubiculo: String,
    pub area_investigacion: String,
    pub materias: Vec<String>,
}

/// Output of `GET /total-usuarios/`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct UserTotals {
    pub admins: i64,
    pub maestros: i64,
    pub alumnos: i64,
}

// --- Events ---

/// Evento
///
/// A school event. `publico_objetivo` is the sorted set of audiences allowed to
/// see it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct Evento {
    pub id: i64,
    pub nombre: String,
    pub tipo: String,
    #[ts(type = "string")]
    #[schema(value_type = String, format = Date)]
    pub fecha: NaiveDate,
    #[ts(type = "string")]
    #[schema(value_type = String, example = "10:00:00")]
    pub hora_inicio: NaiveTime,
    #[ts(type = "string")]
    #[schema(value_type = String, example = "12:00:00")]
    pub hora_fin: NaiveTime,
    pub lugar: String,
    pub publico_objetivo: Vec<Audience>,
    pub programa_educativo: Option<String>,
    pub responsable: String,
    pub descripcion: Option<String>,
    pub cupo: i32,
}

impl Evento {
    /// Applies a partial update; absent fields keep their current values.
    pub fn apply(&mut self, changes: EventoChanges) {
        let EventoChanges {
            nombre,
            tipo,
            fecha,
            hora_inicio,
            hora_fin,
            lugar,
            publico_objetivo,
            programa_educativo,
            responsable,
            descripcion,
            cupo,
        } = changes;
        if let Some(v) = nombre {
            self.nombre = v;
        }
        if let Some(v) = tipo {
            self.tipo = v;
        }
        if let Some(v) = fecha {
            self.fecha = v;
        }
        if let Some(v) = hora_inicio {
            self.hora_inicio = v;
        }
        if let Some(v) = hora_fin {
            self.hora_fin = v;
        }
        if let Some(v) = lugar {
            self.lugar = v;
        }
        if let Some(v) = publico_objetivo {
            self.publico_objetivo = v;
        }
        if let Some(v) = programa_educativo {
            self.programa_educativo = v;
        }
        if let Some(v) = responsable {
            self.responsable = v;
        }
        if let Some(v) = descripcion {
            self.descripcion = v;
        }
        if let Some(v) = cupo {
            self.cupo = v;
        }
    }

    pub fn has_valid_schedule(&self) -> bool {
        self.hora_fin > self.hora_inicio
    }
}

/// A validated event ready to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvento {
    pub nombre: String,
    pub tipo: String,
    pub fecha: NaiveDate,
    pub hora_inicio: NaiveTime,
    pub hora_fin: NaiveTime,
    pub lugar: String,
    pub publico_objetivo: Vec<Audience>,
    pub programa_educativo: Option<String>,
    pub responsable: String,
    pub descripcion: Option<String>,
    pub cupo: i32,
}

impl NewEvento {
    pub fn into_evento(self, id: i64) -> Evento {
        Evento {
            id,
            nombre: self.nombre,
            tipo: self.tipo,
            fecha: self.fecha,
            hora_inicio: self.hora_inicio,
            hora_fin: self.hora_fin,
            lugar: self.lugar,
            publico_objetivo: self.publico_objetivo,
            programa_educativo: self.programa_educativo,
            responsable: self.responsable,
            descripcion: self.descripcion,
            cupo: self.cupo,
        }
    }
}

/// A validated partial update. `None` means "leave unchanged"; for the optional
/// text fields `Some(None)` clears the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventoChanges {
    pub nombre: Option<String>,
    pub tipo: Option<String>,
    pub fecha: Option<NaiveDate>,
    pub hora_inicio: Option<NaiveTime>,
    pub hora_fin: Option<NaiveTime>,
    pub lugar: Option<String>,
    pub publico_objetivo: Option<Vec<Audience>>,
    pub programa_educativo: Option<Option<String>>,
    pub responsable: Option<String>,
    pub descripcion: Option<Option<String>>,
    pub cupo: Option<i32>,
}

/// EventoRequest
///
/// Body of `POST /eventos/`, and of `PUT` where every field is optional. Dates
/// and times arrive as text so that format problems become field errors.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct EventoRequest {
    /// Only read by `PUT /eventos/` when the id is not in the path.
    pub id: Option<i64>,
    pub nombre: Option<String>,
    pub tipo: Option<String>,
    #[schema(example = "2025-03-14")]
    pub fecha: Option<String>,
    #[schema(example = "10:00")]
    pub hora_inicio: Option<String>,
    #[schema(example = "12:00")]
    pub hora_fin: Option<String>,
    pub lugar: Option<String>,
    pub publico_objetivo: Option<AudienceInput>,
    /// Absent keeps the stored value on update; `null` or blank clears it.
    #[serde(default, deserialize_with = "present")]
    #[ts(type = "string | null")]
    #[schema(value_type = Option<String>)]
    pub programa_educativo: Option<Option<String>>,
    pub responsable: Option<String>,
    #[serde(default, deserialize_with = "present")]
    #[ts(type = "string | null")]
    #[schema(value_type = Option<String>)]
    pub descripcion: Option<Option<String>>,
    pub cupo: Option<i32>,
}

/// Marks a field that appeared in the body, even as `null`, so that a missing
/// key and an explicit `null` stay distinguishable.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl EventoRequest {
    /// Full validation for creation: every mandatory field must be present.
    pub fn validate_new(self) -> Result<NewEvento, ApiError> {
        let mut errors = FieldErrors::default();
        let nombre = errors.required("nombre", self.nombre);
        let tipo = errors.required("tipo", self.tipo);
        let lugar = errors.required("lugar", self.lugar);
        let responsable = errors.required("responsable", self.responsable);
        let fecha = parse_required(&mut errors, "fecha", self.fecha, parse_date, DATE_FORMAT_ERROR);
        let hora_inicio =
            parse_required(&mut errors, "hora_inicio", self.hora_inicio, parse_time, TIME_FORMAT_ERROR);
        let hora_fin =
            parse_required(&mut errors, "hora_fin", self.hora_fin, parse_time, TIME_FORMAT_ERROR);
        let publico_objetivo = match self.publico_objetivo {
            Some(input) => audience_or_errors(&mut errors, input),
            None => {
                errors.add("publico_objetivo", "Este campo es requerido.");
                None
            }
        };
        let cupo = match self.cupo {
            Some(cupo) => check_cupo(&mut errors, cupo),
            None => {
                errors.add("cupo", "Este campo es requerido.");
                None
            }
        };
        check_schedule(&mut errors, hora_inicio, hora_fin);

        match (fecha, hora_inicio, hora_fin, publico_objetivo, cupo) {
            (Some(fecha), Some(hora_inicio), Some(hora_fin), Some(publico_objetivo), Some(cupo))
                if errors.is_empty() =>
            {
                Ok(NewEvento {
                    nombre,
                    tipo,
                    fecha,
                    hora_inicio,
                    hora_fin,
                    lugar,
                    publico_objetivo,
                    programa_educativo: non_empty(self.programa_educativo.flatten()),
                    responsable,
                    descripcion: non_empty(self.descripcion.flatten()),
                    cupo,
                })
            }
            _ => Err(ApiError::Validation(errors)),
        }
    }

    /// Partial validation for updates: only the fields that are present are checked.
    pub fn validate_changes(self) -> Result<EventoChanges, ApiError> {
        let mut errors = FieldErrors::default();
        let changes = EventoChanges {
            nombre: errors.not_blank("nombre", self.nombre),
            tipo: errors.not_blank("tipo", self.tipo),
            lugar: errors.not_blank("lugar", self.lugar),
            responsable: errors.not_blank("responsable", self.responsable),
            fecha: parse_optional(&mut errors, "fecha", self.fecha, parse_date, DATE_FORMAT_ERROR),
            hora_inicio: parse_optional(
                &mut errors,
                "hora_inicio",
                self.hora_inicio,
                parse_time,
                TIME_FORMAT_ERROR,
            ),
            hora_fin: parse_optional(&mut errors, "hora_fin", self.hora_fin, parse_time, TIME_FORMAT_ERROR),
            publico_objetivo: self
                .publico_objetivo
                .and_then(|input| audience_or_errors(&mut errors, input)),
            programa_educativo: self.programa_educativo.map(non_empty),
            descripcion: self.descripcion.map(non_empty),
            cupo: self.cupo.and_then(|cupo| check_cupo(&mut errors, cupo)),
        };
        check_schedule(&mut errors, changes.hora_inicio, changes.hora_fin);
        errors.finish()?;
        Ok(changes)
    }
}

// --- Auth payloads ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    /// The account email. `email` is accepted as an alias.
    #[serde(alias = "email")]
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub rol: Option<Role>,
    pub is_superuser: bool,
    pub token: String,
}

// --- Response bodies ---

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DetailsResponse {
    pub details: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LogoutResponse {
    pub logout: bool,
}

/// Body of a successful `POST /eventos/`. The odd key is what deployed clients parse.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EventoCreado {
    #[serde(rename = "Evento creado con ID= ")]
    pub id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EventoActualizado {
    pub message: String,
    pub evento: Evento,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdminCreado {
    pub admin_created_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AlumnoCreado {
    pub alumno_created_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MaestroCreado {
    pub maestro_created_id: i64,
}

// --- Field parsing helpers ---

const DATE_FORMAT_ERROR: &str =
    "Formato de fecha inválido. Utilice uno de los siguientes formatos: YYYY-MM-DD.";
const TIME_FORMAT_ERROR: &str =
    "Formato de hora inválido. Utilice uno de los siguientes formatos: hh:mm[:ss].";

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

fn parse_optional<T>(
    errors: &mut FieldErrors,
    field: &str,
    raw: Option<String>,
    parse: fn(&str) -> Option<T>,
    message: &str,
) -> Option<T> {
    let raw = raw?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let parsed = parse(trimmed);
    if parsed.is_none() {
        errors.add(field, message);
    }
    parsed
}

fn parse_required<T>(
    errors: &mut FieldErrors,
    field: &str,
    raw: Option<String>,
    parse: fn(&str) -> Option<T>,
    message: &str,
) -> Option<T> {
    let parsed = parse_optional(errors, field, raw, parse, message);
    if parsed.is_none() && !errors.contains(field) {
        errors.add(field, "Este campo es requerido.");
    }
    parsed
}

fn audience_or_errors(errors: &mut FieldErrors, input: AudienceInput) -> Option<Vec<Audience>> {
    match input.parse() {
        Ok(tags) => Some(tags),
        Err(problems) => {
            for problem in problems {
                errors.add("publico_objetivo", problem);
            }
            None
        }
    }
}

fn check_cupo(errors: &mut FieldErrors, cupo: i32) -> Option<i32> {
    if cupo < 0 {
        errors.add("cupo", "Asegúrese de que este valor sea mayor o igual a 0.");
        None
    } else {
        Some(cupo)
    }
}

pub const SCHEDULE_ERROR: &str = "La hora de fin debe ser posterior a la hora de inicio.";

fn check_schedule(errors: &mut FieldErrors, start: Option<NaiveTime>, end: Option<NaiveTime>) {
    if let (Some(start), Some(end)) = (start, end) {
        if end <= start {
            errors.add("hora_fin", SCHEDULE_ERROR);
        }
    }
}

fn optional_text(value: Option<String>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
