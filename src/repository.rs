use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::{FromRow, PgPool};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::{RepoError, RepoResult},
    models::{
        AdministradorProfile, AlumnoProfile, Audience, Credentials, Evento, EventoChanges,
        MaestroProfile, NewAccount, NewEvento, NewProfile, Role, User, UserTotals,
    },
    policy::AudienceScope,
};

mod memory;
pub use memory::InMemoryRepository;

/// Name of the `hora_fin > hora_inicio` constraint on `eventos`.
pub const EVENT_SCHEDULE_CHECK: &str = "eventos_horario_check";

/// Repository Trait
///
/// The persistence contract used by handlers and the auth extractor. Every
/// mutation is atomic on its own; account creation writes the account and its
/// role record in a single transaction.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Accounts ---
    async fn get_user(&self, id: i64) -> RepoResult<Option<User>>;
    /// Lookup by (case-insensitive) email, including the password hash.
    async fn find_credentials(&self, email: &str) -> RepoResult<Option<Credentials>>;
    /// Creates an account and, when given, its role record. The account's role
    /// is taken from the profile variant. Fails with `Duplicate` on a taken email.
    async fn create_account(
        &self,
        account: NewAccount,
        profile: Option<NewProfile>,
    ) -> RepoResult<User>;
    async fn list_administradores(&self) -> RepoResult<Vec<AdministradorProfile>>;
    async fn list_alumnos(&self) -> RepoResult<Vec<AlumnoProfile>>;
    async fn list_maestros(&self) -> RepoResult<Vec<MaestroProfile>>;
    async fn count_users(&self) -> RepoResult<UserTotals>;

    // --- Tokens ---
    async fn store_token(&self, jti: Uuid, user_id: i64, expires_at: DateTime<Utc>)
    -> RepoResult<()>;
    /// True while the token row exists and has not expired.
    async fn token_active(&self, jti: Uuid) -> RepoResult<bool>;
    /// Returns false if the token was already gone.
    async fn revoke_token(&self, jti: Uuid) -> RepoResult<bool>;
    /// Drops every expired token and returns how many were removed.
    async fn purge_expired_tokens(&self) -> RepoResult<u64>;

    // --- Events ---
    /// Events admitted by `scope`, ordered by id ascending.
    async fn list_events(&self, scope: AudienceScope) -> RepoResult<Vec<Evento>>;
    async fn get_event(&self, id: i64) -> RepoResult<Option<Evento>>;
    async fn create_event(&self, evento: NewEvento) -> RepoResult<Evento>;
    /// Applies `changes` field by field. `None` if the event does not exist.
    /// Fails with `CheckViolation(EVENT_SCHEDULE_CHECK)` when the merged
    /// event would not end after it starts; nothing is written then.
    async fn update_event(&self, id: i64, changes: EventoChanges) -> RepoResult<Option<Evento>>;
    /// Returns false if the event does not exist.
    async fn delete_event(&self, id: i64) -> RepoResult<bool>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

// --- Row mapping ---

const USER_COLUMNS: &str = "id, email, first_name, last_name, is_superuser, role, created_at";

const EVENT_COLUMNS: &str = "id, nombre, tipo, fecha, hora_inicio, hora_fin, lugar, \
     publico_objetivo, programa_educativo, responsable, descripcion, cupo";

#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    email: String,
    first_name: String,
    last_name: String,
    is_superuser: bool,
    role: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepoError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = row
            .role
            .as_deref()
            .map(str::parse::<Role>)
            .transpose()
            .map_err(RepoError::Corrupt)?;
        Ok(User {
            id: row.id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            is_superuser: row.is_superuser,
            role,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct CredentialsRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

#[derive(Debug, FromRow)]
struct EventoRow {
    id: i64,
    nombre: String,
    tipo: String,
    fecha: NaiveDate,
    hora_inicio: NaiveTime,
    hora_fin: NaiveTime,
    lugar: String,
    publico_objetivo: Vec<String>,
    programa_educativo: Option<String>,
    responsable: String,
    descripcion: Option<String>,
    cupo: i32,
}

impl TryFrom<EventoRow> for Evento {
    type Error = RepoError;

    fn try_from(row: EventoRow) -> Result<Self, Self::Error> {
        let publico_objetivo = row
            .publico_objetivo
            .iter()
            .map(|tag| {
                Audience::parse_tag(tag).ok_or_else(|| {
                    RepoError::Corrupt(format!("evento {}: unknown audience {tag:?}", row.id))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Evento {
            id: row.id,
            nombre: row.nombre,
            tipo: row.tipo,
            fecha: row.fecha,
            hora_inicio: row.hora_inicio,
            hora_fin: row.hora_fin,
            lugar: row.lugar,
            publico_objetivo,
            programa_educativo: row.programa_educativo,
            responsable: row.responsable,
            descripcion: row.descripcion,
            cupo: row.cupo,
        })
    }
}

fn audience_tags(tags: &[Audience]) -> Vec<String> {
    tags.iter().map(|tag| tag.as_str().to_string()).collect()
}

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL (see `migrations/`).
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: i64) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find_credentials(&self, email: &str) -> RepoResult<Option<Credentials>> {
        let sql = format!("SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = $1");
        let row = sqlx::query_as::<_, CredentialsRow>(&sql)
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(Some(Credentials {
                user: User::try_from(row.user)?,
                password_hash: row.password_hash,
            })),
            None => Ok(None),
        }
    }

    /// create_account
    ///
    /// Inserts the account and its role record inside one transaction, so a
    /// failure in the second insert leaves no orphaned account behind.
    async fn create_account(
        &self,
        account: NewAccount,
        profile: Option<NewProfile>,
    ) -> RepoResult<User> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO users (email, first_name, last_name, password_hash, is_superuser, role) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(account.email.to_lowercase())
            .bind(&account.first_name)
            .bind(&account.last_name)
            .bind(&account.password_hash)
            .bind(account.is_superuser)
            .bind(profile.as_ref().map(|p| p.role().as_str()))
            .fetch_one(&mut *tx)
            .await?;

        match &profile {
            Some(NewProfile::Administrador(admin)) => {
                sqlx::query(
                    "INSERT INTO administradores (user_id, clave_admin, telefono, rfc, edad, ocupacion) \
                     VALUES ($1, $2, $3, $4, $5, $6)",
                )
                .bind(row.id)
                .bind(&admin.clave_admin)
                .bind(&admin.telefono)
                .bind(&admin.rfc)
                .bind(admin.edad)
                .bind(&admin.ocupacion)
                .execute(&mut *tx)
                .await?;
            }
            Some(NewProfile::Alumno(alumno)) => {
                sqlx::query(
                    "INSERT INTO alumnos (user_id, matricula, curp, rfc, fecha_nacimiento, telefono, ocupacion) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7)",
                )
                .bind(row.id)
                .bind(&alumno.matricula)
                .bind(&alumno.curp)
                .bind(&alumno.rfc)
                .bind(alumno.fecha_nacimiento)
                .bind(&alumno.telefono)
                .bind(&alumno.ocupacion)
                .execute(&mut *tx)
                .await?;
            }
            Some(NewProfile::Maestro(maestro)) => {
                sqlx::query(
                    "INSERT INTO maestros (user_id, id_trabajador, fecha_nacimiento, telefono, rfc, \
                     cubiculo, area_investigacion, materias) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
                )
                .bind(row.id)
                .bind(&maestro.id_trabajador)
                .bind(maestro.fecha_nacimiento)
                .bind(&maestro.telefono)
                .bind(&maestro.rfc)
                .bind(&maestro.cubiculo)
                .bind(&maestro.area_investigacion)
                .bind(maestro.materias.as_slice())
                .execute(&mut *tx)
                .await?;
            }
            None => {}
        }

        tx.commit().await?;
        User::try_from(row)
    }

    async fn list_administradores(&self) -> RepoResult<Vec<AdministradorProfile>> {
        let rows = sqlx::query_as::<_, AdministradorProfile>(
            r#"
            SELECT a.id, a.user_id, u.email, u.first_name, u.last_name,
                   a.clave_admin, a.telefono, a.rfc, a.edad, a.ocupacion
            FROM administradores a
            JOIN users u ON u.id = a.user_id
            ORDER BY a.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_alumnos(&self) -> RepoResult<Vec<AlumnoProfile>> {
        let rows = sqlx::query_as::<_, AlumnoProfile>(
            r#"
            SELECT a.id, a.user_id, u.email, u.first_name, u.last_name,
                   a.matricula, a.curp, a.rfc, a.fecha_nacimiento, a.telefono, a.ocupacion
            FROM alumnos a
            JOIN users u ON u.id = a.user_id
            ORDER BY a.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_maestros(&self) -> RepoResult<Vec<MaestroProfile>> {
        let rows = sqlx::query_as::<_, MaestroProfile>(
            r#"
            SELECT m.id, m.user_id, u.email, u.first_name, u.last_name,
                   m.id_trabajador, m.fecha_nacimiento, m.telefono, m.rfc,
                   m.cubiculo, m.area_investigacion, m.materias
            FROM maestros m
            JOIN users u ON u.id = m.user_id
            ORDER BY m.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn count_users(&self) -> RepoResult<UserTotals> {
        let (admins, maestros, alumnos) = sqlx::query_as::<_, (i64, i64, i64)>(
            r#"
            SELECT COUNT(*) FILTER (WHERE role = 'administrador'),
                   COUNT(*) FILTER (WHERE role = 'maestro'),
                   COUNT(*) FILTER (WHERE role = 'alumno')
            FROM users
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(UserTotals {
            admins,
            maestros,
            alumnos,
        })
    }

    async fn store_token(
        &self,
        jti: Uuid,
        user_id: i64,
        expires_at: DateTime<Utc>,
    ) -> RepoResult<()> {
        sqlx::query("INSERT INTO auth_tokens (jti, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(jti)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn token_active(&self, jti: Uuid) -> RepoResult<bool> {
        let active = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM auth_tokens WHERE jti = $1 AND expires_at > NOW())",
        )
        .bind(jti)
        .fetch_one(&self.pool)
        .await?;
        Ok(active)
    }

    async fn revoke_token(&self, jti: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM auth_tokens WHERE jti = $1")
            .bind(jti)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn purge_expired_tokens(&self) -> RepoResult<u64> {
        let result = sqlx::query("DELETE FROM auth_tokens WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// list_events
    ///
    /// `Only` scopes use array overlap, which the GIN index on
    /// `publico_objetivo` serves.
    async fn list_events(&self, scope: AudienceScope) -> RepoResult<Vec<Evento>> {
        let rows = match scope {
            AudienceScope::Nothing => return Ok(Vec::new()),
            AudienceScope::All => {
                let sql = format!("SELECT {EVENT_COLUMNS} FROM eventos ORDER BY id");
                sqlx::query_as::<_, EventoRow>(&sql)
                    .fetch_all(&self.pool)
                    .await?
            }
            AudienceScope::Only(tags) => {
                let sql = format!(
                    "SELECT {EVENT_COLUMNS} FROM eventos WHERE publico_objetivo && $1 ORDER BY id"
                );
                sqlx::query_as::<_, EventoRow>(&sql)
                    .bind(audience_tags(tags))
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        rows.into_iter().map(Evento::try_from).collect()
    }

    async fn get_event(&self, id: i64) -> RepoResult<Option<Evento>> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM eventos WHERE id = $1");
        sqlx::query_as::<_, EventoRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Evento::try_from)
            .transpose()
    }

    async fn create_event(&self, evento: NewEvento) -> RepoResult<Evento> {
        let sql = format!(
            "INSERT INTO eventos (nombre, tipo, fecha, hora_inicio, hora_fin, lugar, publico_objetivo, \
             programa_educativo, responsable, descripcion, cupo) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING {EVENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, EventoRow>(&sql)
            .bind(&evento.nombre)
            .bind(&evento.tipo)
            .bind(evento.fecha)
            .bind(evento.hora_inicio)
            .bind(evento.hora_fin)
            .bind(&evento.lugar)
            .bind(audience_tags(&evento.publico_objetivo))
            .bind(&evento.programa_educativo)
            .bind(&evento.responsable)
            .bind(&evento.descripcion)
            .bind(evento.cupo)
            .fetch_one(&self.pool)
            .await?;
        Evento::try_from(row)
    }

    /// update_event
    ///
    /// `COALESCE` keeps the stored value for every field the caller left out.
    /// The nullable text columns take a presence flag instead, so that an
    /// explicit clear can write `NULL`. The schedule CHECK runs against the
    /// merged row inside this single statement.
    async fn update_event(&self, id: i64, changes: EventoChanges) -> RepoResult<Option<Evento>> {
        let sql = format!(
            r#"
            UPDATE eventos
            SET nombre = COALESCE($2, nombre),
                tipo = COALESCE($3, tipo),
                fecha = COALESCE($4, fecha),
                hora_inicio = COALESCE($5, hora_inicio),
                hora_fin = COALESCE($6, hora_fin),
                lugar = COALESCE($7, lugar),
                publico_objetivo = COALESCE($8, publico_objetivo),
                programa_educativo = CASE WHEN $9 THEN $10 ELSE programa_educativo END,
                responsable = COALESCE($11, responsable),
                descripcion = CASE WHEN $12 THEN $13 ELSE descripcion END,
                cupo = COALESCE($14, cupo)
            WHERE id = $1
            RETURNING {EVENT_COLUMNS}
            "#
        );
        sqlx::query_as::<_, EventoRow>(&sql)
            .bind(id)
            .bind(changes.nombre)
            .bind(changes.tipo)
            .bind(changes.fecha)
            .bind(changes.hora_inicio)
            .bind(changes.hora_fin)
            .bind(changes.lugar)
            .bind(changes.publico_objetivo.as_deref().map(audience_tags))
            .bind(changes.programa_educativo.is_some())
            .bind(changes.programa_educativo.flatten())
            .bind(changes.responsable)
            .bind(changes.descripcion.is_some())
            .bind(changes.descripcion.flatten())
            .bind(changes.cupo)
            .fetch_optional(&self.pool)
            .await?
            .map(Evento::try_from)
            .transpose()
    }

    async fn delete_event(&self, id: i64) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM eventos WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
