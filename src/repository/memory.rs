use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{EVENT_SCHEDULE_CHECK, Repository};
use crate::{
    error::{RepoError, RepoResult},
    models::{
        AdministradorProfile, AlumnoProfile, Credentials, Evento, EventoChanges, MaestroProfile,
        NewAccount, NewEvento, NewProfile, Role, User, UserSummary, UserTotals,
    },
    policy::AudienceScope,
};

#[derive(Default)]
struct Store {
    last_user_id: i64,
    last_admin_id: i64,
    last_alumno_id: i64,
    last_maestro_id: i64,
    last_event_id: i64,
    users: BTreeMap<i64, Credentials>,
    administradores: Vec<AdministradorProfile>,
    alumnos: Vec<AlumnoProfile>,
    maestros: Vec<MaestroProfile>,
    events: BTreeMap<i64, Evento>,
    tokens: HashMap<Uuid, (i64, DateTime<Utc>)>,
}

fn next(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

/// InMemoryRepository
///
/// A `Repository` kept entirely in process memory. Used by the test suite and
/// handy for running the API without a database. Each call holds the store lock
/// for its whole duration, which gives the same per-operation atomicity as the
/// Postgres implementation.
#[derive(Default)]
pub struct InMemoryRepository {
    store: RwLock<Store>,
    reject_deletes: bool,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose event deletions fail with a storage error, for exercising
    /// the deletion failure path.
    pub fn rejecting_deletes() -> Self {
        Self {
            reject_deletes: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_user(&self, id: i64) -> RepoResult<Option<User>> {
        let store = self.store.read().await;
        Ok(store.users.get(&id).map(|c| c.user.clone()))
    }

    async fn find_credentials(&self, email: &str) -> RepoResult<Option<Credentials>> {
        let email = email.trim().to_lowercase();
        let store = self.store.read().await;
        Ok(store.users.values().find(|c| c.user.email == email).cloned())
    }

    async fn create_account(
        &self,
        account: NewAccount,
        profile: Option<NewProfile>,
    ) -> RepoResult<User> {
        let mut store = self.store.write().await;
        let email = account.email.to_lowercase();
        if store.users.values().any(|c| c.user.email == email) {
            return Err(RepoError::Duplicate("users_email_key".to_string()));
        }

        let user = User {
            id: next(&mut store.last_user_id),
            email,
            first_name: account.first_name,
            last_name: account.last_name,
            is_superuser: account.is_superuser,
            role: profile.as_ref().map(NewProfile::role),
            created_at: Utc::now(),
        };
        let summary = UserSummary::from(&user);

        match profile {
            Some(NewProfile::Administrador(admin)) => {
                let id = next(&mut store.last_admin_id);
                store.administradores.push(AdministradorProfile {
                    id,
                    user: summary,
                    clave_admin: admin.clave_admin,
                    telefono: admin.telefono,
                    rfc: admin.rfc,
                    edad: admin.edad,
                    ocupacion: admin.ocupacion,
                });
            }
            Some(NewProfile::Alumno(alumno)) => {
                let id = next(&mut store.last_alumno_id);
                store.alumnos.push(AlumnoProfile {
                    id,
                    user: summary,
                    matricula: alumno.matricula,
                    curp: alumno.curp,
                    rfc: alumno.rfc,
                    fecha_nacimiento: alumno.fecha_nacimiento,
                    telefono: alumno.telefono,
                    ocupacion: alumno.ocupacion,
                });
            }
            Some(NewProfile::Maestro(maestro)) => {
                let id = next(&mut store.last_maestro_id);
                store.maestros.push(MaestroProfile {
                    id,
                    user: summary,
                    id_trabajador: maestro.id_trabajador,
                    fecha_nacimiento: maestro.fecha_nacimiento,
                    telefono: maestro.telefono,
                    rfc: maestro.rfc,
                    cubiculo: maestro.cubiculo,
                    area_investigacion: maestro.area_investigacion,
                    materias: maestro.materias,
                });
            }
            None => {}
        }

        store.users.insert(
            user.id,
            Credentials {
                user: user.clone(),
                password_hash: account.password_hash,
            },
        );
        Ok(user)
    }

    async fn list_administradores(&self) -> RepoResult<Vec<AdministradorProfile>> {
        Ok(self.store.read().await.administradores.clone())
    }

    async fn list_alumnos(&self) -> RepoResult<Vec<AlumnoProfile>> {
        Ok(self.store.read().await.alumnos.clone())
    }

    async fn list_maestros(&self) -> RepoResult<Vec<MaestroProfile>> {
        Ok(self.store.read().await.maestros.clone())
    }

    async fn count_users(&self) -> RepoResult<UserTotals> {
        let store = self.store.read().await;
        let count = |role: Role| {
            store
                .users
                .values()
                .filter(|c| c.user.role == Some(role))
                .count() as i64
        };
        Ok(UserTotals {
            admins: count(Role::Administrador),
            maestros: count(Role::Maestro),
            alumnos: count(Role::Alumno),
        })
    }

    async fn store_token(
        &self,
        jti: Uuid,
        user_id: i64,
        expires_at: DateTime<Utc>,
    ) -> RepoResult<()> {
        self.store
            .write()
            .await
            .tokens
            .insert(jti, (user_id, expires_at));
        Ok(())
    }

    async fn token_active(&self, jti: Uuid) -> RepoResult<bool> {
        let store = self.store.read().await;
        Ok(store
            .tokens
            .get(&jti)
            .is_some_and(|(_, expires_at)| *expires_at > Utc::now()))
    }

    async fn revoke_token(&self, jti: Uuid) -> RepoResult<bool> {
        Ok(self.store.write().await.tokens.remove(&jti).is_some())
    }

    async fn purge_expired_tokens(&self) -> RepoResult<u64> {
        let mut store = self.store.write().await;
        let before = store.tokens.len();
        let now = Utc::now();
        store.tokens.retain(|_, (_, expires_at)| *expires_at > now);
        Ok((before - store.tokens.len()) as u64)
    }

    async fn list_events(&self, scope: AudienceScope) -> RepoResult<Vec<Evento>> {
        let store = self.store.read().await;
        Ok(store
            .events
            .values()
            .filter(|evento| scope.admits(&evento.publico_objetivo))
            .cloned()
            .collect())
    }

    async fn get_event(&self, id: i64) -> RepoResult<Option<Evento>> {
        Ok(self.store.read().await.events.get(&id).cloned())
    }

    async fn create_event(&self, evento: NewEvento) -> RepoResult<Evento> {
        let mut store = self.store.write().await;
        let evento = evento.into_evento(next(&mut store.last_event_id));
        store.events.insert(evento.id, evento.clone());
        Ok(evento)
    }

    async fn update_event(&self, id: i64, changes: EventoChanges) -> RepoResult<Option<Evento>> {
        let mut store = self.store.write().await;
        let Some(stored) = store.events.get_mut(&id) else {
            return Ok(None);
        };
        let mut merged = stored.clone();
        merged.apply(changes);
        if !merged.has_valid_schedule() {
            return Err(RepoError::CheckViolation(EVENT_SCHEDULE_CHECK.to_string()));
        }
        *stored = merged.clone();
        Ok(Some(merged))
    }

    async fn delete_event(&self, id: i64) -> RepoResult<bool> {
        let mut store = self.store.write().await;
        if !store.events.contains_key(&id) {
            return Ok(false);
        }
        if self.reject_deletes {
            return Err(RepoError::Unavailable(format!("cannot delete evento {id}")));
        }
        Ok(store.events.remove(&id).is_some())
    }
}
