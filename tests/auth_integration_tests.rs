use axum::{
    extract::FromRequestParts,
    http::{Request, request::Parts},
};
use escolar_api::{
    ApiError, AppState, InMemoryRepository,
    auth::{self, AuthUser, Claims},
    config::{AppConfig, Env, SuperuserSeed},
    models::{NewAccount, NewAlumno, NewProfile, Role},
    repository::{Repository, RepositoryState},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use std::sync::Arc;
use uuid::Uuid;

// --- Helpers ---

fn state_with(env: Env) -> AppState {
    AppState {
        repo: Arc::new(InMemoryRepository::new()) as RepositoryState,
        config: AppConfig {
            env,
            ..AppConfig::default()
        },
    }
}

async fn seed_alumno(repo: &dyn Repository) -> i64 {
    let account = NewAccount {
        email: "alumno@escuela.mx".to_string(),
        first_name: "Luis".to_string(),
        last_name: "Pérez".to_string(),
        password_hash: auth::hash_password("secreto123").unwrap(),
        is_superuser: false,
    };
    let profile = NewProfile::Alumno(NewAlumno {
        matricula: "A001".to_string(),
        ..Default::default()
    });
    repo.create_account(account, Some(profile)).await.unwrap().id
}

fn parts_with(headers: &[(&str, String)]) -> Parts {
    let mut builder = Request::builder().uri("/lista-eventos/");
    for (name, value) in headers {
        builder = builder.header(*name, value);
    }
    builder.body(()).unwrap().into_parts().0
}

fn bearer(token: &str) -> (&'static str, String) {
    ("authorization", format!("Bearer {token}"))
}

// --- Extractor ---

#[tokio::test]
async fn test_valid_token_resolves_user() {
    let state = state_with(Env::Production);
    let user_id = seed_alumno(state.repo.as_ref()).await;
    let token = auth::issue_token(state.repo.as_ref(), &state.config, user_id)
        .await
        .unwrap();

    let mut parts = parts_with(&[bearer(&token)]);
    let user = AuthUser::from_request_parts(&mut parts, &state).await.unwrap();

    assert_eq!(user.id, user_id);
    assert_eq!(user.role, Some(Role::Alumno));
    assert!(user.token_id.is_some());
}

#[tokio::test]
async fn test_missing_header_is_unauthorized() {
    let state = state_with(Env::Production);
    let mut parts = parts_with(&[]);
    let result = AuthUser::from_request_parts(&mut parts, &state).await;
    assert!(matches!(result, Err(ApiError::Unauthorized)));
}

#[tokio::test]
async fn test_revoked_token_is_unauthorized() {
    let state = state_with(Env::Production);
    let user_id = seed_alumno(state.repo.as_ref()).await;
    let token = auth::issue_token(state.repo.as_ref(), &state.config, user_id)
        .await
        .unwrap();

    let mut parts = parts_with(&[bearer(&token)]);
    let user = AuthUser::from_request_parts(&mut parts, &state).await.unwrap();
    assert!(state.repo.revoke_token(user.token_id.unwrap()).await.unwrap());

    let mut parts = parts_with(&[bearer(&token)]);
    let result = AuthUser::from_request_parts(&mut parts, &state).await;
    assert!(matches!(result, Err(ApiError::Unauthorized)));
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_unauthorized() {
    let state = state_with(Env::Production);
    let user_id = seed_alumno(state.repo.as_ref()).await;
    let jti = Uuid::new_v4();
    state
        .repo
        .store_token(jti, user_id, chrono::Utc::now() + chrono::Duration::hours(1))
        .await
        .unwrap();

    let now = chrono::Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: user_id.to_string(),
        jti,
        iat: now,
        exp: now + 3600,
    };
    let forged = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"another-secret"),
    )
    .unwrap();

    let mut parts = parts_with(&[bearer(&forged)]);
    let result = AuthUser::from_request_parts(&mut parts, &state).await;
    assert!(matches!(result, Err(ApiError::Unauthorized)));
}

#[tokio::test]
async fn test_unstored_token_is_unauthorized() {
    let state = state_with(Env::Production);
    let user_id = seed_alumno(state.repo.as_ref()).await;
    let now = chrono::Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: user_id.to_string(),
        jti: Uuid::new_v4(),
        iat: now,
        exp: now + 3600,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.config.jwt_secret.as_bytes()),
    )
    .unwrap();

    let mut parts = parts_with(&[bearer(&token)]);
    let result = AuthUser::from_request_parts(&mut parts, &state).await;
    assert!(matches!(result, Err(ApiError::Unauthorized)));
}

#[tokio::test]
async fn test_local_bypass_header() {
    let state = state_with(Env::Local);
    let user_id = seed_alumno(state.repo.as_ref()).await;

    let mut parts = parts_with(&[("x-user-id", user_id.to_string())]);
    let user = AuthUser::from_request_parts(&mut parts, &state).await.unwrap();
    assert_eq!(user.id, user_id);
    assert_eq!(user.token_id, None);
}

#[tokio::test]
async fn test_bypass_header_ignored_in_production() {
    let state = state_with(Env::Production);
    let user_id = seed_alumno(state.repo.as_ref()).await;

    let mut parts = parts_with(&[("x-user-id", user_id.to_string())]);
    let result = AuthUser::from_request_parts(&mut parts, &state).await;
    assert!(matches!(result, Err(ApiError::Unauthorized)));
}

#[tokio::test]
async fn test_purge_drops_only_expired_tokens() {
    let repo = InMemoryRepository::new();
    let user_id = seed_alumno(&repo).await;
    let now = chrono::Utc::now();
    let active = Uuid::new_v4();
    repo.store_token(active, user_id, now + chrono::Duration::hours(1))
        .await
        .unwrap();
    for _ in 0..2 {
        repo.store_token(Uuid::new_v4(), user_id, now - chrono::Duration::minutes(5))
            .await
            .unwrap();
    }

    assert_eq!(repo.purge_expired_tokens().await.unwrap(), 2);
    assert_eq!(repo.purge_expired_tokens().await.unwrap(), 0);
    assert!(repo.token_active(active).await.unwrap());
}

#[tokio::test]
async fn test_issuing_a_token_sweeps_expired_ones() {
    let state = state_with(Env::Production);
    let user_id = seed_alumno(state.repo.as_ref()).await;
    state
        .repo
        .store_token(
            Uuid::new_v4(),
            user_id,
            chrono::Utc::now() - chrono::Duration::hours(2),
        )
        .await
        .unwrap();

    let token = auth::issue_token(state.repo.as_ref(), &state.config, user_id)
        .await
        .unwrap();

    assert_eq!(state.repo.purge_expired_tokens().await.unwrap(), 0);
    let mut parts = parts_with(&[bearer(&token)]);
    assert!(AuthUser::from_request_parts(&mut parts, &state).await.is_ok());
}

// --- Passwords & bootstrap ---

#[test]
fn test_password_hash_verifies() {
    let hash = auth::hash_password("secreto123").unwrap();
    assert_ne!(hash, "secreto123");
    assert!(auth::verify_password("secreto123", &hash));
    assert!(!auth::verify_password("otra-clave", &hash));
    assert!(!auth::verify_password("secreto123", "not-a-phc-string"));
}

#[tokio::test]
async fn test_ensure_superuser_is_idempotent() {
    let repo = InMemoryRepository::new();
    let seed = SuperuserSeed {
        email: "Root@Escuela.mx".to_string(),
        password: "cambiame123".to_string(),
    };

    assert!(auth::ensure_superuser(&repo, &seed).await.unwrap());
    assert!(!auth::ensure_superuser(&repo, &seed).await.unwrap());

    let credentials = repo
        .find_credentials("root@escuela.mx")
        .await
        .unwrap()
        .expect("superuser should exist");
    assert!(credentials.user.is_superuser);
    assert_eq!(credentials.user.effective_role(), Some(Role::Administrador));
    assert!(auth::verify_password("cambiame123", &credentials.password_hash));
}
