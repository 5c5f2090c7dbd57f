use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use cuid2::CuidConstructor;
use once_cell::sync::Lazy;
use rand::RngCore;
use reclaim_config::AuthConfig;
use serde::Serialize;
use sqlx::{Row, SqlitePool, Transaction};
use thiserror::Error;
use tracing::info;

pub const ROLE_INDIVIDUAL: &str = "individual";
pub const ROLE_ORGANIZATION: &str = "organization";

static CUID: Lazy<CuidConstructor> = Lazy::new(CuidConstructor::new);

#[derive(Clone)]
pub struct Authenticator {
    pool: SqlitePool,
    session_ttl: Duration,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("user already exists")]
    UserExists,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("unknown profile role")]
    InvalidRole,
    #[error("user not found")]
    UserNotFound,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("password hashing failed: {0}")]
    PasswordHash(#[from] argon2::password_hash::Error),
    #[error("session not found")]
    SessionNotFound,
    #[error("session expired")]
    SessionExpired,
    #[error("invalid session token")]
    InvalidSession,
}

#[derive(Debug, Clone, Serialize)]
pub struct User {
    #[serde(skip_serializing)]
    pub id: i64,
    pub public_id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub role: String,
    pub verified: bool,
    pub is_admin: bool,
}

#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
}

/// Partial profile update; the outer `Option` distinguishes "leave as is"
/// from "set" and `Some(None)` clears the field.
#[derive(Debug, Default, Clone)]
pub struct UpdateUserProfile {
    pub display_name: Option<Option<String>>,
    pub phone: Option<Option<String>>,
}

/// Admin-only repair of role and verification state.
#[derive(Debug, Default, Clone)]
pub struct AdminUserUpdate {
    pub role: Option<String>,
    pub verified: Option<bool>,
}

impl Authenticator {
    pub fn new(pool: SqlitePool, config: AuthConfig) -> Self {
        let session_ttl = Duration::seconds(config.session_ttl_seconds as i64);
        Self { pool, session_ttl }
    }

    pub fn pool(&self) -> SqlitePool {
        self.pool.clone()
    }

    pub async fn register_with_password(
        &self,
        email: &str,
        password: &str,
        display_name: Option<String>,
        role: &str,
    ) -> Result<(User, AuthSession), AuthError> {
        if role != ROLE_INDIVIDUAL && role != ROLE_ORGANIZATION {
            return Err(AuthError::InvalidRole);
        }

        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query("SELECT id FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&mut *tx)
            .await?;

        if existing.is_some() {
            return Err(AuthError::UserExists);
        }

        let now = Utc::now();
        let password_hash = self.hash_password(password)?;

        let user = self
            .insert_user(&mut tx, email.to_owned(), display_name, role)
            .await?;

        sqlx::query(
            "INSERT INTO user_identities (user_id, provider, provider_uid, secret, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(user.id)
        .bind("password")
        .bind(email)
        .bind(password_hash)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(user = %user.public_id, "registered new profile");
        let session = self.issue_session(user.id).await?;
        Ok((user, session))
    }

    pub async fn login_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(User, AuthSession), AuthError> {
        let identity = sqlx::query(
            "SELECT user_id, secret FROM user_identities WHERE provider = 'password' AND provider_uid = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = identity else {
            return Err(AuthError::InvalidCredentials);
        };

        let secret: String = row.try_get("secret")?;
        let stored_hash = PasswordHash::new(&secret)?;
        Argon2::default()
            .verify_password(password.as_bytes(), &stored_hash)
            .map_err(|_| AuthError::InvalidCredentials)?;

        let user_id: i64 = row.try_get("user_id")?;
        let user = self.fetch_user(user_id).await?;

        let session = self.issue_session(user_id).await?;
        Ok((user, session))
    }

    pub async fn authenticate_token(&self, token: &str) -> Result<(User, AuthSession), AuthError> {
        let row = sqlx::query("SELECT user_id, expires_at FROM sessions WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Err(AuthError::SessionNotFound);
        };

        let user_id: i64 = row.try_get("user_id")?;
        let expires_at: String = row.try_get("expires_at")?;

        let expires_at = DateTime::parse_from_rfc3339(&expires_at)
            .map_err(|_| AuthError::InvalidSession)?
            .with_timezone(&Utc);

        if expires_at <= Utc::now() {
            sqlx::query("DELETE FROM sessions WHERE token = ?")
                .bind(token)
                .execute(&self.pool)
                .await?;
            return Err(AuthError::SessionExpired);
        }

        let user = self.fetch_user(user_id).await?;
        let session = AuthSession {
            token: token.to_owned(),
            user_id,
            expires_at,
        };

        Ok((user, session))
    }

    pub async fn revoke_session(&self, token: &str) -> Result<(), AuthError> {
        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn user_profile(&self, user_id: i64) -> Result<User, AuthError> {
        self.fetch_user(user_id).await
    }

    pub async fn update_user_profile(
        &self,
        user_id: i64,
        update: UpdateUserProfile,
    ) -> Result<User, AuthError> {
        let current = self.fetch_user(user_id).await?;

        let display_name = match update.display_name {
            Some(value) => value,
            None => current.display_name,
        };
        let phone = match update.phone {
            Some(value) => value,
            None => current.phone,
        };

        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE users SET display_name = ?, phone = ?, updated_at = ? WHERE id = ?")
            .bind(display_name.as_deref())
            .bind(phone.as_deref())
            .bind(&now)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        self.fetch_user(user_id).await
    }

    /// Admin fix-up endpoint backing: repair a profile's role or verified
    /// flag without touching anything else.
    pub async fn admin_update_user(
        &self,
        public_id: &str,
        update: AdminUserUpdate,
    ) -> Result<User, AuthError> {
        if let Some(role) = update.role.as_deref() {
            if role != ROLE_INDIVIDUAL && role != ROLE_ORGANIZATION {
                return Err(AuthError::InvalidRole);
            }
        }

        let user_id: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE public_id = ?")
            .bind(public_id)
            .fetch_optional(&self.pool)
            .await?;
        let user_id = user_id.ok_or(AuthError::UserNotFound)?;

        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "UPDATE users SET role = COALESCE(?, role), verified = COALESCE(?, verified), updated_at = ? WHERE id = ?",
        )
        .bind(update.role.as_deref())
        .bind(update.verified)
        .bind(&now)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        info!(user = %public_id, "admin profile fix-up applied");
        self.fetch_user(user_id).await
    }

    pub async fn set_user_role(&self, user_id: i64, role: &str) -> Result<(), AuthError> {
        if role != ROLE_INDIVIDUAL && role != ROLE_ORGANIZATION {
            return Err(AuthError::InvalidRole);
        }

        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE users SET role = ?, updated_at = ? WHERE id = ?")
            .bind(role)
            .bind(&now)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_user(
        &self,
        tx: &mut Transaction<'_, sqlx::Sqlite>,
        email: String,
        display_name: Option<String>,
        role: &str,
    ) -> Result<User, AuthError> {
        let now = Utc::now().to_rfc3339();
        let public_id = new_public_id();

        sqlx::query(
            "INSERT INTO users (public_id, email, display_name, role, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(&email)
        .bind(display_name.as_deref())
        .bind(role)
        .bind(&now)
        .bind(&now)
        .execute(&mut **tx)
        .await?;

        let row = sqlx::query("SELECT id FROM users WHERE public_id = ?")
            .bind(&public_id)
            .fetch_one(&mut **tx)
            .await?;

        Ok(User {
            id: row.try_get("id")?,
            public_id,
            email: Some(email),
            display_name,
            phone: None,
            role: role.to_owned(),
            verified: false,
            is_admin: false,
        })
    }

    async fn fetch_user(&self, id: i64) -> Result<User, AuthError> {
        let row = sqlx::query(
            "SELECT id, public_id, email, display_name, phone, role, verified, is_admin FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Err(AuthError::UserNotFound);
        };

        Ok(User {
            id,
            public_id: row.try_get("public_id")?,
            email: row.try_get("email")?,
            display_name: row.try_get("display_name")?,
            phone: row.try_get("phone")?,
            role: row.try_get("role")?,
            verified: row.try_get("verified")?,
            is_admin: row.try_get("is_admin")?,
        })
    }

    async fn issue_session(&self, user_id: i64) -> Result<AuthSession, AuthError> {
        let token = self.generate_session_token();
        let now = Utc::now();
        let expires_at = now + self.session_ttl;

        sqlx::query(
            "INSERT INTO sessions (user_id, token, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(&token)
        .bind(now.to_rfc3339())
        .bind(expires_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(AuthSession {
            token,
            user_id,
            expires_at,
        })
    }

    fn hash_password(&self, password: &str) -> Result<String, argon2::password_hash::Error> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
        Ok(hash.to_string())
    }

    fn generate_session_token(&self) -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }
}

fn new_public_id() -> String {
    CUID.create_id()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_authenticator() -> Authenticator {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        sqlx::query(
            "CREATE TABLE users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                public_id TEXT NOT NULL UNIQUE,
                email TEXT UNIQUE,
                display_name TEXT,
                phone TEXT,
                role TEXT NOT NULL DEFAULT 'individual',
                is_admin BOOLEAN NOT NULL DEFAULT FALSE,
                verified BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await
        .unwrap();

        sqlx::query(
            "CREATE TABLE user_identities (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                provider TEXT NOT NULL,
                provider_uid TEXT NOT NULL,
                secret TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (provider, provider_uid)
            )",
        )
        .execute(&pool)
        .await
        .unwrap();

        sqlx::query(
            "CREATE TABLE sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                token TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await
        .unwrap();

        Authenticator::new(pool, AuthConfig::default())
    }

    #[tokio::test]
    async fn register_then_login_roundtrip() {
        let auth = test_authenticator().await;

        let (user, session) = auth
            .register_with_password("finder@example.com", "hunter42", None, ROLE_INDIVIDUAL)
            .await
            .unwrap();
        assert_eq!(user.role, ROLE_INDIVIDUAL);
        assert!(!session.token.is_empty());

        let (logged_in, _) = auth
            .login_with_password("finder@example.com", "hunter42")
            .await
            .unwrap();
        assert_eq!(logged_in.id, user.id);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let auth = test_authenticator().await;

        auth.register_with_password("dupe@example.com", "secret", None, ROLE_INDIVIDUAL)
            .await
            .unwrap();

        let err = auth
            .register_with_password("dupe@example.com", "other", None, ROLE_INDIVIDUAL)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UserExists));
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let auth = test_authenticator().await;

        auth.register_with_password("lock@example.com", "right", None, ROLE_INDIVIDUAL)
            .await
            .unwrap();

        let err = auth
            .login_with_password("lock@example.com", "wrong")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn unknown_role_is_rejected() {
        let auth = test_authenticator().await;

        let err = auth
            .register_with_password("who@example.com", "secret", None, "superuser")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidRole));
    }

    #[tokio::test]
    async fn session_token_authenticates_until_revoked() {
        let auth = test_authenticator().await;

        let (user, session) = auth
            .register_with_password("keeper@example.com", "secret", None, ROLE_ORGANIZATION)
            .await
            .unwrap();

        let (authed, _) = auth.authenticate_token(&session.token).await.unwrap();
        assert_eq!(authed.id, user.id);

        auth.revoke_session(&session.token).await.unwrap();
        let err = auth.authenticate_token(&session.token).await.unwrap_err();
        assert!(matches!(err, AuthError::SessionNotFound));
    }

    #[tokio::test]
    async fn admin_fix_up_changes_role_and_verified() {
        let auth = test_authenticator().await;

        let (user, _) = auth
            .register_with_password("fix@example.com", "secret", None, ROLE_INDIVIDUAL)
            .await
            .unwrap();

        let updated = auth
            .admin_update_user(
                &user.public_id,
                AdminUserUpdate {
                    role: Some(ROLE_ORGANIZATION.to_string()),
                    verified: Some(true),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.role, ROLE_ORGANIZATION);
        assert!(updated.verified);
    }

    #[tokio::test]
    async fn profile_update_clears_and_sets_fields() {
        let auth = test_authenticator().await;

        let (user, _) = auth
            .register_with_password(
                "profile@example.com",
                "secret",
                Some("Original".to_string()),
                ROLE_INDIVIDUAL,
            )
            .await
            .unwrap();

        let updated = auth
            .update_user_profile(
                user.id,
                UpdateUserProfile {
                    display_name: Some(Some("Renamed".to_string())),
                    phone: Some(Some("+15550100".to_string())),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.display_name.as_deref(), Some("Renamed"));
        assert_eq!(updated.phone.as_deref(), Some("+15550100"));

        let cleared = auth
            .update_user_profile(
                user.id,
                UpdateUserProfile {
                    display_name: None,
                    phone: Some(None),
                },
            )
            .await
            .unwrap();
        assert_eq!(cleared.display_name.as_deref(), Some("Renamed"));
        assert_eq!(cleared.phone, None);
    }
}
