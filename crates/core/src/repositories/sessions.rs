//! Login sessions.
//!
//! The browser holds a random token; the database only ever sees its SHA-256
//! digest, so a leaked `sessions` table cannot be replayed.

use super::shared::now_timestamp;
use super::users::{CurrentUser, UserRow, USER_COLUMNS};
use crate::config::CoreConfig;
use crate::constants::TIMESTAMP_FORMAT;
use crate::{ClinicError, ClinicResult};
use sqlx::{SqliteConnection, SqlitePool};
use std::sync::Arc;

/// Generates a session token (URL-safe base64, 32 bytes of entropy).
pub fn generate_token() -> String {
    use base64::Engine;
    let bytes: [u8; 32] = rand::random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Ends every session `user_id` holds, on the caller's connection so it can
/// share a transaction with the change that invalidates them.
pub(crate) async fn revoke_all_for_user(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> ClinicResult<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE user_id = ?")
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

/// Hex SHA-256 digest of a session token.
pub fn hash_token(token: &str) -> String {
    use sha2::{Digest, Sha256};
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[derive(Clone)]
pub struct SessionService {
    pool: SqlitePool,
    cfg: Arc<CoreConfig>,
}

impl SessionService {
    pub fn new(pool: SqlitePool, cfg: Arc<CoreConfig>) -> Self {
        Self { pool, cfg }
    }

    /// Opens a session for `user_id` and returns the token for the cookie.
    pub async fn create(&self, user_id: i64) -> ClinicResult<String> {
        let token = generate_token();
        let now = chrono::Utc::now().naive_utc();
        let expires_at = now
            .checked_add_signed(self.cfg.session_lifetime())
            .ok_or_else(|| ClinicError::InvalidConfig("session expiry is out of range".into()))?;

        sqlx::query(
            "INSERT INTO sessions (token_hash, user_id, created_at, expires_at) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(hash_token(&token))
        .bind(user_id)
        .bind(now.format(TIMESTAMP_FORMAT).to_string())
        .bind(expires_at.format(TIMESTAMP_FORMAT).to_string())
        .execute(&self.pool)
        .await?;

        tracing::debug!(user_id, "session opened");
        Ok(token)
    }

    /// The active user holding `token`, if the session exists and has not expired.
    pub async fn resolve(&self, token: &str) -> ClinicResult<Option<CurrentUser>> {
        let columns = USER_COLUMNS
            .split(", ")
            .map(|c| format!("u.{c}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {columns} FROM sessions s JOIN users u ON u.id = s.user_id \
             WHERE s.token_hash = ? AND s.expires_at > ? AND u.is_active = 1"
        );
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(hash_token(token))
            .bind(now_timestamp())
            .fetch_optional(&self.pool)
            .await?;
        row.map(CurrentUser::try_from).transpose()
    }

    pub async fn revoke(&self, token: &str) -> ClinicResult<()> {
        sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(hash_token(token))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Deletes expired sessions and returns how many were removed.
    pub async fn purge_expired(&self) -> ClinicResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(now_timestamp())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() > 0 {
            tracing::info!(removed = result.rows_affected(), "expired sessions purged");
        }
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;
    use crate::permissions::Role;
    use crate::repositories::users::{fallback_email, NewUser, UserService};

    async fn setup() -> (SessionService, UserService, CurrentUser) {
        let pool = connect_in_memory().await.unwrap();
        let cfg = Arc::new(CoreConfig::new(2, 1_000, false).unwrap());
        let users = UserService::new(pool.clone(), cfg.clone());
        let user = users
            .create(NewUser {
                username: "rita".into(),
                email: fallback_email("rita"),
                full_name: "Rita".into(),
                role: Role::Receptionist,
                professional_id: None,
                password: "Str0ng!pass".into(),
            })
            .await
            .unwrap();
        (SessionService::new(pool, cfg), users, user)
    }

    #[test]
    fn tokens_are_unique_and_hashes_deterministic() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert_eq!(hash_token(&a), hash_token(&a));
        assert_ne!(hash_token(&a), hash_token(&b));
        assert_eq!(hash_token(&a).len(), 64);
    }

    #[tokio::test]
    async fn session_resolves_until_revoked() {
        let (sessions, _, user) = setup().await;
        let token = sessions.create(user.id).await.unwrap();

        let resolved = sessions.resolve(&token).await.unwrap().unwrap();
        assert_eq!(resolved.id, user.id);
        assert!(sessions.resolve("forged-token").await.unwrap().is_none());

        sessions.revoke(&token).await.unwrap();
        assert!(sessions.resolve(&token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_sessions_do_not_resolve_and_are_purged() {
        let (sessions, _, user) = setup().await;
        let token = sessions.create(user.id).await.unwrap();
        sqlx::query("UPDATE sessions SET expires_at = '2000-01-01 00:00:00'")
            .execute(&sessions.pool)
            .await
            .unwrap();

        assert!(sessions.resolve(&token).await.unwrap().is_none());
        assert_eq!(sessions.purge_expired().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn password_change_revokes_sessions() {
        let (sessions, users, user) = setup().await;
        let first = sessions.create(user.id).await.unwrap();
        let second = sessions.create(user.id).await.unwrap();

        users.set_password(user.id, "An0ther!pass").await.unwrap();
        assert!(sessions.resolve(&first).await.unwrap().is_none());
        assert!(sessions.resolve(&second).await.unwrap().is_none());
        let left: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions WHERE user_id = ?")
            .bind(user.id)
            .fetch_one(&sessions.pool)
            .await
            .unwrap();
        assert_eq!(left, 0);
    }

    #[tokio::test]
    async fn revoking_all_sessions_leaves_other_users_alone() {
        let (sessions, users, rita) = setup().await;
        let other = users
            .create(NewUser {
                username: "joao".into(),
                email: fallback_email("joao"),
                full_name: "Joao".into(),
                role: Role::Receptionist,
                professional_id: None,
                password: "Str0ng!pass".into(),
            })
            .await
            .unwrap();
        sessions.create(rita.id).await.unwrap();
        sessions.create(rita.id).await.unwrap();
        let kept = sessions.create(other.id).await.unwrap();

        let mut conn = sessions.pool.acquire().await.unwrap();
        assert_eq!(revoke_all_for_user(&mut conn, rita.id).await.unwrap(), 2);
        assert_eq!(revoke_all_for_user(&mut conn, rita.id).await.unwrap(), 0);
        drop(conn);
        assert!(sessions.resolve(&kept).await.unwrap().is_some());
    }
}
