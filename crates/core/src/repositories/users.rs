//! Staff accounts and credential checks.

use super::sessions::revoke_all_for_user;
use super::shared::{conflict_on_unique, now_timestamp};
use crate::config::CoreConfig;
use crate::constants::{ADMIN_USERNAME, FALLBACK_EMAIL_DOMAIN};
use crate::password::{hash_password, verify_password};
use crate::permissions::{Permission, Role};
use crate::validation::validate_password_strength;
use crate::{ClinicError, ClinicResult};
use api_shared::AuthUser;
use sqlx::SqlitePool;
use std::sync::Arc;

pub(crate) const USER_COLUMNS: &str =
    "id, username, email, full_name, role, professional_id, is_active";

const UNIQUE_MESSAGES: &[(&str, &str)] = &[
    ("users.username", "Username already taken"),
    ("users.email", "Email already in use"),
    ("users.professional_id", "Professional already has an account"),
];

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UserRow {
    id: i64,
    username: String,
    email: String,
    full_name: String,
    role: String,
    professional_id: Option<i64>,
    is_active: bool,
}

impl TryFrom<UserRow> for CurrentUser {
    type Error = ClinicError;

    fn try_from(row: UserRow) -> ClinicResult<Self> {
        let role = row
            .role
            .parse::<Role>()
            .map_err(|e| ClinicError::CorruptRecord(format!("user {}: {e}", row.id)))?;
        Ok(CurrentUser {
            id: row.id,
            username: row.username,
            email: row.email,
            full_name: row.full_name,
            role,
            professional_id: row.professional_id,
            is_active: row.is_active,
        })
    }
}

/// An authenticated staff member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub professional_id: Option<i64>,
    pub is_active: bool,
}

impl CurrentUser {
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.role.has_permission(permission)
    }

    /// `Err(Forbidden)` unless the user's role grants `permission`.
    pub fn require(&self, permission: Permission) -> ClinicResult<()> {
        if self.has_permission(permission) {
            Ok(())
        } else {
            Err(ClinicError::Forbidden)
        }
    }
}

impl From<&CurrentUser> for AuthUser {
    fn from(user: &CurrentUser) -> Self {
        AuthUser {
            id: user.id,
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            email: user.email.clone(),
            role: user.role.to_string(),
            professional_id: user.professional_id,
        }
    }
}

/// Fields for a new account. The password is plain text and is hashed on insert.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub professional_id: Option<i64>,
    pub password: String,
}

/// Login e-mail for an account whose owner has none on file.
pub fn fallback_email(username: &str) -> String {
    format!("{username}@{FALLBACK_EMAIL_DOMAIN}")
}

#[derive(Clone)]
pub struct UserService {
    pool: SqlitePool,
    cfg: Arc<CoreConfig>,
}

impl UserService {
    pub fn new(pool: SqlitePool, cfg: Arc<CoreConfig>) -> Self {
        Self { pool, cfg }
    }

    /// Creates an account after checking the password policy.
    ///
    /// Duplicate usernames, e-mails or professional links are conflicts.
    pub async fn create(&self, new: NewUser) -> ClinicResult<CurrentUser> {
        let username = new.username.trim();
        if username.is_empty() {
            return Err(ClinicError::validation("Field username is required"));
        }
        validate_password_strength(&new.password)?;
        let password_hash = hash_password(&new.password, self.cfg.password_rounds()).await?;

        let sql = format!(
            "INSERT INTO users \
             (username, email, password_hash, full_name, role, professional_id, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING {USER_COLUMNS}"
        );
        let row: UserRow = sqlx::query_as(&sql)
            .bind(username)
            .bind(new.email.trim().to_lowercase())
            .bind(password_hash)
            .bind(new.full_name.trim())
            .bind(new.role.as_str())
            .bind(new.professional_id)
            .bind(now_timestamp())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, UNIQUE_MESSAGES))?;

        let user = CurrentUser::try_from(row)?;
        tracing::info!(user_id = user.id, role = %user.role, "user account created");
        Ok(user)
    }

    pub async fn get(&self, id: i64) -> ClinicResult<CurrentUser> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.ok_or_else(|| ClinicError::not_found("User not found"))?
            .try_into()
    }

    pub async fn find_by_professional(
        &self,
        professional_id: i64,
    ) -> ClinicResult<Option<CurrentUser>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE professional_id = ?");
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(professional_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(CurrentUser::try_from).transpose()
    }

    /// Checks a username and password pair and records the login time.
    ///
    /// Unknown users and wrong passwords are indistinguishable
    /// ([`ClinicError::InvalidCredentials`]). A correct password on a disabled
    /// account gives [`ClinicError::InactiveAccount`].
    pub async fn authenticate(&self, username: &str, password: &str) -> ClinicResult<CurrentUser> {
        let sql = format!("SELECT {USER_COLUMNS}, password_hash FROM users WHERE username = ?");
        let found: Option<(UserRow, String)> = sqlx::query_as::<_, UserWithHash>(&sql)
            .bind(username.trim())
            .fetch_optional(&self.pool)
            .await?
            .map(|r| (r.user, r.password_hash));

        let Some((row, password_hash)) = found else {
            tracing::info!("login rejected: unknown username");
            return Err(ClinicError::InvalidCredentials);
        };
        if !verify_password(password, &password_hash).await? {
            tracing::info!(user_id = row.id, "login rejected: wrong password");
            return Err(ClinicError::InvalidCredentials);
        }

        let user = CurrentUser::try_from(row)?;
        if !user.is_active {
            tracing::info!(user_id = user.id, "login rejected: account disabled");
            return Err(ClinicError::InactiveAccount);
        }

        sqlx::query("UPDATE users SET last_login = ? WHERE id = ?")
            .bind(now_timestamp())
            .bind(user.id)
            .execute(&self.pool)
            .await?;

        tracing::info!(user_id = user.id, "user logged in");
        Ok(user)
    }

    /// Replaces a user's password and ends every session they hold.
    pub async fn set_password(&self, user_id: i64, password: &str) -> ClinicResult<()> {
        validate_password_strength(password)?;
        let password_hash = hash_password(password, self.cfg.password_rounds()).await?;

        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ClinicError::not_found("User not found"));
        }
        let revoked = revoke_all_for_user(&mut tx, user_id).await?;
        tx.commit().await?;

        tracing::info!(user_id, revoked, "password changed; sessions revoked");
        Ok(())
    }

    /// Creates the `admin` account unless it already exists.
    ///
    /// Returns `true` when an account was created.
    pub async fn ensure_admin(&self, password: &str) -> ClinicResult<bool> {
        let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE username = ?")
            .bind(ADMIN_USERNAME)
            .fetch_optional(&self.pool)
            .await?;
        if existing.is_some() {
            return Ok(false);
        }

        let created = self
            .create(NewUser {
                username: ADMIN_USERNAME.to_string(),
                email: fallback_email(ADMIN_USERNAME),
                full_name: "Administrator".to_string(),
                role: Role::Admin,
                professional_id: None,
                password: password.to_string(),
            })
            .await;

        match created {
            Ok(_) => Ok(true),
            // Another process created it between the lookup and the insert.
            Err(ClinicError::Conflict(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[derive(sqlx::FromRow)]
struct UserWithHash {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;

    const PASSWORD: &str = "Adm1n!pass";

    async fn service() -> UserService {
        let cfg = CoreConfig::new(2, 1_000, false).unwrap();
        UserService::new(connect_in_memory().await.unwrap(), Arc::new(cfg))
    }

    fn receptionist(username: &str) -> NewUser {
        NewUser {
            username: username.into(),
            email: fallback_email(username),
            full_name: "Rita Reception".into(),
            role: Role::Receptionist,
            professional_id: None,
            password: PASSWORD.into(),
        }
    }

    #[tokio::test]
    async fn ensure_admin_is_idempotent() {
        let users = service().await;
        assert!(users.ensure_admin(PASSWORD).await.unwrap());
        assert!(!users.ensure_admin(PASSWORD).await.unwrap());

        let admin = users.authenticate("admin", PASSWORD).await.unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert_eq!(admin.email, "admin@clinica.local");
    }

    #[tokio::test]
    async fn weak_passwords_are_rejected() {
        let users = service().await;
        let mut new = receptionist("rita");
        new.password = "password".into();
        assert!(matches!(users.create(new).await, Err(ClinicError::Validation(_))));
    }

    #[tokio::test]
    async fn authenticate_distinguishes_bad_credentials_from_disabled_accounts() {
        let users = service().await;
        let rita = users.create(receptionist("rita")).await.unwrap();

        assert!(matches!(
            users.authenticate("rita", "Wr0ng!pass").await,
            Err(ClinicError::InvalidCredentials)
        ));
        assert!(matches!(
            users.authenticate("nobody", PASSWORD).await,
            Err(ClinicError::InvalidCredentials)
        ));

        let logged_in = users.authenticate("rita", PASSWORD).await.unwrap();
        assert_eq!(logged_in.id, rita.id);
        let last_login: Option<String> =
            sqlx::query_scalar("SELECT last_login FROM users WHERE id = ?")
                .bind(rita.id)
                .fetch_one(&users.pool)
                .await
                .unwrap();
        assert!(last_login.is_some());

        sqlx::query("UPDATE users SET is_active = 0 WHERE id = ?")
            .bind(rita.id)
            .execute(&users.pool)
            .await
            .unwrap();
        assert!(matches!(
            users.authenticate("rita", PASSWORD).await,
            Err(ClinicError::InactiveAccount)
        ));
    }

    #[tokio::test]
    async fn duplicate_username_is_a_conflict() {
        let users = service().await;
        users.create(receptionist("rita")).await.unwrap();
        let mut again = receptionist("rita");
        again.email = "other@clinica.local".into();
        let err = users.create(again).await.unwrap_err();
        assert_eq!(err.to_string(), "Username already taken");
    }

    #[tokio::test]
    async fn set_password_replaces_the_hash() {
        let users = service().await;
        let rita = users.create(receptionist("rita")).await.unwrap();
        users.set_password(rita.id, "N3w!password").await.unwrap();

        assert!(users.authenticate("rita", PASSWORD).await.is_err());
        assert!(users.authenticate("rita", "N3w!password").await.is_ok());
        assert!(matches!(
            users.set_password(9_999, "N3w!password").await,
            Err(ClinicError::NotFound(_))
        ));
    }

    #[test]
    fn auth_user_exposes_role_as_text() {
        let user = CurrentUser {
            id: 7,
            username: "rita".into(),
            email: "rita@clinica.local".into(),
            full_name: "Rita".into(),
            role: Role::Receptionist,
            professional_id: None,
            is_active: true,
        };
        let auth = AuthUser::from(&user);
        assert_eq!(auth.role, "receptionist");
        assert!(user.require(Permission::EditPatients).is_ok());
        assert!(matches!(user.require(Permission::All), Err(ClinicError::Forbidden)));
    }
}
