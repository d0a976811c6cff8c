/// Errors produced by the Clinica core.
///
/// Variants map one-to-one onto the HTTP taxonomy used by `api-rest`:
/// validation and conflict errors become 400, `NotFound` 404, authentication
/// failures 401, authorisation failures 403 and everything else 500.
#[derive(Debug, thiserror::Error)]
pub enum ClinicError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),

    #[error("Authentication required")]
    Unauthenticated,
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("access denied")]
    Forbidden,
    #[error("account is disabled; contact an administrator")]
    InactiveAccount,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("failed to apply database migrations: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("password hashing failed: {0}")]
    PasswordHash(String),
    #[error("corrupt record: {0}")]
    CorruptRecord(String),
}

impl ClinicError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }
}

pub type ClinicResult<T> = std::result::Result<T, ClinicError>;
