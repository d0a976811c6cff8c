//! Runtime configuration.
//!
//! Everything here is read from the environment once, in `main`, and handed to the
//! services as an `Arc<CoreConfig>`. Request handling never touches the process
//! environment.

use crate::constants::{
    DEFAULT_PASSWORD_ROUNDS, DEFAULT_SESSION_HOURS, MAX_SESSION_HOURS, MIN_PASSWORD_ROUNDS,
};
use crate::{ClinicError, ClinicResult};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    session_lifetime: chrono::Duration,
    password_rounds: u32,
    secure_cookies: bool,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    /// Returns `ClinicError::InvalidConfig` if the session lifetime is outside
    /// `1..=MAX_SESSION_HOURS` or the password round count is below
    /// [`MIN_PASSWORD_ROUNDS`].
    pub fn new(
        session_hours: i64,
        password_rounds: u32,
        secure_cookies: bool,
    ) -> ClinicResult<Self> {
        if session_hours <= 0 {
            return Err(ClinicError::InvalidConfig(
                "session lifetime must be at least one hour".into(),
            ));
        }
        if session_hours > MAX_SESSION_HOURS {
            return Err(ClinicError::InvalidConfig(format!(
                "session lifetime must be at most {MAX_SESSION_HOURS} hours"
            )));
        }
        if password_rounds < MIN_PASSWORD_ROUNDS {
            return Err(ClinicError::InvalidConfig(format!(
                "password rounds must be at least {MIN_PASSWORD_ROUNDS}"
            )));
        }

        Ok(Self {
            session_lifetime: chrono::Duration::hours(session_hours),
            password_rounds,
            secure_cookies,
        })
    }

    pub fn session_lifetime(&self) -> chrono::Duration {
        self.session_lifetime
    }

    pub fn password_rounds(&self) -> u32 {
        self.password_rounds
    }

    pub fn secure_cookies(&self) -> bool {
        self.secure_cookies
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            session_lifetime: chrono::Duration::hours(DEFAULT_SESSION_HOURS),
            password_rounds: DEFAULT_PASSWORD_ROUNDS,
            secure_cookies: true,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse the session lifetime (hours) from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_SESSION_HOURS`].
pub fn session_hours_from_env_value(value: Option<String>) -> ClinicResult<i64> {
    non_blank(value)
        .map(|v| {
            v.parse::<i64>().map_err(|_| {
                ClinicError::InvalidConfig(format!("CLINICA_SESSION_HOURS is not a number: {v}"))
            })
        })
        .transpose()
        .map(|hours| hours.unwrap_or(DEFAULT_SESSION_HOURS))
}

/// Parse the PBKDF2 round count from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_PASSWORD_ROUNDS`].
pub fn password_rounds_from_env_value(value: Option<String>) -> ClinicResult<u32> {
    non_blank(value)
        .map(|v| {
            v.parse::<u32>().map_err(|_| {
                ClinicError::InvalidConfig(format!("CLINICA_PASSWORD_ROUNDS is not a number: {v}"))
            })
        })
        .transpose()
        .map(|rounds| rounds.unwrap_or(DEFAULT_PASSWORD_ROUNDS))
}

/// Secure cookies are disabled only when the environment is explicitly `development`.
pub fn secure_cookies_from_env_value(value: Option<String>) -> bool {
    !matches!(non_blank(value).as_deref(), Some("development"))
}
