//! Constants used throughout the Clinica core crate.

/// Default page size for list endpoints.
pub const DEFAULT_PER_PAGE: i64 = 10;

/// Largest page size a client may request.
pub const MAX_PER_PAGE: i64 = 100;

/// Default session lifetime in hours.
pub const DEFAULT_SESSION_HOURS: i64 = 2;

/// Longest accepted session lifetime (a leap year, in hours).
pub const MAX_SESSION_HOURS: i64 = 24 * 366;

/// Default PBKDF2-SHA256 round count for password hashes.
pub const DEFAULT_PASSWORD_ROUNDS: u32 = 600_000;

/// Lowest PBKDF2 round count accepted by [`crate::CoreConfig`].
pub const MIN_PASSWORD_ROUNDS: u32 = 1_000;

/// Domain used for the e-mail of accounts whose professional has no e-mail on file.
pub const FALLBACK_EMAIL_DOMAIN: &str = "clinica.local";

/// Username of the bootstrap administrator.
pub const ADMIN_USERNAME: &str = "admin";

/// Calendar dates on the wire and in storage.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Record timestamps (`created_at`, `updated_at`) on the wire.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Appointment times on the wire.
pub const APPOINTMENT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
