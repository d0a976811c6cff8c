use std::sync::Arc;

use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{AppState, router};
use clinica_core::config::{
    password_rounds_from_env_value, secure_cookies_from_env_value, session_hours_from_env_value,
};
use clinica_core::db::{self, DEFAULT_DATABASE_URL};
use clinica_core::CoreConfig;

const DEFAULT_REST_ADDR: &str = "0.0.0.0:3000";

/// Process-level settings that never reach the request path.
#[derive(Debug, Clone, PartialEq)]
struct ServerConfig {
    rest_addr: String,
    database_url: String,
    admin_password: Option<String>,
}

impl ServerConfig {
    fn from_env_values(
        rest_addr: Option<String>,
        database_url: Option<String>,
        admin_password: Option<String>,
    ) -> Self {
        let non_blank = |v: Option<String>| v.filter(|v| !v.trim().is_empty());
        Self {
            rest_addr: non_blank(rest_addr).unwrap_or_else(|| DEFAULT_REST_ADDR.into()),
            database_url: non_blank(database_url).unwrap_or_else(|| DEFAULT_DATABASE_URL.into()),
            admin_password: non_blank(admin_password),
        }
    }
}

/// Main entry point for the Clinica server
///
/// Opens and migrates the database, bootstraps the administrator account when
/// asked to, then serves the REST API and web pages.
///
/// # Environment Variables
/// - `CLINICA_REST_ADDR`: Server address (default: "0.0.0.0:3000")
/// - `DATABASE_URL`: SQLite URL (default: "sqlite://clinica.db?mode=rwc")
/// - `CLINICA_SESSION_HOURS`: Session lifetime in hours (default: 2)
/// - `CLINICA_PASSWORD_ROUNDS`: PBKDF2 rounds for new password hashes (default: 600000)
/// - `CLINICA_ENV`: `development` disables the `Secure` cookie flag
/// - `CLINICA_ADMIN_PASSWORD`: Creates the `admin` account at startup if missing
///
/// # Errors
/// Returns an error if the configuration is invalid, the database cannot be
/// opened or migrated, or the server address cannot be bound.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("clinica=info".parse()?)
                .add_directive("clinica_core=info".parse()?)
                .add_directive("api_rest=info".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let server = ServerConfig::from_env_values(
        std::env::var("CLINICA_REST_ADDR").ok(),
        std::env::var("DATABASE_URL").ok(),
        std::env::var("CLINICA_ADMIN_PASSWORD").ok(),
    );
    let cfg = Arc::new(CoreConfig::new(
        session_hours_from_env_value(std::env::var("CLINICA_SESSION_HOURS").ok())?,
        password_rounds_from_env_value(std::env::var("CLINICA_PASSWORD_ROUNDS").ok())?,
        secure_cookies_from_env_value(std::env::var("CLINICA_ENV").ok()),
    )?);

    let pool = db::connect(&server.database_url).await?;
    db::migrate(&pool).await?;

    let state = AppState::new(pool, cfg);
    let purged = state.sessions.purge_expired().await?;
    if purged > 0 {
        tracing::info!("Purged {} expired sessions", purged);
    }
    if let Some(password) = &server.admin_password {
        if state.users.ensure_admin(password).await? {
            tracing::info!("Created the admin account");
        }
    }

    tracing::info!("++ Starting Clinica REST on {}", server.rest_addr);

    let listener = tokio::net::TcpListener::bind(&server.rest_addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    tracing::info!("-- Shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_config_defaults() {
        let server = ServerConfig::from_env_values(None, Some("  ".into()), Some(String::new()));
        assert_eq!(server.rest_addr, DEFAULT_REST_ADDR);
        assert_eq!(server.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(server.admin_password, None);
    }

    #[test]
    fn server_config_takes_explicit_values() {
        let server = ServerConfig::from_env_values(
            Some("127.0.0.1:8080".into()),
            Some("sqlite::memory:".into()),
            Some("S3cure!pass".into()),
        );
        assert_eq!(server.rest_addr, "127.0.0.1:8080");
        assert_eq!(server.database_url, "sqlite::memory:");
        assert_eq!(server.admin_password.as_deref(), Some("S3cure!pass"));
    }
}
