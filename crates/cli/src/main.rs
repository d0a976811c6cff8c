use clap::{Parser, Subcommand};
use clinica_core::config::{password_rounds_from_env_value, session_hours_from_env_value};
use clinica_core::db::{self, DEFAULT_DATABASE_URL};
use clinica_core::repositories::users::fallback_email;
use clinica_core::{
    CoreConfig, NewUser, PageRequest, PatientService, Role, SessionService, UserService,
};
use clinica_types::{format_cpf, format_phone, is_valid_cpf};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "clinica")]
#[command(about = "Clinica clinic-management administration CLI")]
struct Cli {
    /// SQLite database URL
    #[arg(long, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL, global = true)]
    database_url: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Create an administrator account
    CreateAdmin {
        /// Login name
        #[arg(long, default_value = "admin")]
        username: String,
        /// Password (must satisfy the strength policy)
        #[arg(long, env = "CLINICA_ADMIN_PASSWORD")]
        password: String,
        /// Display name
        #[arg(long, default_value = "Administrator")]
        full_name: String,
        /// E-mail (defaults to <username>@clinica.local)
        #[arg(long)]
        email: Option<String>,
    },
    /// Validate a CPF and print its formatted form
    CheckCpf { cpf: String },
    /// Normalise a phone number
    FormatPhone { phone: String },
    /// List patients, newest first
    ListPatients {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        page: Option<i64>,
        #[arg(long)]
        per_page: Option<i64>,
    },
    /// Delete expired login sessions
    PurgeSessions,
}

fn cpf_report(input: &str) -> String {
    if is_valid_cpf(input) {
        format!("{} is valid", format_cpf(input))
    } else {
        format!("{input} is not a valid CPF")
    }
}

fn core_config() -> anyhow::Result<CoreConfig> {
    Ok(CoreConfig::new(
        session_hours_from_env_value(std::env::var("CLINICA_SESSION_HOURS").ok())?,
        password_rounds_from_env_value(std::env::var("CLINICA_PASSWORD_ROUNDS").ok())?,
        true,
    )?)
}

async fn open_database(url: &str) -> anyhow::Result<SqlitePool> {
    tracing::debug!(url, "opening database");
    let pool = db::connect(url).await?;
    db::migrate(&pool).await?;
    Ok(pool)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("clinica=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Migrate) => {
            open_database(&cli.database_url).await?;
            println!("Database at {} is up to date", cli.database_url);
        }
        Some(Commands::CreateAdmin {
            username,
            password,
            full_name,
            email,
        }) => {
            let pool = open_database(&cli.database_url).await?;
            let users = UserService::new(pool, Arc::new(core_config()?));
            let email = email.unwrap_or_else(|| fallback_email(&username));
            let admin = users
                .create(NewUser {
                    username,
                    email,
                    full_name,
                    role: Role::Admin,
                    professional_id: None,
                    password,
                })
                .await?;
            println!("Created administrator {} (id {})", admin.username, admin.id);
        }
        Some(Commands::CheckCpf { cpf }) => {
            println!("{}", cpf_report(&cpf));
        }
        Some(Commands::FormatPhone { phone }) => {
            println!("{}", format_phone(&phone));
        }
        Some(Commands::ListPatients {
            search,
            page,
            per_page,
        }) => {
            let pool = open_database(&cli.database_url).await?;
            let patients = PatientService::new(pool);
            let page = patients
                .list(search.as_deref(), PageRequest::new(page, per_page))
                .await?;
            if page.items.is_empty() {
                println!("No patients found.");
            } else {
                for patient in &page.items {
                    println!(
                        "ID: {}, Name: {}, CPF: {}, Phone: {}, Created: {}",
                        patient.id,
                        patient.full_name,
                        patient.cpf,
                        patient.phone,
                        patient.created_at
                    );
                }
                println!(
                    "Page {} of {} ({} patients)",
                    page.current_page, page.pages, page.total
                );
            }
        }
        Some(Commands::PurgeSessions) => {
            let pool = open_database(&cli.database_url).await?;
            let sessions = SessionService::new(pool, Arc::new(core_config()?));
            let removed = sessions.purge_expired().await?;
            println!("Removed {removed} expired sessions");
        }
        None => {
            println!("Use 'clinica --help' for commands");
        }
    }

    Ok(())
}
