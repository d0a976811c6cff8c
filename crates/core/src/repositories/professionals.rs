//! Professionals, the services they offer, and their login accounts.

use super::shared::{
    conflict_on_reference, conflict_on_unique, like_pattern, now_timestamp, Page, PageRequest,
};
use super::users::{fallback_email, CurrentUser, NewUser, UserService};
use crate::config::CoreConfig;
use crate::constants::DATE_FORMAT;
use crate::permissions::Role;
use crate::validation::{
    optional_birth_date, optional_email, optional_registration, optional_text, required_cpf,
    required_phone, required_text,
};
use crate::{ClinicError, ClinicResult};
use api_shared::{
    CreateAccountReq, Professional, ProfessionalReq, ResetPasswordReq, ServiceSummary,
};
use chrono::NaiveDate;
use clinica_types::{Cpf, NonEmptyText, PhoneNumber};
use sqlx::{SqliteConnection, SqlitePool};
use std::sync::Arc;

const SELECT_PROFESSIONAL: &str = "SELECT p.id, p.full_name, p.cpf, p.registration_number, \
     p.phone, p.email, p.birth_date, p.bio, p.is_active, p.created_at, p.updated_at, u.username \
     FROM professionals p LEFT JOIN users u ON u.professional_id = p.id";

const UNIQUE_MESSAGES: &[(&str, &str)] = &[
    ("professionals.cpf", "A professional with this CPF is already registered"),
    ("professionals.email", "Email already in use"),
    ("professionals.registration_number", "Registration number already in use"),
];

#[derive(Debug, sqlx::FromRow)]
struct ProfessionalRow {
    id: i64,
    full_name: String,
    cpf: String,
    registration_number: Option<String>,
    phone: String,
    email: Option<String>,
    birth_date: Option<String>,
    bio: Option<String>,
    is_active: bool,
    created_at: String,
    updated_at: Option<String>,
    username: Option<String>,
}

impl ProfessionalRow {
    fn into_professional(self, services: Vec<ServiceSummary>) -> Professional {
        Professional {
            id: self.id,
            full_name: self.full_name,
            cpf: self.cpf,
            registration_number: self.registration_number,
            phone: self.phone,
            email: self.email,
            birth_date: self.birth_date,
            bio: self.bio,
            is_active: self.is_active,
            services,
            has_account: self.username.is_some(),
            username: self.username,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProfessionalInput {
    pub full_name: NonEmptyText,
    pub cpf: Cpf,
    pub registration_number: Option<String>,
    pub phone: PhoneNumber,
    pub email: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub bio: Option<String>,
    pub is_active: bool,
    /// Ids that do not name an existing service are ignored.
    pub service_ids: Vec<i64>,
}

impl ProfessionalInput {
    pub fn from_request(req: &ProfessionalReq) -> ClinicResult<Self> {
        let full_name = required_text("full_name", req.full_name.as_deref())?;
        let cpf = required_cpf(req.cpf.as_deref())?;
        let phone = required_phone(req.phone.as_deref())?;
        let email = optional_email(req.email.as_deref())?;
        let birth_date = optional_birth_date(req.birth_date.as_deref())?;

        Ok(Self {
            full_name,
            cpf,
            registration_number: optional_registration(req.registration_number.as_deref()),
            phone,
            email,
            birth_date,
            bio: optional_text(req.bio.as_deref()),
            is_active: req.is_active.unwrap_or(true),
            service_ids: req.service_ids.clone().unwrap_or_default(),
        })
    }

    fn birth_date_text(&self) -> Option<String> {
        self.birth_date.map(|d| d.format(DATE_FORMAT).to_string())
    }
}

fn not_found() -> ClinicError {
    ClinicError::not_found("Professional not found")
}

async fn services_of(
    conn: &mut SqliteConnection,
    professional_id: i64,
) -> ClinicResult<Vec<ServiceSummary>> {
    let rows: Vec<(i64, String)> = sqlx::query_as(
        "SELECT s.id, s.name FROM professional_services ps \
         JOIN services s ON s.id = ps.service_id \
         WHERE ps.professional_id = ? ORDER BY s.name COLLATE NOCASE, s.id",
    )
    .bind(professional_id)
    .fetch_all(conn)
    .await?;
    Ok(rows
        .into_iter()
        .map(|(id, name)| ServiceSummary { id, name })
        .collect())
}

async fn load(conn: &mut SqliteConnection, id: i64) -> ClinicResult<Option<Professional>> {
    let sql = format!("{SELECT_PROFESSIONAL} WHERE p.id = ?");
    let row: Option<ProfessionalRow> = sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    match row {
        Some(row) => {
            let services = services_of(conn, row.id).await?;
            Ok(Some(row.into_professional(services)))
        }
        None => Ok(None),
    }
}

/// Replaces the professional's service links. Unknown service ids are skipped.
async fn link_services(
    conn: &mut SqliteConnection,
    professional_id: i64,
    service_ids: &[i64],
) -> ClinicResult<()> {
    sqlx::query("DELETE FROM professional_services WHERE professional_id = ?")
        .bind(professional_id)
        .execute(&mut *conn)
        .await?;
    for service_id in service_ids {
        sqlx::query(
            "INSERT OR IGNORE INTO professional_services (professional_id, service_id) \
             SELECT ?, id FROM services WHERE id = ?",
        )
        .bind(professional_id)
        .bind(service_id)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

#[derive(Clone)]
pub struct ProfessionalService {
    pool: SqlitePool,
    users: UserService,
}

impl ProfessionalService {
    pub fn new(pool: SqlitePool, cfg: Arc<CoreConfig>) -> Self {
        let users = UserService::new(pool.clone(), cfg);
        Self { pool, users }
    }

    pub async fn create(
        &self,
        input: &ProfessionalInput,
        created_by: Option<i64>,
    ) -> ClinicResult<Professional> {
        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO professionals \
             (full_name, cpf, registration_number, phone, email, birth_date, \
              bio, is_active, created_by, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(input.full_name.as_str())
        .bind(input.cpf.as_str())
        .bind(input.registration_number.as_deref())
        .bind(input.phone.as_str())
        .bind(input.email.as_deref())
        .bind(input.birth_date_text())
        .bind(input.bio.as_deref())
        .bind(input.is_active)
        .bind(created_by)
        .bind(now_timestamp())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, UNIQUE_MESSAGES))?;

        link_services(&mut tx, id, &input.service_ids).await?;
        let professional = load(&mut tx, id).await?.ok_or_else(not_found)?;
        tx.commit().await?;

        tracing::info!(professional_id = id, "professional created");
        Ok(professional)
    }

    pub async fn get(&self, id: i64) -> ClinicResult<Professional> {
        let mut conn = self.pool.acquire().await?;
        load(&mut conn, id).await?.ok_or_else(not_found)
    }

    /// Lists professionals by name, filtering on name, CPF, registration number or e-mail.
    pub async fn list(
        &self,
        search: Option<&str>,
        page: PageRequest,
    ) -> ClinicResult<Page<Professional>> {
        const FILTER: &str = r"(?1 IS NULL
            OR p.full_name LIKE ?1 ESCAPE '\'
            OR p.cpf LIKE ?1 ESCAPE '\'
            OR p.registration_number LIKE ?1 ESCAPE '\'
            OR p.email LIKE ?1 ESCAPE '\')";

        let pattern = like_pattern(search);
        let mut conn = self.pool.acquire().await?;

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM professionals p WHERE {FILTER}"))
                .bind(pattern.as_deref())
                .fetch_one(&mut *conn)
                .await?;

        let sql = format!(
            "{SELECT_PROFESSIONAL} WHERE {FILTER} \
             ORDER BY p.full_name COLLATE NOCASE, p.id LIMIT ?2 OFFSET ?3"
        );
        let rows: Vec<ProfessionalRow> = sqlx::query_as(&sql)
            .bind(pattern.as_deref())
            .bind(page.per_page())
            .bind(page.offset())
            .fetch_all(&mut *conn)
            .await?;

        let mut professionals = Vec::with_capacity(rows.len());
        for row in rows {
            let services = services_of(&mut conn, row.id).await?;
            professionals.push(row.into_professional(services));
        }
        Ok(Page::new(professionals, total, page))
    }

    /// Replaces every editable field, including the set of offered services.
    pub async fn update(&self, id: i64, input: &ProfessionalInput) -> ClinicResult<Professional> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE professionals SET full_name = ?, cpf = ?, registration_number = ?, phone = ?, \
             email = ?, birth_date = ?, bio = ?, is_active = ?, updated_at = ? WHERE id = ?",
        )
        .bind(input.full_name.as_str())
        .bind(input.cpf.as_str())
        .bind(input.registration_number.as_deref())
        .bind(input.phone.as_str())
        .bind(input.email.as_deref())
        .bind(input.birth_date_text())
        .bind(input.bio.as_deref())
        .bind(input.is_active)
        .bind(now_timestamp())
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, UNIQUE_MESSAGES))?;
        if result.rows_affected() == 0 {
            return Err(not_found());
        }

        link_services(&mut tx, id, &input.service_ids).await?;
        let professional = load(&mut tx, id).await?.ok_or_else(not_found)?;
        tx.commit().await?;

        tracing::info!(professional_id = id, "professional updated");
        Ok(professional)
    }

    /// Deletes a professional together with their login account.
    pub async fn delete(&self, id: i64) -> ClinicResult<()> {
        let mut tx = self.pool.begin().await?;

        let removed_users = sqlx::query("DELETE FROM users WHERE professional_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let result = sqlx::query("DELETE FROM professionals WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                conflict_on_reference(e, "Professional has appointments and cannot be deleted")
            })?;
        if result.rows_affected() == 0 {
            return Err(not_found());
        }
        tx.commit().await?;

        tracing::info!(professional_id = id, removed_users, "professional deleted");
        Ok(())
    }

    /// Gives a professional a login with the `professional` role.
    pub async fn create_account(
        &self,
        id: i64,
        req: &CreateAccountReq,
    ) -> ClinicResult<CurrentUser> {
        let professional = self.get(id).await?;
        if professional.has_account {
            return Err(ClinicError::conflict("Professional already has an account"));
        }

        let username = optional_text(req.username.as_deref());
        let password = req.password.as_deref().filter(|p| !p.is_empty());
        let (Some(username), Some(password)) = (username, password) else {
            return Err(ClinicError::validation("Username and password are required"));
        };

        let email = professional
            .email
            .clone()
            .unwrap_or_else(|| fallback_email(&username));

        self.users
            .create(NewUser {
                username,
                email,
                full_name: professional.full_name,
                role: Role::Professional,
                professional_id: Some(id),
                password: password.to_string(),
            })
            .await
    }

    /// Sets a new password on the professional's account and signs it out everywhere.
    pub async fn reset_password(&self, id: i64, req: &ResetPasswordReq) -> ClinicResult<()> {
        // Surface a missing professional before a missing account.
        self.get(id).await?;
        let user = self
            .users
            .find_by_professional(id)
            .await?
            .ok_or_else(|| ClinicError::validation("Professional has no user account"))?;

        let password = req
            .password
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ClinicError::validation("Field password is required"))?;

        self.users.set_password(user.id, password).await
    }
}
