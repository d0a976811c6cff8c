//! Patient records.

use super::shared::{
    conflict_on_reference, conflict_on_unique, like_pattern, now_timestamp, Page, PageRequest,
};
use crate::constants::DATE_FORMAT;
use crate::validation::{
    optional_birth_date, optional_text, required_cpf, required_phone, required_text,
};
use crate::{ClinicError, ClinicResult};
use api_shared::{Patient, PatientReq};
use chrono::NaiveDate;
use clinica_types::{Cpf, NonEmptyText, PhoneNumber};
use sqlx::SqlitePool;

const PATIENT_COLUMNS: &str = "id, full_name, cpf, birth_date, phone, musical_preference, \
                               observations, created_at, updated_at";

const UNIQUE_MESSAGES: &[(&str, &str)] =
    &[("patients.cpf", "A patient with this CPF is already registered")];

#[derive(Debug, sqlx::FromRow)]
struct PatientRow {
    id: i64,
    full_name: String,
    cpf: String,
    birth_date: Option<String>,
    phone: String,
    musical_preference: Option<String>,
    observations: Option<String>,
    created_at: String,
    updated_at: Option<String>,
}

impl From<PatientRow> for Patient {
    fn from(row: PatientRow) -> Self {
        Patient {
            id: row.id,
            full_name: row.full_name,
            cpf: row.cpf,
            birth_date: row.birth_date,
            phone: row.phone,
            musical_preference: row.musical_preference,
            observations: row.observations,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Validated patient fields, used for both create and update.
#[derive(Debug, Clone)]
pub struct PatientInput {
    pub full_name: NonEmptyText,
    pub cpf: Cpf,
    pub birth_date: Option<NaiveDate>,
    pub phone: PhoneNumber,
    pub musical_preference: Option<String>,
    pub observations: Option<String>,
}

impl PatientInput {
    pub fn from_request(req: &PatientReq) -> ClinicResult<Self> {
        let full_name = required_text("full_name", req.full_name.as_deref())?;
        let cpf = required_cpf(req.cpf.as_deref())?;
        let phone = required_phone(req.phone.as_deref())?;
        let birth_date = optional_birth_date(req.birth_date.as_deref())?;

        Ok(Self {
            full_name,
            cpf,
            birth_date,
            phone,
            musical_preference: optional_text(req.musical_preference.as_deref()),
            observations: optional_text(req.observations.as_deref()),
        })
    }

    fn birth_date_text(&self) -> Option<String> {
        self.birth_date.map(|d| d.format(DATE_FORMAT).to_string())
    }
}

fn not_found() -> ClinicError {
    ClinicError::not_found("Patient not found")
}

#[derive(Clone)]
pub struct PatientService {
    pool: SqlitePool,
}

impl PatientService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts a patient. A CPF already on file is a conflict.
    pub async fn create(
        &self,
        input: &PatientInput,
        created_by: Option<i64>,
    ) -> ClinicResult<Patient> {
        let sql = format!(
            "INSERT INTO patients \
             (full_name, cpf, birth_date, phone, musical_preference, observations, \
              created_by, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING {PATIENT_COLUMNS}"
        );
        let row: PatientRow = sqlx::query_as(&sql)
            .bind(input.full_name.as_str())
            .bind(input.cpf.as_str())
            .bind(input.birth_date_text())
            .bind(input.phone.as_str())
            .bind(input.musical_preference.as_deref())
            .bind(input.observations.as_deref())
            .bind(created_by)
            .bind(now_timestamp())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, UNIQUE_MESSAGES))?;

        tracing::info!(patient_id = row.id, "patient created");
        Ok(row.into())
    }

    pub async fn get(&self, id: i64) -> ClinicResult<Patient> {
        let sql = format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?");
        sqlx::query_as::<_, PatientRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Patient::from)
            .ok_or_else(not_found)
    }

    /// Lists patients newest first, filtering on name, CPF or phone.
    pub async fn list(
        &self,
        search: Option<&str>,
        page: PageRequest,
    ) -> ClinicResult<Page<Patient>> {
        const FILTER: &str = r"(?1 IS NULL
            OR full_name LIKE ?1 ESCAPE '\'
            OR cpf LIKE ?1 ESCAPE '\'
            OR phone LIKE ?1 ESCAPE '\')";

        let pattern = like_pattern(search);

        let count = format!("SELECT COUNT(*) FROM patients WHERE {FILTER}");
        let total: i64 = sqlx::query_scalar(&count)
            .bind(pattern.as_deref())
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            "SELECT {PATIENT_COLUMNS} FROM patients WHERE {FILTER} \
             ORDER BY created_at DESC, id DESC LIMIT ?2 OFFSET ?3"
        );
        let rows: Vec<PatientRow> = sqlx::query_as(&sql)
            .bind(pattern.as_deref())
            .bind(page.per_page())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(rows.into_iter().map(Patient::from).collect(), total, page))
    }

    /// Replaces every editable field of an existing patient.
    pub async fn update(&self, id: i64, input: &PatientInput) -> ClinicResult<Patient> {
        let sql = format!(
            "UPDATE patients SET full_name = ?, cpf = ?, birth_date = ?, phone = ?, \
             musical_preference = ?, observations = ?, updated_at = ? \
             WHERE id = ? RETURNING {PATIENT_COLUMNS}"
        );
        let row: Option<PatientRow> = sqlx::query_as(&sql)
            .bind(input.full_name.as_str())
            .bind(input.cpf.as_str())
            .bind(input.birth_date_text())
            .bind(input.phone.as_str())
            .bind(input.musical_preference.as_deref())
            .bind(input.observations.as_deref())
            .bind(now_timestamp())
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, UNIQUE_MESSAGES))?;

        let row = row.ok_or_else(not_found)?;
        tracing::info!(patient_id = id, "patient updated");
        Ok(row.into())
    }

    /// Deletes a patient. Patients with appointments cannot be deleted.
    pub async fn delete(&self, id: i64) -> ClinicResult<()> {
        let result = sqlx::query("DELETE FROM patients WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                conflict_on_reference(e, "Patient has appointments and cannot be deleted")
            })?;

        if result.rows_affected() == 0 {
            return Err(not_found());
        }
        tracing::info!(patient_id = id, "patient deleted");
        Ok(())
    }
}
