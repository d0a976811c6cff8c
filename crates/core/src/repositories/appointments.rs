//! Appointments ("atendimentos"): a patient seen by a professional for one or
//! more services at a given time.

use super::shared::{now_timestamp, Page, PageRequest};
use crate::constants::APPOINTMENT_TIME_FORMAT;
use crate::validation::{optional_money, optional_text, parse_appointment_time};
use crate::{ClinicError, ClinicResult};
use api_shared::{Appointment, AppointmentReq, ServiceSummary};
use chrono::NaiveDateTime;
use clinica_types::Money;
use sqlx::{SqliteConnection, SqlitePool};

const SELECT_APPOINTMENT: &str = "SELECT a.id, a.patient_id, pa.full_name AS patient_name, \
     a.professional_id, pr.full_name AS professional_name, a.scheduled_at, a.notes, \
     a.amount_charged_cents, a.created_at, a.updated_at \
     FROM appointments a \
     JOIN patients pa ON pa.id = a.patient_id \
     JOIN professionals pr ON pr.id = a.professional_id";

#[derive(Debug, sqlx::FromRow)]
struct AppointmentRow {
    id: i64,
    patient_id: i64,
    patient_name: String,
    professional_id: i64,
    professional_name: String,
    scheduled_at: String,
    notes: Option<String>,
    amount_charged_cents: Option<i64>,
    created_at: String,
    updated_at: Option<String>,
}

impl AppointmentRow {
    fn into_appointment(self, services: Vec<ServiceSummary>) -> Appointment {
        Appointment {
            id: self.id,
            patient_id: self.patient_id,
            patient_name: self.patient_name,
            professional_id: self.professional_id,
            professional_name: self.professional_name,
            services,
            scheduled_at: self.scheduled_at,
            notes: self.notes,
            amount_charged: self
                .amount_charged_cents
                .map(|cents| Money::from_cents(cents).as_decimal()),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppointmentInput {
    pub patient_id: i64,
    pub professional_id: i64,
    /// Sorted and free of duplicates; never empty.
    pub service_ids: Vec<i64>,
    pub scheduled_at: NaiveDateTime,
    pub notes: Option<String>,
    pub amount_charged: Option<Money>,
}

impl AppointmentInput {
    pub fn from_request(req: &AppointmentReq) -> ClinicResult<Self> {
        let required = |field: &str| ClinicError::validation(format!("Field {field} is required"));

        let patient_id = req.patient_id.ok_or_else(|| required("patient_id"))?;
        let professional_id = req.professional_id.ok_or_else(|| required("professional_id"))?;
        let mut service_ids = req.service_ids.clone().ok_or_else(|| required("service_ids"))?;
        let scheduled_at = req
            .scheduled_at
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| required("scheduled_at"))?;

        service_ids.sort_unstable();
        service_ids.dedup();
        if service_ids.is_empty() {
            return Err(ClinicError::validation("At least one service must be selected"));
        }

        Ok(Self {
            patient_id,
            professional_id,
            service_ids,
            scheduled_at: parse_appointment_time(scheduled_at)?,
            notes: optional_text(req.notes.as_deref()),
            amount_charged: optional_money("amount_charged", req.amount_charged)?,
        })
    }

    fn scheduled_at_text(&self) -> String {
        self.scheduled_at.format(APPOINTMENT_TIME_FORMAT).to_string()
    }
}

fn not_found() -> ClinicError {
    ClinicError::not_found("Appointment not found")
}

/// Checks that the patient, the professional and every service exist.
async fn ensure_references(
    conn: &mut SqliteConnection,
    input: &AppointmentInput,
) -> ClinicResult<()> {
    let patient: Option<i64> = sqlx::query_scalar("SELECT id FROM patients WHERE id = ?")
        .bind(input.patient_id)
        .fetch_optional(&mut *conn)
        .await?;
    let professional: Option<i64> = sqlx::query_scalar("SELECT id FROM professionals WHERE id = ?")
        .bind(input.professional_id)
        .fetch_optional(&mut *conn)
        .await?;
    if patient.is_none() || professional.is_none() {
        return Err(ClinicError::not_found("Patient or professional not found"));
    }

    for service_id in &input.service_ids {
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM services WHERE id = ?")
            .bind(service_id)
            .fetch_optional(&mut *conn)
            .await?;
        if found.is_none() {
            return Err(ClinicError::not_found("One or more services not found"));
        }
    }
    Ok(())
}

async fn replace_services(
    conn: &mut SqliteConnection,
    appointment_id: i64,
    service_ids: &[i64],
) -> ClinicResult<()> {
    sqlx::query("DELETE FROM appointment_services WHERE appointment_id = ?")
        .bind(appointment_id)
        .execute(&mut *conn)
        .await?;
    for service_id in service_ids {
        sqlx::query("INSERT INTO appointment_services (appointment_id, service_id) VALUES (?, ?)")
            .bind(appointment_id)
            .bind(service_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

async fn services_of(
    conn: &mut SqliteConnection,
    appointment_id: i64,
) -> ClinicResult<Vec<ServiceSummary>> {
    let rows: Vec<(i64, String)> = sqlx::query_as(
        "SELECT s.id, s.name FROM appointment_services aps \
         JOIN services s ON s.id = aps.service_id \
         WHERE aps.appointment_id = ? ORDER BY s.name COLLATE NOCASE, s.id",
    )
    .bind(appointment_id)
    .fetch_all(conn)
    .await?;
    Ok(rows
        .into_iter()
        .map(|(id, name)| ServiceSummary { id, name })
        .collect())
}

async fn with_services(
    conn: &mut SqliteConnection,
    rows: Vec<AppointmentRow>,
) -> ClinicResult<Vec<Appointment>> {
    let mut appointments = Vec::with_capacity(rows.len());
    for row in rows {
        let services = services_of(conn, row.id).await?;
        appointments.push(row.into_appointment(services));
    }
    Ok(appointments)
}

async fn load(conn: &mut SqliteConnection, id: i64) -> ClinicResult<Option<Appointment>> {
    let sql = format!("{SELECT_APPOINTMENT} WHERE a.id = ?");
    let row: Option<AppointmentRow> = sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    match row {
        Some(row) => Ok(with_services(conn, vec![row]).await?.pop()),
        None => Ok(None),
    }
}

#[derive(Clone)]
pub struct AppointmentService {
    pool: SqlitePool,
}

impl AppointmentService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, input: &AppointmentInput) -> ClinicResult<Appointment> {
        let mut tx = self.pool.begin().await?;
        ensure_references(&mut tx, input).await?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO appointments (patient_id, professional_id, scheduled_at, notes, \
             amount_charged_cents, created_at) VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(input.patient_id)
        .bind(input.professional_id)
        .bind(input.scheduled_at_text())
        .bind(input.notes.as_deref())
        .bind(input.amount_charged.map(Money::cents))
        .bind(now_timestamp())
        .fetch_one(&mut *tx)
        .await?;

        replace_services(&mut tx, id, &input.service_ids).await?;
        let appointment = load(&mut tx, id).await?.ok_or_else(not_found)?;
        tx.commit().await?;

        tracing::info!(
            appointment_id = id,
            patient_id = input.patient_id,
            professional_id = input.professional_id,
            "appointment recorded"
        );
        Ok(appointment)
    }

    pub async fn get(&self, id: i64) -> ClinicResult<Appointment> {
        let mut conn = self.pool.acquire().await?;
        load(&mut conn, id).await?.ok_or_else(not_found)
    }

    /// Lists appointments, latest first, optionally for one patient and/or professional.
    pub async fn list(
        &self,
        patient_id: Option<i64>,
        professional_id: Option<i64>,
        page: PageRequest,
    ) -> ClinicResult<Page<Appointment>> {
        const FILTER: &str =
            "(?1 IS NULL OR a.patient_id = ?1) AND (?2 IS NULL OR a.professional_id = ?2)";

        let mut conn = self.pool.acquire().await?;

        let count = format!("SELECT COUNT(*) FROM appointments a WHERE {FILTER}");
        let total: i64 = sqlx::query_scalar(&count)
            .bind(patient_id)
            .bind(professional_id)
            .fetch_one(&mut *conn)
            .await?;

        let sql = format!(
            "{SELECT_APPOINTMENT} WHERE {FILTER} \
             ORDER BY a.scheduled_at DESC, a.id DESC LIMIT ?3 OFFSET ?4"
        );
        let rows: Vec<AppointmentRow> = sqlx::query_as(&sql)
            .bind(patient_id)
            .bind(professional_id)
            .bind(page.per_page())
            .bind(page.offset())
            .fetch_all(&mut *conn)
            .await?;

        let appointments = with_services(&mut conn, rows).await?;
        Ok(Page::new(appointments, total, page))
    }

    /// Every appointment of a patient, latest first. Unknown patients have none.
    pub async fn list_for_patient(&self, patient_id: i64) -> ClinicResult<Vec<Appointment>> {
        let mut conn = self.pool.acquire().await?;
        let sql = format!(
            "{SELECT_APPOINTMENT} WHERE a.patient_id = ? ORDER BY a.scheduled_at DESC, a.id DESC"
        );
        let rows: Vec<AppointmentRow> = sqlx::query_as(&sql)
            .bind(patient_id)
            .fetch_all(&mut *conn)
            .await?;
        with_services(&mut conn, rows).await
    }

    pub async fn update(&self, id: i64, input: &AppointmentInput) -> ClinicResult<Appointment> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM appointments WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(not_found());
        }
        ensure_references(&mut tx, input).await?;

        sqlx::query(
            "UPDATE appointments SET patient_id = ?, professional_id = ?, scheduled_at = ?, \
             notes = ?, amount_charged_cents = ?, updated_at = ? WHERE id = ?",
        )
        .bind(input.patient_id)
        .bind(input.professional_id)
        .bind(input.scheduled_at_text())
        .bind(input.notes.as_deref())
        .bind(input.amount_charged.map(Money::cents))
        .bind(now_timestamp())
        .bind(id)
        .execute(&mut *tx)
        .await?;

        replace_services(&mut tx, id, &input.service_ids).await?;
        let appointment = load(&mut tx, id).await?.ok_or_else(not_found)?;
        tx.commit().await?;

        tracing::info!(appointment_id = id, "appointment updated");
        Ok(appointment)
    }

    pub async fn delete(&self, id: i64) -> ClinicResult<()> {
        let result = sqlx::query("DELETE FROM appointments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(not_found());
        }
        tracing::info!(appointment_id = id, "appointment deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoreConfig;
    use crate::db::connect_in_memory;
    use crate::repositories::patients::{PatientInput, PatientService};
    use crate::repositories::professionals::{ProfessionalInput, ProfessionalService};
    use crate::repositories::services::{ServiceCatalog, ServiceInput};
    use api_shared::{PatientReq, ProfessionalReq, ServiceReq};
    use std::sync::Arc;

    struct Fixture {
        pool: SqlitePool,
        appointments: AppointmentService,
        patient_id: i64,
        professional_id: i64,
        service_ids: Vec<i64>,
    }

    async fn fixture() -> Fixture {
        let pool = connect_in_memory().await.unwrap();
        let cfg = Arc::new(CoreConfig::new(2, 1_000, false).unwrap());

        let patient_id = PatientService::new(pool.clone())
            .create(
                &PatientInput::from_request(&PatientReq {
                    full_name: Some("Ana Souza".into()),
                    cpf: Some("529.982.247-25".into()),
                    phone: Some("11987654321".into()),
                    ..Default::default()
                })
                .unwrap(),
                None,
            )
            .await
            .unwrap()
            .id;

        let professional_id = ProfessionalService::new(pool.clone(), cfg)
            .create(
                &ProfessionalInput::from_request(&ProfessionalReq {
                    full_name: Some("Dr. Carla".into()),
                    cpf: Some("111.444.777-35".into()),
                    phone: Some("1134567890".into()),
                    ..Default::default()
                })
                .unwrap(),
                None,
            )
            .await
            .unwrap()
            .id;

        let catalog = ServiceCatalog::new(pool.clone());
        let mut service_ids = Vec::new();
        for name in ["Music therapy", "Assessment"] {
            let service = catalog
                .create(
                    &ServiceInput::from_request(&ServiceReq {
                        name: Some(name.into()),
                        duration_minutes: Some(50),
                        price: Some(120.0),
                        ..Default::default()
                    })
                    .unwrap(),
                )
                .await
                .unwrap();
            service_ids.push(service.id);
        }

        Fixture {
            appointments: AppointmentService::new(pool.clone()),
            pool,
            patient_id,
            professional_id,
            service_ids,
        }
    }

    fn request(f: &Fixture, when: &str) -> AppointmentReq {
        AppointmentReq {
            patient_id: Some(f.patient_id),
            professional_id: Some(f.professional_id),
            service_ids: Some(f.service_ids.clone()),
            scheduled_at: Some(when.into()),
            notes: Some("first session".into()),
            amount_charged: Some(150.0),
        }
    }

    #[test]
    fn input_requires_at_least_one_service() {
        let req = AppointmentReq {
            patient_id: Some(1),
            professional_id: Some(1),
            service_ids: Some(vec![]),
            scheduled_at: Some("2024-05-01T14:30".into()),
            ..Default::default()
        };
        assert_eq!(
            AppointmentInput::from_request(&req).unwrap_err().to_string(),
            "At least one service must be selected"
        );

        let req = AppointmentReq { service_ids: Some(vec![3, 1, 3]), ..req };
        assert_eq!(AppointmentInput::from_request(&req).unwrap().service_ids, vec![1, 3]);

        let missing = AppointmentReq::default();
        assert_eq!(
            AppointmentInput::from_request(&missing).unwrap_err().to_string(),
            "Field patient_id is required"
        );
    }

    #[tokio::test]
    async fn create_joins_names_and_services() {
        let f = fixture().await;
        let input = AppointmentInput::from_request(&request(&f, "2024-05-01T14:30")).unwrap();
        let created = f.appointments.create(&input).await.unwrap();

        assert_eq!(created.patient_name, "Ana Souza");
        assert_eq!(created.professional_name, "Dr. Carla");
        assert_eq!(created.scheduled_at, "2024-05-01T14:30:00");
        assert_eq!(created.amount_charged, Some(150.0));
        let names: Vec<&str> = created.services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Assessment", "Music therapy"]);
        assert_eq!(f.appointments.get(created.id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn missing_references_are_not_found_and_nothing_is_written() {
        let f = fixture().await;

        let mut req = request(&f, "2024-05-01T14:30");
        req.patient_id = Some(9_999);
        let err = f
            .appointments
            .create(&AppointmentInput::from_request(&req).unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Patient or professional not found");

        let mut req = request(&f, "2024-05-01T14:30");
        req.service_ids = Some(vec![f.service_ids[0], 9_999]);
        let err = f
            .appointments
            .create(&AppointmentInput::from_request(&req).unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "One or more services not found");

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM appointments")
            .fetch_one(&f.pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn listings_are_latest_first() {
        let f = fixture().await;
        for when in ["2024-05-01T10:00", "2024-06-01T10:00", "2024-04-01"] {
            f.appointments
                .create(&AppointmentInput::from_request(&request(&f, when)).unwrap())
                .await
                .unwrap();
        }

        let by_patient = f.appointments.list_for_patient(f.patient_id).await.unwrap();
        let dates: Vec<&str> = by_patient.iter().map(|a| a.scheduled_at.as_str()).collect();
        assert_eq!(
            dates,
            ["2024-06-01T10:00:00", "2024-05-01T10:00:00", "2024-04-01T00:00:00"]
        );
        assert!(f.appointments.list_for_patient(9_999).await.unwrap().is_empty());

        let page = f
            .appointments
            .list(None, Some(f.professional_id), PageRequest::new(Some(2), Some(2)))
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.pages, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].scheduled_at, "2024-04-01T00:00:00");
    }

    #[tokio::test]
    async fn referenced_records_cannot_be_deleted() {
        let f = fixture().await;
        let created = f
            .appointments
            .create(&AppointmentInput::from_request(&request(&f, "2024-05-01T14:30")).unwrap())
            .await
            .unwrap();

        let patients = PatientService::new(f.pool.clone());
        assert!(matches!(
            patients.delete(f.patient_id).await,
            Err(ClinicError::Conflict(_))
        ));
        let catalog = ServiceCatalog::new(f.pool.clone());
        assert!(matches!(
            catalog.delete(f.service_ids[0]).await,
            Err(ClinicError::Conflict(_))
        ));

        f.appointments.delete(created.id).await.unwrap();
        patients.delete(f.patient_id).await.unwrap();
    }

    #[tokio::test]
    async fn update_replaces_services_and_fields() {
        let f = fixture().await;
        let created = f
            .appointments
            .create(&AppointmentInput::from_request(&request(&f, "2024-05-01T14:30")).unwrap())
            .await
            .unwrap();

        let mut req = request(&f, "2024-05-02 09:00");
        req.service_ids = Some(vec![f.service_ids[0]]);
        req.amount_charged = None;
        let updated = f
            .appointments
            .update(created.id, &AppointmentInput::from_request(&req).unwrap())
            .await
            .unwrap();
        assert_eq!(updated.scheduled_at, "2024-05-02T09:00:00");
        assert_eq!(updated.services.len(), 1);
        assert_eq!(updated.amount_charged, None);
        assert!(updated.updated_at.is_some());

        assert!(matches!(
            f.appointments
                .update(9_999, &AppointmentInput::from_request(&req).unwrap())
                .await,
            Err(ClinicError::NotFound(_))
        ));
    }
}
