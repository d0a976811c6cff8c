//! JSON transport types for the Clinica REST API.
//!
//! Request bodies keep every field optional so that handlers can answer a missing
//! field with a descriptive `{"error": ...}` body instead of a deserialisation
//! rejection. Dates travel as `YYYY-MM-DD` strings and timestamps as
//! `YYYY-MM-DD HH:MM:SS`.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageRes {
    pub message: String,
}

/// Query string accepted by the `.../api/list` endpoints.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Free-text filter.
    pub search: Option<String>,
    /// 1-based page number (default 1).
    pub page: Option<i64>,
    /// Page size (default 10, capped at 100).
    pub per_page: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AppointmentListQuery {
    pub patient_id: Option<i64>,
    pub professional_id: Option<i64>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// `{id, name}` reference to a catalogue service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ServiceSummary {
    pub id: i64,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Patients
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct PatientReq {
    pub full_name: Option<String>,
    pub cpf: Option<String>,
    pub birth_date: Option<String>,
    pub phone: Option<String>,
    pub musical_preference: Option<String>,
    pub observations: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Patient {
    pub id: i64,
    pub full_name: String,
    pub cpf: String,
    pub birth_date: Option<String>,
    pub phone: String,
    pub musical_preference: Option<String>,
    pub observations: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PatientRes {
    pub message: String,
    pub patient: Patient,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListPatientsRes {
    pub patients: Vec<Patient>,
    pub total: i64,
    pub pages: i64,
    pub current_page: i64,
    pub per_page: i64,
}

// ---------------------------------------------------------------------------
// Professionals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ProfessionalReq {
    pub full_name: Option<String>,
    pub cpf: Option<String>,
    #[serde(alias = "registro_prof")]
    pub registration_number: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub birth_date: Option<String>,
    pub bio: Option<String>,
    pub is_active: Option<bool>,
    pub service_ids: Option<Vec<i64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Professional {
    pub id: i64,
    pub full_name: String,
    pub cpf: String,
    pub registration_number: Option<String>,
    pub phone: String,
    pub email: Option<String>,
    pub birth_date: Option<String>,
    pub bio: Option<String>,
    pub is_active: bool,
    pub services: Vec<ServiceSummary>,
    pub has_account: bool,
    pub username: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProfessionalRes {
    pub message: String,
    pub professional: Professional,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListProfessionalsRes {
    pub professionals: Vec<Professional>,
    pub total: i64,
    pub pages: i64,
    pub current_page: i64,
    pub per_page: i64,
}

// ---------------------------------------------------------------------------
// Services
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ServiceReq {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub duration_minutes: Option<i64>,
    pub price: Option<f64>,
    pub preparation_instructions: Option<String>,
    pub aftercare_instructions: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Service {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub duration_minutes: i64,
    pub price: f64,
    pub preparation_instructions: Option<String>,
    pub aftercare_instructions: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceRes {
    pub message: String,
    pub service: Service,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListServicesRes {
    pub services: Vec<Service>,
    pub total: i64,
    pub pages: i64,
    pub current_page: i64,
    pub per_page: i64,
}

// ---------------------------------------------------------------------------
// Appointments (atendimentos)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct AppointmentReq {
    pub patient_id: Option<i64>,
    pub professional_id: Option<i64>,
    pub service_ids: Option<Vec<i64>>,
    /// `YYYY-MM-DDTHH:MM[:SS]`, `YYYY-MM-DD HH:MM[:SS]` or `YYYY-MM-DD`.
    #[serde(alias = "data_atendimento")]
    pub scheduled_at: Option<String>,
    #[serde(alias = "anotacoes")]
    pub notes: Option<String>,
    #[serde(alias = "valor_cobrado")]
    pub amount_charged: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Appointment {
    pub id: i64,
    pub patient_id: i64,
    pub patient_name: String,
    pub professional_id: i64,
    pub professional_name: String,
    pub services: Vec<ServiceSummary>,
    pub scheduled_at: String,
    pub notes: Option<String>,
    pub amount_charged: Option<f64>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AppointmentRes {
    pub message: String,
    pub atendimento: Appointment,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListAppointmentsRes {
    pub atendimentos: Vec<Appointment>,
    pub total: i64,
    pub pages: i64,
    pub current_page: i64,
    pub per_page: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn professional_request_accepts_legacy_registration_key() {
        let req: ProfessionalReq =
            serde_json::from_str(r#"{"full_name":"Ana","registro_prof":"crm-123"}"#).unwrap();
        assert_eq!(req.registration_number.as_deref(), Some("crm-123"));
        assert!(req.service_ids.is_none());
    }

    #[test]
    fn appointment_request_accepts_portuguese_keys() {
        let req: AppointmentReq = serde_json::from_str(
            r#"{"patient_id":1,"professional_id":2,"service_ids":[3],
                "data_atendimento":"2024-05-01T14:30","anotacoes":"ok","valor_cobrado":120.0}"#,
        )
        .unwrap();
        assert_eq!(req.scheduled_at.as_deref(), Some("2024-05-01T14:30"));
        assert_eq!(req.notes.as_deref(), Some("ok"));
        assert_eq!(req.amount_charged, Some(120.0));
    }

    #[test]
    fn missing_fields_deserialize_as_none() {
        let req: PatientReq = serde_json::from_str("{}").unwrap();
        assert!(req.full_name.is_none() && req.cpf.is_none() && req.phone.is_none());
    }
}
