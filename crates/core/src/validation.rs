//! Input validation utilities.
//!
//! This module contains functions for validating user inputs to ensure they meet
//! safety and correctness requirements before being written to storage. Every
//! failure is a [`ClinicError::Validation`] carrying a message fit for the client.

use crate::constants::DATE_FORMAT;
use crate::{ClinicError, ClinicResult};
use chrono::{NaiveDate, NaiveDateTime};
use clinica_types::{Cpf, Money, NonEmptyText, PhoneNumber};

/// Characters that satisfy the "special character" rule of the password policy.
const PASSWORD_SPECIALS: &str = "!@#$%^&*(),.?\":{}|<>";

/// Returns the trimmed value of a required field.
pub fn required_text(field: &str, value: Option<&str>) -> ClinicResult<NonEmptyText> {
    NonEmptyText::from_optional(value)
        .map_err(|_| ClinicError::validation(format!("Field {field} is required")))
}

/// Trims an optional field; blank values become `None`.
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

/// Validates and canonicalises a required CPF field.
pub fn required_cpf(value: Option<&str>) -> ClinicResult<Cpf> {
    let raw = required_text("cpf", value)?;
    Cpf::parse(raw.as_str()).map_err(|_| ClinicError::validation("Invalid CPF"))
}

/// Formats a required phone field.
pub fn required_phone(value: Option<&str>) -> ClinicResult<PhoneNumber> {
    PhoneNumber::parse(value.unwrap_or_default())
        .map_err(|_| ClinicError::validation("Field phone is required"))
}

/// Parses an optional `YYYY-MM-DD` birth date. Blank input means "not provided".
pub fn optional_birth_date(value: Option<&str>) -> ClinicResult<Option<NaiveDate>> {
    optional_text(value)
        .map(|v| {
            NaiveDate::parse_from_str(&v, DATE_FORMAT)
                .map_err(|_| ClinicError::validation("Invalid birth date"))
        })
        .transpose()
}

/// Parses an appointment timestamp.
///
/// Accepts `YYYY-MM-DDTHH:MM[:SS]`, the same with a space separator, or a bare
/// `YYYY-MM-DD` (midnight).
pub fn parse_appointment_time(value: &str) -> ClinicResult<NaiveDateTime> {
    const FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];

    let value = value.trim();
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| ClinicError::validation("Invalid appointment date"))
}

/// Converts an optional decimal amount into [`Money`].
pub fn optional_money(field: &str, value: Option<f64>) -> ClinicResult<Option<Money>> {
    value
        .map(|amount| {
            Money::from_decimal(amount)
                .map_err(|e| ClinicError::validation(format!("Invalid {field}: {e}")))
        })
        .transpose()
}

/// Lower-cases an optional e-mail and checks it has the `local@domain` shape.
pub fn optional_email(value: Option<&str>) -> ClinicResult<Option<String>> {
    let Some(email) = optional_text(value) else {
        return Ok(None);
    };
    let email = email.to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(Some(email)),
        _ => Err(ClinicError::validation("Invalid email")),
    }
}

/// Upper-cases an optional professional registration number.
pub fn optional_registration(value: Option<&str>) -> Option<String> {
    optional_text(value).map(|v| v.to_uppercase())
}

/// Enforces the password policy: at least 8 characters with upper-case, lower-case,
/// digit and special characters.
pub fn validate_password_strength(password: &str) -> ClinicResult<()> {
    let rules: [(bool, &str); 5] = [
        (
            password.chars().count() >= 8,
            "Password must be at least 8 characters long",
        ),
        (
            password.chars().any(|c| c.is_ascii_uppercase()),
            "Password must contain at least one upper-case letter",
        ),
        (
            password.chars().any(|c| c.is_ascii_lowercase()),
            "Password must contain at least one lower-case letter",
        ),
        (
            password.chars().any(|c| c.is_ascii_digit()),
            "Password must contain at least one digit",
        ),
        (
            password.chars().any(|c| PASSWORD_SPECIALS.contains(c)),
            "Password must contain at least one special character",
        ),
    ];

    match rules.iter().find(|(ok, _)| !ok) {
        Some((_, message)) => Err(ClinicError::validation(*message)),
        None => Ok(()),
    }
}
