//! # Clinica Core
//!
//! Core business logic for the Clinica clinic-management system.
//!
//! This crate owns the data rules and the relational store:
//! - Patient, professional, service and appointment records in SQLite
//! - Staff accounts, password hashing and login sessions
//! - The static role-to-permission table
//!
//! **No HTTP concerns**: routing, cookies and HTML belong in `api-rest`; transport
//! types live in `api-shared`.

pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod password;
pub mod permissions;
pub mod repositories;
pub mod validation;

pub use config::CoreConfig;
pub use error::{ClinicError, ClinicResult};
pub use permissions::{Permission, Role};
pub use repositories::{
    AppointmentInput, AppointmentService, CurrentUser, NewUser, Page, PageRequest, PatientInput,
    PatientService, ProfessionalInput, ProfessionalService, ServiceCatalog, ServiceInput,
    SessionService, UserService,
};
