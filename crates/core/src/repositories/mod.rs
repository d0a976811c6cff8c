//! Entity repositories.
//!
//! Each service owns a cloned `SqlitePool`. Operations that touch more than one
//! row run inside a single transaction; a dropped transaction rolls back.

pub mod appointments;
pub mod patients;
pub mod professionals;
pub mod services;
pub mod sessions;
pub mod shared;
pub mod users;

pub use appointments::{AppointmentInput, AppointmentService};
pub use patients::{PatientInput, PatientService};
pub use professionals::{ProfessionalInput, ProfessionalService};
pub use services::{ServiceCatalog, ServiceInput};
pub use sessions::SessionService;
pub use shared::{Page, PageRequest};
pub use users::{CurrentUser, NewUser, UserService};
