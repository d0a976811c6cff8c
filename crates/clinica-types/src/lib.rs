//! # Clinica Types
//!
//! Validated value types shared by every Clinica crate.
//!
//! - [`NonEmptyText`]: trimmed text that is guaranteed to carry content
//! - [`Cpf`]: a Brazilian taxpayer number whose check digits have been verified
//! - [`PhoneNumber`]: a phone number normalised to the canonical punctuation
//! - [`Money`]: an amount in integer cents
//!
//! The free functions [`is_valid_cpf`], [`format_cpf`] and [`format_phone`] are the
//! underlying pure routines and can be used on their own.

pub mod cpf;
pub mod money;
pub mod phone;
pub mod text;

pub use cpf::{format_cpf, is_valid_cpf, Cpf, CpfError};
pub use money::{Money, MoneyError};
pub use phone::{format_phone, PhoneNumber};
pub use text::{NonEmptyText, TextError};

/// Returns only the ASCII digits of `input`, in order.
pub fn digits_only(input: &str) -> String {
    input.chars().filter(|c| c.is_ascii_digit()).collect()
}
