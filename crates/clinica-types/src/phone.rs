//! Brazilian phone number formatting.

use crate::digits_only;
use crate::text::TextError;

/// Formats a phone number as `(XX) XXXXX-XXXX` (11 digits) or `(XX) XXXX-XXXX` (10 digits).
///
/// Any other digit count yields the bare digits; formatting never fails.
pub fn format_phone(input: &str) -> String {
    let digits = digits_only(input);
    match digits.len() {
        11 => format!("({}) {}-{}", &digits[0..2], &digits[2..7], &digits[7..]),
        10 => format!("({}) {}-{}", &digits[0..2], &digits[2..6], &digits[6..]),
        _ => digits,
    }
}

/// A required phone number, stored in canonical punctuation when the digit count allows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Normalises `input`. Only blank input is rejected.
    pub fn parse(input: &str) -> Result<Self, TextError> {
        if input.trim().is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(format_phone(input)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
