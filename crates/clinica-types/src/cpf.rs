//! Brazilian CPF (Cadastro de Pessoas Físicas) validation and formatting.
//!
//! A CPF has eleven digits. The last two are check digits computed from the
//! first nine with weighted sums modulo 11. Sequences of a single repeated digit
//! satisfy the arithmetic but are not issued, so they are rejected explicitly.

use crate::digits_only;

const CPF_LEN: usize = 11;

/// Errors produced when parsing a [`Cpf`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CpfError {
    #[error("CPF must have 11 digits, found {0}")]
    WrongLength(usize),
    #[error("CPF cannot be a repeated digit sequence")]
    RepeatedDigits,
    #[error("CPF check digits do not match")]
    CheckDigitMismatch,
}

/// Computes one check digit: `(Σ digit[i] × (first_weight − i)) × 10 mod 11 mod 10`.
fn check_digit(digits: &[u32], first_weight: u32) -> u32 {
    let sum: u32 = digits
        .iter()
        .zip((2..=first_weight).rev())
        .map(|(digit, weight)| digit * weight)
        .sum();
    (sum * 10 % 11) % 10
}

fn verify(input: &str) -> Result<String, CpfError> {
    let cleaned = digits_only(input);
    if cleaned.len() != CPF_LEN {
        return Err(CpfError::WrongLength(cleaned.len()));
    }

    let digits: Vec<u32> = cleaned.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.iter().all(|d| *d == digits[0]) {
        return Err(CpfError::RepeatedDigits);
    }

    let d1 = check_digit(&digits[..9], 10);
    let mut with_d1 = digits[..9].to_vec();
    with_d1.push(d1);
    let d2 = check_digit(&with_d1, 11);

    if digits[9] != d1 || digits[10] != d2 {
        return Err(CpfError::CheckDigitMismatch);
    }
    Ok(cleaned)
}

/// Returns `true` when `input`, after stripping non-digits, is a valid CPF.
pub fn is_valid_cpf(input: &str) -> bool {
    verify(input).is_ok()
}

/// Formats a CPF as `XXX.XXX.XXX-XX`.
///
/// Non-digits are stripped first. Inputs that do not reduce to exactly eleven
/// digits are returned unchanged.
pub fn format_cpf(input: &str) -> String {
    let digits = digits_only(input);
    if digits.len() != CPF_LEN {
        return input.to_string();
    }
    punctuate(&digits)
}

fn punctuate(digits: &str) -> String {
    format!(
        "{}.{}.{}-{}",
        &digits[0..3],
        &digits[3..6],
        &digits[6..9],
        &digits[9..11]
    )
}

/// A CPF whose check digits have been verified, held in canonical punctuation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cpf(String);

impl Cpf {
    /// Validates `input` and returns the canonical `XXX.XXX.XXX-XX` form.
    pub fn parse(input: &str) -> Result<Self, CpfError> {
        let digits = verify(input)?;
        Ok(Self(punctuate(&digits)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Cpf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Cpf {
    type Err = CpfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_valid_cpf_passes() {
        assert!(is_valid_cpf("529.982.247-25"));
        assert!(is_valid_cpf("52998224725"));
    }

    #[test]
    fn changing_the_last_digit_fails() {
        for last in ['0', '1', '2', '3', '4', '6', '7', '8', '9'] {
            let candidate = format!("5299822472{last}");
            assert!(!is_valid_cpf(&candidate), "{candidate} should be invalid");
        }
    }

    #[test]
    fn repeated_digit_sequences_fail() {
        for d in 0..=9 {
            let cpf = d.to_string().repeat(11);
            assert_eq!(Cpf::parse(&cpf), Err(CpfError::RepeatedDigits));
        }
    }

    #[test]
    fn wrong_length_fails() {
        assert_eq!(Cpf::parse("1234567890"), Err(CpfError::WrongLength(10)));
        assert_eq!(Cpf::parse(""), Err(CpfError::WrongLength(0)));
        assert!(!is_valid_cpf("529.982.247-255"));
    }

    #[test]
    fn first_check_digit_mismatch_fails() {
        assert_eq!(
            Cpf::parse("529.982.247-35"),
            Err(CpfError::CheckDigitMismatch)
        );
    }

    #[test]
    fn format_punctuates_eleven_digits() {
        assert_eq!(format_cpf("52998224725"), "529.982.247-25");
        assert_eq!(format_cpf("529.982.247-25"), "529.982.247-25");
    }

    #[test]
    fn format_leaves_other_lengths_unchanged() {
        assert_eq!(format_cpf("12345"), "12345");
        assert_eq!(format_cpf("123.456"), "123.456");
    }

    #[test]
    fn parse_canonicalises() {
        let cpf: Cpf = " 529 982 247 25 ".parse().unwrap();
        assert_eq!(cpf.as_str(), "529.982.247-25");
    }
}
