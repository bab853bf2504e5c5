//! Input helpers shared by the booking, product, AMC, ticket and invoice forms.
//!
//! Every helper takes raw form text and returns either a typed value or an
//! [`AppError::Validation`] message that can be shown next to the field.

use serde::{Deserialize, Serialize};
use techdesk_core::{AppError, AppResult};

/// Minimum digit count for a phone number (national numbers without prefix).
pub const PHONE_MIN_DIGITS: usize = 10;

/// Maximum digit count for a phone number (E.164 limit).
pub const PHONE_MAX_DIGITS: usize = 15;

/// Parses a non-negative monetary amount into minor units (e.g. paise).
///
/// Accepts `"1299"`, `"1299.5"` and `"1299.50"`. More than two decimals,
/// signs, exponents and separators are rejected.
pub fn parse_amount(input: &str) -> AppResult<u64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("amount is required".to_owned()));
    }

    let (whole, fraction) = match trimmed.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (trimmed, ""),
    };

    if whole.is_empty() || !whole.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(AppError::Validation(format!(
            "'{trimmed}' is not a valid amount"
        )));
    }

    if fraction.len() > 2 || !fraction.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(AppError::Validation(
            "amount may have at most two decimal places".to_owned(),
        ));
    }

    if trimmed.ends_with('.') {
        return Err(AppError::Validation(format!(
            "'{trimmed}' is not a valid amount"
        )));
    }

    let whole = whole
        .parse::<u64>()
        .map_err(|_| AppError::Validation("amount is too large".to_owned()))?;
    let cents = match fraction.len() {
        0 => 0,
        1 => u64::from(fraction.as_bytes()[0] - b'0') * 10,
        _ => fraction
            .parse::<u64>()
            .map_err(|_| AppError::Validation(format!("'{trimmed}' is not a valid amount")))?,
    };

    whole
        .checked_mul(100)
        .and_then(|value| value.checked_add(cents))
        .ok_or_else(|| AppError::Validation("amount is too large".to_owned()))
}

/// Parses a whole-number quantity in `1..=max`.
pub fn parse_quantity(input: &str, max: u32) -> AppResult<u32> {
    let trimmed = input.trim();
    let value = trimmed.parse::<u32>().map_err(|_| {
        AppError::Validation(format!("quantity must be a whole number, got '{trimmed}'"))
    })?;

    if value == 0 {
        return Err(AppError::Validation(
            "quantity must be at least 1".to_owned(),
        ));
    }

    if value > max {
        return Err(AppError::Validation(format!(
            "quantity must not exceed {max}"
        )));
    }

    Ok(value)
}

/// Parses a percentage (discount or tax rate) in `0..=100`.
pub fn parse_percentage(input: &str) -> AppResult<f64> {
    let trimmed = input.trim().trim_end_matches('%').trim_end();
    let value = trimmed
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| AppError::Validation(format!("'{trimmed}' is not a valid percentage")))?;

    if !(0.0..=100.0).contains(&value) {
        return Err(AppError::Validation(
            "percentage must be between 0 and 100".to_owned(),
        ));
    }

    Ok(value)
}

/// Normalized contact phone number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Validates a phone number typed into a form.
    ///
    /// Spaces, dashes, dots and parentheses are dropped; an optional leading
    /// `+` is preserved; the remaining digits must number between
    /// [`PHONE_MIN_DIGITS`] and [`PHONE_MAX_DIGITS`].
    pub fn parse(input: &str) -> AppResult<Self> {
        let trimmed = input.trim();
        let (prefix, rest) = match trimmed.strip_prefix('+') {
            Some(rest) => ("+", rest),
            None => ("", trimmed),
        };

        let mut digits = String::with_capacity(rest.len());
        for character in rest.chars() {
            match character {
                '0'..='9' => digits.push(character),
                ' ' | '-' | '.' | '(' | ')' => {}
                _ => {
                    return Err(AppError::Validation(format!(
                        "phone number contains invalid character '{character}'"
                    )));
                }
            }
        }

        if !(PHONE_MIN_DIGITS..=PHONE_MAX_DIGITS).contains(&digits.len()) {
            return Err(AppError::Validation(format!(
                "phone number must have between {PHONE_MIN_DIGITS} and {PHONE_MAX_DIGITS} digits"
            )));
        }

        Ok(Self(format!("{prefix}{digits}")))
    }

    /// Returns the normalized phone number.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}
