//! Account-facing domain types and validation rules.

use serde::{Deserialize, Serialize};
use techdesk_core::{AppError, AppResult, NonEmptyString};

use crate::validation::PhoneNumber;

/// Validated email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Creates a validated email address.
    ///
    /// Performs basic structural validation: non-empty, contains exactly one `@`,
    /// local part and domain are non-empty, domain contains at least one `.`.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim().to_lowercase();

        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "email address must not be empty".to_owned(),
            ));
        }

        let Some((local, domain)) = trimmed.split_once('@') else {
            return Err(AppError::Validation(
                "email address must contain exactly one '@'".to_owned(),
            ));
        };

        if domain.contains('@') {
            return Err(AppError::Validation(
                "email address must contain exactly one '@'".to_owned(),
            ));
        }

        if local.is_empty() {
            return Err(AppError::Validation(
                "email local part must not be empty".to_owned(),
            ));
        }

        if domain.is_empty() || !domain.contains('.') {
            return Err(AppError::Validation(
                "email domain must contain at least one '.'".to_owned(),
            ));
        }

        if trimmed.len() > 254 {
            return Err(AppError::Validation(
                "email address must not exceed 254 characters".to_owned(),
            ));
        }

        Ok(Self(trimmed))
    }

    /// Returns the validated email string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

/// Minimum password length accepted by the hosted auth service.
pub const PASSWORD_MIN_LENGTH: usize = 6;

/// Maximum password length forwarded to the auth service.
pub const PASSWORD_MAX_LENGTH: usize = 72;

/// Checks password length before a sign-up call leaves the process.
///
/// Strength rules beyond length are enforced by the auth service.
pub fn validate_password(password: &str) -> AppResult<()> {
    let char_count = password.chars().count();

    if char_count < PASSWORD_MIN_LENGTH {
        return Err(AppError::Validation(format!(
            "password must be at least {PASSWORD_MIN_LENGTH} characters"
        )));
    }

    if password.len() > PASSWORD_MAX_LENGTH {
        return Err(AppError::Validation(format!(
            "password must not exceed {PASSWORD_MAX_LENGTH} bytes"
        )));
    }

    Ok(())
}

/// Profile metadata attached to a new account at sign-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignUpProfile {
    display_name: NonEmptyString,
    phone: Option<PhoneNumber>,
}

impl SignUpProfile {
    /// Validates the display name and the optional phone number.
    ///
    /// A blank phone input is treated as "not provided".
    pub fn new(display_name: &str, phone: Option<&str>) -> AppResult<Self> {
        let display_name = NonEmptyString::new(display_name)
            .map_err(|_| AppError::Validation("display name must not be empty".to_owned()))?;
        let phone = phone
            .filter(|value| !value.trim().is_empty())
            .map(PhoneNumber::parse)
            .transpose()?;

        Ok(Self {
            display_name,
            phone,
        })
    }

    /// Returns the display name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Returns the normalized phone number, if one was given.
    #[must_use]
    pub fn phone(&self) -> Option<&PhoneNumber> {
        self.phone.as_ref()
    }
}
