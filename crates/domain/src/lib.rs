//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod role;
mod user;
pub mod validation;

pub use role::Role;
pub use user::{
    EmailAddress, PASSWORD_MAX_LENGTH, PASSWORD_MIN_LENGTH, SignUpProfile, validate_password,
};
pub use validation::{PhoneNumber, parse_amount, parse_percentage, parse_quantity};
