use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use techdesk_core::AppError;

/// Role governing which dashboard and views an account may reach.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full back-office access.
    Admin,
    /// Service technicians and support agents.
    Staff,
    /// Least-privileged role; assigned when nothing else is known.
    #[default]
    Customer,
}

impl Role {
    /// Returns a stable storage value for this role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Staff => "staff",
            Self::Customer => "customer",
        }
    }

    /// Returns all known roles.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[Role] = &[Role::Admin, Role::Staff, Role::Customer];

        ALL
    }

    /// Returns the landing dashboard path for the role.
    #[must_use]
    pub fn dashboard_path(&self) -> &'static str {
        match self {
            Self::Admin => "/admin",
            Self::Staff => "/staff",
            Self::Customer => "/dashboard",
        }
    }
}

impl Display for Role {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "admin" => Ok(Self::Admin),
            "staff" => Ok(Self::Staff),
            "customer" => Ok(Self::Customer),
            _ => Err(AppError::Validation(format!("unknown role value '{value}'"))),
        }
    }
}
