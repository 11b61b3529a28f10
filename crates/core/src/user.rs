use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A member of the watch roster, identified by their E.164 phone number.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct User {
    pub user_id: i64,
    pub phone: String,
    pub name: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// A user's authorization level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum Role {
    Admin,
    Owl,
    Guest,
}

impl Role {
    /// The role assigned to the very first user the system ever registers.
    pub fn bootstrap() -> Self {
        Self::Admin
    }

    pub fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Admin => "admin",
            Self::Owl => "owl",
            Self::Guest => "guest",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_json() {
        let json = serde_json::to_string(&Role::Owl).unwrap();
        assert_eq!(json, "\"owl\"");
        let back: Role = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Role::Owl);
    }

    #[test]
    fn only_admin_is_admin() {
        assert!(Role::Admin.is_admin());
        assert!(!Role::Owl.is_admin());
        assert!(!Role::Guest.is_admin());
    }
}
