use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Teacher
    Guru,
    /// School administrator
    Pentadbir,
    Superadmin,
}

/// Roles allowed on administrative endpoints.
pub const ADMIN_ROLES: &[Role] = &[Role::Pentadbir, Role::Superadmin];

/// True when the caller holds at least one of the required roles.
pub fn has_any(held: &[Role], required: &[Role]) -> bool {
    held.iter().any(|r| required.contains(r))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn role_names_round_trip_as_upper_case() {
        assert_eq!(Role::Pentadbir.to_string(), "PENTADBIR");
        assert_eq!(Role::from_str("SUPERADMIN").unwrap(), Role::Superadmin);
        assert_eq!(serde_json::to_string(&Role::Guru).unwrap(), "\"GURU\"");
        assert!(Role::from_str("ADMIN").is_err());
    }

    #[test]
    fn intersection_decides_access() {
        assert!(!has_any(&[Role::Guru], ADMIN_ROLES));
        assert!(has_any(&[Role::Pentadbir], ADMIN_ROLES));
        assert!(has_any(&[Role::Guru, Role::Superadmin], ADMIN_ROLES));
        assert!(!has_any(&[], &[Role::Guru, Role::Pentadbir, Role::Superadmin]));
    }
}
