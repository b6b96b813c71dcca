// Identity types shared across the API

use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;

/// Caller role, normalized at the boundary.
///
/// Upstream token issuers encode the role either as a lowercase name
/// ("admin", "owner", "customer") or as a legacy numeric id (0 or 1 for
/// admin, 2 for owner, 3 for customer). Both forms deserialize into this
/// enum; nothing past the extractor ever sees the raw representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Owner,
    Customer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Owner => "owner",
            Role::Customer => "customer",
        }
    }

    /// Parse a role name, case-insensitively
    pub fn from_name(name: &str) -> Option<Role> {
        match name.trim().to_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "owner" => Some(Role::Owner),
            "customer" => Some(Role::Customer),
            _ => None,
        }
    }

    /// Parse a legacy numeric role id (0 and 1 both mean admin)
    pub fn from_id(id: i64) -> Option<Role> {
        match id {
            0 | 1 => Some(Role::Admin),
            2 => Some(Role::Owner),
            3 => Some(Role::Customer),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RoleVisitor;

        impl<'de> de::Visitor<'de> for RoleVisitor {
            type Value = Role;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a role name (admin/owner/customer) or numeric role id")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Role, E> {
                Role::from_name(v).ok_or_else(|| E::custom(format!("unknown role name: {}", v)))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Role, E> {
                Role::from_id(v as i64).ok_or_else(|| E::custom(format!("unknown role id: {}", v)))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Role, E> {
                Role::from_id(v).ok_or_else(|| E::custom(format!("unknown role id: {}", v)))
            }
        }

        deserializer.deserialize_any(RoleVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_deserializes_from_names() {
        assert_eq!(serde_json::from_str::<Role>("\"admin\"").unwrap(), Role::Admin);
        assert_eq!(serde_json::from_str::<Role>("\"owner\"").unwrap(), Role::Owner);
        assert_eq!(
            serde_json::from_str::<Role>("\"customer\"").unwrap(),
            Role::Customer
        );
        // Case-insensitive, as some issuers send capitalized names
        assert_eq!(serde_json::from_str::<Role>("\"Admin\"").unwrap(), Role::Admin);
    }

    #[test]
    fn role_deserializes_from_numeric_ids() {
        assert_eq!(serde_json::from_str::<Role>("1").unwrap(), Role::Admin);
        assert_eq!(serde_json::from_str::<Role>("2").unwrap(), Role::Owner);
        assert_eq!(serde_json::from_str::<Role>("3").unwrap(), Role::Customer);
        // Legacy admin id
        assert_eq!(serde_json::from_str::<Role>("0").unwrap(), Role::Admin);
    }

    #[test]
    fn unknown_roles_are_rejected() {
        assert!(serde_json::from_str::<Role>("\"superuser\"").is_err());
        assert!(serde_json::from_str::<Role>("7").is_err());
    }

    #[test]
    fn role_serializes_to_lowercase_name() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        assert_eq!(serde_json::to_string(&Role::Owner).unwrap(), "\"owner\"");
        assert_eq!(
            serde_json::to_string(&Role::Customer).unwrap(),
            "\"customer\""
        );
    }
}
