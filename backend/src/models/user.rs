//! Profiles and caller identity.
//!
//! Accounts are owned by the identity provider; this service only reads
//! profiles and writes back the attendee's roll identifier.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::FromRow;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::{models::UnknownVariant, types::UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ToSchema)]
/// Role asserted by the identity provider.
pub enum UserRole {
    /// Presenter who opens and closes lectures.
    Teacher,
    /// Attendee who proves presence.
    Student,
}

impl UserRole {
    /// Returns the canonical snake_case representation of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Teacher => "teacher",
            UserRole::Student => "student",
        }
    }
}

impl FromStr for UserRole {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "teacher" | "Teacher" | "TEACHER" => Ok(UserRole::Teacher),
            "student" | "Student" | "STUDENT" => Ok(UserRole::Student),
            other => Err(UnknownVariant::new("role", other)),
        }
    }
}

impl TryFrom<String> for UserRole {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl Serialize for UserRole {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for UserRole {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(|_| {
            serde::de::Error::unknown_variant(&s, &["teacher", "student"])
        })
    }
}

/// Authenticated caller, as vouched for by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: UserId,
    pub role: UserRole,
}

impl Actor {
    pub fn new(id: UserId, role: UserRole) -> Self {
        Self { id, role }
    }

    pub fn is_teacher(&self) -> bool {
        matches!(self.role, UserRole::Teacher)
    }

    pub fn is_student(&self) -> bool {
        matches!(self.role, UserRole::Student)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
/// Profile snapshot returned alongside attendance operations.
pub struct Profile {
    pub id: UserId,
    pub username: String,
    pub full_name: String,
    pub email: Option<String>,
    #[sqlx(try_from = "String")]
    pub role: UserRole,
    /// Free-text roll number the attendee supplied on a previous join.
    pub roll_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serde_is_snake_case_and_tolerates_legacy_casing() {
        let r: UserRole = serde_json::from_str("\"Teacher\"").unwrap();
        assert_eq!(r, UserRole::Teacher);
        let v = serde_json::to_value(UserRole::Student).unwrap();
        assert_eq!(v, serde_json::json!("student"));
        assert!(serde_json::from_str::<UserRole>("\"admin\"").is_err());
    }
}
