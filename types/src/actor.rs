//! Roles and the explicit acting identity passed into every core operation.

use crate::error::TypesError;
use crate::ids::{ProjectId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A member's role within a project, as reported by the identity provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Admin,
    Editor,
    Analyst,
    Validator,
    /// Independent third-party auditor.
    Verifier,
    Viewer,
}

impl Role {
    /// May approve, return or reject records during the review stage.
    pub fn can_review(&self) -> bool {
        matches!(self, Role::Owner | Role::Admin | Role::Editor | Role::Analyst)
    }

    /// May act during the validation stage.
    pub fn can_validate(&self) -> bool {
        matches!(self, Role::Owner | Role::Admin | Role::Validator)
    }

    /// May mark individual fields verified or unverified.
    pub fn can_verify_fields(&self) -> bool {
        self.can_review() || *self == Role::Validator
    }

    pub fn can_request_audit(&self) -> bool {
        matches!(self, Role::Owner | Role::Admin | Role::Validator)
    }

    /// May take and complete third-party audit requests.
    pub fn can_audit(&self) -> bool {
        matches!(self, Role::Owner | Role::Admin | Role::Verifier)
    }

    /// May flag regressions on audit results.
    pub fn can_unverify_audit(&self) -> bool {
        matches!(self, Role::Owner | Role::Admin | Role::Editor | Role::Analyst)
    }

    /// Schema editing and credit grants.
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Owner | Role::Admin)
    }

    /// May attach and link evidence.
    pub fn can_edit_evidence(&self) -> bool {
        self.can_review() || *self == Role::Validator
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Editor => "editor",
            Role::Analyst => "analyst",
            Role::Validator => "validator",
            Role::Verifier => "verifier",
            Role::Viewer => "viewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "owner" => Ok(Role::Owner),
            "admin" => Ok(Role::Admin),
            "editor" => Ok(Role::Editor),
            "analyst" => Ok(Role::Analyst),
            "validator" => Ok(Role::Validator),
            "verifier" => Ok(Role::Verifier),
            "viewer" => Ok(Role::Viewer),
            other => Err(TypesError::UnknownRole(other.to_string())),
        }
    }
}

/// The identity performing an operation, scoped to one project.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
    pub project_id: ProjectId,
}

impl Actor {
    pub fn new(id: impl Into<UserId>, role: Role, project_id: ProjectId) -> Self {
        Self {
            id: id.into(),
            role,
            project_id,
        }
    }

    /// Build an actor from the identity provider's answer.
    pub fn resolve(
        provider: &impl RoleProvider,
        user: &UserId,
        project: ProjectId,
    ) -> Result<Self, TypesError> {
        let raw = provider
            .role_of(user, project)
            .ok_or_else(|| TypesError::NotAMember {
                user: user.to_string(),
                project: project.to_string(),
            })?;
        Ok(Self {
            id: user.clone(),
            role: raw.parse()?,
            project_id: project,
        })
    }
}

/// Identity/role collaborator: returns the role string of a user in a project.
pub trait RoleProvider {
    fn role_of(&self, user: &UserId, project: ProjectId) -> Option<String>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Roles(HashMap<(String, u64), String>);

    impl RoleProvider for Roles {
        fn role_of(&self, user: &UserId, project: ProjectId) -> Option<String> {
            self.0.get(&(user.to_string(), project.get())).cloned()
        }
    }

    #[test]
    fn resolve_parses_provider_role() {
        let mut map = HashMap::new();
        map.insert(("ana".to_string(), 1), "Analyst".to_string());
        let roles = Roles(map);

        let actor = Actor::resolve(&roles, &UserId::from("ana"), ProjectId::new(1)).unwrap();
        assert_eq!(actor.role, Role::Analyst);

        let err = Actor::resolve(&roles, &UserId::from("ana"), ProjectId::new(2)).unwrap_err();
        assert!(matches!(err, TypesError::NotAMember { .. }));
    }

    #[test]
    fn unknown_role_string_is_rejected() {
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn stage_permissions() {
        assert!(Role::Analyst.can_review());
        assert!(!Role::Analyst.can_validate());
        assert!(Role::Validator.can_validate());
        assert!(!Role::Validator.can_review());
        assert!(Role::Verifier.can_audit());
        assert!(!Role::Viewer.can_verify_fields());
    }
}
