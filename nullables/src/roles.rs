//! Fixed membership table standing in for the identity provider.

use attest_types::{ProjectId, Role, RoleProvider, UserId};
use std::collections::HashMap;

#[derive(Clone, Debug, Default)]
pub struct StaticRoles {
    members: HashMap<(UserId, ProjectId), String>,
}

impl StaticRoles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style membership grant.
    pub fn with(mut self, user: &str, project: ProjectId, role: Role) -> Self {
        self.grant(user, project, role);
        self
    }

    pub fn grant(&mut self, user: &str, project: ProjectId, role: Role) {
        self.members
            .insert((UserId::from(user), project), role.as_str().to_string());
    }

    /// Store a raw role string, valid or not.
    pub fn grant_raw(&mut self, user: &str, project: ProjectId, role: &str) {
        self.members
            .insert((UserId::from(user), project), role.to_string());
    }

    pub fn revoke(&mut self, user: &str, project: ProjectId) {
        self.members.remove(&(UserId::from(user), project));
    }
}

impl RoleProvider for StaticRoles {
    fn role_of(&self, user: &UserId, project: ProjectId) -> Option<String> {
        self.members.get(&(user.clone(), project)).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attest_types::Actor;

    #[test]
    fn resolves_members_only() {
        let p = ProjectId::new(1);
        let mut roles = StaticRoles::new().with("vic", p, Role::Validator);
        let actor = Actor::resolve(&roles, &UserId::from("vic"), p).unwrap();
        assert_eq!(actor.role, Role::Validator);
        assert!(Actor::resolve(&roles, &UserId::from("vic"), ProjectId::new(2)).is_err());

        roles.grant_raw("eve", p, "overlord");
        assert!(Actor::resolve(&roles, &UserId::from("eve"), p).is_err());
    }
}
