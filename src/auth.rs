use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::domain::customer::PrincipalId;

// ============================================================================
// Authorization
// ============================================================================
//
// Identity is established upstream; this module only answers "may this
// principal do that". Every entry point goes through `authorize`.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    Administrator,
    SalesAssistant,
    Customer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Administrator => "Administrator",
            Role::SalesAssistant => "SalesAssistant",
            Role::Customer => "Customer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Administrator" => Ok(Role::Administrator),
            "SalesAssistant" => Ok(Role::SalesAssistant),
            "Customer" => Ok(Role::Customer),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// What a caller wants to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    PlaceOrder,
    ViewOwnOrders,
    ViewAnyOrder,
}

impl Capability {
    /// Roles granted this capability
    pub fn allowed_roles(&self) -> &'static [Role] {
        match self {
            Capability::PlaceOrder | Capability::ViewOwnOrders => &[Role::Customer],
            Capability::ViewAnyOrder => &[Role::Administrator, Role::SalesAssistant],
        }
    }
}

/// Authenticated caller: opaque user id plus roles
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub id: PrincipalId,
    pub roles: BTreeSet<Role>,
}

impl Principal {
    pub fn new(id: PrincipalId, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            id,
            roles: roles.into_iter().collect(),
        }
    }

    /// Parse a comma separated role list. Unknown roles are ignored.
    pub fn from_role_list(id: PrincipalId, roles: &str) -> Self {
        let parsed = roles
            .split(',')
            .filter(|raw| !raw.trim().is_empty())
            .filter_map(|raw| match raw.parse::<Role>() {
                Ok(role) => Some(role),
                Err(err) => {
                    tracing::debug!(error = %err, "Ignoring role");
                    None
                }
            });
        Self::new(id, parsed)
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Principal {principal} lacks capability {capability:?}")]
pub struct AccessDenied {
    pub principal: PrincipalId,
    pub capability: Capability,
}

pub fn authorize(principal: &Principal, capability: Capability) -> Result<(), AccessDenied> {
    if capability.allowed_roles().iter().any(|role| principal.has_role(*role)) {
        Ok(())
    } else {
        Err(AccessDenied {
            principal: principal.id.clone(),
            capability,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(roles: &str) -> Principal {
        Principal::from_role_list(PrincipalId::new("u1"), roles)
    }

    #[test]
    fn test_customer_capabilities() {
        let customer = principal("Customer");
        assert!(authorize(&customer, Capability::PlaceOrder).is_ok());
        assert!(authorize(&customer, Capability::ViewOwnOrders).is_ok());
        assert!(authorize(&customer, Capability::ViewAnyOrder).is_err());
    }

    #[test]
    fn test_staff_capabilities() {
        for roles in ["Administrator", "SalesAssistant"] {
            let staff = principal(roles);
            assert!(authorize(&staff, Capability::ViewAnyOrder).is_ok());
            assert!(authorize(&staff, Capability::PlaceOrder).is_err());
        }
    }

    #[test]
    fn test_role_list_parsing() {
        let p = principal(" Customer, SalesAssistant ,Mechanic,,");
        assert_eq!(p.roles.len(), 2);
        assert!(p.has_role(Role::Customer));
        assert!(p.has_role(Role::SalesAssistant));
    }

    #[test]
    fn test_no_roles_denied() {
        let err = authorize(&principal(""), Capability::PlaceOrder).unwrap_err();
        assert_eq!(err.capability, Capability::PlaceOrder);
        assert_eq!(err.principal, PrincipalId::new("u1"));
    }
}
