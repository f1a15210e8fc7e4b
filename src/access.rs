//! Actor capabilities.
//!
//! Authentication lives outside this crate. The identity provider hands us an
//! [`Actor`] and we only ask a [`CapabilityProvider`] whether that actor may
//! perform a guarded action.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Move a pending report to completed.
    ApproveReports,
    /// Create reports and edit their rows.
    ManageReports,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::ApproveReports => f.write_str("approve_reports"),
            Capability::ManageReports => f.write_str("manage_reports"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub username: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Actor {
    pub fn new(username: impl Into<String>, roles: &[&str]) -> Self {
        Self {
            username: username.into(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }
}

#[cfg_attr(any(test, feature = "testing"), automock)]
pub trait CapabilityProvider: Send + Sync {
    fn has_capability(&self, actor: &Actor, capability: Capability) -> bool;
}

/// Capabilities granted per role name, usually built from configuration.
#[derive(Debug, Clone, Default)]
pub struct RoleCapabilities {
    roles: HashMap<String, HashSet<Capability>>,
}

impl RoleCapabilities {
    pub fn new(roles: HashMap<String, Vec<Capability>>) -> Self {
        Self {
            roles: roles
                .into_iter()
                .map(|(role, caps)| (role, caps.into_iter().collect()))
                .collect(),
        }
    }

    pub fn grant(mut self, role: &str, capability: Capability) -> Self {
        self.roles
            .entry(role.to_string())
            .or_default()
            .insert(capability);
        self
    }
}

impl CapabilityProvider for RoleCapabilities {
    fn has_capability(&self, actor: &Actor, capability: Capability) -> bool {
        actor.roles.iter().any(|role| {
            self.roles
                .get(role)
                .is_some_and(|caps| caps.contains(&capability))
        })
    }
}
