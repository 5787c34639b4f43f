//! Static role × resource × action permission table.
//!
//! The table is assembled once through [`MatrixBuilder`] and frozen; a
//! `PermissionMatrix` has no mutating methods. Anything not granted is denied,
//! including roles and resources the table has never heard of.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Doctor,
    Nurse,
    Pharmacist,
    Admin,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Doctor, Role::Nurse, Role::Pharmacist, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Doctor => "Doctor",
            Role::Nurse => "Nurse",
            Role::Pharmacist => "Pharmacist",
            Role::Admin => "Admin",
        }
    }
}

impl FromStr for Role {
    type Err = ();

    // Exact match only: "doctor" is not a role.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Doctor" => Ok(Role::Doctor),
            "Nurse" => Ok(Role::Nurse),
            "Pharmacist" => Ok(Role::Pharmacist),
            "Admin" => Ok(Role::Admin),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Patients,
    Reports,
    Prescriptions,
    Users,
}

impl Resource {
    pub const ALL: [Resource; 4] = [Resource::Patients, Resource::Reports, Resource::Prescriptions, Resource::Users];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Patients => "patients",
            Resource::Reports => "reports",
            Resource::Prescriptions => "prescriptions",
            Resource::Users => "users",
        }
    }
}

impl FromStr for Resource {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "patients" => Ok(Resource::Patients),
            "reports" => Ok(Resource::Reports),
            "prescriptions" => Ok(Resource::Prescriptions),
            "users" => Ok(Resource::Users),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Read,
    Write,
    Update,
    Delete,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Read, Action::Write, Action::Update, Action::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Write => "write",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }

    fn bit(self) -> u8 {
        match self {
            Action::Read => 0b0001,
            Action::Write => 0b0010,
            Action::Update => 0b0100,
            Action::Delete => 0b1000,
        }
    }
}

impl FromStr for Action {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Action::Read),
            "write" => Ok(Action::Write),
            "update" => Ok(Action::Update),
            "delete" => Ok(Action::Delete),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// A subset of {read, write, update, delete}.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ActionSet(u8);

impl ActionSet {
    pub const EMPTY: ActionSet = ActionSet(0);

    pub fn of(actions: &[Action]) -> Self {
        actions.iter().fold(Self::EMPTY, |set, a| ActionSet(set.0 | a.bit()))
    }

    pub fn contains(&self, action: Action) -> bool { self.0 & action.bit() != 0 }

    pub fn is_empty(&self) -> bool { self.0 == 0 }

    pub fn len(&self) -> usize { self.0.count_ones() as usize }

    pub fn iter(&self) -> impl Iterator<Item = Action> + '_ {
        Action::ALL.into_iter().filter(move |a| self.contains(*a))
    }
}

impl fmt::Display for ActionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(|a| a.as_str()).collect();
        write!(f, "[{}]", names.join(","))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionMatrix {
    grants: HashMap<Role, HashMap<Resource, ActionSet>>,
}

impl PermissionMatrix {
    pub fn builder() -> MatrixBuilder { MatrixBuilder::default() }

    /// The clinic's policy: doctors and admins manage clinical records, nurses
    /// read, pharmacists see prescriptions, and only admins touch user accounts.
    pub fn clinic_default() -> Self {
        use Action::*;
        Self::builder()
            .grant(Role::Doctor, Resource::Patients, &[Read, Write, Update, Delete])
            .grant(Role::Doctor, Resource::Reports, &[Read, Write])
            .grant(Role::Doctor, Resource::Prescriptions, &[Read, Write])
            .grant(Role::Nurse, Resource::Patients, &[Read])
            .grant(Role::Nurse, Resource::Reports, &[Read])
            .grant(Role::Nurse, Resource::Prescriptions, &[])
            .grant(Role::Pharmacist, Resource::Patients, &[Read])
            .grant(Role::Pharmacist, Resource::Reports, &[])
            .grant(Role::Pharmacist, Resource::Prescriptions, &[Read])
            .grant(Role::Admin, Resource::Patients, &[Read, Write, Update, Delete])
            .grant(Role::Admin, Resource::Reports, &[Read, Write])
            .grant(Role::Admin, Resource::Prescriptions, &[Read, Write])
            .grant(Role::Admin, Resource::Users, &[Read, Write, Update, Delete])
            .build()
    }

    /// Actions configured for `(role, resource)`; empty when either key is absent.
    pub fn actions_for(&self, role: Role, resource: Resource) -> ActionSet {
        self.grants
            .get(&role)
            .and_then(|by_resource| by_resource.get(&resource))
            .copied()
            .unwrap_or(ActionSet::EMPTY)
    }

    /// String-keyed lookup. Unrecognized role or resource names are a normal
    /// deny, never an error.
    pub fn lookup(&self, role: &str, resource: &str) -> ActionSet {
        match (role.parse::<Role>(), resource.parse::<Resource>()) {
            (Ok(role), Ok(resource)) => self.actions_for(role, resource),
            _ => ActionSet::EMPTY,
        }
    }

    /// Resources a role has any grant on, for diagnostics.
    pub fn resources_for(&self, role: Role) -> Vec<(Resource, ActionSet)> {
        let mut out: Vec<(Resource, ActionSet)> = Resource::ALL
            .into_iter()
            .map(|r| (r, self.actions_for(role, r)))
            .filter(|(_, set)| !set.is_empty())
            .collect();
        out.sort_by_key(|(r, _)| r.as_str());
        out
    }
}

#[derive(Debug, Default)]
pub struct MatrixBuilder {
    grants: HashMap<Role, HashMap<Resource, ActionSet>>,
}

impl MatrixBuilder {
    /// Add `actions` to the set for `(role, resource)`. Granting an empty slice
    /// records the pair explicitly with no actions, which still denies.
    pub fn grant(mut self, role: Role, resource: Resource, actions: &[Action]) -> Self {
        let entry = self.grants.entry(role).or_default().entry(resource).or_default();
        *entry = ActionSet(entry.0 | ActionSet::of(actions).0);
        self
    }

    pub fn build(self) -> PermissionMatrix { PermissionMatrix { grants: self.grants } }
}

/// Process-wide clinic policy, built on first use.
pub static CLINIC_POLICY: Lazy<Arc<PermissionMatrix>> = Lazy::new(|| Arc::new(PermissionMatrix::clinic_default()));
