//! # Authorization
//!
//! Roles arrive with every call from the auth collaborator. This module
//! turns a role into a fixed capability set; services ask one question,
//! "can this actor do X?", and never compare roles directly.
//!
//! ## Capability Table
//! ```text
//! ┌──────────────────────────┬───────┬─────────┬──────────┐
//! │ Capability               │ ADMIN │ MANAGER │ EMPLOYEE │
//! ├──────────────────────────┼───────┼─────────┼──────────┤
//! │ ManageProducts           │   ✓   │    ✓    │          │
//! │ RecordMovement           │   ✓   │    ✓    │    ✓     │
//! │ ViewLedger               │   ✓   │         │          │
//! │ OwnRegister              │   ✓   │    ✓    │    ✓     │
//! │ ManageAnyRegister        │   ✓   │         │          │
//! │ OverrideClosedRegister   │   ✓   │         │          │
//! │ ViewAllRegisters         │   ✓   │         │          │
//! └──────────────────────────┴───────┴─────────┴──────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};

// =============================================================================
// Role
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum Role {
    Admin,
    Manager,
    Employee,
}

const ADMIN_CAPABILITIES: &[Capability] = &[
    Capability::ManageProducts,
    Capability::RecordMovement,
    Capability::ViewLedger,
    Capability::OwnRegister,
    Capability::ManageAnyRegister,
    Capability::OverrideClosedRegister,
    Capability::ViewAllRegisters,
];

const MANAGER_CAPABILITIES: &[Capability] = &[
    Capability::ManageProducts,
    Capability::RecordMovement,
    Capability::OwnRegister,
];

const EMPLOYEE_CAPABILITIES: &[Capability] = &[Capability::RecordMovement, Capability::OwnRegister];

impl Role {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Manager => "MANAGER",
            Role::Employee => "EMPLOYEE",
        }
    }

    pub const fn capabilities(&self) -> &'static [Capability] {
        match self {
            Role::Admin => ADMIN_CAPABILITIES,
            Role::Manager => MANAGER_CAPABILITIES,
            Role::Employee => EMPLOYEE_CAPABILITIES,
        }
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Role::Admin, Role::Manager, Role::Employee]
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "role".to_string(),
                allowed: vec!["ADMIN".into(), "MANAGER".into(), "EMPLOYEE".into()],
            })
    }
}

// =============================================================================
// Capability
// =============================================================================

/// Something an actor may be allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum Capability {
    /// Create products.
    ManageProducts,
    /// Record ENTRY, EXIT or ADJUST movements.
    RecordMovement,
    /// Read the movement ledger.
    ViewLedger,
    /// Open and edit one's own registers.
    OwnRegister,
    /// Edit registers owned by someone else.
    ManageAnyRegister,
    /// Edit amounts on a closed register.
    OverrideClosedRegister,
    /// See every user's registers.
    ViewAllRegisters,
}

impl Capability {
    /// Human wording for Forbidden messages.
    pub const fn describe(&self) -> &'static str {
        match self {
            Capability::ManageProducts => "manage products",
            Capability::RecordMovement => "record stock movements",
            Capability::ViewLedger => "view the movement ledger",
            Capability::OwnRegister => "operate a cash register",
            Capability::ManageAnyRegister => "edit another user's cash register",
            Capability::OverrideClosedRegister => "edit a closed cash register",
            Capability::ViewAllRegisters => "view every cash register",
        }
    }
}

// =============================================================================
// Actor
// =============================================================================

/// The authenticated caller, trusted as given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Actor {
    pub user_id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Actor {
            user_id: user_id.into(),
            role,
        }
    }

    #[inline]
    pub fn can(&self, capability: Capability) -> bool {
        self.role.has(capability)
    }

    /// Errors with `Forbidden` when the role lacks `capability`.
    pub fn require(&self, capability: Capability) -> CoreResult<()> {
        if self.can(capability) {
            Ok(())
        } else {
            Err(CoreError::Forbidden(format!(
                "{} may not {}",
                self.role,
                capability.describe()
            )))
        }
    }

    /// True when the actor owns `owner_id`'s records.
    #[inline]
    pub fn is(&self, owner_id: &str) -> bool {
        self.user_id == owner_id
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
