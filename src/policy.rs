//! Read-only policy gate.
//!
//! The gate is built once from configuration and never mutated, so it can be
//! shared freely across sessions.

use crate::error::DbError;

/// Classification of a registered tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolClass {
    Read,
    /// `action` is the phrase used in the denial message, e.g. "Write queries".
    Write { action: &'static str },
}

impl ToolClass {
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Write { .. })
    }
}

/// Result of a policy check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDecision {
    Allowed,
    Denied(String),
}

impl PolicyDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    /// Convert into a result, mapping a denial to `DbError::PolicyDenied`.
    pub fn into_result(self) -> Result<(), DbError> {
        match self {
            Self::Allowed => Ok(()),
            Self::Denied(reason) => Err(DbError::PolicyDenied { reason }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyGate {
    read_only: bool,
}

impl PolicyGate {
    pub fn new(read_only: bool) -> Self {
        Self { read_only }
    }

    pub fn read_only() -> Self {
        Self::new(true)
    }

    pub fn writable() -> Self {
        Self::new(false)
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn check(&self, class: ToolClass) -> PolicyDecision {
        match class {
            ToolClass::Read => PolicyDecision::Allowed,
            ToolClass::Write { .. } if !self.read_only => PolicyDecision::Allowed,
            ToolClass::Write { action } => {
                PolicyDecision::Denied(DbError::policy_denied(action).to_string())
            }
        }
    }
}

impl Default for PolicyGate {
    fn default() -> Self {
        Self::read_only()
    }
}
