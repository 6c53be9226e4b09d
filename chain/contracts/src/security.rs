//! Shared security primitives for contract modules
//!
//! Provides the reentrancy guard and admin access control used across the
//! basket registry, the order book and the HTLC registry.

use types::ids::Address;

/// Reentrancy guard for contract entry points.
///
/// Holds the name of the entry point currently executing. A nested entry
/// is refused and told which operation is already in flight.
#[derive(Debug, Clone, Default)]
pub struct ReentrancyGuard {
    active: Option<&'static str>,
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter `operation`, or return the operation already holding the guard.
    pub fn enter(&mut self, operation: &'static str) -> Result<(), &'static str> {
        match self.active {
            Some(active) => Err(active),
            None => {
                self.active = Some(operation);
                Ok(())
            }
        }
    }

    pub fn exit(&mut self) {
        self.active = None;
    }

    /// Entry point currently executing, if any.
    pub fn active(&self) -> Option<&'static str> {
        self.active
    }
}

/// Single-admin access control.
///
/// Gates allow-list maintenance and admin hand-over. Holds no other roles:
/// basket, order and swap authorization is ownership based.
#[derive(Debug, Clone)]
pub struct AccessControl {
    admin: Address,
}

impl AccessControl {
    /// Create access control with an initial admin.
    pub fn new(admin: Address) -> Self {
        Self { admin }
    }

    /// Check if a caller is admin.
    pub fn is_admin(&self, caller: &Address) -> bool {
        self.admin == *caller
    }

    /// Transfer admin to a new address.
    pub fn transfer_admin(&mut self, current_admin: &Address, new_admin: Address) -> bool {
        if !self.is_admin(current_admin) {
            return false;
        }
        self.admin = new_admin;
        true
    }

    /// Get the current admin.
    pub fn admin(&self) -> &Address {
        &self.admin
    }
}
