//! Administrative roles and the audit log.
//!
//! Parameter setters and protocol fee withdrawal are gated by roles.
//! The pool owner is the root authority: it holds every role implicitly
//! and is the only party that can grant or revoke roles for others.
//! Every effective grant and revoke is appended to an audit log so the
//! full history of who could do what remains reconstructable.

use std::collections::BTreeSet;

use anchor_lang::prelude::*;

use crate::errors::ErrorCode;

/// Capabilities that can be delegated by the owner.
#[derive(
    AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord,
)]
pub enum Role {
    /// Grants and revokes roles; implicitly includes the other roles.
    Owner,
    /// May change the swap fee and the protocol fee split.
    FeeSetter,
    /// May withdraw accumulated protocol fees.
    ProtocolCollector,
}

/// One entry in the administrative audit log.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoleChange {
    /// Who performed the change.
    pub actor: Pubkey,
    /// Whose roles changed.
    pub target: Pubkey,
    pub role: Role,
    /// True for a grant, false for a revoke.
    pub granted: bool,
    pub timestamp: i64,
}

/// Role assignments plus their append-only history.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug)]
pub struct RoleTable {
    owner: Pubkey,
    grants: BTreeSet<(Pubkey, Role)>,
    audit: Vec<RoleChange>,
}

impl RoleTable {
    pub fn new(owner: Pubkey) -> Self {
        RoleTable {
            owner,
            grants: BTreeSet::new(),
            audit: Vec::new(),
        }
    }

    pub fn owner(&self) -> Pubkey {
        self.owner
    }

    /// Whether `who` holds `role`, directly or by being the owner.
    pub fn holds(&self, who: Pubkey, role: Role) -> bool {
        who == self.owner || self.grants.contains(&(who, role))
    }

    /// Errors with `Unauthorized` unless `who` holds `role`.
    pub fn require(&self, who: Pubkey, role: Role) -> Result<()> {
        if self.holds(who, role) {
            Ok(())
        } else {
            Err(ErrorCode::Unauthorized.into())
        }
    }

    /// Grants `role` to `target`. Owner only; granting an already held
    /// role is accepted without a new audit entry.
    pub fn grant(&mut self, actor: Pubkey, target: Pubkey, role: Role, now: i64) -> Result<()> {
        self.require(actor, Role::Owner)?;
        if self.grants.insert((target, role)) {
            self.audit.push(RoleChange {
                actor,
                target,
                role,
                granted: true,
                timestamp: now,
            });
            emit!(RoleGranted {
                actor,
                target,
                role,
                timestamp: now,
            });
        }
        Ok(())
    }

    /// Revokes `role` from `target`. Owner only; revoking a role that
    /// was never granted is accepted without a new audit entry.
    ///
    /// The owner's implicit roles are not grants and cannot be revoked
    /// this way, so the pool can never lock itself out.
    pub fn revoke(&mut self, actor: Pubkey, target: Pubkey, role: Role, now: i64) -> Result<()> {
        self.require(actor, Role::Owner)?;
        if self.grants.remove(&(target, role)) {
            self.audit.push(RoleChange {
                actor,
                target,
                role,
                granted: false,
                timestamp: now,
            });
            emit!(RoleRevoked {
                actor,
                target,
                role,
                timestamp: now,
            });
        }
        Ok(())
    }

    /// Full grant/revoke history in application order.
    pub fn audit_log(&self) -> &[RoleChange] {
        &self.audit
    }
}

/// Emitted when a role is granted.
#[event]
pub struct RoleGranted {
    pub actor: Pubkey,
    pub target: Pubkey,
    pub role: Role,
    pub timestamp: i64,
}

/// Emitted when a role is revoked.
#[event]
pub struct RoleRevoked {
    pub actor: Pubkey,
    pub target: Pubkey,
    pub role: Role,
    pub timestamp: i64,
}
