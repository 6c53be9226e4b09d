//! Fungible asset custody
//!
//! The contracts never own fungible balances themselves. They talk to an
//! [`AssetCustody`] collaborator with token-contract semantics:
//! - allowance-based `pull` from an owner into an escrow account
//! - `push` out of an escrow account
//! - balance and allowance queries
//!
//! Every call either fully succeeds or leaves balances untouched.
//! [`TokenLedger`] is the in-memory implementation: a set of fungible
//! tokens keyed by asset address, each with balances and allowances.

use std::collections::HashMap;

use tracing::debug;
use types::ids::Address;
use types::numeric::Amount;

use crate::errors::CustodyError;

/// Token-contract capability consumed by the basket registry and order book.
pub trait AssetCustody {
    /// Balance of `holder` in `asset`.
    fn balance_of(&self, asset: &Address, holder: &Address) -> Amount;

    /// Amount `spender` may still pull from `owner`.
    fn allowance(&self, asset: &Address, owner: &Address, spender: &Address) -> Amount;

    /// Move `amount` from `owner` to `spender`, consuming allowance.
    fn pull(
        &mut self,
        asset: &Address,
        owner: &Address,
        spender: &Address,
        amount: Amount,
    ) -> Result<(), CustodyError>;

    /// Move `amount` held by `from` to `to`. `from` is the calling escrow.
    fn push(
        &mut self,
        asset: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), CustodyError>;
}

/// In-memory multi-token ledger.
///
/// Balances are stored per asset as `HashMap<Address, Amount>`. Allowances
/// are keyed by `(asset, owner, spender)`.
#[derive(Debug, Default)]
pub struct TokenLedger {
    balances: HashMap<Address, HashMap<Address, Amount>>,
    allowances: HashMap<(Address, Address, Address), Amount>,
}

impl TokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit freshly issued tokens to `to` (faucet).
    pub fn mint(&mut self, asset: &Address, to: &Address, amount: Amount) -> Result<(), CustodyError> {
        if !amount.is_positive() {
            return Err(CustodyError::InvalidAmount);
        }
        self.safe_credit(asset, to, amount)
    }

    /// Set the allowance `spender` may pull from `owner`. Overwrites.
    pub fn approve(&mut self, asset: &Address, owner: &Address, spender: &Address, amount: Amount) {
        self.allowances
            .insert((asset.clone(), owner.clone(), spender.clone()), amount);
    }

    /// Holder-initiated transfer.
    pub fn transfer(
        &mut self,
        asset: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), CustodyError> {
        self.move_balance(asset, from, to, amount)
    }

    /// Total issued amount of `asset` across all holders, or `None` if the
    /// sum overflows.
    pub fn total_supply(&self, asset: &Address) -> Option<Amount> {
        match self.balances.get(asset) {
            Some(holders) => holders
                .values()
                .try_fold(Amount::ZERO, |acc, a| acc.checked_add(*a)),
            None => Some(Amount::ZERO),
        }
    }

    // ───────────────────────── Safe Transfer ─────────────────────────

    fn move_balance(
        &mut self,
        asset: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), CustodyError> {
        if !amount.is_positive() {
            return Err(CustodyError::InvalidAmount);
        }
        if from == to {
            // Balance check still applies to self-transfers.
            let available = self.balance_of(asset, from);
            if available < amount {
                return Err(CustodyError::InsufficientBalance {
                    asset: asset.clone(),
                    required: amount,
                    available,
                });
            }
            return Ok(());
        }

        // Validate both sides before touching either balance.
        let available = self.balance_of(asset, from);
        let debited = available
            .checked_sub(amount)
            .ok_or_else(|| CustodyError::InsufficientBalance {
                asset: asset.clone(),
                required: amount,
                available,
            })?;
        let credited = self
            .balance_of(asset, to)
            .checked_add(amount)
            .ok_or(CustodyError::Overflow)?;

        let holders = self.balances.entry(asset.clone()).or_default();
        holders.insert(from.clone(), debited);
        holders.insert(to.clone(), credited);
        Ok(())
    }

    /// Internal credit with overflow protection.
    fn safe_credit(&mut self, asset: &Address, to: &Address, amount: Amount) -> Result<(), CustodyError> {
        let holders = self.balances.entry(asset.clone()).or_default();
        let current = holders.entry(to.clone()).or_insert(Amount::ZERO);
        *current = current.checked_add(amount).ok_or(CustodyError::Overflow)?;
        Ok(())
    }
}

impl AssetCustody for TokenLedger {
    fn balance_of(&self, asset: &Address, holder: &Address) -> Amount {
        self.balances
            .get(asset)
            .and_then(|holders| holders.get(holder))
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    fn allowance(&self, asset: &Address, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(&(asset.clone(), owner.clone(), spender.clone()))
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    fn pull(
        &mut self,
        asset: &Address,
        owner: &Address,
        spender: &Address,
        amount: Amount,
    ) -> Result<(), CustodyError> {
        let allowed = self.allowance(asset, owner, spender);
        let remaining = allowed
            .checked_sub(amount)
            .ok_or_else(|| CustodyError::InsufficientAllowance {
                asset: asset.clone(),
                owner: owner.clone(),
                spender: spender.clone(),
                required: amount,
                available: allowed,
            })?;

        self.move_balance(asset, owner, spender, amount)?;
        self.approve(asset, owner, spender, remaining);
        debug!(%asset, %owner, %spender, %amount, "custody pull");
        Ok(())
    }

    fn push(
        &mut self,
        asset: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), CustodyError> {
        self.move_balance(asset, from, to, amount)?;
        debug!(%asset, %from, %to, %amount, "custody push");
        Ok(())
    }
}
