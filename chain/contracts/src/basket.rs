//! Basket registry: wrap fungible tokens into a non-fungible claim ticket
//!
//! A basket escrows a set of allow-listed fungible assets in the registry's
//! own custody account and mints one token of the registry's collection to
//! the depositor. Burning the token (`unwrap`) returns every constituent.
//!
//! - Allow-list maintenance (admin only)
//! - Wrap: validate, check allowances and balances, record, then pull each
//!   constituent; a failed pull refunds the pulls already made and drops
//!   the record
//! - Unwrap: validate, check escrow coverage, burn, then return each
//!   constituent; a failed return re-records the basket holding exactly
//!   the constituents still in escrow
//! - ERC-721 style ownership through [`NonFungibleLedger`], with baskets
//!   locked for sale refusing to move

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use types::ids::{Address, BasketId};
use types::numeric::Amount;

use crate::config::{AllowList, RegistryConfig};
use crate::custody::AssetCustody;
use crate::errors::{BasketError, ConfigError, CustodyError, NftError};
use crate::events::{
    AllowListUpdated, Approval, ApprovalForAll, BasketBurned, BasketMinted, BasketTransferred,
    ContractEvent,
};
use crate::nft::{NonFungibleLedger, OwnershipBook};
use crate::security::{AccessControl, ReentrancyGuard};

/// One fungible asset and the amount of it held for a basket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constituent {
    pub asset: Address,
    pub amount: Amount,
}

impl Constituent {
    pub fn new(asset: impl Into<Address>, amount: impl Into<Amount>) -> Self {
        Self {
            asset: asset.into(),
            amount: amount.into(),
        }
    }
}

/// Read-only view of a live basket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasketSnapshot {
    pub basket_id: BasketId,
    pub owner: Address,
    pub constituents: Vec<Constituent>,
    pub locked_for_sale: bool,
}

#[derive(Debug, Clone)]
struct Basket {
    constituents: Vec<Constituent>,
    locked_for_sale: bool,
}

/// Registry of baskets and the basket token collection.
///
/// Ownership and approvals live in an [`OwnershipBook`]; the registry adds
/// the constituent records and the sale lock on top of it.
#[derive(Debug)]
pub struct BasketRegistry {
    /// Token contract address and custody account for constituents.
    address: Address,
    allow_list: AllowList,
    baskets: HashMap<BasketId, Basket>,
    book: OwnershipBook,
    /// Id handed to the next successful wrap.
    next_id: BasketId,
    reentrancy_guard: ReentrancyGuard,
    access_control: AccessControl,
    events: Vec<ContractEvent>,
}

impl BasketRegistry {
    pub fn new(config: RegistryConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        info!(
            address = %config.address,
            admin = %config.admin,
            eligible_assets = config.allow_list.len(),
            "BasketRegistry initialized"
        );
        Ok(Self {
            address: config.address,
            allow_list: config.allow_list,
            baskets: HashMap::new(),
            book: OwnershipBook::new(),
            next_id: BasketId::new(1),
            reentrancy_guard: ReentrancyGuard::new(),
            access_control: AccessControl::new(config.admin),
            events: Vec::new(),
        })
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    // ───────────────────────── Allow-list ─────────────────────────

    pub fn is_eligible(&self, asset: &Address) -> bool {
        self.allow_list.contains(asset)
    }

    pub fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }

    /// List `asset` with its price feed. Admin-only.
    pub fn add_eligible_asset(
        &mut self,
        caller: &Address,
        asset: Address,
        feed: Address,
    ) -> Result<(), BasketError> {
        self.check_admin(caller)?;
        info!(%asset, %feed, "asset listed");
        self.allow_list.insert(asset.clone(), feed);
        self.events
            .push(ContractEvent::AllowListUpdated(AllowListUpdated {
                asset,
                eligible: true,
            }));
        Ok(())
    }

    /// Delist `asset`. Existing baskets holding it are unaffected. Admin-only.
    pub fn remove_eligible_asset(
        &mut self,
        caller: &Address,
        asset: &Address,
    ) -> Result<(), BasketError> {
        self.check_admin(caller)?;
        if self.allow_list.remove(asset).is_some() {
            info!(%asset, "asset delisted");
            self.events
                .push(ContractEvent::AllowListUpdated(AllowListUpdated {
                    asset: asset.clone(),
                    eligible: false,
                }));
        }
        Ok(())
    }

    pub fn admin(&self) -> &Address {
        self.access_control.admin()
    }

    pub fn set_admin(&mut self, caller: &Address, new_admin: Address) -> Result<(), BasketError> {
        if !self.access_control.transfer_admin(caller, new_admin) {
            warn!(%caller, "set_admin rejected");
            return Err(BasketError::Unauthorized);
        }
        info!(admin = %self.access_control.admin(), "admin transferred");
        Ok(())
    }

    // ───────────────────────── Wrap ─────────────────────────

    /// Escrow `assets` from `caller` and mint a basket to them.
    ///
    /// The registry pulls each constituent with itself as spender, so the
    /// caller must have approved the registry address on every asset.
    pub fn wrap(
        &mut self,
        assets: Vec<Constituent>,
        caller: &Address,
        custody: &mut impl AssetCustody,
    ) -> Result<BasketId, BasketError> {
        if let Err(active) = self.reentrancy_guard.enter("wrap") {
            warn!(%caller, active, "wrap rejected: reentrant call");
            return Err(BasketError::Reentrancy);
        }
        let result = self.wrap_inner(assets, caller, custody);
        self.reentrancy_guard.exit();
        result
    }

    fn wrap_inner(
        &mut self,
        assets: Vec<Constituent>,
        caller: &Address,
        custody: &mut impl AssetCustody,
    ) -> Result<BasketId, BasketError> {
        if let Err(e) = self.validate_constituents(&assets) {
            warn!(%caller, error = %e, "wrap rejected");
            return Err(e);
        }
        if let Err(e) = self.check_funding(&assets, caller, &*custody) {
            warn!(%caller, error = %e, "wrap rejected: not funded");
            return Err(e.into());
        }
        let basket_id = self.next_id;
        let following = basket_id.next().ok_or(BasketError::IdExhausted)?;

        // Effects: the basket exists before any custody call.
        self.book.mint(caller, basket_id)?;
        self.baskets.insert(
            basket_id,
            Basket {
                constituents: assets.clone(),
                locked_for_sale: false,
            },
        );
        self.next_id = following;

        for (pulled, constituent) in assets.iter().enumerate() {
            if let Err(e) = custody.pull(&constituent.asset, caller, &self.address, constituent.amount) {
                warn!(
                    %basket_id,
                    %caller,
                    asset = %constituent.asset,
                    error = %e,
                    "wrap pull failed, rolling back"
                );
                let stranded = self.refund(custody, caller, &assets[..pulled]);
                if stranded.is_empty() {
                    self.baskets.remove(&basket_id);
                    // Freshly minted, so the burn cannot miss.
                    let _ = self.book.burn(basket_id);
                    self.next_id = basket_id;
                    return Err(e.into());
                }

                // Whatever could not be refunded stays claimable by the caller.
                error!(%basket_id, %caller, stranded = stranded.len(), "wrap rollback incomplete");
                let count = stranded.len();
                self.baskets.insert(
                    basket_id,
                    Basket {
                        constituents: stranded.clone(),
                        locked_for_sale: false,
                    },
                );
                self.events.push(ContractEvent::BasketMinted(BasketMinted {
                    basket_id,
                    owner: caller.clone(),
                    constituents: stranded,
                }));
                return Err(BasketError::PartialWrap {
                    basket_id,
                    stranded: count,
                    source: e,
                });
            }
        }

        info!(%basket_id, owner = %caller, constituents = assets.len(), "basket wrapped");
        self.events.push(ContractEvent::BasketMinted(BasketMinted {
            basket_id,
            owner: caller.clone(),
            constituents: assets,
        }));
        Ok(basket_id)
    }

    fn validate_constituents(&self, assets: &[Constituent]) -> Result<(), BasketError> {
        if assets.is_empty() {
            return Err(BasketError::EmptyBasket);
        }
        let mut seen = HashSet::with_capacity(assets.len());
        for Constituent { asset, amount } in assets {
            if !self.allow_list.contains(asset) {
                return Err(BasketError::AssetNotListed {
                    asset: asset.clone(),
                });
            }
            if !amount.is_positive() {
                return Err(BasketError::InvalidAmount {
                    asset: asset.clone(),
                    amount: *amount,
                });
            }
            if !seen.insert(asset) {
                return Err(BasketError::DuplicateAsset {
                    asset: asset.clone(),
                });
            }
        }
        Ok(())
    }

    /// Every pull must be covered by allowance and balance before the first
    /// one is made, so an underfunded wrap changes nothing.
    fn check_funding(
        &self,
        assets: &[Constituent],
        owner: &Address,
        custody: &impl AssetCustody,
    ) -> Result<(), CustodyError> {
        for Constituent { asset, amount } in assets {
            let allowed = custody.allowance(asset, owner, &self.address);
            if allowed < *amount {
                return Err(CustodyError::InsufficientAllowance {
                    asset: asset.clone(),
                    owner: owner.clone(),
                    spender: self.address.clone(),
                    required: *amount,
                    available: allowed,
                });
            }
            let available = custody.balance_of(asset, owner);
            if available < *amount {
                return Err(CustodyError::InsufficientBalance {
                    asset: asset.clone(),
                    required: *amount,
                    available,
                });
            }
        }
        Ok(())
    }

    // ───────────────────────── Unwrap ─────────────────────────

    /// Burn `basket_id` and return its constituents to `caller`.
    pub fn unwrap(
        &mut self,
        basket_id: BasketId,
        caller: &Address,
        custody: &mut impl AssetCustody,
    ) -> Result<Vec<Constituent>, BasketError> {
        if let Err(active) = self.reentrancy_guard.enter("unwrap") {
            warn!(%basket_id, %caller, active, "unwrap rejected: reentrant call");
            return Err(BasketError::Reentrancy);
        }
        let result = self.unwrap_inner(basket_id, caller, custody);
        self.reentrancy_guard.exit();
        result
    }

    fn unwrap_inner(
        &mut self,
        basket_id: BasketId,
        caller: &Address,
        custody: &mut impl AssetCustody,
    ) -> Result<Vec<Constituent>, BasketError> {
        let owner = self.require_owner(basket_id, caller)?;
        let basket = self.basket_ref(basket_id)?;
        if basket.locked_for_sale {
            warn!(%basket_id, %caller, "unwrap rejected: basket locked");
            return Err(BasketError::Locked { basket_id });
        }

        // Every return must be covered before anything moves.
        for constituent in &basket.constituents {
            let held = custody.balance_of(&constituent.asset, &self.address);
            if held < constituent.amount {
                error!(%basket_id, asset = %constituent.asset, %held, "custody short of basket holdings");
                return Err(CustodyError::InsufficientBalance {
                    asset: constituent.asset.clone(),
                    required: constituent.amount,
                    available: held,
                }
                .into());
            }
        }

        // Effects: the record is gone before any custody call.
        let approved = self.book.get_approved(basket_id)?.cloned();
        let basket = self
            .baskets
            .remove(&basket_id)
            .ok_or(BasketError::UnknownBasket { basket_id })?;
        self.book.burn(basket_id)?;

        let mut failure = None;
        for (returned, constituent) in basket.constituents.iter().enumerate() {
            if let Err(e) = custody.push(&constituent.asset, &self.address, &owner, constituent.amount) {
                warn!(
                    %basket_id,
                    asset = %constituent.asset,
                    error = %e,
                    "unwrap return failed, restoring basket"
                );
                failure = Some((returned, e));
                break;
            }
        }
        if let Some((returned, e)) = failure {
            if returned == 0 {
                self.restore(basket_id, &owner, approved, basket);
                return Err(e.into());
            }

            // Returned constituents are the owner's now; the basket keeps the rest.
            let total = basket.constituents.len();
            let remaining = Basket {
                constituents: basket.constituents[returned..].to_vec(),
                locked_for_sale: false,
            };
            error!(%basket_id, %owner, returned, total, "unwrap interrupted, basket keeps unreturned constituents");
            self.restore(basket_id, &owner, approved, remaining);
            return Err(BasketError::PartialUnwrap {
                basket_id,
                returned,
                total,
                source: e,
            });
        }

        info!(%basket_id, %owner, "basket unwrapped");
        self.events.push(ContractEvent::BasketBurned(BasketBurned {
            basket_id,
            owner,
        }));
        Ok(basket.constituents)
    }

    fn restore(&mut self, basket_id: BasketId, owner: &Address, approved: Option<Address>, basket: Basket) {
        // The id was live a moment ago and ids are never reissued.
        let _ = self.book.mint(owner, basket_id);
        if approved.is_some() {
            let _ = self.book.approve(owner, approved, basket_id);
        }
        self.baskets.insert(basket_id, basket);
    }

    /// Push `pulled` back from escrow to `to`. Returns the constituents that
    /// could not be refunded.
    fn refund(
        &self,
        custody: &mut impl AssetCustody,
        to: &Address,
        pulled: &[Constituent],
    ) -> Vec<Constituent> {
        let mut stranded = Vec::new();
        for constituent in pulled {
            if let Err(e) = custody.push(&constituent.asset, &self.address, to, constituent.amount) {
                error!(
                    asset = %constituent.asset,
                    amount = %constituent.amount,
                    error = %e,
                    "refund of pulled constituent failed"
                );
                stranded.push(constituent.clone());
            }
        }
        stranded
    }

    // ───────────────────────── Queries ─────────────────────────

    /// Constituents and current state of a live basket.
    pub fn wrapped_balance(&self, basket_id: BasketId) -> Result<BasketSnapshot, BasketError> {
        let basket = self.basket_ref(basket_id)?;
        let owner = self.book.owner_of(basket_id)?.clone();
        debug!(%basket_id, "wrapped_balance");
        Ok(BasketSnapshot {
            basket_id,
            owner,
            constituents: basket.constituents.clone(),
            locked_for_sale: basket.locked_for_sale,
        })
    }

    pub fn exists(&self, basket_id: BasketId) -> bool {
        self.baskets.contains_key(&basket_id)
    }

    pub fn is_locked(&self, basket_id: BasketId) -> Result<bool, BasketError> {
        Ok(self.basket_ref(basket_id)?.locked_for_sale)
    }

    /// Number of live baskets owned by `owner`.
    pub fn balance_of(&self, owner: &Address) -> usize {
        self.book.balance_of(owner)
    }

    pub fn baskets_of(&self, owner: &Address) -> Vec<BasketId> {
        self.book.tokens_of(owner)
    }

    pub fn events(&self) -> &[ContractEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<ContractEvent> {
        std::mem::take(&mut self.events)
    }

    // ───────────────────────── Order book hooks ─────────────────────────

    pub(crate) fn set_locked(&mut self, basket_id: BasketId, locked: bool) -> Result<(), BasketError> {
        let basket = self
            .baskets
            .get_mut(&basket_id)
            .ok_or(BasketError::UnknownBasket { basket_id })?;
        basket.locked_for_sale = locked;
        debug!(%basket_id, locked, "sale lock updated");
        Ok(())
    }

    /// Move a basket as part of a sale settlement. The order book has
    /// already checked the listing; only ownership by `from` is enforced.
    /// Emits nothing, so a rolled-back settlement leaves no trace.
    pub(crate) fn settle_transfer(
        &mut self,
        from: &Address,
        to: &Address,
        basket_id: BasketId,
    ) -> Result<(), BasketError> {
        let owner = self.book.owner_of(basket_id)?;
        if owner != from {
            return Err(NftError::WrongOwner {
                from: from.clone(),
                token_id: basket_id,
            }
            .into());
        }
        self.book.move_token(from, to, basket_id);
        Ok(())
    }

    pub(crate) fn record_transfer(&mut self, from: &Address, to: &Address, basket_id: BasketId) {
        info!(%basket_id, %from, %to, "basket transferred");
        self.events
            .push(ContractEvent::BasketTransferred(BasketTransferred {
                basket_id,
                from: from.clone(),
                to: to.clone(),
            }));
    }

    // ───────────────────────── Internal ─────────────────────────

    fn check_admin(&self, caller: &Address) -> Result<(), BasketError> {
        if !self.access_control.is_admin(caller) {
            warn!(%caller, "admin-only call rejected");
            return Err(BasketError::Unauthorized);
        }
        Ok(())
    }

    fn basket_ref(&self, basket_id: BasketId) -> Result<&Basket, BasketError> {
        self.baskets
            .get(&basket_id)
            .ok_or(BasketError::UnknownBasket { basket_id })
    }

    fn require_owner(&self, basket_id: BasketId, caller: &Address) -> Result<Address, BasketError> {
        let owner = self
            .book
            .owner_of(basket_id)
            .map_err(|_| BasketError::UnknownBasket { basket_id })?;
        if owner != caller {
            warn!(%basket_id, %caller, "caller does not own basket");
            return Err(BasketError::NotOwner {
                basket_id,
                caller: caller.clone(),
            });
        }
        Ok(owner.clone())
    }
}

impl NonFungibleLedger for BasketRegistry {
    fn contract_address(&self) -> &Address {
        &self.address
    }

    fn owner_of(&self, token_id: BasketId) -> Result<Address, NftError> {
        self.book.owner_of(token_id).cloned()
    }

    fn get_approved(&self, token_id: BasketId) -> Result<Option<Address>, NftError> {
        Ok(self.book.get_approved(token_id)?.cloned())
    }

    fn is_approved_for_all(&self, owner: &Address, operator: &Address) -> bool {
        self.book.is_approved_for_all(owner, operator)
    }

    fn approve(
        &mut self,
        caller: &Address,
        approved: Option<Address>,
        token_id: BasketId,
    ) -> Result<(), NftError> {
        let owner = self.book.approve(caller, approved.clone(), token_id)?;
        debug!(basket_id = %token_id, %owner, "approval updated");
        self.events.push(ContractEvent::Approval(Approval {
            basket_id: token_id,
            owner,
            approved,
        }));
        Ok(())
    }

    fn set_approval_for_all(
        &mut self,
        caller: &Address,
        operator: &Address,
        approved: bool,
    ) -> Result<(), NftError> {
        self.book.set_approval_for_all(caller, operator, approved)?;
        self.events
            .push(ContractEvent::ApprovalForAll(ApprovalForAll {
                owner: caller.clone(),
                operator: operator.clone(),
                approved,
            }));
        Ok(())
    }

    fn transfer_from(
        &mut self,
        caller: &Address,
        from: &Address,
        to: &Address,
        token_id: BasketId,
    ) -> Result<(), NftError> {
        let locked = self
            .baskets
            .get(&token_id)
            .map(|b| b.locked_for_sale)
            .ok_or(NftError::UnknownToken { token_id })?;
        if locked {
            warn!(basket_id = %token_id, %caller, "transfer of locked basket rejected");
            return Err(NftError::Locked { token_id });
        }
        self.book.transfer_from(caller, from, to, token_id)?;
        self.record_transfer(from, to, token_id);
        Ok(())
    }
}
