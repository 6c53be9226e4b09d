//! Non-fungible ownership and approval
//!
//! [`NonFungibleLedger`] is the one ownership capability shared by the
//! basket registry, the order book and the HTLC registry. [`OwnershipBook`]
//! holds the bookkeeping behind it (owners, per-token approvals, operator
//! approvals, per-owner counts) so every implementor applies the same
//! authorization rules. [`NftCollection`] is a plain collection built on it,
//! for swapping tokens that are not baskets.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::debug;
use types::ids::{Address, TokenId};

use crate::errors::NftError;

/// ERC-721 style ownership capability.
pub trait NonFungibleLedger {
    /// Address of the token contract, recorded by escrows that hold its tokens.
    fn contract_address(&self) -> &Address;

    fn owner_of(&self, token_id: TokenId) -> Result<Address, NftError>;

    fn get_approved(&self, token_id: TokenId) -> Result<Option<Address>, NftError>;

    fn is_approved_for_all(&self, owner: &Address, operator: &Address) -> bool;

    /// Approve `approved` (or clear with `None`) to move `token_id`.
    /// Owner or operator only.
    fn approve(
        &mut self,
        caller: &Address,
        approved: Option<Address>,
        token_id: TokenId,
    ) -> Result<(), NftError>;

    fn set_approval_for_all(
        &mut self,
        caller: &Address,
        operator: &Address,
        approved: bool,
    ) -> Result<(), NftError>;

    /// Move `token_id` from `from` to `to` on behalf of `caller`.
    fn transfer_from(
        &mut self,
        caller: &Address,
        from: &Address,
        to: &Address,
        token_id: TokenId,
    ) -> Result<(), NftError>;

    /// Owner, approved address or operator of the owner.
    fn is_approved_or_owner(&self, spender: &Address, token_id: TokenId) -> Result<bool, NftError> {
        let owner = self.owner_of(token_id)?;
        if owner == *spender || self.is_approved_for_all(&owner, spender) {
            return Ok(true);
        }
        Ok(self.get_approved(token_id)?.as_ref() == Some(spender))
    }
}

/// Owner and approval bookkeeping for one token contract.
#[derive(Debug, Default, Clone)]
pub struct OwnershipBook {
    owners: HashMap<TokenId, Address>,
    approvals: HashMap<TokenId, Address>,
    operators: HashSet<(Address, Address)>,
    holdings: HashMap<Address, BTreeSet<TokenId>>,
}

impl OwnershipBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exists(&self, token_id: TokenId) -> bool {
        self.owners.contains_key(&token_id)
    }

    pub fn owner_of(&self, token_id: TokenId) -> Result<&Address, NftError> {
        self.owners
            .get(&token_id)
            .ok_or(NftError::UnknownToken { token_id })
    }

    pub fn get_approved(&self, token_id: TokenId) -> Result<Option<&Address>, NftError> {
        self.owner_of(token_id)?;
        Ok(self.approvals.get(&token_id))
    }

    pub fn is_approved_for_all(&self, owner: &Address, operator: &Address) -> bool {
        self.operators.contains(&(owner.clone(), operator.clone()))
    }

    /// Number of tokens held by `owner`.
    pub fn balance_of(&self, owner: &Address) -> usize {
        self.holdings.get(owner).map_or(0, BTreeSet::len)
    }

    /// Tokens held by `owner`, ascending.
    pub fn tokens_of(&self, owner: &Address) -> Vec<TokenId> {
        self.holdings
            .get(owner)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Record a new token. Fails if the id is already live.
    pub fn mint(&mut self, to: &Address, token_id: TokenId) -> Result<(), NftError> {
        if self.exists(token_id) {
            return Err(NftError::AlreadyMinted { token_id });
        }
        self.owners.insert(token_id, to.clone());
        self.holdings.entry(to.clone()).or_default().insert(token_id);
        Ok(())
    }

    /// Remove a token, its approval and its holding entry. Returns the last owner.
    pub fn burn(&mut self, token_id: TokenId) -> Result<Address, NftError> {
        let owner = self
            .owners
            .remove(&token_id)
            .ok_or(NftError::UnknownToken { token_id })?;
        self.approvals.remove(&token_id);
        self.remove_holding(&owner, token_id);
        Ok(owner)
    }

    /// Approval rules: only the owner or an operator of the owner may approve,
    /// and the owner cannot be its own approved address.
    pub fn approve(
        &mut self,
        caller: &Address,
        approved: Option<Address>,
        token_id: TokenId,
    ) -> Result<Address, NftError> {
        let owner = self.owner_of(token_id)?.clone();
        if *caller != owner && !self.is_approved_for_all(&owner, caller) {
            return Err(NftError::NotAuthorized {
                caller: caller.clone(),
                token_id,
            });
        }
        match approved {
            Some(spender) if spender == owner => {
                return Err(NftError::InvalidRecipient { recipient: spender });
            }
            Some(spender) => {
                self.approvals.insert(token_id, spender);
            }
            None => {
                self.approvals.remove(&token_id);
            }
        }
        Ok(owner)
    }

    pub fn set_approval_for_all(
        &mut self,
        owner: &Address,
        operator: &Address,
        approved: bool,
    ) -> Result<(), NftError> {
        if owner == operator {
            return Err(NftError::InvalidRecipient {
                recipient: operator.clone(),
            });
        }
        let key = (owner.clone(), operator.clone());
        if approved {
            self.operators.insert(key);
        } else {
            self.operators.remove(&key);
        }
        Ok(())
    }

    /// Check authorization, then move the token and clear its approval.
    pub fn transfer_from(
        &mut self,
        caller: &Address,
        from: &Address,
        to: &Address,
        token_id: TokenId,
    ) -> Result<(), NftError> {
        self.check_transfer(caller, from, token_id)?;
        self.move_token(from, to, token_id);
        Ok(())
    }

    /// Authorization half of `transfer_from`, without mutation.
    pub fn check_transfer(
        &self,
        caller: &Address,
        from: &Address,
        token_id: TokenId,
    ) -> Result<(), NftError> {
        let owner = self.owner_of(token_id)?;
        if owner != from {
            return Err(NftError::WrongOwner {
                from: from.clone(),
                token_id,
            });
        }
        let authorized = caller == owner
            || self.is_approved_for_all(owner, caller)
            || self.approvals.get(&token_id) == Some(caller);
        if !authorized {
            return Err(NftError::NotAuthorized {
                caller: caller.clone(),
                token_id,
            });
        }
        Ok(())
    }

    /// Unchecked move. Callers must have run `check_transfer` or hold an
    /// equivalent authorization of their own.
    pub(crate) fn move_token(&mut self, from: &Address, to: &Address, token_id: TokenId) {
        self.approvals.remove(&token_id);
        self.remove_holding(from, token_id);
        self.owners.insert(token_id, to.clone());
        self.holdings.entry(to.clone()).or_default().insert(token_id);
        debug!(%token_id, %from, %to, "token moved");
    }

    fn remove_holding(&mut self, owner: &Address, token_id: TokenId) {
        if let Some(ids) = self.holdings.get_mut(owner) {
            ids.remove(&token_id);
            if ids.is_empty() {
                self.holdings.remove(owner);
            }
        }
    }
}

/// Plain non-fungible collection with open minting.
#[derive(Debug)]
pub struct NftCollection {
    address: Address,
    book: OwnershipBook,
}

impl NftCollection {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            book: OwnershipBook::new(),
        }
    }

    pub fn mint(&mut self, to: &Address, token_id: TokenId) -> Result<(), NftError> {
        self.book.mint(to, token_id)
    }

    pub fn balance_of(&self, owner: &Address) -> usize {
        self.book.balance_of(owner)
    }
}

impl NonFungibleLedger for NftCollection {
    fn contract_address(&self) -> &Address {
        &self.address
    }

    fn owner_of(&self, token_id: TokenId) -> Result<Address, NftError> {
        self.book.owner_of(token_id).cloned()
    }

    fn get_approved(&self, token_id: TokenId) -> Result<Option<Address>, NftError> {
        Ok(self.book.get_approved(token_id)?.cloned())
    }

    fn is_approved_for_all(&self, owner: &Address, operator: &Address) -> bool {
        self.book.is_approved_for_all(owner, operator)
    }

    fn approve(
        &mut self,
        caller: &Address,
        approved: Option<Address>,
        token_id: TokenId,
    ) -> Result<(), NftError> {
        self.book.approve(caller, approved, token_id).map(|_| ())
    }

    fn set_approval_for_all(
        &mut self,
        caller: &Address,
        operator: &Address,
        approved: bool,
    ) -> Result<(), NftError> {
        self.book.set_approval_for_all(caller, operator, approved)
    }

    fn transfer_from(
        &mut self,
        caller: &Address,
        from: &Address,
        to: &Address,
        token_id: TokenId,
    ) -> Result<(), NftError> {
        self.book.transfer_from(caller, from, to, token_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        Address::new(s)
    }

    fn setup() -> NftCollection {
        let mut nft = NftCollection::new(addr("punks"));
        nft.mint(&addr("alice"), TokenId::new(7)).unwrap();
        nft
    }

    #[test]
    fn test_mint_and_owner() {
        let nft = setup();
        assert_eq!(nft.owner_of(TokenId::new(7)).unwrap(), addr("alice"));
        assert_eq!(nft.balance_of(&addr("alice")), 1);
        assert!(matches!(
            nft.owner_of(TokenId::new(8)),
            Err(NftError::UnknownToken { .. })
        ));
    }

    #[test]
    fn test_mint_duplicate_rejected() {
        let mut nft = setup();
        assert_eq!(
            nft.mint(&addr("bob"), TokenId::new(7)),
            Err(NftError::AlreadyMinted {
                token_id: TokenId::new(7)
            })
        );
        assert_eq!(nft.owner_of(TokenId::new(7)).unwrap(), addr("alice"));
    }

    #[test]
    fn test_owner_transfer_clears_approval() {
        let mut nft = setup();
        let id = TokenId::new(7);
        nft.approve(&addr("alice"), Some(addr("carol")), id).unwrap();
        nft.transfer_from(&addr("alice"), &addr("alice"), &addr("bob"), id)
            .unwrap();
        assert_eq!(nft.owner_of(id).unwrap(), addr("bob"));
        assert_eq!(nft.get_approved(id).unwrap(), None);
        assert_eq!(nft.balance_of(&addr("alice")), 0);
    }

    #[test]
    fn test_approved_spender_can_transfer() {
        let mut nft = setup();
        let id = TokenId::new(7);
        nft.approve(&addr("alice"), Some(addr("bob")), id).unwrap();
        nft.transfer_from(&addr("bob"), &addr("alice"), &addr("bob"), id)
            .unwrap();
        assert_eq!(nft.owner_of(id).unwrap(), addr("bob"));
    }

    #[test]
    fn test_operator_can_transfer_and_approve() {
        let mut nft = setup();
        let id = TokenId::new(7);
        nft.set_approval_for_all(&addr("alice"), &addr("op"), true)
            .unwrap();
        nft.approve(&addr("op"), Some(addr("bob")), id).unwrap();
        nft.transfer_from(&addr("op"), &addr("alice"), &addr("carol"), id)
            .unwrap();
        assert_eq!(nft.owner_of(id).unwrap(), addr("carol"));
    }

    #[test]
    fn test_stranger_cannot_transfer() {
        let mut nft = setup();
        let result = nft.transfer_from(
            &addr("eve"),
            &addr("alice"),
            &addr("eve"),
            TokenId::new(7),
        );
        assert!(matches!(result, Err(NftError::NotAuthorized { .. })));
    }

    #[test]
    fn test_wrong_from_rejected() {
        let mut nft = setup();
        let result = nft.transfer_from(
            &addr("alice"),
            &addr("bob"),
            &addr("carol"),
            TokenId::new(7),
        );
        assert!(matches!(result, Err(NftError::WrongOwner { .. })));
    }

    #[test]
    fn test_cannot_approve_owner() {
        let mut nft = setup();
        let result = nft.approve(&addr("alice"), Some(addr("alice")), TokenId::new(7));
        assert!(matches!(result, Err(NftError::InvalidRecipient { .. })));
    }

    #[test]
    fn test_is_approved_or_owner() {
        let mut nft = setup();
        let id = TokenId::new(7);
        assert!(nft.is_approved_or_owner(&addr("alice"), id).unwrap());
        assert!(!nft.is_approved_or_owner(&addr("bob"), id).unwrap());
        nft.approve(&addr("alice"), Some(addr("bob")), id).unwrap();
        assert!(nft.is_approved_or_owner(&addr("bob"), id).unwrap());
    }

    #[test]
    fn test_burn_removes_everything() {
        let mut book = OwnershipBook::new();
        let id = TokenId::new(1);
        book.mint(&addr("alice"), id).unwrap();
        book.approve(&addr("alice"), Some(addr("bob")), id).unwrap();
        assert_eq!(book.burn(id).unwrap(), addr("alice"));
        assert!(!book.exists(id));
        assert_eq!(book.balance_of(&addr("alice")), 0);
        assert!(book.get_approved(id).is_err());
        assert!(book.burn(id).is_err());
    }

    #[test]
    fn test_tokens_of_sorted() {
        let mut book = OwnershipBook::new();
        book.mint(&addr("alice"), TokenId::new(3)).unwrap();
        book.mint(&addr("alice"), TokenId::new(1)).unwrap();
        assert_eq!(
            book.tokens_of(&addr("alice")),
            vec![TokenId::new(1), TokenId::new(3)]
        );
    }
}
