//! Hashed-timelock contracts for non-fungible tokens
//!
//! A sender escrows one token with the registry under a SHA-256 hashlock and
//! an absolute timelock. Before the timelock the receiver may claim it by
//! revealing the preimage; from the timelock on the sender may take it back.
//! Exactly one of the two ever happens.
//!
//! Two such contracts locked under the same hashlock, in opposite
//! directions, form an atomic swap: the first claim publishes the secret,
//! which the other party reads from [`HtlcRegistry::get_contract`] to claim
//! the second leg. Giving the leg claimed second the longer timelock is up
//! to the participants.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};
use types::ids::{Address, ContractId, Hashlock, TokenId};
use types::numeric::Timestamp;

use crate::clock::{Clock, SystemClock};
use crate::config::HtlcConfig;
use crate::errors::{ConfigError, SwapError};
use crate::events::{ContractEvent, SwapCreated, SwapRefunded, SwapWithdrawn};
use crate::nft::NonFungibleLedger;
use crate::security::ReentrancyGuard;

/// One registered swap leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapContract {
    pub contract_id: ContractId,
    pub sender: Address,
    pub receiver: Address,
    pub token_contract: Address,
    pub token_id: TokenId,
    pub hashlock: Hashlock,
    /// Unix milliseconds. Withdraw strictly before, refund at or after.
    pub timelock: Timestamp,
    pub withdrawn: bool,
    pub refunded: bool,
    /// Empty until a successful withdraw.
    pub preimage: Vec<u8>,
}

impl SwapContract {
    pub fn is_settled(&self) -> bool {
        self.withdrawn || self.refunded
    }
}

/// SHA-256 hashlock of `secret`.
pub fn hashlock_for(secret: &[u8]) -> Hashlock {
    Hashlock::from_bytes(Sha256::digest(secret).into())
}

/// Deterministic id of the swap described by the arguments.
///
/// Variable-length fields are length-prefixed so distinct inputs never
/// share an encoding.
pub fn contract_id_for(
    sender: &Address,
    receiver: &Address,
    token_contract: &Address,
    token_id: TokenId,
    hashlock: &Hashlock,
    timelock: Timestamp,
) -> ContractId {
    let mut hasher = Sha256::new();
    for field in [sender, receiver, token_contract] {
        let bytes = field.as_str().as_bytes();
        hasher.update((bytes.len() as u64).to_be_bytes());
        hasher.update(bytes);
    }
    hasher.update(token_id.value().to_be_bytes());
    hasher.update(hashlock.as_bytes());
    hasher.update(timelock.to_be_bytes());
    ContractId::from_bytes(hasher.finalize().into())
}

/// Registry of swap legs. Escrowed tokens are owned by the registry address.
#[derive(Debug)]
pub struct HtlcRegistry<C: Clock = SystemClock> {
    address: Address,
    min_lock_duration_ms: i64,
    clock: C,
    contracts: HashMap<ContractId, SwapContract>,
    reentrancy_guard: ReentrancyGuard,
    events: Vec<ContractEvent>,
}

impl<C: Clock> HtlcRegistry<C> {
    pub fn new(config: HtlcConfig, clock: C) -> Result<Self, ConfigError> {
        config.validate()?;
        info!(address = %config.address, "HtlcRegistry initialized");
        Ok(Self {
            address: config.address,
            min_lock_duration_ms: config.min_lock_duration_ms,
            clock,
            contracts: HashMap::new(),
            reentrancy_guard: ReentrancyGuard::new(),
            events: Vec::new(),
        })
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Lock `token_id` of `nft` for `receiver` under `hashlock` until
    /// `timelock`.
    ///
    /// The caller must own or be approved for the token, and the owner must
    /// have approved this registry to move it.
    pub fn new_contract(
        &mut self,
        nft: &mut impl NonFungibleLedger,
        receiver: Address,
        hashlock: Hashlock,
        timelock: Timestamp,
        token_id: TokenId,
        caller: &Address,
    ) -> Result<ContractId, SwapError> {
        if let Err(active) = self.reentrancy_guard.enter("new_contract") {
            warn!(%token_id, %caller, active, "new_contract rejected: reentrant call");
            return Err(SwapError::Reentrancy);
        }
        let result = self.new_contract_inner(nft, receiver, hashlock, timelock, token_id, caller);
        self.reentrancy_guard.exit();
        result
    }

    fn new_contract_inner(
        &mut self,
        nft: &mut impl NonFungibleLedger,
        receiver: Address,
        hashlock: Hashlock,
        timelock: Timestamp,
        token_id: TokenId,
        caller: &Address,
    ) -> Result<ContractId, SwapError> {
        let now = self.clock.now();
        if timelock < now.saturating_add(self.min_lock_duration_ms) {
            warn!(%caller, timelock, now, "timelock not in the future");
            return Err(SwapError::InvalidTimelock { timelock, now });
        }
        if !nft.is_approved_or_owner(caller, token_id)? {
            warn!(%caller, %token_id, "sender does not control token");
            return Err(SwapError::NotTokenOwner {
                caller: caller.clone(),
                token_id,
            });
        }
        if !nft.is_approved_or_owner(&self.address, token_id)? {
            return Err(SwapError::RegistryNotApproved {
                registry: self.address.clone(),
                token_id,
            });
        }

        let token_contract = nft.contract_address().clone();
        let contract_id =
            contract_id_for(caller, &receiver, &token_contract, token_id, &hashlock, timelock);
        if self.contracts.contains_key(&contract_id) {
            return Err(SwapError::ContractExists { contract_id });
        }

        let owner = nft.owner_of(token_id)?;
        self.contracts.insert(
            contract_id,
            SwapContract {
                contract_id,
                sender: caller.clone(),
                receiver: receiver.clone(),
                token_contract: token_contract.clone(),
                token_id,
                hashlock,
                timelock,
                withdrawn: false,
                refunded: false,
                preimage: Vec::new(),
            },
        );
        if let Err(e) = nft.transfer_from(&self.address, &owner, &self.address, token_id) {
            warn!(%contract_id, error = %e, "escrow transfer failed");
            self.contracts.remove(&contract_id);
            return Err(e.into());
        }

        info!(%contract_id, sender = %caller, %receiver, %token_id, timelock, "swap locked");
        self.events.push(ContractEvent::SwapCreated(SwapCreated {
            contract_id,
            sender: caller.clone(),
            receiver,
            token_contract,
            token_id,
            hashlock,
            timelock,
        }));
        Ok(contract_id)
    }

    /// Claim the token by revealing the preimage of its hashlock.
    pub fn withdraw(
        &mut self,
        nft: &mut impl NonFungibleLedger,
        contract_id: ContractId,
        preimage: &[u8],
        caller: &Address,
    ) -> Result<(), SwapError> {
        if let Err(active) = self.reentrancy_guard.enter("withdraw") {
            warn!(%contract_id, %caller, active, "withdraw rejected: reentrant call");
            return Err(SwapError::Reentrancy);
        }
        let result = self.withdraw_inner(nft, contract_id, preimage, caller);
        self.reentrancy_guard.exit();
        result
    }

    fn withdraw_inner(
        &mut self,
        nft: &mut impl NonFungibleLedger,
        contract_id: ContractId,
        preimage: &[u8],
        caller: &Address,
    ) -> Result<(), SwapError> {
        let now = self.clock.now();
        let contract = self.open_contract(contract_id, &*nft)?;
        if contract.receiver != *caller {
            warn!(%contract_id, %caller, "withdraw by non-receiver");
            return Err(SwapError::NotReceiver {
                caller: caller.clone(),
            });
        }
        if now >= contract.timelock {
            return Err(SwapError::Expired {
                timelock: contract.timelock,
                now,
            });
        }
        let computed = hashlock_for(preimage);
        let matches: bool = computed.as_bytes()[..]
            .ct_eq(&contract.hashlock.as_bytes()[..])
            .into();
        if !matches {
            warn!(%contract_id, "wrong preimage");
            return Err(SwapError::WrongPreimage);
        }

        let receiver = contract.receiver.clone();
        let token_id = contract.token_id;
        self.set_withdrawn(contract_id, Some(preimage));
        if let Err(e) = nft.transfer_from(&self.address, &self.address, &receiver, token_id) {
            warn!(%contract_id, error = %e, "release to receiver failed, reverting");
            self.set_withdrawn(contract_id, None);
            return Err(e.into());
        }

        info!(%contract_id, %receiver, "swap withdrawn");
        self.events.push(ContractEvent::SwapWithdrawn(SwapWithdrawn {
            contract_id,
            receiver,
            preimage: preimage.to_vec(),
        }));
        Ok(())
    }

    /// Return the token to the sender once the timelock has passed.
    pub fn refund(
        &mut self,
        nft: &mut impl NonFungibleLedger,
        contract_id: ContractId,
        caller: &Address,
    ) -> Result<(), SwapError> {
        if let Err(active) = self.reentrancy_guard.enter("refund") {
            warn!(%contract_id, %caller, active, "refund rejected: reentrant call");
            return Err(SwapError::Reentrancy);
        }
        let result = self.refund_inner(nft, contract_id, caller);
        self.reentrancy_guard.exit();
        result
    }

    fn refund_inner(
        &mut self,
        nft: &mut impl NonFungibleLedger,
        contract_id: ContractId,
        caller: &Address,
    ) -> Result<(), SwapError> {
        let now = self.clock.now();
        let contract = self.open_contract(contract_id, &*nft)?;
        if contract.sender != *caller {
            warn!(%contract_id, %caller, "refund by non-sender");
            return Err(SwapError::NotSender {
                caller: caller.clone(),
            });
        }
        if now < contract.timelock {
            return Err(SwapError::NotExpired {
                timelock: contract.timelock,
                now,
            });
        }

        let sender = contract.sender.clone();
        let token_id = contract.token_id;
        self.set_refunded(contract_id, true);
        if let Err(e) = nft.transfer_from(&self.address, &self.address, &sender, token_id) {
            warn!(%contract_id, error = %e, "return to sender failed, reverting");
            self.set_refunded(contract_id, false);
            return Err(e.into());
        }

        info!(%contract_id, %sender, "swap refunded");
        self.events.push(ContractEvent::SwapRefunded(SwapRefunded {
            contract_id,
            sender,
        }));
        Ok(())
    }

    // ───────────────────────── Queries ─────────────────────────

    pub fn get_contract(&self, contract_id: ContractId) -> Result<SwapContract, SwapError> {
        debug!(%contract_id, "get_contract");
        self.contracts
            .get(&contract_id)
            .cloned()
            .ok_or(SwapError::UnknownContract { contract_id })
    }

    pub fn have_contract(&self, contract_id: ContractId) -> bool {
        self.contracts.contains_key(&contract_id)
    }

    pub fn events(&self) -> &[ContractEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<ContractEvent> {
        std::mem::take(&mut self.events)
    }

    // ───────────────────────── Internal ─────────────────────────

    /// Existing, unsettled contract for the token contract `nft`.
    fn open_contract(
        &self,
        contract_id: ContractId,
        nft: &impl NonFungibleLedger,
    ) -> Result<&SwapContract, SwapError> {
        let contract = self
            .contracts
            .get(&contract_id)
            .ok_or(SwapError::UnknownContract { contract_id })?;
        if contract.withdrawn {
            return Err(SwapError::AlreadyWithdrawn { contract_id });
        }
        if contract.refunded {
            return Err(SwapError::AlreadyRefunded { contract_id });
        }
        if contract.token_contract != *nft.contract_address() {
            return Err(SwapError::TokenContractMismatch {
                expected: contract.token_contract.clone(),
                actual: nft.contract_address().clone(),
            });
        }
        Ok(contract)
    }

    fn set_withdrawn(&mut self, contract_id: ContractId, preimage: Option<&[u8]>) {
        if let Some(contract) = self.contracts.get_mut(&contract_id) {
            contract.withdrawn = preimage.is_some();
            contract.preimage = preimage.map(<[u8]>::to_vec).unwrap_or_default();
        }
    }

    fn set_refunded(&mut self, contract_id: ContractId, refunded: bool) {
        if let Some(contract) = self.contracts.get_mut(&contract_id) {
            contract.refunded = refunded;
        }
    }
}
