//! Contract events
//!
//! Events are immutable records emitted by contract operations. Each
//! component keeps an append-only log that observers read or drain.

use serde::{Deserialize, Serialize};
use types::ids::{Address, BasketId, ContractId, Hashlock, TokenId};
use types::numeric::{Amount, Timestamp};

use crate::basket::Constituent;

/// Basket minted by `wrap` (non-fungible mint notification).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasketMinted {
    pub basket_id: BasketId,
    pub owner: Address,
    pub constituents: Vec<Constituent>,
}

/// Basket burned by `unwrap`, constituents returned to `owner`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasketBurned {
    pub basket_id: BasketId,
    pub owner: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasketTransferred {
    pub basket_id: BasketId,
    pub from: Address,
    pub to: Address,
}

/// Single-token approval set or cleared (`approved: None`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    pub basket_id: BasketId,
    pub owner: Address,
    pub approved: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalForAll {
    pub owner: Address,
    pub operator: Address,
    pub approved: bool,
}

/// Admin changed the eligibility of a fungible asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowListUpdated {
    pub asset: Address,
    pub eligible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreated {
    pub basket_id: BasketId,
    pub seller: Address,
    pub ask_price: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFilled {
    pub basket_id: BasketId,
    pub seller: Address,
    pub buyer: Address,
    pub paid: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCancelled {
    pub basket_id: BasketId,
    pub seller: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceUpdated {
    pub basket_id: BasketId,
    pub old_price: Amount,
    pub new_price: Amount,
}

/// New HTLC registered; carries the id counterparties need to reference it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapCreated {
    pub contract_id: ContractId,
    pub sender: Address,
    pub receiver: Address,
    pub token_contract: Address,
    pub token_id: TokenId,
    pub hashlock: Hashlock,
    pub timelock: Timestamp,
}

/// HTLC claimed by the receiver; the preimage is public from here on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapWithdrawn {
    pub contract_id: ContractId,
    pub receiver: Address,
    pub preimage: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRefunded {
    pub contract_id: ContractId,
    pub sender: Address,
}

/// Enum wrapper for all contract events, enabling uniform handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractEvent {
    BasketMinted(BasketMinted),
    BasketBurned(BasketBurned),
    BasketTransferred(BasketTransferred),
    Approval(Approval),
    ApprovalForAll(ApprovalForAll),
    AllowListUpdated(AllowListUpdated),
    OrderCreated(OrderCreated),
    OrderFilled(OrderFilled),
    OrderCancelled(OrderCancelled),
    PriceUpdated(PriceUpdated),
    SwapCreated(SwapCreated),
    SwapWithdrawn(SwapWithdrawn),
    SwapRefunded(SwapRefunded),
}
