//! Contract logic for basket wrapping, basket trading and NFT swaps
//!
//! This crate implements the contract layer: a basket registry that escrows
//! fungible tokens behind a non-fungible claim ticket, an order book for
//! those tickets, and a hashed-timelock registry for atomic swaps of any
//! non-fungible token.
//!
//! # Modules
//! - `events`: Contract events emitted by every state transition
//! - `errors`: Contract-specific error types and the shared error kinds
//! - `security`: Reentrancy guard and admin access control
//! - `config`: Component configuration and the asset allow-list
//! - `clock`: Time source for timelocks and quote deadlines
//! - `custody`: Fungible custody capability and the in-memory token ledger
//! - `nft`: Non-fungible ownership capability and bookkeeping
//! - `basket`: Wrap/unwrap and basket ownership
//! - `order_book`: Listing, pricing and atomic fills
//! - `htlc`: Hashlock/timelock escrow for token swaps
//!
//! # Version
//! v0.1.0

pub mod basket;
pub mod clock;
pub mod config;
pub mod custody;
pub mod errors;
pub mod events;
pub mod htlc;
pub mod nft;
pub mod order_book;
pub mod security;

/// Contract ABI version, frozen after release
pub const CONTRACT_ABI_VERSION: &str = "1.0.0";
