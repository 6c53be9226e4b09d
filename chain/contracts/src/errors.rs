//! Contract-specific error types
//!
//! One error enum per component, nesting lower layers through `#[from]`.
//! Every variant maps onto a single [`ErrorKind`] so callers can branch on
//! the failure class without matching component-specific detail.

use thiserror::Error;
use types::ids::{Address, BasketId, ContractId, TokenId};
use types::numeric::{Amount, Timestamp};

/// Externally observable failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidAsset,
    InvalidAmount,
    NotOwner,
    AlreadyListed,
    NotListed,
    InsufficientPayment,
    LockedAsset,
    UnknownEntity,
    SwapExpired,
    SwapNotExpired,
    WrongPreimage,
    AlreadySettled,
    ContractExists,
    InvalidTimelock,
    InvalidRecipient,
    Unauthorized,
    Reentrancy,
    Overflow,
    Custody,
    InvalidConfig,
}

/// Fungible custody failures raised by an [`AssetCustody`](crate::custody::AssetCustody).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CustodyError {
    #[error("Insufficient balance for {asset}: required {required}, available {available}")]
    InsufficientBalance {
        asset: Address,
        required: Amount,
        available: Amount,
    },

    #[error("Insufficient allowance for {asset}: {spender} may pull {available} from {owner}, required {required}")]
    InsufficientAllowance {
        asset: Address,
        owner: Address,
        spender: Address,
        required: Amount,
        available: Amount,
    },

    #[error("Transfer amount must be positive")]
    InvalidAmount,

    #[error("Arithmetic overflow in balance calculation")]
    Overflow,

    #[error("Token rejected transfer: {reason}")]
    Rejected { reason: String },
}

/// Non-fungible ownership and approval failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NftError {
    #[error("Token does not exist: {token_id}")]
    UnknownToken { token_id: TokenId },

    #[error("Caller {caller} is not owner nor approved for {token_id}")]
    NotAuthorized { caller: Address, token_id: TokenId },

    #[error("Transfer from incorrect owner: {from} does not own {token_id}")]
    WrongOwner { from: Address, token_id: TokenId },

    #[error("Cannot transfer locked {token_id}")]
    Locked { token_id: TokenId },

    #[error("Invalid recipient: {recipient}")]
    InvalidRecipient { recipient: Address },

    #[error("Token already minted: {token_id}")]
    AlreadyMinted { token_id: TokenId },
}

/// Basket wrapping errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BasketError {
    #[error("No price feed available for {asset}")]
    AssetNotListed { asset: Address },

    #[error("Duplicate asset in basket: {asset}")]
    DuplicateAsset { asset: Address },

    #[error("Basket must contain at least one asset")]
    EmptyBasket,

    #[error("Amount for {asset} must be positive, got {amount}")]
    InvalidAmount { asset: Address, amount: Amount },

    #[error("Not an owner of a basket: {caller} does not own {basket_id}")]
    NotOwner { basket_id: BasketId, caller: Address },

    #[error("Basket {basket_id} is locked")]
    Locked { basket_id: BasketId },

    #[error("Basket not found: {basket_id}")]
    UnknownBasket { basket_id: BasketId },

    #[error("Basket id space exhausted")]
    IdExhausted,

    #[error("Unauthorized: caller is not admin")]
    Unauthorized,

    #[error("Reentrancy detected")]
    Reentrancy,

    #[error("Wrap of {basket_id} could not be fully rolled back, {stranded} constituent(s) kept in the basket: {source}")]
    PartialWrap {
        basket_id: BasketId,
        stranded: usize,
        source: CustodyError,
    },

    #[error("Unwrap of {basket_id} stopped after {returned} of {total} constituents: {source}")]
    PartialUnwrap {
        basket_id: BasketId,
        returned: usize,
        total: usize,
        source: CustodyError,
    },

    #[error("Custody error: {0}")]
    Custody(#[from] CustodyError),

    #[error("Token error: {0}")]
    Nft(#[from] NftError),
}

/// Order book errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrderError {
    #[error("Not an owner of a basket: {caller} does not own {basket_id}")]
    NotOwner { basket_id: BasketId, caller: Address },

    #[error("Basket already listed: {basket_id}")]
    AlreadyListed { basket_id: BasketId },

    #[error("Basket not locked for sale: {basket_id}")]
    NotLockedForSale { basket_id: BasketId },

    #[error("Not for sale: {basket_id}")]
    NotForSale { basket_id: BasketId },

    #[error("Not enough funds transferred: required {required}, paid {paid}")]
    InsufficientPayment { required: Amount, paid: Amount },

    #[error("Invalid ask price: {reason}")]
    InvalidPrice { reason: String },

    #[error("Quote expired at {deadline}, now {now}")]
    QuoteExpired { deadline: Timestamp, now: Timestamp },

    #[error("Reentrancy detected")]
    Reentrancy,

    #[error("Basket error: {0}")]
    Basket(#[from] BasketError),

    #[error("Token error: {0}")]
    Nft(#[from] NftError),

    #[error("Custody error: {0}")]
    Custody(#[from] CustodyError),
}

/// HTLC swap errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SwapError {
    #[error("Timelock time must be in the future: timelock {timelock}, now {now}")]
    InvalidTimelock { timelock: Timestamp, now: Timestamp },

    #[error("Contract already exists: {contract_id}")]
    ContractExists { contract_id: ContractId },

    #[error("Contract does not exist: {contract_id}")]
    UnknownContract { contract_id: ContractId },

    #[error("Already withdrawn: {contract_id}")]
    AlreadyWithdrawn { contract_id: ContractId },

    #[error("Already refunded: {contract_id}")]
    AlreadyRefunded { contract_id: ContractId },

    #[error("Withdrawable: not receiver ({caller})")]
    NotReceiver { caller: Address },

    #[error("Refundable: not sender ({caller})")]
    NotSender { caller: Address },

    #[error("Sender {caller} is not owner nor approved for {token_id}")]
    NotTokenOwner { caller: Address, token_id: TokenId },

    #[error("Registry {registry} must be approved for {token_id}")]
    RegistryNotApproved { registry: Address, token_id: TokenId },

    #[error("Withdrawable: timelock time must be in the future (timelock {timelock}, now {now})")]
    Expired { timelock: Timestamp, now: Timestamp },

    #[error("Refundable: timelock not yet passed (timelock {timelock}, now {now})")]
    NotExpired { timelock: Timestamp, now: Timestamp },

    #[error("Hashlock hash does not match")]
    WrongPreimage,

    #[error("Token contract mismatch: swap holds {expected}, got {actual}")]
    TokenContractMismatch { expected: Address, actual: Address },

    #[error("Reentrancy detected")]
    Reentrancy,

    #[error("Token error: {0}")]
    Nft(#[from] NftError),
}

/// Configuration loading errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl CustodyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAmount => ErrorKind::InvalidAmount,
            Self::Overflow => ErrorKind::Overflow,
            Self::InsufficientBalance { .. }
            | Self::InsufficientAllowance { .. }
            | Self::Rejected { .. } => ErrorKind::Custody,
        }
    }
}

impl NftError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownToken { .. } => ErrorKind::UnknownEntity,
            Self::NotAuthorized { .. } | Self::WrongOwner { .. } => ErrorKind::NotOwner,
            Self::Locked { .. } => ErrorKind::LockedAsset,
            Self::InvalidRecipient { .. } => ErrorKind::InvalidRecipient,
            Self::AlreadyMinted { .. } => ErrorKind::InvalidAsset,
        }
    }
}

impl BasketError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AssetNotListed { .. } | Self::DuplicateAsset { .. } => ErrorKind::InvalidAsset,
            Self::EmptyBasket | Self::InvalidAmount { .. } => ErrorKind::InvalidAmount,
            Self::NotOwner { .. } => ErrorKind::NotOwner,
            Self::Locked { .. } => ErrorKind::LockedAsset,
            Self::UnknownBasket { .. } => ErrorKind::UnknownEntity,
            Self::IdExhausted => ErrorKind::Overflow,
            Self::Unauthorized => ErrorKind::Unauthorized,
            Self::Reentrancy => ErrorKind::Reentrancy,
            Self::PartialWrap { source, .. } | Self::PartialUnwrap { source, .. } => source.kind(),
            Self::Custody(e) => e.kind(),
            Self::Nft(e) => e.kind(),
        }
    }
}

impl OrderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotOwner { .. } => ErrorKind::NotOwner,
            Self::AlreadyListed { .. } => ErrorKind::AlreadyListed,
            Self::NotLockedForSale { .. } | Self::NotForSale { .. } => ErrorKind::NotListed,
            Self::InsufficientPayment { .. } => ErrorKind::InsufficientPayment,
            Self::InvalidPrice { .. } | Self::QuoteExpired { .. } => ErrorKind::InvalidAmount,
            Self::Reentrancy => ErrorKind::Reentrancy,
            Self::Basket(e) => e.kind(),
            Self::Nft(e) => e.kind(),
            Self::Custody(e) => e.kind(),
        }
    }
}

impl SwapError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidTimelock { .. } => ErrorKind::InvalidTimelock,
            Self::ContractExists { .. } => ErrorKind::ContractExists,
            Self::UnknownContract { .. } | Self::TokenContractMismatch { .. } => {
                ErrorKind::UnknownEntity
            }
            Self::AlreadyWithdrawn { .. } | Self::AlreadyRefunded { .. } => {
                ErrorKind::AlreadySettled
            }
            Self::NotReceiver { .. }
            | Self::NotSender { .. }
            | Self::NotTokenOwner { .. }
            | Self::RegistryNotApproved { .. } => ErrorKind::NotOwner,
            Self::Expired { .. } => ErrorKind::SwapExpired,
            Self::NotExpired { .. } => ErrorKind::SwapNotExpired,
            Self::WrongPreimage => ErrorKind::WrongPreimage,
            Self::Reentrancy => ErrorKind::Reentrancy,
            Self::Nft(e) => e.kind(),
        }
    }
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidConfig
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basket_error_display() {
        let err = BasketError::AssetNotListed {
            asset: Address::new("SHIB"),
        };
        assert_eq!(err.to_string(), "No price feed available for SHIB");
    }

    #[test]
    fn test_locked_transfer_message() {
        let err = NftError::Locked {
            token_id: TokenId::new(3),
        };
        assert_eq!(err.to_string(), "Cannot transfer locked #3");
        assert_eq!(err.kind(), ErrorKind::LockedAsset);
    }

    #[test]
    fn test_order_error_from_basket_keeps_kind() {
        let err: OrderError = BasketError::UnknownBasket {
            basket_id: BasketId::new(9),
        }
        .into();
        assert!(matches!(err, OrderError::Basket(_)));
        assert_eq!(err.kind(), ErrorKind::UnknownEntity);
    }

    #[test]
    fn test_not_locked_and_not_for_sale_share_kind() {
        let id = BasketId::new(1);
        assert_eq!(
            OrderError::NotLockedForSale { basket_id: id }.kind(),
            OrderError::NotForSale { basket_id: id }.kind()
        );
    }

    #[test]
    fn test_swap_settled_kinds() {
        let contract_id = ContractId::from_bytes([0u8; 32]);
        assert_eq!(
            SwapError::AlreadyWithdrawn { contract_id }.kind(),
            ErrorKind::AlreadySettled
        );
        assert_eq!(
            SwapError::AlreadyRefunded { contract_id }.kind(),
            ErrorKind::AlreadySettled
        );
    }

    #[test]
    fn test_insufficient_payment_display() {
        let err = OrderError::InsufficientPayment {
            required: Amount::from(5),
            paid: Amount::from(1),
        };
        assert!(err.to_string().starts_with("Not enough funds transferred"));
    }

    #[test]
    fn test_partial_unwrap_reports_progress() {
        let err = BasketError::PartialUnwrap {
            basket_id: BasketId::new(4),
            returned: 1,
            total: 3,
            source: CustodyError::Rejected {
                reason: "paused".into(),
            },
        };
        assert_eq!(
            err.to_string(),
            "Unwrap of #4 stopped after 1 of 3 constituents: Token rejected transfer: paused"
        );
        assert_eq!(err.kind(), ErrorKind::Custody);
    }

    #[test]
    fn test_nested_custody_kind() {
        let err: BasketError = CustodyError::Overflow.into();
        assert_eq!(err.kind(), ErrorKind::Overflow);
    }
}
