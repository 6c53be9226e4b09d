//! Identifier types for ledger entities
//!
//! Addresses are opaque account strings (externally owned accounts as well as
//! contract addresses). Token ids are integers; basket ids are the registry's
//! token ids, assigned sequentially at mint.
//! Swap contract ids and hashlocks are 32-byte SHA-256 digests rendered as
//! `0x`-prefixed hex.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ParseIdError;

/// Account or contract address on the ledger.
///
/// Deserialization goes through [`Address::try_new`], so an empty address
/// never enters through config or events.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Create an address, rejecting the empty string.
    pub fn try_new(addr: impl Into<String>) -> Result<Self, ParseIdError> {
        let s = addr.into();
        if s.trim().is_empty() {
            return Err(ParseIdError::EmptyAddress);
        }
        Ok(Self(s))
    }

    /// Address from a known account name, such as a literal default.
    /// Not validated; use [`Address::try_new`] or `parse` for external input.
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Address {
    type Error = ParseIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::try_new(s)
    }
}

impl From<Address> for String {
    fn from(addr: Address) -> Self {
        addr.0
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl FromStr for Address {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_new(s)
    }
}

/// Identifier of a non-fungible token within one token contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(u64);

/// Basket claim tickets are tokens of the basket registry.
///
/// Assigned from a strictly increasing counter starting at 1 and never
/// reused after burn.
pub type BasketId = TokenId;

impl TokenId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn value(&self) -> u64 {
        self.0
    }

    /// The id following this one, or `None` on counter exhaustion.
    pub fn next(&self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for TokenId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

macro_rules! digest_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(#[serde(with = "hex::serde")] [u8; 32]);

        impl $name {
            pub const fn from_bytes(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            pub const fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                format!("0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl From<[u8; 32]> for $name {
            fn from(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s.strip_prefix("0x").unwrap_or(s);
                let bytes = hex::decode(raw)?;
                let len = bytes.len();
                let arr: [u8; 32] = bytes
                    .try_into()
                    .map_err(|_| ParseIdError::InvalidLength { expected: 32, actual: len })?;
                Ok(Self(arr))
            }
        }
    };
}

digest_id!(
    /// Identifier of an HTLC swap contract.
    ///
    /// Derived from the full parameter tuple of the swap, so two
    /// registrations with identical parameters collide.
    ContractId
);

digest_id!(
    /// SHA-256 commitment to a swap secret.
    Hashlock
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_creation() {
        let addr = Address::new("alice");
        assert_eq!(addr.as_str(), "alice");
        assert_eq!(addr.to_string(), "alice");
    }

    #[test]
    fn test_address_try_new_empty() {
        assert_eq!(Address::try_new("  "), Err(ParseIdError::EmptyAddress));
    }

    #[test]
    fn test_address_empty_rejected_on_deserialize() {
        assert!(serde_json::from_str::<Address>("\"\"").is_err());
        assert!(serde_json::from_str::<Address>("\"  \"").is_err());
        let addr: Address = serde_json::from_str("\"bob\"").unwrap();
        assert_eq!(addr, Address::new("bob"));
    }

    #[test]
    fn test_address_parse() {
        assert_eq!("carol".parse::<Address>().unwrap().as_str(), "carol");
        assert_eq!("".parse::<Address>(), Err(ParseIdError::EmptyAddress));
    }

    #[test]
    fn test_address_serialization() {
        let addr = Address::new("0xabc");
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"0xabc\"");
    }

    #[test]
    fn test_basket_id_next() {
        let id = BasketId::new(1);
        assert_eq!(id.next(), Some(BasketId::new(2)));
        assert_eq!(BasketId::new(u64::MAX).next(), None);
        assert_eq!(id.to_string(), "#1");
    }

    #[test]
    fn test_contract_id_hex_display_and_parse() {
        let id = ContractId::from_bytes([0xab; 32]);
        let s = id.to_string();
        assert!(s.starts_with("0xabab"));
        assert_eq!(s.len(), 66);
        assert_eq!(s.parse::<ContractId>().unwrap(), id);
        // prefix optional
        assert_eq!(s[2..].parse::<ContractId>().unwrap(), id);
    }

    #[test]
    fn test_hashlock_parse_wrong_length() {
        let err = "0xdeadbeef".parse::<Hashlock>().unwrap_err();
        assert_eq!(err, ParseIdError::InvalidLength { expected: 32, actual: 4 });
    }

    #[test]
    fn test_hashlock_parse_bad_hex() {
        assert!(matches!(
            "0xzz".parse::<Hashlock>(),
            Err(ParseIdError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_hashlock_serializes_as_hex_string() {
        let h = Hashlock::from_bytes([1u8; 32]);
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, format!("\"{}\"", "01".repeat(32)));
        let back: Hashlock = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
    }
}
