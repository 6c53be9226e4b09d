//! Contract configuration
//!
//! Each component takes a plain config struct at construction. All of them
//! implement `Default`, deserialize from JSON and expose `validate()`; the
//! loaders run validation before handing the struct back.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use types::ids::Address;

use crate::errors::ConfigError;

/// Basis-point denominator (100% = 10_000 bps).
pub const BPS_DENOMINATOR: u32 = 10_000;

/// One eligible fungible asset and the price feed it was listed with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedListing {
    pub asset: Address,
    pub feed: Address,
}

/// Fungible assets eligible for wrapping, keyed by asset address.
///
/// Serialized as a list of [`FeedListing`]s. Listing the same asset twice
/// is rejected at load time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<FeedListing>", into = "Vec<FeedListing>")]
pub struct AllowList {
    feeds: BTreeMap<Address, Address>,
}

impl AllowList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from parallel token and feed lists, as deployed.
    pub fn from_pairs(
        assets: Vec<Address>,
        feeds: Vec<Address>,
    ) -> Result<Self, ConfigError> {
        if assets.len() != feeds.len() {
            return Err(ConfigError::Invalid(format!(
                "{} assets but {} feeds",
                assets.len(),
                feeds.len()
            )));
        }
        let listings = assets
            .into_iter()
            .zip(feeds)
            .map(|(asset, feed)| FeedListing { asset, feed })
            .collect::<Vec<_>>();
        Self::try_from(listings)
    }

    pub fn contains(&self, asset: &Address) -> bool {
        self.feeds.contains_key(asset)
    }

    pub fn feed_for(&self, asset: &Address) -> Option<&Address> {
        self.feeds.get(asset)
    }

    /// Insert or replace the feed for `asset`. Returns the previous feed.
    pub fn insert(&mut self, asset: Address, feed: Address) -> Option<Address> {
        self.feeds.insert(asset, feed)
    }

    pub fn remove(&mut self, asset: &Address) -> Option<Address> {
        self.feeds.remove(asset)
    }

    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }

    pub fn assets(&self) -> impl Iterator<Item = &Address> {
        self.feeds.keys()
    }
}

impl TryFrom<Vec<FeedListing>> for AllowList {
    type Error = ConfigError;

    fn try_from(listings: Vec<FeedListing>) -> Result<Self, Self::Error> {
        let mut feeds = BTreeMap::new();
        for FeedListing { asset, feed } in listings {
            if feeds.contains_key(&asset) {
                return Err(ConfigError::Invalid(format!("asset {asset} listed twice")));
            }
            feeds.insert(asset, feed);
        }
        Ok(Self { feeds })
    }
}

impl From<AllowList> for Vec<FeedListing> {
    fn from(list: AllowList) -> Self {
        list.feeds
            .into_iter()
            .map(|(asset, feed)| FeedListing { asset, feed })
            .collect()
    }
}

/// Basket registry configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Address of the registry itself: the basket token contract and the
    /// escrow account that holds wrapped constituents.
    pub address: Address,
    /// Initial admin for allow-list maintenance.
    pub admin: Address,
    pub allow_list: AllowList,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            address: Address::new("basket-registry"),
            admin: Address::new("admin"),
            allow_list: AllowList::new(),
        }
    }
}

impl RegistryConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.address == self.admin {
            return Err(ConfigError::Invalid(
                "registry address cannot be its own admin".into(),
            ));
        }
        if self.allow_list.contains(&self.address) {
            return Err(ConfigError::Invalid(
                "registry address cannot be an eligible asset".into(),
            ));
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        parse_validated(json, Self::validate)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        read_validated(path.as_ref(), Self::validate)
    }
}

/// Order book configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    /// Escrow account the buyer's payment passes through.
    pub address: Address,
    /// Fungible asset ask prices are denominated in.
    pub payment_asset: Address,
    /// Upper bound on the slippage a parameterised quote may request.
    pub max_slippage_bps: u32,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            address: Address::new("basket-market"),
            payment_asset: Address::new("ETH"),
            max_slippage_bps: 1_000,
        }
    }
}

impl MarketConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_slippage_bps > BPS_DENOMINATOR {
            return Err(ConfigError::Invalid(format!(
                "max_slippage_bps {} exceeds {}",
                self.max_slippage_bps, BPS_DENOMINATOR
            )));
        }
        if self.address == self.payment_asset {
            return Err(ConfigError::Invalid(
                "market address cannot be the payment asset".into(),
            ));
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        parse_validated(json, Self::validate)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        read_validated(path.as_ref(), Self::validate)
    }
}

/// HTLC registry configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HtlcConfig {
    /// Address of the registry; escrowed tokens are owned by it.
    pub address: Address,
    /// A new swap's timelock must be at least this far past `now`.
    pub min_lock_duration_ms: i64,
}

impl Default for HtlcConfig {
    fn default() -> Self {
        Self {
            address: Address::new("htlc-registry"),
            min_lock_duration_ms: 1,
        }
    }
}

impl HtlcConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_lock_duration_ms < 1 {
            return Err(ConfigError::Invalid(format!(
                "min_lock_duration_ms must be at least 1, got {}",
                self.min_lock_duration_ms
            )));
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        parse_validated(json, Self::validate)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        read_validated(path.as_ref(), Self::validate)
    }
}

fn parse_validated<T: DeserializeOwned>(
    json: &str,
    validate: impl Fn(&T) -> Result<(), ConfigError>,
) -> Result<T, ConfigError> {
    let config: T = serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
    validate(&config)?;
    Ok(config)
}

fn read_validated<T: DeserializeOwned>(
    path: &Path,
    validate: impl Fn(&T) -> Result<(), ConfigError>,
) -> Result<T, ConfigError> {
    let json = fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    parse_validated(&json, validate)
}
