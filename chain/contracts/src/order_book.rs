//! Order book for baskets
//!
//! At most one listing per basket. Listing locks the basket in the registry
//! so it cannot be transferred or unwrapped until the order is filled or
//! cancelled. Prices are denominated in the market's payment asset.
//!
//! Fill runs under a reentrancy guard in checks-effects-interactions order:
//! the order is closed and the basket moved to the buyer before the payment
//! is pulled from the buyer and forwarded to the seller. A failed payment
//! leg restores the listing, the lock and the original owner.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use types::ids::{Address, BasketId};
use types::numeric::{Amount, Timestamp};

use crate::basket::{BasketRegistry, BasketSnapshot};
use crate::clock::{Clock, SystemClock};
use crate::config::{MarketConfig, BPS_DENOMINATOR};
use crate::custody::AssetCustody;
use crate::errors::{BasketError, ConfigError, CustodyError, NftError, OrderError};
use crate::events::{ContractEvent, OrderCancelled, OrderCreated, OrderFilled, PriceUpdated};
use crate::nft::NonFungibleLedger;
use crate::security::ReentrancyGuard;

/// Seller's pricing input for a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quote {
    /// The premium is the ask.
    Fixed(Amount),
    /// A premium with the slippage the seller tolerates and the instant
    /// after which the quote may no longer be used.
    Parameterised {
        premium: Amount,
        slippage_bps: u32,
        deadline: Timestamp,
    },
}

impl Quote {
    pub fn premium(&self) -> Amount {
        match self {
            Self::Fixed(premium) | Self::Parameterised { premium, .. } => *premium,
        }
    }
}

/// Turns a quote into the ask price recorded on the order.
pub trait PricingPolicy: fmt::Debug {
    fn ask_price(
        &self,
        basket: &BasketSnapshot,
        quote: &Quote,
        now: Timestamp,
    ) -> Result<Amount, OrderError>;
}

/// Default policy: the ask is the quoted premium. Parameterised quotes
/// must be unexpired and within the market's slippage bound.
#[derive(Debug, Clone)]
pub struct PremiumPricing {
    max_slippage_bps: u32,
}

impl PremiumPricing {
    pub fn new(max_slippage_bps: u32) -> Self {
        Self { max_slippage_bps }
    }
}

impl PricingPolicy for PremiumPricing {
    fn ask_price(
        &self,
        _basket: &BasketSnapshot,
        quote: &Quote,
        now: Timestamp,
    ) -> Result<Amount, OrderError> {
        if let Quote::Parameterised {
            slippage_bps,
            deadline,
            ..
        } = quote
        {
            if *deadline <= now {
                return Err(OrderError::QuoteExpired {
                    deadline: *deadline,
                    now,
                });
            }
            if *slippage_bps > self.max_slippage_bps || *slippage_bps > BPS_DENOMINATOR {
                return Err(OrderError::InvalidPrice {
                    reason: format!(
                        "slippage {slippage_bps} bps exceeds bound {} bps",
                        self.max_slippage_bps
                    ),
                });
            }
        }
        let premium = quote.premium();
        if !premium.is_positive() {
            return Err(OrderError::InvalidPrice {
                reason: format!("ask price must be positive, got {premium}"),
            });
        }
        Ok(premium)
    }
}

/// An active listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub basket_id: BasketId,
    pub seller: Address,
    pub ask_price: Amount,
    pub quote: Quote,
    pub created_at: Timestamp,
}

/// Basket marketplace over a [`BasketRegistry`].
#[derive(Debug)]
pub struct OrderBook<C: Clock = SystemClock> {
    /// Escrow account payments pass through.
    address: Address,
    payment_asset: Address,
    policy: Box<dyn PricingPolicy>,
    clock: C,
    orders: HashMap<BasketId, Order>,
    reentrancy_guard: ReentrancyGuard,
    events: Vec<ContractEvent>,
}

impl<C: Clock> OrderBook<C> {
    /// Order book with [`PremiumPricing`] bounded by the configured slippage.
    pub fn new(config: MarketConfig, clock: C) -> Result<Self, ConfigError> {
        let policy = PremiumPricing::new(config.max_slippage_bps);
        Self::with_policy(config, clock, Box::new(policy))
    }

    pub fn with_policy(
        config: MarketConfig,
        clock: C,
        policy: Box<dyn PricingPolicy>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        info!(
            address = %config.address,
            payment_asset = %config.payment_asset,
            ?policy,
            "OrderBook initialized"
        );
        Ok(Self {
            address: config.address,
            payment_asset: config.payment_asset,
            policy,
            clock,
            orders: HashMap::new(),
            reentrancy_guard: ReentrancyGuard::new(),
            events: Vec::new(),
        })
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn payment_asset(&self) -> &Address {
        &self.payment_asset
    }

    // ───────────────────────── Listing ─────────────────────────

    /// List `basket_id` for sale and lock it. Returns the ask price.
    pub fn create_order(
        &mut self,
        registry: &mut BasketRegistry,
        basket_id: BasketId,
        quote: Quote,
        caller: &Address,
    ) -> Result<Amount, OrderError> {
        self.require_owner(registry, basket_id, caller)?;
        if self.orders.contains_key(&basket_id) || registry.is_locked(basket_id)? {
            warn!(%basket_id, %caller, "basket already listed");
            return Err(OrderError::AlreadyListed { basket_id });
        }

        let now = self.clock.now();
        let snapshot = registry.wrapped_balance(basket_id)?;
        let ask_price = self.quote_ask(&snapshot, &quote, now)?;

        registry.set_locked(basket_id, true)?;
        self.orders.insert(
            basket_id,
            Order {
                basket_id,
                seller: caller.clone(),
                ask_price,
                quote,
                created_at: now,
            },
        );

        info!(%basket_id, seller = %caller, %ask_price, "order created");
        self.events.push(ContractEvent::OrderCreated(OrderCreated {
            basket_id,
            seller: caller.clone(),
            ask_price,
        }));
        Ok(ask_price)
    }

    /// Withdraw the listing and unlock the basket.
    pub fn cancel_order(
        &mut self,
        registry: &mut BasketRegistry,
        basket_id: BasketId,
        caller: &Address,
    ) -> Result<(), OrderError> {
        self.require_owner(registry, basket_id, caller)?;
        let order = self
            .orders
            .remove(&basket_id)
            .ok_or(OrderError::NotForSale { basket_id })?;
        if let Err(e) = registry.set_locked(basket_id, false) {
            self.orders.insert(basket_id, order);
            return Err(e.into());
        }

        info!(%basket_id, seller = %order.seller, "order cancelled");
        self.events.push(ContractEvent::OrderCancelled(OrderCancelled {
            basket_id,
            seller: order.seller,
        }));
        Ok(())
    }

    /// Reprice an active listing. Only the ask price changes.
    pub fn update_price(
        &mut self,
        registry: &BasketRegistry,
        basket_id: BasketId,
        quote: Quote,
        caller: &Address,
    ) -> Result<Amount, OrderError> {
        self.require_owner(registry, basket_id, caller)?;
        if !self.orders.contains_key(&basket_id) {
            return Err(OrderError::NotForSale { basket_id });
        }
        let snapshot = registry.wrapped_balance(basket_id)?;
        let new_price = self.quote_ask(&snapshot, &quote, self.clock.now())?;

        let order = self
            .orders
            .get_mut(&basket_id)
            .ok_or(OrderError::NotForSale { basket_id })?;
        let old_price = order.ask_price;
        order.ask_price = new_price;
        order.quote = quote;

        info!(%basket_id, %old_price, %new_price, "order repriced");
        self.events.push(ContractEvent::PriceUpdated(PriceUpdated {
            basket_id,
            old_price,
            new_price,
        }));
        Ok(new_price)
    }

    /// Ask produced by the pricing policy. Only a positive ask can ever be
    /// settled, whatever policy is plugged in.
    fn quote_ask(
        &self,
        snapshot: &BasketSnapshot,
        quote: &Quote,
        now: Timestamp,
    ) -> Result<Amount, OrderError> {
        let ask_price = self.policy.ask_price(snapshot, quote, now)?;
        if !ask_price.is_positive() {
            warn!(basket_id = %snapshot.basket_id, %ask_price, policy = ?self.policy, "policy produced unusable ask");
            return Err(OrderError::InvalidPrice {
                reason: format!("ask price must be positive, got {ask_price}"),
            });
        }
        Ok(ask_price)
    }

    // ───────────────────────── Fill ─────────────────────────

    /// Buy `basket_id` from `seller`, paying `paid_amount` of the payment
    /// asset. The buyer must have approved the market address for at least
    /// that amount. All of it goes to the seller.
    pub fn fill_order(
        &mut self,
        registry: &mut BasketRegistry,
        custody: &mut impl AssetCustody,
        seller: &Address,
        basket_id: BasketId,
        paid_amount: Amount,
        caller: &Address,
    ) -> Result<(), OrderError> {
        if let Err(active) = self.reentrancy_guard.enter("fill_order") {
            warn!(%basket_id, buyer = %caller, active, "fill rejected: reentrant call");
            return Err(OrderError::Reentrancy);
        }
        let result = self.fill_inner(registry, custody, seller, basket_id, paid_amount, caller);
        self.reentrancy_guard.exit();
        result
    }

    fn fill_inner(
        &mut self,
        registry: &mut BasketRegistry,
        custody: &mut impl AssetCustody,
        seller: &Address,
        basket_id: BasketId,
        paid_amount: Amount,
        caller: &Address,
    ) -> Result<(), OrderError> {
        // Checks
        let ask_price = match self.orders.get(&basket_id) {
            Some(order) if order.seller == *seller => order.ask_price,
            _ => {
                warn!(%basket_id, %seller, buyer = %caller, "fill rejected: not listed");
                return Err(OrderError::NotLockedForSale { basket_id });
            }
        };
        if paid_amount < ask_price {
            warn!(%basket_id, %ask_price, %paid_amount, "fill rejected: underpaid");
            return Err(OrderError::InsufficientPayment {
                required: ask_price,
                paid: paid_amount,
            });
        }
        if let Err(e) = self.check_payment(&*custody, caller, paid_amount) {
            warn!(%basket_id, buyer = %caller, error = %e, "fill rejected: payment not covered");
            return Err(e.into());
        }

        // Effects
        let order = self
            .orders
            .remove(&basket_id)
            .ok_or(OrderError::NotLockedForSale { basket_id })?;
        if let Err(e) = self.close_listing(registry, seller, caller, basket_id) {
            self.orders.insert(basket_id, order);
            return Err(e.into());
        }

        // Interactions
        if let Err(e) = self.settle_payment(custody, seller, caller, paid_amount) {
            warn!(%basket_id, error = %e, "payment failed, reverting fill");
            self.reopen_listing(registry, seller, caller, basket_id);
            self.orders.insert(basket_id, order);
            return Err(e);
        }

        registry.record_transfer(seller, caller, basket_id);
        info!(%basket_id, %seller, buyer = %caller, paid = %paid_amount, "order filled");
        self.events.push(ContractEvent::OrderFilled(OrderFilled {
            basket_id,
            seller: seller.clone(),
            buyer: caller.clone(),
            paid: paid_amount,
        }));
        Ok(())
    }

    fn close_listing(
        &self,
        registry: &mut BasketRegistry,
        seller: &Address,
        buyer: &Address,
        basket_id: BasketId,
    ) -> Result<(), BasketError> {
        registry.set_locked(basket_id, false)?;
        if let Err(e) = registry.settle_transfer(seller, buyer, basket_id) {
            registry.set_locked(basket_id, true)?;
            return Err(e);
        }
        Ok(())
    }

    fn reopen_listing(
        &self,
        registry: &mut BasketRegistry,
        seller: &Address,
        buyer: &Address,
        basket_id: BasketId,
    ) {
        let restored = registry
            .settle_transfer(buyer, seller, basket_id)
            .and_then(|()| registry.set_locked(basket_id, true));
        if let Err(e) = restored {
            error!(%basket_id, error = %e, "failed to restore listing");
        }
    }

    fn check_payment(
        &self,
        custody: &impl AssetCustody,
        buyer: &Address,
        amount: Amount,
    ) -> Result<(), CustodyError> {
        let allowed = custody.allowance(&self.payment_asset, buyer, &self.address);
        if allowed < amount {
            return Err(CustodyError::InsufficientAllowance {
                asset: self.payment_asset.clone(),
                owner: buyer.clone(),
                spender: self.address.clone(),
                required: amount,
                available: allowed,
            });
        }
        let available = custody.balance_of(&self.payment_asset, buyer);
        if available < amount {
            return Err(CustodyError::InsufficientBalance {
                asset: self.payment_asset.clone(),
                required: amount,
                available,
            });
        }
        Ok(())
    }

    /// Pull the payment into escrow, then forward it to the seller. A
    /// failed forward refunds the buyer.
    fn settle_payment(
        &self,
        custody: &mut impl AssetCustody,
        seller: &Address,
        buyer: &Address,
        amount: Amount,
    ) -> Result<(), OrderError> {
        custody.pull(&self.payment_asset, buyer, &self.address, amount)?;
        if let Err(e) = custody.push(&self.payment_asset, &self.address, seller, amount) {
            if let Err(refund) = custody.push(&self.payment_asset, &self.address, buyer, amount) {
                error!(%buyer, %amount, error = %refund, "buyer refund failed");
            }
            return Err(e.into());
        }
        Ok(())
    }

    // ───────────────────────── Queries ─────────────────────────

    /// Ask price of `seller`'s listing for `basket_id`.
    pub fn basket_price(&self, seller: &Address, basket_id: BasketId) -> Result<Amount, OrderError> {
        debug!(%basket_id, %seller, "basket_price");
        self.orders
            .get(&basket_id)
            .filter(|order| order.seller == *seller)
            .map(|order| order.ask_price)
            .ok_or(OrderError::NotForSale { basket_id })
    }

    pub fn order(&self, basket_id: BasketId) -> Option<&Order> {
        self.orders.get(&basket_id)
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    pub fn events(&self) -> &[ContractEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<ContractEvent> {
        std::mem::take(&mut self.events)
    }

    fn require_owner(
        &self,
        registry: &BasketRegistry,
        basket_id: BasketId,
        caller: &Address,
    ) -> Result<(), OrderError> {
        let owner = registry.owner_of(basket_id).map_err(|e| match e {
            NftError::UnknownToken { .. } => OrderError::from(BasketError::UnknownBasket { basket_id }),
            other => OrderError::from(other),
        })?;
        if owner != *caller {
            warn!(%basket_id, %caller, "caller does not own basket");
            return Err(OrderError::NotOwner {
                basket_id,
                caller: caller.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basket::Constituent;
    use crate::clock::ManualClock;
    use crate::config::{AllowList, RegistryConfig};
    use crate::custody::TokenLedger;
    use crate::errors::ErrorKind;

    const NOW: Timestamp = 1_700_000_000_000;

    fn addr(s: &str) -> Address {
        Address::new(s)
    }

    struct Market {
        registry: BasketRegistry,
        book: OrderBook<ManualClock>,
        ledger: TokenLedger,
        basket: BasketId,
    }

    fn setup() -> Market {
        let allow_list = AllowList::from_pairs(
            vec![addr("TKA"), addr("TKB")],
            vec![addr("feed-a"), addr("feed-b")],
        )
        .unwrap();
        let mut registry = BasketRegistry::new(RegistryConfig {
            allow_list,
            ..RegistryConfig::default()
        })
        .unwrap();
        let book = OrderBook::new(MarketConfig::default(), ManualClock::new(NOW)).unwrap();

        let mut ledger = TokenLedger::new();
        for asset in ["TKA", "TKB"] {
            ledger.mint(&addr(asset), &addr("alice"), Amount::from(100)).unwrap();
            ledger.approve(&addr(asset), &addr("alice"), registry.address(), Amount::from(100));
        }
        ledger.mint(book.payment_asset(), &addr("bob"), Amount::from(50)).unwrap();
        ledger.approve(book.payment_asset(), &addr("bob"), book.address(), Amount::from(50));

        let basket = registry
            .wrap(
                vec![Constituent::new("TKA", 20u64), Constituent::new("TKB", 20u64)],
                &addr("alice"),
                &mut ledger,
            )
            .unwrap();
        Market {
            registry,
            book,
            ledger,
            basket,
        }
    }

    #[test]
    fn test_create_order_locks_basket() {
        let mut m = setup();
        let ask = m
            .book
            .create_order(&mut m.registry, m.basket, Quote::Fixed(Amount::from(5)), &addr("alice"))
            .unwrap();
        assert_eq!(ask, Amount::from(5));
        assert!(m.registry.is_locked(m.basket).unwrap());
        assert_eq!(m.book.basket_price(&addr("alice"), m.basket).unwrap(), Amount::from(5));
        assert_eq!(m.book.order(m.basket).unwrap().created_at, NOW);
    }

    #[test]
    fn test_second_listing_rejected() {
        let mut m = setup();
        let quote = Quote::Fixed(Amount::from(5));
        m.book
            .create_order(&mut m.registry, m.basket, quote.clone(), &addr("alice"))
            .unwrap();
        let err = m
            .book
            .create_order(&mut m.registry, m.basket, quote, &addr("alice"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyListed);
        assert_eq!(err.to_string(), format!("Basket already listed: {}", m.basket));
    }

    #[test]
    fn test_non_owner_cannot_list() {
        let mut m = setup();
        let err = m
            .book
            .create_order(&mut m.registry, m.basket, Quote::Fixed(Amount::from(5)), &addr("bob"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotOwner);
        assert!(!m.registry.is_locked(m.basket).unwrap());
    }

    #[test]
    fn test_unknown_basket_listing() {
        let mut m = setup();
        let err = m
            .book
            .create_order(
                &mut m.registry,
                BasketId::new(99),
                Quote::Fixed(Amount::from(5)),
                &addr("alice"),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownEntity);
    }

    #[test]
    fn test_fill_transfers_and_pays_seller() {
        let mut m = setup();
        m.book
            .create_order(&mut m.registry, m.basket, Quote::Fixed(Amount::from(5)), &addr("alice"))
            .unwrap();
        m.book
            .fill_order(
                &mut m.registry,
                &mut m.ledger,
                &addr("alice"),
                m.basket,
                Amount::from(5),
                &addr("bob"),
            )
            .unwrap();

        assert_eq!(m.registry.owner_of(m.basket).unwrap(), addr("bob"));
        assert!(!m.registry.is_locked(m.basket).unwrap());
        assert!(m.book.order(m.basket).is_none());
        let eth = addr("ETH");
        assert_eq!(m.ledger.balance_of(&eth, &addr("alice")), Amount::from(5));
        assert_eq!(m.ledger.balance_of(&eth, &addr("bob")), Amount::from(45));
        assert_eq!(m.ledger.balance_of(&eth, m.book.address()), Amount::ZERO);
    }

    #[test]
    fn test_overpayment_forwarded_in_full() {
        let mut m = setup();
        m.book
            .create_order(&mut m.registry, m.basket, Quote::Fixed(Amount::from(5)), &addr("alice"))
            .unwrap();
        m.book
            .fill_order(
                &mut m.registry,
                &mut m.ledger,
                &addr("alice"),
                m.basket,
                Amount::from(8),
                &addr("bob"),
            )
            .unwrap();
        assert_eq!(m.ledger.balance_of(&addr("ETH"), &addr("alice")), Amount::from(8));
    }

    #[test]
    fn test_underpaid_fill_rejected() {
        let mut m = setup();
        m.book
            .create_order(&mut m.registry, m.basket, Quote::Fixed(Amount::from(5)), &addr("alice"))
            .unwrap();
        let err = m
            .book
            .fill_order(
                &mut m.registry,
                &mut m.ledger,
                &addr("alice"),
                m.basket,
                Amount::from(4),
                &addr("bob"),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientPayment);
        assert_eq!(m.registry.owner_of(m.basket).unwrap(), addr("alice"));
        assert!(m.registry.is_locked(m.basket).unwrap());
    }

    #[test]
    fn test_payment_failure_reverts_fill() {
        let mut m = setup();
        m.book
            .create_order(&mut m.registry, m.basket, Quote::Fixed(Amount::from(5)), &addr("alice"))
            .unwrap();
        // Carol never approved the market.
        let err = m
            .book
            .fill_order(
                &mut m.registry,
                &mut m.ledger,
                &addr("alice"),
                m.basket,
                Amount::from(5),
                &addr("carol"),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Custody);
        assert_eq!(m.registry.owner_of(m.basket).unwrap(), addr("alice"));
        assert!(m.registry.is_locked(m.basket).unwrap());
        assert!(m.book.order(m.basket).is_some());
        assert_eq!(m.book.reentrancy_guard.active(), None);
    }

    #[test]
    fn test_uncovered_payment_leaves_buyer_allowance() {
        let mut m = setup();
        m.book
            .create_order(&mut m.registry, m.basket, Quote::Fixed(Amount::from(5)), &addr("alice"))
            .unwrap();
        m.ledger
            .approve(m.book.payment_asset(), &addr("bob"), m.book.address(), Amount::from(3));

        let err = m
            .book
            .fill_order(
                &mut m.registry,
                &mut m.ledger,
                &addr("alice"),
                m.basket,
                Amount::from(5),
                &addr("bob"),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            OrderError::Custody(CustodyError::InsufficientAllowance { .. })
        ));
        assert_eq!(
            m.ledger
                .allowance(m.book.payment_asset(), &addr("bob"), m.book.address()),
            Amount::from(3)
        );
        assert_eq!(m.ledger.balance_of(&addr("ETH"), &addr("bob")), Amount::from(50));
        assert!(m.book.order(m.basket).is_some());
    }

    #[test]
    fn test_fill_wrong_seller_not_listed() {
        let mut m = setup();
        m.book
            .create_order(&mut m.registry, m.basket, Quote::Fixed(Amount::from(5)), &addr("alice"))
            .unwrap();
        let err = m
            .book
            .fill_order(
                &mut m.registry,
                &mut m.ledger,
                &addr("mallory"),
                m.basket,
                Amount::from(5),
                &addr("bob"),
            )
            .unwrap_err();
        assert_eq!(err, OrderError::NotLockedForSale { basket_id: m.basket });
    }

    #[test]
    fn test_cancel_unlocks() {
        let mut m = setup();
        m.book
            .create_order(&mut m.registry, m.basket, Quote::Fixed(Amount::from(5)), &addr("alice"))
            .unwrap();
        m.book.cancel_order(&mut m.registry, m.basket, &addr("alice")).unwrap();
        assert!(!m.registry.is_locked(m.basket).unwrap());
        let again = m.book.cancel_order(&mut m.registry, m.basket, &addr("alice"));
        assert_eq!(again, Err(OrderError::NotForSale { basket_id: m.basket }));
    }

    #[test]
    fn test_update_price_only_changes_ask() {
        let mut m = setup();
        m.book
            .create_order(&mut m.registry, m.basket, Quote::Fixed(Amount::from(5)), &addr("alice"))
            .unwrap();
        let new_price = m
            .book
            .update_price(&m.registry, m.basket, Quote::Fixed(Amount::from(9)), &addr("alice"))
            .unwrap();
        assert_eq!(new_price, Amount::from(9));
        let order = m.book.order(m.basket).unwrap();
        assert_eq!(order.seller, addr("alice"));
        assert_eq!(order.created_at, NOW);
        assert!(matches!(
            m.book.events().last(),
            Some(ContractEvent::PriceUpdated(PriceUpdated { old_price, .. })) if *old_price == Amount::from(5)
        ));
    }

    #[test]
    fn test_update_price_without_order() {
        let mut m = setup();
        let err = m
            .book
            .update_price(&m.registry, m.basket, Quote::Fixed(Amount::from(9)), &addr("alice"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotListed);
    }

    #[test]
    fn test_parameterised_quote_bounds() {
        let mut m = setup();
        let expired = Quote::Parameterised {
            premium: Amount::from(5),
            slippage_bps: 50,
            deadline: NOW,
        };
        let err = m
            .book
            .create_order(&mut m.registry, m.basket, expired, &addr("alice"))
            .unwrap_err();
        assert!(matches!(err, OrderError::QuoteExpired { .. }));

        let too_loose = Quote::Parameterised {
            premium: Amount::from(5),
            slippage_bps: 5_000,
            deadline: NOW + 60_000,
        };
        let err = m
            .book
            .create_order(&mut m.registry, m.basket, too_loose, &addr("alice"))
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidPrice { .. }));
        assert!(!m.registry.is_locked(m.basket).unwrap());

        let good = Quote::Parameterised {
            premium: Amount::from(5),
            slippage_bps: 50,
            deadline: NOW + 60_000,
        };
        let ask = m
            .book
            .create_order(&mut m.registry, m.basket, good, &addr("alice"))
            .unwrap();
        assert_eq!(ask, Amount::from(5));
    }

    #[test]
    fn test_zero_price_rejected() {
        let mut m = setup();
        let err = m
            .book
            .create_order(&mut m.registry, m.basket, Quote::Fixed(Amount::ZERO), &addr("alice"))
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidPrice { .. }));
    }

    /// Prices a basket at the premium per constituent.
    #[derive(Debug)]
    struct PerConstituent;

    impl PricingPolicy for PerConstituent {
        fn ask_price(
            &self,
            basket: &BasketSnapshot,
            quote: &Quote,
            _now: Timestamp,
        ) -> Result<Amount, OrderError> {
            let count = Amount::from(basket.constituents.len() as u64);
            Ok(Amount::new(quote.premium().as_decimal() * count.as_decimal()))
        }
    }

    /// Prices a basket at the premium less a fixed rebate, without a floor.
    #[derive(Debug)]
    struct Rebate(Amount);

    impl PricingPolicy for Rebate {
        fn ask_price(
            &self,
            _basket: &BasketSnapshot,
            quote: &Quote,
            _now: Timestamp,
        ) -> Result<Amount, OrderError> {
            Ok(Amount::new(quote.premium().as_decimal() - self.0.as_decimal()))
        }
    }

    #[test]
    fn test_policy_ask_must_be_positive() {
        let mut m = setup();
        let mut book = OrderBook::with_policy(
            MarketConfig::default(),
            ManualClock::new(NOW),
            Box::new(Rebate(Amount::from(5))),
        )
        .unwrap();

        let err = book
            .create_order(&mut m.registry, m.basket, Quote::Fixed(Amount::from(5)), &addr("alice"))
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidPrice { .. }));
        assert!(!m.registry.is_locked(m.basket).unwrap());
        assert_eq!(book.order_count(), 0);

        book.create_order(&mut m.registry, m.basket, Quote::Fixed(Amount::from(8)), &addr("alice"))
            .unwrap();
        let err = book
            .update_price(&m.registry, m.basket, Quote::Fixed(Amount::from(2)), &addr("alice"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidAmount);
        assert_eq!(book.basket_price(&addr("alice"), m.basket).unwrap(), Amount::from(3));
    }

    #[test]
    fn test_custom_policy() {
        let mut m = setup();
        let mut book = OrderBook::with_policy(
            MarketConfig::default(),
            ManualClock::new(NOW),
            Box::new(PerConstituent),
        )
        .unwrap();
        let ask = book
            .create_order(&mut m.registry, m.basket, Quote::Fixed(Amount::from(3)), &addr("alice"))
            .unwrap();
        assert_eq!(ask, Amount::from(6));
    }
}
