//! Shopping cart state and checkout.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use gavel_core::{OrderId, PaymentMethod, ProductId};
use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};

use super::CartError;
use crate::models::{CartItem, Product, PurchaseReceipt, PurchaseRecord};
use crate::payments::{PaymentGateway, PaymentRequest};
use crate::persistence::PersistedStore;

/// Cart line items, persisted under the `cart` record after every change.
pub struct CartStore {
    store: PersistedStore,
    payments: Arc<dyn PaymentGateway>,
    items: RwLock<Vec<CartItem>>,
    busy: AtomicBool,
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("items", &*self.read())
            .field("busy", &self.is_busy())
            .finish_non_exhaustive()
    }
}

/// Marks a checkout as in flight for as long as it lives.
struct CheckoutGuard<'a> {
    busy: &'a AtomicBool,
}

impl<'a> CheckoutGuard<'a> {
    fn acquire(busy: &'a AtomicBool) -> Option<Self> {
        busy.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { busy })
    }
}

impl Drop for CheckoutGuard<'_> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

impl CartStore {
    /// Restore the cart from `store`; a corrupt record yields an empty cart.
    #[must_use]
    pub fn new(store: PersistedStore, payments: Arc<dyn PaymentGateway>) -> Self {
        let items = store.load::<Vec<CartItem>>().unwrap_or_default();
        debug!(lines = items.len(), "Restored cart");
        Self {
            store,
            payments,
            items: RwLock::new(items),
            busy: AtomicBool::new(false),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<CartItem>> {
        self.items.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<CartItem>> {
        self.items.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `change` to the items and persist the result.
    ///
    /// Nothing is written when `change` fails; it must validate before it
    /// mutates.
    fn mutate<T>(
        &self,
        change: impl FnOnce(&mut Vec<CartItem>) -> Result<T, CartError>,
    ) -> Result<T, CartError> {
        let mut items = self.write();
        let value = change(&mut items)?;
        self.store.save(&*items);
        Ok(value)
    }

    // =========================================================================
    // Getters
    // =========================================================================

    /// Snapshot of the line items.
    #[must_use]
    pub fn items(&self) -> Vec<CartItem> {
        self.read().clone()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.read().iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Sum of `unit_price * quantity` across all lines.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        total_of(&self.read())
    }

    #[must_use]
    pub fn is_in_cart(&self, id: &ProductId) -> bool {
        self.read().iter().any(|item| item.id == *id)
    }

    /// Quantity of `id` in the cart, 0 if absent.
    #[must_use]
    pub fn quantity_of(&self, id: &ProductId) -> u32 {
        self.read()
            .iter()
            .find(|item| item.id == *id)
            .map_or(0, |item| item.quantity)
    }

    /// Whether a checkout is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add one unit of `product`.
    ///
    /// # Errors
    ///
    /// Fails without touching the cart when the product is out of stock, up
    /// for auction, reserved for an auction winner, or already in the cart
    /// at its maximum quantity.
    #[instrument(skip_all, fields(product_id = %product.id))]
    pub fn add_to_cart(&self, product: &Product) -> Result<u32, CartError> {
        ensure_purchasable(product, Utc::now())?;

        let quantity = self.mutate(|items| {
            if let Some(line) = items.iter_mut().find(|item| item.id == product.id) {
                if line.quantity >= line.max_quantity {
                    return Err(CartError::MaxQuantityReached {
                        name: line.name.clone(),
                        max: line.max_quantity,
                    });
                }
                line.quantity += 1;
                return Ok(line.quantity);
            }

            items.push(CartItem::from_product(product));
            Ok(1)
        })?;

        debug!(quantity, "Added to cart");
        Ok(quantity)
    }

    /// Remove the line for `id`. Returns whether a line was removed.
    #[instrument(skip(self))]
    pub fn remove_from_cart(&self, id: &ProductId) -> bool {
        let mut items = self.write();
        let before = items.len();
        items.retain(|item| item.id != *id);
        let removed = items.len() != before;
        if removed {
            self.store.save(&*items);
        }
        debug!(removed, "Removed from cart");
        removed
    }

    /// Set the quantity of `id`; zero or less removes the line.
    ///
    /// Unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::QuantityExceedsStock`] when `quantity` is above
    /// the line's maximum. The line keeps its previous quantity.
    #[instrument(skip(self))]
    pub fn update_quantity(&self, id: &ProductId, quantity: i64) -> Result<(), CartError> {
        if quantity <= 0 {
            self.remove_from_cart(id);
            return Ok(());
        }

        let mut items = self.write();
        let Some(line) = items.iter_mut().find(|item| item.id == *id) else {
            return Ok(());
        };
        let max = line.max_quantity;
        line.quantity = u32::try_from(quantity)
            .ok()
            .filter(|quantity| *quantity <= max)
            .ok_or(CartError::QuantityExceedsStock { max })?;
        self.store.save(&*items);
        Ok(())
    }

    /// Empty the cart.
    pub fn clear_cart(&self) {
        let mut items = self.write();
        items.clear();
        self.store.save(&*items);
        debug!("Cleared cart");
    }

    /// Take the units of `purchased` out of the cart.
    ///
    /// Lines added or raised while the charge was in flight keep whatever
    /// was not paid for.
    fn settle(&self, purchased: &[CartItem]) {
        let mut items = self.write();
        for paid in purchased {
            if let Some(line) = items.iter_mut().find(|item| item.id == paid.id) {
                line.quantity = line.quantity.saturating_sub(paid.quantity);
            }
        }
        items.retain(|item| item.quantity > 0);
        self.store.save(&*items);
        debug!(remaining = items.len(), "Settled purchased lines");
    }

    /// Pay for the current contents of the cart.
    ///
    /// Only one checkout runs at a time. Once the payment collaborator has
    /// approved, the purchased units are taken out of the cart; anything added
    /// while the charge was in flight stays.
    ///
    /// # Errors
    ///
    /// - [`CartError::EmptyCart`] if there is nothing to buy
    /// - [`CartError::CheckoutInProgress`] if another checkout is running
    /// - [`CartError::Payment`] if the charge fails; the cart is untouched
    #[instrument(skip(self))]
    pub async fn purchase_cart(&self, method: PaymentMethod) -> Result<PurchaseReceipt, CartError> {
        let _guard = CheckoutGuard::acquire(&self.busy).ok_or(CartError::CheckoutInProgress)?;

        let items = self.items();
        if items.is_empty() {
            return Err(CartError::EmptyCart);
        }
        let total = total_of(&items);
        info!(lines = items.len(), total = %total, "Starting checkout");

        let request = PaymentRequest {
            items,
            total,
            method,
        };
        let confirmation = match self.payments.charge(&request).await {
            Ok(confirmation) => confirmation,
            Err(e) => {
                warn!(error = %e, "Checkout failed, cart left as is");
                return Err(e.into());
            }
        };

        self.settle(&request.items);

        let receipt = PurchaseReceipt {
            order_id: next_order_id(Utc::now()),
            payment_reference: confirmation.reference,
            record: PurchaseRecord {
                items: request.items,
                total_price: total,
                payment_method: method,
                timestamp: Utc::now(),
            },
        };
        info!(order_id = %receipt.order_id, total = %total, "Checkout complete");
        Ok(receipt)
    }
}

/// Reject products that cannot be bought right now.
fn ensure_purchasable(product: &Product, now: DateTime<Utc>) -> Result<(), CartError> {
    if product.stock <= 0 {
        return Err(CartError::OutOfStock {
            name: product.name.clone(),
        });
    }
    if product.is_bidding && !product.bidding_ended_at(now) {
        return Err(CartError::BiddingInProgress {
            name: product.name.clone(),
        });
    }
    if product.is_reserved() {
        return Err(CartError::ReservedForWinner {
            name: product.name.clone(),
        });
    }
    Ok(())
}

fn total_of(items: &[CartItem]) -> Decimal {
    items.iter().map(CartItem::line_total).sum()
}

/// `ORDER-<unix millis>-<8 random hex digits>`
fn next_order_id(now: DateTime<Utc>) -> OrderId {
    let (random, ..) = uuid::Uuid::new_v4().as_fields();
    OrderId::new(format!("ORDER-{}-{random:08X}", now.timestamp_millis()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::models::keys;
    use crate::models::product::tests::product;
    use crate::payments::{MockPaymentGateway, PaymentConfirmation, PaymentError, SimulatedPaymentGateway};
    use crate::persistence::MemoryStore;
    use gavel_core::BiddingStatus;

    fn instant_payments() -> Arc<dyn PaymentGateway> {
        Arc::new(SimulatedPaymentGateway::new(Duration::ZERO))
    }

    fn cart_over(backend: &Arc<MemoryStore>, payments: Arc<dyn PaymentGateway>) -> CartStore {
        CartStore::new(PersistedStore::new(backend.clone()), payments)
    }

    fn cart() -> (Arc<MemoryStore>, CartStore) {
        let backend = Arc::new(MemoryStore::new());
        let cart = cart_over(&backend, instant_payments());
        (backend, cart)
    }

    #[test]
    fn test_corrupt_cart_record_starts_empty() {
        let backend = Arc::new(MemoryStore::new());
        backend.insert_raw(keys::CART, "definitely not json");

        let cart = cart_over(&backend, instant_payments());
        assert!(cart.items().is_empty());
        assert!(!backend.contains(keys::CART));
    }

    #[test]
    fn test_out_of_stock_is_rejected() {
        let (backend, cart) = cart();
        let err = cart
            .add_to_cart(&product("p1", Decimal::from(10), 0))
            .unwrap_err();
        assert!(matches!(err, CartError::OutOfStock { .. }));
        assert!(cart.items().is_empty());
        assert!(!backend.contains(keys::CART));
    }

    #[test]
    fn test_add_up_to_stock() {
        let (_, cart) = cart();
        let lamp = product("p1", Decimal::from(10), 3);

        assert_eq!(cart.add_to_cart(&lamp).unwrap(), 1);
        assert_eq!(cart.items()[0].max_quantity, 3);
        cart.add_to_cart(&lamp).unwrap();
        cart.add_to_cart(&lamp).unwrap();
        assert_eq!(cart.quantity_of(&lamp.id), 3);

        let err = cart.add_to_cart(&lamp).unwrap_err();
        assert!(matches!(err, CartError::MaxQuantityReached { max: 3, .. }));
        assert_eq!(cart.quantity_of(&lamp.id), 3);
        assert_eq!(err.to_string(), "maximum quantity for Product p1 is 3");
    }

    #[test]
    fn test_snapshot_survives_price_change() {
        let (_, cart) = cart();
        let mut lamp = product("p1", Decimal::from(10), 3);
        cart.add_to_cart(&lamp).unwrap();

        lamp.current_price = Decimal::from(99);
        cart.add_to_cart(&lamp).unwrap();
        assert_eq!(cart.total_price(), Decimal::from(20));
    }

    #[test]
    fn test_active_auction_is_rejected() {
        let (_, cart) = cart();
        let mut lot = product("p1", Decimal::from(10), 1);
        lot.is_bidding = true;
        lot.bidding_status = Some(BiddingStatus::Active);
        lot.bidding_end_time = Some(Utc::now() + chrono::Duration::hours(1));

        assert!(matches!(
            cart.add_to_cart(&lot),
            Err(CartError::BiddingInProgress { .. })
        ));
        assert!(!cart.is_in_cart(&lot.id));
    }

    #[test]
    fn test_finished_auction_is_accepted() {
        let (_, cart) = cart();
        let mut lot = product("p1", Decimal::from(10), 1);
        lot.is_bidding = true;
        lot.bidding_end_time = Some(Utc::now() - chrono::Duration::hours(1));

        cart.add_to_cart(&lot).unwrap();
        assert!(cart.is_in_cart(&lot.id));
    }

    #[test]
    fn test_reserved_product_is_rejected() {
        let (_, cart) = cart();
        let mut lot = product("p1", Decimal::from(10), 1);
        lot.reserved_for_winner = true;
        assert!(matches!(
            cart.add_to_cart(&lot),
            Err(CartError::ReservedForWinner { .. })
        ));

        lot.reserved_for_winner = false;
        lot.bidding_status = Some(BiddingStatus::Reserved);
        assert!(matches!(
            cart.add_to_cart(&lot),
            Err(CartError::ReservedForWinner { .. })
        ));
    }

    #[test]
    fn test_update_quantity() {
        let (_, cart) = cart();
        let lamp = product("p1", Decimal::from(10), 3);
        cart.add_to_cart(&lamp).unwrap();

        cart.update_quantity(&lamp.id, 3).unwrap();
        assert_eq!(cart.quantity_of(&lamp.id), 3);

        let err = cart.update_quantity(&lamp.id, 4).unwrap_err();
        assert!(matches!(err, CartError::QuantityExceedsStock { max: 3 }));
        assert_eq!(cart.quantity_of(&lamp.id), 3);

        cart.update_quantity(&ProductId::new("missing"), 2).unwrap();
        assert_eq!(cart.items().len(), 1);

        cart.update_quantity(&lamp.id, 0).unwrap();
        assert!(!cart.is_in_cart(&lamp.id));
    }

    #[test]
    fn test_negative_quantity_removes() {
        let (_, cart) = cart();
        let lamp = product("p1", Decimal::from(10), 3);
        cart.add_to_cart(&lamp).unwrap();
        cart.update_quantity(&lamp.id, -2).unwrap();
        assert!(cart.items().is_empty());
    }

    #[test]
    fn test_totals() {
        let (_, cart) = cart();
        let a = product("a", Decimal::from(10), 5);
        let b = product("b", Decimal::from(5), 5);
        cart.add_to_cart(&a).unwrap();
        cart.add_to_cart(&b).unwrap();
        cart.update_quantity(&a.id, 2).unwrap();
        cart.update_quantity(&b.id, 3).unwrap();

        assert_eq!(cart.total_price(), Decimal::from(35));
        assert_eq!(cart.item_count(), 5);
    }

    #[test]
    fn test_changes_are_persisted() {
        let (backend, cart) = cart();
        let lamp = product("p1", Decimal::from(10), 3);
        cart.add_to_cart(&lamp).unwrap();
        cart.add_to_cart(&lamp).unwrap();

        let restored = cart_over(&backend, instant_payments());
        assert_eq!(restored.items(), cart.items());

        assert!(cart.remove_from_cart(&lamp.id));
        assert!(!cart.remove_from_cart(&lamp.id));
        let restored = cart_over(&backend, instant_payments());
        assert!(restored.items().is_empty());
    }

    #[test]
    fn test_noop_changes_are_not_written() {
        use crate::persistence::KeyValueStore;

        let (backend, cart) = cart();
        let missing = ProductId::new("missing");
        cart.update_quantity(&missing, 2).unwrap();
        assert!(!cart.remove_from_cart(&missing));
        assert_eq!(backend.get(keys::CART).unwrap(), None);

        cart.clear_cart();
        let restored = cart_over(&backend, instant_payments());
        assert!(restored.items().is_empty());
        assert!(backend.get(keys::CART).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_empty_purchase_fails_and_stays_idle() {
        let (_, cart) = cart();
        let err = cart.purchase_cart(PaymentMethod::Card).await.unwrap_err();
        assert!(matches!(err, CartError::EmptyCart));
        assert!(!cart.is_busy());
    }

    #[tokio::test]
    async fn test_purchase_clears_cart() {
        let (backend, cart) = cart();
        cart.add_to_cart(&product("a", Decimal::from(10), 5)).unwrap();
        cart.add_to_cart(&product("b", Decimal::from(5), 5)).unwrap();

        let receipt = cart.purchase_cart(PaymentMethod::Paypal).await.unwrap();
        assert!(receipt.order_id.as_str().starts_with("ORDER-"));
        assert_eq!(receipt.record.items.len(), 2);
        assert_eq!(receipt.record.total_price, Decimal::from(15));
        assert_eq!(receipt.record.payment_method, PaymentMethod::Paypal);

        assert!(cart.items().is_empty());
        assert!(!cart.is_busy());
        assert!(cart_over(&backend, instant_payments()).items().is_empty());
    }

    #[tokio::test]
    async fn test_order_ids_differ() {
        let (_, cart) = cart();
        let lamp = product("p1", Decimal::from(10), 5);

        cart.add_to_cart(&lamp).unwrap();
        let first = cart.purchase_cart(PaymentMethod::Card).await.unwrap();
        cart.add_to_cart(&lamp).unwrap();
        let second = cart.purchase_cart(PaymentMethod::Card).await.unwrap();

        assert_ne!(first.order_id, second.order_id);
    }

    #[tokio::test]
    async fn test_failed_payment_keeps_cart() {
        let mut payments = MockPaymentGateway::new();
        payments
            .expect_charge()
            .times(1)
            .returning(|_| Err(PaymentError::Declined("card expired".to_string())));

        let backend = Arc::new(MemoryStore::new());
        let cart = cart_over(&backend, Arc::new(payments));
        cart.add_to_cart(&product("p1", Decimal::from(10), 5)).unwrap();

        let err = cart.purchase_cart(PaymentMethod::Card).await.unwrap_err();
        assert!(matches!(err, CartError::Payment(PaymentError::Declined(_))));
        assert_eq!(cart.item_count(), 1);
        assert!(!cart.is_busy());
    }

    #[tokio::test]
    async fn test_charge_receives_cart_contents() {
        let mut payments = MockPaymentGateway::new();
        payments
            .expect_charge()
            .withf(|request| {
                request.total == Decimal::from(30)
                    && request.items.len() == 1
                    && request.method == PaymentMethod::BankTransfer
            })
            .returning(|_| {
                Ok(PaymentConfirmation {
                    reference: "ref-1".to_string(),
                })
            });

        let cart = cart_over(&Arc::new(MemoryStore::new()), Arc::new(payments));
        let lamp = product("p1", Decimal::from(10), 5);
        cart.add_to_cart(&lamp).unwrap();
        cart.update_quantity(&lamp.id, 3).unwrap();

        let receipt = cart.purchase_cart(PaymentMethod::BankTransfer).await.unwrap();
        assert_eq!(receipt.payment_reference, "ref-1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_checkout_is_rejected() {
        let backend = Arc::new(MemoryStore::new());
        let payments = Arc::new(SimulatedPaymentGateway::new(Duration::from_secs(2)));
        let cart = Arc::new(cart_over(&backend, payments));
        cart.add_to_cart(&product("p1", Decimal::from(10), 5)).unwrap();

        let first = tokio::spawn({
            let cart = Arc::clone(&cart);
            async move { cart.purchase_cart(PaymentMethod::Card).await }
        });
        while !cart.is_busy() {
            tokio::task::yield_now().await;
        }

        let err = cart.purchase_cart(PaymentMethod::Card).await.unwrap_err();
        assert!(matches!(err, CartError::CheckoutInProgress));

        first.await.unwrap().unwrap();
        assert!(!cart.is_busy());
        assert!(cart.items().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_changes_during_checkout_survive_it() {
        let backend = Arc::new(MemoryStore::new());
        let payments = Arc::new(SimulatedPaymentGateway::new(Duration::from_secs(2)));
        let cart = Arc::new(cart_over(&backend, payments));
        let lamp = product("p1", Decimal::from(10), 5);
        let chair = product("p2", Decimal::from(40), 1);
        cart.add_to_cart(&lamp).unwrap();
        cart.add_to_cart(&lamp).unwrap();

        let checkout = tokio::spawn({
            let cart = Arc::clone(&cart);
            async move { cart.purchase_cart(PaymentMethod::Card).await }
        });
        while !cart.is_busy() {
            tokio::task::yield_now().await;
        }

        cart.add_to_cart(&chair).unwrap();
        cart.update_quantity(&lamp.id, 3).unwrap();

        let receipt = checkout.await.unwrap().unwrap();
        assert_eq!(receipt.record.items.len(), 1);
        assert_eq!(receipt.record.total_price, Decimal::from(20));

        assert_eq!(cart.quantity_of(&lamp.id), 1);
        assert_eq!(cart.quantity_of(&chair.id), 1);
        let restored = cart_over(&backend, instant_payments());
        assert_eq!(restored.items(), cart.items());
    }

    #[tokio::test(start_paused = true)]
    async fn test_quantity_lowered_during_checkout_is_settled() {
        let payments = Arc::new(SimulatedPaymentGateway::new(Duration::from_secs(2)));
        let cart = Arc::new(cart_over(&Arc::new(MemoryStore::new()), payments));
        let lamp = product("p1", Decimal::from(10), 5);
        cart.add_to_cart(&lamp).unwrap();
        cart.add_to_cart(&lamp).unwrap();

        let checkout = tokio::spawn({
            let cart = Arc::clone(&cart);
            async move { cart.purchase_cart(PaymentMethod::Card).await }
        });
        while !cart.is_busy() {
            tokio::task::yield_now().await;
        }
        cart.update_quantity(&lamp.id, 1).unwrap();

        checkout.await.unwrap().unwrap();
        assert!(cart.items().is_empty());
    }

    #[test]
    fn test_order_id_format() {
        let now = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        let id = next_order_id(now);
        let parts: Vec<_> = id.as_str().split('-').collect();
        assert_eq!(parts[0], "ORDER");
        assert_eq!(parts[1], "1700000000123");
        assert_eq!(parts[2].len(), 8);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }
}
