//! Cart commands.

use gavel_client::Marketplace;
use gavel_client::api::ProductApi;
use gavel_core::{PaymentMethod, ProductId};
use tracing::info;

use super::{CommandError, money};

pub fn show(market: &Marketplace) {
    let cart = market.cart();
    let items = cart.items();
    if items.is_empty() {
        info!("Cart is empty");
        return;
    }

    for item in &items {
        info!(
            "{}  {}  {} x {} = {}  (max {})",
            item.id,
            item.name,
            item.quantity,
            money(item.unit_price),
            money(item.line_total()),
            item.max_quantity
        );
    }
    info!(
        "{} item(s), total {}",
        cart.item_count(),
        money(cart.total_price())
    );
}

/// Fetch the product and add one unit of it.
pub async fn add(market: &Marketplace, id: &ProductId) -> Result<(), CommandError> {
    let product = market.api().get_product(id).await?;
    let quantity = market.cart().add_to_cart(&product)?;
    info!("Added {} (now {quantity} in cart)", product.name);
    Ok(())
}

pub fn remove(market: &Marketplace, id: &ProductId) {
    if market.cart().remove_from_cart(id) {
        info!("Removed {id} from cart");
    } else {
        info!("{id} was not in the cart");
    }
}

pub fn set(market: &Marketplace, id: &ProductId, quantity: i64) -> Result<(), CommandError> {
    if !market.cart().is_in_cart(id) {
        info!("{id} is not in the cart, add it first");
        return Ok(());
    }
    market.cart().update_quantity(id, quantity)?;
    info!("{id}: quantity {}", market.cart().quantity_of(id));
    Ok(())
}

pub fn clear(market: &Marketplace) {
    market.cart().clear_cart();
    info!("Cart cleared");
}

pub async fn checkout(market: &Marketplace, method: PaymentMethod) -> Result<(), CommandError> {
    info!(
        "Paying {} by {method}...",
        money(market.cart().total_price())
    );
    let receipt = market.cart().purchase_cart(method).await?;
    info!(
        "Order {} confirmed: {} line(s), {} (payment ref {})",
        receipt.order_id,
        receipt.record.items.len(),
        money(receipt.record.total_price),
        receipt.payment_reference
    );
    Ok(())
}
