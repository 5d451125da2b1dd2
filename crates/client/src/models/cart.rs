//! Cart line items and purchase records.

use chrono::{DateTime, Utc};
use gavel_core::{BiddingStatus, OrderId, PaymentMethod, ProductId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Product, keys};
use crate::persistence::Record;

/// One product line in the cart.
///
/// `unit_price` and `max_quantity` are snapshots taken when the product was
/// first added; later price or stock changes on the server do not move them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub max_quantity: u32,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub is_bidding: bool,
    #[serde(default)]
    pub bidding_status: Option<BiddingStatus>,
}

impl CartItem {
    /// New line with quantity 1, snapshotting price and stock.
    ///
    /// Callers validate availability first; a non-positive stock snapshots
    /// to a maximum of zero.
    #[must_use]
    pub fn from_product(product: &Product) -> Self {
        Self {
            id: product.id.clone(),
            name: product.name.clone(),
            image: product.image.clone(),
            unit_price: product.current_price,
            quantity: 1,
            max_quantity: u32::try_from(product.stock.max(0)).unwrap_or(u32::MAX),
            category: product.category.clone(),
            is_bidding: product.is_bidding,
            bidding_status: product.bidding_status,
        }
    }

    /// `unit_price * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

impl Record for Vec<CartItem> {
    const KEY: &'static str = keys::CART;
    const VERSION: u32 = 1;
}

/// What was bought in a completed checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRecord {
    pub items: Vec<CartItem>,
    pub total_price: Decimal,
    pub payment_method: PaymentMethod,
    pub timestamp: DateTime<Utc>,
}

/// Result of a successful checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseReceipt {
    pub order_id: OrderId,
    /// Reference handed back by the payment collaborator.
    pub payment_reference: String,
    #[serde(flatten)]
    pub record: PurchaseRecord,
}

/// Body for `POST /products/:id/purchase`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    pub quantity: u32,
    pub payment_method: PaymentMethod,
}

/// One line of a batch purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Body for `POST /products/purchase/batch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchPurchaseRequest {
    pub items: Vec<PurchaseLine>,
    pub payment_method: PaymentMethod,
}

impl BatchPurchaseRequest {
    /// One purchase line per cart item.
    #[must_use]
    pub fn from_items(items: &[CartItem], payment_method: PaymentMethod) -> Self {
        Self {
            items: items
                .iter()
                .map(|item| PurchaseLine {
                    product_id: item.id.clone(),
                    quantity: item.quantity,
                })
                .collect(),
            payment_method,
        }
    }
}
