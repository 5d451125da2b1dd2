//! Product, bid and listing types.

use chrono::{DateTime, Utc};
use gavel_core::{BiddingStatus, ProductId};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use super::{MissingId, document_id};

/// A product as returned by the products endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "ProductWire")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub current_price: Decimal,
    pub starting_price: Option<Decimal>,
    pub stock: i64,
    pub category: Option<String>,
    pub is_bidding: bool,
    pub bidding_status: Option<BiddingStatus>,
    pub bidding_end_time: Option<DateTime<Utc>>,
    /// Set when the product is held for an auction winner. The backend sends
    /// an email, an id or a flag here, so any truthy JSON value counts.
    pub reserved_for_winner: bool,
    pub highest_bidder: Option<serde_json::Value>,
    pub seller: Option<serde_json::Value>,
}

/// Wire shape of [`Product`]. Documents may carry `_id`, `id` or both.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductWire {
    #[serde(default, rename = "_id")]
    document_id: Option<ProductId>,
    #[serde(default)]
    id: Option<ProductId>,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    image: Option<String>,
    current_price: Decimal,
    #[serde(default)]
    starting_price: Option<Decimal>,
    #[serde(default)]
    stock: i64,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    is_bidding: bool,
    #[serde(default)]
    bidding_status: Option<BiddingStatus>,
    #[serde(default)]
    bidding_end_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "truthy")]
    reserved_for_winner: bool,
    #[serde(default)]
    highest_bidder: Option<serde_json::Value>,
    #[serde(default)]
    seller: Option<serde_json::Value>,
}

impl TryFrom<ProductWire> for Product {
    type Error = MissingId;

    fn try_from(wire: ProductWire) -> Result<Self, Self::Error> {
        Ok(Self {
            id: document_id(wire.document_id, wire.id)?,
            name: wire.name,
            description: wire.description,
            image: wire.image,
            current_price: wire.current_price,
            starting_price: wire.starting_price,
            stock: wire.stock,
            category: wire.category,
            is_bidding: wire.is_bidding,
            bidding_status: wire.bidding_status,
            bidding_end_time: wire.bidding_end_time,
            reserved_for_winner: wire.reserved_for_winner,
            highest_bidder: wire.highest_bidder,
            seller: wire.seller,
        })
    }
}

impl Product {
    /// Whether the auction on this product is over at `now`.
    ///
    /// Non-bidding products never "end". A bidding product has ended when its
    /// status says so or when its end time has been reached.
    #[must_use]
    pub fn bidding_ended_at(&self, now: DateTime<Utc>) -> bool {
        if !self.is_bidding {
            return false;
        }
        if self.bidding_status.is_some_and(BiddingStatus::is_closed) {
            return true;
        }
        self.bidding_end_time.is_some_and(|end| now >= end)
    }

    /// Whether the product is held for an auction winner.
    #[must_use]
    pub fn is_reserved(&self) -> bool {
        self.reserved_for_winner || self.bidding_status == Some(BiddingStatus::Reserved)
    }
}

fn truthy<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    use serde_json::Value;

    Ok(match Value::deserialize(deserializer)? {
        Value::Null => false,
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    })
}

/// Body for creating or replacing a product.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub current_price: Decimal,
    pub stock: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub is_bidding: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bidding_end_time: Option<DateTime<Utc>>,
}

/// Body for `POST /products/:id/bid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BidRequest {
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

/// A single bid in a product's bid history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bid {
    pub amount: Decimal,
    #[serde(default)]
    pub bidder: Option<serde_json::Value>,
    #[serde(default, alias = "timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Page metadata for product listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default)]
    pub page: u32,
    #[serde(default, alias = "pages")]
    pub total_pages: u32,
    #[serde(default, alias = "totalProducts")]
    pub total: u64,
}

/// One page of `GET /products`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub pagination: Option<Pagination>,
}

impl<'de> Deserialize<'de> for ProductPage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Bare(Vec<Product>),
            Paged {
                products: Vec<Product>,
                #[serde(default)]
                pagination: Option<Pagination>,
            },
        }

        Ok(match Wire::deserialize(deserializer)? {
            Wire::Bare(products) => Self {
                products,
                pagination: None,
            },
            Wire::Paged {
                products,
                pagination,
            } => Self {
                products,
                pagination,
            },
        })
    }
}

/// A list response that may arrive bare or wrapped in an object.
///
/// Endpoints disagree on whether they answer `[...]` or `{"users": [...]}`;
/// both decode to the same vector.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
    Bare(Vec<T>),
    Wrapped {
        #[serde(
            alias = "products",
            alias = "categories",
            alias = "users",
            alias = "bids"
        )]
        data: Vec<T>,
    },
}

impl<T> Listing<T> {
    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::Bare(items) | Self::Wrapped { data: items } => items,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use chrono::Duration;

    /// Minimal in-stock product for tests across the crate.
    pub(crate) fn product(id: &str, price: Decimal, stock: i64) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            description: None,
            image: Some(format!("https://img.example.com/{id}.jpg")),
            current_price: price,
            starting_price: None,
            stock,
            category: Some("antiques".to_string()),
            is_bidding: false,
            bidding_status: None,
            bidding_end_time: None,
            reserved_for_winner: false,
            highest_bidder: None,
            seller: None,
        }
    }

    #[test]
    fn test_product_decodes_backend_shape() {
        let json = r#"{
            "_id": "p1",
            "name": "Oak chair",
            "currentPrice": 49.5,
            "stock": 2,
            "isBidding": true,
            "biddingStatus": "active",
            "biddingEndTime": "2030-01-01T12:00:00Z",
            "reservedForWinner": "winner@example.com"
        }"#;
        let p: Product = serde_json::from_str(json).unwrap();
        assert_eq!(p.id.as_str(), "p1");
        assert_eq!(p.current_price, Decimal::new(495, 1));
        assert!(p.reserved_for_winner);
        assert!(p.is_reserved());
    }

    #[test]
    fn test_product_with_both_ids_decodes() {
        let json = r#"{"_id":"p1","id":"p1","name":"Oak chair","currentPrice":10,"stock":1}"#;
        let p: Product = serde_json::from_str(json).unwrap();
        assert_eq!(p.id.as_str(), "p1");

        let p: Product =
            serde_json::from_str(r#"{"id":"p2","name":"Lamp","currentPrice":3}"#).unwrap();
        assert_eq!(p.id.as_str(), "p2");

        let err = serde_json::from_str::<Product>(r#"{"name":"Lamp","currentPrice":3}"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_listing_with_both_ids_decodes() {
        let json = r#"[
            {"_id":"p1","id":"p1","name":"Oak chair","currentPrice":10},
            {"_id":"p2","name":"Lamp","currentPrice":3}
        ]"#;
        let listing: Listing<Product> = serde_json::from_str(json).unwrap();
        let ids: Vec<_> = listing.into_vec().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![ProductId::new("p1"), ProductId::new("p2")]);
    }

    #[test]
    fn test_falsy_reservation_values() {
        for raw in ["null", "false", "\"\"", "0"] {
            let json = format!(
                r#"{{"_id":"p","name":"n","currentPrice":1,"reservedForWinner":{raw}}}"#
            );
            let p: Product = serde_json::from_str(&json).unwrap();
            assert!(!p.reserved_for_winner, "{raw} should not reserve");
        }
    }

    #[test]
    fn test_bidding_ended_rules() {
        let now = Utc::now();
        let mut p = product("p1", Decimal::from(10), 1);
        assert!(!p.bidding_ended_at(now));

        p.is_bidding = true;
        assert!(!p.bidding_ended_at(now));

        p.bidding_end_time = Some(now + Duration::hours(1));
        assert!(!p.bidding_ended_at(now));

        p.bidding_end_time = Some(now - Duration::hours(1));
        assert!(p.bidding_ended_at(now));

        p.bidding_end_time = Some(now + Duration::hours(1));
        p.bidding_status = Some(BiddingStatus::Sold);
        assert!(p.bidding_ended_at(now));
    }

    #[test]
    fn test_product_page_bare_and_paged() {
        let bare: ProductPage =
            serde_json::from_str(r#"[{"_id":"p1","name":"a","currentPrice":1}]"#).unwrap();
        assert_eq!(bare.products.len(), 1);
        assert!(bare.pagination.is_none());

        let paged: ProductPage = serde_json::from_str(
            r#"{"products":[],"pagination":{"page":2,"pages":5,"total":48}}"#,
        )
        .unwrap();
        assert_eq!(
            paged.pagination,
            Some(Pagination {
                page: 2,
                total_pages: 5,
                total: 48
            })
        );
    }

    #[test]
    fn test_listing_accepts_wrapped_and_bare() {
        let wrapped: Listing<String> =
            serde_json::from_str(r#"{"categories":["art","books"]}"#).unwrap();
        assert_eq!(wrapped.into_vec(), vec!["art", "books"]);

        let bare: Listing<String> = serde_json::from_str(r#"["art"]"#).unwrap();
        assert_eq!(bare.into_vec(), vec!["art"]);
    }

    #[test]
    fn test_bid_request_sends_number() {
        let body = serde_json::to_value(BidRequest {
            amount: Decimal::new(1250, 2),
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"amount": 12.5}));
    }
}
