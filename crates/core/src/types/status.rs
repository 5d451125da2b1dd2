//! Role and status enums shared by the stores and the API client.

use serde::{Deserialize, Serialize};

/// Account role assigned by the marketplace backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular shopper account.
    #[default]
    User,
    /// Can manage users and products.
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

/// Auction state of a product.
///
/// Values the backend does not know about yet deserialize as `Other` so a
/// product listing never fails to decode because of a new status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiddingStatus {
    /// Accepting bids.
    Active,
    /// Bidding closed without a sale being recorded yet.
    Ended,
    /// Sold to the winning bidder.
    Sold,
    /// Held for the winning bidder to complete the purchase.
    Reserved,
    #[serde(other)]
    Other,
}

impl BiddingStatus {
    /// Whether this status alone marks the auction as finished.
    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Ended | Self::Sold)
    }

    /// Query-string representation used by the products endpoint.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Ended => "ended",
            Self::Sold => "sold",
            Self::Reserved => "reserved",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for BiddingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BiddingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "ended" => Ok(Self::Ended),
            "sold" => Ok(Self::Sold),
            "reserved" => Ok(Self::Reserved),
            _ => Err(format!("invalid bidding status: {s}")),
        }
    }
}

/// How a cart checkout is paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Card,
    Paypal,
    BankTransfer,
    CashOnDelivery,
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Card => write!(f, "card"),
            Self::Paypal => write!(f, "paypal"),
            Self::BankTransfer => write!(f, "bank_transfer"),
            Self::CashOnDelivery => write!(f, "cash_on_delivery"),
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "card" => Ok(Self::Card),
            "paypal" => Ok(Self::Paypal),
            "bank_transfer" => Ok(Self::BankTransfer),
            "cash_on_delivery" => Ok(Self::CashOnDelivery),
            _ => Err(format!("invalid payment method: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_str() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(Role::User.to_string(), "user");
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn test_unknown_bidding_status_decodes_as_other() {
        let status: BiddingStatus = serde_json::from_str("\"paused\"").unwrap();
        assert_eq!(status, BiddingStatus::Other);

        let status: BiddingStatus = serde_json::from_str("\"reserved\"").unwrap();
        assert_eq!(status, BiddingStatus::Reserved);
    }

    #[test]
    fn test_closed_statuses() {
        assert!(BiddingStatus::Ended.is_closed());
        assert!(BiddingStatus::Sold.is_closed());
        assert!(!BiddingStatus::Active.is_closed());
        assert!(!BiddingStatus::Reserved.is_closed());
    }

    #[test]
    fn test_payment_method_serde() {
        let json = serde_json::to_string(&PaymentMethod::BankTransfer).unwrap();
        assert_eq!(json, "\"bank_transfer\"");
        assert_eq!(PaymentMethod::default(), PaymentMethod::Card);
    }
}
