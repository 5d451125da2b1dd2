//! Catalogue and auction commands.

use clap::Args;
use gavel_client::Marketplace;
use gavel_client::api::{ProductApi, ProductQuery};
use gavel_client::models::{BidRequest, Product};
use gavel_core::{BiddingStatus, Email, ProductId, UserId};
use rust_decimal::Decimal;
use tracing::info;

use super::{CommandError, money, require_login};

/// Filters for `products list`.
#[derive(Debug, Args)]
pub struct ListArgs {
    #[arg(short, long)]
    search: Option<String>,

    #[arg(short, long)]
    category: Option<String>,

    #[arg(long)]
    min_price: Option<Decimal>,

    #[arg(long)]
    max_price: Option<Decimal>,

    /// `active`, `ended`, `sold` or `reserved`
    #[arg(long)]
    status: Option<BiddingStatus>,

    #[arg(long)]
    sort: Option<String>,

    /// Only products listed by this user id
    #[arg(long)]
    user: Option<String>,

    #[arg(long)]
    page: Option<u32>,

    #[arg(long)]
    limit: Option<u32>,
}

impl ListArgs {
    pub fn into_query(self) -> ProductQuery {
        let mut query = ProductQuery::new().price_range(self.min_price, self.max_price);
        if let Some(search) = self.search {
            query = query.search(search);
        }
        if let Some(category) = self.category {
            query = query.category(category);
        }
        if let Some(status) = self.status {
            query = query.bidding_status(status);
        }
        if let Some(sort) = self.sort {
            query = query.sort_by(sort);
        }
        if let Some(user) = self.user {
            query = query.user(UserId::new(user));
        }
        if let Some(page) = self.page {
            query = query.page(page);
        }
        if let Some(limit) = self.limit {
            query = query.limit(limit);
        }
        query
    }
}

/// One-line summary of a product.
fn summary(product: &Product) -> String {
    let mut line = format!(
        "{}  {}  {}  stock={}",
        product.id,
        product.name,
        money(product.current_price),
        product.stock
    );
    if product.is_bidding {
        let status = product
            .bidding_status
            .map_or("auction", BiddingStatus::as_str);
        line.push_str(&format!("  [{status}]"));
    }
    if product.is_reserved() {
        line.push_str("  [reserved]");
    }
    line
}

fn print_products(products: &[Product]) {
    if products.is_empty() {
        info!("No products found");
        return;
    }
    for product in products {
        info!("{}", summary(product));
    }
}

pub async fn list(market: &Marketplace, query: &ProductQuery) -> Result<(), CommandError> {
    let page = market.api().list_products(query).await?;
    print_products(&page.products);
    if let Some(pagination) = page.pagination {
        info!(
            "Page {} of {} ({} products)",
            pagination.page, pagination.total_pages, pagination.total
        );
    }
    Ok(())
}

pub async fn show(market: &Marketplace, id: &ProductId) -> Result<(), CommandError> {
    let product = market.api().get_product(id).await?;
    info!("{}", summary(&product));
    if let Some(description) = &product.description {
        info!("{description}");
    }
    if let Some(category) = &product.category {
        info!("Category: {category}");
    }
    if let Some(end) = product.bidding_end_time {
        info!("Bidding ends: {end}");
    }
    if market.cart().is_in_cart(id) {
        info!("In your cart: {}", market.cart().quantity_of(id));
    }
    Ok(())
}

pub async fn categories(market: &Marketplace) -> Result<(), CommandError> {
    for category in market.api().categories().await? {
        info!("{category}");
    }
    Ok(())
}

pub async fn active(market: &Marketplace) -> Result<(), CommandError> {
    print_products(&market.api().active_auctions().await?);
    Ok(())
}

/// Products reserved for `email`, or for the logged-in user.
pub async fn reserved(market: &Marketplace, email: Option<&str>) -> Result<(), CommandError> {
    let email = match email {
        Some(email) => Email::parse(email)?,
        None => {
            require_login(market)?;
            let user = market
                .session()
                .current_user()
                .ok_or(CommandError::NotLoggedIn)?;
            let stored = match user.email {
                Some(email) => email,
                None => market
                    .session()
                    .fetch_user_profile()
                    .await?
                    .email
                    .unwrap_or_default(),
            };
            Email::parse(&stored)?
        }
    };

    print_products(&market.api().reserved_for(&email).await?);
    Ok(())
}

pub async fn bids(market: &Marketplace, id: &ProductId) -> Result<(), CommandError> {
    let bids = market.api().bids(id).await?;
    if bids.is_empty() {
        info!("No bids yet");
    }
    for bid in bids {
        let when = bid
            .created_at
            .map_or_else(|| "-".to_owned(), |t| t.to_rfc3339());
        let bidder = bid.bidder.map_or_else(|| "-".to_owned(), |b| bidder_name(&b));
        info!("{}  {bidder}  {when}", money(bid.amount));
    }
    Ok(())
}

/// Bidders arrive either as an id string or a populated user object.
fn bidder_name(bidder: &serde_json::Value) -> String {
    match bidder {
        serde_json::Value::String(id) => id.clone(),
        serde_json::Value::Object(user) => user
            .get("username")
            .or_else(|| user.get("email"))
            .or_else(|| user.get("_id"))
            .and_then(serde_json::Value::as_str)
            .unwrap_or("-")
            .to_owned(),
        other => other.to_string(),
    }
}

pub async fn bid(market: &Marketplace, id: &ProductId, amount: Decimal) -> Result<(), CommandError> {
    require_login(market)?;
    let ack = market.api().place_bid(id, BidRequest { amount }).await?;
    info!(
        "{}",
        ack.message
            .unwrap_or_else(|| format!("Bid of {} placed", money(amount)))
    );
    Ok(())
}

pub async fn status(market: &Marketplace) -> Result<(), CommandError> {
    let report = market.api().bidding_status().await?;
    info!(
        "{}",
        serde_json::to_string_pretty(&report).unwrap_or_else(|_| report.to_string())
    );
    Ok(())
}
