//! `/products` endpoints: catalogue, bidding and purchases.

use async_trait::async_trait;
use gavel_core::{BiddingStatus, Email, ProductId, UserId};
#[cfg(test)]
use mockall::automock;
use reqwest::Method;
use rust_decimal::Decimal;
use tracing::{debug, instrument};

use super::{ApiClient, ApiError, Single, segment};
use crate::models::{
    ApiMessage, BatchPurchaseRequest, Bid, BidRequest, Listing, Product, ProductInput,
    ProductPage, PurchaseRequest,
};

const CATEGORIES_KEY: &str = "categories";

/// Filters for `GET /products`.
///
/// Every parameter is optional and only sent when set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub price_min: Option<Decimal>,
    pub price_max: Option<Decimal>,
    pub bidding_status: Option<BiddingStatus>,
    pub sort_by: Option<String>,
    pub user_id: Option<UserId>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ProductQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub const fn price_range(mut self, min: Option<Decimal>, max: Option<Decimal>) -> Self {
        self.price_min = min;
        self.price_max = max;
        self
    }

    #[must_use]
    pub const fn bidding_status(mut self, status: BiddingStatus) -> Self {
        self.bidding_status = Some(status);
        self
    }

    #[must_use]
    pub fn sort_by(mut self, sort_by: impl Into<String>) -> Self {
        self.sort_by = Some(sort_by.into());
        self
    }

    #[must_use]
    pub fn user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    #[must_use]
    pub const fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Query-string pairs for the parameters that are set.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(search) = &self.search {
            pairs.push(("search", search.clone()));
        }
        if let Some(category) = &self.category {
            pairs.push(("category", category.clone()));
        }
        if let Some(min) = self.price_min {
            pairs.push(("priceMin", min.to_string()));
        }
        if let Some(max) = self.price_max {
            pairs.push(("priceMax", max.to_string()));
        }
        if let Some(status) = self.bidding_status {
            pairs.push(("biddingStatus", status.to_string()));
        }
        if let Some(sort_by) = &self.sort_by {
            pairs.push(("sortBy", sort_by.clone()));
        }
        if let Some(user_id) = &self.user_id {
            pairs.push(("userId", user_id.to_string()));
        }
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        pairs
    }
}

/// Catalogue, bidding and purchase endpoints.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ProductApi: Send + Sync {
    /// `GET /products`
    async fn list_products(&self, query: &ProductQuery) -> Result<ProductPage, ApiError>;

    /// `GET /products/:id`
    async fn get_product(&self, id: &ProductId) -> Result<Product, ApiError>;

    /// `POST /products`
    async fn create_product(&self, input: &ProductInput) -> Result<Product, ApiError>;

    /// `PUT /products/:id`
    async fn update_product(
        &self,
        id: &ProductId,
        input: &ProductInput,
    ) -> Result<Product, ApiError>;

    /// `DELETE /products/:id`
    async fn delete_product(&self, id: &ProductId) -> Result<ApiMessage, ApiError>;

    /// `POST /products/:id/bid`
    async fn place_bid(&self, id: &ProductId, bid: BidRequest) -> Result<ApiMessage, ApiError>;

    /// `GET /products/:id/bids`
    async fn bids(&self, id: &ProductId) -> Result<Vec<Bid>, ApiError>;

    /// `GET /products/bidding/active`
    async fn active_auctions(&self) -> Result<Vec<Product>, ApiError>;

    /// `GET /products/reserved/:userEmail`
    async fn reserved_for(&self, email: &Email) -> Result<Vec<Product>, ApiError>;

    /// `GET /products/util/categories`
    async fn categories(&self) -> Result<Vec<String>, ApiError>;

    /// `GET /products/bidding/status`
    async fn bidding_status(&self) -> Result<serde_json::Value, ApiError>;

    /// `POST /products/:id/purchase`
    async fn purchase_product(
        &self,
        id: &ProductId,
        request: PurchaseRequest,
    ) -> Result<ApiMessage, ApiError>;

    /// `POST /products/purchase/batch`
    async fn purchase_batch(&self, request: &BatchPurchaseRequest)
    -> Result<ApiMessage, ApiError>;
}

fn product_path(id: &ProductId) -> String {
    format!("/products/{}", segment(id.as_str()))
}

#[async_trait]
impl ProductApi for ApiClient {
    #[instrument(skip(self))]
    async fn list_products(&self, query: &ProductQuery) -> Result<ProductPage, ApiError> {
        let request = self.request(Method::GET, "/products", &query.to_pairs())?;
        self.send(request).await
    }

    #[instrument(skip(self))]
    async fn get_product(&self, id: &ProductId) -> Result<Product, ApiError> {
        let product: Single<Product> = self.get(&product_path(id)).await?;
        Ok(product.into_inner())
    }

    #[instrument(skip_all, fields(name = %input.name))]
    async fn create_product(&self, input: &ProductInput) -> Result<Product, ApiError> {
        let product: Single<Product> = self.post("/products", input).await?;
        self.inner.categories.invalidate_all();
        Ok(product.into_inner())
    }

    #[instrument(skip(self, input))]
    async fn update_product(
        &self,
        id: &ProductId,
        input: &ProductInput,
    ) -> Result<Product, ApiError> {
        let product: Single<Product> = self.put(&product_path(id), input).await?;
        self.inner.categories.invalidate_all();
        Ok(product.into_inner())
    }

    #[instrument(skip(self))]
    async fn delete_product(&self, id: &ProductId) -> Result<ApiMessage, ApiError> {
        let ack = self.delete(&product_path(id)).await?;
        self.inner.categories.invalidate_all();
        Ok(ack)
    }

    #[instrument(skip(self))]
    async fn place_bid(&self, id: &ProductId, bid: BidRequest) -> Result<ApiMessage, ApiError> {
        self.post(&format!("{}/bid", product_path(id)), &bid).await
    }

    #[instrument(skip(self))]
    async fn bids(&self, id: &ProductId) -> Result<Vec<Bid>, ApiError> {
        let listing: Listing<Bid> = self.get(&format!("{}/bids", product_path(id))).await?;
        Ok(listing.into_vec())
    }

    #[instrument(skip(self))]
    async fn active_auctions(&self) -> Result<Vec<Product>, ApiError> {
        let listing: Listing<Product> = self.get("/products/bidding/active").await?;
        Ok(listing.into_vec())
    }

    #[instrument(skip(self))]
    async fn reserved_for(&self, email: &Email) -> Result<Vec<Product>, ApiError> {
        let path = format!("/products/reserved/{}", segment(email.as_str()));
        let listing: Listing<Product> = self.get(&path).await?;
        Ok(listing.into_vec())
    }

    #[instrument(skip(self))]
    async fn categories(&self) -> Result<Vec<String>, ApiError> {
        if let Some(cached) = self.inner.categories.get(CATEGORIES_KEY).await {
            debug!("Category cache hit");
            return Ok(cached);
        }

        let listing: Listing<String> = self.get("/products/util/categories").await?;
        let categories = listing.into_vec();
        self.inner
            .categories
            .insert(CATEGORIES_KEY, categories.clone())
            .await;
        Ok(categories)
    }

    #[instrument(skip(self))]
    async fn bidding_status(&self) -> Result<serde_json::Value, ApiError> {
        self.get("/products/bidding/status").await
    }

    #[instrument(skip(self))]
    async fn purchase_product(
        &self,
        id: &ProductId,
        request: PurchaseRequest,
    ) -> Result<ApiMessage, ApiError> {
        self.post(&format!("{}/purchase", product_path(id)), &request)
            .await
    }

    #[instrument(skip_all, fields(lines = request.items.len()))]
    async fn purchase_batch(
        &self,
        request: &BatchPurchaseRequest,
    ) -> Result<ApiMessage, ApiError> {
        self.post("/products/purchase/batch", request).await
    }
}
