//! Catalogue endpoints: query strings, response shapes, caching, images.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::extract::RawQuery;
use axum::routing::{get, post};
use axum::{Json, Router};
use gavel_client::api::{ImageError, ImagePolicy, ImageUpload, ProductApi, ProductQuery};
use gavel_client::models::ProductInput;
use gavel_core::{BiddingStatus, ProductId};
use gavel_integration_tests::{Recorder, TestContext, product_json};
use rust_decimal::Decimal;
use serde_json::json;

#[tokio::test]
async fn test_only_set_query_parameters_are_sent() {
    let queries: Recorder<Option<String>> = Recorder::default();
    let routes = Router::new().route(
        "/products",
        get({
            let queries = queries.clone();
            move |RawQuery(query): RawQuery| {
                let queries = queries.clone();
                async move {
                    queries.push(query);
                    Json(json!([product_json("p1", 10.0, 1)]))
                }
            }
        }),
    );
    let ctx = TestContext::new(routes).await.unwrap();
    let market = ctx.open().unwrap();

    let page = market
        .api()
        .list_products(&ProductQuery::new())
        .await
        .unwrap();
    assert_eq!(page.products.len(), 1);
    assert!(page.pagination.is_none());

    market
        .api()
        .list_products(
            &ProductQuery::new()
                .search("oak chair")
                .bidding_status(BiddingStatus::Active)
                .page(2),
        )
        .await
        .unwrap();

    assert_eq!(
        queries.snapshot(),
        vec![
            None,
            Some("search=oak+chair&biddingStatus=active&page=2".to_string())
        ]
    );
}

#[tokio::test]
async fn test_paged_listing_decodes() {
    let routes = Router::new().route(
        "/products",
        get(|| async {
            Json(json!({
                "products": [product_json("p1", 10.0, 1), product_json("p2", 12.5, 4)],
                "pagination": { "page": 1, "pages": 3, "totalProducts": 25 }
            }))
        }),
    );
    let ctx = TestContext::new(routes).await.unwrap();
    let market = ctx.open().unwrap();

    let page = market
        .api()
        .list_products(&ProductQuery::new().limit(2))
        .await
        .unwrap();
    assert_eq!(page.products.len(), 2);
    assert_eq!(page.products[1].current_price, Decimal::new(125, 1));

    let pagination = page.pagination.unwrap();
    assert_eq!(pagination.total_pages, 3);
    assert_eq!(pagination.total, 25);
}

#[tokio::test]
async fn test_categories_are_cached_until_catalogue_changes() {
    let hits = Arc::new(AtomicUsize::new(0));
    let routes = Router::new()
        .route(
            "/products/util/categories",
            get({
                let hits = Arc::clone(&hits);
                move || {
                    hits.fetch_add(1, Ordering::SeqCst);
                    async { Json(json!(["antiques", "furniture"])) }
                }
            }),
        )
        .route(
            "/products",
            post(|| async { Json(json!({ "product": product_json("p3", 7.0, 1) })) }),
        );
    let ctx = TestContext::new(routes).await.unwrap();
    let market = ctx.open().unwrap();

    assert_eq!(
        market.api().categories().await.unwrap(),
        vec!["antiques", "furniture"]
    );
    market.api().categories().await.unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    let created = market
        .api()
        .create_product(&ProductInput {
            name: "Brass lamp".to_string(),
            description: None,
            image: None,
            current_price: Decimal::from(7),
            stock: 1,
            category: Some("lighting".to_string()),
            is_bidding: false,
            bidding_end_time: None,
        })
        .await
        .unwrap();
    assert_eq!(created.id, ProductId::new("p3"));

    market.api().categories().await.unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_bid_history_accepts_wrapped_listing() {
    let routes = Router::new().route(
        "/products/{id}/bids",
        get(|| async {
            Json(json!({
                "bids": [
                    { "amount": 12, "bidder": { "_id": "u2", "username": "bo" }, "timestamp": "2026-03-01T10:00:00Z" },
                    { "amount": 10, "bidder": "u3" }
                ]
            }))
        }),
    );
    let ctx = TestContext::new(routes).await.unwrap();
    let market = ctx.open().unwrap();

    let bids = market.api().bids(&ProductId::new("p1")).await.unwrap();
    assert_eq!(bids.len(), 2);
    assert_eq!(bids[0].amount, Decimal::from(12));
    assert!(bids[0].created_at.is_some());
    assert!(bids[1].created_at.is_none());
}

#[tokio::test]
async fn test_image_upload_is_validated_before_sending() {
    let uploads = Arc::new(AtomicUsize::new(0));
    let routes = Router::new()
        .route(
            "/images/config",
            get(|| async {
                Json(json!({ "maxFileSize": 16, "allowedTypes": ["image/png"] }))
            }),
        )
        .route(
            "/images/upload",
            post({
                let uploads = Arc::clone(&uploads);
                move || {
                    uploads.fetch_add(1, Ordering::SeqCst);
                    async { Json(json!({ "imageUrl": "https://img.example.com/up.png" })) }
                }
            }),
        );
    let ctx = TestContext::new(routes).await.unwrap();
    let market = ctx.open().unwrap();

    let policy: ImagePolicy = market.api().image_policy().await.unwrap();
    assert_eq!(policy.max_file_size, 16);

    let too_big = ImageUpload {
        file_name: "big.png".to_string(),
        content_type: "image/png".to_string(),
        bytes: vec![0; 32],
    };
    let err = market.api().upload_image(&policy, too_big).await.unwrap_err();
    assert!(matches!(err, ImageError::TooLarge { size: 32, max: 16 }));

    let wrong_type = ImageUpload {
        file_name: "doc.pdf".to_string(),
        content_type: "application/pdf".to_string(),
        bytes: vec![1; 8],
    };
    assert!(matches!(
        market.api().upload_image(&policy, wrong_type).await,
        Err(ImageError::UnsupportedType(_))
    ));
    assert_eq!(uploads.load(Ordering::SeqCst), 0);

    let ok = ImageUpload {
        file_name: "small.png".to_string(),
        content_type: "image/png".to_string(),
        bytes: vec![1; 8],
    };
    let uploaded = market.api().upload_image(&policy, ok).await.unwrap();
    assert_eq!(uploaded.url, "https://img.example.com/up.png");
    assert_eq!(uploads.load(Ordering::SeqCst), 1);
}
