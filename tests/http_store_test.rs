use std::time::Duration;

use assert_matches::assert_matches;
use chrono::{TimeZone, Utc};
use cinema_promotions::{
    errors::{ConflictField, ServiceError},
    models::{
        DiscountType, ListQuery, PromotionInput, PromotionPatch, PromotionStatus, SortKey,
    },
    store::{HttpPromotionStore, PromotionStore},
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn promotion_json(slug: &str, code: &str) -> Value {
    json!({
        "_id": format!("65f0{}", slug.len()),
        "slug": slug,
        "title": "Weekend 20% Off",
        "code": code,
        "discountType": "percentage",
        "discountValue": 20,
        "startDate": "2026-03-01T00:00:00Z",
        "endDate": "2026-03-31T23:59:59Z",
        "maxUsage": 100,
        "currentUsage": 3,
        "status": "active",
        "shareCount": 7,
        "createdAt": "2026-02-20T10:00:00Z"
    })
}

fn input() -> PromotionInput {
    PromotionInput {
        title: "Weekend 20% Off".into(),
        slug: "weekend-20-off".into(),
        description: None,
        image: None,
        code: "WEEKEND20".into(),
        discount_type: DiscountType::Percentage,
        discount_value: Decimal::from(20),
        start_date: Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap(),
        end_date: Utc.with_ymd_and_hms(2026, 3, 31, 23, 59, 59).unwrap(),
        max_usage: 100,
        status: PromotionStatus::Active,
        content: Vec::new(),
    }
}

async fn store_for(server: &MockServer, token: Option<&str>) -> HttpPromotionStore {
    HttpPromotionStore::new(&format!("{}/api", server.uri()), Duration::from_secs(5))
        .unwrap()
        .with_token(token.map(str::to_string))
}

#[tokio::test]
async fn list_sends_paging_and_no_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/promotions"))
        .and(query_param("page", "2"))
        .and(query_param("limit", "5"))
        .and(query_param("sort", "-createdAt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [promotion_json("weekend-20-off", "WEEKEND20")],
            "pagination": {"page": 2, "totalPages": 3, "total": 11, "limit": 5}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server, Some("tok-123")).await;
    let page = store
        .list(&ListQuery {
            page: 2,
            limit: 5,
            sort: SortKey::newest_first(),
        })
        .await
        .unwrap();

    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].id, "65f014");
    assert_eq!(page.items[0].share_count, 7);
    assert_eq!(page.pagination.total_items, 11);
    assert_eq!(page.pagination.current_page, 2);

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn list_without_pagination_block_computes_one() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/promotions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [
                promotion_json("a", "A"),
                promotion_json("b", "B"),
                promotion_json("c", "C")
            ]
        })))
        .mount(&server)
        .await;

    let store = store_for(&server, None).await;
    let page = store.list(&ListQuery::page(1, 2)).await.unwrap();
    assert_eq!(page.pagination.total_pages, 2);
    assert_eq!(page.pagination.total_items, 3);
}

#[tokio::test]
async fn create_sends_bearer_token_and_camel_case_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/promotions"))
        .and(header("authorization", "Bearer tok-123"))
        .and(body_partial_json(json!({
            "slug": "weekend-20-off",
            "discountType": "percentage",
            "maxUsage": 100,
            "status": "active"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "success": true,
            "data": promotion_json("weekend-20-off", "WEEKEND20")
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server, Some("tok-123")).await;
    let created = store.create(&input()).await.unwrap();
    assert_eq!(created.slug, "weekend-20-off");
    assert_eq!(created.status, PromotionStatus::Active);
}

#[tokio::test]
async fn mutations_without_session_never_reach_the_server() {
    let server = MockServer::start().await;
    let store = store_for(&server, None).await;

    assert_matches!(store.create(&input()).await, Err(ServiceError::Unauthorized(_)));
    assert_matches!(
        store
            .update("weekend-20-off", &PromotionPatch::status_only(PromotionStatus::Expired))
            .await,
        Err(ServiceError::Unauthorized(_))
    );
    assert_matches!(
        store.delete("weekend-20-off").await,
        Err(ServiceError::Unauthorized(_))
    );

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn success_false_is_a_failure_even_with_200() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/promotions/weekend-20-off"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "message": "End date must be after start date"
        })))
        .mount(&server)
        .await;

    let store = store_for(&server, Some("tok-123")).await;
    let err = store
        .update(
            "weekend-20-off",
            &PromotionPatch::status_only(PromotionStatus::Expired),
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ExternalApiError { status: Some(200), .. });
}

#[tokio::test]
async fn structured_conflict_names_the_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/promotions"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "success": false,
            "message": "Duplicate key",
            "error": {"kind": "conflict", "field": "slug", "message": "slug already taken"}
        })))
        .mount(&server)
        .await;

    let store = store_for(&server, Some("tok-123")).await;
    let err = store.create(&input()).await.unwrap_err();
    assert_matches!(
        err,
        ServiceError::Conflict {
            field: ConflictField::Slug,
            ref message,
        } if message == "slug already taken"
    );
}

#[tokio::test]
async fn legacy_duplicate_message_falls_back_to_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/promotions"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "success": false,
            "message": "Promotion with this code already exists"
        })))
        .mount(&server)
        .await;

    let store = store_for(&server, Some("tok-123")).await;
    assert_matches!(
        store.create(&input()).await,
        Err(ServiceError::Conflict {
            field: ConflictField::Code,
            ..
        })
    );
}

#[tokio::test]
async fn missing_promotion_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/promotions/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .mount(&server)
        .await;

    let store = store_for(&server, None).await;
    assert_matches!(
        store.get_by_slug("gone").await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn share_returns_new_count() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/promotions/weekend-20-off/share"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"shareCount": 8}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server, None).await;
    assert_eq!(store.increment_share_count("weekend-20-off").await.unwrap(), 8);
}

#[tokio::test]
async fn unreadable_success_body_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/promotions/weekend-20-off"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let store = store_for(&server, None).await;
    assert_matches!(
        store.get_by_slug("weekend-20-off").await,
        Err(ServiceError::InvalidResponse(_))
    );
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let base = format!("http://127.0.0.1:{}/api", port);

    let store = HttpPromotionStore::new(&base, Duration::from_secs(2)).unwrap();
    assert_matches!(
        store.list(&ListQuery::default()).await,
        Err(ServiceError::NetworkError(_))
    );
}
