mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::TestApp;
use market_api::services::id_codec::{DEFAULT_ALPHABET, IdCodec};

#[tokio::test]
async fn only_the_seller_can_update_or_delete_a_listing() {
    let app = TestApp::new();
    let seller = app.signup("seller").await;
    let other = app.signup("other").await;
    let category = app.category(&seller.token, "Vegetables").await;
    let product = app.product(&seller.token, &category, json!({})).await;
    let uri = format!("/api/products/{product}");

    let (status, body) = app
        .send(Method::PUT, &uri, Some(&other.token), Some(json!({ "price": 1.0 })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");

    let (status, _) = app.send(Method::DELETE, &uri, Some(&other.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send(
            Method::PUT,
            &uri,
            Some(&seller.token),
            Some(json!({ "price": 6.25, "title": "Cherry tomatoes", "seller": other.id })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["product"]["price"], 6.25);
    assert_eq!(body["data"]["product"]["title"], "Cherry tomatoes");
    assert_eq!(body["data"]["product"]["seller"]["id"], seller.id.as_str());
    assert_eq!(body["data"]["product"]["seller"]["firstName"], "seller");

    let (status, _) = app.send(Method::DELETE, &uri, Some(&seller.token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get(&uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn writes_require_a_token() {
    let app = TestApp::new();
    let (status, body) = app
        .send(Method::POST, "/api/products", None, Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Access denied. No token provided.");
}

#[tokio::test]
async fn listing_paginates_fifteen_products() {
    let app = TestApp::new();
    let seller = app.signup("bulk").await;
    let category = app.category(&seller.token, "Fruits").await;
    for i in 0..15 {
        app.product(&seller.token, &category, json!({ "title": format!("Apple {i}") }))
            .await;
    }

    let (status, first) = app.get("/api/products?page=1&limit=10", None).await;
    assert_eq!(status, StatusCode::OK, "{first}");
    assert_eq!(first["data"]["products"].as_array().unwrap().len(), 10);
    assert_eq!(first["data"]["pagination"]["hasMore"], true);
    assert_eq!(first["data"]["pagination"]["total"], 15);
    assert_eq!(first["data"]["pagination"]["totalPages"], 2);

    let (_, second) = app.get("/api/products?page=2&limit=10", None).await;
    assert_eq!(second["data"]["products"].as_array().unwrap().len(), 5);
    assert_eq!(second["data"]["pagination"]["hasMore"], false);
    assert_eq!(second["data"]["pagination"]["currentPage"], 2);
}

#[tokio::test]
async fn price_filter_is_inclusive() {
    let app = TestApp::new();
    let seller = app.signup("pricer").await;
    let category = app.category(&seller.token, "Dairy").await;
    for price in [5.0, 10.0, 15.0, 20.0, 25.0] {
        app.product(&seller.token, &category, json!({ "price": price }))
            .await;
    }

    let (status, body) = app
        .get("/api/products?minPrice=10&maxPrice=20&sortBy=price&sortOrder=asc", None)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let prices: Vec<f64> = body["data"]["products"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["price"].as_f64().unwrap())
        .collect();
    assert_eq!(prices, vec![10.0, 15.0, 20.0]);
}

#[tokio::test]
async fn search_and_status_filters() {
    let app = TestApp::new();
    let seller = app.signup("searcher").await;
    let category = app.category(&seller.token, "Grains").await;
    app.product(&seller.token, &category, json!({ "title": "Sweet corn", "tags": [] }))
        .await;
    app.product(&seller.token, &category, json!({ "title": "Basmati rice", "tags": [] }))
        .await;
    app.product(
        &seller.token,
        &category,
        json!({ "title": "Old corn", "tags": [], "status": "out-of-stock" }),
    )
    .await;

    let (_, body) = app.get("/api/products?search=CORN", None).await;
    let titles: Vec<&str> = body["data"]["products"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Sweet corn"]);

    let (_, body) = app.get("/api/products?status=out-of-stock", None).await;
    assert_eq!(body["data"]["products"].as_array().unwrap().len(), 1);

    let (status, _) = app.get("/api/products?sortBy=colour", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn deleting_a_product_removes_it_from_listed_products() {
    let app = TestApp::new();
    let seller = app.signup("lister").await;
    let category = app.category(&seller.token, "Herbs").await;
    let kept = app.product(&seller.token, &category, json!({})).await;
    let dropped = app.product(&seller.token, &category, json!({})).await;

    let (_, me) = app.get("/api/auth/me", Some(&seller.token)).await;
    assert_eq!(me["data"]["user"]["productsListed"], json!([kept, dropped]));

    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/api/products/{dropped}"),
            Some(&seller.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, me) = app.get("/api/auth/me", Some(&seller.token)).await;
    assert_eq!(me["data"]["user"]["productsListed"], json!([kept]));
}

#[tokio::test]
async fn my_products_lists_only_own_listings() {
    let app = TestApp::new();
    let alice = app.signup("alice").await;
    let bob = app.signup("bob").await;
    let category = app.category(&alice.token, "Eggs").await;
    let mine = app.product(&alice.token, &category, json!({})).await;
    app.product(&bob.token, &category, json!({})).await;

    let (status, body) = app
        .get("/api/products/seller/my-products", Some(&alice.token))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let products = body["data"]["products"].as_array().unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0]["id"], mine.as_str());
}

#[tokio::test]
async fn seller_and_category_are_embedded() {
    let app = TestApp::new();
    let seller = app.signup("grower").await;
    let (_, body) = app
        .send(
            Method::POST,
            "/api/categories",
            Some(&seller.token),
            Some(json!({ "name": "Berries", "description": "Small fruit" })),
        )
        .await;
    let category = body["data"]["category"]["id"].as_str().unwrap().to_string();
    let product = app.product(&seller.token, &category, json!({})).await;

    let (_, list) = app.get("/api/products", None).await;
    let listed = &list["data"]["products"][0];
    assert_eq!(
        listed["seller"],
        json!({ "id": seller.id, "firstName": "grower", "lastName": "Tester" })
    );
    assert_eq!(listed["category"], json!({ "id": category, "name": "Berries" }));

    let (_, detail) = app.get(&format!("/api/products/{product}"), None).await;
    let detail = &detail["data"]["product"];
    assert_eq!(detail["seller"]["email"], "grower@example.com");
    assert_eq!(detail["seller"]["lastName"], "Tester");
    assert_eq!(
        detail["category"],
        json!({ "id": category, "name": "Berries", "description": "Small fruit" })
    );
}

#[tokio::test]
async fn categories_show_their_parent() {
    let app = TestApp::new();
    let user = app.signup("taxonomist").await;
    let parent = app.category(&user.token, "Produce").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/categories",
            Some(&user.token),
            Some(json!({ "name": "Root vegetables", "parentCategory": parent })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(
        body["data"]["category"]["parentCategory"],
        json!({ "id": parent, "name": "Produce" })
    );
    let child = body["data"]["category"]["id"].as_str().unwrap().to_string();

    let (_, body) = app.get(&format!("/api/categories/{child}"), None).await;
    assert_eq!(body["data"]["category"]["parentCategory"]["name"], "Produce");

    let (_, list) = app.get("/api/categories", None).await;
    let categories = list["data"]["categories"].as_array().unwrap();
    let top = categories.iter().find(|c| c["id"] == parent.as_str()).unwrap();
    assert!(top["parentCategory"].is_null());
}

#[tokio::test]
async fn detail_counts_views() {
    let app = TestApp::new();
    let seller = app.signup("viewer").await;
    let category = app.category(&seller.token, "Honey").await;
    let product = app.product(&seller.token, &category, json!({})).await;
    let uri = format!("/api/products/{product}");

    let (_, first) = app.get(&uri, None).await;
    let (_, second) = app.get(&uri, None).await;
    assert_eq!(first["data"]["product"]["views"], 0);
    assert_eq!(second["data"]["product"]["views"], 1);
}

#[tokio::test]
async fn malformed_and_unknown_ids() {
    let app = TestApp::new();
    let seller = app.signup("ids").await;

    let (status, body) = app.get("/api/products/@@@", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid product ID");

    let codec = IdCodec::new(10, DEFAULT_ALPHABET).unwrap();
    let missing = codec.encode(9_999).unwrap();
    let (status, body) = app.get(&format!("/api/products/{missing}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Product not found");

    let (status, body) = app
        .send(
            Method::POST,
            "/api/products",
            Some(&seller.token),
            Some(json!({
                "title": "Leeks",
                "description": "Fresh",
                "category": missing,
                "images": ["https://img.example/leek.jpg"],
                "price": 2.0,
                "unit": "bunch",
                "quantityAvailable": 5,
                "location": { "address": "1 Road", "city": "Town", "state": "ST" },
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["message"], "Category not found");
}

#[tokio::test]
async fn seeding_categories_is_idempotent() {
    let app = TestApp::new();

    let (status, first) = app.send(Method::POST, "/api/categories/seed", None, None).await;
    assert_eq!(status, StatusCode::CREATED, "{first}");
    let created = first["data"]["categories"].as_array().unwrap().len();
    assert!(created > 0);

    let (_, second) = app.send(Method::POST, "/api/categories/seed", None, None).await;
    assert_eq!(second["data"]["categories"], json!([]));

    let (_, list) = app.get("/api/categories", None).await;
    assert_eq!(list["data"]["categories"].as_array().unwrap().len(), created);
}

#[tokio::test]
async fn category_in_use_cannot_be_deleted() {
    let app = TestApp::new();
    let seller = app.signup("keeper").await;
    let category = app.category(&seller.token, "Mushrooms").await;
    app.product(&seller.token, &category, json!({})).await;

    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/api/categories/{category}"),
            Some(&seller.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn category_names_are_unique_ignoring_case() {
    let app = TestApp::new();
    let user = app.signup("curator").await;
    app.category(&user.token, "Spices").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/categories",
            Some(&user.token),
            Some(json!({ "name": "  spices " })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Category already exists");
}
