mod common;

use axum::http::{Method, StatusCode};
use serde_json::{Value, json};

use common::{TestApp, User, address};

struct Market {
    app: TestApp,
    seller: User,
    buyer: User,
    product: String,
}

async fn market() -> Market {
    let app = TestApp::new();
    let seller = app.signup("farmer").await;
    let buyer = app.signup("buyer").await;
    let category = app.category(&seller.token, "Vegetables").await;
    let product = app.product(&seller.token, &category, json!({})).await;
    Market {
        app,
        seller,
        buyer,
        product,
    }
}

async fn place(app: &TestApp, token: &str, product: &str, quantity: i64) -> (StatusCode, Value) {
    app.send(
        Method::POST,
        "/api/orders",
        Some(token),
        Some(json!({
            "items": [{ "product": product, "quantity": quantity }],
            "deliveryAddress": address(),
            "deliveryType": "pickup",
        })),
    )
    .await
}

async fn place_lines(app: &TestApp, token: &str, items: Value) -> (StatusCode, Value) {
    app.send(
        Method::POST,
        "/api/orders",
        Some(token),
        Some(json!({ "items": items, "deliveryAddress": address(), "deliveryType": "pickup" })),
    )
    .await
}

async fn stock(app: &TestApp, product: &str) -> (i64, i64) {
    let (_, body) = app.get(&format!("/api/products/{product}"), None).await;
    let product = &body["data"]["product"];
    (
        product["quantityAvailable"].as_i64().unwrap(),
        product["buys"].as_i64().unwrap(),
    )
}

async fn set_status(app: &TestApp, token: &str, order: &str, status: &str) -> (StatusCode, Value) {
    app.send(
        Method::PATCH,
        &format!("/api/orders/{order}/status"),
        Some(token),
        Some(json!({ "status": status })),
    )
    .await
}

async fn delivered_order(m: &Market) -> String {
    let (status, body) = place(&m.app, &m.buyer.token, &m.product, 1).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let order = body["data"]["order"]["id"].as_str().unwrap().to_string();
    for next in ["confirmed", "preparing", "ready-for-pickup", "delivered"] {
        let (status, body) = set_status(&m.app, &m.seller.token, &order, next).await;
        assert_eq!(status, StatusCode::OK, "{next}: {body}");
    }
    order
}

async fn rating(app: &TestApp, product: &str) -> Value {
    let (_, body) = app.get(&format!("/api/products/{product}"), None).await;
    body["data"]["product"]["rating"].clone()
}

#[tokio::test]
async fn placing_an_order_snapshots_items() {
    let m = market().await;
    let (status, body) = place(&m.app, &m.buyer.token, &m.product, 2).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let order = &body["data"]["order"];
    assert_eq!(order["status"], "pending");
    assert_eq!(order["paymentStatus"], "pending");
    assert_eq!(order["buyer"], m.buyer.id.as_str());
    assert_eq!(order["seller"], m.seller.id.as_str());
    assert_eq!(order["totalAmount"], 9.0);
    assert_eq!(order["items"][0]["product"], m.product.as_str());
    assert_eq!(order["items"][0]["productName"], "Heirloom tomatoes");
    assert_eq!(order["items"][0]["subtotal"], 9.0);
    assert!(order["orderNumber"].as_str().unwrap().starts_with("ORD-"));
}

#[tokio::test]
async fn order_creation_rejects_bad_requests() {
    let m = market().await;

    let (status, _) = place(&m.app, &m.seller.token, &m.product, 1).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = place(&m.app, &m.buyer.token, &m.product, 31).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("Insufficient quantity"));

    let (status, _) = place(&m.app, &m.buyer.token, &m.product, 0).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = m
        .app
        .send(
            Method::POST,
            "/api/orders",
            Some(&m.buyer.token),
            Some(json!({ "items": [], "deliveryAddress": address(), "deliveryType": "pickup" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
}

#[tokio::test]
async fn repeated_lines_are_checked_after_merging() {
    let m = market().await;

    let (status, body) = place_lines(
        &m.app,
        &m.buyer.token,
        json!([
            { "product": m.product, "quantity": i64::MAX },
            { "product": m.product, "quantity": i64::MAX },
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, body) = place_lines(
        &m.app,
        &m.buyer.token,
        json!([
            { "product": m.product, "quantity": 600_000 },
            { "product": m.product, "quantity": 600_000 },
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Quantity is too large");

    // 20 + 20 against 30 in stock
    let (status, body) = place_lines(
        &m.app,
        &m.buyer.token,
        json!([
            { "product": m.product, "quantity": 20 },
            { "product": m.product, "quantity": 20 },
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("Insufficient quantity"));

    let (status, body) = place_lines(
        &m.app,
        &m.buyer.token,
        json!([
            { "product": m.product, "quantity": 10 },
            { "product": m.product, "quantity": 5 },
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let items = body["data"]["order"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["quantity"], 15);
}

#[tokio::test]
async fn placed_orders_hold_stock_until_cancelled() {
    let m = market().await;
    assert_eq!(stock(&m.app, &m.product).await, (30, 0));

    let (_, body) = place(&m.app, &m.buyer.token, &m.product, 25).await;
    let first = body["data"]["order"]["id"].as_str().unwrap().to_string();
    assert_eq!(stock(&m.app, &m.product).await, (5, 25));

    let (status, body) = place(&m.app, &m.buyer.token, &m.product, 6).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("Insufficient quantity"));

    let (_, body) = place(&m.app, &m.buyer.token, &m.product, 5).await;
    let second = body["data"]["order"]["id"].as_str().unwrap().to_string();
    assert_eq!(stock(&m.app, &m.product).await, (0, 30));

    let (status, _) = set_status(&m.app, &m.buyer.token, &first, "cancelled").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stock(&m.app, &m.product).await, (25, 5));

    // deleting the cancelled order must not give the stock back twice
    let (status, _) = m
        .app
        .send(Method::DELETE, &format!("/api/orders/{first}"), Some(&m.buyer.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stock(&m.app, &m.product).await, (25, 5));

    let (status, _) = m
        .app
        .send(Method::DELETE, &format!("/api/orders/{second}"), Some(&m.buyer.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stock(&m.app, &m.product).await, (30, 0));
}

#[tokio::test]
async fn only_parties_can_read_an_order() {
    let m = market().await;
    let outsider = m.app.signup("outsider").await;
    let (_, body) = place(&m.app, &m.buyer.token, &m.product, 1).await;
    let uri = format!("/api/orders/{}", body["data"]["order"]["id"].as_str().unwrap());

    let (status, _) = m.app.get(&uri, Some(&m.buyer.token)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = m.app.get(&uri, Some(&m.seller.token)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = m.app.get(&uri, Some(&outsider.token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "You are not authorized to view this order");
}

#[tokio::test]
async fn lifecycle_follows_the_transition_graph() {
    let m = market().await;
    let (_, body) = place(&m.app, &m.buyer.token, &m.product, 1).await;
    let order = body["data"]["order"]["id"].as_str().unwrap().to_string();

    let (status, _) = set_status(&m.app, &m.buyer.token, &order, "confirmed").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = set_status(&m.app, &m.seller.token, &order, "delivered").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = set_status(&m.app, &m.seller.token, &order, "shipped").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for next in ["confirmed", "preparing", "ready-for-pickup"] {
        let (status, body) = set_status(&m.app, &m.seller.token, &order, next).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["data"]["order"]["status"], next);
    }

    // pickup orders never go in transit
    let (status, _) = set_status(&m.app, &m.seller.token, &order, "in-transit").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = set_status(&m.app, &m.buyer.token, &order, "cancelled").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = set_status(&m.app, &m.seller.token, &order, "delivered").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = set_status(&m.app, &m.seller.token, &order, "cancelled").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn buyer_may_cancel_then_delete_a_pending_order() {
    let m = market().await;
    let (_, body) = place(&m.app, &m.buyer.token, &m.product, 1).await;
    let order = body["data"]["order"]["id"].as_str().unwrap().to_string();

    let (status, body) = m
        .app
        .send(
            Method::PATCH,
            &format!("/api/orders/{order}/status"),
            Some(&m.buyer.token),
            Some(json!({ "status": "cancelled", "cancelReason": "Changed my mind" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["order"]["cancelReason"], "Changed my mind");

    let uri = format!("/api/orders/{order}");
    let (status, _) = m.app.send(Method::DELETE, &uri, Some(&m.seller.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = m.app.send(Method::DELETE, &uri, Some(&m.buyer.token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = m.app.get(&uri, Some(&m.buyer.token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn details_are_editable_only_while_pending() {
    let m = market().await;
    let (_, body) = place(&m.app, &m.buyer.token, &m.product, 1).await;
    let order = body["data"]["order"]["id"].as_str().unwrap().to_string();
    let uri = format!("/api/orders/{order}");

    let (status, body) = m
        .app
        .send(
            Method::PUT,
            &uri,
            Some(&m.buyer.token),
            Some(json!({ "notes": "Leave at the gate", "totalAmount": 0 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["order"]["notes"], "Leave at the gate");
    assert_eq!(body["data"]["order"]["totalAmount"], 4.5);

    set_status(&m.app, &m.seller.token, &order, "confirmed").await;
    let (status, _) = m
        .app
        .send(Method::PUT, &uri, Some(&m.buyer.token), Some(json!({ "notes": null })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn listing_is_scoped_by_role() {
    let m = market().await;
    place(&m.app, &m.buyer.token, &m.product, 1).await;

    let (_, mine) = m.app.get("/api/orders", Some(&m.buyer.token)).await;
    assert_eq!(mine["data"]["orders"].as_array().unwrap().len(), 1);

    let (_, sold) = m.app.get("/api/orders?role=seller", Some(&m.seller.token)).await;
    assert_eq!(sold["data"]["orders"].as_array().unwrap().len(), 1);

    let (_, none) = m.app.get("/api/orders?role=seller", Some(&m.buyer.token)).await;
    assert_eq!(none["data"]["orders"].as_array().unwrap().len(), 0);

    let (_, filtered) = m
        .app
        .get("/api/orders?status=delivered", Some(&m.buyer.token))
        .await;
    assert_eq!(filtered["data"]["pagination"]["total"], 0);
}

#[tokio::test]
async fn reviews_keep_the_rating_aggregate_exact() {
    let m = market().await;

    let (_, pending) = place(&m.app, &m.buyer.token, &m.product, 1).await;
    let (status, body) = m
        .app
        .send(
            Method::POST,
            "/api/reviews",
            Some(&m.buyer.token),
            Some(json!({
                "order": pending["data"]["order"]["id"],
                "product": m.product,
                "rating": 5,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "You can only review delivered orders");

    let first_order = delivered_order(&m).await;
    let (status, body) = m
        .app
        .send(
            Method::POST,
            "/api/reviews",
            Some(&m.buyer.token),
            Some(json!({ "order": first_order, "product": m.product, "rating": 4 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let first = body["data"]["review"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["review"]["reviewee"], m.seller.id.as_str());
    assert_eq!(body["data"]["review"]["isVerifiedPurchase"], true);
    assert_eq!(rating(&m.app, &m.product).await, json!({ "average": 4.0, "count": 1 }));

    let (status, _) = m
        .app
        .send(
            Method::POST,
            "/api/reviews",
            Some(&m.buyer.token),
            Some(json!({ "order": first_order, "product": m.product, "rating": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let second_order = delivered_order(&m).await;
    let (_, body) = m
        .app
        .send(
            Method::POST,
            "/api/reviews",
            Some(&m.buyer.token),
            Some(json!({ "order": second_order, "product": m.product, "rating": 5 })),
        )
        .await;
    let second = body["data"]["review"]["id"].as_str().unwrap().to_string();
    assert_eq!(rating(&m.app, &m.product).await, json!({ "average": 4.5, "count": 2 }));

    let (status, _) = m
        .app
        .send(
            Method::PUT,
            &format!("/api/reviews/{first}"),
            Some(&m.seller.token),
            Some(json!({ "rating": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = m
        .app
        .send(
            Method::PUT,
            &format!("/api/reviews/{first}"),
            Some(&m.buyer.token),
            Some(json!({ "rating": 2 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rating(&m.app, &m.product).await, json!({ "average": 3.5, "count": 2 }));

    let (status, _) = m
        .app
        .send(
            Method::DELETE,
            &format!("/api/reviews/{second}"),
            Some(&m.buyer.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rating(&m.app, &m.product).await, json!({ "average": 2.0, "count": 1 }));

    let (_, list) = m
        .app
        .get(&format!("/api/products/{}/reviews", m.product), None)
        .await;
    assert_eq!(list["data"]["reviews"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn only_the_reviewee_can_respond() {
    let m = market().await;
    let order = delivered_order(&m).await;
    let (_, body) = m
        .app
        .send(
            Method::POST,
            "/api/reviews",
            Some(&m.buyer.token),
            Some(json!({ "order": order, "product": m.product, "rating": 5, "comment": "Great" })),
        )
        .await;
    let review = body["data"]["review"]["id"].as_str().unwrap().to_string();
    let uri = format!("/api/reviews/{review}/response");

    let (status, _) = m
        .app
        .send(Method::POST, &uri, Some(&m.buyer.token), Some(json!({ "text": "Me too" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = m
        .app
        .send(Method::POST, &uri, Some(&m.seller.token), Some(json!({ "text": "Thanks!" })))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["review"]["response"]["text"], "Thanks!");

    let (status, body) = m.app.get(&format!("/api/reviews/{review}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["review"]["comment"], "Great");
}
