#![allow(dead_code)]

use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use market_api::app::build_router;
use market_api::config::{AppEnv, Config};
use market_api::repos::Repos;
use market_api::services::id_codec::DEFAULT_ALPHABET;
use market_api::state::AppState;

pub fn config() -> Config {
    Config {
        addr: "127.0.0.1:0".parse().unwrap(),
        database_url: String::new(),
        database_max_connections: 1,
        app_env: AppEnv::Development,
        cors_allowed_origins: Vec::new(),
        request_timeout: Duration::from_secs(30),
        body_limit_bytes: 1024 * 1024,
        sqids_min_length: 10,
        sqids_alphabet: DEFAULT_ALPHABET.to_string(),
        jwt_secret: "integration-test-secret".to_string(),
        token_ttl_seconds: 7 * 24 * 60 * 60,
        token_leeway_seconds: 60,
        // cheap argon2 settings; production defaults are far slower
        password_hash_memory_kib: 1024,
        password_hash_iterations: 1,
    }
}

pub struct TestApp {
    pub router: Router,
    pub config: Config,
}

pub struct User {
    pub token: String,
    pub id: String,
}

impl TestApp {
    pub fn new() -> Self {
        let config = config();
        let state = AppState::from_config(&config, Repos::in_memory()).unwrap();
        let router = build_router(state, &config);
        Self { router, config }
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let res = self.router.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn signup(&self, name: &str) -> User {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/auth/signup",
                None,
                Some(json!({
                    "firstName": name,
                    "lastName": "Tester",
                    "email": format!("{name}@example.com"),
                    "password": "correct-horse",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        User {
            token: body["data"]["token"].as_str().unwrap().to_string(),
            id: body["data"]["user"]["id"].as_str().unwrap().to_string(),
        }
    }

    pub async fn category(&self, token: &str, name: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/categories",
                Some(token),
                Some(json!({ "name": name })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["category"]["id"].as_str().unwrap().to_string()
    }

    /// Creates a listing; `extra` overrides fields of the default payload.
    pub async fn product(&self, token: &str, category: &str, extra: Value) -> String {
        let mut payload = json!({
            "title": "Heirloom tomatoes",
            "description": "Vine ripened, picked this morning",
            "category": category,
            "images": ["https://img.example/tomato.jpg"],
            "price": 4.5,
            "unit": "kg",
            "quantityAvailable": 30,
            "location": { "address": "12 Orchard Lane", "city": "Springfield", "state": "IL" },
            "isOrganic": true,
            "tags": ["tomato"],
        });
        if let (Some(base), Some(extra)) = (payload.as_object_mut(), extra.as_object()) {
            for (k, v) in extra {
                base.insert(k.clone(), v.clone());
            }
        }

        let (status, body) = self
            .send(Method::POST, "/api/products", Some(token), Some(payload))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["product"]["id"].as_str().unwrap().to_string()
    }
}

pub fn address() -> Value {
    json!({
        "street": "1 Market Street",
        "city": "Springfield",
        "state": "IL",
        "zipCode": "62701",
        "country": "US",
    })
}
