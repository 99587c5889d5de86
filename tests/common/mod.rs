#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower::ServiceExt;

use restaurant_api::{
    auth::hash_password,
    config::AppConfig,
    db,
    entities::{menu_item, promotion, table, user},
    events::{self, EventSender},
    services::{
        menu::{
            CreateCategoryRequest, CreateMenuItemRequest, CreatePromotionRequest,
            CreateSubcategoryRequest,
        },
        tables::CreateTableRequest,
        today,
    },
    session::SESSION_HEADER,
    AppState,
};

const TEST_SECRET: &str = "kq83HdPz0vLw5TnX2bGmYcR7sJf4UeA9iKoN1tVhZyQx6WpMjBrDlEaSgC_-+=!@";

/// Helper harness for spinning up the application over a throwaway SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _db_dir: tempfile::TempDir,
    _event_task: tokio::task::JoinHandle<()>,
}

/// Status, session id and decoded JSON body of one request.
pub struct TestResponse {
    pub status: u16,
    pub session: Option<String>,
    pub body: Value,
}

impl TestResponse {
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }
}

pub fn money(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().expect("decimal string"),
        Value::Number(n) => n.to_string().parse().expect("decimal number"),
        other => panic!("not a money value: {other}"),
    }
}

/// A date far enough ahead to never be in the past.
pub fn next_week() -> NaiveDate {
    today() + Duration::days(7)
}

impl TestApp {
    pub async fn new() -> Self {
        let db_dir = tempfile::tempdir().expect("temp dir for test database");
        let db_path = db_dir.path().join("restaurant_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            TEST_SECRET.to_string(),
            3600,
            86_400,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 4;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_task = tokio::spawn(events::process_events(event_rx));
        let state = AppState::new(Arc::new(pool), cfg, EventSender::new(event_tx));
        let router = restaurant_api::app(state.clone());

        Self {
            router,
            state,
            _db_dir: db_dir,
            _event_task: event_task,
        }
    }

    /// Send a request with optional body, bearer token and session id.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
        session: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }
        if let Some(sid) = session {
            builder = builder.header(SESSION_HEADER, sid);
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request");
        decode(response).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(Method::GET, uri, None, token, None).await
    }

    pub async fn post(&self, uri: &str, body: Value, token: Option<&str>) -> TestResponse {
        self.send(Method::POST, uri, Some(body), token, None).await
    }

    pub async fn put(&self, uri: &str, body: Value, token: Option<&str>) -> TestResponse {
        self.send(Method::PUT, uri, Some(body), token, None).await
    }

    /// Registers a customer through the API and returns an access token.
    pub async fn customer_token(&self, email: &str) -> String {
        let register = self
            .post(
                "/api/v1/auth/register",
                json!({
                    "first_name": "Test",
                    "last_name": "Customer",
                    "email": email,
                    "phone": "57123456",
                    "password": "correct-horse",
                }),
                None,
            )
            .await;
        assert_eq!(register.status, 201, "register failed: {}", register.body);
        self.login(email, "correct-horse").await
    }

    /// Inserts an account with the given role and logs it in.
    pub async fn token_for_role(&self, email: &str, role: user::UserRole) -> String {
        user::ActiveModel {
            email: Set(email.to_string()),
            password_hash: Set(hash_password("correct-horse").expect("hash")),
            first_name: Set("Team".to_string()),
            last_name: Set("Member".to_string()),
            phone: Set("57000000".to_string()),
            address: Set(None),
            date_of_birth: Set(None),
            role: Set(role),
            is_active: Set(true),
            ..Default::default()
        }
        .insert(&*self.state.db)
        .await
        .expect("insert account");
        self.login(email, "correct-horse").await
    }

    pub async fn admin_token(&self) -> String {
        self.token_for_role("admin@gmail.com", user::UserRole::Admin)
            .await
    }

    pub async fn staff_token(&self) -> String {
        self.token_for_role("staff@gmail.com", user::UserRole::Staff)
            .await
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let login = self
            .post(
                "/api/v1/auth/login",
                json!({ "email": email, "password": password }),
                None,
            )
            .await;
        assert_eq!(login.status, 200, "login failed: {}", login.body);
        login.data()["tokens"]["access_token"]
            .as_str()
            .expect("access token")
            .to_string()
    }

    pub async fn seed_table(&self, number: i32, seats: i32) -> table::Model {
        self.state
            .services
            .tables
            .create(CreateTableRequest {
                table_number: number,
                seats,
                x_position: 0,
                y_position: 0,
            })
            .await
            .expect("seed table")
    }

    /// Seeds a category, subcategory and one item per `(name, price)`.
    pub async fn seed_menu(&self, items: &[(&str, Decimal)]) -> Vec<menu_item::Model> {
        let menu = &self.state.services.menu;
        let category = menu
            .create_category(CreateCategoryRequest {
                name: format!("Kitchen {}", items.len()),
                slug: None,
            })
            .await
            .expect("seed category");
        let subcategory = menu
            .create_subcategory(CreateSubcategoryRequest {
                category_id: category.id,
                name: "Plates".to_string(),
            })
            .await
            .expect("seed subcategory");

        let mut seeded = Vec::new();
        for (name, price) in items {
            let item = menu
                .create_item(CreateMenuItemRequest {
                    subcategory_id: subcategory.id,
                    name: name.to_string(),
                    description: String::new(),
                    price: *price,
                    image_url: None,
                    is_available: true,
                })
                .await
                .expect("seed menu item");
            seeded.push(item);
        }
        seeded
    }

    pub async fn seed_promotion(&self, item_id: i32, discount: Decimal) -> promotion::Model {
        self.state
            .services
            .menu
            .create_promotion(CreatePromotionRequest {
                item_id,
                title: "Test promotion".to_string(),
                description: String::new(),
                start_date: today() - Duration::days(1),
                end_date: today() + Duration::days(1),
                discount_percent: discount,
            })
            .await
            .expect("seed promotion")
    }
}

async fn decode(response: Response) -> TestResponse {
    let status = response.status().as_u16();
    let session = response
        .headers()
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    TestResponse {
        status,
        session,
        body,
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}
