#![allow(dead_code)]

use argon2::password_hash::{PasswordHasher, SaltString};
use argon2::Argon2;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use time::OffsetDateTime;
use tokio::sync::OnceCell;
use tower::ServiceExt;
use uuid::Uuid;

use lazo::app::auth;
use lazo::config::AppConfig;
use lazo::infra::db::Db;
use lazo::AppState;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

// 32 bytes base64-encoded (test-only key — NOT used in production)
// "0123456789abcdef0123456789abcdef" (32 bytes)
const TEST_TOKEN_KEY: &str = "MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY=";
pub const DEFAULT_PASSWORD: &str = "testpassword123";

// ---------------------------------------------------------------------------
// TestApp — shared, lazily initialized once per test binary
// ---------------------------------------------------------------------------

pub struct TestApp {
    router: Router,
    pub state: AppState,
}

pub struct TestResponse {
    pub status: StatusCode,
    body_bytes: axum::body::Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body_bytes).unwrap_or(Value::Null)
    }

    pub fn error_message(&self) -> String {
        self.json()["message"].as_str().unwrap_or("").to_string()
    }
}

pub struct TestUser {
    pub id: Uuid,
    pub nick: String,
    pub email: String,
    pub token: String,
}

static TEST_APP: OnceCell<Option<TestApp>> = OnceCell::const_new();

/// Get (or lazily create) the shared TestApp instance. Returns `None` when
/// TEST_DATABASE_BASE_URL is not set, so the integration suite is skipped
/// on machines without a Postgres to test against.
pub async fn app() -> Option<&'static TestApp> {
    TEST_APP
        .get_or_init(|| async {
            let base_url = std::env::var("TEST_DATABASE_BASE_URL").ok()?;
            Some(TestApp::setup(&base_url).await)
        })
        .await
        .as_ref()
}

impl TestApp {
    // ------------------------------------------------------------------
    // Setup — runs once per test binary
    // ------------------------------------------------------------------
    async fn setup(base_url: &str) -> Self {
        let test_db =
            std::env::var("TEST_DATABASE_NAME").unwrap_or_else(|_| "lazo_test".into());

        // ---- Create test database if needed ----
        let admin_pool = PgPool::connect(&format!("{}/postgres", base_url))
            .await
            .expect("cannot connect to postgres admin database");

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
                .bind(&test_db)
                .fetch_one(&admin_pool)
                .await
                .expect("failed to check test db existence");

        if !exists {
            // CREATE DATABASE cannot run inside a transaction
            sqlx::query(&format!("CREATE DATABASE \"{}\"", test_db))
                .execute(&admin_pool)
                .await
                .expect("failed to create test database");
        }
        admin_pool.close().await;

        // ---- Connect to test database ----
        let database_url = format!("{}/{}", base_url, test_db);
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&database_url)
            .await
            .expect("cannot connect to test database");

        // ---- Run migrations ----
        let mut migration_files: Vec<_> = std::fs::read_dir("migrations")
            .expect("cannot read migrations/")
            .filter_map(Result::ok)
            .filter(|e| e.path().extension().map_or(false, |ext| ext == "sql"))
            .collect();
        migration_files.sort_by_key(|e| e.file_name());

        for entry in &migration_files {
            let sql = std::fs::read_to_string(entry.path())
                .unwrap_or_else(|_| panic!("cannot read {:?}", entry.path()));
            sqlx::raw_sql(&sql)
                .execute(&db_pool)
                .await
                .unwrap_or_else(|e| panic!("migration {:?} failed: {}", entry.file_name(), e));
        }

        // ---- Truncate all tables for clean test state ----
        sqlx::raw_sql(
            "DO $$ DECLARE r RECORD; BEGIN \
             FOR r IN (SELECT tablename FROM pg_tables WHERE schemaname = 'public') LOOP \
             EXECUTE 'TRUNCATE TABLE ' || quote_ident(r.tablename) || ' CASCADE'; \
             END LOOP; END $$;",
        )
        .execute(&db_pool)
        .await
        .expect("failed to truncate tables");

        db_pool.close().await;

        // ---- Build AppState via AppConfig (same code path as production) ----
        assert_eq!(STANDARD.decode(TEST_TOKEN_KEY).unwrap().len(), 32);

        std::env::set_var("DATABASE_URL", &database_url);
        std::env::set_var("TOKEN_KEY", TEST_TOKEN_KEY);
        std::env::set_var("TOKEN_TTL_DAYS", "7");
        std::env::set_var("DB_MAX_CONNECTIONS", "10");
        std::env::set_var("DB_CONNECT_TIMEOUT_SECONDS", "30");
        // Each #[tokio::test] creates a separate tokio runtime, but the pool
        // is shared via OnceCell.  Connections created in one runtime become
        // stale when that runtime is dropped.  Setting idle_timeout to 0 forces
        // the pool to discard all idle connections on acquire and create fresh
        // ones in the current runtime.
        std::env::set_var("DB_IDLE_TIMEOUT_SECONDS", "0");

        let config = AppConfig::from_env().expect("failed to build AppConfig");

        let db = Db::connect(&config).await.expect("Db::connect failed");

        let state = AppState {
            db,
            token_key: config.token_key,
            token_ttl_days: config.token_ttl_days,
        };

        let router = lazo::http::router(state.clone());

        TestApp { router, state }
    }

    // ------------------------------------------------------------------
    // Low-level request helper
    // ------------------------------------------------------------------
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("host", "localhost");

        for &(key, value) in headers {
            builder = builder.header(key, value);
        }

        let request = if let Some(body) = body {
            builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap()
        } else {
            builder.body(Body::empty()).unwrap()
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot failed");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to collect body")
            .to_bytes();

        TestResponse { status, body_bytes }
    }

    // ------------------------------------------------------------------
    // Convenience HTTP helpers
    // ------------------------------------------------------------------
    pub async fn get(&self, path: &str, token: Option<&str>) -> TestResponse {
        let mut headers = vec![];
        let auth;
        if let Some(t) = token {
            auth = format!("Bearer {}", t);
            headers.push(("Authorization", auth.as_str()));
        }
        self.request(Method::GET, path, None, &headers).await
    }

    pub async fn post_json(&self, path: &str, body: Value, token: Option<&str>) -> TestResponse {
        let mut headers = vec![];
        let auth;
        if let Some(t) = token {
            auth = format!("Bearer {}", t);
            headers.push(("Authorization", auth.as_str()));
        }
        self.request(Method::POST, path, Some(body), &headers).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> TestResponse {
        let mut headers = vec![];
        let auth;
        if let Some(t) = token {
            auth = format!("Bearer {}", t);
            headers.push(("Authorization", auth.as_str()));
        }
        self.request(Method::DELETE, path, None, &headers).await
    }

    // ------------------------------------------------------------------
    // Test data helpers
    // ------------------------------------------------------------------

    /// Create a user directly in the DB and issue a token for them.
    pub async fn create_user(&self, suffix: &str) -> TestUser {
        let nick = format!("testuser_{}", suffix);
        let email = format!("test_{}@example.com", suffix);
        let name = format!("Test {}", suffix);
        let password = DEFAULT_PASSWORD;

        // Hash password with Argon2 (same algorithm as production)
        let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .expect("password hash failed")
            .to_string();

        let pool = self.state.db.pool();

        let user_id: Uuid = sqlx::query_scalar(
            "INSERT INTO users (name, last_name, nick, email, password_hash) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(&name)
        .bind("User")
        .bind(&nick)
        .bind(&email)
        .bind(&hash)
        .fetch_one(pool)
        .await
        .expect("insert test user failed");

        let token = auth::create_token(
            &self.state.token_key,
            self.state.token_ttl_days,
            user_id,
            auth::DEFAULT_ROLE,
        )
        .expect("create token failed");

        TestUser {
            id: user_id,
            nick,
            email,
            token,
        }
    }

    /// Insert a publication directly in DB. Returns its id.
    pub async fn create_publication(&self, author_id: Uuid, text: &str) -> Uuid {
        let publication_id: Uuid = sqlx::query_scalar(
            "INSERT INTO publications (author_id, text) VALUES ($1, $2) RETURNING id",
        )
        .bind(author_id)
        .bind(text)
        .fetch_one(self.state.db.pool())
        .await
        .expect("insert test publication failed");
        publication_id
    }

    /// Insert a publication with an explicit timestamp, for ordering tests.
    pub async fn create_publication_at(
        &self,
        author_id: Uuid,
        text: &str,
        created_at: OffsetDateTime,
    ) -> Uuid {
        let publication_id: Uuid = sqlx::query_scalar(
            "INSERT INTO publications (author_id, text, created_at) \
             VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(author_id)
        .bind(text)
        .bind(created_at)
        .fetch_one(self.state.db.pool())
        .await
        .expect("insert test publication failed");
        publication_id
    }

    /// Return the pool for direct DB assertions.
    pub fn pool(&self) -> &PgPool {
        self.state.db.pool()
    }
}
