//! End-to-end HTTP tests against the in-memory store and the in-process cache.

use std::time::Duration;

use photocap_server::config::StorageBackend;
use photocap_server::{AppConfig, AppState, CacheBackend, build_app};
use reqwest::StatusCode;
use serde_json::{Value, json};
use tokio::sync::oneshot;

struct TestApp {
    base: String,
    client: reqwest::Client,
    cache: CacheBackend,
    _shutdown: oneshot::Sender<()>,
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn register(&self, name: &str, email: &str, password: &str) -> Value {
        let res = self
            .client
            .post(self.url("/users"))
            .json(&json!({ "name": name, "email": email, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        res.json().await.unwrap()
    }

    async fn login(&self, email: &str, password: &str) -> String {
        let res = self
            .client
            .post(self.url("/users/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let header = res
            .headers()
            .get("authorization")
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["token"], json!(header));
        header
    }

    async fn create_photo(&self, token: &str, url: &str) -> Value {
        let res = self
            .client
            .post(self.url("/photos"))
            .bearer_auth(token)
            .json(&json!({ "name": "Monkey", "url": url, "citation": "NASA" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        res.json().await.unwrap()
    }

    async fn create_caption(&self, token: &str, photo_id: &str, comment: &str) -> Value {
        let res = self
            .client
            .post(self.url("/captions"))
            .bearer_auth(token)
            .json(&json!({ "photoId": photo_id, "comment": comment }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        res.json().await.unwrap()
    }

    async fn get_json(&self, path: &str) -> (StatusCode, Value) {
        let res = self.client.get(self.url(path)).send().await.unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn cached(&self, key: &str) -> Option<Value> {
        self.cache
            .get(key)
            .await
            .unwrap()
            .map(|bytes| serde_json::from_slice(&bytes).unwrap())
    }
}

fn test_config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.storage.backend = StorageBackend::Memory;
    cfg.redis.enabled = false;
    cfg.auth.jwt_secret = "integration-test-secret".into();
    cfg
}

async fn start_with_cache(cache: CacheBackend) -> TestApp {
    let cfg = test_config();
    let store = photocap_db_memory::create_primary_store();
    let app = build_app(AppState::new(store, cache.clone(), &cfg), &cfg);

    // Bind to an ephemeral port
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await;
    });

    TestApp {
        base: format!("http://{addr}"),
        client: reqwest::Client::new(),
        cache,
        _shutdown: tx,
    }
}

async fn start() -> TestApp {
    start_with_cache(CacheBackend::new_local()).await
}

#[tokio::test]
async fn health_endpoints_and_fallback() {
    let app = start().await;

    let res = app.client.get(app.url("/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));

    let (status, body) = app.get_json("/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));

    let (status, _) = app.get_json("/readyz").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get_json("/no/such/route").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Not Found" }));
}

#[tokio::test]
async fn login_logout_lifecycle() {
    let app = start().await;
    let user = app.register("Ann", "a@b.com", "p@ssw0rd").await;
    assert!(user.get("password").is_none());
    assert!(user.get("passwordHash").is_none());
    let id = user["id"].as_str().unwrap().to_string();

    let token = app.login("a@b.com", "p@ssw0rd").await;
    assert!(app.cache.get(&format!("token_{token}")).await.unwrap().is_some());

    let res = app
        .client
        .get(app.url(&format!("/users/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .client
        .post(app.url("/users/logout"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "message": "Logout successful" }));
    assert!(app.cache.get(&format!("token_{token}")).await.unwrap().is_none());

    // The signature is still valid but the token is no longer live
    let res = app
        .client
        .get(app.url(&format!("/users/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Invalid token" }));

    let res = app
        .client
        .post(app.url("/users/logout"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // Anonymous reads are still allowed
    let (status, _) = app.get_json(&format!("/users/{id}")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn bad_credentials_and_inputs() {
    let app = start().await;
    app.register("Ann", "ann@example.com", "secret").await;

    for (email, password) in [("ann@example.com", "wrong"), ("nobody@example.com", "secret")] {
        let res = app
            .client
            .post(app.url("/users/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body, json!({ "error": "Incorrect username or password" }));
    }

    let (status, _) = app.get_json("/users/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .get_json("/photos/00000000-0000-0000-0000-000000000000")
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Photo Not Found" }));

    let res = app
        .client
        .post(app.url("/users"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app
        .client
        .post(app.url("/photos"))
        .json(&json!({ "name": "x", "url": "y" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn duplicates_are_rejected() {
    let app = start().await;
    app.register("Ann", "dup@example.com", "secret").await;

    let res = app
        .client
        .post(app.url("/users"))
        .json(&json!({ "name": "Other", "email": "dup@example.com", "password": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let token = app.login("dup@example.com", "secret").await;
    app.create_photo(&token, "https://img/1.png").await;
    let res = app
        .client
        .post(app.url("/photos"))
        .bearer_auth(&token)
        .json(&json!({ "name": "Again", "url": "https://img/1.png" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn new_caption_is_visible_on_cached_user_and_photo() {
    let app = start().await;
    let user = app.register("Ann", "ann@example.com", "secret").await;
    let user_id = user["id"].as_str().unwrap().to_string();
    let token = app.login("ann@example.com", "secret").await;
    let photo = app.create_photo(&token, "https://img/monkey.png").await;
    let photo_id = photo["id"].as_str().unwrap().to_string();

    // Populate both views
    let (_, body) = app.get_json(&format!("/photos/{photo_id}")).await;
    assert_eq!(body["captions"], json!([]));
    let (_, body) = app.get_json(&format!("/users/{user_id}")).await;
    assert_eq!(body["captions"], json!([]));
    assert!(app.cached(&format!("photo_{photo_id}")).await.is_some());
    let cached_user = app.cached(&format!("user_{user_id}")).await.unwrap();
    assert!(cached_user.get("password").is_none());
    assert!(cached_user.get("passwordHash").is_none());

    let caption = app.create_caption(&token, &photo_id, "Hello there").await;
    assert_eq!(caption["userId"], json!(user_id));
    assert!(app.cached(&format!("photo_{photo_id}")).await.is_none());
    assert!(app.cached(&format!("user_{user_id}")).await.is_none());

    let (_, body) = app.get_json(&format!("/photos/{photo_id}")).await;
    assert_eq!(body["captions"][0]["comment"], json!("Hello there"));
    let (_, body) = app.get_json(&format!("/users/{user_id}")).await;
    assert_eq!(body["captions"][0]["comment"], json!("Hello there"));
}

#[tokio::test]
async fn caption_changes_require_the_author() {
    let app = start().await;
    let author = app.register("Ann", "ann@example.com", "secret").await;
    let author_id = author["id"].as_str().unwrap().to_string();
    app.register("Bob", "bob@example.com", "secret").await;
    let ann = app.login("ann@example.com", "secret").await;
    let bob = app.login("bob@example.com", "secret").await;

    let photo = app.create_photo(&ann, "https://img/cat.png").await;
    let photo_id = photo["id"].as_str().unwrap().to_string();
    let caption = app.create_caption(&ann, &photo_id, "first").await;
    let caption_id = caption["id"].as_str().unwrap().to_string();

    let (_, body) = app.get_json(&format!("/captions/{caption_id}")).await;
    assert_eq!(body["comment"], json!("first"));
    assert_eq!(body["user"]["name"], json!("Ann"));
    assert!(body["user"].get("password").is_none());
    app.get_json(&format!("/photos/{photo_id}")).await;
    app.get_json(&format!("/users/{author_id}")).await;

    let res = app
        .client
        .put(app.url(&format!("/captions/{caption_id}")))
        .bearer_auth(&bob)
        .json(&json!({ "comment": "hijacked" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(
        body,
        json!({ "error": "User not authorized to update this caption." })
    );

    let res = app
        .client
        .put(app.url(&format!("/captions/{caption_id}")))
        .bearer_auth(&ann)
        .json(&json!({ "comment": "second" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    for key in [
        format!("caption_{caption_id}"),
        format!("photo_{photo_id}"),
        format!("user_{author_id}"),
    ] {
        assert!(app.cached(&key).await.is_none(), "{key} still cached");
    }
    let (_, body) = app.get_json(&format!("/captions/{caption_id}")).await;
    assert_eq!(body["comment"], json!("second"));

    let res = app
        .client
        .delete(app.url(&format!("/captions/{caption_id}")))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = app
        .client
        .delete(app.url(&format!("/captions/{caption_id}")))
        .bearer_auth(&ann)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let (status, body) = app.get_json(&format!("/captions/{caption_id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Caption Not Found" }));
    let (_, body) = app.get_json(&format!("/photos/{photo_id}")).await;
    assert_eq!(body["captions"], json!([]));
}

#[tokio::test]
async fn user_changes_require_the_owner_and_refresh_captions() {
    let app = start().await;
    let ann = app.register("Ann", "ann@example.com", "secret").await;
    let ann_id = ann["id"].as_str().unwrap().to_string();
    app.register("Bob", "bob@example.com", "secret").await;
    let ann_token = app.login("ann@example.com", "secret").await;
    let bob_token = app.login("bob@example.com", "secret").await;

    let photo = app.create_photo(&ann_token, "https://img/dog.png").await;
    let photo_id = photo["id"].as_str().unwrap().to_string();
    let caption = app.create_caption(&ann_token, &photo_id, "woof").await;
    let caption_id = caption["id"].as_str().unwrap().to_string();
    app.get_json(&format!("/captions/{caption_id}")).await;

    let res = app
        .client
        .put(app.url(&format!("/users/{ann_id}")))
        .bearer_auth(&bob_token)
        .json(&json!({ "name": "Mallory" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Unauthorized to update this user." }));

    let res = app
        .client
        .put(app.url(&format!("/users/{ann_id}")))
        .bearer_auth(&ann_token)
        .json(&json!({ "name": "Annie" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["name"], json!("Annie"));
    assert_eq!(body["email"], json!("ann@example.com"));

    // The caption view embeds the author
    let (_, body) = app.get_json(&format!("/captions/{caption_id}")).await;
    assert_eq!(body["user"]["name"], json!("Annie"));

    // Deleting the user cascades to the caption and refreshes the photo
    app.get_json(&format!("/photos/{photo_id}")).await;
    let res = app
        .client
        .delete(app.url(&format!("/users/{ann_id}")))
        .bearer_auth(&ann_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let (status, _) = app.get_json(&format!("/users/{ann_id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.get_json(&format!("/captions/{caption_id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, body) = app.get_json(&format!("/photos/{photo_id}")).await;
    assert_eq!(body["captions"], json!([]));
}

#[tokio::test]
async fn photo_changes_refresh_dependent_views() {
    let app = start().await;
    let ann = app.register("Ann", "ann@example.com", "secret").await;
    let ann_id = ann["id"].as_str().unwrap().to_string();
    let token = app.login("ann@example.com", "secret").await;
    let photo = app.create_photo(&token, "https://img/owl.png").await;
    let photo_id = photo["id"].as_str().unwrap().to_string();
    let caption = app.create_caption(&token, &photo_id, "hoot").await;
    let caption_id = caption["id"].as_str().unwrap().to_string();

    app.get_json(&format!("/captions/{caption_id}")).await;
    let res = app
        .client
        .put(app.url(&format!("/photos/{photo_id}")))
        .bearer_auth(&token)
        .json(&json!({ "name": "Owl" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["name"], json!("Owl"));
    assert_eq!(body["url"], json!("https://img/owl.png"));

    let (_, body) = app.get_json(&format!("/captions/{caption_id}")).await;
    assert_eq!(body["photo"]["name"], json!("Owl"));

    app.get_json(&format!("/users/{ann_id}")).await;
    let res = app
        .client
        .delete(app.url(&format!("/photos/{photo_id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let (status, _) = app.get_json(&format!("/photos/{photo_id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, body) = app.get_json(&format!("/users/{ann_id}")).await;
    assert_eq!(body["captions"], json!([]));

    let (_, body) = app.get_json("/photos").await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn lists_are_newest_first_and_uncached() {
    let app = start().await;
    app.register("First", "first@example.com", "secret").await;
    app.register("Second", "second@example.com", "secret").await;

    let (status, body) = app.get_json("/users").await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Second", "First"]);
    assert!(body[0].get("password").is_none());
    assert_eq!(app.cache.local_len(), 0);
}

fn unreachable_cache() -> CacheBackend {
    let mut pool_config = deadpool_redis::PoolConfig::new(1);
    pool_config.timeouts.wait = Some(Duration::from_millis(200));
    pool_config.timeouts.create = Some(Duration::from_millis(200));
    let mut config = deadpool_redis::Config::from_url("redis://127.0.0.1:1");
    config.pool = Some(pool_config);
    CacheBackend::new_redis(
        config
            .create_pool(Some(deadpool_redis::Runtime::Tokio1))
            .unwrap(),
    )
}

#[tokio::test]
async fn auth_fails_closed_without_cache() {
    let app = start_with_cache(unreachable_cache()).await;
    app.register("Ann", "ann@example.com", "secret").await;

    let res = app
        .client
        .post(app.url("/users/login"))
        .json(&json!({ "email": "ann@example.com", "password": "secret" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Internal server error" }));

    // Reads bypass the broken cache
    let (status, _) = app
        .get_json("/photos/00000000-0000-0000-0000-000000000000")
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get_json("/readyz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}
