use axum::{
    Router,
    body::Body,
    extract::connect_info::MockConnectInfo,
    http::{Request, StatusCode, header},
    response::Response,
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceExt;

use aurelia::api::AppState;
use aurelia::config::Config;
use aurelia::db::repositories::token::KIND_PASSWORD_RESET;
use aurelia::domain::events::DomainEvent;
use aurelia::security::tokens;

const STRONG_PASSWORD: &str = "Moonstone#2026";

fn test_config() -> Config {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    // A single pooled connection so every request sees the same in-memory DB.
    config.general.max_db_connections = 1;
    config.general.min_db_connections = 1;
    // Small Argon2 params to keep the tests fast.
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config
}

async fn spawn_app() -> (Router, Arc<AppState>) {
    spawn_app_with(test_config()).await
}

async fn spawn_app_with(config: Config) -> (Router, Arc<AppState>) {
    let state = aurelia::api::create_app_state_from_config(config, None)
        .await
        .expect("Failed to create app state");
    // `oneshot` never opens a TCP connection, so fake the peer address the
    // production server gets from `into_make_service_with_connect_info`.
    let app = aurelia::api::router(state.clone())
        .layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 7321))));
    (app, state)
}

async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

/// Starts a session: fetches a CSRF token and returns (cookie, token).
async fn csrf_session(app: &Router) -> (String, String) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/csrf-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("session cookie")
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();

    let body = body_json(response).await;
    let token = body["token"].as_str().expect("csrf token").to_string();

    (cookie, token)
}

async fn post_json(app: &Router, uri: &str, cookie: &str, csrf: &str, body: &Value) -> Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
                .header(header::COOKIE, cookie)
                .header("x-csrf-token", csrf)
                .body(Body::from(serde_json::to_string(body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn get(app: &Router, uri: &str, cookie: &str) -> Response {
    app.clone()
        .oneshot(
            Request::builder()
                .uri(uri)
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn register_user(
    app: &Router,
    cookie: &str,
    csrf: &str,
    username: &str,
    password: &str,
) -> Response {
    post_json(
        app,
        "/api/auth/register",
        cookie,
        csrf,
        &json!({
            "username": username,
            "password": password,
            "consentTerms": true,
            "consentPrivacy": true,
            "consentMarketing": false,
        }),
    )
    .await
}

async fn login(app: &Router, cookie: &str, csrf: &str, username: &str, password: &str) -> Response {
    post_json(
        app,
        "/api/auth/login",
        cookie,
        csrf,
        &json!({ "username": username, "password": password }),
    )
    .await
}

/// Seeded primary admin credentials (see the initial migration).
async fn admin_session(app: &Router) -> (String, String) {
    let (cookie, csrf) = csrf_session(app).await;
    let response = login(app, &cookie, &csrf, "admin", "password").await;
    assert_eq!(response.status(), StatusCode::OK);
    (cookie, csrf)
}

#[tokio::test]
async fn register_then_login() {
    let (app, _state) = spawn_app().await;
    let (cookie, csrf) = csrf_session(&app).await;

    let response = register_user(&app, &cookie, &csrf, "nora@example.com", STRONG_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["username"], "nora@example.com");
    assert_eq!(body["role"], "customer");
    assert_eq!(body["message"], "Account created. You can now log in.");

    let response = login(&app, &cookie, &csrf, "nora@example.com", STRONG_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["username"], "nora@example.com");

    let response = get(&app, "/api/auth/me", &cookie).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["username"], "nora@example.com");
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let (app, _state) = spawn_app().await;
    let (cookie, csrf) = csrf_session(&app).await;

    let response = register_user(&app, &cookie, &csrf, "nora@example.com", STRONG_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = register_user(&app, &cookie, &csrf, "nora@example.com", STRONG_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["message"], "An account with this email already exists");
}

#[tokio::test]
async fn weak_password_is_rejected_with_feedback() {
    let (app, _state) = spawn_app().await;
    let (cookie, csrf) = csrf_session(&app).await;

    // Length + lowercase only: below the three-of-five gate.
    let response = register_user(&app, &cookie, &csrf, "nora@example.com", "abcdefgh").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert!(
        body["feedback"]
            .as_array()
            .is_some_and(|f| !f.is_empty()),
        "expected concrete feedback, got {body}"
    );
}

#[tokio::test]
async fn registration_requires_consent() {
    let (app, _state) = spawn_app().await;
    let (cookie, csrf) = csrf_session(&app).await;

    let response = post_json(
        &app,
        "/api/auth/register",
        &cookie,
        &csrf,
        &json!({
            "username": "nora@example.com",
            "password": STRONG_PASSWORD,
            "consentTerms": false,
            "consentPrivacy": true,
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Validation failed");
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let (app, _state) = spawn_app().await;
    let (cookie, csrf) = csrf_session(&app).await;

    let response = register_user(&app, &cookie, &csrf, "nora@example.com", STRONG_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let unknown = login(&app, &cookie, &csrf, "ghost@example.com", STRONG_PASSWORD).await;
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    let unknown_bytes = unknown.into_body().collect().await.unwrap().to_bytes();

    let wrong = login(&app, &cookie, &csrf, "nora@example.com", "Wrong#Password9").await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    let wrong_bytes = wrong.into_body().collect().await.unwrap().to_bytes();

    // Unknown username and wrong password must be byte-identical.
    assert_eq!(unknown_bytes, wrong_bytes);
}

#[tokio::test]
async fn missing_csrf_token_is_rejected() {
    let (app, _state) = spawn_app().await;
    let (cookie, _csrf) = csrf_session(&app).await;

    // Session cookie present, header missing.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/login")
                .header(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
                .header(header::COOKIE, &cookie)
                .body(Body::from(
                    json!({ "username": "admin", "password": "password" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Wrong header value.
    let response = login(&app, &cookie, "not-the-token", "admin", "password").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // No session at all.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/login")
                .header(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
                .header("x-csrf-token", "whatever")
                .body(Body::from(
                    json!({ "username": "admin", "password": "password" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn login_rate_limit_kicks_in() {
    let (app, state) = spawn_app().await;
    let (cookie, csrf) = csrf_session(&app).await;
    let max = state.config().rate_limits.login.max_attempts;

    for _ in 0..max {
        let response = login(&app, &cookie, &csrf, "ghost@example.com", "Wrong#Password9").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let response = login(&app, &cookie, &csrf, "ghost@example.com", "Wrong#Password9").await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn forgot_password_hides_account_existence() {
    let (app, _state) = spawn_app().await;
    let (cookie, csrf) = csrf_session(&app).await;

    let response = register_user(&app, &cookie, &csrf, "nora@example.com", STRONG_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let known = post_json(
        &app,
        "/api/auth/forgot-password",
        &cookie,
        &csrf,
        &json!({ "email": "nora@example.com" }),
    )
    .await;
    assert_eq!(known.status(), StatusCode::OK);
    let known_bytes = known.into_body().collect().await.unwrap().to_bytes();

    let unknown = post_json(
        &app,
        "/api/auth/forgot-password",
        &cookie,
        &csrf,
        &json!({ "email": "ghost@example.com" }),
    )
    .await;
    assert_eq!(unknown.status(), StatusCode::OK);
    let unknown_bytes = unknown.into_body().collect().await.unwrap().to_bytes();

    assert_eq!(known_bytes, unknown_bytes);
}

#[tokio::test]
async fn password_reset_flow() {
    let (app, state) = spawn_app().await;
    let (cookie, csrf) = csrf_session(&app).await;

    let response = register_user(&app, &cookie, &csrf, "nora@example.com", STRONG_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    // The raw token only travels on the event bus (the store keeps a digest).
    let mut events = state.event_bus().subscribe();

    let response = post_json(
        &app,
        "/api/auth/forgot-password",
        &cookie,
        &csrf,
        &json!({ "email": "nora@example.com" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let raw_token = loop {
        let event = tokio::time::timeout(std::time::Duration::from_secs(5), events.recv())
            .await
            .expect("timed out waiting for reset event")
            .expect("event bus closed");
        if let DomainEvent::PasswordResetRequested { raw_token, .. } = event {
            break raw_token;
        }
    };

    let response = get(
        &app,
        &format!("/api/auth/validate-reset-token?token={raw_token}"),
        &cookie,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["valid"], true);

    let new_password = "Opaline#Dawn7";
    let response = post_json(
        &app,
        "/api/auth/reset-password",
        &cookie,
        &csrf,
        &json!({ "token": raw_token, "password": new_password }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // New password works, old one does not.
    let response = login(&app, &cookie, &csrf, "nora@example.com", new_password).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = login(&app, &cookie, &csrf, "nora@example.com", STRONG_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // The token is single-use.
    let response = post_json(
        &app,
        "/api/auth/reset-password",
        &cookie,
        &csrf,
        &json!({ "token": raw_token, "password": "Another#Pass88" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = get(
        &app,
        &format!("/api/auth/validate-reset-token?token={raw_token}"),
        &cookie,
    )
    .await;
    assert_eq!(body_json(response).await["valid"], false);
}

#[tokio::test]
async fn weak_replacement_password_leaves_token_live() {
    let (app, state) = spawn_app().await;
    let (cookie, csrf) = csrf_session(&app).await;

    let response = register_user(&app, &cookie, &csrf, "nora@example.com", STRONG_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let mut events = state.event_bus().subscribe();
    let response = post_json(
        &app,
        "/api/auth/forgot-password",
        &cookie,
        &csrf,
        &json!({ "email": "nora@example.com" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let raw_token = loop {
        let event = tokio::time::timeout(std::time::Duration::from_secs(5), events.recv())
            .await
            .expect("timed out waiting for reset event")
            .expect("event bus closed");
        if let DomainEvent::PasswordResetRequested { raw_token, .. } = event {
            break raw_token;
        }
    };

    let response = post_json(
        &app,
        "/api/auth/reset-password",
        &cookie,
        &csrf,
        &json!({ "token": raw_token, "password": "weak" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Policy failure must not consume the token.
    let response = get(
        &app,
        &format!("/api/auth/validate-reset-token?token={raw_token}"),
        &cookie,
    )
    .await;
    assert_eq!(body_json(response).await["valid"], true);
}

#[tokio::test]
async fn validate_reset_token_rejects_unknown_token() {
    let (app, _state) = spawn_app().await;

    let response = get(
        &app,
        "/api/auth/validate-reset-token?token=not-a-real-token",
        "",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["valid"], false);
}

#[tokio::test]
async fn email_verification_flow() {
    let mut config = test_config();
    config.security.email_verification_required = true;
    let (app, state) = spawn_app_with(config).await;
    let (cookie, csrf) = csrf_session(&app).await;

    let mut events = state.event_bus().subscribe();

    let response = register_user(&app, &cookie, &csrf, "nora@example.com", STRONG_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(
        body["message"],
        "Account created. Please check your email to verify your address."
    );

    let raw_token = loop {
        let event = tokio::time::timeout(std::time::Duration::from_secs(5), events.recv())
            .await
            .expect("timed out waiting for verification event")
            .expect("event bus closed");
        if let DomainEvent::VerificationRequested { raw_token, .. } = event {
            break raw_token;
        }
    };

    let response = get(
        &app,
        &format!("/api/auth/verify-email?token={raw_token}"),
        &cookie,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Single-use, like the reset token.
    let response = get(
        &app,
        &format!("/api/auth/verify-email?token={raw_token}"),
        &cookie,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn expired_reset_link_is_refused_at_consume() {
    let (app, state) = spawn_app().await;
    let (cookie, csrf) = csrf_session(&app).await;

    let response = register_user(&app, &cookie, &csrf, "nora@example.com", STRONG_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let user_id = i32::try_from(body_json(response).await["id"].as_i64().unwrap()).unwrap();

    // A reset token whose expiry has already passed.
    let raw_token = tokens::generate_raw_token();
    let expired_at = (chrono::Utc::now() - chrono::Duration::minutes(5)).to_rfc3339();
    state
        .store()
        .tokens()
        .insert(
            user_id,
            &tokens::digest(&raw_token),
            KIND_PASSWORD_RESET,
            &expired_at,
        )
        .await
        .unwrap();

    let response = post_json(
        &app,
        "/api/auth/reset-password",
        &cookie,
        &csrf,
        &json!({ "token": raw_token, "password": "Opaline#Dawn7" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["message"],
        "This reset link has expired, please request a new one"
    );

    // Expiry is re-checked at consume time; the password is untouched.
    let response = login(&app, &cookie, &csrf, "nora@example.com", STRONG_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn tampered_session_cookie_is_rejected() {
    let (app, _state) = spawn_app().await;
    let (cookie, _csrf) = admin_session(&app).await;

    let response = get(&app, "/api/auth/me", &cookie).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Flip the last character; the cookie signature no longer verifies.
    let mut forged = cookie.clone();
    let last = forged.pop().unwrap();
    forged.push(if last == 'A' { 'B' } else { 'A' });

    let response = get(&app, "/api/auth/me", &forged).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_invalidates_session() {
    let (app, _state) = spawn_app().await;
    let (cookie, csrf) = admin_session(&app).await;

    let response = post_json(&app, "/api/auth/logout", &cookie, &csrf, &json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(&app, "/api/auth/me", &cookie).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_routes_reject_anonymous_and_customers() {
    let (app, _state) = spawn_app().await;

    let response = get(&app, "/api/admin/users", "").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let (cookie, csrf) = csrf_session(&app).await;
    let response = register_user(&app, &cookie, &csrf, "nora@example.com", STRONG_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let response = login(&app, &cookie, &csrf, "nora@example.com", STRONG_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(&app, "/api/admin/users", &cookie).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn only_primary_admin_manages_admin_accounts() {
    let (app, _state) = spawn_app().await;
    let (cookie, csrf) = admin_session(&app).await;

    // The primary admin can create a second admin account.
    let response = post_json(
        &app,
        "/api/admin/users",
        &cookie,
        &csrf,
        &json!({ "username": "ops@aurelia.store", "password": STRONG_PASSWORD }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["role"], "admin");
    let created_id = created["id"].as_i64().unwrap();

    // A secondary admin cannot.
    let (ops_cookie, ops_csrf) = csrf_session(&app).await;
    let response = login(&app, &ops_cookie, &ops_csrf, "ops@aurelia.store", STRONG_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_json(
        &app,
        "/api/admin/users",
        &ops_cookie,
        &ops_csrf,
        &json!({ "username": "more@aurelia.store", "password": STRONG_PASSWORD }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // The primary admin account itself cannot be deleted.
    let response = get(&app, "/api/admin/users", &cookie).await;
    let admins = body_json(response).await;
    let primary_id = admins
        .as_array()
        .unwrap()
        .iter()
        .find(|a| a["username"] == "admin")
        .unwrap()["id"]
        .as_i64()
        .unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/admin/users/{primary_id}"))
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // A secondary admin can be deleted by the primary.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/admin/users/{created_id}"))
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn product_crud_with_public_reads() {
    let (app, _state) = spawn_app().await;
    let (cookie, _csrf) = admin_session(&app).await;

    let response = post_json(
        &app,
        "/api/admin/products",
        &cookie,
        "",
        &json!({
            "name": "Lumen Ring",
            "slug": "lumen-ring",
            "priceCents": 18900,
            "description": "Hand-set moonstone in recycled gold.",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let product = body_json(response).await;
    let id = product["id"].as_i64().unwrap();
    assert_eq!(product["currency"], "EUR");
    assert_eq!(product["in_stock"], true);

    // Public read, no session needed.
    let response = get(&app, "/api/products", "").await;
    assert_eq!(response.status(), StatusCode::OK);
    let listed = body_json(response).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/api/admin/products/{id}"))
                .header(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
                .header(header::COOKIE, &cookie)
                .body(Body::from(
                    json!({
                        "name": "Lumen Ring",
                        "slug": "lumen-ring",
                        "priceCents": 17900,
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["price_cents"], 17900);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/admin/products/{id}"))
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = get(&app, &format!("/api/products/{id}"), "").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn journal_lists_only_published_posts_publicly() {
    let (app, _state) = spawn_app().await;
    let (cookie, _csrf) = admin_session(&app).await;

    let response = post_json(
        &app,
        "/api/admin/journal",
        &cookie,
        "",
        &json!({
            "title": "Atelier Notes",
            "body": "On setting stones by hand.",
            "published": false,
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let post = body_json(response).await;
    let id = post["id"].as_i64().unwrap();
    assert_eq!(post["slug"], "atelier-notes");

    let response = get(&app, "/api/journal", "").await;
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 0);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/api/admin/journal/{id}"))
                .header(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
                .header(header::COOKIE, &cookie)
                .body(Body::from(
                    json!({
                        "title": "Atelier Notes",
                        "slug": "atelier-notes",
                        "body": "On setting stones by hand.",
                        "published": true,
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(&app, "/api/journal", "").await;
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);

    let response = get(&app, "/api/journal/atelier-notes", "").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn newsletter_subscribe_is_idempotent() {
    let (app, _state) = spawn_app().await;

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/newsletter/subscribe")
                    .header(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
                    .body(Body::from(
                        json!({ "email": "nora@example.com" }).to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["message"], "Thanks for subscribing!");
    }

    let (cookie, _csrf) = admin_session(&app).await;
    let response = get(&app, "/api/admin/subscribers", &cookie).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn branding_settings_read_and_update() {
    let (app, _state) = spawn_app().await;

    let response = get(&app, "/api/settings", "").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["store_name"], "Aurelia");

    let (cookie, _csrf) = admin_session(&app).await;
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/admin/settings")
                .header(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
                .header(header::COOKIE, &cookie)
                .body(Body::from(
                    json!({
                        "storeName": "Aurelia Atelier",
                        "tagline": "Jewelry made slowly",
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(&app, "/api/settings", "").await;
    assert_eq!(body_json(response).await["store_name"], "Aurelia Atelier");
}

#[tokio::test]
async fn audit_trail_records_auth_transitions() {
    let (app, _state) = spawn_app().await;
    let (cookie, csrf) = csrf_session(&app).await;

    let response = register_user(&app, &cookie, &csrf, "nora@example.com", STRONG_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let user_id = body_json(response).await["id"].as_i64().unwrap();

    let response = login(&app, &cookie, &csrf, "nora@example.com", "Wrong#Password9").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = login(&app, &cookie, &csrf, "nora@example.com", STRONG_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::OK);

    let (admin_cookie, _admin_csrf) = admin_session(&app).await;
    let response = get(
        &app,
        &format!("/api/admin/audit-logs?user_id={user_id}"),
        &admin_cookie,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let entries = body_json(response).await;
    let actions: Vec<&str> = entries
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action"].as_str().unwrap())
        .collect();

    assert!(actions.contains(&"register"));
    assert!(actions.contains(&"login"));
    assert!(actions.contains(&"login_failed"));

    // The failed attempt names the account it targeted, internally only.
    let failed = entries
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["action"] == "login_failed")
        .unwrap();
    assert_eq!(failed["user_id"].as_i64().unwrap(), user_id);
}

#[tokio::test]
async fn health_reports_ok_with_live_database() {
    let (app, _state) = spawn_app().await;

    let response = get(&app, "/api/health", "").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert!(body["uptime_seconds"].is_u64());
}

#[tokio::test]
async fn security_headers_are_set() {
    let (app, _state) = spawn_app().await;

    let response = get(&app, "/api/settings", "").await;
    let headers = response.headers();
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert!(headers.contains_key("content-security-policy"));
}
