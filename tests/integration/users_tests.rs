//! User endpoint integration tests.
//!
//! Tests verify:
//! - Creation, validation and uniqueness conflicts
//! - Partial updates, explicit nulls and empty updates
//! - Deletion with cascading edges
//! - Listing with pagination, search and sorting

use axum::http::{Method, StatusCode};
use serde_json::json;

use super::test_utils::{empty_request, json_request, TestApp};

// =============================================================================
// Create
// =============================================================================

#[tokio::test]
async fn test_create_user_returns_profile() {
    let app = TestApp::new();

    let (status, body) = app
        .post_json(
            "/users",
            json!({
                "username": "ada",
                "full_name": "Ada Lovelace",
                "email": "ADA@Example.com",
                "date_of_birth": "1990-12-10",
                "bio": "First programmer",
            }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["username"], "ada");
    assert_eq!(body["email"], "ada@example.com");
    assert_eq!(body["date_of_birth"], "1990-12-10");
    assert!(body["age"].as_u64().unwrap() >= 33);
    assert_eq!(body["followers_count"], 0);
    assert_eq!(body["following_count"], 0);
    assert!(body["profile_image_url"].is_null());
    assert!(body["id"].as_str().is_some());
    assert!(body["created_at"].as_str().is_some());
}

#[tokio::test]
async fn test_create_user_without_birth_date_has_null_age() {
    let app = TestApp::new();
    let body = app.create_user("grace").await;
    assert!(body["age"].is_null());
    assert!(body["date_of_birth"].is_null());
}

#[tokio::test]
async fn test_create_user_duplicate_username() {
    let app = TestApp::new();
    app.create_user("ada").await;

    let (status, body) = app
        .post_json(
            "/users",
            json!({ "username": "ada", "full_name": "Other", "email": "other@example.com" }),
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
    assert_eq!(body["field"], "username");
    assert_eq!(body["status"], 409);
}

#[tokio::test]
async fn test_create_user_duplicate_email_is_case_insensitive() {
    let app = TestApp::new();
    app.create_user("ada").await;

    let (status, body) = app
        .post_json(
            "/users",
            json!({ "username": "ada2", "full_name": "Ada", "email": "ADA@example.com" }),
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["field"], "email");
}

#[tokio::test]
async fn test_create_user_validation_errors() {
    let app = TestApp::new();

    let cases = [
        (json!({ "username": "a", "full_name": "A", "email": "a@example.com" }), "username"),
        (json!({ "username": "has space", "full_name": "A", "email": "a@example.com" }), "username"),
        (json!({ "username": "valid", "full_name": "   ", "email": "a@example.com" }), "full_name"),
        (json!({ "username": "valid", "full_name": "A", "email": "nope" }), "email"),
        (
            json!({ "username": "valid", "full_name": "A", "email": "a@example.com", "date_of_birth": "2999-01-01" }),
            "date_of_birth",
        ),
        (
            json!({ "username": "valid", "full_name": "A", "email": "a@example.com", "bio": "x".repeat(501) }),
            "bio",
        ),
        (
            json!({ "username": "valid", "full_name": "A", "email": "a@example.com", "profile_image_url": "not a url" }),
            "profile_image_url",
        ),
    ];

    for (payload, field) in cases {
        let (status, body) = app.post_json("/users", payload.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "payload: {}", payload);
        assert_eq!(body["error"], "validation_error", "payload: {}", payload);
        assert_eq!(body["field"], field, "payload: {}", payload);
    }

    assert_eq!(app.directory.user_count().await, 0);
}

#[tokio::test]
async fn test_create_user_malformed_json() {
    let app = TestApp::new();

    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/users")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_json");

    let (status, body) = app
        .post_json("/users", json!({ "username": "ada", "full_name": "Ada" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_json");
}

#[tokio::test]
async fn test_create_user_requires_json_content_type() {
    let app = TestApp::new();

    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/users")
        .body(axum::body::Body::from(
            r#"{"username":"ada","full_name":"Ada","email":"ada@example.com"}"#,
        ))
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["error"], "invalid_content_type");
}

// =============================================================================
// Get
// =============================================================================

#[tokio::test]
async fn test_get_user() {
    let app = TestApp::new();
    let id = app.create_user_id("ada").await;

    let (status, body) = app.get(&format!("/users/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id.as_str());
    assert_eq!(body["full_name"], "ada Example");
}

#[tokio::test]
async fn test_get_user_not_found() {
    let app = TestApp::new();
    let (status, body) = app
        .get("/users/00000000-0000-4000-8000-000000000000")
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_get_user_invalid_id() {
    let app = TestApp::new();
    let (status, body) = app.get("/users/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_id");
}

// =============================================================================
// Update
// =============================================================================

#[tokio::test]
async fn test_patch_user_partial_update() {
    let app = TestApp::new();
    let created = app
        .post_json(
            "/users",
            json!({
                "username": "ada",
                "full_name": "Ada Lovelace",
                "email": "ada@example.com",
                "bio": "Original",
            }),
        )
        .await
        .1;
    let id = created["id"].as_str().unwrap();

    let (status, body) = app
        .patch_json(&format!("/users/{}", id), json!({ "full_name": "Countess Ada" }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["full_name"], "Countess Ada");
    assert_eq!(body["bio"], "Original");
    assert_eq!(body["username"], "ada");
    assert_ne!(body["updated_at"], created["updated_at"]);
}

#[tokio::test]
async fn test_patch_user_null_clears_field() {
    let app = TestApp::new();
    let id = app
        .post_json(
            "/users",
            json!({
                "username": "ada",
                "full_name": "Ada",
                "email": "ada@example.com",
                "bio": "Something",
                "date_of_birth": "1990-01-01",
            }),
        )
        .await
        .1["id"]
        .as_str()
        .unwrap()
        .to_string();

    let (status, body) = app
        .patch_json(
            &format!("/users/{}", id),
            json!({ "bio": null, "date_of_birth": null }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["bio"].is_null());
    assert!(body["date_of_birth"].is_null());
    assert!(body["age"].is_null());
}

#[tokio::test]
async fn test_patch_user_blank_image_url_clears_field() {
    let app = TestApp::new();
    let id = app
        .post_json(
            "/users",
            json!({
                "username": "ada",
                "full_name": "Ada",
                "email": "ada@example.com",
                "profile_image_url": "https://elsewhere.example/ada.png",
            }),
        )
        .await
        .1["id"]
        .as_str()
        .unwrap()
        .to_string();

    let (status, body) = app
        .patch_json(&format!("/users/{}", id), json!({ "profile_image_url": "" }))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert!(body["profile_image_url"].is_null());
}

#[tokio::test]
async fn test_create_user_blank_image_url_and_padded_email() {
    let app = TestApp::new();

    let (status, body) = app
        .post_json(
            "/users",
            json!({
                "username": "ada",
                "full_name": "Ada",
                "email": "  Ada@Example.com ",
                "profile_image_url": "  ",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["email"], "ada@example.com");
    assert!(body["profile_image_url"].is_null());
}

#[tokio::test]
async fn test_put_is_partial_update() {
    let app = TestApp::new();
    let id = app.create_user_id("ada").await;

    let (status, body) = app
        .send(json_request(
            Method::PUT,
            &format!("/users/{}", id),
            &json!({ "bio": "via put" }),
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bio"], "via put");
    assert_eq!(body["username"], "ada");
}

#[tokio::test]
async fn test_patch_user_empty_body() {
    let app = TestApp::new();
    let id = app.create_user_id("ada").await;

    let (status, body) = app.patch_json(&format!("/users/{}", id), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "empty_update");
}

#[tokio::test]
async fn test_patch_user_conflict() {
    let app = TestApp::new();
    app.create_user("ada").await;
    let id = app.create_user_id("grace").await;

    let (status, body) = app
        .patch_json(&format!("/users/{}", id), json!({ "username": "ada" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["field"], "username");
}

#[tokio::test]
async fn test_patch_user_not_found() {
    let app = TestApp::new();
    let (status, _) = app
        .patch_json(
            "/users/00000000-0000-4000-8000-000000000000",
            json!({ "bio": "hi" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_patch_user_validation() {
    let app = TestApp::new();
    let id = app.create_user_id("ada").await;

    let (status, body) = app
        .patch_json(&format!("/users/{}", id), json!({ "email": "broken" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "email");
}

// =============================================================================
// Delete
// =============================================================================

#[tokio::test]
async fn test_delete_user_cascades_follows() {
    let app = TestApp::new();
    let ada = app.create_user_id("ada").await;
    let grace = app.create_user_id("grace").await;
    let alan = app.create_user_id("alan").await;

    app.follow(&ada, &grace).await;
    app.follow(&grace, &ada).await;
    app.follow(&alan, &grace).await;
    assert_eq!(app.directory.follow_count().await, 3);

    let (status, body) = app.delete(&format!("/users/{}", ada)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());

    assert_eq!(app.directory.follow_count().await, 1);
    let (_, grace_profile) = app.get(&format!("/users/{}", grace)).await;
    assert_eq!(grace_profile["followers_count"], 1);
    assert_eq!(grace_profile["following_count"], 0);

    let (status, _) = app.get(&format!("/users/{}", ada)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_user_not_found() {
    let app = TestApp::new();
    let (status, body) = app
        .send(empty_request(
            Method::DELETE,
            "/users/00000000-0000-4000-8000-000000000000",
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

// =============================================================================
// List
// =============================================================================

#[tokio::test]
async fn test_list_users_default_newest_first() {
    let app = TestApp::new();
    for name in ["first", "second", "third"] {
        app.create_user(name).await;
    }

    let (status, body) = app.get("/users").await;
    assert_eq!(status, StatusCode::OK);

    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["username"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["third", "second", "first"]);

    assert_eq!(body["pagination"]["page"], 1);
    assert_eq!(body["pagination"]["limit"], 20);
    assert_eq!(body["pagination"]["total"], 3);
    assert_eq!(body["pagination"]["total_pages"], 1);
    assert_eq!(body["pagination"]["has_next"], false);
    assert_eq!(body["pagination"]["has_prev"], false);
}

#[tokio::test]
async fn test_list_users_pagination() {
    let app = TestApp::new();
    for i in 0..5 {
        app.create_user(&format!("user{}", i)).await;
    }

    let (_, body) = app.get("/users?page=2&limit=2&sort=username&order=asc").await;
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["username"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["user2", "user3"]);
    assert_eq!(body["pagination"]["total"], 5);
    assert_eq!(body["pagination"]["total_pages"], 3);
    assert_eq!(body["pagination"]["has_next"], true);
    assert_eq!(body["pagination"]["has_prev"], true);

    let (_, body) = app.get("/users?page=9&limit=2").await;
    assert!(body["data"].as_array().unwrap().is_empty());
    assert_eq!(body["pagination"]["total"], 5);
    assert_eq!(body["pagination"]["has_next"], false);
}

#[tokio::test]
async fn test_list_users_clamps_limit() {
    let app = TestApp::new();
    app.create_user("ada").await;

    let (_, body) = app.get("/users?limit=1000&page=0").await;
    assert_eq!(body["pagination"]["limit"], 100);
    assert_eq!(body["pagination"]["page"], 1);

    let (_, body) = app.get("/users?limit=0").await;
    assert_eq!(body["pagination"]["limit"], 1);
}

#[tokio::test]
async fn test_list_users_empty() {
    let app = TestApp::new();
    let (status, body) = app.get("/users").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());
    assert_eq!(body["pagination"]["total"], 0);
    assert_eq!(body["pagination"]["total_pages"], 0);
}

#[tokio::test]
async fn test_list_users_search() {
    let app = TestApp::new();
    app.create_user("ada").await;
    app.create_user("grace").await;
    app.post_json(
        "/users",
        json!({ "username": "alan", "full_name": "Alan ADAMS", "email": "alan@example.com" }),
    )
    .await;

    let (_, body) = app.get("/users?search=ADA&sort=username&order=asc").await;
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["username"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["ada", "alan"]);
    assert_eq!(body["pagination"]["total"], 2);

    let (_, body) = app.get("/users?search=%20%20").await;
    assert_eq!(body["pagination"]["total"], 3);
}

#[tokio::test]
async fn test_list_users_invalid_sort() {
    let app = TestApp::new();
    let (status, body) = app.get("/users?sort=email").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_query");

    let (status, _) = app.get("/users?page=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_users_includes_counts() {
    let app = TestApp::new();
    let ada = app.create_user_id("ada").await;
    let grace = app.create_user_id("grace").await;
    app.follow(&grace, &ada).await;

    let (_, body) = app.get("/users?sort=username&order=asc").await;
    let data = body["data"].as_array().unwrap();
    assert_eq!(data[0]["username"], "ada");
    assert_eq!(data[0]["followers_count"], 1);
    assert_eq!(data[1]["following_count"], 1);
}
