//! Follow graph integration tests.
//!
//! Tests verify:
//! - Creating edges and the error cases around them
//! - Reading and removing a single edge
//! - Follower/following listings and their order
//! - The global edge listing

use axum::http::StatusCode;
use serde_json::json;

use super::test_utils::TestApp;

const MISSING_ID: &str = "00000000-0000-4000-8000-000000000000";

fn usernames(body: &serde_json::Value) -> Vec<String> {
    body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["username"].as_str().unwrap().to_string())
        .collect()
}

// =============================================================================
// Create
// =============================================================================

#[tokio::test]
async fn test_follow_creates_edge() {
    let app = TestApp::new();
    let ada = app.create_user_id("ada").await;
    let grace = app.create_user_id("grace").await;

    let (status, body) = app.follow(&ada, &grace).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["follower_id"], ada.as_str());
    assert_eq!(body["following_id"], grace.as_str());
    assert!(body["created_at"].as_str().is_some());

    let (_, ada_profile) = app.get(&format!("/users/{}", ada)).await;
    assert_eq!(ada_profile["following_count"], 1);
    assert_eq!(ada_profile["followers_count"], 0);

    let (_, grace_profile) = app.get(&format!("/users/{}", grace)).await;
    assert_eq!(grace_profile["followers_count"], 1);
    assert_eq!(grace_profile["following_count"], 0);
}

#[tokio::test]
async fn test_follow_is_directed() {
    let app = TestApp::new();
    let ada = app.create_user_id("ada").await;
    let grace = app.create_user_id("grace").await;

    assert_eq!(app.follow(&ada, &grace).await.0, StatusCode::CREATED);
    assert_eq!(app.follow(&grace, &ada).await.0, StatusCode::CREATED);
    assert_eq!(app.directory.follow_count().await, 2);
}

#[tokio::test]
async fn test_follow_self_rejected() {
    let app = TestApp::new();
    let ada = app.create_user_id("ada").await;

    let (status, body) = app.follow(&ada, &ada).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "self_follow");
    assert_eq!(app.directory.follow_count().await, 0);
}

#[tokio::test]
async fn test_follow_duplicate_rejected() {
    let app = TestApp::new();
    let ada = app.create_user_id("ada").await;
    let grace = app.create_user_id("grace").await;

    app.follow(&ada, &grace).await;
    let (status, body) = app.follow(&ada, &grace).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "already_following");
    assert_eq!(app.directory.follow_count().await, 1);
}

#[tokio::test]
async fn test_follow_missing_users() {
    let app = TestApp::new();
    let ada = app.create_user_id("ada").await;

    let (status, body) = app.follow(&ada, MISSING_ID).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, _) = app.follow(MISSING_ID, &ada).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_follow_race_names_the_deleted_user() {
    let app = TestApp::new();
    let ada = app.create_user_id("ada").await;
    let grace = app.create_user_id("grace").await;

    app.directory
        .vanish_before_next_follow(ada.parse().unwrap())
        .await;
    let (status, body) = app.follow(&ada, &grace).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"].as_str().unwrap().contains(&ada), "{}", body);

    let alan = app.create_user_id("alan").await;
    app.directory
        .vanish_before_next_follow(grace.parse().unwrap())
        .await;
    let (status, body) = app.follow(&alan, &grace).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"].as_str().unwrap().contains(&grace), "{}", body);
    assert_eq!(app.directory.follow_count().await, 0);
}

#[tokio::test]
async fn test_follow_invalid_target() {
    let app = TestApp::new();
    let ada = app.create_user_id("ada").await;

    let (status, body) = app
        .post_json(
            &format!("/users/{}/following", ada),
            json!({ "target_id": "nope" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_json");

    let (status, body) = app
        .post_json("/users/nope/following", json!({ "target_id": ada }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_id");
}

// =============================================================================
// Single Edge
// =============================================================================

#[tokio::test]
async fn test_get_follow_edge() {
    let app = TestApp::new();
    let ada = app.create_user_id("ada").await;
    let grace = app.create_user_id("grace").await;
    app.follow(&ada, &grace).await;

    let (status, body) = app
        .get(&format!("/users/{}/following/{}", ada, grace))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["follower_id"], ada.as_str());

    let (status, body) = app
        .get(&format!("/users/{}/following/{}", grace, ada))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_following");
}

#[tokio::test]
async fn test_unfollow() {
    let app = TestApp::new();
    let ada = app.create_user_id("ada").await;
    let grace = app.create_user_id("grace").await;
    app.follow(&ada, &grace).await;

    let (status, body) = app
        .delete(&format!("/users/{}/following/{}", ada, grace))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());
    assert_eq!(app.directory.follow_count().await, 0);

    let (status, body) = app
        .delete(&format!("/users/{}/following/{}", ada, grace))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_following");
}

// =============================================================================
// Listings
// =============================================================================

#[tokio::test]
async fn test_followers_newest_first() {
    let app = TestApp::new();
    let ada = app.create_user_id("ada").await;
    let grace = app.create_user_id("grace").await;
    let alan = app.create_user_id("alan").await;
    let edsger = app.create_user_id("edsger").await;

    app.follow(&grace, &ada).await;
    app.follow(&alan, &ada).await;
    app.follow(&edsger, &ada).await;

    let (status, body) = app.get(&format!("/users/{}/followers", ada)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(usernames(&body), vec!["edsger", "alan", "grace"]);
    assert_eq!(body["pagination"]["total"], 3);

    // Listed users carry their own counts
    let first = &body["data"][0];
    assert_eq!(first["following_count"], 1);
    assert_eq!(first["followers_count"], 0);

    let (_, body) = app
        .get(&format!("/users/{}/followers?limit=2&page=2", ada))
        .await;
    assert_eq!(usernames(&body), vec!["grace"]);
    assert_eq!(body["pagination"]["has_prev"], true);
    assert_eq!(body["pagination"]["has_next"], false);
}

#[tokio::test]
async fn test_following_listing() {
    let app = TestApp::new();
    let ada = app.create_user_id("ada").await;
    let grace = app.create_user_id("grace").await;
    let alan = app.create_user_id("alan").await;

    app.follow(&ada, &grace).await;
    app.follow(&ada, &alan).await;

    let (status, body) = app.get(&format!("/users/{}/following", ada)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(usernames(&body), vec!["alan", "grace"]);

    let (_, body) = app.get(&format!("/users/{}/following", grace)).await;
    assert!(body["data"].as_array().unwrap().is_empty());
    assert_eq!(body["pagination"]["total"], 0);
}

#[tokio::test]
async fn test_listings_for_missing_user() {
    let app = TestApp::new();

    let (status, _) = app.get(&format!("/users/{}/followers", MISSING_ID)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get(&format!("/users/{}/following", MISSING_ID)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_all_follows() {
    let app = TestApp::new();
    let ada = app.create_user_id("ada").await;
    let grace = app.create_user_id("grace").await;
    let alan = app.create_user_id("alan").await;

    app.follow(&ada, &grace).await;
    app.follow(&grace, &alan).await;
    app.follow(&alan, &ada).await;

    let (status, body) = app.get("/follows?limit=2").await;
    assert_eq!(status, StatusCode::OK);

    let edges = body["data"].as_array().unwrap();
    assert_eq!(edges.len(), 2);
    assert_eq!(edges[0]["follower_id"], alan.as_str());
    assert_eq!(edges[1]["follower_id"], grace.as_str());
    assert_eq!(body["pagination"]["total"], 3);
    assert_eq!(body["pagination"]["total_pages"], 2);
}
