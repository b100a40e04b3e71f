mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

use beesides_api::database::tables;
use common::{TestServer, ALICE, ALICE_ID, BOB, CAROL_ID};

#[tokio::test]
async fn me_includes_follow_counts_and_stats() -> Result<()> {
    let server = TestServer::spawn().await?;
    server
        .post("/api/ratings", Some(ALICE), json!({"releaseId": "release-1", "score": 9.5}))
        .await?;
    server
        .post("/api/ratings", Some(ALICE), json!({"releaseId": "release-2", "score": 9}))
        .await?;
    server
        .post("/api/collections", Some(ALICE), json!({"name": "Favourites"}))
        .await?;

    let (status, body) = server.get("/api/profile/me", Some(ALICE)).await?;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["id"], ALICE_ID);
    assert_eq!(data["followers_count"], 1);
    assert_eq!(data["following_count"], 0);
    assert_eq!(data["stats"]["ratings_count"], 2);
    assert_eq!(data["stats"]["reviews_count"], 0);
    assert_eq!(data["stats"]["collections_count"], 1);
    assert_eq!(data["stats"]["rating_distribution"][9], json!({"score": 9, "count": 2}));
    assert!(data.get("is_following").is_none());
    Ok(())
}

#[tokio::test]
async fn public_profile_reports_is_following_for_known_callers() -> Result<()> {
    let server = TestServer::spawn().await?;

    let (status, body) = server.get("/api/profiles?username=alice", Some(BOB)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_following"], true);

    let (_, body) = server.get("/api/profiles?username=alice", None).await?;
    assert!(body["data"].get("is_following").is_none());

    let (status, body) = server.get("/api/profiles?username=nobody", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Profile not found");
    Ok(())
}

#[tokio::test]
async fn patch_updates_allowed_fields_only() -> Result<()> {
    let server = TestServer::spawn().await?;

    let (status, body) = server
        .patch(
            "/api/profile/me",
            Some(ALICE),
            json!({"bio": "Crate digger", "website_url": "https://alice.example.com"}),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Profile updated successfully");
    assert_eq!(body["data"]["bio"], "Crate digger");
    assert_eq!(body["data"]["website_url"], "https://alice.example.com");
    assert_ne!(body["data"]["updated_at"], "2024-01-01T00:00:00Z");

    let (status, body) = server
        .patch("/api/profile/me", Some(ALICE), json!({"is_admin": true}))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap_or_default().contains("unknown field `is_admin`"));

    let (status, body) = server.patch("/api/profile/me", Some(ALICE), json!({})).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No profile fields to update");

    let (status, _) = server
        .patch("/api/profile/me", Some(ALICE), json!({"website_url": "ftp://alice.example.com"}))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let profiles = server.store.rows(tables::PROFILES).await;
    let alice = profiles.iter().find(|p| p["id"] == ALICE_ID).cloned().unwrap_or_default();
    assert_eq!(alice.get("is_admin"), None);
    Ok(())
}

#[tokio::test]
async fn signup_creates_profile_once() -> Result<()> {
    let server = TestServer::spawn().await?;

    let (status, body) = server
        .post("/api/auth/profile", None, json!({"userId": CAROL_ID, "username": "carol_k"}))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "carol_k");
    assert_eq!(body["data"]["display_name"], "carol_k");

    let (status, body) = server
        .post("/api/auth/profile", None, json!({"userId": CAROL_ID, "username": "carol_again"}))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Profile already exists");
    Ok(())
}

#[tokio::test]
async fn signup_rejects_bad_input() -> Result<()> {
    let server = TestServer::spawn().await?;

    let (status, body) = server
        .post("/api/auth/profile", None, json!({"userId": CAROL_ID, "username": "no"}))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap_or_default().starts_with("Username must be 3-30"));

    let (status, body) = server
        .post("/api/auth/profile", None, json!({"userId": CAROL_ID, "username": "alice"}))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Username is already taken");

    let (status, body) = server
        .post("/api/auth/profile", None, json!({"userId": "user-ghost", "username": "ghost"}))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User not found");

    assert_eq!(server.store.rows(tables::PROFILES).await.len(), 2);
    Ok(())
}

#[tokio::test]
async fn signup_accepts_snake_case_display_name() -> Result<()> {
    let server = TestServer::spawn().await?;

    let (status, body) = server
        .post(
            "/api/auth/profile",
            None,
            json!({"userId": CAROL_ID, "username": "carol", "display_name": "Carol C"}),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["display_name"], "Carol C");
    Ok(())
}

#[tokio::test]
async fn signup_accepts_camel_case_display_name() -> Result<()> {
    let server = TestServer::spawn().await?;

    let (status, body) = server
        .post(
            "/api/auth/profile",
            None,
            json!({"userId": CAROL_ID, "username": "carol", "displayName": "Carol K"}),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["display_name"], "Carol K");
    Ok(())
}
