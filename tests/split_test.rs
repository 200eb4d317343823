//! Integration tests for splitting one transaction into categorized lines.

mod common;

use axum::http::StatusCode;
use common::{location, TestClient};

fn lines<'a>(first: &'a str, second: &'a str, action: &'a str) -> Vec<(&'a str, &'a str)> {
    vec![
        ("description", "Costco food"),
        ("amount", first),
        ("bucket_id", "4"),
        ("description", "Costco household"),
        ("amount", second),
        ("bucket_id", "6"),
        ("action", action),
    ]
}

#[tokio::test]
async fn test_split_form_starts_with_two_lines() {
    let client = TestClient::new().await;
    let (status, body) = client.get("/transactions/10/split").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Costco Wholesale"));
    assert!(body.contains("Mar 14, 2024"));
    assert!(body.contains(r#"value="100.00""#));
    assert_eq!(body.matches(r#"name="description""#).count(), 2);
    // Two lines cannot be removed.
    assert!(!body.contains(r#"value="remove:0""#));
}

#[tokio::test]
async fn test_amount_edit_balances_other_line() {
    let client = TestClient::new().await;
    let (status, body) = client
        .post_form("/transactions/10/split", &lines("60", "", "amount:0"))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#"value="60""#));
    assert!(body.contains(r#"value="40.00""#));
    assert!(!body.contains("Lines must add up to the original amount"));
}

#[tokio::test]
async fn test_add_and_remove_lines() {
    let client = TestClient::new().await;
    let (_, body) = client
        .post_form("/transactions/10/split", &lines("60", "40", "add"))
        .await;
    assert_eq!(body.matches(r#"name="description""#).count(), 3);
    assert!(body.contains(r#"value="remove:2""#));

    let (status, body) = client
        .post_form("/transactions/10/split", &lines("60", "40", "remove:1"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("A split needs at least two lines"));
    assert_eq!(body.matches(r#"name="description""#).count(), 2);
}

#[tokio::test]
async fn test_unbalanced_submit_is_refused() {
    let client = TestClient::new().await;
    let (status, body) = client
        .post_form("/transactions/10/split", &lines("60", "30", "submit"))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Split lines must add up to 100.00"));
    assert!(body.contains("90.00"));
    let data = client.backend.data();
    assert!(data.splits.is_empty());
    assert_eq!(data.hits("POST /transactions/10/split"), 0);
}

#[tokio::test]
async fn test_balanced_submit_keeps_sign_and_date() {
    let client = TestClient::new().await;
    let (status, headers, _) = client
        .post_form_full("/transactions/10/split", &lines("60", "40", "submit"), &[])
        .await;

    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location(&headers), Some("/transactions"));

    let data = client.backend.data();
    assert_eq!(data.splits.len(), 1);
    let (id, payload) = &data.splits[0];
    assert_eq!(*id, 10);
    assert_eq!(payload[0]["amount"], -60.0);
    assert_eq!(payload[1]["amount"], -40.0);
    assert_eq!(payload[0]["bucket_id"], 4);
    assert_eq!(payload[1]["date"], "2024-03-14");
    assert_eq!(payload[1]["description"], "Costco household");
}

#[tokio::test]
async fn test_split_of_missing_transaction() {
    let client = TestClient::new().await;
    let (status, _) = client.get("/transactions/999/split").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
