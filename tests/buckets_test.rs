//! Integration tests for bucket settings: tree, Needs/Wants sections,
//! inline edit buffers and validation.

mod common;

use axum::http::StatusCode;
use common::{fixtures, location, TestClient};
use serde_json::{json, Value};

fn groceries_form<'a>(name: &'a str, limit_a: &'a str) -> Vec<(&'a str, &'a str)> {
    vec![
        ("name", name),
        ("group", "Non-Discretionary"),
        ("parent_id", "3"),
        ("icon", "cart"),
        ("tags", "weekly"),
        ("limit_a", limit_a),
        ("limit_b", "100"),
    ]
}

#[tokio::test]
async fn test_bucket_page_sections() {
    let client = TestClient::new().await;
    let (status, body) = client.get("/buckets").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Needs"));
    assert!(body.contains("Wants"));
    assert!(body.contains("Income"));
    assert!(body.contains("Dining Out *"));
    assert!(body.contains("Parent is in Food"));
    // Couple mode: Groceries is 400 + 100.
    assert!(body.contains("$500.00"));
    // Needs: Rent 1500 + Groceries 500; Wants: Dining Out 150 + Fun 200.
    assert!(body.contains("$2,000.00 / month"));
    assert!(body.contains("$350.00 / month"));
    assert!(body.contains(r#"title="Alex""#));
}

#[tokio::test]
async fn test_group_partition_api() {
    let client = TestClient::new().await;
    let (status, parts) = client.get_json::<Value>("/api/buckets/groups").await;
    assert_eq!(status, StatusCode::OK);
    let parts = parts.unwrap();

    let names = |list: &Value| -> Vec<String> {
        list.as_array()
            .unwrap()
            .iter()
            .map(|e| e["bucket"]["name"].as_str().unwrap().to_string())
            .collect()
    };
    assert_eq!(names(&parts["needs"]), vec!["Housing", "Food"]);
    assert_eq!(names(&parts["wants"]), vec!["Dining Out", "Fun"]);
    assert_eq!(parts["wants"][0]["orphan_of"], "Food");
    assert_eq!(parts["needs"][1]["children"][0]["bucket"]["name"], "Groceries");
    assert_eq!(parts["needs"][1]["children"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_bucket_tree_api_inherits_groups() {
    let client = TestClient::new().await;
    let (_, tree) = client.get_json::<Value>("/api/buckets/tree").await;
    let tree = tree.unwrap();
    let roots = tree.as_array().unwrap();

    assert_eq!(roots.len(), 4);
    let rent = &roots[0]["children"][0];
    assert_eq!(rent["bucket"]["name"], "Rent");
    assert_eq!(rent["bucket"]["group"], Value::Null);
    assert_eq!(rent["group"], "Non-Discretionary");
}

#[tokio::test]
async fn test_create_bucket() {
    let client = TestClient::new().await;
    let (status, headers, _) = client
        .post_form_full(
            "/buckets/create",
            &[("name", "Gym"), ("group", "Discretionary"), ("limit_a", "45,50")],
            &[],
        )
        .await;

    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location(&headers), Some("/buckets"));
    let data = client.backend.data();
    let gym = data.buckets.iter().find(|b| b["name"] == "Gym").unwrap();
    assert_eq!(gym["limit_a"], 45.5);
    assert_eq!(gym["group"], "Discretionary");
}

#[tokio::test]
async fn test_create_bucket_requires_name() {
    let client = TestClient::new().await;
    let (status, body) = client
        .post_form("/buckets/create", &[("name", "  "), ("group", "")])
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Bucket name is required"));
    assert_eq!(client.backend.data().hits("POST /buckets"), 0);
}

#[tokio::test]
async fn test_update_rejects_cycle() {
    let client = TestClient::new().await;
    let (status, body) = client
        .post_form(
            "/buckets/3/update",
            &[("name", "Food"), ("group", "Non-Discretionary"), ("parent_id", "4")],
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("circular reference"));
    assert_eq!(client.backend.data().hits("PUT /buckets/3"), 0);
}

#[tokio::test]
async fn test_update_saves_and_refreshes() {
    let client = TestClient::new().await;
    let (status, _) = client
        .post_form("/buckets/4/update", &groceries_form("Groceries", "450"))
        .await;
    assert_eq!(status, StatusCode::SEE_OTHER);

    let (_, body) = client.get("/buckets").await;
    assert!(body.contains(r#"value="450.00""#));
    assert!(!body.contains("Unsaved changes"));
}

#[tokio::test]
async fn test_draft_survives_until_discarded() {
    let client = TestClient::new().await;
    let (status, _, badge) = client
        .post_form_full(
            "/buckets/4/draft",
            &groceries_form("Groceries", "999"),
            &[("HX-Request", "true")],
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(badge.contains("Unsaved changes"));

    let (_, body) = client.get("/buckets").await;
    assert!(body.contains(r#"value="999.00""#));
    assert!(body.contains("Unsaved changes"));
    assert_eq!(client.backend.data().hits("PUT /buckets/4"), 0);

    let (status, _) = client.post_form("/buckets/4/discard", &[]).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    let (_, body) = client.get("/buckets").await;
    assert!(!body.contains(r#"value="999.00""#));
    assert!(body.contains(r#"value="400.00""#));
}

#[tokio::test]
async fn test_backend_rejection_keeps_input() {
    let client = TestClient::new().await;
    let (status, body) = client
        .post_form("/buckets/4/update", &groceries_form("Rejected", "400"))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Bucket name is already taken"));
    assert!(body.contains(r#"value="Rejected""#));
}

#[tokio::test]
async fn test_delete_needs_confirmation() {
    let client = TestClient::new().await;
    let (status, body) = client.post_form("/buckets/6/delete", &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("explicit confirmation"));
    assert_eq!(client.backend.data().hits("DELETE /buckets/6"), 0);

    let (status, _) = client
        .post_form("/buckets/6/delete", &[("confirm", "yes")])
        .await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert!(!client.backend.data().buckets.iter().any(|b| b["id"] == 6));
}

#[tokio::test]
async fn test_income_section_split_across_groups() {
    let mut data = fixtures();
    data.buckets.push(json!({
        "id": 8, "name": "Side Gig Costs", "parent_id": 7, "group": "Discretionary", "limit_a": 50
    }));
    data.buckets.push(json!({
        "id": 9, "name": "Refunds", "parent_id": 3, "group": "Income", "limit_a": 25
    }));
    let client = TestClient::with_data(data).await;

    let (status, body) = client.get("/buckets").await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(body.matches(r#"action="/buckets/8/update""#).count(), 1);
    assert_eq!(body.matches(r#"action="/buckets/9/update""#).count(), 1);
    assert!(body.contains("Side Gig Costs *"));
    assert!(body.contains("Parent is in Salary"));
    assert!(body.contains("Refunds *"));

    // Wants: Dining Out 150 + Fun 200 + Side Gig Costs 50; Income: Refunds 25.
    assert!(body.contains("$2,000.00 / month"));
    assert!(body.contains("$400.00 / month"));
    assert!(body.contains("$25.00 / month"));
    assert!(!body.contains("$75.00 / month"));
}

#[tokio::test]
async fn test_tree_only_backend() {
    let mut data = fixtures();
    data.bucket_tree = Some(json!([
        {"id": 1, "name": "Food", "group": "Non-Discretionary", "children": [
            {"id": 2, "name": "Groceries", "limit_a": 400},
            {"id": 3, "name": "Takeaway", "group": "Discretionary", "limit_a": 80}
        ]}
    ]));
    let client = TestClient::with_data(data).await;

    let (status, parts) = client.get_json::<Value>("/api/buckets/groups").await;
    assert_eq!(status, StatusCode::OK);
    let parts = parts.unwrap();
    assert_eq!(parts["needs"][0]["children"][0]["bucket"]["name"], "Groceries");
    assert_eq!(parts["needs"][0]["children"][0]["bucket"]["parent_id"], 1);
    assert_eq!(parts["wants"][0]["orphan_of"], "Food");
    assert_eq!(client.backend.data().hits("GET /buckets/tree"), 1);
}
