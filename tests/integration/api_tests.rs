//! API integration tests
//!
//! These run against a live server with a reachable PostgreSQL database.
//! Run with: cargo test -- --ignored

use reqwest::Client;
use serde_json::{json, Value};
use std::time::{SystemTime, UNIX_EPOCH};

const BASE_URL: &str = "http://localhost:8080/api/v1";

/// Unique email per test run to avoid conflicts with leftover data
fn unique_email(tag: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{}-{}@example.org", tag, nanos)
}

async fn create_user(client: &Client, tag: &str) -> i64 {
    let response = client
        .post(format!("{}/users", BASE_URL))
        .json(&json!({
            "name": "Test User",
            "email": unique_email(tag)
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse response");
    body["id"].as_i64().expect("No user ID")
}

async fn create_book(client: &Client, quantity: i64) -> i64 {
    let response = client
        .post(format!("{}/books", BASE_URL))
        .json(&json!({
            "title": "Test Book",
            "author": "Test Author",
            "quantity": quantity
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse response");
    body["id"].as_i64().expect("No book ID")
}

async fn create_loan(client: &Client, user_id: i64, book_id: i64) -> reqwest::Response {
    client
        .post(format!("{}/loans", BASE_URL))
        .json(&json!({
            "user_id": user_id,
            "book_id": book_id
        }))
        .send()
        .await
        .expect("Failed to send request")
}

async fn is_available(client: &Client, book_id: i64) -> bool {
    let response = client
        .get(format!("{}/books/{}/availability", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    body["available"].as_bool().expect("No availability flag")
}

async fn return_loan(client: &Client, loan_id: i64) -> reqwest::Response {
    client
        .post(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .send()
        .await
        .expect("Failed to send request")
}

#[tokio::test]
#[ignore]
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_user_crud() {
    let client = Client::new();
    let user_id = create_user(&client, "crud").await;

    // Read back
    let response = client
        .get(format!("{}/users/{}", BASE_URL, user_id))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    // Update
    let new_email = unique_email("crud-updated");
    let response = client
        .put(format!("{}/users/{}", BASE_URL, user_id))
        .json(&json!({"name": "Renamed User", "email": new_email}))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["name"], "Renamed User");

    // Updating a user to its own current email succeeds
    let response = client
        .put(format!("{}/users/{}", BASE_URL, user_id))
        .json(&json!({"name": "Renamed User", "email": new_email}))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    // Delete
    let response = client
        .delete(format!("{}/users/{}", BASE_URL, user_id))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["detail"].is_string());

    // Gone
    let response = client
        .get(format!("{}/users/{}", BASE_URL, user_id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 404);
}

#[tokio::test]
#[ignore]
async fn test_duplicate_email_rejected() {
    let client = Client::new();
    let email = unique_email("dup");

    let response = client
        .post(format!("{}/users", BASE_URL))
        .json(&json!({"name": "First", "email": email}))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse response");
    let first_id = body["id"].as_i64().unwrap();

    // Same email again
    let response = client
        .post(format!("{}/users", BASE_URL))
        .json(&json!({"name": "Second", "email": email}))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);

    // Updating another user to the taken email is also rejected
    let other_id = create_user(&client, "dup-other").await;
    let response = client
        .put(format!("{}/users/{}", BASE_URL, other_id))
        .json(&json!({"name": "Second", "email": email}))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);

    // Cleanup
    for id in [first_id, other_id] {
        let _ = client
            .delete(format!("{}/users/{}", BASE_URL, id))
            .send()
            .await;
    }
}

#[tokio::test]
#[ignore]
async fn test_invalid_email_rejected() {
    let client = Client::new();

    let response = client
        .post(format!("{}/users", BASE_URL))
        .json(&json!({"name": "Bad Email", "email": "not-an-email"}))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_availability_cycle() {
    let client = Client::new();
    let user_id = create_user(&client, "avail").await;
    let book_id = create_book(&client, 1).await;

    // Fresh single-copy book is available
    assert!(is_available(&client, book_id).await);

    // Borrow the only copy
    let response = create_loan(&client, user_id, book_id).await;
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    let loan_id = body["id"].as_i64().expect("No loan ID");
    assert!(body["return_date"].is_null());

    assert!(!is_available(&client, book_id).await);

    // Second borrow of the same book is refused
    let response = create_loan(&client, user_id, book_id).await;
    assert_eq!(response.status(), 400);

    // Returning frees the copy
    let response = return_loan(&client, loan_id).await;
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["return_date"].is_string());

    assert!(is_available(&client, book_id).await);

    // Returning again: uniformly not found
    let response = return_loan(&client, loan_id).await;
    assert_eq!(response.status(), 404);

    // Cleanup
    let _ = client
        .delete(format!("{}/loans/{}", BASE_URL, loan_id))
        .send()
        .await;
    let _ = client
        .delete(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await;
    let _ = client
        .delete(format!("{}/users/{}", BASE_URL, user_id))
        .send()
        .await;
}

#[tokio::test]
#[ignore]
async fn test_missing_book_reports_unavailable() {
    let client = Client::new();

    // Unknown book: false, not an error
    assert!(!is_available(&client, 0).await);
}

#[tokio::test]
#[ignore]
async fn test_loan_limit() {
    let client = Client::new();
    let user_id = create_user(&client, "limit").await;
    let book_id = create_book(&client, 10).await;

    let mut loan_ids = Vec::new();
    for _ in 0..3 {
        let response = create_loan(&client, user_id, book_id).await;
        assert_eq!(response.status(), 201);
        let body: Value = response.json().await.expect("Failed to parse response");
        loan_ids.push(body["id"].as_i64().unwrap());
    }

    // Fourth active loan is refused
    let response = create_loan(&client, user_id, book_id).await;
    assert_eq!(response.status(), 400);

    // Cleanup: return and delete the loans, then the user and book
    for loan_id in loan_ids {
        let _ = return_loan(&client, loan_id).await;
        let _ = client
            .delete(format!("{}/loans/{}", BASE_URL, loan_id))
            .send()
            .await;
    }
    let _ = client
        .delete(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await;
    let _ = client
        .delete(format!("{}/users/{}", BASE_URL, user_id))
        .send()
        .await;
}

#[tokio::test]
#[ignore]
async fn test_delete_guards() {
    let client = Client::new();
    let user_id = create_user(&client, "guards").await;
    let book_id = create_book(&client, 1).await;

    let response = create_loan(&client, user_id, book_id).await;
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    let loan_id = body["id"].as_i64().unwrap();

    // Neither side of an active loan can be deleted, nor the loan itself
    let response = client
        .delete(format!("{}/users/{}", BASE_URL, user_id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);

    let response = client
        .delete(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);

    let response = client
        .delete(format!("{}/loans/{}", BASE_URL, loan_id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);

    // After the return everything can go, loan first
    let response = return_loan(&client, loan_id).await;
    assert!(response.status().is_success());

    for url in [
        format!("{}/loans/{}", BASE_URL, loan_id),
        format!("{}/books/{}", BASE_URL, book_id),
        format!("{}/users/{}", BASE_URL, user_id),
    ] {
        let response = client.delete(url).send().await.expect("Failed to send request");
        assert!(response.status().is_success());
    }
}

#[tokio::test]
#[ignore]
async fn test_undo_return() {
    let client = Client::new();
    let user_id = create_user(&client, "undo").await;
    let book_id = create_book(&client, 1).await;

    let response = create_loan(&client, user_id, book_id).await;
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    let loan_id = body["id"].as_i64().unwrap();

    // Undoing an active loan is refused
    let response = client
        .post(format!("{}/loans/{}/undo-return", BASE_URL, loan_id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);

    let response = return_loan(&client, loan_id).await;
    assert!(response.status().is_success());

    // Undo restores the active state with no fine
    let response = client
        .post(format!("{}/loans/{}/undo-return", BASE_URL, loan_id))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["return_date"].is_null());
    assert_eq!(body["fine"].as_f64(), Some(0.0));

    assert!(!is_available(&client, book_id).await);

    // Cleanup
    let _ = return_loan(&client, loan_id).await;
    let _ = client
        .delete(format!("{}/loans/{}", BASE_URL, loan_id))
        .send()
        .await;
    let _ = client
        .delete(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await;
    let _ = client
        .delete(format!("{}/users/{}", BASE_URL, user_id))
        .send()
        .await;
}

#[tokio::test]
#[ignore]
async fn test_undo_return_blocked_when_capacity_taken() {
    let client = Client::new();
    let first_user = create_user(&client, "undo-cap-1").await;
    let second_user = create_user(&client, "undo-cap-2").await;
    let book_id = create_book(&client, 1).await;

    // First user borrows and returns the single copy
    let response = create_loan(&client, first_user, book_id).await;
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    let first_loan = body["id"].as_i64().unwrap();

    let response = return_loan(&client, first_loan).await;
    assert!(response.status().is_success());

    // Second user takes the freed copy
    let response = create_loan(&client, second_user, book_id).await;
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    let second_loan = body["id"].as_i64().unwrap();

    // Undoing the first return would exceed capacity
    let response = client
        .post(format!("{}/loans/{}/undo-return", BASE_URL, first_loan))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);

    // Cleanup
    let _ = return_loan(&client, second_loan).await;
    for loan_id in [first_loan, second_loan] {
        let _ = client
            .delete(format!("{}/loans/{}", BASE_URL, loan_id))
            .send()
            .await;
    }
    let _ = client
        .delete(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await;
    for user_id in [first_user, second_user] {
        let _ = client
            .delete(format!("{}/users/{}", BASE_URL, user_id))
            .send()
            .await;
    }
}

#[tokio::test]
#[ignore]
async fn test_update_returned_loan_rejected() {
    let client = Client::new();
    let user_id = create_user(&client, "upd-loan").await;
    let book_id = create_book(&client, 1).await;

    let response = create_loan(&client, user_id, book_id).await;
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    let loan_id = body["id"].as_i64().unwrap();

    let response = return_loan(&client, loan_id).await;
    assert!(response.status().is_success());

    let response = client
        .put(format!("{}/loans/{}", BASE_URL, loan_id))
        .json(&json!({"user_id": user_id, "book_id": book_id}))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);

    // Cleanup
    let _ = client
        .delete(format!("{}/loans/{}", BASE_URL, loan_id))
        .send()
        .await;
    let _ = client
        .delete(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await;
    let _ = client
        .delete(format!("{}/users/{}", BASE_URL, user_id))
        .send()
        .await;
}

#[tokio::test]
#[ignore]
async fn test_list_loans() {
    let client = Client::new();

    let response = client
        .get(format!("{}/loans?offset=0&limit=10", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body.is_array());
}

#[tokio::test]
#[ignore]
async fn test_user_loans_listing() {
    let client = Client::new();
    let user_id = create_user(&client, "user-loans").await;
    let book_id = create_book(&client, 1).await;

    let response = create_loan(&client, user_id, book_id).await;
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    let loan_id = body["id"].as_i64().unwrap();

    let _ = return_loan(&client, loan_id).await;

    // Returned loans still show up in the user's history
    let response = client
        .get(format!("{}/users/{}/loans", BASE_URL, user_id))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    let loans = body.as_array().expect("Expected an array");
    assert!(loans.iter().any(|l| l["id"].as_i64() == Some(loan_id)));

    // Unknown user is a 404, not an empty list
    let response = client
        .get(format!("{}/users/0/loans", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 404);

    // Cleanup
    let _ = client
        .delete(format!("{}/loans/{}", BASE_URL, loan_id))
        .send()
        .await;
    let _ = client
        .delete(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await;
    let _ = client
        .delete(format!("{}/users/{}", BASE_URL, user_id))
        .send()
        .await;
}
