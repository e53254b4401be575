//! API integration tests
//!
//! Need a running server with the bootstrap admin configured
//! (`LIBRARY_TEST_ADMIN_USERNAME` / `LIBRARY_TEST_ADMIN_PASSWORD`, default
//! `admin` / `admin`).

use futures::future::join_all;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080";

fn admin_credentials() -> (String, String) {
    (
        std::env::var("LIBRARY_TEST_ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string()),
        std::env::var("LIBRARY_TEST_ADMIN_PASSWORD").unwrap_or_else(|_| "admin".to_string()),
    )
}

/// Suffix keeping names unique across runs against the same database
fn unique(prefix: &str) -> String {
    format!(
        "{}-{}",
        prefix,
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
    )
}

async fn login(client: &Client, username: &str, password: &str) -> String {
    let response = client
        .post(format!("{}/api/login", BASE_URL))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("Failed to send login request");
    assert_eq!(response.status(), StatusCode::OK, "login as {username}");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["access_token"]
        .as_str()
        .expect("No token in response")
        .to_string()
}

async fn admin_token(client: &Client) -> String {
    let (username, password) = admin_credentials();
    login(client, &username, &password).await
}

/// Register a fresh member and return its token
async fn member_token(client: &Client, prefix: &str) -> String {
    let username = unique(prefix);
    let response = client
        .post(format!("{}/api/register", BASE_URL))
        .json(&json!({ "username": username, "password": "pw" }))
        .send()
        .await
        .expect("Failed to send register request");
    assert_eq!(response.status(), StatusCode::CREATED);

    login(client, &username, "pw").await
}

async fn create_category(client: &Client, admin: &str) -> i64 {
    let response = client
        .post(format!("{}/api/create-category", BASE_URL))
        .bearer_auth(admin)
        .json(&json!({ "name": unique("category") }))
        .send()
        .await
        .expect("Failed to create category");
    assert_eq!(response.status(), StatusCode::CREATED);

    let category: Value = response.json().await.expect("Failed to parse category");
    category["id"].as_i64().expect("No category id")
}

/// Create a book with the given stock; returns (book_id, title)
async fn create_book(
    client: &Client,
    admin: &str,
    category_id: Option<i64>,
    stock: i32,
) -> (i64, String) {
    let title = unique("book");
    let response = client
        .post(format!("{}/api/create-book", BASE_URL))
        .bearer_auth(admin)
        .json(&json!({
            "title": title,
            "author": "Test Author",
            "category_id": category_id,
            "stock": stock
        }))
        .send()
        .await
        .expect("Failed to create book");
    assert_eq!(response.status(), StatusCode::CREATED);

    let found: Value = client
        .get(format!("{}/api/books/search", BASE_URL))
        .bearer_auth(admin)
        .query(&[("title", title.as_str())])
        .send()
        .await
        .expect("Failed to search books")
        .json()
        .await
        .expect("Failed to parse search results");
    let book_id = found[0]["id"].as_i64().expect("Created book not found");

    (book_id, title)
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
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
async fn test_register_twice_conflicts() {
    let client = Client::new();
    let username = unique("dup");

    for expected in [StatusCode::CREATED, StatusCode::CONFLICT] {
        let response = client
            .post(format!("{}/api/register", BASE_URL))
            .json(&json!({ "username": username, "password": "pw" }))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), expected);
    }
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();
    let (username, _) = admin_credentials();

    let response = client
        .post(format!("{}/api/login", BASE_URL))
        .json(&json!({ "username": username, "password": "definitely-wrong" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["message"], "invalid credentials");
}

#[tokio::test]
#[ignore]
async fn test_member_cannot_create_book() {
    let client = Client::new();
    let member = member_token(&client, "member").await;

    let response = client
        .post(format!("{}/api/create-book", BASE_URL))
        .bearer_auth(&member)
        .json(&json!({ "title": "Forbidden", "stock": 1 }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore]
async fn test_create_existing_title_merges_stock() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (book_id, title) = create_book(&client, &admin, None, 2).await;

    let response = client
        .post(format!("{}/api/create-book", BASE_URL))
        .bearer_auth(&admin)
        .json(&json!({ "title": title, "stock": 5 }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);

    let book: Value = client
        .get(format!("{}/api/books/{}", BASE_URL, book_id))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("Failed to get book")
        .json()
        .await
        .expect("Failed to parse book");
    assert_eq!(book["stock"], 3);
}

#[tokio::test]
#[ignore]
async fn test_decrease_stock_stops_at_zero() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (book_id, _) = create_book(&client, &admin, None, 1).await;
    let url = format!("{}/api/books/{}/decrease-stock", BASE_URL, book_id);

    let first = client.put(&url).bearer_auth(&admin).send().await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = client.put(&url).bearer_auth(&admin).send().await.unwrap();
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
    let body: Value = second.json().await.unwrap();
    assert_eq!(body["message"], "Stock is already 0, cannot decrease");
}

#[tokio::test]
#[ignore]
async fn test_borrow_and_return_lifecycle() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let alice = member_token(&client, "alice").await;
    let bob = member_token(&client, "bob").await;
    let (book_id, title) = create_book(&client, &admin, None, 1).await;
    let borrow_url = format!("{}/api/books/{}/borrow", BASE_URL, book_id);

    // Alice takes the only copy
    let response = client.post(&borrow_url).bearer_auth(&alice).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Book borrowed successfully");

    // Second attempt by Alice
    let response = client.post(&borrow_url).bearer_auth(&alice).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "You have already borrowed this book");

    // Nothing left for Bob
    let response = client.post(&borrow_url).bearer_auth(&bob).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Book is not available");

    let history: Value = client
        .get(format!("{}/api/my-borrowings", BASE_URL))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let open = history
        .as_array()
        .unwrap()
        .iter()
        .find(|b| b["book_title"] == title.as_str())
        .expect("Borrowing missing from history")
        .clone();
    assert_eq!(open["status"], "borrowed");
    assert!(open["returned_at"].is_null());
    let return_url = format!("{}/api/borrowings/{}/return", BASE_URL, open["id"]);

    // Bob cannot return Alice's copy
    let response = client.put(&return_url).bearer_auth(&bob).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = client.put(&return_url).bearer_auth(&alice).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Book returned successfully");

    let response = client.put(&return_url).bearer_auth(&alice).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Borrowing record not found or already returned");

    let book: Value = client
        .get(format!("{}/api/books/{}", BASE_URL, book_id))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(book["stock"], 1);

    // Borrowing history keeps the book in the catalog
    let response = client
        .delete(format!("{}/api/books/{}/delete", BASE_URL, book_id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore]
async fn test_borrow_unknown_book() {
    let client = Client::new();
    let member = member_token(&client, "carol").await;

    let response = client
        .post(format!("{}/api/books/{}/borrow", BASE_URL, i32::MAX))
        .bearer_auth(&member)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Book not found");
}

#[tokio::test]
#[ignore]
async fn test_search_without_match_is_empty() {
    let client = Client::new();
    let member = member_token(&client, "dave").await;

    let response = client
        .get(format!("{}/api/books/search", BASE_URL))
        .bearer_auth(&member)
        .query(&[("title", unique("no-such-title").as_str())])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!([]));
}

#[tokio::test]
#[ignore]
async fn test_category_in_use_cannot_be_deleted() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let category_id = create_category(&client, &admin).await;
    let (book_id, _) = create_book(&client, &admin, Some(category_id), 1).await;

    let book: Value = client
        .get(format!("{}/api/books/{}", BASE_URL, book_id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(book["category_id"], category_id);
    assert!(book["category"].is_string());

    let url = format!("{}/api/delete-category/{}", BASE_URL, category_id);
    let response = client.delete(&url).bearer_auth(&admin).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = client
        .delete(format!("{}/api/books/{}/delete", BASE_URL, book_id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = client.delete(&url).bearer_auth(&admin).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = client.delete(&url).bearer_auth(&admin).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore]
async fn test_unknown_category_is_rejected() {
    let client = Client::new();
    let admin = admin_token(&client).await;

    let response = client
        .post(format!("{}/api/create-book", BASE_URL))
        .bearer_auth(&admin)
        .json(&json!({ "title": unique("orphan"), "category_id": i32::MAX, "stock": 1 }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Category not found");
}

/// Fire one borrow request per token at the same book, all at once
async fn borrow_concurrently(client: &Client, tokens: &[String], book_id: i64) -> Vec<(StatusCode, Value)> {
    let url = format!("{}/api/books/{}/borrow", BASE_URL, book_id);
    let requests = tokens.iter().map(|token| {
        let request = client.post(&url).bearer_auth(token);
        async move {
            let response = request.send().await.expect("Failed to send borrow request");
            let status = response.status();
            let body: Value = response.json().await.expect("Failed to parse borrow response");
            (status, body)
        }
    });
    join_all(requests).await
}

async fn book_stock(client: &Client, token: &str, book_id: i64) -> i64 {
    let book: Value = client
        .get(format!("{}/api/books/{}", BASE_URL, book_id))
        .bearer_auth(token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    book["stock"].as_i64().expect("No stock in book")
}

#[tokio::test]
#[ignore]
async fn test_last_copy_goes_to_exactly_one_of_many_borrowers() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (book_id, _) = create_book(&client, &admin, None, 1).await;

    let mut members = Vec::new();
    for i in 0..8 {
        members.push(member_token(&client, &format!("rush{i}")).await);
    }

    let results = borrow_concurrently(&client, &members, book_id).await;

    let created = results.iter().filter(|(status, _)| *status == StatusCode::CREATED).count();
    assert_eq!(created, 1, "{results:?}");
    for (status, body) in results.iter().filter(|(status, _)| *status != StatusCode::CREATED) {
        assert_eq!(*status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Book is not available");
    }
    assert_eq!(book_stock(&client, &admin, book_id).await, 0);
}

#[tokio::test]
#[ignore]
async fn test_concurrent_duplicate_borrows_open_one_record() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let member = member_token(&client, "eager").await;
    let (book_id, title) = create_book(&client, &admin, None, 10).await;

    let tokens = vec![member.clone(); 8];
    let results = borrow_concurrently(&client, &tokens, book_id).await;

    let created = results.iter().filter(|(status, _)| *status == StatusCode::CREATED).count();
    assert_eq!(created, 1, "{results:?}");
    for (status, body) in results.iter().filter(|(status, _)| *status != StatusCode::CREATED) {
        assert_eq!(*status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "You have already borrowed this book");
    }

    let history: Value = client
        .get(format!("{}/api/my-borrowings", BASE_URL))
        .bearer_auth(&member)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let open = history
        .as_array()
        .unwrap()
        .iter()
        .filter(|b| b["book_title"] == title.as_str() && b["status"] == "borrowed")
        .count();
    assert_eq!(open, 1);
    assert_eq!(book_stock(&client, &admin, book_id).await, 9);
}

#[tokio::test]
#[ignore]
async fn test_concurrent_creates_of_a_new_title_share_one_row() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let title = unique("popular");

    let url = format!("{}/api/create-book", BASE_URL);
    let requests = (0..6).map(|_| {
        client
            .post(&url)
            .bearer_auth(&admin)
            .json(&json!({ "title": title, "stock": 2 }))
            .send()
    });
    let statuses: Vec<StatusCode> = join_all(requests)
        .await
        .into_iter()
        .map(|response| response.expect("Failed to send request").status())
        .collect();

    assert_eq!(statuses.iter().filter(|s| **s == StatusCode::CREATED).count(), 1);
    assert_eq!(statuses.iter().filter(|s| **s == StatusCode::OK).count(), 5);

    let found: Value = client
        .get(format!("{}/api/books/search", BASE_URL))
        .bearer_auth(&admin)
        .query(&[("title", title.as_str())])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let rows = found.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["stock"], 7);
}

#[tokio::test]
#[ignore]
async fn test_rename_onto_existing_title_conflicts() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (_, taken) = create_book(&client, &admin, None, 1).await;
    let (book_id, _) = create_book(&client, &admin, None, 1).await;

    let response = client
        .put(format!("{}/api/books/{}", BASE_URL, book_id))
        .bearer_auth(&admin)
        .json(&json!({ "title": taken, "stock": 1 }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "A book with this title already exists");
}

#[tokio::test]
#[ignore]
async fn test_overlong_title_is_rejected() {
    let client = Client::new();
    let admin = admin_token(&client).await;

    let response = client
        .post(format!("{}/api/create-book", BASE_URL))
        .bearer_auth(&admin)
        .json(&json!({ "title": "x".repeat(300), "stock": 1 }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Title must be between 1 and 255 characters");
}
