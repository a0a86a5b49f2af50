//! Unit tests for the RPC handler: all JSON-RPC methods dispatched by `handle_method`.
//!
//! These tests exercise every RPC method through the same code path used by the
//! real `mangashelf-rpc` binary, against an in-memory SQLite database.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::mpsc;

use mangashelf::app::App;
use mangashelf::rpc_handler::{handle_method, CHANGED_EVENT};

type Events = mpsc::UnboundedReceiver<Value>;

/// Create a fresh App over an in-memory DB plus the event channel it pushes to.
fn setup() -> (Arc<App>, mpsc::UnboundedSender<Value>, Events) {
    let app = App::in_memory().expect("Failed to init App");
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(app), tx, rx)
}

fn manga_json(id: i64, title: &str) -> Value {
    json!({"id": id, "title": title, "url": format!("/m/{}", id), "source": "LOCAL"})
}

fn bookmark_json(manga_id: i64, chapter_id: i64, page: i32) -> Value {
    json!({"manga_id": manga_id, "chapter_id": chapter_id, "page": page, "created_at": 1_700_000_000_000i64})
}

async fn add(app: &Arc<App>, tx: &mpsc::UnboundedSender<Value>, manga_id: i64, chapter_id: i64, page: i32) -> i64 {
    let res = handle_method(
        app,
        tx,
        "bookmark.add",
        &json!({"manga": manga_json(manga_id, "Title"), "bookmark": bookmark_json(manga_id, chapter_id, page)}),
    )
    .await
    .expect("bookmark.add failed");
    res["row_id"].as_i64().expect("row_id should be a number")
}

async fn next_event(rx: &mut Events) -> Value {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("no event in time")
        .expect("event channel closed")
}

// ─── Ping ───

#[tokio::test]
async fn test_ping() {
    let (app, tx, _rx) = setup();
    let res = handle_method(&app, &tx, "ping", &json!({})).await.unwrap();
    assert_eq!(res, json!({"pong": true}));
}

// ─── Unknown method ───

#[tokio::test]
async fn test_unknown_method_returns_error() {
    let (app, tx, _rx) = setup();
    let res = handle_method(&app, &tx, "nonexistent.method", &json!({})).await;
    assert!(res.unwrap_err().contains("unknown method"));
}

// ─── Bookmarks ───

#[tokio::test]
async fn test_bookmark_add_and_get() {
    let (app, tx, _rx) = setup();
    let row_id = add(&app, &tx, 1, 10, 3).await;

    let res = handle_method(&app, &tx, "bookmark.get", &json!({"manga_id": 1, "chapter_id": 10, "page": 3}))
        .await
        .unwrap();
    assert_eq!(res["row_id"], json!(row_id));
    assert_eq!(res["page"], json!(3));

    let missing = handle_method(&app, &tx, "bookmark.get", &json!({"manga_id": 1, "chapter_id": 10, "page": 4}))
        .await
        .unwrap();
    assert!(missing.is_null());
}

#[tokio::test]
async fn test_bookmark_add_missing_params() {
    let (app, tx, _rx) = setup();
    let res = handle_method(&app, &tx, "bookmark.add", &json!({"manga": manga_json(1, "T")})).await;
    assert!(res.unwrap_err().contains("missing bookmark"));
}

#[tokio::test]
async fn test_bookmark_add_invalid_bookmark() {
    let (app, tx, _rx) = setup();
    let res = handle_method(
        &app,
        &tx,
        "bookmark.add",
        &json!({"manga": manga_json(1, "T"), "bookmark": bookmark_json(2, 1, 0)}),
    )
    .await;
    assert!(res.unwrap_err().contains("Invalid bookmark"));
}

#[tokio::test]
async fn test_bookmark_remove() {
    let (app, tx, _rx) = setup();
    add(&app, &tx, 1, 10, 3).await;
    let params = json!({"manga_id": 1, "chapter_id": 10, "page": 3});

    let res = handle_method(&app, &tx, "bookmark.remove", &params).await.unwrap();
    assert_eq!(res, json!({"ok": true}));

    let again = handle_method(&app, &tx, "bookmark.remove", &params).await;
    assert!(again.unwrap_err().contains("Bookmark not found"));
}

#[tokio::test]
async fn test_bookmark_remove_bulk_and_undo() {
    let (app, tx, _rx) = setup();
    let a = add(&app, &tx, 1, 1, 0).await;
    let b = add(&app, &tx, 1, 1, 1).await;

    let res = handle_method(&app, &tx, "bookmark.removeBulk", &json!({"ids": [a, b, 4242]}))
        .await
        .unwrap();
    assert_eq!(res["removed"], json!(2));
    let token = res["undo_token"].as_str().unwrap().to_string();
    assert_eq!(app.pending_undo_count(), 1);

    let listed = handle_method(&app, &tx, "bookmark.list", &json!({"manga_id": 1})).await.unwrap();
    assert_eq!(listed, json!([]));

    let report = handle_method(&app, &tx, "bookmark.undo", &json!({"undo_token": token}))
        .await
        .unwrap();
    assert_eq!(report, json!({"restored": 2, "skipped": 0}));

    let listed = handle_method(&app, &tx, "bookmark.list", &json!({"manga_id": 1})).await.unwrap();
    let ids: Vec<i64> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["row_id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![a, b]);

    // tokens redeem once
    let again = handle_method(&app, &tx, "bookmark.undo", &json!({"undo_token": token})).await;
    assert!(again.unwrap_err().contains("unknown undo token"));
}

#[tokio::test]
async fn test_bookmark_list_all_groups_with_manga() {
    let (app, tx, _rx) = setup();
    add(&app, &tx, 1, 1, 0).await;
    add(&app, &tx, 2, 1, 0).await;
    add(&app, &tx, 2, 1, 1).await;

    let res = handle_method(&app, &tx, "bookmark.listAll", &json!({})).await.unwrap();
    let groups = res.as_array().unwrap();
    assert_eq!(groups.len(), 2);
    let counts: Vec<usize> = groups
        .iter()
        .map(|g| g["bookmarks"].as_array().unwrap().len())
        .collect();
    assert_eq!(counts.iter().sum::<usize>(), 3);
    assert!(groups.iter().all(|g| g["manga"]["title"] == json!("Title")));
}

// ─── Subscriptions ───

#[tokio::test]
async fn test_subscribe_pushes_changes() {
    let (app, tx, mut rx) = setup();

    let res = handle_method(&app, &tx, "bookmark.subscribe", &json!({"manga_id": 1}))
        .await
        .unwrap();
    assert_eq!(res["data"], json!([]));
    let subscription = res["subscription"].as_str().unwrap().to_string();
    assert_eq!(app.subscription_count(), 1);

    add(&app, &tx, 1, 1, 0).await;
    let event = next_event(&mut rx).await;
    assert_eq!(event["event"], json!(CHANGED_EVENT));
    assert_eq!(event["subscription"], json!(subscription));
    assert_eq!(event["data"].as_array().unwrap().len(), 1);

    let res = handle_method(&app, &tx, "bookmark.unsubscribe", &json!({"subscription": subscription}))
        .await
        .unwrap();
    assert_eq!(res, json!({"ok": true}));
    assert_eq!(app.subscription_count(), 0);
}

#[tokio::test]
async fn test_subscribe_without_manga_watches_everything() {
    let (app, tx, mut rx) = setup();
    let res = handle_method(&app, &tx, "bookmark.subscribe", &json!({})).await.unwrap();
    assert_eq!(res["data"], json!({}));

    add(&app, &tx, 7, 1, 0).await;
    let event = next_event(&mut rx).await;
    assert_eq!(event["data"]["7"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unsubscribe_unknown() {
    let (app, tx, _rx) = setup();
    let res = handle_method(&app, &tx, "bookmark.unsubscribe", &json!({"subscription": "nope"})).await;
    assert!(res.unwrap_err().contains("unknown subscription"));
}

// ─── Manga / Settings ───

#[tokio::test]
async fn test_manga_get() {
    let (app, tx, _rx) = setup();
    add(&app, &tx, 3, 1, 0).await;

    let res = handle_method(&app, &tx, "manga.get", &json!({"id": 3})).await.unwrap();
    assert_eq!(res["title"], json!("Title"));
    assert_eq!(res["rating"], json!(-1.0));

    let missing = handle_method(&app, &tx, "manga.get", &json!({"id": 4})).await.unwrap();
    assert!(missing.is_null());
}

#[tokio::test]
async fn test_settings_get() {
    let (app, tx, _rx) = setup();
    let res = handle_method(&app, &tx, "settings.get", &json!({})).await.unwrap();
    assert_eq!(res["observer_capacity"], json!(64));
    assert_eq!(res["log_restore_conflicts"], json!(true));
}

#[tokio::test]
async fn test_shutdown_cancels_everything() {
    let (app, tx, _rx) = setup();
    handle_method(&app, &tx, "bookmark.subscribe", &json!({})).await.unwrap();
    let a = add(&app, &tx, 1, 1, 0).await;
    handle_method(&app, &tx, "bookmark.removeBulk", &json!({"ids": [a]})).await.unwrap();

    app.shutdown();
    assert_eq!(app.subscription_count(), 0);
    assert_eq!(app.pending_undo_count(), 0);
}
