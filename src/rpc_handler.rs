//! RPC method handler for the MangaShelf JSON-RPC protocol.
//!
//! Extracted from `rpc_server.rs` so it can be unit-tested independently.
//! [`handle_method`] dispatches one call to the bookmark repository through
//! the shared [`App`]. Live queries are exposed as subscriptions whose
//! updates are pushed as events on the `events` channel.

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{BoxStream, StreamExt};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::app::App;
use crate::services::bookmarks_repository::BookmarksRepositoryTrait;
use crate::services::settings_engine::SettingsEngineTrait;
use crate::types::bookmark::Bookmark;
use crate::types::errors::BookmarkError;
use crate::types::manga::Manga;

/// Name of the event pushed for every subscription update.
pub const CHANGED_EVENT: &str = "bookmarks.changed";

fn param<T: DeserializeOwned>(params: &Value, name: &str) -> Result<T, String> {
    let raw = params
        .get(name)
        .cloned()
        .ok_or_else(|| format!("missing {}", name))?;
    serde_json::from_value(raw).map_err(|e| format!("invalid {}: {}", name, e))
}

fn optional_param<T: DeserializeOwned>(params: &Value, name: &str) -> Result<Option<T>, String> {
    match params.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(_) => param(params, name).map(Some),
    }
}

fn key_params(params: &Value) -> Result<(i64, i64, i32), String> {
    Ok((
        param(params, "manga_id")?,
        param(params, "chapter_id")?,
        param(params, "page")?,
    ))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|e| format!("serialization error: {}", e))
}

/// Dispatch a JSON-RPC method call to the appropriate handler.
///
/// Returns `Ok(Value)` on success or `Err(String)` with an error message.
pub async fn handle_method(
    app: &Arc<App>,
    events: &mpsc::UnboundedSender<Value>,
    method: &str,
    params: &Value,
) -> Result<Value, String> {
    match method {
        "ping" => Ok(json!({"pong": true})),

        // ─── Bookmarks ───
        "bookmark.add" => {
            let manga: Manga = param(params, "manga")?;
            let bookmark: Bookmark = param(params, "bookmark")?;
            let row_id = app
                .bookmarks
                .add(&manga, &bookmark)
                .await
                .map_err(|e| e.to_string())?;
            Ok(json!({"row_id": row_id}))
        }
        "bookmark.get" => {
            let (manga_id, chapter_id, page) = key_params(params)?;
            let bookmark = app
                .bookmarks
                .get(manga_id, chapter_id, page)
                .await
                .map_err(|e| e.to_string())?;
            to_json(&bookmark)
        }
        "bookmark.remove" => {
            let (manga_id, chapter_id, page) = key_params(params)?;
            app.bookmarks
                .remove(manga_id, chapter_id, page)
                .await
                .map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "bookmark.removeBulk" => {
            let ids: HashSet<i64> = param(params, "ids")?;
            let restorer = app
                .bookmarks
                .remove_bulk(&ids)
                .await
                .map_err(|e| e.to_string())?;
            let removed = restorer.len();
            let token = app.register_undo(Box::new(restorer));
            Ok(json!({"undo_token": token, "removed": removed}))
        }
        "bookmark.undo" => {
            let token: String = param(params, "undo_token")?;
            let handle = app
                .take_undo(&token)
                .ok_or_else(|| format!("unknown undo token: {}", token))?;
            let report = handle.reverse().await.map_err(|e| e.to_string())?;
            to_json(&report)
        }
        "bookmark.list" => {
            let manga_id: i64 = param(params, "manga_id")?;
            let bookmarks = first(app.bookmarks.observe_bookmarks(manga_id)).await?;
            to_json(&bookmarks)
        }
        "bookmark.listAll" => {
            let groups = first(app.bookmarks.observe_grouped()).await?;
            to_json(&groups)
        }
        "bookmark.subscribe" => {
            let manga_id: Option<i64> = optional_param(params, "manga_id")?;
            let updates = match manga_id {
                Some(id) => as_json(app.bookmarks.observe_bookmarks(id)),
                None => as_json(app.bookmarks.observe_all()),
            };
            subscribe(app, events, updates).await
        }
        "bookmark.unsubscribe" => {
            let id: String = param(params, "subscription")?;
            if !app.cancel_subscription(&id) {
                return Err(format!("unknown subscription: {}", id));
            }
            Ok(json!({"ok": true}))
        }

        // ─── Manga ───
        "manga.get" => {
            let id: i64 = param(params, "id")?;
            let manga = app
                .bookmarks
                .find_manga(id)
                .await
                .map_err(|e| e.to_string())?;
            to_json(&manga)
        }

        // ─── Settings ───
        "settings.get" => to_json(app.settings_engine.get_settings()),

        _ => Err(format!("unknown method: {}", method)),
    }
}

/// Takes the current value of a live query and drops the subscription.
async fn first<T>(mut query: BoxStream<'static, Result<T, BookmarkError>>) -> Result<T, String> {
    match query.next().await {
        Some(result) => result.map_err(|e| e.to_string()),
        None => Err("live query ended before producing a value".to_string()),
    }
}

fn as_json<T: serde::Serialize + 'static>(
    query: BoxStream<'static, Result<T, BookmarkError>>,
) -> BoxStream<'static, Value> {
    query
        .map(|item| match item {
            Ok(value) => serde_json::to_value(&value)
                .unwrap_or_else(|e| json!({"error": format!("serialization error: {}", e)})),
            Err(e) => json!({"error": e.to_string()}),
        })
        .boxed()
}

/// Replies with the current value and spawns a task that forwards every
/// later update as an event. The task is registered with the app so it can be
/// cancelled.
async fn subscribe(
    app: &Arc<App>,
    events: &mpsc::UnboundedSender<Value>,
    mut updates: BoxStream<'static, Value>,
) -> Result<Value, String> {
    let initial = updates
        .next()
        .await
        .ok_or_else(|| "live query ended before producing a value".to_string())?;

    let subscription = Uuid::new_v4().to_string();
    let events = events.clone();
    let id = subscription.clone();
    let task = tokio::spawn(async move {
        while let Some(data) = updates.next().await {
            let event = json!({"event": CHANGED_EVENT, "subscription": id, "data": data});
            if events.send(event).is_err() {
                debug!(subscription = %id, "event channel closed, ending subscription");
                break;
            }
        }
    });

    app.add_subscription(subscription.clone(), task);
    Ok(json!({"subscription": subscription, "data": initial}))
}
