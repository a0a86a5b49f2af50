//! Tests for live queries: initial emission, re-emission after commits,
//! independence of observers and recovery from lag.

use std::collections::HashSet;
use std::time::Duration;

use futures::stream::{BoxStream, StreamExt};
use tempfile::TempDir;

use mangashelf::database::Database;
use mangashelf::services::bookmarks_repository::{BookmarksRepository, BookmarksRepositoryTrait};
use mangashelf::services::reversible::ReversibleHandle;
use mangashelf::types::bookmark::Bookmark;
use mangashelf::types::errors::BookmarkError;
use mangashelf::types::manga::Manga;
use mangashelf::types::settings::StoreSettings;

const WAIT: Duration = Duration::from_secs(5);

fn repo() -> BookmarksRepository {
    BookmarksRepository::new(Database::open_in_memory().unwrap())
}

async fn next<T: 'static>(query: &mut BoxStream<'static, Result<T, BookmarkError>>) -> T {
    tokio::time::timeout(WAIT, query.next())
        .await
        .expect("live query did not emit in time")
        .expect("live query ended")
        .expect("live query failed")
}

#[tokio::test]
async fn test_observe_bookmark_emits_current_then_changes() {
    let repo = repo();
    let m = Manga::new(1, "Pluto", "/pluto", "LOCAL");
    let mut live = repo.observe_bookmark(1, 5, 2);

    assert_eq!(next(&mut live).await, None);

    let row_id = repo.add(&m, &Bookmark::new(1, 5, 2)).await.unwrap();
    let emitted = next(&mut live).await.expect("bookmark should be visible");
    assert_eq!(emitted.row_id, Some(row_id));

    repo.remove(1, 5, 2).await.unwrap();
    assert_eq!(next(&mut live).await, None);
}

#[tokio::test]
async fn test_observe_bookmarks_follows_one_manga() {
    let repo = repo();
    let a = Manga::new(1, "Pluto", "/pluto", "LOCAL");
    let b = Manga::new(2, "Monster", "/monster", "LOCAL");
    repo.add(&a, &Bookmark::new(1, 1, 0)).await.unwrap();

    let mut live = repo.observe_bookmarks(1);
    assert_eq!(next(&mut live).await.len(), 1);

    // a commit on another manga still re-runs the query; the result is unchanged
    repo.add(&b, &Bookmark::new(2, 1, 0)).await.unwrap();
    assert_eq!(next(&mut live).await.len(), 1);

    repo.add(&a, &Bookmark::new(1, 1, 1)).await.unwrap();
    let pages: Vec<i32> = next(&mut live).await.iter().map(|b| b.page).collect();
    assert_eq!(pages, vec![0, 1]);
}

#[tokio::test]
async fn test_observe_all_groups_by_manga() {
    let repo = repo();
    let a = Manga::new(1, "Pluto", "/pluto", "LOCAL");
    let b = Manga::new(2, "Monster", "/monster", "LOCAL");
    repo.add(&a, &Bookmark::new(1, 1, 0)).await.unwrap();
    repo.add(&a, &Bookmark::new(1, 2, 0)).await.unwrap();
    repo.add(&b, &Bookmark::new(2, 1, 0)).await.unwrap();

    let mut live = repo.observe_all();
    let grouped = next(&mut live).await;
    assert_eq!(grouped.len(), 2);
    assert_eq!(grouped[&1].len(), 2);
    assert_eq!(grouped[&2].len(), 1);

    repo.remove(2, 1, 0).await.unwrap();
    let grouped = next(&mut live).await;
    assert!(!grouped.contains_key(&2), "manga without bookmarks drops out");
}

#[tokio::test]
async fn test_observers_are_independent() {
    let repo = repo();
    let m = Manga::new(1, "Pluto", "/pluto", "LOCAL");
    let mut first = repo.observe_bookmarks(1);
    let mut second = repo.observe_bookmarks(1);
    assert!(next(&mut first).await.is_empty());
    assert!(next(&mut second).await.is_empty());

    drop(second);
    repo.add(&m, &Bookmark::new(1, 1, 0)).await.unwrap();
    assert_eq!(next(&mut first).await.len(), 1);
}

#[tokio::test]
async fn test_bulk_removal_and_undo_emit_once_each() {
    let repo = repo();
    let m = Manga::new(1, "Pluto", "/pluto", "LOCAL");
    let a = repo.add(&m, &Bookmark::new(1, 1, 0)).await.unwrap();
    let b = repo.add(&m, &Bookmark::new(1, 1, 1)).await.unwrap();

    let mut live = repo.observe_bookmarks(1);
    assert_eq!(next(&mut live).await.len(), 2);

    let ids: HashSet<i64> = [a, b].into_iter().collect();
    let restorer = repo.remove_bulk(&ids).await.unwrap();
    assert!(next(&mut live).await.is_empty(), "bulk removal is one atomic commit");

    restorer.reverse().await.unwrap();
    assert_eq!(next(&mut live).await.len(), 2);
}

#[tokio::test]
async fn test_failed_remove_does_not_emit() {
    let repo = repo();
    let mut live = repo.observe_bookmarks(1);
    assert!(next(&mut live).await.is_empty());

    assert!(repo.remove(1, 1, 0).await.is_err());
    let quiet = tokio::time::timeout(Duration::from_millis(200), live.next()).await;
    assert!(quiet.is_err(), "a rolled back write must not wake observers");
}

#[tokio::test]
async fn test_lagging_observer_requeries_latest_state() {
    let dir = TempDir::new().unwrap();
    let settings = StoreSettings {
        observer_capacity: 1,
        ..StoreSettings::default()
    };
    let db = Database::open_with(dir.path().join("lag.db"), &settings).unwrap();
    let repo = BookmarksRepository::with_settings(db, &settings);
    let m = Manga::new(1, "Pluto", "/pluto", "LOCAL");

    let mut live = repo.observe_bookmarks(1);
    assert!(next(&mut live).await.is_empty());

    for page in 0..5 {
        repo.add(&m, &Bookmark::new(1, 1, page)).await.unwrap();
    }

    // Missed notifications collapse into a re-query of the current state.
    let mut latest = next(&mut live).await;
    while latest.len() < 5 {
        latest = next(&mut live).await;
    }
    assert_eq!(latest.len(), 5);
}

#[tokio::test]
async fn test_observe_grouped_resolves_manga_sorted_by_title() {
    let repo = repo();
    let zeta = Manga::new(1, "Zetman", "/zetman", "LOCAL");
    let ajin = Manga::new(2, "Ajin", "/ajin", "LOCAL");
    repo.add(&zeta, &Bookmark::new(1, 1, 0)).await.unwrap();
    repo.add(&ajin, &Bookmark::new(2, 1, 0)).await.unwrap();

    let mut live = repo.observe_grouped();
    let groups = next(&mut live).await;
    let titles: Vec<&str> = groups.iter().map(|g| g.manga.title.as_str()).collect();
    assert_eq!(titles, vec!["Ajin", "Zetman"]);

    // re-saving under a new title re-sorts the groups
    let mut renamed = zeta.clone();
    renamed.title = "Astra".to_string();
    repo.add(&renamed, &Bookmark::new(1, 1, 0)).await.unwrap();
    let groups = next(&mut live).await;
    let titles: Vec<&str> = groups.iter().map(|g| g.manga.title.as_str()).collect();
    assert_eq!(titles, vec!["Ajin", "Astra"]);
}
