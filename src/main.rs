//! Bookmarkr — bookmark manager core.
//!
//! Entry point: runs a console walkthrough of every component against the
//! embedded store, no network or credentials required.

use std::sync::Arc;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Bookmarkr v{} — Demo Mode                   ║", env!("CARGO_PKG_VERSION"));
    println!("║     Optimistic bookmark sync over a relational store       ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    demo_config();
    demo_database();
    demo_store().await;
    demo_sync().await;
    demo_multi_tab().await;
    demo_realtime_protocol();
    demo_analyzer();
    demo_reminders();
    demo_profile().await;
    demo_app_core().await;

    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("  ✅ All components demonstrated successfully!");
    println!("═══════════════════════════════════════════════════════════════");
}

fn section(name: &str) {
    println!("───────────────────────────────────────────────────────────────");
    println!("  📦 {}", name);
    println!("───────────────────────────────────────────────────────────────");
}

fn demo_config() {
    use bookmarkr::config::AppConfig;
    section("Environment Config");

    let config = AppConfig::from_lookup(|key| match key {
        "BOOKMARKR_REMOTE_URL" => Some("https://demo.example.co".to_string()),
        "BOOKMARKR_API_KEY" => Some("public-anon-key".to_string()),
        "BOOKMARKR_USER_ID" => Some("user-1".to_string()),
        _ => None,
    })
    .expect("demo config should validate");

    println!("  Remote URL: {}", config.remote_url);
    println!("  Realtime endpoint: {}", config.realtime_url());
    println!("  User: {:?}", config.user_id);
    println!("  AI analysis enabled: {}", config.gemini_api_key.is_some());

    let missing = AppConfig::from_lookup(|_| None);
    println!("  Empty environment rejected: {}", missing.is_err());
    println!("  ✓ AppConfig OK");
    println!();
}

fn demo_database() {
    use bookmarkr::database::Database;
    section("Database Layer");

    let db = Database::open_in_memory().expect("failed to open database");
    let tables: Vec<String> = {
        let conn = db.connection();
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect()
    };
    println!("  Created {} tables: {}", tables.len(), tables.join(", "));
    println!("  ✓ Database + migrations OK");
    println!();
}

async fn demo_store() {
    use bookmarkr::store::{BookmarkStore, SqliteStore};
    use bookmarkr::types::bookmark::*;
    section("Embedded Store (CRUD + filters + stats)");

    let store = SqliteStore::in_memory("user-1").expect("failed to open store");

    let rust = store
        .create_bookmark(&CreateBookmarkPayload {
            title: "The Rust Book".to_string(),
            url: "https://doc.rust-lang.org/book".to_string(),
            priority: Some(Priority::High),
            status: Some(Status::Reading),
            ..Default::default()
        })
        .await
        .unwrap();
    store
        .create_bookmark(&CreateBookmarkPayload {
            title: "Tokio Tutorial".to_string(),
            url: "https://tokio.rs/tokio/tutorial".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    println!("  Created 2 bookmarks (defaults: medium/saved)");

    let all = store.fetch_bookmarks(&BookmarkFilters::default()).await.unwrap();
    println!("  Listed {} bookmarks, newest first: {}", all.len(), all[0].title);

    let reading = store
        .fetch_bookmarks(&BookmarkFilters {
            status: Some(Status::Reading),
            ..Default::default()
        })
        .await
        .unwrap();
    println!("  status=reading filter: {} row(s)", reading.len());

    let search = store
        .fetch_bookmarks(&BookmarkFilters {
            search: Some("tokio".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    println!("  search 'tokio': {} row(s)", search.len());

    store
        .update_bookmark(
            &rust.id,
            &UpdateBookmarkPayload {
                status: Some(Status::Completed),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let stats = store.fetch_stats().await.unwrap();
    println!(
        "  Stats: total={} high={} reading={} completed={}",
        stats.total, stats.high_priority, stats.reading, stats.completed
    );
    println!("  ✓ SqliteStore OK");
    println!();
}

async fn demo_sync() {
    use bookmarkr::managers::BookmarkSyncManager;
    use bookmarkr::store::SqliteStore;
    use bookmarkr::types::bookmark::*;
    section("Sync Manager (optimistic mutations)");

    let store = Arc::new(SqliteStore::in_memory("user-1").expect("failed to open store"));
    let sync = BookmarkSyncManager::new(store);
    sync.refresh().await;

    let created = sync
        .add_bookmark(CreateBookmarkPayload {
            title: "Crate docs".to_string(),
            url: "https://docs.rs".to_string(),
            priority: Some(Priority::High),
            ..Default::default()
        })
        .await
        .unwrap();
    println!("  Added bookmark, server id: {}", &created.id[..8]);
    println!(
        "  Stats after add: total={} high={}",
        sync.stats().total,
        sync.stats().high_priority
    );

    sync.edit_bookmark(
        &created.id,
        UpdateBookmarkPayload {
            status: Some(Status::Reading),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    println!("  Edited to status=reading: reading={}", sync.stats().reading);

    sync.remove_bookmark(&created.id).await.unwrap();
    println!(
        "  Removed: total={} high={} (counters decremented once)",
        sync.stats().total,
        sync.stats().high_priority
    );

    // Unknown ids are a no-op, not an error
    sync.remove_bookmark("missing").await.unwrap();
    println!("  Removing unknown id: no-op");
    println!("  ✓ BookmarkSyncManager OK");
    println!();
}

async fn demo_multi_tab() {
    use bookmarkr::managers::BookmarkSyncManager;
    use bookmarkr::store::{BookmarkStore, SqliteStore};
    use bookmarkr::types::bookmark::*;
    use std::time::Duration;
    section("Multi-Tab Sync (change feed → refetch)");

    let store = Arc::new(SqliteStore::in_memory("user-1").expect("failed to open store"));

    let tab_a = Arc::new(BookmarkSyncManager::new(store.clone()));
    let tab_b = Arc::new(BookmarkSyncManager::new(store.clone()));
    tab_a.refresh().await;
    tab_b.refresh().await;

    // Tab B listens to the table change feed
    let listener = tab_b.spawn_change_listener(store.subscribe_changes());

    tab_a
        .add_bookmark(CreateBookmarkPayload {
            title: "Shared bookmark".to_string(),
            url: "https://example.com/shared".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    println!("  Tab A created a bookmark");

    tokio::time::sleep(Duration::from_millis(200)).await;
    println!(
        "  Tab B refetched via notification: {} bookmark(s), total={}",
        tab_b.bookmarks().len(),
        tab_b.stats().total
    );

    listener.abort();
    println!("  ✓ Change feed OK");
    println!();
}

fn demo_realtime_protocol() {
    use bookmarkr::services::realtime::{
        decode_change, join_frame, reconnect_delay, Frame,
    };
    section("Realtime Protocol (frames + backoff)");

    let join = serde_json::to_string(&join_frame()).unwrap();
    println!("  Join frame: {}", &join[..60.min(join.len())]);

    let notification = r#"{
        "topic": "realtime:public:bookmarks",
        "event": "postgres_changes",
        "payload": { "data": { "type": "INSERT", "record": { "id": "abc-123" } } }
    }"#;
    let frame: Frame = serde_json::from_str(notification).unwrap();
    let change = decode_change(&frame).unwrap();
    println!("  Decoded: {:?} for {:?}", change.kind, change.bookmark_id);

    let delays: Vec<_> = (1..=6).map(|n| reconnect_delay(n).as_secs()).collect();
    println!("  Reconnect backoff (s): {:?}", delays);
    println!("  ✓ Realtime protocol OK");
    println!();
}

fn demo_analyzer() {
    use bookmarkr::services::analyzer::parse_analysis_text;
    section("AI Analyzer (response post-processing)");

    let fenced = "```json\n{\"description\": \"Async runtime for Rust\", \
                  \"tags\": [\"rust\", \"async\", \"runtime\"], \
                  \"priority\": \"high\", \"status\": \"reading\"}\n```";
    let result = parse_analysis_text(fenced).unwrap();
    println!("  Parsed fenced output: {:?} / {:?}", result.priority, result.status);
    println!("  Tags: {:?}", result.tags);

    let junk = r#"{"priority": "urgent", "status": "someday"}"#;
    let fallback = parse_analysis_text(junk).unwrap();
    println!(
        "  Invalid fields default: {:?} / {:?}",
        fallback.priority, fallback.status
    );
    println!("  ✓ BookmarkAnalyzer OK");
    println!();
}

fn demo_reminders() {
    use bookmarkr::services::notifier::{due_reminders, reminder_message};
    use bookmarkr::types::bookmark::*;
    use chrono::{Duration, Utc};
    section("Reminders");

    let now = Utc::now();
    let make = |title: &str, reminder_at, is_archived| Bookmark {
        id: title.to_lowercase().replace(' ', "-"),
        user_id: "user-1".to_string(),
        title: title.to_string(),
        url: format!("https://example.com/{}", title.to_lowercase()),
        description: None,
        priority: Priority::Medium,
        status: Status::Saved,
        reminder_at,
        is_archived,
        created_at: now,
        updated_at: now,
    };

    let bookmarks = vec![
        make("Due Yesterday", Some(now - Duration::days(1)), false),
        make("Due Tomorrow", Some(now + Duration::days(1)), false),
        make("Archived", Some(now - Duration::days(2)), true),
        make("No Reminder", None, false),
    ];

    let due = due_reminders(&bookmarks, now);
    println!("  {} of {} bookmarks due", due.len(), bookmarks.len());
    println!("  Message: {}", reminder_message(due[0]));
    println!("  ✓ ReminderNotifier OK");
    println!();
}

async fn demo_profile() {
    use bookmarkr::managers::ProfileManager;
    use bookmarkr::store::SqliteStore;
    use bookmarkr::types::profile::*;
    use chrono::Utc;
    section("Profile Manager");

    let store = Arc::new(SqliteStore::in_memory("user-1").expect("failed to open store"));
    let profiles = ProfileManager::new(store.clone());

    println!("  Before provisioning: {:?}", profiles.load().await.unwrap());
    println!("  Theme falls back to {:?}", profiles.theme());

    let now = Utc::now();
    store
        .seed_profile(&Profile {
            id: "user-1".to_string(),
            full_name: Some("Demo User".to_string()),
            avatar_url: None,
            slack_webhook: None,
            theme: Theme::System,
            created_at: now,
            updated_at: now,
        })
        .unwrap();

    let loaded = profiles.load().await.unwrap().unwrap();
    println!("  Loaded profile: {:?}", loaded.full_name);

    let updated = profiles
        .update(UpdateProfilePayload {
            theme: Some(Theme::Dark),
            ..Default::default()
        })
        .await
        .unwrap();
    println!("  Updated theme: {:?}", updated.theme);
    println!("  ✓ ProfileManager OK");
    println!();
}

async fn demo_app_core() {
    use bookmarkr::app::App;
    use bookmarkr::config::AppConfig;
    use bookmarkr::store::SqliteStore;
    section("App Core (full lifecycle)");

    let config = AppConfig::from_lookup(|key| match key {
        "BOOKMARKR_REMOTE_URL" => Some("https://demo.example.co".to_string()),
        "BOOKMARKR_API_KEY" => Some("public-anon-key".to_string()),
        "BOOKMARKR_USER_ID" => Some("user-1".to_string()),
        _ => None,
    })
    .expect("demo config should validate");

    let store = Arc::new(SqliteStore::in_memory("user-1").expect("failed to open store"));
    let app = App::with_stores(config, store.clone(), store);

    app.startup().await;
    println!("  Startup: profile load → change listener → initial fetch");
    println!("  Realtime connected: {}", app.realtime_connected());
    println!("  Loading: {}", app.sync.is_loading());

    app.notify_visible().await;
    println!("  Visibility regain: resubscribe + refetch");

    app.shutdown();
    println!("  Shutdown: listener stopped");
    println!("  ✓ App Core OK");
}
