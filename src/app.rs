//! App core for Bookmarkr.
//!
//! Central struct wiring config → store → managers and services, and
//! managing the lifecycle of the realtime listener and the refetch task.

use std::sync::{Arc, Mutex, MutexGuard};

use log::warn;
use tokio::task::JoinHandle;

use crate::config::AppConfig;
use crate::managers::{BookmarkSyncManager, ProfileManager};
use crate::services::{BookmarkAnalyzer, RealtimeListener, ReminderNotifier};
use crate::store::{BookmarkStore, ProfileStore, RemoteStore};
use crate::types::errors::StoreError;

/// Central application struct holding the store, managers and services.
pub struct App {
    pub config: AppConfig,
    pub sync: Arc<BookmarkSyncManager>,
    pub profiles: ProfileManager,
    pub analyzer: BookmarkAnalyzer,
    pub notifier: ReminderNotifier,
    store: Arc<dyn BookmarkStore>,
    realtime: Option<RealtimeListener>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl App {
    /// Builds the app against the hosted backend: remote store plus a
    /// realtime listener publishing into the store's change feed.
    pub fn new(config: AppConfig) -> Result<Self, StoreError> {
        let store = Arc::new(RemoteStore::new(&config)?);
        let realtime = RealtimeListener::with_publisher(
            config.realtime_url(),
            store.change_publisher(),
        );
        Ok(Self::assemble(
            config,
            store.clone(),
            store,
            Some(realtime),
        ))
    }

    /// Builds the app over injected stores — used by tests and the demo
    /// binary with the embedded store, whose change feed is in-process.
    pub fn with_stores(
        config: AppConfig,
        bookmark_store: Arc<dyn BookmarkStore>,
        profile_store: Arc<dyn ProfileStore>,
    ) -> Self {
        Self::assemble(config, bookmark_store, profile_store, None)
    }

    fn assemble(
        config: AppConfig,
        bookmark_store: Arc<dyn BookmarkStore>,
        profile_store: Arc<dyn ProfileStore>,
        realtime: Option<RealtimeListener>,
    ) -> Self {
        let analyzer = BookmarkAnalyzer::from_config(&config);
        Self {
            sync: Arc::new(BookmarkSyncManager::new(bookmark_store.clone())),
            profiles: ProfileManager::new(profile_store),
            analyzer,
            notifier: ReminderNotifier::new(),
            store: bookmark_store,
            realtime,
            listener: Mutex::new(None),
            config,
        }
    }

    /// Startup sequence: start the realtime connection, attach the refetch
    /// listener to the change feed, load the profile, do the initial fetch.
    pub async fn startup(&self) {
        if let Some(realtime) = &self.realtime {
            realtime.spawn();
        }
        let changes = self.store.subscribe_changes();
        *self.listener_slot() = Some(self.sync.spawn_change_listener(changes));

        if let Err(e) = self.profiles.load().await {
            warn!("profile load failed: {}", e);
        }
        self.sync.refresh().await;
    }

    /// Called when the tab regains visibility: force the realtime
    /// subscription to rejoin and refetch to cover anything missed while
    /// the connection was dropped.
    pub async fn notify_visible(&self) {
        if let Some(realtime) = &self.realtime {
            realtime.resubscribe();
        }
        self.sync.refresh().await;
    }

    /// Boolean realtime connection status for UI display. The in-process
    /// change feed of an injected store is always connected.
    pub fn realtime_connected(&self) -> bool {
        self.realtime.as_ref().map(|r| r.is_connected()).unwrap_or(true)
    }

    /// Shutdown sequence: stop the refetch listener and the realtime task.
    pub fn shutdown(&self) {
        if let Some(task) = self.listener_slot().take() {
            task.abort();
        }
        if let Some(realtime) = &self.realtime {
            realtime.shutdown();
        }
    }

    fn listener_slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.listener.lock().unwrap_or_else(|e| e.into_inner())
    }
}
