//! Profile manager for Bookmarkr.
//!
//! Thin cache over [`ProfileStore`]. A missing profile row means the
//! backend trigger has not provisioned one yet — that is "no profile",
//! never an error.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::store::ProfileStore;
use crate::types::errors::StoreError;
use crate::types::profile::{Profile, Theme, UpdateProfilePayload};

pub struct ProfileManager {
    store: Arc<dyn ProfileStore>,
    profile: Mutex<Option<Profile>>,
}

impl ProfileManager {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self {
            store,
            profile: Mutex::new(None),
        }
    }

    fn cache(&self) -> MutexGuard<'_, Option<Profile>> {
        self.profile.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fetches the profile and caches it.
    pub async fn load(&self) -> Result<Option<Profile>, StoreError> {
        let profile = self.store.fetch_profile().await?;
        *self.cache() = profile.clone();
        Ok(profile)
    }

    /// Applies a partial update and refreshes the cache from the stored row.
    pub async fn update(&self, payload: UpdateProfilePayload) -> Result<Profile, StoreError> {
        let profile = self.store.update_profile(&payload).await?;
        *self.cache() = Some(profile.clone());
        Ok(profile)
    }

    /// Last loaded profile, if any.
    pub fn profile(&self) -> Option<Profile> {
        self.cache().clone()
    }

    /// Theme preference; defaults to [`Theme::System`] without a profile.
    pub fn theme(&self) -> Theme {
        self.cache().as_ref().map(|p| p.theme).unwrap_or_default()
    }
}
