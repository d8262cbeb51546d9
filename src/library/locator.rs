//! Ephemeral locators granting temporary access to blob bytes.
//!
//! Resolving a blob pins its bytes in memory until the locator is revoked.
//! Nothing revokes locators automatically: a caller that forgets to revoke
//! keeps the bytes alive for as long as the registry lives.

use std::{
    collections::HashMap,
    fmt::Display,
    sync::{Arc, Mutex, PoisonError},
};

use uuid::Uuid;

use crate::domain::BlobRecord;

const SCHEME: &str = "blob:trackdeck/";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobUrl(String);

impl BlobUrl {
    fn fresh() -> Self {
        Self(format!("{SCHEME}{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for BlobUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Default)]
pub struct BlobUrls {
    pinned: Mutex<HashMap<BlobUrl, Arc<BlobRecord>>>,
}

impl BlobUrls {
    pub fn pin(&self, blob: BlobRecord) -> BlobUrl {
        let url = BlobUrl::fresh();
        self.lock().insert(url.clone(), Arc::new(blob));
        url
    }

    pub fn open(&self, url: &BlobUrl) -> Option<Arc<BlobRecord>> {
        self.lock().get(url).cloned()
    }

    /// returns false when the locator was unknown or already revoked
    pub fn revoke(&self, url: &BlobUrl) -> bool {
        self.lock().remove(url).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<BlobUrl, Arc<BlobRecord>>> {
        // the map stays consistent even if a holder panicked
        self.pinned.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
