use eventdesk_core::{KeyValueStore, PreferenceStore, SessionStore, StoreError};
use web_sys::Storage;

use crate::diag;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum StorageArea {
    Session,
    Local,
}

/// `KeyValueStore` over the browser's Web Storage. Private browsing modes may
/// refuse access entirely, which reads as empty and writes as errors.
#[derive(Clone, Copy, Debug)]
pub(crate) struct WebStore {
    area: StorageArea,
}

impl WebStore {
    pub(crate) fn new(area: StorageArea) -> Self {
        Self { area }
    }

    fn storage(&self) -> Option<Storage> {
        let window = web_sys::window()?;
        match self.area {
            StorageArea::Session => window.session_storage().ok()?,
            StorageArea::Local => window.local_storage().ok()?,
        }
    }
}

impl KeyValueStore for WebStore {
    fn get(&self, key: &str) -> Option<String> {
        self.storage()?.get_item(key).ok()?
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let storage = self.storage().ok_or(StoreError::Unavailable)?;
        storage
            .set_item(key, value)
            .map_err(|err| StoreError::WriteFailed(diag::js_err(err)))
    }

    fn remove(&self, key: &str) {
        if let Some(storage) = self.storage() {
            let _ = storage.remove_item(key);
        }
    }
}

pub(crate) fn session_store() -> SessionStore<WebStore> {
    SessionStore::new(WebStore::new(StorageArea::Session))
}

pub(crate) fn preference_store() -> PreferenceStore<WebStore> {
    PreferenceStore::new(WebStore::new(StorageArea::Local))
}

/// Logs and drops storage failures; nothing stored here is load-bearing.
pub(crate) fn report(scope: &str, result: Result<(), StoreError>) {
    if let Err(err) = result {
        diag::warn(scope, err.to_string());
    }
}
