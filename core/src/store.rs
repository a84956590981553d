use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};

pub const KEY_PREFIX: &str = "eventdesk";

/// Minimal string store shared by the browser storages and test doubles.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str);
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("storage unavailable")]
    Unavailable,
    #[error("storage write failed: {0}")]
    WriteFailed(String),
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) {
        self.values.borrow_mut().remove(key);
    }
}

fn scroll_key(path: &str) -> String {
    format!("{KEY_PREFIX}.scroll.{path}")
}

fn search_key(event_id: &str) -> String {
    format!("{KEY_PREFIX}.search.{event_id}")
}

const PENDING_MODAL_KEY: &str = "eventdesk.pending_modal";
const COLLAPSED_STATIONS_KEY: &str = "eventdesk.collapsed_stations";
const OPEN_PANELS_KEY: &str = "eventdesk.open_reservation_panels";
pub const DEBUG_FLAG_KEY: &str = "eventdesk.debug";

/// Per-tab state that only has to survive a reload: scroll offset, a modal to
/// reopen, the last search query.
pub struct SessionStore<S> {
    inner: S,
}

impl<S: KeyValueStore> SessionStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn scroll_position(&self, path: &str) -> Option<(f64, f64)> {
        let raw = self.inner.get(&scroll_key(path))?;
        let (x, y) = raw.split_once(',')?;
        Some((x.trim().parse().ok()?, y.trim().parse().ok()?))
    }

    pub fn set_scroll_position(&self, path: &str, x: f64, y: f64) -> Result<(), StoreError> {
        self.inner.set(&scroll_key(path), &format!("{x},{y}"))
    }

    pub fn take_scroll_position(&self, path: &str) -> Option<(f64, f64)> {
        let position = self.scroll_position(path);
        self.inner.remove(&scroll_key(path));
        position
    }

    pub fn set_pending_modal(&self, modal_id: &str) -> Result<(), StoreError> {
        self.inner.set(PENDING_MODAL_KEY, modal_id)
    }

    pub fn take_pending_modal(&self) -> Option<String> {
        let value = self.inner.get(PENDING_MODAL_KEY);
        self.inner.remove(PENDING_MODAL_KEY);
        value.filter(|id| !id.trim().is_empty())
    }

    pub fn search_query(&self, event_id: &str) -> Option<String> {
        self.inner.get(&search_key(event_id))
    }

    pub fn set_search_query(&self, event_id: &str, query: &str) -> Result<(), StoreError> {
        if query.trim().is_empty() {
            self.inner.remove(&search_key(event_id));
            return Ok(());
        }
        self.inner.set(&search_key(event_id), query)
    }
}

/// UI preferences that persist across visits.
pub struct PreferenceStore<S> {
    inner: S,
}

impl<S: KeyValueStore> PreferenceStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    fn read_set(&self, key: &str) -> BTreeSet<String> {
        self.inner
            .get(key)
            .and_then(|raw| serde_json::from_str::<BTreeSet<String>>(&raw).ok())
            .unwrap_or_default()
    }

    fn write_set(&self, key: &str, set: &BTreeSet<String>) -> Result<(), StoreError> {
        if set.is_empty() {
            self.inner.remove(key);
            return Ok(());
        }
        let raw = serde_json::to_string(set).map_err(|err| StoreError::WriteFailed(err.to_string()))?;
        self.inner.set(key, &raw)
    }

    fn toggle(&self, key: &str, id: &str, member: bool) -> Result<(), StoreError> {
        let mut set = self.read_set(key);
        let changed = if member {
            set.insert(id.to_string())
        } else {
            set.remove(id)
        };
        if changed {
            self.write_set(key, &set)?;
        }
        Ok(())
    }

    pub fn collapsed_stations(&self) -> BTreeSet<String> {
        self.read_set(COLLAPSED_STATIONS_KEY)
    }

    pub fn set_station_collapsed(&self, station_id: &str, collapsed: bool) -> Result<(), StoreError> {
        self.toggle(COLLAPSED_STATIONS_KEY, station_id, collapsed)
    }

    pub fn open_reservation_panels(&self) -> BTreeSet<String> {
        self.read_set(OPEN_PANELS_KEY)
    }

    pub fn set_reservation_panel_open(&self, panel_id: &str, open: bool) -> Result<(), StoreError> {
        self.toggle(OPEN_PANELS_KEY, panel_id, open)
    }

    pub fn debug_enabled(&self) -> bool {
        matches!(
            self.inner.get(DEBUG_FLAG_KEY).as_deref().map(str::trim),
            Some("1") | Some("true") | Some("on")
        )
    }
}
