//! Synchronous key-value storage contracts and in-memory adapters.
//!
//! The browser adapter wraps `window.localStorage`; [`MemoryOrigin`] reproduces its cross-tab
//! behaviour for native tests: a write in one area is announced to every *other* area opened on
//! the same origin, and only when the stored text actually changed.

use std::{
    cell::RefCell,
    collections::{HashMap, VecDeque},
    rc::Rc,
};

/// Text key-value store persisted outside the page lifetime.
pub trait KeyValueStore {
    /// Reads the raw text stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error when the store is unavailable.
    fn get_item(&self, key: &str) -> Result<Option<String>, String>;

    /// Writes raw text under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error when the store is unavailable or the write is rejected.
    fn set_item(&self, key: &str, value: &str) -> Result<(), String>;

    /// Deletes `key`. Deleting a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error when the store is unavailable.
    fn remove_item(&self, key: &str) -> Result<(), String>;
}

#[derive(Debug, Clone, Copy, Default)]
/// Store that remembers nothing. Reads are always empty.
pub struct NoopKeyValueStore;

impl KeyValueStore for NoopKeyValueStore {
    fn get_item(&self, _key: &str) -> Result<Option<String>, String> {
        Ok(None)
    }

    fn set_item(&self, _key: &str, _value: &str) -> Result<(), String> {
        Ok(())
    }

    fn remove_item(&self, _key: &str) -> Result<(), String> {
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
/// Single-context in-memory store.
pub struct MemoryKeyValueStore {
    inner: Rc<RefCell<HashMap<String, String>>>,
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, String> {
        Ok(self.inner.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), String> {
        self.inner
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), String> {
        self.inner.borrow_mut().remove(key);
        Ok(())
    }
}

/// Change notification observed by contexts other than the writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageChange {
    /// Key that changed.
    pub key: String,
    /// Previous text, if any.
    pub old_value: Option<String>,
    /// New text, `None` when the key was removed.
    pub new_value: Option<String>,
}

type ChangeListener = Rc<dyn Fn(&StorageChange)>;

struct AreaSlot {
    id: usize,
    listener: Option<ChangeListener>,
    queue: VecDeque<StorageChange>,
}

#[derive(Default)]
struct OriginState {
    items: HashMap<String, String>,
    areas: Vec<AreaSlot>,
    next_area: usize,
}

impl OriginState {
    fn announce(&mut self, writer: usize, change: StorageChange) {
        for area in self.areas.iter_mut().filter(|a| a.id != writer) {
            area.queue.push_back(change.clone());
        }
    }
}

/// Shared storage origin for simulating several tabs in one process.
///
/// Notifications are queued per area and handed to listeners only by
/// [`MemoryOrigin::deliver_pending`], mirroring the asynchronous delivery of browser storage
/// events.
#[derive(Clone, Default)]
pub struct MemoryOrigin {
    inner: Rc<RefCell<OriginState>>,
}

impl MemoryOrigin {
    /// Opens a new storage area, the equivalent of one tab's `localStorage`.
    pub fn open_area(&self) -> MemoryStorageArea {
        let mut state = self.inner.borrow_mut();
        let id = state.next_area;
        state.next_area += 1;
        state.areas.push(AreaSlot {
            id,
            listener: None,
            queue: VecDeque::new(),
        });
        MemoryStorageArea {
            origin: self.clone(),
            id,
        }
    }

    /// Delivers every queued notification to its area's listener. Returns how many were
    /// delivered; notifications for areas without a listener are discarded.
    pub fn deliver_pending(&self) -> usize {
        let mut delivered = 0;
        loop {
            let batch: Vec<(Option<ChangeListener>, StorageChange)> = {
                let mut state = self.inner.borrow_mut();
                state
                    .areas
                    .iter_mut()
                    .flat_map(|area| {
                        let listener = area.listener.clone();
                        area.queue
                            .drain(..)
                            .map(move |change| (listener.clone(), change))
                    })
                    .collect()
            };
            if batch.is_empty() {
                return delivered;
            }
            for (listener, change) in batch {
                if let Some(listener) = listener {
                    listener(&change);
                    delivered += 1;
                }
            }
        }
    }
}

/// One context's view of a [`MemoryOrigin`].
#[derive(Clone)]
pub struct MemoryStorageArea {
    origin: MemoryOrigin,
    id: usize,
}

impl MemoryStorageArea {
    /// Registers the listener for changes made by other areas, replacing any previous one.
    pub fn on_change(&self, listener: impl Fn(&StorageChange) + 'static) {
        let mut state = self.origin.inner.borrow_mut();
        if let Some(area) = state.areas.iter_mut().find(|a| a.id == self.id) {
            area.listener = Some(Rc::new(listener));
        }
    }
}

impl KeyValueStore for MemoryStorageArea {
    fn get_item(&self, key: &str) -> Result<Option<String>, String> {
        Ok(self.origin.inner.borrow().items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), String> {
        let mut state = self.origin.inner.borrow_mut();
        let old_value = state.items.insert(key.to_string(), value.to_string());
        if old_value.as_deref() != Some(value) {
            state.announce(
                self.id,
                StorageChange {
                    key: key.to_string(),
                    old_value,
                    new_value: Some(value.to_string()),
                },
            );
        }
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), String> {
        let mut state = self.origin.inner.borrow_mut();
        if let Some(old_value) = state.items.remove(key) {
            state.announce(
                self.id,
                StorageChange {
                    key: key.to_string(),
                    old_value: Some(old_value),
                    new_value: None,
                },
            );
        }
        Ok(())
    }
}
