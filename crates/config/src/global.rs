//! Process-wide configuration instance.
//!
//! Components should take an `Arc<ConfigStore>` explicitly. This module exists
//! for the places that need "first construction wins" semantics (the CLI entry
//! point, plugin factories). Tests that touch it must call [`reset`].

use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::ConfigStore;

static GLOBAL: RwLock<Option<Arc<ConfigStore>>> = RwLock::new(None);

/// The installed store, if any.
pub fn get() -> Option<Arc<ConfigStore>> {
    GLOBAL
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Install `store` unless one is already installed; returns the installed one.
pub fn init(store: ConfigStore) -> Arc<ConfigStore> {
    get_or_init(|| store)
}

/// Return the installed store, building it with `init` on first access.
pub fn get_or_init(init: impl FnOnce() -> ConfigStore) -> Arc<ConfigStore> {
    if let Some(store) = get() {
        return store;
    }
    let mut slot = GLOBAL.write().unwrap_or_else(PoisonError::into_inner);
    match slot.as_ref() {
        Some(store) => Arc::clone(store),
        None => {
            let store = Arc::new(init());
            debug!("Installed global config store");
            *slot = Some(Arc::clone(&store));
            store
        }
    }
}

/// Drop the installed store so the next access builds a fresh one.
pub fn reset() {
    *GLOBAL.write().unwrap_or_else(PoisonError::into_inner) = None;
}

#[cfg(test)]
mod tests {
    use super::*;

    // One test so nothing else in this crate races on the static.
    #[test]
    fn first_construction_wins_until_reset() {
        reset();
        assert!(get().is_none());

        let first = init(ConfigStore::empty());
        first.set("WHO", "first");

        let second = init(ConfigStore::empty());
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.get("who").as_deref(), Some("first"));

        let third = get_or_init(|| panic!("must not rebuild"));
        assert!(Arc::ptr_eq(&first, &third));

        reset();
        let fresh = init(ConfigStore::empty());
        assert!(!Arc::ptr_eq(&first, &fresh));
        assert!(fresh.get("who").is_none());
        reset();
    }
}
