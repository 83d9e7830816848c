use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};

use crate::model::normalize_address;

/// Address → subscriber contact mapping shared by the subscribe endpoint and
/// the event pipeline.
///
/// Implementations normalize addresses themselves so callers may pass any
/// casing; input format is validated before it reaches the registry.
pub trait SubscriptionRegistry: Send + Sync {
    /// Stores or replaces the contact for `address`.
    fn put(&self, address: &str, contact: &str);

    fn lookup(&self, address: &str) -> Option<String>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-lifetime registry; nothing survives a restart.
#[derive(Debug, Default)]
pub struct InMemorySubscriptionRegistry {
    inner: RwLock<HashMap<String, String>>,
}

impl InMemorySubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SubscriptionRegistry for InMemorySubscriptionRegistry {
    fn put(&self, address: &str, contact: &str) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        guard.insert(normalize_address(address), contact.to_owned());
    }

    fn lookup(&self, address: &str) -> Option<String> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        guard.get(&normalize_address(address)).cloned()
    }

    fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
