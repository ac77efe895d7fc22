//! In-memory store used by tests and examples.
//!
//! Implements both [`SecureStore`] and [`TrustStore`]. Failures can be
//! injected per operation, and the system trust domain can be locked to mimic
//! a caller without administrator rights.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use chrono::Utc;

use super::{
    delete_from, insert_into, select, Item, Keychain, NewItem, Query, SecureStore, StoreError,
    TrustDomain, TrustResult, TrustSettings, TrustStore, STATUS_AUTHORIZATION_DENIED,
};

/// Store operation, used to target injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// [`SecureStore::insert`].
    Insert,
    /// [`SecureStore::find`].
    Find,
    /// [`SecureStore::delete`].
    Delete,
    /// [`TrustStore::set_trust`].
    SetTrust,
}

#[derive(Default)]
struct State {
    items: HashMap<Keychain, Vec<Item>>,
    trust: HashMap<(TrustDomain, Vec<u8>), TrustSettings>,
    failures: HashMap<Operation, StoreError>,
    system_trust_locked: bool,
}

impl State {
    fn take_failure(&mut self, operation: Operation) -> Result<(), StoreError> {
        match self.failures.remove(&operation) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// Thread-safe in-memory store.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call to `operation` fail with `error`.
    pub fn fail_next(&self, operation: Operation, error: StoreError) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.failures.insert(operation, error);
    }

    /// Reject every trust assertion in the system domain.
    pub fn lock_system_trust(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.system_trust_locked = true;
    }

    /// Every item in `keychain`, payloads included.
    pub fn items(&self, keychain: Keychain) -> Vec<Item> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.items.get(&keychain).cloned().unwrap_or_default()
    }

    /// Number of items in `keychain`.
    pub fn item_count(&self, keychain: Keychain) -> usize {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.items.get(&keychain).map_or(0, Vec::len)
    }
}

impl SecureStore for InMemoryStore {
    fn insert(&self, item: NewItem) -> Result<(), StoreError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.take_failure(Operation::Insert)?;
        let items = state.items.entry(item.keychain).or_default();
        insert_into(items, item)
    }

    fn find(&self, query: &Query) -> Result<Vec<Item>, StoreError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.take_failure(Operation::Find)?;
        let items = state
            .items
            .get(&query.keychain)
            .map(Vec::as_slice)
            .unwrap_or_default();
        select(items, query)
    }

    fn delete(&self, query: &Query) -> Result<usize, StoreError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.take_failure(Operation::Delete)?;
        let items = state.items.entry(query.keychain).or_default();
        delete_from(items, query)
    }
}

impl TrustStore for InMemoryStore {
    fn set_trust(
        &self,
        certificate: &[u8],
        domain: TrustDomain,
        result: TrustResult,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.take_failure(Operation::SetTrust)?;
        if domain == TrustDomain::System && state.system_trust_locked {
            return Err(StoreError::other(
                STATUS_AUTHORIZATION_DENIED,
                "system trust settings require administrator rights",
            ));
        }
        state.trust.insert(
            (domain, certificate.to_vec()),
            TrustSettings {
                result,
                modified_at: Utc::now(),
            },
        );
        Ok(())
    }

    fn trust_settings(
        &self,
        certificate: &[u8],
        domain: TrustDomain,
    ) -> Result<Option<TrustSettings>, StoreError> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Ok(state.trust.get(&(domain, certificate.to_vec())).cloned())
    }
}
