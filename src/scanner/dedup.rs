//! Pair addresses already analyzed during this process lifetime
//!
//! Nothing is persisted; a restart starts from an empty set.

use dashmap::DashSet;

#[derive(Debug, Default)]
pub struct DedupStore {
    seen: DashSet<String>,
}

impl DedupStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn already_seen(&self, pair_address: &str) -> bool {
        self.seen.contains(pair_address)
    }

    pub fn mark_seen(&self, pair_address: &str) {
        self.seen.insert(pair_address.to_string());
    }

    /// Atomically check and mark. Returns true if the caller now owns the
    /// pair address (it was not seen before).
    pub fn claim(&self, pair_address: &str) -> bool {
        self.seen.insert(pair_address.to_string())
    }

    /// Give back a claim whose analysis did not complete
    pub fn release(&self, pair_address: &str) {
        self.seen.remove(pair_address);
    }

    /// Like [`DedupStore::claim`], but the claim is released when the guard
    /// drops unless [`Claim::commit`] was called first.
    pub fn try_claim<'a>(&'a self, pair_address: &str) -> Option<Claim<'a>> {
        self.claim(pair_address).then(|| Claim {
            store: self,
            pair_address: Some(pair_address.to_string()),
        })
    }

    /// Number of pair addresses analyzed so far
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Pending ownership of a pair address
#[derive(Debug)]
pub struct Claim<'a> {
    store: &'a DedupStore,
    pair_address: Option<String>,
}

impl Claim<'_> {
    /// Keep the pair marked as seen
    pub fn commit(mut self) {
        self.pair_address = None;
    }
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        if let Some(pair_address) = self.pair_address.take() {
            self.store.release(&pair_address);
        }
    }
}
