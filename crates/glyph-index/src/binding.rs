//! Secondary lookup paths into the registry.
//!
//! Two independent tables map external key spaces onto canonical keys:
//!
//! - entity bindings: `(entity address, domain) → key`; many entities may
//!   point at the same key
//! - domain bindings: `domain → key`, one key per domain
//!
//! Both are overwritable pointers with no history of their own. A binding
//! may only target a key that currently has a record, which callers prove
//! through [`KeyPresence`].

use std::collections::HashMap;

use glyph_types::{Address, CanonicalKey, DomainId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{IndexError, IndexResult};

/// Answers whether a canonical key has a current record.
pub trait KeyPresence {
    fn has_record(&self, key: &CanonicalKey) -> bool;
}

/// One entry of a batched entity bind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingRequest {
    pub entity: Address,
    pub domain: DomainId,
    pub key: CanonicalKey,
}

/// Entity and domain binding tables.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingIndex {
    entities: HashMap<(Address, DomainId), CanonicalKey>,
    domains: HashMap<DomainId, CanonicalKey>,
}

impl BindingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point `(entity, domain)` at `key`, replacing any previous binding.
    ///
    /// Returns the key previously bound, if any.
    pub fn bind(
        &mut self,
        presence: &impl KeyPresence,
        entity: Address,
        domain: DomainId,
        key: CanonicalKey,
    ) -> IndexResult<Option<CanonicalKey>> {
        Self::check(presence, domain, &key)?;
        let previous = self.entities.insert((entity, domain), key);
        debug!(%entity, %domain, %key, replaced = previous.is_some(), "entity bound");
        Ok(previous)
    }

    /// Bind every request, or none of them.
    ///
    /// Requests are checked in order and the first one targeting an unknown
    /// key aborts the batch before anything is written. Later requests for
    /// the same `(entity, domain)` win, as if applied one by one.
    pub fn bind_batch(
        &mut self,
        presence: &impl KeyPresence,
        requests: &[BindingRequest],
    ) -> IndexResult<usize> {
        for request in requests {
            Self::check(presence, request.domain, &request.key)?;
        }
        for request in requests {
            self.entities
                .insert((request.entity, request.domain), request.key);
        }
        debug!(count = requests.len(), "entity batch bound");
        Ok(requests.len())
    }

    /// Point `domain` at `key`, replacing any previous binding.
    pub fn bind_domain(
        &mut self,
        presence: &impl KeyPresence,
        domain: DomainId,
        key: CanonicalKey,
    ) -> IndexResult<Option<CanonicalKey>> {
        Self::check(presence, domain, &key)?;
        let previous = self.domains.insert(domain, key);
        debug!(%domain, %key, replaced = previous.is_some(), "domain bound");
        Ok(previous)
    }

    pub fn resolve(&self, entity: &Address, domain: DomainId) -> Option<CanonicalKey> {
        self.entities.get(&(*entity, domain)).copied()
    }

    pub fn resolve_domain(&self, domain: DomainId) -> Option<CanonicalKey> {
        self.domains.get(&domain).copied()
    }

    pub fn has_binding(&self, entity: &Address, domain: DomainId) -> bool {
        self.entities.contains_key(&(*entity, domain))
    }

    /// Every key some binding points at, entity bindings first.
    pub fn targets(&self) -> impl Iterator<Item = &CanonicalKey> {
        self.entities.values().chain(self.domains.values())
    }

    /// Number of entity bindings.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Number of domain bindings.
    pub fn domain_count(&self) -> usize {
        self.domains.len()
    }

    fn check(
        presence: &impl KeyPresence,
        domain: DomainId,
        key: &CanonicalKey,
    ) -> IndexResult<()> {
        if presence.has_record(key) {
            Ok(())
        } else {
            Err(IndexError::UnknownKey { key: *key, domain })
        }
    }
}
