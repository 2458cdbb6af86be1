//! Read-only scheduling configuration: shops, providers, and services.
//!
//! The engine consumes this as an external collaborator — it never mutates
//! hours, leave ranges, or durations. Lookups are synchronous clones; a
//! backing service is expected to cache this data in process.

use dashmap::DashMap;
use ulid::Ulid;

use crate::model::{Provider, Service, Shop};

pub trait Directory: Send + Sync {
    fn shop(&self, id: Ulid) -> Option<Shop>;
    fn provider(&self, id: Ulid) -> Option<Provider>;
    fn service(&self, id: Ulid) -> Option<Service>;
}

#[derive(Default)]
pub struct InMemoryDirectory {
    shops: DashMap<Ulid, Shop>,
    providers: DashMap<Ulid, Provider>,
    services: DashMap<Ulid, Service>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_shop(&self, shop: Shop) {
        self.shops.insert(shop.id, shop);
    }

    pub fn add_provider(&self, provider: Provider) {
        self.providers.insert(provider.id, provider);
    }

    /// Panics in debug builds on a zero-duration service; the scheduling
    /// invariants assume `duration_minutes > 0`.
    pub fn add_service(&self, service: Service) {
        debug_assert!(service.duration_minutes > 0, "service duration must be positive");
        self.services.insert(service.id, service);
    }
}

impl Directory for InMemoryDirectory {
    fn shop(&self, id: Ulid) -> Option<Shop> {
        self.shops.get(&id).map(|s| s.value().clone())
    }

    fn provider(&self, id: Ulid) -> Option<Provider> {
        self.providers.get(&id).map(|p| p.value().clone())
    }

    fn service(&self, id: Ulid) -> Option<Service> {
        self.services.get(&id).map(|s| s.value().clone())
    }
}
