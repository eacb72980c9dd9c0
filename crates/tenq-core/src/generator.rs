use std::collections::HashMap;

use crate::api::{Message, TenantKey};

/// Produces distinguishable payloads: each tenant counts up from 1
/// independently of every other tenant.
#[derive(Clone, Debug, Default)]
pub struct PayloadGenerator {
    counters: HashMap<TenantKey, u64>,
}

impl PayloadGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_for(&mut self, tenant: impl Into<TenantKey>) -> Message<u64> {
        let tenant = tenant.into();
        let counter = self.counters.entry(tenant.clone()).or_insert(0);
        *counter += 1;
        Message::new(tenant, *counter)
    }

    /// Last payload handed out for `tenant`, 0 if none yet.
    pub fn last(&self, tenant: &TenantKey) -> u64 {
        self.counters.get(tenant).copied().unwrap_or(0)
    }
}
