use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::api::{Message, TenantKey};

/// Fixed-capacity FIFO store. Never blocks: full and empty are reported
/// to the caller immediately.
#[derive(Debug)]
pub(crate) struct BoundedBuffer<T> {
    items: VecDeque<Message<T>>,
    capacity: usize,
}

impl<T> BoundedBuffer<T> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends `message`, handing it back if the buffer is at capacity.
    pub(crate) fn try_push(&mut self, message: Message<T>) -> Result<(), Message<T>> {
        if self.items.len() >= self.capacity {
            return Err(message);
        }
        self.items.push_back(message);
        Ok(())
    }

    pub(crate) fn try_pop(&mut self) -> Option<Message<T>> {
        self.items.pop_front()
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug)]
pub(crate) struct TenantSlot<T> {
    pub(crate) tenant: TenantKey,
    pub(crate) buffer: BoundedBuffer<T>,
}

/// Round-robin ring of every tenant seen so far.
///
/// `slots` is the ring in first-seen order and `index` maps a tenant to its
/// slot. Both only grow, and only through [`Ring::slot_for`], so a tenant
/// is in `index` iff it owns exactly one slot.
#[derive(Debug)]
pub(crate) struct Ring<T> {
    slots: Vec<TenantSlot<T>>,
    index: HashMap<TenantKey, usize>,
    cursor: usize,
    capacity: usize,
}

impl<T> Ring<T> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            index: HashMap::new(),
            cursor: 0,
            capacity,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns the tenant's slot, registering it at the back of the ring on
    /// first sight. The flag is true when the tenant was just registered.
    pub(crate) fn slot_for(&mut self, tenant: &TenantKey) -> (&mut TenantSlot<T>, bool) {
        let existing = self.index.get(tenant).copied();
        let (position, registered) = match existing {
            Some(position) => (position, false),
            None => {
                let position = self.slots.len();
                self.slots.push(TenantSlot {
                    tenant: tenant.clone(),
                    buffer: BoundedBuffer::new(self.capacity),
                });
                self.index.insert(tenant.clone(), position);
                (position, true)
            }
        };
        (&mut self.slots[position], registered)
    }

    /// Visits at most one full rotation starting at the cursor and pops the
    /// first message found. The cursor moves past every visited slot,
    /// including the one that produced the hit.
    pub(crate) fn pop_next(&mut self) -> Option<Message<T>> {
        let len = self.slots.len();
        for _ in 0..len {
            let position = self.cursor;
            self.cursor = (self.cursor + 1) % len;
            if let Some(message) = self.slots[position].buffer.try_pop() {
                return Some(message);
            }
        }
        None
    }

    pub(crate) fn get(&self, tenant: &TenantKey) -> Option<&TenantSlot<T>> {
        self.index.get(tenant).map(|&position| &self.slots[position])
    }

    pub(crate) fn pending(&self) -> usize {
        self.slots.iter().map(|slot| slot.buffer.len()).sum()
    }

    pub(crate) fn all_empty(&self) -> bool {
        self.slots.iter().all(|slot| slot.buffer.is_empty())
    }

    pub(crate) fn tenants(&self) -> impl Iterator<Item = &TenantKey> {
        self.slots.iter().map(|slot| &slot.tenant)
    }
}

#[derive(Debug)]
pub(crate) struct StatsCounters {
    pub(crate) enqueued: AtomicU64,
    pub(crate) dequeued: AtomicU64,
    pub(crate) rejected: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn new() -> Self {
        Self {
            enqueued: AtomicU64::new(0),
            dequeued: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn load(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}
