use std::collections::HashMap;

use proptest::prelude::*;
use tenq_core::{DequeueResult, FairQueue, PutError, TenantKey};

#[derive(Clone, Debug)]
enum Op {
    Put(u8),
    Next,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0u8..4).prop_map(Op::Put),
        2 => Just(Op::Next),
    ]
}

fn tenant(id: u8) -> TenantKey {
    TenantKey::from(format!("t{id}"))
}

proptest! {
    #[test]
    fn per_tenant_order_is_preserved(ops in prop::collection::vec(op(), 0..200), capacity in 1usize..8) {
        let queue = FairQueue::with_capacity(capacity);
        let mut sent: HashMap<TenantKey, Vec<u64>> = HashMap::new();
        let mut received: HashMap<TenantKey, Vec<u64>> = HashMap::new();
        let mut seq = 0u64;

        for op in ops {
            match op {
                Op::Put(id) => {
                    seq += 1;
                    if queue.put(tenant(id), seq).is_ok() {
                        sent.entry(tenant(id)).or_default().push(seq);
                    }
                }
                Op::Next => {
                    if let DequeueResult::Message(message) = queue.next() {
                        received.entry(message.tenant).or_default().push(message.payload);
                    }
                }
            }
        }
        while let DequeueResult::Message(message) = queue.next() {
            received.entry(message.tenant).or_default().push(message.payload);
        }

        prop_assert_eq!(sent, received);
        prop_assert!(queue.is_empty());
    }

    #[test]
    fn buffered_count_never_exceeds_capacity(ops in prop::collection::vec(op(), 0..200), capacity in 1usize..6) {
        let queue = FairQueue::with_capacity(capacity);
        for op in ops {
            match op {
                Op::Put(id) => {
                    let before = queue.pending_for(&tenant(id));
                    match queue.put(tenant(id), 0) {
                        Ok(()) => prop_assert!(before < capacity),
                        Err(PutError::BufferFull(rejected)) => {
                            prop_assert_eq!(rejected, tenant(id));
                            prop_assert_eq!(before, capacity);
                        }
                        Err(PutError::Closed) => prop_assert!(false, "queue was never closed"),
                    }
                }
                Op::Next => {
                    let _ = queue.next();
                }
            }
            for id in 0..4 {
                prop_assert!(queue.pending_for(&tenant(id)) <= capacity);
            }
        }
    }

    #[test]
    fn every_backlogged_tenant_served_within_one_rotation(backlog in prop::collection::vec(1usize..5, 1..6)) {
        let queue = FairQueue::with_capacity(8);
        for (id, &count) in backlog.iter().enumerate() {
            for i in 0..count {
                prop_assert!(queue.put(tenant(id as u8), i as u64).is_ok());
            }
        }

        let ring_len = backlog.len();
        let rounds = *backlog.iter().min().unwrap_or(&0);
        for _ in 0..rounds {
            let mut seen = Vec::new();
            for _ in 0..ring_len {
                match queue.next() {
                    DequeueResult::Message(message) => seen.push(message.tenant),
                    other => prop_assert!(false, "unexpected {:?}", other),
                }
            }
            seen.sort();
            seen.dedup();
            prop_assert_eq!(seen.len(), ring_len);
        }
    }
}
