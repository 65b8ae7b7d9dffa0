//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the eviction list against a simple recency model.

use proptest::prelude::*;
use std::collections::VecDeque;

use crate::cache::EvictionList;

// == Strategies ==
/// Generates operations over a small key space so keys collide often
#[derive(Debug, Clone)]
enum ListOp {
    Insert(u8),
    Promote(u8),
    Remove(u8),
}

fn list_op_strategy() -> impl Strategy<Value = ListOp> {
    prop_oneof![
        3 => (0u8..16).prop_map(ListOp::Insert),
        2 => (0u8..16).prop_map(ListOp::Promote),
        1 => (0u8..16).prop_map(ListOp::Remove),
    ]
}

// == Model ==
/// Front = most recently used
#[derive(Debug, Default)]
struct RecencyModel {
    order: VecDeque<u8>,
}

impl RecencyModel {
    fn insert(&mut self, key: u8, capacity: usize) -> Option<u8> {
        self.order.retain(|k| *k != key);
        let evicted = if self.order.len() >= capacity {
            self.order.pop_back()
        } else {
            None
        };
        self.order.push_front(key);
        evicted
    }

    fn promote(&mut self, key: u8) {
        if let Some(pos) = self.order.iter().position(|k| *k == key) {
            self.order.remove(pos);
            self.order.push_front(key);
        }
    }

    fn remove(&mut self, key: u8) {
        self.order.retain(|k| *k != key);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // For any sequence of operations, the list never holds more than its
    // capacity, evicts exactly the least recently used key, and lists the
    // same keys in the same order as the model.
    #[test]
    fn prop_matches_recency_model(
        capacity in 1usize..8,
        ops in prop::collection::vec(list_op_strategy(), 1..100)
    ) {
        let mut list: EvictionList<u8, u8> = EvictionList::new(None, Some(capacity));
        let mut model = RecencyModel::default();

        for op in ops {
            match op {
                ListOp::Insert(key) => {
                    let mut evicted = None;
                    list.create_placeholder(key, |k| evicted = Some(*k));
                    let expected = model.insert(key, capacity);
                    prop_assert_eq!(evicted, expected, "Evicted key mismatch");
                }
                ListOp::Promote(key) => {
                    let promoted = list.promote_key(&key).is_some();
                    prop_assert_eq!(promoted, model.order.contains(&key));
                    model.promote(key);
                }
                ListOp::Remove(key) => {
                    if let Some(id) = list.id_of(&key) {
                        prop_assert!(list.remove(id).is_some());
                    }
                    model.remove(key);
                }
            }

            prop_assert!(list.len() <= capacity, "Capacity exceeded");
            let expected: Vec<u8> = model.order.iter().copied().collect();
            prop_assert_eq!(list.keys(), expected, "Order mismatch");
        }
    }

    // Every indexed key is reachable from the head and every linked entry is
    // indexed under its own key.
    #[test]
    fn prop_index_and_links_agree(
        ops in prop::collection::vec(list_op_strategy(), 1..100)
    ) {
        let mut list: EvictionList<u8, u8> = EvictionList::new(None, Some(5));

        for op in ops {
            match op {
                ListOp::Insert(key) => {
                    let id = list.create_placeholder(key, |_| {});
                    list.refresh(id, key);
                }
                ListOp::Promote(key) => {
                    list.promote_key(&key);
                }
                ListOp::Remove(key) => {
                    if let Some(id) = list.id_of(&key) {
                        list.remove(id);
                    }
                }
            }

            let keys = list.keys();
            prop_assert_eq!(keys.len(), list.len());
            for key in keys {
                let id = list.id_of(&key);
                prop_assert!(id.is_some(), "Linked key {} is not indexed", key);
                let entry = id.and_then(|id| list.get(id));
                prop_assert_eq!(entry.map(|e| e.key), Some(key));
                prop_assert_eq!(entry.and_then(|e| e.payload), Some(key));
            }
        }
    }
}
