//! LRU Eviction List Module
//!
//! Implements the recency-ordered, capacity-bounded list of cache entries.

use std::collections::HashMap;
use std::time::Duration;

use crate::cache::entry::Entry;
use crate::cache::CacheKey;

// == Entry Handle ==
/// Stable handle to an entry of an [`EvictionList`].
///
/// Handles carry the generation of their slot, so a handle to an evicted entry
/// never resolves to a newer entry that reused the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId {
    slot: usize,
    generation: u64,
}

#[derive(Debug)]
struct Node<K, V> {
    entry: Entry<K, V>,
    /// Neighbour towards the head (more recently used)
    prev: Option<usize>,
    /// Neighbour towards the tail (less recently used)
    next: Option<usize>,
}

#[derive(Debug)]
struct Slot<K, V> {
    generation: u64,
    node: Option<Node<K, V>>,
}

// == Eviction List ==
/// Tracks entries in access order for LRU eviction.
///
/// Entries live in an arena and are linked through slot indices:
/// - Head = Most recently used
/// - Tail = Least recently used
///
/// Every key in the index points at a linked node and every linked node is
/// indexed under its key.
#[derive(Debug)]
pub struct EvictionList<K, V> {
    slots: Vec<Slot<K, V>>,
    free: Vec<usize>,
    index: HashMap<K, usize>,
    head: Option<usize>,
    tail: Option<usize>,
    duration: Option<Duration>,
    max_entries: Option<usize>,
}

impl<K: CacheKey, V> EvictionList<K, V> {
    // == Constructor ==
    /// Creates an empty list.
    ///
    /// `max_entries` must be at least 1 when set; `CacheConfig::validate`
    /// enforces this before a cache builds its list.
    pub fn new(duration: Option<Duration>, max_entries: Option<usize>) -> Self {
        debug_assert!(max_entries != Some(0), "capacity must be at least 1");

        Self {
            slots: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            head: None,
            tail: None,
            duration,
            max_entries,
        }
    }

    // == Create Placeholder ==
    /// Inserts an entry without payload at the head.
    ///
    /// When the list is full the tail entry is evicted first and `on_evict` is
    /// called with its key. A previous entry for the same key is replaced.
    pub fn create_placeholder<F>(&mut self, key: K, on_evict: F) -> EntryId
    where
        F: FnOnce(&K),
    {
        if let Some(&slot) = self.index.get(&key) {
            self.release(slot);
        }

        if !self.has_space() {
            if let Some(tail) = self.tail {
                if let Some(evicted) = self.release(tail) {
                    on_evict(&evicted.key);
                }
            }
        }

        let slot = self.allocate(Entry::placeholder(key.clone()));
        self.index.insert(key, slot);
        self.push_head(slot);

        EntryId {
            slot,
            generation: self.slots[slot].generation,
        }
    }

    // == Promote ==
    /// Moves an entry to the head without touching its payload or timestamp.
    ///
    /// Returns None, leaving the list untouched, if the entry was evicted.
    pub fn promote(&mut self, id: EntryId) -> Option<&Entry<K, V>> {
        let slot = self.resolve(id)?;
        self.move_to_head(slot);
        self.node(slot).map(|node| &node.entry)
    }

    /// Moves the entry indexed under `key` to the head.
    pub fn promote_key(&mut self, key: &K) -> Option<EntryId> {
        let slot = *self.index.get(key)?;
        self.move_to_head(slot);
        Some(EntryId {
            slot,
            generation: self.slots[slot].generation,
        })
    }

    // == Refresh ==
    /// Stores a payload, resets the timestamp and promotes the entry.
    pub fn refresh(&mut self, id: EntryId, payload: V) -> Option<&Entry<K, V>> {
        let slot = self.resolve(id)?;
        if let Some(node) = self.slots[slot].node.as_mut() {
            node.entry.refresh(payload);
        }
        self.move_to_head(slot);
        self.node(slot).map(|node| &node.entry)
    }

    // == Is Stale ==
    /// Checks if an entry should be revalidated. Evicted entries are not stale.
    pub fn is_stale(&self, id: EntryId) -> bool {
        self.get(id)
            .map(|entry| entry.is_stale(self.duration))
            .unwrap_or(false)
    }

    // == Remove ==
    /// Unlinks an entry without calling any eviction callback.
    pub fn remove(&mut self, id: EntryId) -> Option<Entry<K, V>> {
        let slot = self.resolve(id)?;
        self.release(slot)
    }

    // == Lookups ==
    /// Returns the entry behind a handle, if it still exists.
    pub fn get(&self, id: EntryId) -> Option<&Entry<K, V>> {
        let slot = self.resolve(id)?;
        self.node(slot).map(|node| &node.entry)
    }

    /// Returns the handle of the entry indexed under `key`.
    pub fn id_of(&self, key: &K) -> Option<EntryId> {
        let slot = *self.index.get(key)?;
        Some(EntryId {
            slot,
            generation: self.slots[slot].generation,
        })
    }

    /// Checks if a handle still points at a live entry.
    pub fn exists(&self, id: EntryId) -> bool {
        self.resolve(id).is_some()
    }

    /// Checks if an entry is indexed under `key`.
    pub fn contains_key(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Returns keys from most to least recently used.
    pub fn keys(&self) -> Vec<K> {
        let mut keys = Vec::with_capacity(self.index.len());
        let mut cursor = self.head;
        while let Some(slot) = cursor {
            match self.node(slot) {
                Some(node) => {
                    keys.push(node.entry.key.clone());
                    cursor = node.next;
                }
                None => break,
            }
        }
        keys
    }

    // == Length ==
    /// Returns the number of linked entries.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Returns true while another entry fits without eviction.
    pub fn has_space(&self) -> bool {
        match self.max_entries {
            Some(max) => self.index.len() < max,
            None => true,
        }
    }

    // == Internal: Slot Management ==
    fn resolve(&self, id: EntryId) -> Option<usize> {
        let slot = self.slots.get(id.slot)?;
        (slot.generation == id.generation && slot.node.is_some()).then_some(id.slot)
    }

    fn node(&self, slot: usize) -> Option<&Node<K, V>> {
        self.slots.get(slot).and_then(|s| s.node.as_ref())
    }

    fn allocate(&mut self, entry: Entry<K, V>) -> usize {
        let node = Node {
            entry,
            prev: None,
            next: None,
        };

        if let Some(slot) = self.free.pop() {
            self.slots[slot].node = Some(node);
            slot
        } else {
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            self.slots.len() - 1
        }
    }

    /// Unlinks a slot, drops it from the index and recycles it.
    fn release(&mut self, slot: usize) -> Option<Entry<K, V>> {
        self.detach(slot);
        let node = self.slots[slot].node.take()?;
        self.slots[slot].generation += 1;
        self.free.push(slot);
        self.index.remove(&node.entry.key);
        Some(node.entry)
    }

    // == Internal: Linked List Operations ==
    fn detach(&mut self, slot: usize) {
        let (prev, next) = match self.node(slot) {
            Some(node) => (node.prev, node.next),
            None => return,
        };

        match prev.and_then(|p| self.slots[p].node.as_mut()) {
            Some(prev_node) => prev_node.next = next,
            None => self.head = next,
        }

        match next.and_then(|n| self.slots[n].node.as_mut()) {
            Some(next_node) => next_node.prev = prev,
            None => self.tail = prev,
        }

        if let Some(node) = self.slots[slot].node.as_mut() {
            node.prev = None;
            node.next = None;
        }
    }

    fn push_head(&mut self, slot: usize) {
        let old_head = self.head;

        if let Some(node) = self.slots[slot].node.as_mut() {
            node.prev = None;
            node.next = old_head;
        }

        if let Some(head_node) = old_head.and_then(|h| self.slots[h].node.as_mut()) {
            head_node.prev = Some(slot);
        }

        self.head = Some(slot);
        if self.tail.is_none() {
            self.tail = Some(slot);
        }
    }

    fn move_to_head(&mut self, slot: usize) {
        if self.head == Some(slot) {
            return;
        }
        self.detach(slot);
        self.push_head(slot);
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn list(max_entries: usize) -> EvictionList<&'static str, u32> {
        EvictionList::new(Some(Duration::from_secs(2)), Some(max_entries))
    }

    #[tokio::test]
    async fn test_list_new() {
        let list = list(3);
        assert!(list.is_empty());
        assert_eq!(list.len(), 0);
        assert!(list.keys().is_empty());
    }

    #[tokio::test]
    async fn test_placeholders_are_added_at_head() {
        let mut list = list(3);

        list.create_placeholder("key1", |_| {});
        list.create_placeholder("key2", |_| {});
        list.create_placeholder("key3", |_| {});

        assert_eq!(list.len(), 3);
        assert_eq!(list.keys(), vec!["key3", "key2", "key1"]);
    }

    #[tokio::test]
    async fn test_eviction_calls_back_with_tail_key() {
        let mut list = list(2);
        let mut evicted = Vec::new();

        list.create_placeholder("a", |k| evicted.push(*k));
        list.create_placeholder("b", |k| evicted.push(*k));
        list.create_placeholder("c", |k| evicted.push(*k));

        assert_eq!(evicted, vec!["a"]);
        assert_eq!(list.keys(), vec!["c", "b"]);
        assert!(!list.contains_key(&"a"));
    }

    #[tokio::test]
    async fn test_promote_changes_eviction_order() {
        let mut list = list(3);
        let mut evicted = Vec::new();

        let a = list.create_placeholder("a", |_| {});
        list.create_placeholder("b", |_| {});
        list.create_placeholder("c", |_| {});

        assert!(list.promote(a).is_some());
        list.create_placeholder("d", |k| evicted.push(*k));

        assert_eq!(evicted, vec!["b"]);
        assert_eq!(list.keys(), vec!["d", "a", "c"]);
    }

    #[tokio::test]
    async fn test_promote_by_key() {
        let mut list = list(3);

        list.create_placeholder("a", |_| {});
        list.create_placeholder("b", |_| {});

        assert!(list.promote_key(&"a").is_some());
        assert_eq!(list.keys(), vec!["a", "b"]);
        assert!(list.promote_key(&"missing").is_none());
    }

    #[tokio::test]
    async fn test_stale_handle_after_eviction() {
        let mut list = list(1);

        let a = list.create_placeholder("a", |_| {});
        let b = list.create_placeholder("b", |_| {});

        // "b" reuses the slot freed by "a"
        assert!(!list.exists(a));
        assert!(list.exists(b));
        assert!(list.promote(a).is_none());
        assert!(list.refresh(a, 7).is_none());
        assert_eq!(list.get(b).and_then(|e| e.payload), None);
    }

    #[tokio::test]
    async fn test_refresh_sets_payload_and_promotes() {
        let mut list = list(3);

        let a = list.create_placeholder("a", |_| {});
        list.create_placeholder("b", |_| {});

        let entry = list.refresh(a, 42).unwrap();
        assert_eq!(entry.payload, Some(42));
        assert_eq!(list.keys(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_remove_unlinks_without_callback() {
        let mut list = list(3);

        list.create_placeholder("a", |_| {});
        let b = list.create_placeholder("b", |_| {});
        list.create_placeholder("c", |_| {});

        let removed = list.remove(b).unwrap();
        assert_eq!(removed.key, "b");
        assert_eq!(list.keys(), vec!["c", "a"]);
        assert!(list.remove(b).is_none());
    }

    #[tokio::test]
    async fn test_replacing_placeholder_for_same_key() {
        let mut list = list(2);
        let mut evicted = Vec::new();

        let first = list.create_placeholder("a", |_| {});
        list.create_placeholder("b", |_| {});
        let second = list.create_placeholder("a", |k| evicted.push(*k));

        assert!(evicted.is_empty());
        assert!(!list.exists(first));
        assert!(list.exists(second));
        assert_eq!(list.keys(), vec!["a", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_is_stale_uses_duration() {
        let mut list = list(3);
        let a = list.create_placeholder("a", |_| {});
        list.refresh(a, 1);

        assert!(!list.is_stale(a));
        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(list.is_stale(a));

        list.refresh(a, 2);
        assert!(!list.is_stale(a));
    }

    #[tokio::test]
    async fn test_unbounded_list() {
        let mut list: EvictionList<u32, ()> = EvictionList::new(None, None);
        for k in 0..1000 {
            list.create_placeholder(k, |_| panic!("unbounded list must not evict"));
        }
        assert_eq!(list.len(), 1000);
        assert!(list.has_space());
    }
}
