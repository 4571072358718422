//! Ordered stream table shared by the AE and eLWB host scheduler policies.
//!
//! Kept ordered by `node_id` for deterministic slot assignment; a
//! `heapless::Vec` with insertion-sort placement, since the table is
//! small and bounded.

use heapless::Vec;

/// Per-stream state on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Known but not currently allocated a slot.
    Inactive,
    /// Has outstanding data and is waiting for a slot.
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamEntry {
    pub node_id: u16,
    pub state: StreamState,
}

/// Ordered-by-`node_id` table of known streams, bounded at `N`.
pub struct StreamTable<const N: usize> {
    entries: Vec<StreamEntry, N>,
}

impl<const N: usize> StreamTable<N> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StreamEntry> {
        self.entries.iter()
    }

    /// Reactivate `node_id` if known, else insert it in `node_id` order.
    /// Returns `false` (and logs) if the table is full and `node_id` is
    /// unknown.
    pub fn request(&mut self, node_id: u16) -> bool {
        if let Some(e) = self.entries.iter_mut().find(|e| e.node_id == node_id) {
            e.state = StreamState::Active;
            return true;
        }
        if self.entries.is_full() {
            log::warn!("scheduler: stream table full, dropping request from {node_id}");
            return false;
        }
        let pos = self
            .entries
            .iter()
            .position(|e| e.node_id > node_id)
            .unwrap_or(self.entries.len());
        let _ = self.entries.insert(
            pos,
            StreamEntry {
                node_id,
                state: StreamState::Active,
            },
        );
        true
    }

    /// Mark `node_id` inactive (data served); no-op if unknown.
    pub fn deactivate(&mut self, node_id: u16) {
        if let Some(e) = self.entries.iter_mut().find(|e| e.node_id == node_id) {
            e.state = StreamState::Inactive;
        }
    }

    /// Active streams in `node_id` order, up to `max`.
    pub fn active_node_ids(&self, max: usize) -> Vec<u16, N> {
        let mut out = Vec::new();
        for e in self.entries.iter().filter(|e| e.state == StreamState::Active) {
            if out.len() >= max {
                break;
            }
            let _ = out.push(e.node_id);
        }
        out
    }

    /// All known streams in `node_id` order, active or inactive, up to
    /// `max`. Used where every registered node should get a chance (e.g. a
    /// request-round slot), not just the currently-active ones.
    pub fn all_node_ids(&self, max: usize) -> Vec<u16, N> {
        let mut out = Vec::new();
        for e in self.entries.iter() {
            if out.len() >= max {
                break;
            }
            let _ = out.push(e.node_id);
        }
        out
    }

    /// Whether `node_id` has an entry at all, active or inactive.
    pub fn contains(&self, node_id: u16) -> bool {
        self.entries.iter().any(|e| e.node_id == node_id)
    }
}

impl<const N: usize> Default for StreamTable<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_insert_in_node_id_order() {
        let mut t: StreamTable<8> = StreamTable::new();
        t.request(30);
        t.request(10);
        t.request(20);
        let ids: Vec<u16, 8> = t.iter().map(|e| e.node_id).collect();
        assert_eq!(&ids[..], &[10, 20, 30]);
    }

    #[test]
    fn repeated_request_reactivates_rather_than_duplicates() {
        let mut t: StreamTable<8> = StreamTable::new();
        t.request(5);
        t.deactivate(5);
        t.request(5);
        assert_eq!(t.len(), 1);
        assert_eq!(
            t.iter().next().unwrap().state,
            StreamState::Active
        );
    }

    #[test]
    fn full_table_drops_unknown_request() {
        let mut t: StreamTable<2> = StreamTable::new();
        assert!(t.request(1));
        assert!(t.request(2));
        assert!(!t.request(3));
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn all_node_ids_includes_inactive_entries() {
        let mut t: StreamTable<8> = StreamTable::new();
        t.request(10);
        t.request(20);
        t.deactivate(10);
        assert_eq!(&t.active_node_ids(8)[..], &[20]);
        assert_eq!(&t.all_node_ids(8)[..], &[10, 20]);
    }

    #[test]
    fn contains_reports_known_ids_regardless_of_state() {
        let mut t: StreamTable<8> = StreamTable::new();
        t.request(7);
        t.deactivate(7);
        assert!(t.contains(7));
        assert!(!t.contains(8));
    }
}
