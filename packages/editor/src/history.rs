//! # History Store
//!
//! Linear undo/redo over whole `AppState` snapshots.
//!
//! ## Design
//!
//! - Seeded with the initial state, so `histories` is never empty
//! - `record` drops the redo tail, then appends
//! - Oldest entries are evicted past `max_depth`
//! - Undo at index 0 and redo at the tail are no-ops
//!
//! ```text
//! record(s3)            [s0, s1, s2, s3]   index 3
//! undo() x2             [s0, s1, s2, s3]   index 1
//! record(s4)            [s0, s1, s4]       index 2   (s2, s3 dropped)
//! ```
//!
//! Snapshots share their `data`/`ui` slices with the live state, so an
//! entry costs two reference counts unless the slice actually changed.

use crate::state::AppState;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Default number of retained entries
pub const DEFAULT_HISTORY_DEPTH: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct History {
    #[serde(default)]
    pub id: String,

    pub state: AppState,
}

/// Serializable history, used to persist and resume a session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    #[serde(default)]
    pub histories: Vec<History>,

    #[serde(default)]
    pub index: usize,
}

#[derive(Debug, Clone)]
pub struct HistoryStore {
    histories: VecDeque<History>,
    index: usize,
    max_depth: usize,
    next_id: u64,
}

impl HistoryStore {
    pub fn new(initial: AppState) -> Self {
        Self::with_max_depth(initial, DEFAULT_HISTORY_DEPTH)
    }

    pub fn with_max_depth(initial: AppState, max_depth: usize) -> Self {
        let mut store = Self {
            histories: VecDeque::new(),
            index: 0,
            max_depth: max_depth.max(1),
            next_id: 0,
        };
        let entry = store.entry(initial);
        store.histories.push_back(entry);
        store
    }

    /// Resume from a persisted snapshot. An empty snapshot is seeded with
    /// `fallback`; an out-of-range index is clamped to the last entry.
    pub fn from_snapshot(snapshot: HistorySnapshot, fallback: AppState, max_depth: usize) -> Self {
        if snapshot.histories.is_empty() {
            return Self::with_max_depth(fallback, max_depth);
        }

        let mut store = Self {
            histories: VecDeque::new(),
            index: 0,
            max_depth: max_depth.max(1),
            next_id: 0,
        };
        store.load(snapshot.histories);
        store.index = snapshot.index.min(store.histories.len() - 1);
        store
    }

    /// Append a state, dropping anything after the cursor
    pub fn record(&mut self, state: AppState) {
        self.histories.truncate(self.index + 1);

        let entry = self.entry(state);
        self.histories.push_back(entry);

        while self.histories.len() > self.max_depth {
            self.histories.pop_front();
        }
        self.index = self.histories.len() - 1;
    }

    pub fn undo(&mut self) -> Option<&AppState> {
        if !self.can_undo() {
            return None;
        }
        self.index -= 1;
        self.histories.get(self.index).map(|entry| &entry.state)
    }

    pub fn redo(&mut self) -> Option<&AppState> {
        if !self.can_redo() {
            return None;
        }
        self.index += 1;
        self.histories.get(self.index).map(|entry| &entry.state)
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.histories.len()
    }

    /// State at the cursor
    pub fn current(&self) -> Option<&AppState> {
        self.histories.get(self.index).map(|entry| &entry.state)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.histories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histories.is_empty()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn histories(&self) -> impl Iterator<Item = &History> {
        self.histories.iter()
    }

    /// Move the cursor; out-of-range indexes are ignored
    pub fn set_index(&mut self, index: usize) -> Option<&AppState> {
        if index >= self.histories.len() {
            return None;
        }
        self.index = index;
        self.current()
    }

    /// Replace every entry and put the cursor on the last one. An empty
    /// list is ignored.
    pub fn set_histories(&mut self, histories: Vec<History>) {
        if histories.is_empty() {
            return;
        }
        self.load(histories);
        self.index = self.histories.len() - 1;
    }

    pub fn snapshot(&self) -> HistorySnapshot {
        HistorySnapshot {
            histories: self.histories.iter().cloned().collect(),
            index: self.index,
        }
    }

    fn load(&mut self, histories: Vec<History>) {
        let skip = histories.len().saturating_sub(self.max_depth);
        self.histories = histories.into_iter().skip(skip).collect();

        // Keep generated ids clear of loaded ones
        self.next_id = self
            .histories
            .iter()
            .filter_map(|entry| entry.id.strip_prefix("history-"))
            .filter_map(|n| n.parse::<u64>().ok())
            .max()
            .map_or(0, |max| max + 1);

        let missing: Vec<usize> = self
            .histories
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.id.is_empty())
            .map(|(i, _)| i)
            .collect();
        for i in missing {
            let id = self.next_entry_id();
            if let Some(entry) = self.histories.get_mut(i) {
                entry.id = id;
            }
        }
    }

    fn entry(&mut self, state: AppState) -> History {
        History {
            id: self.next_entry_id(),
            state,
        }
    }

    fn next_entry_id(&mut self) -> String {
        let id = format!("history-{}", self.next_id);
        self.next_id += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::UiState;
    use pagecraft_common::{ComponentData, Data};
    use std::sync::Arc;

    fn state(n: usize) -> AppState {
        let content = (0..n)
            .map(|i| ComponentData::new("Heading", format!("h{}", i)))
            .collect();
        AppState {
            data: Arc::new(Data {
                content,
                ..Data::default()
            }),
            ui: Arc::new(UiState::default()),
        }
    }

    #[test]
    fn test_seeded_with_initial_state() {
        let store = HistoryStore::new(state(0));
        assert_eq!(store.len(), 1);
        assert_eq!(store.index(), 0);
        assert!(!store.can_undo());
        assert!(!store.can_redo());
        assert_eq!(store.current(), Some(&state(0)));
    }

    #[test]
    fn test_undo_redo() {
        let mut store = HistoryStore::new(state(0));
        store.record(state(1));
        store.record(state(2));

        assert_eq!(store.undo(), Some(&state(1)));
        assert_eq!(store.undo(), Some(&state(0)));
        assert_eq!(store.undo(), None);
        assert_eq!(store.index(), 0);

        assert_eq!(store.redo(), Some(&state(1)));
        assert_eq!(store.redo(), Some(&state(2)));
        assert_eq!(store.redo(), None);
        assert_eq!(store.index(), 2);
    }

    #[test]
    fn test_record_truncates_redo_tail() {
        let mut store = HistoryStore::new(state(0));
        store.record(state(1));
        store.record(state(2));
        store.undo();
        store.undo();

        store.record(state(5));
        assert_eq!(store.len(), 2);
        assert_eq!(store.index(), 1);
        assert!(!store.can_redo());
        assert_eq!(store.current(), Some(&state(5)));
    }

    #[test]
    fn test_max_depth_evicts_oldest() {
        let mut store = HistoryStore::with_max_depth(state(0), 3);
        for n in 1..=5 {
            store.record(state(n));
        }

        assert_eq!(store.len(), 3);
        assert_eq!(store.index(), 2);
        let first = store.histories().next().unwrap();
        assert_eq!(first.state, state(3));
    }

    #[test]
    fn test_snapshot_resume() {
        let mut store = HistoryStore::new(state(0));
        store.record(state(1));
        store.record(state(2));
        store.undo();

        let json = serde_json::to_string(&store.snapshot()).unwrap();
        let snapshot: HistorySnapshot = serde_json::from_str(&json).unwrap();
        let mut resumed = HistoryStore::from_snapshot(snapshot, state(9), DEFAULT_HISTORY_DEPTH);

        assert_eq!(resumed.index(), 1);
        assert_eq!(resumed.current(), Some(&state(1)));
        assert_eq!(resumed.redo(), Some(&state(2)));

        resumed.record(state(3));
        let ids: Vec<&str> = resumed.histories().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["history-0", "history-1", "history-2", "history-3"]);
    }

    #[test]
    fn test_empty_snapshot_uses_fallback() {
        let store = HistoryStore::from_snapshot(HistorySnapshot::default(), state(4), 10);
        assert_eq!(store.len(), 1);
        assert_eq!(store.current(), Some(&state(4)));
    }

    #[test]
    fn test_snapshot_index_is_clamped() {
        let snapshot = HistorySnapshot {
            histories: vec![
                History {
                    id: String::new(),
                    state: state(0),
                },
                History {
                    id: String::new(),
                    state: state(1),
                },
            ],
            index: 7,
        };

        let store = HistoryStore::from_snapshot(snapshot, state(9), 10);
        assert_eq!(store.index(), 1);
        let ids: Vec<&str> = store.histories().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["history-0", "history-1"]);
    }

    #[test]
    fn test_set_index_and_histories() {
        let mut store = HistoryStore::new(state(0));
        store.record(state(1));

        assert_eq!(store.set_index(0), Some(&state(0)));
        assert_eq!(store.set_index(5), None);
        assert_eq!(store.index(), 0);

        store.set_histories(vec![]);
        assert_eq!(store.len(), 2);

        store.set_histories(vec![History {
            id: "a".to_string(),
            state: state(7),
        }]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.current(), Some(&state(7)));
    }
}
