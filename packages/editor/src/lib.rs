//! # Pagecraft Editor
//!
//! Editing state core for the Pagecraft page builder.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ drag: host drag events → Preview / Commit   │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: dispatch loop                       │
//! │  - reducer: Action → next PrivateAppState   │
//! │  - history: records Commit transitions      │
//! │  - on_change / on_publish callbacks         │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ flatten + indexes: derived node/zone views  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Data is source of truth**: indexes are rebuilt from `data` on every
//!    data transition and never edited directly
//! 2. **Two slices, one transition**: `data` and `ui` change together but
//!    are shared independently between states
//! 3. **Previews never touch history**: only `Commit` transitions are undo
//!    steps
//! 4. **Bad input is a no-op**: malformed actions leave the state as is
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pagecraft_editor::{Action, Editor, EditorOptions};
//!
//! let mut editor = Editor::new(config, EditorOptions::default().with_data(data));
//! editor.on_change(|data| save(data));
//!
//! editor.dispatch(Action::Insert {
//!     component_type: "Heading".to_string(),
//!     destination_zone: "root".into(),
//!     destination_index: 0,
//!     props: None,
//! });
//!
//! editor.undo();
//! ```

mod action;
mod drag;
mod editor;
mod errors;
mod flatten;
mod history;
mod indexes;
mod reducer;
mod state;

pub use action::{Action, DataPatch, DataUpdate, ScriptedAction, Transition, UiUpdate};
pub use drag::{DragCoordinator, DragData, DragDescriptor, DragEvent, DragOperation, DRAWER_ITEM};
pub use editor::{Deprecation, Editor, EditorOptions, Sidebar, WIDE_VIEWPORT_MIN};
pub use errors::EditorError;
pub use flatten::{flatten, flush_zones, heal_ids, unflatten, FlatData, FlatZone};
pub use history::{History, HistorySnapshot, HistoryStore, DEFAULT_HISTORY_DEPTH};
pub use indexes::{build_indexes, IndexError, Indexes, NodeIndex, NodeRecord, ZoneIndex, ZoneRecord};
pub use reducer::Reducer;
pub use state::{
    closest_viewport, default_viewports, get_item, AppState, ComponentListEntry, CurrentViewport,
    FieldState, HeightKeyword, ItemSelector, PrivateAppState, UiPatch, UiState, Viewport,
    ViewportHeight, ViewportState, NARROW_VIEWPORT_MAX,
};

// Re-export common types for convenience
pub use pagecraft_common::{ComponentData, Config, Data, PartialData, ZoneId, ZoneType};
