//! # Editor
//!
//! Owns the state, the reducer, the history and the drag coordinator, and
//! is the only place state changes.
//!
//! ## Lifecycle
//!
//! ```text
//! mount:     PartialData → migrate root → heal ids → flush zones → index
//!                        → seed (or resume) history
//! dispatch:  Transition → reduce → record (Commit only) → on_change
//! ```
//!
//! Every dispatch runs to completion before the next one starts; callbacks
//! are plain synchronous calls made after the new state is in place.

use crate::action::{Action, ScriptedAction, Transition, UiUpdate};
use crate::drag::{DragCoordinator, DragEvent};
use crate::errors::EditorError;
use crate::flatten::{flush_zones, heal_ids};
use crate::history::{HistorySnapshot, HistoryStore, DEFAULT_HISTORY_DEPTH};
use crate::indexes::Indexes;
use crate::reducer::Reducer;
use crate::state::{
    closest_viewport, default_viewports, get_item, AppState, ComponentListEntry, CurrentViewport,
    ItemSelector, PrivateAppState, UiPatch, UiState, Viewport, NARROW_VIEWPORT_MAX,
};
use pagecraft_common::{ComponentData, Config, Data, IdGenerator, PartialData, PropMap, RootData};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

/// Host widths below this collapse the opposite sidebar when one opens
pub const WIDE_VIEWPORT_MIN: u32 = 638;

pub type DataCallback = Box<dyn FnMut(&Data)>;

/// Developer-facing notices raised while mounting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deprecation {
    /// Root props stored directly on `root` instead of `root.props`
    LegacyRootProps,
}

impl Deprecation {
    pub fn message(&self) -> &'static str {
        match self {
            Deprecation::LegacyRootProps => {
                "Warning: Defining props on `root` is deprecated. Please use `root.props`, or republish this page to migrate automatically."
            }
        }
    }
}

impl fmt::Display for Deprecation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sidebar {
    Left,
    Right,
}

pub struct EditorOptions {
    pub data: PartialData,

    /// Applied over the default `ui`
    pub ui: Option<UiPatch>,

    /// Resume a persisted session
    pub initial_history: Option<HistorySnapshot>,

    pub history_depth: usize,

    /// Seed for generated ids; defaults to the current time
    pub id_seed: Option<String>,

    pub viewports: Vec<Viewport>,

    /// Host window width, when known
    pub viewport_width: Option<u32>,

    /// Whether the canvas renders in an iframe sized to the viewport
    pub iframe_enabled: bool,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            data: PartialData::default(),
            ui: None,
            initial_history: None,
            history_depth: DEFAULT_HISTORY_DEPTH,
            id_seed: None,
            viewports: default_viewports(),
            viewport_width: None,
            iframe_enabled: true,
        }
    }
}

impl EditorOptions {
    pub fn with_data(mut self, data: impl Into<PartialData>) -> Self {
        self.data = data.into();
        self
    }

    pub fn with_seed(mut self, seed: impl Into<String>) -> Self {
        self.id_seed = Some(seed.into());
        self
    }

    pub fn with_viewport_width(mut self, width: u32) -> Self {
        self.viewport_width = Some(width);
        self
    }

    pub fn with_history(mut self, snapshot: HistorySnapshot) -> Self {
        self.initial_history = Some(snapshot);
        self
    }
}

pub struct Editor {
    config: Arc<Config>,
    reducer: Reducer,
    state: PrivateAppState,
    history: HistoryStore,
    drag: DragCoordinator,
    viewport_width: Option<u32>,
    deprecations: Vec<Deprecation>,
    on_change: Option<DataCallback>,
    on_publish: Option<DataCallback>,
}

impl Editor {
    pub fn new(config: Config, options: EditorOptions) -> Self {
        let config = Arc::new(config);
        let seed = options.id_seed.clone().unwrap_or_else(time_seed);
        let mut reducer = Reducer::new(Arc::clone(&config), IdGenerator::new(&seed));

        let mut deprecations = Vec::new();
        let mut data = migrate_document(&options.data, &config, &mut deprecations);
        heal_ids(&mut data, &config, reducer.ids_mut());

        let (data, orphaned) = flush_zones(&data, &config);
        reducer.park_zones(orphaned);

        let initial = AppState {
            data: Arc::new(data),
            ui: Arc::new(initial_ui(&config, &options)),
        };

        let history = match options.initial_history {
            Some(snapshot) if !snapshot.histories.is_empty() => {
                info!(
                    entries = snapshot.histories.len(),
                    index = snapshot.index,
                    "Resuming editing session from history"
                );
                HistoryStore::from_snapshot(snapshot, initial.clone(), options.history_depth)
            }
            _ => HistoryStore::with_max_depth(initial.clone(), options.history_depth),
        };

        let current = history.current().cloned().unwrap_or(initial);
        let state = PrivateAppState::new(current, &config);

        Self {
            config,
            reducer,
            state,
            history,
            drag: DragCoordinator::new(),
            viewport_width: options.viewport_width,
            deprecations,
            on_change: None,
            on_publish: None,
        }
    }

    /// Called after every transition that changed `data`
    pub fn on_change(&mut self, callback: impl FnMut(&Data) + 'static) {
        self.on_change = Some(Box::new(callback));
    }

    /// Called by `publish`
    pub fn on_publish(&mut self, callback: impl FnMut(&Data) + 'static) {
        self.on_publish = Some(Box::new(callback));
    }

    pub fn dispatch(&mut self, transition: impl Into<Transition>) {
        let transition = transition.into();
        let next = self.reducer.reduce(&self.state, transition.action());

        if next.same_as(&self.state) {
            return;
        }

        let data_changed = !Arc::ptr_eq(&self.state.data, &next.data);
        self.state = next;

        if transition.records_history() {
            self.history.record(self.state.app_state());
        }

        if data_changed {
            if let Some(callback) = self.on_change.as_mut() {
                callback(&self.state.data);
            }
        }
    }

    /// Dispatch an action given in its JSON wire shape
    pub fn dispatch_json(&mut self, json: &str) -> Result<(), EditorError> {
        let scripted: ScriptedAction = serde_json::from_str(json)?;
        self.dispatch(scripted);
        Ok(())
    }

    pub fn undo(&mut self) -> bool {
        match self.history.undo().cloned() {
            Some(state) => {
                self.restore(state);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo().cloned() {
            Some(state) => {
                self.restore(state);
                true
            }
            None => false,
        }
    }

    pub fn set_history_index(&mut self, index: usize) -> bool {
        match self.history.set_index(index).cloned() {
            Some(state) => {
                self.restore(state);
                true
            }
            None => false,
        }
    }

    fn restore(&mut self, state: AppState) {
        self.dispatch(Transition::Preview(Action::Set { state }));
    }

    pub fn publish(&mut self) {
        if let Some(callback) = self.on_publish.as_mut() {
            callback(&self.state.data);
        }
    }

    /// Show or hide a sidebar. On narrow hosts, opening one closes the other.
    pub fn toggle_sidebar(&mut self, side: Sidebar) {
        let narrow = self
            .viewport_width
            .map_or(false, |width| width < WIDE_VIEWPORT_MIN);

        self.dispatch(Action::SetUi {
            ui: UiUpdate::with(move |ui| {
                let mut next = ui.clone();
                match side {
                    Sidebar::Left => {
                        next.left_side_bar_visible = !ui.left_side_bar_visible;
                        if narrow {
                            next.right_side_bar_visible = false;
                        }
                    }
                    Sidebar::Right => {
                        next.right_side_bar_visible = !ui.right_side_bar_visible;
                        if narrow {
                            next.left_side_bar_visible = false;
                        }
                    }
                }
                next
            }),
        });
    }

    /// Host window resized
    pub fn resize(&mut self, width: u32) {
        self.viewport_width = Some(width);
        if width >= WIDE_VIEWPORT_MIN {
            return;
        }

        self.dispatch(Action::SetUi {
            ui: UiUpdate::with(|ui| UiState {
                left_side_bar_visible: ui.left_side_bar_visible && !ui.right_side_bar_visible,
                ..ui.clone()
            }),
        });
    }

    /// Change the selection; recorded in history
    pub fn select(&mut self, selector: Option<ItemSelector>) {
        if self.state.ui.item_selector == selector {
            return;
        }

        self.dispatch(Transition::Commit(Action::SetUi {
            ui: UiUpdate::Patch(UiPatch {
                item_selector: Some(selector),
                ..UiPatch::default()
            }),
        }));
    }

    /// Selected component with slot content inlined
    pub fn selected_item(&self) -> Option<&ComponentData> {
        let selector = self.state.ui.item_selector.as_ref()?;
        get_item(selector, &self.state)
    }

    pub fn on_before_drag_start(&mut self, event: &DragEvent) {
        self.drag.on_before_drag_start(event);
    }

    pub fn on_drag_start(&mut self, event: &DragEvent) {
        self.drag.on_drag_start(event, &self.state);
    }

    pub fn on_drag_over(&mut self, event: &DragEvent) {
        if let Some(transition) = self.drag.on_drag_over(event, &self.state) {
            self.dispatch(transition);
        }
    }

    pub fn on_drag_end(&mut self, event: &DragEvent) {
        let transition = self
            .drag
            .on_drag_end(event, &self.state, self.reducer.ids_mut());
        if let Some(transition) = transition {
            self.dispatch(transition);
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    pub fn state(&self) -> AppState {
        self.state.app_state()
    }

    pub fn private_state(&self) -> &PrivateAppState {
        &self.state
    }

    pub fn data(&self) -> &Data {
        &self.state.data
    }

    pub fn ui(&self) -> &UiState {
        &self.state.ui
    }

    pub fn indexes(&self) -> &Indexes {
        &self.state.indexes
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn history_snapshot(&self) -> HistorySnapshot {
        self.history.snapshot()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn deprecations(&self) -> &[Deprecation] {
        &self.deprecations
    }

    /// Check the node/zone index invariants of the current state
    pub fn verify(&self) -> Result<(), EditorError> {
        Ok(self.state.indexes.check()?)
    }
}

/// Build the full document from caller input. Root props stored directly
/// on `root` are moved under `root.props`, with a one-time notice.
fn migrate_document(partial: &PartialData, config: &Config, deprecations: &mut Vec<Deprecation>) -> Data {
    let root = partial.root.clone().unwrap_or_default();

    let declared = match root.get("props") {
        Some(Value::Object(props)) => Some(props.clone()),
        _ => None,
    };

    if !root.is_empty() && declared.is_none() {
        let notice = Deprecation::LegacyRootProps;
        warn!("{}", notice);
        deprecations.push(notice);
    }

    let mut legacy = root;
    legacy.remove("props");

    let given = declared.unwrap_or_else(|| legacy.clone());
    let mut props: PropMap = config.root.default_props.clone();
    for (key, value) in given {
        props.insert(key, value);
    }

    Data {
        root: RootData { props, legacy },
        content: partial.content.clone().unwrap_or_default(),
        zones: partial.zones.clone().unwrap_or_default(),
    }
}

fn initial_ui(config: &Config, options: &EditorOptions) -> UiState {
    let base = UiState {
        viewports: crate::state::ViewportState {
            options: options.viewports.clone(),
            ..Default::default()
        },
        ..UiState::default()
    };

    let mut ui = match &options.ui {
        Some(patch) => patch.apply(&base),
        None => base,
    };

    if let Some(width) = options.viewport_width {
        if width <= NARROW_VIEWPORT_MAX {
            ui.left_side_bar_visible = false;
            ui.right_side_bar_visible = false;
        }

        let requested = options.ui.as_ref().and_then(|patch| patch.viewports.as_ref());
        if options.iframe_enabled && requested.is_none() {
            if let Some(closest) = closest_viewport(width, &options.viewports) {
                ui.viewports.current = CurrentViewport {
                    width: closest.width,
                    height: closest.height,
                };
            }
        }
    }

    ui.component_list = config
        .categories
        .iter()
        .map(|(name, category)| (name.clone(), ComponentListEntry::from(category)))
        .collect();

    ui
}

fn time_seed() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos().to_string())
        .unwrap_or_default()
}
