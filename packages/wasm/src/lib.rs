use pagecraft_common::Config;
use pagecraft_editor::{
    DragEvent, Editor, EditorError, EditorOptions, HistorySnapshot, ItemSelector, PartialData,
    ScriptedAction, Sidebar,
};
use wasm_bindgen::prelude::*;

#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

fn to_js(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Options accepted by `new EditorHandle(...)` as JSON
#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct HandleOptions {
    #[serde(default)]
    data: Option<PartialData>,
    #[serde(default)]
    initial_history: Option<HistorySnapshot>,
    #[serde(default)]
    seed: Option<String>,
    #[serde(default)]
    viewport_width: Option<u32>,
}

/// A JavaScript-owned editing session
#[wasm_bindgen]
pub struct EditorHandle {
    editor: Editor,
}

impl EditorHandle {
    fn create(config_json: &str, options_json: &str) -> Result<Self, EditorError> {
        let config: Config = serde_json::from_str(config_json)?;
        let options: HandleOptions = if options_json.trim().is_empty() {
            HandleOptions::default()
        } else {
            serde_json::from_str(options_json)?
        };

        let mut editor_options = EditorOptions::default();
        if let Some(data) = options.data {
            editor_options = editor_options.with_data(data);
        }
        if let Some(snapshot) = options.initial_history {
            editor_options = editor_options.with_history(snapshot);
        }
        // No system clock on wasm32; fall back to the session input
        let seed = options
            .seed
            .unwrap_or_else(|| format!("{}{}", config_json, options_json));
        editor_options = editor_options.with_seed(seed);
        if let Some(width) = options.viewport_width {
            editor_options = editor_options.with_viewport_width(width);
        }

        Ok(Self {
            editor: Editor::new(config, editor_options),
        })
    }

    /// Apply one action; true when the document changed
    fn apply(&mut self, action_json: &str) -> Result<bool, EditorError> {
        let scripted: ScriptedAction = serde_json::from_str(action_json)?;
        let before = self.editor.private_state().data.clone();
        self.editor.dispatch(scripted);
        Ok(!std::sync::Arc::ptr_eq(&before, &self.editor.private_state().data))
    }

    fn drag(&mut self, stage: &str, event_json: &str) -> Result<(), EditorError> {
        let event: DragEvent = serde_json::from_str(event_json)?;
        match stage {
            "beforeStart" => self.editor.on_before_drag_start(&event),
            "start" => self.editor.on_drag_start(&event),
            "over" => self.editor.on_drag_over(&event),
            _ => self.editor.on_drag_end(&event),
        }
        Ok(())
    }
}

#[wasm_bindgen]
impl EditorHandle {
    /// Create a session from a registry JSON and an options JSON
    /// (`{ data?, initialHistory?, seed?, viewportWidth? }`)
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str, options_json: &str) -> Result<EditorHandle, JsValue> {
        Self::create(config_json, options_json).map_err(to_js)
    }

    /// Dispatch an action in its JSON wire shape
    pub fn dispatch(&mut self, action_json: &str) -> Result<bool, JsValue> {
        self.apply(action_json).map_err(to_js)
    }

    /// Forward a host drag callback: `stage` is `beforeStart`, `start`, `over` or `end`
    #[wasm_bindgen(js_name = dragEvent)]
    pub fn drag_event(&mut self, stage: &str, event_json: &str) -> Result<(), JsValue> {
        self.drag(stage, event_json).map_err(to_js)
    }

    pub fn undo(&mut self) -> bool {
        self.editor.undo()
    }

    pub fn redo(&mut self) -> bool {
        self.editor.redo()
    }

    #[wasm_bindgen(js_name = canUndo)]
    pub fn can_undo(&self) -> bool {
        self.editor.can_undo()
    }

    #[wasm_bindgen(js_name = canRedo)]
    pub fn can_redo(&self) -> bool {
        self.editor.can_redo()
    }

    #[wasm_bindgen(js_name = setHistoryIndex)]
    pub fn set_history_index(&mut self, index: usize) -> bool {
        self.editor.set_history_index(index)
    }

    #[wasm_bindgen(js_name = toggleSidebar)]
    pub fn toggle_sidebar(&mut self, left: bool) {
        self.editor
            .toggle_sidebar(if left { Sidebar::Left } else { Sidebar::Right });
    }

    pub fn resize(&mut self, width: u32) {
        self.editor.resize(width);
    }

    /// Select the item at `zone`/`index`, or clear the selection when `zone` is empty
    pub fn select(&mut self, zone: &str, index: usize) {
        let selector = (!zone.is_empty()).then(|| ItemSelector::new(zone, index));
        self.editor.select(selector);
    }

    /// Current document as JSON
    pub fn data(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.editor.data()).map_err(to_js)
    }

    /// Public state (`{ data, ui }`) as JSON
    pub fn state(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.editor.state()).map_err(to_js)
    }

    /// Node and zone indexes as JSON
    pub fn indexes(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.editor.indexes()).map_err(to_js)
    }

    /// History snapshot (`{ histories, index }`) as JSON
    pub fn history(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.editor.history_snapshot()).map_err(to_js)
    }

    #[wasm_bindgen(js_name = selectedItem)]
    pub fn selected_item(&self) -> Result<Option<String>, JsValue> {
        self.editor
            .selected_item()
            .map(serde_json::to_string)
            .transpose()
            .map_err(to_js)
    }

    /// Document as it should be handed to the host's publish handler
    pub fn publish(&mut self) -> Result<String, JsValue> {
        self.editor.publish();
        self.data()
    }

    pub fn deprecations(&self) -> Vec<String> {
        self.editor
            .deprecations()
            .iter()
            .map(|notice| notice.to_string())
            .collect()
    }
}
