//! End-to-end drag sessions driven through the editor's drag entry points

use pagecraft_common::ComponentConfig;
use pagecraft_editor::{
    Config, DragData, DragDescriptor, DragEvent, Editor, EditorOptions, PartialData, ZoneId,
    DRAWER_ITEM,
};
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

fn config() -> Config {
    Config::default()
        .with_component("Heading", ComponentConfig::default().with_default_prop("title", "Heading"))
        .with_component("Columns", ComponentConfig::default())
}

fn editor() -> Editor {
    let data: PartialData = serde_json::from_value(json!({
        "content": [
            { "type": "Heading", "props": { "id": "A" } },
            { "type": "Heading", "props": { "id": "B" } },
            { "type": "Heading", "props": { "id": "C" } }
        ]
    }))
    .unwrap();

    Editor::new(config(), EditorOptions::default().with_data(data).with_seed("drag"))
}

fn placed(id: &str, zone: &str, index: usize) -> DragDescriptor {
    DragDescriptor {
        id: id.to_string(),
        data: DragData {
            group: Some(ZoneId::new(zone)),
            index: Some(index),
            ..DragData::default()
        },
    }
}

fn drawer(id: &str, component_type: &str) -> DragDescriptor {
    DragDescriptor {
        id: id.to_string(),
        data: DragData {
            kind: Some(DRAWER_ITEM.to_string()),
            component_type: Some(component_type.to_string()),
            ..DragData::default()
        },
    }
}

fn root_ids(editor: &Editor) -> Vec<String> {
    editor.indexes().zone(&ZoneId::root()).unwrap().content_ids.clone()
}

#[test]
fn test_drag_first_to_last() {
    let mut editor = editor();
    let changes = Rc::new(RefCell::new(0));
    let seen = Rc::clone(&changes);
    editor.on_change(move |_| *seen.borrow_mut() += 1);

    let source = placed("A", "root", 0);
    editor.on_before_drag_start(&DragEvent::new(Some(source.clone()), None));
    editor.on_drag_start(&DragEvent::new(Some(source.clone()), None));
    assert!(editor.is_dragging());

    editor.on_drag_over(&DragEvent::new(Some(source.clone()), Some(placed("B", "root", 1))));
    editor.on_drag_over(&DragEvent::new(Some(source.clone()), Some(placed("C", "root", 2))));
    assert_eq!(root_ids(&editor), vec!["B", "C", "A"]);

    // Previews are not undo steps
    assert_eq!(editor.history().len(), 1);

    editor.on_drag_end(&DragEvent::new(Some(source), Some(placed("C", "root", 1))));
    assert!(!editor.is_dragging());
    assert_eq!(root_ids(&editor), vec!["B", "C", "A"]);
    assert_eq!(editor.history().len(), 2);
    assert!(*changes.borrow() >= 2);

    // One undo puts the whole drag back
    assert!(editor.undo());
    assert_eq!(root_ids(&editor), vec!["A", "B", "C"]);
}

#[test]
fn test_drag_back_to_start_adds_no_undo_step() {
    let mut editor = editor();
    let source = placed("A", "root", 0);

    editor.on_drag_start(&DragEvent::new(Some(source.clone()), None));
    editor.on_drag_over(&DragEvent::new(Some(source.clone()), Some(placed("C", "root", 2))));
    assert_eq!(root_ids(&editor), vec!["B", "C", "A"]);

    editor.on_drag_over(&DragEvent::new(Some(source.clone()), Some(placed("B", "root", 0))));
    assert_eq!(root_ids(&editor), vec!["A", "B", "C"]);

    editor.on_drag_end(&DragEvent::new(Some(source), Some(placed("B", "root", 1))));

    assert!(!editor.is_dragging());
    assert_eq!(root_ids(&editor), vec!["A", "B", "C"]);
    assert_eq!(editor.history().len(), 1);
    assert!(!editor.undo());
}

#[test]
fn test_drag_new_component_from_drawer() {
    let mut editor = editor();
    let source = drawer("drawer-Heading", "Heading");

    editor.on_drag_start(&DragEvent::new(Some(source.clone()), None));
    editor.on_drag_over(&DragEvent::new(Some(source.clone()), Some(placed("B", "root", 1))));

    assert_eq!(root_ids(&editor), vec!["A", "drawer-Heading", "B", "C"]);
    assert!(editor.data().content[1].is_placeholder());
    assert_eq!(editor.data().content[1].props.fields["title"], json!("Heading"));

    // Hovering the end of the root zone
    editor.on_drag_over(&DragEvent::new(
        Some(source.clone()),
        Some(DragDescriptor {
            id: "zone:root".to_string(),
            data: DragData::default(),
        }),
    ));
    assert_eq!(root_ids(&editor), vec!["A", "B", "C", "drawer-Heading"]);

    editor.on_drag_end(&DragEvent::new(Some(source), Some(placed("C", "root", 2))));

    let ids = root_ids(&editor);
    assert_eq!(ids.len(), 4);
    assert!(ids[3].starts_with("Heading-"));
    assert!(!editor.data().content[3].is_placeholder());
    assert!(editor.indexes().node("drawer-Heading").is_none());
    assert_eq!(editor.history().len(), 2);
    assert!(editor.verify().is_ok());
}

#[test]
fn test_cancelled_drag_leaves_document_as_committed() {
    let mut editor = editor();
    let before = editor.data().clone();
    let source = placed("A", "root", 0);

    editor.on_drag_start(&DragEvent::new(Some(source.clone()), None));
    editor.on_drag_over(&DragEvent::new(Some(source.clone()), Some(placed("C", "root", 2))));
    assert_ne!(editor.data(), &before);

    editor.on_drag_end(&DragEvent::new(Some(source), None));

    assert!(!editor.is_dragging());
    assert_eq!(editor.data(), &before);
    assert_eq!(editor.history().len(), 1);
}

#[test]
fn test_hover_after_drop_is_ignored() {
    let mut editor = editor();
    let source = placed("A", "root", 0);

    editor.on_drag_over(&DragEvent::new(Some(source), Some(placed("C", "root", 2))));
    assert_eq!(root_ids(&editor), vec!["A", "B", "C"]);
}
