//! Dialog behaviour seen from outside the crate.

use std::sync::{Arc, Mutex};

use dapsconfig::{
    data::schema::{FieldKind, FieldSchema},
    ui::{
        edit::FieldMsg,
        modal::{FooterButton, ModalSpec, ModalStack, PressOutcome},
        render::LibraryCache,
    },
};
use serde_json::{Value, json};

fn instance_schema() -> Vec<FieldSchema> {
    vec![
        FieldSchema::new("name", "Name", FieldKind::Text).required(),
        FieldSchema::new("url", "URL", FieldKind::Text).required(),
    ]
}

#[test]
fn save_is_gated_until_required_fields_are_filled() {
    let _ = env_logger::builder().is_test(true).try_init();
    let libs = LibraryCache::new();
    let root = json!({});
    let seen: Arc<Mutex<Vec<Value>>> = Arc::default();
    let sink = seen.clone();

    let mut stack = ModalStack::new();
    let h = stack.open(
        ModalSpec {
            title: "Add instance".into(),
            schema: instance_schema(),
            entry: json!({}),
            buttons: vec![
                FooterButton::new("save", "Save").on_press(move |ctx| {
                    sink.lock().unwrap().push(ctx.entry.clone());
                }),
                FooterButton::new("cancel", "Cancel"),
            ],
        },
        &root,
        &libs,
    );

    let mut base = json!({});
    let out = stack.press(h, "save", &mut base, &root, &libs).unwrap();
    assert_eq!(
        out,
        PressOutcome::Rejected {
            invalid: vec!["name".into(), "url".into()]
        }
    );
    assert!(seen.lock().unwrap().is_empty());
    let modal = stack.get(h).unwrap();
    assert_eq!(modal.body.errors().count(), 2);
    assert_eq!(modal.body.scroll_to.as_deref(), Some("name"));

    stack
        .edit(h, "name", FieldMsg::SetText("radarr_hd".into()), &root, &libs)
        .unwrap();
    stack
        .edit(h, "url", FieldMsg::SetText("http://host:7878".into()), &root, &libs)
        .unwrap();
    let out = stack.press(h, "save", &mut base, &root, &libs).unwrap();
    assert_eq!(out, PressOutcome::Handled { closed: false });

    let calls = seen.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0],
        json!({"name": "radarr_hd", "url": "http://host:7878"})
    );
    assert!(stack.is_open(h));
    assert_eq!(stack.get(h).unwrap().body.errors().count(), 0);
}

#[test]
fn handler_owns_commit_and_close() {
    let libs = LibraryCache::new();
    let root = json!({});
    let mut stack = ModalStack::new();
    let h = stack.open(
        ModalSpec {
            title: "Add".into(),
            schema: instance_schema(),
            entry: json!({"name": "sonarr_main", "url": "http://host:8989"}),
            buttons: vec![FooterButton::new("add", "Add").on_press(|ctx| {
                let entry = ctx.entry.clone();
                ctx.module_config["sonarr"] = json!([entry]);
                ctx.close_modal();
            })],
        },
        &root,
        &libs,
    );
    let mut base = json!({});
    let out = stack.press(h, "add", &mut base, &root, &libs).unwrap();
    assert_eq!(out, PressOutcome::Handled { closed: true });
    assert!(!stack.is_open(h));
    assert_eq!(base["sonarr"][0]["name"], "sonarr_main");
}

#[test]
fn backdrop_closes_without_touching_parent() {
    let libs = LibraryCache::new();
    let root = json!({});
    let mut stack = ModalStack::new();
    let h = stack.open(
        ModalSpec {
            title: "Edit".into(),
            schema: instance_schema(),
            entry: json!({}),
            buttons: vec![],
        },
        &root,
        &libs,
    );
    stack
        .edit(h, "name", FieldMsg::SetText("x".into()), &root, &libs)
        .unwrap();
    stack.backdrop_mousedown(h);
    assert!(stack.is_empty());
}
