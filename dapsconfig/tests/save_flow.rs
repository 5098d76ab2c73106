//! Orchestrator load/edit/save against in-memory collaborators.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dapsconfig::{
    FormError, Result,
    services::{ConfigApi, Notifier, PlexLibraries, ThemeApplier, ToastKind},
    session::{FormController, LeaveOutcome, SaveOutcome},
    ui::{edit::FieldMsg, picker::Choice},
};
use serde_json::{Value, json};

#[derive(Default)]
struct MemoryApi {
    config: Mutex<Value>,
    posts: Mutex<Vec<Value>>,
    reject: Mutex<Option<String>>,
}

#[async_trait]
impl ConfigApi for MemoryApi {
    async fn fetch_config(&self) -> Result<Value> {
        Ok(self.config.lock().unwrap().clone())
    }

    async fn save_config(&self, payload: Value) -> Result<Value> {
        if let Some(msg) = self.reject.lock().unwrap().clone() {
            return Err(FormError::Collaborator(msg));
        }
        self.posts.lock().unwrap().push(payload.clone());
        let mut cfg = self.config.lock().unwrap();
        if let (Value::Object(cfg), Value::Object(p)) = (&mut *cfg, payload) {
            cfg.extend(p);
        }
        Ok(cfg.clone())
    }
}

#[derive(Default)]
struct Toasts(Mutex<Vec<(ToastKind, String)>>);

impl Notifier for Toasts {
    fn notify(&self, kind: ToastKind, message: &str) {
        self.0.lock().unwrap().push((kind, message.to_string()));
    }
}

impl Toasts {
    fn errors(&self) -> usize {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| *k == ToastKind::Error)
            .count()
    }
}

#[derive(Default)]
struct Theme(Mutex<Vec<Value>>);

impl ThemeApplier for Theme {
    fn apply_theme(&self, ui_config: &Value) {
        self.0.lock().unwrap().push(ui_config.clone());
    }
}

struct FixedLibraries;

#[async_trait]
impl PlexLibraries for FixedLibraries {
    async fn libraries(&self, instance: &str) -> Result<Vec<String>> {
        match instance {
            "plex_main" => Ok(vec!["Movies".into(), "TV Shows".into()]),
            other => Err(FormError::Collaborator(format!("{other} unreachable"))),
        }
    }
}

fn controller(config: Value) -> (FormController, Arc<MemoryApi>, Arc<Toasts>, Arc<Theme>) {
    let api = Arc::new(MemoryApi {
        config: Mutex::new(config),
        ..Default::default()
    });
    let toasts = Arc::new(Toasts::default());
    let theme = Arc::new(Theme::default());
    let ctl = FormController::new(api.clone(), toasts.clone())
        .with_theme(theme.clone())
        .with_plex(Arc::new(FixedLibraries));
    (ctl, api, toasts, theme)
}

#[tokio::test]
async fn invalid_form_never_posts() {
    let (mut ctl, api, toasts, _) = controller(json!({}));
    ctl.open_module("border_replacerr").await.unwrap();
    let out = ctl.save().await;
    assert!(matches!(out, SaveOutcome::Invalid(ref keys) if keys.contains(&"border_colors".to_string())));
    assert!(api.posts.lock().unwrap().is_empty());
    assert_eq!(toasts.errors(), 1);
    let session = ctl.session().unwrap();
    assert!(session.form.scroll_to.is_some());
}

#[tokio::test]
async fn save_posts_module_and_reapplies_theme() {
    let (mut ctl, api, _, theme) = controller(json!({"user_interface": {"theme": "dark"}}));
    ctl.open_module("user_interface").await.unwrap();
    assert!(!ctl.session().unwrap().state.is_dirty());

    let session = ctl.session_mut().unwrap();
    session
        .edit("theme", FieldMsg::SetText("light".into()))
        .unwrap();
    assert!(session.state.is_dirty());

    assert_eq!(ctl.save().await, SaveOutcome::Saved);
    let posts = api.posts.lock().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["user_interface"]["theme"], "light");
    let session = ctl.session().unwrap();
    assert!(!session.state.is_dirty());
    assert_eq!(session.state.baseline["theme"], "light");
    assert_eq!(theme.0.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn excluded_fields_are_not_posted() {
    let (mut ctl, api, _, _) = controller(json!({
        "general": {
            "log_level": "info",
            "max_logs": 9,
            "source_dirs": ["/posters/a"],
            "destination_dir": "/kometa/assets",
            "webhook_secret": "hunter2"
        }
    }));
    ctl.open_module("general").await.unwrap();
    ctl.session_mut()
        .unwrap()
        .edit("log_level", FieldMsg::SetText("debug".into()))
        .unwrap();
    assert_eq!(ctl.save().await, SaveOutcome::Saved);
    let posted = &api.posts.lock().unwrap()[0]["general"];
    assert_eq!(posted["log_level"], "debug");
    assert!(posted.get("webhook_secret").is_none());
}

#[tokio::test]
async fn failed_save_keeps_dirty() {
    let (mut ctl, api, toasts, _) = controller(json!({}));
    *api.reject.lock().unwrap() = Some("disk full".into());
    ctl.open_module("user_interface").await.unwrap();
    ctl.session_mut()
        .unwrap()
        .edit("theme", FieldMsg::SetText("light".into()))
        .unwrap();
    let out = ctl.save().await;
    assert!(matches!(out, SaveOutcome::Failed(ref m) if m.contains("disk full")));
    assert!(ctl.session().unwrap().state.is_dirty());
    assert_eq!(toasts.errors(), 1);
}

#[tokio::test]
async fn leaving_dirty_page_asks_first() {
    let (mut ctl, api, _, _) = controller(json!({}));
    ctl.open_module("user_interface").await.unwrap();
    ctl.session_mut()
        .unwrap()
        .edit("theme", FieldMsg::SetText("light".into()))
        .unwrap();

    assert_eq!(ctl.leave(None).await, LeaveOutcome::NeedsChoice);
    assert_eq!(ctl.leave(Some(Choice::Cancel)).await, LeaveOutcome::Stayed);
    assert!(ctl.session().is_some());
    assert_eq!(ctl.leave(Some(Choice::Discard)).await, LeaveOutcome::Left);
    assert!(ctl.session().is_none());
    assert!(api.posts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn plex_libraries_are_loaded_on_open() {
    let (mut ctl, _, toasts, _) = controller(json!({
        "instances": {"plex": {"plex_main": {}, "plex_old": {}}}
    }));
    ctl.open_module("poster_renamerr").await.unwrap();
    let session = ctl.session().unwrap();
    assert_eq!(session.libraries["plex_main"], vec!["Movies", "TV Shows"]);
    assert!(session.libraries["plex_old"].is_empty());
    assert_eq!(toasts.errors(), 1);
}

#[tokio::test]
async fn unknown_module_is_an_error() {
    let (mut ctl, _, _, _) = controller(json!({}));
    assert!(matches!(
        ctl.open_module("nope").await,
        Err(FormError::UnknownModule(_))
    ));
}
