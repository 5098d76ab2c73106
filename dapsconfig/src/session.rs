//! Per-module form orchestrator.
//!
//! The controller is either on the splash page (no module, list of all
//! modules) or editing one module. Editing owns an [`AppState`] with the
//! baseline and working copies, the rendered form, and the modal stack.

use std::sync::Arc;

use serde_json::{Map, Value, json};

use crate::{
    data::{
        app_data::AppState,
        catalog,
        instances::instances_of_type,
        schema::{FieldSchema, ModuleSchema},
        value::strip_excluded,
    },
    error::{FormError, Result},
    services::{ConfigApi, Notifier, PlexLibraries, ThemeApplier, or_toast},
    ui::{
        cards,
        edit::{FieldMsg, apply_msg},
        element::Form,
        modal::{ButtonHandler, ModalHandle, ModalStack, PressOutcome},
        picker::Choice,
        render::{LibraryCache, RenderCtx, render_form},
        validate::{ValidateOptions, validate},
    },
};

/// Module key whose save re-applies the theme.
pub const THEME_MODULE: &str = "user_interface";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSummary {
    pub key: String,
    pub label: String,
    pub description: String,
}

/// Entries of the splash page, in catalog order.
pub fn splash() -> Vec<ModuleSummary> {
    catalog::catalog()
        .iter()
        .map(|m| ModuleSummary {
            key: m.key.clone(),
            label: m.label.clone(),
            description: m.description.clone(),
        })
        .collect()
}

/// One module being edited.
#[derive(Debug)]
pub struct EditSession {
    pub module: &'static ModuleSchema,
    pub state: AppState,
    pub form: Form,
    pub modals: ModalStack,
    pub libraries: LibraryCache,
}

impl EditSession {
    /// Start editing `module` against a freshly fetched root config.
    pub fn new(module: &'static ModuleSchema, root: Value) -> Self {
        let mut session = EditSession {
            module,
            state: AppState::new(root, &module.key),
            form: Form::default(),
            modals: ModalStack::new(),
            libraries: LibraryCache::new(),
        };
        session.rerender();
        // The initial render is not an edit.
        session.state.mark_clean();
        session
    }

    fn field(&self, key: &str) -> Result<&'static FieldSchema> {
        self.module
            .field(key)
            .ok_or_else(|| FormError::UnknownField(key.to_string()))
    }

    /// Re-render the form and open dialogs from state, keeping markers.
    pub fn rerender(&mut self) {
        let root = self.state.live_root();
        let fresh = render_form(
            &self.module.fields,
            &RenderCtx::new(&self.state.working, &root, &self.libraries),
        );
        self.form.refresh(fresh);
        self.modals.rerender(&root, &self.libraries);
    }

    /// Apply a field edit to the working copy.
    pub fn edit(&mut self, key: &str, msg: FieldMsg) -> Result<()> {
        let field = self.field(key)?;
        let root = self.state.live_root();
        apply_msg(field, msg, &mut self.state.working, &root)?;
        self.rerender();
        self.state.mark_dirty();
        Ok(())
    }

    /// Open the card dialog for a top-level card list.
    pub fn open_card(
        &mut self,
        key: &str,
        index: Option<usize>,
        on_save: Option<ButtonHandler>,
    ) -> Result<ModalHandle> {
        let field = self.field(key)?;
        let root = self.state.live_root();
        cards::open_card(
            &mut self.modals,
            field,
            &self.state.working,
            index,
            &root,
            &self.libraries,
            on_save,
        )
    }

    /// Open a card dialog for a card list inside the dialog `parent`.
    ///
    /// `parent` must be the top dialog, since the new one saves into the
    /// dialog directly below it.
    pub fn open_nested_card(
        &mut self,
        parent: ModalHandle,
        key: &str,
        index: Option<usize>,
        on_save: Option<ButtonHandler>,
    ) -> Result<ModalHandle> {
        if self.modals.top() != Some(parent) {
            return Err(FormError::ModalClosed(parent.depth()));
        }
        let (field, scope) = {
            let modal = self.modals.get(parent)?;
            let field = modal
                .schema
                .iter()
                .find(|f| f.key == key)
                .cloned()
                .ok_or_else(|| FormError::UnknownField(key.to_string()))?;
            (field, modal.entry.clone())
        };
        let root = self.state.live_root();
        cards::open_card(
            &mut self.modals,
            &field,
            &scope,
            index,
            &root,
            &self.libraries,
            on_save,
        )
    }

    pub fn modal_edit(&mut self, handle: ModalHandle, key: &str, msg: FieldMsg) -> Result<()> {
        let root = self.state.live_root();
        self.modals.edit(handle, key, msg, &root, &self.libraries)
    }

    /// Press a dialog button. Changes the handler made to the working copy
    /// mark the session dirty.
    pub fn press(&mut self, handle: ModalHandle, button_id: &str) -> Result<PressOutcome> {
        let before = self.state.working.clone();
        let root = self.state.live_root();
        let outcome = self.modals.press(
            handle,
            button_id,
            &mut self.state.working,
            &root,
            &self.libraries,
        )?;
        if self.state.working != before {
            self.rerender();
            self.state.mark_dirty();
        }
        Ok(outcome)
    }

    /// Validate the module's top-level schema against the working copy.
    pub fn validate(&mut self) -> Vec<String> {
        let root = self.state.live_root();
        validate(
            &self.module.fields,
            &self.state.working,
            &mut self.form,
            ValidateOptions {
                root: &root,
                is_modal: false,
            },
        )
    }

    /// Plex instances whose libraries this module may show but are not
    /// fetched yet.
    pub fn plex_instances_to_load(&self) -> Vec<String> {
        if !uses_plex(&self.module.fields) {
            return Vec::new();
        }
        instances_of_type(&self.state.live_root(), "plex")
            .into_iter()
            .filter(|n| !self.libraries.contains_key(n))
            .collect()
    }

    pub fn discard(&mut self) {
        self.state.discard();
        self.modals.close_all();
        self.form.clear_errors();
        self.rerender();
    }
}

fn uses_plex(fields: &[FieldSchema]) -> bool {
    fields
        .iter()
        .any(|f| f.supports_plex() || uses_plex(&f.fields))
}

/// Which page the console shows.
#[derive(Debug, Default)]
pub enum Page {
    #[default]
    Splash,
    Editing(Box<EditSession>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// Validation failed; nothing was sent.
    Invalid(Vec<String>),
    /// The backend rejected the save or was unreachable.
    Failed(String),
    NotEditing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    Left,
    /// Unsaved changes: ask save/discard/cancel and call again with the answer.
    NeedsChoice,
    Stayed,
}

pub struct FormController {
    api: Arc<dyn ConfigApi>,
    notifier: Arc<dyn Notifier>,
    plex: Option<Arc<dyn PlexLibraries>>,
    theme: Option<Arc<dyn ThemeApplier>>,
    page: Page,
}

impl FormController {
    pub fn new(api: Arc<dyn ConfigApi>, notifier: Arc<dyn Notifier>) -> Self {
        FormController {
            api,
            notifier,
            plex: None,
            theme: None,
            page: Page::Splash,
        }
    }

    pub fn with_plex(mut self, plex: Arc<dyn PlexLibraries>) -> Self {
        self.plex = Some(plex);
        self
    }

    pub fn with_theme(mut self, theme: Arc<dyn ThemeApplier>) -> Self {
        self.theme = Some(theme);
        self
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn session(&self) -> Option<&EditSession> {
        match &self.page {
            Page::Editing(s) => Some(&**s),
            Page::Splash => None,
        }
    }

    pub fn session_mut(&mut self) -> Option<&mut EditSession> {
        match &mut self.page {
            Page::Editing(s) => Some(&mut **s),
            Page::Splash => None,
        }
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    /// Enter the editing page for `key`.
    ///
    /// A failed fetch is toasted and the module opens against an empty tree.
    pub async fn open_module(&mut self, key: &str) -> Result<()> {
        let module = catalog::find(key).ok_or_else(|| FormError::UnknownModule(key.to_string()))?;
        let root = or_toast(
            self.api.fetch_config(),
            self.notifier.as_ref(),
            "Failed to load configuration",
            json!({}),
        )
        .await;
        info!("editing module {key}");
        self.page = Page::Editing(Box::new(EditSession::new(module, root)));
        self.load_libraries().await;
        Ok(())
    }

    /// Fetch library lists for every Plex instance the module can reference.
    pub async fn load_libraries(&mut self) {
        let Some(plex) = self.plex.clone() else {
            return;
        };
        let Page::Editing(session) = &mut self.page else {
            return;
        };
        let pending = session.plex_instances_to_load();
        if pending.is_empty() {
            return;
        }
        for name in pending {
            let libs = or_toast(
                plex.libraries(&name),
                self.notifier.as_ref(),
                &format!("Failed to load libraries for {name}"),
                Vec::new(),
            )
            .await;
            session.libraries.insert(name, libs);
        }
        session.rerender();
    }

    /// Validate and persist the current module.
    pub async fn save(&mut self) -> SaveOutcome {
        let Page::Editing(session) = &mut self.page else {
            return SaveOutcome::NotEditing;
        };
        let invalid = session.validate();
        if !invalid.is_empty() {
            self.notifier.error(&format!(
                "Please fill in the required fields ({})",
                invalid.join(", ")
            ));
            return SaveOutcome::Invalid(invalid);
        }

        let key = session.module.key.clone();
        let body = strip_excluded(&session.module.fields, &session.state.working);
        let mut payload = Map::new();
        payload.insert(key.clone(), body);

        match self.api.save_config(Value::Object(payload)).await {
            Ok(_) => {
                session.state.commit_baseline();
                info!("saved module {key}");
                self.notifier.success(&format!("{} saved", session.module.label));
                if key == THEME_MODULE
                    && let Some(theme) = &self.theme
                {
                    theme.apply_theme(&session.state.working);
                }
                SaveOutcome::Saved
            }
            Err(e) => {
                error!("saving {key} failed: {e}");
                self.notifier.error(&format!("Save failed: {e}"));
                SaveOutcome::Failed(e.to_string())
            }
        }
    }

    /// Go back to the splash page.
    ///
    /// With unsaved changes, `choice` decides: `None` asks for one, `Save`
    /// saves first (staying if that fails), `Discard` drops the edits.
    pub async fn leave(&mut self, choice: Option<Choice>) -> LeaveOutcome {
        let dirty = match &self.page {
            Page::Splash => return LeaveOutcome::Left,
            Page::Editing(s) => s.state.is_dirty(),
        };
        if dirty {
            match choice {
                None => return LeaveOutcome::NeedsChoice,
                Some(Choice::Cancel) => return LeaveOutcome::Stayed,
                Some(Choice::Discard) => {
                    if let Some(s) = self.session_mut() {
                        s.discard();
                    }
                }
                Some(Choice::Save) => {
                    if self.save().await != SaveOutcome::Saved {
                        return LeaveOutcome::Stayed;
                    }
                }
            }
        }
        self.page = Page::Splash;
        LeaveOutcome::Left
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splash_lists_catalog() {
        let entries = splash();
        assert_eq!(entries.len(), catalog::catalog().len());
        assert_eq!(entries[0].key, "general");
        assert!(entries.iter().all(|e| !e.label.is_empty()));
    }

    #[test]
    fn test_initial_render_is_clean() {
        let module = catalog::find("nohl").unwrap();
        let session = EditSession::new(module, json!({"nohl": {"searches": 3}}));
        assert!(!session.state.is_dirty());
        assert_eq!(session.form.rows.len(), module.fields.len());
    }

    #[test]
    fn test_edit_marks_dirty_and_rerenders() {
        let module = catalog::find("user_interface").unwrap();
        let mut session = EditSession::new(module, json!({}));
        session
            .edit("theme", FieldMsg::SetText("light".into()))
            .unwrap();
        assert!(session.state.is_dirty());
        assert_eq!(session.state.working["theme"], "light");
        assert_eq!(session.form.row("theme").unwrap().widget.summary(), "light");
        assert!(matches!(
            session.edit("missing", FieldMsg::Toggle),
            Err(FormError::UnknownField(_))
        ));
    }

    #[test]
    fn test_card_save_marks_dirty() {
        let module = catalog::find("border_replacerr").unwrap();
        let mut session = EditSession::new(module, json!({}));
        let h = session.open_card("holidays", None, None).unwrap();
        session
            .modal_edit(h, "name", FieldMsg::SetText("Pride".into()))
            .unwrap();
        session
            .modal_edit(h, "schedule", FieldMsg::SetText("range(06/01-06/30)".into()))
            .unwrap();
        session
            .modal_edit(h, "color", FieldMsg::ListPush("#FF00FF".into()))
            .unwrap();
        let out = session.press(h, "save").unwrap();
        assert_eq!(out, PressOutcome::Handled { closed: true });
        assert!(session.state.is_dirty());
        assert_eq!(session.state.working["holidays"][0]["name"], "Pride");
    }

    #[test]
    fn test_nested_card_needs_top_parent() {
        let module = catalog::find("border_replacerr").unwrap();
        let mut session = EditSession::new(module, json!({}));
        let lower = session.open_card("holidays", None, None).unwrap();
        let upper = session.open_card("holidays", None, None).unwrap();
        assert!(matches!(
            session.open_nested_card(lower, "color", None, None),
            Err(FormError::ModalClosed(0))
        ));
        assert_eq!(session.modals.len(), 2);
        assert!(matches!(
            session.open_nested_card(upper, "name", None, None),
            Err(FormError::Render { .. })
        ));
    }
}
