//! Modal dialogs over a form.
//!
//! Open dialogs live in a [`ModalStack`], an arena indexed by depth. The
//! dialog at depth `n` edits one entry; the object its buttons write into
//! (the "module config" seen by handlers) is the entry of the dialog at depth
//! `n - 1`, or the module's working copy for the bottom dialog.
//!
//! A dialog is either open (in the stack) or closed (gone). Buttons whose id
//! or label matches `save`/`add` validate the dialog's schema before the
//! caller's handler runs. The controller never closes a dialog after a save
//! on its own; the handler decides by calling [`HandlerCtx::close_modal`].

use std::{fmt, sync::OnceLock};

use regex::Regex;
use serde_json::Value;

use crate::{
    data::schema::FieldSchema,
    error::{FormError, Result},
    ui::{
        edit::{FieldMsg, apply_msg},
        element::Form,
        render::{LibraryCache, RenderCtx, render_form},
        validate::{ValidateOptions, validate},
    },
};

/// Caller logic behind a footer button.
pub type ButtonHandler = Box<dyn FnMut(&mut HandlerCtx<'_>) + Send>;

fn cancel_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)cancel").unwrap())
}

fn commit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)save|add").unwrap())
}

pub struct FooterButton {
    pub id: String,
    pub label: String,
    handler: Option<ButtonHandler>,
}

impl FooterButton {
    pub fn new(id: &str, label: &str) -> Self {
        FooterButton {
            id: id.to_string(),
            label: label.to_string(),
            handler: None,
        }
    }

    pub fn on_press(mut self, handler: impl FnMut(&mut HandlerCtx<'_>) + Send + 'static) -> Self {
        self.handler = Some(Box::new(handler));
        self
    }

    pub(crate) fn with_handler(mut self, handler: ButtonHandler) -> Self {
        self.handler = Some(handler);
        self
    }

    fn matches(&self, re: &Regex) -> bool {
        re.is_match(&self.id) || re.is_match(&self.label)
    }

    pub fn is_cancel(&self) -> bool {
        self.matches(cancel_re())
    }

    /// Pressing this button runs validation first.
    pub fn is_commit(&self) -> bool {
        self.matches(commit_re())
    }

    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }
}

impl fmt::Debug for FooterButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FooterButton")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

/// Everything needed to open a dialog.
pub struct ModalSpec {
    pub title: String,
    pub schema: Vec<FieldSchema>,
    pub entry: Value,
    pub buttons: Vec<FooterButton>,
}

#[derive(Debug)]
pub struct Modal {
    pub title: String,
    pub schema: Vec<FieldSchema>,
    /// The entry being edited. Field edits write here immediately.
    pub entry: Value,
    pub body: Form,
    pub buttons: Vec<FooterButton>,
    id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalState {
    Open,
    Closed,
}

/// What a button handler can see and change.
pub struct HandlerCtx<'a> {
    /// Id of the pressed button.
    pub button: &'a str,
    pub entry: &'a mut Value,
    pub schema: &'a [FieldSchema],
    pub body: &'a mut Form,
    /// Object the dialog's entry belongs to.
    pub module_config: &'a mut Value,
    pub root: &'a Value,
    closed: bool,
}

impl HandlerCtx<'_> {
    /// Close this dialog (and any above it) once the handler returns.
    pub fn close_modal(&mut self) {
        self.closed = true;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PressOutcome {
    /// Default cancel: the dialog closed.
    Closed,
    /// The caller's handler ran.
    Handled { closed: bool },
    /// Validation failed; the handler did not run and the dialog stays open.
    Rejected { invalid: Vec<String> },
    /// The button has no handler and is not a cancel button.
    NoHandler,
}

/// Reference to an open dialog. Stale once the dialog closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModalHandle {
    depth: usize,
    id: u64,
}

impl ModalHandle {
    pub fn depth(&self) -> usize {
        self.depth
    }
}

#[derive(Debug, Default)]
pub struct ModalStack {
    modals: Vec<Modal>,
    next_id: u64,
}

impl ModalStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, spec: ModalSpec, root: &Value, libraries: &LibraryCache) -> ModalHandle {
        let body = render_form(&spec.schema, &RenderCtx::new(&spec.entry, root, libraries));
        let id = self.next_id;
        self.next_id += 1;
        let handle = ModalHandle {
            depth: self.modals.len(),
            id,
        };
        debug!("open modal `{}` at depth {}", spec.title, handle.depth);
        self.modals.push(Modal {
            title: spec.title,
            schema: spec.schema,
            entry: spec.entry,
            body,
            buttons: spec.buttons,
            id,
        });
        handle
    }

    pub fn len(&self) -> usize {
        self.modals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modals.is_empty()
    }

    pub fn state(&self, handle: ModalHandle) -> ModalState {
        match self.modals.get(handle.depth) {
            Some(m) if m.id == handle.id => ModalState::Open,
            _ => ModalState::Closed,
        }
    }

    pub fn is_open(&self, handle: ModalHandle) -> bool {
        self.state(handle) == ModalState::Open
    }

    pub fn top(&self) -> Option<ModalHandle> {
        self.modals.last().map(|m| ModalHandle {
            depth: self.modals.len() - 1,
            id: m.id,
        })
    }

    pub fn get(&self, handle: ModalHandle) -> Result<&Modal> {
        match self.modals.get(handle.depth) {
            Some(m) if m.id == handle.id => Ok(m),
            _ => Err(FormError::ModalClosed(handle.depth)),
        }
    }

    pub fn get_mut(&mut self, handle: ModalHandle) -> Result<&mut Modal> {
        match self.modals.get_mut(handle.depth) {
            Some(m) if m.id == handle.id => Ok(m),
            _ => Err(FormError::ModalClosed(handle.depth)),
        }
    }

    /// Close the dialog and every dialog stacked above it.
    pub fn close(&mut self, handle: ModalHandle) {
        if self.is_open(handle) {
            debug!("close modal at depth {}", handle.depth);
            self.modals.truncate(handle.depth);
        }
    }

    /// Close affordance in the dialog header.
    pub fn close_button(&mut self, handle: ModalHandle) {
        self.close(handle);
    }

    /// Mouse press directly on the backdrop behind the dialog.
    pub fn backdrop_mousedown(&mut self, handle: ModalHandle) {
        self.close(handle);
    }

    pub fn close_all(&mut self) {
        self.modals.clear();
    }

    /// Apply a field edit to the dialog's entry and re-render its body.
    pub fn edit(
        &mut self,
        handle: ModalHandle,
        key: &str,
        msg: FieldMsg,
        root: &Value,
        libraries: &LibraryCache,
    ) -> Result<()> {
        let Modal {
            schema,
            entry,
            body,
            ..
        } = self.get_mut(handle)?;
        let field = schema
            .iter()
            .find(|f| f.key == key)
            .ok_or_else(|| FormError::UnknownField(key.to_string()))?;
        apply_msg(field, msg, entry, root)?;
        body.refresh(render_form(schema, &RenderCtx::new(entry, root, libraries)));
        Ok(())
    }

    /// Re-render every open body, e.g. after library lists arrive.
    pub fn rerender(&mut self, root: &Value, libraries: &LibraryCache) {
        for m in &mut self.modals {
            m.body
                .refresh(render_form(&m.schema, &RenderCtx::new(&m.entry, root, libraries)));
        }
    }

    /// Press footer button `button_id` of the dialog.
    ///
    /// `base` is the module working copy; it is what the bottom dialog's
    /// handlers see as their module config.
    pub fn press(
        &mut self,
        handle: ModalHandle,
        button_id: &str,
        base: &mut Value,
        root: &Value,
        libraries: &LibraryCache,
    ) -> Result<PressOutcome> {
        self.get(handle)?;
        let depth = handle.depth;

        let outcome = {
            let (below, rest) = self.modals.split_at_mut(depth);
            let modal = &mut rest[0];
            let module_config = match below.last_mut() {
                Some(parent) => &mut parent.entry,
                None => base,
            };

            let idx = modal
                .buttons
                .iter()
                .position(|b| b.id == button_id)
                .ok_or_else(|| FormError::UnknownButton(button_id.to_string()))?;

            if modal.buttons[idx].is_commit() {
                let invalid = validate(
                    &modal.schema,
                    &modal.entry,
                    &mut modal.body,
                    ValidateOptions {
                        root,
                        is_modal: true,
                    },
                );
                if !invalid.is_empty() {
                    info!("`{}` rejected, invalid: {invalid:?}", modal.title);
                    return Ok(PressOutcome::Rejected { invalid });
                }
            }

            match modal.buttons[idx].handler.take() {
                Some(mut handler) => {
                    let mut ctx = HandlerCtx {
                        button: button_id,
                        entry: &mut modal.entry,
                        schema: &modal.schema,
                        body: &mut modal.body,
                        module_config,
                        root,
                        closed: false,
                    };
                    handler(&mut ctx);
                    let closed = ctx.closed;
                    modal.buttons[idx].handler = Some(handler);
                    PressOutcome::Handled { closed }
                }
                None if modal.buttons[idx].is_cancel() => PressOutcome::Closed,
                None => PressOutcome::NoHandler,
            }
        };

        match outcome {
            PressOutcome::Closed | PressOutcome::Handled { closed: true } => self.close(handle),
            PressOutcome::Handled { closed: false } => {
                if let Some(m) = self.modals.get_mut(depth) {
                    m.body.refresh(render_form(
                        &m.schema,
                        &RenderCtx::new(&m.entry, root, libraries),
                    ));
                }
            }
            _ => {}
        }
        // The handler may have written into the parent entry.
        if let Some(parent) = depth.checked_sub(1).and_then(|d| self.modals.get_mut(d)) {
            parent.body.refresh(render_form(
                &parent.schema,
                &RenderCtx::new(&parent.entry, root, libraries),
            ));
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::schema::FieldKind;
    use serde_json::json;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    fn spec(buttons: Vec<FooterButton>) -> ModalSpec {
        ModalSpec {
            title: "Edit".into(),
            schema: vec![FieldSchema::new("name", "Name", FieldKind::Text).required()],
            entry: json!({}),
            buttons,
        }
    }

    #[test]
    fn test_default_cancel_closes() {
        let libs = LibraryCache::new();
        let mut stack = ModalStack::new();
        let h = stack.open(
            spec(vec![FooterButton::new("cancel-btn", "Cancel")]),
            &json!({}),
            &libs,
        );
        let out = stack
            .press(h, "cancel-btn", &mut json!({}), &json!({}), &libs)
            .unwrap();
        assert_eq!(out, PressOutcome::Closed);
        assert_eq!(stack.state(h), ModalState::Closed);
    }

    #[test]
    fn test_commit_button_is_gated() {
        let libs = LibraryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let mut stack = ModalStack::new();
        let h = stack.open(
            spec(vec![FooterButton::new("save", "Save").on_press(move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
            })]),
            &json!({}),
            &libs,
        );
        let mut base = json!({});
        let out = stack.press(h, "save", &mut base, &json!({}), &libs).unwrap();
        assert_eq!(
            out,
            PressOutcome::Rejected {
                invalid: vec!["name".into()]
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(stack.is_open(h));
        assert_eq!(stack.get(h).unwrap().body.scroll_to.as_deref(), Some("name"));

        stack
            .edit(h, "name", FieldMsg::SetText("x".into()), &json!({}), &libs)
            .unwrap();
        let out = stack.press(h, "save", &mut base, &json!({}), &libs).unwrap();
        assert_eq!(out, PressOutcome::Handled { closed: false });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        // Never closes on its own after a save.
        assert!(stack.is_open(h));
    }

    #[test]
    fn test_closing_closes_children_and_stales_handles() {
        let libs = LibraryCache::new();
        let mut stack = ModalStack::new();
        let a = stack.open(spec(vec![]), &json!({}), &libs);
        let b = stack.open(spec(vec![]), &json!({}), &libs);
        assert_eq!(b.depth(), 1);
        stack.backdrop_mousedown(a);
        assert!(stack.is_empty());
        assert!(!stack.is_open(b));

        let c = stack.open(spec(vec![]), &json!({}), &libs);
        assert_eq!(c.depth(), a.depth());
        assert!(!stack.is_open(a));
        assert!(matches!(stack.get(a), Err(FormError::ModalClosed(0))));
    }

    #[test]
    fn test_nested_handler_sees_parent_entry() {
        let libs = LibraryCache::new();
        let mut stack = ModalStack::new();
        stack.open(
            ModalSpec {
                title: "Parent".into(),
                schema: vec![],
                entry: json!({"children": []}),
                buttons: vec![],
            },
            &json!({}),
            &libs,
        );
        let child = stack.open(
            ModalSpec {
                title: "Child".into(),
                schema: vec![],
                entry: json!({"v": 1}),
                buttons: vec![FooterButton::new("ok", "Ok").on_press(|ctx| {
                    let entry = ctx.entry.clone();
                    ctx.module_config["children"]
                        .as_array_mut()
                        .unwrap()
                        .push(entry);
                    ctx.close_modal();
                })],
            },
            &json!({}),
            &libs,
        );
        let mut base = json!({});
        let out = stack.press(child, "ok", &mut base, &json!({}), &libs).unwrap();
        assert_eq!(out, PressOutcome::Handled { closed: true });
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.modals[0].entry, json!({"children": [{"v": 1}]}));
        assert_eq!(base, json!({}));
    }

    #[test]
    fn test_unknown_button() {
        let libs = LibraryCache::new();
        let mut stack = ModalStack::new();
        let h = stack.open(spec(vec![]), &json!({}), &libs);
        let err = stack
            .press(h, "nope", &mut json!({}), &json!({}), &libs)
            .unwrap_err();
        assert!(matches!(err, FormError::UnknownButton(_)));
    }
}
