//! UI state and key handling.
//!
//! Keys are handled synchronously and may yield an [`Action`]; anything that
//! talks to the backend is an action, awaited by the event loop.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use dapsconfig::{
    codec::{HolidayRange, Schedule, ScheduleMode},
    data::value::value_to_text,
    services::{Notifier, ToastKind},
    session::{FormController, LeaveOutcome, ModuleSummary, SaveOutcome, splash},
    ui::{
        cards,
        edit::FieldMsg,
        element::{Form, InstancePicker, Row, Widget},
        modal::{ButtonHandler, HandlerCtx, ModalHandle, PressOutcome},
        picker::{Choice, ChoiceDialog, DirectoryPicker},
    },
};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::{
    api::{InstanceTest, InstanceTester},
    ctx::AppContext,
    loader::Loader,
    tui::keys::{Intent, input_intent, nav_intent},
};

/// Card dialogs of this module test the connection before saving.
const INSTANCES_MODULE: &str = "instances";
/// Card dialogs of this module accept Google Drive presets.
const GDRIVE_MODULE: &str = "sync_gdrive";

/// The field an edit goes to: a top-level row, or a row of a dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub modal: Option<ModalHandle>,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PromptKind {
    /// Replace the field's text.
    Set,
    /// Append a list item.
    Push,
    /// Add a slot to this schedule.
    Slot(Schedule),
    Holiday,
}

#[derive(Debug)]
pub struct Prompt {
    pub target: Target,
    pub label: String,
    pub buffer: String,
    pub kind: PromptKind,
    pub masked: bool,
}

#[derive(Debug)]
pub struct DirBrowser {
    pub picker: DirectoryPicker,
    rx: oneshot::Receiver<Option<String>>,
    target: Target,
    push: bool,
    /// Name being typed for a new folder.
    pub naming: Option<String>,
}

#[derive(Debug)]
pub struct ChoicePrompt {
    pub dialog: ChoiceDialog,
    rx: oneshot::Receiver<Choice>,
    pub selected: usize,
}

/// Focus-stealing layer above the page and its dialogs.
#[derive(Debug, Default)]
pub enum Overlay {
    #[default]
    None,
    Prompt(Prompt),
    Dirs(DirBrowser),
    Choice(ChoicePrompt),
}

/// An instance entry waiting for its connection test.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingTest {
    pub handle: ModalHandle,
    pub key: String,
    pub index: Option<usize>,
    pub entry: Value,
}

/// Work that needs the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Open(String),
    Save,
    Leave(Option<Choice>),
    ListDirs,
    CreateFolder(String),
    TestInstance(PendingTest),
    Preset(ModalHandle),
}

impl Action {
    /// Loader text while the action runs.
    pub fn label(&self) -> &'static str {
        match self {
            Action::Open(_) => "Loading",
            Action::Save | Action::Leave(_) => "Saving",
            Action::ListDirs | Action::CreateFolder(_) => "Listing",
            Action::TestInstance(_) => "Testing connection",
            Action::Preset(_) => "Fetching presets",
        }
    }
}

struct SaveRequest {
    key: String,
    index: Option<usize>,
    entry: Value,
}

struct Selection {
    target: Target,
    label: String,
    widget: Widget,
}

pub fn visible_rows(form: &Form) -> impl Iterator<Item = &Row> {
    form.rows.iter().filter(|r| r.visible)
}

/// Selectable items of an instance picker, with the edit each one makes.
///
/// Library and poster toggles follow their Plex instance once it is checked
/// and its libraries are loaded.
pub fn instance_items(picker: &InstancePicker) -> Vec<(String, FieldMsg)> {
    let mut items = Vec::new();
    for choice in picker.groups.iter().flat_map(|g| &g.choices) {
        let mark = if choice.checked { "[x]" } else { "[ ]" };
        items.push((
            format!("{mark} {}", choice.name),
            FieldMsg::ToggleInstance(choice.name.clone()),
        ));
        let Some(plex) = choice.plex.as_ref().filter(|p| choice.checked && p.loaded) else {
            continue;
        };
        for (library, on) in &plex.libraries {
            let mark = if *on { "[x]" } else { "[ ]" };
            items.push((
                format!("  {mark} {library}"),
                FieldMsg::ToggleLibrary {
                    instance: choice.name.clone(),
                    library: library.clone(),
                },
            ));
        }
        let mark = if plex.add_posters { "[x]" } else { "[ ]" };
        items.push((
            format!("  {mark} add posters"),
            FieldMsg::ToggleAddPosters(choice.name.clone()),
        ));
    }
    items
}

/// Option after `current`, wrapping; the first one when unset.
pub fn next_option(options: &[String], current: Option<&str>) -> String {
    let pos = current.and_then(|c| options.iter().position(|o| o == c));
    let next = pos.map_or(0, |i| (i + 1) % options.len().max(1));
    options.get(next).cloned().unwrap_or_default()
}

/// The schedule the builder shows: the stored one, or an empty schedule of
/// `pending` while nothing is stored yet.
///
/// An empty schedule is stored as `""` whatever its mode, so the picked mode
/// lives in the UI until the first slot is added.
pub fn shown_schedule(stored: &Schedule, pending: Option<ScheduleMode>) -> Schedule {
    match pending {
        Some(mode) if stored.is_unset() => Schedule::empty(mode),
        _ => stored.clone(),
    }
}

fn slot_hint(mode: ScheduleMode) -> &'static str {
    match mode {
        ScheduleMode::Hourly => "minute, 0-59",
        ScheduleMode::Daily => "HH:MM",
        ScheduleMode::Weekly => "day@HH:MM",
        ScheduleMode::Monthly => "day of month@HH:MM",
        ScheduleMode::Cron => "cron expression",
    }
}

/// Text a prompt starts with, for widgets edited by typing.
pub fn prompt_seed(widget: &Widget) -> Option<String> {
    match widget {
        Widget::Text { value, .. } | Widget::Color { value } | Widget::Number { value, .. } => {
            Some(value.clone())
        }
        Widget::Json { text, .. }
        | Widget::Schedule { text, .. }
        | Widget::HolidayRange { text, .. } => Some(text.clone()),
        _ => None,
    }
}

pub struct App<'a> {
    ctx: &'a AppContext,
    pub controller: FormController,
    pub overlay: Overlay,
    pub loader: Loader,
    pub modules: Vec<ModuleSummary>,
    pub splash_sel: usize,
    pub row_sel: usize,
    pub modal_sel: usize,
    /// Item within the selected row (list entry, card, instance).
    pub item_sel: usize,
    preset_next: usize,
    /// Schedule mode picked for a field whose stored schedule is still empty.
    schedule_mode: Option<(Target, ScheduleMode)>,
    /// Ctrl-C is waiting for the module to be left.
    quit_after_leave: bool,
    tests_tx: mpsc::UnboundedSender<SaveRequest>,
    tests_rx: mpsc::UnboundedReceiver<SaveRequest>,
    quit: bool,
}

impl<'a> App<'a> {
    pub fn new(ctx: &'a AppContext) -> Self {
        let (tests_tx, tests_rx) = mpsc::unbounded_channel();
        App {
            ctx,
            controller: ctx.controller(),
            overlay: Overlay::None,
            loader: ctx.loader(),
            modules: splash(),
            splash_sel: 0,
            row_sel: 0,
            modal_sel: 0,
            item_sel: 0,
            preset_next: 0,
            schedule_mode: None,
            quit_after_leave: false,
            tests_tx,
            tests_rx,
            quit: false,
        }
    }

    pub fn ctx(&self) -> &AppContext {
        self.ctx
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    /// Pending schedule mode for a row of the page (`None`) or of a dialog.
    pub fn pending_schedule_mode(&self, modal: Option<ModalHandle>) -> Option<(&str, ScheduleMode)> {
        self.schedule_mode
            .as_ref()
            .filter(|(t, _)| t.modal == modal)
            .map(|(t, m)| (t.key.as_str(), *m))
    }

    pub fn modal_top(&self) -> Option<ModalHandle> {
        self.controller.session().and_then(|s| s.modals.top())
    }

    fn selected(&self) -> Option<Selection> {
        let session = self.controller.session()?;
        let (modal, form, sel) = match session.modals.top() {
            Some(h) => (Some(h), &session.modals.get(h).ok()?.body, self.modal_sel),
            None => (None, &session.form, self.row_sel),
        };
        let row = visible_rows(form).nth(sel)?;
        Some(Selection {
            target: Target {
                modal,
                key: row.key.clone(),
            },
            label: row.label.clone(),
            widget: row.widget.clone(),
        })
    }

    /// Footer button under the cursor, once it moves past the dialog's rows.
    pub fn selected_button(&self) -> Option<(ModalHandle, String)> {
        let session = self.controller.session()?;
        let handle = session.modals.top()?;
        let modal = session.modals.get(handle).ok()?;
        let idx = self.modal_sel.checked_sub(visible_rows(&modal.body).count())?;
        modal.buttons.get(idx).map(|b| (handle, b.id.clone()))
    }

    fn cursor_len(&self) -> usize {
        let Some(session) = self.controller.session() else {
            return self.modules.len();
        };
        match session.modals.top().and_then(|h| session.modals.get(h).ok()) {
            Some(modal) => visible_rows(&modal.body).count() + modal.buttons.len(),
            None => visible_rows(&session.form).count(),
        }
    }

    fn notify_error(&self, message: &str) {
        self.ctx.toasts.error(message);
    }

    pub fn on_key(&mut self, key: KeyEvent) -> Option<Action> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return self.interrupt();
        }
        let typing = matches!(
            &self.overlay,
            Overlay::Prompt(_) | Overlay::Dirs(DirBrowser { naming: Some(_), .. })
        );
        let intent = if typing {
            input_intent(key)
        } else {
            nav_intent(key)
        }?;
        self.on_intent(intent)
    }

    /// Leave the module the way Esc does, then quit. Pressed again while the
    /// unsaved-changes prompt is up, quits outright.
    fn interrupt(&mut self) -> Option<Action> {
        if self.quit_after_leave || self.controller.session().is_none() {
            self.quit = true;
            return None;
        }
        self.overlay = Overlay::None;
        self.quit_after_leave = true;
        Some(Action::Leave(None))
    }

    pub fn on_intent(&mut self, intent: Intent) -> Option<Action> {
        match std::mem::take(&mut self.overlay) {
            Overlay::None => {}
            Overlay::Prompt(p) => return self.prompt_key(p, intent),
            Overlay::Dirs(d) => return self.dirs_key(d, intent),
            Overlay::Choice(c) => return self.choice_key(c, intent),
        }
        if self.controller.session().is_none() {
            return self.splash_key(intent);
        }
        match self.modal_top() {
            Some(h) => self.modal_key(h, intent),
            None => self.form_key(intent),
        }
    }

    fn move_cursor(sel: &mut usize, len: usize, intent: Intent) -> bool {
        match intent {
            Intent::Up => *sel = sel.saturating_sub(1),
            Intent::Down if *sel + 1 < len => *sel += 1,
            Intent::Down => {}
            _ => return false,
        }
        true
    }

    fn splash_key(&mut self, intent: Intent) -> Option<Action> {
        let len = self.modules.len();
        if Self::move_cursor(&mut self.splash_sel, len, intent) {
            return None;
        }
        match intent {
            Intent::Enter => self
                .modules
                .get(self.splash_sel)
                .map(|m| Action::Open(m.key.clone())),
            Intent::Quit | Intent::Back => {
                self.quit = true;
                None
            }
            _ => None,
        }
    }

    fn form_key(&mut self, intent: Intent) -> Option<Action> {
        let len = self.cursor_len();
        if Self::move_cursor(&mut self.row_sel, len, intent) {
            self.item_sel = 0;
            return None;
        }
        match intent {
            Intent::Save => Some(Action::Save),
            Intent::Back => Some(Action::Leave(None)),
            _ => self.row_key(intent),
        }
    }

    fn modal_key(&mut self, handle: ModalHandle, intent: Intent) -> Option<Action> {
        let len = self.cursor_len();
        if Self::move_cursor(&mut self.modal_sel, len, intent) {
            self.item_sel = 0;
            return None;
        }
        match intent {
            Intent::Back => {
                if let Some(session) = self.controller.session_mut() {
                    session.modals.close_button(handle);
                }
                self.modal_sel = 0;
                None
            }
            Intent::Preset if self.accepts_presets(handle) => Some(Action::Preset(handle)),
            Intent::Enter if self.selected_button().is_some() => {
                let (handle, id) = self.selected_button()?;
                self.press(handle, &id)
            }
            _ => self.row_key(intent),
        }
    }

    fn accepts_presets(&self, handle: ModalHandle) -> bool {
        let Some(session) = self.controller.session() else {
            return false;
        };
        session.module.key == GDRIVE_MODULE
            && session
                .modals
                .get(handle)
                .is_ok_and(|m| m.schema.iter().any(|f| f.key == "id"))
    }

    fn press(&mut self, handle: ModalHandle, id: &str) -> Option<Action> {
        let session = self.controller.session_mut()?;
        let outcome = match session.press(handle, id) {
            Ok(o) => o,
            Err(e) => {
                self.notify_error(&e.to_string());
                return None;
            }
        };
        match outcome {
            PressOutcome::Rejected { invalid } => self.notify_error(&format!(
                "Please fill in the required fields ({})",
                invalid.join(", ")
            )),
            PressOutcome::NoHandler => debug!("button `{id}` has no handler"),
            PressOutcome::Closed | PressOutcome::Handled { closed: true } => self.modal_sel = 0,
            PressOutcome::Handled { closed: false } => {}
        }
        // Instance dialogs queue their entry instead of committing it.
        let req = self.tests_rx.try_recv().ok()?;
        Some(Action::TestInstance(PendingTest {
            handle,
            key: req.key,
            index: req.index,
            entry: req.entry,
        }))
    }

    fn apply(&mut self, target: &Target, msg: FieldMsg) {
        let Some(session) = self.controller.session_mut() else {
            return;
        };
        let result = match target.modal {
            Some(h) => session.modal_edit(h, &target.key, msg),
            None => session.edit(&target.key, msg),
        };
        if let Err(e) = result {
            self.notify_error(&e.to_string());
        }
    }

    fn prompt(&mut self, sel: Selection, seed: String, kind: PromptKind) {
        let masked = matches!(sel.widget, Widget::Text { masked: true, .. });
        self.overlay = Overlay::Prompt(Prompt {
            target: sel.target,
            label: sel.label,
            buffer: seed,
            kind,
            masked,
        });
    }

    fn set_schedule(&mut self, target: &Target, schedule: Schedule) {
        self.schedule_mode = schedule
            .is_unset()
            .then(|| (target.clone(), schedule.mode()));
        self.apply(target, FieldMsg::SetSchedule(schedule));
    }

    fn schedule_key(&mut self, sel: Selection, stored: &Schedule, text: String, intent: Intent) {
        let target = sel.target.clone();
        let pending = self
            .schedule_mode
            .as_ref()
            .filter(|(t, _)| *t == target)
            .map(|(_, m)| *m);
        let current = shown_schedule(stored, pending);
        match intent {
            Intent::Cycle => self.set_schedule(&target, Schedule::empty(current.mode().next())),
            Intent::Enter => {
                self.overlay = Overlay::Prompt(Prompt {
                    label: format!("{} ({})", sel.label, slot_hint(current.mode())),
                    target,
                    buffer: String::new(),
                    kind: PromptKind::Slot(current),
                    masked: false,
                });
            }
            Intent::Edit => self.prompt(sel, text, PromptKind::Set),
            Intent::Remove if self.item_sel < current.slot_count() => {
                let mut schedule = current;
                schedule.remove_slot(self.item_sel);
                self.item_sel = self.item_sel.min(schedule.slot_count().saturating_sub(1));
                self.set_schedule(&target, schedule);
            }
            _ => self.move_item(current.slot_count(), intent),
        }
    }

    fn browse(&mut self, target: Target, start: &str, push: bool) -> Action {
        let (picker, rx) = DirectoryPicker::open(start);
        self.overlay = Overlay::Dirs(DirBrowser {
            picker,
            rx,
            target,
            push,
            naming: None,
        });
        Action::ListDirs
    }

    fn test_handler(&self, key: &str, index: Option<usize>) -> ButtonHandler {
        let tx = self.tests_tx.clone();
        let key = key.to_string();
        Box::new(move |ctx: &mut HandlerCtx<'_>| {
            let _ = tx.send(SaveRequest {
                key: key.clone(),
                index,
                entry: ctx.entry.clone(),
            });
        })
    }

    fn open_card(&mut self, target: &Target, index: Option<usize>) {
        let tested = target.modal.is_none()
            && self
                .controller
                .session()
                .is_some_and(|s| s.module.key == INSTANCES_MODULE);
        let on_save = tested.then(|| self.test_handler(&target.key, index));
        let Some(session) = self.controller.session_mut() else {
            return;
        };
        let opened = match target.modal {
            Some(parent) => session.open_nested_card(parent, &target.key, index, on_save),
            None => session.open_card(&target.key, index, on_save),
        };
        match opened {
            Ok(_) => {
                self.modal_sel = 0;
                self.item_sel = 0;
            }
            Err(e) => self.notify_error(&e.to_string()),
        }
    }

    fn move_item(&mut self, len: usize, intent: Intent) {
        match intent {
            Intent::Left => self.item_sel = self.item_sel.saturating_sub(1),
            Intent::Right if self.item_sel + 1 < len => self.item_sel += 1,
            _ => {}
        }
    }

    fn list_key(&mut self, target: &Target, len: usize, intent: Intent) {
        let i = self.item_sel;
        match intent {
            Intent::Remove if i < len => {
                self.apply(target, FieldMsg::ListRemove(i));
                self.item_sel = i.min(len.saturating_sub(2));
            }
            Intent::MoveUp if i > 0 && i < len => {
                self.apply(target, FieldMsg::ListMove { from: i, to: i - 1 });
                self.item_sel = i - 1;
            }
            Intent::MoveDown if i + 1 < len => {
                self.apply(target, FieldMsg::ListMove { from: i, to: i + 1 });
                self.item_sel = i + 1;
            }
            _ => self.move_item(len, intent),
        }
    }

    fn row_key(&mut self, intent: Intent) -> Option<Action> {
        let sel = self.selected()?;
        let target = sel.target.clone();
        match sel.widget.clone() {
            Widget::Checkbox { .. } => {
                if matches!(intent, Intent::Enter | Intent::Toggle) {
                    self.apply(&target, FieldMsg::Toggle);
                }
            }
            Widget::Dropdown { options, selected } => {
                let n = options.len();
                let pick = match intent {
                    Intent::Enter | Intent::Toggle | Intent::Right => {
                        Some(selected.map_or(0, |i| (i + 1) % n.max(1)))
                    }
                    Intent::Left => Some(selected.map_or(0, |i| (i + n - 1) % n.max(1))),
                    _ => None,
                };
                if let Some(i) = pick
                    && n > 0
                {
                    self.apply(&target, FieldMsg::Select(i));
                }
            }
            Widget::Directory { path } => match intent {
                Intent::Enter => return Some(self.browse(target, &path, false)),
                Intent::Edit => self.prompt(sel, path, PromptKind::Set),
                _ => {}
            },
            Widget::DirectoryList {
                entries, options, ..
            } => match intent {
                Intent::Enter => return Some(self.browse(target, "/", true)),
                Intent::Edit => self.prompt(sel, String::new(), PromptKind::Push),
                Intent::Cycle if !options.is_empty() => {
                    if let Some(entry) = entries.get(self.item_sel) {
                        let option = next_option(&options, entry.option.as_deref());
                        self.apply(
                            &target,
                            FieldMsg::ListSetOption {
                                index: self.item_sel,
                                option,
                            },
                        );
                    }
                }
                _ => self.list_key(&target, entries.len(), intent),
            },
            Widget::ColorList { colors, .. } => match intent {
                Intent::Enter | Intent::Edit => self.prompt(sel, String::new(), PromptKind::Push),
                _ => self.list_key(&target, colors.len(), intent),
            },
            Widget::Instances(picker) => {
                let items = instance_items(&picker);
                match intent {
                    Intent::Enter | Intent::Toggle => {
                        if let Some((_, msg)) = items.into_iter().nth(self.item_sel) {
                            self.apply(&target, msg);
                        }
                    }
                    _ => self.move_item(items.len(), intent),
                }
            }
            Widget::Schedule { schedule, text } => self.schedule_key(sel, &schedule, text, intent),
            Widget::HolidayRange { text, .. } => {
                if matches!(intent, Intent::Enter | Intent::Edit) {
                    self.prompt(sel, text, PromptKind::Holiday);
                }
            }
            Widget::Cards(list) => match intent {
                Intent::Enter => {
                    let index = list.cards.get(self.item_sel).map(|c| c.index);
                    self.open_card(&target, index);
                }
                // The extra slot is the "add" button.
                _ => self.move_item(list.cards.len() + 1, intent),
            },
            other => {
                if matches!(intent, Intent::Enter | Intent::Edit)
                    && let Some(seed) = prompt_seed(&other)
                {
                    self.prompt(sel, seed, PromptKind::Set);
                }
            }
        }
        None
    }

    fn prompt_key(&mut self, mut p: Prompt, intent: Intent) -> Option<Action> {
        match intent {
            Intent::Char(c) => p.buffer.push(c),
            Intent::Backspace => {
                p.buffer.pop();
            }
            Intent::Back => return None,
            Intent::Enter => {
                let Prompt {
                    target,
                    buffer,
                    kind,
                    ..
                } = p;
                match kind {
                    PromptKind::Set => self.apply(&target, FieldMsg::SetText(buffer)),
                    PromptKind::Push if !buffer.trim().is_empty() => {
                        self.apply(&target, FieldMsg::ListPush(buffer.trim().to_string()))
                    }
                    PromptKind::Push => {}
                    PromptKind::Slot(mut schedule) => match schedule.add_slot(&buffer) {
                        Ok(()) => self.set_schedule(&target, schedule),
                        Err(e) => self.notify_error(&e.to_string()),
                    },
                    PromptKind::Holiday => match buffer.parse::<HolidayRange>() {
                        Ok(range) => self.apply(&target, FieldMsg::SetHolidayRange(range)),
                        Err(e) => self.notify_error(&e.to_string()),
                    },
                }
                return None;
            }
            _ => {}
        }
        self.overlay = Overlay::Prompt(p);
        None
    }

    fn dirs_key(&mut self, mut d: DirBrowser, intent: Intent) -> Option<Action> {
        if let Some(name) = d.naming.as_mut() {
            let mut action = None;
            match intent {
                Intent::Char(c) => name.push(c),
                Intent::Backspace => {
                    name.pop();
                }
                Intent::Back => d.naming = None,
                Intent::Enter => {
                    let name = d.naming.take().unwrap_or_default();
                    action = Some(Action::CreateFolder(name.trim().to_string()));
                }
                _ => {}
            }
            self.overlay = Overlay::Dirs(d);
            return action;
        }
        let mut action = None;
        match intent {
            Intent::Up => d.picker.selected = d.picker.selected.saturating_sub(1),
            Intent::Down if d.picker.selected + 1 < d.picker.entries.len() => {
                d.picker.selected += 1
            }
            Intent::Enter | Intent::Right => {
                if let Some(child) = d.picker.entries.get(d.picker.selected).cloned() {
                    d.picker.enter(&child);
                    action = Some(Action::ListDirs);
                }
            }
            Intent::Left | Intent::Backspace => {
                d.picker.up();
                action = Some(Action::ListDirs);
            }
            Intent::NewFolder => d.naming = Some(String::new()),
            Intent::Toggle | Intent::Save => {
                let DirBrowser {
                    picker,
                    mut rx,
                    target,
                    push,
                    ..
                } = d;
                picker.accept();
                if let Ok(Some(path)) = rx.try_recv() {
                    let msg = if push {
                        FieldMsg::ListPush(path)
                    } else {
                        FieldMsg::SetText(path)
                    };
                    self.apply(&target, msg);
                }
                return None;
            }
            Intent::Back => {
                d.picker.cancel();
                return None;
            }
            _ => {}
        }
        self.overlay = Overlay::Dirs(d);
        action
    }

    fn choice_key(&mut self, mut c: ChoicePrompt, intent: Intent) -> Option<Action> {
        let last = Choice::ALL.len() - 1;
        match intent {
            Intent::Left | Intent::Up => c.selected = c.selected.saturating_sub(1),
            Intent::Right | Intent::Down => c.selected = (c.selected + 1).min(last),
            Intent::Enter => {
                let ChoicePrompt {
                    dialog,
                    mut rx,
                    selected,
                } = c;
                dialog.choose(Choice::ALL[selected.min(last)]);
                let choice = rx.try_recv().unwrap_or(Choice::Cancel);
                return Some(Action::Leave(Some(choice)));
            }
            // Dropping the dialog answers Cancel.
            Intent::Back => {
                self.quit_after_leave = false;
                return None;
            }
            _ => {}
        }
        self.overlay = Overlay::Choice(c);
        None
    }

    /// Run an action to completion.
    pub async fn perform(&mut self, action: Action) {
        let ctx = self.ctx;
        match action {
            Action::Open(key) => {
                if let Err(e) = self.controller.open_module(&key).await {
                    self.notify_error(&e.to_string());
                }
                self.row_sel = 0;
                self.modal_sel = 0;
                self.item_sel = 0;
                self.schedule_mode = None;
            }
            Action::Save => {
                if let SaveOutcome::Invalid(_) = self.controller.save().await {
                    self.jump_to_error();
                }
            }
            Action::Leave(choice) => match self.controller.leave(choice).await {
                LeaveOutcome::NeedsChoice => {
                    let (dialog, rx) =
                        ChoiceDialog::open("Unsaved changes", "Save changes before leaving?");
                    self.overlay = Overlay::Choice(ChoicePrompt {
                        dialog,
                        rx,
                        selected: 0,
                    });
                }
                LeaveOutcome::Left => {
                    self.row_sel = 0;
                    self.item_sel = 0;
                    self.schedule_mode = None;
                    self.quit = self.quit_after_leave;
                }
                LeaveOutcome::Stayed => {
                    self.quit_after_leave = false;
                    self.jump_to_error();
                }
            },
            Action::ListDirs => {
                if let Overlay::Dirs(d) = &mut self.overlay {
                    d.picker
                        .refresh(ctx.api.as_ref(), ctx.toasts.as_ref())
                        .await;
                }
            }
            Action::CreateFolder(name) => {
                if let Overlay::Dirs(d) = &mut self.overlay {
                    d.picker
                        .create_folder(&name, ctx.api.as_ref(), ctx.toasts.as_ref())
                        .await;
                }
            }
            Action::TestInstance(pending) => self.test_instance(pending).await,
            Action::Preset(handle) => self.apply_preset(handle).await,
        }
    }

    /// Move the cursor to the row validation flagged first.
    fn jump_to_error(&mut self) {
        let Some(session) = self.controller.session() else {
            return;
        };
        let Some(key) = session.form.scroll_to.as_deref() else {
            return;
        };
        if let Some(i) = visible_rows(&session.form).position(|r| r.key == key) {
            self.row_sel = i;
            self.item_sel = 0;
        }
    }

    async fn test_instance(&mut self, pending: PendingTest) {
        let ctx = self.ctx;
        let text = |k: &str| pending.entry.get(k).map(value_to_text).unwrap_or_default();
        let test = InstanceTest {
            service: pending.key.clone(),
            name: text("name"),
            url: text("url"),
            api: text("api"),
        };
        if let Err(e) = ctx.api.test_instance(&test).await {
            ctx.toasts
                .error(&format!("Connection test failed for {}: {e}", test.name));
            return;
        }
        let Some(session) = self.controller.session_mut() else {
            return;
        };
        if !session.modals.is_open(pending.handle) {
            debug!("dialog for {} closed before its test finished", test.name);
            return;
        }
        cards::commit_entry(
            &mut session.state.working,
            &pending.key,
            pending.index,
            pending.entry,
        );
        session.modals.close(pending.handle);
        session.state.mark_dirty();
        session.rerender();
        self.modal_sel = 0;
        ctx.toasts.success(&format!("Connected to {}", test.name));
    }

    async fn apply_preset(&mut self, handle: ModalHandle) {
        let ctx = self.ctx;
        let presets = match ctx.presets.presets(&ctx.api).await {
            Ok(p) => p,
            Err(e) => {
                ctx.toasts.error(&format!("Failed to load presets: {e}"));
                return;
            }
        };
        if presets.is_empty() {
            ctx.toasts
                .notify(ToastKind::Info, "No Google Drive presets configured");
            return;
        }
        let preset = &presets[self.preset_next % presets.len()];
        self.preset_next += 1;
        let Some(session) = self.controller.session_mut() else {
            return;
        };
        for (key, value) in [("name", &preset.name), ("id", &preset.id)] {
            if let Err(e) = session.modal_edit(handle, key, FieldMsg::SetText(value.clone())) {
                ctx.toasts.error(&e.to_string());
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dapsconfig::{
        codec::Schedule,
        ui::element::{InstanceChoice, InstanceGroup, PlexChoice},
    };

    fn picker() -> InstancePicker {
        InstancePicker {
            groups: vec![
                InstanceGroup {
                    instance_type: "radarr".into(),
                    choices: vec![InstanceChoice {
                        name: "radarr_hd".into(),
                        checked: true,
                        plex: None,
                    }],
                },
                InstanceGroup {
                    instance_type: "plex".into(),
                    choices: vec![InstanceChoice {
                        name: "plex_main".into(),
                        checked: true,
                        plex: Some(PlexChoice {
                            libraries: vec![("Movies".into(), true), ("Shows".into(), false)],
                            add_posters: false,
                            loaded: true,
                        }),
                    }],
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_instance_items_follow_checked_plex() {
        let items = instance_items(&picker());
        let labels: Vec<&str> = items.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(
            labels,
            [
                "[x] radarr_hd",
                "[x] plex_main",
                "  [x] Movies",
                "  [ ] Shows",
                "  [ ] add posters"
            ]
        );
        assert_eq!(
            items[3].1,
            FieldMsg::ToggleLibrary {
                instance: "plex_main".into(),
                library: "Shows".into()
            }
        );

        let mut unchecked = picker();
        unchecked.groups[1].choices[0].checked = false;
        assert_eq!(instance_items(&unchecked).len(), 2);
    }

    #[test]
    fn test_next_option_wraps() {
        let opts = vec!["border".to_string(), "no border".to_string()];
        assert_eq!(next_option(&opts, None), "border");
        assert_eq!(next_option(&opts, Some("border")), "no border");
        assert_eq!(next_option(&opts, Some("no border")), "border");
        assert_eq!(next_option(&[], None), "");
    }

    #[test]
    fn test_prompt_seed() {
        let w = Widget::Schedule {
            schedule: Schedule::parse("daily(10:00)"),
            text: "daily(10:00)".into(),
        };
        assert_eq!(prompt_seed(&w).as_deref(), Some("daily(10:00)"));
        assert_eq!(prompt_seed(&Widget::Checkbox { checked: true }), None);
    }

    fn offline_ctx(dir: &std::path::Path) -> AppContext {
        let settings = crate::settings::Settings {
            // Nothing listens here, so every request fails at once.
            base_url: "http://127.0.0.1:9".to_string(),
            theme_file: Some(dir.join("theme.json")),
            ..Default::default()
        };
        AppContext::new(settings, false).unwrap()
    }

    fn type_text(app: &mut App<'_>, text: &str) {
        for c in text.chars() {
            app.on_intent(Intent::Char(c));
        }
    }

    fn stored(app: &App<'_>, key: &str) -> Value {
        app.controller.session().unwrap().state.working[key].clone()
    }

    #[tokio::test]
    async fn test_schedule_builder_keeps_picked_mode() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = offline_ctx(dir.path());
        let mut app = App::new(&ctx);
        app.perform(Action::Open("schedule".into())).await;
        let target = Target {
            modal: None,
            key: "sync_gdrive".into(),
        };

        // daily -> weekly; nothing stored yet, but the row stays weekly.
        assert_eq!(app.on_intent(Intent::Cycle), None);
        assert_eq!(stored(&app, "sync_gdrive"), "");
        assert_eq!(app.pending_schedule_mode(None), Some(("sync_gdrive", ScheduleMode::Weekly)));

        app.on_intent(Intent::Enter);
        let Overlay::Prompt(p) = &app.overlay else {
            panic!("expected slot prompt");
        };
        assert_eq!(p.target, target);
        type_text(&mut app, "Friday@7:30");
        app.on_intent(Intent::Enter);
        assert_eq!(stored(&app, "sync_gdrive"), "weekly(friday@07:30)");
        assert_eq!(app.pending_schedule_mode(None), None);

        // A bad slot is reported and changes nothing.
        let errors = || {
            ctx.toasts
                .live()
                .iter()
                .filter(|t| t.kind == ToastKind::Error)
                .count()
        };
        let before = errors();
        app.on_intent(Intent::Enter);
        type_text(&mut app, "someday@25:00");
        app.on_intent(Intent::Enter);
        assert_eq!(stored(&app, "sync_gdrive"), "weekly(friday@07:30)");
        assert_eq!(errors(), before + 1);

        app.on_intent(Intent::Remove);
        assert_eq!(stored(&app, "sync_gdrive"), "");
        assert_eq!(app.pending_schedule_mode(None), Some(("sync_gdrive", ScheduleMode::Weekly)));
        assert!(app.controller.session().unwrap().state.is_dirty());
    }

    #[tokio::test]
    async fn test_ctrl_c_asks_before_dropping_edits() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = offline_ctx(dir.path());
        let mut app = App::new(&ctx);
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);

        app.perform(Action::Open("user_interface".into())).await;
        app.controller
            .session_mut()
            .unwrap()
            .edit("theme", FieldMsg::SetText("light".into()))
            .unwrap();

        let leave = app.on_key(ctrl_c);
        assert_eq!(leave, Some(Action::Leave(None)));
        app.perform(Action::Leave(None)).await;
        assert!(matches!(app.overlay, Overlay::Choice(_)));
        assert!(!app.should_quit());

        // Esc on the prompt keeps the module open and the app running.
        assert_eq!(app.on_intent(Intent::Back), None);
        assert!(!app.should_quit());
        assert!(app.controller.session().is_some());

        assert_eq!(app.on_key(ctrl_c), Some(Action::Leave(None)));
        app.perform(Action::Leave(None)).await;
        app.on_intent(Intent::Right);
        let discard = app.on_intent(Intent::Enter);
        assert_eq!(discard, Some(Action::Leave(Some(Choice::Discard))));
        app.perform(Action::Leave(Some(Choice::Discard))).await;
        assert!(app.controller.session().is_none());
        assert!(app.should_quit());
    }

    #[test]
    fn test_ctrl_c_on_splash_quits() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = offline_ctx(dir.path());
        let mut app = App::new(&ctx);
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(app.on_key(ctrl_c), None);
        assert!(app.should_quit());
    }

    #[test]
    fn test_action_labels() {
        assert_eq!(Action::Save.label(), "Saving");
        assert_eq!(Action::ListDirs.label(), "Listing");
    }
}
