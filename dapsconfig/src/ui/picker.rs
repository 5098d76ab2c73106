//! Two fixed-shape dialogs that resolve a value instead of editing an entry.
//!
//! [`DirectoryPicker`] browses server directories and resolves to the chosen
//! path (`None` on cancel). [`ChoiceDialog`] asks save/discard/cancel. Both
//! hand back a [`oneshot::Receiver`] when opened; dropping the dialog without
//! an answer resolves it as cancelled.

use tokio::sync::oneshot;

use crate::{
    data::schema::{FieldKind, FieldSchema},
    services::{DirectoryService, Notifier, or_toast},
};

/// Join a server-side directory path and a child name with `/`.
pub fn join_path(base: &str, child: &str) -> String {
    let child = child.trim_matches('/');
    match base.trim_end_matches('/') {
        "" => format!("/{child}"),
        b => format!("{b}/{child}"),
    }
}

/// Parent of a server-side path; the root is its own parent.
pub fn parent_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(i) => trimmed[..i].to_string(),
    }
}

#[derive(Debug)]
pub struct DirectoryPicker {
    /// Directory currently shown.
    pub path: String,
    /// Its children, as last listed.
    pub entries: Vec<String>,
    pub selected: usize,
    tx: Option<oneshot::Sender<Option<String>>>,
}

impl DirectoryPicker {
    /// The single-path schema the picker edits.
    pub fn schema() -> Vec<FieldSchema> {
        vec![FieldSchema::new("path", "Path", FieldKind::Dir)]
    }

    pub fn open(start: &str) -> (Self, oneshot::Receiver<Option<String>>) {
        let (tx, rx) = oneshot::channel();
        let path = if start.trim().is_empty() {
            "/".to_string()
        } else {
            start.to_string()
        };
        let picker = DirectoryPicker {
            path,
            entries: Vec::new(),
            selected: 0,
            tx: Some(tx),
        };
        (picker, rx)
    }

    /// List the children of the current path. Failures leave the list empty.
    pub async fn refresh(&mut self, dirs: &dyn DirectoryService, notifier: &dyn Notifier) {
        self.entries = or_toast(
            dirs.list_directories(&self.path),
            notifier,
            "Failed to list directories",
            Vec::new(),
        )
        .await;
        self.selected = 0;
    }

    pub fn set_path(&mut self, path: &str) {
        self.path = path.to_string();
        self.entries.clear();
        self.selected = 0;
    }

    /// Descend into a child directory. Call [`refresh`](Self::refresh) after.
    pub fn enter(&mut self, child: &str) {
        let next = join_path(&self.path, child);
        self.set_path(&next);
    }

    pub fn up(&mut self) {
        let parent = parent_path(&self.path);
        self.set_path(&parent);
    }

    /// Create `name` under the current path and re-list. Returns whether the
    /// folder was created.
    pub async fn create_folder(
        &mut self,
        name: &str,
        dirs: &dyn DirectoryService,
        notifier: &dyn Notifier,
    ) -> bool {
        if name.trim().is_empty() {
            notifier.error("Folder name is empty");
            return false;
        }
        let target = join_path(&self.path, name);
        let created = or_toast(
            async { dirs.create_directory(&target).await.map(|_| true) },
            notifier,
            "Failed to create folder",
            false,
        )
        .await;
        if created {
            notifier.success(&format!("Created {target}"));
            self.refresh(dirs, notifier).await;
        }
        created
    }

    /// Resolve with the current path.
    pub fn accept(mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Some(self.path.clone()));
        }
    }

    /// Resolve with `None`.
    pub fn cancel(mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(None);
        }
    }
}

impl Drop for DirectoryPicker {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(None);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Save,
    Discard,
    Cancel,
}

impl Choice {
    pub const ALL: [Choice; 3] = [Choice::Save, Choice::Discard, Choice::Cancel];

    pub fn label(&self) -> &'static str {
        match self {
            Choice::Save => "Save",
            Choice::Discard => "Discard",
            Choice::Cancel => "Cancel",
        }
    }
}

/// Save / discard / cancel prompt. Has no schema.
#[derive(Debug)]
pub struct ChoiceDialog {
    pub title: String,
    pub message: String,
    tx: Option<oneshot::Sender<Choice>>,
}

impl ChoiceDialog {
    pub fn open(title: &str, message: &str) -> (Self, oneshot::Receiver<Choice>) {
        let (tx, rx) = oneshot::channel();
        let dialog = ChoiceDialog {
            title: title.to_string(),
            message: message.to_string(),
            tx: Some(tx),
        };
        (dialog, rx)
    }

    pub fn choose(mut self, choice: Choice) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(choice);
        }
    }
}

impl Drop for ChoiceDialog {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Choice::Cancel);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::{FormError, Result},
        services::ToastKind,
    };
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Dirs {
        created: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl DirectoryService for Dirs {
        async fn list_directories(&self, path: &str) -> Result<Vec<String>> {
            if path == "/broken" {
                return Err(FormError::Collaborator("boom".into()));
            }
            let mut out = vec!["movies".to_string(), "shows".to_string()];
            out.extend(self.created.lock().unwrap().iter().cloned());
            Ok(out)
        }

        async fn create_directory(&self, path: &str) -> Result<()> {
            self.created
                .lock()
                .unwrap()
                .push(path.rsplit('/').next().unwrap_or_default().to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    struct Toasts(Mutex<Vec<(ToastKind, String)>>);

    impl Notifier for Toasts {
        fn notify(&self, kind: ToastKind, message: &str) {
            self.0.lock().unwrap().push((kind, message.to_string()));
        }
    }

    #[test]
    fn test_paths() {
        assert_eq!(join_path("/", "media"), "/media");
        assert_eq!(join_path("/media/", "/tv/"), "/media/tv");
        assert_eq!(parent_path("/media/tv"), "/media");
        assert_eq!(parent_path("/media"), "/");
        assert_eq!(parent_path("/"), "/");
    }

    #[tokio::test]
    async fn test_picker_accept_and_create() {
        let dirs = Dirs::default();
        let toasts = Toasts::default();
        let (mut picker, rx) = DirectoryPicker::open("/data");
        picker.refresh(&dirs, &toasts).await;
        assert_eq!(picker.entries, vec!["movies", "shows"]);
        assert!(picker.create_folder("posters", &dirs, &toasts).await);
        assert!(picker.entries.contains(&"posters".to_string()));
        picker.enter("posters");
        picker.accept();
        assert_eq!(rx.await.unwrap().as_deref(), Some("/data/posters"));
    }

    #[tokio::test]
    async fn test_picker_failure_toasts_and_drop_cancels() {
        let dirs = Dirs::default();
        let toasts = Toasts::default();
        let (mut picker, rx) = DirectoryPicker::open("/broken");
        picker.refresh(&dirs, &toasts).await;
        assert!(picker.entries.is_empty());
        assert_eq!(toasts.0.lock().unwrap()[0].0, ToastKind::Error);
        drop(picker);
        assert_eq!(rx.await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_choice_dialog() {
        let (dialog, rx) = ChoiceDialog::open("Unsaved changes", "Save before leaving?");
        dialog.choose(Choice::Discard);
        assert_eq!(rx.await.unwrap(), Choice::Discard);

        let (dialog, rx) = ChoiceDialog::open("Unsaved changes", "Save before leaving?");
        drop(dialog);
        assert_eq!(rx.await.unwrap(), Choice::Cancel);
    }
}
