use serde_json::Value;

use crate::data::value::{module_subtree, set_key};

/// Edit session state for one module.
///
/// `root` is the configuration fetched when the module was opened and is the
/// source for cross-module lookups. `working` is the live copy every field
/// edit writes into; `baseline` is what the server last accepted.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Full configuration tree as last fetched.
    pub root: Value,
    /// Key of the module being edited.
    pub module_key: String,
    /// Module subtree as last loaded or saved.
    pub baseline: Value,
    /// Module subtree with pending edits applied.
    pub working: Value,
    dirty: bool,
}

impl AppState {
    /// Build the state for `module_key` from a freshly fetched root config.
    ///
    /// A missing subtree starts as an empty object.
    pub fn new(root: Value, module_key: &str) -> Self {
        let subtree = module_subtree(&root, module_key);
        AppState {
            root,
            module_key: module_key.to_string(),
            baseline: subtree.clone(),
            working: subtree,
            dirty: false,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        if !self.dirty {
            debug!("{}: unsaved changes", self.module_key);
        }
        self.dirty = true;
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Record a successful save: the working copy becomes the baseline and
    /// the root config reflects it.
    pub fn commit_baseline(&mut self) {
        self.baseline = self.working.clone();
        set_key(&mut self.root, &self.module_key, self.working.clone());
        self.dirty = false;
    }

    /// Throw away pending edits.
    pub fn discard(&mut self) {
        self.working = self.baseline.clone();
        self.dirty = false;
    }

    /// Root config with the working copy spliced in, for lookups that must
    /// see unsaved edits (e.g. instances added in this session).
    pub fn live_root(&self) -> Value {
        let mut root = self.root.clone();
        set_key(&mut root, &self.module_key, self.working.clone());
        root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transitions() {
        let mut st = AppState::new(json!({"nohl": {"searches": 5}}), "nohl");
        assert!(!st.is_dirty());
        st.working["searches"] = json!(9);
        st.mark_dirty();
        assert!(st.is_dirty());
        st.discard();
        assert_eq!(st.working, json!({"searches": 5}));
        assert!(!st.is_dirty());

        st.working["searches"] = json!(7);
        st.mark_dirty();
        st.commit_baseline();
        assert_eq!(st.baseline, json!({"searches": 7}));
        assert_eq!(st.root["nohl"], json!({"searches": 7}));
        assert!(!st.is_dirty());
    }

    #[test]
    fn test_missing_module_starts_empty() {
        let st = AppState::new(json!({}), "jduparr");
        assert_eq!(st.working, json!({}));
    }
}
