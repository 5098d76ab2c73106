use crate::data::schema::SchemaError;

/// Errors raised by the form engine.
///
/// Validation failures are not errors: they come back from
/// [`crate::ui::validate::validate`] as a list of offending keys.
#[derive(Debug, thiserror::Error)]
pub enum FormError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("field `{key}` cannot be rendered: {reason}")]
    Render { key: String, reason: String },

    #[error("edit `{msg}` does not apply to field `{key}`")]
    UnsupportedEdit { key: String, msg: String },

    #[error("no field `{0}` in the current schema")]
    UnknownField(String),

    #[error("modal at depth {0} is not open")]
    ModalClosed(usize),

    #[error("modal has no button `{0}`")]
    UnknownButton(String),

    #[error("unknown module `{0}`")]
    UnknownModule(String),

    #[error("collaborator failed: {0}")]
    Collaborator(String),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl FormError {
    pub fn render(key: &str, reason: impl Into<String>) -> Self {
        FormError::Render {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = FormError> = std::result::Result<T, E>;
