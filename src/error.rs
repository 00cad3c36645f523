use thiserror::Error;

#[derive(Debug, Error)]
pub enum CanvasError {
    #[error("no shape named {0:?} in the current diagram")]
    ShapeNotFound(String),

    #[error("failed to fetch {href}: {reason}")]
    Fetch { href: String, reason: String },

    #[error("malformed document markup: {0}")]
    Markup(String),

    #[error("diagram state is not valid: {0}")]
    State(#[from] serde_json::Error),

    #[error("print flow failed: {0}")]
    Print(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CanvasError {
    pub fn fetch(href: &str, reason: impl ToString) -> Self {
        CanvasError::Fetch {
            href: href.to_string(),
            reason: reason.to_string(),
        }
    }
}
