use thiserror::Error;

/// A stage reported a defect and the page's pipeline was abandoned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{stage} stage defect: {message}")]
pub struct PageDefect {
    pub stage: &'static str,
    pub message: String,
}

impl PageDefect {
    pub fn new(stage: &'static str, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}
