//! Error types for the editor

use crate::indexes::IndexError;
use pagecraft_common::CommonError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Common(#[from] CommonError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),
}
