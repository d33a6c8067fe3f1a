use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a stored analysis run.
///
/// The backend has emitted both integer ids and UUID strings over time, so
/// both are accepted and rendered verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntryId {
    Number(i64),
    Text(String),
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for EntryId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for EntryId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Element ids the page markup must expose to the controller.
pub mod bindings {
    pub const UPLOAD_FORM: &str = "upload-form";
    pub const RTSP_FORM: &str = "rtsp-form";
    pub const COUNT_DISPLAY: &str = "count";
    pub const OUTPUT_IMAGE: &str = "output-img";
    pub const HISTORY_TABLE: &str = "history-table";
    /// Class toggled on the output image to hide it.
    pub const HIDDEN_CLASS: &str = "hidden";
}

/// Which of the two analysis forms a submission came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormKind {
    Upload,
    Rtsp,
}

impl FormKind {
    pub fn element_id(self) -> &'static str {
        match self {
            Self::Upload => bindings::UPLOAD_FORM,
            Self::Rtsp => bindings::RTSP_FORM,
        }
    }
}
