use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::EntryId;

pub const UPLOAD_PATH: &str = "upload";
pub const PROCESS_RTSP_PATH: &str = "process_rtsp";
pub const HISTORY_PATH: &str = "history";
pub const DOWNLOAD_REPORT_PATH: &str = "download_report";

/// Multipart field carrying the uploaded file.
pub const UPLOAD_FILE_FIELD: &str = "file";
/// Multipart field carrying the stream address.
pub const RTSP_URL_FIELD: &str = "rtsp_url";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: EntryId,
    pub timestamp: String,
    pub filename: String,
    pub truck_count: i64,
    #[serde(default, deserialize_with = "non_empty_path")]
    pub output_path: Option<String>,
}

/// Response of both `/upload` and `/process_rtsp`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
    #[serde(
        default,
        deserialize_with = "non_empty_path",
        skip_serializing_if = "Option::is_none"
    )]
    pub output_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<HistoryEntry>,
}

impl AnalysisResponse {
    /// Application-level error, if the backend reported a non-empty one.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref().filter(|message| !message.is_empty())
    }
}

/// `null`, a missing key and `""` all mean "no output was produced".
fn non_empty_path<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|path| !path.is_empty()))
}
