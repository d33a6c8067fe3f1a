use std::{path::Path, time::Duration};

use async_trait::async_trait;
use reqwest::{
    header::CONTENT_DISPOSITION,
    multipart::{Form, Part},
    Client, Response,
};
use serde::de::DeserializeOwned;
use shared::{
    error::ApiError,
    protocol::{
        AnalysisResponse, HistoryEntry, DOWNLOAD_REPORT_PATH, HISTORY_PATH, PROCESS_RTSP_PATH,
        RTSP_URL_FIELD, UPLOAD_FILE_FIELD, UPLOAD_PATH,
    },
};
use tracing::debug;
use url::Url;

use crate::error::ClientError;

const DEFAULT_REPORT_NAME: &str = "report.xlsx";

/// Contents of the upload form: the chosen file plus any other declared fields.
#[derive(Debug, Clone)]
pub struct UploadForm {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mime_type: Option<String>,
    pub extra_fields: Vec<(String, String)>,
}

impl UploadForm {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
            mime_type: None,
            extra_fields: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RtspForm {
    pub rtsp_url: String,
    pub extra_fields: Vec<(String, String)>,
}

impl RtspForm {
    pub fn new(rtsp_url: impl Into<String>) -> Self {
        Self {
            rtsp_url: rtsp_url.into(),
            extra_fields: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportResponse {
    File(Report),
    Error(ApiError),
}

/// The analysis endpoints the page talks to.
#[async_trait]
pub trait CounterBackend: Send + Sync {
    async fn upload(&self, form: UploadForm) -> Result<AnalysisResponse, ClientError>;
    async fn process_rtsp(&self, form: RtspForm) -> Result<AnalysisResponse, ClientError>;
    async fn history(&self) -> Result<Vec<HistoryEntry>, ClientError>;
    async fn download_report(&self) -> Result<ReportResponse, ClientError>;
}

pub struct HttpBackend {
    http: Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(server_url: &str, timeout: Option<Duration>) -> Result<Self, ClientError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(ClientError::HttpClient)?;
        Self::with_client(server_url, http)
    }

    pub fn with_client(server_url: &str, http: Client) -> Result<Self, ClientError> {
        Ok(Self {
            http,
            base_url: parse_base_url(server_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &'static str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|source| ClientError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                source,
            })
    }

    async fn post_form(
        &self,
        path: &'static str,
        form: Form,
    ) -> Result<AnalysisResponse, ClientError> {
        let url = self.endpoint(path)?;
        debug!(endpoint = path, %url, "submitting form");
        let response = self
            .http
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                endpoint: path,
                source,
            })?;
        decode_json(path, response).await
    }
}

/// Parses the server address, forcing a trailing slash so endpoint paths
/// are appended rather than replacing the last segment.
pub fn parse_base_url(server_url: &str) -> Result<Url, ClientError> {
    let trimmed = server_url.trim();
    let normalized = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    Url::parse(&normalized).map_err(|source| ClientError::InvalidBaseUrl {
        url: server_url.to_string(),
        source,
    })
}

#[async_trait]
impl CounterBackend for HttpBackend {
    async fn upload(&self, form: UploadForm) -> Result<AnalysisResponse, ClientError> {
        let mut part = Part::bytes(form.bytes).file_name(form.file_name);
        if let Some(mime_type) = form.mime_type {
            part = part
                .mime_str(&mime_type)
                .map_err(|source| ClientError::InvalidMimeType { mime_type, source })?;
        }
        let multipart = with_fields(Form::new().part(UPLOAD_FILE_FIELD, part), form.extra_fields);
        self.post_form(UPLOAD_PATH, multipart).await
    }

    async fn process_rtsp(&self, form: RtspForm) -> Result<AnalysisResponse, ClientError> {
        let multipart = with_fields(
            Form::new().text(RTSP_URL_FIELD, form.rtsp_url),
            form.extra_fields,
        );
        self.post_form(PROCESS_RTSP_PATH, multipart).await
    }

    async fn history(&self) -> Result<Vec<HistoryEntry>, ClientError> {
        let url = self.endpoint(HISTORY_PATH)?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                endpoint: HISTORY_PATH,
                source,
            })?;
        decode_json(HISTORY_PATH, response).await
    }

    async fn download_report(&self) -> Result<ReportResponse, ClientError> {
        let url = self.endpoint(DOWNLOAD_REPORT_PATH)?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                endpoint: DOWNLOAD_REPORT_PATH,
                source,
            })?;

        if !response.status().is_success() {
            return decode_json(DOWNLOAD_REPORT_PATH, response)
                .await
                .map(ReportResponse::Error);
        }

        let file_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(attachment_file_name)
            .unwrap_or_else(|| DEFAULT_REPORT_NAME.to_string());
        let bytes = response
            .bytes()
            .await
            .map_err(|source| ClientError::Transport {
                endpoint: DOWNLOAD_REPORT_PATH,
                source,
            })?;

        Ok(ReportResponse::File(Report {
            file_name,
            bytes: bytes.to_vec(),
        }))
    }
}

fn with_fields(form: Form, fields: Vec<(String, String)>) -> Form {
    fields
        .into_iter()
        .fold(form, |form, (name, value)| form.text(name, value))
}

/// Decodes the body whatever the status: the backend pairs 4xx codes with a
/// JSON `error` the page still has to show. A status failure is only reported
/// when the body does not decode.
async fn decode_json<T: DeserializeOwned>(
    endpoint: &'static str,
    response: Response,
) -> Result<T, ClientError> {
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|source| ClientError::Transport { endpoint, source })?;

    match serde_json::from_slice(&body) {
        Ok(decoded) => Ok(decoded),
        Err(_) if !status.is_success() => Err(ClientError::Status {
            endpoint,
            status: status.as_u16(),
        }),
        Err(source) => Err(ClientError::Decode { endpoint, source }),
    }
}

/// Only a bare file name is accepted; anything that could point outside the
/// working directory falls back to the default name.
fn attachment_file_name(header: &str) -> Option<String> {
    let value = header.split(';').find_map(|param| {
        let value = param.trim().strip_prefix("filename=")?;
        Some(value.trim_matches('"'))
    })?;

    let bare = Path::new(value).file_name().and_then(|name| name.to_str())?;
    let safe = bare == value
        && !value.starts_with('.')
        && !value.contains(['/', '\\', ':'])
        && !value.chars().any(char::is_control);
    safe.then(|| value.to_string())
}

#[cfg(test)]
#[path = "tests/backend_tests.rs"]
mod tests;
