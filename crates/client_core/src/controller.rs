//! Form controller: submissions in, count/image/history updates out.

use std::sync::atomic::{AtomicBool, Ordering};

use shared::{domain::FormKind, protocol::AnalysisResponse};
use tracing::{debug, error, info, warn};

use crate::{
    backend::{CounterBackend, Report, ReportResponse, RtspForm, UploadForm},
    error::ClientError,
    messages::Messages,
    view::{HistoryRow, View},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Count and image were updated and the history table refreshed.
    Applied {
        count: i64,
        output_path: Option<String>,
    },
    /// The backend answered with an `error`, which was shown as an alert.
    Rejected(String),
    /// The same form was still submitting; nothing was sent.
    Busy,
}

/// Owns the page surface and the backend for the page's whole lifetime.
pub struct FormController<B, V> {
    backend: B,
    view: V,
    messages: Messages,
    upload_in_flight: AtomicBool,
    rtsp_in_flight: AtomicBool,
}

impl<B: CounterBackend, V: View> FormController<B, V> {
    pub fn new(backend: B, view: V, messages: Messages) -> Self {
        Self {
            backend,
            view,
            messages,
            upload_in_flight: AtomicBool::new(false),
            rtsp_in_flight: AtomicBool::new(false),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    /// Page-ready hook.
    pub async fn init(&self) -> Result<(), ClientError> {
        self.refresh_history().await.map(|_| ())
    }

    pub async fn submit_upload(&self, form: UploadForm) -> Result<SubmitOutcome, ClientError> {
        let Some(_guard) = InFlight::acquire(&self.upload_in_flight) else {
            debug!(form = FormKind::Upload.element_id(), "submission ignored; already in flight");
            return Ok(SubmitOutcome::Busy);
        };
        info!(file = %form.file_name, bytes = form.bytes.len(), "uploading file for analysis");
        let response = self.backend.upload(form).await;
        self.apply_analysis(FormKind::Upload, response).await
    }

    pub async fn submit_rtsp(&self, form: RtspForm) -> Result<SubmitOutcome, ClientError> {
        let Some(_guard) = InFlight::acquire(&self.rtsp_in_flight) else {
            debug!(form = FormKind::Rtsp.element_id(), "submission ignored; already in flight");
            return Ok(SubmitOutcome::Busy);
        };
        info!(rtsp_url = %form.rtsp_url, "submitting stream for analysis");
        let response = self.backend.process_rtsp(form).await;
        self.apply_analysis(FormKind::Rtsp, response).await
    }

    /// Clears the history table and rebuilds it in the order received.
    pub async fn refresh_history(&self) -> Result<usize, ClientError> {
        let entries = match self.backend.history().await {
            Ok(entries) => entries,
            Err(err) => {
                self.surface_failure(&err);
                return Err(err);
            }
        };

        self.view.clear_history();
        for entry in &entries {
            self.view
                .append_history_row(HistoryRow::from_entry(entry, &self.messages));
        }
        debug!(rows = entries.len(), "history table rebuilt");
        Ok(entries.len())
    }

    /// `Ok(None)` means the backend had no report and the reason was alerted.
    pub async fn download_report(&self) -> Result<Option<Report>, ClientError> {
        match self.backend.download_report().await {
            Ok(ReportResponse::File(report)) => {
                info!(file = %report.file_name, bytes = report.bytes.len(), "report downloaded");
                Ok(Some(report))
            }
            Ok(ReportResponse::Error(api_error)) => {
                warn!(error = %api_error.error, "report unavailable");
                self.view.alert(&api_error.error);
                Ok(None)
            }
            Err(err) => {
                self.surface_failure(&err);
                Err(err)
            }
        }
    }

    async fn apply_analysis(
        &self,
        kind: FormKind,
        response: Result<AnalysisResponse, ClientError>,
    ) -> Result<SubmitOutcome, ClientError> {
        let response = match response {
            Ok(response) => response,
            Err(err) => {
                self.surface_failure(&err);
                return Err(err);
            }
        };

        if let Some(message) = response.error_message() {
            warn!(form = kind.element_id(), error = message, "analysis rejected");
            self.view.alert(message);
            return Ok(SubmitOutcome::Rejected(message.to_string()));
        }

        let count = response.count.unwrap_or_else(|| {
            warn!(form = kind.element_id(), "response carried no count; showing 0");
            0
        });
        self.view.set_count_text(&self.messages.count_text(count));
        match response.output_path.as_deref() {
            Some(path) => self.view.show_output_image(path),
            None => self.view.hide_output_image(),
        }
        info!(
            form = kind.element_id(),
            count,
            output_path = response.output_path.as_deref().unwrap_or("-"),
            "analysis applied"
        );

        self.refresh_history().await?;
        Ok(SubmitOutcome::Applied {
            count,
            output_path: response.output_path,
        })
    }

    fn surface_failure(&self, err: &ClientError) {
        error!(endpoint = err.endpoint().unwrap_or("-"), error = %err, "request failed");
        self.view.alert(&self.messages.request_failed);
    }
}

/// Holds a form's submitting flag until dropped.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
