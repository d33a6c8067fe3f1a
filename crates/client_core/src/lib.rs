//! Client side of the truck counter: talks to the analysis backend and keeps
//! the page (count display, output image, history table) in sync with it.

pub mod backend;
pub mod controller;
pub mod error;
pub mod messages;
pub mod view;

pub use backend::{
    CounterBackend, HttpBackend, Report, ReportResponse, RtspForm, UploadForm,
};
pub use controller::{FormController, SubmitOutcome};
pub use error::ClientError;
pub use messages::{Locale, Messages};
pub use view::{HistoryRow, LinkCell, View, LINK_TARGET};
