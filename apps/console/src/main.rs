use std::{
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    CounterBackend, FormController, HttpBackend, Locale, Messages, RtspForm, SubmitOutcome,
    UploadForm,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod terminal;

use config::load_settings;
use terminal::TerminalView;

#[derive(Parser, Debug)]
#[command(name = "truck-counter", about = "Submit images, videos and RTSP streams for truck counting")]
struct Args {
    /// Analysis server address; overrides client.toml and the environment.
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    locale: Option<Locale>,
    #[arg(long)]
    timeout_secs: Option<u64>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the analysis history.
    History,
    /// Upload an image or video file.
    Upload {
        path: PathBuf,
        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },
    /// Grab and analyse a frame from an RTSP stream.
    Rtsp {
        url: String,
        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },
    /// Download the spreadsheet report of all runs.
    Report {
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected name=value, got '{raw}'")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(server_url) = args.server_url {
        settings.server_url = server_url;
    }
    if let Some(locale) = args.locale {
        settings.locale = locale;
    }
    if let Some(timeout_secs) = args.timeout_secs {
        settings.request_timeout_secs = Some(timeout_secs);
    }

    let messages = Messages::for_locale(settings.locale);
    let backend = HttpBackend::new(&settings.server_url, settings.request_timeout())
        .context("failed to set up HTTP client")?;
    let view = TerminalView::new(backend.base_url().clone(), &messages);
    let controller = FormController::new(backend, view, messages);
    info!(server_url = %settings.server_url, "page ready");

    run(&controller, args.command, &mut std::io::stdout()).await
}

/// One page session: load history, handle the command, print the page.
///
/// A failed history load is already alerted and does not block the forms; the
/// page is printed even when the submission itself ends in an error.
async fn run<B: CounterBackend>(
    controller: &FormController<B, TerminalView>,
    command: Command,
    out: &mut impl Write,
) -> Result<()> {
    if let Err(err) = controller.init().await {
        warn!(error = %err, "continuing without analysis history");
    }

    let result = match command {
        Command::History => Ok(()),
        Command::Upload { path, fields } => match read_upload_form(&path, fields).await {
            Ok(form) => controller
                .submit_upload(form)
                .await
                .with_context(|| format!("failed to upload '{}'", path.display()))
                .and_then(finish_submission),
            Err(err) => Err(err),
        },
        Command::Rtsp { url, fields } => {
            let form = RtspForm {
                rtsp_url: url,
                extra_fields: fields,
            };
            controller
                .submit_rtsp(form)
                .await
                .context("failed to process RTSP stream")
                .and_then(finish_submission)
        }
        Command::Report { out: report_path } => {
            return save_report(controller, report_path, out).await;
        }
    };

    controller
        .view()
        .render(out)
        .context("failed to print page")?;
    result
}

async fn save_report<B: CounterBackend>(
    controller: &FormController<B, TerminalView>,
    report_path: Option<PathBuf>,
    out: &mut impl Write,
) -> Result<()> {
    let Some(report) = controller
        .download_report()
        .await
        .context("failed to download report")?
    else {
        bail!("report is not available");
    };
    let path = report_path.unwrap_or_else(|| PathBuf::from(&report.file_name));
    tokio::fs::write(&path, &report.bytes)
        .await
        .with_context(|| format!("failed to write report to '{}'", path.display()))?;
    writeln!(out, "{}", path.display())?;
    Ok(())
}

async fn read_upload_form(path: &Path, extra_fields: Vec<(String, String)>) -> Result<UploadForm> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("'{}' has no file name", path.display()))?;

    Ok(UploadForm {
        file_name,
        bytes,
        mime_type: mime_guess::from_path(path).first_raw().map(str::to_string),
        extra_fields,
    })
}

fn finish_submission(outcome: SubmitOutcome) -> Result<()> {
    match outcome {
        SubmitOutcome::Applied { .. } | SubmitOutcome::Busy => Ok(()),
        SubmitOutcome::Rejected(message) => bail!("server rejected the request: {message}"),
    }
}
