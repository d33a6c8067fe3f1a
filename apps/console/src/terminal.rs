//! Terminal stand-in for the analysis page.

use std::{
    io::{self, Write},
    sync::Mutex,
};

use client_core::{HistoryRow, LinkCell, Messages, View};
use shared::domain::bindings;
use url::Url;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageState {
    pub count_text: Option<String>,
    pub image_src: Option<String>,
    pub image_hidden: bool,
    pub rows: Vec<HistoryRow>,
    pub alerts: Vec<String>,
}

/// Keeps the page state in memory and prints it on demand; alerts go
/// straight to stderr.
pub struct TerminalView {
    base_url: Url,
    headers: [String; 5],
    page: Mutex<PageState>,
    echo_alerts: bool,
}

impl TerminalView {
    pub fn new(base_url: Url, messages: &Messages) -> Self {
        Self {
            base_url,
            headers: messages.history_headers.clone(),
            page: Mutex::new(PageState {
                image_hidden: true,
                ..PageState::default()
            }),
            echo_alerts: true,
        }
    }

    /// Records alerts without printing them.
    pub fn quiet(mut self) -> Self {
        self.echo_alerts = false;
        self
    }

    pub fn snapshot(&self) -> PageState {
        self.with_page(|page| page.clone())
    }

    /// Resolves backend-relative paths such as `static/uploads/x.jpg`.
    pub fn resolve(&self, path: &str) -> String {
        self.base_url
            .join(path)
            .map(|url| url.to_string())
            .unwrap_or_else(|_| path.to_string())
    }

    pub fn render(&self, out: &mut impl Write) -> io::Result<()> {
        let page = self.snapshot();

        if let Some(count_text) = &page.count_text {
            writeln!(out, "#{}: {count_text}", bindings::COUNT_DISPLAY)?;
        }
        match (&page.image_src, page.image_hidden) {
            (Some(src), false) => writeln!(out, "#{}: {}", bindings::OUTPUT_IMAGE, self.resolve(src))?,
            _ => writeln!(out, "#{}: {}", bindings::OUTPUT_IMAGE, bindings::HIDDEN_CLASS)?,
        }

        writeln!(out)?;
        writeln!(out, "#{}", bindings::HISTORY_TABLE)?;
        let rows: Vec<[String; 5]> = page.rows.iter().map(|row| self.cells(row)).collect();
        let mut widths = self.headers.clone().map(|header| header.chars().count());
        for cells in &rows {
            for (width, cell) in widths.iter_mut().zip(cells) {
                *width = (*width).max(cell.chars().count());
            }
        }

        write_row(out, &self.headers, &widths)?;
        let rule: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
        writeln!(out, "{}", rule.join("-+-"))?;
        for cells in &rows {
            write_row(out, cells, &widths)?;
        }
        Ok(())
    }

    fn cells(&self, row: &HistoryRow) -> [String; 5] {
        let last = match &row.output {
            LinkCell::Link { href, .. } => self.resolve(href),
            LinkCell::Placeholder(text) => text.clone(),
        };
        [
            row.id.clone(),
            row.timestamp.clone(),
            row.filename.clone(),
            row.truck_count.clone(),
            last,
        ]
    }

    fn with_page<T>(&self, f: impl FnOnce(&mut PageState) -> T) -> T {
        let mut guard = self
            .page
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }
}

fn write_row(out: &mut impl Write, cells: &[String; 5], widths: &[usize; 5]) -> io::Result<()> {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| {
            let pad = width.saturating_sub(cell.chars().count());
            format!("{cell}{}", " ".repeat(pad))
        })
        .collect();
    writeln!(out, "{}", padded.join(" | ").trim_end())
}

impl View for TerminalView {
    fn set_count_text(&self, text: &str) {
        self.with_page(|page| page.count_text = Some(text.to_string()));
    }

    fn show_output_image(&self, src: &str) {
        self.with_page(|page| {
            page.image_src = Some(src.to_string());
            page.image_hidden = false;
        });
    }

    fn hide_output_image(&self) {
        self.with_page(|page| page.image_hidden = true);
    }

    fn clear_history(&self) {
        self.with_page(|page| page.rows.clear());
    }

    fn append_history_row(&self, row: HistoryRow) {
        self.with_page(|page| page.rows.push(row));
    }

    fn alert(&self, message: &str) {
        if self.echo_alerts {
            eprintln!("! {message}");
        }
        self.with_page(|page| page.alerts.push(message.to_string()));
    }
}

#[cfg(test)]
#[path = "tests/terminal_tests.rs"]
mod tests;
