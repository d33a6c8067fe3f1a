//! The page surface the controller writes to, and how history rows are laid out on it.

use shared::protocol::HistoryEntry;

use crate::messages::Messages;

/// Browsing context history links open in.
pub const LINK_TARGET: &str = "_blank";

/// Mutable page state: count display, output image, history table and alerts.
///
/// Implementations own their element handles and are expected to use interior
/// mutability, so the controller only ever needs `&self`.
pub trait View: Send + Sync {
    fn set_count_text(&self, text: &str);
    /// Point the output image at `src` and drop the hidden class.
    fn show_output_image(&self, src: &str);
    /// Add the hidden class; the previous `src` is left in place.
    fn hide_output_image(&self);
    fn clear_history(&self);
    fn append_history_row(&self, row: HistoryRow);
    /// Blocking, modal-style notification.
    fn alert(&self, message: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkCell {
    Link { href: String, text: String },
    Placeholder(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRow {
    pub id: String,
    pub timestamp: String,
    pub filename: String,
    pub truck_count: String,
    pub output: LinkCell,
}

impl HistoryRow {
    pub fn from_entry(entry: &HistoryEntry, messages: &Messages) -> Self {
        let output = match entry.output_path.as_deref() {
            Some(path) if !path.is_empty() => LinkCell::Link {
                href: path.to_string(),
                text: messages.view_link_text.clone(),
            },
            _ => LinkCell::Placeholder(messages.missing_output_placeholder.clone()),
        };

        Self {
            id: entry.id.to_string(),
            timestamp: entry.timestamp.clone(),
            filename: entry.filename.clone(),
            truck_count: entry.truck_count.to_string(),
            output,
        }
    }

    /// Plain-text cells, link cells reduced to their target.
    pub fn text_cells(&self) -> [&str; 5] {
        let last = match &self.output {
            LinkCell::Link { href, .. } => href.as_str(),
            LinkCell::Placeholder(text) => text.as_str(),
        };
        [
            self.id.as_str(),
            self.timestamp.as_str(),
            self.filename.as_str(),
            self.truck_count.as_str(),
            last,
        ]
    }

    pub fn to_html(&self) -> String {
        let mut html = String::from("<tr>");
        for value in [&self.id, &self.timestamp, &self.filename, &self.truck_count] {
            push_cell(&mut html, &escape_html(value));
        }
        let last = match &self.output {
            LinkCell::Link { href, text } => format!(
                "<a href=\"{}\" target=\"{LINK_TARGET}\">{}</a>",
                escape_html(href),
                escape_html(text)
            ),
            LinkCell::Placeholder(text) => escape_html(text),
        };
        push_cell(&mut html, &last);
        html.push_str("</tr>");
        html
    }
}

fn push_cell(html: &mut String, inner: &str) {
    html.push_str("<td class=\"border p-2\">");
    html.push_str(inner);
    html.push_str("</td>");
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod tests;
