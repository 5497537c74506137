//! Page classification and HTML-safe text formatting.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::pdf::TextRun;

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"[ \t\u{a0}]+").unwrap();
    static ref BREAK: Regex = Regex::new(r"(?i)<br\s*/?>").unwrap();
    static ref BLANK_LINES: Regex = Regex::new(r"\n{3,}").unwrap();
}

/// How a page's content is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    /// The text layer carries enough machine-extractable text.
    Digital,
    /// Little or no extractable text; needs recognition.
    Scanned,
}

/// Classify a page from its text runs.
///
/// Run texts are joined with single spaces; if the trimmed result has fewer
/// than `threshold` characters the page is scanned.
pub fn classify(runs: &[TextRun], threshold: usize) -> PageKind {
    let joined = runs
        .iter()
        .map(|run| run.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    if joined.trim().chars().count() < threshold {
        PageKind::Scanned
    } else {
        PageKind::Digital
    }
}

/// Render text runs as HTML-safe markup with `<br>` after line-ending runs.
pub fn runs_to_html(runs: &[TextRun]) -> String {
    let mut html = String::new();
    for run in runs {
        let text = WHITESPACE.replace_all(run.text.trim(), " ");
        if !text.is_empty() {
            if !html.is_empty() && !html.ends_with("<br>") {
                html.push(' ');
            }
            html.push_str(&html_escape::encode_text(&text));
        }
        if run.ends_line {
            html.push_str("<br>");
        }
    }
    html
}

/// Render recognized text as HTML-safe markup, newlines becoming `<br>`.
pub fn ocr_text_to_html(text: &str) -> String {
    let normalized = BLANK_LINES.replace_all(text.trim(), "\n\n");
    normalized
        .lines()
        .map(|line| html_escape::encode_text(line.trim_end()).into_owned())
        .collect::<Vec<_>>()
        .join("<br>")
}

/// Turn display markup back into plain text.
pub fn html_to_plain(html: &str) -> String {
    let with_newlines = BREAK.replace_all(html, "\n");
    html_escape::decode_html_entities(&with_newlines).into_owned()
}

/// Page indicator label, e.g. `Page 2 / 3`.
pub fn page_indicator_label(current: u32, total: u32) -> String {
    format!("Page {} / {}", current, total)
}
