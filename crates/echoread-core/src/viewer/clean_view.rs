//! Whole-document "clean view": every page rendered through the controller
//! and collected into one readable document.

use serde::Serialize;
use tracing::{debug, info};

use super::display::{SnapshotDisplay, VisibleLayer};
use super::text::{PageKind, html_to_plain};
use super::{OcrStatus, RenderController};
use crate::error::PageAccessError;

/// Content collected for one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "html", rename_all = "snake_case")]
pub enum PageBody {
    /// HTML-safe text (extracted or recognized).
    Text(String),
    /// Only the raster preview was available.
    RasterOnly,
    /// The page could not be read.
    Error(String),
}

/// One page of a [`CleanView`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanPage {
    pub number: u32,
    pub kind: Option<PageKind>,
    pub body: PageBody,
}

/// A document collected page by page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanView {
    pub title: String,
    pub pages: Vec<CleanPage>,
}

impl CleanView {
    /// Walk every page of the controller's document.
    ///
    /// Scanned pages wait for the OCR engine, so recognized text is collected
    /// whenever the engine can be loaded.
    pub async fn collect(
        controller: &mut RenderController<SnapshotDisplay>,
        title: impl Into<String>,
    ) -> Self {
        let mut view = CleanView {
            title: title.into(),
            pages: Vec::new(),
        };

        for number in 1..=controller.page_count() {
            let outcome = controller.render_page(number).await;

            let page = match outcome {
                Ok(outcome) => {
                    if outcome.ocr == OcrStatus::Pending {
                        let settlement = controller.settle_engine().await;
                        debug!("Engine settled for page {}: {:?}", number, settlement);
                    }
                    CleanPage {
                        number,
                        kind: Some(outcome.kind),
                        body: body_from_display(controller.display()),
                    }
                }
                Err(err) => CleanPage {
                    number,
                    kind: None,
                    body: PageBody::Error(page_error_message(&err)),
                },
            };
            view.pages.push(page);
        }

        info!("Collected clean view of {} pages", view.pages.len());
        view
    }

    /// Render as a standalone HTML document.
    pub fn to_html(&self) -> String {
        let title = html_escape::encode_text(&self.title);
        let mut html = format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n\
             <style>\n\
             body {{ background: #f5f5f5; padding: 20px; font-family: sans-serif; }}\n\
             .page {{ background: white; margin: 20px auto; max-width: 800px; padding: 24px; \
             box-shadow: 0 0 10px rgba(0,0,0,0.1); line-height: 1.6; }}\n\
             .note {{ color: #777; font-style: italic; }}\n\
             </style>\n</head>\n<body>\n<h1>{title} ({} pages)</h1>\n",
            self.pages.len()
        );

        for page in &self.pages {
            html.push_str(&format!(
                "<section class=\"page\" id=\"page-{0}\">\n<h2>Page {0}</h2>\n",
                page.number
            ));
            match &page.body {
                PageBody::Text(text) => html.push_str(text),
                PageBody::RasterOnly => html.push_str(
                    "<p class=\"note\">Scanned page; text recognition was unavailable.</p>",
                ),
                PageBody::Error(message) => html.push_str(&format!(
                    "<p class=\"note\">{}</p>",
                    html_escape::encode_text(message)
                )),
            }
            html.push_str("\n</section>\n");
        }

        html.push_str("</body>\n</html>\n");
        html
    }

    /// Render as plain text with page separators.
    pub fn to_text(&self) -> String {
        self.pages
            .iter()
            .map(|page| {
                let body = match &page.body {
                    PageBody::Text(text) => html_to_plain(text).trim_end().to_string(),
                    PageBody::RasterOnly => "[scanned page, no text recognized]".to_string(),
                    PageBody::Error(message) => format!("[{}]", message),
                };
                format!("--- Page {} ---\n{}\n", page.number, body)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn body_from_display(display: &SnapshotDisplay) -> PageBody {
    match display.visible {
        VisibleLayer::Text => PageBody::Text(display.text_html.clone()),
        _ => PageBody::RasterOnly,
    }
}

fn page_error_message(err: &PageAccessError) -> String {
    format!("could not read page: {}", err)
}
