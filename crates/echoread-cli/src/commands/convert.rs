//! Convert command - turn a whole document into one clean, readable file.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::info;

use echoread_core::viewer::PageBody;
use echoread_core::{CleanView, SnapshotDisplay};

use super::{build_controller, fetch_spinner, load_config};

/// Arguments for the convert command.
#[derive(Args)]
pub struct ConvertArgs {
    /// PDF path or URL
    #[arg(required = true)]
    locator: String,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "html")]
    format: OutputFormat,

    /// Document title (default: the file name)
    #[arg(long)]
    title: Option<String>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// Standalone HTML page
    Html,
    /// Plain text with page separators
    Text,
}

pub async fn run(args: ConvertArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let (pb, progress) = match fetch_spinner(&config)? {
        Some((pb, progress)) => (Some(pb), Some(progress)),
        None => (None, None),
    };

    let mut controller = build_controller(config, SnapshotDisplay::new(), progress)?;
    let loaded = controller.load_document(&args.locator).await;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    let loaded = loaded?;

    info!("Converting {} ({} pages)", args.locator, loaded.page_count);

    let title = args.title.clone().unwrap_or_else(|| title_from_locator(&args.locator));
    let view = CleanView::collect(&mut controller, title).await;
    controller.teardown().await;

    let output = match args.format {
        OutputFormat::Html => view.to_html(),
        OutputFormat::Text => view.to_text(),
    };

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        eprintln!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        print!("{}", output);
    }

    let raster_only = view
        .pages
        .iter()
        .filter(|p| p.body == PageBody::RasterOnly)
        .count();
    let failed = view
        .pages
        .iter()
        .filter(|p| matches!(p.body, PageBody::Error(_)))
        .count();

    eprintln!(
        "{} {} pages in {:.1}s ({} without text, {} unreadable)",
        style("ℹ").blue(),
        view.pages.len(),
        start.elapsed().as_secs_f64(),
        style(raster_only).yellow(),
        style(failed).red()
    );

    Ok(())
}

fn title_from_locator(locator: &str) -> String {
    locator
        .trim_end_matches('/')
        .rsplit(['/', '\\'])
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or("Document")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_from_locator() {
        assert_eq!(title_from_locator("/tmp/report.pdf"), "report.pdf");
        assert_eq!(
            title_from_locator("https://example.com/files/paper.pdf"),
            "paper.pdf"
        );
        assert_eq!(title_from_locator("scan.pdf"), "scan.pdf");
        assert_eq!(title_from_locator(""), "Document");
    }
}
