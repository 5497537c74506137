//! View command - read a document page by page in the terminal.

use clap::Args;
use console::{Term, style};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

use echoread_core::viewer::html_to_plain;
use echoread_core::{Command, Direction, DisplaySurface, DocumentLoadError, RasterSurface};

use super::{build_controller, fetch_spinner, load_config};

/// Arguments for the view command.
#[derive(Args)]
pub struct ViewArgs {
    /// PDF path or URL
    locator: Option<String>,

    /// Start OCR engine loading as soon as the document opens
    #[arg(long)]
    eager_ocr: bool,
}

/// Prints display updates to the terminal.
#[derive(Debug, Default)]
pub struct TerminalDisplay {
    nav: (bool, bool),
}

impl TerminalDisplay {
    fn prompt(&self) {
        let mut keys = Vec::new();
        if self.nav.0 {
            keys.push("p = previous");
        }
        if self.nav.1 {
            keys.push("n = next");
        }
        keys.push("g N = go to page");
        keys.push("q = quit");
        println!("{}", style(keys.join(", ")).dim());
    }
}

impl DisplaySurface for TerminalDisplay {
    fn show_text(&mut self, html: &str) {
        println!("{}", html_to_plain(html).trim_end());
    }

    fn show_raster(&mut self, surface: &RasterSurface) {
        println!(
            "{}",
            style(format!(
                "[scanned page image, {}x{} px]",
                surface.width(),
                surface.height()
            ))
            .cyan()
        );
    }

    fn set_status(&mut self, message: &str) {
        eprintln!("{} {}", style("ℹ").blue(), style(message).dim());
    }

    fn set_page_indicator(&mut self, current: u32, total: u32) {
        println!(
            "{}",
            style(echoread_core::viewer::page_indicator_label(current, total)).bold()
        );
    }

    fn set_nav_enabled(&mut self, previous: bool, next: bool) {
        let changed = self.nav != (previous, next);
        self.nav = (previous, next);
        if changed && (previous || next) {
            self.prompt();
        }
    }

    fn scroll_to_top(&mut self) {
        if Term::stdout().is_term() {
            let _ = Term::stdout().clear_screen();
        }
    }

    fn show_fatal(&mut self, message: &str) {
        eprintln!("{} {}", style("✗").red(), style(message).red().bold());
    }
}

pub async fn run(args: ViewArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if args.eager_ocr {
        config.viewer.acquisition = echoread_core::AcquisitionPolicy::EagerBackground;
    }

    let spinner = fetch_spinner(&config)?;
    let (pb, progress) = match spinner {
        Some((pb, progress)) => (Some(pb), Some(progress)),
        None => (None, None),
    };

    let mut controller = build_controller(config, TerminalDisplay::default(), progress)?;

    let started = controller.start(args.locator.as_deref()).await;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    match started {
        Ok(outcome) => debug!("Opened document with {} pages", outcome.page_count),
        Err(DocumentLoadError::MissingLocator) => {
            anyhow::bail!("No PDF path or URL given")
        }
        Err(err) => return Err(err.into()),
    }

    let (tx, rx) = mpsc::channel(8);
    tokio::join!(controller.run(rx), read_commands(tx));

    Ok(())
}

/// Forward stdin lines as controller commands until `q` or end of input.
async fn read_commands(tx: mpsc::Sender<Command>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                debug!("Stopped reading input: {}", e);
                break;
            }
        };

        let Some(command) = parse_command(&line) else {
            if !line.trim().is_empty() {
                eprintln!("{} Unknown command: {}", style("⚠").yellow(), line.trim());
            }
            continue;
        };

        let closing = command == Command::Close;
        if tx.send(command).await.is_err() || closing {
            break;
        }
    }
}

fn parse_command(line: &str) -> Option<Command> {
    let mut parts = line.split_whitespace();
    let command = match parts.next()? {
        "n" | "next" => Command::Navigate(Direction::Next),
        "p" | "prev" | "previous" => Command::Navigate(Direction::Previous),
        "g" | "go" => Command::GoTo(parts.next()?.parse().ok()?),
        "o" | "open" => Command::Open(parts.collect::<Vec<_>>().join(" ")),
        "q" | "quit" => Command::Close,
        other => Command::GoTo(other.parse().ok()?),
    };
    Some(command)
}
