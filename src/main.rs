use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod columns;
mod controller;
mod dataset;
mod debounce;
mod domain;
mod filter;
mod inputter;
mod model;
mod ui;

use columns::TableSpec;
use controller::Controller;
use dataset::Dataset;
use domain::{Message, RosterConfig, RosterError};
use model::{Model, Status};
use ui::TableUI;

#[derive(Parser, Debug)]
#[command(version, about = "A tui based filterable viewer for user roster data.")]
struct Cli {
    /// Path to the roster JSON document ({"users": [...]}).
    #[arg(default_value = "tests/fixtures/users.json")]
    data: String,

    /// Path to a column configuration JSON document. Uses the built-in
    /// layout when omitted.
    #[arg(short, long)]
    config: Option<String>,

    /// Quiet period before a typed filter takes effect.
    #[arg(long, default_value_t = 500)]
    debounce_ms: u64,

    /// Append tracing output to this file. The terminal itself belongs to
    /// the UI, so there is no logging without it.
    #[arg(long)]
    log_file: Option<String>,
}

fn main() -> ExitCode {
    match run() {
        Err(e) => {
            ratatui::restore();
            eprintln!("Error: {:?}", e);
            ExitCode::FAILURE
        }
        Ok(_) => {
            ratatui::restore();
            ExitCode::SUCCESS
        }
    }
}

fn init_logging(log_file: &str) -> Result<(), RosterError> {
    let file = File::options().append(true).create(true).open(log_file)?;
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file)
                .with_ansi(false),
        )
        .with(ErrorLayer::default())
        .init();
    Ok(())
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::full(path).map_or_else(|_| path.to_string(), |p| p.into_owned()))
}

fn run() -> Result<(), RosterError> {
    let cli = Cli::parse();
    if let Some(log_file) = &cli.log_file {
        init_logging(log_file)?;
    }
    info!("Starting roster!");

    let spec = match &cli.config {
        Some(path) => TableSpec::load(&expand(path))?,
        None => TableSpec::default_spec(),
    };
    let dataset = Dataset::load(&expand(&cli.data));

    let cfg = RosterConfig {
        debounce_ms: cli.debounce_ms,
        ..RosterConfig::default()
    };

    let mut model = Model::init(&cfg, dataset, spec);
    let ui = TableUI::new(&cfg);
    let controller = Controller::new(&cfg);

    let mut terminal = ratatui::init();
    let size = terminal.size()?;
    model.update(Some(Message::Resize(size.width as usize, size.height as usize)))?;

    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui.draw(&model, f))?;

        // Handle events and map to a Message. A poll timeout still drives
        // an update so pending debounce commits get applied while idle.
        let message = controller.handle_event(&model)?;
        model.update(message)?;
    }

    Ok(())
}
