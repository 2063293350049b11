//! CLI for citeview - Replay panel event streams and inspect panel templates.

use std::fmt;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use citeview::{
    builtin_template, load_template, template::hook_descriptions, template::hooks, Panel,
    PanelConfig, PanelEvent, TracingHost,
};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// Replay panel event streams and inspect panel templates
#[derive(Parser)]
#[command(name = "citeview")]
#[command(version)]
#[command(after_help = "\
Examples:
  citeview render events.jsonl
  citeview render events.jsonl --template panel.html -o panel.html
  echo '{\"event\":\"clear\"}' | citeview render -
  citeview hooks")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a panel event stream and print the resulting markup
    #[command(after_help = "\
Examples:
  citeview render events.jsonl
  citeview render events.jsonl --icon-base https://icons.example.org
  citeview render - --template custom.html -o out.html

Event stream: JSONL, one event object per line:
  {\"event\":\"result-added\",\"id\":\"r1\",\"title\":\"...\",\"weight\":10}
  {\"event\":\"content-added\",\"result\":\"r1\",\"html\":\"<p>...</p>\"}
  {\"event\":\"content-finished\",\"result\":\"r1\"}
  {\"event\":\"clear\"}")]
    Render {
        /// Input events file (use '-' for stdin)
        events: PathBuf,

        /// Panel template file (default: builtin template)
        #[arg(short, long)]
        template: Option<PathBuf>,

        /// Base URL for source icons looked up by database name
        #[arg(long)]
        icon_base: Option<String>,

        /// Image URL for generated caption arrows
        #[arg(long)]
        arrow_icon: Option<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the template hooks the panel relies on
    Hooks,
}

// ---------------------------------------------------------------------------
// AppError — semantic exit codes
// ---------------------------------------------------------------------------

enum AppError {
    /// Exit 10 — events file not found / unreadable
    InputFile(String),
    /// Exit 11 — template not found / invalid
    Template(String),
    /// Exit 12 — malformed event stream
    Events(String),
    /// Exit 13 — cannot write output file
    OutputFile(String),
}

impl AppError {
    fn exit_code(&self) -> i32 {
        match self {
            AppError::InputFile(_) => 10,
            AppError::Template(_) => 11,
            AppError::Events(_) => 12,
            AppError::OutputFile(_) => 13,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InputFile(msg) => {
                write!(f, "{}\n  hint: verify the file path is correct", msg)
            }
            AppError::Template(msg) => {
                write!(
                    f,
                    "{}\n  hint: the template must contain elements with ids '{}' and '{}'",
                    msg,
                    hooks::CONTAINER_ID,
                    hooks::TEMPLATE_ID
                )
            }
            AppError::Events(msg) => {
                write!(
                    f,
                    "{}\n  hint: each line must be one JSON event object (see 'citeview render --help')",
                    msg
                )
            }
            AppError::OutputFile(msg) => {
                write!(
                    f,
                    "{}\n  hint: check that the output directory exists and is writable",
                    msg
                )
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "citeview=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(e.exit_code());
    }
}

fn run() -> Result<(), AppError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            events,
            template,
            icon_base,
            arrow_icon,
            output,
        } => {
            render_command(
                &events,
                template.as_deref(),
                icon_base,
                arrow_icon,
                output.as_deref(),
            )?;
        }
        Commands::Hooks => {
            hooks_command();
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Replay a panel event stream and emit the resulting markup.
fn render_command(
    events: &Path,
    template: Option<&Path>,
    icon_base: Option<String>,
    arrow_icon: Option<String>,
    output: Option<&Path>,
) -> Result<(), AppError> {
    // 1. Read the event stream (support '-' for stdin)
    let stream = if events == Path::new("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| AppError::InputFile(format!("failed to read from stdin: {}", e)))?;
        buf
    } else {
        fs::read_to_string(events)
            .map_err(|e| AppError::InputFile(format!("'{}': {}", events.display(), e)))?
    };

    // 2. Load the template (file or builtin)
    let markup = match template {
        Some(path) => load_template(path)
            .map_err(|e| AppError::Template(format!("'{}': {}", path.display(), e)))?,
        None => builtin_template().to_string(),
    };

    // 3. Build the panel
    let config = PanelConfig {
        icon_base_url: icon_base,
        arrow_icon_url: arrow_icon,
    };
    let mut panel = Panel::new(&markup, TracingHost::new(), config)
        .map_err(|e| AppError::Template(e.to_string()))?;

    // 4. Parse and apply the events, one JSON object per line
    let mut applied = 0;
    for (line_num, line) in stream.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let event: PanelEvent = serde_json::from_str(line).map_err(|e| {
            AppError::Events(format!("invalid event at line {}: {}", line_num + 1, e))
        })?;
        panel.apply(event);
        applied += 1;
    }

    // Effects describe animations; a static rendering has no use for them.
    let effects = panel.take_effects();
    tracing::debug!(effects = effects.len(), "discarded animation effects");

    // 5. Write the markup to a file or stdout
    let result = panel.render();
    if let Some(output_path) = output {
        fs::write(output_path, &result)
            .map_err(|e| AppError::OutputFile(format!("'{}': {}", output_path.display(), e)))?;
        eprintln!(
            "applied {} event(s), wrote {}",
            applied,
            output_path.display()
        );
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "{}", result)
            .map_err(|e| AppError::OutputFile(format!("stdout: {}", e)))?;
    }

    Ok(())
}

/// List the template hooks the panel relies on.
fn hooks_command() {
    for (name, description) in hook_descriptions() {
        println!("{:<26} {}", name, description);
    }
}
