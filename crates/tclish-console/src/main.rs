use anyhow::{bail, Context};
use clap::Parser;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use tclish_console::bootstrap::{self, BootPlan};
use tclish_console::config::CONFIG_FILE;
use tclish_console::repl::read_submission;
use tclish_console::{
    ConsoleConfig, ConsoleError, ConsoleOverrides, LogView, Palette, PaletteVariant, Session,
    TclishRuntime, TerminalView,
};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// tclish - a small Tcl-flavoured command language
#[derive(Parser, Debug)]
#[command(name = "tclish")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Script files, each run as one submission
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Code to run as one submission (repeatable)
    #[arg(short = 'e', long = "eval", value_name = "CODE")]
    eval: Vec<String>,

    /// Path to tclish.yaml configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Zip bundle to load at startup (URL or file path)
    #[arg(long, value_name = "LOCATION")]
    bundle: Option<String>,

    /// Module to import from the bundle
    #[arg(long, value_name = "NAME")]
    module: Option<String>,

    /// Journal the database next to this path
    #[arg(long, value_name = "FILE")]
    db: Option<PathBuf>,

    /// Maximum evaluation depth
    #[arg(long, value_name = "N")]
    stack_limit: Option<usize>,

    /// Restore interpreter state from this file and save it on exit
    #[arg(long, value_name = "FILE")]
    state: Option<PathBuf>,

    /// How colours are picked for each element
    #[arg(long, value_enum, value_name = "VARIANT")]
    color_variant: Option<PaletteVariant>,

    /// Disable colours
    #[arg(long)]
    no_color: bool,

    /// Write a default tclish.yaml in the current directory
    #[arg(long)]
    init: bool,
}

fn main() -> anyhow::Result<()> {
    // Set RUST_LOG=debug for detailed logs
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    if cli.init {
        return init_config();
    }

    let config = load_config(&cli)?;
    debug!(?config, "Configuration loaded");

    let mut view = TerminalView::new(io::stdout());
    if config.color.enabled && io::stdout().is_terminal() {
        let palette = Palette::from_hex(config.color.palette.as_slice())?;
        view = view.with_palette(palette, config.color.variant);
    }

    let plan = BootPlan {
        bundle: config.bundle.clone(),
        module: config.module.clone(),
    };
    let runtime_config = config.clone();
    let boot = bootstrap::spawn(move || create_runtime(&runtime_config), plan);

    let batch = !cli.files.is_empty() || !cli.eval.is_empty();
    if !batch {
        view.banner(&format!("tclish {}", env!("CARGO_PKG_VERSION")));
    }
    let mut session = Session::new(boot, view);

    let rejected = if batch {
        run_batch(&cli, &mut session)?
    } else {
        run_interactive(&mut session)?
    };

    if let Some(path) = &config.state_file {
        match session.ready() {
            Ok(runtime) => runtime
                .interpreter()
                .save_state(path)
                .with_context(|| format!("Failed to save state to {}", path.display()))?,
            Err(e) => warn!("State not saved: {}", e),
        }
    }

    if batch && (rejected > 0 || session.log().has_errors()) {
        std::process::exit(1);
    }
    Ok(())
}

fn init_config() -> anyhow::Result<()> {
    let path = PathBuf::from(CONFIG_FILE);
    if path.exists() {
        bail!("{} already exists", CONFIG_FILE);
    }
    ConsoleConfig::init_file(&path)?;
    println!("Created {}", CONFIG_FILE);
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<ConsoleConfig> {
    let cwd = std::env::current_dir()?;
    let mut config = ConsoleConfig::discover(cli.config.as_deref(), &cwd)
        .context("Failed to load configuration")?;
    config.merge(ConsoleOverrides {
        bundle: cli.bundle.clone(),
        module: cli.module.clone(),
        db_file: cli.db.clone(),
        stack_limit: cli.stack_limit,
        state_file: cli.state.clone(),
        variant: cli.color_variant,
        no_color: cli.no_color,
    });
    Ok(config)
}

fn create_runtime(config: &ConsoleConfig) -> tclish_console::Result<TclishRuntime> {
    let mut runtime = TclishRuntime::new(config.interpreter_config())?;
    if let Some(path) = &config.state_file {
        if path.exists() {
            runtime.interpreter_mut().load_state(path)?;
        }
    }
    Ok(runtime)
}

/// Submit one piece of code and run the events it made due. Returns false
/// when the runtime never became ready.
fn submit<V: LogView>(session: &mut Session<TclishRuntime, V>, code: &str) -> anyhow::Result<bool> {
    match session.submit(code) {
        Ok(_) => {}
        Err(ConsoleError::NotReady(reason)) => {
            warn!("Console is not ready: {}", reason);
            return Ok(false);
        }
        Err(e) => return Err(e.into()),
    }
    let ran = session.drain_events()?;
    if ran > 0 {
        debug!("Processed {} events", ran);
    }
    Ok(true)
}

/// Files first, then `-e` snippets; due events are drained after each.
/// Returns the number of submissions the console could not accept.
fn run_batch<V: LogView>(cli: &Cli, session: &mut Session<TclishRuntime, V>) -> anyhow::Result<usize> {
    let mut sources = Vec::new();
    for file in &cli.files {
        let code = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        sources.push(code);
    }
    sources.extend(cli.eval.iter().cloned());

    let mut rejected = 0;
    for code in &sources {
        if !submit(session, code)? {
            rejected += 1;
        }
    }
    info!("Ran {} submissions", sources.len() - rejected);
    Ok(rejected)
}

fn run_interactive<V: LogView>(session: &mut Session<TclishRuntime, V>) -> anyhow::Result<usize> {
    if let Err(e) = session.ready() {
        error!("Console failed to start: {}", e);
    }
    let mut rejected = 0;
    let stdin = io::stdin();
    let mut input = stdin.lock();
    loop {
        let submission = {
            let mut out = io::stdout().lock();
            read_submission(&mut input, &mut out)?
        };
        let Some(code) = submission else {
            break;
        };
        if !submit(session, &code)? {
            rejected += 1;
        }
    }
    io::stdout().flush()?;
    Ok(rejected)
}
