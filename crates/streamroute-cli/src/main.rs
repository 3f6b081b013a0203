//! streamroute - listen to an event stream and route its component updates

mod encode;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use streamroute_core::transport::HttpTransport;
use streamroute_core::{
    ComponentId, PropsPatch, SessionController, SessionPhase, StreamConfig, UserNotifier,
};

#[derive(Parser)]
#[command(name = "streamroute", version, about)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Open a stream and print routed updates as JSON lines
    Listen(ListenArgs),
    /// Print a server-sent event carrying an update envelope
    #[command(subcommand)]
    Encode(encode::EncodeCommand),
}

#[derive(Args)]
struct ListenArgs {
    /// Stream URL; relative URLs need `http.base_url` in the config
    url: String,

    /// Config file (default: <config dir>/streamroute/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Keep only the latest frame instead of concatenating
    #[arg(long)]
    no_concat: bool,

    /// Decode envelopes and route them
    #[arg(long)]
    route: bool,

    /// Start with done=true until the stream resets it
    #[arg(long)]
    initial_done: bool,

    /// HTTP method
    #[arg(short = 'X', long)]
    method: Option<String>,

    /// Extra header, `Name: value`
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Request body
    #[arg(short, long)]
    data: Option<String>,
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("STREAMROUTE_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Listen(args) => listen(args).await,
        Command::Encode(command) => {
            print!("{}", encode::run(command)?);
            Ok(())
        }
    }
}

/// Prints alerts on stderr so stdout stays machine-readable
struct StderrNotifier;

impl UserNotifier for StderrNotifier {
    fn alert(&self, message: &str) {
        eprintln!("{}", message);
    }
}

fn print_update(id: &ComponentId, patch: &PropsPatch) -> Result<()> {
    let line = json!({ "id": id.to_value(), "props": Value::Object(patch.clone()) });
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", line).context("failed to write update")?;
    stdout.flush()?;
    Ok(())
}

fn parse_header(raw: &str) -> Result<(String, String)> {
    match raw.split_once(':') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => bail!("invalid header '{}', expected 'Name: value'", raw),
    }
}

async fn listen(args: ListenArgs) -> Result<()> {
    let mut config = StreamConfig::load_or_default(args.config.as_deref())?;
    if args.no_concat {
        config.concat = false;
    }
    if args.route {
        config.routing_enabled = true;
    }
    if args.initial_done {
        config.initial_done = true;
    }
    if let Some(method) = args.method {
        config.method = method;
    }
    for raw in &args.headers {
        let (name, value) = parse_header(raw)?;
        config.headers.insert(name, value);
    }

    let transport = HttpTransport::new(&config.http)?;
    let mut controller = SessionController::new(
        Arc::new(transport),
        Arc::new(print_update),
        Arc::new(StderrNotifier),
    );
    controller.update_props(config.session_props(args.url.as_str(), args.data));
    if controller.phase() != SessionPhase::Open {
        bail!("could not open stream {}", args.url);
    }

    loop {
        let event = tokio::select! {
            event = controller.next_event() => event,
            _ = tokio::signal::ctrl_c() => None,
        };
        match event {
            Some(event) => controller.dispatch(event),
            None if controller.phase() == SessionPhase::Open => {
                info!("interrupted");
                controller.shutdown();
                break;
            }
            None => break,
        }
        if controller.phase() != SessionPhase::Open {
            break;
        }
    }

    let state = controller.state();
    println!("{}", json!({ "value": state.value, "done": state.done }));
    Ok(())
}
