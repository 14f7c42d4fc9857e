//! `stomp-agent` – publish files to, or receive one message from, a STOMP
//! broker.
//!
//! # Usage
//!
//! ```text
//! stomp-agent [OPTIONS] send <t|q> <TARGET> [FILES]...
//! stomp-agent [OPTIONS] receive <t|q> <SOURCE>
//!
//! Options:
//!   --broker <URL>    Broker URL [env: AMQBROKER_URL] [default: tcp://localhost:61613]
//!   --config <PATH>   TOML file with a [broker] table
//! ```
//!
//! `send` publishes the contents of each file as one message.  With no FILES,
//! each line read from standard input names a file to publish.
//!
//! `receive` subscribes, prints the first message as
//! `[(Q)name]` or `[(T)name]` followed by the body, and exits.
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Mutex;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use stomp_client::domain::config::{AgentConfig, BrokerConfig, BROKER_URL_ENV};
use stomp_client::StompAgent;
use stomp_core::EndPoint;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Minimal STOMP publisher and receiver.
#[derive(Debug, Parser)]
#[command(
    name = "stomp-agent",
    about = "Publish files to, or receive a message from, a STOMP broker",
    version
)]
struct Cli {
    /// Broker URL, e.g. `tcp://localhost:61613`.
    ///
    /// Takes precedence over `--config`.
    #[arg(long, env = BROKER_URL_ENV)]
    broker: Option<String>,

    /// TOML configuration file with a `[broker]` table.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Publish each file as one message.
    Send {
        kind: Kind,
        target: String,
        /// Files to publish; read file names from stdin when empty.
        files: Vec<PathBuf>,
    },
    /// Print the first message that arrives, then exit.
    Receive { kind: Kind, source: String },
}

/// Destination kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Kind {
    #[value(alias = "t")]
    Topic,
    #[value(alias = "q")]
    Queue,
}

impl Kind {
    fn endpoint(self, name: &str) -> EndPoint {
        EndPoint::new(name, self == Kind::Queue)
    }
}

impl Cli {
    /// Resolves the broker configuration: `--broker` (or `AMQBROKER_URL`),
    /// then `--config`, then the defaults.
    fn broker_config(&self) -> anyhow::Result<BrokerConfig> {
        if let Some(url) = &self.broker {
            return BrokerConfig::from_url(url)
                .with_context(|| format!("invalid broker URL '{url}'"));
        }
        if let Some(path) = &self.config {
            let config = AgentConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?;
            return Ok(config.broker);
        }
        Ok(BrokerConfig::default())
    }
}

/// Renders a received message the way `receive` prints it.
fn format_message(body: &[u8], endpoint: &EndPoint) -> String {
    format!(
        "[({}){}]\n{}",
        if endpoint.is_queue { "Q" } else { "T" },
        endpoint.destination,
        String::from_utf8_lossy(body)
    )
}

// ── Commands ──────────────────────────────────────────────────────────────────

fn publish_file(agent: &StompAgent, target: &EndPoint, path: &Path) -> anyhow::Result<()> {
    let data = std::fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
    if !agent.publish(target, &data)? {
        anyhow::bail!("broker did not accept {}", path.display());
    }
    info!(file = %path.display(), bytes = data.len(), "published");
    Ok(())
}

fn send(agent: &StompAgent, target: &EndPoint, files: &[PathBuf]) -> anyhow::Result<()> {
    let publish = |path: &Path| {
        // A bad file is reported and skipped.
        if let Err(e) = publish_file(agent, target, path) {
            error!("{e:#}");
        }
    };

    if files.is_empty() {
        for line in io::stdin().lock().lines() {
            let line = line.context("failed to read file name from stdin")?;
            let name = line.trim();
            if !name.is_empty() {
                publish(Path::new(name));
            }
        }
    } else {
        for path in files {
            publish(path);
        }
    }
    Ok(())
}

fn receive(agent: &StompAgent, source: &EndPoint) -> anyhow::Result<()> {
    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    let subscribed = agent.subscribe(source.clone(), move |body, endpoint| {
        if let Ok(tx) = tx.lock() {
            let _ = tx.send(format_message(body, endpoint));
        }
    })?;
    if !subscribed {
        anyhow::bail!("failed to subscribe to {source}");
    }

    let text = rx
        .recv()
        .context("connection closed before a message arrived")?;
    let mut out = io::stdout().lock();
    writeln!(out, "{text}")?;
    out.flush()?;

    agent.unsubscribe(source)?;
    Ok(())
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.broker_config()?;
    info!("stomp-agent connecting to {}", config.address());

    let agent = StompAgent::connect(&config, true)
        .with_context(|| format!("cannot reach broker at {}", config.address()))?;
    if !agent.session().is_started() {
        anyhow::bail!("broker at {} refused the STOMP handshake", config.address());
    }

    match &cli.command {
        Command::Send {
            kind,
            target,
            files,
        } => send(&agent, &kind.endpoint(target), files),
        Command::Receive { kind, source } => receive(&agent, &kind.endpoint(source)),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
