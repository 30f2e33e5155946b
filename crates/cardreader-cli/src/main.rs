mod console;
mod logging;
mod tags;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use cardreader_core::constants::{DEFAULT_BAUD_RATE, DEFAULT_SETTLE_DELAY_MS};
use cardreader_core::{ByteStream, TagRecord, TagRegistry};
use cardreader_hardware::{IoStream, SerialConfig, SerialStream, discovery};
use cardreader_listener::{ChannelSink, DispatchEngine, ListenerConfig, ListenerHandle};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::console::OutputFormat;
use crate::logging::{LogFormat, LogLevel, init_logging};

#[derive(Parser, Debug)]
#[command(
    name = "cardreader",
    version,
    about = "Listen to an RFID card reader and release its lock after each scan"
)]
struct Cli {
    /// Serial port the reader is attached to (discovered when omitted).
    #[arg(long, value_name = "PORT", env = "CARDREADER_PORT")]
    port: Option<String>,

    /// Connect to a serial-over-TCP bridge instead of a local port.
    #[arg(
        long,
        value_name = "HOST:PORT",
        env = "CARDREADER_CONNECT",
        conflicts_with = "port"
    )]
    connect: Option<String>,

    /// Serial line speed.
    #[arg(long, value_name = "BAUD", env = "CARDREADER_BAUD", default_value_t = DEFAULT_BAUD_RATE)]
    baud: u32,

    /// Require --port instead of picking a port automatically.
    #[arg(long)]
    no_auto_discover: bool,

    /// JSON file with registered tags (may be repeated).
    #[arg(long = "tags", value_name = "FILE")]
    tag_files: Vec<PathBuf>,

    /// Register a tag, e.g. --tag "Key Tag=A3 47 64 B7" (may be repeated).
    #[arg(long = "tag", value_name = "LABEL=UID", value_parser = tags::parse_tag_arg)]
    tags: Vec<TagRecord>,

    /// Delay between a scan and the unlock write, in milliseconds.
    #[arg(
        long,
        value_name = "MS",
        env = "CARDREADER_SETTLE_MS",
        default_value_t = DEFAULT_SETTLE_DELAY_MS
    )]
    settle_ms: u64,

    /// Report known and unknown tags as a single kind of notification.
    #[arg(long)]
    combined_events: bool,

    /// Notification output format (stdout).
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    output: OutputFormat,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    log_format: LogFormat,

    /// Minimum log level (stderr). RUST_LOG overrides it.
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: LogLevel,

    /// Print the available serial ports and exit.
    #[arg(long)]
    list_ports: bool,
}

impl Cli {
    fn listener_config(&self) -> ListenerConfig {
        ListenerConfig::default()
            .with_settle_delay(Duration::from_millis(self.settle_ms))
            .with_split_events(!self.combined_events)
            .with_auto_discover(!self.no_auto_discover)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    if cli.list_ports {
        return print_ports();
    }

    let config = cli.listener_config();
    config.validate()?;
    let registry = Arc::new(tags::build_registry(&cli.tag_files, &cli.tags)?);

    if let Some(addr) = &cli.connect {
        let tcp = tokio::net::TcpStream::connect(addr)
            .await
            .with_context(|| format!("failed to connect to {addr}"))?;
        println!("Connected to '{addr}'.");
        return listen(IoStream::new(tcp), registry, config, cli.output).await;
    }

    let port_name = resolve_port(cli.port.as_deref(), config.auto_discover)?;
    let serial = SerialConfig::new(&port_name).with_baud_rate(cli.baud);
    let stream = SerialStream::open(&serial)
        .with_context(|| format!("failed to open serial port {port_name}"))?;
    println!("Port opened on port '{port_name}'.");

    listen(stream, registry, config, cli.output).await
}

/// Pick the serial port to open.
fn resolve_port(port: Option<&str>, auto_discover: bool) -> Result<String> {
    match port {
        Some(name) => Ok(name.to_string()),
        None if auto_discover => {
            let candidate = discovery::discover_reader_port()
                .context("Could not find port for the card reader")?;
            Ok(candidate.name)
        }
        None => bail!("--port is required when auto discovery is disabled"),
    }
}

/// Run the listener until the link closes or Ctrl-C is pressed.
async fn listen<S: ByteStream>(
    stream: S,
    registry: Arc<TagRegistry>,
    config: ListenerConfig,
    output: OutputFormat,
) -> Result<()> {
    let (sink, notifications) = ChannelSink::new();
    let engine = DispatchEngine::new(stream, registry, Arc::new(sink), config)?;

    let shutdown = CancellationToken::new();
    let listener = ListenerHandle::spawn_with_token(engine, shutdown.clone());
    let printer = tokio::spawn(console::print_notifications(notifications, output));
    println!("Listening for NFC tag..");

    let interrupt = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, stopping listener");
            interrupt.cancel();
        }
    });

    let stats = listener.join().await?;
    printer.await.context("console task failed")?;

    info!(
        frames = stats.frames,
        scans = stats.scans,
        known = stats.known,
        unknown = stats.unknown,
        unlocks_sent = stats.unlocks_sent,
        unlocks_failed = stats.unlocks_failed,
        "Listener finished"
    );
    Ok(())
}

fn print_ports() -> Result<()> {
    let ports = discovery::list_ports().context("failed to enumerate serial ports")?;
    if ports.is_empty() {
        println!("No serial ports found.");
    }

    for port in &ports {
        let marker = if port.is_arduino() { " [arduino]" } else { "" };
        println!("{}{marker}", port.description());
    }
    Ok(())
}
