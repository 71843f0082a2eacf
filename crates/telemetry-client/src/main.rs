//! Telemetry Console entry point.
//!
//! Usage: `telemetry-console [host] [port]`
//!
//! Loads the TOML config, connects to the PROTO 1.0 server, prints every
//! decoded event, and turns typed lines into commands.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()              -- TOML settings, CLI host/port override
//!  └─ TelemetryClient::new()     -- connection manager + event receiver
//!  └─ event task                 -- ClientEvent -> ConsoleView -> stdout
//!  └─ input loop                 -- stdin line -> parse_input -> send / connect / quit
//!       └─ Ctrl-C / quit         -- graceful_goodbye (BYE, grace, disconnect)
//! ```

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use telemetry_client::application::{
    console_input::{parse_input, ConsoleInput, HELP},
    console_view::ConsoleView,
    goodbye::graceful_goodbye,
};
use telemetry_client::infrastructure::storage::config::{
    config_file_path, load_config_from, ClientConfig,
};
use telemetry_client::{ClientEvent, TelemetryClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut config = load_config();
    apply_cli_overrides(&mut config, std::env::args().skip(1));

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.console.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!(
        "Telemetry Console - PROTO 1.0 (server {}:{})",
        config.server.host, config.server.port
    );

    let (client, mut events) = TelemetryClient::new(config.connection_config());
    let client = Arc::new(client);
    let view = Arc::new(Mutex::new(ConsoleView::new()));

    // ── Event printer ─────────────────────────────────────────────────────────
    let printer_view = Arc::clone(&view);
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let line = printer_view.lock().await.apply(&event);
            println!("{line}");
            if let ClientEvent::ConnectionClosed { .. } = event {
                println!("(type /connect to reconnect)");
            }
        }
    });

    connect_and_greet(&client, &config).await;
    println!("Type /help for shortcuts.");

    // ── Input loop ────────────────────────────────────────────────────────────
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            break;
        };

        match parse_input(&line) {
            ConsoleInput::Send(command) => {
                if let Err(e) = client.send_command(&command).await {
                    println!("Could not send: {e}");
                }
            }
            ConsoleInput::Connect => connect_and_greet(&client, &config).await,
            ConsoleInput::Disconnect => client.disconnect().await,
            ConsoleInput::Status => print!("{}", view.lock().await.render_panel()),
            ConsoleInput::Help => println!("{HELP}"),
            ConsoleInput::Quit => break,
            ConsoleInput::Nothing => {}
            ConsoleInput::Invalid(msg) => println!("{msg}"),
        }
    }

    let outcome = graceful_goodbye(client.as_ref(), config.goodbye_grace()).await;
    info!("telemetry console stopped ({outcome:?})");
    Ok(())
}

/// Loads the config file, falling back to defaults on any problem.
fn load_config() -> ClientConfig {
    let path = match config_file_path() {
        Ok(path) => path,
        Err(e) => {
            eprintln!("{e}; using default settings");
            return ClientConfig::default();
        }
    };
    load_config_from(&path).unwrap_or_else(|e| {
        eprintln!("{e}; using default settings");
        ClientConfig::default()
    })
}

/// Applies the optional positional `host` and `port` arguments.
fn apply_cli_overrides(config: &mut ClientConfig, mut args: impl Iterator<Item = String>) {
    if let Some(host) = args.next() {
        config.server.host = host;
    }
    if let Some(port) = args.next() {
        match port.parse() {
            Ok(port) => config.server.port = port,
            Err(_) => eprintln!(
                "invalid port {port:?}, using {}",
                config.server.port
            ),
        }
    }
}

async fn connect_and_greet(client: &TelemetryClient, config: &ClientConfig) {
    if let Err(e) = client.connect_with_config().await {
        warn!("connect failed: {e}");
        println!("Could not connect: {e}");
        return;
    }
    let name = config.console.operator_name.trim();
    if !name.is_empty() {
        if let Err(e) = client.hello(name).await {
            println!("Could not send HELLO: {e}");
        }
    }
}
