//! telebridged - telematics gateway daemon
//!
//! Usage:
//!   telebridged telebridge.toml
//!   telebridged --port 8090 --log-json /etc/telebridge/telebridge.toml

use std::net::SocketAddr;
use std::sync::Arc;

use telebridge_exchange::create_transport;
use telebridged::{build_sessions, create_router, watch, with_auth, AppState, GatewayConfig, RetainedBus};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_CONFIG_PATH: &str = "telebridge.toml";

/// Parsed command-line arguments
struct Args {
    /// Gateway config file (TOML)
    config_path: String,
    /// Overrides `bus.listen_port`
    port: Option<u16>,
    log_json: bool,
}

fn parse_args() -> anyhow::Result<Args> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut result = Args {
        config_path: DEFAULT_CONFIG_PATH.to_string(),
        port: None,
        log_json: false,
    };

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--port" | "-p" => {
                if i + 1 < args.len() {
                    result.port = Some(args[i + 1].parse()?);
                    i += 2;
                } else {
                    anyhow::bail!("Missing argument for --port");
                }
            }
            "--log-json" => {
                result.log_json = true;
                i += 1;
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            arg if !arg.starts_with('-') => {
                result.config_path = arg.to_string();
                i += 1;
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                i += 1;
            }
        }
    }

    Ok(result)
}

fn print_help() {
    eprintln!(
        r#"telebridged - Telematics gateway daemon

Usage: telebridged [OPTIONS] [config.toml]

Options:
  -p, --port <PORT>   Listen port for the bus API (overrides bus.listen_port)
      --log-json      Emit logs as JSON lines
  -h, --help          Print this help message

The config file defaults to ./telebridge.toml. Log filtering follows RUST_LOG.
"#
    );
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "telebridged=info,telebridge_vehicle=info,telebridge_exchange=info".into()
    });

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = parse_args()?;
    init_tracing(args.log_json);

    tracing::info!(config = %args.config_path, "Starting telebridged");
    let config = GatewayConfig::load(&args.config_path)?;

    let bus = Arc::new(RetainedBus::new());
    let transport = create_transport(&config.backend.transport_config())?;
    let sessions = build_sessions(&config, transport, bus.clone())?;

    let mut handles = Vec::with_capacity(sessions.len());
    let mut tasks = Vec::with_capacity(sessions.len());
    for session in sessions {
        let vin = session.vin().to_string();
        let (handle, task) = session.spawn();
        tracing::info!(vin = %vin, "Vehicle session started");
        handles.push(handle);
        tasks.push((vin, task));
    }
    let mut exits = watch(tasks);

    let state = AppState::new(bus.clone(), config.account_prefix())
        .with_vehicles(handles)
        .with_command_timeout(config.bus.command_timeout());
    if config.bus.auth_token.is_some() {
        tracing::info!("Bearer token authentication enabled");
    }
    let app = with_auth(create_router(state), config.bus.auth_token.clone());

    let port = args.port.unwrap_or(config.bus.listen_port);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let server = tokio::spawn(async move { axum::serve(listener, app).await });

    tokio::select! {
        exit = exits.recv() => {
            bus.close();
            match exit {
                Some(exit) if exit.requires_authentication() => {
                    tracing::error!(vin = %exit.vin, "Backend session expired, re-authentication required");
                    anyhow::bail!("vehicle {} requires re-authentication", exit.vin);
                }
                Some(exit) => {
                    tracing::error!(vin = %exit.vin, result = ?exit.result, "Vehicle session stopped");
                    anyhow::bail!("vehicle session {} stopped: {:?}", exit.vin, exit.result);
                }
                None => anyhow::bail!("no vehicle sessions running"),
            }
        }
        served = server => {
            served??;
            tracing::info!("Server stopped");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
            bus.close();
        }
    }

    Ok(())
}
