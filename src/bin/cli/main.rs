#![cfg(feature = "cli")]

use std::time::Duration;

use clap::{Parser, Subcommand};
use zeromq::ReqSocket;
use zeromq::ZmqMessage;
use zeromq::prelude::*;

/// Default socket of monitoggled
const SOCKET_DEFAULT: &str = "/var/run/monitoggled.sock";

/// Global CLI arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Enable and disable monitors through monitoggled")]
struct Cli {
    /// Path of the daemon socket
    #[arg(short, long, default_value = SOCKET_DEFAULT)]
    socket: String,

    /// Seconds to wait for the daemon
    #[arg(short, long, default_value_t = 10)]
    timeout: u64,

    /// Print listOutputs as raw JSON
    #[arg(long)]
    json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

/// List of available subcommands
#[derive(Subcommand, Debug)]
#[command(rename_all = "camelCase")]
enum Commands {
    ListOutputs,
    EnableOutput { output: String },
    DisableOutput { output: String },
    ToggleOutput { output: String },
    RestoreOutputs,
    ResetLayout,
    CurrentBackend,
    ListCommands,
}

/// Daemon request for a subcommand
fn request(command: &Commands) -> String {
    match command {
        Commands::ListOutputs => "listOutputs".to_string(),
        Commands::EnableOutput { output } => format!("enableOutput {}", output),
        Commands::DisableOutput { output } => format!("disableOutput {}", output),
        Commands::ToggleOutput { output } => format!("toggleOutput {}", output),
        Commands::RestoreOutputs => "restoreOutputs".to_string(),
        Commands::ResetLayout => "resetLayout".to_string(),
        Commands::CurrentBackend => "currentBackend".to_string(),
        Commands::ListCommands => "listCommands".to_string(),
    }
}

/// One line per output from a `listOutputs` reply
fn format_outputs(reply: &str) -> Result<String, serde_json::Error> {
    let outputs: Vec<serde_json::Value> = serde_json::from_str(reply)?;
    Ok(outputs
        .iter()
        .map(|output| {
            let state = match (output["connected"].as_bool(), output["enabled"].as_bool()) {
                (Some(false), _) => "disconnected",
                (_, Some(true)) => "enabled",
                _ => "disabled",
            };
            format!(
                "{:<32} {:<12} priority {}",
                output["display"].as_str().unwrap_or_default(),
                state,
                output["priority"]
            )
        })
        .collect::<Vec<_>>()
        .join("\n"))
}

/// Entry point
#[async_std::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Connect to the daemon via ZeroMQ
    let mut socket = ReqSocket::new();
    socket.connect(&format!("ipc://{}", cli.socket)).await?;

    // Execute the command
    match handle_command(&cli, socket).await {
        Ok(reply) if reply.starts_with("Error:") => {
            eprintln!("{}", reply);
            std::process::exit(1);
        }
        Ok(reply) => println!("{}", reply),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }

    Ok(())
}

/// Execute the selected subcommand, returning the reply to print
async fn handle_command(cli: &Cli, mut socket: ReqSocket) -> Result<String, Box<dyn std::error::Error>> {
    let msg = request(&cli.command);
    let timeout = Duration::from_secs(cli.timeout);

    // Send command to the daemon
    async_std::future::timeout(timeout, socket.send(ZmqMessage::from(msg))).await??;

    // Receive the reply
    let reply = async_std::future::timeout(timeout, socket.recv()).await??;
    let reply_str = match reply.get(0) {
        Some(frame) => String::from_utf8(frame.to_vec())?,
        None => String::new(),
    };

    if matches!(cli.command, Commands::ListOutputs) && !cli.json && !reply_str.starts_with("Error:") {
        return Ok(format_outputs(&reply_str)?);
    }
    Ok(reply_str)
}
