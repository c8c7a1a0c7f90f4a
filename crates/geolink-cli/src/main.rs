//! geolink CLI: share your location with one peer through a relay.

use anyhow::Context;
use clap::{Parser, Subcommand};
use geolink_client::config::Config;
use geolink_client::{setup, ClientCommand, ClientStatus, Intent};
use geolink_types::SessionId;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "geolink",
    about = "Share your live location with a peer",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to the relay and start an interactive session.
    Run {
        /// Path to configuration file.
        #[arg(short, long)]
        config: Option<String>,

        /// Relay WebSocket URL, overriding the config file.
        #[arg(short, long)]
        relay: Option<String>,
    },

    /// Print the default configuration.
    Config,
}

/// A parsed line of interactive input.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Intent(Intent),
    Status,
    Help,
    Quit,
}

const HELP: &str = "\
commands:
  share <id>   ask <id> to receive your location
  accept       accept the incoming request
  reject       reject the incoming request
  cancel       withdraw your request or end the session
  status       show the current session
  clear        dismiss the last error
  quit         end the session and exit";

fn parse_input(line: &str) -> Result<Input, String> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Err("empty command".to_string());
    };
    let arg = words.next();
    if words.next().is_some() {
        return Err(format!("too many arguments to '{command}'"));
    }

    let input = match (command, arg) {
        ("share", Some(id)) => Input::Intent(Intent::StartSharing(SessionId::new(id))),
        ("share", None) => return Err("usage: share <id>".to_string()),
        ("accept", None) => Input::Intent(Intent::Accept),
        ("reject", None) => Input::Intent(Intent::Reject),
        ("cancel", None) => Input::Intent(Intent::Cancel),
        ("clear", None) => Input::Intent(Intent::ClearError),
        ("status", None) => Input::Status,
        ("help" | "?", None) => Input::Help,
        ("quit" | "exit", None) => Input::Quit,
        (_, Some(_)) => return Err(format!("'{command}' takes no arguments")),
        _ => return Err(format!("unknown command '{command}', try 'help'")),
    };
    Ok(input)
}

fn describe(status: &ClientStatus) -> String {
    let mut line = format!("[{}] {}", status.session_id, status.state);
    if status.permission_pending {
        line.push_str(" (waiting for location permission)");
    }
    if status.publishing {
        line.push_str(&format!(", sent {}", status.locations_sent));
    }
    if let Some(location) = &status.remote_location {
        line.push_str(&format!(
            ", peer at {:.5},{:.5}",
            location.coords.latitude, location.coords.longitude
        ));
    }
    if let Some(error) = &status.error {
        line.push_str(&format!(", error: {error}"));
    }
    line
}

fn init_tracing(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Forward stdin lines to the client until EOF or `quit`.
async fn read_commands(
    commands: mpsc::Sender<ClientCommand>,
    status: watch::Receiver<ClientStatus>,
) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{HELP}");

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read stdin");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match parse_input(&line) {
            Ok(Input::Intent(intent)) => ClientCommand::Intent(intent),
            Ok(Input::Status) => {
                println!("{}", describe(&status.borrow()));
                continue;
            }
            Ok(Input::Help) => {
                println!("{HELP}");
                continue;
            }
            Ok(Input::Quit) => break,
            Err(message) => {
                eprintln!("{message}");
                continue;
            }
        };
        if commands.send(command).await.is_err() {
            return;
        }
    }

    let _ = commands.send(ClientCommand::Shutdown).await;
}

/// Print each status change on its own line.
async fn print_status(mut status: watch::Receiver<ClientStatus>) {
    let mut last = String::new();
    while status.changed().await.is_ok() {
        let line = describe(&status.borrow_and_update());
        if line != last {
            println!("{line}");
            last = line;
        }
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    tracing::info!(relay = %config.client.relay_url, "connecting to relay");
    let mut client = setup::connect_client(&config)
        .await
        .with_context(|| format!("failed to join relay at {}", config.client.relay_url))?;

    let status = client.status_receiver();
    println!("your session id: {}", status.borrow().session_id);

    tokio::spawn(read_commands(client.command_sender(), status.clone()));
    let printer = tokio::spawn(print_status(status));

    let result = client.run().await;
    drop(client);
    let _ = printer.await;
    result.map_err(Into::into)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, relay } => {
            let mut config = setup::load_config(config.as_deref())?;
            if let Some(relay) = relay {
                config.client.relay_url = relay;
            }
            init_tracing(&config.client.log_level);
            run(config).await?;
        }
        Commands::Config => {
            print!("{}", toml::to_string_pretty(&Config::default())?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geolink_client::ConnectionState;

    #[test]
    fn parses_share() {
        assert_eq!(
            parse_input("share  B7x "),
            Ok(Input::Intent(Intent::StartSharing(SessionId::new("B7x"))))
        );
        assert!(parse_input("share").is_err());
        assert!(parse_input("share a b").is_err());
    }

    #[test]
    fn parses_bare_commands() {
        assert_eq!(parse_input("accept"), Ok(Input::Intent(Intent::Accept)));
        assert_eq!(parse_input("reject"), Ok(Input::Intent(Intent::Reject)));
        assert_eq!(parse_input("cancel"), Ok(Input::Intent(Intent::Cancel)));
        assert_eq!(parse_input("clear"), Ok(Input::Intent(Intent::ClearError)));
        assert_eq!(parse_input("status"), Ok(Input::Status));
        assert_eq!(parse_input("quit"), Ok(Input::Quit));
        assert!(parse_input("accept now").is_err());
        assert!(parse_input("teleport").is_err());
    }

    #[test]
    fn describes_status() {
        let status = ClientStatus {
            session_id: SessionId::new("A"),
            state: ConnectionState::Connected {
                peer: SessionId::new("B"),
            },
            error: None,
            remote_location: None,
            permission_pending: false,
            publishing: true,
            locations_sent: 3,
        };
        assert_eq!(describe(&status), "[A] connected(B), sent 3");
    }

    #[test]
    fn cli_parses_run_flags() {
        let cli = Cli::try_parse_from(["geolink", "run", "--relay", "ws://relay:3000"]).unwrap();
        match cli.command {
            Commands::Run { config, relay } => {
                assert_eq!(config, None);
                assert_eq!(relay.as_deref(), Some("ws://relay:3000"));
            }
            Commands::Config => panic!("expected run"),
        }
    }
}
