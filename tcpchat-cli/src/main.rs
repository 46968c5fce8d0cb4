//! tcpchat: terminal client for line-based TCP chat servers.
//!
//! Lines typed at the prompt are sent as public messages. Commands:
//!
//!   /login <username>        Log in
//!   /msg <user> <text>       Private message
//!   /users                   Ask for the user list
//!   /help                    Ask which commands the server supports
//!   /quit                    Disconnect and exit

mod config;
mod input;
mod output;

use std::sync::Arc;

use anyhow::{Result, bail};
use clap::Parser;
use tcpchat_sdk::{ChatClient, ChatListener, DispatchExit};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::{Config, Resolved};
use crate::input::{Input, parse_input};

#[derive(Parser, Debug)]
#[command(name = "tcpchat", about = "Terminal client for line-based TCP chat servers")]
pub struct Cli {
    /// Chat server host name or IP address
    #[arg(long, env = "TCPCHAT_HOST")]
    host: Option<String>,

    /// Chat server TCP port
    #[arg(long, env = "TCPCHAT_PORT")]
    port: Option<u16>,

    /// Log in with this username after connecting
    #[arg(long = "user", env = "TCPCHAT_USER")]
    username: Option<String>,

    /// Print events as JSON lines
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tcpchat=info,tcpchat_sdk=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let settings = Resolved::merge(&cli, &Config::load());

    let client = ChatClient::new();
    let printer: Arc<dyn ChatListener> = if settings.json {
        Arc::new(output::JsonPrinter)
    } else {
        Arc::new(output::TextPrinter)
    };
    client.add_listener(printer);

    if !client.connect(&settings.host, settings.port).await {
        bail!(
            "can't connect to {}:{}: {}",
            settings.host,
            settings.port,
            client.last_error()
        );
    }
    tracing::info!("Connected to {}:{}", settings.host, settings.port);

    if let Some(ref username) = settings.username {
        client.try_login(username).await;
    }

    let exit = run_prompt(&client).await;
    client.disconnect().await;

    match exit {
        Some(DispatchExit::Failed) => bail!("connection lost: {}", client.last_error()),
        Some(DispatchExit::PeerClosed) => {
            tracing::info!("Server closed the connection");
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Read prompt lines until the user quits, stdin ends, or the connection
/// goes away. Returns how the dispatch task ended, if it ended first.
async fn run_prompt(client: &ChatClient) -> Option<DispatchExit> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let dispatch_exit = client.wait_dispatch_exit();
    tokio::pin!(dispatch_exit);

    loop {
        tokio::select! {
            exit = &mut dispatch_exit => return exit,
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => return None,
                    Err(e) => {
                        tracing::warn!("Can't read stdin: {e}");
                        return None;
                    }
                };
                let sent = match parse_input(&line) {
                    Input::Empty => continue,
                    Input::Quit => return None,
                    Input::Invalid(msg) => {
                        eprintln!("{msg}");
                        continue;
                    }
                    Input::Login(username) => client.try_login(username).await,
                    Input::Private { recipient, text } => {
                        client.send_private_message(recipient, text).await
                    }
                    Input::Users => client.refresh_user_list().await,
                    Input::Help => client.ask_supported_commands().await,
                    Input::Public(text) => client.send_public_message(text).await,
                };
                if !sent && client.is_connection_active() {
                    eprintln!("not sent: {}", client.last_error());
                } else if !sent {
                    eprintln!("not sent: not connected");
                }
            }
        }
    }
}
