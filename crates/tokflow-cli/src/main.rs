//! Interactive terminal front end: the presentation collaborator for a
//! tokflow relay.

use std::io::Write as _;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use tokflow_client::{ChatSession, RelayClient, SendOutcome, SessionObserver};
use tokflow_models::Turn;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "tokflow", about = "Chat with an LLM through a tokflow relay")]
struct Cli {
    /// Base URL of the relay service
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    relay: String,

    /// API key forwarded to the upstream provider
    #[arg(long, env = "TOKFLOW_API_KEY")]
    api_key: Option<String>,
}

/// Prints streamed tokens as they arrive.
#[derive(Default)]
struct StdoutObserver {
    printed: usize,
}

impl SessionObserver for StdoutObserver {
    fn loading_changed(&mut self, loading: bool) {
        if loading {
            self.printed = 0;
        } else {
            println!();
        }
    }

    fn turn_updated(&mut self, turn: &Turn) {
        let delta = &turn.content[self.printed..];
        self.printed = turn.content.len();
        print!("{delta}");
        let _ = std::io::stdout().flush();
    }
}

fn print_greeting(session: &ChatSession) {
    if let Some(greeting) = session.turns().first() {
        println!("{} {}", "assistant >".cyan().bold(), greeting.content);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let mut session =
        ChatSession::new(RelayClient::new(cli.relay)).with_observer(StdoutObserver::default());
    if let Some(api_key) = cli.api_key {
        session.set_credential(api_key);
    }

    print_greeting(&session);
    println!(
        "{}",
        "Type a message, /new to start over, /quit to exit.".dimmed()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", "you >".green().bold());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match line.trim() {
            "" => {}
            "/quit" => break,
            "/new" => {
                if session.clear_messages() {
                    print_greeting(&session);
                } else {
                    eprintln!("{} a reply is still streaming", "Error:".red().bold());
                }
            }
            text => {
                print!("{} ", "assistant >".cyan().bold());
                std::io::stdout().flush()?;

                match session.send_turn(text).await {
                    Ok(SendOutcome::Completed) => {}
                    Ok(SendOutcome::Skipped) => {
                        println!();
                        if !session.has_credential() {
                            eprintln!(
                                "{} no API key configured. Pass --api-key or set TOKFLOW_API_KEY.",
                                "Error:".red().bold()
                            );
                        }
                    }
                    Err(err) => {
                        println!();
                        eprintln!("{} {}", "Error:".red().bold(), err);
                    }
                }
            }
        }
    }

    Ok(())
}
