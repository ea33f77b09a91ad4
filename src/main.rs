//! Dust Sweeper CLI - one-shot price and dust lookups
//!
//! Usage:
//!   dust_sweeper prices [--chain <id>] <token> [<token> ...]
//!   dust_sweeper dust <owner> [--threshold <usd>]
//!
//! Reads the same environment as the API server and prints the JSON the
//! corresponding endpoint would return in `data`.

use dust_sweeper::api::AppState;
use dust_sweeper::models::SweeperConfig;
use eyre::{eyre, Result};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const USAGE: &str = "usage:
  dust_sweeper prices [--chain <id>] <token> [<token> ...]
  dust_sweeper dust <owner> [--threshold <usd>]";

/// Parsed command line
#[derive(Debug, PartialEq)]
enum Command {
    Prices { chain_id: Option<u64>, tokens: Vec<String> },
    Dust { owner: String, threshold_usd: Option<f64> },
}

fn parse_args(args: &[String]) -> Result<Command> {
    let (command, rest) = args.split_first().ok_or_else(|| eyre!(USAGE))?;

    match command.as_str() {
        "prices" => {
            let mut chain_id = None;
            let mut tokens = Vec::new();
            let mut iter = rest.iter();
            while let Some(arg) = iter.next() {
                if arg == "--chain" {
                    let raw = iter.next().ok_or_else(|| eyre!("--chain needs a value"))?;
                    chain_id = Some(raw.parse().map_err(|_| eyre!("invalid chain id: {}", raw))?);
                } else {
                    tokens.push(arg.clone());
                }
            }
            Ok(Command::Prices { chain_id, tokens })
        }
        "dust" => {
            let mut owner = None;
            let mut threshold_usd = None;
            let mut iter = rest.iter();
            while let Some(arg) = iter.next() {
                if arg == "--threshold" {
                    let raw = iter.next().ok_or_else(|| eyre!("--threshold needs a value"))?;
                    threshold_usd = Some(raw.parse().map_err(|_| eyre!("invalid threshold: {}", raw))?);
                } else {
                    owner = Some(arg.clone());
                }
            }
            let owner = owner.ok_or_else(|| eyre!(USAGE))?;
            Ok(Command::Dust { owner, threshold_usd })
        }
        _ => Err(eyre!(USAGE)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = parse_args(&args)?;

    let config = SweeperConfig::from_env()?;
    let state = AppState::from_config(&config)?;

    let output = match command {
        Command::Prices { chain_id, tokens } => {
            serde_json::to_string_pretty(&state.prices.get_prices(&tokens, chain_id).await?)?
        }
        Command::Dust { owner, threshold_usd } => {
            let owner = owner.parse().map_err(|_| eyre!("invalid owner address: {}", owner))?;
            serde_json::to_string_pretty(&state.dust.scan(owner, threshold_usd).await?)?
        }
    };

    println!("{}", output);
    Ok(())
}
