#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod cli;

use std::path::{Path, PathBuf};

use clap::Parser;
use cli::{Cli, Command, ScanStrategy};
use eyre::{bail, Result};
use keyzero_engine::{
    derive::KeyDeriver,
    known::KnownAddressSet,
    oracle::BalanceOracle,
    scanner::{ScanRequest, Scanner, ScannerOptions},
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

fn start_logger(default_level: LevelFilter) {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter
            .add_directive("hyper=off".parse().unwrap())
            .add_directive("reqwest=off".parse().unwrap()),
        _ => EnvFilter::default()
            .add_directive(default_level.into())
            .add_directive("hyper=off".parse().unwrap())
            .add_directive("reqwest=off".parse().unwrap()),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    start_logger(LevelFilter::INFO);

    let cli = Cli::parse();

    match cli.subcommand {
        Command::Scan {
            strategy,
            workers,
            cache_file,
            address_file,
            found_file,
        } => {
            let request = match strategy {
                ScanStrategy::Sequential { start, end } => {
                    if end <= start {
                        bail!("range end ({end}) must be greater than range start ({start})");
                    }
                    ScanRequest::Sequential { start, end }
                }
                ScanStrategy::Random => ScanRequest::Random,
            };

            // Wait for shutdown signal in background.
            let token = CancellationToken::new();
            let cloned_token = token.clone();
            tokio::spawn(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        tracing::info!("Shutdown signal received, finishing up and shutting down...");
                    }
                    Err(err) => {
                        tracing::error!("Shutdown signal failed: {err}");
                    }
                };

                cloned_token.cancel();
            });

            let known = KnownAddressSet::load(Path::new(&address_file))?;
            let oracle = BalanceOracle::mainnet()?;
            let scanner = Scanner::new(
                oracle,
                known,
                ScannerOptions {
                    workers,
                    cache_path: PathBuf::from(cache_file),
                    found_path: PathBuf::from(&found_file),
                },
            );

            match scanner.run(request, token).await? {
                Some(found) => {
                    tracing::info!("Matching address found, recorded in {found_file}");
                    println!("Public Address: {}", found.address);
                    println!("Private Key: {}", found.wif);
                }
                None => {
                    tracing::info!("Scan finished without a match");
                }
            }
        }
        Command::Generate => {
            let key = KeyDeriver::new().random();
            println!("Public Address: {}", key.address);
            println!("Private Key: {}", key.wif);
        }
        Command::Address { key } => match KeyDeriver::new().from_raw(&key) {
            Ok(key) => {
                println!("Public Address: {}", key.address);
            }
            Err(e) => {
                bail!("incorrect key format: {e}");
            }
        },
    }

    Ok(())
}
