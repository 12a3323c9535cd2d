mod config;
mod console;

use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use chain_client::{ChainClient, RestChainClient};
use clap::Parser;
use client_core::{
    ActionDispatcher, ExtensionSlot, LocalAccount, LocalWallet, SessionState,
};
use console::{Command, HELP};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::error::RecvError,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "harness", about = "Drive wallet actions against a Cedra network")]
struct Args {
    /// Optional settings file; missing files fall back to defaults.
    #[arg(long, default_value = "harness.toml")]
    config: PathBuf,
    /// Run without a wallet to exercise the not-installed path.
    #[arg(long)]
    no_extension: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let settings = config::load_settings(&args.config);
    info!(?settings, "harness: settings loaded");

    let client: Arc<dyn ChainClient> = Arc::new(RestChainClient::new(settings.network_config()?));
    let extension = if args.no_extension {
        ExtensionSlot::Absent
    } else {
        let account = match &settings.wallet_private_key {
            Some(key) => LocalAccount::from_private_key_hex(key)?,
            None => LocalAccount::generate(),
        };
        info!(address = %account.address(), "harness: local wallet ready");
        ExtensionSlot::Available(Arc::new(LocalWallet::new(account, Arc::clone(&client))))
    };

    let session = Arc::new(SessionState::initialize(client));
    let dispatcher = ActionDispatcher::new(extension, session, settings.dispatcher_config());

    let mut reports = dispatcher.subscribe_reports();
    let printer = tokio::spawn(async move {
        loop {
            match reports.recv().await {
                Ok(report) => println!("{}", console::render_report(&report)),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "harness: reports dropped"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match console::parse_command(&line) {
            Ok(command) => command,
            Err(console::ParseCommandError::Empty) => continue,
            Err(err) => {
                eprintln!("{err}");
                continue;
            }
        };
        match command {
            Command::Help => println!("{HELP}"),
            Command::Quit => break,
            command => {
                // Outcomes are printed from the report channel.
                let _ = console::execute(&dispatcher, command).await;
            }
        }
    }

    drop(dispatcher);
    let _ = printer.await;
    Ok(())
}
