//! deck-sync-client: headless client for a deck-sync server
//!
//! Usage:
//!   deck-sync-client show
//!   deck-sync-client tail --full
//!   deck-sync-client --server http://localhost:4000 push draft.md

use clap::Parser;
use deck_sync::cli::{ClientArgs, ClientCommand};
use deck_sync::config::SyncConfig;
use deck_sync::file::FileRecord;
use deck_sync::sync::{ChannelConfig, SyncAgent, UpdateChannel};
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = ClientArgs::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = match &args.config {
        Some(path) => SyncConfig::load(path)?,
        None => SyncConfig::default(),
    };
    if let Some(server) = &args.server {
        config.server = server.clone();
    }
    if args.no_dev {
        config.development_mode = false;
    }

    let agent = Arc::new(SyncAgent::from_config(&config)?);

    match args.command {
        ClientCommand::Show => {
            let record = agent.initialize().await?;
            println!("{}", record.filepath);
            println!("{}", record.raw);
        }
        ClientCommand::Push { file } => {
            let raw = tokio::fs::read_to_string(&file).await?;
            agent.submit_edit(&raw).await?;
            println!("Pushed {} ({} bytes)", file.display(), raw.len());
        }
        ClientCommand::Tail { full } => {
            // A failed load is logged; pushes can still populate the state.
            if let Ok(record) = agent.initialize().await {
                print_record(&record, full);
            }

            let channel = UpdateChannel::new(ChannelConfig::from(&config));
            let Some(_handle) = channel.spawn(agent.clone()) else {
                eprintln!("Push channel unavailable outside development mode");
                std::process::exit(1);
            };

            let mut updates = agent.subscribe();
            loop {
                tokio::select! {
                    changed = updates.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let record = updates.borrow_and_update().clone();
                        print_record(&record, full);
                    }
                    _ = signal::ctrl_c() => break,
                }
            }
        }
    }

    Ok(())
}

fn print_record(record: &FileRecord, full: bool) {
    let now = chrono::Local::now().format("%H:%M:%S");
    println!(
        "[{}] {} ({} lines, {} bytes)",
        now,
        record.filepath,
        record.raw.lines().count(),
        record.raw.len()
    );
    if full {
        println!("{}", record.raw);
    }
}
