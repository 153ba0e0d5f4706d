use anyhow::Result;
use cart_core::store::ListStore;
use cart_core::sync::{InsertCommand, Notice, SyncController};
use cart_core::{
    identity, Config, ConnectivityMonitor, ConnectivityState, ListCache, MemoryStore,
};
use cart_remote::RemoteStore;
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cart", about = "Shopping list client with live sync and offline cache")]
struct Args {
    /// Path to the configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::load(args.config.as_deref())?;
    let cache = Arc::new(ListCache::open(&config.cache_database_path()?)?);

    // Welcome screen: anonymous sign-in hands the list screen its user id.
    println!("{}", "Shopping list".bold());
    let user_id = match identity::sign_in_anonymously(&cache) {
        Ok(uid) => {
            println!("Signed in successfully");
            uid
        }
        Err(e) => {
            eprintln!("Unable to sign in, try later");
            return Err(e);
        }
    };

    let store: Arc<dyn ListStore>;
    let monitor;
    match &config.store.url {
        Some(url) => {
            println!("Syncing to server: {url}");
            store = Arc::new(RemoteStore::new(url.clone()));
            let health = config.health_url().unwrap_or_default();
            monitor = ConnectivityMonitor::probe(
                health,
                Duration::from_secs(config.connectivity.probe_interval_secs),
            );
        }
        None => {
            println!("No server configured - running in local-only mode");
            store = Arc::new(MemoryStore::new());
            let (switch, local) = ConnectivityMonitor::switched();
            switch.set(ConnectivityState::Connected);
            monitor = local;
        }
    }

    let (mut controller, mut notices) = SyncController::new(user_id, store, cache);

    // Render each published snapshot the way the list screen would.
    let mut lists = controller.lists();
    tokio::spawn(async move {
        while lists.changed().await.is_ok() {
            let snapshot = lists.borrow().clone();
            println!();
            if snapshot.is_empty() {
                println!("(no lists yet)");
            }
            for list in &snapshot {
                println!("{}: {}", list.name.bold(), list.items.join(", "));
            }
        }
    });

    // Alert surface.
    tokio::spawn(async move {
        while let Some(notice) = notices.recv().await {
            match notice {
                Notice::ListAdded { name } => {
                    println!("The list '{name}' has been added");
                }
                Notice::InvalidList => {
                    println!("{}", "You need to add the name of the list and its items".red());
                }
                Notice::InsertFailed { reason } => {
                    tracing::debug!(%reason, "insert failed");
                    println!("{}", "Unable to add. Please try later".red());
                }
                Notice::SyncLost { reason } => {
                    tracing::debug!(%reason, "subscription lost");
                    println!("{}", "Connection lost - showing cached lists".yellow());
                }
            }
        }
    });

    // List form: `add <name> <item #1> <item #2>` on stdin.
    let (commands_tx, commands_rx) = unbounded_channel();
    tokio::spawn(read_commands(commands_tx));

    let connectivity = monitor.subscribe();
    tokio::select! {
        _ = controller.run(connectivity, commands_rx) => {}
        _ = tokio::signal::ctrl_c() => {
            println!("Received shutdown signal, stopping cart");
        }
    }
    controller.dispose();

    Ok(())
}

async fn read_commands(tx: UnboundedSender<InsertCommand>) {
    println!("commands: add <name> <item #1> <item #2>  |  quit");
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("add") => {
                let name = parts.next().unwrap_or_default().to_string();
                let items: Vec<String> = parts.map(str::to_string).collect();
                if tx.send(InsertCommand { name, items }).is_err() {
                    break;
                }
            }
            Some("quit") => break,
            Some(_) | None => {
                println!("commands: add <name> <item #1> <item #2>  |  quit");
            }
        }
    }
    // Dropping the sender ends the controller's run loop.
}
