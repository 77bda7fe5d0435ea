use clap::Parser;
use client::demo::DemoSimulation;
use client::input;
use client::network::{Client, Disconnect};
use client::reconcile::StalePolicy;
use client::session::{NoSimulation, Session, SessionConfig, Simulation};
use log::{info, warn};
use shared::SNAPSHOT_INTERVAL_MS;
use std::path::PathBuf;
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Relay address to connect to
    #[arg(short = 's', long, default_value = "ws://127.0.0.1:8080")]
    server: String,

    /// Act as host whatever participant id the relay assigns
    #[arg(long)]
    host: bool,

    /// Simulation ticks per second
    #[arg(long, default_value_t = 60)]
    tick_rate: u32,

    /// Minimum milliseconds between two snapshots sent as host
    #[arg(long, default_value_t = SNAPSHOT_INTERVAL_MS)]
    snapshot_interval_ms: u64,

    /// Skip snapshots older than the last one applied
    #[arg(long)]
    reject_stale_snapshots: bool,

    /// Run the falling-blocks demo when this participant is host
    #[arg(long)]
    demo: bool,

    /// Write the final world snapshot to this file on exit
    #[arg(long)]
    save_snapshot: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let config = SessionConfig {
        force_host: args.host,
        snapshot_interval_ms: args.snapshot_interval_ms,
        stale_policy: if args.reject_stale_snapshots {
            StalePolicy::RejectOlder
        } else {
            StalePolicy::AcceptAll
        },
    };
    let simulation: Box<dyn Simulation> = if args.demo {
        Box::new(DemoSimulation::new())
    } else {
        Box::new(NoSimulation)
    };

    info!("Starting client...");
    info!("Controls: type `<button> down|up|tap` on stdin, buttons are left right up down A B");
    if args.host {
        info!("Forcing host role");
    }

    let mut client = Client::new(args.server, Session::new(config, simulation), args.tick_rate);
    let (edges_tx, mut edges_rx) = mpsc::channel(64);
    let _stdin = input::spawn_stdin_reader(edges_tx);

    let outcome = tokio::select! {
        result = client.run(&mut edges_rx) => Some(result.map_err(|e| e.to_string())),
        _ = tokio::signal::ctrl_c() => None,
    };

    match outcome {
        Some(Err(e)) => {
            warn!("Could not reach relay ({}), running standalone", e);
            tokio::select! {
                _ = client.run_standalone(&mut edges_rx) => {}
                _ = tokio::signal::ctrl_c() => {}
            }
        }
        Some(Ok(Disconnect::Closed { code, reason })) => {
            warn!("Relay closed the connection ({}): {}", code, reason);
        }
        Some(Ok(_)) => {}
        None => info!("Received Ctrl+C, shutting down"),
    }

    if let Some(path) = args.save_snapshot {
        let snapshot = client.session().current_snapshot(client.elapsed_ms());
        std::fs::write(&path, snapshot.to_json()?)?;
        info!(
            "Saved snapshot with {} actors to {}",
            snapshot.actors.len(),
            path.display()
        );
    }

    Ok(())
}
