use clap::Parser;
use log::info;
use relay::{Relay, RelayConfig};
use shared::{DEFAULT_PORT, MAX_PARTICIPANTS};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short = 'p', long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Participant slots (1 to 4)
    #[arg(long, default_value_t = MAX_PARTICIPANTS)]
    max_participants: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Starting relay...");
    if args.max_participants == 0 || args.max_participants > MAX_PARTICIPANTS {
        info!(
            "Clamping --max-participants {} to 1..={}",
            args.max_participants, MAX_PARTICIPANTS
        );
    }

    let relay = Relay::bind(RelayConfig {
        host: args.host,
        port: args.port,
        max_participants: args.max_participants,
    })
    .await?;

    tokio::select! {
        result = relay.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
