//! # lbroker CLI Entry Point
//!
//! Main binary for the lbroker load-balancing broker. Provides a command-line
//! interface for running the broker and the two kinds of peers that use it.
//!
//! ## Usage
//!
//! ```bash
//! # Start a broker that runs until Ctrl-C
//! lbroker broker -f 127.0.0.1:5555 -b 127.0.0.1:5556
//!
//! # Start a broker that stops after 30 round-trips
//! lbroker broker -c 3 -n 30
//!
//! # Start a worker that answers every request with OK
//! lbroker worker -b 127.0.0.1:5556 -r OK
//!
//! # Send one request and print the reply
//! lbroker client -f 127.0.0.1:5555 -p HELLO
//! ```

use anyhow::Result;
use argh::FromArgs;
use bytes::Bytes;
use lbroker_broker::{BrokerConfig, BrokerServer, TerminationCause};
use lbroker_client::{RequestClient, Worker};
use lbroker_common::PeerIdentity;

/// Main CLI structure parsed from command-line arguments.
#[derive(FromArgs)]
/// lbroker - load-balancing request/reply broker
struct Cli {
    #[argh(subcommand)]
    command: Commands,
}

/// Available CLI subcommands.
///
/// - **Broker**: Bind the frontend and backend and dispatch requests
/// - **Client**: Send requests to a frontend (prints replies to stdout)
/// - **Worker**: Serve requests from a backend
#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    Broker(BrokerArgs),
    Client(ClientArgs),
    Worker(WorkerArgs),
}

/// Arguments for starting a broker.
///
/// The broker hands each client request to exactly one idle worker, in the
/// order workers became available. Without `-n` it runs until Ctrl-C.
///
/// # Example
///
/// ```bash
/// lbroker broker -f 0.0.0.0:5555 -b 0.0.0.0:5556 -c 10
/// ```
#[derive(FromArgs)]
#[argh(subcommand, name = "broker")]
/// start an lbroker broker
struct BrokerArgs {
    /// address clients connect to
    ///
    /// Defaults to "127.0.0.1:5555".
    #[argh(option, short = 'f', default = "\"127.0.0.1:5555\".into()")]
    frontend: String,

    /// address workers connect to
    ///
    /// Defaults to "127.0.0.1:5556".
    #[argh(option, short = 'b', default = "\"127.0.0.1:5556\".into()")]
    backend: String,

    /// maximum number of idle workers held in the queue
    ///
    /// READY signals beyond this are rejected. Defaults to 10.
    #[argh(option, short = 'c', default = "10")]
    capacity: usize,

    /// stop after this many completed round-trips
    ///
    /// If not set, the broker runs until Ctrl-C.
    #[argh(option, short = 'n', long = "round-trips")]
    round_trips: Option<u64>,
}

/// Arguments for sending requests.
///
/// Each reply goes to stdout, one line per reply, frames separated by spaces.
/// No logging is set up so the output can be piped.
#[derive(FromArgs)]
#[argh(subcommand, name = "client")]
/// send requests through an lbroker frontend
struct ClientArgs {
    /// frontend address of the broker
    #[argh(option, short = 'f', default = "\"127.0.0.1:5555\".into()")]
    frontend: String,

    /// request payload
    #[argh(option, short = 'p', default = "\"HELLO\".into()")]
    payload: String,

    /// identity to announce (generated by the broker if not set)
    #[argh(option, short = 'i')]
    identity: Option<String>,

    /// number of requests to send, one after another
    #[argh(option, short = 'r', long = "repeat", default = "1")]
    repeat: u64,
}

/// Arguments for starting a worker.
///
/// The worker answers every request with the same reply until Ctrl-C or until
/// the broker goes away.
#[derive(FromArgs)]
#[argh(subcommand, name = "worker")]
/// serve requests from an lbroker backend
struct WorkerArgs {
    /// backend address of the broker
    #[argh(option, short = 'b', default = "\"127.0.0.1:5556\".into()")]
    backend: String,

    /// reply payload
    #[argh(option, short = 'r', default = "\"OK\".into()")]
    reply: String,

    /// identity to announce (generated by the broker if not set)
    #[argh(option, short = 'i')]
    identity: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    // client: keep stdout clean for piping
    if !matches!(cli.command, Commands::Client(_)) {
        // Set default log level to INFO, but allow RUST_LOG env var to override
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    match cli.command {
        Commands::Broker(args) => run_broker(args).await,
        Commands::Client(args) => run_client(args).await,
        Commands::Worker(args) => run_worker(args).await,
    }
}

impl BrokerArgs {
    fn to_config(&self) -> BrokerConfig {
        let config = BrokerConfig::new()
            .with_frontend_addr(&self.frontend)
            .with_backend_addr(&self.backend)
            .with_worker_capacity(self.capacity);

        match self.round_trips {
            Some(count) => config.with_round_trips(count),
            None => config,
        }
    }
}

/// Resolves on Ctrl-C. If the handler cannot be installed it never resolves.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn run_broker(args: BrokerArgs) -> Result<()> {
    let config = args.to_config();
    tracing::info!("Starting lbroker broker");
    tracing::info!("Frontend: {}, backend: {}", config.frontend_addr, config.backend_addr);

    let server = BrokerServer::bind(config).await?;
    let outcome = server.run_until(shutdown_signal()).await?;

    match outcome.cause {
        TerminationCause::TargetReached => {
            tracing::info!("Completed {} round-trips", outcome.round_trips)
        }
        TerminationCause::Shutdown => {
            tracing::info!("Interrupted after {} round-trips", outcome.round_trips)
        }
    }

    Ok(())
}

/// Executes the `client` subcommand.
///
/// # Errors
///
/// Returns an error if the broker cannot be reached or closes the connection
/// before all replies arrive.
async fn run_client(args: ClientArgs) -> Result<()> {
    let identity = args.identity.map(PeerIdentity::from);
    let mut client = RequestClient::connect(&args.frontend, identity).await?;
    let payload = Bytes::from(args.payload.into_bytes());

    tracing::info!("Client connected to {}", client.broker_addr());

    for _ in 0..args.repeat {
        let reply = client.request(vec![payload.clone()]).await?;
        let line: Vec<String> = reply
            .iter()
            .map(|frame| String::from_utf8_lossy(frame).into_owned())
            .collect();
        println!("{}", line.join(" "));
    }

    Ok(())
}

async fn run_worker(args: WorkerArgs) -> Result<()> {
    let identity = args.identity.map(PeerIdentity::from);
    let mut worker = Worker::connect(&args.backend, identity).await?;
    let reply = Bytes::from(args.reply.into_bytes());

    tracing::info!("Worker connected to {}", args.backend);

    tokio::select! {
        served = worker.run(|_| vec![reply.clone()], None) => {
            tracing::info!("Served {} requests", served?);
        }
        _ = shutdown_signal() => {
            tracing::info!("Worker interrupted");
        }
    }

    Ok(())
}
