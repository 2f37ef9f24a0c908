//! Knightlink matchmaking server.
//!
//! Pairs chess clients on `/play-online` and `/play-with-friend/{roomCode}`
//! and relays their moves until one side leaves. Stops on Ctrl-C.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin knightlink-server
//! cargo run --bin knightlink-server -- --host 0.0.0.0 --port 3000
//! PORT=8080 cargo run --bin knightlink-server
//! ```

use clap::Parser;

use knightlink::KnightlinkServer;
use knightlink::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "knightlink-server")]
#[command(about = "Two-player chess matchmaking and relay server", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "PORT", default_value_t = 3000)]
    port: u16,
}

#[tokio::main]
async fn main() {
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);

    let server = match KnightlinkServer::builder().bind(&addr).build().await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(%addr, error = %e, "failed to start server");
            std::process::exit(1);
        }
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "cannot listen for Ctrl-C, running until killed");
            std::future::pending::<()>().await;
        }
    };

    if let Err(e) = server.run_until(shutdown).await {
        tracing::error!(error = %e, "server error");
        std::process::exit(1);
    }
}
