// ABOUTME: RUDP server binary: `rudpserver <port>`, serves files from the process CWD

use argh::FromArgs;
use netcourse::rudp::RudpServer;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Runs the RUDP file-transfer server.
#[derive(FromArgs)]
struct CliArgs {
    /// the UDP port to listen on
    #[argh(positional)]
    port: u16,
}

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let args: CliArgs = argh::from_env();

    let root = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(err) => {
            eprintln!("[rudpserver] failed to resolve current directory: {err}");
            std::process::exit(1);
        }
    };

    let server = match RudpServer::bind(args.port, root).await {
        Ok(server) => server,
        Err(err) => {
            eprintln!("[rudpserver] failed to bind port {}: {err}", args.port);
            std::process::exit(1);
        }
    };

    tracing::info!(port = args.port, "listening");

    if let Err(err) = server.run().await {
        eprintln!("[rudpserver] fatal error: {err}");
        std::process::exit(1);
    }
}
