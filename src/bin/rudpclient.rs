// ABOUTME: RUDP client binary: `rudpclient <host-ip> <port> <window-size 1..255> <filename>`
// ABOUTME: writes the retrieved file to ./DST/<filename>

use argh::FromArgs;
use netcourse::rudp::client::destination_path;
use netcourse::rudp::{RudpClient, RudpError};
use std::net::{IpAddr, SocketAddr};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Fetches a file from an RUDP server.
#[derive(FromArgs)]
struct CliArgs {
    /// the server's IP address
    #[argh(positional)]
    host: IpAddr,

    /// the server's UDP port
    #[argh(positional)]
    port: u16,

    /// the sliding window size, 1..255
    #[argh(positional)]
    window_size: u8,

    /// the name of the file to request
    #[argh(positional)]
    filename: String,
}

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let args: CliArgs = argh::from_env();

    if args.window_size == 0 {
        eprintln!("[rudpclient] window size must be between 1 and 255");
        std::process::exit(1);
    }

    let server_addr = SocketAddr::new(args.host, args.port);

    let client = match RudpClient::connect(server_addr).await {
        Ok(client) => client,
        Err(err) => {
            eprintln!("[rudpclient] failed to open a socket: {err}");
            std::process::exit(1);
        }
    };

    tracing::info!(%server_addr, filename = %args.filename, window_size = args.window_size, "requesting file");

    let bytes = match client.fetch(args.window_size, &args.filename).await {
        Ok(bytes) => bytes,
        Err(RudpError::ServerError) => {
            eprintln!("[rudpclient] server reported the file could not be served");
            std::process::exit(1);
        }
        Err(err) => {
            eprintln!("[rudpclient] transfer failed: {err}");
            std::process::exit(1);
        }
    };

    let dest = destination_path(&args.filename);
    if let Some(parent) = dest.parent() {
        if let Err(err) = tokio::fs::create_dir_all(parent).await {
            eprintln!("[rudpclient] failed to create {}: {err}", parent.display());
            std::process::exit(1);
        }
    }

    if let Err(err) = tokio::fs::write(&dest, &bytes).await {
        eprintln!("[rudpclient] failed to write {}: {err}", dest.display());
        std::process::exit(1);
    }

    tracing::info!(bytes = bytes.len(), path = %dest.display(), "transfer complete");
}
