// ABOUTME: CHAT router binary: `chatserver <port>`, exits 1 on invalid args or bind/listen failure

use argh::FromArgs;
use netcourse::chat::ChatRouter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Runs the CHAT message router.
#[derive(FromArgs)]
struct CliArgs {
    /// the TCP port to listen on
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

    let router = match ChatRouter::bind(args.port).await {
        Ok(router) => router,
        Err(err) => {
            eprintln!("[chatserver] failed to bind port {}: {err}", args.port);
            std::process::exit(1);
        }
    };

    tracing::info!(port = args.port, "listening");

    if let Err(err) = router.run().await {
        eprintln!("[chatserver] fatal error: {err}");
        std::process::exit(1);
    }
}
