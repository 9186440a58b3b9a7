use accord::serve;
use clap::Parser;
use date_count_demo::{init_logging, DateCountStore, Error, ProviderService};
use std::{net::TcpListener, sync::Arc};

/// Serves the date count provider until interrupted.
#[derive(Debug, Parser)]
#[command(name = "provider")]
struct Args {
    #[arg(long, env = "API_HOST", default_value = "127.0.0.1")]
    host: String,
    #[arg(long, env = "API_PORT", default_value_t = 8080)]
    port: u16,
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let listener = TcpListener::bind((args.host.as_str(), args.port))?;
    tracing::info!(
        "Provider Service listening on http://{}",
        listener.local_addr()?
    );

    let service = Arc::new(ProviderService::new(Arc::new(DateCountStore::default())));
    serve(listener, service, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await?;

    tracing::info!("Provider Service stopped");
    Ok(())
}
