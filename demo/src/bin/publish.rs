use accord::{Broker, ContractDocument};
use clap::Parser;
use date_count_demo::{init_logging, Error};
use std::path::PathBuf;

/// Publishes the consumer's contract to a broker and tags the consumer version.
#[derive(Debug, Parser)]
#[command(name = "publish")]
struct Args {
    #[arg(long, default_value = "pacts/our_little_consumer-our_provider.json")]
    pact: PathBuf,
    #[arg(long, env = "PACT_BROKER_URL")]
    broker_url: String,
    #[arg(long, env = "PACT_BROKER_USERNAME", requires = "broker_password")]
    broker_username: Option<String>,
    #[arg(long, env = "PACT_BROKER_PASSWORD", hide_env_values = true)]
    broker_password: Option<String>,
    #[arg(long, env = "CONSUMER_VERSION", default_value = "1.0.0")]
    consumer_version: String,
    #[arg(long = "tag", default_values = ["prod", "test"])]
    tags: Vec<String>,
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let document = ContractDocument::load(&args.pact)?;
    let mut broker = Broker::new(args.broker_url.as_str());
    if let (Some(username), Some(password)) = (&args.broker_username, &args.broker_password) {
        broker = broker.with_credentials(username.as_str(), password.as_str());
    }

    if let Err(e) = broker
        .publish_contract(&document, &args.consumer_version, &args.tags)
        .await
    {
        tracing::error!("Contract publishing failed: {}", e);
        return Err(e.into());
    }

    println!(
        "Published {} as version {} of {}",
        args.pact.display(),
        args.consumer_version,
        document.consumer.name
    );
    Ok(())
}
