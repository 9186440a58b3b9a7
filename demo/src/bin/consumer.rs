use clap::Parser;
use date_count_demo::{init_logging, Error, ProviderClientBuilder};

/// Fetches the provider's count once and prints it.
#[derive(Debug, Parser)]
#[command(name = "consumer")]
struct Args {
    #[arg(long, env = "API_HOST", default_value = "http://localhost")]
    host: String,
    #[arg(long, env = "API_PORT", default_value_t = 8080)]
    port: u16,
    /// ISO-8601 date to ask for, now when omitted.
    #[arg(long)]
    valid_date: Option<String>,
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    log_level: String,
}

fn main() -> Result<(), Error> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let client = ProviderClientBuilder::new()
        .with_domain_name(format!("{}:{}", args.host, args.port))
        .build();

    let data = match &args.valid_date {
        Some(valid_date) => client.fetch_provider_data(valid_date),
        None => client.fetch_current_provider_data(),
    };

    match data {
        Ok(data) => {
            println!("count: {}, date: {}", data.count, data.date);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Fetching provider data failed: {}", e);
            Err(e)
        }
    }
}
