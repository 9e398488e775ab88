use anyhow::{Context, Result};
use clap::Parser;
use larder_client::{ContentDelivery, ContentStoreConfig, DeliveryClient, ManagementClient};

/// Check the content store credentials
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Args {
    /// YAML configuration file. Without it, settings come from the environment
    #[arg(long)]
    config: Option<String>,
    /// Only check the delivery token, for read-only setups
    #[arg(long)]
    read_only: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    if dotenvy::dotenv().is_err() {
        eprintln!("Warning: Failed to load .env file");
    }
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ContentStoreConfig::load(path)?,
        None => ContentStoreConfig::from_env().context("Could not configure the content store")?,
    };
    println!(
        "Testing access to space {} ({})...",
        config.space_id, config.environment
    );

    let mut failed = false;

    match DeliveryClient::new(&config) {
        Ok(client) => match client.list_entries().await {
            Ok(recipes) => println!("Delivery: OK, {} published recipes", recipes.len()),
            Err(e) => {
                println!("Delivery: FAILED\n  {e}");
                failed = true;
            }
        },
        Err(e) => {
            println!("Delivery: not configured ({e})");
            failed = true;
        }
    }

    if !args.read_only {
        match ManagementClient::new(&config) {
            Ok(client) => match client.check_access().await {
                Ok(environment) => {
                    println!("Management: OK");
                    println!("{}", serde_json::to_string_pretty(&environment)?);
                }
                Err(e) => {
                    println!("Management: FAILED\n  {e}");
                    failed = true;
                }
            },
            Err(e) => {
                println!("Management: not configured ({e})");
                failed = true;
            }
        }
    }

    if failed {
        std::process::exit(1);
    }
    Ok(())
}
