use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "aggregator-cli")]
#[command(about = "Operator CLI for the similarity aggregator", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:5000")]
    url: String,

    /// Correlation ID to send with the request.
    #[arg(short, long)]
    correlation_id: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the similar products of a product
    Similar {
        product_id: String,
    },
    /// Show circuit breaker and cache status
    Resilience,
    /// Check service health
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let mut headers = HeaderMap::new();
    if let Some(id) = &cli.correlation_id {
        headers.insert("x-correlation-id", HeaderValue::from_str(id)?);
    }

    let path = match &cli.command {
        Commands::Similar { product_id } => format!("/product/{}/similar", product_id),
        Commands::Resilience => "/admin/resilience".to_string(),
        Commands::Health => "/health".to_string(),
    };

    let res = client
        .get(format!("{}{}", base, path))
        .headers(headers)
        .send()
        .await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let correlation_id = res
        .headers()
        .get("x-correlation-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if !status.is_success() {
        eprintln!("Error: service returned status {}", status);
        if let Some(id) = correlation_id {
            eprintln!("Correlation ID: {}", id);
        }
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
