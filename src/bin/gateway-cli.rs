use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Command-line client for the reCAPTCHA gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// API key sent as X-API-Key.
    #[arg(short, long, env = "APP_API_KEY", hide_env_values = true)]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Liveness probe
    Health,
    /// Readiness probe
    Ready,
    /// Verify a reCAPTCHA token
    Verify {
        #[arg(short, long)]
        token: String,

        #[arg(short, long, default_value = "")]
        action: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    if let Some(key) = &cli.key {
        headers.insert("X-API-Key", HeaderValue::from_str(key)?);
    }

    let res = match cli.command {
        Commands::Health => client.get(format!("{}/health", cli.url)).send().await?,
        Commands::Ready => client.get(format!("{}/ready", cli.url)).send().await?,
        Commands::Verify { token, action } => {
            client
                .post(format!("{}/api/v1/recaptcha/verify", cli.url))
                .headers(headers)
                .json(&json!({ "token": token, "action": action }))
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let retry_after = res
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let text = res.text().await?;
    let body = match serde_json::from_str::<Value>(&text) {
        Ok(json) => serde_json::to_string_pretty(&json)?,
        Err(_) => text,
    };

    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if let Some(secs) = retry_after {
            eprintln!("Retry after: {}s", secs);
        }
        eprintln!("{}", body);
        std::process::exit(1);
    }

    println!("{}", body);
    Ok(())
}
