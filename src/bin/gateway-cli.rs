use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Parser, Subcommand};
use serde_json::Value;

use diagnosis_gateway::auth::{TokenClaims, TokenCodec};
use diagnosis_gateway::config::load_config;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Operator CLI for the diagnosis gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mint an HS256 bearer token
    Token {
        /// Subject (user id) carried in the token
        #[arg(long)]
        subject: String,
        /// Signing secret; must match the gateway's jwt_secret
        #[arg(long, env = "GATEWAY_JWT_SECRET")]
        secret: String,
        /// Lifetime in seconds
        #[arg(long, default_value_t = 3600)]
        ttl_secs: u64,
        /// Space-separated scopes; omitted means the gateway's defaults
        #[arg(long)]
        scope: Option<String>,
    },
    /// Load and validate a config file
    CheckConfig { path: PathBuf },
    /// Show the gateway's dependency health
    Health,
    /// Send a diagnosis payload with service credentials
    Diagnose {
        /// JSON payload file
        file: PathBuf,
        #[arg(long, env = "GATEWAY_API_KEY")]
        api_key: String,
        #[arg(long, default_value = "tenderly-backend")]
        service: String,
        /// Use the simple symptom-list endpoint
        #[arg(long)]
        simple: bool,
        /// Only validate the structured payload
        #[arg(long, conflicts_with = "simple")]
        validate_only: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Token {
            subject,
            secret,
            ttl_secs,
            scope,
        } => {
            let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
            let claims = TokenClaims {
                sub: subject,
                iat: now,
                exp: now.saturating_add(ttl_secs),
                scope,
            };
            println!("{}", TokenCodec::new(secret).sign(&claims)?);
        }
        Commands::CheckConfig { path } => match load_config(&path) {
            Ok(config) => {
                println!(
                    "{}: ok (environment={}, bind={}, quota={}/{}s)",
                    path.display(),
                    config.environment,
                    config.listener.bind_address,
                    config.rate_limit.requests,
                    config.rate_limit.window_secs
                );
            }
            Err(e) => {
                eprintln!("{}: {e}", path.display());
                std::process::exit(1);
            }
        },
        Commands::Health => {
            let res = reqwest::get(format!("{base}/api/v1/health")).await?;
            print_response(res).await?;
        }
        Commands::Diagnose {
            file,
            api_key,
            service,
            simple,
            validate_only,
        } => {
            let payload: Value = serde_json::from_str(&std::fs::read_to_string(&file)?)?;
            let path = if simple {
                "/api/v1/diagnosis"
            } else if validate_only {
                "/api/v1/diagnosis/validate"
            } else {
                "/api/v1/diagnosis/structured"
            };
            let res = reqwest::Client::new()
                .post(format!("{base}{path}"))
                .header("X-API-Key", api_key)
                .header("X-Service-Name", service)
                .json(&payload)
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    let rendered = match serde_json::from_str::<Value>(&text) {
        Ok(json) => serde_json::to_string_pretty(&json)?,
        Err(_) => text,
    };

    if status.is_success() {
        println!("{rendered}");
    } else {
        eprintln!("Error: gateway returned status {status}");
        eprintln!("{rendered}");
        std::process::exit(1);
    }
    Ok(())
}
