//! Proxyfetch CLI - Entry Point
//!
//! Loads the proxy pool and runs a single client operation.

use std::path::PathBuf;
use std::process;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use http::Method;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use proxyfetch::config::{Config, LogConfig};
use proxyfetch::proxy::{HttpTransportFactory, TransportSettings};
use proxyfetch::services::{encode_image, random_user_agent, CaptchaSolver, GeminiSolver};
use proxyfetch::{RequestAttempt, RequestClient};

#[derive(Parser)]
#[command(name = "proxyfetch")]
#[command(about = "Backend API client with rotating proxies", long_about = None)]
#[command(version)]
struct Cli {
    /// Proxy list file, one proxy URL per line
    #[arg(short, long, env = "PROXYFETCH_PROXY_FILE")]
    proxies: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the public address of the active proxy
    Ip,

    /// Fetch a login nonce
    Nonce,

    /// Send a request to the backend
    Fetch {
        /// Endpoint appended to the base URL, e.g. /auth/nonce
        endpoint: String,

        /// HTTP method
        #[arg(short, long, default_value = "GET")]
        method: String,

        /// Bearer token
        #[arg(short, long)]
        token: Option<String>,

        /// JSON body for non-GET requests
        #[arg(short, long)]
        body: Option<String>,
    },

    /// Recognize a captcha image with Gemini
    Captcha {
        /// PNG image file
        image: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(proxies) = cli.proxies {
        config.client.proxy_file = proxies;
    }
    if let Some(level) = cli.log_level {
        config.log.level = level;
    }

    init_tracing(&config.log);
    info!("Starting proxyfetch");

    let user_agent = random_user_agent();

    if let Commands::Captcha { image } = &cli.command {
        let api_key = config
            .captcha
            .gemini_api_key
            .as_deref()
            .context("GEMINI_API_KEY must be set to solve captchas")?;
        let bytes = std::fs::read(image)
            .with_context(|| format!("Failed to read {}", image.display()))?;

        let factory = HttpTransportFactory::new(TransportSettings {
            timeout: config.client.request_timeout(),
            user_agent,
        });
        let solver = GeminiSolver::new(api_key, &factory)?;
        println!("{}", solver.solve(&encode_image(&bytes)).await?);
        return Ok(());
    }

    let client = match RequestClient::from_config(config.client.clone(), user_agent) {
        Ok(client) => client,
        Err(e) if e.is_fatal() => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    match cli.command {
        Commands::Ip => {
            println!("{}", client.probe_egress_address().await);
        }
        Commands::Nonce => {
            println!("{}", client.fetch_nonce().await?);
        }
        Commands::Fetch {
            endpoint,
            method,
            token,
            body,
        } => {
            let method = Method::from_bytes(method.to_uppercase().as_bytes())
                .with_context(|| format!("Invalid HTTP method: {}", method))?;

            let mut request = RequestAttempt::new(endpoint).method(method);
            if let Some(token) = token {
                request = request.token(token);
            }
            if let Some(body) = body {
                request = request.body(serde_json::from_str(&body).context("Body must be valid JSON")?);
            }

            let outcome = client.fetch(request).await?;
            if outcome.is_exhausted() {
                error!("Retries exhausted");
            }
            println!("{}", serde_json::to_string_pretty(&outcome.into_response())?);
        }
        Commands::Captcha { .. } => bail!("captcha is handled before the client is built"),
    }

    Ok(())
}

/// Initialize tracing from RUST_LOG, falling back to the configured level
fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("proxyfetch={}", log.level).into());
    let registry = tracing_subscriber::registry().with(filter);

    if log.format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
