use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "tripline",
    about = "In-memory security incident triage service",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the daemon (API server + triage engine)
    Serve {
        /// Bind address (overrides config file)
        #[arg(long)]
        bind: Option<String>,

        /// Path to a TOML config file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Mint an ingest token for a session (current 60s window)
    Token {
        /// Session identifier the token is bound to
        #[arg(long)]
        session_id: String,

        /// Ingest secret (defaults to config/env)
        #[arg(long)]
        secret: Option<String>,

        /// Path to a TOML config file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Query statistics from a running instance
    Stats {
        /// Base URL of the running instance
        #[arg(long, default_value = "http://127.0.0.1:8080")]
        url: String,

        /// Admin token
        #[arg(long)]
        token: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { bind, config } => {
            let mut cfg = tripline::config::Config::load(config.as_deref())?;
            if let Some(bind) = bind {
                cfg.bind = bind;
            }
            tracing::info!(bind = %cfg.bind, "Starting tripline daemon");
            tripline::serve(cfg).await?;
        }
        Commands::Token {
            session_id,
            secret,
            config,
        } => {
            let secret = match secret {
                Some(s) => s,
                None => tripline::config::Config::load(config.as_deref())?.ingest_secret,
            };
            let now_ms = chrono::Utc::now().timestamp_millis();
            println!(
                "{}",
                tripline::auth::mint_ingest_token(&session_id, &secret, now_ms)
            );
        }
        Commands::Stats { url, token } => {
            let endpoint = format!("{}/api/v1/stats", url.trim_end_matches('/'));
            let body: serde_json::Value = reqwest::Client::new()
                .get(&endpoint)
                .query(&[("token", token)])
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            let stats = &body["stats"];
            println!("\ntripline incident statistics");
            println!("{:<25} : {}", "Total incidents", stats["total"]);
            println!("{:<25} : {}", "Last 24h", stats["last24h"]);
            println!("{:<25} : {}", "Last 7d", stats["last7d"]);
            println!("{:<25} : {}", "Suspicious IPs", stats["suspiciousIPs"]);
            println!(
                "{:<25} : {}",
                "Blocked fingerprints", stats["blockedFingerprints"]
            );
            println!("\nSeverity breakdown:");
            for level in ["low", "medium", "high", "critical"] {
                println!("  {:<10} : {}", level, stats["severityBreakdown"][level]);
            }
            if let Some(types) = stats["topTypes"].as_array() {
                println!("\nTop incident types:");
                for t in types {
                    println!("  {:<22} : {}", t["type"].as_str().unwrap_or("?"), t["count"]);
                }
            }
            println!();
        }
    }

    Ok(())
}
