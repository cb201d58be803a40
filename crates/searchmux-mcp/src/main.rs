use anyhow::Result;
use clap::{Parser, Subcommand};
use searchmux_core::router::Router;
use searchmux_core::{Mode, SearchRequest};

mod config;
#[cfg(feature = "stdio")]
mod server;

#[derive(Parser, Debug)]
#[command(name = "searchmux")]
#[command(about = "Tiered multi-provider web search router (CLI + MCP stdio server)", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run as an MCP stdio server (for MCP clients).
    #[cfg(feature = "stdio")]
    McpStdio,
    /// Run one search and print the envelope (json).
    Search(SearchCmd),
    /// Diagnose configuration (json; no secrets).
    Doctor(DoctorCmd),
    /// Print version info.
    Version(VersionCmd),
}

#[derive(clap::Args, Debug)]
struct SearchCmd {
    /// Query text.
    query: String,
    /// Routing mode: basic|ai|auto. Defaults to the configured default mode.
    #[arg(long)]
    mode: Option<String>,
    /// Pin a specific provider (brave|searxng|perplexity|tavily).
    #[arg(long)]
    provider: Option<String>,
    /// Result count (clamped to 1..=20).
    #[arg(long)]
    max_results: Option<i64>,
    #[arg(long)]
    language: Option<String>,
    #[arg(long)]
    region: Option<String>,
    /// Provider-specific freshness hint (e.g. pd, pw, pm).
    #[arg(long)]
    freshness: Option<String>,
    #[arg(long)]
    category: Option<String>,
    /// Safe-search hint passed through to providers that support it.
    #[arg(long)]
    safesearch: Option<String>,
    /// Include the routing trace in the output.
    #[arg(long, default_value_t = false)]
    debug: bool,
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct DoctorCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct VersionCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    // Logs go to stderr so MCP stdio framing on stdout stays clean.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_envelope_text(envelope: &searchmux_core::Envelope) {
    use searchmux_core::SearchPayload;

    println!("[{} via {}] {}", envelope.tier, envelope.provider, envelope.query);
    match &envelope.payload {
        SearchPayload::Results { results } => {
            for (i, r) in results.iter().enumerate() {
                println!("{}. {}", i + 1, r.title);
                println!("   {}", r.url);
                if !r.snippet.is_empty() {
                    println!("   {}", r.snippet);
                }
            }
        }
        SearchPayload::Answer { answer } => {
            println!("{}", answer.answer);
            if !answer.citations.is_empty() {
                println!();
                for (i, c) in answer.citations.iter().enumerate() {
                    println!("[{}] {}", i + 1, c);
                }
            }
        }
    }
}

fn build_router(config: searchmux_core::config::Config) -> Result<Router> {
    config.validate()?;
    let client = searchmux_local::http_client()?;
    let registry = searchmux_local::registry_from_config(&config, client);
    Ok(Router::new(config, registry.basic, registry.ai))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        #[cfg(feature = "stdio")]
        Commands::McpStdio => {
            server::serve_stdio()
                .await
                .map_err(|e| anyhow::anyhow!(e.to_string()))?;
        }
        Commands::Search(args) => {
            let mode = match args.mode.as_deref() {
                Some(s) => Some(s.parse::<Mode>()?),
                None => None,
            };
            let config = config::load()?;
            let router = build_router(config)?;
            let req = SearchRequest {
                query: args.query,
                provider: args.provider,
                mode,
                language: args.language,
                region: args.region,
                freshness: args.freshness,
                category: args.category,
                safesearch: args.safesearch,
                max_results: args.max_results,
                debug: args.debug,
            };
            let envelope = router.execute(&req).await?;
            if args.output == "text" {
                print_envelope_text(&envelope);
            } else {
                println!("{}", serde_json::to_string_pretty(&envelope)?);
            }
        }
        Commands::Doctor(args) => {
            let config = config::load()?;
            let providers = ["brave", "searxng", "perplexity", "tavily"];
            if args.output == "text" {
                println!("searchmux {}", env!("CARGO_PKG_VERSION"));
                for id in providers {
                    let state = if config.providers.is_configured(id) {
                        "configured"
                    } else {
                        "not configured"
                    };
                    println!("{id}: {state}");
                }
            } else {
                // Only report booleans / key names, never values.
                let payload = serde_json::json!({
                    "schema_version": 1,
                    "name": "searchmux",
                    "version": env!("CARGO_PKG_VERSION"),
                    "features": { "stdio": cfg!(feature = "stdio") },
                    "configured": {
                        "providers": {
                            "brave": config.providers.is_configured("brave"),
                            "searxng": config.providers.is_configured("searxng"),
                            "perplexity": config.providers.is_configured("perplexity"),
                            "tavily": config.providers.is_configured("tavily"),
                        },
                        "preset": config.router.preset,
                        "default_mode": config.router.default_mode,
                        "cache_enabled": config.cache.enabled,
                        "privacy_guard": config.router.privacy_guard,
                    },
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            }
        }
        Commands::Version(args) => {
            if args.output == "text" {
                println!("searchmux {}", env!("CARGO_PKG_VERSION"));
            } else {
                let payload = serde_json::json!({
                    "schema_version": 1,
                    "name": "searchmux",
                    "version": env!("CARGO_PKG_VERSION"),
                });
                println!("{}", serde_json::to_string(&payload)?);
            }
        }
    }
    Ok(())
}
