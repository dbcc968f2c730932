use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use serde_json::Value;
use serpapi_client::{Client, Params, Response};
use serpapi_common::observability::{LogFormat, init_logging};
use serpapi_config::{SerpApiConfig, SerpApiConfigLoader};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const DEFAULT_CONFIG_FILE: &str = "serpapi.yaml";

#[derive(Debug, Parser)]
#[command(name = "serpapi", version, about = "Query the SerpApi search results API")]
struct Cli {
    /// Config file (YAML/TOML/JSON). Defaults to ./serpapi.yaml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, env = "SERPAPI_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    #[arg(long, global = true)]
    base_url: Option<String>,

    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Emit logs as JSON.
    #[arg(long, global = true)]
    log_json: bool,

    /// Debug logging, duplicated to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a search, optionally following pagination.
    Search {
        /// Query parameter as key=value (repeatable).
        #[arg(short = 'p', long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
        /// Maximum number of pages to fetch.
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },
    /// Look up supported locations.
    Locations {
        #[arg(short = 'p', long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },
    /// Show account information for the API key.
    Account,
    /// GET an arbitrary endpoint as JSON.
    Json {
        path: String,
        #[arg(short = 'p', long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },
    /// GET an arbitrary endpoint as raw HTML.
    Html {
        path: String,
        #[arg(short = 'p', long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.to_string())),
        _ => Err(format!("expected key=value, got {raw:?}")),
    }
}

fn to_params(pairs: Vec<(String, String)>) -> Params {
    pairs.into_iter().collect()
}

fn load_config(cli: &Cli) -> Result<SerpApiConfig> {
    let loader = match &cli.config {
        Some(path) => SerpApiConfigLoader::new().with_file(path),
        None => SerpApiConfigLoader::new().with_optional_file(DEFAULT_CONFIG_FILE),
    };
    let mut cfg = loader.load().context("failed to load configuration")?;

    if let Some(key) = &cli.api_key {
        cfg.api_key = key.clone();
    }
    if let Some(base) = &cli.base_url {
        cfg.base_url = base.clone();
    }
    if let Some(secs) = cli.timeout_secs {
        cfg.timeout_secs = secs;
    }
    if cli.log_json {
        cfg.log.format = LogFormat::Json;
    }
    if cli.verbose {
        cfg.log.stderr = true;
        cfg.log.filter = "debug".into();
    }
    cfg.validate().context("invalid configuration")?;
    Ok(cfg)
}

fn first_title(page: &Response) -> Option<&str> {
    page.organic_results()?.first()?.get("title")?.as_str()
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(cli: Cli, client: Client, cancel: CancellationToken) -> Result<()> {
    match cli.command {
        Command::Search { params, pages } => {
            let stream = client.paginate(to_params(params), &cancel).take(pages.max(1));
            futures::pin_mut!(stream);
            let mut page_no = 0usize;
            while let Some(page) = stream.next().await {
                page_no += 1;
                let page = page.with_context(|| format!("search failed on page {page_no}"))?;
                match first_title(&page) {
                    Some(title) => eprintln!("--- Page {page_no}: top result {title:?} ---"),
                    None => eprintln!("--- Page {page_no} ---"),
                }
                print_json(&page)?;
            }
            if page_no < pages {
                eprintln!("No next page available.");
            }
        }
        Command::Locations { params } => {
            let locations: Vec<Value> = client
                .location(&to_params(params), &cancel)
                .await
                .context("location lookup failed")?;
            print_json(&locations)?;
        }
        Command::Account => {
            let account = client.account(&cancel).await.context("account lookup failed")?;
            print_json(&account)?;
        }
        Command::Json { path, params } => {
            let resp = client
                .get_json(&path, &to_params(params), &cancel)
                .await
                .with_context(|| format!("GET {path} failed"))?;
            print_json(&resp)?;
        }
        Command::Html { path, params } => {
            let html = client
                .get_html(&path, &to_params(params), &cancel)
                .await
                .with_context(|| format!("GET {path} failed"))?;
            print!("{html}");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = load_config(&cli)?;

    let log_path = init_logging("serpapi", &cfg.log)?;
    tracing::debug!(log_path = %log_path.display(), base_url = %cfg.base_url, "serpapi.cli.start");

    if cfg.api_key.trim().is_empty() {
        bail!("no API key: set SERPAPI_API_KEY, pass --api-key, or add api_key to the config file");
    }

    let client = Client::builder(cfg.api_key.clone())
        .with_base_url(cfg.base_url.clone())
        .with_timeout(Duration::from_secs(cfg.timeout_secs))
        .build()?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("serpapi.cli.interrupted");
            on_signal.cancel();
        }
    });

    run(cli, client, cancel).await
}
