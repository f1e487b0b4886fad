use anyhow::{Context, Result};
use ccx_rs::config::{Config, Database};
use ccx_rs::models::CountryQuery;
use ccx_rs::{Client, CountryService, CountryStore, server};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(
    name = "ccx",
    version,
    about = "Cache country metadata with exchange rates and GDP estimates, and serve it over HTTP"
)]
struct Cli {
    /// Database (`sqlite://path`, plain path or `:memory:`). Overrides DATABASE_URL.
    #[arg(long, global = true)]
    database: Option<String>,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service.
    Serve(ServeArgs),
    /// Fetch countries and rates, update the cache and the summary image.
    Refresh,
    /// List cached countries as JSON.
    List(ListArgs),
    /// Show one country by name (case-insensitive).
    Show { name: String },
    /// Delete one country by name (case-insensitive).
    Delete { name: String },
    /// Print row count and last refresh time.
    Status,
    /// Render the summary image from the current cache.
    Image {
        /// Output path (default: $CACHE_DIR/summary.png).
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Bind host. Overrides HOST.
    #[arg(long)]
    host: Option<String>,
    /// Bind port. Overrides PORT.
    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(Args, Debug)]
struct ListArgs {
    /// Region filter, exact and case-insensitive (e.g., Africa)
    #[arg(long)]
    region: Option<String>,
    /// Currency code filter (e.g., NGN)
    #[arg(long)]
    currency: Option<String>,
    /// gdp_desc, gdp_asc, population_desc or population_asc (default: by name)
    #[arg(long)]
    sort: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(db) = cli.database.as_deref() {
        config.database = db
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid --database: {e}"))?;
    }

    match cli.cmd {
        Command::Serve(args) => {
            if let Some(host) = args.host {
                config.host = host;
            }
            if let Some(port) = args.port {
                config.port = port;
            }
            cmd_serve(&config)
        }
        Command::Refresh => print_json(&build_service(&config)?.refresh()?),
        Command::List(args) => {
            let query = CountryQuery {
                region: args.region,
                currency: args.currency,
                sort: args.sort,
            };
            print_json(&build_service(&config)?.list(&query)?)
        }
        Command::Show { name } => print_json(&build_service(&config)?.get(&name)?),
        Command::Delete { name } => print_json(&build_service(&config)?.delete(&name)?),
        Command::Status => print_json(&build_service(&config)?.status()?),
        Command::Image { out } => {
            let out = out.unwrap_or_else(|| config.image_path());
            build_service_with_image(&config, out.clone())?.render_image()?;
            eprintln!("Wrote summary image to {}", out.display());
            Ok(())
        }
    }
}

fn build_service(config: &Config) -> Result<CountryService> {
    build_service_with_image(config, config.image_path())
}

fn build_service_with_image(config: &Config, image_path: PathBuf) -> Result<CountryService> {
    let store = match &config.database {
        Database::Memory => CountryStore::open_in_memory()?,
        Database::File(path) => CountryStore::open(path)
            .with_context(|| format!("open database {}", path.display()))?,
    };
    let client = Client::new(
        config.countries_url.clone(),
        config.rates_url.clone(),
        config.http_timeout,
    )?;
    Ok(CountryService::new(Box::new(client), store, image_path)
        .with_gdp_model(config.gdp_model)
        .with_font_path(config.font_path.clone()))
}

fn cmd_serve(config: &Config) -> Result<()> {
    // The blocking HTTP client is built outside the async runtime.
    let state = Arc::new(build_service(config)?);
    let runtime = tokio::runtime::Runtime::new().context("start tokio runtime")?;
    runtime.block_on(server::serve(state.clone(), &config.bind_addr()))?;
    drop(runtime);
    drop(state);
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
