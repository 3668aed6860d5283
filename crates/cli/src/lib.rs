use access::{BearerToken, Exposure, Origins, AUTH_TOKEN_ENV};
use anyhow::{Context as AnyhowContext, Result};
use cache::CacheConfig;
use clap::{Args, Parser, Subcommand};
use simlog_indexer::{default_load_concurrency, parse_load_concurrency};
use simlog_protocol::{serialize_json, DirectoryTree, ErrorEnvelope, SimDataPack};
use simlog_tabular::LoadOptions;
use state::{AppState, HealthReport, ServerConfig};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub mod access;
pub mod cache;
pub mod error;
pub mod http_api;
pub mod state;

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<()> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serialize_json(value)?
    };
    print_stdout(&text)
}

#[derive(Parser)]
#[command(name = "simlog")]
#[command(about = "Browse elevator simulation logs: directory trees and data packs", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long, global = true)]
    quiet: bool,

    /// Root directory of the simulation data tree
    #[arg(
        long,
        global = true,
        env = "SIMLOG_DATA_ROOT",
        default_value = "public/data_dev"
    )]
    data_root: PathBuf,

    /// Maximum number of cached data packs
    #[arg(long, global = true, default_value_t = 32)]
    cache_capacity: usize,

    /// Cache TTL in seconds
    #[arg(long, global = true, default_value_t = 86_400)]
    cache_ttl_seconds: u64,

    /// Concurrent file loads and zone scans (1..=64)
    #[arg(long, global = true, env = "SIMLOG_LOAD_CONCURRENCY")]
    load_concurrency: Option<String>,

    /// Per-file load timeout in milliseconds (0 disables)
    #[arg(long, global = true, default_value_t = 30_000)]
    load_timeout_ms: u64,

    /// Keep every cell as text instead of inferring numeric columns
    #[arg(long, global = true)]
    no_coerce: bool,

    /// Field delimiter of logbook files
    #[arg(long, global = true, default_value_t = ',')]
    delimiter: char,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the data API over HTTP
    ServeHttp(ServeArgs),

    /// Print the zone/config/run tree under a path as JSON
    Tree(TreeArgs),

    /// Load every run under a config directory and print the data pack
    Pack(PackArgs),

    /// Print JSON schemas of the API response types
    Schema(SchemaArgs),
}

#[derive(Args)]
struct ServeArgs {
    /// Bind address, e.g. 127.0.0.1:3000
    #[arg(long, default_value = "127.0.0.1:3000")]
    bind: String,

    /// Allow binding to non-loopback addresses (requires --auth-token)
    #[arg(long)]
    public: bool,

    /// Require Authorization: Bearer <token> on all requests (env: SIMLOG_AUTH_TOKEN)
    #[arg(long)]
    auth_token: Option<String>,

    /// Browser origin allowed by CORS; repeatable (default: any origin)
    #[arg(long = "cors-origin", value_name = "ORIGIN")]
    cors_origins: Vec<String>,

    /// Origin /data-pack may fetch remote bases from; repeatable
    /// (default: any origin, none with --public)
    #[arg(long = "remote-base-origin", value_name = "ORIGIN")]
    remote_base_origins: Vec<String>,
}

impl ServeArgs {
    fn apply(&self, config: &mut ServerConfig) -> Result<()> {
        config.cors_origins = Origins::from_args(&self.cors_origins, Origins::Any)?;
        let remote_default = if self.public {
            Origins::none()
        } else {
            Origins::Any
        };
        config.remote_origins = Origins::from_args(&self.remote_base_origins, remote_default)?;
        Ok(())
    }
}

#[derive(Args)]
struct TreeArgs {
    /// Path relative to the data root
    #[arg(default_value = "")]
    path: String,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,
}

#[derive(Args)]
struct PackArgs {
    /// Config directory relative to the data root
    path: String,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,
}

#[derive(Args)]
struct SchemaArgs {
    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,
}

impl Cli {
    fn server_config(&self) -> Result<ServerConfig> {
        let delimiter = u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .with_context(|| {
                format!(
                    "Delimiter must be a single ASCII character: {:?}",
                    self.delimiter
                )
            })?;
        let timeout =
            (self.load_timeout_ms > 0).then(|| Duration::from_millis(self.load_timeout_ms));

        Ok(ServerConfig {
            data_root: self.data_root.clone(),
            cache: CacheConfig {
                ttl: Duration::from_secs(self.cache_ttl_seconds),
                capacity: self.cache_capacity,
            },
            load: LoadOptions {
                delimiter,
                coerce_numeric: !self.no_coerce,
                timeout,
            },
            load_concurrency: parse_load_concurrency(
                self.load_concurrency.as_deref(),
                default_load_concurrency(),
            ),
            cors_origins: Origins::Any,
            remote_origins: Origins::Any,
        })
    }
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let config = cli.server_config()?;
    match cli.command {
        Commands::ServeHttp(args) => serve_http(args, config).await?,
        Commands::Tree(args) => run_tree(args, config).await?,
        Commands::Pack(args) => run_pack(args, config).await?,
        Commands::Schema(args) => run_schema(args)?,
    }

    Ok(())
}

async fn run_tree(args: TreeArgs, config: ServerConfig) -> Result<()> {
    let state = AppState::new(config);
    let tree = state
        .dir_tree(&args.path)
        .await
        .with_context(|| format!("Failed to scan {:?}", args.path))?;
    print_json(&tree, args.pretty)
}

async fn run_pack(args: PackArgs, config: ServerConfig) -> Result<()> {
    let state = AppState::new(config);
    let pack = state
        .read_sim(&args.path)
        .await
        .with_context(|| format!("Failed to build data pack for {:?}", args.path))?;
    for warning in &pack.warnings {
        log::warn!("{}/{}: {}", warning.run_id, warning.file, warning.message);
    }
    print_json(pack.as_ref(), args.pretty)
}

fn run_schema(args: SchemaArgs) -> Result<()> {
    let schemas = serde_json::json!({
        "DirectoryTree": schemars::schema_for!(DirectoryTree),
        "SimDataPack": schemars::schema_for!(SimDataPack),
        "ErrorEnvelope": schemars::schema_for!(ErrorEnvelope),
        "HealthReport": schemars::schema_for!(HealthReport),
    });
    print_json(&schemas, args.pretty)
}

async fn serve_http(args: ServeArgs, mut config: ServerConfig) -> Result<()> {
    let token = BearerToken::from_arg_or_env(args.auth_token.as_deref())?;
    let exposure = Exposure::resolve(&args.bind, args.public, token).await?;
    args.apply(&mut config)?;

    let data_root = config.data_root.clone();
    if !data_root.is_dir() {
        log::warn!(
            "Data root {} does not exist yet; requests will return 404",
            data_root.display()
        );
    }
    let load_concurrency = config.load_concurrency;
    let remote_origins = config.remote_origins.clone();
    let auth_enabled = exposure.token.is_some();
    let state = Arc::new(AppState::new(config).with_auth_token(exposure.token));
    let app = http_api::router(state);

    let listener = tokio::net::TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("Failed to bind {}", args.bind))?;
    let local_addr = listener.local_addr()?;
    let base_url = format!("http://{local_addr}");

    log::info!(
        "Serving {} on {base_url} (load concurrency {load_concurrency})",
        data_root.display()
    );
    print_stdout(&format!("Directory tree: {base_url}/dir-tree?path=<path>"))?;
    print_stdout(&format!("Data pack: POST {base_url}/data-pack"))?;
    print_stdout(&format!("Health endpoint: {base_url}/health"))?;

    if auth_enabled {
        print_stdout(&format!(
            "Auth enabled: add header 'Authorization: Bearer ${AUTH_TOKEN_ENV}'"
        ))?;
    }
    if let Origins::Only(list) = &remote_origins {
        log::info!("Remote data-pack bases limited to [{}]", list.join(", "));
    }
    if args.public {
        let addrs = exposure
            .addrs
            .iter()
            .map(|a| a.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        print_stdout(&format!(
            "Public bind enabled (--public). Resolved addresses: {addrs}"
        ))?;
    }

    axum::serve(listener, app).await?;
    Ok(())
}
