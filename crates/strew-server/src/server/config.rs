use anyhow::{Context, bail};
use clap::Parser;
use core::time::Duration;
use url::Url;

/// Runtime configuration for the `strew-server` binary.
///
/// These settings control the dispatch concurrency, backpressure, and backend
/// targets of the embedding and search routes. All values are parsed from CLI
/// arguments or environment variables, with defaults suitable for local use.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "strew-server",
    version,
    about = "An HTTP service for batched embedding fan-out and proxied search dispatch"
)]
pub struct CliArgs {
    /// Address to listen on.
    ///
    /// Environment variable: `STREW_SERVER_ADDR`
    #[arg(long, env = "STREW_SERVER_ADDR", default_value_t = String::from("0.0.0.0:8080"))]
    pub server_addr: String,

    /// Number of worker tasks dispatching outbound search requests.
    ///
    /// This is the hard ceiling on concurrent outbound search calls; excess
    /// requests queue up to `search_queue_depth` and are then refused.
    ///
    /// Environment variable: `STREW_SEARCH_WORKERS`
    #[arg(long, env = "STREW_SEARCH_WORKERS", default_value_t = 2)]
    pub search_workers: usize,

    /// Capacity of the search dispatch queue.
    ///
    /// Submissions beyond this depth are refused with a 429 instead of
    /// growing the backlog without bound.
    ///
    /// Environment variable: `STREW_SEARCH_QUEUE_DEPTH`
    #[arg(long, env = "STREW_SEARCH_QUEUE_DEPTH", default_value_t = 64)]
    pub search_queue_depth: usize,

    /// Base URL of the search backend the `/v1/search` route dispatches to.
    ///
    /// The query string is appended per request; the URL must parse and use
    /// an http or https scheme.
    ///
    /// Environment variable: `STREW_SEARCH_BACKEND_URL`
    #[arg(long, env = "STREW_SEARCH_BACKEND_URL", default_value_t = String::from("http://127.0.0.1:8888/search"))]
    pub search_backend_url: String,

    /// Optional bearer token attached to outbound search requests.
    ///
    /// Environment variable: `STREW_SEARCH_BEARER_TOKEN`
    #[arg(long, env = "STREW_SEARCH_BEARER_TOKEN")]
    pub search_bearer_token: Option<String>,

    /// Default per-request search timeout, in seconds.
    ///
    /// Callers may lower or raise it per request; this is the value used when
    /// a request does not carry its own.
    ///
    /// Environment variable: `STREW_SEARCH_TIMEOUT_SECS`
    #[arg(long, env = "STREW_SEARCH_TIMEOUT_SECS", default_value_t = 10)]
    pub search_timeout_secs: u64,

    /// Model identifier the built-in embedding engine registers under.
    ///
    /// Environment variable: `STREW_EMBED_MODEL`
    #[arg(long, env = "STREW_EMBED_MODEL", default_value_t = String::from("feature-hash"))]
    pub embed_model: String,

    /// Dimension of the vectors the built-in embedding engine produces.
    ///
    /// Environment variable: `STREW_EMBED_DIM`
    #[arg(long, env = "STREW_EMBED_DIM", default_value_t = 384)]
    pub embed_dim: usize,

    /// Maximum number of inputs accepted in one embedding request.
    ///
    /// Environment variable: `STREW_MAX_BATCH_SIZE`
    #[arg(long, env = "STREW_MAX_BATCH_SIZE", default_value_t = 512)]
    pub max_batch_size: usize,

    /// How long shutdown waits for in-flight dispatches, in seconds.
    ///
    /// Environment variable: `STREW_SHUTDOWN_TIMEOUT_SECS`
    #[arg(long, env = "STREW_SHUTDOWN_TIMEOUT_SECS", default_value_t = 5)]
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_addr: String,
    pub search_workers: usize,
    pub search_queue_depth: usize,
    pub search_backend_url: Url,
    pub search_bearer_token: Option<String>,
    pub search_timeout: Duration,
    pub embed_model: String,
    pub embed_dim: usize,
    pub max_batch_size: usize,
    pub shutdown_timeout: Duration,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.search_workers == 0 {
            bail!("STREW_SEARCH_WORKERS must be greater than 0");
        }

        if args.search_queue_depth == 0 {
            bail!("STREW_SEARCH_QUEUE_DEPTH must be greater than 0");
        }

        if args.search_timeout_secs == 0 {
            bail!("STREW_SEARCH_TIMEOUT_SECS must be greater than 0");
        }

        if args.embed_model.trim().is_empty() {
            bail!("STREW_EMBED_MODEL must not be empty");
        }

        if args.embed_dim == 0 {
            bail!("STREW_EMBED_DIM must be greater than 0");
        }

        if args.max_batch_size == 0 {
            bail!("STREW_MAX_BATCH_SIZE must be greater than 0");
        }

        let search_backend_url: Url = args
            .search_backend_url
            .parse()
            .with_context(|| format!("invalid STREW_SEARCH_BACKEND_URL: {}", args.search_backend_url))?;
        if !matches!(search_backend_url.scheme(), "http" | "https") {
            bail!(
                "STREW_SEARCH_BACKEND_URL must use http or https, got {}",
                search_backend_url.scheme()
            );
        }

        Ok(Self {
            server_addr: args.server_addr,
            search_workers: args.search_workers,
            search_queue_depth: args.search_queue_depth,
            search_backend_url,
            search_bearer_token: args.search_bearer_token,
            search_timeout: Duration::from_secs(args.search_timeout_secs),
            embed_model: args.embed_model,
            embed_dim: args.embed_dim,
            max_batch_size: args.max_batch_size,
            shutdown_timeout: Duration::from_secs(args.shutdown_timeout_secs),
        })
    }
}
