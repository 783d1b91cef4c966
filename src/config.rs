use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;

// CLI argument structure; every flag can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "aitool-pool-gateway")]
#[command(about = "Rate-limited API gateway for the AITool Pool backend")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    // Interface to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    // Backend project url, e.g. "https://xyz.supabase.co"
    #[arg(long, env = "SUPABASE_URL")]
    pub supabase_url: Option<String>,

    // Public (anon) api key, used for caller-scoped queries
    #[arg(long, env = "SUPABASE_ANON_KEY")]
    pub supabase_anon_key: Option<String>,

    // Service role key, used for privileged operations
    #[arg(long, env = "SUPABASE_SERVICE_ROLE_KEY")]
    pub supabase_service_role_key: Option<String>,

    // CORS allow-list (comma-separated). Empty allows any origin
    #[arg(long, env = "ALLOWED_ORIGINS", default_value = "")]
    pub allowed_origins: String,

    // "1" turns the rate limiter off
    #[arg(long, env = "DISABLE_RATE_LIMIT")]
    pub disable_rate_limit: Option<String>,

    // Rate limit max requests per window
    #[arg(long, env = "RATE_LIMIT", default_value_t = 60)]
    pub rate_limit: u32,

    // Rate limit window in milliseconds
    #[arg(long, env = "RATE_LIMIT_WINDOW_MS", default_value_t = 60_000)]
    pub rate_limit_window_ms: u64,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing SUPABASE_URL or SUPABASE_ANON_KEY environment variables")]
    MissingBackend,
    #[error("RATE_LIMIT must be a positive integer")]
    InvalidRateLimit,
    #[error("RATE_LIMIT_WINDOW_MS must be a positive integer")]
    InvalidRateWindow,
    #[error("invalid bind address {0}")]
    InvalidBindAddr(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub supabase: SupabaseConfig,
    pub allowed_origins: Vec<String>,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
    pub service_role_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub limit: u32,
    pub window: Duration,
    pub disabled: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: 60,
            window: Duration::from_millis(60_000),
            disabled: false,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::resolve(Args::parse(), |name| std::env::var(name).ok())
    }

    /// Validates parsed arguments once, at startup. `lookup` supplies the
    /// legacy variable names that have no flag of their own.
    pub fn resolve(
        args: Args,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let url = non_empty(args.supabase_url).or_else(|| non_empty(lookup("VITE_SUPABASE_URL")));
        let anon_key =
            non_empty(args.supabase_anon_key).or_else(|| non_empty(lookup("VITE_SUPABASE_ANON_KEY")));
        let (Some(url), Some(anon_key)) = (url, anon_key) else {
            return Err(ConfigError::MissingBackend);
        };

        if args.rate_limit == 0 {
            return Err(ConfigError::InvalidRateLimit);
        }
        if args.rate_limit_window_ms == 0 {
            return Err(ConfigError::InvalidRateWindow);
        }

        let disabled = args.disable_rate_limit.as_deref() == Some("1")
            || lookup("RATE_LIMIT_DISABLED").as_deref() == Some("1");

        let bind = format!("{}:{}", args.host, args.port);
        let bind_addr = bind
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddr(bind.clone()))?;

        Ok(Self {
            bind_addr,
            supabase: SupabaseConfig {
                url,
                anon_key,
                service_role_key: non_empty(args.supabase_service_role_key),
            },
            allowed_origins: parse_origins(&args.allowed_origins),
            rate_limit: RateLimitConfig {
                limit: args.rate_limit,
                window: Duration::from_millis(args.rate_limit_window_ms),
                disabled,
            },
        })
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
