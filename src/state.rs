use std::sync::Arc;

use crate::config::Config;
use crate::rate_limit::RateLimiter;
use crate::supabase::SupabaseClient;

// app's shared state, cloned into every request
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub rate_limiter: Arc<RateLimiter>, // one window per client key
    pub supabase: SupabaseClient,
}

impl AppState {
    pub fn new(config: Config, supabase: SupabaseClient) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(&config.rate_limit));
        Self {
            config: Arc::new(config),
            rate_limiter,
            supabase,
        }
    }
}
