//! Runtime configuration, read from the environment once at startup.
//!
//! Every knob has a development default so a bare `cargo run` serves a
//! working (in-memory) instance. Unparseable values fall back to the
//! default rather than aborting startup.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use tracking::queue::DropPolicy;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_JWT_SECRET: &str = "dev_secret_key";
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;
pub const DEFAULT_FRESHNESS_SECS: i64 = 5 * 60;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// TCP port for the HTTP listener (`PORT`)
    pub port: u16,
    /// HS256 secret for bearer tokens (`JWT_SECRET`)
    pub jwt_secret: String,
    /// Fix journal path (`JOURNAL_PATH`); unset means in-memory only
    pub journal_path: Option<PathBuf>,
    /// Per-connection outbound queue capacity (`BROKER_QUEUE_CAPACITY`)
    pub queue_capacity: usize,
    /// Overflow policy for lagging subscribers (`BROKER_DROP_POLICY`)
    pub drop_policy: DropPolicy,
    /// Active-locations freshness window in seconds (`ACTIVE_FRESHNESS_SECS`)
    pub active_freshness_secs: i64,
}

impl ApiConfig {
    pub fn from_env() -> Self {
        Self {
            port: parsed_var("PORT", DEFAULT_PORT),
            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| DEFAULT_JWT_SECRET.to_string()),
            journal_path: env::var("JOURNAL_PATH").ok().map(PathBuf::from),
            queue_capacity: parsed_var("BROKER_QUEUE_CAPACITY", DEFAULT_QUEUE_CAPACITY),
            drop_policy: parsed_var("BROKER_DROP_POLICY", DropPolicy::DropOldest),
            active_freshness_secs: parsed_var("ACTIVE_FRESHNESS_SECS", DEFAULT_FRESHNESS_SECS),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            journal_path: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            drop_policy: DropPolicy::DropOldest,
            active_freshness_secs: DEFAULT_FRESHNESS_SECS,
        }
    }
}

fn parsed_var<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(var = name, value = %raw, "unparseable env var, using default");
                default
            }
        },
        Err(_) => default,
    }
}
