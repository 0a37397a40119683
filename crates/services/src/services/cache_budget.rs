use std::{
    collections::HashMap,
    env,
    sync::Mutex,
    time::{Duration, Instant},
};

use once_cell::sync::Lazy;
use tracing::warn;

const DEFAULT_PREVIEWS_TTL_SECS: u64 = 1800;
const DEFAULT_CACHE_WARN_SAMPLE_SECS: u64 = 300;

#[derive(Debug, Clone)]
pub struct CacheBudgetConfig {
    pub previews_ttl: Duration,
    pub cache_warn_sample: Duration,
}

impl Default for CacheBudgetConfig {
    fn default() -> Self {
        Self {
            previews_ttl: Duration::from_secs(DEFAULT_PREVIEWS_TTL_SECS),
            cache_warn_sample: Duration::from_secs(DEFAULT_CACHE_WARN_SAMPLE_SECS),
        }
    }
}

impl CacheBudgetConfig {
    pub fn from_env() -> Self {
        Self::from_env_with(|name| env::var(name).ok())
    }

    fn from_env_with<F>(get_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            previews_ttl: read_env_duration("AVEE_PREVIEWS_TTL_SECS", defaults.previews_ttl, &get_env),
            cache_warn_sample: read_env_duration(
                "AVEE_CACHE_WARN_SAMPLE_SECS",
                defaults.cache_warn_sample,
                &get_env,
            ),
        }
    }
}

static CACHE_BUDGETS: Lazy<CacheBudgetConfig> = Lazy::new(CacheBudgetConfig::from_env);

pub fn cache_budgets() -> &'static CacheBudgetConfig {
    &CACHE_BUDGETS
}

static LAST_WARN: Lazy<Mutex<HashMap<&'static str, Instant>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

pub fn should_warn(cache_name: &'static str) -> bool {
    let sample = cache_budgets().cache_warn_sample;
    if sample.is_zero() {
        return true;
    }

    let mut last_warn = LAST_WARN.lock().unwrap();
    let now = Instant::now();

    match last_warn.get(cache_name) {
        Some(prev) if now.duration_since(*prev) < sample => false,
        _ => {
            last_warn.insert(cache_name, now);
            true
        }
    }
}

fn read_env_duration<F>(name: &str, default: Duration, get_env: &F) -> Duration
where
    F: Fn(&str) -> Option<String>,
{
    match get_env(name) {
        Some(value) => match value.parse::<u64>() {
            Ok(parsed) => Duration::from_secs(parsed),
            Err(err) => {
                warn!(
                    "Invalid {name}='{value}': {err}. Using default {}.",
                    default.as_secs()
                );
                default
            }
        },
        None => default,
    }
}
