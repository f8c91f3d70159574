use std::collections::HashMap;
use std::path::PathBuf;

use crate::providers::open_meteo::FORECAST_ENDPOINT;

/// Matches the reqwest client default.
pub const HTTP_TIMEOUT_SECS: u64 = 30;

pub const SHARED_NAMESPACE: &str = "simple-weather";
pub const SNAPSHOT_KEY: &str = "WeatherData";

/// Widget timeline entries are refreshed after one hour.
pub const WIDGET_REFRESH_SECS: u64 = 60 * 60;

pub const WEATHER_SHARED_DIR_ENV: &str = "WEATHER_SHARED_DIR";
pub const WEATHER_API_ENDPOINT_ENV: &str = "WEATHER_API_ENDPOINT";
pub const WEATHER_HTTP_TIMEOUT_SECS_ENV: &str = "WEATHER_HTTP_TIMEOUT_SECS";
const XDG_DATA_HOME_ENV: &str = "XDG_DATA_HOME";
const HOME_ENV: &str = "HOME";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub shared_dir: PathBuf,
    pub api_endpoint: String,
    pub http_timeout_secs: u64,
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        Self::from_pairs(std::env::vars())
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map: HashMap<String, String> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            shared_dir: resolve_shared_dir(&map),
            api_endpoint: resolve_api_endpoint(&map),
            http_timeout_secs: resolve_http_timeout_secs(&map),
        }
    }
}

fn non_empty<'a>(env_map: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    env_map
        .get(key)
        .map(String::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn resolve_shared_dir(env_map: &HashMap<String, String>) -> PathBuf {
    let home = non_empty(env_map, HOME_ENV);

    if let Some(explicit) = non_empty(env_map, WEATHER_SHARED_DIR_ENV) {
        return PathBuf::from(expand_home_path(explicit, home));
    }
    if let Some(xdg) = non_empty(env_map, XDG_DATA_HOME_ENV) {
        return PathBuf::from(expand_home_path(xdg, home));
    }
    if let Some(home) = home {
        return PathBuf::from(home).join(".local").join("share");
    }
    std::env::temp_dir()
}

fn expand_home_path(raw: &str, home: Option<&str>) -> String {
    let trimmed = raw.trim();
    let Some(home) = home else {
        return trimmed.to_string();
    };

    let home = home.trim_end_matches('/');
    let mut expanded = trimmed.replace("$HOME", home);

    if expanded == "~" {
        expanded = home.to_string();
    } else if let Some(rest) = expanded.strip_prefix("~/") {
        expanded = format!("{home}/{rest}");
    }

    expanded
}

fn resolve_api_endpoint(env_map: &HashMap<String, String>) -> String {
    non_empty(env_map, WEATHER_API_ENDPOINT_ENV)
        .map(|value| value.trim_end_matches('?').to_string())
        .unwrap_or_else(|| FORECAST_ENDPOINT.to_string())
}

fn resolve_http_timeout_secs(env_map: &HashMap<String, String>) -> u64 {
    non_empty(env_map, WEATHER_HTTP_TIMEOUT_SECS_ENV)
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(HTTP_TIMEOUT_SECS)
}
