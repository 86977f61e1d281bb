use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

/// Timing and messaging knobs shared by the service, board and HTTP layer.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Length of one service turn.
    pub turn_duration_ms: i64,
    /// How long a notified customer has to reply.
    pub response_window_ms: i64,
    /// Remaining turn time at or below which the display turns urgent.
    pub critical_threshold_ms: i64,
    /// Prefix used when normalizing local phone numbers.
    pub country_code: String,
    pub business_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            turn_duration_ms: 7 * 60 * 1000,
            response_window_ms: 2 * 60 * 1000,
            critical_threshold_ms: 60 * 1000,
            country_code: "62".to_string(),
            business_name: "the booth".to_string(),
        }
    }
}

/// Process configuration, loaded once at startup and passed down explicitly.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub force_recreate: bool,
    pub bind_ip: IpAddr,
    pub settings: Settings,
}

impl Default for Config {
    fn default() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            db_path: cwd.join("walkin.db"),
            force_recreate: false,
            bind_ip: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            settings: Settings::default(),
        }
    }
}

impl Config {
    /// Defaults overridden by `WALKIN_*` environment variables. Unparsable
    /// values are ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Config::default();
        if let Some(path) = lookup("WALKIN_DB") {
            cfg.db_path = PathBuf::from(path);
        }
        if let Some(ip) = parse_var(&lookup, "WALKIN_BIND") {
            cfg.bind_ip = ip;
        }
        if let Some(ms) = parse_millis(&lookup, "WALKIN_TURN_MS", 1) {
            cfg.settings.turn_duration_ms = ms;
        }
        if let Some(ms) = parse_millis(&lookup, "WALKIN_RESPONSE_MS", 1) {
            cfg.settings.response_window_ms = ms;
        }
        if let Some(ms) = parse_millis(&lookup, "WALKIN_CRITICAL_MS", 0) {
            cfg.settings.critical_threshold_ms = ms;
        }
        if let Some(code) = lookup("WALKIN_COUNTRY_CODE") {
            cfg.settings.country_code = code;
        }
        if let Some(name) = lookup("WALKIN_BUSINESS") {
            cfg.settings.business_name = name;
        }
        cfg
    }
}

/// Milliseconds no smaller than `min`; anything else keeps the default.
fn parse_millis<F>(lookup: &F, key: &str, min: i64) -> Option<i64>
where
    F: Fn(&str) -> Option<String>,
{
    let ms: i64 = parse_var(lookup, key)?;
    if ms < min {
        tracing::warn!(key, value = ms, min, "ignoring out of range setting");
        return None;
    }
    Some(ms)
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable setting");
            None
        }
    }
}
