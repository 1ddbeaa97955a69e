use std::env;
use std::time::Duration;

use anyhow::{bail, Context, Result};

pub const DEFAULT_PORT: u16 = 5353;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub timeout: Duration,
    pub allow_list: Option<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            allow_list: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> { Self::from_lookup(|k| env::var(k).ok()) }

    // Lookup is injected so tests don't have to mutate the process environment.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut cfg = Config::default();
        if let Some(v) = get("PORT") {
            cfg.port = v.trim().parse().with_context(|| format!("invalid PORT: {:?}", v))?;
        }
        if let Some(v) = get("HOST").filter(|v| !v.trim().is_empty()) {
            cfg.host = v.trim().to_string();
        }
        if let Some(v) = get("TERMBRIDGE_TIMEOUT_SECS") {
            let secs: u64 = v.trim().parse().with_context(|| format!("invalid TERMBRIDGE_TIMEOUT_SECS: {:?}", v))?;
            if secs == 0 { bail!("TERMBRIDGE_TIMEOUT_SECS must be > 0"); }
            cfg.timeout = Duration::from_secs(secs);
        }
        if let Some(v) = get("TERMBRIDGE_ALLOWED_COMMANDS") {
            let list: Vec<String> = v.split(',').map(|s| s.trim()).filter(|s| !s.is_empty()).map(String::from).collect();
            if !list.is_empty() { cfg.allow_list = Some(list); }
        }
        Ok(cfg)
    }

    pub fn addr(&self) -> String { format!("{}:{}", self.host, self.port) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config> {
        let m: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|k| m.get(k).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = load(&[]).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.addr(), "0.0.0.0:5353");
        assert_eq!(cfg.timeout, Duration::from_secs(10));
    }

    #[test]
    fn overrides() {
        let cfg = load(&[("PORT", "8080"), ("HOST", "127.0.0.1"), ("TERMBRIDGE_TIMEOUT_SECS", "3"),
            ("TERMBRIDGE_ALLOWED_COMMANDS", "ls, uname,,date")]).unwrap();
        assert_eq!(cfg.addr(), "127.0.0.1:8080");
        assert_eq!(cfg.timeout, Duration::from_secs(3));
        assert_eq!(cfg.allow_list, Some(vec!["ls".to_string(), "uname".to_string(), "date".to_string()]));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(load(&[("PORT", "http")]).is_err());
        assert!(load(&[("PORT", "70000")]).is_err());
        assert!(load(&[("TERMBRIDGE_TIMEOUT_SECS", "0")]).is_err());
    }

    #[test]
    fn blank_allow_list_means_unrestricted() {
        assert_eq!(load(&[("TERMBRIDGE_ALLOWED_COMMANDS", " , ")]).unwrap().allow_list, None);
    }
}
