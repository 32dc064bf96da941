// src/config.rs
use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use anyhow::Context;

use crate::activation::DeviceProfile;
use crate::client::HttpConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub devices_file: PathBuf,
    pub poll_interval: Duration,
    pub http: HttpConfig,
    pub profile: DeviceProfile,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Reads settings through `lookup` so tests need not touch the process env.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let bind_addr = parse_or(&lookup, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 8080)))?;
        let devices_file = lookup("DEVICES_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("devices.json"));
        let poll_interval = Duration::from_millis(parse_or(&lookup, "POLL_INTERVAL_MS", 1000u64)?);
        if poll_interval.is_zero() {
            anyhow::bail!("POLL_INTERVAL_MS must be greater than zero");
        }
        let request_timeout = parse_opt::<u64>(&lookup, "REQUEST_TIMEOUT_MS")?.map(Duration::from_millis);
        let poll_retries = parse_or(&lookup, "POLL_RETRIES", 0u32)?;
        let base_url = lookup("SERVICE_BASE_URL").filter(|s| !s.is_empty());

        Ok(Self {
            bind_addr,
            devices_file,
            poll_interval,
            http: HttpConfig {
                base_url,
                request_timeout,
                poll_retries,
            },
            profile: DeviceProfile::default(),
        })
    }
}

fn parse_opt<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<T>().with_context(|| format!("invalid {key}: {s:?}")))
        .transpose()
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    Ok(parse_opt(lookup, key)?.unwrap_or(default))
}
