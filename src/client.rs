// src/client.rs
//! HTTP plumbing shared by activation, polling and approval.

use std::time::Duration;

use reqwest::{header::HOST, Method};
use serde_json::Value;
use tracing::debug;

use crate::canon::{now_timestamp, Params};
use crate::error::{Error, Result};
use crate::signer;
use crate::types::Device;

pub const DATE_HEADER: &str = "x-duo-date";
pub const TXID_HEADER: &str = "txId";

#[derive(Debug, Clone, Default)]
pub struct HttpConfig {
    /// Replaces `https://{service_host}` when set. The signed host and the
    /// `host` header stay the device's service host.
    pub base_url: Option<String>,
    /// No timeout when unset.
    pub request_timeout: Option<Duration>,
    /// Extra attempts for the challenge-list GET only.
    pub poll_retries: u32,
}

#[derive(Debug, Clone)]
pub struct ServiceClient {
    http: reqwest::Client,
    base_url: Option<String>,
    poll_retries: u32,
}

impl ServiceClient {
    pub fn new(cfg: &HttpConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = cfg.request_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            base_url: cfg.base_url.as_ref().map(|u| u.trim_end_matches('/').to_string()),
            poll_retries: cfg.poll_retries,
        })
    }

    pub fn poll_retries(&self) -> u32 {
        self.poll_retries
    }

    /// The query is appended as already encoded so the bytes sent are the
    /// bytes signed.
    fn url(&self, host: &str, path: &str, params: &Params) -> String {
        let base = match &self.base_url {
            Some(base) => base.clone(),
            None => format!("https://{host}"),
        };
        if params.is_empty() {
            format!("{base}{path}")
        } else {
            format!("{base}{path}?{}", params.to_query())
        }
    }

    /// Unsigned request; used for activation where no credential exists yet.
    pub async fn send_unsigned(
        &self,
        method: Method,
        host: &str,
        path: &str,
        params: &Params,
    ) -> Result<Value> {
        let url = self.url(host, path, params);
        debug!("{method} {path} -> {host}");
        let res = self.http.request(method, url).send().await?;
        decode(res).await
    }

    /// Signs with a fresh timestamp and sends.
    pub async fn send_signed(
        &self,
        device: &Device,
        method: Method,
        path: &str,
        params: &Params,
        extra_headers: &[(&str, &str)],
    ) -> Result<Value> {
        let timestamp = now_timestamp();
        let auth = signer::sign(device, method.as_str(), path, &timestamp, params)?;
        let url = self.url(&device.service_host, path, params);
        debug!(device_id = %device.device_id, "{method} {path}");

        let mut req = self
            .http
            .request(method, url)
            .header(reqwest::header::AUTHORIZATION, auth)
            .header(DATE_HEADER, timestamp)
            .header(HOST, device.service_host.as_str());
        for (name, value) in extra_headers {
            req = req.header(*name, *value);
        }
        let res = req.send().await?;
        decode(res).await
    }
}

async fn decode(res: reqwest::Response) -> Result<Value> {
    let status = res.status();
    let body = res.text().await?;
    if !status.is_success() {
        return Err(Error::UnexpectedStatus {
            status: status.as_u16(),
            body,
        });
    }
    Ok(serde_json::from_str(&body)?)
}
