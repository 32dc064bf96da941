// src/transactions.rs
//! Pending-challenge discovery and approval for a registered device.

use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};
use url::form_urlencoded::byte_serialize;

use crate::activation::PKPUSH;
use crate::canon::Params;
use crate::client::{ServiceClient, TXID_HEADER};
use crate::error::Result;
use crate::types::{Challenge, Device};

pub const TRANSACTIONS_PATH: &str = "/push/v2/device/transactions";
pub const APPROVE: &str = "approve";

/// Path for answering one challenge. The id comes from the service, so it is
/// escaped here once; the result is both signed and sent.
pub fn challenge_path(challenge_id: &str) -> String {
    let segment: String = byte_serialize(challenge_id.as_bytes()).collect();
    format!("{TRANSACTIONS_PATH}/{segment}")
}

fn base_params(device: &Device) -> Params {
    Params::new().with("akey", device.activation_key.as_str())
}

fn append_device_status(params: &mut Params) {
    params.push("fips_status", "1");
    params.push("hsm_status", "true");
    params.push("pkpush", PKPUSH);
}

/// Signed GET of the pending-challenge list. A missing or malformed list is
/// an empty list; transport failures are retried `poll_retries` times.
pub async fn list_challenges(client: &ServiceClient, device: &Device) -> Result<Vec<Challenge>> {
    let mut params = base_params(device);
    append_device_status(&mut params);

    let mut attempt = 0;
    let body = loop {
        match client
            .send_signed(device, Method::GET, TRANSACTIONS_PATH, &params, &[])
            .await
        {
            Ok(body) => break body,
            Err(e) if e.is_transport() && attempt < client.poll_retries() => {
                attempt += 1;
                warn!(device_id = %device.device_id, attempt, "challenge list failed, retrying: {e}");
            }
            Err(e) => return Err(e),
        }
    };
    Ok(extract_challenges(&body))
}

pub fn extract_challenges(body: &Value) -> Vec<Challenge> {
    let Some(entries) = body
        .get("response")
        .and_then(|r| r.get("transactions"))
        .and_then(Value::as_array)
    else {
        debug!("reply has no response.transactions list");
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| match serde_json::from_value::<Challenge>(entry.clone()) {
            Ok(challenge) => Some(challenge),
            Err(e) => {
                warn!("skipping malformed transaction entry: {e}");
                None
            }
        })
        .collect()
}

pub struct ChallengeResponder {
    client: ServiceClient,
}

impl ChallengeResponder {
    pub fn new(client: ServiceClient) -> Self {
        Self { client }
    }

    /// Answers one challenge. The decoded reply is returned as is; whether the
    /// service accepted the answer is left to the caller.
    pub async fn respond(&self, device: &Device, challenge_id: &str, answer: &str) -> Result<Value> {
        let mut params = base_params(device).with("answer", answer);
        append_device_status(&mut params);
        let path = challenge_path(challenge_id);

        self.client
            .send_signed(
                device,
                Method::POST,
                &path,
                &params,
                &[(TXID_HEADER, challenge_id)],
            )
            .await
    }
}
