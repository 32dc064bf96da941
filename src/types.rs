// src/types.rs
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One registered authenticator. Built once by activation and never mutated
/// afterwards. Fields the service returns that are not needed here are kept
/// verbatim in `extra`.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub device_id: String,
    /// PKCS#1 PEM.
    pub signing_key: String,
    #[serde(rename = "akey")]
    pub activation_key: String,
    #[serde(rename = "pkey")]
    pub credential_id: String,
    pub registration_code: String,
    /// Stored as received; lower-cased only when signing.
    pub service_host: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Keys owned by the typed part of [`Device`]; never duplicated into `extra`.
pub(crate) const DEVICE_FIELDS: &[&str] = &[
    "device_id",
    "signing_key",
    "akey",
    "pkey",
    "registration_code",
    "service_host",
];

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("device_id", &self.device_id)
            .field("signing_key", &"<redacted>")
            .field("activation_key", &"<redacted>")
            .field("credential_id", &self.credential_id)
            .field("registration_code", &self.registration_code)
            .field("service_host", &self.service_host)
            .field("extra", &self.extra)
            .finish()
    }
}

/// Public view of a device, safe to hand to the management API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSummary {
    pub device_id: String,
    pub service_host: String,
    pub pkey: String,
    pub registration_code: String,
}

impl From<&Device> for DeviceSummary {
    fn from(d: &Device) -> Self {
        Self {
            device_id: d.device_id.clone(),
            service_host: d.service_host.clone(),
            pkey: d.credential_id.clone(),
            registration_code: d.registration_code.clone(),
        }
    }
}

/// A pending authentication request. Lives for one poll-and-respond cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Challenge {
    #[serde(rename = "urgid")]
    pub id: String,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

/// Decoded `<shortCode>-<hostToken>` activation code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationCode {
    pub short_code: String,
    pub host: String,
}

/// Body of `POST /api/devices`.
#[derive(Debug, Deserialize)]
pub struct RegisterReq {
    pub device_id: String,
    pub code: String,
}
