// src/signer.rs
//! Authorization header for signed device requests:
//! `Basic base64(pkey + ":" + base64(rsa_sha512(canonical)))`.

use base64::{engine::general_purpose::STANDARD as B64, Engine};
use rsa::signature::{SignatureEncoding, Signer};

use crate::canon::{canonical_message, Params};
use crate::error::{Error, Result};
use crate::keys;
use crate::types::Device;

pub fn sign(
    device: &Device,
    method: &str,
    path: &str,
    timestamp: &str,
    params: &Params,
) -> Result<String> {
    let key = keys::reencode_for_signing(&device.signing_key)?;
    let message = canonical_message(timestamp, method, &device.service_host, path, params);
    let sig = key
        .try_sign(message.as_bytes())
        .map_err(|e| Error::KeyFormat(e.to_string()))?;
    let credential = format!("{}:{}", device.credential_id, B64.encode(sig.to_bytes()));
    Ok(format!("Basic {}", B64.encode(credential)))
}
