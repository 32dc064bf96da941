// src/activation.rs
//! One-time device registration handshake.

use base64::{engine::general_purpose::STANDARD as B64, Engine};
use reqwest::Method;
use serde_json::{Map, Value};
use tracing::info;

use crate::canon::Params;
use crate::client::ServiceClient;
use crate::error::{Error, Result};
use crate::keys::{self, KeyPair};
use crate::types::{ActivationCode, Device, DEVICE_FIELDS};

pub const CUSTOMER_PROTOCOL: &str = "1";
pub const PKPUSH: &str = "rsa-sha512";
const SUCCESS: &str = "OK";

/// Fingerprint parameters presented at activation.
#[derive(Debug, Clone)]
pub struct DeviceProfile {
    pub jailbroken: String,
    pub architecture: String,
    pub region: String,
    pub app_id: String,
    pub full_disk_encryption: String,
    pub passcode_status: String,
    pub platform: String,
    pub app_version: String,
    pub app_build_number: String,
    pub version: String,
    pub manufacturer: String,
    pub language: String,
    pub model: String,
    pub security_patch_level: String,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            jailbroken: "false".into(),
            architecture: "arm64".into(),
            region: "US".into(),
            app_id: "com.duosecurity.duomobile".into(),
            full_disk_encryption: "true".into(),
            passcode_status: "true".into(),
            platform: "Android".into(),
            app_version: "4.33.0".into(),
            app_build_number: "433000".into(),
            version: "13".into(),
            manufacturer: "Google".into(),
            language: "en".into(),
            model: "Pixel 7".into(),
            security_patch_level: "2023-06-05".into(),
        }
    }
}

impl DeviceProfile {
    fn append_to(&self, params: &mut Params) {
        params.push("jailbroken", &self.jailbroken);
        params.push("architecture", &self.architecture);
        params.push("region", &self.region);
        params.push("app_id", &self.app_id);
        params.push("full_disk_encryption", &self.full_disk_encryption);
        params.push("passcode_status", &self.passcode_status);
        params.push("platform", &self.platform);
        params.push("app_version", &self.app_version);
        params.push("app_build_number", &self.app_build_number);
        params.push("version", &self.version);
        params.push("manufacturer", &self.manufacturer);
        params.push("language", &self.language);
        params.push("model", &self.model);
        params.push("security_patch_level", &self.security_patch_level);
    }
}

/// Splits `<shortCode>-<hostToken>` (optionally in angle brackets) and
/// decodes the host token, restoring stripped base64 padding first.
pub fn parse_activation_code(code: &str) -> Result<ActivationCode> {
    let code = code.trim();
    let code = code
        .strip_prefix('<')
        .and_then(|c| c.strip_suffix('>'))
        .unwrap_or(code);

    let (short_code, token) = code
        .split_once('-')
        .ok_or_else(|| Error::CodeFormat("missing '-' separator".into()))?;
    if short_code.is_empty() || token.is_empty() {
        return Err(Error::CodeFormat("empty code component".into()));
    }

    let bytes = B64
        .decode(restore_padding(token))
        .map_err(|e| Error::CodeFormat(format!("host token: {e}")))?;
    if !bytes.is_ascii() {
        return Err(Error::CodeFormat("host token is not ASCII".into()));
    }
    let host = String::from_utf8(bytes).map_err(|e| Error::CodeFormat(e.to_string()))?;

    Ok(ActivationCode {
        short_code: short_code.to_string(),
        host,
    })
}

pub fn restore_padding(token: &str) -> String {
    let mut padded = token.to_string();
    while padded.len() % 4 != 0 {
        padded.push('=');
    }
    padded
}

pub struct ActivationClient {
    client: ServiceClient,
    profile: DeviceProfile,
}

impl ActivationClient {
    pub fn new(client: ServiceClient, profile: DeviceProfile) -> Self {
        Self { client, profile }
    }

    pub fn activation_params(&self, public_pem: &str) -> Params {
        let mut params = Params::new()
            .with("customer_protocol", CUSTOMER_PROTOCOL)
            .with("pubkey", public_pem.trim())
            .with("pkpush", PKPUSH);
        self.profile.append_to(&mut params);
        params
    }

    /// Submits the public key and fingerprint, then merges the reply with the
    /// local key and caller identifiers. The returned device is complete.
    pub async fn activate(
        &self,
        code: &ActivationCode,
        keypair: &KeyPair,
        device_id: &str,
    ) -> Result<Device> {
        let public_pem = keys::export_public(&keypair.public)?;
        let path = format!("/push/v2/activation/{}", code.short_code);
        let params = self.activation_params(&public_pem);

        let reply = self
            .client
            .send_unsigned(Method::POST, &code.host, &path, &params)
            .await?;
        let fields = unwrap_reply(reply)?;
        let device = merge(fields, keypair, code, device_id)?;
        info!(device_id = %device.device_id, host = %device.service_host, "device activated");
        Ok(device)
    }

    /// Parses the code, generates a keypair off the async runtime and activates.
    pub async fn register(&self, code: &str, device_id: &str) -> Result<Device> {
        let code = parse_activation_code(code)?;
        let keypair = tokio::task::spawn_blocking(keys::generate_keypair)
            .await
            .map_err(|e| Error::KeyGeneration(e.to_string()))??;
        self.activate(&code, &keypair, device_id).await
    }
}

fn unwrap_reply(reply: Value) -> Result<Map<String, Value>> {
    let Value::Object(mut top) = reply else {
        return Err(Error::Parse("activation reply is not an object".into()));
    };
    let status = top.get("stat").or_else(|| top.get("status")).and_then(Value::as_str);
    if status != Some(SUCCESS) {
        let message = top
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("activation rejected")
            .to_string();
        return Err(Error::activation(message));
    }
    match top.remove("response") {
        Some(Value::Object(inner)) => Ok(inner),
        Some(_) => Err(Error::activation("activation response is not an object")),
        None => {
            top.remove("stat");
            top.remove("status");
            Ok(top)
        }
    }
}

fn merge(
    mut fields: Map<String, Value>,
    keypair: &KeyPair,
    code: &ActivationCode,
    device_id: &str,
) -> Result<Device> {
    let activation_key = take_string(&mut fields, "akey")?;
    let credential_id = take_string(&mut fields, "pkey")?;
    for name in DEVICE_FIELDS {
        fields.remove(*name);
    }
    Ok(Device {
        device_id: device_id.to_string(),
        signing_key: keypair.private_pem.clone(),
        activation_key,
        credential_id,
        registration_code: code.short_code.clone(),
        service_host: code.host.clone(),
        extra: fields,
    })
}

fn take_string(fields: &mut Map<String, Value>, name: &str) -> Result<String> {
    match fields.remove(name) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s),
        _ => Err(Error::activation(format!("activation reply missing {name}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_unpadded_host_token() {
        let code = parse_activation_code("ABCDEFGH-SGVsbG8").unwrap();
        assert_eq!(code.short_code, "ABCDEFGH");
        assert_eq!(code.host, "Hello");
    }

    #[test]
    fn strips_angle_brackets() {
        let token = B64.encode("api-1234abcd.duosecurity.com");
        let raw = format!("<XYZ123-{}>", token.trim_end_matches('='));
        let code = parse_activation_code(&raw).unwrap();
        assert_eq!(code.short_code, "XYZ123");
        assert_eq!(code.host, "api-1234abcd.duosecurity.com");
    }

    #[test]
    fn padded_token_still_decodes() {
        let code = parse_activation_code("ABC-SGVsbG8=").unwrap();
        assert_eq!(code.host, "Hello");
    }

    #[test]
    fn truncated_encodings_roundtrip() {
        for host in ["a", "ab", "abc", "abcd", "api-xyz.example.com", "API-Host.Example.COM"] {
            let token = B64.encode(host);
            let stripped = token.trim_end_matches('=');
            let code = parse_activation_code(&format!("C0DE-{stripped}")).unwrap();
            assert_eq!(code.host, host);
        }
    }

    #[test]
    fn missing_separator_is_code_format_error() {
        let err = parse_activation_code("ABCDEFGHSGVsbG8").unwrap_err();
        assert!(matches!(err, Error::CodeFormat(_)));
    }

    #[test]
    fn invalid_base64_is_code_format_error() {
        let err = parse_activation_code("ABC-!!!!").unwrap_err();
        assert!(matches!(err, Error::CodeFormat(_)));
        let err = parse_activation_code("ABC-S").unwrap_err();
        assert!(matches!(err, Error::CodeFormat(_)));
    }

    #[test]
    fn padding_restored_to_multiple_of_four() {
        assert_eq!(restore_padding("SGVsbG8"), "SGVsbG8=");
        assert_eq!(restore_padding("YQ"), "YQ==");
        assert_eq!(restore_padding("YWJj"), "YWJj");
    }

    #[test]
    fn failed_status_surfaces_message() {
        let err = unwrap_reply(json!({"status": "FAIL", "message": "invalid code"})).unwrap_err();
        match err {
            Error::Activation { message } => assert_eq!(message, "invalid code"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn stat_takes_precedence_over_status() {
        let err = unwrap_reply(json!({"stat": "FAIL", "status": "OK", "message": "expired"}))
            .unwrap_err();
        assert!(matches!(err, Error::Activation { .. }));

        let fields = unwrap_reply(json!({"stat": "OK", "status": "FAIL", "akey": "A"})).unwrap();
        assert_eq!(fields.get("akey"), Some(&json!("A")));
    }

    #[test]
    fn nested_response_is_unwrapped() {
        let fields =
            unwrap_reply(json!({"stat": "OK", "response": {"akey": "A", "pkey": "P"}})).unwrap();
        assert_eq!(fields.get("akey"), Some(&json!("A")));
    }

    #[test]
    fn flat_response_is_accepted() {
        let fields = unwrap_reply(json!({"status": "OK", "akey": "A", "pkey": "P"})).unwrap();
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn activation_params_order() {
        let client = ActivationClient::new(
            ServiceClient::new(&Default::default()).unwrap(),
            DeviceProfile::default(),
        );
        let params = client.activation_params("\n-----BEGIN PUBLIC KEY-----\nAAA\n-----END PUBLIC KEY-----\n\n");
        let keys: Vec<&str> = params.iter().map(|(k, _)| k).collect();
        assert_eq!(&keys[..3], &["customer_protocol", "pubkey", "pkpush"]);
        assert_eq!(keys.len(), 17);
        let (_, pubkey) = params.iter().nth(1).unwrap();
        assert_eq!(pubkey, "-----BEGIN PUBLIC KEY-----\nAAA\n-----END PUBLIC KEY-----");
    }
}
