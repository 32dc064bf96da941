#![allow(dead_code)]

use push_approver::{keys::KeyPair, Device, HttpConfig, ServiceClient};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde_json::Map;

pub const DEVICE_KEY: &str = include_str!("../fixtures/device_key.pem");
pub const SERVICE_HOST: &str = "API-1234.Example.com";

pub fn fixture_keypair() -> KeyPair {
    let private = RsaPrivateKey::from_pkcs1_pem(DEVICE_KEY).unwrap();
    KeyPair {
        private_pem: DEVICE_KEY.to_string(),
        public: RsaPublicKey::from(&private),
    }
}

pub fn fixture_public() -> RsaPublicKey {
    fixture_keypair().public
}

pub fn device(id: &str, akey: &str) -> Device {
    Device {
        device_id: id.to_string(),
        signing_key: DEVICE_KEY.to_string(),
        activation_key: akey.to_string(),
        credential_id: format!("PK-{id}"),
        registration_code: "ABCDEFGH".to_string(),
        service_host: SERVICE_HOST.to_string(),
        extra: Map::new(),
    }
}

pub fn client_for(base_url: &str) -> ServiceClient {
    client_with_retries(base_url, 0)
}

pub fn client_with_retries(base_url: &str, poll_retries: u32) -> ServiceClient {
    ServiceClient::new(&HttpConfig {
        base_url: Some(base_url.to_string()),
        request_timeout: Some(std::time::Duration::from_secs(5)),
        poll_retries,
    })
    .unwrap()
}
