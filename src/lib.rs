//! Push-approval agent: registers emulated authenticator devices and
//! auto-approves their pending challenges.

pub mod activation;
pub mod api;
pub mod canon;
pub mod client;
pub mod config;
pub mod error;
pub mod keys;
pub mod poller;
pub mod signer;
pub mod store;
pub mod transactions;
pub mod types;

pub use activation::{parse_activation_code, ActivationClient, DeviceProfile};
pub use client::{HttpConfig, ServiceClient};
pub use error::{Error, Result};
pub use poller::{ChallengePoller, IntervalTicker, PollOutcome, TickReport, Ticker};
pub use store::{DeviceRepository, JsonFileDeviceStore, MemoryDeviceStore};
pub use transactions::ChallengeResponder;
pub use types::{ActivationCode, Challenge, Device};
