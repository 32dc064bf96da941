// src/poller.rs
//! Periodic challenge discovery and auto-approval across all devices.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::client::ServiceClient;
use crate::error::Error;
use crate::store::DeviceRepository;
use crate::transactions::{list_challenges, ChallengeResponder, APPROVE};
use crate::types::Device;

/// Drives the poll loop. Returning false stops it.
#[async_trait]
pub trait Ticker: Send {
    async fn tick(&mut self) -> bool;
}

pub struct IntervalTicker(Interval);

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        let mut iv = interval(period);
        iv.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self(iv)
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) -> bool {
        self.0.tick().await;
        true
    }
}

#[derive(Debug)]
pub struct ChallengeOutcome {
    pub challenge_id: String,
    pub reply: Result<Value, Error>,
}

#[derive(Debug)]
pub enum PollOutcome {
    ChallengesFound(Vec<ChallengeOutcome>),
    NoChallenges,
    Failed(Error),
}

#[derive(Debug)]
pub struct DeviceOutcome {
    pub device_id: String,
    pub outcome: PollOutcome,
}

/// One entry per device of the snapshot the tick started with.
#[derive(Debug, Default)]
pub struct TickReport {
    pub devices: Vec<DeviceOutcome>,
}

impl TickReport {
    pub fn failed(&self) -> usize {
        self.devices
            .iter()
            .filter(|d| matches!(d.outcome, PollOutcome::Failed(_)))
            .count()
    }

    pub fn approved(&self) -> usize {
        self.devices
            .iter()
            .map(|d| match &d.outcome {
                PollOutcome::ChallengesFound(cs) => cs.iter().filter(|c| c.reply.is_ok()).count(),
                _ => 0,
            })
            .sum()
    }
}

pub struct ChallengePoller {
    store: Arc<dyn DeviceRepository>,
    client: ServiceClient,
    responder: ChallengeResponder,
}

impl ChallengePoller {
    pub fn new(store: Arc<dyn DeviceRepository>, client: ServiceClient) -> Self {
        Self {
            store,
            responder: ChallengeResponder::new(client.clone()),
            client,
        }
    }

    pub async fn run<T: Ticker>(&self, mut ticker: T) {
        while ticker.tick().await {
            let report = self.tick().await;
            if report.failed() > 0 {
                info!(
                    devices = report.devices.len(),
                    approved = report.approved(),
                    failed = report.failed(),
                    "tick done with failing devices"
                );
            } else if report.approved() > 0 {
                debug!(
                    devices = report.devices.len(),
                    approved = report.approved(),
                    failed = report.failed(),
                    "tick done"
                );
            }
        }
    }

    /// Processes every device in the current snapshot, one after another.
    /// Never fails; per-device errors land in the report.
    pub async fn tick(&self) -> TickReport {
        let devices = match self.store.list().await {
            Ok(devices) => devices,
            Err(e) => {
                error!("device list unavailable: {e}");
                return TickReport::default();
            }
        };

        let mut report = TickReport::default();
        for device in devices {
            let outcome = self.poll_device(&device).await;
            report.devices.push(DeviceOutcome {
                device_id: device.device_id,
                outcome,
            });
        }
        report
    }

    async fn poll_device(&self, device: &Device) -> PollOutcome {
        let challenges = match list_challenges(&self.client, device).await {
            Ok(challenges) => challenges,
            Err(e) => {
                error!(device_id = %device.device_id, "challenge poll failed: {e}");
                return PollOutcome::Failed(e);
            }
        };
        if challenges.is_empty() {
            debug!(device_id = %device.device_id, "no pending challenges");
            return PollOutcome::NoChallenges;
        }

        let mut outcomes = Vec::with_capacity(challenges.len());
        for challenge in challenges {
            info!(device_id = %device.device_id, challenge_id = %challenge.id, "approving challenge");
            let reply = self.responder.respond(device, &challenge.id, APPROVE).await;
            if let Err(e) = &reply {
                error!(device_id = %device.device_id, challenge_id = %challenge.id, "approval failed: {e}");
            }
            outcomes.push(ChallengeOutcome {
                challenge_id: challenge.id,
                reply,
            });
        }
        PollOutcome::ChallengesFound(outcomes)
    }
}
