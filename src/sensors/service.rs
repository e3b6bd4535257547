use std::{collections::HashMap, sync::Arc};

use anyhow::{Context, Result};
use futures::future::try_join_all;
use tracing::{info, warn};

use super::{DeviceRole, SensorChannel, SensorReading};
use crate::{
    display::{StateHandle, Update},
    hub::{models::Device, HubApi, SubscriptionSet},
};

fn device_id(devices: &HashMap<DeviceRole, String>, role: DeviceRole) -> Result<&str> {
    devices
        .get(&role)
        .map(String::as_str)
        .with_context(|| format!("no hub device configured for the {role} role"))
}

// ---------------------------------------------------------------------------
// Push
// ---------------------------------------------------------------------------

/// Reads live capability snapshots once and then follows hub change
/// notifications.
pub struct PushSensorSource<H> {
    hub: Arc<H>,
    devices: HashMap<DeviceRole, String>,
}

impl<H: HubApi> PushSensorSource<H> {
    pub fn new(hub: Arc<H>, devices: HashMap<DeviceRole, String>) -> Self {
        Self { hub, devices }
    }

    /// Publish the current snapshot of every channel, then attach one
    /// listener per channel.
    ///
    /// The returned set must be kept alive for as long as updates are
    /// wanted; dropping it detaches every listener. If attaching fails
    /// part-way, listeners attached so far are detached before returning.
    pub async fn attach(&self, state: &StateHandle) -> Result<SubscriptionSet> {
        let mut devices: HashMap<DeviceRole, Device> = HashMap::new();
        for role in DeviceRole::ALL {
            let id = device_id(&self.devices, role)?;
            let device = self
                .hub
                .get_device(id)
                .await
                .with_context(|| format!("Failed to resolve {role} device {id}"))?;
            info!(role = %role, device_id = %id, name = %device.name, "Hub device resolved");
            devices.insert(role, device);
        }

        let mut initial = Vec::with_capacity(SensorChannel::ALL.len());
        let mut shown: HashMap<SensorChannel, (String, Option<f64>)> = HashMap::new();
        for channel in SensorChannel::ALL {
            let device = &devices[&channel.role()];
            let snapshot = device.capabilities.get(channel.capability());
            let value = snapshot.and_then(|c| c.value);
            let reading = SensorReading::new(
                channel,
                value.unwrap_or_default(),
                snapshot.and_then(|c| c.units.as_deref()),
            );
            shown.insert(channel, (reading.units.clone(), value));
            if value.is_some() {
                initial.push((channel, reading));
            } else {
                warn!(
                    channel = %channel,
                    device_id = %device.id,
                    "No initial value; waiting for first change notification"
                );
            }
        }
        state.publish(Update::Readings(initial));

        let mut subs = SubscriptionSet::new();
        for channel in SensorChannel::ALL {
            let id = device_id(&self.devices, channel.role())?;
            let state = state.clone();
            let (units, last_seen) = shown.remove(&channel).unwrap_or_default();
            let sub = self.hub.subscribe(
                id,
                channel.capability(),
                last_seen,
                Arc::new(move |value: f64| {
                    state.publish(Update::Reading(
                        channel,
                        SensorReading {
                            value,
                            units: units.clone(),
                        },
                    ));
                }),
            )?;
            subs.push(sub);
        }
        info!(listeners = subs.len(), "Capability listeners attached");

        Ok(subs)
    }
}

// ---------------------------------------------------------------------------
// Pull
// ---------------------------------------------------------------------------

/// Reads the latest insight-log entry of every channel on demand.
pub struct PullSensorSource<H> {
    hub: Arc<H>,
    devices: HashMap<DeviceRole, String>,
}

impl<H: HubApi> PullSensorSource<H> {
    pub fn new(hub: Arc<H>, devices: HashMap<DeviceRole, String>) -> Self {
        Self { hub, devices }
    }

    /// Look up every channel concurrently. Any failed lookup fails the
    /// whole batch.
    pub async fn fetch_all(&self) -> Result<Vec<(SensorChannel, SensorReading)>> {
        let lookups = SensorChannel::ALL.into_iter().map(|channel| async move {
            let id = device_id(&self.devices, channel.role())?;
            let logged = self
                .hub
                .latest_log_value(id, channel.capability())
                .await
                .with_context(|| format!("Insight lookup for {channel} failed"))?;
            Ok::<_, anyhow::Error>((
                channel,
                SensorReading::new(channel, logged.value, logged.units.as_deref()),
            ))
        });
        try_join_all(lookups).await
    }

    /// Fetch every channel and publish the batch.
    pub async fn refresh(&self, state: &StateHandle) -> Result<()> {
        let readings = self.fetch_all().await?;
        state.publish(Update::Readings(readings));
        Ok(())
    }
}
