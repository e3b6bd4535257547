pub mod models;
pub mod subscription;

use std::{
    collections::{hash_map::Entry, HashMap},
    fmt,
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    time::Duration,
};

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use tokio::{
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tracing::{debug, warn};

use crate::config::Config;

pub use self::subscription::{Subscription, SubscriptionSet};
use self::models::{Device, LogEntries};

/// Callback invoked with each new capability value.
pub type CapabilityListener = Arc<dyn Fn(f64) + Send + Sync>;

/// Hub-domain failures callers may want to tell apart from transport errors.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("device {0} not found on hub")]
    DeviceNotFound(String),

    #[error("insight log {capability} of device {device_id} has no entries")]
    EmptyLog { device_id: String, capability: String },
}

/// Most recent value of an insight log.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedValue {
    pub value: f64,
    pub units: Option<String>,
}

/// The query surface the dashboard consumes from the hub.
pub trait HubApi: Send + Sync + 'static {
    /// Resolve a device identifier to a snapshot of the device.
    fn get_device(&self, device_id: &str) -> impl Future<Output = Result<Device>> + Send;

    /// Read the most recent entry of a capability's insight log.
    fn latest_log_value(
        &self,
        device_id: &str,
        capability: &str,
    ) -> impl Future<Output = Result<LoggedValue>> + Send;

    /// Register `listener` for changes of one capability.
    ///
    /// `last_seen` is the value the caller already shows; the listener is
    /// only called with values that differ from it. The listener stays
    /// attached until the returned `Subscription` is disposed or dropped.
    fn subscribe(
        &self,
        device_id: &str,
        capability: &str,
        last_seen: Option<f64>,
        listener: CapabilityListener,
    ) -> Result<Subscription>;
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct HubClient {
    inner: Arc<Inner>,
}

struct Inner {
    http: Client,
    base_url: String,
    token: String,
    /// How often a watched device is re-read to detect changes.
    watch_interval: Duration,
    /// One polling task per watched device, shared by all its listeners.
    watches: Mutex<HashMap<String, DeviceWatch>>,
    next_watcher: AtomicU64,
}

impl fmt::Debug for Inner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inner")
            .field("base_url", &self.base_url)
            .field("watch_interval", &self.watch_interval)
            .finish_non_exhaustive()
    }
}

struct DeviceWatch {
    watchers: HashMap<u64, Watcher>,
    task: JoinHandle<()>,
}

struct Watcher {
    capability: String,
    last: Option<f64>,
    listener: CapabilityListener,
}

impl HubClient {
    pub fn new(config: &Config) -> Result<Self> {
        Self::from_parts(
            &config.hub_base_url,
            &config.hub_token,
            Duration::from_secs(config.hub_watch_interval_secs),
            Duration::from_secs(config.hub_timeout_secs),
        )
    }

    /// `timeout` bounds every request, so a hub that stops answering fails
    /// the current refresh instead of stalling later ones.
    pub fn from_parts(
        base_url: &str,
        token: &str,
        watch_interval: Duration,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build hub HTTP client")?;

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                base_url: base_url.trim_end_matches('/').to_owned(),
                token: token.to_owned(),
                watch_interval,
                watches: Mutex::new(HashMap::new()),
                next_watcher: AtomicU64::new(0),
            }),
        })
    }

    async fn fetch_device(&self, device_id: &str) -> Result<Device> {
        let url = format!("{}/api/manager/devices/device/{}", self.inner.base_url, device_id);
        debug!(device_id = %device_id, url = %url, "Fetching hub device");

        let resp = self
            .inner
            .http
            .get(&url)
            .bearer_auth(&self.inner.token)
            .send()
            .await
            .context("Hub get_device request failed")?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(HubError::DeviceNotFound(device_id.to_owned()).into());
        }

        let bytes = resp
            .error_for_status()
            .context("Hub device endpoint returned error status")?
            .bytes()
            .await
            .context("Failed to read hub device response body")?;

        serde_json::from_slice::<Device>(&bytes).context("Failed to deserialize hub device")
    }

    async fn fetch_log(&self, device_id: &str, capability: &str) -> Result<LoggedValue> {
        let url = format!(
            "{}/api/manager/insights/log/homey:device:{}/{}/entries",
            self.inner.base_url, device_id, capability
        );
        debug!(device_id = %device_id, capability = %capability, "Fetching insight log");

        let bytes = self
            .inner
            .http
            .get(&url)
            .bearer_auth(&self.inner.token)
            .send()
            .await
            .context("Hub insight log request failed")?
            .error_for_status()
            .context("Hub insight log endpoint returned error status")?
            .bytes()
            .await
            .context("Failed to read hub insight log response body")?;

        let entries = serde_json::from_slice::<LogEntries>(&bytes)
            .context("Failed to deserialize hub insight log")?;

        match entries.latest().and_then(|e| e.v) {
            Some(value) => Ok(LoggedValue {
                value,
                units: entries.units.clone(),
            }),
            None => Err(HubError::EmptyLog {
                device_id: device_id.to_owned(),
                capability: capability.to_owned(),
            }
            .into()),
        }
    }

    fn watches(&self) -> MutexGuard<'_, HashMap<String, DeviceWatch>> {
        self.inner
            .watches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Re-read `device_id` every watch interval and notify the listeners
    /// whose capability changed. A failed read is logged and retried on the
    /// next tick.
    async fn watch_device(self, device_id: String) {
        let mut ticker = time::interval(self.inner.watch_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let device = match self.fetch_device(&device_id).await {
                Ok(d) => d,
                Err(e) => {
                    warn!(device_id = %device_id, error = %format!("{e:#}"), "Device watch failed");
                    continue;
                }
            };
            // Listeners run outside the lock; one may dispose its own subscription.
            for (listener, value) in self.changed_values(&device_id, &device) {
                listener(value);
            }
        }
    }

    fn changed_values(&self, device_id: &str, device: &Device) -> Vec<(CapabilityListener, f64)> {
        let mut watches = self.watches();
        let Some(watch) = watches.get_mut(device_id) else {
            return Vec::new();
        };
        watch
            .watchers
            .values_mut()
            .filter_map(|w| {
                let value = device.capabilities.get(&w.capability)?.value?;
                if w.last == Some(value) {
                    return None;
                }
                w.last = Some(value);
                Some((w.listener.clone(), value))
            })
            .collect()
    }

    fn unwatch(&self, device_id: &str, watcher_id: u64) {
        let mut watches = self.watches();
        let Some(watch) = watches.get_mut(device_id) else {
            return;
        };
        watch.watchers.remove(&watcher_id);
        if watch.watchers.is_empty() {
            if let Some(watch) = watches.remove(device_id) {
                watch.task.abort();
                debug!(device_id = %device_id, "Device watch stopped");
            }
        }
    }

    #[cfg(test)]
    fn watched_devices(&self) -> usize {
        self.watches().len()
    }
}

impl HubApi for HubClient {
    async fn get_device(&self, device_id: &str) -> Result<Device> {
        self.fetch_device(device_id).await
    }

    async fn latest_log_value(&self, device_id: &str, capability: &str) -> Result<LoggedValue> {
        self.fetch_log(device_id, capability).await
    }

    /// Joins the device's watch, starting it for the first listener.
    fn subscribe(
        &self,
        device_id: &str,
        capability: &str,
        last_seen: Option<f64>,
        listener: CapabilityListener,
    ) -> Result<Subscription> {
        let watcher_id = self.inner.next_watcher.fetch_add(1, Ordering::Relaxed);
        let watcher = Watcher {
            capability: capability.to_owned(),
            last: last_seen,
            listener,
        };

        match self.watches().entry(device_id.to_owned()) {
            Entry::Occupied(mut e) => {
                e.get_mut().watchers.insert(watcher_id, watcher);
            }
            Entry::Vacant(e) => {
                let task = tokio::spawn(self.clone().watch_device(device_id.to_owned()));
                debug!(device_id = %device_id, "Device watch started");
                e.insert(DeviceWatch {
                    watchers: HashMap::from([(watcher_id, watcher)]),
                    task,
                });
            }
        }

        let client = self.clone();
        let device = device_id.to_owned();
        Ok(Subscription::new(
            format!("{device_id}/{capability}"),
            move || client.unwatch(&device, watcher_id),
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::{
        extract::Path, http::StatusCode, response::IntoResponse, routing::get, Json, Router,
    };
    use serde_json::json;
    use tokio::sync::mpsc;

    use super::*;
    use crate::test_support::{serve, serve_silent};

    fn client(base: &str) -> HubClient {
        HubClient::from_parts(base, "secret", Duration::from_millis(20), Duration::from_secs(2)).unwrap()
    }

    async fn recv(rx: &mut mpsc::UnboundedReceiver<(&'static str, f64)>) -> (&'static str, f64) {
        time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("no notification")
            .expect("listener dropped")
    }

    fn sender(
        tx: &mpsc::UnboundedSender<(&'static str, f64)>,
        capability: &'static str,
    ) -> CapabilityListener {
        let tx = tx.clone();
        Arc::new(move |v: f64| {
            let _ = tx.send((capability, v));
        })
    }

    #[tokio::test]
    async fn get_device_parses_snapshot() {
        let router = Router::new().route(
            "/api/manager/devices/device/{id}",
            get(|Path(id): Path<String>| async move {
                Json(json!({
                    "id": id,
                    "name": "Outdoor",
                    "capabilitiesObj": { "measure_temperature": { "value": 7.25, "units": "°C" } }
                }))
            }),
        );
        let base = serve(router).await;

        let device = client(&base).get_device("dev-1").await.unwrap();
        assert_eq!(device.id, "dev-1");
        assert_eq!(device.capabilities["measure_temperature"].value, Some(7.25));
    }

    #[tokio::test]
    async fn get_device_maps_404_to_not_found() {
        let router = Router::new().route(
            "/api/manager/devices/device/{id}",
            get(|| async { StatusCode::NOT_FOUND }),
        );
        let base = serve(router).await;

        let err = client(&base).get_device("missing").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HubError>(),
            Some(HubError::DeviceNotFound(id)) if id == "missing"
        ));
    }

    #[tokio::test]
    async fn latest_log_value_takes_newest_entry() {
        let router = Router::new().route(
            "/api/manager/insights/log/{uri}/{cap}/entries",
            get(|Path((uri, cap)): Path<(String, String)>| async move {
                assert_eq!(uri, "homey:device:dev-1");
                assert_eq!(cap, "measure_humidity");
                Json(json!({
                    "units": "%",
                    "values": [ { "t": "a", "v": 40.0 }, { "t": "b", "v": 42.0 } ]
                }))
            }),
        );
        let base = serve(router).await;

        let v = client(&base)
            .latest_log_value("dev-1", "measure_humidity")
            .await
            .unwrap();
        assert_eq!(v, LoggedValue { value: 42.0, units: Some("%".into()) });
    }

    #[tokio::test]
    async fn latest_log_value_empty_log_errors() {
        let router = Router::new().route(
            "/api/manager/insights/log/{uri}/{cap}/entries",
            get(|| async { Json(json!({ "values": [] })) }),
        );
        let base = serve(router).await;

        let err = client(&base)
            .latest_log_value("dev-1", "measure_co2")
            .await
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<HubError>(), Some(HubError::EmptyLog { .. })));
    }

    #[tokio::test]
    async fn subscribe_delivers_changes_until_disposed() {
        let hits = Arc::new(AtomicUsize::new(0));
        let router = {
            let hits = hits.clone();
            Router::new().route(
                "/api/manager/devices/device/{id}",
                get(move || {
                    let n = hits.fetch_add(1, Ordering::SeqCst);
                    async move {
                        let value = if n < 2 { 20.0 } else { 21.5 };
                        Json(json!({
                            "id": "dev-1",
                            "capabilitiesObj": { "measure_temperature": { "value": value, "units": "°C" } }
                        }))
                    }
                }),
            )
        };
        let base = serve(router).await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let sub = client(&base)
            .subscribe("dev-1", "measure_temperature", None, sender(&tx, "temperature"))
            .unwrap();

        assert_eq!(recv(&mut rx).await, ("temperature", 20.0));
        assert_eq!(recv(&mut rx).await, ("temperature", 21.5));

        sub.dispose();
        time::sleep(Duration::from_millis(60)).await;
        let settled = hits.load(Ordering::SeqCst);
        time::sleep(Duration::from_millis(120)).await;
        assert_eq!(hits.load(Ordering::SeqCst), settled, "watch kept polling after dispose");
    }

    #[tokio::test]
    async fn subscribe_shares_one_watch_per_device() {
        let hits = Arc::new(AtomicUsize::new(0));
        let router = {
            let hits = hits.clone();
            Router::new().route(
                "/api/manager/devices/device/{id}",
                get(move || {
                    let n = hits.fetch_add(1, Ordering::SeqCst);
                    async move {
                        let temperature = if n < 3 { 20.0 } else { 22.0 };
                        Json(json!({
                            "id": "dev-1",
                            "capabilitiesObj": {
                                "measure_temperature": { "value": temperature, "units": "°C" },
                                "measure_humidity": { "value": 50.0, "units": "%" }
                            }
                        }))
                    }
                }),
            )
        };
        let base = serve(router).await;
        let hub = client(&base);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let temperature = hub
            .subscribe("dev-1", "measure_temperature", Some(20.0), sender(&tx, "temperature"))
            .unwrap();
        let humidity = hub
            .subscribe("dev-1", "measure_humidity", Some(50.0), sender(&tx, "humidity"))
            .unwrap();
        assert_eq!(hub.watched_devices(), 1);

        // Values already shown are not re-sent; only the later change is.
        assert_eq!(recv(&mut rx).await, ("temperature", 22.0));
        assert!(hits.load(Ordering::SeqCst) >= 4);
        assert!(rx.try_recv().is_err());

        temperature.dispose();
        assert_eq!(hub.watched_devices(), 1);
        humidity.dispose();
        assert_eq!(hub.watched_devices(), 0);
    }

    #[tokio::test]
    async fn subscribe_keeps_watching_after_failed_fetch() {
        let hits = Arc::new(AtomicUsize::new(0));
        let router = {
            let hits = hits.clone();
            Router::new().route(
                "/api/manager/devices/device/{id}",
                get(move || {
                    let n = hits.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if n < 2 {
                            return StatusCode::SERVICE_UNAVAILABLE.into_response();
                        }
                        Json(json!({
                            "id": "dev-1",
                            "capabilitiesObj": { "measure_co2": { "value": 712.0, "units": "ppm" } }
                        }))
                        .into_response()
                    }
                }),
            )
        };
        let base = serve(router).await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let _sub = client(&base)
            .subscribe("dev-1", "measure_co2", Some(640.0), sender(&tx, "co2"))
            .unwrap();

        assert_eq!(recv(&mut rx).await, ("co2", 712.0));
        assert!(hits.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test]
    async fn silent_hub_request_times_out() {
        let base = serve_silent().await;
        let hub = HubClient::from_parts(&base, "secret", Duration::from_secs(1), Duration::from_millis(100)).unwrap();

        let err = time::timeout(Duration::from_secs(2), hub.latest_log_value("dev-1", "measure_co2"))
            .await
            .expect("request was not bounded by the client timeout")
            .unwrap_err();
        assert!(format!("{err:#}").contains("insight log request failed"));
    }
}
