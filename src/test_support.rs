//! In-memory stand-ins for the hub and the weather provider, shared by the
//! unit tests of several modules.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use anyhow::Result;
use axum::Router;
use chrono::{Duration, TimeZone, Utc};
use tokio::sync::Notify;

use crate::{
    hub::{
        models::{CapabilityState, Device},
        CapabilityListener, HubApi, HubError, LoggedValue, Subscription,
    },
    sensors::DeviceRole,
    weather::{DailyForecast, ForecastDocument, ForecastSource},
};

/// Serve `router` on an ephemeral localhost port and return its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// A server that accepts connections and never answers.
pub async fn serve_silent() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{addr}")
}

pub fn devices() -> HashMap<DeviceRole, String> {
    HashMap::from([
        (DeviceRole::Indoor, "indoor-1".to_owned()),
        (DeviceRole::Outdoor, "outdoor-1".to_owned()),
    ])
}

/// `n` consecutive days starting 2026-10-19; day `i` has a maximum of
/// `10 + i + 0.04` °C so entries can be told apart.
pub fn forecast_doc(n: usize) -> ForecastDocument {
    let start = Utc.with_ymd_and_hms(2026, 10, 18, 22, 0, 0).unwrap();
    ForecastDocument {
        days: (0..n)
            .map(|i| DailyForecast {
                timestamp: start + Duration::days(i as i64),
                icon: "clear-day".into(),
                temperature_min: 2.0 + i as f64,
                temperature_max: 10.04 + i as f64,
                humidity: 0.5,
                precip_probability: 0.25,
                moon_phase: Some(0.5),
            })
            .collect(),
        location: Some("Hamburg".into()),
    }
}

// ---------------------------------------------------------------------------
// MockHub
// ---------------------------------------------------------------------------

type Key = (String, String);

#[derive(Default)]
pub struct MockHub {
    devices: Mutex<HashMap<String, Device>>,
    logs: Mutex<HashMap<Key, LoggedValue>>,
    failing_logs: Mutex<HashSet<Key>>,
    listeners: Arc<Mutex<HashMap<u64, (Key, CapabilityListener)>>>,
    next_listener: AtomicU64,
    log_lookups: AtomicUsize,
}

impl MockHub {
    /// Indoor and outdoor devices with one value per displayed capability,
    /// mirrored in the insight logs.
    pub fn with_defaults() -> Self {
        let hub = Self::default();
        hub.add_device(
            "indoor-1",
            &[
                ("measure_temperature", 21.4, "°C"),
                ("measure_co2", 640.0, "ppm"),
                ("measure_humidity", 48.0, "%"),
                ("measure_noise", 38.0, "dB"),
            ],
        );
        hub.add_device(
            "outdoor-1",
            &[("measure_temperature", 7.25, "°C"), ("measure_humidity", 81.0, "%")],
        );
        hub
    }

    pub fn add_device(&self, id: &str, caps: &[(&str, f64, &str)]) {
        let capabilities = caps
            .iter()
            .map(|(cap, value, units)| {
                (
                    cap.to_string(),
                    CapabilityState {
                        value: Some(*value),
                        units: Some(units.to_string()),
                    },
                )
            })
            .collect();
        self.devices.lock().unwrap().insert(
            id.to_owned(),
            Device {
                id: id.to_owned(),
                name: format!("Mock {id}"),
                capabilities,
            },
        );

        let mut logs = self.logs.lock().unwrap();
        for (cap, value, units) in caps {
            logs.insert(
                (id.to_owned(), cap.to_string()),
                LoggedValue {
                    value: *value,
                    units: Some(units.to_string()),
                },
            );
        }
    }

    pub fn fail_log(&self, device_id: &str, capability: &str) {
        self.failing_logs
            .lock()
            .unwrap()
            .insert((device_id.to_owned(), capability.to_owned()));
    }

    /// Deliver a change notification to every matching listener.
    pub fn emit(&self, device_id: &str, capability: &str, value: f64) {
        let key = (device_id.to_owned(), capability.to_owned());
        let matching: Vec<CapabilityListener> = self
            .listeners
            .lock()
            .unwrap()
            .values()
            .filter(|(k, _)| *k == key)
            .map(|(_, l)| l.clone())
            .collect();
        for listener in matching {
            listener(value);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }

    pub fn log_lookups(&self) -> usize {
        self.log_lookups.load(Ordering::SeqCst)
    }
}

impl HubApi for MockHub {
    async fn get_device(&self, device_id: &str) -> Result<Device> {
        self.devices
            .lock()
            .unwrap()
            .get(device_id)
            .cloned()
            .ok_or_else(|| HubError::DeviceNotFound(device_id.to_owned()).into())
    }

    async fn latest_log_value(&self, device_id: &str, capability: &str) -> Result<LoggedValue> {
        self.log_lookups.fetch_add(1, Ordering::SeqCst);
        let key = (device_id.to_owned(), capability.to_owned());
        if self.failing_logs.lock().unwrap().contains(&key) {
            anyhow::bail!("connection reset by hub");
        }
        self.logs.lock().unwrap().get(&key).cloned().ok_or_else(|| {
            HubError::EmptyLog {
                device_id: device_id.to_owned(),
                capability: capability.to_owned(),
            }
            .into()
        })
    }

    fn subscribe(
        &self,
        device_id: &str,
        capability: &str,
        _last_seen: Option<f64>,
        listener: CapabilityListener,
    ) -> Result<Subscription> {
        let id = self.next_listener.fetch_add(1, Ordering::SeqCst);
        self.listeners.lock().unwrap().insert(
            id,
            ((device_id.to_owned(), capability.to_owned()), listener),
        );
        let listeners = self.listeners.clone();
        Ok(Subscription::new(format!("{device_id}/{capability}"), move || {
            listeners.lock().unwrap().remove(&id);
        }))
    }
}

// ---------------------------------------------------------------------------
// MockForecast
// ---------------------------------------------------------------------------

/// Replays scripted results, then keeps returning `fallback`.
pub struct MockForecast {
    script: Mutex<VecDeque<Result<ForecastDocument, String>>>,
    fallback: ForecastDocument,
    gate: Option<Notify>,
    calls: AtomicUsize,
}

impl MockForecast {
    pub fn always(doc: ForecastDocument) -> Self {
        Self::scripted(vec![], doc)
    }

    pub fn scripted(script: Vec<Result<ForecastDocument, String>>, fallback: ForecastDocument) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            gate: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Every fetch blocks until [`MockForecast::release`] is called.
    pub fn gated(doc: ForecastDocument) -> Self {
        Self {
            gate: Some(Notify::new()),
            ..Self::always(doc)
        }
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_waiters();
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ForecastSource for MockForecast {
    async fn fetch_forecast(&self) -> Result<ForecastDocument> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Ok(doc)) => Ok(doc),
            Some(Err(msg)) => Err(anyhow::anyhow!(msg)),
            None => Ok(self.fallback.clone()),
        }
    }
}
