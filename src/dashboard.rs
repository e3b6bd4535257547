use std::{collections::HashMap, sync::Arc, time::Duration};

use anyhow::Result;
use chrono_tz::Tz;
use tokio::{sync::watch, task::JoinHandle};
use tracing::info;

use crate::{
    clock::{TimeSample, TimeSource},
    config::{Config, HubMode, Lang},
    display::{DisplayState, DisplayStore, Update},
    hub::{HubApi, SubscriptionSet},
    scheduler::{Liveness, Scheduler},
    sensors::{DeviceRole, PullSensorSource, PushSensorSource},
    weather::ForecastSource,
};

/// What the dashboard needs to mount.
#[derive(Debug, Clone)]
pub struct DashboardSettings {
    pub hub_mode: HubMode,
    pub devices: HashMap<DeviceRole, String>,
    pub tz: Tz,
    pub lang: Lang,
    pub time_interval: Duration,
    /// Only used in pull mode.
    pub sensor_interval: Duration,
    pub forecast_interval: Duration,
}

impl From<&Config> for DashboardSettings {
    fn from(config: &Config) -> Self {
        Self {
            hub_mode: config.hub_mode,
            devices: config.hub_devices.clone(),
            tz: config.tz,
            lang: config.lang,
            time_interval: config.time_interval(),
            sensor_interval: config.sensor_interval(),
            forecast_interval: config.forecast_interval(),
        }
    }
}

/// A mounted dashboard: the display store plus everything feeding it.
pub struct Dashboard {
    liveness: Liveness,
    scheduler: Scheduler,
    subscriptions: SubscriptionSet,
    store: JoinHandle<()>,
    display: watch::Receiver<DisplayState>,
}

impl Dashboard {
    /// Start the display store, attach hub listeners (push mode), and start
    /// the refresh timers. Every timer fires once immediately.
    ///
    /// In push mode the initial capability snapshot is published before any
    /// timer is started.
    pub async fn mount<H, W>(
        settings: DashboardSettings,
        hub: Arc<H>,
        weather: Arc<W>,
        clock: Arc<dyn TimeSource>,
    ) -> Result<Self>
    where
        H: HubApi,
        W: ForecastSource,
    {
        let liveness = Liveness::new();
        let (state, display, store) = DisplayStore::spawn(liveness.clone(), clock.clone());

        let subscriptions = match settings.hub_mode {
            HubMode::Push => {
                let source = PushSensorSource::new(hub.clone(), settings.devices.clone());
                match source.attach(&state).await {
                    Ok(subs) => subs,
                    Err(e) => {
                        liveness.cancel();
                        store.abort();
                        return Err(e);
                    }
                }
            }
            HubMode::Pull => SubscriptionSet::new(),
        };

        let mut scheduler = Scheduler::new(liveness.clone());

        {
            let state = state.clone();
            let (tz, lang) = (settings.tz, settings.lang);
            scheduler.every("time", settings.time_interval, move || {
                let sample = TimeSample::at(clock.now(), tz, lang);
                let state = state.clone();
                async move {
                    state.publish(Update::Time(sample));
                    Ok(())
                }
            });
        }

        if settings.hub_mode == HubMode::Pull {
            let source = Arc::new(PullSensorSource::new(hub, settings.devices.clone()));
            let state = state.clone();
            scheduler.every("sensors", settings.sensor_interval, move || {
                let source = source.clone();
                let state = state.clone();
                async move { source.refresh(&state).await }
            });
        }

        scheduler.every("forecast", settings.forecast_interval, move || {
            let weather = weather.clone();
            let state = state.clone();
            async move {
                let doc = weather.fetch_forecast().await?;
                info!(days = doc.days.len(), "Forecast refreshed");
                state.publish(Update::Forecast(doc));
                Ok(())
            }
        });

        info!(
            hub_mode = ?settings.hub_mode,
            timers = ?scheduler.timer_names(),
            listeners = subscriptions.len(),
            "Dashboard mounted"
        );

        Ok(Self {
            liveness,
            scheduler,
            subscriptions,
            store,
            display,
        })
    }

    /// Receiver for display-state snapshots.
    pub fn display(&self) -> watch::Receiver<DisplayState> {
        self.display.clone()
    }

    /// Stop all timers, detach every hub listener, and stop the store.
    /// No display update is applied after this returns.
    pub async fn teardown(self) {
        let Self {
            liveness,
            scheduler,
            mut subscriptions,
            store,
            ..
        } = self;

        liveness.cancel();
        scheduler.shutdown().await;
        let detached = subscriptions.dispose_all();
        store.abort();
        let _ = store.await;

        info!(listeners_detached = detached, "Dashboard torn down");
    }
}
