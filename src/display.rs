use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Utc};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tracing::{debug, trace};

use crate::{
    clock::{TimeSample, TimeSource},
    scheduler::Liveness,
    sensors::{SensorChannel, SensorReading},
    weather::ForecastDocument,
};

/// A change to the display state, produced by a timer or a hub listener.
#[derive(Debug, Clone)]
pub enum Update {
    Time(TimeSample),
    Reading(SensorChannel, SensorReading),
    Readings(Vec<(SensorChannel, SensorReading)>),
    Forecast(ForecastDocument),
}

/// Everything the view needs, as last known.
#[derive(Debug, Clone, Default)]
pub struct DisplayState {
    pub time: Option<TimeSample>,
    pub readings: BTreeMap<SensorChannel, SensorReading>,
    pub forecast: Option<ForecastDocument>,
    pub time_updated: Option<DateTime<Utc>>,
    pub sensors_updated: Option<DateTime<Utc>>,
    pub forecast_updated: Option<DateTime<Utc>>,
    /// Number of updates applied so far.
    pub revision: u64,
}

impl DisplayState {
    /// Apply one update. Each field is overwritten independently; a forecast
    /// replaces the previous one wholesale.
    pub fn apply(&mut self, update: Update, at: DateTime<Utc>) {
        match update {
            Update::Time(sample) => {
                self.time = Some(sample);
                self.time_updated = Some(at);
            }
            Update::Reading(channel, reading) => {
                self.readings.insert(channel, reading);
                self.sensors_updated = Some(at);
            }
            Update::Readings(batch) => {
                if batch.is_empty() {
                    return;
                }
                self.readings.extend(batch);
                self.sensors_updated = Some(at);
            }
            Update::Forecast(doc) => {
                self.forecast = Some(doc);
                self.forecast_updated = Some(at);
            }
        }
        self.revision += 1;
    }
}

/// Sending side of the display store, handed to every update source.
#[derive(Debug, Clone)]
pub struct StateHandle {
    tx: mpsc::UnboundedSender<Update>,
    liveness: Liveness,
}

impl StateHandle {
    /// Queue an update. Returns `false` (and drops the update) once the
    /// dashboard has been torn down.
    pub fn publish(&self, update: Update) -> bool {
        if !self.liveness.is_alive() {
            debug!("Dashboard torn down; update discarded");
            return false;
        }
        self.tx.send(update).is_ok()
    }
}

/// Single owner of `DisplayState`.
///
/// Updates arrive over an mpsc channel and are applied in arrival order;
/// readers observe snapshots through a `watch` channel.
pub struct DisplayStore;

impl DisplayStore {
    pub fn spawn(
        liveness: Liveness,
        clock: Arc<dyn TimeSource>,
    ) -> (StateHandle, watch::Receiver<DisplayState>, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel::<Update>();
        let (state_tx, state_rx) = watch::channel(DisplayState::default());
        let handle = StateHandle {
            tx,
            liveness: liveness.clone(),
        };

        let task = tokio::spawn(run_reducer(rx, state_tx, liveness, clock));

        (handle, state_rx, task)
    }
}

async fn run_reducer(
    mut rx: mpsc::UnboundedReceiver<Update>,
    state_tx: watch::Sender<DisplayState>,
    liveness: Liveness,
    clock: Arc<dyn TimeSource>,
) {
    while let Some(update) = rx.recv().await {
        if !liveness.is_alive() {
            break;
        }
        trace!(?update, "Applying display update");
        let at = clock.now();
        state_tx.send_modify(|state| state.apply(update, at));
    }
    debug!("Display store stopped");
}
