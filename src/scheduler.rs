use std::{
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::Result;
use tokio::{
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tracing::{debug, info, warn};

/// Shared mounted/torn-down flag of one dashboard.
///
/// Starts alive; once cancelled it never becomes alive again.
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn cancel(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns the repeating refresh timers of one dashboard.
pub struct Scheduler {
    liveness: Liveness,
    timers: Vec<(&'static str, JoinHandle<()>)>,
}

impl Scheduler {
    pub fn new(liveness: Liveness) -> Self {
        Self {
            liveness,
            timers: Vec::new(),
        }
    }

    /// Spawn a timer that runs `action` immediately and then every `period`.
    pub fn every<F, Fut>(&mut self, name: &'static str, period: Duration, action: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        info!(timer = name, period_secs = period.as_secs_f64(), "Refresh timer started");
        let handle = tokio::spawn(run_every(name, period, self.liveness.clone(), action));
        self.timers.push((name, handle));
    }

    pub fn timer_names(&self) -> Vec<&'static str> {
        self.timers.iter().map(|(name, _)| *name).collect()
    }

    /// Cancel the liveness flag and stop every timer, including any
    /// invocation still in flight.
    pub async fn shutdown(self) {
        self.liveness.cancel();
        for (name, handle) in self.timers {
            handle.abort();
            let _ = handle.await;
            debug!(timer = name, "Refresh timer stopped");
        }
    }
}

/// Timer loop: tick, check liveness, run the action, log its failure.
///
/// A failed action leaves previously published values in place; the next
/// tick tries again at the same period.
pub async fn run_every<F, Fut>(name: &'static str, period: Duration, liveness: Liveness, mut action: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if !liveness.is_alive() {
            debug!(timer = name, "Dashboard torn down; timer not re-armed");
            break;
        }
        if let Err(e) = action().await {
            warn!(timer = name, error = %format!("{e:#}"), "Refresh failed; keeping previous values");
        }
    }
}
