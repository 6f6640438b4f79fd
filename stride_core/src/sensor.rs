//! Step sensor binding.
//!
//! Device pedometers are reached through `StepSensor`. `StepTracker` owns
//! one subscription for the active session and forwards every reading into
//! the store; dropping or stopping it releases the subscription.

use crate::{Error, Result, StateStore};
use std::sync::{Arc, Mutex};

/// Callback invoked with the cumulative step count
pub type StepCallback = Box<dyn FnMut(u32) + Send>;

/// A device step counter
pub trait StepSensor {
    fn is_available(&self) -> bool;

    fn subscribe(&self, callback: StepCallback) -> Result<Subscription>;
}

/// Handle to a live sensor subscription
///
/// The callback is released by `unsubscribe()` or on drop, whichever comes first.
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

/// Forwards sensor readings into the store for one session
pub struct StepTracker {
    subscription: Option<Subscription>,
}

impl StepTracker {
    /// Subscribe once if the sensor is available
    ///
    /// An unavailable sensor is not an error: the tracker starts inactive.
    pub fn start<S: StepSensor + ?Sized>(sensor: &S, store: StateStore) -> Result<Self> {
        if !sensor.is_available() {
            tracing::info!("Step sensor unavailable; steps will not update");
            return Ok(Self { subscription: None });
        }

        let subscription = sensor.subscribe(Box::new(move |steps| {
            if let Err(e) = store.set_steps(steps) {
                tracing::warn!("Dropped step reading {}: {}", steps, e);
            }
        }))?;

        tracing::debug!("Step tracker subscribed");
        Ok(Self {
            subscription: Some(subscription),
        })
    }

    pub fn is_active(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn stop(mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
            tracing::debug!("Step tracker unsubscribed");
        }
    }
}

#[derive(Default)]
struct PedometerInner {
    next_id: u64,
    subscribers: Vec<(u64, StepCallback)>,
}

/// In-process step sensor driven by `emit`
///
/// Used by hosts that receive step counts from elsewhere (a companion
/// device, a manual entry) and by tests.
#[derive(Clone)]
pub struct ManualPedometer {
    available: bool,
    inner: Arc<Mutex<PedometerInner>>,
}

impl Default for ManualPedometer {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualPedometer {
    pub fn new() -> Self {
        Self {
            available: true,
            inner: Arc::new(Mutex::new(PedometerInner::default())),
        }
    }

    /// A pedometer that reports itself as missing
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Deliver a reading to every live subscriber. Returns how many received it.
    ///
    /// Callbacks run while the subscriber list is locked and must not subscribe.
    pub fn emit(&self, steps: u32) -> usize {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        for (_, callback) in inner.subscribers.iter_mut() {
            callback(steps);
        }
        inner.subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .lock()
            .map(|inner| inner.subscribers.len())
            .unwrap_or(0)
    }
}

impl StepSensor for ManualPedometer {
    fn is_available(&self) -> bool {
        self.available
    }

    fn subscribe(&self, callback: StepCallback) -> Result<Subscription> {
        if !self.available {
            return Err(Error::State("pedometer is not available".into()));
        }

        let id = {
            let mut inner = self
                .inner
                .lock()
                .map_err(|_| Error::State("pedometer lock poisoned".into()))?;
            let id = inner.next_id;
            inner.next_id += 1;
            inner.subscribers.push((id, callback));
            id
        };

        let inner = Arc::clone(&self.inner);
        Ok(Subscription::new(move || {
            let mut inner = inner.lock().unwrap_or_else(|e| e.into_inner());
            inner.subscribers.retain(|(sub_id, _)| *sub_id != id);
        }))
    }
}
