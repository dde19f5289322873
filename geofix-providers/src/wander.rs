use std::{
    collections::HashMap,
    sync::{Arc, Mutex as StdMutex, PoisonError},
    time::Duration,
};

use anyhow::bail;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use geofix_logic::{FixFeed, LocationFix, LocationProvider, SubscriptionId, prelude::*};

/// Roughly 100 meters of latitude, the largest step taken per refresh
const MAX_STEP_DEGREES: f64 = 0.0009;

/// Spread of the per-fix accuracy jitter, in meters
const ACCURACY_JITTER: f64 = 40.0;

/// Shared between the provider and its feed tasks so `last_known` reflects
/// the walk as it progresses
struct WanderState {
    name: String,
    position: StdMutex<(f64, f64)>,
    last_emitted: StdMutex<Option<LocationFix>>,
}

impl WanderState {
    fn step(&self, base_accuracy: f64) -> LocationFix {
        let mut position = self
            .position
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        position.0 += rand::random_range(-MAX_STEP_DEGREES..=MAX_STEP_DEGREES);
        position.1 += rand::random_range(-MAX_STEP_DEGREES..=MAX_STEP_DEGREES);

        let fix = LocationFix {
            latitude: position.0,
            longitude: position.1,
            timestamp: Utc::now(),
            accuracy: base_accuracy + rand::random_range(0.0..=ACCURACY_JITTER),
            provider: Some(self.name.clone()),
        };

        *self
            .last_emitted
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(fix.clone());

        fix
    }
}

/// Simulated positioning source that random-walks from a starting
/// coordinate, emitting a fix per refresh interval. The refresh interval is
/// this provider's own configuration, consumers of the fixes never see it.
pub struct WanderProvider {
    state: Arc<WanderState>,
    interval: Duration,
    base_accuracy: f64,
    subscriptions: StdMutex<HashMap<SubscriptionId, CancellationToken>>,
}

impl WanderProvider {
    pub fn new(
        name: &str,
        start: (f64, f64),
        interval: Duration,
        base_accuracy: f64,
    ) -> Self {
        Self {
            state: Arc::new(WanderState {
                name: name.to_owned(),
                position: StdMutex::new(start),
                last_emitted: StdMutex::new(None),
            }),
            interval,
            base_accuracy,
            subscriptions: StdMutex::new(HashMap::new()),
        }
    }
}

impl LocationProvider for WanderProvider {
    fn name(&self) -> &str {
        &self.state.name
    }

    fn last_known(&self) -> Result<Option<LocationFix>> {
        Ok(self
            .state
            .last_emitted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn subscribe(&self, feed: FixFeed) -> Result<SubscriptionId> {
        if self.interval.is_zero() {
            bail!(
                "Wander provider {} has a zero refresh interval",
                self.state.name
            );
        }

        let id = Uuid::new_v4();
        let cancel = CancellationToken::new();

        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, cancel.clone());

        let state = self.state.clone();
        let base_accuracy = self.base_accuracy;
        let mut interval = tokio::time::interval(self.interval);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = interval.tick() => {}
                }

                if feed.send(state.step(base_accuracy)).await.is_err() {
                    return;
                }
            }
        });

        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        if let Some(cancel) = self
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
        {
            cancel.cancel();
        }
    }
}

impl Drop for WanderProvider {
    fn drop(&mut self) {
        for cancel in self
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
        {
            cancel.cancel();
        }
    }
}
