use std::{
    collections::HashMap,
    sync::{Mutex as StdMutex, PoisonError},
    time::Duration,
};

use anyhow::bail;
use log::debug;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use geofix_logic::{FixFeed, LocationFix, LocationProvider, SubscriptionId, prelude::*};

/// Plays a recorded trace of fixes into every subscription, each entry
/// after its own delay. Stands in for a live positioning source in tests
/// and demos.
pub struct ReplayProvider {
    name: String,
    last_known: Option<LocationFix>,
    script: Vec<(Duration, LocationFix)>,
    unavailable: bool,
    subscriptions: StdMutex<HashMap<SubscriptionId, CancellationToken>>,
}

impl ReplayProvider {
    pub fn new(name: &str, script: Vec<(Duration, LocationFix)>) -> Self {
        Self {
            name: name.to_owned(),
            last_known: None,
            script,
            unavailable: false,
            subscriptions: StdMutex::new(HashMap::new()),
        }
    }

    /// What [LocationProvider::last_known] will answer before any replay
    pub fn with_last_known(mut self, fix: LocationFix) -> Self {
        self.last_known = Some(fix);
        self
    }

    /// A provider that fails every query and subscription, for exercising
    /// degraded starts
    pub fn unavailable(name: &str) -> Self {
        let mut provider = Self::new(name, Vec::new());
        provider.unavailable = true;
        provider
    }
}

impl LocationProvider for ReplayProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn last_known(&self) -> Result<Option<LocationFix>> {
        if self.unavailable {
            bail!("Replay provider {} is marked unavailable", self.name);
        }
        Ok(self.last_known.clone())
    }

    fn subscribe(&self, feed: FixFeed) -> Result<SubscriptionId> {
        if self.unavailable {
            bail!("Replay provider {} is marked unavailable", self.name);
        }

        let id = Uuid::new_v4();
        let cancel = CancellationToken::new();

        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, cancel.clone());

        let script = self.script.clone();
        let name = self.name.clone();

        tokio::spawn(async move {
            for (delay, fix) in script {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(delay) => {}
                }

                if feed.send(fix).await.is_err() {
                    break;
                }
            }
            debug!("Replay provider {name} finished its script");
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

impl Drop for ReplayProvider {
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
