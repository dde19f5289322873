use std::{
    collections::HashSet,
    sync::{
        Mutex as StdMutex, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
};

use chrono::{TimeDelta, TimeZone, Utc};
use uuid::Uuid;

use crate::{
    fix::{LocationFix, UtcDT},
    prelude::*,
    provider::{FixFeed, LocationProvider, SubscriptionId},
};

/// Fixed reference instant so offsets in tests are easy to read
pub fn base_time() -> UtcDT {
    Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()
}

/// A fix at a fixed position, `offset_secs` relative to [base_time]
pub fn fix(provider: Option<&str>, accuracy: f64, offset_secs: i64) -> LocationFix {
    fix_at(provider, accuracy, offset_secs, 47.60621, -122.33207)
}

pub fn fix_at(
    provider: Option<&str>,
    accuracy: f64,
    offset_secs: i64,
    latitude: f64,
    longitude: f64,
) -> LocationFix {
    LocationFix {
        latitude,
        longitude,
        timestamp: base_time() + TimeDelta::seconds(offset_secs),
        accuracy,
        provider: provider.map(str::to_owned),
    }
}

/// Provider with a canned last-known fix and a script of live fixes it
/// plays into every new subscription. Keeps a handle on each feed so tests
/// can poke at the channel directly.
pub struct MockProvider {
    name: &'static str,
    last_known: Option<LocationFix>,
    unavailable: bool,
    script: Vec<LocationFix>,
    subscribes: AtomicUsize,
    active: StdMutex<HashSet<SubscriptionId>>,
    feeds: StdMutex<Vec<FixFeed>>,
}

impl MockProvider {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            last_known: None,
            unavailable: false,
            script: Vec::new(),
            subscribes: AtomicUsize::new(0),
            active: StdMutex::new(HashSet::new()),
            feeds: StdMutex::new(Vec::new()),
        }
    }

    pub fn with_last_known(mut self, fix: LocationFix) -> Self {
        self.last_known = Some(fix);
        self
    }

    pub fn with_script(mut self, script: Vec<LocationFix>) -> Self {
        self.script = script;
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    pub fn total_subscribes(&self) -> usize {
        self.subscribes.load(Ordering::SeqCst)
    }

    pub fn active_subscriptions(&self) -> usize {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn feed_handle(&self, index: usize) -> FixFeed {
        self.feeds.lock().unwrap_or_else(PoisonError::into_inner)[index].clone()
    }
}

impl LocationProvider for MockProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn last_known(&self) -> Result<Option<LocationFix>> {
        if self.unavailable {
            anyhow::bail!("Provider {} is unavailable", self.name);
        }
        Ok(self.last_known.clone())
    }

    fn subscribe(&self, feed: FixFeed) -> Result<SubscriptionId> {
        if self.unavailable {
            anyhow::bail!("Provider {} is unavailable", self.name);
        }

        self.subscribes.fetch_add(1, Ordering::SeqCst);

        let id = Uuid::new_v4();
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id);
        self.feeds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(feed.clone());

        let script = self.script.clone();
        tokio::spawn(async move {
            for fix in script {
                if feed.send(fix).await.is_err() {
                    break;
                }
            }
        });

        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }
}
