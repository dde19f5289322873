use std::sync::{Arc, Mutex as StdMutex, PoisonError, RwLock};

use chrono::TimeDelta;
use log::warn;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::{
    fix::{LocationFix, same_provider},
    provider::{LocationProvider, SubscriptionId},
    settings::ArbiterSettings,
};

/// Fixes queued between provider delivery and the pump applying them
const FEED_CAPACITY: usize = 32;

/// The best-estimate snapshot shared between the pump task and readers.
/// Readers take the lock only long enough to clone the current fix, so
/// [`LocationArbiter::current_estimate`] never meaningfully blocks.
struct BestEstimate {
    settings: ArbiterSettings,
    best: RwLock<Option<LocationFix>>,
}

impl BestEstimate {
    /// Compare-and-replace under a single critical section so two fixes can
    /// never both be judged against the same stale snapshot.
    fn observe(&self, fix: LocationFix) {
        let mut best = self.best.write().unwrap_or_else(PoisonError::into_inner);
        if supersedes(&fix, best.as_ref(), &self.settings) {
            *best = Some(fix);
        }
    }

    fn snapshot(&self) -> Option<LocationFix> {
        self.best
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Decides whether a candidate fix replaces the current best, weighing
/// recency against accuracy and tie-breaking by provider identity.
///
/// The checks are ordered: staleness in either direction is ruled out
/// first, accuracy only decides between fixes close enough in time.
fn supersedes(
    candidate: &LocationFix,
    current: Option<&LocationFix>,
    settings: &ArbiterSettings,
) -> bool {
    let Some(current) = current else {
        // Any fix is better than no fix
        return true;
    };

    let staleness = settings.staleness_window();
    let time_delta = candidate.timestamp - current.timestamp;

    // Newer by more than the staleness window: the user has likely moved
    // since the current fix was taken, take the candidate outright
    if time_delta > staleness {
        return true;
    }

    // Older by more than the window: assume the current fix is still
    // representative
    if time_delta < -staleness {
        return false;
    }

    let accuracy_delta = candidate.accuracy - current.accuracy;

    let newer = time_delta > TimeDelta::zero();
    let more_accurate = accuracy_delta < 0.0;
    let equally_accurate = accuracy_delta == 0.0;
    let slightly_less_accurate =
        accuracy_delta > 0.0 && accuracy_delta <= settings.jitter_tolerance_meters;
    let from_same_provider = same_provider(
        candidate.provider.as_deref(),
        current.provider.as_deref(),
    );

    more_accurate || (newer && (equally_accurate || (from_same_provider && slightly_less_accurate)))
}

/// Everything torn down again when the arbiter stops
struct ActiveFeed {
    cancel: CancellationToken,
    pump: JoinHandle<()>,
    /// (provider index, subscription) pairs that actually went through
    subscriptions: Vec<(usize, SubscriptionId)>,
}

/// Maintains the single best-known location from fixes arriving
/// asynchronously out of zero or more [LocationProvider]s.
///
/// Providers deliver on their own tasks in whatever order they like; the
/// arbiter funnels everything through one acceptance policy so the estimate
/// a consumer reads is never worse, by that policy, than what has been
/// delivered. Provider failures are logged and absorbed, the only signal a
/// consumer ever sees is the presence or absence of an estimate.
pub struct LocationArbiter<P: LocationProvider> {
    providers: Vec<Arc<P>>,
    estimate: Arc<BestEstimate>,
    feed: StdMutex<Option<ActiveFeed>>,
}

impl<P: LocationProvider> LocationArbiter<P> {
    pub fn new(providers: Vec<Arc<P>>, settings: ArbiterSettings) -> Self {
        Self {
            providers,
            estimate: Arc::new(BestEstimate {
                settings,
                best: RwLock::new(None),
            }),
            feed: StdMutex::new(None),
        }
    }

    /// Seeds the estimate from each provider's last-known fix (in handle
    /// order, every fix judged against the evolving best, so the outcome is
    /// order-independent), then subscribes to live updates from every
    /// provider. A provider that fails to answer or subscribe is logged and
    /// skipped, the rest continue.
    ///
    /// Calling this while already started stops first and re-subscribes
    /// from scratch, listeners are never duplicated.
    pub async fn start(&self) {
        self.stop().await;

        for provider in &self.providers {
            match provider.last_known() {
                Ok(Some(fix)) => self.estimate.observe(fix),
                Ok(None) => {}
                Err(why) => {
                    warn!(
                        "Failed to query last known fix from {}: {why:?}",
                        provider.name()
                    );
                }
            }
        }

        let (tx, mut rx) = mpsc::channel(FEED_CAPACITY);

        let subscriptions = self
            .providers
            .iter()
            .enumerate()
            .filter_map(|(idx, provider)| match provider.subscribe(tx.clone()) {
                Ok(id) => Some((idx, id)),
                Err(why) => {
                    warn!("Failed to subscribe to {}: {why:?}", provider.name());
                    None
                }
            })
            .collect();

        // Only providers hold senders now, so the pump observes the channel
        // closing once every subscription is gone
        drop(tx);

        let cancel = CancellationToken::new();

        let pump = tokio::spawn({
            let estimate = self.estimate.clone();
            let cancel = cancel.clone();
            async move {
                loop {
                    tokio::select! {
                        biased;

                        _ = cancel.cancelled() => break,

                        fix = rx.recv() => {
                            match fix {
                                Some(fix) => estimate.observe(fix),
                                None => break,
                            }
                        }
                    }
                }
            }
        });

        let mut feed = self.feed.lock().unwrap_or_else(PoisonError::into_inner);
        *feed = Some(ActiveFeed {
            cancel,
            pump,
            subscriptions,
        });
    }

    /// Unsubscribes from every provider and waits for the feed pump to wind
    /// down; once this returns no further fix will be applied. The current
    /// best estimate is retained. No-op when not started.
    pub async fn stop(&self) {
        let feed = self
            .feed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let Some(feed) = feed else {
            return;
        };

        for (idx, id) in feed.subscriptions {
            self.providers[idx].unsubscribe(id);
        }

        feed.cancel.cancel();
        feed.pump.await.ok();
    }

    /// The current best estimate, absent until a first fix is accepted.
    /// Never blocks and never queries a provider; consumers substitute
    /// their own fallback when this is absent.
    pub fn current_estimate(&self) -> Option<LocationFix> {
        self.estimate.snapshot()
    }
}
