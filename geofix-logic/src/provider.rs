use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{fix::LocationFix, prelude::*};

/// Sink a provider pushes live fixes into once subscribed
pub type FixFeed = mpsc::Sender<LocationFix>;

/// Token identifying one active subscription on one provider
pub type SubscriptionId = Uuid;

/// An independent source of location fixes (e.g. satellite-based or
/// network-based). How often a provider refreshes (minimum interval,
/// displacement threshold) is the provider's own configuration, the arbiter
/// never sees it.
pub trait LocationProvider: Send + Sync {
    /// Name used in log messages
    fn name(&self) -> &str;
    /// Query the most recent fix this provider has cached, if any.
    /// Fails if the provider is unavailable (permission revoked, hardware
    /// disabled, misconfigured).
    fn last_known(&self) -> Result<Option<LocationFix>>;
    /// Begin pushing live fixes into `feed`. The provider owns whatever
    /// task drives the feed and must stop pushing once the returned id is
    /// passed to [`Self::unsubscribe`].
    fn subscribe(&self, feed: FixFeed) -> Result<SubscriptionId>;
    /// Stop delivery for a subscription. Unknown ids are a no-op.
    fn unsubscribe(&self, id: SubscriptionId);
}
