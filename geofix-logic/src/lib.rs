mod arbiter;
mod fix;
mod provider;
mod settings;
#[cfg(test)]
mod tests;

pub use arbiter::LocationArbiter;
pub use fix::{LocationFix, UtcDT, same_provider};
pub use provider::{FixFeed, LocationProvider, SubscriptionId};
pub use settings::ArbiterSettings;

pub mod prelude {
    use anyhow::Error as AnyhowError;
    use std::result::Result as StdResult;
    pub type Result<T = (), E = AnyhowError> = StdResult<T, E>;
    pub use anyhow::Context;
}
