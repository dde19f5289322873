mod replay;
mod wander;

pub use replay::ReplayProvider;
pub use wander::WanderProvider;
