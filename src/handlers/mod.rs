mod audit;
mod health;
mod identity;

pub use audit::recent_events;
pub use health::health_check;
pub use identity::whoami;
