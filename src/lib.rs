pub mod config;
pub mod kernel;
pub mod notice;
pub mod outbox;
pub mod services;
pub mod session;

pub use config::ScoutConfig;
pub use notice::Notice;
pub use session::{FormSession, SubmitOutcome};
