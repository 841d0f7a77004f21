//! Homework status watcher.
//!
//! Polls the Practicum homework API on a fixed period, detects review
//! status changes and reports them (and failures) to one Telegram chat.

pub mod differ;
pub mod error;
pub mod fetcher;
pub mod logging;
pub mod notifier;
pub mod poller;
pub mod validator;

pub use error::PollError;
pub use fetcher::{PracticumClient, StatusSource};
pub use notifier::Notifier;
pub use poller::{CycleOutcome, Phase, PollState, Poller, Sleeper, TokioSleeper};
