//! Poll loop: fetch, validate, diff, notify, then sleep a fixed period.
//!
//! The loop owns all state carried between cycles ([`PollState`]) and is
//! the only place where errors are handled. Failures are reported to the
//! operator once; an identical failure on the very next cycle is only
//! logged. Delivery failures are never reported through the same sink.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use common::homework::{render_failure, ChangeEvent};
use common::WatcherConfig;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::differ::diff;
use crate::error::PollError;
use crate::fetcher::StatusSource;
use crate::notifier::Notifier;
use crate::validator::check_response;

/// State carried from one cycle to the next.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollState {
    /// Lower bound (seconds since epoch) of the next request.
    pub cursor: i64,
    /// Last status observed per homework. Never pruned.
    pub last_seen: HashMap<String, String>,
    /// Last failure message delivered to the operator.
    pub last_reported_error: Option<String>,
}

impl PollState {
    pub fn new(cursor: i64) -> Self {
        Self {
            cursor,
            ..Default::default()
        }
    }
}

/// Lifecycle of the watcher process.
///
/// `Startup` runs the credential gate once: a failed gate ends in
/// `Terminated` and no request is ever made. After that the loop
/// alternates between `Polling` and `Sleeping` until the process is
/// killed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Startup,
    Polling,
    Sleeping,
    Terminated,
}

impl Phase {
    /// Phase that follows `Startup` for the given configuration.
    pub fn after_startup(config: &WatcherConfig) -> Phase {
        if config.validate() {
            Phase::Polling
        } else {
            Phase::Terminated
        }
    }
}

/// What a single POLLING pass ended with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Fetch and diff succeeded and every change event was delivered.
    /// Zero means nothing changed.
    Delivered { events: usize },
    /// Fetch and diff succeeded but delivery broke off after `delivered`
    /// events.
    DeliveryFailed { delivered: usize },
    /// The cycle failed. `reported` tells whether the operator was
    /// notified about it.
    Failed { kind: &'static str, reported: bool },
}

/// The delay between cycles.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, period: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, period: Duration) {
        tokio::time::sleep(period).await;
    }
}

pub struct Poller {
    source: Box<dyn StatusSource>,
    notifier: Notifier,
    sleeper: Box<dyn Sleeper>,
    retry_period: Duration,
    state: PollState,
    phase: Phase,
    cycles: u64,
}

impl Poller {
    pub fn new(
        source: Box<dyn StatusSource>,
        notifier: Notifier,
        sleeper: Box<dyn Sleeper>,
        retry_period: Duration,
        state: PollState,
    ) -> Self {
        Self {
            source,
            notifier,
            sleeper,
            retry_period,
            state,
            phase: Phase::Startup,
            cycles: 0,
        }
    }

    pub fn state(&self) -> &PollState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Number of POLLING passes run so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Perform one state transition and return the new phase.
    /// `Terminated` is final.
    pub async fn advance(&mut self) -> Phase {
        self.phase = match self.phase {
            Phase::Startup => {
                info!(
                    period_secs = self.retry_period.as_secs(),
                    cursor = self.state.cursor,
                    "Poll loop started"
                );
                Phase::Polling
            }
            Phase::Polling => {
                self.run_cycle().await;
                Phase::Sleeping
            }
            Phase::Sleeping => {
                debug!(period_secs = self.retry_period.as_secs(), "Sleeping until next poll");
                self.sleeper.sleep(self.retry_period).await;
                Phase::Polling
            }
            Phase::Terminated => Phase::Terminated,
        };
        self.phase
    }

    /// Drive the loop. Only process termination stops it in practice.
    pub async fn run(mut self) {
        while self.advance().await != Phase::Terminated {}
    }

    /// One POLLING pass: fetch → validate → diff → notify.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        self.cycles += 1;
        let span = info_span!("poll_cycle", cycle = self.cycles, cursor = self.state.cursor);
        self.poll_once().instrument(span).await
    }

    async fn poll_once(&mut self) -> CycleOutcome {
        let (events, next_cursor) = match self.check_updates().await {
            Ok(update) => update,
            Err(e) => return self.report_failure(e).await,
        };

        self.state.last_reported_error = None;

        let outcome = match self.deliver(&events).await {
            Ok(()) => CycleOutcome::Delivered {
                events: events.len(),
            },
            Err((delivered, e)) => {
                error!(
                    kind = e.kind(),
                    delivered,
                    pending = events.len() - delivered,
                    "Stopped delivering status changes: {}",
                    e
                );
                CycleOutcome::DeliveryFailed { delivered }
            }
        };

        self.advance_cursor(next_cursor);
        outcome
    }

    async fn check_updates(&mut self) -> Result<(Vec<ChangeEvent>, i64), PollError> {
        let payload = self.source.fetch(self.state.cursor).await?;
        let batch = check_response(payload)?;
        let events = diff(&batch.records, &mut self.state.last_seen)?;
        Ok((events, batch.next_cursor))
    }

    async fn deliver(&self, events: &[ChangeEvent]) -> Result<(), (usize, PollError)> {
        if events.is_empty() {
            info!("No status changes");
            return Ok(());
        }
        for (delivered, event) in events.iter().enumerate() {
            self.notifier
                .notify(&event.render())
                .await
                .map_err(|e| (delivered, e))?;
            info!(homework = %event.name, status = %event.status, "Status change reported");
        }
        Ok(())
    }

    fn advance_cursor(&mut self, next: i64) {
        if next < self.state.cursor {
            warn!(
                cursor = self.state.cursor,
                returned = next,
                "API returned an older current_date, keeping cursor"
            );
            return;
        }
        self.state.cursor = next;
    }

    async fn report_failure(&mut self, err: PollError) -> CycleOutcome {
        let kind = err.kind();
        match &err {
            PollError::Connectivity { .. } => {
                warn!(kind, "Status endpoint unreachable: {}", err)
            }
            PollError::Endpoint { status, .. } => {
                error!(kind, status, "Status endpoint answered with an error: {}", err)
            }
            PollError::Format { .. }
            | PollError::Shape { .. }
            | PollError::UnknownStatus { .. }
            | PollError::MalformedRecord { .. } => {
                error!(kind, "Unexpected data from the status endpoint: {}", err)
            }
            PollError::Delivery { .. } => error!(kind, "{}", err),
        }

        let message = render_failure(&err);
        if self.state.last_reported_error.as_deref() == Some(message.as_str()) {
            info!(kind, "Same failure already reported, not notifying again");
            return CycleOutcome::Failed {
                kind,
                reported: false,
            };
        }

        match self.notifier.notify(&message).await {
            Ok(()) => {
                self.state.last_reported_error = Some(message);
                CycleOutcome::Failed {
                    kind,
                    reported: true,
                }
            }
            Err(e) => {
                error!(kind = e.kind(), "Could not report failure: {}", e);
                CycleOutcome::Failed {
                    kind,
                    reported: false,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::sink::{MessageSink, SinkError};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    struct FixedSource(Value);

    #[async_trait]
    impl StatusSource for FixedSource {
        async fn fetch(&self, _cursor: i64) -> Result<Value, PollError> {
            Ok(self.0.clone())
        }
    }

    struct NullSink;

    #[async_trait]
    impl MessageSink for NullSink {
        fn channel_type(&self) -> &'static str {
            "null"
        }

        async fn send_text(&self, _text: &str) -> Result<(), SinkError> {
            Ok(())
        }
    }

    struct CountingSleeper(Arc<Mutex<Vec<Duration>>>);

    #[async_trait]
    impl Sleeper for CountingSleeper {
        async fn sleep(&self, period: Duration) {
            self.0.lock().unwrap().push(period);
        }
    }

    fn poller(payload: Value, state: PollState, sleeps: Arc<Mutex<Vec<Duration>>>) -> Poller {
        Poller::new(
            Box::new(FixedSource(payload)),
            Notifier::new(Box::new(NullSink)),
            Box::new(CountingSleeper(sleeps)),
            Duration::from_secs(600),
            state,
        )
    }

    #[tokio::test]
    async fn test_phases_alternate_with_constant_period() {
        let sleeps = Arc::new(Mutex::new(Vec::new()));
        let mut poller = poller(
            json!({"homeworks": [], "current_date": 20}),
            PollState::new(10),
            sleeps.clone(),
        );
        assert_eq!(poller.phase(), Phase::Startup);
        assert_eq!(poller.advance().await, Phase::Polling);
        assert_eq!(poller.cycles(), 0);
        assert_eq!(poller.advance().await, Phase::Sleeping);
        assert_eq!(poller.advance().await, Phase::Polling);
        assert_eq!(poller.advance().await, Phase::Sleeping);
        assert_eq!(poller.advance().await, Phase::Polling);
        assert_eq!(poller.cycles(), 2);
        assert_eq!(*sleeps.lock().unwrap(), vec![Duration::from_secs(600); 2]);
    }

    fn config(vars: &[(&str, &str)]) -> WatcherConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        WatcherConfig::from_lookup(move |name| vars.get(name).cloned()).unwrap()
    }

    #[test]
    fn test_startup_gate_decides_next_phase() {
        let complete = config(&[
            ("PRACTICUM_TOKEN", "p"),
            ("TELEGRAM_TOKEN", "t"),
            ("TELEGRAM_CHAT_ID", "42"),
        ]);
        assert_eq!(Phase::after_startup(&complete), Phase::Polling);

        let incomplete = config(&[("PRACTICUM_TOKEN", "p"), ("TELEGRAM_CHAT_ID", "42")]);
        assert_eq!(Phase::after_startup(&incomplete), Phase::Terminated);
    }

    #[tokio::test]
    async fn test_terminated_is_final() {
        let sleeps = Arc::new(Mutex::new(Vec::new()));
        let mut poller = poller(
            json!({"homeworks": [], "current_date": 20}),
            PollState::new(10),
            sleeps.clone(),
        );
        poller.phase = Phase::Terminated;
        assert_eq!(poller.advance().await, Phase::Terminated);
        assert_eq!(poller.advance().await, Phase::Terminated);
        assert_eq!(poller.cycles(), 0);
        assert!(sleeps.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cursor_never_moves_backwards() {
        let mut poller = poller(
            json!({"homeworks": [], "current_date": 5}),
            PollState::new(100),
            Arc::default(),
        );
        let outcome = poller.run_cycle().await;
        assert_eq!(outcome, CycleOutcome::Delivered { events: 0 });
        assert_eq!(poller.state().cursor, 100);
    }

    #[tokio::test]
    async fn test_success_clears_reported_error() {
        let state = PollState {
            cursor: 1,
            last_reported_error: Some("Сбой в работе программы: boom".into()),
            ..Default::default()
        };
        let mut poller = poller(json!({"homeworks": [], "current_date": 2}), state, Arc::default());
        poller.run_cycle().await;
        assert_eq!(poller.state().last_reported_error, None);
        assert_eq!(poller.state().cursor, 2);
    }
}
