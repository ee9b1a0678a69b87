//! Transition events and their consumers
//!
//! The dispatcher reports each tier change exactly once through a
//! [`TransitionSink`]. Rounds without a transition report nothing.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::tier::{Tier, Transition, TransitionKind};

/// Default channel capacity for [`BroadcastSink`]
const CHANNEL_CAPACITY: usize = 64;

/// Notification emitted on a tier change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionEvent {
    /// `promote` or `demote`
    pub event: TransitionKind,
    /// Latency of the call that triggered the change
    pub latency_ms: f64,
    /// Invocation count at the time of the change
    pub invocation_count: u64,
    /// Tier before the change
    pub from: Tier,
    /// Tier used from the next call on
    pub to: Tier,
}

impl TransitionEvent {
    pub fn new(transition: Transition, latency_ms: f64, invocation_count: u64) -> Self {
        Self {
            event: transition.kind(),
            latency_ms,
            invocation_count,
            from: transition.from(),
            to: transition.to(),
        }
    }
}

/// Consumer of transition events
pub trait TransitionSink {
    fn on_transition(&mut self, event: &TransitionEvent);
}

impl<F> TransitionSink for F
where
    F: FnMut(&TransitionEvent),
{
    fn on_transition(&mut self, event: &TransitionEvent) {
        self(event)
    }
}

/// Logs transitions through `tracing`
///
/// Promotions log at `info`, demotions at `warn`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TransitionSink for TracingSink {
    fn on_transition(&mut self, event: &TransitionEvent) {
        match event.event {
            TransitionKind::Promote => info!(
                latency_ms = event.latency_ms,
                invocation_count = event.invocation_count,
                from = %event.from,
                to = %event.to,
                "Tier promotion triggered"
            ),
            TransitionKind::Demote => warn!(
                latency_ms = event.latency_ms,
                invocation_count = event.invocation_count,
                from = %event.from,
                to = %event.to,
                "Tier demotion triggered, accelerated path too slow"
            ),
        }
    }
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl TransitionSink for NoopSink {
    fn on_transition(&mut self, _event: &TransitionEvent) {}
}

/// Keeps every event in memory
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Vec<TransitionEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events in emission order
    pub fn events(&self) -> &[TransitionEvent] {
        &self.events
    }

    /// Number of events of the given kind
    pub fn count(&self, kind: TransitionKind) -> usize {
        self.events.iter().filter(|e| e.event == kind).count()
    }

    /// Remove and return all recorded events
    pub fn drain(&mut self) -> Vec<TransitionEvent> {
        std::mem::take(&mut self.events)
    }
}

impl TransitionSink for RecordingSink {
    fn on_transition(&mut self, event: &TransitionEvent) {
        self.events.push(event.clone());
    }
}

/// Publishes events on a tokio broadcast channel
///
/// Sending never blocks. Having no subscribers is not an error; lagging
/// subscribers lose the oldest events.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    sender: broadcast::Sender<TransitionEvent>,
}

impl BroadcastSink {
    /// Create a sink with the default channel capacity
    pub fn new() -> Self {
        Self::with_capacity(CHANNEL_CAPACITY)
    }

    /// Create a sink buffering up to `capacity` events per subscriber
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to receive events
    pub fn subscribe(&self) -> broadcast::Receiver<TransitionEvent> {
        self.sender.subscribe()
    }

    /// Get the number of current subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new()
    }
}

impl TransitionSink for BroadcastSink {
    fn on_transition(&mut self, event: &TransitionEvent) {
        match self.sender.send(event.clone()) {
            Ok(receivers) => debug!(event = %event.event, receivers, "Transition published"),
            Err(_) => debug!(event = %event.event, "Transition published (no receivers)"),
        }
    }
}
