//! Tiered Dispatcher: feedback-controlled choice between two implementations
//!
//! Every call to [`TieredDispatcher::execute`] follows the same sequence:
//!
//! ```text
//! count += 1 ─▶ start clock ─▶ run impl for current tier ─▶ stop clock
//!                                     │ Err                    │
//!                                     ▼                        ▼
//!                          return error unchanged      policy.evaluate(tier, count, latency)
//!                          (no transition, no event)          │
//!                                                             ▼
//!                                              apply transition + emit event (if any)
//! ```
//!
//! A transition only affects the *next* call; [`Execution::tier_used`]
//! always names the tier that actually ran.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::error::{ConfigError, ConfigResult};
use crate::implementation::Implementation;
use crate::policy::{duration_ms, TierPolicy};
use crate::sink::{TracingSink, TransitionEvent, TransitionSink};
use crate::tier::{Tier, TransitionKind};

/// Dispatcher shared across threads behind a mutex.
///
/// The mutex serializes `execute`; the dispatcher itself is not reentrant.
pub type SharedDispatcher<B, A, C = SystemClock, S = TracingSink> =
    Arc<Mutex<TieredDispatcher<B, A, C, S>>>;

/// Mutable state owned by one dispatcher
#[derive(Debug, Clone, Copy, Default)]
struct DispatcherState {
    tier: Tier,
    invocation_count: u64,
    promotions: u64,
    demotions: u64,
    failures: u64,
    last_latency: Option<Duration>,
}

/// Outcome of one successful call
#[derive(Debug, Clone, PartialEq)]
pub struct Execution<R> {
    /// Value produced by the implementation
    pub result: R,
    /// Measured latency of the implementation alone
    pub latency: Duration,
    /// Tier whose implementation produced `result`
    pub tier_used: Tier,
    /// Ordinal of this call (1-based)
    pub invocation: u64,
    /// Tier change applied after this call, if any
    pub transition: Option<TransitionKind>,
}

impl<R> Execution<R> {
    pub fn latency_ms(&self) -> f64 {
        duration_ms(self.latency)
    }
}

/// Snapshot of dispatcher counters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatcherStats {
    pub tier: Tier,
    pub invocation_count: u64,
    pub promotions: u64,
    pub demotions: u64,
    pub failures: u64,
    pub last_latency_ms: Option<f64>,
    pub promotion_threshold_ms: f64,
    pub demotion_threshold_ms: f64,
}

/// Routes calls to a baseline or accelerated implementation based on
/// observed latency.
///
/// Starts on [`Tier::Baseline`]. Promotes once a baseline call is slower
/// than the promotion threshold after the minimum call count; demotes when
/// an accelerated call is slower than twice that threshold.
pub struct TieredDispatcher<B, A, C = SystemClock, S = TracingSink> {
    baseline: B,
    accelerated: A,
    policy: TierPolicy,
    clock: C,
    sink: S,
    state: DispatcherState,
}

impl<B, A> TieredDispatcher<B, A> {
    /// Create a dispatcher measuring wall-clock time and logging
    /// transitions through `tracing`.
    pub fn new(baseline: B, accelerated: A, promotion_threshold_ms: f64) -> ConfigResult<Self> {
        let policy = TierPolicy::new(promotion_threshold_ms)?;
        Ok(Self::with_policy(baseline, accelerated, policy))
    }

    /// Create a dispatcher from an already validated policy.
    pub fn with_policy(baseline: B, accelerated: A, policy: TierPolicy) -> Self {
        Self::from_parts(baseline, accelerated, policy, SystemClock, TracingSink)
    }

    /// Start building a dispatcher.
    pub fn builder() -> DispatcherBuilder<B, A> {
        DispatcherBuilder::new()
    }
}

impl<B, A, C, S> TieredDispatcher<B, A, C, S> {
    fn from_parts(baseline: B, accelerated: A, policy: TierPolicy, clock: C, sink: S) -> Self {
        Self {
            baseline,
            accelerated,
            policy,
            clock,
            sink,
            state: DispatcherState::default(),
        }
    }

    /// Tier the next call will run on.
    pub fn tier(&self) -> Tier {
        self.state.tier
    }

    /// Calls made so far, failed ones included.
    pub fn invocation_count(&self) -> u64 {
        self.state.invocation_count
    }

    pub fn policy(&self) -> &TierPolicy {
        &self.policy
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn stats(&self) -> DispatcherStats {
        DispatcherStats {
            tier: self.state.tier,
            invocation_count: self.state.invocation_count,
            promotions: self.state.promotions,
            demotions: self.state.demotions,
            failures: self.state.failures,
            last_latency_ms: self.state.last_latency.map(duration_ms),
            promotion_threshold_ms: self.policy.promotion_threshold_ms(),
            demotion_threshold_ms: self.policy.demotion_threshold_ms(),
        }
    }

    /// Wrap in `Arc<Mutex<_>>` for use from several threads.
    pub fn into_shared(self) -> SharedDispatcher<B, A, C, S> {
        Arc::new(Mutex::new(self))
    }
}

impl<B, A, C, S> TieredDispatcher<B, A, C, S>
where
    C: Clock,
    S: TransitionSink,
{
    /// Run `input` through the implementation for the current tier.
    ///
    /// The call is counted before the implementation runs. If the
    /// implementation returns an error it is passed back unchanged and the
    /// tier is left as it was. A panic unwinds with the same guarantees.
    pub fn execute<T>(&mut self, input: &T) -> Result<Execution<B::Output>, B::Error>
    where
        T: ?Sized,
        B: Implementation<T>,
        A: Implementation<T, Output = B::Output, Error = B::Error>,
    {
        self.state.invocation_count += 1;
        let invocation = self.state.invocation_count;
        let tier_used = self.state.tier;

        let start = self.clock.now();
        let outcome = match tier_used {
            Tier::Baseline => self.baseline.run(input),
            Tier::Accelerated => self.accelerated.run(input),
        };
        let result = match outcome {
            Ok(result) => result,
            Err(err) => {
                self.state.failures += 1;
                debug!(tier = %tier_used, invocation, "Implementation failed, tier unchanged");
                return Err(err);
            }
        };
        let latency = self.clock.elapsed(start);
        self.state.last_latency = Some(latency);

        debug!(
            tier = %tier_used,
            invocation,
            latency_ms = duration_ms(latency),
            "Invocation complete"
        );

        let transition = self.policy.evaluate(tier_used, invocation, latency);
        if let Some(transition) = transition {
            self.state.tier = transition.to();
            match transition.kind() {
                TransitionKind::Promote => self.state.promotions += 1,
                TransitionKind::Demote => self.state.demotions += 1,
            }
            let event = TransitionEvent::new(transition, duration_ms(latency), invocation);
            self.sink.on_transition(&event);
        }

        Ok(Execution {
            result,
            latency,
            tier_used,
            invocation,
            transition: transition.map(|t| t.kind()),
        })
    }
}

impl<B, A, C, S> std::fmt::Debug for TieredDispatcher<B, A, C, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieredDispatcher")
            .field("policy", &self.policy)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Step-by-step construction of a [`TieredDispatcher`].
///
/// Defaults: 5ms promotion threshold, 10 calls before promotion,
/// [`SystemClock`], [`TracingSink`].
pub struct DispatcherBuilder<B, A, C = SystemClock, S = TracingSink> {
    baseline: Option<B>,
    accelerated: Option<A>,
    promotion_threshold_ms: f64,
    min_calls_before_promotion: Option<u64>,
    policy: Option<TierPolicy>,
    clock: C,
    sink: S,
}

impl<B, A> DispatcherBuilder<B, A> {
    pub fn new() -> Self {
        Self {
            baseline: None,
            accelerated: None,
            promotion_threshold_ms: crate::config::DEFAULT_PROMOTION_THRESHOLD_MS,
            min_calls_before_promotion: None,
            policy: None,
            clock: SystemClock,
            sink: TracingSink,
        }
    }
}

impl<B, A> Default for DispatcherBuilder<B, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B, A, C, S> DispatcherBuilder<B, A, C, S> {
    pub fn baseline(mut self, implementation: B) -> Self {
        self.baseline = Some(implementation);
        self
    }

    pub fn accelerated(mut self, implementation: A) -> Self {
        self.accelerated = Some(implementation);
        self
    }

    pub fn threshold_ms(mut self, promotion_threshold_ms: f64) -> Self {
        self.promotion_threshold_ms = promotion_threshold_ms;
        self
    }

    pub fn min_calls_before_promotion(mut self, calls: u64) -> Self {
        self.min_calls_before_promotion = Some(calls);
        self
    }

    /// Use a validated policy, ignoring `threshold_ms` and
    /// `min_calls_before_promotion`.
    pub fn policy(mut self, policy: TierPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn clock<C2: Clock>(self, clock: C2) -> DispatcherBuilder<B, A, C2, S> {
        DispatcherBuilder {
            baseline: self.baseline,
            accelerated: self.accelerated,
            promotion_threshold_ms: self.promotion_threshold_ms,
            min_calls_before_promotion: self.min_calls_before_promotion,
            policy: self.policy,
            clock,
            sink: self.sink,
        }
    }

    pub fn sink<S2: TransitionSink>(self, sink: S2) -> DispatcherBuilder<B, A, C, S2> {
        DispatcherBuilder {
            baseline: self.baseline,
            accelerated: self.accelerated,
            promotion_threshold_ms: self.promotion_threshold_ms,
            min_calls_before_promotion: self.min_calls_before_promotion,
            policy: self.policy,
            clock: self.clock,
            sink,
        }
    }

    pub fn build(self) -> ConfigResult<TieredDispatcher<B, A, C, S>> {
        let baseline = self
            .baseline
            .ok_or_else(|| ConfigError::missing(Tier::Baseline))?;
        let accelerated = self
            .accelerated
            .ok_or_else(|| ConfigError::missing(Tier::Accelerated))?;
        let policy = match self.policy {
            Some(policy) => policy,
            None => {
                let policy = TierPolicy::new(self.promotion_threshold_ms)?;
                match self.min_calls_before_promotion {
                    Some(calls) => policy.with_min_calls_before_promotion(calls),
                    None => policy,
                }
            }
        };
        Ok(TieredDispatcher::from_parts(
            baseline,
            accelerated,
            policy,
            self.clock,
            self.sink,
        ))
    }
}
