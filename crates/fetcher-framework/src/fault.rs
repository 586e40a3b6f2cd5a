//! # Simulated Network Conditions
//!
//! A [`SourceActor`](crate::SourceActor) stands in for a remote service, so it can be told to
//! misbehave like one. A [`FaultInjector`] decides, per request, whether the call fails before
//! it touches any record; [`Latency`] delays the reply.

use crate::message::SourceOp;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::time::Duration;

/// Failure message used when an injector does not supply its own.
pub const DEFAULT_FAULT_MESSAGE: &str = "Service unavailable";

/// Decides whether a request to the source fails.
pub trait FaultInjector: Send + 'static {
    /// Returns the failure message when the request must fail.
    fn inject(&mut self, op: SourceOp) -> Option<String>;
}

/// Never fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFaults;

impl FaultInjector for NoFaults {
    fn inject(&mut self, _op: SourceOp) -> Option<String> {
        None
    }
}

/// Fails each operation kind with a fixed probability.
#[derive(Debug)]
pub struct RandomFaults {
    list_rate: f64,
    action_rate: f64,
    rng: StdRng,
}

impl RandomFaults {
    /// `list_rate` and `action_rate` are clamped to `[0, 1]`. Point reads never fail.
    pub fn new(list_rate: f64, action_rate: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            list_rate: list_rate.clamp(0.0, 1.0),
            action_rate: action_rate.clamp(0.0, 1.0),
            rng,
        }
    }
}

impl FaultInjector for RandomFaults {
    fn inject(&mut self, op: SourceOp) -> Option<String> {
        let rate = match op {
            SourceOp::List => self.list_rate,
            SourceOp::Action => self.action_rate,
            SourceOp::Get => 0.0,
        };
        self.rng
            .gen_bool(rate)
            .then(|| DEFAULT_FAULT_MESSAGE.to_string())
    }
}

/// Deterministic faults for tests.
///
/// Each operation kind pops its own queue; `true` fails the call. An empty queue succeeds.
///
/// ```
/// use fetcher_framework::fault::{FaultInjector, ScriptedFaults};
/// use fetcher_framework::SourceOp;
///
/// let mut faults = ScriptedFaults::new().fail_lists([true, false]);
/// assert!(faults.inject(SourceOp::List).is_some());
/// assert!(faults.inject(SourceOp::List).is_none());
/// assert!(faults.inject(SourceOp::List).is_none());
/// ```
#[derive(Debug, Default, Clone)]
pub struct ScriptedFaults {
    lists: VecDeque<bool>,
    actions: VecDeque<bool>,
    message: Option<String>,
}

impl ScriptedFaults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue outcomes for the next `List` requests.
    pub fn fail_lists(mut self, outcomes: impl IntoIterator<Item = bool>) -> Self {
        self.lists.extend(outcomes);
        self
    }

    /// Queue outcomes for the next `Action` requests.
    pub fn fail_actions(mut self, outcomes: impl IntoIterator<Item = bool>) -> Self {
        self.actions.extend(outcomes);
        self
    }

    /// Message carried by injected failures.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl FaultInjector for ScriptedFaults {
    fn inject(&mut self, op: SourceOp) -> Option<String> {
        let fail = match op {
            SourceOp::List => self.lists.pop_front(),
            SourceOp::Action => self.actions.pop_front(),
            SourceOp::Get => None,
        };
        fail.unwrap_or(false).then(|| {
            self.message
                .clone()
                .unwrap_or_else(|| DEFAULT_FAULT_MESSAGE.to_string())
        })
    }
}

/// Reply delay per operation kind.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Latency {
    pub list: Duration,
    pub action: Duration,
}

impl Latency {
    pub fn new(list: Duration, action: Duration) -> Self {
        Self { list, action }
    }

    /// Delay for an operation kind. Point reads are immediate.
    pub fn for_op(&self, op: SourceOp) -> Duration {
        match op {
            SourceOp::List => self.list,
            SourceOp::Action => self.action,
            SourceOp::Get => Duration::ZERO,
        }
    }
}
