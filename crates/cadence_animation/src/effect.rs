//! Effects: single timed units of animation work

use crate::delay::{ms_to_ticks, Delay};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Callback driven by an effect, receiving progress in `0.0..=1.0`
pub type EffectCallback = Box<dyn FnMut(f64) + Send>;

/// Descriptor for an effect, in milliseconds.
///
/// Converted into an [`Effect`] when added to a controller.
#[derive(Default)]
pub struct EffectSpec {
    callback: Option<EffectCallback>,
    delay: Delay,
    duration_ms: Option<f64>,
    attribute: Option<String>,
}

impl EffectSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set the callback
    pub fn callback<F>(mut self, callback: F) -> Self
    where
        F: FnMut(f64) + Send + 'static,
    {
        self.callback = Some(Box::new(callback));
        self
    }

    /// Builder: set the delay (ms, numeric string, or `"+=N"` / `"-=N"`)
    pub fn delay(mut self, delay: impl Into<Delay>) -> Self {
        self.delay = delay.into();
        self
    }

    /// Builder: set the duration in milliseconds
    pub fn duration(mut self, ms: f64) -> Self {
        self.duration_ms = Some(ms);
        self
    }

    /// Builder: label the property this effect drives
    pub fn attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    pub fn delay_expr(&self) -> Delay {
        self.delay
    }

    pub fn duration_ms(&self) -> Option<f64> {
        self.duration_ms
    }

    /// Resolve into tick units.
    ///
    /// `anchor` is the end tick of the previous queued effect (see
    /// [`Delay::resolve`]).
    pub fn compile(self, anchor: u64, tick_interval_ms: u64, chained: bool) -> Effect {
        let delay = self.delay.resolve(anchor, tick_interval_ms, chained);
        let duration = self
            .duration_ms
            .map(|ms| ms_to_ticks(ms, tick_interval_ms))
            .filter(|ticks| *ticks > 0)
            .unwrap_or(1) as u64;

        Effect {
            callback: self.callback,
            delay,
            duration,
            terminated: false,
            attribute: self.attribute,
        }
    }
}

impl fmt::Debug for EffectSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectSpec")
            .field("delay", &self.delay)
            .field("duration_ms", &self.duration_ms)
            .field("attribute", &self.attribute)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

/// Compiled timing of a queued effect
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EffectTiming {
    pub delay: u64,
    pub duration: u64,
    pub terminated: bool,
}

/// A compiled effect: callback plus delay and duration in ticks
pub struct Effect {
    callback: Option<EffectCallback>,
    delay: u64,
    duration: u64,
    terminated: bool,
    attribute: Option<String>,
}

impl Effect {
    /// Create an effect directly in tick units. A zero duration becomes 1.
    pub fn new<F>(delay: u64, duration: u64, callback: F) -> Self
    where
        F: FnMut(f64) + Send + 'static,
    {
        Self {
            callback: Some(Box::new(callback)),
            delay,
            duration: duration.max(1),
            terminated: false,
            attribute: None,
        }
    }

    /// An effect with no callback, useful as a spacer in serial queues
    pub fn idle(delay: u64, duration: u64) -> Self {
        Self {
            callback: None,
            delay,
            duration: duration.max(1),
            terminated: false,
            attribute: None,
        }
    }

    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    pub fn delay(&self) -> u64 {
        self.delay
    }

    pub fn duration(&self) -> u64 {
        self.duration
    }

    /// Tick at which this effect reaches progress 1 on its own timeline
    pub fn end_tick(&self) -> u64 {
        self.delay.saturating_add(self.duration)
    }

    pub fn attribute(&self) -> Option<&str> {
        self.attribute.as_deref()
    }

    pub fn timing(&self) -> EffectTiming {
        EffectTiming {
            delay: self.delay,
            duration: self.duration,
            terminated: self.terminated,
        }
    }

    /// Progress at `elapsed` ticks, or `None` while the delay is pending
    pub fn progress_at(&self, elapsed: u64) -> Option<f64> {
        if self.delay > elapsed {
            return None;
        }
        Some((elapsed - self.delay) as f64 / self.duration.max(1) as f64)
    }

    /// Drive the callback.
    ///
    /// Progress past 1 terminates the effect without invoking the callback.
    /// A panicking callback is contained here and terminates the effect.
    pub fn run(&mut self, progress: f64) {
        if self.terminated {
            return;
        }
        if progress > 1.0 {
            self.terminated = true;
            return;
        }
        let Some(callback) = self.callback.as_mut() else {
            return;
        };
        if catch_unwind(AssertUnwindSafe(|| callback(progress))).is_err() {
            tracing::warn!(
                attribute = self.attribute.as_deref().unwrap_or("-"),
                progress,
                "effect callback panicked, terminating effect"
            );
            self.terminated = true;
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.terminated
    }

    /// Make a terminated effect runnable again
    pub fn reset(&mut self) {
        self.terminated = false;
    }

    /// Release the callback and clear timing. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        self.callback = None;
        self.delay = 0;
        self.duration = 0;
        self.attribute = None;
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("delay", &self.delay)
            .field("duration", &self.duration)
            .field("terminated", &self.terminated)
            .field("attribute", &self.attribute)
            .finish()
    }
}

/// Either a descriptor awaiting compilation or a ready effect
#[derive(Debug)]
pub enum EffectInput {
    Spec(EffectSpec),
    Ready(Effect),
}

impl From<EffectSpec> for EffectInput {
    fn from(spec: EffectSpec) -> Self {
        EffectInput::Spec(spec)
    }
}

impl From<Effect> for EffectInput {
    fn from(effect: Effect) -> Self {
        EffectInput::Ready(effect)
    }
}

/// One or more effects to append to a controller, in order
#[derive(Debug, Default)]
pub struct EffectBatch(Vec<EffectInput>);

impl EffectBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, input: impl Into<EffectInput>) -> Self {
        self.0.push(input.into());
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl IntoIterator for EffectBatch {
    type Item = EffectInput;
    type IntoIter = std::vec::IntoIter<EffectInput>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<EffectInput> for EffectBatch {
    fn from_iter<I: IntoIterator<Item = EffectInput>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<EffectSpec> for EffectBatch {
    fn from(spec: EffectSpec) -> Self {
        Self(vec![spec.into()])
    }
}

impl From<Effect> for EffectBatch {
    fn from(effect: Effect) -> Self {
        Self(vec![effect.into()])
    }
}

impl From<EffectInput> for EffectBatch {
    fn from(input: EffectInput) -> Self {
        Self(vec![input])
    }
}

impl From<Vec<EffectSpec>> for EffectBatch {
    fn from(specs: Vec<EffectSpec>) -> Self {
        specs.into_iter().map(EffectInput::from).collect()
    }
}

impl From<Vec<Effect>> for EffectBatch {
    fn from(effects: Vec<Effect>) -> Self {
        effects.into_iter().map(EffectInput::from).collect()
    }
}

impl From<Vec<EffectInput>> for EffectBatch {
    fn from(inputs: Vec<EffectInput>) -> Self {
        Self(inputs)
    }
}

impl<const N: usize> From<[EffectSpec; N]> for EffectBatch {
    fn from(specs: [EffectSpec; N]) -> Self {
        specs.into_iter().map(EffectInput::from).collect()
    }
}
