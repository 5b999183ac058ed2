//! Animation controller
//!
//! Owns an effect queue and drives it on a fixed tick. Each tick the active
//! [`Strategy`] advances the frame counter and runs the due effects, then
//! terminated effects are swept. When the queue drains the controller stops
//! itself and emits [`ControllerEvent::Done`].
//!
//! The tick loop runs as a tokio task. [`AnimController::step`] runs the same
//! loop body synchronously for hosts that own their frame loop.

use crate::config::ControllerConfig;
use crate::effect::{Effect, EffectBatch, EffectInput, EffectTiming};
use crate::strategy::Strategy;
use cadence_core::{ControllerEvent, EventDispatcher, ListenerId};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::runtime::{Handle, TryCurrentError};
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("no tokio runtime available to drive the tick loop")]
    NoRuntime(#[from] TryCurrentError),
}

/// Result of one pass of the tick loop
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Effects remain queued
    Pending { remaining: usize },
    /// The queue is empty and the controller has stopped
    Done,
}

struct ControllerState {
    queue: Vec<Effect>,
    frame: u64,
    strategy: Strategy,
    tick_interval_ms: u64,
    suppress_cleanup: bool,
    stopped: bool,
    /// Set once `Done` has been emitted for the current run
    completed: bool,
    started_at: Option<Instant>,
    task: Option<JoinHandle<()>>,
    /// Bumped on every start so a superseded loop cannot tick
    generation: u64,
    /// Set while the queue is detached for a tick
    in_flight: Option<InFlight>,
}

/// Queue detached from the state while its callbacks run
#[derive(Clone, Copy, Debug)]
struct InFlight {
    len: usize,
    end_tick: u64,
}

impl ControllerState {
    fn append(&mut self, batch: EffectBatch) -> usize {
        let chained = self.strategy.chains_relative_delays();
        let mut anchor = match (self.queue.last(), self.in_flight) {
            (Some(last), _) => last.end_tick(),
            (None, Some(in_flight)) => in_flight.end_tick,
            (None, None) => 0,
        };
        let mut added = 0;

        for input in batch {
            let effect = match input {
                EffectInput::Spec(spec) => spec.compile(anchor, self.tick_interval_ms, chained),
                EffectInput::Ready(effect) => effect,
            };
            anchor = effect.end_tick();
            self.queue.push(effect);
            added += 1;
        }

        if added > 0 {
            self.completed = false;
        }
        added
    }

    fn cleanup(&mut self) {
        self.queue.retain_mut(|effect| {
            if effect.is_terminal() {
                effect.dispose();
                false
            } else {
                true
            }
        });
    }

    fn len(&self) -> usize {
        self.queue.len() + self.in_flight.map_or(0, |in_flight| in_flight.len)
    }

    /// Take the queue out so callbacks can run without the lock
    fn detach(&mut self) -> Vec<Effect> {
        let queue = std::mem::take(&mut self.queue);
        self.in_flight = Some(InFlight {
            len: queue.len(),
            end_tick: queue.last().map_or(0, Effect::end_tick),
        });
        queue
    }

    /// Put a detached queue back, ahead of anything added meanwhile
    fn reattach(&mut self, queue: Vec<Effect>, frame: u64) {
        let added = std::mem::replace(&mut self.queue, queue);
        self.queue.extend(added);
        self.frame = frame;
        self.in_flight = None;
    }

    fn halt(&mut self) {
        self.stopped = true;
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct Shared {
    state: Mutex<ControllerState>,
    events: Mutex<EventDispatcher>,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn events(&self) -> MutexGuard<'_, EventDispatcher> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, generation: u64) -> bool {
        let state = self.state();
        !state.stopped && state.generation == generation
    }

    /// Run the strategy for one tick with the state unlocked.
    ///
    /// Returns false without running anything when a tick is already in
    /// progress (a callback stepping its own controller) or when `generation`
    /// no longer matches the running loop.
    fn advance(&self, generation: Option<u64>) -> bool {
        let (strategy, mut frame, mut queue) = {
            let mut state = self.state();
            if state.in_flight.is_some() {
                return false;
            }
            if let Some(generation) = generation {
                if state.stopped || state.generation != generation {
                    return false;
                }
            }
            let strategy = state.strategy;
            let frame = state.frame;
            (strategy, frame, state.detach())
        };

        strategy.advance(&mut frame, &mut queue);

        self.state().reattach(queue, frame);
        true
    }

    /// One pass of the tick loop: run, sweep, check for completion.
    ///
    /// Returns `None` when the pass was skipped (see [`Shared::advance`]).
    fn tick(&self, generation: Option<u64>) -> Option<TickOutcome> {
        {
            let state = self.state();
            if state.completed && state.queue.is_empty() && state.in_flight.is_none() {
                return Some(TickOutcome::Done);
            }
        }

        if !self.advance(generation) {
            return None;
        }

        {
            let mut state = self.state();
            if !state.suppress_cleanup {
                state.cleanup();
            }

            let remaining = state.len();
            tracing::trace!(frame = state.frame, remaining, "tick");
            if remaining > 0 {
                return Some(TickOutcome::Pending { remaining });
            }

            state.halt();
            state.completed = true;
            state.frame = 0;
        }

        // Listeners run unlocked so they can call back into the controller
        tracing::debug!("all effects done");
        let listeners = self.events().snapshot(ControllerEvent::Done);
        for listener in listeners {
            listener();
        }
        Some(TickOutcome::Done)
    }
}

async fn tick_loop(shared: Weak<Shared>, generation: u64, period: Duration) {
    loop {
        let Some(controller) = shared.upgrade() else {
            break;
        };
        match controller.tick(Some(generation)) {
            Some(TickOutcome::Pending { .. }) => {}
            Some(TickOutcome::Done) => break,
            // Skipped: either this loop was replaced or a manual step holds
            // the queue for the moment
            None if !controller.is_current(generation) => break,
            None => {}
        }
        drop(controller);
        tokio::time::sleep(period).await;
    }
}

/// Schedules effects on a fixed tick.
///
/// Cloning yields another handle to the same controller. The tick loop only
/// holds a weak reference, so dropping every handle ends it.
///
/// Effect callbacks and `done` listeners run without the controller locked
/// and may call back into it. A `step` or `run` from inside a callback is
/// ignored.
#[derive(Clone)]
pub struct AnimController {
    shared: Arc<Shared>,
}

impl AnimController {
    pub fn new(config: ControllerConfig) -> Self {
        let state = ControllerState {
            queue: Vec::new(),
            frame: 0,
            strategy: config.strategy,
            tick_interval_ms: config.effective_tick_interval_ms(),
            suppress_cleanup: config.effective_suppress_cleanup(),
            stopped: true,
            completed: false,
            started_at: None,
            task: None,
            generation: 0,
            in_flight: None,
        };

        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                events: Mutex::new(EventDispatcher::new()),
            }),
        }
    }

    /// Create a controller and queue its initial effects
    pub fn with_data(config: ControllerConfig, data: impl Into<EffectBatch>) -> Self {
        let controller = Self::new(config);
        controller.add(data);
        controller
    }

    /// All effects advance together on one timeline
    pub fn parallel(data: impl Into<EffectBatch>) -> Self {
        Self::with_data(ControllerConfig::new(Strategy::Parallel), data)
    }

    /// Effects run one after another
    pub fn serial(data: impl Into<EffectBatch>) -> Self {
        Self::with_data(ControllerConfig::new(Strategy::Serial), data)
    }

    /// Effects run one after another, forever
    pub fn looping(data: impl Into<EffectBatch>) -> Self {
        Self::with_data(ControllerConfig::new(Strategy::Loop), data)
    }

    /// Append one or more effects, compiling descriptors into ticks.
    ///
    /// Ready-made [`Effect`]s are queued as they are.
    pub fn add(&self, data: impl Into<EffectBatch>) -> &Self {
        let mut state = self.shared.state();
        let added = state.append(data.into());
        tracing::debug!(added, queued = state.len(), "effects added");
        self
    }

    /// Subscribe to a controller event
    pub fn on<F>(&self, event: ControllerEvent, listener: F) -> ListenerId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.shared.events().register(event, listener)
    }

    /// Unsubscribe a listener
    pub fn off(&self, id: ListenerId) -> bool {
        self.shared.events().unregister(id)
    }

    /// Start the tick loop on the current tokio runtime.
    ///
    /// Does nothing if the loop is already running. The frame counter and
    /// queue carry over from before any previous `stop`.
    pub fn start(&self) -> Result<&Self, ControllerError> {
        let runtime = Handle::try_current()?;
        let mut state = self.shared.state();
        if !state.stopped {
            tracing::trace!("start ignored, already running");
            return Ok(self);
        }

        state.stopped = false;
        state.completed = false;
        state.started_at = Some(Instant::now());
        state.generation += 1;

        let period = Duration::from_millis(state.tick_interval_ms);
        let task = tick_loop(Arc::downgrade(&self.shared), state.generation, period);
        state.task = Some(runtime.spawn(task));

        tracing::debug!(
            strategy = ?state.strategy,
            queued = state.len(),
            frame = state.frame,
            "controller started"
        );
        Ok(self)
    }

    /// Cancel the pending tick. Safe to call when not running.
    pub fn stop(&self) {
        let mut state = self.shared.state();
        if !state.stopped {
            tracing::debug!(frame = state.frame, "controller stopped");
        }
        state.halt();
    }

    /// Advance the strategy by one tick, without cleanup or completion
    pub fn run(&self) {
        self.shared.advance(None);
    }

    /// Run one pass of the tick loop synchronously.
    ///
    /// Emits `done` the first time the queue is found empty, then rewinds
    /// the frame counter so effects added afterwards start from 0.
    pub fn step(&self) -> TickOutcome {
        self.shared.tick(None).unwrap_or_else(|| TickOutcome::Pending {
            remaining: self.len(),
        })
    }

    /// Number of queued effects
    pub fn len(&self) -> usize {
        self.shared.state().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn frame(&self) -> u64 {
        self.shared.state().frame
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.state().stopped
    }

    pub fn is_running(&self) -> bool {
        !self.is_stopped()
    }

    pub fn strategy(&self) -> Strategy {
        self.shared.state().strategy
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.shared.state().tick_interval_ms)
    }

    pub fn suppresses_cleanup(&self) -> bool {
        self.shared.state().suppress_cleanup
    }

    /// Time since the last `start`
    pub fn elapsed(&self) -> Option<Duration> {
        self.shared.state().started_at.map(|at| at.elapsed())
    }

    /// Compiled timing of every queued effect, in queue order
    pub fn timings(&self) -> Vec<EffectTiming> {
        self.shared.state().queue.iter().map(Effect::timing).collect()
    }
}

impl Default for AnimController {
    fn default() -> Self {
        Self::new(ControllerConfig::default())
    }
}

impl fmt::Debug for AnimController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state();
        f.debug_struct("AnimController")
            .field("strategy", &state.strategy)
            .field("frame", &state.frame)
            .field("queued", &state.len())
            .field("stopped", &state.stopped)
            .finish()
    }
}
