//! Cadence Animation System
//!
//! Fixed-tick scheduling of timed callbacks ("effects").
//!
//! # Features
//!
//! - **Effects**: a callback driven with progress `0.0..=1.0` over a duration,
//!   after a delay
//! - **Composition**: run effects in parallel, one after another, or in a loop
//! - **Relative delays**: `"+=100"` / `"-=100"` offsets from the previous
//!   effect's end, resolved once when queued
//! - **Easing**: curves for mapping progress onto values
//!
//! # Example
//!
//! ```rust
//! use cadence_animation::{AnimController, EffectSpec, Easing, TickOutcome};
//! use std::sync::{Arc, Mutex};
//!
//! let left = Arc::new(Mutex::new(0.0));
//! let sink = left.clone();
//!
//! let controller = AnimController::parallel(
//!     EffectSpec::new()
//!         .duration(64.0)
//!         .callback(move |t| *sink.lock().unwrap() = Easing::Linear.interpolate(0.0, 400.0, t)),
//! );
//!
//! while controller.step() != TickOutcome::Done {}
//! assert_eq!(*left.lock().unwrap(), 400.0);
//! ```

pub mod config;
pub mod controller;
pub mod delay;
pub mod easing;
pub mod effect;
pub mod strategy;

pub use cadence_core::{ControllerEvent, ListenerId};
pub use config::{ControllerConfig, DEFAULT_TICK_INTERVAL_MS};
pub use controller::{AnimController, ControllerError, TickOutcome};
pub use delay::{Delay, DelayParseError, Sign};
pub use easing::Easing;
pub use effect::{Effect, EffectBatch, EffectCallback, EffectInput, EffectSpec, EffectTiming};
pub use strategy::Strategy;
