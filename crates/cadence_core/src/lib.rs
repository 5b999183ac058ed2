//! Cadence Core
//!
//! Primitives shared by the Cadence crates:
//!
//! - **Event Dispatch**: listener registration and notification for
//!   controller lifecycle events such as `done`
//!
//! # Example
//!
//! ```rust
//! use cadence_core::{ControllerEvent, EventDispatcher};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let fired = Arc::new(AtomicUsize::new(0));
//! let mut dispatcher = EventDispatcher::new();
//!
//! let counter = fired.clone();
//! dispatcher.register(ControllerEvent::Done, move || {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! dispatcher.dispatch(ControllerEvent::Done);
//! assert_eq!(fired.load(Ordering::SeqCst), 1);
//! ```

pub mod events;

pub use events::{ControllerEvent, EventDispatcher, Listener, ListenerId};
