//! Composition strategies
//!
//! A strategy advances the controller by exactly one tick: it bumps (or
//! rewinds) the frame counter and decides which queued effects run.

use crate::effect::Effect;
use serde::{Deserialize, Serialize};

/// How queued effects are composed over time
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Every due effect advances on every tick, on one shared timeline
    #[default]
    Parallel,
    /// Effects run one after another; each starts its own timeline at 0
    Serial,
    /// Like `Serial`, restarting from the first effect once all have finished
    Loop,
}

impl Strategy {
    /// Advance one tick
    pub fn advance(self, frame: &mut u64, queue: &mut [Effect]) {
        match self {
            Strategy::Parallel => advance_parallel(frame, queue),
            Strategy::Serial => advance_serial(frame, queue),
            Strategy::Loop => advance_loop(frame, queue),
        }
    }

    /// Whether `"+="` / `"-="` delays chain onto the previous effect's end.
    ///
    /// Serial and loop effects already start counting when the previous one
    /// finishes, so their offsets apply to their own timeline instead.
    pub fn chains_relative_delays(self) -> bool {
        matches!(self, Strategy::Parallel)
    }

    /// Loop replays terminated effects, so they must stay queued
    pub fn requires_retention(self) -> bool {
        matches!(self, Strategy::Loop)
    }
}

fn advance_parallel(frame: &mut u64, queue: &mut [Effect]) {
    *frame += 1;
    let elapsed = *frame;

    for effect in queue.iter_mut() {
        if let Some(progress) = effect.progress_at(elapsed) {
            effect.run(progress);
        }
    }
}

fn advance_serial(frame: &mut u64, queue: &mut [Effect]) {
    *frame += 1;

    let Some(effect) = queue.first_mut() else {
        return;
    };
    run_and_rewind(frame, effect);
}

fn advance_loop(frame: &mut u64, queue: &mut [Effect]) {
    let Some(index) = queue.iter().position(|effect| !effect.is_terminal()) else {
        for effect in queue.iter_mut() {
            effect.reset();
        }
        *frame = 0;
        tracing::trace!(effects = queue.len(), "loop restarting");
        return;
    };

    *frame += 1;
    run_and_rewind(frame, &mut queue[index]);
}

/// Run a sequenced effect; once it terminates the next one starts from 0
fn run_and_rewind(frame: &mut u64, effect: &mut Effect) {
    let Some(progress) = effect.progress_at(*frame) else {
        return;
    };
    effect.run(progress);
    if effect.is_terminal() {
        *frame = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<(&'static str, f64)>>>;

    fn effect(log: &Log, name: &'static str, delay: u64, duration: u64) -> Effect {
        let log = log.clone();
        Effect::new(delay, duration, move |t| log.lock().unwrap().push((name, t)))
    }

    fn drain(log: &Log) -> Vec<(&'static str, f64)> {
        std::mem::take(&mut *log.lock().unwrap())
    }

    #[test]
    fn test_parallel_shares_one_timeline() {
        let log: Log = Arc::default();
        let mut queue = vec![effect(&log, "a", 0, 2), effect(&log, "b", 2, 2)];
        let mut frame = 0;

        Strategy::Parallel.advance(&mut frame, &mut queue);
        assert_eq!(drain(&log), vec![("a", 0.5)]);

        Strategy::Parallel.advance(&mut frame, &mut queue);
        assert_eq!(drain(&log), vec![("a", 1.0), ("b", 0.0)]);

        Strategy::Parallel.advance(&mut frame, &mut queue);
        assert_eq!(drain(&log), vec![("b", 0.5)]);
        assert!(queue[0].is_terminal());

        Strategy::Parallel.advance(&mut frame, &mut queue);
        assert_eq!(drain(&log), vec![("b", 1.0)]);

        Strategy::Parallel.advance(&mut frame, &mut queue);
        assert!(drain(&log).is_empty());
        assert!(queue.iter().all(Effect::is_terminal));
        assert_eq!(frame, 5);
    }

    #[test]
    fn test_serial_only_drives_head() {
        let log: Log = Arc::default();
        let mut queue = vec![effect(&log, "a", 0, 2), effect(&log, "b", 0, 2)];
        let mut frame = 0;

        Strategy::Serial.advance(&mut frame, &mut queue);
        Strategy::Serial.advance(&mut frame, &mut queue);
        assert_eq!(drain(&log), vec![("a", 0.5), ("a", 1.0)]);

        Strategy::Serial.advance(&mut frame, &mut queue);
        assert!(queue[0].is_terminal());
        assert_eq!(frame, 0);
        assert!(drain(&log).is_empty());
    }

    #[test]
    fn test_serial_waits_for_delay() {
        let log: Log = Arc::default();
        let mut queue = vec![effect(&log, "a", 2, 1)];
        let mut frame = 0;

        Strategy::Serial.advance(&mut frame, &mut queue);
        assert!(drain(&log).is_empty());

        Strategy::Serial.advance(&mut frame, &mut queue);
        assert_eq!(drain(&log), vec![("a", 0.0)]);
    }

    #[test]
    fn test_serial_on_empty_queue() {
        let mut frame = 0;
        Strategy::Serial.advance(&mut frame, &mut []);
        assert_eq!(frame, 1);
    }

    #[test]
    fn test_loop_replays_after_all_terminal() {
        let log: Log = Arc::default();
        let mut queue = vec![effect(&log, "a", 0, 2)];
        let mut frame = 0;

        for _ in 0..3 {
            Strategy::Loop.advance(&mut frame, &mut queue);
        }
        assert!(queue[0].is_terminal());
        assert_eq!(frame, 0);
        assert_eq!(drain(&log), vec![("a", 0.5), ("a", 1.0)]);

        // Restart tick: reset only, nothing runs
        Strategy::Loop.advance(&mut frame, &mut queue);
        assert!(!queue[0].is_terminal());
        assert_eq!(frame, 0);
        assert!(drain(&log).is_empty());

        Strategy::Loop.advance(&mut frame, &mut queue);
        Strategy::Loop.advance(&mut frame, &mut queue);
        assert_eq!(drain(&log), vec![("a", 0.5), ("a", 1.0)]);
    }

    #[test]
    fn test_loop_skips_terminated_entries() {
        let log: Log = Arc::default();
        let mut queue = vec![effect(&log, "a", 0, 1), effect(&log, "b", 1, 1)];
        let mut frame = 0;

        // a: progress 1, then overshoot
        Strategy::Loop.advance(&mut frame, &mut queue);
        Strategy::Loop.advance(&mut frame, &mut queue);
        assert!(queue[0].is_terminal());

        // b starts from frame 0 and honours its own delay
        Strategy::Loop.advance(&mut frame, &mut queue);
        Strategy::Loop.advance(&mut frame, &mut queue);
        assert_eq!(drain(&log), vec![("a", 1.0), ("b", 0.0), ("b", 1.0)]);
    }

    #[test]
    fn test_relative_chaining_flags() {
        assert!(Strategy::Parallel.chains_relative_delays());
        assert!(!Strategy::Serial.chains_relative_delays());
        assert!(!Strategy::Loop.chains_relative_delays());
        assert!(Strategy::Loop.requires_retention());
        assert_eq!(Strategy::default(), Strategy::Parallel);
    }
}
