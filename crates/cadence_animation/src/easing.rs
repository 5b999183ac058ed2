//! Easing functions for effect callbacks
//!
//! Effects receive raw linear progress. Callbacks that move something on
//! screen map that progress through one of these curves.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Easing curve
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    #[default]
    Linear,
    /// Half-cosine ease in and out
    Cosine,
    /// Parabolic there-and-back: leaves `from`, peaks at the midpoint, returns
    Arc,
    InQuad,
    OutQuad,
    InOutQuad,
    InCubic,
    OutCubic,
    InOutCubic,
    InExpo,
    OutExpo,
    InOutExpo,
    /// `InOutExpo` with the back half pulled 5% short until 85% progress
    InOutExpoDamped,
}

impl Easing {
    /// Apply the easing function to a progress value (0.0 to 1.0)
    pub fn apply(&self, t: f64) -> f64 {
        match self {
            Easing::Linear => t,
            Easing::Cosine => (1.0 - (t * PI).cos()) * 0.5,
            Easing::Arc => {
                let u = (t - 0.5) * 2.0;
                1.0 - u * u
            }
            Easing::InQuad => t * t,
            Easing::OutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::InOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Easing::InCubic => t * t * t,
            Easing::OutCubic => 1.0 - (1.0 - t).powi(3),
            Easing::InOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            Easing::InExpo => 2f64.powf(10.0 * (t - 1.0)),
            Easing::OutExpo => 1.0 - 2f64.powf(-10.0 * t),
            Easing::InOutExpo => in_out_expo(t, 1.0),
            Easing::InOutExpoDamped => in_out_expo(t, 0.95),
        }
    }

    /// Map progress onto the range `from..to`.
    ///
    /// `Arc` is the exception: it rises from `from` by `to` at the midpoint
    /// and falls back, so `to` acts as an amplitude rather than an endpoint.
    pub fn interpolate(&self, from: f64, to: f64, t: f64) -> f64 {
        match self {
            Easing::Arc => from + to * self.apply(t),
            _ => from + (to - from) * self.apply(t),
        }
    }
}

fn in_out_expo(t: f64, damping: f64) -> f64 {
    let u = t * 2.0;
    if u < 1.0 {
        return 0.5 * 2f64.powf(10.0 * (u - 1.0));
    }
    let back = 0.5 * (2.0 - 2f64.powf(-10.0 * (u - 1.0)));
    if u < 1.7 {
        back * damping
    } else {
        back
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_endpoints() {
        for easing in [
            Easing::Linear,
            Easing::Cosine,
            Easing::InQuad,
            Easing::OutQuad,
            Easing::InOutQuad,
            Easing::InCubic,
            Easing::OutCubic,
            Easing::InOutCubic,
            Easing::InOutExpo,
        ] {
            assert!(close(easing.apply(0.0), 0.0), "{easing:?} at 0");
            assert!(close(easing.apply(1.0), 1.0), "{easing:?} at 1");
        }
    }

    #[test]
    fn test_cosine_midpoint() {
        assert!(close(Easing::Cosine.apply(0.5), 0.5));
        assert!(close(Easing::Cosine.interpolate(0.0, 500.0, 0.5), 250.0));
    }

    #[test]
    fn test_arc_returns_to_start() {
        assert!(close(Easing::Arc.interpolate(10.0, 40.0, 0.0), 10.0));
        assert!(close(Easing::Arc.interpolate(10.0, 40.0, 0.5), 50.0));
        assert!(close(Easing::Arc.interpolate(10.0, 40.0, 1.0), 10.0));
    }

    #[test]
    fn test_expo_ends() {
        // Exponential curves approach but do not reach their far endpoint
        assert!(Easing::InExpo.apply(0.0) < 0.001);
        assert!(close(Easing::InExpo.apply(1.0), 1.0));
        assert!(close(Easing::OutExpo.apply(0.0), 0.0));
        assert!(Easing::OutExpo.apply(1.0) > 0.999);
    }

    #[test]
    fn test_damped_expo_undershoots_back_half() {
        let t = 0.7;
        assert!(Easing::InOutExpoDamped.apply(t) < Easing::InOutExpo.apply(t));
        assert!(close(
            Easing::InOutExpoDamped.apply(0.3),
            Easing::InOutExpo.apply(0.3)
        ));
        assert!(close(
            Easing::InOutExpoDamped.apply(0.9),
            Easing::InOutExpo.apply(0.9)
        ));
    }

    #[test]
    fn test_interpolate_range() {
        assert!(close(Easing::Linear.interpolate(0.0, 300.0, 0.25), 75.0));
        assert!(close(Easing::InQuad.interpolate(100.0, 0.0, 0.5), 75.0));
    }
}
