//! Delay expressions
//!
//! Effect descriptors give their delay in milliseconds, either as an absolute
//! value or as an offset from the end of the previously queued effect
//! (`"+=100"`, `"-=250"`). Expressions are resolved into whole ticks once,
//! when the effect is added to a controller.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Direction of a relative delay offset
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Sign {
    /// `+=`: start after the anchor
    Plus,
    /// `-=`: start before the anchor (overlap)
    Minus,
}

/// A delay as given by the caller, before tick conversion
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDelay", into = "RawDelay")]
pub enum Delay {
    /// Milliseconds from the start of the effect's timeline
    Absolute(f64),
    /// Milliseconds relative to the previous queued effect's end
    Relative { sign: Sign, ms: f64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DelayParseError {
    #[error("empty delay expression")]
    Empty,
    #[error("invalid delay value `{0}`")]
    InvalidNumber(String),
    #[error("delay `{0}` is not a finite number")]
    NotFinite(String),
}

impl Delay {
    pub const ZERO: Delay = Delay::Absolute(0.0);

    pub fn is_relative(&self) -> bool {
        matches!(self, Delay::Relative { .. })
    }

    /// Resolve into ticks.
    ///
    /// `anchor` is the end tick of the previous queued effect. It is only
    /// applied to relative offsets when `chained` is set; otherwise the offset
    /// counts from the start of the effect's own timeline. Results below zero
    /// clamp to zero.
    pub fn resolve(&self, anchor: u64, tick_interval_ms: u64, chained: bool) -> u64 {
        let ticks = match *self {
            Delay::Absolute(ms) => ms_to_ticks(ms, tick_interval_ms),
            Delay::Relative { sign, ms } => {
                let offset = ms_to_ticks(ms, tick_interval_ms);
                let offset = match sign {
                    Sign::Plus => offset,
                    Sign::Minus => -offset,
                };
                let base = if chained {
                    i64::try_from(anchor).unwrap_or(i64::MAX)
                } else {
                    0
                };
                base.saturating_add(offset)
            }
        };
        ticks.max(0) as u64
    }
}

impl Default for Delay {
    fn default() -> Self {
        Delay::ZERO
    }
}

/// `floor(ms / tick)`, with non-finite input treated as zero
pub(crate) fn ms_to_ticks(ms: f64, tick_interval_ms: u64) -> i64 {
    if !ms.is_finite() {
        return 0;
    }
    (ms / tick_interval_ms.max(1) as f64).floor() as i64
}

fn parse_ms(text: &str) -> Result<f64, DelayParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(DelayParseError::Empty);
    }
    let ms: f64 = text
        .parse()
        .map_err(|_| DelayParseError::InvalidNumber(text.to_string()))?;
    if !ms.is_finite() {
        return Err(DelayParseError::NotFinite(text.to_string()));
    }
    Ok(ms)
}

impl FromStr for Delay {
    type Err = DelayParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(rest) = s.strip_prefix("+=") {
            return Ok(Delay::Relative {
                sign: Sign::Plus,
                ms: parse_ms(rest)?,
            });
        }
        if let Some(rest) = s.strip_prefix("-=") {
            return Ok(Delay::Relative {
                sign: Sign::Minus,
                ms: parse_ms(rest)?,
            });
        }
        parse_ms(s).map(Delay::Absolute)
    }
}

impl fmt::Display for Delay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delay::Absolute(ms) => write!(f, "{ms}"),
            Delay::Relative { sign: Sign::Plus, ms } => write!(f, "+={ms}"),
            Delay::Relative { sign: Sign::Minus, ms } => write!(f, "-={ms}"),
        }
    }
}

impl From<f64> for Delay {
    fn from(ms: f64) -> Self {
        Delay::Absolute(ms)
    }
}

impl From<u32> for Delay {
    fn from(ms: u32) -> Self {
        Delay::Absolute(ms as f64)
    }
}

impl From<u64> for Delay {
    fn from(ms: u64) -> Self {
        Delay::Absolute(ms as f64)
    }
}

impl From<i32> for Delay {
    fn from(ms: i32) -> Self {
        Delay::Absolute(ms as f64)
    }
}

/// Lenient conversion: text that does not parse becomes a zero delay.
impl From<&str> for Delay {
    fn from(text: &str) -> Self {
        text.parse().unwrap_or_else(|err| {
            tracing::warn!(%err, "ignoring malformed delay, using 0");
            Delay::ZERO
        })
    }
}

impl From<String> for Delay {
    fn from(text: String) -> Self {
        Delay::from(text.as_str())
    }
}

/// Wire form: a number of milliseconds or an expression string
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum RawDelay {
    Millis(f64),
    Expr(String),
}

impl TryFrom<RawDelay> for Delay {
    type Error = DelayParseError;

    fn try_from(raw: RawDelay) -> Result<Self, Self::Error> {
        match raw {
            RawDelay::Millis(ms) if ms.is_finite() => Ok(Delay::Absolute(ms)),
            RawDelay::Millis(ms) => Err(DelayParseError::NotFinite(ms.to_string())),
            RawDelay::Expr(text) => text.parse(),
        }
    }
}

impl From<Delay> for RawDelay {
    fn from(delay: Delay) -> Self {
        match delay {
            Delay::Absolute(ms) => RawDelay::Millis(ms),
            relative => RawDelay::Expr(relative.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() {
        assert_eq!("250".parse::<Delay>(), Ok(Delay::Absolute(250.0)));
        assert_eq!(" 12.5 ".parse::<Delay>(), Ok(Delay::Absolute(12.5)));
        assert_eq!(
            "+=100".parse::<Delay>(),
            Ok(Delay::Relative {
                sign: Sign::Plus,
                ms: 100.0
            })
        );
        assert_eq!(
            "-= 40".parse::<Delay>(),
            Ok(Delay::Relative {
                sign: Sign::Minus,
                ms: 40.0
            })
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<Delay>(), Err(DelayParseError::Empty));
        assert_eq!("+=".parse::<Delay>(), Err(DelayParseError::Empty));
        assert!(matches!(
            "soon".parse::<Delay>(),
            Err(DelayParseError::InvalidNumber(_))
        ));
        assert!(matches!(
            "inf".parse::<Delay>(),
            Err(DelayParseError::NotFinite(_))
        ));
    }

    #[test]
    fn test_unprefixed_string_is_absolute() {
        // "=100" is neither a relative operator nor a number
        assert_eq!(Delay::from("=100"), Delay::ZERO);
        assert_eq!(Delay::from("100"), Delay::Absolute(100.0));
        assert!(!Delay::from("100").is_relative());
    }

    #[test]
    fn test_lenient_conversion_defaults_to_zero() {
        assert_eq!(Delay::from("later"), Delay::ZERO);
        assert_eq!(Delay::from(String::from("+=oops")), Delay::ZERO);
    }

    #[test]
    fn test_resolve_absolute() {
        assert_eq!(Delay::Absolute(50.0).resolve(99, 16, true), 3);
        assert_eq!(Delay::Absolute(15.9).resolve(0, 16, false), 0);
        assert_eq!(Delay::Absolute(-40.0).resolve(0, 16, false), 0);
    }

    #[test]
    fn test_resolve_relative_chained() {
        let plus = Delay::from("+=100");
        let minus = Delay::from("-=100");

        // anchor 62 ticks = floor(1000 / 16)
        assert_eq!(plus.resolve(62, 16, true), 62 + 6);
        assert_eq!(minus.resolve(62, 16, true), 62 - 6);
        assert_eq!(minus.resolve(3, 16, true), 0);
    }

    #[test]
    fn test_resolve_relative_unchained() {
        assert_eq!(Delay::from("+=100").resolve(62, 16, false), 6);
        assert_eq!(Delay::from("-=100").resolve(62, 16, false), 0);
    }

    #[test]
    fn test_zero_tick_interval_does_not_divide_by_zero() {
        assert_eq!(Delay::Absolute(5.0).resolve(0, 0, false), 5);
    }

    #[test]
    fn test_display() {
        assert_eq!(Delay::from("+=100").to_string(), "+=100");
        assert_eq!(Delay::from("-=7.5").to_string(), "-=7.5");
        assert_eq!(Delay::Absolute(3.0).to_string(), "3");
    }

    #[test]
    fn test_deserialize_from_toml() {
        #[derive(Deserialize)]
        struct Entry {
            delay: Delay,
        }

        let number: Entry = toml::from_str("delay = 50").unwrap();
        assert_eq!(number.delay, Delay::Absolute(50.0));

        let expr: Entry = toml::from_str("delay = \"+=100\"").unwrap();
        assert!(expr.delay.is_relative());

        assert!(toml::from_str::<Entry>("delay = \"whenever\"").is_err());
    }
}
