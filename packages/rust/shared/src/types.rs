//! Core domain types shared by the engine and the CLI.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SwapStrategy
// ---------------------------------------------------------------------------

/// How an OOB node replaces or merges with a live target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SwapStrategy {
    /// `true` or any unrecognized value. Behaves as [`SwapStrategy::OuterHtml`].
    Default,
    /// Replace the whole target element.
    #[serde(rename = "outerHTML")]
    OuterHtml,
    /// Replace only the target's children.
    #[serde(rename = "innerHTML")]
    InnerHtml,
    /// Remove the target from the document.
    Delete,
}

impl SwapStrategy {
    /// Map a marker keyword to a strategy. Unknown keywords yield `None`.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "true" => Some(Self::Default),
            "outerHTML" => Some(Self::OuterHtml),
            "innerHTML" => Some(Self::InnerHtml),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }

    /// The strategy actually carried out (`Default` runs as `OuterHtml`).
    pub fn effective(self) -> Self {
        match self {
            Self::Default => Self::OuterHtml,
            other => other,
        }
    }

    /// Marker keyword for this strategy.
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Default => "true",
            Self::OuterHtml => "outerHTML",
            Self::InnerHtml => "innerHTML",
            Self::Delete => "delete",
        }
    }
}

impl std::fmt::Display for SwapStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

// ---------------------------------------------------------------------------
// SwapTiming
// ---------------------------------------------------------------------------

/// Effective timing applied to one swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SwapTiming {
    /// Delay before the structural mutation.
    #[serde(with = "interval_ms")]
    pub swap_delay: Duration,
    /// Delay between the structural mutation and final attribute/class state.
    #[serde(with = "interval_ms")]
    pub settle_delay: Duration,
    /// Whether the structural mutation was scheduled rather than run inline.
    pub deferred: bool,
}

impl SwapTiming {
    /// Total time until the swap is fully settled.
    pub fn total(&self) -> Duration {
        self.swap_delay + self.settle_delay
    }
}

// ---------------------------------------------------------------------------
// Interval parsing
// ---------------------------------------------------------------------------

/// Matches `10`, `10ms`, `1.5s`, `2m`.
static INTERVAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+(?:\.\d+)?)(ms|s|m)?$").expect("interval regex")
});

/// Parse an interval such as `10ms`, `1s`, `0.5s` or `250` (milliseconds).
///
/// Returns `None` for negative, empty or otherwise malformed input.
pub fn parse_interval(input: &str) -> Option<Duration> {
    let caps = INTERVAL_RE.captures(input.trim())?;
    let value: f64 = caps[1].parse().ok()?;
    let unit_nanos = match caps.get(2).map(|m| m.as_str()) {
        None | Some("ms") => 1_000_000.0,
        Some("s") => 1_000_000_000.0,
        Some("m") => 60_000_000_000.0,
        Some(_) => return None,
    };
    let nanos = (value * unit_nanos).round();
    if !nanos.is_finite() || nanos > u64::MAX as f64 {
        return None;
    }
    Some(Duration::from_nanos(nanos as u64))
}

/// Render an interval in the marker grammar (`20ms`).
pub fn format_interval(duration: Duration) -> String {
    format!("{}ms", duration.as_millis())
}

/// Serde adapter: `Duration` as integer milliseconds.
pub mod interval_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

/// Serde adapter: `Duration` as an interval string (`"20ms"`, `"1s"`).
pub mod interval_str {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_interval(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_interval(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid interval `{raw}`")))
    }
}
