use dpkit::schema::{EnumProperty, IntegerProperty};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use tracing::warn;

/// The coolest color temperature, in mireds.
pub const MIRED_MIN: f64 = 140.;
/// The warmest color temperature, in mireds.
pub const MIRED_MAX: f64 = 500.;

// Saturation and value upper bound for colour codes which do not declare it.
const COLOUR_DEFAULT_MAX: f64 = 1000.;

/// Clamps a value to `[min, max]`.
///
/// Unlike [`f64::clamp`], an inverted range never panics: `max` wins.
#[must_use]
#[inline]
pub fn limit(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}

/// Converts a raw scaled integer into engineering units clamped to
/// `[min, max]`.
#[must_use]
#[inline]
pub fn scaled(raw: f64, property: &IntegerProperty, min: f64, max: f64) -> f64 {
    limit(property.to_units(raw), min, max)
}

/// Converts a value in engineering units into a raw scaled integer clamped
/// to the raw bounds declared by the property.
#[must_use]
pub fn unscaled(external: f64, property: &IntegerProperty) -> i64 {
    let raw = (external * property.multiple() as f64).round() as i64;
    raw.max(property.min).min(property.max)
}

/// Linearly maps a value from the `from` range onto the `to` range.
///
/// A degenerate `from` range maps everything onto the start of `to`.
#[must_use]
pub fn remap(value: f64, from: (f64, f64), to: (f64, f64)) -> f64 {
    let span = from.1 - from.0;
    if span == 0. {
        return to.0;
    }
    to.0 + (value - from.0) * (to.1 - to.0) / span
}

/// Converts a raw numeric value into a percentage clamped to `[0, 100]`.
///
/// Non numeric values yield [`None`].
#[must_use]
pub fn percent(raw: &Value) -> Option<i64> {
    raw.as_f64()
        .map(|value| limit(value.round(), 0., 100.) as i64)
}

/// Maps a cover control token onto a coarse position.
#[must_use]
pub fn coarse_position(token: &str) -> Option<i64> {
    match token {
        "close" | "FZ" => Some(0),
        "stop" | "STOP" => Some(50),
        "open" | "ZZ" => Some(100),
        _ => None,
    }
}

/// Maps an optional cover control token onto a coarse position, falling
/// back to the midpoint on unknown tokens.
///
/// An absent token is not an error and maps silently to the midpoint.
#[must_use]
pub fn coarse_position_or_midpoint(token: Option<&str>, context: &str) -> i64 {
    let Some(token) = token else {
        return 50;
    };
    coarse_position(token).unwrap_or_else(|| {
        warn!("Unknown {context}: `{token}`, use 50");
        50
    })
}

/// Token vocabulary of cover control codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverDialect {
    /// `FZ`, `STOP` and `ZZ` tokens.
    Legacy,
    /// `close`, `stop` and `open` tokens.
    Modern,
}

impl CoverDialect {
    /// Detects the dialect from the declared tokens of a control code.
    ///
    /// The modern dialect is detected iff the range declares `open`.
    #[must_use]
    pub fn detect(property: Option<&EnumProperty>) -> Self {
        match property {
            Some(property) if property.contains("open") => Self::Modern,
            _ => Self::Legacy,
        }
    }

    /// Returns the control token for a target position.
    ///
    /// Only `0` and `100` have a dedicated token, any other position stops
    /// the cover.
    #[must_use]
    pub const fn command(self, target: i64) -> &'static str {
        match (self, target) {
            (Self::Legacy, 0) => "FZ",
            (Self::Legacy, 100) => "ZZ",
            (Self::Legacy, _) => "STOP",
            (Self::Modern, 0) => "close",
            (Self::Modern, 100) => "open",
            (Self::Modern, _) => "stop",
        }
    }
}

/// Returns the 1-based speed level of a token.
#[must_use]
pub fn speed_level(property: &EnumProperty, token: &str) -> Option<i64> {
    property.position(token).map(|index| index as i64 + 1)
}

/// Returns the token of a 1-based speed level.
///
/// Levels above the number of tokens select the last token, while level `0`
/// and below select nothing.
#[must_use]
pub fn speed_token(property: &EnumProperty, level: i64) -> Option<&str> {
    if level <= 0 || property.is_empty() {
        return None;
    }
    let index = usize::try_from(level).map_or(property.len(), |level| level.min(property.len()));
    property.token(index - 1)
}

/// Converts a raw color temperature into mireds.
///
/// The maximum raw value is the coolest temperature.
#[must_use]
pub fn raw_to_mired(raw: f64, property: &IntegerProperty) -> i64 {
    let raw = limit(raw, property.min as f64, property.max as f64);
    remap(
        raw,
        (property.min as f64, property.max as f64),
        (MIRED_MAX, MIRED_MIN),
    )
    .round() as i64
}

/// Converts mireds into a raw color temperature.
#[must_use]
pub fn mired_to_raw(mired: f64, property: &IntegerProperty) -> i64 {
    let mired = limit(mired, MIRED_MIN, MIRED_MAX);
    let raw = remap(
        mired,
        (MIRED_MAX, MIRED_MIN),
        (property.min as f64, property.max as f64),
    )
    .round() as i64;
    raw.max(property.min).min(property.max)
}

/// A colour value as published by colour codes.
///
/// Hue is expressed in degrees, saturation and value in device units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ColourData {
    /// Hue.
    #[serde(default)]
    pub h: f64,
    /// Saturation.
    #[serde(default)]
    pub s: f64,
    /// Value.
    #[serde(default)]
    pub v: f64,
}

impl ColourData {
    /// Parses a [`ColourData`] from either a JSON object or a JSON-encoded
    /// string.
    #[must_use]
    pub fn parse(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) => serde_json::from_str(text).ok(),
            Value::Object(_) => Self::deserialize(value).ok(),
            _ => None,
        }
    }

    /// Serializes the colour as a JSON object.
    #[must_use]
    pub fn to_value(self) -> Value {
        serde_json::json!({
            "h": self.h.round() as i64,
            "s": self.s.round() as i64,
            "v": self.v.round() as i64,
        })
    }
}

/// The saturation and value range of a colour code.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColourRange {
    /// Saturation upper bound, in device units.
    pub s_max: f64,
    /// Value upper bound, in device units.
    pub v_max: f64,
}

impl ColourRange {
    /// Reads the range declared by the property of a colour code.
    ///
    /// Missing bounds default to `1000`.
    #[must_use]
    pub fn from_property(property: Option<&Value>) -> Self {
        let bound = |channel: &str| {
            property
                .and_then(|property| property.get(channel))
                .and_then(|channel| channel.get("max"))
                .and_then(Value::as_f64)
                .filter(|max| *max > 0.)
                .unwrap_or(COLOUR_DEFAULT_MAX)
        };

        Self {
            s_max: bound("s"),
            v_max: bound("v"),
        }
    }

    /// Converts a device saturation into a percentage.
    #[must_use]
    pub fn saturation(&self, colour: &ColourData) -> i64 {
        limit(remap(colour.s, (0., self.s_max), (0., 100.)).round(), 0., 100.) as i64
    }

    /// Converts a device value into a percentage.
    #[must_use]
    pub fn brightness(&self, colour: &ColourData) -> i64 {
        limit(remap(colour.v, (0., self.v_max), (0., 100.)).round(), 0., 100.) as i64
    }

    /// Converts a saturation percentage into device units.
    #[must_use]
    pub fn device_saturation(&self, percent: f64) -> f64 {
        remap(limit(percent, 0., 100.), (0., 100.), (0., self.s_max)).round()
    }

    /// Converts a brightness percentage into device units.
    #[must_use]
    pub fn device_value(&self, percent: f64) -> f64 {
        remap(limit(percent, 0., 100.), (0., 100.), (0., self.v_max)).round()
    }
}
