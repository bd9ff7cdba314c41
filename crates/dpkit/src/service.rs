use alloc::string::String;

use serde::{Deserialize, Serialize};

/// Service kinds exposed to a home-automation host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceKind {
    /// An air purifier, used for extraction hoods.
    AirPurifier,
    /// A light.
    Lightbulb,
    /// A generic on/off switch.
    Switch,
    /// A motorized cover.
    WindowCovering,
    /// A temperature sensor.
    TemperatureSensor,
    /// A relative humidity sensor.
    HumiditySensor,
}

impl ServiceKind {
    /// Returns the service name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AirPurifier => "Air Purifier",
            Self::Lightbulb => "Lightbulb",
            Self::Switch => "Switch",
            Self::WindowCovering => "Window Covering",
            Self::TemperatureSensor => "Temperature Sensor",
            Self::HumiditySensor => "Humidity Sensor",
        }
    }
}

impl core::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.name().fmt(f)
    }
}

/// The identity of a service inside an accessory.
///
/// A service is identified by its kind plus an optional subtype, so an
/// accessory can host more services of the same kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceId {
    /// Service kind.
    pub kind: ServiceKind,
    /// Service subtype.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
}

impl ServiceId {
    /// Creates the [`ServiceId`] of a service without subtype.
    #[must_use]
    pub const fn primary(kind: ServiceKind) -> Self {
        Self {
            kind,
            subtype: None,
        }
    }

    /// Creates a [`ServiceId`] with a subtype.
    #[must_use]
    #[inline]
    pub fn with_subtype(kind: ServiceKind, subtype: impl Into<String>) -> Self {
        Self {
            kind,
            subtype: Some(subtype.into()),
        }
    }

    /// Creates a [`ServiceId`] from an optional subtype.
    #[must_use]
    #[inline]
    pub fn new(kind: ServiceKind, subtype: Option<&str>) -> Self {
        Self {
            kind,
            subtype: subtype.map(String::from),
        }
    }

    /// Returns the subtype.
    #[must_use]
    #[inline]
    pub fn subtype(&self) -> Option<&str> {
        self.subtype.as_deref()
    }
}

impl core::fmt::Display for ServiceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match &self.subtype {
            Some(subtype) => write!(f, "{} ({subtype})", self.kind),
            None => self.kind.fmt(f),
        }
    }
}
