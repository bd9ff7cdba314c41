use serde::{Deserialize, Serialize};

use crate::service::ServiceId;

/// The value domain of a characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Props {
    /// Minimum value.
    pub min: f64,
    /// Maximum value.
    pub max: f64,
    /// Step.
    pub step: f64,
}

impl Props {
    /// The domain of two-state characteristics.
    pub const BOOLEAN: Self = Self::new(0., 1., 1.);

    /// The `0..=100` percentage domain.
    pub const PERCENTAGE: Self = Self::new(0., 100., 1.);

    /// Creates [`Props`].
    #[must_use]
    pub const fn new(min: f64, max: f64, step: f64) -> Self {
        Self { min, max, step }
    }

    /// Changes the step.
    #[must_use]
    pub const fn step(mut self, step: f64) -> Self {
        self.step = step;
        self
    }

    /// Checks whether a value lies inside the domain bounds.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Characteristic kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CharacteristicKind {
    /// Whether a device is active.
    Active,
    /// The current state of an air purifier.
    CurrentAirPurifierState,
    /// The requested operating mode of an air purifier.
    TargetAirPurifierState,
    /// Whether the physical controls are locked.
    LockPhysicalControls,
    /// Rotation speed as a percentage or as a level.
    RotationSpeed,
    /// On/off state.
    On,
    /// Brightness percentage.
    Brightness,
    /// Color temperature, in mireds.
    ColorTemperature,
    /// Hue, in degrees.
    Hue,
    /// Saturation percentage.
    Saturation,
    /// Battery charge percentage.
    BatteryLevel,
    /// Whether the device is currently performing its task.
    StatusActive,
    /// Temperature, in degrees Celsius.
    CurrentTemperature,
    /// Relative humidity percentage.
    CurrentRelativeHumidity,
    /// Current position percentage.
    CurrentPosition,
    /// Requested position percentage.
    TargetPosition,
    /// Motion direction.
    PositionState,
}

impl CharacteristicKind {
    /// Returns the characteristic name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::CurrentAirPurifierState => "Current Air Purifier State",
            Self::TargetAirPurifierState => "Target Air Purifier State",
            Self::LockPhysicalControls => "Lock Physical Controls",
            Self::RotationSpeed => "Rotation Speed",
            Self::On => "On",
            Self::Brightness => "Brightness",
            Self::ColorTemperature => "Color Temperature",
            Self::Hue => "Hue",
            Self::Saturation => "Saturation",
            Self::BatteryLevel => "Battery Level",
            Self::StatusActive => "Status Active",
            Self::CurrentTemperature => "Current Temperature",
            Self::CurrentRelativeHumidity => "Current Relative Humidity",
            Self::CurrentPosition => "Current Position",
            Self::TargetPosition => "Target Position",
            Self::PositionState => "Position State",
        }
    }

    /// Returns the default value domain.
    #[must_use]
    pub const fn default_props(self) -> Props {
        match self {
            Self::Active
            | Self::TargetAirPurifierState
            | Self::LockPhysicalControls
            | Self::On
            | Self::StatusActive => Props::BOOLEAN,
            Self::CurrentAirPurifierState | Self::PositionState => Props::new(0., 2., 1.),
            Self::RotationSpeed
            | Self::Brightness
            | Self::Saturation
            | Self::BatteryLevel
            | Self::CurrentRelativeHumidity
            | Self::CurrentPosition
            | Self::TargetPosition => Props::PERCENTAGE,
            Self::ColorTemperature => Props::new(140., 500., 1.),
            Self::Hue => Props::new(0., 360., 1.),
            Self::CurrentTemperature => Props::new(-270., 100., 0.1),
        }
    }

    /// Returns the value reported when nothing is known yet.
    #[must_use]
    pub const fn default_value(self) -> CharacteristicValue {
        match self {
            Self::On | Self::StatusActive => CharacteristicValue::Bool(false),
            Self::ColorTemperature => CharacteristicValue::Int(140),
            Self::PositionState => CharacteristicValue::Int(PositionState::Stopped as i64),
            Self::CurrentTemperature => CharacteristicValue::Float(0.),
            _ => CharacteristicValue::Int(0),
        }
    }
}

impl core::fmt::Display for CharacteristicKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.name().fmt(f)
    }
}

/// A characteristic value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CharacteristicValue {
    /// A boolean.
    Bool(bool),
    /// An integer.
    Int(i64),
    /// A floating point number.
    Float(f64),
}

impl CharacteristicValue {
    /// Interprets the value as a boolean.
    ///
    /// Numbers are `true` when different from zero.
    #[must_use]
    pub const fn as_bool(self) -> bool {
        match self {
            Self::Bool(value) => value,
            Self::Int(value) => value != 0,
            Self::Float(value) => value != 0.,
        }
    }

    /// Interprets the value as an integer, truncating floating point numbers.
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        match self {
            Self::Bool(value) => value as i64,
            Self::Int(value) => value,
            Self::Float(value) => value as i64,
        }
    }

    /// Interprets the value as a floating point number.
    #[must_use]
    pub const fn as_f64(self) -> f64 {
        match self {
            Self::Bool(value) => value as u8 as f64,
            Self::Int(value) => value as f64,
            Self::Float(value) => value,
        }
    }
}

impl core::fmt::Display for CharacteristicValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Bool(value) => value.fmt(f),
            Self::Int(value) => value.fmt(f),
            Self::Float(value) => value.fmt(f),
        }
    }
}

impl From<bool> for CharacteristicValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for CharacteristicValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for CharacteristicValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

macro_rules! state_value {
    ($($state:ident),+) => {
        $(
            impl From<$state> for CharacteristicValue {
                fn from(state: $state) -> Self {
                    Self::Int(state as i64)
                }
            }
        )+
    };
}

/// Motion direction of a window covering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PositionState {
    /// Closing.
    Decreasing = 0,
    /// Opening.
    Increasing = 1,
    /// Not moving.
    Stopped = 2,
}

/// Current state of an air purifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CurrentAirPurifierState {
    /// Switched off.
    Inactive = 0,
    /// Switched on, but idle.
    Idle = 1,
    /// Working.
    PurifyingAir = 2,
}

/// Requested operating mode of an air purifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetAirPurifierState {
    /// Manual operation.
    Manual = 0,
    /// Automatic operation.
    Auto = 1,
}

state_value!(PositionState, CurrentAirPurifierState, TargetAirPurifierState);

/// A value pushed to a home-automation host outside of a read request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacteristicUpdate {
    /// The service hosting the characteristic.
    pub service: ServiceId,
    /// The characteristic.
    pub characteristic: CharacteristicKind,
    /// The new value.
    pub value: CharacteristicValue,
}

impl CharacteristicUpdate {
    /// Creates a [`CharacteristicUpdate`].
    #[must_use]
    pub const fn new(
        service: ServiceId,
        characteristic: CharacteristicKind,
        value: CharacteristicValue,
    ) -> Self {
        Self {
            service,
            characteristic,
            value,
        }
    }
}
