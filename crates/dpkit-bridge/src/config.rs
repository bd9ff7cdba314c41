use serde::Deserialize;

use crate::accessory::{AccessoryOptions, Category};

/// Per-device configuration overrides.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DeviceOverride {
    id: String,
    #[serde(default)]
    category: Option<Category>,
    #[serde(default)]
    ignore: bool,
    #[serde(default)]
    hidden: Vec<String>,
}

impl DeviceOverride {
    /// Creates a [`DeviceOverride`] for the device with the given identifier.
    #[must_use]
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            category: None,
            ignore: false,
            hidden: Vec::new(),
        }
    }

    /// Forces the [`Category`] of the device, regardless of its vendor
    /// category code.
    #[must_use]
    #[inline]
    pub const fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    /// Ignores the device.
    #[must_use]
    #[inline]
    pub const fn ignore(mut self) -> Self {
        self.ignore = true;
        self
    }

    /// Hides a schema code of the device, as if the device had never
    /// reported it.
    #[must_use]
    #[inline]
    pub fn hide(mut self, code: impl Into<String>) -> Self {
        self.hidden.push(code.into());
        self
    }

    /// Returns the device identifier.
    #[must_use]
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the forced [`Category`], if any.
    #[must_use]
    pub const fn forced_category(&self) -> Option<Category> {
        self.category
    }

    /// Checks whether the device is ignored.
    #[must_use]
    pub const fn is_ignored(&self) -> bool {
        self.ignore
    }
}

/// A bridge configuration.
///
/// It can be built in code or deserialized, for example from a JSON file:
///
/// ```
/// use dpkit_bridge::accessory::Category;
/// use dpkit_bridge::config::BridgeConfig;
///
/// let config: BridgeConfig = serde_json::from_str(
///     r#"{
///         "temperature_range": [-20, 60],
///         "devices": [
///             { "id": "bf01", "category": "window_covering", "hidden": ["percent_state"] },
///             { "id": "bf02", "ignore": true }
///         ]
///     }"#,
/// )
/// .unwrap();
///
/// let override_ = config.device_override("bf01").unwrap();
/// assert_eq!(override_.forced_category(), Some(Category::WindowCovering));
/// assert!(config.device_override("bf02").unwrap().is_ignored());
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    update_buffer_size: usize,
    temperature_range: (f64, f64),
    devices: Vec<DeviceOverride>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        let options = AccessoryOptions::default();
        Self {
            update_buffer_size: options.update_buffer_size,
            temperature_range: options.temperature_range,
            devices: Vec::new(),
        }
    }
}

impl BridgeConfig {
    /// Creates the default [`BridgeConfig`].
    #[must_use]
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how many values each accessory can push to the host before new
    /// pushes are dropped.
    #[must_use]
    #[inline]
    pub const fn update_buffer_size(mut self, update_buffer_size: usize) -> Self {
        self.update_buffer_size = update_buffer_size;
        self
    }

    /// Sets the range of reported temperatures.
    #[must_use]
    #[inline]
    pub const fn temperature_range(mut self, min: f64, max: f64) -> Self {
        self.temperature_range = (min, max);
        self
    }

    /// Adds a [`DeviceOverride`].
    ///
    /// A later override of the same device replaces the previous one.
    #[must_use]
    pub fn device(mut self, device: DeviceOverride) -> Self {
        self.devices.retain(|current| current.id != device.id);
        self.devices.push(device);
        self
    }

    /// Returns the [`DeviceOverride`] of a device.
    #[must_use]
    pub fn device_override(&self, id: &str) -> Option<&DeviceOverride> {
        self.devices.iter().rev().find(|device| device.id == id)
    }

    /// Returns the [`AccessoryOptions`] of a device.
    #[must_use]
    pub fn options_for(&self, id: &str) -> AccessoryOptions {
        let options = AccessoryOptions::new()
            .update_buffer_size(self.update_buffer_size)
            .temperature_range(self.temperature_range.0, self.temperature_range.1);

        match self.device_override(id) {
            Some(device) => device
                .hidden
                .iter()
                .fold(options, |options, code| options.hide(code.as_str())),
            None => options,
        }
    }
}
