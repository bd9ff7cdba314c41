mod extraction_hood;
mod pet_feeder;
mod weather_station;
mod window_covering;

use std::sync::Arc;

use dpkit::characteristic::{CharacteristicKind, CharacteristicUpdate, CharacteristicValue};
use dpkit::service::ServiceId;
use dpkit::status::StatusUpdate;

use serde::{Deserialize, Serialize};

use tracing::{debug, info};

use crate::binder::{Binder, Trackers};
use crate::device::{Device, Snapshot};
use crate::error::Result;
use crate::registry::Registry;
use crate::resolver::{FeatureAlias, SchemaResolver};
use crate::updates::Subscriptions;

/// Device categories an [`Accessory`] can be composed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// A multi-purpose climate and extraction unit, exposed as an air
    /// purifier with an optional light.
    ExtractionHood,
    /// A pet feeder with momentary feeding triggers.
    PetFeeder,
    /// A weather station reporting a variable number of temperature and
    /// humidity channels.
    WeatherStation,
    /// A motorized cover with one or two channels.
    WindowCovering,
}

impl Category {
    /// Returns the category name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ExtractionHood => "Extraction Hood",
            Self::PetFeeder => "Pet Feeder",
            Self::WeatherStation => "Weather Station",
            Self::WindowCovering => "Window Covering",
        }
    }

    /// Returns the [`Category`] of a vendor category code.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "yyj" => Some(Self::ExtractionHood),
            "cwwsq" => Some(Self::PetFeeder),
            "qxj" | "wsdcg" => Some(Self::WeatherStation),
            "cl" | "clkg" => Some(Self::WindowCovering),
            _ => None,
        }
    }

    /// Returns the features a device must expose to be supported.
    ///
    /// Each entry is satisfied when any of its aliases resolves.
    #[must_use]
    pub const fn required_schema(self) -> &'static [FeatureAlias] {
        match self {
            Self::ExtractionHood => extraction_hood::REQUIRED,
            Self::PetFeeder => pet_feeder::REQUIRED,
            Self::WeatherStation => &[],
            Self::WindowCovering => window_covering::REQUIRED,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.name().fmt(f)
    }
}

/// The reason why a device is not exposed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unsupported {
    /// The vendor category code is not handled.
    UnknownCategory(String),
    /// Some required features do not resolve.
    MissingSchema(Vec<FeatureAlias>),
    /// The device has been ignored by configuration.
    Ignored,
}

impl std::fmt::Display for Unsupported {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownCategory(code) => write!(f, "unknown category `{code}`"),
            Self::MissingSchema(missing) => write!(f, "missing required schema {missing:?}"),
            Self::Ignored => "ignored".fmt(f),
        }
    }
}

/// Whether a device is exposed as an accessory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Support {
    /// The accessory has been composed.
    Supported,
    /// The device is not exposed.
    Unsupported(Unsupported),
}

impl Support {
    /// Checks whether the device is supported.
    #[must_use]
    pub const fn is_supported(&self) -> bool {
        matches!(self, Self::Supported)
    }
}

/// Per-device options of an [`Accessory`].
#[derive(Debug, Clone, PartialEq)]
pub struct AccessoryOptions {
    /// Schema codes hidden from the resolver.
    pub hidden: Vec<String>,
    /// Range of reported temperatures.
    pub temperature_range: (f64, f64),
    /// Capacity of the mirror update channel.
    pub update_buffer_size: usize,
}

impl Default for AccessoryOptions {
    fn default() -> Self {
        Self {
            hidden: Vec::new(),
            temperature_range: (-100., 100.),
            update_buffer_size: 64,
        }
    }
}

impl AccessoryOptions {
    /// Creates the default [`AccessoryOptions`].
    #[must_use]
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hides a schema code.
    #[must_use]
    #[inline]
    pub fn hide(mut self, code: impl Into<String>) -> Self {
        self.hidden.push(code.into());
        self
    }

    /// Sets the range of reported temperatures.
    #[must_use]
    #[inline]
    pub const fn temperature_range(mut self, min: f64, max: f64) -> Self {
        self.temperature_range = (min, max);
        self
    }

    /// Sets the capacity of the mirror update channel.
    #[must_use]
    #[inline]
    pub const fn update_buffer_size(mut self, update_buffer_size: usize) -> Self {
        self.update_buffer_size = update_buffer_size;
        self
    }
}

/// A device exposed as a set of services and characteristics.
///
/// An accessory is configured with exclusive access and then shared: reads,
/// writes and live updates only need a shared reference.
pub struct Accessory {
    device: Arc<dyn Device>,
    category: Category,
    options: AccessoryOptions,
    registry: Registry,
    subscriptions: Subscriptions,
    trackers: Trackers,
}

impl std::fmt::Debug for Accessory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Accessory")
            .field("id", &self.device.id())
            .field("category", &self.category)
            .field("options", &self.options)
            .field("registry", &self.registry)
            .field("subscriptions", &self.subscriptions)
            .finish_non_exhaustive()
    }
}

impl Accessory {
    /// Creates an [`Accessory`] for a device.
    ///
    /// Nothing is exposed until [`Self::configure`] is called.
    #[must_use]
    pub fn new(device: Arc<dyn Device>, category: Category, options: AccessoryOptions) -> Self {
        let registry = Registry::new(options.update_buffer_size);
        Self {
            device,
            category,
            options,
            registry,
            subscriptions: Subscriptions::new(),
            trackers: Trackers::default(),
        }
    }

    /// Composes services and characteristics according to the device schema.
    ///
    /// Configuring again keeps service identities and replaces handlers and
    /// live update subscriptions, so no value is pushed twice. Derived motion
    /// states start over from the unknown state.
    pub fn configure(&mut self) -> Support {
        self.subscriptions.clear();
        for tracker in self.trackers.values() {
            tracker.reset();
        }

        let resolver = SchemaResolver::new(self.device.schema()).hidden(&self.options.hidden);

        let missing = self
            .category
            .required_schema()
            .iter()
            .filter(|aliases| resolver.resolve(aliases).is_none())
            .copied()
            .collect::<Vec<FeatureAlias>>();
        if !missing.is_empty() {
            info!(
                "Skip device with id `{}`: {} requires schema {missing:?}",
                self.device.id(),
                self.category
            );
            return Support::Unsupported(Unsupported::MissingSchema(missing));
        }

        let mut binder = Binder::new(
            &self.device,
            resolver,
            &mut self.registry,
            &mut self.subscriptions,
            &mut self.trackers,
            &self.options,
        );

        match self.category {
            Category::ExtractionHood => extraction_hood::configure(&mut binder),
            Category::PetFeeder => pet_feeder::configure(&mut binder),
            Category::WeatherStation => weather_station::configure(&mut binder),
            Category::WindowCovering => window_covering::configure(&mut binder),
        }

        debug!(
            "Configure device with id `{}` as {}: {} services, {} subscriptions",
            self.device.id(),
            self.category,
            self.registry.len(),
            self.subscriptions.len()
        );

        Support::Supported
    }

    /// Returns the device identifier.
    #[must_use]
    #[inline]
    pub fn id(&self) -> &str {
        self.device.id()
    }

    /// Returns the device name.
    #[must_use]
    #[inline]
    pub fn name(&self) -> &str {
        self.device.name()
    }

    /// Returns the [`Category`].
    #[must_use]
    pub const fn category(&self) -> Category {
        self.category
    }

    /// Returns the device.
    #[must_use]
    pub const fn device(&self) -> &Arc<dyn Device> {
        &self.device
    }

    /// Returns the [`Registry`] of services and characteristics.
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Reads a characteristic.
    ///
    /// # Errors
    ///
    /// An error is returned when the characteristic does not exist.
    #[inline]
    pub fn read(&self, service: &ServiceId, kind: CharacteristicKind) -> Result<CharacteristicValue> {
        self.registry.read(service, kind)
    }

    /// Writes a characteristic, waiting for the device dispatch.
    ///
    /// # Errors
    ///
    /// An error is returned when the characteristic does not exist, is not
    /// writable, when the value lies outside its domain, or when the device
    /// fails to dispatch the commands.
    #[inline]
    pub async fn write(
        &self,
        service: &ServiceId,
        kind: CharacteristicKind,
        value: CharacteristicValue,
    ) -> Result<()> {
        self.registry.write(service, kind, value).await
    }

    /// Handles a live update of the device, pushing the values of every
    /// subscribed characteristic.
    ///
    /// Returns the number of pushed values.
    pub fn handle_update(&self, update: &StatusUpdate) -> usize {
        let snapshot = Snapshot::with_update(self.device.as_ref(), update);
        self.subscriptions
            .dispatch(&update.code, &snapshot, &self.registry)
    }

    /// Returns the receiver of the values pushed to the host.
    #[must_use]
    #[inline]
    pub fn updates(&self) -> flume::Receiver<CharacteristicUpdate> {
        self.registry.updates()
    }

    /// Returns the values pushed to the host as a stream.
    #[cfg(feature = "stream")]
    #[must_use]
    pub fn update_stream(&self) -> impl futures_util::Stream<Item = CharacteristicUpdate> + use<> {
        self.registry.updates().into_stream()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use dpkit::characteristic::{CharacteristicKind, CharacteristicValue, PositionState};
    use dpkit::schema::{IntegerProperty, SchemaDescriptor};
    use dpkit::service::{ServiceId, ServiceKind};
    use dpkit::status::Status;

    use crate::resolver::FeatureAlias;
    use crate::tests::MockDevice;

    use super::{Accessory, AccessoryOptions, Category, Support, Unsupported};

    const CONTROL: FeatureAlias = &["control", "mach_operate"];

    fn covering() -> MockDevice {
        MockDevice::new("cl")
            .with_schema(SchemaDescriptor::enumeration(
                "control",
                ["open", "stop", "close"],
            ))
            .with_schema(SchemaDescriptor::integer(
                "percent_state",
                IntegerProperty::new(0, 100),
            ))
            .with_status("control", "stop")
            .with_status("percent_state", 40)
    }

    #[test]
    fn test_category() {
        assert_eq!(Category::from_code("cl"), Some(Category::WindowCovering));
        assert_eq!(Category::from_code("clkg"), Some(Category::WindowCovering));
        assert_eq!(Category::from_code("cwwsq"), Some(Category::PetFeeder));
        assert_eq!(Category::from_code("qxj"), Some(Category::WeatherStation));
        assert_eq!(Category::from_code("yyj"), Some(Category::ExtractionHood));
        assert_eq!(Category::from_code("dj"), None);
        assert_eq!(Category::PetFeeder.to_string(), "Pet Feeder");
    }

    #[test]
    fn test_missing_required_schema() {
        let device = Arc::new(MockDevice::new("cl").with_schema(SchemaDescriptor::boolean("switch")));
        let mut accessory = Accessory::new(device, Category::WindowCovering, AccessoryOptions::default());

        assert_eq!(
            accessory.configure(),
            Support::Unsupported(Unsupported::MissingSchema(vec![CONTROL]))
        );
        assert!(accessory.registry().is_empty());
    }

    #[test]
    fn test_hidden_codes_are_absent() {
        let device = Arc::new(covering());
        let mut accessory = Accessory::new(
            device,
            Category::WindowCovering,
            AccessoryOptions::new().hide("control"),
        );
        assert!(!accessory.configure().is_supported());

        let device = Arc::new(covering());
        let mut accessory = Accessory::new(
            device,
            Category::WindowCovering,
            AccessoryOptions::new().hide("percent_state"),
        );
        assert!(accessory.configure().is_supported());

        // Without `percent_state`, the position follows the control token.
        let service = ServiceId::with_subtype(ServiceKind::WindowCovering, "control");
        assert_eq!(
            accessory.read(&service, CharacteristicKind::CurrentPosition),
            Ok(CharacteristicValue::Int(50))
        );
    }

    #[test]
    fn test_reconfigure_is_idempotent() {
        let device = Arc::new(covering());
        let mut accessory = Accessory::new(
            device,
            Category::WindowCovering,
            AccessoryOptions::default(),
        );

        assert!(accessory.configure().is_supported());
        let services = accessory
            .registry()
            .services()
            .map(|service| service.id().clone())
            .collect::<Vec<_>>();
        let subscriptions = accessory.subscriptions.len();

        assert!(accessory.configure().is_supported());
        assert_eq!(
            accessory
                .registry()
                .services()
                .map(|service| service.id().clone())
                .collect::<Vec<_>>(),
            services
        );
        assert_eq!(accessory.subscriptions.len(), subscriptions);

        let updates = accessory.updates();
        let pushed = accessory.handle_update(&Status::new("percent_state", 70));
        assert_eq!(pushed, updates.len());
    }

    #[test]
    fn test_handle_update() {
        let device = Arc::new(covering());
        let mut accessory = Accessory::new(
            device.clone(),
            Category::WindowCovering,
            AccessoryOptions::default(),
        );
        assert!(accessory.configure().is_supported());
        let service = ServiceId::with_subtype(ServiceKind::WindowCovering, "control");
        let updates = accessory.updates();

        // The first sample is stationary.
        assert_eq!(accessory.handle_update(&Status::new("percent_state", 40)), 2);
        device.set_status("percent_state", 70);
        assert_eq!(accessory.handle_update(&Status::new("percent_state", 70)), 2);

        let pushed = updates.drain().collect::<Vec<_>>();
        let values = pushed
            .iter()
            .filter(|update| update.service == service)
            .map(|update| (update.characteristic, update.value))
            .collect::<Vec<_>>();
        assert_eq!(
            values,
            [
                (CharacteristicKind::CurrentPosition, CharacteristicValue::Int(40)),
                (
                    CharacteristicKind::PositionState,
                    CharacteristicValue::from(PositionState::Stopped)
                ),
                (CharacteristicKind::CurrentPosition, CharacteristicValue::Int(70)),
                (
                    CharacteristicKind::PositionState,
                    CharacteristicValue::from(PositionState::Increasing)
                ),
            ]
        );

        // Unrelated codes push nothing.
        assert_eq!(accessory.handle_update(&Status::new("battery", 10)), 0);
    }

    #[test]
    fn test_reconfigure_resets_position_state() {
        let device = Arc::new(covering());
        let mut accessory = Accessory::new(
            device.clone(),
            Category::WindowCovering,
            AccessoryOptions::default(),
        );
        assert!(accessory.configure().is_supported());
        let service = ServiceId::with_subtype(ServiceKind::WindowCovering, "control");

        device.set_status("percent_state", 60);
        assert_eq!(
            accessory.read(&service, CharacteristicKind::PositionState),
            Ok(PositionState::Stopped.into())
        );
        device.set_status("percent_state", 80);
        assert_eq!(
            accessory.read(&service, CharacteristicKind::PositionState),
            Ok(PositionState::Increasing.into())
        );

        // The first sample after reconfiguration is stationary again.
        assert!(accessory.configure().is_supported());
        device.set_status("percent_state", 90);
        assert_eq!(
            accessory.read(&service, CharacteristicKind::PositionState),
            Ok(PositionState::Stopped.into())
        );
    }

    #[cfg(feature = "stream")]
    #[tokio::test]
    async fn test_update_stream() {
        use futures_util::StreamExt;

        let device = Arc::new(covering());
        let mut accessory = Accessory::new(
            device,
            Category::WindowCovering,
            AccessoryOptions::default(),
        );
        assert!(accessory.configure().is_supported());

        let mut stream = std::pin::pin!(accessory.update_stream());
        let _ = accessory.handle_update(&Status::new("percent_state", 15));

        let update = stream.next().await.unwrap();
        assert_eq!(update.characteristic, CharacteristicKind::CurrentPosition);
        assert_eq!(update.value, CharacteristicValue::Int(15));
    }
}
