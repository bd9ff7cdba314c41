use std::future::Future;
use std::pin::Pin;

use dpkit::schema::SchemaDescriptor;
use dpkit::status::{Command, Status, StatusUpdate};

use serde_json::Value;

use crate::error::Result;

/// The future returned by a command dispatch.
pub type DispatchFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// A cloud device, as seen by a bridge.
///
/// Implementations wrap the cloud transport: they own the device schema, the
/// last known statuses and the channel where live updates are published.
pub trait Device: Send + Sync {
    /// Returns the device identifier.
    fn id(&self) -> &str;

    /// Returns the device name.
    fn name(&self) -> &str;

    /// Returns the vendor category code, such as `cl` or `cwwsq`.
    fn category(&self) -> &str;

    /// Returns the schema descriptors reported by the device.
    fn schema(&self) -> &[SchemaDescriptor];

    /// Returns the last known [`Status`] of a schema code.
    fn status(&self, code: &str) -> Option<Status>;

    /// Sends a list of [`Command`]s to the device.
    ///
    /// `is_target` hints that the commands set a target state. The future
    /// resolves once the transport has completed the dispatch.
    fn send_commands(&self, commands: Vec<Command>, is_target: bool) -> DispatchFuture<'_>;

    /// Returns the receiver of live status updates, if the device publishes
    /// them.
    ///
    /// The receiver is consumed by a single listener for the whole device
    /// lifetime.
    fn updates(&self) -> Option<flume::Receiver<StatusUpdate>>;
}

/// A view over the state of a device.
///
/// When a snapshot is built from a live update, the updated value overrides
/// the status reported by the device for the same code.
#[derive(Clone, Copy)]
pub struct Snapshot<'a> {
    device: &'a dyn Device,
    update: Option<&'a StatusUpdate>,
}

impl<'a> Snapshot<'a> {
    /// Creates a [`Snapshot`] of the statuses of a device.
    #[must_use]
    pub const fn new(device: &'a dyn Device) -> Self {
        Self {
            device,
            update: None,
        }
    }

    /// Creates a [`Snapshot`] which overlays a live update on the statuses
    /// of a device.
    #[must_use]
    pub const fn with_update(device: &'a dyn Device, update: &'a StatusUpdate) -> Self {
        Self {
            device,
            update: Some(update),
        }
    }

    /// Returns the device.
    #[must_use]
    pub const fn device(&self) -> &'a dyn Device {
        self.device
    }

    /// Returns the current value of a schema code.
    #[must_use]
    pub fn value(&self, code: &str) -> Option<Value> {
        if let Some(update) = self.update
            && update.code == code
        {
            return Some(update.value.clone());
        }
        self.device.status(code).map(|status| status.value)
    }

    /// Returns the current value of a schema code as a boolean.
    #[must_use]
    #[inline]
    pub fn boolean(&self, code: &str) -> Option<bool> {
        self.value(code).and_then(|value| value.as_bool())
    }

    /// Returns the current value of a schema code as a number.
    #[must_use]
    #[inline]
    pub fn number(&self, code: &str) -> Option<f64> {
        self.value(code).and_then(|value| value.as_f64())
    }

    /// Returns the current value of a schema code as a token.
    #[must_use]
    pub fn token(&self, code: &str) -> Option<String> {
        match self.value(code)? {
            Value::String(token) => Some(token),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use dpkit::status::Status;

    use serde_json::json;

    use crate::tests::MockDevice;

    use super::Snapshot;

    #[test]
    fn test_snapshot() {
        let device = MockDevice::new("cl")
            .with_status("percent_state", 30)
            .with_status("control", "open")
            .with_status("switch", true);

        let snapshot = Snapshot::new(&device);
        assert_eq!(snapshot.number("percent_state"), Some(30.));
        assert_eq!(snapshot.token("control").as_deref(), Some("open"));
        assert_eq!(snapshot.boolean("switch"), Some(true));
        assert_eq!(snapshot.token("switch"), None);
        assert_eq!(snapshot.value("missing"), None);

        let update = Status::new("percent_state", 45);
        let snapshot = Snapshot::with_update(&device, &update);
        assert_eq!(snapshot.value("percent_state"), Some(json!(45)));
        assert_eq!(snapshot.token("control").as_deref(), Some("open"));
    }
}
