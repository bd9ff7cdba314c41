use std::sync::Arc;

use dpkit::characteristic::{CharacteristicKind, CharacteristicValue, Props};
use dpkit::schema::{SchemaDescriptor, SchemaType};
use dpkit::service::{ServiceId, ServiceKind};
use dpkit::status::Command;

use hashbrown::DefaultHashBuilder;
use indexmap::IndexMap;

use tracing::debug;

use crate::accessory::AccessoryOptions;
use crate::device::{Device, DispatchFuture, Snapshot};
use crate::registry::{ReadFn, Registry, WriteFn};
use crate::resolver::SchemaResolver;
use crate::trend::TrendCell;
use crate::updates::Subscriptions;

/// Translates a device snapshot into a characteristic value.
pub type Reader = Arc<dyn Fn(&Snapshot<'_>) -> CharacteristicValue + Send + Sync>;

pub(crate) type Trackers = IndexMap<ServiceId, Arc<TrendCell>, DefaultHashBuilder>;

/// A capability binder.
///
/// It gives accessory composers access to the schema of a device and wires
/// characteristics to the device. A reader translates a device snapshot into
/// a characteristic value and serves both host reads and live updates. A
/// writer translates a characteristic value into the commands to dispatch,
/// where [`None`] means there is nothing to send; it receives a snapshot too,
/// so read-modify-write translations are possible.
pub struct Binder<'a> {
    device: &'a Arc<dyn Device>,
    resolver: SchemaResolver<'a>,
    registry: &'a mut Registry,
    subscriptions: &'a mut Subscriptions,
    trackers: &'a mut Trackers,
    options: &'a AccessoryOptions,
}

impl<'a> Binder<'a> {
    pub(crate) fn new(
        device: &'a Arc<dyn Device>,
        resolver: SchemaResolver<'a>,
        registry: &'a mut Registry,
        subscriptions: &'a mut Subscriptions,
        trackers: &'a mut Trackers,
        options: &'a AccessoryOptions,
    ) -> Self {
        Self {
            device,
            resolver,
            registry,
            subscriptions,
            trackers,
            options,
        }
    }

    /// Returns the accessory options.
    #[must_use]
    pub const fn options(&self) -> &'a AccessoryOptions {
        self.options
    }

    /// Returns the identifier of the device.
    #[must_use]
    #[inline]
    pub fn device_id(&self) -> &str {
        self.device.id()
    }

    /// Resolves the first alias present in the schema.
    #[must_use]
    #[inline]
    pub fn schema(&self, aliases: &[&str]) -> Option<&'a SchemaDescriptor> {
        self.resolver.resolve(aliases)
    }

    /// Resolves the first alias present in the schema with the given
    /// [`SchemaType`].
    #[must_use]
    #[inline]
    pub fn schema_typed(&self, aliases: &[&str], kind: SchemaType) -> Option<&'a SchemaDescriptor> {
        self.resolver.resolve_typed(aliases, kind)
    }

    /// Checks whether a schema code is present.
    #[must_use]
    #[inline]
    pub fn has(&self, code: &str) -> bool {
        self.resolver.contains(code)
    }

    /// Returns all descriptors that satisfy a predicate, in schema order.
    pub fn matching<P>(&self, predicate: P) -> Vec<&'a SchemaDescriptor>
    where
        P: Fn(&SchemaDescriptor) -> bool,
    {
        self.resolver.matching(predicate).collect()
    }

    /// Returns the identity of a service, creating the service when missing.
    pub fn service(&mut self, kind: ServiceKind, subtype: Option<&str>, name: &str) -> ServiceId {
        let id = ServiceId::new(kind, subtype);
        let _ = self.registry.service(id.clone(), name);
        id
    }

    /// Checks whether a service exists.
    #[must_use]
    #[inline]
    pub fn has_service(&self, id: &ServiceId) -> bool {
        self.registry.get_service(id).is_some()
    }

    /// Removes a service, if present.
    pub fn remove_service(&mut self, kind: ServiceKind, subtype: Option<&str>) {
        let id = ServiceId::new(kind, subtype);
        if self.registry.remove_service(&id).is_some() {
            let _ = self.trackers.shift_remove(&id);
            self.subscriptions.remove_service(&id);
        }
    }

    /// Declares the value domain of a characteristic.
    pub fn props(&mut self, service: &ServiceId, kind: CharacteristicKind, props: Props) {
        let _ = self
            .registry
            .service(service.clone(), service.kind.name())
            .get_or_add_characteristic(kind)
            .set_props(props);
    }

    /// Binds the read side of a characteristic.
    ///
    /// The reader serves host reads and is subscribed to the live updates of
    /// every listed code, so an update of any of them pushes a fresh value.
    pub fn bind_read<R>(
        &mut self,
        service: &ServiceId,
        kind: CharacteristicKind,
        codes: &[&str],
        reader: R,
    ) where
        R: Fn(&Snapshot<'_>) -> CharacteristicValue + Send + Sync + 'static,
    {
        let reader: Reader = Arc::new(reader);
        let on_get: ReadFn = {
            let device = Arc::clone(self.device);
            let reader = Arc::clone(&reader);
            Arc::new(move || reader(&Snapshot::new(device.as_ref())))
        };

        let _ = self
            .registry
            .service(service.clone(), service.kind.name())
            .get_or_add_characteristic(kind)
            .on_get(on_get);

        for code in codes {
            self.subscriptions
                .subscribe(code, service.clone(), kind, Arc::clone(&reader));
        }
    }

    /// Binds the write side of a characteristic.
    ///
    /// Commands produced by the writer are dispatched with the `is_target`
    /// hint, and the write completes when the dispatch completes.
    pub fn bind_write<W>(
        &mut self,
        service: &ServiceId,
        kind: CharacteristicKind,
        is_target: bool,
        writer: W,
    ) where
        W: Fn(&Snapshot<'_>, CharacteristicValue) -> Option<Vec<Command>> + Send + Sync + 'static,
    {
        let device = Arc::clone(self.device);
        let on_set: WriteFn = Arc::new(move |value: CharacteristicValue| -> DispatchFuture<'static> {
            let commands = writer(&Snapshot::new(device.as_ref()), value);
            let device = Arc::clone(&device);
            Box::pin(async move {
                let Some(commands) = commands.filter(|commands| !commands.is_empty()) else {
                    debug!("Nothing to send to device `{}`", device.id());
                    return Ok(());
                };
                debug!("Send {} commands to device `{}`", commands.len(), device.id());
                device.send_commands(commands, is_target).await
            })
        });

        let _ = self
            .registry
            .service(service.clone(), service.kind.name())
            .get_or_add_characteristic(kind)
            .on_set(on_set);
    }

    /// Returns the [`TrendCell`] of a service, creating it when missing.
    pub fn tracker(&mut self, service: &ServiceId) -> Arc<TrendCell> {
        Arc::clone(self.trackers.entry(service.clone()).or_default())
    }
}
