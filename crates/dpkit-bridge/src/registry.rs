use std::sync::{Arc, Mutex, PoisonError};

use dpkit::characteristic::{CharacteristicKind, CharacteristicUpdate, CharacteristicValue, Props};
use dpkit::service::ServiceId;

use hashbrown::DefaultHashBuilder;
use indexmap::IndexMap;

use tracing::{debug, warn};

use crate::device::DispatchFuture;
use crate::error::{Error, ErrorKind, Result};

/// A read handler.
pub type ReadFn = Arc<dyn Fn() -> CharacteristicValue + Send + Sync>;

/// A write handler.
///
/// The handler translates the value synchronously and returns the future of
/// the resulting dispatch.
pub type WriteFn = Arc<dyn Fn(CharacteristicValue) -> DispatchFuture<'static> + Send + Sync>;

/// A characteristic of a service.
pub struct Characteristic {
    kind: CharacteristicKind,
    props: Props,
    on_get: Option<ReadFn>,
    on_set: Option<WriteFn>,
    last: Mutex<Option<CharacteristicValue>>,
}

impl std::fmt::Debug for Characteristic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Characteristic")
            .field("kind", &self.kind)
            .field("props", &self.props)
            .field("readable", &self.on_get.is_some())
            .field("writable", &self.on_set.is_some())
            .field("value", &self.value())
            .finish()
    }
}

impl Characteristic {
    fn new(kind: CharacteristicKind) -> Self {
        Self {
            kind,
            props: kind.default_props(),
            on_get: None,
            on_set: None,
            last: Mutex::new(None),
        }
    }

    /// Returns the [`CharacteristicKind`].
    #[must_use]
    pub const fn kind(&self) -> CharacteristicKind {
        self.kind
    }

    /// Returns the value domain.
    #[must_use]
    pub const fn props(&self) -> Props {
        self.props
    }

    /// Changes the value domain.
    pub fn set_props(&mut self, props: Props) -> &mut Self {
        self.props = props;
        self
    }

    /// Installs the read handler, replacing any previous one.
    pub fn on_get(&mut self, on_get: ReadFn) -> &mut Self {
        self.on_get = Some(on_get);
        self
    }

    /// Installs the write handler, replacing any previous one.
    pub fn on_set(&mut self, on_set: WriteFn) -> &mut Self {
        self.on_set = Some(on_set);
        self
    }

    /// Checks whether a read handler is installed.
    #[must_use]
    pub const fn is_readable(&self) -> bool {
        self.on_get.is_some()
    }

    /// Checks whether a write handler is installed.
    #[must_use]
    pub const fn is_writable(&self) -> bool {
        self.on_set.is_some()
    }

    /// Returns the last known value, or the default value of the kind when
    /// nothing is known yet.
    #[must_use]
    pub fn value(&self) -> CharacteristicValue {
        self.last
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .unwrap_or_else(|| self.kind.default_value())
    }

    /// Reads the value through the read handler.
    ///
    /// Without a read handler, the last known value is returned.
    #[must_use]
    pub fn read(&self) -> CharacteristicValue {
        match &self.on_get {
            Some(on_get) => {
                let value = on_get();
                self.store(value);
                value
            }
            None => self.value(),
        }
    }

    fn store(&self, value: CharacteristicValue) {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(value);
    }
}

/// A service hosting characteristics.
#[derive(Debug)]
pub struct Service {
    id: ServiceId,
    name: String,
    characteristics: IndexMap<CharacteristicKind, Characteristic, DefaultHashBuilder>,
}

impl Service {
    fn new(id: ServiceId, name: String) -> Self {
        Self {
            id,
            name,
            characteristics: IndexMap::with_hasher(DefaultHashBuilder::default()),
        }
    }

    /// Returns the [`ServiceId`].
    #[must_use]
    pub const fn id(&self) -> &ServiceId {
        &self.id
    }

    /// Returns the display name.
    #[must_use]
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a [`Characteristic`].
    #[must_use]
    #[inline]
    pub fn characteristic(&self, kind: CharacteristicKind) -> Option<&Characteristic> {
        self.characteristics.get(&kind)
    }

    /// Returns a [`Characteristic`], creating it with the default value
    /// domain of its kind when missing.
    pub fn get_or_add_characteristic(&mut self, kind: CharacteristicKind) -> &mut Characteristic {
        self.characteristics
            .entry(kind)
            .or_insert_with(|| Characteristic::new(kind))
    }

    /// Returns an iterator over the characteristics, in creation order.
    #[inline]
    pub fn characteristics(&self) -> impl Iterator<Item = &Characteristic> {
        self.characteristics.values()
    }
}

/// A capability registry.
///
/// It stores the services of an accessory and their characteristics, serves
/// the reads and writes of a home-automation host, and publishes the values
/// pushed outside of a read request.
#[derive(Debug)]
pub struct Registry {
    services: IndexMap<ServiceId, Service, DefaultHashBuilder>,
    sender: flume::Sender<CharacteristicUpdate>,
    receiver: flume::Receiver<CharacteristicUpdate>,
}

impl Registry {
    /// Creates an empty [`Registry`].
    ///
    /// The `buffer_size` parameter specifies how many pushed updates the
    /// registry can hold before new pushes are dropped.
    #[must_use]
    pub fn new(buffer_size: usize) -> Self {
        let (sender, receiver) = flume::bounded(buffer_size);
        Self {
            services: IndexMap::with_hasher(DefaultHashBuilder::default()),
            sender,
            receiver,
        }
    }

    /// Returns a [`Service`], creating it when missing.
    pub fn service(&mut self, id: ServiceId, name: impl Into<String>) -> &mut Service {
        self.services.entry(id).or_insert_with_key(|id| {
            let service = Service::new(id.clone(), name.into());
            debug!("Add service `{}`", service.id);
            service
        })
    }

    /// Returns a [`Service`].
    #[must_use]
    #[inline]
    pub fn get_service(&self, id: &ServiceId) -> Option<&Service> {
        self.services.get(id)
    }

    /// Removes a [`Service`], returning it.
    pub fn remove_service(&mut self, id: &ServiceId) -> Option<Service> {
        let service = self.services.shift_remove(id);
        if service.is_some() {
            debug!("Remove service `{id}`");
        }
        service
    }

    /// Returns an iterator over the services, in creation order.
    #[inline]
    pub fn services(&self) -> impl Iterator<Item = &Service> {
        self.services.values()
    }

    /// Returns the number of services.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Checks whether the registry has no services.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Returns a [`Characteristic`] of a service.
    ///
    /// # Errors
    ///
    /// An error is returned if either the service or the characteristic
    /// **does** not exist.
    pub fn characteristic(
        &self,
        service: &ServiceId,
        kind: CharacteristicKind,
    ) -> Result<&Characteristic> {
        self.services
            .get(service)
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::UnknownService,
                    format!("Service `{service}` does not exist"),
                )
            })?
            .characteristic(kind)
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::UnknownCharacteristic,
                    format!("Characteristic `{kind}` does not exist on service `{service}`"),
                )
            })
    }

    /// Reads the value of a characteristic.
    ///
    /// # Errors
    ///
    /// An error is returned if either the service or the characteristic
    /// **does** not exist.
    pub fn read(&self, service: &ServiceId, kind: CharacteristicKind) -> Result<CharacteristicValue> {
        self.characteristic(service, kind).map(Characteristic::read)
    }

    /// Writes the value of a characteristic, awaiting the completion of the
    /// resulting dispatch.
    ///
    /// The written value becomes the last known value of the characteristic
    /// once the dispatch succeeds.
    ///
    /// # Errors
    ///
    /// - The service or the characteristic **does** not exist
    /// - The characteristic cannot be written
    /// - The value lies outside the value domain of the characteristic
    /// - The device rejected the dispatch
    pub async fn write(
        &self,
        service: &ServiceId,
        kind: CharacteristicKind,
        value: CharacteristicValue,
    ) -> Result<()> {
        let characteristic = self.characteristic(service, kind)?;

        let Some(on_set) = characteristic.on_set.as_ref() else {
            return Err(Error::new(
                ErrorKind::ReadOnly,
                format!("Characteristic `{kind}` on service `{service}` is read-only"),
            ));
        };

        let props = characteristic.props;
        if !props.contains(value.as_f64()) {
            return Err(Error::new(
                ErrorKind::InvalidValue,
                format!(
                    "Value {value} for characteristic `{kind}` is outside [{}, {}]",
                    props.min, props.max
                ),
            ));
        }

        on_set(value).await?;
        characteristic.store(value);
        Ok(())
    }

    /// Pushes a value of a characteristic outside of a read request.
    ///
    /// The value becomes the last known value of the characteristic, if it
    /// exists. When the update buffer is full the push is dropped and `false`
    /// is returned.
    pub fn update_characteristic(
        &self,
        service: &ServiceId,
        kind: CharacteristicKind,
        value: CharacteristicValue,
    ) -> bool {
        if let Some(characteristic) = self
            .services
            .get(service)
            .and_then(|service| service.characteristic(kind))
        {
            characteristic.store(value);
        }

        match self
            .sender
            .try_send(CharacteristicUpdate::new(service.clone(), kind, value))
        {
            Ok(()) => true,
            Err(e) => {
                warn!("Drop update of `{kind}` on service `{service}`: {e}");
                false
            }
        }
    }

    /// Returns a receiver of the pushed [`CharacteristicUpdate`]s.
    ///
    /// All returned receivers share the same queue: each update is delivered
    /// to only one of them.
    #[must_use]
    #[inline]
    pub fn updates(&self) -> flume::Receiver<CharacteristicUpdate> {
        self.receiver.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use dpkit::characteristic::{CharacteristicKind, CharacteristicValue, Props};
    use dpkit::service::{ServiceId, ServiceKind};

    use crate::device::DispatchFuture;
    use crate::error::{Error, ErrorKind};

    use super::Registry;

    fn switch() -> ServiceId {
        ServiceId::with_subtype(ServiceKind::Switch, "light")
    }

    #[test]
    fn test_get_or_create() {
        let mut registry = Registry::new(4);

        let _ = registry
            .service(switch(), "Light")
            .get_or_add_characteristic(CharacteristicKind::On);
        let _ = registry
            .service(switch(), "Other name")
            .get_or_add_characteristic(CharacteristicKind::On);
        let _ = registry.service(ServiceId::primary(ServiceKind::Switch), "Feeder");

        assert_eq!(registry.len(), 2);
        let service = registry.get_service(&switch()).unwrap();
        assert_eq!(service.name(), "Light");
        assert_eq!(service.characteristics().count(), 1);

        assert!(registry.remove_service(&switch()).is_some());
        assert!(registry.remove_service(&switch()).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_read_defaults() {
        let mut registry = Registry::new(4);
        let _ = registry
            .service(switch(), "Light")
            .get_or_add_characteristic(CharacteristicKind::On);

        assert_eq!(
            registry.read(&switch(), CharacteristicKind::On),
            Ok(CharacteristicValue::Bool(false))
        );
        assert_eq!(
            registry
                .read(&switch(), CharacteristicKind::Brightness)
                .map_err(|e| e.kind()),
            Err(ErrorKind::UnknownCharacteristic)
        );
        assert_eq!(
            registry
                .read(&ServiceId::primary(ServiceKind::Lightbulb), CharacteristicKind::On)
                .map_err(|e| e.kind()),
            Err(ErrorKind::UnknownService)
        );
    }

    #[tokio::test]
    async fn test_write() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = Registry::new(4);

        let service = registry.service(switch(), "Light");
        let _ = service
            .get_or_add_characteristic(CharacteristicKind::Brightness)
            .set_props(Props::new(0., 100., 1.))
            .on_set({
                let calls = Arc::clone(&calls);
                Arc::new(move |_: CharacteristicValue| -> DispatchFuture<'static> {
                    let _ = calls.fetch_add(1, Ordering::SeqCst);
                    Box::pin(async { Ok(()) })
                })
            });
        let _ = service
            .get_or_add_characteristic(CharacteristicKind::On)
            .on_set(Arc::new(|_: CharacteristicValue| -> DispatchFuture<'static> {
                Box::pin(async { Err(Error::dispatch("Device offline")) })
            }));
        let _ = service.get_or_add_characteristic(CharacteristicKind::StatusActive);

        registry
            .write(&switch(), CharacteristicKind::Brightness, CharacteristicValue::Float(40.))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            registry.read(&switch(), CharacteristicKind::Brightness),
            Ok(CharacteristicValue::Float(40.))
        );

        let error = registry
            .write(&switch(), CharacteristicKind::Brightness, CharacteristicValue::Int(140))
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidValue);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let error = registry
            .write(&switch(), CharacteristicKind::StatusActive, true.into())
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::ReadOnly);

        let error = registry
            .write(&switch(), CharacteristicKind::On, true.into())
            .await
            .unwrap_err();
        assert_eq!(error, Error::dispatch("Device offline"));
        assert_eq!(
            registry.read(&switch(), CharacteristicKind::On),
            Ok(CharacteristicValue::Bool(false))
        );
    }

    #[test]
    fn test_pushes() {
        let mut registry = Registry::new(1);
        let _ = registry
            .service(switch(), "Light")
            .get_or_add_characteristic(CharacteristicKind::On);
        let updates = registry.updates();

        assert!(registry.update_characteristic(&switch(), CharacteristicKind::On, true.into()));
        // The buffer is full.
        assert!(!registry.update_characteristic(&switch(), CharacteristicKind::On, false.into()));

        let update = updates.try_recv().unwrap();
        assert_eq!(update.service, switch());
        assert_eq!(update.value, CharacteristicValue::Bool(true));
        assert!(updates.try_recv().is_err());

        // The dropped push still refreshes the cached value.
        assert_eq!(
            registry.read(&switch(), CharacteristicKind::On),
            Ok(CharacteristicValue::Bool(false))
        );
    }
}
