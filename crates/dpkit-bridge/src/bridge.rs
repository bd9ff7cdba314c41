use std::sync::Arc;

use hashbrown::DefaultHashBuilder;
use indexmap::IndexMap;

use tokio::task::JoinHandle;

use tokio_util::sync::CancellationToken;

use tracing::{debug, error, info, warn};

use crate::accessory::{Accessory, Category, Support, Unsupported};
use crate::config::{BridgeConfig, DeviceOverride};
use crate::device::Device;
use crate::error::{Error, ErrorKind, Result};
use crate::updates::run_update_listener;

/// A bridge exposing many devices as accessories.
///
/// The main functionalities include:
///
/// - Picking the [`Category`] of each device, from configuration or from its
///   vendor category code, and composing its [`Accessory`].
/// - Running one live update listener task per device, so device updates
///   are pushed to the host as they happen.
/// - Stopping all listener tasks on shutdown.
#[derive(Debug)]
pub struct Bridge {
    config: BridgeConfig,
    accessories: IndexMap<String, Arc<Accessory>, DefaultHashBuilder>,
    listeners: IndexMap<String, JoinHandle<()>, DefaultHashBuilder>,
    cancellation_token: CancellationToken,
}

impl Default for Bridge {
    fn default() -> Self {
        Self::new(BridgeConfig::default())
    }
}

impl Bridge {
    /// Creates a [`Bridge`] from a [`BridgeConfig`].
    #[must_use]
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            accessories: IndexMap::with_hasher(DefaultHashBuilder::default()),
            listeners: IndexMap::with_hasher(DefaultHashBuilder::default()),
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Returns the [`BridgeConfig`].
    #[must_use]
    pub const fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Adds a device, composing its [`Accessory`].
    ///
    /// Only supported devices are kept. A supported device with the same
    /// identifier of an already added one replaces it, stopping its live
    /// update listener.
    pub fn add_device(&mut self, device: Arc<dyn Device>) -> Support {
        let id = device.id().to_owned();

        let device_override = self.config.device_override(&id);
        if device_override.is_some_and(DeviceOverride::is_ignored) {
            info!("Skip device with id `{id}`: ignored by configuration");
            return Support::Unsupported(Unsupported::Ignored);
        }

        let Some(category) = device_override
            .and_then(DeviceOverride::forced_category)
            .or_else(|| Category::from_code(device.category()))
        else {
            info!(
                "Skip device with id `{id}`: unknown category `{}`",
                device.category()
            );
            return Support::Unsupported(Unsupported::UnknownCategory(device.category().into()));
        };

        let mut accessory = Accessory::new(device, category, self.config.options_for(&id));
        let support = accessory.configure();
        if !support.is_supported() {
            return support;
        }

        if let Some(previous) = self.accessories.insert(id.clone(), Arc::new(accessory)) {
            warn!("Replace device with id `{}`", previous.id());
            if let Some(listener) = self.listeners.shift_remove(&id) {
                listener.abort();
            }
        }
        info!("Add device with id `{id}` as {category}");

        support
    }

    /// Removes a device, stopping its live update listener.
    pub fn remove_device(&mut self, id: &str) -> Option<Arc<Accessory>> {
        if let Some(listener) = self.listeners.shift_remove(id) {
            listener.abort();
        }
        self.accessories.shift_remove(id)
    }

    /// Returns an iterator over the accessories, in insertion order.
    pub fn accessories(&self) -> impl Iterator<Item = &Arc<Accessory>> {
        self.accessories.values()
    }

    /// Returns the [`Accessory`] of a device.
    #[must_use]
    #[inline]
    pub fn accessory(&self, id: &str) -> Option<&Arc<Accessory>> {
        self.accessories.get(id)
    }

    /// Returns the number of accessories.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.accessories.len()
    }

    /// Checks whether the bridge has no accessories.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.accessories.is_empty()
    }

    /// Starts a live update listener task for each [`Accessory`] whose
    /// device publishes live updates.
    ///
    /// A listener task receives the updates of a device and pushes the
    /// values of the subscribed characteristics to the host. Tasks stop on
    /// [`Self::shutdown`], or when the device closes its channel.
    ///
    /// Returns the number of started listeners.
    ///
    /// # Errors
    ///
    /// An error is returned when no live update listener has started.
    pub fn start_live_updates(&mut self) -> Result<usize> {
        let mut started_count = 0;
        for (id, accessory) in &self.accessories {
            if self.listeners.contains_key(id) {
                warn!("Skip device with id `{id}`: live updates already started");
                continue;
            }

            let Some(receiver) = accessory.device().updates() else {
                warn!("Skip device with id `{id}`: it does not publish live updates");
                continue;
            };

            let listener = tokio::spawn(run_update_listener(
                Arc::clone(accessory),
                receiver,
                self.cancellation_token.clone(),
            ));
            let _ = self.listeners.insert(id.clone(), listener);
            debug!("Start live updates of device with id `{id}`");

            started_count += 1;
        }

        if started_count == 0 {
            return Err(Error::new(
                ErrorKind::Updates,
                "No live update listeners has started",
            ));
        }

        Ok(started_count)
    }

    /// Shuts down the [`Bridge`], stopping all live update listeners.
    ///
    /// # Note
    ///
    /// For a graceful shutdown, this method must be called before dropping
    /// the [`Bridge`].
    pub async fn shutdown(self) {
        // Stop all listener loops.
        self.cancellation_token.cancel();

        for (id, listener) in self.listeners {
            // Await the task.
            if let Err(e) = listener.await {
                error!("Failed to await the live update listener of device with id `{id}`: {e}");
            }
        }
    }
}
