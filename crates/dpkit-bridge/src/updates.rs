use std::sync::Arc;

use dpkit::characteristic::CharacteristicKind;
use dpkit::service::ServiceId;
use dpkit::status::StatusUpdate;

use hashbrown::{DefaultHashBuilder, HashMap};
use indexmap::IndexMap;

use tokio_util::sync::CancellationToken;

use tracing::{debug, trace};

use crate::accessory::Accessory;
use crate::binder::Reader;
use crate::device::Snapshot;
use crate::registry::Registry;

type Routes = IndexMap<(ServiceId, CharacteristicKind), Reader, DefaultHashBuilder>;

/// The readers subscribed to the live updates of each schema code.
///
/// A characteristic is subscribed at most once per code, so repeated
/// configuration never duplicates pushes.
#[derive(Default)]
pub struct Subscriptions {
    routes: HashMap<String, Routes>,
}

impl std::fmt::Debug for Subscriptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(
                self.routes
                    .iter()
                    .map(|(code, routes)| (code, routes.keys().collect::<Vec<_>>())),
            )
            .finish()
    }
}

impl Subscriptions {
    /// Creates empty [`Subscriptions`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes the reader of a characteristic to the live updates of a
    /// schema code, replacing any previous reader of the same characteristic.
    pub fn subscribe(
        &mut self,
        code: &str,
        service: ServiceId,
        kind: CharacteristicKind,
        reader: Reader,
    ) {
        let _ = self
            .routes
            .entry_ref(code)
            .or_default()
            .insert((service, kind), reader);
    }

    /// Removes every subscription of a service.
    pub fn remove_service(&mut self, service: &ServiceId) {
        for routes in self.routes.values_mut() {
            routes.retain(|(id, _), _| id != service);
        }
        self.routes.retain(|_, routes| !routes.is_empty());
    }

    /// Removes every subscription.
    pub fn clear(&mut self) {
        self.routes.clear();
    }

    /// Returns the number of subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.values().map(IndexMap::len).sum()
    }

    /// Checks whether there are no subscriptions.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Runs the readers subscribed to a schema code and pushes their values
    /// to the registry.
    ///
    /// Returns the number of pushed values.
    pub fn dispatch(&self, code: &str, snapshot: &Snapshot<'_>, registry: &Registry) -> usize {
        let Some(routes) = self.routes.get(code) else {
            trace!("No subscriptions for code `{code}`");
            return 0;
        };

        let mut pushed = 0;
        for ((service, kind), reader) in routes {
            if registry.update_characteristic(service, *kind, reader(snapshot)) {
                pushed += 1;
            }
        }
        pushed
    }
}

pub(crate) async fn run_update_listener(
    accessory: Arc<Accessory>,
    receiver: flume::Receiver<StatusUpdate>,
    cancellation_token: CancellationToken,
) {
    loop {
        tokio::select! {
            // Use the cancellation token to stop the loop
            () = cancellation_token.cancelled() => { break; }
            // Wait for the next update published by the device
            update = receiver.recv_async() => {
                let Ok(update) = update else {
                    debug!(
                        "Stop live updates of device with id `{}`: channel closed",
                        accessory.id()
                    );
                    break;
                };

                let pushed = accessory.handle_update(&update);
                trace!(
                    "Update `{}` of device with id `{}` pushed {pushed} values",
                    update.code,
                    accessory.id()
                );
            }
        }
    }
    drop(receiver);
}
