//! Service registry with deferred destruction
//!
//! Services are keyed by their remote object path. Removing a service
//! whose connect is still in flight does not drop it immediately: the
//! pending token is cancelled and the entity parked until the cancelled
//! completion has run, so a completion callback never observes a freed
//! service. Parked services are reaped on the next dispatched event.

use std::collections::HashMap;
use std::sync::Arc;

use connmirror_core::prelude::*;
use connmirror_core::{PropertyBag, Value};

use crate::remote::{RemoteService, SsidCodec};
use crate::service::Service;
use crate::state::UpdateContext;

#[derive(Default)]
pub struct ServiceRegistry {
    services: HashMap<String, Service>,
    doomed: Vec<Service>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Services removed but not yet reaped.
    pub fn pending_destroy(&self) -> usize {
        self.doomed.len()
    }

    pub fn get(&self, path: &str) -> Option<&Service> {
        self.services.get(path)
    }

    pub fn get_mut(&mut self, path: &str) -> Option<&mut Service> {
        self.services.get_mut(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Service> {
        self.services.values()
    }

    /// Instantiate a service from its initial `(path, snapshot)` pair and
    /// decode the snapshot. A service already known under that path keeps
    /// its bindings and just decodes the new snapshot.
    pub fn add_service(
        &mut self,
        path: &str,
        properties: &PropertyBag,
        remote: Arc<dyn RemoteService>,
        codec: Arc<dyn SsidCodec>,
        ctx: &mut UpdateContext<'_>,
    ) -> &mut Service {
        use std::collections::hash_map::Entry;

        match self.services.entry(path.to_string()) {
            Entry::Occupied(occupied) => {
                let service = occupied.into_mut();
                service.apply_properties(properties, ctx);
                debug!(path, "service updated");
                service
            }
            Entry::Vacant(vacant) => {
                let mut service = Service::new(path, remote, codec);
                service.apply_properties(properties, ctx);
                debug!(path, name = ?service.name, "service added");
                vacant.insert(service)
            }
        }
    }

    /// Route a pushed property to its service. Reaps any parked services
    /// whose cancelled connect has since completed. Returns `false` for
    /// unknown paths.
    pub fn dispatch_property(
        &mut self,
        path: &str,
        key: &str,
        value: &Value,
        ctx: &mut UpdateContext<'_>,
    ) -> bool {
        self.sweep();

        match self.services.get_mut(path) {
            Some(service) => {
                service.apply_property(key, value, ctx);
                true
            }
            None => {
                trace!(path, key, "property push for unknown service");
                false
            }
        }
    }

    /// Remove a service. Destruction is deferred while a connect is in
    /// flight; installed routing rules are torn down either way.
    pub fn remove(&mut self, path: &str, ctx: &mut UpdateContext<'_>) -> bool {
        let Some(mut service) = self.services.remove(path) else {
            return false;
        };

        service.delete_ip_rule(ctx);

        if service.connect_in_flight() {
            debug!(path, "deferring service destruction until connect settles");
            service.cancel_connect();
            self.doomed.push(service);
        } else {
            debug!(path, "service removed");
        }

        true
    }

    /// Drop parked services whose connect token has settled.
    pub fn sweep(&mut self) {
        self.doomed.retain(|service| {
            let in_flight = service.connect_in_flight();
            if !in_flight {
                debug!(path = %service.path(), "reaping deferred service");
            }
            in_flight
        });
    }
}
