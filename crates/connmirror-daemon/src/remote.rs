//! Collaborator seams around the mirror core
//!
//! The mirror never talks to the system directly: the remote daemon
//! binding, routing-table mutation, the Wi-Fi technology object, status
//! subscribers and SSID re-encoding all sit behind the traits in this
//! module. Production wiring binds them to the transport; tests drop in
//! fakes.

use futures_util::future::BoxFuture;

use connmirror_core::prelude::*;
use connmirror_core::{P2pRequest, PropertyBag, Value};

/// The remote service/peer object bound over the daemon transport.
///
/// Synchronous calls block until the remote responds or the transport's
/// configured timeout elapses (see [`crate::config::DaemonConfig`]); a
/// timeout surfaces as an error, never a retry. `connect` is the only
/// asynchronous operation; cancellation of an in-flight connect is
/// handled on the caller's side of this seam.
pub trait RemoteService: Send + Sync {
    /// Begin an asynchronous connect and resolve with its outcome.
    fn connect(&self) -> BoxFuture<'static, Result<()>>;

    fn disconnect(&self) -> Result<()>;

    fn remove(&self) -> Result<()>;

    /// Reject an incoming connection attempt (peer objects only).
    fn reject_peer(&self) -> Result<()>;

    /// Make this service the default route.
    fn set_default(&self) -> Result<()>;

    fn set_property(&self, name: &str, value: &Value) -> Result<()>;

    /// Fetch a full property snapshot.
    fn get_properties(&self) -> Result<PropertyBag>;
}

/// OS routing-policy mutator.
///
/// Rule installation is fire-and-forget at the shell level and assumed
/// idempotent per table id, so these do not return errors.
pub trait RoutingMutator: Send + Sync {
    fn add_rule(&self, table_id: u32, address: &str, prefix_len: u8, gateway: &str);
    fn delete_rule(&self, table_id: u32, address: &str, prefix_len: u8, gateway: &str);
}

/// Handle to a technology object owned by the daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TechnologyHandle {
    pub path: String,
}

/// Access to the Wi-Fi technology singleton.
pub trait WifiTechnology: Send + Sync {
    /// Locate the Wi-Fi technology object, if the daemon exposes one.
    fn find_wifi(&self) -> Option<TechnologyHandle>;

    /// Ask the technology to re-read its properties from the daemon.
    fn update_properties(&self, handle: &TechnologyHandle) -> Result<()>;
}

/// Status broadcast to subscribed consumers. No payload; receivers
/// re-query whatever they care about.
pub trait SubscriberSink: Send + Sync {
    fn notify_subscribers(&self);
}

/// Presence of a currently-connected P2P peer, evaluated at call time.
pub trait PeerInventory: Send + Sync {
    fn has_connected_peer(&self) -> bool;
}

/// Locale lookup and SSID re-encoding for non-UTF-8 SSIDs.
pub trait SsidCodec: Send + Sync {
    fn current_locale(&self) -> String;

    /// Re-encode raw SSID bytes to UTF-8 using the given locale.
    fn to_utf8(&self, ssid: &[u8], locale: &str) -> String;
}

/// Listener registered per service for decoded change notifications.
///
/// `value` is the raw wire value that triggered the notification, so
/// listeners can forward it without re-encoding.
pub trait ServiceListener: Send + Sync {
    fn on_property_changed(&self, service_path: &str, name: &str, value: &Value);

    fn on_p2p_request(&self, service_path: &str, request: &P2pRequest);
}
