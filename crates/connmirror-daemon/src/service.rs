//! The mirrored service entity
//!
//! One [`Service`] exists per remote network service or peer object. Its
//! fields are mutated exclusively by decoded property pushes, the state
//! transition engine and command completions -- all delivered on the same
//! event-dispatch task, so no internal locking is needed.

use std::sync::Arc;

use connmirror_core::prelude::*;
use connmirror_core::{
    BssEntry, ChangeMask, IpInfo, PeerInfo, ProxyInfo, ServiceState, ServiceType,
};

use crate::commands::ConnectToken;
use crate::remote::{RemoteService, ServiceListener, SsidCodec};

/// Local mirror of one remote network service/peer.
pub struct Service {
    identifier: String,
    path: String,

    pub(crate) remote: Arc<dyn RemoteService>,
    pub(crate) codec: Arc<dyn SsidCodec>,
    pub(crate) listener: Option<Arc<dyn ServiceListener>>,

    /// Established from the `Type` property; `None` until the first decode.
    pub service_type: Option<ServiceType>,
    pub name: Option<String>,
    pub(crate) state: ServiceState,
    pub(crate) online: bool,
    pub(crate) disconnecting: bool,
    /// Hidden Wi-Fi networks first appear mid-association.
    pub hidden: bool,
    pub strength: u8,
    pub security: Vec<String>,
    pub auto_connect: bool,
    pub immutable: bool,
    pub favorite: bool,
    pub online_checking: bool,
    pub last_error: Option<String>,
    pub address: Option<String>,
    pub interface_name: Option<String>,
    pub mac_address: Option<String>,

    /// Raw SSID bytes as pushed by the daemon; not necessarily UTF-8.
    pub ssid: Option<Vec<u8>>,
    pub display_name: Option<String>,

    pub ip_info: IpInfo,
    pub proxy_info: ProxyInfo,
    pub peer: PeerInfo,
    pub bss: Vec<BssEntry>,

    pub(crate) changes: ChangeMask,
    pub(crate) pending_connect: Option<ConnectToken>,
    pub(crate) iprule_added: bool,
}

impl Service {
    /// Create a mirror for the object at `path`, bound to its remote proxy.
    ///
    /// The identifier is the last path segment (the daemon exposes stable
    /// object paths like `.../service/wifi_xxxx_managed_psk`).
    pub fn new(
        path: impl Into<String>,
        remote: Arc<dyn RemoteService>,
        codec: Arc<dyn SsidCodec>,
    ) -> Self {
        let path = path.into();
        let identifier = path.rsplit('/').next().unwrap_or(path.as_str()).to_string();

        Self {
            identifier,
            path,
            remote,
            codec,
            listener: None,
            service_type: None,
            name: None,
            state: ServiceState::Idle,
            online: false,
            disconnecting: false,
            hidden: false,
            strength: 0,
            security: Vec::new(),
            auto_connect: false,
            immutable: false,
            favorite: false,
            online_checking: false,
            last_error: None,
            address: None,
            interface_name: None,
            mac_address: None,
            ssid: None,
            display_name: None,
            ip_info: IpInfo::default(),
            proxy_info: ProxyInfo::default(),
            peer: PeerInfo::default(),
            bss: Vec::new(),
            changes: ChangeMask::new(),
            pending_connect: None,
            iprule_added: false,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Register the listener for decoded change notifications. At most one
    /// listener is held; a second registration replaces the first.
    pub fn register_listener(&mut self, listener: Arc<dyn ServiceListener>) {
        self.listener = Some(listener);
    }

    // ─────────────────────────────────────────────────────────
    // State Accessors
    // ─────────────────────────────────────────────────────────

    pub fn state(&self) -> ServiceState {
        self.state
    }

    pub fn online(&self) -> bool {
        self.online
    }

    pub fn is_disconnecting(&self) -> bool {
        self.disconnecting
    }

    pub fn is_wifi(&self) -> bool {
        self.service_type == Some(ServiceType::Wifi)
    }

    pub fn is_ethernet(&self) -> bool {
        self.service_type == Some(ServiceType::Ethernet)
    }

    pub fn is_p2p(&self) -> bool {
        self.service_type == Some(ServiceType::P2p)
    }

    /// Ready or Online.
    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    pub fn is_online(&self) -> bool {
        self.state == ServiceState::Online
    }

    /// True while a connect is pending or its cancellation has not yet
    /// completed. The registry defers destruction while this holds.
    pub fn connect_in_flight(&self) -> bool {
        self.pending_connect
            .as_ref()
            .is_some_and(|token| !token.is_completed())
    }

    // ─────────────────────────────────────────────────────────
    // Change Tracking
    // ─────────────────────────────────────────────────────────

    pub fn set_changed(&mut self, categories: u32) {
        self.changes.set_changed(categories);
    }

    pub fn unset_changed(&mut self, categories: u32) {
        self.changes.unset_changed(categories);
    }

    pub fn is_changed(&self, categories: u32) -> bool {
        self.changes.is_changed(categories)
    }

    // ─────────────────────────────────────────────────────────
    // Display Name
    // ─────────────────────────────────────────────────────────

    /// Recompute `display_name` from the stored SSID bytes.
    ///
    /// A pure-UTF-8 SSID is used verbatim; anything else is re-encoded
    /// with the current system locale. Called on every SSID change and
    /// again when the UI locale changes.
    pub fn update_display_name(&mut self) {
        let Some(ssid) = self.ssid.as_deref() else {
            return;
        };

        match std::str::from_utf8(ssid) {
            Ok(s) => {
                self.display_name = Some(s.to_string());
            }
            Err(_) => {
                let locale = self.codec.current_locale();
                info!(
                    service = %self.path,
                    %locale,
                    "SSID is not pure UTF-8, converting with system locale"
                );
                self.display_name = Some(self.codec.to_utf8(ssid, &locale));
            }
        }
    }
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("path", &self.path)
            .field("type", &self.service_type)
            .field("state", &self.state)
            .field("online", &self.online)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
