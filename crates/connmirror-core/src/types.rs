//! Domain types mirrored from the connectivity daemon

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────
// Service Type & State
// ─────────────────────────────────────────────────────────

/// Kind of network service behind a mirrored object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceType {
    Wifi,
    Ethernet,
    P2p,
}

impl ServiceType {
    /// Map the daemon's `Type` property string.
    ///
    /// Unknown strings return `None`; callers leave the previous type in
    /// place rather than guessing.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "wifi" => Some(ServiceType::Wifi),
            "ethernet" => Some(ServiceType::Ethernet),
            // Peer objects report both spellings depending on daemon version
            "peer" | "Peer" => Some(ServiceType::P2p),
            _ => None,
        }
    }
}

/// Connection state as reported by the daemon.
///
/// `online` is tracked separately on the service; it is orthogonal to
/// this progression.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceState {
    #[default]
    Idle,
    Association,
    Configuration,
    Ready,
    Online,
    Disconnect,
    Failure,
}

impl ServiceState {
    /// Parse a wire-level state string. Unrecognized input maps to `Idle`.
    pub fn from_wire(s: &str) -> Self {
        match s {
            "idle" => ServiceState::Idle,
            "association" => ServiceState::Association,
            "configuration" => ServiceState::Configuration,
            "ready" => ServiceState::Ready,
            "online" => ServiceState::Online,
            "disconnect" => ServiceState::Disconnect,
            "failure" => ServiceState::Failure,
            _ => ServiceState::Idle,
        }
    }

    /// The exact wire-level string for this state.
    pub fn as_wire(&self) -> &'static str {
        match self {
            ServiceState::Idle => "idle",
            ServiceState::Association => "association",
            ServiceState::Configuration => "configuration",
            ServiceState::Ready => "ready",
            ServiceState::Online => "online",
            ServiceState::Disconnect => "disconnect",
            ServiceState::Failure => "failure",
        }
    }

    /// Coarse label used by status consumers.
    pub fn portal_label(&self) -> &'static str {
        match self {
            ServiceState::Disconnect | ServiceState::Idle => "notAssociated",
            ServiceState::Association => "associating",
            ServiceState::Configuration => "associated",
            ServiceState::Ready | ServiceState::Online => "ipConfigured",
            ServiceState::Failure => "ipFailed",
        }
    }

    /// Ready or Online, i.e. the link carries traffic.
    pub fn is_connected(&self) -> bool {
        matches!(self, ServiceState::Ready | ServiceState::Online)
    }
}

// ─────────────────────────────────────────────────────────
// Change Tracking
// ─────────────────────────────────────────────────────────

/// Dirty-flag categories consumers re-fetch on.
pub mod category {
    /// Connection status queries need refreshing.
    pub const STATUS: u32 = 1 << 0;
    /// Network listings (scan results) need refreshing.
    pub const FIND_NETWORKS: u32 = 1 << 1;

    pub const ALL: u32 = STATUS | FIND_NETWORKS;
}

/// Bitset over [`category`] values. Consumers poll and clear; setting a
/// bit never fires a callback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeMask(u32);

impl ChangeMask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the given categories dirty.
    pub fn set_changed(&mut self, categories: u32) {
        self.0 |= categories & category::ALL;
    }

    /// Clear the given categories.
    pub fn unset_changed(&mut self, categories: u32) {
        self.0 &= !categories;
    }

    /// True if any of the given categories is dirty.
    pub fn is_changed(&self, categories: u32) -> bool {
        self.0 & categories != 0
    }
}

// ─────────────────────────────────────────────────────────
// Network Info
// ─────────────────────────────────────────────────────────

/// Maximum length of a BSSID string (`xx:xx:xx:xx:xx:xx`).
pub const BSSID_MAX_LEN: usize = 17;

/// One BSS a Wi-Fi service is visible through.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BssEntry {
    pub bssid: String,
    pub signal: i32,
    pub frequency: i32,
}

/// IPv4 configuration mirrored from the daemon.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ipv4Info {
    pub method: Option<String>,
    pub address: Option<String>,
    pub netmask: Option<String>,
    pub gateway: Option<String>,
    pub prefix_len: Option<u8>,
}

/// IPv6 configuration mirrored from the daemon.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ipv6Info {
    pub method: Option<String>,
    pub address: Option<String>,
    pub gateway: Option<String>,
    pub prefix_len: Option<u8>,
}

/// Aggregate IP state, populated on demand by a snapshot fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpInfo {
    pub ipv4: Ipv4Info,
    pub ipv6: Ipv6Info,
    pub dns: Vec<String>,
    pub interface: Option<String>,
    pub mac_address: Option<String>,
}

/// Proxy state, populated on demand by a snapshot fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyInfo {
    pub method: Option<String>,
    pub url: Option<String>,
    pub servers: Vec<String>,
    pub excludes: Vec<String>,
}

// ─────────────────────────────────────────────────────────
// P2P / Wi-Fi Display
// ─────────────────────────────────────────────────────────

/// Wi-Fi Display device role, from the two low bits of the Device
/// Information sub-element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WfdDeviceType {
    #[default]
    Source,
    PrimarySink,
    SecondarySink,
    DualRole,
}

impl WfdDeviceType {
    pub fn from_bits(bits: u16) -> Self {
        match bits & 0x03 {
            0 => WfdDeviceType::Source,
            1 => WfdDeviceType::PrimarySink,
            2 => WfdDeviceType::SecondarySink,
            _ => WfdDeviceType::DualRole,
        }
    }
}

/// Wi-Fi Display capabilities of a peer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WfdInfo {
    pub enabled: bool,
    pub device_type: WfdDeviceType,
    pub session_available: u8,
    pub content_protection: bool,
    pub rtsp_port: u16,
}

/// P2P peer details carried by `P2P` property bags and discovery data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    pub address: Option<String>,
    /// Primary device type string, e.g. `"10-0050F204-5"`.
    pub device_type: Option<String>,
    pub group_owner: bool,
    pub config_method: u16,
    pub wfd: WfdInfo,
}

/// WPS provisioning method requested by a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WpsType {
    Pbc,
    Keypad,
    Display,
}

impl WpsType {
    pub fn from_wire(v: i32) -> Option<Self> {
        match v {
            0 => Some(WpsType::Pbc),
            1 => Some(WpsType::Keypad),
            2 => Some(WpsType::Display),
            _ => None,
        }
    }
}

/// Incoming P2P request pushed by the daemon as a property event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum P2pRequest {
    GoNegotiation { wps_type: i32 },
    ProvisionDiscoveryPbc,
    ProvisionDiscoveryEnterPin,
    ProvisionDiscoveryDisplayPin { pin: String },
    InvitationReceived { peer_address: String },
    PersistentReceived { peer_address: String },
    PeerAdded,
}

impl P2pRequest {
    /// Wire-level event name this request arrived under.
    pub fn event_name(&self) -> &'static str {
        match self {
            P2pRequest::GoNegotiation { .. } => "P2PGONegRequested",
            P2pRequest::ProvisionDiscoveryPbc => "P2PProvDiscRequestedPBC",
            P2pRequest::ProvisionDiscoveryEnterPin => "P2PProvDiscRequestedEnterPin",
            P2pRequest::ProvisionDiscoveryDisplayPin { .. } => "P2PProvDiscRequestedDisplayPin",
            P2pRequest::InvitationReceived { .. } => "P2PInvitationReceived",
            P2pRequest::PersistentReceived { .. } => "P2PPersistentReceived",
            P2pRequest::PeerAdded => "PeerAdded",
        }
    }

    /// WPS method implied by the request, where one applies.
    pub fn wps_type(&self) -> Option<WpsType> {
        match self {
            P2pRequest::GoNegotiation { wps_type } => WpsType::from_wire(*wps_type),
            P2pRequest::ProvisionDiscoveryPbc => Some(WpsType::Pbc),
            P2pRequest::ProvisionDiscoveryEnterPin => Some(WpsType::Keypad),
            P2pRequest::ProvisionDiscoveryDisplayPin { .. } => Some(WpsType::Display),
            _ => None,
        }
    }
}
