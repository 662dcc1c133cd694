//! # connmirror-daemon - Service Mirror & Remote Commands
//!
//! Maintains local mirrors of the connectivity daemon's service/peer
//! objects. Inbound property pushes and snapshots are decoded onto
//! [`Service`] entities, state transitions run through a suppression
//! policy with routing-rule and diagnostics side effects, and outbound
//! commands (connect with cancellation, configuration writes, snapshot
//! fetches) go through the remote proxy seam.
//!
//! Depends on [`connmirror_core`] for domain types and error handling.
//!
//! ## Public API
//!
//! ### The Mirror (`service`, `decode`, `state`)
//! - [`Service`] - One mirrored service/peer, with decode and transition methods
//! - [`UpdateContext`] - Collaborators threaded through every update
//! - [`DiagnosticsSubscription`] - Explicit diagnostics-subscription state
//!
//! ### Commands (`commands`)
//! - [`ConnectToken`] / [`ConnectState`] - The one cancellable in-flight connect
//! - [`Ipv4Config`], [`Ipv6Config`], [`ProxyConfig`] - Sparse configuration writes
//!
//! ### Registry (`registry`)
//! - [`ServiceRegistry`] - Path-keyed services with deferred destruction
//!
//! ### Collaborator Seams (`remote`)
//! - [`RemoteService`] - The bound remote object
//! - [`RoutingMutator`], [`WifiTechnology`], [`SubscriberSink`] - Side-effect sinks
//! - [`SsidCodec`] - Locale-aware SSID re-encoding
//! - [`ServiceListener`] - Change/P2P-request notifications
//!
//! ### Configuration (`config`)
//! - [`DaemonConfig`] - Timeout, routing-table offset, locale override

pub mod commands;
pub mod config;
mod decode;
pub mod registry;
pub mod remote;
pub mod service;
pub mod state;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;

// Public API re-exports
pub use commands::{ConnectState, ConnectToken, Ipv4Config, Ipv6Config, ProxyConfig};
pub use config::{DaemonConfig, DEFAULT_REMOTE_TIMEOUT_SECS, DEFAULT_ROUTE_TABLE_OFFSET};
pub use registry::ServiceRegistry;
pub use remote::{
    PeerInventory, RemoteService, RoutingMutator, ServiceListener, SsidCodec, SubscriberSink,
    TechnologyHandle, WifiTechnology,
};
pub use service::Service;
pub use state::{DiagnosticsSubscription, UpdateContext};
