//! # connmirror-core - Core Domain Types
//!
//! Foundation crate for the connectivity-service mirror. Provides the
//! dynamically-typed property-value model, mirrored domain types, change
//! tracking, Wi-Fi Display capability decoding, error handling, and the
//! logging bootstrap.
//!
//! This crate has **zero internal dependencies** -- it only depends on
//! external crates (serde, chrono, thiserror, tracing).
//!
//! ## Public API
//!
//! ### Property Values (`values`)
//! - [`Value`] - Tagged union covering every wire-level value type
//! - [`PropertyBag`] - Ordered `(key, Value)` sequence with typed accessors
//!
//! ### Domain Types (`types`)
//! - [`ServiceType`], [`ServiceState`] - Kind and connection state of a service
//! - [`ChangeMask`] + [`category`] - Dirty-flag bitset polled by consumers
//! - [`BssEntry`], [`IpInfo`], [`ProxyInfo`], [`PeerInfo`] - Mirrored detail records
//! - [`P2pRequest`], [`WpsType`] - Incoming peer-to-peer request events
//!
//! ### Wi-Fi Display (`wfd`)
//! - [`parse_wfd_device_info()`] - Decode the Device Information sub-element
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum with `fatal` vs `recoverable` classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use connmirror_core::prelude::*;
//! ```

pub mod error;
pub mod logging;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;
pub mod types;
pub mod values;
pub mod wfd;

/// Prelude for common imports used throughout the mirror crates
pub mod prelude {
    pub use super::error::{Error, Result, ResultExt};
    pub use tracing::{debug, error, info, instrument, trace, warn};
}

// Re-export commonly used types at crate root for convenience
pub use error::{Error, Result, ResultExt};
pub use types::{
    category, BssEntry, ChangeMask, IpInfo, Ipv4Info, Ipv6Info, P2pRequest, PeerInfo, ProxyInfo,
    ServiceState, ServiceType, WfdDeviceType, WfdInfo, WpsType, BSSID_MAX_LEN,
};
pub use values::{PropertyBag, Value};
pub use wfd::parse_wfd_device_info;
