//! Test utilities for core types
//!
//! Provides helper functions for building property-bag fixtures the way
//! the daemon pushes them.

use crate::values::{PropertyBag, Value};

/// Builds a minimal Wi-Fi service snapshot.
pub fn wifi_snapshot(name: &str) -> PropertyBag {
    PropertyBag::new()
        .with("Type", "wifi")
        .with("Name", name)
        .with("State", "idle")
        .with("Strength", Value::Byte(57))
        .with("Security", vec!["psk".to_string()])
}

/// Builds an Ethernet service snapshot with interface details.
pub fn ethernet_snapshot(interface: &str, mac: &str) -> PropertyBag {
    PropertyBag::new()
        .with("Type", "ethernet")
        .with("Name", "Wired")
        .with("State", "idle")
        .with(
            "Ethernet",
            PropertyBag::new()
                .with("Interface", interface)
                .with("Address", mac),
        )
}

/// Builds a P2P peer snapshot.
pub fn peer_snapshot(name: &str, address: &str) -> PropertyBag {
    PropertyBag::new()
        .with("Type", "peer")
        .with("Name", name)
        .with("State", "idle")
        .with(
            "P2P",
            PropertyBag::new()
                .with("DeviceAddress", address)
                .with("GroupOwner", false),
        )
}

/// Builds one BSS entry bag with all three fields present.
pub fn bss_entry(id: &str, signal: i32, frequency: i32) -> PropertyBag {
    PropertyBag::new()
        .with("Id", id)
        .with("Signal", Value::Int32(signal))
        .with("Frequency", Value::Int32(frequency))
}

/// Wraps entry bags the way the daemon ships a `BSS` property.
pub fn bss_list(entries: Vec<PropertyBag>) -> Value {
    Value::Array(entries.into_iter().map(Value::Bag).collect())
}
