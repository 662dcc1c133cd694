//! Property decoding onto the service mirror
//!
//! A single decode table serves both full snapshots and single-key pushes:
//! every recognized key maps to a typed setter, nested bags recurse, and
//! unrecognized keys are ignored. Missing or mistyped sub-fields are
//! logged and defaulted; a malformed entry never aborts the rest of an
//! update.

use connmirror_core::prelude::*;
use connmirror_core::{
    category, parse_wfd_device_info, BssEntry, P2pRequest, PropertyBag, ServiceState, ServiceType,
    Value, WfdDeviceType, BSSID_MAX_LEN,
};

use crate::service::Service;
use crate::state::UpdateContext;

fn prefix_len_of(value: &Value) -> Option<u8> {
    value
        .as_byte()
        .or_else(|| value.as_i32().and_then(|v| u8::try_from(v).ok()))
}

impl Service {
    /// Apply a full property snapshot, one key at a time in bag order.
    pub fn apply_properties(&mut self, properties: &PropertyBag, ctx: &mut UpdateContext<'_>) {
        debug!(service = %self.path(), keys = properties.len(), "updating service");

        for (key, value) in properties.iter() {
            self.apply_property(key, value, ctx);
        }
    }

    /// Apply one pushed `(key, value)` pair.
    pub fn apply_property(&mut self, key: &str, value: &Value, ctx: &mut UpdateContext<'_>) {
        match key {
            "Name" => {
                let Some(name) = value.as_str() else { return };
                if self.name.as_deref() != Some(name) {
                    self.changes
                        .set_changed(category::STATUS | category::FIND_NETWORKS);
                }
                self.name = Some(name.to_string());
            }
            "WiFi.SSID" => {
                if let Some(bytes) = value.as_bytes() {
                    self.ssid = Some(bytes.to_vec());
                    self.update_display_name();
                }
            }
            "Type" => {
                if let Some(kind) = value.as_str().and_then(ServiceType::from_wire) {
                    self.service_type = Some(kind);
                }
            }
            "State" => {
                if let Some(state) = value.as_str() {
                    self.advance_state(state, ctx);
                    // Only a hidden network is first seen mid-association
                    if self.state() == ServiceState::Association {
                        self.hidden = true;
                    }
                }
            }
            "Strength" => {
                if let Some(strength) = value.as_byte() {
                    if strength != self.strength {
                        self.strength = strength;
                        self.changes.set_changed(category::FIND_NETWORKS);
                    }
                }
            }
            "Security" => {
                if let Some(security) = value.as_str_array() {
                    self.security = security.to_vec();
                }
            }
            "AutoConnect" => {
                if let Some(v) = value.as_bool() {
                    self.auto_connect = v;
                }
            }
            "Immutable" => {
                if let Some(v) = value.as_bool() {
                    self.immutable = v;
                }
            }
            "Favorite" => {
                if let Some(v) = value.as_bool() {
                    self.favorite = v;
                }
            }
            "Online" => {
                if let Some(online) = value.as_bool() {
                    self.advance_online(online, ctx);
                }
            }
            "RunOnlineCheck" => {
                if let Some(checking) = value.as_bool() {
                    if checking != self.online_checking {
                        self.online_checking = checking;
                        self.changes.set_changed(category::STATUS);
                        ctx.subscribers.notify_subscribers();
                    }
                }
            }
            "Error" => {
                if let Some(error) = value.as_str() {
                    self.last_error = Some(error.to_string());
                }
            }
            "Address" => {
                if let Some(address) = value.as_str() {
                    self.address = Some(address.to_string());
                }
            }
            "Ethernet" => {
                if let Some(bag) = value.as_bag() {
                    self.apply_ethernet_bag(bag, ctx);
                }
            }
            "P2P" => {
                if let Some(bag) = value.as_bag() {
                    self.apply_p2p_bag(bag);
                }
            }
            "Services" => self.apply_peer_services(value),
            "BSS" => self.apply_bss_list(value),
            "IPv4" => {
                // Forwarded only for a P2P group owner; the group client
                // address matters to whoever runs the group.
                if self.is_p2p() && self.peer.group_owner {
                    if let Some(listener) = self.listener.clone() {
                        listener.on_property_changed(self.path(), "IPv4", value);
                    }
                }
            }
            "IPv6" | "Proxy" | "Nameservers" => {
                self.changes.set_changed(category::STATUS);
                ctx.subscribers.notify_subscribers();
            }
            "P2PGONegRequested" => {
                if let Some(wps_type) = value.as_i32() {
                    self.dispatch_p2p_request(P2pRequest::GoNegotiation { wps_type });
                }
            }
            "P2PProvDiscRequestedPBC" => {
                self.dispatch_p2p_request(P2pRequest::ProvisionDiscoveryPbc);
            }
            "P2PProvDiscRequestedEnterPin" => {
                self.dispatch_p2p_request(P2pRequest::ProvisionDiscoveryEnterPin);
            }
            "P2PProvDiscRequestedDisplayPin" => {
                if let Some(pin) = value.as_str() {
                    self.dispatch_p2p_request(P2pRequest::ProvisionDiscoveryDisplayPin {
                        pin: pin.to_string(),
                    });
                }
            }
            "P2PInvitationReceived" => {
                if let Some(peer_address) = value.as_str() {
                    self.dispatch_p2p_request(P2pRequest::InvitationReceived {
                        peer_address: peer_address.to_string(),
                    });
                }
            }
            "P2PPersistentReceived" => {
                if let Some(peer_address) = value.as_str() {
                    self.dispatch_p2p_request(P2pRequest::PersistentReceived {
                        peer_address: peer_address.to_string(),
                    });
                }
            }
            "PeerAdded" => {
                if ctx.peers.has_connected_peer() {
                    self.dispatch_p2p_request(P2pRequest::PeerAdded);
                }
            }
            _ => {
                trace!(service = %self.path(), key, "ignoring unrecognized property");
            }
        }
    }

    fn dispatch_p2p_request(&self, request: P2pRequest) {
        debug!(service = %self.path(), event = request.event_name(), "p2p request");
        if let Some(listener) = &self.listener {
            listener.on_p2p_request(self.path(), &request);
        }
    }

    // ─────────────────────────────────────────────────────────
    // Nested Bags
    // ─────────────────────────────────────────────────────────

    fn apply_ethernet_bag(&mut self, bag: &PropertyBag, ctx: &mut UpdateContext<'_>) {
        for (key, value) in bag.iter() {
            match key {
                "Interface" => {
                    if let Some(interface) = value.as_str() {
                        self.interface_name = Some(interface.to_string());
                        self.create_ip_rule(ctx);
                    }
                }
                "Address" => {
                    if let Some(mac) = value.as_str() {
                        self.mac_address = Some(mac.to_string());
                    }
                }
                _ => {}
            }
        }
    }

    fn apply_p2p_bag(&mut self, bag: &PropertyBag) {
        // WFD advertisement may have been withdrawn; only the sub-keys
        // below re-enable it.
        self.peer.wfd.enabled = false;

        for (key, value) in bag.iter() {
            match key {
                "DeviceAddress" => {
                    if let Some(address) = value.as_str() {
                        self.peer.address = Some(address.to_string());
                    }
                }
                "DeviceType" => {
                    if let Some(device_type) = value.as_str() {
                        self.peer.device_type = Some(device_type.to_string());
                    }
                }
                "GroupOwner" => {
                    if let Some(v) = value.as_bool() {
                        self.peer.group_owner = v;
                    }
                }
                "ConfigMethod" => {
                    if let Some(v) = value.as_u16() {
                        self.peer.config_method = v;
                    }
                }
                "WFDDevType" => {
                    if let Some(v) = value.as_u16() {
                        self.peer.wfd.device_type = WfdDeviceType::from_bits(v);
                        self.peer.wfd.enabled = true;
                    }
                }
                "WFDSessionAvail" => {
                    if let Some(v) = value.as_bool() {
                        self.peer.wfd.session_available = u8::from(v);
                    }
                }
                "WFDCPSupport" => {
                    if let Some(v) = value.as_bool() {
                        self.peer.wfd.content_protection = v;
                    }
                }
                "WFDRtspPort" => {
                    if let Some(port) = value.as_u32().and_then(|p| u16::try_from(p).ok()) {
                        self.peer.wfd.rtsp_port = port;
                    }
                }
                _ => {}
            }
        }
    }

    /// Locate the `WiFiDisplayIEs` blob inside a peer's `Services`
    /// property (entry list, then key lookup) and decode it.
    fn apply_peer_services(&mut self, value: &Value) {
        let Some(first) = value.as_array().and_then(|entries| entries.first()) else {
            return;
        };
        let Some(bag) = first.as_bag() else {
            return;
        };

        if let Some(ies) = bag.get("WiFiDisplayIEs").and_then(Value::as_bytes) {
            debug!(service = %self.path(), len = ies.len(), "peer wifi display IEs");
            if let Some(info) = parse_wfd_device_info(ies) {
                self.peer.wfd = info;
            }
        }
    }

    /// Full replacement of the BSS list. Entries with missing fields are
    /// logged and defaulted, never skipped.
    fn apply_bss_list(&mut self, value: &Value) {
        let Some(entries) = value.as_array() else {
            return;
        };

        let mut list = Vec::with_capacity(entries.len());

        for entry in entries {
            let Some(bag) = entry.as_bag() else {
                warn!(service = %self.path(), "BSS entry is not a property bag");
                continue;
            };

            let id = bag.get("Id").and_then(Value::as_str);
            let signal = bag.get("Signal").and_then(Value::as_i32);
            let frequency = bag.get("Frequency").and_then(Value::as_i32);

            if id.is_none() || signal.is_none() || frequency.is_none() {
                warn!(service = %self.path(), "missing some fields in BSS section");
            }

            let bssid = match id {
                Some(s) if s.len() > BSSID_MAX_LEN => {
                    warn!(
                        service = %self.path(),
                        length = s.len(),
                        "incorrect bssid length, truncating"
                    );
                    s.chars().take(BSSID_MAX_LEN).collect()
                }
                Some(s) => s.to_string(),
                None => String::new(),
            };

            list.push(BssEntry {
                bssid,
                signal: signal.unwrap_or(0),
                frequency: frequency.unwrap_or(0),
            });
        }

        self.bss = list;
    }

    // ─────────────────────────────────────────────────────────
    // On-Demand Snapshot Parsing
    // ─────────────────────────────────────────────────────────

    /// Merge the IP-related keys of a full snapshot into `ip_info`.
    pub(crate) fn apply_ip_snapshot(&mut self, properties: &PropertyBag) {
        for (key, value) in properties.iter() {
            let Some(bag) = value.as_bag() else {
                if key == "Nameservers" {
                    if let Some(dns) = value.as_str_array() {
                        self.ip_info.dns = dns.to_vec();
                    }
                }
                continue;
            };

            match key {
                "Ethernet" => {
                    if let Some(interface) = bag.get_str("Interface") {
                        self.ip_info.interface = Some(interface.to_string());
                    }
                    if let Some(mac) = bag.get_str("Address") {
                        self.ip_info.mac_address = Some(mac.to_string());
                    }
                }
                "IPv4" => {
                    let ipv4 = &mut self.ip_info.ipv4;
                    if let Some(method) = bag.get_str("Method") {
                        ipv4.method = Some(method.to_string());
                    }
                    if let Some(address) = bag.get_str("Address") {
                        ipv4.address = Some(address.to_string());
                    }
                    if let Some(netmask) = bag.get_str("Netmask") {
                        ipv4.netmask = Some(netmask.to_string());
                    }
                    if let Some(gateway) = bag.get_str("Gateway") {
                        ipv4.gateway = Some(gateway.to_string());
                    }
                    if let Some(prefix) = bag.get("PrefixLength").and_then(prefix_len_of) {
                        ipv4.prefix_len = Some(prefix);
                    }
                }
                "IPv6" => {
                    let ipv6 = &mut self.ip_info.ipv6;
                    if let Some(method) = bag.get_str("Method") {
                        ipv6.method = Some(method.to_string());
                    }
                    if let Some(address) = bag.get_str("Address") {
                        ipv6.address = Some(address.to_string());
                    }
                    if let Some(gateway) = bag.get_str("Gateway") {
                        ipv6.gateway = Some(gateway.to_string());
                    }
                    if let Some(prefix) = bag.get("PrefixLength").and_then(prefix_len_of) {
                        ipv6.prefix_len = Some(prefix);
                    }
                }
                _ => {}
            }
        }
    }

    /// Merge the `Proxy` key of a full snapshot into `proxy_info`.
    pub(crate) fn apply_proxy_snapshot(&mut self, properties: &PropertyBag) {
        let Some(proxy) = properties.get("Proxy").and_then(Value::as_bag) else {
            return;
        };

        if let Some(method) = proxy.get_str("Method") {
            self.proxy_info.method = Some(method.to_string());
        }
        if let Some(url) = proxy.get_str("URL") {
            self.proxy_info.url = Some(url.to_string());
        }
        if let Some(servers) = proxy.get("Servers").and_then(Value::as_str_array) {
            self.proxy_info.servers = servers.to_vec();
        }
        if let Some(excludes) = proxy.get("Excludes").and_then(Value::as_str_array) {
            self.proxy_info.excludes = excludes.to_vec();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{Harness, RecordingListener};
    use connmirror_core::test_utils::{bss_entry, bss_list, peer_snapshot, wifi_snapshot};
    use std::sync::Arc;

    #[test]
    fn test_snapshot_decode_basic_fields() {
        let mut harness = Harness::new();
        let mut service = harness.service("/net/mirror/service/wifi_home");

        let bag = wifi_snapshot("HomeNet")
            .with("AutoConnect", true)
            .with("Favorite", true)
            .with("Immutable", false);
        service.apply_properties(&bag, &mut harness.ctx());

        assert_eq!(service.service_type, Some(ServiceType::Wifi));
        assert_eq!(service.name.as_deref(), Some("HomeNet"));
        assert_eq!(service.state(), ServiceState::Idle);
        assert_eq!(service.strength, 57);
        assert_eq!(service.security, vec!["psk".to_string()]);
        assert!(service.auto_connect);
        assert!(service.favorite);
        assert!(!service.immutable);
    }

    #[test]
    fn test_name_change_marks_both_categories() {
        let mut harness = Harness::new();
        let mut service = harness.service("/net/mirror/service/s");

        service.apply_property("Name", &Value::String("first".into()), &mut harness.ctx());
        assert!(service.is_changed(category::STATUS));
        assert!(service.is_changed(category::FIND_NETWORKS));

        service.unset_changed(category::ALL);
        service.apply_property("Name", &Value::String("first".into()), &mut harness.ctx());
        assert!(!service.is_changed(category::ALL));
    }

    #[test]
    fn test_type_unknown_leaves_field_unchanged() {
        let mut harness = Harness::new();
        let mut service = harness.service("/net/mirror/service/s");

        service.apply_property("Type", &Value::String("wifi".into()), &mut harness.ctx());
        assert_eq!(service.service_type, Some(ServiceType::Wifi));

        service.apply_property("Type", &Value::String("vpn".into()), &mut harness.ctx());
        assert_eq!(service.service_type, Some(ServiceType::Wifi));
    }

    #[test]
    fn test_strength_update_marks_find_networks_only() {
        let mut harness = Harness::new();
        let mut service = harness.service("/net/mirror/service/s");

        service.apply_property("Strength", &Value::Byte(80), &mut harness.ctx());
        assert_eq!(service.strength, 80);
        assert!(service.is_changed(category::FIND_NETWORKS));
        assert!(!service.is_changed(category::STATUS));

        service.unset_changed(category::ALL);
        service.apply_property("Strength", &Value::Byte(80), &mut harness.ctx());
        assert!(!service.is_changed(category::ALL));
    }

    #[test]
    fn test_ssid_decode_recomputes_display_name() {
        let mut harness = Harness::new();
        let mut service = harness.service("/net/mirror/service/s");

        service.apply_property(
            "WiFi.SSID",
            &Value::ByteString(b"Lobby".to_vec()),
            &mut harness.ctx(),
        );

        assert_eq!(service.ssid.as_deref(), Some(&b"Lobby"[..]));
        assert_eq!(service.display_name.as_deref(), Some("Lobby"));
    }

    #[test]
    fn test_ssid_wrong_type_ignored() {
        let mut harness = Harness::new();
        let mut service = harness.service("/net/mirror/service/s");

        service.apply_property("WiFi.SSID", &Value::String("nope".into()), &mut harness.ctx());
        assert!(service.ssid.is_none());
    }

    #[test]
    fn test_run_online_check_marks_and_broadcasts() {
        let mut harness = Harness::new();
        let mut service = harness.service("/net/mirror/service/s");

        service.apply_property("RunOnlineCheck", &Value::Bool(true), &mut harness.ctx());
        assert!(service.online_checking);
        assert!(service.is_changed(category::STATUS));
        assert_eq!(harness.subscribers.count(), 1);

        // unchanged value: no re-broadcast
        service.apply_property("RunOnlineCheck", &Value::Bool(true), &mut harness.ctx());
        assert_eq!(harness.subscribers.count(), 1);
    }

    #[test]
    fn test_error_property_stored() {
        let mut harness = Harness::new();
        let mut service = harness.service("/net/mirror/service/s");

        service.apply_property(
            "Error",
            &Value::String("invalid-key".into()),
            &mut harness.ctx(),
        );
        assert_eq!(service.last_error.as_deref(), Some("invalid-key"));
    }

    #[test]
    fn test_ethernet_bag_decodes_interface_and_mac() {
        let mut harness = Harness::new();
        let mut service = harness.service("/net/mirror/service/ethernet_cable");

        let bag = PropertyBag::new()
            .with("Interface", "eth0")
            .with("Address", "aa:bb:cc:dd:ee:ff");
        service.apply_property("Ethernet", &Value::Bag(bag), &mut harness.ctx());

        assert_eq!(service.interface_name.as_deref(), Some("eth0"));
        assert_eq!(service.mac_address.as_deref(), Some("aa:bb:cc:dd:ee:ff"));
    }

    #[test]
    fn test_p2p_bag_decode_resets_wfd() {
        let mut harness = Harness::new();
        let mut service = harness.service("/net/mirror/peer/p2p_aa");

        let bag = peer_snapshot("TV", "de:ad:be:ef:00:01");
        service.apply_properties(&bag, &mut harness.ctx());
        assert_eq!(service.service_type, Some(ServiceType::P2p));
        assert_eq!(service.peer.address.as_deref(), Some("de:ad:be:ef:00:01"));
        assert!(!service.peer.wfd.enabled);

        let wfd_bag = PropertyBag::new()
            .with("DeviceAddress", "de:ad:be:ef:00:01")
            .with("ConfigMethod", Value::Uint16(0x0080))
            .with("WFDDevType", Value::Uint16(1))
            .with("WFDSessionAvail", true)
            .with("WFDCPSupport", false)
            .with("WFDRtspPort", Value::Uint32(7236));
        service.apply_property("P2P", &Value::Bag(wfd_bag), &mut harness.ctx());

        assert!(service.peer.wfd.enabled);
        assert_eq!(service.peer.wfd.device_type, WfdDeviceType::PrimarySink);
        assert_eq!(service.peer.wfd.session_available, 1);
        assert_eq!(service.peer.wfd.rtsp_port, 7236);
        assert_eq!(service.peer.config_method, 0x0080);

        // a P2P push without WFD keys withdraws the advertisement
        let plain = PropertyBag::new().with("GroupOwner", true);
        service.apply_property("P2P", &Value::Bag(plain), &mut harness.ctx());
        assert!(!service.peer.wfd.enabled);
        assert!(service.peer.group_owner);
    }

    #[test]
    fn test_services_wifi_display_ies() {
        let mut harness = Harness::new();
        let mut service = harness.service("/net/mirror/peer/p2p_aa");

        let ies = vec![0x00, 0x00, 0x06, 0x01, 0x45, 0x01, 0xBB, 0x00, 0x00];
        let services = Value::Array(vec![Value::Bag(
            PropertyBag::new().with("WiFiDisplayIEs", Value::ByteString(ies)),
        )]);
        service.apply_property("Services", &services, &mut harness.ctx());

        assert!(service.peer.wfd.enabled);
        assert_eq!(service.peer.wfd.rtsp_port, 443);
    }

    #[test]
    fn test_services_malformed_ies_keeps_prior_state() {
        let mut harness = Harness::new();
        let mut service = harness.service("/net/mirror/peer/p2p_aa");
        service.peer.wfd.rtsp_port = 7236;
        service.peer.wfd.enabled = true;

        // too short: must be silently ignored
        let services = Value::Array(vec![Value::Bag(PropertyBag::new().with(
            "WiFiDisplayIEs",
            Value::ByteString(vec![0x00, 0x00, 0x06, 0x01, 0x23, 0x45, 0x00, 0x50]),
        ))]);
        service.apply_property("Services", &services, &mut harness.ctx());

        assert!(service.peer.wfd.enabled);
        assert_eq!(service.peer.wfd.rtsp_port, 7236);
    }

    #[test]
    fn test_bss_full_replacement() {
        let mut harness = Harness::new();
        let mut service = harness.service("/net/mirror/service/wifi_home");

        let first = bss_list(vec![
            bss_entry("00:11:22:33:44:55", -40, 2412),
            bss_entry("66:77:88:99:aa:bb", -70, 5180),
        ]);
        service.apply_property("BSS", &first, &mut harness.ctx());
        assert_eq!(service.bss.len(), 2);
        assert_eq!(service.bss[0].bssid, "00:11:22:33:44:55");
        assert_eq!(service.bss[1].frequency, 5180);

        let second = bss_list(vec![bss_entry("cc:dd:ee:ff:00:11", -55, 2437)]);
        service.apply_property("BSS", &second, &mut harness.ctx());
        assert_eq!(service.bss.len(), 1);
        assert_eq!(service.bss[0].bssid, "cc:dd:ee:ff:00:11");
    }

    #[test]
    fn test_bss_missing_signal_defaults_to_zero() {
        let mut harness = Harness::new();
        let mut service = harness.service("/net/mirror/service/wifi_home");

        let entry = PropertyBag::new()
            .with("Id", "00:11:22:33:44:55")
            .with("Frequency", Value::Int32(2412));
        service.apply_property(
            "BSS",
            &Value::Array(vec![Value::Bag(entry)]),
            &mut harness.ctx(),
        );

        assert_eq!(service.bss.len(), 1);
        assert_eq!(service.bss[0].signal, 0);
        assert_eq!(service.bss[0].frequency, 2412);
    }

    #[test]
    fn test_bss_long_id_truncated() {
        let mut harness = Harness::new();
        let mut service = harness.service("/net/mirror/service/wifi_home");

        let entry = bss_entry("00:11:22:33:44:55:66", -50, 2412);
        service.apply_property(
            "BSS",
            &Value::Array(vec![Value::Bag(entry)]),
            &mut harness.ctx(),
        );

        assert_eq!(service.bss[0].bssid.len(), BSSID_MAX_LEN);
        assert_eq!(service.bss[0].bssid, "00:11:22:33:44:55");
    }

    #[test]
    fn test_ipv6_proxy_nameserver_pushes_broadcast() {
        let mut harness = Harness::new();
        let mut service = harness.service("/net/mirror/service/s");

        for key in ["IPv6", "Proxy", "Nameservers"] {
            service.unset_changed(category::ALL);
            service.apply_property(key, &Value::Bag(PropertyBag::new()), &mut harness.ctx());
            assert!(service.is_changed(category::STATUS), "{key}");
            assert!(!service.is_changed(category::FIND_NETWORKS), "{key}");
        }
        assert_eq!(harness.subscribers.count(), 3);
    }

    #[test]
    fn test_ipv4_forwarded_only_for_group_owner() {
        let mut harness = Harness::new();
        let listener = Arc::new(RecordingListener::default());
        let mut service = harness.service("/net/mirror/peer/p2p_aa");
        service.register_listener(listener.clone());
        service.service_type = Some(ServiceType::P2p);

        let addr_bag = Value::Bag(PropertyBag::new().with("Address", "192.168.49.1"));

        service.apply_property("IPv4", &addr_bag, &mut harness.ctx());
        assert_eq!(listener.change_count(), 0);

        service.peer.group_owner = true;
        service.apply_property("IPv4", &addr_bag, &mut harness.ctx());
        assert_eq!(listener.change_count(), 1);
        assert_eq!(listener.changes()[0].0, "IPv4");
    }

    #[test]
    fn test_p2p_request_events_dispatched() {
        let mut harness = Harness::new();
        let listener = Arc::new(RecordingListener::default());
        let mut service = harness.service("/net/mirror/peer/p2p_aa");
        service.register_listener(listener.clone());

        service.apply_property("P2PGONegRequested", &Value::Int32(2), &mut harness.ctx());
        service.apply_property("P2PProvDiscRequestedPBC", &Value::Bool(true), &mut harness.ctx());
        service.apply_property(
            "P2PProvDiscRequestedDisplayPin",
            &Value::String("86413579".into()),
            &mut harness.ctx(),
        );
        service.apply_property(
            "P2PInvitationReceived",
            &Value::String("de:ad:be:ef:00:01".into()),
            &mut harness.ctx(),
        );

        let requests = listener.p2p_requests();
        assert_eq!(requests.len(), 4);
        assert_eq!(requests[0], P2pRequest::GoNegotiation { wps_type: 2 });
        assert_eq!(requests[1], P2pRequest::ProvisionDiscoveryPbc);
        assert_eq!(
            requests[2],
            P2pRequest::ProvisionDiscoveryDisplayPin {
                pin: "86413579".into()
            }
        );
        assert_eq!(
            requests[3],
            P2pRequest::InvitationReceived {
                peer_address: "de:ad:be:ef:00:01".into()
            }
        );
    }

    #[test]
    fn test_peer_added_requires_connected_peer() {
        let mut harness = Harness::new();
        let listener = Arc::new(RecordingListener::default());
        let mut service = harness.service("/net/mirror/peer/p2p_aa");
        service.register_listener(listener.clone());

        service.apply_property("PeerAdded", &Value::Bool(true), &mut harness.ctx());
        assert!(listener.p2p_requests().is_empty());

        harness.peers.set_connected(true);
        service.apply_property("PeerAdded", &Value::Bool(true), &mut harness.ctx());
        assert_eq!(listener.p2p_requests(), vec![P2pRequest::PeerAdded]);
    }

    #[test]
    fn test_unrecognized_key_ignored() {
        let mut harness = Harness::new();
        let mut service = harness.service("/net/mirror/service/s");
        service.apply_property("Frobnicate", &Value::Bool(true), &mut harness.ctx());
        assert!(!service.is_changed(category::ALL));
    }

    #[test]
    fn test_hidden_marker_on_association_snapshot() {
        let mut harness = Harness::new();
        let mut service = harness.service("/net/mirror/service/wifi_hidden");

        let bag = wifi_snapshot("hidden-net").with("State", "association");
        // fixture carries "State": "idle" first; the later key wins in order
        service.apply_properties(&bag, &mut harness.ctx());
        assert!(service.hidden);
    }

    #[test]
    fn test_ip_snapshot_parse() {
        let mut harness = Harness::new();
        let mut service = harness.service("/net/mirror/service/s");

        let bag = PropertyBag::new()
            .with(
                "Ethernet",
                PropertyBag::new()
                    .with("Interface", "eth0")
                    .with("Address", "aa:bb:cc:dd:ee:ff"),
            )
            .with(
                "IPv4",
                PropertyBag::new()
                    .with("Method", "manual")
                    .with("Address", "10.0.0.2")
                    .with("Netmask", "255.0.0.0")
                    .with("Gateway", "10.0.0.1")
                    .with("PrefixLength", Value::Byte(8)),
            )
            .with(
                "IPv6",
                PropertyBag::new()
                    .with("Method", "auto")
                    .with("Address", "fe80::1")
                    .with("Gateway", "fe80::ff")
                    .with("PrefixLength", Value::Byte(64)),
            )
            .with("Nameservers", vec!["1.1.1.1".to_string(), "8.8.8.8".to_string()]);

        service.apply_ip_snapshot(&bag);

        assert_eq!(service.ip_info.interface.as_deref(), Some("eth0"));
        assert_eq!(service.ip_info.ipv4.method.as_deref(), Some("manual"));
        assert_eq!(service.ip_info.ipv4.prefix_len, Some(8));
        assert_eq!(service.ip_info.ipv6.address.as_deref(), Some("fe80::1"));
        assert_eq!(service.ip_info.ipv6.prefix_len, Some(64));
        assert_eq!(service.ip_info.dns.len(), 2);
    }

    #[test]
    fn test_proxy_snapshot_parse() {
        let mut harness = Harness::new();
        let mut service = harness.service("/net/mirror/service/s");

        let bag = PropertyBag::new().with(
            "Proxy",
            PropertyBag::new()
                .with("Method", "manual")
                .with("URL", "http://proxy.example/wpad.dat")
                .with("Servers", vec!["proxy.example:3128".to_string()])
                .with("Excludes", vec!["localhost".to_string()]),
        );

        service.apply_proxy_snapshot(&bag);

        assert_eq!(service.proxy_info.method.as_deref(), Some("manual"));
        assert_eq!(
            service.proxy_info.url.as_deref(),
            Some("http://proxy.example/wpad.dat")
        );
        assert_eq!(service.proxy_info.servers, vec!["proxy.example:3128"]);
        assert_eq!(service.proxy_info.excludes, vec!["localhost"]);
    }
}
