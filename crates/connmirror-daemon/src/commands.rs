//! Remote command façade
//!
//! Everything a caller can ask the remote service object to do: the
//! single cancellable asynchronous connect, the synchronous
//! disconnect/remove/reject/default commands, sparse configuration
//! writes, and on-demand property snapshot fetches.

use std::sync::{Arc, Mutex};

use connmirror_core::prelude::*;
use connmirror_core::{PropertyBag, Value};

use crate::service::Service;

// ─────────────────────────────────────────────────────────
// Connect Token
// ─────────────────────────────────────────────────────────

/// Lifecycle of one connect attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectState {
    Active,
    CancelRequested,
    Completed,
}

/// Shared handle for one in-flight connect.
///
/// The completion driver moves the token to `Completed` exactly once; a
/// cancel that lands before completion makes the completion report
/// failure without inspecting the remote result. Owners that want to
/// destroy a service check [`is_completed`](Self::is_completed) and
/// defer until the handle settles.
#[derive(Clone)]
pub struct ConnectToken {
    state: Arc<Mutex<ConnectState>>,
}

impl ConnectToken {
    fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ConnectState::Active)),
        }
    }

    pub fn state(&self) -> ConnectState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Request cancellation. A no-op once the connect has completed.
    pub fn cancel(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if *state == ConnectState::Active {
            *state = ConnectState::CancelRequested;
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.state() == ConnectState::CancelRequested
    }

    pub fn is_completed(&self) -> bool {
        self.state() == ConnectState::Completed
    }

    /// Settle the token. Returns `true` if it was still active (i.e. the
    /// completion outcome should be honored).
    fn finish(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let live = *state == ConnectState::Active;
        *state = ConnectState::Completed;
        live
    }
}

impl std::fmt::Debug for ConnectToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ConnectToken").field(&self.state()).finish()
    }
}

/// The daemon reports these connect errors for an already-satisfied
/// request; they are remapped to success. Containment match on purpose --
/// the daemon prefixes its error names.
fn is_idempotent_connect_error(err: &Error, peer: bool) -> bool {
    let Some(message) = err.remote_message() else {
        return false;
    };

    message.contains("AlreadyConnected") || (peer && message.contains("Operation aborted"))
}

// ─────────────────────────────────────────────────────────
// Configuration Inputs
// ─────────────────────────────────────────────────────────

/// IPv4 configuration write. Only populated fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ipv4Config {
    pub method: Option<String>,
    pub address: Option<String>,
    pub netmask: Option<String>,
    pub gateway: Option<String>,
}

impl Ipv4Config {
    fn to_bag(&self) -> PropertyBag {
        let mut bag = PropertyBag::new();
        if let Some(method) = &self.method {
            bag.push("Method", method.as_str());
        }
        if let Some(address) = &self.address {
            bag.push("Address", address.as_str());
        }
        if let Some(netmask) = &self.netmask {
            bag.push("Netmask", netmask.as_str());
        }
        if let Some(gateway) = &self.gateway {
            bag.push("Gateway", gateway.as_str());
        }
        bag
    }
}

/// IPv6 configuration write. Only populated fields are sent; a prefix
/// length above 128 is dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ipv6Config {
    pub method: Option<String>,
    pub address: Option<String>,
    pub prefix_length: Option<u8>,
    pub gateway: Option<String>,
}

impl Ipv6Config {
    fn to_bag(&self) -> PropertyBag {
        let mut bag = PropertyBag::new();
        if let Some(method) = &self.method {
            bag.push("Method", method.as_str());
        }
        if let Some(address) = &self.address {
            bag.push("Address", address.as_str());
        }
        if let Some(prefix) = self.prefix_length.filter(|p| *p <= 128) {
            bag.push("PrefixLength", Value::Byte(prefix));
        }
        if let Some(gateway) = &self.gateway {
            bag.push("Gateway", gateway.as_str());
        }
        bag
    }
}

/// Proxy configuration write. Only populated fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyConfig {
    pub method: Option<String>,
    pub url: Option<String>,
    pub servers: Vec<String>,
    pub excludes: Vec<String>,
}

impl ProxyConfig {
    fn to_bag(&self) -> PropertyBag {
        let mut bag = PropertyBag::new();
        if let Some(method) = &self.method {
            bag.push("Method", method.as_str());
        }
        if let Some(url) = &self.url {
            bag.push("URL", url.as_str());
        }
        if !self.servers.is_empty() {
            bag.push("Servers", self.servers.clone());
        }
        if !self.excludes.is_empty() {
            bag.push("Excludes", self.excludes.clone());
        }
        bag
    }
}

// ─────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────

impl Service {
    /// Start an asynchronous connect.
    ///
    /// At most one connect is in flight per service: starting a new one
    /// cancels the previous token, whose completion callback then fires
    /// with `success = false`. The returned token can be used to cancel
    /// without access to the service.
    ///
    /// Completion rules: a cancelled connect reports failure without
    /// inspecting the remote result; a remote error naming an
    /// already-satisfied request (`AlreadyConnected`, and for peers also
    /// `Operation aborted`) reports success.
    pub fn connect<F>(&mut self, on_complete: F) -> ConnectToken
    where
        F: FnOnce(bool) + Send + 'static,
    {
        self.disconnecting = false;

        if let Some(previous) = self.pending_connect.take() {
            debug!(service = %self.path(), "replacing pending connect");
            previous.cancel();
        }

        let token = ConnectToken::new();
        self.pending_connect = Some(token.clone());

        let peer = self.is_p2p();
        let path = self.path().to_string();
        let request = self.remote.connect();

        debug!(service = %path, "connect started");

        let driver_token = token.clone();
        tokio::spawn(async move {
            let result = request.await;

            let success = if !driver_token.finish() {
                // Cancelled while in flight: the result is not inspected.
                debug!(service = %path, "connect completed after cancellation");
                false
            } else {
                match result {
                    Ok(()) => true,
                    Err(err) => {
                        error!(service = %path, %err, "connect failed");
                        is_idempotent_connect_error(&err, peer)
                    }
                }
            };

            on_complete(success);
        });

        token
    }

    /// Request cancellation of the pending connect, if any.
    pub fn cancel_connect(&self) {
        if let Some(token) = &self.pending_connect {
            token.cancel();
        }
    }

    pub fn disconnect(&mut self) -> Result<()> {
        self.disconnecting = true;
        self.remote
            .disconnect()
            .with_context(|| format!("disconnect failed for {}", self.path()))
    }

    pub fn remove(&mut self) -> Result<()> {
        self.disconnecting = true;
        self.remote
            .remove()
            .with_context(|| format!("remove failed for {}", self.path()))
    }

    /// Reject an incoming P2P connection from another peer device.
    pub fn reject_peer(&self) -> Result<()> {
        self.remote
            .reject_peer()
            .with_context(|| format!("reject peer failed for {}", self.path()))
    }

    /// Make this service the default route.
    pub fn set_default(&self) -> Result<()> {
        self.remote
            .set_default()
            .with_context(|| format!("set default failed for {}", self.path()))
    }

    // ─────────────────────────────────────────────────────────
    // Configuration Writes
    // ─────────────────────────────────────────────────────────

    pub fn set_ipv4(&self, config: &Ipv4Config) -> Result<()> {
        self.remote
            .set_property("IPv4.Configuration", &Value::Bag(config.to_bag()))
            .with_context(|| format!("set ipv4 failed for {}", self.path()))
    }

    pub fn set_ipv6(&self, config: &Ipv6Config) -> Result<()> {
        self.remote
            .set_property("IPv6.Configuration", &Value::Bag(config.to_bag()))
            .with_context(|| format!("set ipv6 failed for {}", self.path()))
    }

    pub fn set_proxy(&self, config: &ProxyConfig) -> Result<()> {
        self.remote
            .set_property("Proxy.Configuration", &Value::Bag(config.to_bag()))
            .with_context(|| format!("set proxy failed for {}", self.path()))
    }

    pub fn set_nameservers(&self, servers: &[String]) -> Result<()> {
        self.remote
            .set_property(
                "Nameservers.Configuration",
                &Value::StringArray(servers.to_vec()),
            )
            .with_context(|| format!("set nameservers failed for {}", self.path()))
    }

    pub fn set_autoconnect(&self, value: bool) -> Result<()> {
        self.remote
            .set_property("AutoConnect", &Value::Bool(value))
            .with_context(|| format!("set autoconnect failed for {}", self.path()))
    }

    pub fn set_run_online_check(&self, value: bool) -> Result<()> {
        self.remote
            .set_property("RunOnlineCheck", &Value::Bool(value))
            .with_context(|| format!("set online check failed for {}", self.path()))
    }

    pub fn set_passphrase(&self, passphrase: &str) -> Result<()> {
        self.remote
            .set_property("Passphrase", &Value::String(passphrase.to_string()))
            .with_context(|| format!("set passphrase failed for {}", self.path()))
    }

    // ─────────────────────────────────────────────────────────
    // Snapshot Fetches
    // ─────────────────────────────────────────────────────────

    /// Fetch the full property snapshot without applying it.
    pub fn fetch_properties(&self) -> Result<PropertyBag> {
        self.remote
            .get_properties()
            .with_context(|| format!("fetch properties failed for {}", self.path()))
    }

    /// Fetch a snapshot and merge its IP-related keys into `ip_info`.
    pub fn fetch_ip_info(&mut self) -> Result<()> {
        let properties = self.fetch_properties()?;
        self.apply_ip_snapshot(&properties);
        Ok(())
    }

    /// Fetch a snapshot and merge its `Proxy` key into `proxy_info`.
    pub fn fetch_proxy_info(&mut self) -> Result<()> {
        let properties = self.fetch_properties()?;
        self.apply_proxy_snapshot(&properties);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{test_service, Harness};
    use connmirror_core::ServiceType;
    use tokio::sync::oneshot;

    fn completion() -> (impl FnOnce(bool) + Send + 'static, oneshot::Receiver<bool>) {
        let (tx, rx) = oneshot::channel();
        (move |ok| drop(tx.send(ok)), rx)
    }

    #[tokio::test]
    async fn test_connect_success() {
        let mut service = test_service("/net/mirror/service/s");
        let (cb, rx) = completion();

        let token = service.connect(cb);
        assert!(rx.await.unwrap());
        assert!(token.is_completed());
        assert!(!service.connect_in_flight());
    }

    #[tokio::test]
    async fn test_connect_clears_disconnecting() {
        let mut service = test_service("/net/mirror/service/s");
        service.disconnecting = true;

        let (cb, rx) = completion();
        service.connect(cb);
        assert!(!service.is_disconnecting());
        let _ = rx.await;
    }

    #[tokio::test]
    async fn test_connect_failure() {
        let harness = Harness::new();
        harness
            .remote
            .queue_connect_result(Err("net.mirror.Error.Failed".into()));
        let mut service = harness.service("/net/mirror/service/s");

        let (cb, rx) = completion();
        service.connect(cb);
        assert!(!rx.await.unwrap());
    }

    #[tokio::test]
    async fn test_connect_already_connected_remapped_to_success() {
        let harness = Harness::new();
        harness
            .remote
            .queue_connect_result(Err("GDBus.Error:net.mirror.Error.AlreadyConnected: Already connected".into()));
        let mut service = harness.service("/net/mirror/service/s");

        let (cb, rx) = completion();
        service.connect(cb);
        assert!(rx.await.unwrap());
    }

    #[tokio::test]
    async fn test_connect_operation_aborted_is_success_for_peers_only() {
        let harness = Harness::new();
        harness
            .remote
            .queue_connect_result(Err("Operation aborted".into()));
        let mut service = harness.service("/net/mirror/peer/p2p_aa");
        service.service_type = Some(ServiceType::P2p);

        let (cb, rx) = completion();
        service.connect(cb);
        assert!(rx.await.unwrap());

        // the same error on a non-peer service stays a failure
        harness
            .remote
            .queue_connect_result(Err("Operation aborted".into()));
        let mut wifi = harness.service("/net/mirror/service/wifi_x");
        wifi.service_type = Some(ServiceType::Wifi);

        let (cb, rx) = completion();
        wifi.connect(cb);
        assert!(!rx.await.unwrap());
    }

    #[tokio::test]
    async fn test_cancel_then_complete_reports_failure_once() {
        let harness = Harness::new();
        let gate = harness.remote.gate_next_connect();
        // even a successful remote result must not be inspected
        harness.remote.queue_connect_result(Ok(()));
        let mut service = harness.service("/net/mirror/service/s");

        let (cb, rx) = completion();
        let token = service.connect(cb);
        assert!(service.connect_in_flight());

        service.cancel_connect();
        assert!(token.is_cancelled());

        gate.send(()).unwrap();
        assert!(!rx.await.unwrap());
        assert!(token.is_completed());
        assert!(!service.connect_in_flight());
    }

    #[tokio::test]
    async fn test_new_connect_replaces_pending_token() {
        let harness = Harness::new();
        let gate1 = harness.remote.gate_next_connect();
        let mut service = harness.service("/net/mirror/service/s");

        let (cb1, rx1) = completion();
        let first = service.connect(cb1);

        let (cb2, rx2) = completion();
        let second = service.connect(cb2);

        // the first caller observes cancellation once its completion runs
        gate1.send(()).unwrap();
        assert!(!rx1.await.unwrap());
        assert!(first.is_completed());

        assert!(rx2.await.unwrap());
        assert!(second.is_completed());
    }

    #[tokio::test]
    async fn test_disconnect_sets_flag_and_calls_remote() {
        let harness = Harness::new();
        let mut service = harness.service("/net/mirror/service/s");

        service.disconnect().unwrap();
        assert!(service.is_disconnecting());
        assert_eq!(harness.remote.sync_calls(), vec!["disconnect"]);
    }

    #[tokio::test]
    async fn test_remove_sets_flag_and_surfaces_error() {
        let harness = Harness::new();
        harness.remote.fail_sync("net.mirror.Error.NotRegistered");
        let mut service = harness.service("/net/mirror/service/s");

        let err = service.remove().unwrap_err();
        assert!(service.is_disconnecting());
        assert!(err.to_string().contains("NotRegistered"));
    }

    #[tokio::test]
    async fn test_reject_peer_does_not_set_disconnecting() {
        let harness = Harness::new();
        let service = harness.service("/net/mirror/peer/p2p_aa");

        service.reject_peer().unwrap();
        assert!(!service.is_disconnecting());
        assert_eq!(harness.remote.sync_calls(), vec!["reject_peer"]);
    }

    #[test]
    fn test_ipv4_config_sparse_bag() {
        let config = Ipv4Config {
            method: Some("manual".into()),
            address: Some("10.0.0.2".into()),
            netmask: None,
            gateway: None,
        };

        let bag = config.to_bag();
        assert_eq!(bag.len(), 2);
        assert_eq!(bag.get_str("Method"), Some("manual"));
        assert_eq!(bag.get_str("Address"), Some("10.0.0.2"));
        assert!(bag.get("Netmask").is_none());
        assert!(bag.get("Gateway").is_none());
    }

    #[test]
    fn test_ipv6_config_prefix_range() {
        let config = Ipv6Config {
            method: Some("manual".into()),
            prefix_length: Some(64),
            ..Default::default()
        };
        assert_eq!(config.to_bag().get("PrefixLength"), Some(&Value::Byte(64)));

        let out_of_range = Ipv6Config {
            prefix_length: Some(129),
            ..Default::default()
        };
        assert!(out_of_range.to_bag().get("PrefixLength").is_none());
    }

    #[test]
    fn test_proxy_config_skips_empty_lists() {
        let config = ProxyConfig {
            method: Some("direct".into()),
            ..Default::default()
        };
        let bag = config.to_bag();
        assert_eq!(bag.len(), 1);
        assert!(bag.get("Servers").is_none());
        assert!(bag.get("Excludes").is_none());
    }

    #[tokio::test]
    async fn test_set_property_writes() {
        let harness = Harness::new();
        let service = harness.service("/net/mirror/service/s");

        service.set_autoconnect(true).unwrap();
        service
            .set_nameservers(&["1.1.1.1".to_string(), "9.9.9.9".to_string()])
            .unwrap();
        service.set_passphrase("hunter2345").unwrap();
        service.set_run_online_check(false).unwrap();

        let writes = harness.remote.set_calls();
        assert_eq!(writes[0], ("AutoConnect".to_string(), Value::Bool(true)));
        assert_eq!(
            writes[1],
            (
                "Nameservers.Configuration".to_string(),
                Value::StringArray(vec!["1.1.1.1".into(), "9.9.9.9".into()])
            )
        );
        assert_eq!(
            writes[2],
            (
                "Passphrase".to_string(),
                Value::String("hunter2345".into())
            )
        );
        assert_eq!(
            writes[3],
            ("RunOnlineCheck".to_string(), Value::Bool(false))
        );
    }

    #[tokio::test]
    async fn test_set_ipv4_targets_configuration_key() {
        let harness = Harness::new();
        let service = harness.service("/net/mirror/service/s");

        service
            .set_ipv4(&Ipv4Config {
                method: Some("dhcp".into()),
                ..Default::default()
            })
            .unwrap();

        let writes = harness.remote.set_calls();
        assert_eq!(writes[0].0, "IPv4.Configuration");
        assert!(matches!(&writes[0].1, Value::Bag(bag) if bag.get_str("Method") == Some("dhcp")));
    }

    #[tokio::test]
    async fn test_fetch_ip_and_proxy_info() {
        let harness = Harness::new();
        harness.remote.set_snapshot(
            connmirror_core::PropertyBag::new()
                .with(
                    "IPv4",
                    connmirror_core::PropertyBag::new()
                        .with("Method", "dhcp")
                        .with("Address", "192.168.1.20"),
                )
                .with(
                    "Proxy",
                    connmirror_core::PropertyBag::new().with("Method", "direct"),
                ),
        );
        let mut service = harness.service("/net/mirror/service/s");

        service.fetch_ip_info().unwrap();
        service.fetch_proxy_info().unwrap();

        assert_eq!(service.ip_info.ipv4.address.as_deref(), Some("192.168.1.20"));
        assert_eq!(service.proxy_info.method.as_deref(), Some("direct"));
    }

    #[tokio::test]
    async fn test_fetch_properties_error_surfaces() {
        let harness = Harness::new();
        harness.remote.fail_sync("timeout");
        let service = harness.service("/net/mirror/service/s");

        assert!(service.fetch_properties().is_err());
    }

    #[test]
    fn test_idempotent_error_matching_is_containment() {
        let err = Error::remote("prefix AlreadyConnected suffix");
        assert!(is_idempotent_connect_error(&err, false));

        let err = Error::remote("prefix Operation aborted suffix");
        assert!(!is_idempotent_connect_error(&err, false));
        assert!(is_idempotent_connect_error(&err, true));

        assert!(!is_idempotent_connect_error(&Error::Cancelled, true));
    }

    #[test]
    fn test_connect_token_state_machine() {
        let token = ConnectToken::new();
        assert_eq!(token.state(), ConnectState::Active);

        token.cancel();
        assert_eq!(token.state(), ConnectState::CancelRequested);

        assert!(!token.finish());
        assert!(token.is_completed());

        // cancel after completion is a no-op
        token.cancel();
        assert!(token.is_completed());
    }
}
