//! Test utilities for daemon types
//!
//! Fake collaborators with call recording, plus a [`Harness`] that
//! bundles everything an [`UpdateContext`] needs.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::future::BoxFuture;
use tokio::sync::oneshot;

use connmirror_core::error::{Error, Result};
use connmirror_core::{P2pRequest, PropertyBag, Value};

use crate::remote::{
    PeerInventory, RemoteService, RoutingMutator, ServiceListener, SsidCodec, SubscriberSink,
    TechnologyHandle, WifiTechnology,
};
use crate::service::Service;
use crate::state::{DiagnosticsSubscription, UpdateContext};

// ─────────────────────────────────────────────────────────
// Fake Remote
// ─────────────────────────────────────────────────────────

/// Scriptable remote proxy: connect results can be queued and gated,
/// synchronous calls recorded and failed on demand.
#[derive(Default)]
pub struct FakeRemote {
    connect_results: Mutex<VecDeque<std::result::Result<(), String>>>,
    connect_gates: Mutex<VecDeque<oneshot::Receiver<()>>>,
    sync_calls: Mutex<Vec<&'static str>>,
    set_calls: Mutex<Vec<(String, Value)>>,
    sync_error: Mutex<Option<String>>,
    snapshot: Mutex<PropertyBag>,
}

impl FakeRemote {
    /// Queue the outcome of the next connect. Defaults to success.
    pub fn queue_connect_result(&self, result: std::result::Result<(), String>) {
        self.connect_results.lock().unwrap().push_back(result);
    }

    /// Hold the next connect until the returned sender fires.
    pub fn gate_next_connect(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.connect_gates.lock().unwrap().push_back(rx);
        tx
    }

    /// Make every synchronous call fail with the given message.
    pub fn fail_sync(&self, message: &str) {
        *self.sync_error.lock().unwrap() = Some(message.to_string());
    }

    /// Snapshot returned by `get_properties`.
    pub fn set_snapshot(&self, bag: PropertyBag) {
        *self.snapshot.lock().unwrap() = bag;
    }

    pub fn sync_calls(&self) -> Vec<&'static str> {
        self.sync_calls.lock().unwrap().clone()
    }

    pub fn set_calls(&self) -> Vec<(String, Value)> {
        self.set_calls.lock().unwrap().clone()
    }

    fn record(&self, op: &'static str) -> Result<()> {
        self.sync_calls.lock().unwrap().push(op);
        match self.sync_error.lock().unwrap().as_ref() {
            Some(message) => Err(Error::remote(message.clone())),
            None => Ok(()),
        }
    }
}

impl RemoteService for FakeRemote {
    fn connect(&self) -> BoxFuture<'static, Result<()>> {
        let gate = self.connect_gates.lock().unwrap().pop_front();
        let result = self
            .connect_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()));

        Box::pin(async move {
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            result.map_err(Error::remote)
        })
    }

    fn disconnect(&self) -> Result<()> {
        self.record("disconnect")
    }

    fn remove(&self) -> Result<()> {
        self.record("remove")
    }

    fn reject_peer(&self) -> Result<()> {
        self.record("reject_peer")
    }

    fn set_default(&self) -> Result<()> {
        self.record("set_default")
    }

    fn set_property(&self, name: &str, value: &Value) -> Result<()> {
        self.set_calls
            .lock()
            .unwrap()
            .push((name.to_string(), value.clone()));
        match self.sync_error.lock().unwrap().as_ref() {
            Some(message) => Err(Error::remote(message.clone())),
            None => Ok(()),
        }
    }

    fn get_properties(&self) -> Result<PropertyBag> {
        match self.sync_error.lock().unwrap().as_ref() {
            Some(message) => Err(Error::remote(message.clone())),
            None => Ok(self.snapshot.lock().unwrap().clone()),
        }
    }
}

// ─────────────────────────────────────────────────────────
// Fake Collaborators
// ─────────────────────────────────────────────────────────

/// One installed or removed routing rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRule {
    pub table_id: u32,
    pub address: String,
    pub prefix_len: u8,
    pub gateway: String,
}

#[derive(Default)]
pub struct FakeRouting {
    added: Mutex<Vec<RouteRule>>,
    deleted: Mutex<Vec<RouteRule>>,
}

impl FakeRouting {
    pub fn added(&self) -> Vec<RouteRule> {
        self.added.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<RouteRule> {
        self.deleted.lock().unwrap().clone()
    }
}

impl RoutingMutator for FakeRouting {
    fn add_rule(&self, table_id: u32, address: &str, prefix_len: u8, gateway: &str) {
        self.added.lock().unwrap().push(RouteRule {
            table_id,
            address: address.to_string(),
            prefix_len,
            gateway: gateway.to_string(),
        });
    }

    fn delete_rule(&self, table_id: u32, address: &str, prefix_len: u8, gateway: &str) {
        self.deleted.lock().unwrap().push(RouteRule {
            table_id,
            address: address.to_string(),
            prefix_len,
            gateway: gateway.to_string(),
        });
    }
}

pub struct FakeTechnology {
    wifi_present: AtomicBool,
    refreshes: AtomicUsize,
}

impl Default for FakeTechnology {
    fn default() -> Self {
        Self {
            wifi_present: AtomicBool::new(true),
            refreshes: AtomicUsize::new(0),
        }
    }
}

impl FakeTechnology {
    pub fn set_wifi_present(&self, present: bool) {
        self.wifi_present.store(present, Ordering::SeqCst);
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

impl WifiTechnology for FakeTechnology {
    fn find_wifi(&self) -> Option<TechnologyHandle> {
        self.wifi_present.load(Ordering::SeqCst).then(|| TechnologyHandle {
            path: "/net/mirror/technology/wifi".to_string(),
        })
    }

    fn update_properties(&self, _handle: &TechnologyHandle) -> Result<()> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeSink {
    notifications: AtomicUsize,
}

impl FakeSink {
    pub fn count(&self) -> usize {
        self.notifications.load(Ordering::SeqCst)
    }
}

impl SubscriberSink for FakeSink {
    fn notify_subscribers(&self) {
        self.notifications.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct FakePeers {
    connected: AtomicBool,
}

impl FakePeers {
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }
}

impl PeerInventory for FakePeers {
    fn has_connected_peer(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

pub struct FakeCodec {
    locale: String,
    conversions: AtomicUsize,
}

impl Default for FakeCodec {
    fn default() -> Self {
        Self::with_locale("en_US")
    }
}

impl FakeCodec {
    pub fn with_locale(locale: &str) -> Self {
        Self {
            locale: locale.to_string(),
            conversions: AtomicUsize::new(0),
        }
    }

    /// Number of non-UTF-8 conversions performed.
    pub fn conversions(&self) -> usize {
        self.conversions.load(Ordering::SeqCst)
    }
}

impl SsidCodec for FakeCodec {
    fn current_locale(&self) -> String {
        self.locale.clone()
    }

    fn to_utf8(&self, ssid: &[u8], _locale: &str) -> String {
        self.conversions.fetch_add(1, Ordering::SeqCst);
        String::from_utf8_lossy(ssid).into_owned()
    }
}

/// Listener recording every notification it receives.
#[derive(Default)]
pub struct RecordingListener {
    changes: Mutex<Vec<(String, Value)>>,
    p2p: Mutex<Vec<P2pRequest>>,
}

impl RecordingListener {
    pub fn changes(&self) -> Vec<(String, Value)> {
        self.changes.lock().unwrap().clone()
    }

    pub fn change_count(&self) -> usize {
        self.changes.lock().unwrap().len()
    }

    pub fn p2p_requests(&self) -> Vec<P2pRequest> {
        self.p2p.lock().unwrap().clone()
    }
}

impl ServiceListener for RecordingListener {
    fn on_property_changed(&self, _service_path: &str, name: &str, value: &Value) {
        self.changes
            .lock()
            .unwrap()
            .push((name.to_string(), value.clone()));
    }

    fn on_p2p_request(&self, _service_path: &str, request: &P2pRequest) {
        self.p2p.lock().unwrap().push(request.clone());
    }
}

// ─────────────────────────────────────────────────────────
// Harness
// ─────────────────────────────────────────────────────────

/// Bundles the fake collaborators behind one [`UpdateContext`].
pub struct Harness {
    pub remote: Arc<FakeRemote>,
    pub codec: Arc<FakeCodec>,
    pub routing: FakeRouting,
    pub technology: FakeTechnology,
    pub subscribers: FakeSink,
    pub peers: FakePeers,
    pub diagnostics: DiagnosticsSubscription,
    pub route_table_offset: u32,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    pub fn new() -> Self {
        Self {
            remote: Arc::new(FakeRemote::default()),
            codec: Arc::new(FakeCodec::default()),
            routing: FakeRouting::default(),
            technology: FakeTechnology::default(),
            subscribers: FakeSink::default(),
            peers: FakePeers::default(),
            diagnostics: DiagnosticsSubscription::new(),
            route_table_offset: 10,
        }
    }

    /// A context borrowing this harness's collaborators.
    pub fn ctx(&mut self) -> UpdateContext<'_> {
        UpdateContext {
            routing: &self.routing,
            technology: &self.technology,
            subscribers: &self.subscribers,
            peers: &self.peers,
            diagnostics: &mut self.diagnostics,
            route_table_offset: self.route_table_offset,
        }
    }

    /// A service bound to this harness's remote and codec.
    pub fn service(&self, path: &str) -> Service {
        Service::new(path, self.remote.clone(), self.codec.clone())
    }

    /// The remote/codec pair for registry construction.
    pub fn bindings(&self) -> (Arc<FakeRemote>, Arc<FakeCodec>) {
        (self.remote.clone(), self.codec.clone())
    }
}

/// A standalone service with default fakes, for tests that never touch
/// the collaborators behind it.
pub fn test_service(path: &str) -> Service {
    Service::new(
        path,
        Arc::new(FakeRemote::default()),
        Arc::new(FakeCodec::default()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_remote_default_connect_succeeds() {
        let remote = FakeRemote::default();
        assert!(remote.connect().await.is_ok());
    }

    #[tokio::test]
    async fn test_fake_remote_queued_error() {
        let remote = FakeRemote::default();
        remote.queue_connect_result(Err("boom".into()));
        assert!(remote.connect().await.is_err());
        // queue drained; next connect succeeds again
        assert!(remote.connect().await.is_ok());
    }

    #[test]
    fn test_fake_remote_records_sync_calls() {
        let remote = FakeRemote::default();
        remote.disconnect().unwrap();
        remote.set_default().unwrap();
        assert_eq!(remote.sync_calls(), vec!["disconnect", "set_default"]);
    }

    #[test]
    fn test_harness_ctx_borrows() {
        let mut harness = Harness::new();
        let ctx = harness.ctx();
        assert_eq!(ctx.route_table_offset, 10);
        assert!(!ctx.peers.has_connected_peer());
    }
}
