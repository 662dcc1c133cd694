//! State transition engine
//!
//! Applies decoded `State`/`Online` changes to a [`Service`], with the
//! dual-stack disconnect suppression rule, dirty-category marking,
//! listener notification, Ethernet routing-policy side effects and the
//! P2P diagnostics subscription toggle.

use connmirror_core::prelude::*;
use connmirror_core::{category, ServiceState, Value};

use crate::remote::{PeerInventory, RoutingMutator, SubscriberSink, WifiTechnology};
use crate::service::Service;

/// Diagnostics subscription state, owned by the connectivity-technology
/// manager and passed by reference into every update.
#[derive(Debug, Default)]
pub struct DiagnosticsSubscription {
    subscribed: bool,
}

impl DiagnosticsSubscription {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }
}

/// Collaborators threaded through property decoding and state
/// transitions. Built fresh per dispatched event by the embedder.
pub struct UpdateContext<'a> {
    pub routing: &'a dyn RoutingMutator,
    pub technology: &'a dyn WifiTechnology,
    pub subscribers: &'a dyn SubscriberSink,
    pub peers: &'a dyn PeerInventory,
    pub diagnostics: &'a mut DiagnosticsSubscription,
    /// Added to the interface's numeric suffix to form the routing table id.
    pub route_table_offset: u32,
}

/// Routing table id for an interface name: numeric suffix after the
/// three-character prefix, plus the configured offset. `None` when the
/// name carries no parsable suffix.
fn route_table_id(interface: &str, offset: u32) -> Option<u32> {
    let suffix = interface.get(3..)?;
    let end = suffix.chars().take_while(char::is_ascii_digit).count();
    if end == 0 {
        return None;
    }
    suffix[..end].parse::<u32>().ok().map(|id| id + offset)
}

/// VLAN sub-interfaces (`eth0.100`) never get their own rules.
fn is_vlan(interface: &str) -> bool {
    interface.contains('.')
}

impl Service {
    /// Apply a pushed `State` value.
    ///
    /// While disconnecting on dual-stack IP the daemon bounces through
    /// `ready` before reaching `disconnect`; that bounce must not be
    /// reported. The first accepted non-ready/online state consumes the
    /// `disconnecting` flag without changing state or notifying.
    pub fn advance_state(&mut self, new_state: &str, ctx: &mut UpdateContext<'_>) {
        if self.disconnecting && new_state != "ready" && new_state != "online" {
            self.disconnecting = false;
            return;
        }

        let parsed = ServiceState::from_wire(new_state);

        if parsed != self.state {
            debug!(service = %self.path(), state = new_state, "service state changed");
            self.state = parsed;

            self.changes
                .set_changed(category::STATUS | category::FIND_NETWORKS);

            if let Some(listener) = self.listener.clone() {
                listener.on_property_changed(
                    self.path(),
                    "State",
                    &Value::String(new_state.to_string()),
                );
            }

            if self.is_ethernet() {
                if self.state == ServiceState::Ready {
                    if let Err(err) = self.fetch_ip_info() {
                        warn!(service = %self.path(), %err, "ip info refresh failed entering ready");
                    }
                    self.create_ip_rule(ctx);
                } else {
                    self.delete_ip_rule(ctx);
                }
            }
        }

        // Diagnostics side-channel: evaluated on every accepted push, the
        // subscription flag makes the toggle once-per-transition.
        if self.is_p2p() {
            if !ctx.diagnostics.subscribed
                && self.state == ServiceState::Ready
                && ctx.peers.has_connected_peer()
            {
                self.refresh_wifi_technology(ctx);
                ctx.diagnostics.subscribed = true;
            } else if ctx.diagnostics.subscribed
                && self.state == ServiceState::Disconnect
                && !ctx.peers.has_connected_peer()
            {
                self.refresh_wifi_technology(ctx);
                ctx.diagnostics.subscribed = false;
            }
        }
    }

    /// Apply a pushed `Online` value. Orthogonal to [`advance_state`].
    ///
    /// Without a registered listener, Ethernet services fall back to the
    /// direct subscriber broadcast so status consumers still hear about it.
    pub fn advance_online(&mut self, online: bool, ctx: &mut UpdateContext<'_>) {
        if self.online == online {
            return;
        }

        debug!(service = %self.path(), online, "service online changed");
        self.online = online;
        self.changes.set_changed(category::STATUS);

        if let Some(listener) = self.listener.clone() {
            listener.on_property_changed(self.path(), "Online", &Value::Bool(online));
        } else if self.is_ethernet() {
            ctx.subscribers.notify_subscribers();
        }
    }

    fn refresh_wifi_technology(&self, ctx: &UpdateContext<'_>) {
        match ctx.technology.find_wifi() {
            Some(handle) => {
                if let Err(err) = ctx.technology.update_properties(&handle) {
                    warn!(service = %self.path(), %err, "wifi technology refresh failed");
                }
            }
            None => warn!(service = %self.path(), "no wifi technology to refresh"),
        }
    }

    // ─────────────────────────────────────────────────────────
    // Routing Policy Rules
    // ─────────────────────────────────────────────────────────

    /// Install routing rules if the service is in ready state and they
    /// are not installed yet.
    pub(crate) fn create_ip_rule(&mut self, ctx: &UpdateContext<'_>) {
        if !self.iprule_added && self.state == ServiceState::Ready {
            self.set_ip_rule(ctx, true);
        }
    }

    pub(crate) fn delete_ip_rule(&mut self, ctx: &UpdateContext<'_>) {
        if self.iprule_added {
            self.set_ip_rule(ctx, false);
        }
    }

    fn set_ip_rule(&mut self, ctx: &UpdateContext<'_>, enable: bool) {
        let (Some(address), Some(_netmask), Some(gateway)) = (
            self.ip_info.ipv4.address.as_deref(),
            self.ip_info.ipv4.netmask.as_deref(),
            self.ip_info.ipv4.gateway.as_deref(),
        ) else {
            return;
        };

        let Some(interface) = self.interface_name.as_deref() else {
            return;
        };

        if is_vlan(interface) {
            return;
        }

        let Some(table_id) = route_table_id(interface, ctx.route_table_offset) else {
            return;
        };

        let prefix_len = self.ip_info.ipv4.prefix_len.unwrap_or(0);

        debug!(
            service = %self.path(),
            interface,
            table_id,
            enable,
            "updating routing policy rules"
        );

        if enable {
            ctx.routing.add_rule(table_id, address, prefix_len, gateway);
        } else {
            ctx.routing
                .delete_rule(table_id, address, prefix_len, gateway);
        }

        self.iprule_added = enable;
    }
}
