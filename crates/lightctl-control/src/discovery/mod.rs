//! Service discovery binding
//!
//! Advertises the OSC listener as an `_osc._udp` service so controllers can
//! find it, and browses for controllers whose service name carries a marker.
//! Only the port of a resolved controller is adopted; its address is learned
//! from the source of inbound OSC packets instead.

#[cfg(feature = "mdns")]
mod mdns;

#[cfg(feature = "mdns")]
pub use mdns::MdnsRegistry;

use crate::Result;

/// DNS-SD service type advertised and browsed
pub const SERVICE_TYPE: &str = "_osc._udp.local.";
/// Substring a peer's service name must contain to be resolved
pub const DEFAULT_PEER_MARKER: &str = "TouchOSC";

/// Human readable service name for a receive port
pub fn service_name(port: u16) -> String {
    format!("Light Control  - {}", port)
}

/// Opaque handle of a registered service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceHandle(pub String);

/// A resolved peer service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredPeer {
    pub name: String,
    pub host: String,
    pub port: u16,
}

/// Events reported by a [`ServiceRegistry`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryEvent {
    /// A service of our type appeared on the network
    Found { name: String },
    /// A service requested through [`ServiceRegistry::resolve`] was resolved
    Resolved(DiscoveredPeer),
    /// Registration or browsing failed asynchronously
    Error(String),
}

/// DNS-SD responder/browser used by [`DiscoveryBinding`]
pub trait ServiceRegistry {
    /// Register a service of [`SERVICE_TYPE`] on `port`
    fn register(&mut self, name: &str, port: u16) -> Result<ServiceHandle>;
    /// Remove a previous registration
    fn unregister(&mut self, handle: &ServiceHandle) -> Result<()>;
    /// Start browsing for services of [`SERVICE_TYPE`]
    fn browse(&mut self) -> Result<()>;
    /// Ask for a found service to be resolved
    fn resolve(&mut self, name: &str) -> Result<()>;
    /// Drain pending events without blocking
    fn poll_events(&mut self) -> Vec<DiscoveryEvent>;
    /// Stop browsing and release the responder
    fn shutdown(&mut self);
}

/// Registry that does nothing, for running without service discovery
#[derive(Debug, Default)]
pub struct NullRegistry;

impl ServiceRegistry for NullRegistry {
    fn register(&mut self, name: &str, _port: u16) -> Result<ServiceHandle> {
        Ok(ServiceHandle(name.to_string()))
    }

    fn unregister(&mut self, _handle: &ServiceHandle) -> Result<()> {
        Ok(())
    }

    fn browse(&mut self) -> Result<()> {
        Ok(())
    }

    fn resolve(&mut self, _name: &str) -> Result<()> {
        Ok(())
    }

    fn poll_events(&mut self) -> Vec<DiscoveryEvent> {
        Vec::new()
    }

    fn shutdown(&mut self) {}
}

/// Keeps the local advertisement in step with the OSC configuration and
/// turns browse results into send-port updates
pub struct DiscoveryBinding {
    registry: Box<dyn ServiceRegistry>,
    handle: Option<ServiceHandle>,
    peer_marker: String,
}

impl DiscoveryBinding {
    pub fn new(registry: Box<dyn ServiceRegistry>, peer_marker: impl Into<String>) -> Self {
        Self {
            registry,
            handle: None,
            peer_marker: peer_marker.into(),
        }
    }

    /// Replace any previous advertisement with one for `port`
    pub fn advertise(&mut self, port: u16) {
        self.withdraw();

        let name = service_name(port);
        match self.registry.register(&name, port) {
            Ok(handle) => {
                tracing::info!("Advertising '{}' on port {}", name, port);
                self.handle = Some(handle);
            }
            Err(e) => tracing::error!("Failed to advertise '{}': {}", name, e),
        }
    }

    fn withdraw(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = self.registry.unregister(&handle) {
                tracing::warn!("Failed to unregister '{}': {}", handle.0, e);
            }
        }
    }

    /// Whether a registration is currently held
    pub fn is_advertised(&self) -> bool {
        self.handle.is_some()
    }

    /// Start browsing for peers
    pub fn browse(&mut self) {
        match self.registry.browse() {
            Ok(()) => tracing::info!(
                "Browsing for {} peers matching '{}'",
                SERVICE_TYPE,
                self.peer_marker
            ),
            Err(e) => tracing::error!("Failed to browse for peers: {}", e),
        }
    }

    /// Process pending registry events. Returns the send port adopted from
    /// the last resolved peer, if any.
    pub fn poll(&mut self) -> Option<u16> {
        let mut adopted = None;

        for event in self.registry.poll_events() {
            match event {
                DiscoveryEvent::Found { name } => self.on_peer_found(&name),
                DiscoveryEvent::Resolved(peer) => {
                    if let Some(port) = self.on_peer_resolved(&peer) {
                        adopted = Some(port);
                    }
                }
                DiscoveryEvent::Error(message) => {
                    tracing::error!("Service discovery error: {}", message);
                }
            }
        }

        adopted
    }

    /// Request resolution of a found peer if its name carries the marker
    pub fn on_peer_found(&mut self, name: &str) {
        if !self.matches(name) {
            tracing::trace!("Ignoring service '{}'", name);
            return;
        }

        tracing::debug!("Resolving peer '{}'", name);
        if let Err(e) = self.registry.resolve(name) {
            tracing::warn!("Failed to resolve '{}': {}", name, e);
        }
    }

    /// Port to send to for a resolved peer. The peer host is not adopted.
    pub fn on_peer_resolved(&self, peer: &DiscoveredPeer) -> Option<u16> {
        if !self.matches(&peer.name) {
            return None;
        }

        tracing::info!(
            "Resolved peer '{}' at {}:{}",
            peer.name,
            peer.host,
            peer.port
        );
        Some(peer.port)
    }

    fn matches(&self, name: &str) -> bool {
        name.contains(&self.peer_marker)
    }

    /// Unregister and stop the registry
    pub fn shutdown(&mut self) {
        self.withdraw();
        self.registry.shutdown();
    }
}
