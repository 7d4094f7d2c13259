//! mDNS-backed service registry

use mdns_sd::{Receiver, ServiceDaemon, ServiceEvent, ServiceInfo};
use std::collections::{HashMap, HashSet};

use super::{DiscoveredPeer, DiscoveryEvent, ServiceHandle, ServiceRegistry, SERVICE_TYPE};
use crate::{error::ControlError, Result};

/// Browse results kept between ticks.
///
/// The daemon resolves every service it browses, whether asked to or not.
/// Only names passed to [`request`](Self::request) are reported as
/// resolved, once when first known and again whenever their port changes.
#[derive(Debug, Default)]
struct PeerCache {
    /// Names asked for through `resolve`
    requested: HashSet<String>,
    /// Services currently on the network, by full name
    resolved: HashMap<String, DiscoveredPeer>,
    queued: Vec<DiscoveryEvent>,
}

impl PeerCache {
    fn request(&mut self, name: &str) {
        self.requested.insert(name.to_string());
        if let Some(peer) = self.resolved.get(name) {
            self.queued.push(DiscoveryEvent::Resolved(peer.clone()));
        }
    }

    fn handle(&mut self, event: ServiceEvent) {
        match event {
            ServiceEvent::ServiceFound(_, fullname) => {
                self.queued.push(DiscoveryEvent::Found { name: fullname });
            }
            ServiceEvent::ServiceResolved(info) => self.on_resolved(&info),
            ServiceEvent::ServiceRemoved(_, fullname) => {
                if self.resolved.remove(&fullname).is_some() {
                    tracing::debug!("Peer '{}' left the network", fullname);
                }
            }
            _ => {}
        }
    }

    fn on_resolved(&mut self, info: &ServiceInfo) {
        let peer = DiscoveredPeer {
            name: info.get_fullname().to_string(),
            host: info.get_hostname().to_string(),
            port: info.get_port(),
        };

        let port_changed = self
            .resolved
            .get(&peer.name)
            .map_or(true, |known| known.port != peer.port);
        if port_changed && self.requested.contains(&peer.name) {
            self.queued.push(DiscoveryEvent::Resolved(peer.clone()));
        }
        self.resolved.insert(peer.name.clone(), peer);
    }

    fn drain(&mut self) -> Vec<DiscoveryEvent> {
        std::mem::take(&mut self.queued)
    }
}

/// [`ServiceRegistry`] running on an `mdns-sd` daemon thread
pub struct MdnsRegistry {
    daemon: ServiceDaemon,
    browse: Option<Receiver<ServiceEvent>>,
    peers: PeerCache,
}

impl MdnsRegistry {
    pub fn new() -> Result<Self> {
        let daemon = ServiceDaemon::new().map_err(discovery_error)?;
        Ok(Self {
            daemon,
            browse: None,
            peers: PeerCache::default(),
        })
    }
}

impl ServiceRegistry for MdnsRegistry {
    fn register(&mut self, name: &str, port: u16) -> Result<ServiceHandle> {
        let host_name = format!("light-control-{}.local.", port);
        let info = ServiceInfo::new(
            SERVICE_TYPE,
            name,
            &host_name,
            "",
            port,
            HashMap::<String, String>::new(),
        )
        .map_err(discovery_error)?
        .enable_addr_auto();

        let handle = ServiceHandle(info.get_fullname().to_string());
        self.daemon.register(info).map_err(discovery_error)?;
        Ok(handle)
    }

    fn unregister(&mut self, handle: &ServiceHandle) -> Result<()> {
        self.daemon
            .unregister(&handle.0)
            .map(|_| ())
            .map_err(discovery_error)
    }

    fn browse(&mut self) -> Result<()> {
        let receiver = self.daemon.browse(SERVICE_TYPE).map_err(discovery_error)?;
        self.browse = Some(receiver);
        Ok(())
    }

    fn resolve(&mut self, name: &str) -> Result<()> {
        self.peers.request(name);
        Ok(())
    }

    fn poll_events(&mut self) -> Vec<DiscoveryEvent> {
        if let Some(receiver) = &self.browse {
            while let Ok(event) = receiver.try_recv() {
                self.peers.handle(event);
            }
        }
        self.peers.drain()
    }

    fn shutdown(&mut self) {
        if self.browse.take().is_some() {
            if let Err(e) = self.daemon.stop_browse(SERVICE_TYPE) {
                tracing::warn!("Failed to stop browsing: {}", e);
            }
        }
        if let Err(e) = self.daemon.shutdown() {
            tracing::warn!("Failed to shut down mDNS daemon: {}", e);
        }
    }
}

fn discovery_error(err: mdns_sd::Error) -> ControlError {
    ControlError::DiscoveryError(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PANEL: &str = "TouchOSC Bridge";

    fn fullname() -> String {
        format!("{}.{}", PANEL, SERVICE_TYPE)
    }

    fn resolved(port: u16) -> ServiceEvent {
        let info = ServiceInfo::new(
            SERVICE_TYPE,
            PANEL,
            "ipad.local.",
            "192.168.1.20",
            port,
            HashMap::<String, String>::new(),
        )
        .unwrap();
        ServiceEvent::ServiceResolved(info)
    }

    fn resolved_ports(events: &[DiscoveryEvent]) -> Vec<u16> {
        events
            .iter()
            .filter_map(|event| match event {
                DiscoveryEvent::Resolved(peer) => Some(peer.port),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_found_is_reported() {
        let mut peers = PeerCache::default();
        peers.handle(ServiceEvent::ServiceFound(
            SERVICE_TYPE.to_string(),
            fullname(),
        ));

        assert_eq!(peers.drain(), vec![DiscoveryEvent::Found { name: fullname() }]);
        assert!(peers.drain().is_empty());
    }

    #[test]
    fn test_unrequested_services_stay_silent() {
        let mut peers = PeerCache::default();
        peers.handle(resolved(9000));

        assert!(peers.drain().is_empty());
    }

    #[test]
    fn test_request_served_from_cache() {
        let mut peers = PeerCache::default();
        peers.handle(resolved(9000));

        peers.request(&fullname());

        let events = peers.drain();
        assert_eq!(resolved_ports(&events), vec![9000]);
        let DiscoveryEvent::Resolved(peer) = &events[0] else {
            panic!("Expected a resolved peer");
        };
        assert_eq!(peer.name, fullname());
        assert_eq!(peer.host, "ipad.local.");
    }

    #[test]
    fn test_request_waits_for_resolution() {
        let mut peers = PeerCache::default();
        peers.request(&fullname());
        assert!(peers.drain().is_empty());

        peers.handle(resolved(9000));
        assert_eq!(resolved_ports(&peers.drain()), vec![9000]);
    }

    #[test]
    fn test_port_change_is_reported() {
        let mut peers = PeerCache::default();
        peers.handle(resolved(9000));
        peers.request(&fullname());
        assert_eq!(resolved_ports(&peers.drain()), vec![9000]);

        peers.handle(resolved(9100));
        assert_eq!(resolved_ports(&peers.drain()), vec![9100]);

        // Same port again is not news
        peers.handle(resolved(9100));
        assert!(peers.drain().is_empty());
    }

    #[test]
    fn test_removed_service_is_forgotten() {
        let mut peers = PeerCache::default();
        peers.handle(resolved(9000));
        peers.request(&fullname());
        peers.drain();

        peers.handle(ServiceEvent::ServiceRemoved(
            SERVICE_TYPE.to_string(),
            fullname(),
        ));
        peers.request(&fullname());
        assert!(peers.drain().is_empty());

        // Coming back on the same port is reported again
        peers.handle(resolved(9000));
        assert_eq!(resolved_ports(&peers.drain()), vec![9000]);
    }
}
