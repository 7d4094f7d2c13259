//! The light control context
//!
//! [`LightControl`] owns the channel store, the OSC link, the discovery
//! binding and the DMX output, and is driven by calling
//! [`update`](LightControl::update) once per tick from a single thread.
//! OSC messages drained at the start of a tick are visible to the DMX
//! frame sent at the end of the same tick.

use crate::discovery::{DiscoveryBinding, ServiceRegistry, DEFAULT_PEER_MARKER};
use crate::dmx::{DmxOutput, DmxSync};
use crate::osc::{config::parse_ipv4, OscEndpointConfig, OscLink};
use crate::store::ChannelStore;
use crate::Result;

/// Options for building a [`LightControl`]
#[derive(Debug, Clone)]
pub struct LightControlOptions {
    pub osc: OscEndpointConfig,
    /// Browse for controller services and adopt their port
    pub browse_peers: bool,
    /// Substring a controller service name must contain
    pub peer_marker: String,
}

impl Default for LightControlOptions {
    fn default() -> Self {
        Self {
            osc: OscEndpointConfig::default(),
            browse_peers: true,
            peer_marker: DEFAULT_PEER_MARKER.to_string(),
        }
    }
}

/// The bridge between the OSC controller and the DMX output
pub struct LightControl {
    store: ChannelStore,
    link: OscLink,
    discovery: DiscoveryBinding,
    sync: DmxSync,
    output: Box<dyn DmxOutput>,
    shut_down: bool,
}

impl LightControl {
    /// Build the context and bring up the OSC link.
    ///
    /// Failing to bring up the link is logged, not returned; the link can be
    /// fixed later through any of the configuration setters.
    pub fn new(
        options: LightControlOptions,
        output: Box<dyn DmxOutput>,
        registry: Box<dyn ServiceRegistry>,
    ) -> Self {
        let mut control = Self {
            store: ChannelStore::new(),
            link: OscLink::new(),
            discovery: DiscoveryBinding::new(registry, options.peer_marker),
            sync: DmxSync::new(),
            output,
            shut_down: false,
        };

        if let Err(e) = control.reconfigure(options.osc) {
            tracing::error!("OSC setup failed: {}", e);
        }
        if options.browse_peers {
            control.discovery.browse();
        }

        control
    }

    /// Rebuild the OSC link and the advertisement for `config`.
    ///
    /// An invalid unicast address is rejected up front and the running link
    /// is left untouched. Otherwise the old link is fully torn down first and
    /// the controller is sent a snapshot of every fader once the new sender
    /// is up.
    pub fn reconfigure(&mut self, config: OscEndpointConfig) -> Result<()> {
        config.validate()?;

        let receive_port = config.receive_port;
        let result = self.link.configure(config);
        self.discovery.advertise(receive_port);
        result?;

        self.link.broadcast_snapshot(&self.store)
    }

    /// Active OSC configuration
    pub fn config(&self) -> &OscEndpointConfig {
        self.link.config()
    }

    pub fn set_receive_port(&mut self, port: u16) -> Result<()> {
        self.update_config(|config| config.receive_port = port)
    }

    pub fn set_send_port(&mut self, port: u16) -> Result<()> {
        self.update_config(|config| config.send_port = port)
    }

    pub fn set_unicast(&mut self, unicast: bool) -> Result<()> {
        self.update_config(|config| config.unicast = unicast)
    }

    /// Change the unicast target. Strings that are not dotted-quad IPv4
    /// addresses are rejected and the running configuration is kept.
    pub fn set_send_address(&mut self, address: &str) -> Result<()> {
        let address = parse_ipv4(address)?.to_string();
        self.update_config(|config| config.send_address = address)
    }

    fn update_config(&mut self, change: impl FnOnce(&mut OscEndpointConfig)) -> Result<()> {
        let mut config = self.link.config().clone();
        change(&mut config);
        // Unchanged settings still retry an endpoint that failed to come up
        if &config == self.link.config()
            && self.link.can_send()
            && self.link.is_listening()
        {
            return Ok(());
        }
        self.reconfigure(config)
    }

    /// One tick: drain OSC, handle discovery events, push the DMX frame
    pub fn update(&mut self) {
        self.link.poll(&mut self.store);

        if let Some(port) = self.discovery.poll() {
            if port != self.link.config().send_port {
                tracing::info!("Adopting discovered send port {}", port);
                if let Err(e) = self.set_send_port(port) {
                    tracing::error!("Failed to apply discovered send port: {}", e);
                }
            }
        }

        self.sync.step(&self.store, self.output.as_mut());
    }

    /// Send the master volume to the controller
    pub fn send_volume(&self) -> Result<()> {
        self.link.send_volume(self.store.volume())
    }

    pub fn store(&self) -> &ChannelStore {
        &self.store
    }

    pub fn link(&self) -> &OscLink {
        &self.link
    }

    pub fn output(&self) -> &dyn DmxOutput {
        self.output.as_ref()
    }

    /// Devices the output can connect to
    pub fn devices(&self) -> Vec<String> {
        self.output.list_devices()
    }

    /// Connect to a device chosen by the user. Auto-connect never fires
    /// after this.
    pub fn connect_device(&mut self, device: &str) -> Result<()> {
        self.sync.disarm_auto_connect();
        self.output.connect(device)
    }

    pub fn disconnect_device(&mut self) {
        self.output.disconnect();
    }

    /// Release the OSC receiver and sender, withdraw the advertisement and
    /// stop discovery, then disconnect the DMX device. Runs once; also
    /// called on drop.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        tracing::info!("Shutting down light control");
        self.link.close();
        self.discovery.shutdown();
        self.output.disconnect();
    }
}

impl Drop for LightControl {
    fn drop(&mut self) {
        self.shutdown();
    }
}
