//! DMX output over Art-Net or sACN
//!
//! Each configured [`DmxNode`] shows up as one device in
//! [`DmxOutput::list_devices`].

use serde::{Deserialize, Serialize};

use super::{ArtNetSender, DmxFrame, DmxOutput, SacnSender};
use crate::store::DMX_CHANNELS;
use crate::{error::ControlError, Result};

/// A network destination for one DMX universe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "protocol", rename_all = "lowercase")]
pub enum DmxNode {
    /// Art-Net node or broadcast address
    ArtNet {
        name: String,
        target: String,
        #[serde(default)]
        universe: u16,
    },
    /// sACN multicast universe
    Sacn { name: String, universe: u16 },
}

impl DmxNode {
    /// Device identifier
    pub fn name(&self) -> &str {
        match self {
            DmxNode::ArtNet { name, .. } | DmxNode::Sacn { name, .. } => name,
        }
    }
}

enum Transport {
    ArtNet(ArtNetSender),
    Sacn(SacnSender),
}

impl Transport {
    fn open(node: &DmxNode, source_name: &str, refresh_rate: u32) -> Result<Self> {
        match node {
            DmxNode::ArtNet {
                target, universe, ..
            } => {
                let mut sender = ArtNetSender::new(*universe, target)?;
                sender.set_refresh_rate(refresh_rate);
                Ok(Transport::ArtNet(sender))
            }
            DmxNode::Sacn { universe, .. } => {
                let mut sender = SacnSender::new(*universe, source_name)?;
                sender.set_refresh_rate(refresh_rate);
                Ok(Transport::Sacn(sender))
            }
        }
    }

    fn send(&mut self, frame: &[u8; DMX_CHANNELS]) -> Result<()> {
        match self {
            Transport::ArtNet(sender) => sender.send_dmx(frame),
            Transport::Sacn(sender) => sender.send_dmx(frame),
        }
    }
}

/// [`DmxOutput`] sending frames to Art-Net nodes or sACN universes
pub struct NetworkDmxOutput {
    nodes: Vec<DmxNode>,
    connected: Option<(String, Transport)>,
    frame: DmxFrame,
    refresh_rate: u32,
    source_name: String,
}

impl NetworkDmxOutput {
    pub fn new(nodes: Vec<DmxNode>) -> Self {
        Self {
            nodes,
            connected: None,
            frame: DmxFrame::new(),
            refresh_rate: 30,
            source_name: "Light Control".to_string(),
        }
    }

    /// Maximum frames per second sent to a device
    pub fn with_refresh_rate(mut self, hz: u32) -> Self {
        self.refresh_rate = hz.max(1);
        self
    }

    /// Source name announced in sACN packets
    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = name.into();
        self
    }

    /// Replace the device list. A connected device that is no longer
    /// listed is disconnected.
    pub fn set_nodes(&mut self, nodes: Vec<DmxNode>) {
        self.nodes = nodes;
        let still_listed = self
            .connected
            .as_ref()
            .map_or(true, |(name, _)| self.nodes.iter().any(|n| n.name() == name));
        if !still_listed {
            self.disconnect();
        }
    }
}

impl DmxOutput for NetworkDmxOutput {
    fn list_devices(&self) -> Vec<String> {
        self.nodes.iter().map(|n| n.name().to_string()).collect()
    }

    fn connect(&mut self, device: &str) -> Result<()> {
        let node = self
            .nodes
            .iter()
            .find(|n| n.name() == device)
            .ok_or_else(|| ControlError::DmxError(format!("Unknown DMX device: {}", device)))?;

        let transport = Transport::open(node, &self.source_name, self.refresh_rate)?;
        tracing::info!("Connected to DMX device '{}'", device);
        self.connected = Some((device.to_string(), transport));
        Ok(())
    }

    fn disconnect(&mut self) {
        if let Some((name, _)) = self.connected.take() {
            tracing::info!("Disconnected from DMX device '{}'", name);
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.is_some()
    }

    fn connected_device(&self) -> Option<String> {
        self.connected.as_ref().map(|(name, _)| name.clone())
    }

    fn reset_frame(&mut self) {
        self.frame.reset();
    }

    fn set_channel(&mut self, channel: u16, value: u8) {
        self.frame.set(channel, value);
    }

    fn channel(&self, channel: u16) -> u8 {
        self.frame.get(channel)
    }

    fn commit_frame(&mut self) -> Result<()> {
        match &mut self.connected {
            Some((_, transport)) => transport.send(self.frame.data()),
            None => Ok(()),
        }
    }

    fn frame(&self) -> &[u8; DMX_CHANNELS] {
        self.frame.data()
    }
}
