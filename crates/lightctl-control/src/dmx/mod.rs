//! DMX output system
//!
//! The bridge talks to its output device through the [`DmxOutput`] trait:
//! enumerate devices, connect to one, then once per tick reset the frame,
//! set all 512 channels and commit.
//!
//! [`NetworkDmxOutput`] is the bundled implementation. Its "devices" are
//! configured Art-Net nodes and sACN (E1.31) universes.
//!
//! ## Art-Net
//!
//! Art-Net is a UDP broadcast protocol for DMX transmission over Ethernet.
//! - Uses UDP broadcast (255.255.255.255:6454) or unicast to a node
//! - Supports 32768 universes
//! - Includes sequence numbering
//!
//! ## sACN (E1.31)
//!
//! sACN (Streaming ACN) is a multicast protocol for DMX transmission.
//! - Uses IP multicast (239.255.x.x:5568)
//! - Supports 63999 universes
//! - Includes priority and synchronization
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use lightctl_control::dmx::{DmxNode, DmxOutput, NetworkDmxOutput};
//!
//! # fn main() -> lightctl_control::Result<()> {
//! let mut output = NetworkDmxOutput::new(vec![DmxNode::ArtNet {
//!     name: "Stage".to_string(),
//!     target: "255.255.255.255:6454".to_string(),
//!     universe: 0,
//! }]);
//!
//! output.connect("Stage")?;
//! output.reset_frame();
//! output.set_channel(1, 255);
//! output.commit_frame()?;
//! # Ok(())
//! # }
//! ```

pub mod artnet;
pub mod network;
pub mod sacn;
pub mod sync;

pub use artnet::ArtNetSender;
pub use network::{DmxNode, NetworkDmxOutput};
pub use sacn::SacnSender;
pub use sync::{scale_level, DmxSync};

use crate::store::DMX_CHANNELS;
use crate::Result;

/// A DMX output device
pub trait DmxOutput {
    /// Identifiers of the devices that can be connected to
    fn list_devices(&self) -> Vec<String>;
    /// Connect to a device returned by [`list_devices`](Self::list_devices)
    fn connect(&mut self, device: &str) -> Result<()>;
    fn disconnect(&mut self);
    fn is_connected(&self) -> bool;
    /// Identifier of the connected device
    fn connected_device(&self) -> Option<String>;
    /// Clear the pending frame
    fn reset_frame(&mut self);
    /// Set a 1-based channel in the pending frame
    fn set_channel(&mut self, channel: u16, value: u8);
    /// Level of a 1-based channel in the pending frame
    fn channel(&self, channel: u16) -> u8;
    /// Send the pending frame to the device
    fn commit_frame(&mut self) -> Result<()>;
    /// The pending frame, for visualisation
    fn frame(&self) -> &[u8; DMX_CHANNELS];
}

/// A single universe worth of channel levels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DmxFrame {
    data: [u8; DMX_CHANNELS],
}

impl Default for DmxFrame {
    fn default() -> Self {
        Self {
            data: [0u8; DMX_CHANNELS],
        }
    }
}

impl DmxFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.data = [0u8; DMX_CHANNELS];
    }

    /// Set a 1-based channel. Channels outside 1-512 are ignored.
    pub fn set(&mut self, channel: u16, value: u8) {
        let index = (channel as usize).wrapping_sub(1);
        if let Some(slot) = self.data.get_mut(index) {
            *slot = value;
        }
    }

    /// Level of a 1-based channel, 0 outside 1-512
    pub fn get(&self, channel: u16) -> u8 {
        let index = (channel as usize).wrapping_sub(1);
        self.data.get(index).copied().unwrap_or(0)
    }

    pub fn data(&self) -> &[u8; DMX_CHANNELS] {
        &self.data
    }
}
