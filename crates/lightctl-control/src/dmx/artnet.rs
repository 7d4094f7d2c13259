//! Art-Net protocol implementation (Art-Net 4)
//!
//! Art-Net is a UDP-based protocol for transmitting DMX512 over Ethernet.

use std::net::{SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

use crate::store::DMX_CHANNELS;
use crate::{error::ControlError, Result};

/// Default Art-Net UDP port
pub const ARTNET_PORT: u16 = 6454;

/// Art-Net sender for outputting DMX data
pub struct ArtNetSender {
    socket: UdpSocket,
    target: SocketAddr,
    universe: u16,
    sequence: u8,
    last_send: Option<Instant>,
    min_interval: Duration,
}

impl ArtNetSender {
    /// Create a new Art-Net sender
    ///
    /// # Arguments
    /// * `universe` - Art-Net universe (0-32767)
    /// * `target` - Node or broadcast address (typically "255.255.255.255:6454")
    pub fn new(universe: u16, target: &str) -> Result<Self> {
        if universe > 0x7FFF {
            return Err(ControlError::DmxError(format!(
                "Invalid Art-Net universe: {} (must be 0-32767)",
                universe
            )));
        }

        let target: SocketAddr = target.parse().map_err(|e| {
            ControlError::DmxError(format!("Invalid Art-Net target address: {}", e))
        })?;

        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_broadcast(true)?;

        tracing::info!("Art-Net sender created for universe {} -> {}", universe, target);

        Ok(Self {
            socket,
            target,
            universe,
            sequence: 0,
            last_send: None,
            min_interval: Duration::from_millis(1000 / 30), // 30Hz refresh rate
        })
    }

    /// Send DMX data via Art-Net. Frames arriving faster than the refresh
    /// rate are skipped.
    pub fn send_dmx(&mut self, channels: &[u8; DMX_CHANNELS]) -> Result<()> {
        let now = Instant::now();
        if let Some(last_send) = self.last_send {
            if now.duration_since(last_send) < self.min_interval {
                return Ok(());
            }
        }

        let packet = self.build_artnet_packet(channels);

        self.socket.send_to(&packet, self.target)?;
        self.sequence = self.sequence.wrapping_add(1);
        self.last_send = Some(now);

        tracing::trace!("Sent Art-Net DMX packet for universe {}", self.universe);

        Ok(())
    }

    /// Build an Art-Net DMX packet (OpDmx)
    fn build_artnet_packet(&self, channels: &[u8; DMX_CHANNELS]) -> Vec<u8> {
        let mut packet = vec![0u8; 18 + DMX_CHANNELS];

        // Header: "Art-Net\0"
        packet[0..8].copy_from_slice(b"Art-Net\0");

        // OpCode: OpDmx (0x5000)
        packet[8..10].copy_from_slice(&0x5000u16.to_le_bytes());

        // Protocol version (14)
        packet[10..12].copy_from_slice(&14u16.to_be_bytes());

        // Sequence
        packet[12] = self.sequence;

        // Physical (0)
        packet[13] = 0;

        // Universe (Port-Address)
        packet[14..16].copy_from_slice(&self.universe.to_le_bytes());

        // Length (512 channels, big-endian)
        packet[16..18].copy_from_slice(&(DMX_CHANNELS as u16).to_be_bytes());

        // DMX data
        packet[18..].copy_from_slice(channels);

        packet
    }

    /// Destination of the packets
    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Get the current universe
    pub fn universe(&self) -> u16 {
        self.universe
    }

    /// Set the minimum send interval (for rate limiting)
    pub fn set_refresh_rate(&mut self, hz: u32) {
        self.min_interval = Duration::from_millis(1000 / hz.max(1) as u64);
    }
}
