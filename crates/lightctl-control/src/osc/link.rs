//! OSC link to the touch-panel controller
//!
//! Owns exactly one listener and one sender. Reconfiguring tears both down
//! before anything new is bound, so two listeners never coexist.

use rosc::{decoder, encoder, OscBundle, OscMessage, OscPacket, OscTime, OscType};
use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};

use super::address::{fader_echo_address, parse_osc_message, OscCommand, VOLUME_ADDRESS};
use super::config::OscEndpointConfig;
use crate::mapping::{FaderPosition, PAGES};
use crate::store::ChannelStore;
use crate::{error::ControlError, Result};

/// Bundle time tag meaning "immediately"
const IMMEDIATE: OscTime = OscTime {
    seconds: 0,
    fractional: 1,
};

/// Non-blocking UDP listener, drained once per tick
struct OscReceiver {
    socket: UdpSocket,
}

impl OscReceiver {
    fn bind(port: u16) -> Result<Self> {
        let socket = UdpSocket::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port))?;
        socket.set_nonblocking(true)?;
        Ok(Self { socket })
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.local_addr().ok()
    }
}

/// UDP sender bound to a fixed local port
struct OscSender {
    socket: UdpSocket,
    target: SocketAddrV4,
}

impl OscSender {
    fn new(local_port: u16, target: SocketAddrV4) -> Result<Self> {
        let socket = UdpSocket::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, local_port))?;
        if target.ip().is_broadcast() {
            socket.set_broadcast(true)?;
        }
        Ok(Self { socket, target })
    }

    fn send(&self, packet: &OscPacket) -> Result<()> {
        let buf = encoder::encode(packet)?;
        self.socket.send_to(&buf, self.target)?;
        Ok(())
    }
}

/// Bidirectional OSC link
pub struct OscLink {
    config: OscEndpointConfig,
    receiver: Option<OscReceiver>,
    sender: Option<OscSender>,
    buf: Vec<u8>,
}

impl Default for OscLink {
    fn default() -> Self {
        Self::new()
    }
}

impl OscLink {
    /// Create an unconfigured link. Nothing is bound until [`configure`](Self::configure).
    pub fn new() -> Self {
        Self {
            config: OscEndpointConfig::default(),
            receiver: None,
            sender: None,
            buf: vec![0u8; decoder::MTU],
        }
    }

    /// Tear down the current endpoints and build new ones for `config`.
    ///
    /// A listener that fails to bind is logged and left absent; the link
    /// then simply receives nothing until the next reconfigure. A sender
    /// that cannot be built fails the whole call and no sender is kept.
    pub fn configure(&mut self, config: OscEndpointConfig) -> Result<()> {
        self.close();
        self.config = config;

        match OscReceiver::bind(self.config.receive_port) {
            Ok(receiver) => {
                tracing::info!("OSC listening on port {}", self.config.receive_port);
                self.receiver = Some(receiver);
            }
            Err(e) => {
                tracing::error!(
                    "Failed to bind OSC receiver on port {}: {}",
                    self.config.receive_port,
                    e
                );
            }
        }

        let target = self.config.send_target()?;
        let sender = OscSender::new(self.config.local_port, target)?;
        tracing::info!(
            "OSC sending from port {} to {}",
            self.config.local_port,
            target
        );
        self.sender = Some(sender);

        Ok(())
    }

    /// Release the receiver, then the sender and its socket
    pub fn close(&mut self) {
        if let Some(receiver) = self.receiver.take() {
            tracing::debug!("Closing OSC receiver {:?}", receiver.local_addr());
        }
        if let Some(sender) = self.sender.take() {
            tracing::debug!("Closing OSC sender to {}", sender.target);
        }
    }

    /// Active configuration, including the last auto-tracked send address
    pub fn config(&self) -> &OscEndpointConfig {
        &self.config
    }

    /// Whether a listener is bound
    pub fn is_listening(&self) -> bool {
        self.receiver.is_some()
    }

    /// Whether a sender is available
    pub fn can_send(&self) -> bool {
        self.sender.is_some()
    }

    /// Local address of the listener
    pub fn receive_addr(&self) -> Option<SocketAddr> {
        self.receiver.as_ref().and_then(OscReceiver::local_addr)
    }

    /// Local address of the send socket
    pub fn sender_addr(&self) -> Option<SocketAddr> {
        self.sender.as_ref().and_then(|s| s.socket.local_addr().ok())
    }

    /// Current send destination
    pub fn send_target(&self) -> Option<SocketAddrV4> {
        self.sender.as_ref().map(|s| s.target)
    }

    /// Drain every pending datagram into `store`. Returns the number of
    /// datagrams read.
    pub fn poll(&mut self, store: &mut ChannelStore) -> usize {
        let mut received = 0;

        loop {
            let Some(receiver) = self.receiver.as_ref() else {
                break;
            };

            match receiver.socket.recv_from(&mut self.buf) {
                Ok((size, from)) => {
                    received += 1;
                    let decoded = decoder::decode_udp(&self.buf[..size]).map(|(_, packet)| packet);
                    match decoded {
                        Ok(packet) => self.handle_packet(packet, from, store),
                        Err(e) => tracing::warn!("OSC decode error from {}: {:?}", from, e),
                    }
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    tracing::warn!("OSC receive error: {}", e);
                    break;
                }
            }
        }

        received
    }

    fn handle_packet(&mut self, packet: OscPacket, from: SocketAddr, store: &mut ChannelStore) {
        match packet {
            OscPacket::Message(message) => self.on_message(&message, Some(from), store),
            OscPacket::Bundle(bundle) => {
                for packet in bundle.content {
                    self.handle_packet(packet, from, store);
                }
            }
        }
    }

    /// Apply one inbound message to `store`.
    ///
    /// The sender's IPv4 address becomes the unicast target for the next
    /// reconfigure. Malformed messages are logged and dropped.
    pub fn on_message(
        &mut self,
        message: &OscMessage,
        from: Option<SocketAddr>,
        store: &mut ChannelStore,
    ) {
        if let Some(ip) = from.and_then(source_ipv4) {
            let address = ip.to_string();
            if self.config.send_address != address {
                tracing::debug!("Tracking OSC peer address {}", address);
                self.config.send_address = address;
            }
        }

        match parse_osc_message(message) {
            Ok(OscCommand::Volume(volume)) => {
                store.set_volume(volume);
                tracing::debug!("Volume set to {}", volume);
                if let Err(e) = self.send_volume(volume) {
                    tracing::debug!("Volume echo not sent: {}", e);
                }
            }
            Ok(OscCommand::Fader { position, value }) => {
                let channel = position.channel();
                // Float to int casts truncate toward zero and saturate.
                if let Err(e) = store.set_channel(channel, value as i32) {
                    tracing::warn!("Dropping fader {}: {}", message.addr, e);
                } else {
                    tracing::trace!("Channel {} = {}", channel, value);
                }
            }
            Ok(OscCommand::Unrecognized) => {
                tracing::trace!("Ignoring OSC address {}", message.addr);
            }
            Err(e) => {
                tracing::warn!("Dropping OSC message {}: {}", message.addr, e);
            }
        }
    }

    /// Send every fader level, one bundle per page
    pub fn broadcast_snapshot(&self, store: &ChannelStore) -> Result<()> {
        let sender = self.sender()?;

        for page in 1..=PAGES {
            let content = FaderPosition::page_faders(page)
                .map(|position| {
                    let value = store.channel(position.channel()).unwrap_or(0);
                    OscPacket::Message(OscMessage {
                        addr: fader_echo_address(&position),
                        args: vec![OscType::Float(value as f32)],
                    })
                })
                .collect();

            sender.send(&OscPacket::Bundle(OscBundle {
                timetag: IMMEDIATE,
                content,
            }))?;
        }

        tracing::debug!("Sent fader snapshot to {}", sender.target);
        Ok(())
    }

    /// Send the master volume on `/volume`
    pub fn send_volume(&self, volume: f32) -> Result<()> {
        self.sender()?.send(&OscPacket::Message(OscMessage {
            addr: VOLUME_ADDRESS.to_string(),
            args: vec![OscType::Float(volume)],
        }))
    }

    fn sender(&self) -> Result<&OscSender> {
        self.sender
            .as_ref()
            .ok_or_else(|| ControlError::OscError("OSC sender not configured".to_string()))
    }
}

impl Drop for OscLink {
    fn drop(&mut self) {
        self.close();
    }
}

fn source_ipv4(addr: SocketAddr) -> Option<Ipv4Addr> {
    match addr {
        SocketAddr::V4(v4) => Some(*v4.ip()),
        SocketAddr::V6(v6) => v6.ip().to_ipv4_mapped(),
    }
}
