//! OSC endpoint configuration

use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddrV4};

use crate::{error::ControlError, Result};

/// Default port the controller sends to
pub const DEFAULT_RECEIVE_PORT: u16 = 10000;
/// Default port the controller listens on
pub const DEFAULT_SEND_PORT: u16 = 10001;
/// Local port of the send socket
pub const DEFAULT_LOCAL_SEND_PORT: u16 = 31000;
/// Unicast target used until a controller is heard from
pub const DEFAULT_SEND_ADDRESS: &str = "192.168.1.11";

/// Where the OSC link listens and where it sends to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OscEndpointConfig {
    /// UDP port the listener binds to
    pub receive_port: u16,
    /// UDP port outbound messages are sent to
    pub send_port: u16,
    /// Send to `send_address` instead of broadcasting
    pub unicast: bool,
    /// Dotted-quad IPv4 target, only used when `unicast` is set
    pub send_address: String,
    /// Local port the send socket binds to (0 picks an ephemeral port)
    pub local_port: u16,
}

impl Default for OscEndpointConfig {
    fn default() -> Self {
        Self {
            receive_port: DEFAULT_RECEIVE_PORT,
            send_port: DEFAULT_SEND_PORT,
            unicast: false,
            send_address: DEFAULT_SEND_ADDRESS.to_string(),
            local_port: DEFAULT_LOCAL_SEND_PORT,
        }
    }
}

impl OscEndpointConfig {
    /// Destination of outbound messages: broadcast, or the unicast address
    pub fn send_target(&self) -> Result<SocketAddrV4> {
        let address = if self.unicast {
            parse_ipv4(&self.send_address)?
        } else {
            Ipv4Addr::BROADCAST
        };
        Ok(SocketAddrV4::new(address, self.send_port))
    }

    /// Check the configuration can be applied
    pub fn validate(&self) -> Result<()> {
        self.send_target().map(|_| ())
    }
}

/// Parse a dotted-quad IPv4 address
pub fn parse_ipv4(address: &str) -> Result<Ipv4Addr> {
    address.trim().parse().map_err(|_| {
        ControlError::InvalidParameter(format!("Invalid IPv4 address: {:?}", address))
    })
}
