//! OSC link to the touch-panel controller
//!
//! Inbound `/volume` and `/{page}/faders/{column}/{row}` messages update the
//! [`ChannelStore`](crate::store::ChannelStore); outbound messages echo the
//! volume and resynchronise the controller with per-page snapshot bundles.

pub mod address;
pub mod config;
pub mod link;
pub mod types;

pub use address::{
    fader_control_address, fader_echo_address, parse_osc_address, parse_osc_message, OscAddress,
    OscCommand, FADER_SEGMENT, VOLUME_ADDRESS,
};
pub use config::OscEndpointConfig;
pub use link::OscLink;
