//! Light Control - OSC to DMX bridge
//!
//! This crate holds the core of the Light Control bridge:
//! - **Mapping**: touch-surface fader positions to DMX channels
//! - **Store**: the 512 raw channel levels and the master volume
//! - **OSC**: listener and sender for TouchOSC-style controllers
//! - **Discovery**: DNS-SD advertisement of the OSC listener
//! - **DMX**: output devices (Art-Net, sACN) and the per-tick sync
//!
//! ## Feature Flags
//!
//! - `mdns`: Enable the mDNS service registry (requires `mdns-sd`)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lightctl_control::discovery::NullRegistry;
//! use lightctl_control::dmx::NetworkDmxOutput;
//! use lightctl_control::{LightControl, LightControlOptions};
//!
//! let mut control = LightControl::new(
//!     LightControlOptions::default(),
//!     Box::new(NetworkDmxOutput::new(Vec::new())),
//!     Box::new(NullRegistry),
//! );
//!
//! // Once per frame
//! control.update();
//! ```

// Core modules
pub mod bridge;
/// Error types
pub mod error;
pub mod mapping;
pub mod store;

// Network and output modules
pub mod discovery;
pub mod dmx;
pub mod osc;

// Re-exports
pub use bridge::{LightControl, LightControlOptions};
pub use error::{ControlError, Result};
pub use mapping::{channel_of, position_of, FaderPosition};
pub use store::{ChannelStore, DMX_CHANNELS};

pub use discovery::{DiscoveryBinding, ServiceRegistry};
pub use dmx::{DmxOutput, DmxSync, NetworkDmxOutput};
pub use osc::{OscEndpointConfig, OscLink};

#[cfg(feature = "mdns")]
pub use discovery::MdnsRegistry;
