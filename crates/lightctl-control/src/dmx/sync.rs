//! Per-tick DMX sync
//!
//! Copies the channel store to the output device, scaled by the master
//! volume, and auto-connects to the output device when it is the only one
//! available.

use super::DmxOutput;
use crate::store::{ChannelStore, DMX_CHANNELS};

/// Output level of a raw channel value at `volume`.
///
/// The product is computed in floating point and truncated toward zero;
/// results outside 0-255 saturate.
pub fn scale_level(raw: i32, volume: f32) -> u8 {
    (raw as f32 * volume) as u8
}

/// Drives a [`DmxOutput`] from a [`ChannelStore`] once per tick
#[derive(Debug)]
pub struct DmxSync {
    auto_connect_armed: bool,
    commit_failing: bool,
}

impl Default for DmxSync {
    fn default() -> Self {
        Self::new()
    }
}

impl DmxSync {
    pub fn new() -> Self {
        Self {
            auto_connect_armed: true,
            commit_failing: false,
        }
    }

    /// Whether auto-connect can still fire
    pub fn auto_connect_armed(&self) -> bool {
        self.auto_connect_armed
    }

    /// Prevent any later auto-connect, e.g. after the user picked a device
    pub fn disarm_auto_connect(&mut self) {
        self.auto_connect_armed = false;
    }

    /// Connect to the only available device, at most once. Returns whether
    /// a connection was made.
    pub fn auto_connect(&mut self, output: &mut dyn DmxOutput) -> bool {
        if !self.auto_connect_armed {
            return false;
        }
        if output.is_connected() {
            self.auto_connect_armed = false;
            return false;
        }

        let devices = output.list_devices();
        match devices.as_slice() {
            [] => false,
            [device] => {
                self.auto_connect_armed = false;
                match output.connect(device) {
                    Ok(()) => {
                        tracing::info!("Auto-connected to DMX device '{}'", device);
                        true
                    }
                    Err(e) => {
                        tracing::warn!("Auto-connect to '{}' failed: {}", device, e);
                        false
                    }
                }
            }
            _ => {
                tracing::debug!(
                    "{} DMX devices available, not auto-connecting",
                    devices.len()
                );
                self.auto_connect_armed = false;
                false
            }
        }
    }

    /// Run one tick: reset the frame, write every scaled channel, commit
    pub fn step(&mut self, store: &ChannelStore, output: &mut dyn DmxOutput) {
        self.auto_connect(output);

        output.reset_frame();
        let volume = store.volume();
        for (index, &raw) in store.channels().iter().enumerate().take(DMX_CHANNELS) {
            output.set_channel(index as u16 + 1, scale_level(raw, volume));
        }

        match output.commit_frame() {
            Ok(()) => {
                if self.commit_failing {
                    tracing::info!("DMX output recovered");
                    self.commit_failing = false;
                }
            }
            Err(e) => {
                if !self.commit_failing {
                    tracing::warn!("DMX output failed: {}", e);
                    self.commit_failing = true;
                }
            }
        }
    }
}
