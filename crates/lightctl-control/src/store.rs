//! Channel store
//!
//! Holds the raw level of every DMX channel as last received over OSC, plus
//! the master volume applied on output. Levels are kept unscaled; scaling
//! happens once per tick in [`crate::dmx::DmxSync`].

use crate::{error::ControlError, Result};

/// Number of channels in a DMX universe
pub const DMX_CHANNELS: usize = 512;

/// Raw channel levels and master volume
#[derive(Debug, Clone)]
pub struct ChannelStore {
    channels: [i32; DMX_CHANNELS],
    volume: f32,
}

impl Default for ChannelStore {
    fn default() -> Self {
        Self {
            channels: [0; DMX_CHANNELS],
            volume: 0.0,
        }
    }
}

impl ChannelStore {
    /// Create a store with every channel at zero and volume muted
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw level of a 1-based channel
    pub fn channel(&self, channel: u16) -> Option<i32> {
        let index = (channel as usize).checked_sub(1)?;
        self.channels.get(index).copied()
    }

    /// Store a raw level for a 1-based channel
    pub fn set_channel(&mut self, channel: u16, value: i32) -> Result<()> {
        let slot = (channel as usize)
            .checked_sub(1)
            .and_then(|index| self.channels.get_mut(index))
            .ok_or_else(|| {
                ControlError::InvalidParameter(format!(
                    "DMX channel {} out of range 1-{}",
                    channel, DMX_CHANNELS
                ))
            })?;
        *slot = value;
        Ok(())
    }

    /// All raw levels, index 0 is channel 1
    pub fn channels(&self) -> &[i32; DMX_CHANNELS] {
        &self.channels
    }

    /// Current master volume
    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Set the master volume. The logical range is 0.0-1.0 but it is not
    /// clamped here.
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }
}
