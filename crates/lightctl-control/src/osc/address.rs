//! OSC address space parser
//!
//! Inbound addresses understood by the bridge:
//! - `/volume` - master volume (one numeric argument)
//! - `/{page}/faders/{column}/{row}` - fader level (one numeric argument)
//!
//! Outbound fader echoes use the shorter `/{page}/{column}/{row}` form.

use rosc::OscMessage;

use super::types::osc_to_level;
use crate::{error::ControlError, mapping::FaderPosition, Result};

/// Address of the master volume
pub const VOLUME_ADDRESS: &str = "/volume";
/// Literal second segment of an inbound fader address
pub const FADER_SEGMENT: &str = "faders";

/// Maximum length of an OSC address string
const MAX_OSC_ADDRESS_LENGTH: usize = 1024;

/// Shape of an inbound OSC address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OscAddress {
    Volume,
    Fader(FaderPosition),
    Unrecognized,
}

/// A decoded inbound message
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OscCommand {
    Volume(f32),
    Fader { position: FaderPosition, value: f32 },
    Unrecognized,
}

/// Classify an OSC address.
///
/// Addresses that do not have the volume or fader shape are
/// [`OscAddress::Unrecognized`]. An address with the fader shape whose
/// coordinates are not numbers on the surface is an error.
pub fn parse_osc_address(address: &str) -> Result<OscAddress> {
    if address.len() > MAX_OSC_ADDRESS_LENGTH {
        return Err(ControlError::InvalidMessage(format!(
            "OSC address too long (max {} chars)",
            MAX_OSC_ADDRESS_LENGTH
        )));
    }

    if address == VOLUME_ADDRESS {
        return Ok(OscAddress::Volume);
    }

    // Empty segments are skipped, so "//1/faders/2/3" still has four.
    let parts: Vec<&str> = address.split('/').filter(|s| !s.is_empty()).collect();
    if parts.len() != 4 || parts[1] != FADER_SEGMENT {
        return Ok(OscAddress::Unrecognized);
    }

    let page = parse_coordinate("page", parts[0])?;
    let column = parse_coordinate("column", parts[2])?;
    let row = parse_coordinate("row", parts[3])?;

    let position = FaderPosition::new(page, column, row)
        .map_err(|e| ControlError::InvalidMessage(format!("{}: {}", address, e)))?;

    Ok(OscAddress::Fader(position))
}

fn parse_coordinate(name: &str, segment: &str) -> Result<u16> {
    segment
        .parse()
        .map_err(|_| ControlError::InvalidMessage(format!("Invalid fader {}: {}", name, segment)))
}

/// Decode an inbound message into a command
pub fn parse_osc_message(message: &OscMessage) -> Result<OscCommand> {
    match parse_osc_address(&message.addr)? {
        OscAddress::Volume => Ok(OscCommand::Volume(osc_to_level(&message.args)?)),
        OscAddress::Fader(position) => Ok(OscCommand::Fader {
            position,
            value: osc_to_level(&message.args)?,
        }),
        OscAddress::Unrecognized => Ok(OscCommand::Unrecognized),
    }
}

/// Outbound echo address of a fader
pub fn fader_echo_address(position: &FaderPosition) -> String {
    format!("/{}/{}/{}", position.page, position.column, position.row)
}

/// Inbound address of a fader, as sent by the controller
pub fn fader_control_address(position: &FaderPosition) -> String {
    format!(
        "/{}/{}/{}/{}",
        position.page, FADER_SEGMENT, position.column, position.row
    )
}
