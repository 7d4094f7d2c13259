//! OSC type conversion helpers

use rosc::OscType;

use crate::{error::ControlError, Result};

/// Read the first OSC argument as a level.
///
/// Controllers send floats, but ints, longs and doubles are accepted too.
pub fn osc_to_level(osc_args: &[OscType]) -> Result<f32> {
    let first = osc_args
        .first()
        .ok_or_else(|| ControlError::InvalidMessage("No OSC arguments".to_string()))?;

    let value = match first {
        OscType::Float(f) => *f,
        OscType::Double(d) => *d as f32,
        OscType::Int(i) => *i as f32,
        OscType::Long(l) => *l as f32,
        other => {
            return Err(ControlError::InvalidMessage(format!(
                "Unsupported OSC type: {:?}",
                other
            )))
        }
    };

    if !value.is_finite() {
        return Err(ControlError::InvalidMessage(format!(
            "Non-finite OSC value: {}",
            value
        )));
    }

    Ok(value)
}
