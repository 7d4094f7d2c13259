//! Light Control - OSC to DMX bridge
//!
//! Headless runner: loads the settings, brings up the bridge and ticks it
//! until Ctrl-C.

mod logging_setup;
mod settings;

use anyhow::Result;
use lightctl_control::discovery::{NullRegistry, ServiceRegistry};
use lightctl_control::dmx::NetworkDmxOutput;
use lightctl_control::{LightControl, MdnsRegistry};
use settings::Settings;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

fn service_registry(settings: &Settings) -> Box<dyn ServiceRegistry> {
    if !settings.discovery.enabled {
        info!("Service discovery disabled");
        return Box::new(NullRegistry);
    }

    match MdnsRegistry::new() {
        Ok(registry) => Box::new(registry),
        Err(e) => {
            warn!("mDNS unavailable, running without discovery: {}", e);
            Box::new(NullRegistry)
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let settings = Settings::load_from_env()?;
    let _log_guard = logging_setup::init(&settings.log)?;

    info!("Starting Light Control v{}", env!("CARGO_PKG_VERSION"));

    let output = NetworkDmxOutput::new(settings.dmx.nodes.clone())
        .with_refresh_rate(settings.dmx.refresh_rate_hz);
    let registry = service_registry(&settings);

    let mut control = LightControl::new(settings.control_options(), Box::new(output), registry);
    info!("DMX devices: {:?}", control.devices());

    if let Some(device) = &settings.dmx.device {
        if let Err(e) = control.connect_device(device) {
            error!("Failed to connect to DMX device '{}': {}", device, e);
        }
    }

    let mut ticker = interval(settings.tick_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => control.update(),
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    error!("Failed to listen for Ctrl-C: {}", e);
                }
                break;
            }
        }
    }

    control.shutdown();
    info!("Light Control stopped");
    Ok(())
}
