//! Headless backend: no sensor, no button, no LEDs.
//!
//! Used for CI and for exercising the remote link without hardware.  The
//! eye always reads open, so the only activity comes from remote commands.

use tracing::info;

use super::{build_state, run_event_loop, RunOptions};
use crate::peripherals::{NeverPressed, NullIndicators, SteadySensor};
use crate::state::Inputs;

pub(crate) fn headless_inputs() -> Inputs {
    Inputs {
        sensor: Box::new(SteadySensor::default()),
        clear_button: Box::new(NeverPressed),
        settings_button: Box::new(NeverPressed),
    }
}

/// Run the controller in headless mode.
pub fn run(options: RunOptions) -> anyhow::Result<()> {
    let state = build_state(&options, headless_inputs(), Box::new(NullIndicators))?;
    info!(
        "Headless backend initialized (tick interval: {}ms)",
        options.tick_ms
    );
    run_event_loop(state, &options)
}
