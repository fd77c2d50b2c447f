//! GPIO backend: eye sensor, clear button and indicator outputs on sysfs
//! value files.

use std::path::PathBuf;

use anyhow::bail;
use tracing::{info, warn};

use super::{build_state, run_event_loop, RunOptions};
use crate::gpio::{GpioIndicators, SysfsInput, SysfsOutput};
use crate::peripherals::{NeverPressed, PushButton};
use crate::state::Inputs;

/// Value-file paths of the device pins.
#[derive(Debug, Clone, Default)]
pub struct GpioPins {
    pub sensor: Option<PathBuf>,
    /// Sensor reads low when the eye is open.
    pub sensor_active_low: bool,
    pub clear_button: Option<PathBuf>,
    /// Button reads low when pressed.
    pub clear_active_low: bool,
    pub settings_button: Option<PathBuf>,
    /// Settings key reads low when pressed.
    pub settings_active_low: bool,
    pub blink_led: Option<PathBuf>,
    pub alert_led: Option<PathBuf>,
    pub buzzer: Option<PathBuf>,
}

impl GpioPins {
    fn inputs(&self) -> anyhow::Result<Inputs> {
        let Some(sensor) = self.sensor.as_ref() else {
            bail!("gpio backend requires --sensor-gpio");
        };
        let sensor = SysfsInput::new(sensor, self.sensor_active_low, true);
        let clear_button: Box<dyn PushButton> = match &self.clear_button {
            Some(path) => Box::new(SysfsInput::new(path, self.clear_active_low, false)),
            None => {
                warn!("no clear button configured; an emergency can only end on restart");
                Box::new(NeverPressed)
            }
        };
        let settings_button: Box<dyn PushButton> = match &self.settings_button {
            Some(path) => Box::new(SysfsInput::new(path, self.settings_active_low, false)),
            None => Box::new(NeverPressed),
        };
        Ok(Inputs {
            sensor: Box::new(sensor),
            clear_button,
            settings_button,
        })
    }

    fn indicators(&self) -> GpioIndicators {
        GpioIndicators {
            blink_led: self.blink_led.as_ref().map(SysfsOutput::new),
            alert_led: self.alert_led.as_ref().map(SysfsOutput::new),
            buzzer: self.buzzer.as_ref().map(SysfsOutput::new),
        }
    }
}

/// Run the controller on sysfs GPIO pins.
pub fn run(options: RunOptions, pins: GpioPins) -> anyhow::Result<()> {
    let inputs = pins.inputs()?;
    let state = build_state(&options, inputs, Box::new(pins.indicators()))?;
    info!(
        sensor = ?pins.sensor,
        clear_button = ?pins.clear_button,
        settings_button = ?pins.settings_button,
        "GPIO backend initialized"
    );
    run_event_loop(state, &options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_required() {
        let pins = GpioPins::default();
        assert!(pins.inputs().is_err(), "missing sensor path must be an error");
    }

    #[test]
    fn test_pins_build_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let sensor = dir.path().join("sensor");
        let button = dir.path().join("button");
        let settings = dir.path().join("settings");
        std::fs::write(&sensor, "0").unwrap();
        std::fs::write(&button, "0").unwrap();
        std::fs::write(&settings, "0").unwrap();
        let pins = GpioPins {
            sensor: Some(sensor),
            sensor_active_low: true,
            clear_button: Some(button),
            clear_active_low: false,
            settings_button: Some(settings),
            settings_active_low: true,
            ..GpioPins::default()
        };
        let mut inputs = pins.inputs().unwrap();
        assert!(inputs.sensor.eye_open(), "active-low sensor reads 0 as open");
        assert!(!inputs.clear_button.is_pressed());
        assert!(inputs.settings_button.is_pressed(), "active-low key reads 0 as pressed");
    }
}
