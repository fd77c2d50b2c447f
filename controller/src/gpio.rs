//! Linux sysfs GPIO value-file pins.
//!
//! Each pin is a path like `/sys/class/gpio/gpio17/value` that reads and
//! writes `0` or `1`.  Export and direction setup are left to the system
//! (udev rule or init script).  I/O failures are logged and the last known
//! level is kept so a flaky pin never stops the tick loop.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::peripherals::{PushButton, EyeSensor, Indicators};

/// Input pin.
#[derive(Debug)]
pub struct SysfsInput {
    path: PathBuf,
    active_low: bool,
    last: bool,
    failing: bool,
}

impl SysfsInput {
    /// `idle` is the logical level reported until the first successful read.
    pub fn new(path: impl Into<PathBuf>, active_low: bool, idle: bool) -> Self {
        Self {
            path: path.into(),
            active_low,
            last: idle,
            failing: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Logical level (after active-low inversion).
    pub fn read(&mut self) -> bool {
        match fs::read_to_string(&self.path) {
            Ok(raw) => match raw.trim() {
                "0" | "1" => {
                    if self.failing {
                        debug!(path = ?self.path, "gpio input recovered");
                        self.failing = false;
                    }
                    self.last = (raw.trim() == "1") != self.active_low;
                }
                other => self.note_failure(&format!("unexpected value {:?}", other)),
            },
            Err(e) => self.note_failure(&e.to_string()),
        }
        self.last
    }

    fn note_failure(&mut self, reason: &str) {
        if !self.failing {
            warn!(path = ?self.path, reason, "gpio read failed, holding last level");
            self.failing = true;
        }
    }
}

impl EyeSensor for SysfsInput {
    fn eye_open(&mut self) -> bool {
        self.read()
    }
}

impl PushButton for SysfsInput {
    fn is_pressed(&mut self) -> bool {
        self.read()
    }
}

/// Output pin.  Writes only on level change.
#[derive(Debug)]
pub struct SysfsOutput {
    path: PathBuf,
    level: Option<bool>,
}

impl SysfsOutput {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            level: None,
        }
    }

    pub fn set(&mut self, on: bool) {
        if self.level == Some(on) {
            return;
        }
        match fs::write(&self.path, if on { "1" } else { "0" }) {
            Ok(()) => self.level = Some(on),
            Err(e) => warn!(path = ?self.path, on, "gpio write failed: {}", e),
        }
    }

    pub fn level(&self) -> Option<bool> {
        self.level
    }
}

/// Blink LED plus the emergency LED and buzzer pair.
#[derive(Debug)]
pub struct GpioIndicators {
    pub blink_led: Option<SysfsOutput>,
    pub alert_led: Option<SysfsOutput>,
    pub buzzer: Option<SysfsOutput>,
}

impl Indicators for GpioIndicators {
    fn set_blink_led(&mut self, on: bool) {
        if let Some(pin) = self.blink_led.as_mut() {
            pin.set(on);
        }
    }

    fn set_alert(&mut self, on: bool) {
        for pin in [self.alert_led.as_mut(), self.buzzer.as_mut()]
            .into_iter()
            .flatten()
        {
            pin.set(on);
        }
    }
}
