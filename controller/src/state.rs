//! Device state: the single struct the event loop owns and hands to every
//! source callback as `&mut DeviceState`.

use tracing::{debug, warn};

use crate::clock::Clock;
use crate::config::{ConfigStore, DeviceSettings, TimingConstants};
use crate::controller::{Controller, Peripherals, TickReport};
use crate::peripherals::{PushButton, EyeSensor, NotificationSink};
use crate::remote::RemoteServer;

/// Input devices sampled once per tick.
pub struct Inputs {
    pub sensor: Box<dyn EyeSensor>,
    pub clear_button: Box<dyn PushButton>,
    /// Opens the settings screen on press.
    pub settings_button: Box<dyn PushButton>,
}

/// Central device state.
pub struct DeviceState {
    pub clock: Box<dyn Clock>,
    pub controller: Controller,
    pub remote: RemoteServer,
    pub store: Box<dyn ConfigStore>,
    pub inputs: Inputs,
    settings_held: bool,
    pub running: bool,
    pub ticks: u64,
}

impl DeviceState {
    pub fn new(
        settings: DeviceSettings,
        store: Box<dyn ConfigStore>,
        clock: Box<dyn Clock>,
        inputs: Inputs,
        peripherals: Peripherals,
    ) -> Self {
        Self {
            clock,
            controller: Controller::new(settings, TimingConstants::default(), peripherals),
            remote: RemoteServer::new(),
            store,
            inputs,
            settings_held: false,
            running: true,
            ticks: 0,
        }
    }

    /// Sample the inputs, run one controller tick and forward its output to
    /// remote clients.
    pub fn tick(&mut self) -> TickReport {
        let now = self.clock.now_ms();
        let eye_open = self.inputs.sensor.eye_open();
        let clear_pressed = self.inputs.clear_button.is_pressed();
        let report = self.controller.tick(now, eye_open, clear_pressed);
        self.ticks += 1;

        let settings_pressed = self.inputs.settings_button.is_pressed();
        if settings_pressed && !self.settings_held {
            self.controller.open_settings();
        }
        self.settings_held = settings_pressed;

        if let Some(event) = report.event {
            self.remote.broadcast_event(event);
        }
        for request in &report.notifications {
            self.remote.send_notification(request);
        }
        report
    }

    /// Write the current blink settings to the store.  Failure is logged;
    /// the in-memory values stay as they are.
    pub fn persist_settings(&mut self) {
        match self.store.save(&self.controller.settings()) {
            Ok(()) => debug!("settings persisted"),
            Err(e) => warn!("failed to persist settings: {}", e),
        }
    }

    /// Headless state over a manual clock, for unit tests.
    #[cfg(test)]
    pub fn for_test(mut store: Box<dyn ConfigStore>) -> Self {
        use crate::clock::ManualClock;
        use crate::peripherals::{
            NeverPressed, NullIndicators, SteadySensor, TracingAnnouncer, TracingRenderer,
        };

        let settings = store.load().unwrap_or_default();
        Self::new(
            settings,
            store,
            Box::new(ManualClock::new(0)),
            Inputs {
                sensor: Box::new(SteadySensor::default()),
                clear_button: Box::new(NeverPressed),
                settings_button: Box::new(NeverPressed),
            },
            Peripherals {
                renderer: Box::new(TracingRenderer),
                announcer: Box::new(TracingAnnouncer),
                indicators: Box::new(NullIndicators),
            },
        )
    }
}
