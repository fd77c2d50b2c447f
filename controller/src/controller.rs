//! Controller aggregate: the per-tick pipeline from raw eye sample to
//! rendered state and caregiver requests.
//!
//! One tick runs, in order: classify the sample, mirror the eye state on the
//! blink LED, raise the classified event, step the emergency latch, expire an
//! idle popup, let navigation consume Single/Double, apply any committed
//! token.  Notification requests raised along the way are returned to the
//! caller for delivery.

use tracing::info;

use crate::blink::{BlinkClassifier, ClassifiedEvent, EventFlags, EyeEdge};
use crate::clock::Millis;
use crate::config::{BlinkConfig, DeviceSettings, TimingConstants};
use crate::emergency::{EmergencyController, EmergencyState};
use crate::peripherals::{
    AudioAnnouncer, AudioCue, Indicators, NotificationKind, NotificationRequest, Renderer,
};
use crate::ui::{MessageComposer, NavOutcome, NavigationStateMachine, SelectionState};

/// Output devices the controller drives.
pub struct Peripherals {
    pub renderer: Box<dyn Renderer>,
    pub announcer: Box<dyn AudioAnnouncer>,
    pub indicators: Box<dyn Indicators>,
}

/// What happened during one tick.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    /// Event the classifier emitted this tick.
    pub event: Option<ClassifiedEvent>,
    pub notifications: Vec<NotificationRequest>,
}

pub struct Controller {
    classifier: BlinkClassifier,
    flags: EventFlags,
    emergency: EmergencyController,
    navigation: NavigationStateMachine,
    composer: MessageComposer,
    blink: BlinkConfig,
    user_id: u32,
    peripherals: Peripherals,
    /// Level last written to the alert output.
    alert_level: bool,
}

impl Controller {
    pub fn new(
        settings: DeviceSettings,
        timing: TimingConstants,
        peripherals: Peripherals,
    ) -> Self {
        Self {
            classifier: BlinkClassifier::new(timing),
            flags: EventFlags::new(),
            emergency: EmergencyController::new(timing.alert_half_period_ms),
            navigation: NavigationStateMachine::new(timing.popup_timeout_ms),
            composer: MessageComposer::new(),
            blink: settings.blink,
            user_id: settings.user_id,
            peripherals,
            alert_level: false,
        }
    }

    /// Play the boot cues and draw the initial screen.
    pub fn start(&mut self) {
        self.peripherals.announcer.play(AudioCue::Startup);
        self.peripherals.indicators.set_blink_led(false);
        self.peripherals.indicators.set_alert(false);
        self.peripherals.renderer.render_grid(self.navigation.state());
        self.peripherals.renderer.render_message(self.composer.text());
        self.peripherals.announcer.play(AudioCue::Ready);
        info!(
            blink_duration_ms = self.blink.blink_duration_ms(),
            blink_gap_ms = self.blink.blink_gap_ms(),
            user_id = self.user_id,
            "controller ready"
        );
    }

    pub fn tick(&mut self, now: Millis, eye_open: bool, clear_pressed: bool) -> TickReport {
        let mut report = TickReport::default();

        let output = self
            .classifier
            .update(eye_open, now, &self.blink, self.emergency.is_active());
        match output.edge {
            Some(EyeEdge::Closed { .. }) => self.peripherals.indicators.set_blink_led(true),
            Some(EyeEdge::Opened { .. }) => self.peripherals.indicators.set_blink_led(false),
            None => {}
        }
        if let Some(event) = output.event {
            self.flags.raise(event);
            report.event = Some(event);
        }

        let step = self.emergency.step(&mut self.flags, now, clear_pressed);
        if step.activated {
            self.peripherals.renderer.render_emergency(true);
            report
                .notifications
                .push(NotificationRequest::new(self.user_id, NotificationKind::Emergency));
        }
        if step.cleared {
            self.peripherals.renderer.render_emergency(false);
        }
        if step.alert_on != self.alert_level {
            self.alert_level = step.alert_on;
            self.peripherals.indicators.set_alert(step.alert_on);
        }

        if self.navigation.check_timeout(now) {
            self.peripherals.renderer.clear_popup();
            self.peripherals.renderer.render_grid(self.navigation.state());
        }

        let outcome = self.navigation.step(&mut self.flags, now);
        if let Some(kind) = self.apply(outcome) {
            report
                .notifications
                .push(NotificationRequest::new(self.user_id, kind));
        }

        report
    }

    /// Drive outputs for a navigation outcome.  Returns the caregiver
    /// request raised by a committed token.
    fn apply(&mut self, outcome: NavOutcome) -> Option<NotificationKind> {
        let Peripherals {
            renderer,
            announcer,
            ..
        } = &mut self.peripherals;
        match outcome {
            NavOutcome::Idle | NavOutcome::PopupRefused { .. } => None,
            NavOutcome::GridAdvanced { .. } => {
                announcer.play(AudioCue::Navigate);
                renderer.render_grid(self.navigation.state());
                None
            }
            NavOutcome::PopupOpened { .. } | NavOutcome::CursorMoved { .. } => {
                let cue = match outcome {
                    NavOutcome::PopupOpened { .. } => AudioCue::Select,
                    _ => AudioCue::Navigate,
                };
                announcer.play(cue);
                if let Some(popup) = self.navigation.state().popup() {
                    renderer.render_popup(popup);
                }
                None
            }
            NavOutcome::Committed { token } => {
                let kind = self.composer.commit(token);
                announcer.play(AudioCue::Select);
                announcer.announce(&token);
                renderer.clear_popup();
                renderer.render_grid(self.navigation.state());
                renderer.render_message(self.composer.text());
                kind
            }
        }
    }

    /// Settings action for the reserved grid cell.  Leaves navigation alone.
    pub fn open_settings(&mut self) {
        info!(
            blink_duration_ms = self.blink.blink_duration_ms(),
            blink_gap_ms = self.blink.blink_gap_ms(),
            "settings opened"
        );
        self.peripherals.announcer.play(AudioCue::Settings);
    }

    pub fn blink_config(&self) -> &BlinkConfig {
        &self.blink
    }

    pub fn blink_config_mut(&mut self) -> &mut BlinkConfig {
        &mut self.blink
    }

    pub fn settings(&self) -> DeviceSettings {
        DeviceSettings {
            blink: self.blink,
            user_id: self.user_id,
        }
    }

    pub fn user_id(&self) -> u32 {
        self.user_id
    }

    pub fn selection(&self) -> &SelectionState {
        self.navigation.state()
    }

    pub fn message(&self) -> &str {
        self.composer.text()
    }

    pub fn emergency_active(&self) -> bool {
        self.emergency.is_active()
    }

    pub fn emergency_state(&self) -> EmergencyState {
        self.emergency.state()
    }

    pub fn pending_event(&self) -> Option<ClassifiedEvent> {
        self.flags.pending()
    }
}

// ── Tests ──────────────────────────────────────────────────
