//! Boundary traits for the hardware and output surfaces around the core.
//!
//! The controller only talks to these traits.  The `gpio` module provides
//! sysfs-backed implementations; the types at the bottom of this file log
//! through `tracing` and are used by the headless backend and in tests.

use tracing::{debug, info, trace};

use crate::ui::{Popup, SelectionState, Token};

// ── Notifications ──────────────────────────────────────────

/// Caregiver request category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    Restroom,
    DoctorCall,
    Food,
    Emergency,
}

impl NotificationKind {
    /// Wire name used on the remote link.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Restroom => "RESTROOM",
            Self::DoctorCall => "DOCTOR_CALL",
            Self::Food => "FOOD",
            Self::Emergency => "EMERGENCY",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    pub user_id: u32,
    pub kind: NotificationKind,
}

impl NotificationRequest {
    pub fn new(user_id: u32, kind: NotificationKind) -> Self {
        Self { user_id, kind }
    }

    /// Line broadcast to remote clients, without the trailing newline.
    pub fn to_line(&self) -> String {
        format!("NOTIFY:{}:{}", self.user_id, self.kind.as_str())
    }
}

// ── Audio cues ─────────────────────────────────────────────

/// Track played by the audio announcer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCue {
    Token(Token),
    Navigate,
    Select,
    Settings,
    Startup,
    Ready,
}

impl AudioCue {
    /// Numeric track id on the playback hardware.
    pub fn track(&self) -> u16 {
        match self {
            Self::Token(token) => token.cue_id(),
            Self::Navigate => 43,
            Self::Select => 44,
            Self::Settings => 45,
            Self::Startup => 46,
            Self::Ready => 47,
        }
    }
}

// ── Traits ─────────────────────────────────────────────────

/// Raw eye-state reading.  Debouncing is the classifier's job.
pub trait EyeSensor {
    fn eye_open(&mut self) -> bool;
}

/// Momentary button: the caregiver clear button or the settings key.
pub trait PushButton {
    fn is_pressed(&mut self) -> bool;
}

/// Status outputs.  `set_alert` drives the emergency LED and buzzer together.
pub trait Indicators {
    fn set_blink_led(&mut self, on: bool);
    fn set_alert(&mut self, on: bool);
}

pub trait Renderer {
    fn render_grid(&mut self, selection: &SelectionState);
    fn render_popup(&mut self, popup: &Popup);
    fn clear_popup(&mut self);
    fn render_message(&mut self, text: &str);
    fn render_emergency(&mut self, active: bool);
}

/// Fire-and-forget audio playback.
pub trait AudioAnnouncer {
    fn play(&mut self, cue: AudioCue);

    fn announce(&mut self, token: &Token) {
        self.play(AudioCue::Token(*token));
    }
}

/// Best-effort delivery of caregiver requests.
pub trait NotificationSink {
    fn send_notification(&mut self, request: &NotificationRequest);
}

// ── Tracing-backed implementations ─────────────────────────

/// Renderer that describes each frame in the log.
#[derive(Debug, Default)]
pub struct TracingRenderer;

impl Renderer for TracingRenderer {
    fn render_grid(&mut self, selection: &SelectionState) {
        debug!(
            index = selection.grid_index,
            label = crate::ui::navigation::GRID_LABELS[selection.grid_index],
            "render grid"
        );
    }

    fn render_popup(&mut self, popup: &Popup) {
        let labels: Vec<String> = popup.entries.iter().map(Token::label).collect();
        debug!(cursor = popup.cursor, entries = ?labels, "render popup");
    }

    fn clear_popup(&mut self) {
        debug!("clear popup");
    }

    fn render_message(&mut self, text: &str) {
        info!(message = text, "render message");
    }

    fn render_emergency(&mut self, active: bool) {
        debug!(active, "render emergency banner");
    }
}

#[derive(Debug, Default)]
pub struct TracingAnnouncer;

impl AudioAnnouncer for TracingAnnouncer {
    fn play(&mut self, cue: AudioCue) {
        match cue {
            AudioCue::Token(token) => {
                debug!(track = cue.track(), token = %token.describe(), "play cue")
            }
            _ => debug!(track = cue.track(), cue = ?cue, "play cue"),
        }
    }
}

/// Indicators with no hardware attached.
#[derive(Debug, Default)]
pub struct NullIndicators;

impl Indicators for NullIndicators {
    fn set_blink_led(&mut self, on: bool) {
        trace!(on, "blink led");
    }

    fn set_alert(&mut self, on: bool) {
        trace!(on, "alert output");
    }
}

/// Sensor that always reports the same eye state.
#[derive(Debug)]
pub struct SteadySensor {
    pub open: bool,
}

impl Default for SteadySensor {
    fn default() -> Self {
        Self { open: true }
    }
}

impl EyeSensor for SteadySensor {
    fn eye_open(&mut self) -> bool {
        self.open
    }
}

#[derive(Debug, Default)]
pub struct NeverPressed;

impl PushButton for NeverPressed {
    fn is_pressed(&mut self) -> bool {
        false
    }
}
