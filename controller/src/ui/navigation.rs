//! Grid/popup navigation driven by Single and Double blinks.
//!
//! In grid mode a Single advances the highlighted cell and a Double opens the
//! cell's popup.  In popup mode a Single advances the popup cursor and a
//! Double commits the highlighted token.  A popup left alone for the popup
//! timeout closes without committing.

use tracing::{debug, info, warn};

use super::token::Token;
use crate::blink::EventFlags;
use crate::clock::Millis;

/// Number of cells in the selection grid.
pub const GRID_CELLS: usize = 12;

/// Grid cell that opens device settings.  It has no popup.
pub const SETTINGS_CELL: usize = 11;

/// Cell holding the caregiver request words.
pub const REQUEST_CELL: usize = 9;

/// Cell holding zero, space and backspace.
pub const EDIT_CELL: usize = 10;

/// Labels drawn on each grid cell.
pub const GRID_LABELS: [&str; GRID_CELLS] = [
    "ABC 1", "DEF 2", "GHI 3", //
    "JKL 4", "MNO 5", "PQR 6", //
    "STU 7", "VWX 8", "YZ. 9", //
    "", "0 _<-", "",
];

/// Popup entries for a grid cell, or `None` if the cell has no popup.
pub fn popup_entries(index: usize) -> Option<Vec<Token>> {
    let entries = match index {
        REQUEST_CELL => vec![Token::Restroom, Token::Food, Token::Doctor],
        EDIT_CELL => vec![Token::Digit('0'), Token::Space, Token::Backspace],
        i if i < REQUEST_CELL => GRID_LABELS[i]
            .chars()
            .filter(|c| !c.is_whitespace() && !c.is_ascii_digit())
            .filter_map(Token::from_char)
            .collect(),
        _ => return None,
    };
    if entries.is_empty() {
        None
    } else {
        Some(entries)
    }
}

// ── State ──────────────────────────────────────────────────

/// Open popup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Popup {
    pub entries: Vec<Token>,
    pub cursor: usize,
    /// Last time the popup was opened or its cursor moved.
    pub activated_at: Millis,
}

impl Popup {
    pub fn selected(&self) -> Token {
        self.entries[self.cursor]
    }
}

/// Navigation mode.  Exactly one is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    GridSelect,
    PopupSelect(Popup),
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GridSelect => "grid",
            Self::PopupSelect(_) => "popup",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionState {
    pub grid_index: usize,
    pub mode: Mode,
}

impl Default for SelectionState {
    fn default() -> Self {
        Self {
            grid_index: 0,
            mode: Mode::GridSelect,
        }
    }
}

impl SelectionState {
    pub fn popup(&self) -> Option<&Popup> {
        match &self.mode {
            Mode::PopupSelect(popup) => Some(popup),
            Mode::GridSelect => None,
        }
    }
}

/// What a navigation step did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavOutcome {
    Idle,
    GridAdvanced { index: usize },
    PopupOpened { index: usize },
    /// The cell has no popup; the grid is unchanged.
    PopupRefused { index: usize },
    CursorMoved { cursor: usize },
    Committed { token: Token },
}

// ── Machine ────────────────────────────────────────────────

#[derive(Debug)]
pub struct NavigationStateMachine {
    state: SelectionState,
    pub popup_timeout_ms: Millis,
}

impl NavigationStateMachine {
    pub fn new(popup_timeout_ms: Millis) -> Self {
        Self {
            state: SelectionState::default(),
            popup_timeout_ms,
        }
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    /// Consume at most one of Single/Double and act on it.
    pub fn step(&mut self, flags: &mut EventFlags, now: Millis) -> NavOutcome {
        if flags.take_single() {
            self.on_single(now)
        } else if flags.take_double() {
            self.on_double(now)
        } else {
            NavOutcome::Idle
        }
    }

    pub fn on_single(&mut self, now: Millis) -> NavOutcome {
        match &mut self.state.mode {
            Mode::GridSelect => {
                self.state.grid_index = (self.state.grid_index + 1) % GRID_CELLS;
                debug!(index = self.state.grid_index, "grid advanced");
                NavOutcome::GridAdvanced {
                    index: self.state.grid_index,
                }
            }
            Mode::PopupSelect(popup) => {
                popup.cursor = (popup.cursor + 1) % popup.entries.len();
                popup.activated_at = now;
                debug!(cursor = popup.cursor, "popup cursor moved");
                NavOutcome::CursorMoved {
                    cursor: popup.cursor,
                }
            }
        }
    }

    pub fn on_double(&mut self, now: Millis) -> NavOutcome {
        let index = self.state.grid_index;
        match &self.state.mode {
            Mode::GridSelect => match popup_entries(index) {
                Some(entries) => {
                    info!(index, entries = entries.len(), "popup opened");
                    self.state.mode = Mode::PopupSelect(Popup {
                        entries,
                        cursor: 0,
                        activated_at: now,
                    });
                    NavOutcome::PopupOpened { index }
                }
                None => {
                    warn!(index, "cell has no popup entries");
                    NavOutcome::PopupRefused { index }
                }
            },
            Mode::PopupSelect(popup) => {
                let token = popup.selected();
                info!(token = %token.label(), "token committed");
                self.state.mode = Mode::GridSelect;
                NavOutcome::Committed { token }
            }
        }
    }

    /// Close a popup that has been idle for the popup timeout.
    /// Returns true if it closed.
    pub fn check_timeout(&mut self, now: Millis) -> bool {
        let expired = match &self.state.mode {
            Mode::PopupSelect(popup) => {
                now.saturating_sub(popup.activated_at) >= self.popup_timeout_ms
            }
            Mode::GridSelect => false,
        };
        if expired {
            info!(index = self.state.grid_index, "popup timed out");
            self.state.mode = Mode::GridSelect;
        }
        expired
    }
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blink::ClassifiedEvent;

    fn letters(s: &str) -> Vec<Token> {
        s.chars().map(Token::Letter).collect()
    }

    #[test]
    fn test_popup_entries_table() {
        assert_eq!(popup_entries(0), Some(letters("ABC")));
        assert_eq!(popup_entries(5), Some(letters("PQR")));
        assert_eq!(
            popup_entries(8),
            Some(vec![Token::Letter('Y'), Token::Letter('Z'), Token::Clear])
        );
        assert_eq!(
            popup_entries(9),
            Some(vec![Token::Restroom, Token::Food, Token::Doctor])
        );
        assert_eq!(
            popup_entries(10),
            Some(vec![Token::Digit('0'), Token::Space, Token::Backspace])
        );
        assert_eq!(popup_entries(11), None);
        assert_eq!(popup_entries(12), None);
    }

    #[test]
    fn test_popup_entries_within_bounds() {
        for index in 0..SETTINGS_CELL {
            let entries = popup_entries(index).unwrap();
            assert!(
                (1..=6).contains(&entries.len()),
                "cell {} has {} entries",
                index,
                entries.len()
            );
        }
    }

    #[test]
    fn test_single_advances_grid_cyclically() {
        let mut nav = NavigationStateMachine::new(5000);
        for expected in 1..GRID_CELLS {
            assert_eq!(nav.on_single(0), NavOutcome::GridAdvanced { index: expected });
        }
        assert_eq!(nav.state().grid_index, 11);
        assert_eq!(nav.on_single(0), NavOutcome::GridAdvanced { index: 0 });
    }

    #[test]
    fn test_double_on_request_cell_opens_words() {
        let mut nav = NavigationStateMachine::new(5000);
        for _ in 0..REQUEST_CELL {
            nav.on_single(0);
        }
        assert_eq!(nav.on_double(100), NavOutcome::PopupOpened { index: 9 });
        let popup = nav.state().popup().unwrap();
        assert_eq!(popup.entries, vec![Token::Restroom, Token::Food, Token::Doctor]);
        assert_eq!(popup.cursor, 0);
        assert_eq!(popup.activated_at, 100);
    }

    #[test]
    fn test_double_on_settings_cell_refused() {
        let mut nav = NavigationStateMachine::new(5000);
        for _ in 0..SETTINGS_CELL {
            nav.on_single(0);
        }
        assert_eq!(nav.on_double(0), NavOutcome::PopupRefused { index: 11 });
        assert_eq!(nav.state().mode, Mode::GridSelect);
    }

    #[test]
    fn test_popup_cursor_wraps_and_commit_returns_to_grid() {
        let mut nav = NavigationStateMachine::new(5000);
        nav.on_double(0);
        assert_eq!(nav.on_single(10), NavOutcome::CursorMoved { cursor: 1 });
        assert_eq!(nav.on_single(20), NavOutcome::CursorMoved { cursor: 2 });
        assert_eq!(nav.on_single(30), NavOutcome::CursorMoved { cursor: 0 });
        assert_eq!(
            nav.on_double(40),
            NavOutcome::Committed { token: Token::Letter('A') }
        );
        assert_eq!(nav.state().mode, Mode::GridSelect);
        assert_eq!(nav.state().grid_index, 0, "commit keeps the grid index");
    }

    #[test]
    fn test_popup_timeout_cancels() {
        let mut nav = NavigationStateMachine::new(5000);
        nav.on_double(1000);
        assert!(!nav.check_timeout(5999));
        assert!(nav.check_timeout(6000));
        assert_eq!(nav.state().mode, Mode::GridSelect);
        assert!(!nav.check_timeout(9000), "grid mode never times out");
    }

    #[test]
    fn test_cursor_move_restarts_timeout() {
        let mut nav = NavigationStateMachine::new(5000);
        nav.on_double(0);
        nav.on_single(4000);
        assert!(!nav.check_timeout(8999));
        assert!(nav.check_timeout(9000));
    }

    #[test]
    fn test_step_consumes_one_flag() {
        let mut nav = NavigationStateMachine::new(5000);
        let mut flags = EventFlags::new();
        assert_eq!(nav.step(&mut flags, 0), NavOutcome::Idle);

        flags.raise(ClassifiedEvent::Single);
        assert_eq!(nav.step(&mut flags, 0), NavOutcome::GridAdvanced { index: 1 });
        assert_eq!(nav.step(&mut flags, 0), NavOutcome::Idle, "flag must be cleared");

        flags.raise(ClassifiedEvent::Quad);
        assert_eq!(nav.step(&mut flags, 0), NavOutcome::Idle);
        assert_eq!(
            flags.pending(),
            Some(ClassifiedEvent::Quad),
            "navigation must not consume quad"
        );
    }
}
