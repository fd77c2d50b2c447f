//! Text composition interface: the 12-cell grid with its popups, plus the
//! message buffer.

pub mod composer;
pub mod navigation;
pub mod token;

pub use composer::MessageComposer;
pub use navigation::{Mode, NavOutcome, NavigationStateMachine, Popup, SelectionState};
pub use token::Token;
