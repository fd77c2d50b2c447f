//! Message buffer the user composes one token at a time.

use tracing::debug;

use super::token::Token;
use crate::peripherals::NotificationKind;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MessageComposer {
    buffer: String,
}

impl MessageComposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.buffer
    }

    /// Apply a committed token.  Returns the caregiver request it raises.
    pub fn commit(&mut self, token: Token) -> Option<NotificationKind> {
        match token {
            Token::Backspace => {
                self.buffer.pop();
            }
            Token::Space => self.buffer.push(' '),
            Token::Clear => self.buffer.clear(),
            Token::Restroom | Token::Food | Token::Doctor => {}
            Token::Letter(c) | Token::Digit(c) => self.buffer.push(c),
        }
        debug!(token = %token.label(), len = self.buffer.len(), "message updated");
        token.notification()
    }
}
