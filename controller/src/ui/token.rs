//! Selectable tokens and their audio cue numbers.

use crate::peripherals::NotificationKind;

/// Atomic unit committed from a popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    /// Upper-case ASCII letter.
    Letter(char),
    /// ASCII digit.
    Digit(char),
    Space,
    Backspace,
    Clear,
    Restroom,
    Food,
    Doctor,
}

impl Token {
    /// Map a single grid label character to a token.
    ///
    /// Letters are folded to upper case.  Returns `None` for whitespace and
    /// characters with no token.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'a'..='z' | 'A'..='Z' => Some(Self::Letter(c.to_ascii_uppercase())),
            '0'..='9' => Some(Self::Digit(c)),
            '_' => Some(Self::Space),
            '<' => Some(Self::Backspace),
            '.' => Some(Self::Clear),
            _ => None,
        }
    }

    /// Text shown on the popup button.
    pub fn label(&self) -> String {
        match self {
            Self::Letter(c) | Self::Digit(c) => c.to_string(),
            Self::Space => "_".to_string(),
            Self::Backspace => "<".to_string(),
            Self::Clear => ".".to_string(),
            Self::Restroom => "toilet".to_string(),
            Self::Food => "food".to_string(),
            Self::Doctor => "doctor".to_string(),
        }
    }

    /// Spoken-name description used in logs.
    pub fn describe(&self) -> String {
        match self {
            Self::Letter(c) => format!("letter {}", c),
            Self::Digit(c) => format!("number {}", c),
            Self::Space => "space".to_string(),
            Self::Backspace => "backspace".to_string(),
            Self::Clear => "message cleared".to_string(),
            Self::Restroom => "toilet".to_string(),
            Self::Food => "food".to_string(),
            Self::Doctor => "doctor".to_string(),
        }
    }

    /// Audio track announcing this token.  A letter or digit outside its
    /// range maps to 0, which no track uses.
    pub fn cue_id(&self) -> u16 {
        match self {
            Self::Letter(c) => char_offset(*c, 'A', 26).map_or(0, |n| n + 1),
            Self::Digit(c) => char_offset(*c, '0', 10).map_or(0, |n| n + 33),
            Self::Space => 27,
            Self::Backspace => 28,
            Self::Clear => 29,
            Self::Restroom => 30,
            Self::Food => 31,
            Self::Doctor => 32,
        }
    }

    /// Caregiver request raised by committing this token, if any.
    pub fn notification(&self) -> Option<NotificationKind> {
        match self {
            Self::Restroom => Some(NotificationKind::Restroom),
            Self::Food => Some(NotificationKind::Food),
            Self::Doctor => Some(NotificationKind::DoctorCall),
            _ => None,
        }
    }
}

/// Position of `c` in the run of `len` chars starting at `first`.
fn char_offset(c: char, first: char, len: u32) -> Option<u16> {
    let n = u32::from(c).checked_sub(u32::from(first))?;
    (n < len).then_some(n as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_char() {
        assert_eq!(Token::from_char('a'), Some(Token::Letter('A')));
        assert_eq!(Token::from_char('Q'), Some(Token::Letter('Q')));
        assert_eq!(Token::from_char('7'), Some(Token::Digit('7')));
        assert_eq!(Token::from_char('_'), Some(Token::Space));
        assert_eq!(Token::from_char('<'), Some(Token::Backspace));
        assert_eq!(Token::from_char('.'), Some(Token::Clear));
        assert_eq!(Token::from_char(' '), None);
        assert_eq!(Token::from_char('-'), None);
    }

    #[test]
    fn test_cue_ids() {
        assert_eq!(Token::Letter('A').cue_id(), 1);
        assert_eq!(Token::Letter('Z').cue_id(), 26);
        assert_eq!(Token::Digit('0').cue_id(), 33);
        assert_eq!(Token::Digit('9').cue_id(), 42);
        assert_eq!(Token::Space.cue_id(), 27);
        assert_eq!(Token::Backspace.cue_id(), 28);
        assert_eq!(Token::Clear.cue_id(), 29);
        assert_eq!(Token::Restroom.cue_id(), 30);
        assert_eq!(Token::Food.cue_id(), 31);
        assert_eq!(Token::Doctor.cue_id(), 32);
    }

    #[test]
    fn test_cue_id_of_malformed_token() {
        assert_eq!(Token::Letter('1').cue_id(), 0, "digit in a letter token");
        assert_eq!(Token::Letter('a').cue_id(), 0, "lowercase is not normalized here");
        assert_eq!(Token::Letter('\u{e9}').cue_id(), 0, "non-ascii letter");
        assert_eq!(Token::Digit('x').cue_id(), 0, "letter in a digit token");
        assert_eq!(Token::Digit('/').cue_id(), 0, "char just below '0'");
    }

    #[test]
    fn test_labels() {
        assert_eq!(Token::Letter('B').label(), "B");
        assert_eq!(Token::Space.label(), "_");
        assert_eq!(Token::Restroom.label(), "toilet");
        assert_eq!(Token::Doctor.describe(), "doctor");
        assert_eq!(Token::Digit('4').describe(), "number 4");
    }

    #[test]
    fn test_notification_tokens() {
        assert_eq!(Token::Restroom.notification(), Some(NotificationKind::Restroom));
        assert_eq!(Token::Food.notification(), Some(NotificationKind::Food));
        assert_eq!(Token::Doctor.notification(), Some(NotificationKind::DoctorCall));
        assert_eq!(Token::Letter('A').notification(), None);
        assert_eq!(Token::Clear.notification(), None);
    }
}
