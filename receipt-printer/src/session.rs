//! Printer session state
//!
//! The toggles a receipt printer keeps between commands. One value lives
//! inside each [`Formatter`](crate::Formatter) for as long as its sink.

/// Font scale and style toggles of one output stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionState {
    pub(crate) font_width: u8,
    pub(crate) font_height: u8,

    // ESC toggles
    pub(crate) underline: u8,
    pub(crate) emphasize: u8,
    pub(crate) upsidedown: u8,
    pub(crate) rotate: u8,

    // GS toggles
    pub(crate) reverse: u8,
    pub(crate) smooth: u8,
}

impl SessionState {
    /// Return every toggle to its power-on value
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Character width multiplier (1-8)
    pub fn font_width(&self) -> u8 {
        self.font_width
    }

    /// Character height multiplier (1-8)
    pub fn font_height(&self) -> u8 {
        self.font_height
    }

    pub fn underline(&self) -> u8 {
        self.underline
    }

    pub fn emphasize(&self) -> u8 {
        self.emphasize
    }

    pub fn upsidedown(&self) -> u8 {
        self.upsidedown
    }

    pub fn rotate(&self) -> u8 {
        self.rotate
    }

    pub fn reverse(&self) -> u8 {
        self.reverse
    }

    pub fn smooth(&self) -> u8 {
        self.smooth
    }

    /// Whether every toggle is at its default
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            font_width: 1,
            font_height: 1,
            underline: 0,
            emphasize: 0,
            upsidedown: 0,
            rotate: 0,
            reverse: 0,
            smooth: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset() {
        let mut state = SessionState {
            font_width: 3,
            font_height: 8,
            underline: 1,
            emphasize: 1,
            upsidedown: 1,
            rotate: 1,
            reverse: 1,
            smooth: 1,
        };
        assert!(!state.is_default());

        state.reset();
        assert!(state.is_default());
        assert_eq!(state.font_width(), 1);
        assert_eq!(state.font_height(), 1);
        assert_eq!(state.underline(), 0);
    }
}
