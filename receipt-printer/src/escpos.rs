//! ESC/POS wire encoders
//!
//! Every function here returns the exact byte sequence for one command.
//! Nothing in this module touches session state or a sink; the
//! [`Formatter`](crate::Formatter) decides when each sequence is written.

use std::str::FromStr;

use crate::error::ConfigurationError;

/// ASCII ESC
pub const ESC: u8 = 0x1B;
/// ASCII GS (group separator)
pub const GS: u8 = 0x1D;
/// ASCII LF
pub const LF: u8 = 0x0A;
/// ASCII NUL
pub const NUL: u8 = 0x00;

/// Largest payload a graphics frame can carry (16-bit length minus mode/fn bytes)
pub const MAX_GRAPHICS_PAYLOAD: usize = u16::MAX as usize - 2;

// === Named parameter tables ===

/// Printer font
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    A = 0,
    B = 1,
    C = 2,
}

impl FromStr for Font {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            "C" => Ok(Self::C),
            other => Err(ConfigurationError::InvalidFont {
                value: other.to_string(),
            }),
        }
    }
}

/// Line justification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left = 0,
    Center = 1,
    Right = 2,
}

impl FromStr for Alignment {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(Self::Left),
            "center" => Ok(Self::Center),
            "right" => Ok(Self::Right),
            other => Err(ConfigurationError::InvalidAlignment {
                value: other.to_string(),
            }),
        }
    }
}

/// International character set, selected with `ESC R n`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    English = 0,
    French = 1,
    German = 2,
    UnitedKingdom = 3,
    Danish = 4,
    Swedish = 5,
    Italian = 6,
    Spanish = 7,
    Japanese = 8,
    Norwegian = 9,
}

impl FromStr for Language {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lang = match s {
            "en" => Self::English,
            "fr" => Self::French,
            "de" => Self::German,
            "uk" => Self::UnitedKingdom,
            "da" => Self::Danish,
            "sv" => Self::Swedish,
            "it" => Self::Italian,
            "es" => Self::Spanish,
            "ja" => Self::Japanese,
            "no" => Self::Norwegian,
            other => {
                return Err(ConfigurationError::InvalidLanguage {
                    value: other.to_string(),
                });
            }
        };
        Ok(lang)
    }
}

/// Barcode system byte for `GS k`
///
/// Formats 0-4 and 73 have a code; every other format is sent without one.
pub fn barcode_code(format: i32) -> Option<u8> {
    match format {
        0..=4 => Some(format as u8),
        73 => Some(0x49),
        _ => None,
    }
}

// === Session ===

/// Initialize printer (ESC @)
pub fn init() -> [u8; 2] {
    [ESC, b'@']
}

/// End of output marker
pub fn end() -> [u8; 1] {
    [0xFA]
}

// === Paper Control ===

/// Full cut (GS V A 0)
pub fn cut() -> [u8; 4] {
    [GS, b'V', b'A', b'0']
}

/// Partial cut (GS V 1)
pub fn cut_partial() -> [u8; 3] {
    [GS, b'V', 0x01]
}

/// Print and feed n lines (ESC d n)
pub fn formfeed(lines: u8) -> [u8; 3] {
    [ESC, b'd', lines]
}

// === Cash Drawer ===

/// Drawer kick on pin 2, 2ms pulse (ESC p 2)
pub fn pulse() -> [u8; 3] {
    [ESC, b'p', 0x02]
}

/// Drawer kick on pin 2 with explicit on/off times (ESC p 0 t1 t2)
pub fn cash() -> [u8; 5] {
    [ESC, b'p', 0x00, 0x0A, 0xFF]
}

// === Text Style ===

/// Select font (ESC M n)
pub fn font(font: Font) -> [u8; 3] {
    [ESC, b'M', font as u8]
}

/// Character size (GS ! n), width and height in 1-8
///
/// Zero is treated as 1; values above 8 are masked to the low three bits.
pub fn font_size(width: u8, height: u8) -> [u8; 3] {
    let w = width.saturating_sub(1) & 0x07;
    let h = height.saturating_sub(1) & 0x07;
    [GS, b'!', (w << 4) | h]
}

/// Underline (ESC - n)
pub fn underline(n: u8) -> [u8; 3] {
    [ESC, b'-', n]
}

/// Emphasized / double-strike (ESC G n)
pub fn emphasize(n: u8) -> [u8; 3] {
    [ESC, b'G', n]
}

/// Upside-down mode (ESC { n)
pub fn upsidedown(n: u8) -> [u8; 3] {
    [ESC, b'{', n]
}

/// Rotate (ESC R n)
///
/// Shares its opcode with [`language`]; printers interpret it as a
/// character-set switch.
pub fn rotate(n: u8) -> [u8; 3] {
    [ESC, b'R', n]
}

/// White/black reverse (GS B n)
pub fn reverse(n: u8) -> [u8; 3] {
    [GS, b'B', n]
}

/// Smoothing (GS b n)
pub fn smooth(n: u8) -> [u8; 3] {
    [GS, b'b', n]
}

/// Justification (ESC a n)
pub fn align(alignment: Alignment) -> [u8; 3] {
    [ESC, b'a', alignment as u8]
}

/// International character set (ESC R n)
pub fn language(language: Language) -> [u8; 3] {
    [ESC, b'R', language as u8]
}

// === Positioning ===

/// Absolute horizontal position in dots (ESC $ nL nH)
pub fn move_x(dots: u16) -> [u8; 4] {
    let [lo, hi] = dots.to_le_bytes();
    [ESC, b'$', lo, hi]
}

/// Vertical position in dots (GS $ nL nH)
pub fn move_y(dots: u16) -> [u8; 4] {
    let [lo, hi] = dots.to_le_bytes();
    [GS, b'$', lo, hi]
}

// === Graphics ===

/// Graphics frame header (ESC ( L pL pH m fn)
///
/// The length field counts the mode and function bytes plus the payload.
pub fn graphics_header(
    mode: u8,
    function: u8,
    payload_len: usize,
) -> Result<[u8; 7], ConfigurationError> {
    if payload_len > MAX_GRAPHICS_PAYLOAD {
        return Err(ConfigurationError::PayloadTooLong {
            key: "image".to_string(),
            len: payload_len,
        });
    }
    let [lo, hi] = ((payload_len + 2) as u16).to_le_bytes();
    Ok([ESC, b'(', b'L', lo, hi, mode, function])
}
