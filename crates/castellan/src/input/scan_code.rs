//! Physical key codes

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::sys::input::NUM_SCANCODES;

/// Position of a key on the keyboard, independent of layout.
///
/// Values follow the USB HID usage table, so `ScanCode::A` is the key where
/// `A` sits on a US layout regardless of what the active layout prints on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanCode(u16);

macro_rules! scan_codes {
    ($($name:ident = $value:expr, $label:expr;)*) => {
        impl ScanCode {
            $(
                #[doc = concat!("The `", $label, "` key.")]
                pub const $name: Self = Self($value);
            )*
        }

        const NAMES: &[(ScanCode, &str)] = &[$((ScanCode::$name, $label)),*];
    };
}

scan_codes! {
    A = 4, "A";
    B = 5, "B";
    C = 6, "C";
    D = 7, "D";
    E = 8, "E";
    F = 9, "F";
    G = 10, "G";
    H = 11, "H";
    I = 12, "I";
    J = 13, "J";
    K = 14, "K";
    L = 15, "L";
    M = 16, "M";
    N = 17, "N";
    O = 18, "O";
    P = 19, "P";
    Q = 20, "Q";
    R = 21, "R";
    S = 22, "S";
    T = 23, "T";
    U = 24, "U";
    V = 25, "V";
    W = 26, "W";
    X = 27, "X";
    Y = 28, "Y";
    Z = 29, "Z";
    ONE = 30, "1";
    TWO = 31, "2";
    THREE = 32, "3";
    FOUR = 33, "4";
    FIVE = 34, "5";
    SIX = 35, "6";
    SEVEN = 36, "7";
    EIGHT = 37, "8";
    NINE = 38, "9";
    ZERO = 39, "0";
    ENTER = 40, "Return";
    ESCAPE = 41, "Escape";
    BACKSPACE = 42, "Backspace";
    TAB = 43, "Tab";
    SPACE = 44, "Space";
    F1 = 58, "F1";
    F2 = 59, "F2";
    F3 = 60, "F3";
    F4 = 61, "F4";
    F5 = 62, "F5";
    F6 = 63, "F6";
    F7 = 64, "F7";
    F8 = 65, "F8";
    F9 = 66, "F9";
    F10 = 67, "F10";
    F11 = 68, "F11";
    F12 = 69, "F12";
    RIGHT = 79, "Right";
    LEFT = 80, "Left";
    DOWN = 81, "Down";
    UP = 82, "Up";
    LEFT_CTRL = 224, "Left Ctrl";
    LEFT_SHIFT = 225, "Left Shift";
    LEFT_ALT = 226, "Left Alt";
    LEFT_GUI = 227, "Left GUI";
    RIGHT_CTRL = 228, "Right Ctrl";
    RIGHT_SHIFT = 229, "Right Shift";
    RIGHT_ALT = 230, "Right Alt";
    RIGHT_GUI = 231, "Right GUI";
}

impl ScanCode {
    /// Code for keys the platform could not identify.
    pub const UNKNOWN: Self = Self(0);

    /// Wraps a raw code. Codes past the keyboard array map to [`UNKNOWN`](Self::UNKNOWN).
    pub const fn new(code: u16) -> Self {
        if (code as usize) < NUM_SCANCODES {
            Self(code)
        } else {
            Self::UNKNOWN
        }
    }

    /// Looks a key up by its name, ignoring case. Unknown names give
    /// [`UNKNOWN`](Self::UNKNOWN).
    pub fn from_name(name: &str) -> Self {
        NAMES
            .iter()
            .find(|(_, label)| label.eq_ignore_ascii_case(name))
            .map_or(Self::UNKNOWN, |(code, _)| *code)
    }

    /// Human readable key name, empty for keys without one.
    pub fn name(self) -> &'static str {
        NAMES
            .iter()
            .find(|(code, _)| *code == self)
            .map_or("", |(_, label)| label)
    }

    /// The raw code.
    pub const fn get(self) -> u16 {
        self.0
    }

    /// Whether this is [`UNKNOWN`](Self::UNKNOWN).
    pub const fn is_unknown(self) -> bool {
        self.0 == Self::UNKNOWN.0
    }

    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<ScanCode> for u16 {
    fn from(code: ScanCode) -> Self {
        code.0
    }
}

impl fmt::Display for ScanCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scan_code{{key: {}}}", self.name())
    }
}
