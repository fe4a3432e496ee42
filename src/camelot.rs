//! Camelot wheel key handling.
//!
//! The wheel arranges the 24 keys in twelve numbered positions with a minor
//! (`A`) and major (`B`) variant each. Adjacent numbers are a perfect fifth
//! apart; the same number with the other letter is the relative major/minor.
//!
//! Keys are accepted in three notations and normalised onto the wheel:
//! - Camelot: `8A`, `12b`
//! - Open Key: `1m`, `6d` (same wheel, shifted numbering)
//! - Musical names: `Am`, `A minor`, `C`, `F#m`, `Bb major`

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Minor,
    Major,
}

impl Mode {
    fn letter(self) -> char {
        match self {
            Mode::Minor => 'A',
            Mode::Major => 'B',
        }
    }
}

/// Wheel number per pitch class (C = 0 .. B = 11), minor keys
const MINOR_WHEEL: [u8; 12] = [5, 12, 7, 2, 9, 4, 11, 6, 1, 8, 3, 10];
/// Wheel number per pitch class (C = 0 .. B = 11), major keys
const MAJOR_WHEEL: [u8; 12] = [8, 3, 10, 5, 12, 7, 2, 9, 4, 11, 6, 1];

/// A position on the Camelot wheel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CamelotKey {
    number: u8,
    mode: Mode,
}

impl CamelotKey {
    /// Build a key from a wheel number (1-12) and mode
    pub fn new(number: u8, mode: Mode) -> Option<Self> {
        (1..=12).contains(&number).then_some(Self { number, mode })
    }

    pub fn number(self) -> u8 {
        self.number
    }

    pub fn mode(self) -> Mode {
        self.mode
    }

    /// Parse any supported notation. Returns `None` for unrecognised labels.
    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim();
        let first = label.chars().next()?;
        if first.is_ascii_digit() {
            parse_numbered(label)
        } else {
            parse_musical(label)
        }
    }

    /// Shortest distance around the wheel, ignoring mode (0-6)
    pub fn wheel_distance(self, other: Self) -> u8 {
        let diff = self.number.abs_diff(other.number);
        diff.min(12 - diff)
    }

    /// Same number with the other letter
    pub fn is_relative(self, other: Self) -> bool {
        self.number == other.number && self.mode != other.mode
    }

    /// Keys a DJ can mix into safely: one step either way, or the relative key
    pub fn is_wheel_neighbor(self, other: Self) -> bool {
        self.is_relative(other) || (self.mode == other.mode && self.wheel_distance(other) == 1)
    }
}

impl fmt::Display for CamelotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.number, self.mode.letter())
    }
}

/// Camelot (`8A`) or Open Key (`1m`) notation
fn parse_numbered(label: &str) -> Option<CamelotKey> {
    let digits: String = label.chars().take_while(char::is_ascii_digit).collect();
    let number: u8 = digits.parse().ok()?;
    let suffix = label[digits.len()..].trim().to_ascii_lowercase();

    match suffix.as_str() {
        "a" => CamelotKey::new(number, Mode::Minor),
        "b" => CamelotKey::new(number, Mode::Major),
        // Open Key 1 sits on Camelot 8
        "m" | "d" if (1..=12).contains(&number) => {
            let camelot = (number + 6) % 12 + 1;
            let mode = if suffix == "m" { Mode::Minor } else { Mode::Major };
            CamelotKey::new(camelot, mode)
        }
        _ => None,
    }
}

/// Musical names such as `Am`, `C# minor`, `Bb`, `E major`
fn parse_musical(label: &str) -> Option<CamelotKey> {
    let mut chars = label.chars();
    let base: i32 = match chars.next()?.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let rest = chars.as_str();
    let (shift, rest) = if let Some(r) = rest.strip_prefix(&['#', '♯'][..]) {
        (1, r)
    } else if let Some(r) = rest.strip_prefix(&['b', '♭'][..]) {
        (-1, r)
    } else {
        (0, rest)
    };

    let mode = match rest.trim().to_ascii_lowercase().as_str() {
        "" | "maj" | "major" => Mode::Major,
        "m" | "min" | "minor" => Mode::Minor,
        _ => return None,
    };

    let pitch = usize::try_from((base + shift).rem_euclid(12)).ok()?;
    let number = match mode {
        Mode::Minor => MINOR_WHEEL[pitch],
        Mode::Major => MAJOR_WHEEL[pitch],
    };
    CamelotKey::new(number, mode)
}
