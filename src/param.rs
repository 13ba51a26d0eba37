//! Parameter model for the component under test.
//!
//! The module exposes three parameters. Two are writable and range-checked,
//! one is a read-only string derived from the other two:
//!
//! | Name | Domain | Rendering |
//! |---|---|---|
//! | `idx` | 0..=63 | decimal |
//! | `ch_val` | 0..=255 | `<glyph> (<code>)` |
//! | `my_str` | read-only | raw string |

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest index accepted by `idx`.
pub const IDX_MAX: u64 = 63;
/// Largest code accepted by `ch_val`.
pub const CH_VAL_MAX: u64 = 255;

/// Documented defaults of a freshly loaded module.
pub const DEFAULT_IDX: &str = "0";
pub const DEFAULT_CH_VAL: u8 = b'A';
pub const DEFAULT_MY_STR: &str = "Default string";

/// One named parameter of the component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamName {
    Idx,
    ChVal,
    MyStr,
}

impl ParamName {
    /// Every parameter, in restore order (index before value).
    pub const ALL: [ParamName; 3] = [ParamName::Idx, ParamName::ChVal, ParamName::MyStr];

    /// File name under the module's `parameters/` directory.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idx => "idx",
            Self::ChVal => "ch_val",
            Self::MyStr => "my_str",
        }
    }

    pub fn domain(&self) -> Domain {
        match self {
            Self::Idx => Domain::Range { min: 0, max: IDX_MAX },
            Self::ChVal => Domain::Range { min: 0, max: CH_VAL_MAX },
            Self::MyStr => Domain::ReadOnly,
        }
    }

    pub fn is_writable(&self) -> bool {
        self.domain() != Domain::ReadOnly
    }

    /// Convert a value as read back from the component into the text that
    /// writes the same value again.
    ///
    /// `ch_val` reads as `X (88)` but only accepts `88`. Read-only parameters
    /// have no restore text.
    pub fn restore_text(&self, rendered: &str) -> Option<String> {
        match self {
            Self::Idx => Some(rendered.trim().to_string()),
            Self::ChVal => CharRendering::parse(rendered).map(|r| r.code.to_string()),
            Self::MyStr => None,
        }
    }
}

impl fmt::Display for ParamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown parameter: {0} (expected idx, ch_val or my_str)")]
pub struct UnknownParam(pub String);

impl FromStr for ParamName {
    type Err = UnknownParam;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idx" => Ok(Self::Idx),
            "ch_val" => Ok(Self::ChVal),
            "my_str" => Ok(Self::MyStr),
            other => Err(UnknownParam(other.to_string())),
        }
    }
}

/// Validity domain of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Domain {
    /// Unsigned decimal within `min..=max`.
    Range { min: u64, max: u64 },
    /// Writes must never change the stored value.
    ReadOnly,
}

impl Domain {
    /// Whether a written text is inside the domain.
    pub fn admits(&self, text: &str) -> bool {
        match self {
            Domain::Range { min, max } => {
                parse_unsigned(text).is_some_and(|v| v >= *min && v <= *max)
            }
            Domain::ReadOnly => false,
        }
    }
}

/// Parse written text the way the component does: unsigned decimal with an
/// optional trailing newline, nothing else. Values past `u64` are refused.
pub fn parse_unsigned(text: &str) -> Option<u64> {
    let text = text.strip_suffix('\n').unwrap_or(text);
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Domain::Range { min, max } => write!(f, "{}-{}", min, max),
            Domain::ReadOnly => f.write_str("read-only"),
        }
    }
}

/// A byte value shown alongside its glyph, e.g. `A (65)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharRendering {
    pub glyph: char,
    pub code: u8,
}

fn rendering_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // The glyph may be a space or unprintable, so anchor on the code.
    RE.get_or_init(|| Regex::new(r"(?s)^(.)?\s*\((\d{1,3})\)\s*$").expect("static pattern"))
}

impl CharRendering {
    pub fn new(code: u8) -> Self {
        Self {
            glyph: char::from(code),
            code,
        }
    }

    /// Parse a rendering as read from the component.
    ///
    /// Returns `None` when the text has no `(<code>)` suffix or the code does
    /// not fit a byte.
    pub fn parse(text: &str) -> Option<Self> {
        let caps = rendering_re().captures(text.trim_end())?;
        let code: u8 = caps.get(2)?.as_str().parse().ok()?;
        Some(Self::new(code))
    }
}

impl fmt::Display for CharRendering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.glyph, self.code)
    }
}
