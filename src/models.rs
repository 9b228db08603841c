//! Data model — hardware generation, pattern entries, play state.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::protocol::{MK1_PATTERN_SLOTS, MK2_PATTERN_SLOTS};

/// Hardware generation of a blink(1) device.
///
/// The generation determines pattern-memory capacity and whether the play
/// loop can address a sub-range of pattern memory (mk2) or only the whole
/// memory (mk1). Detected by a transport probe, never user-supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Generation {
    Mk1,
    Mk2,
}

impl Generation {
    /// Pattern-memory capacity in slots for this generation.
    pub fn pattern_slots(self) -> usize {
        match self {
            Generation::Mk1 => MK1_PATTERN_SLOTS,
            Generation::Mk2 => MK2_PATTERN_SLOTS,
        }
    }

    /// Whether the play loop can target a sub-range of pattern memory.
    pub fn supports_range_loop(self) -> bool {
        matches!(self, Generation::Mk2)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Generation::Mk1 => write!(f, "mk1"),
            Generation::Mk2 => write!(f, "mk2"),
        }
    }
}

/// One addressable slot of device pattern memory: a color plus the fade
/// duration (in device milliseconds) used to reach it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternEntry {
    pub color: Rgb,
    pub fade_ms: u16,
}

impl PatternEntry {
    /// Black with zero fade — the mk1 padding filler.
    pub const OFF: PatternEntry = PatternEntry {
        color: Rgb::BLACK,
        fade_ms: 0,
    };

    pub const fn new(color: Rgb, fade_ms: u16) -> Self {
        PatternEntry { color, fade_ms }
    }
}

/// Live play-loop state read back from the device.
///
/// A snapshot, never cached — re-queried on every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlayState {
    pub playing: bool,
    pub start: u8,
    pub stop: u8,
    pub count: u8,
    pub pos: u8,
}

/// A device found in the transport's enumeration cache.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveredDevice {
    /// Position in the enumeration cache.
    pub index: i32,
    /// Serial number, lossily decoded for display.
    pub serial: String,
    pub generation: Generation,
}
