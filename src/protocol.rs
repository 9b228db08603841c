//! Protocol constants for blink(1) devices.
//!
//! Values match the blink1-lib C library and the device firmware. The two
//! hardware generations share the command set but differ in pattern-memory
//! capacity and play-loop addressing (see [`crate::models::Generation`]).

// ── Status codes ──

/// Error sentinel returned by status-checked transport commands.
///
/// Every command except close/enumerate/cached-serial signals failure by
/// returning this value.
pub const STATUS_ERROR: i32 = -1;

// ── Pattern memory ──

/// Pattern-memory slots on mk1 hardware.
pub const MK1_PATTERN_SLOTS: usize = 12;

/// Pattern-memory slots on mk2 hardware.
pub const MK2_PATTERN_SLOTS: usize = 32;

// ── Controller defaults ──

/// Default fade duration in milliseconds.
pub const DEFAULT_FADE_MS: u16 = 300;

/// Default blink half-cycle delay in milliseconds.
pub const DEFAULT_DELAY_MS: u16 = 500;

/// Default blink repeat count.
pub const DEFAULT_REPEAT: u8 = 3;

// ── USB identifiers (informational; enumeration happens in the transport) ──

/// ThingM vendor ID.
pub const BLINK1_VID: u16 = 0x27B8;

/// blink(1) product ID.
pub const BLINK1_PID: u16 = 0x01ED;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mk2_capacity_larger_than_mk1() {
        assert!(MK2_PATTERN_SLOTS > MK1_PATTERN_SLOTS);
    }

    #[test]
    fn pattern_slot_counts() {
        assert_eq!(MK1_PATTERN_SLOTS, 12);
        assert_eq!(MK2_PATTERN_SLOTS, 32);
    }

    #[test]
    fn capacities_fit_in_slot_index() {
        // Slot positions travel as u8 over the wire.
        const { assert!(MK2_PATTERN_SLOTS <= u8::MAX as usize) };
    }

    #[test]
    fn status_error_is_negative() {
        assert!(STATUS_ERROR < 0);
    }
}
