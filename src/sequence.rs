//! Play-sequence planning — pure logic, no device I/O.
//!
//! [`plan`] turns a logical sequence of pattern entries into the device
//! actions the controller must take: nothing, a single fade, or a set of
//! pattern-memory writes followed by one play-loop command. The divergent
//! mk1/mk2 addressing rules live here so they can be tested without a
//! transport.

use crate::error::Blink1Error;
use crate::models::{Generation, PatternEntry};

/// What a sequence request amounts to on the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceAction {
    /// Empty request — touch nothing.
    Noop,
    /// One entry degenerates into a plain fade; a loop of length one is
    /// equivalent to a static fade.
    Fade(PatternEntry),
    /// Program pattern memory, then start the loop.
    Program(SequencePlan),
}

/// Pattern-memory writes (ascending slot order) plus the play-loop bounds.
/// All writes must be issued before the loop command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencePlan {
    /// `(slot, entry)` pairs in write order.
    pub writes: Vec<(u8, PatternEntry)>,
    pub start: u8,
    pub stop: u8,
    pub count: u8,
}

/// Plan a sequence request for the given hardware generation.
///
/// Fails fast with [`Blink1Error::SequenceTooLong`] when the entries do not
/// fit pattern memory from `start` — before any plan exists, so a rejected
/// request causes zero device traffic.
///
/// mk1 cannot loop a sub-range: the entry list is padded with black
/// zero-fade filler to full capacity and the loop command uses the
/// device's loop-everything sentinel (start=0, stop=0, count=0). mk2 writes
/// only the requested entries and loops `start..=start + len - 1` with the
/// caller's repeat count.
pub fn plan(
    entries: &[PatternEntry],
    start: u8,
    count: u8,
    generation: Generation,
) -> crate::error::Result<SequenceAction> {
    if entries.is_empty() {
        return Ok(SequenceAction::Noop);
    }

    let capacity = generation.pattern_slots();
    if entries.len() + start as usize > capacity {
        return Err(Blink1Error::SequenceTooLong {
            len: entries.len(),
            start,
            capacity,
        });
    }

    if let [entry] = entries {
        return Ok(SequenceAction::Fade(*entry));
    }

    let plan = if generation.supports_range_loop() {
        SequencePlan {
            writes: slot_writes(entries, start),
            start,
            stop: start + entries.len() as u8 - 1,
            count,
        }
    } else {
        // Pad to full capacity and loop everything.
        let mut padded = entries.to_vec();
        padded.resize(capacity, PatternEntry::OFF);
        SequencePlan {
            writes: slot_writes(&padded, start),
            start: 0,
            stop: 0,
            count: 0,
        }
    };
    Ok(SequenceAction::Program(plan))
}

fn slot_writes(entries: &[PatternEntry], start: u8) -> Vec<(u8, PatternEntry)> {
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| (start + i as u8, *entry))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;

    fn entry(r: u8, fade_ms: u16) -> PatternEntry {
        PatternEntry::new(Rgb::new(r, 0, 0), fade_ms)
    }

    #[test]
    fn empty_is_noop() {
        for generation in [Generation::Mk1, Generation::Mk2] {
            assert_eq!(
                plan(&[], 0, 3, generation).unwrap(),
                SequenceAction::Noop
            );
        }
    }

    #[test]
    fn single_entry_is_fade() {
        let e = entry(200, 150);
        assert_eq!(
            plan(&[e], 0, 3, Generation::Mk2).unwrap(),
            SequenceAction::Fade(e)
        );
        assert_eq!(
            plan(&[e], 0, 0, Generation::Mk1).unwrap(),
            SequenceAction::Fade(e)
        );
    }

    #[test]
    fn too_long_rejected_before_planning() {
        let entries = vec![entry(1, 0); 13];
        let err = plan(&entries, 0, 0, Generation::Mk1).unwrap_err();
        assert!(matches!(
            err,
            Blink1Error::SequenceTooLong {
                len: 13,
                start: 0,
                capacity: 12
            }
        ));
    }

    #[test]
    fn start_offset_counts_against_capacity() {
        // 30 entries at position 5 overflow mk2's 32 slots.
        let entries = vec![entry(1, 0); 30];
        assert!(plan(&entries, 5, 0, Generation::Mk2).is_err());
        // 27 entries at position 5 exactly fit.
        let entries = vec![entry(1, 0); 27];
        assert!(plan(&entries, 5, 0, Generation::Mk2).is_ok());
    }

    #[test]
    fn single_entry_still_capacity_checked() {
        // One entry at an out-of-range start is rejected before the
        // fade fast path, matching the check order.
        let err = plan(&[entry(1, 0)], 32, 0, Generation::Mk2).unwrap_err();
        assert!(matches!(err, Blink1Error::SequenceTooLong { .. }));
    }

    #[test]
    fn mk1_pads_to_full_capacity_and_loops_everything() {
        let entries = vec![entry(10, 100), entry(20, 200), entry(30, 300)];
        let SequenceAction::Program(p) = plan(&entries, 0, 5, Generation::Mk1).unwrap() else {
            panic!("expected a program");
        };

        assert_eq!(p.writes.len(), 12);
        // Requested entries first, in order.
        assert_eq!(p.writes[0], (0, entry(10, 100)));
        assert_eq!(p.writes[2], (2, entry(30, 300)));
        // Remainder is black zero-fade filler.
        for (pos, e) in &p.writes[3..] {
            assert_eq!(*e, PatternEntry::OFF, "slot {pos} should be filler");
        }
        // Loop-everything sentinel; the caller's repeat count is ignored.
        assert_eq!((p.start, p.stop, p.count), (0, 0, 0));
    }

    #[test]
    fn mk1_padded_writes_keep_caller_origin() {
        let entries = vec![entry(1, 1), entry(2, 2)];
        let SequenceAction::Program(p) = plan(&entries, 3, 0, Generation::Mk1).unwrap() else {
            panic!("expected a program");
        };
        assert_eq!(p.writes.len(), 12);
        assert_eq!(p.writes[0].0, 3);
        assert_eq!(p.writes[11].0, 14);
        assert_eq!((p.start, p.stop, p.count), (0, 0, 0));
    }

    #[test]
    fn mk2_writes_only_requested_entries() {
        let entries = vec![entry(10, 100), entry(20, 200), entry(30, 300)];
        let SequenceAction::Program(p) = plan(&entries, 4, 2, Generation::Mk2).unwrap() else {
            panic!("expected a program");
        };

        assert_eq!(
            p.writes,
            vec![
                (4, entry(10, 100)),
                (5, entry(20, 200)),
                (6, entry(30, 300)),
            ]
        );
        assert_eq!((p.start, p.stop, p.count), (4, 6, 2));
    }

    #[test]
    fn mk2_stop_is_start_plus_len_minus_one() {
        let entries = vec![entry(1, 0); 8];
        let SequenceAction::Program(p) = plan(&entries, 0, 0, Generation::Mk2).unwrap() else {
            panic!("expected a program");
        };
        assert_eq!(p.stop, 7);
    }

    #[test]
    fn writes_are_ascending() {
        let entries = vec![entry(1, 0); 6];
        for generation in [Generation::Mk1, Generation::Mk2] {
            let SequenceAction::Program(p) = plan(&entries, 2, 0, generation).unwrap() else {
                panic!("expected a program");
            };
            let slots: Vec<u8> = p.writes.iter().map(|(pos, _)| *pos).collect();
            let mut sorted = slots.clone();
            sorted.sort_unstable();
            assert_eq!(slots, sorted, "{generation}: writes must ascend");
        }
    }

    #[test]
    fn full_capacity_sequence_fits() {
        let entries = vec![entry(1, 0); 32];
        let SequenceAction::Program(p) = plan(&entries, 0, 1, Generation::Mk2).unwrap() else {
            panic!("expected a program");
        };
        assert_eq!(p.writes.len(), 32);
        assert_eq!(p.stop, 31);
    }
}
