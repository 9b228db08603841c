//! High-level blink(1) controller — colors, blinking, pattern playback.

use std::cell::OnceCell;
use std::thread;
use std::time::Duration;

use crate::color::Rgb;
use crate::config::Defaults;
use crate::handle::{DeviceError, DeviceHandle, Session};
use crate::models::{DiscoveredDevice, Generation, PatternEntry, PlayState};
use crate::sequence::{self, SequenceAction};
use crate::transport::Blink1Transport;

/// Controller for one blink(1) device.
///
/// Wraps a [`DeviceHandle`]: the transport opens on the first operation and
/// closes when the operation's session ends, with nested operations sharing
/// one open connection. Hardware generation and firmware version are
/// detected on first use and cached for the controller's lifetime.
///
/// Single-threaded and blocking throughout — every operation is a
/// synchronous round-trip, and [`blink`](Self::blink) sleeps on the calling
/// thread for its whole duration.
#[derive(Debug)]
pub struct Blink1<T: Blink1Transport> {
    handle: DeviceHandle<T>,
    generation: OnceCell<Generation>,
    firmware: OnceCell<i32>,
    default_color: Rgb,
    default_fade_ms: u16,
    default_delay_ms: u16,
    default_repeat: u8,
}

impl<T: Blink1Transport> Blink1<T> {
    /// Bind to an explicit serial number. No device contact happens here.
    pub fn from_serial(transport: T, serial: impl Into<Vec<u8>>) -> Self {
        Blink1 {
            handle: DeviceHandle::new(transport, serial),
            generation: OnceCell::new(),
            firmware: OnceCell::new(),
            default_color: Rgb::WHITE,
            default_fade_ms: crate::protocol::DEFAULT_FADE_MS,
            default_delay_ms: crate::protocol::DEFAULT_DELAY_MS,
            default_repeat: crate::protocol::DEFAULT_REPEAT,
        }
    }

    /// Bind to the nth device in the transport's enumeration cache.
    ///
    /// Refreshes the cache first; fails with `NoDeviceFound` when the cache
    /// is empty or has no entry at `index`.
    pub fn from_index(transport: T, index: i32) -> crate::error::Result<Self> {
        let found = transport.enumerate();
        log::debug!("enumerate() -> {found}");
        if found == 0 {
            return Err(DeviceError::NoDeviceFound.into());
        }
        let serial = transport.cached_serial(index);
        log::debug!("get_cached_serial({index}) -> {serial:?}");
        let serial = serial.ok_or(DeviceError::NoDeviceFound)?;
        Ok(Self::from_serial(transport, serial))
    }

    /// Bind to the first enumerated device.
    pub fn first(transport: T) -> crate::error::Result<Self> {
        Self::from_index(transport, 0)
    }

    /// Construct from a [`Defaults`] config: the preferred serial when one
    /// is set, otherwise the first enumerated device, with the config's
    /// color/fade/delay/repeat defaults applied.
    pub fn from_defaults(transport: T, defaults: &Defaults) -> crate::error::Result<Self> {
        let controller = if defaults.device_serial.trim().is_empty() {
            Self::first(transport)?
        } else {
            Self::from_serial(transport, defaults.device_serial.trim().as_bytes().to_vec())
        };
        controller.with_defaults(defaults)
    }

    /// Replace the built-in defaults (white, 300 ms fade, 500 ms delay,
    /// 3 repeats) with the config's values.
    pub fn with_defaults(mut self, defaults: &Defaults) -> crate::error::Result<Self> {
        self.default_color = defaults.resolved_color()?;
        self.default_fade_ms = defaults.fade_ms;
        self.default_delay_ms = defaults.delay_ms;
        self.default_repeat = defaults.repeat;
        Ok(self)
    }

    /// The serial number this controller is bound to.
    pub fn serial(&self) -> &[u8] {
        self.handle.serial()
    }

    /// The underlying reference-counted handle.
    pub fn handle(&self) -> &DeviceHandle<T> {
        &self.handle
    }

    // ── Capability detection ──

    /// Hardware generation, detected once and cached.
    ///
    /// Detection refreshes the transport's enumeration cache before probing,
    /// since the serial-to-generation mapping depends on a freshly populated
    /// device cache.
    pub fn hardware_generation(&self) -> crate::error::Result<Generation> {
        if let Some(generation) = self.generation.get() {
            return Ok(*generation);
        }
        // Fire-and-forget: the count is logged but never validated.
        let found = self.handle.transport().enumerate();
        log::debug!("enumerate() -> {found}");

        let session = self.handle.acquire()?;
        let generation = if session.is_mk2()? {
            Generation::Mk2
        } else {
            Generation::Mk1
        };
        drop(session);

        Ok(*self.generation.get_or_init(|| generation))
    }

    /// Pattern-memory capacity in slots for the detected generation.
    pub fn capacity(&self) -> crate::error::Result<usize> {
        Ok(self.hardware_generation()?.pattern_slots())
    }

    /// Firmware version, queried once and cached.
    pub fn firmware_version(&self) -> crate::error::Result<i32> {
        if let Some(version) = self.firmware.get() {
            return Ok(*version);
        }
        let session = self.handle.acquire()?;
        let version = session.version()?;
        drop(session);
        Ok(*self.firmware.get_or_init(|| version))
    }

    // ── Color / fade ──

    /// Fade to `color` over `fade_ms`; all LEDs when `led` is `None`,
    /// one addressable LED otherwise.
    pub fn on(&self, color: Rgb, fade_ms: u16, led: Option<u8>) -> crate::error::Result<()> {
        let session = self.handle.acquire()?;
        Self::fade(&session, color, fade_ms, led)?;
        Ok(())
    }

    /// Fade all LEDs to the default color over the default fade.
    pub fn turn_on(&self) -> crate::error::Result<()> {
        self.on(self.default_color, self.default_fade_ms, None)
    }

    /// Fade to black.
    pub fn off(&self, fade_ms: u16, led: Option<u8>) -> crate::error::Result<()> {
        self.on(Rgb::BLACK, fade_ms, led)
    }

    /// Fade all LEDs to black over the default fade.
    pub fn turn_off(&self) -> crate::error::Result<()> {
        self.off(self.default_fade_ms, None)
    }

    /// Blocking blink: alternate `color` and black `repeat` times, sleeping
    /// the full `delay_ms` after every half-cycle.
    ///
    /// The calling thread is suspended for the whole
    /// `repeat * 2 * delay_ms`; there is no cancellation mid-sequence. The
    /// handle is acquired once for the entire operation.
    pub fn blink(
        &self,
        color: Rgb,
        fade_ms: u16,
        delay_ms: u16,
        led: Option<u8>,
        repeat: u8,
    ) -> crate::error::Result<()> {
        let session = self.handle.acquire()?;
        let delay = Duration::from_millis(u64::from(delay_ms));
        for _ in 0..repeat {
            Self::fade(&session, color, fade_ms, led)?;
            thread::sleep(delay);
            Self::fade(&session, Rgb::BLACK, fade_ms, led)?;
            thread::sleep(delay);
        }
        Ok(())
    }

    /// Blocking blink with the controller defaults.
    pub fn blink_default(&self) -> crate::error::Result<()> {
        self.blink(
            self.default_color,
            self.default_fade_ms,
            self.default_delay_ms,
            None,
            self.default_repeat,
        )
    }

    fn fade(
        session: &Session<'_, T>,
        color: Rgb,
        fade_ms: u16,
        led: Option<u8>,
    ) -> crate::handle::Result<()> {
        match led {
            None => session.fade_to_rgb(fade_ms, color),
            Some(led) => session.fade_to_rgb_n(fade_ms, color, led),
        }
    }

    // ── Pattern memory ──

    /// Read one pattern-memory slot. No bounds check — out-of-range indices
    /// are the device's concern.
    pub fn read_pattern_slot(&self, pos: u8) -> crate::error::Result<PatternEntry> {
        let session = self.handle.acquire()?;
        Ok(session.read_pattern_line(pos)?)
    }

    /// Write one pattern-memory slot. Same no-bounds-check policy.
    pub fn write_pattern_slot(&self, pos: u8, entry: PatternEntry) -> crate::error::Result<()> {
        let session = self.handle.acquire()?;
        session.write_pattern_line(entry, pos)?;
        Ok(())
    }

    // ── Play loop ──

    /// Start the device play loop over already-programmed pattern memory.
    pub fn play(&self, start: u8, stop: u8, count: u8) -> crate::error::Result<()> {
        let session = self.handle.acquire()?;
        session.play_loop(true, start, stop, count)?;
        Ok(())
    }

    /// Stop playback. Issued unconditionally with zeroed bounds, regardless
    /// of generation.
    pub fn stop_sequence(&self) -> crate::error::Result<()> {
        let session = self.handle.acquire()?;
        session.play_loop(false, 0, 0, 0)?;
        Ok(())
    }

    /// Program and start a sequence of pattern entries at `start`,
    /// repeating `repeat` times (0 = forever).
    ///
    /// Empty sequences are a no-op with zero device traffic. A one-entry
    /// sequence degenerates into a plain fade. Multi-entry sequences are
    /// written to pattern memory in ascending slot order before the loop
    /// starts — mk1 padded to full capacity with the loop-everything
    /// sentinel, mk2 looping exactly the written range. Requests that
    /// exceed capacity fail with `SequenceTooLong` before any write.
    pub fn play_sequence(
        &self,
        entries: &[PatternEntry],
        start: u8,
        repeat: u8,
    ) -> crate::error::Result<()> {
        if entries.is_empty() {
            // Not even generation detection — a no-op touches nothing.
            return Ok(());
        }
        let generation = self.hardware_generation()?;
        match sequence::plan(entries, start, repeat, generation)? {
            SequenceAction::Noop => Ok(()),
            SequenceAction::Fade(entry) => self.on(entry.color, entry.fade_ms, None),
            SequenceAction::Program(plan) => {
                let session = self.handle.acquire()?;
                for (pos, entry) in &plan.writes {
                    session.write_pattern_line(*entry, *pos)?;
                }
                session.play_loop(true, plan.start, plan.stop, plan.count)?;
                Ok(())
            }
        }
    }

    /// Device-resident blink: program a four-entry on/hold/off/hold pattern
    /// and let the device play it, with no host-side sleeping.
    ///
    /// The hold entries use `delay_ms - fade_ms` (saturating), splitting
    /// each half-cycle into fade time and hold time — unlike the blocking
    /// [`blink`](Self::blink), which sleeps the full `delay_ms`.
    pub fn play_blink(
        &self,
        color: Rgb,
        fade_ms: u16,
        delay_ms: u16,
        repeat: u8,
        start: u8,
    ) -> crate::error::Result<()> {
        let hold_ms = delay_ms.saturating_sub(fade_ms);
        let entries = [
            PatternEntry::new(color, fade_ms),
            PatternEntry::new(color, hold_ms),
            PatternEntry::new(Rgb::BLACK, fade_ms),
            PatternEntry::new(Rgb::BLACK, hold_ms),
        ];
        self.play_sequence(&entries, start, repeat)
    }

    /// Device-resident blink with the controller defaults.
    pub fn play_blink_default(&self) -> crate::error::Result<()> {
        self.play_blink(
            self.default_color,
            self.default_fade_ms,
            self.default_delay_ms,
            self.default_repeat,
            0,
        )
    }

    /// Live play-loop state. Always re-queried, never cached.
    pub fn read_play_state(&self) -> crate::error::Result<PlayState> {
        let session = self.handle.acquire()?;
        Ok(session.read_play_state()?)
    }
}

/// Enumerate known devices: `(index, serial, generation)` per cache entry.
///
/// Refreshes the transport's device cache first. A missing cached serial is
/// skipped with a warning (serials are fire-and-forget), but a failed
/// generation probe is a status-checked command failure and aborts the
/// listing.
pub fn devices<T: Blink1Transport>(transport: &T) -> crate::error::Result<Vec<DiscoveredDevice>> {
    let found = transport.enumerate();
    log::debug!("enumerate() -> {found}");

    let mut result = Vec::new();
    for index in 0..found {
        let Some(serial) = transport.cached_serial(index) else {
            log::warn!("device {index}: no cached serial, skipping");
            continue;
        };
        let probe = transport.is_mk2_by_id(index);
        log::debug!("is_mk2_by_id({index}) -> {probe}");
        if probe == crate::protocol::STATUS_ERROR {
            return Err(DeviceError::CommandFailed {
                command: "is_mk2_by_id",
                status: probe,
            }
            .into());
        }
        let generation = if probe > 0 {
            Generation::Mk2
        } else {
            Generation::Mk1
        };
        result.push(DiscoveredDevice {
            index,
            serial: String::from_utf8_lossy(&serial).into_owned(),
            generation,
        });
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Blink1Error;
    use crate::transport::mock::{Call, MockTransport};

    // ── Construction ──

    #[test]
    fn from_index_with_no_devices_fails() {
        let t = MockTransport::with_devices(vec![]);
        let err = Blink1::from_index(&t, 0).unwrap_err();
        assert!(matches!(
            err,
            Blink1Error::Device(DeviceError::NoDeviceFound)
        ));
    }

    #[test]
    fn from_index_resolves_cached_serial() {
        let t = MockTransport::with_devices(vec![
            (b"1A000001".to_vec(), false),
            (b"2A000002".to_vec(), true),
        ]);
        let b1 = Blink1::from_index(&t, 1).unwrap();
        assert_eq!(b1.serial(), b"2A000002");
    }

    #[test]
    fn from_index_out_of_range_fails() {
        let t = MockTransport::new();
        let err = Blink1::from_index(&t, 5).unwrap_err();
        assert!(matches!(
            err,
            Blink1Error::Device(DeviceError::NoDeviceFound)
        ));
    }

    #[test]
    fn from_serial_makes_no_device_contact() {
        let t = MockTransport::new();
        let _b1 = Blink1::from_serial(&t, b"2A001234".to_vec());
        assert!(t.calls.borrow().is_empty());
    }

    #[test]
    fn from_defaults_prefers_configured_serial() {
        let t = MockTransport::with_devices(vec![
            (b"1A000001".to_vec(), false),
            (b"2A000002".to_vec(), true),
        ]);
        let defaults = Defaults {
            device_serial: "2A000002".into(),
            ..Defaults::default()
        };
        let b1 = Blink1::from_defaults(&t, &defaults).unwrap();
        assert_eq!(b1.serial(), b"2A000002");
        // Explicit serial skips enumeration entirely.
        assert!(t.calls.borrow().is_empty());
    }

    // ── Capability detection ──

    #[test]
    fn generation_detected_and_memoized() {
        let t = MockTransport::new();
        let b1 = Blink1::from_serial(&t, b"2A001234".to_vec());

        assert_eq!(b1.hardware_generation().unwrap(), Generation::Mk2);
        assert_eq!(b1.hardware_generation().unwrap(), Generation::Mk2);

        // One probe, one enumeration refresh; the second call hits the cache.
        let calls = t.calls.borrow();
        assert_eq!(calls.iter().filter(|c| **c == Call::IsMk2).count(), 1);
        assert_eq!(calls.iter().filter(|c| **c == Call::Enumerate).count(), 1);
    }

    #[test]
    fn detection_refreshes_enumeration_before_probe() {
        let t = MockTransport::new();
        let b1 = Blink1::from_serial(&t, b"2A001234".to_vec());
        b1.hardware_generation().unwrap();

        let calls = t.calls.borrow();
        let enumerate_at = calls.iter().position(|c| *c == Call::Enumerate).unwrap();
        let probe_at = calls.iter().position(|c| *c == Call::IsMk2).unwrap();
        assert!(enumerate_at < probe_at);
    }

    #[test]
    fn capacity_follows_generation() {
        let mk1 = MockTransport::mk1();
        let b1 = Blink1::from_serial(&mk1, b"1A001234".to_vec());
        assert_eq!(b1.capacity().unwrap(), 12);

        let mk2 = MockTransport::new();
        let b2 = Blink1::from_serial(&mk2, b"2A001234".to_vec());
        assert_eq!(b2.capacity().unwrap(), 32);
    }

    #[test]
    fn firmware_version_memoized() {
        let t = MockTransport::new();
        t.firmware_version.set(303);
        let b1 = Blink1::from_serial(&t, b"2A001234".to_vec());

        assert_eq!(b1.firmware_version().unwrap(), 303);
        // A later transport change is invisible once cached.
        t.firmware_version.set(999);
        assert_eq!(b1.firmware_version().unwrap(), 303);
        assert_eq!(
            t.calls.borrow().iter().filter(|c| **c == Call::Version).count(),
            1
        );
    }

    // ── Color / fade ──

    #[test]
    fn turn_on_uses_white_and_default_fade() {
        let t = MockTransport::new();
        let b1 = Blink1::from_serial(&t, b"2A001234".to_vec());
        b1.turn_on().unwrap();

        assert_eq!(
            t.data_commands(),
            vec![Call::FadeToRgb {
                fade_ms: 300,
                r: 255,
                g: 255,
                b: 255
            }]
        );
    }

    #[test]
    fn turn_off_fades_to_black() {
        let t = MockTransport::new();
        let b1 = Blink1::from_serial(&t, b"2A001234".to_vec());
        b1.turn_off().unwrap();

        assert_eq!(
            t.data_commands(),
            vec![Call::FadeToRgb {
                fade_ms: 300,
                r: 0,
                g: 0,
                b: 0
            }]
        );
    }

    #[test]
    fn on_with_led_targets_single_led() {
        let t = MockTransport::new();
        let b1 = Blink1::from_serial(&t, b"2A001234".to_vec());
        b1.on(Rgb::new(1, 2, 3), 100, Some(2)).unwrap();

        assert_eq!(
            t.data_commands(),
            vec![Call::FadeToRgbN {
                fade_ms: 100,
                r: 1,
                g: 2,
                b: 3,
                led: 2
            }]
        );
    }

    #[test]
    fn operations_close_transport_between_calls() {
        let t = MockTransport::new();
        let b1 = Blink1::from_serial(&t, b"2A001234".to_vec());
        b1.turn_on().unwrap();
        b1.turn_off().unwrap();

        assert_eq!(t.open_count.get(), 2);
        assert_eq!(t.close_count.get(), 2);
        assert_eq!(t.open_connections(), 0);
    }

    #[test]
    fn with_defaults_applies_config() {
        let t = MockTransport::new();
        let defaults = Defaults {
            color: "red".into(),
            fade_ms: 50,
            ..Defaults::default()
        };
        let b1 = Blink1::from_serial(&t, b"2A001234".to_vec())
            .with_defaults(&defaults)
            .unwrap();
        b1.turn_on().unwrap();

        assert_eq!(
            t.data_commands(),
            vec![Call::FadeToRgb {
                fade_ms: 50,
                r: 255,
                g: 0,
                b: 0
            }]
        );
    }

    #[test]
    fn with_defaults_rejects_bad_color() {
        let t = MockTransport::new();
        let defaults = Defaults {
            color: "not-a-color".into(),
            ..Defaults::default()
        };
        let err = Blink1::from_serial(&t, b"2A001234".to_vec())
            .with_defaults(&defaults)
            .unwrap_err();
        assert!(matches!(err, Blink1Error::Color(_)));
    }

    // ── Play loop ──

    #[test]
    fn play_starts_loop() {
        let t = MockTransport::new();
        let b1 = Blink1::from_serial(&t, b"2A001234".to_vec());
        b1.play(2, 6, 4).unwrap();

        assert_eq!(
            t.data_commands(),
            vec![Call::PlayLoop {
                enable: true,
                start: 2,
                stop: 6,
                count: 4
            }]
        );
    }

    #[test]
    fn stop_sequence_disables_with_zeroed_bounds() {
        let t = MockTransport::new();
        let b1 = Blink1::from_serial(&t, b"2A001234".to_vec());
        b1.stop_sequence().unwrap();

        assert_eq!(
            t.data_commands(),
            vec![Call::PlayLoop {
                enable: false,
                start: 0,
                stop: 0,
                count: 0
            }]
        );
    }

    #[test]
    fn read_play_state_is_never_cached() {
        let t = MockTransport::new();
        let b1 = Blink1::from_serial(&t, b"2A001234".to_vec());

        b1.read_play_state().unwrap();
        b1.read_play_state().unwrap();

        assert_eq!(
            t.calls
                .borrow()
                .iter()
                .filter(|c| **c == Call::ReadPlayState)
                .count(),
            2
        );
    }

    // ── Enumeration ──

    #[test]
    fn devices_lists_index_serial_generation() {
        let t = MockTransport::with_devices(vec![
            (b"1A000001".to_vec(), false),
            (b"2A000002".to_vec(), true),
        ]);
        let found = devices(&t).unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].index, 0);
        assert_eq!(found[0].serial, "1A000001");
        assert_eq!(found[0].generation, Generation::Mk1);
        assert_eq!(found[1].index, 1);
        assert_eq!(found[1].serial, "2A000002");
        assert_eq!(found[1].generation, Generation::Mk2);
    }

    #[test]
    fn devices_empty_when_none_found() {
        let t = MockTransport::with_devices(vec![]);
        assert!(devices(&t).unwrap().is_empty());
    }

    #[test]
    fn devices_failed_generation_probe_is_an_error() {
        let t = MockTransport::new();
        t.fail_commands.set(true);

        let err = devices(&t).unwrap_err();
        assert!(matches!(
            err,
            Blink1Error::Device(DeviceError::CommandFailed {
                command: "is_mk2_by_id",
                status: -1,
            })
        ));
    }

    #[test]
    fn devices_serializes_to_json() {
        let t = MockTransport::new();
        let found = devices(&t).unwrap();
        let json = serde_json::to_string(&found).unwrap();
        assert!(json.contains("\"serial\":\"2A001234\""));
        assert!(json.contains("\"generation\":\"mk2\""));
    }
}
