//! Transport capability boundary.
//!
//! [`Blink1Transport`] is the opaque open/close/command interface this crate
//! consumes; the real USB HID driver lives behind it (see `ffi` for the
//! libblink1 backend). Every transport operation is statically declared here
//! with a typed signature — command status codes are returned raw, and the
//! session layer (`handle.rs`) decides which ones are checked against the
//! error sentinel.

/// Opaque handle to an open device connection, issued by a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransportHandle(u64);

impl TransportHandle {
    pub fn from_raw(raw: u64) -> Self {
        TransportHandle(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// The low-level device capability.
///
/// Methods mirror the underlying driver one-to-one. Status-returning
/// commands signal failure with [`crate::protocol::STATUS_ERROR`]; the
/// read commands return the status alongside their out-parameters.
/// `enumerate`, `close`, and `cached_serial` are fire-and-forget — their
/// results are never validated by callers.
pub trait Blink1Transport {
    /// Refresh the transport's device cache. Returns the number of devices
    /// found. Must be called before serial-to-generation lookups.
    fn enumerate(&self) -> i32;

    /// Open a device by serial number. `None` signals failure.
    fn open_by_serial(&self, serial: &[u8]) -> Option<TransportHandle>;

    /// Release an open connection. Return value ignored by design.
    fn close(&self, dev: TransportHandle);

    /// Serial number of the nth cached device (post-`enumerate`).
    fn cached_serial(&self, index: i32) -> Option<Vec<u8>>;

    /// Hardware-generation probe on an open device. Positive = mk2.
    fn is_mk2(&self, dev: TransportHandle) -> i32;

    /// Hardware-generation probe by enumeration-cache index. Positive = mk2.
    fn is_mk2_by_id(&self, index: i32) -> i32;

    /// Firmware version of an open device.
    fn version(&self, dev: TransportHandle) -> i32;

    /// Fade all LEDs to a color over `fade_ms`.
    fn fade_to_rgb(&self, dev: TransportHandle, fade_ms: u16, r: u8, g: u8, b: u8) -> i32;

    /// Fade a single addressable LED to a color over `fade_ms`.
    fn fade_to_rgb_n(&self, dev: TransportHandle, fade_ms: u16, r: u8, g: u8, b: u8, led: u8)
    -> i32;

    /// Write one pattern-memory slot.
    fn write_pattern_line(
        &self,
        dev: TransportHandle,
        fade_ms: u16,
        r: u8,
        g: u8,
        b: u8,
        pos: u8,
    ) -> i32;

    /// Read one pattern-memory slot: `(status, fade_ms, r, g, b)`.
    fn read_pattern_line(&self, dev: TransportHandle, pos: u8) -> (i32, u16, u8, u8, u8);

    /// Start (`enable` = true) or stop the device play loop over
    /// `start..=stop`, repeating `count` times (0 = forever).
    fn play_loop(&self, dev: TransportHandle, enable: bool, start: u8, stop: u8, count: u8) -> i32;

    /// Read live play-loop state: `(status, playing, start, stop, count, pos)`.
    fn read_play_state(&self, dev: TransportHandle) -> (i32, u8, u8, u8, u8, u8);
}

impl<T: Blink1Transport + ?Sized> Blink1Transport for &T {
    fn enumerate(&self) -> i32 {
        (**self).enumerate()
    }
    fn open_by_serial(&self, serial: &[u8]) -> Option<TransportHandle> {
        (**self).open_by_serial(serial)
    }
    fn close(&self, dev: TransportHandle) {
        (**self).close(dev)
    }
    fn cached_serial(&self, index: i32) -> Option<Vec<u8>> {
        (**self).cached_serial(index)
    }
    fn is_mk2(&self, dev: TransportHandle) -> i32 {
        (**self).is_mk2(dev)
    }
    fn is_mk2_by_id(&self, index: i32) -> i32 {
        (**self).is_mk2_by_id(index)
    }
    fn version(&self, dev: TransportHandle) -> i32 {
        (**self).version(dev)
    }
    fn fade_to_rgb(&self, dev: TransportHandle, fade_ms: u16, r: u8, g: u8, b: u8) -> i32 {
        (**self).fade_to_rgb(dev, fade_ms, r, g, b)
    }
    fn fade_to_rgb_n(
        &self,
        dev: TransportHandle,
        fade_ms: u16,
        r: u8,
        g: u8,
        b: u8,
        led: u8,
    ) -> i32 {
        (**self).fade_to_rgb_n(dev, fade_ms, r, g, b, led)
    }
    fn write_pattern_line(
        &self,
        dev: TransportHandle,
        fade_ms: u16,
        r: u8,
        g: u8,
        b: u8,
        pos: u8,
    ) -> i32 {
        (**self).write_pattern_line(dev, fade_ms, r, g, b, pos)
    }
    fn read_pattern_line(&self, dev: TransportHandle, pos: u8) -> (i32, u16, u8, u8, u8) {
        (**self).read_pattern_line(dev, pos)
    }
    fn play_loop(&self, dev: TransportHandle, enable: bool, start: u8, stop: u8, count: u8) -> i32 {
        (**self).play_loop(dev, enable, start, stop, count)
    }
    fn read_play_state(&self, dev: TransportHandle) -> (i32, u8, u8, u8, u8, u8) {
        (**self).read_play_state(dev)
    }
}

// ── Mock transport for testing ──

/// In-memory mock transport for unit and integration tests.
///
/// Always compiled (zero runtime cost), hidden from public docs.
#[doc(hidden)]
pub mod mock {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;

    use crate::protocol::STATUS_ERROR;

    /// One recorded transport call, in issue order.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        Enumerate,
        OpenBySerial(Vec<u8>),
        Close(TransportHandle),
        CachedSerial(i32),
        IsMk2,
        IsMk2ById(i32),
        Version,
        FadeToRgb {
            fade_ms: u16,
            r: u8,
            g: u8,
            b: u8,
        },
        FadeToRgbN {
            fade_ms: u16,
            r: u8,
            g: u8,
            b: u8,
            led: u8,
        },
        WritePatternLine {
            fade_ms: u16,
            r: u8,
            g: u8,
            b: u8,
            pos: u8,
        },
        ReadPatternLine {
            pos: u8,
        },
        PlayLoop {
            enable: bool,
            start: u8,
            stop: u8,
            count: u8,
        },
        ReadPlayState,
    }

    impl Call {
        /// Whether this call is a data command sent to the device (as
        /// opposed to enumeration, lifecycle, or probe traffic).
        pub fn is_data_command(&self) -> bool {
            matches!(
                self,
                Call::FadeToRgb { .. }
                    | Call::FadeToRgbN { .. }
                    | Call::WritePatternLine { .. }
                    | Call::ReadPatternLine { .. }
                    | Call::PlayLoop { .. }
                    | Call::ReadPlayState
            )
        }
    }

    #[derive(Debug)]
    struct MockEntry {
        serial: Vec<u8>,
        mk2: bool,
    }

    /// Recording mock: stores a device table, echoes pattern-line writes back
    /// through reads, and supports failure injection for open and for
    /// status-checked commands.
    #[derive(Debug)]
    pub struct MockTransport {
        devices: RefCell<Vec<MockEntry>>,
        /// Every call made, in order.
        pub calls: RefCell<Vec<Call>>,
        /// Pattern memory echo storage: pos → (fade_ms, r, g, b).
        pub pattern: RefCell<HashMap<u8, (u16, u8, u8, u8)>>,
        /// Last play-loop state: (playing, start, stop, count, pos).
        pub play_state: Cell<(u8, u8, u8, u8, u8)>,
        /// Successful opens.
        pub open_count: Cell<u32>,
        /// Closes.
        pub close_count: Cell<u32>,
        /// Firmware version reported by `version`.
        pub firmware_version: Cell<i32>,
        /// If true, `open_by_serial` returns `None`.
        pub fail_open: Cell<bool>,
        /// If true, every status-checked command returns the error sentinel.
        pub fail_commands: Cell<bool>,
        opened: RefCell<HashMap<u64, usize>>,
        next_handle: Cell<u64>,
    }

    impl Default for MockTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockTransport {
        /// One mk2 device with serial `2A001234`.
        pub fn new() -> Self {
            Self::with_devices(vec![(b"2A001234".to_vec(), true)])
        }

        /// One mk1 device with serial `1A001234`.
        pub fn mk1() -> Self {
            Self::with_devices(vec![(b"1A001234".to_vec(), false)])
        }

        /// Arbitrary device table: `(serial, is_mk2)` per device.
        pub fn with_devices(devices: Vec<(Vec<u8>, bool)>) -> Self {
            MockTransport {
                devices: RefCell::new(
                    devices
                        .into_iter()
                        .map(|(serial, mk2)| MockEntry { serial, mk2 })
                        .collect(),
                ),
                calls: RefCell::new(Vec::new()),
                pattern: RefCell::new(HashMap::new()),
                play_state: Cell::new((0, 0, 0, 0, 0)),
                open_count: Cell::new(0),
                close_count: Cell::new(0),
                firmware_version: Cell::new(204),
                fail_open: Cell::new(false),
                fail_commands: Cell::new(false),
                opened: RefCell::new(HashMap::new()),
                next_handle: Cell::new(1),
            }
        }

        /// Drop the recorded call log (keeps device and pattern state).
        pub fn clear_calls(&self) {
            self.calls.borrow_mut().clear();
        }

        /// Recorded data commands only (fades, pattern I/O, play loop).
        pub fn data_commands(&self) -> Vec<Call> {
            self.calls
                .borrow()
                .iter()
                .filter(|c| c.is_data_command())
                .cloned()
                .collect()
        }

        /// Number of currently open connections.
        pub fn open_connections(&self) -> usize {
            self.opened.borrow().len()
        }

        fn record(&self, call: Call) {
            self.calls.borrow_mut().push(call);
        }

        fn device_of(&self, dev: TransportHandle) -> Option<usize> {
            self.opened.borrow().get(&dev.raw()).copied()
        }
    }

    impl Blink1Transport for MockTransport {
        fn enumerate(&self) -> i32 {
            self.record(Call::Enumerate);
            self.devices.borrow().len() as i32
        }

        fn open_by_serial(&self, serial: &[u8]) -> Option<TransportHandle> {
            self.record(Call::OpenBySerial(serial.to_vec()));
            if self.fail_open.get() {
                return None;
            }
            let index = self
                .devices
                .borrow()
                .iter()
                .position(|d| d.serial == serial)?;
            let raw = self.next_handle.get();
            self.next_handle.set(raw + 1);
            self.opened.borrow_mut().insert(raw, index);
            self.open_count.set(self.open_count.get() + 1);
            Some(TransportHandle::from_raw(raw))
        }

        fn close(&self, dev: TransportHandle) {
            self.record(Call::Close(dev));
            self.opened.borrow_mut().remove(&dev.raw());
            self.close_count.set(self.close_count.get() + 1);
        }

        fn cached_serial(&self, index: i32) -> Option<Vec<u8>> {
            self.record(Call::CachedSerial(index));
            usize::try_from(index)
                .ok()
                .and_then(|i| self.devices.borrow().get(i).map(|d| d.serial.clone()))
        }

        fn is_mk2(&self, dev: TransportHandle) -> i32 {
            self.record(Call::IsMk2);
            if self.fail_commands.get() {
                return STATUS_ERROR;
            }
            match self.device_of(dev) {
                Some(i) => self.devices.borrow()[i].mk2 as i32,
                None => STATUS_ERROR,
            }
        }

        fn is_mk2_by_id(&self, index: i32) -> i32 {
            self.record(Call::IsMk2ById(index));
            if self.fail_commands.get() {
                return STATUS_ERROR;
            }
            usize::try_from(index)
                .ok()
                .and_then(|i| self.devices.borrow().get(i).map(|d| d.mk2 as i32))
                .unwrap_or(STATUS_ERROR)
        }

        fn version(&self, dev: TransportHandle) -> i32 {
            self.record(Call::Version);
            if self.fail_commands.get() || self.device_of(dev).is_none() {
                return STATUS_ERROR;
            }
            self.firmware_version.get()
        }

        fn fade_to_rgb(&self, _dev: TransportHandle, fade_ms: u16, r: u8, g: u8, b: u8) -> i32 {
            self.record(Call::FadeToRgb { fade_ms, r, g, b });
            if self.fail_commands.get() { STATUS_ERROR } else { 0 }
        }

        fn fade_to_rgb_n(
            &self,
            _dev: TransportHandle,
            fade_ms: u16,
            r: u8,
            g: u8,
            b: u8,
            led: u8,
        ) -> i32 {
            self.record(Call::FadeToRgbN {
                fade_ms,
                r,
                g,
                b,
                led,
            });
            if self.fail_commands.get() { STATUS_ERROR } else { 0 }
        }

        fn write_pattern_line(
            &self,
            _dev: TransportHandle,
            fade_ms: u16,
            r: u8,
            g: u8,
            b: u8,
            pos: u8,
        ) -> i32 {
            self.record(Call::WritePatternLine {
                fade_ms,
                r,
                g,
                b,
                pos,
            });
            if self.fail_commands.get() {
                return STATUS_ERROR;
            }
            self.pattern.borrow_mut().insert(pos, (fade_ms, r, g, b));
            0
        }

        fn read_pattern_line(&self, _dev: TransportHandle, pos: u8) -> (i32, u16, u8, u8, u8) {
            self.record(Call::ReadPatternLine { pos });
            if self.fail_commands.get() {
                return (STATUS_ERROR, 0, 0, 0, 0);
            }
            let (fade_ms, r, g, b) = self
                .pattern
                .borrow()
                .get(&pos)
                .copied()
                .unwrap_or((0, 0, 0, 0));
            (0, fade_ms, r, g, b)
        }

        fn play_loop(
            &self,
            _dev: TransportHandle,
            enable: bool,
            start: u8,
            stop: u8,
            count: u8,
        ) -> i32 {
            self.record(Call::PlayLoop {
                enable,
                start,
                stop,
                count,
            });
            if self.fail_commands.get() {
                return STATUS_ERROR;
            }
            self.play_state.set((enable as u8, start, stop, count, 0));
            0
        }

        fn read_play_state(&self, _dev: TransportHandle) -> (i32, u8, u8, u8, u8, u8) {
            self.record(Call::ReadPlayState);
            if self.fail_commands.get() {
                return (STATUS_ERROR, 0, 0, 0, 0, 0);
            }
            let (playing, start, stop, count, pos) = self.play_state.get();
            (0, playing, start, stop, count, pos)
        }
    }

}
