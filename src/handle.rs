//! Device handle — reference-counted transport ownership and command issue.
//!
//! [`DeviceHandle`] binds a serial number to an injected transport and opens
//! the connection lazily: the first [`DeviceHandle::acquire`] opens it, the
//! last [`Session`] drop closes it. Nested acquisitions share the one open
//! connection. [`Session`] carries the checked command wrappers — every
//! command is traced with its name, arguments, and raw status, and
//! status-checked commands map the error sentinel to
//! [`DeviceError::CommandFailed`].

use std::cell::RefCell;
use std::fmt;

use crate::color::Rgb;
use crate::models::{PatternEntry, PlayState};
use crate::protocol::STATUS_ERROR;
use crate::transport::{Blink1Transport, TransportHandle};

// ── Error type ──

/// Device communication errors.
#[derive(Debug)]
pub enum DeviceError {
    /// Enumeration found no devices when one was required.
    NoDeviceFound,
    /// Opening a specific serial failed.
    NotFound { serial: String },
    /// A status-checked command returned the error sentinel.
    CommandFailed { command: &'static str, status: i32 },
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::NoDeviceFound => write!(f, "no blink(1) devices found"),
            DeviceError::NotFound { serial } => {
                write!(f, "cannot open blink(1) with serial {serial}")
            }
            DeviceError::CommandFailed { command, status } => {
                write!(f, "command {command} failed with status {status}")
            }
        }
    }
}

impl std::error::Error for DeviceError {}

pub type Result<T> = std::result::Result<T, DeviceError>;

// ── Handle ──

#[derive(Debug)]
struct OpenState {
    // Invariant: dev.is_some() iff count > 0.
    dev: Option<TransportHandle>,
    count: u32,
}

/// Reference-counted wrapper around one device connection.
///
/// Not thread-safe by design: the crate assumes a single logical owner per
/// handle (see the concurrency notes in the crate docs). The reference count
/// governs transport lifetime only, not command atomicity.
#[derive(Debug)]
pub struct DeviceHandle<T: Blink1Transport> {
    transport: T,
    serial: Vec<u8>,
    state: RefCell<OpenState>,
}

impl<T: Blink1Transport> DeviceHandle<T> {
    /// Bind a serial number to a transport. No device contact happens here;
    /// the connection opens on first [`acquire`](Self::acquire).
    pub fn new(transport: T, serial: impl Into<Vec<u8>>) -> Self {
        DeviceHandle {
            transport,
            serial: serial.into(),
            state: RefCell::new(OpenState {
                dev: None,
                count: 0,
            }),
        }
    }

    /// The injected transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The bound serial number.
    pub fn serial(&self) -> &[u8] {
        &self.serial
    }

    /// Serial number lossily decoded for display and errors.
    pub fn serial_lossy(&self) -> String {
        String::from_utf8_lossy(&self.serial).into_owned()
    }

    /// Acquire the connection, opening it if this is the first holder.
    ///
    /// The returned [`Session`] releases on drop, so every exit path of a
    /// multi-command operation — including failure — releases exactly once.
    pub fn acquire(&self) -> Result<Session<'_, T>> {
        let mut state = self.state.borrow_mut();
        let dev = match state.dev {
            Some(dev) => dev,
            None => {
                let opened = self.transport.open_by_serial(&self.serial);
                log::debug!("open_by_serial({}) -> {opened:?}", self.serial_lossy());
                let dev = opened.ok_or_else(|| DeviceError::NotFound {
                    serial: self.serial_lossy(),
                })?;
                state.dev = Some(dev);
                dev
            }
        };
        state.count += 1;
        Ok(Session { handle: self, dev })
    }

    /// Currently open? (The transport reference exists iff any session does.)
    pub fn is_open(&self) -> bool {
        self.state.borrow().count > 0
    }

    fn release(&self) {
        let mut state = self.state.borrow_mut();
        if state.count == 0 {
            return;
        }
        state.count -= 1;
        if state.count == 0
            && let Some(dev) = state.dev.take()
        {
            // Fire-and-forget: close status is never validated.
            self.transport.close(dev);
            log::debug!("close({dev:?})");
        }
    }
}

// ── Session ──

/// Scoped acquisition of a [`DeviceHandle`]. All device commands are issued
/// through a session; dropping it releases the reference count.
#[derive(Debug)]
pub struct Session<'a, T: Blink1Transport> {
    handle: &'a DeviceHandle<T>,
    dev: TransportHandle,
}

impl<T: Blink1Transport> Session<'_, T> {
    /// The raw transport handle for this open connection.
    pub fn raw(&self) -> TransportHandle {
        self.dev
    }

    fn transport(&self) -> &T {
        &self.handle.transport
    }

    fn check(&self, command: &'static str, status: i32) -> Result<i32> {
        if status == STATUS_ERROR {
            Err(DeviceError::CommandFailed { command, status })
        } else {
            Ok(status)
        }
    }

    /// Fade all LEDs to `color` over `fade_ms`.
    pub fn fade_to_rgb(&self, fade_ms: u16, color: Rgb) -> Result<()> {
        let status = self
            .transport()
            .fade_to_rgb(self.dev, fade_ms, color.r, color.g, color.b);
        log::debug!("fade_to_rgb(fade_ms={fade_ms}, color={color}) -> {status}");
        self.check("fade_to_rgb", status)?;
        Ok(())
    }

    /// Fade one addressable LED to `color` over `fade_ms`.
    pub fn fade_to_rgb_n(&self, fade_ms: u16, color: Rgb, led: u8) -> Result<()> {
        let status = self
            .transport()
            .fade_to_rgb_n(self.dev, fade_ms, color.r, color.g, color.b, led);
        log::debug!("fade_to_rgb_n(fade_ms={fade_ms}, color={color}, led={led}) -> {status}");
        self.check("fade_to_rgb_n", status)?;
        Ok(())
    }

    /// Write one pattern-memory slot. No bounds check here — the device
    /// defines the valid range; capacity enforcement belongs to the
    /// sequence engine.
    pub fn write_pattern_line(&self, entry: PatternEntry, pos: u8) -> Result<()> {
        let PatternEntry { color, fade_ms } = entry;
        let status = self
            .transport()
            .write_pattern_line(self.dev, fade_ms, color.r, color.g, color.b, pos);
        log::debug!("write_pattern_line(fade_ms={fade_ms}, color={color}, pos={pos}) -> {status}");
        self.check("write_pattern_line", status)?;
        Ok(())
    }

    /// Read one pattern-memory slot. Same no-bounds-check policy as writes.
    pub fn read_pattern_line(&self, pos: u8) -> Result<PatternEntry> {
        let (status, fade_ms, r, g, b) = self.transport().read_pattern_line(self.dev, pos);
        log::debug!("read_pattern_line(pos={pos}) -> {status} ({fade_ms}, {r}, {g}, {b})");
        self.check("read_pattern_line", status)?;
        Ok(PatternEntry::new(Rgb::new(r, g, b), fade_ms))
    }

    /// Start or stop the device play loop.
    pub fn play_loop(&self, enable: bool, start: u8, stop: u8, count: u8) -> Result<()> {
        let status = self
            .transport()
            .play_loop(self.dev, enable, start, stop, count);
        log::debug!(
            "play_loop(enable={enable}, start={start}, stop={stop}, count={count}) -> {status}"
        );
        self.check("play_loop", status)?;
        Ok(())
    }

    /// Read the live play-loop state. Never cached.
    pub fn read_play_state(&self) -> Result<PlayState> {
        let (status, playing, start, stop, count, pos) =
            self.transport().read_play_state(self.dev);
        log::debug!(
            "read_play_state() -> {status} ({playing}, {start}, {stop}, {count}, {pos})"
        );
        self.check("read_play_state", status)?;
        Ok(PlayState {
            playing: playing != 0,
            start,
            stop,
            count,
            pos,
        })
    }

    /// Hardware-generation probe.
    pub fn is_mk2(&self) -> Result<bool> {
        let status = self.transport().is_mk2(self.dev);
        log::debug!("is_mk2() -> {status}");
        Ok(self.check("is_mk2", status)? > 0)
    }

    /// Firmware version.
    pub fn version(&self) -> Result<i32> {
        let status = self.transport().version(self.dev);
        log::debug!("get_version() -> {status}");
        self.check("get_version", status)
    }
}

impl<T: Blink1Transport> Drop for Session<'_, T> {
    fn drop(&mut self) {
        self.handle.release();
    }
}
