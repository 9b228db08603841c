//! libblink1 FFI backend — the real USB HID transport.
//!
//! Thin bindings to the `blink1` C library (blink1-tool's `blink1-lib`),
//! exposed as a [`Blink1Transport`]. Requires the shared library at link
//! time; enable with the `libblink1` cargo feature.

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_uchar, c_ushort, c_void};

use crate::transport::{Blink1Transport, TransportHandle};

#[link(name = "blink1")]
unsafe extern "C" {
    fn blink1_enumerate() -> c_int;
    #[link_name = "blink1_openBySerial"]
    fn blink1_open_by_serial(serial: *const c_char) -> *mut c_void;
    fn blink1_close(dev: *mut c_void);
    #[link_name = "blink1_getCachedSerial"]
    fn blink1_get_cached_serial(index: c_int) -> *const c_char;
    #[link_name = "blink1_isMk2"]
    fn blink1_is_mk2(dev: *mut c_void) -> c_int;
    #[link_name = "blink1_isMk2ById"]
    fn blink1_is_mk2_by_id(index: c_int) -> c_int;
    #[link_name = "blink1_getVersion"]
    fn blink1_get_version(dev: *mut c_void) -> c_int;
    #[link_name = "blink1_fadeToRGB"]
    fn blink1_fade_to_rgb(
        dev: *mut c_void,
        fade_ms: c_ushort,
        r: c_uchar,
        g: c_uchar,
        b: c_uchar,
    ) -> c_int;
    #[link_name = "blink1_fadeToRGBN"]
    fn blink1_fade_to_rgb_n(
        dev: *mut c_void,
        fade_ms: c_ushort,
        r: c_uchar,
        g: c_uchar,
        b: c_uchar,
        led: c_uchar,
    ) -> c_int;
    #[link_name = "blink1_writePatternLine"]
    fn blink1_write_pattern_line(
        dev: *mut c_void,
        fade_ms: c_ushort,
        r: c_uchar,
        g: c_uchar,
        b: c_uchar,
        pos: c_uchar,
    ) -> c_int;
    #[link_name = "blink1_readPatternLine"]
    fn blink1_read_pattern_line(
        dev: *mut c_void,
        fade_ms: *mut c_ushort,
        r: *mut c_uchar,
        g: *mut c_uchar,
        b: *mut c_uchar,
        pos: c_uchar,
    ) -> c_int;
    #[link_name = "blink1_playloop"]
    fn blink1_play_loop(
        dev: *mut c_void,
        play: c_uchar,
        start: c_uchar,
        stop: c_uchar,
        count: c_uchar,
    ) -> c_int;
    #[link_name = "blink1_readPlayState"]
    fn blink1_read_play_state(
        dev: *mut c_void,
        playing: *mut c_uchar,
        start: *mut c_uchar,
        stop: *mut c_uchar,
        count: *mut c_uchar,
        pos: *mut c_uchar,
    ) -> c_int;
}

fn as_ptr(dev: TransportHandle) -> *mut c_void {
    dev.raw() as usize as *mut c_void
}

/// Transport backed by the libblink1 shared library.
///
/// Zero-sized; the library itself holds all device state. Not thread-safe —
/// the underlying enumeration cache is global and unsynchronized, matching
/// the single-threaded contract of the rest of this crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct Libblink1;

impl Libblink1 {
    pub fn new() -> Self {
        Libblink1
    }
}

impl Blink1Transport for Libblink1 {
    fn enumerate(&self) -> i32 {
        // SAFETY: no arguments; the library initializes its own cache.
        unsafe { blink1_enumerate() }
    }

    fn open_by_serial(&self, serial: &[u8]) -> Option<TransportHandle> {
        // A serial with an interior NUL can't exist on real hardware; treat
        // it as an open failure rather than panicking.
        let serial = CString::new(serial.to_vec()).ok()?;
        // SAFETY: `serial` is a valid NUL-terminated string for the call's
        // duration; the library copies what it needs.
        let dev = unsafe { blink1_open_by_serial(serial.as_ptr()) };
        if dev.is_null() {
            None
        } else {
            Some(TransportHandle::from_raw(dev as usize as u64))
        }
    }

    fn close(&self, dev: TransportHandle) {
        // SAFETY: `dev` came from `open_by_serial` and is closed exactly
        // once (the refcounted handle guarantees pairing).
        unsafe { blink1_close(as_ptr(dev)) }
    }

    fn cached_serial(&self, index: i32) -> Option<Vec<u8>> {
        // SAFETY: the library returns NULL or a pointer into its own
        // cache, valid until the next enumerate call.
        let ptr = unsafe { blink1_get_cached_serial(index) };
        if ptr.is_null() {
            return None;
        }
        // SAFETY: non-NULL pointers from the cache are NUL-terminated.
        Some(unsafe { CStr::from_ptr(ptr) }.to_bytes().to_vec())
    }

    fn is_mk2(&self, dev: TransportHandle) -> i32 {
        // SAFETY: `dev` is an open connection from `open_by_serial`.
        unsafe { blink1_is_mk2(as_ptr(dev)) }
    }

    fn is_mk2_by_id(&self, index: i32) -> i32 {
        // SAFETY: index lookups are bounds-checked by the library.
        unsafe { blink1_is_mk2_by_id(index) }
    }

    fn version(&self, dev: TransportHandle) -> i32 {
        // SAFETY: `dev` is an open connection from `open_by_serial`.
        unsafe { blink1_get_version(as_ptr(dev)) }
    }

    fn fade_to_rgb(&self, dev: TransportHandle, fade_ms: u16, r: u8, g: u8, b: u8) -> i32 {
        // SAFETY: `dev` is an open connection from `open_by_serial`.
        unsafe { blink1_fade_to_rgb(as_ptr(dev), fade_ms, r, g, b) }
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
        // SAFETY: `dev` is an open connection from `open_by_serial`.
        unsafe { blink1_fade_to_rgb_n(as_ptr(dev), fade_ms, r, g, b, led) }
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
        // SAFETY: `dev` is an open connection from `open_by_serial`.
        unsafe { blink1_write_pattern_line(as_ptr(dev), fade_ms, r, g, b, pos) }
    }

    fn read_pattern_line(&self, dev: TransportHandle, pos: u8) -> (i32, u16, u8, u8, u8) {
        let mut fade_ms: c_ushort = 0;
        let (mut r, mut g, mut b): (c_uchar, c_uchar, c_uchar) = (0, 0, 0);
        // SAFETY: all out-pointers reference live locals for the call's
        // duration; `dev` is an open connection.
        let status = unsafe {
            blink1_read_pattern_line(as_ptr(dev), &mut fade_ms, &mut r, &mut g, &mut b, pos)
        };
        (status, fade_ms, r, g, b)
    }

    fn play_loop(&self, dev: TransportHandle, enable: bool, start: u8, stop: u8, count: u8) -> i32 {
        // SAFETY: `dev` is an open connection from `open_by_serial`.
        unsafe { blink1_play_loop(as_ptr(dev), enable as c_uchar, start, stop, count) }
    }

    fn read_play_state(&self, dev: TransportHandle) -> (i32, u8, u8, u8, u8, u8) {
        let (mut playing, mut start, mut stop, mut count, mut pos): (
            c_uchar,
            c_uchar,
            c_uchar,
            c_uchar,
            c_uchar,
        ) = (0, 0, 0, 0, 0);
        // SAFETY: all out-pointers reference live locals for the call's
        // duration; `dev` is an open connection.
        let status = unsafe {
            blink1_read_play_state(
                as_ptr(dev),
                &mut playing,
                &mut start,
                &mut stop,
                &mut count,
                &mut pos,
            )
        };
        (status, playing, start, stop, count, pos)
    }
}
