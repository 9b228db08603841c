//! Color parsing and formatting for blink(1) control.
//!
//! The device takes red/green/blue as three raw bytes; [`Rgb`] is the
//! in-memory form. Parsing accepts `#RRGGBB` hex and a handful of names.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An RGB color, one byte per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Full white — the controller's default "on" color.
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    /// Black / off.
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Parse a color string into an [`Rgb`].
///
/// Accepts:
/// - Hex: `"#FF0000"`, `"FF0000"`, `"#ff0000"`
/// - Named: `"red"`, `"green"`, `"blue"`, `"white"`, `"orange"`, `"yellow"`,
///   `"purple"`, `"cyan"`, `"off"`/`"black"`
pub fn parse_color(s: &str) -> crate::error::Result<Rgb> {
    let s = s.trim();

    // Named colors
    match s.to_lowercase().as_str() {
        "red" => return Ok(Rgb::new(0xFF, 0x00, 0x00)),
        "green" => return Ok(Rgb::new(0x00, 0xFF, 0x00)),
        "blue" => return Ok(Rgb::new(0x00, 0x00, 0xFF)),
        "white" => return Ok(Rgb::WHITE),
        "orange" => return Ok(Rgb::new(0xFF, 0x80, 0x00)),
        "yellow" => return Ok(Rgb::new(0xFF, 0xFF, 0x00)),
        "purple" => return Ok(Rgb::new(0x80, 0x00, 0xFF)),
        "cyan" => return Ok(Rgb::new(0x00, 0xFF, 0xFF)),
        "off" | "black" => return Ok(Rgb::BLACK),
        _ => {}
    }

    // Hex color
    let hex = s.strip_prefix('#').unwrap_or(s);
    if hex.len() != 6 {
        return Err(crate::Blink1Error::Color(format!(
            "Invalid color: {s} (use #RRGGBB or a color name)"
        )));
    }
    let val = u32::from_str_radix(hex, 16)
        .map_err(|_| crate::Blink1Error::Color(format!("Invalid hex color: {s}")))?;
    Ok(Rgb::new(
        ((val >> 16) & 0xFF) as u8,
        ((val >> 8) & 0xFF) as u8,
        (val & 0xFF) as u8,
    ))
}
